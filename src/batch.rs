//! Batch orchestration: the eager, end-to-end generation entry points.
//!
//! ## Ordering contract
//!
//! Invoices are processed strictly sequentially in first-seen order, and
//! archive entries appear in that same order. Rendering concurrency would
//! be easy to add here but is deliberately absent: deterministic ordering
//! and bounded memory matter more than throughput at the batch sizes this
//! serves.
//!
//! ## Failure model
//!
//! Everything up to and including ingestion is fatal: a bad spreadsheet
//! aborts before any output exists. From rendering onwards, failures are
//! per-invoice — recorded in [`InvoiceResult`] while the batch carries on.
//! Only the degenerate "every invoice failed" case turns fatal again, so
//! callers never receive an empty archive that looks like success.

use crate::config::BatchConfig;
use crate::error::{Invoice2PdfError, RecordError};
use crate::model::InvoiceRecord;
use crate::output::{BatchOutput, BatchStats, BatchSummary, InvoiceResult, InvoiceSummary};
use crate::pipeline::{archive::ArchiveBuilder, encode, ingest, input, render};
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

/// Generate the full batch archive from a spreadsheet on disk.
pub async fn generate_batch(
    input_path: impl AsRef<Path>,
    config: &BatchConfig,
) -> Result<BatchOutput, Invoice2PdfError> {
    let path = input::resolve_local(input_path)?;
    let bytes = std::fs::read(&path).map_err(|e| Invoice2PdfError::ParseFailed {
        detail: format!("{}: {e}", path.display()),
    })?;
    generate_batch_from_bytes(&bytes, config).await
}

/// Generate the full batch archive from in-memory workbook bytes.
pub async fn generate_batch_from_bytes(
    bytes: &[u8],
    config: &BatchConfig,
) -> Result<BatchOutput, Invoice2PdfError> {
    let run_start = Instant::now();
    let mut stats = BatchStats::default();

    let ingest_start = Instant::now();
    let mut records = ingest::ingest_bytes(bytes)?;
    stats.ingest_duration_ms = ingest_start.elapsed().as_millis() as u64;

    if records.is_empty() {
        return Err(Invoice2PdfError::EmptyBatch);
    }

    // Renderer construction is fatal before any invoice is attempted.
    let renderer = render::resolve_renderer(config)?;

    let total = records.len();
    stats.total_invoices = total;
    stats.total_line_items = records.iter().map(|r| r.items.len()).sum();

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(total);
    }

    let mut builder = ArchiveBuilder::new(config.duplicate_policy);
    let mut results: Vec<InvoiceResult> = Vec::with_capacity(total);
    let mut first_error: Option<RecordError> = None;

    for (index, record) in records.iter_mut().enumerate() {
        record.recompute_total();

        if let Some(ref cb) = config.progress_callback {
            cb.on_invoice_start(index, total, &record.invoice_no);
        }

        let invoice_start = Instant::now();
        let outcome = process_record(&renderer, record, config, &mut builder).await;
        let duration_ms = invoice_start.elapsed().as_millis() as u64;
        stats.render_duration_ms += duration_ms;

        match outcome {
            Ok(Produced { filename, pdf_len }) => {
                stats.produced_invoices += 1;
                if let Some(ref cb) = config.progress_callback {
                    cb.on_invoice_complete(index, total, &record.invoice_no, pdf_len);
                }
                results.push(InvoiceResult {
                    invoice_no: record.invoice_no.clone(),
                    filename: Some(filename),
                    item_count: record.items.len(),
                    total: record.total.clone(),
                    pdf_len,
                    duration_ms,
                    error: None,
                });
            }
            Err(Outcome::Record(err)) => {
                warn!("{err}");
                stats.failed_invoices += 1;
                if let Some(ref cb) = config.progress_callback {
                    cb.on_invoice_error(index, total, &record.invoice_no, &err.to_string());
                }
                if first_error.is_none() {
                    first_error = Some(err.clone());
                }
                results.push(InvoiceResult {
                    invoice_no: record.invoice_no.clone(),
                    filename: None,
                    item_count: record.items.len(),
                    total: record.total.clone(),
                    pdf_len: 0,
                    duration_ms,
                    error: Some(err),
                });
            }
            Err(Outcome::Fatal(err)) => return Err(err),
        }
    }

    if stats.produced_invoices == 0 {
        return Err(Invoice2PdfError::AllInvoicesFailed {
            total,
            first_error: first_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown".to_string()),
        });
    }

    let archive_start = Instant::now();
    let archive = builder.finish()?;
    stats.archive_duration_ms = archive_start.elapsed().as_millis() as u64;
    stats.total_duration_ms = run_start.elapsed().as_millis() as u64;

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_complete(total, stats.produced_invoices);
    }
    info!(
        "Batch complete: {}/{} invoices in {} ms",
        stats.produced_invoices, total, stats.total_duration_ms
    );

    Ok(BatchOutput {
        archive,
        archive_name: config.archive_name.clone(),
        invoices: results,
        stats,
    })
}

struct Produced {
    filename: String,
    pdf_len: usize,
}

enum Outcome {
    Record(RecordError),
    Fatal(Invoice2PdfError),
}

/// Render, encode and archive one record.
///
/// Archive errors are fatal (the zip itself is broken), except a rejected
/// duplicate filename which also aborts — by the time a collision is
/// detected under `Reject`, continuing would produce a misleading archive.
async fn process_record(
    renderer: &std::sync::Arc<dyn render::InvoiceRenderer>,
    record: &InvoiceRecord,
    config: &BatchConfig,
    builder: &mut ArchiveBuilder,
) -> Result<Produced, Outcome> {
    let page = render::render_record(renderer, record, config.settle_timeout_secs)
        .await
        .map_err(Outcome::Record)?;
    let pdf = encode::encode_pdf(record, &page).map_err(Outcome::Record)?;
    let filename = builder
        .add_document(&record.invoice_no, &pdf)
        .map_err(Outcome::Fatal)?;
    Ok(Produced {
        filename,
        pdf_len: pdf.len(),
    })
}

/// Generate the batch and write the archive to `output_path` atomically.
///
/// The archive is written to a sibling `.zip.tmp` first and renamed into
/// place, so a crash never leaves a truncated zip at the target path.
pub async fn generate_batch_to_file(
    input_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &BatchConfig,
) -> Result<BatchOutput, Invoice2PdfError> {
    let output = generate_batch(input_path, config).await?;
    let path = output_path.as_ref();

    let tmp = path.with_extension("zip.tmp");
    let write_err = |source: std::io::Error| Invoice2PdfError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };
    std::fs::write(&tmp, &output.archive).map_err(write_err)?;
    std::fs::rename(&tmp, path).map_err(write_err)?;

    info!("Wrote archive: {}", path.display());
    Ok(output)
}

/// Blocking wrapper around [`generate_batch`] for non-async callers.
pub fn generate_batch_sync(
    input_path: impl AsRef<Path>,
    config: &BatchConfig,
) -> Result<BatchOutput, Invoice2PdfError> {
    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| Invoice2PdfError::Internal(format!("failed to start runtime: {e}")))?;
    runtime.block_on(generate_batch(input_path, config))
}

/// Parse and group a spreadsheet without rendering anything.
///
/// Totals are recomputed so the summary shows exactly what a batch run
/// would print on each invoice.
pub fn inspect(bytes: &[u8]) -> Result<BatchSummary, Invoice2PdfError> {
    let mut records = ingest::ingest_bytes(bytes)?;
    if records.is_empty() {
        return Err(Invoice2PdfError::EmptyBatch);
    }
    for record in &mut records {
        record.recompute_total();
    }
    Ok(BatchSummary {
        invoice_count: records.len(),
        line_item_count: records.iter().map(|r| r.items.len()).sum(),
        invoices: records
            .into_iter()
            .map(|r| InvoiceSummary {
                invoice_no: r.invoice_no,
                currency: r.currency,
                item_count: r.items.len(),
                total: r.total,
            })
            .collect(),
    })
}

/// Generate a single invoice document, outside any batch or archive.
pub async fn generate_single(
    record: &InvoiceRecord,
    config: &BatchConfig,
) -> Result<Vec<u8>, Invoice2PdfError> {
    if !record.is_valid() {
        return Err(Invoice2PdfError::InvalidConfig(
            "invoice record has no invoice number".into(),
        ));
    }
    let renderer = render::resolve_renderer(config)?;

    let mut record = record.clone();
    record.recompute_total();

    let single = |e: RecordError| Invoice2PdfError::InvoiceFailed {
        invoice_no: record.invoice_no.clone(),
        detail: e.to_string(),
    };
    let page = render::render_record(&renderer, &record, config.settle_timeout_secs)
        .await
        .map_err(single)?;
    encode::encode_pdf(&record, &page).map_err(single)
}

/// Generate a single invoice document and write it atomically.
pub async fn generate_single_to_file(
    record: &InvoiceRecord,
    output_path: impl AsRef<Path>,
    config: &BatchConfig,
) -> Result<usize, Invoice2PdfError> {
    let pdf = generate_single(record, config).await?;
    let path = output_path.as_ref();

    let tmp = path.with_extension("pdf.tmp");
    let write_err = |source: std::io::Error| Invoice2PdfError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };
    std::fs::write(&tmp, &pdf).map_err(write_err)?;
    std::fs::rename(&tmp, path).map_err(write_err)?;

    info!("Wrote document: {}", path.display());
    Ok(pdf.len())
}
