//! End-to-end tests for the batch generation pipeline.
//!
//! Tests run against workbooks built in memory and a stub renderer injected
//! through config, so nothing here depends on system fonts or fixture
//! files. The built-in typeset renderer has its own unit tests that skip
//! when no font is installed.

use invoice2pdf::{
    generate_batch_from_bytes, generate_batch_to_file, generate_single, generate_stream, inspect,
    BatchConfig, BatchProgressCallback, DuplicatePolicy, Invoice2PdfError, InvoiceRecord,
    InvoiceRenderer, LineItem, RecordError,
};
use image::{DynamicImage, Rgba, RgbaImage};
use rust_xlsxwriter::Workbook;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio_stream::StreamExt;
use zip::ZipArchive;

// ── Fixtures ─────────────────────────────────────────────────────────────

const HEADERS: [&str; 7] = [
    "Invoice No",
    "Invoice Date",
    "Billing Period",
    "Currency",
    "Item Date",
    "Item Description",
    "Item Amount",
];

/// Build an XLSX workbook from rows of `[no, date, period, currency, item
/// date, description, amount]`.
fn workbook(rows: &[[&str; 7]]) -> Vec<u8> {
    let mut wb = Workbook::new();
    let sheet = wb.add_worksheet();
    for (col, header) in HEADERS.iter().enumerate() {
        sheet.write_string(0, col as u16, *header).unwrap();
    }
    for (row, cells) in rows.iter().enumerate() {
        for (col, cell) in cells.iter().enumerate() {
            sheet.write_string((row + 1) as u32, col as u16, *cell).unwrap();
        }
    }
    wb.save_to_buffer().unwrap()
}

fn two_invoice_workbook() -> Vec<u8> {
    workbook(&[
        ["20260101", "01/01/2026", "Dec 2025", "USD", "Dec 2025", "Advertising", "1000.00"],
        ["20260101", "01/01/2026", "Dec 2025", "USD", "Dec 2025", "Consulting", "500.00"],
        ["20260102", "02/01/2026", "Dec 2025", "CNY", "Dec 2025", "Equipment", "50000.00"],
    ])
}

/// Renders a tiny solid page for any record.
struct StubRenderer;

impl InvoiceRenderer for StubRenderer {
    fn render(&self, _record: &InvoiceRecord) -> Result<DynamicImage, RecordError> {
        Ok(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            40,
            57,
            Rgba([255, 255, 255, 255]),
        )))
    }
}

/// Fails every record whose invoice number contains `BAD`.
struct SelectiveRenderer;

impl InvoiceRenderer for SelectiveRenderer {
    fn render(&self, record: &InvoiceRecord) -> Result<DynamicImage, RecordError> {
        if record.invoice_no.contains("BAD") {
            return Err(RecordError::RenderFailed {
                invoice_no: record.invoice_no.clone(),
                detail: "injected failure".into(),
            });
        }
        StubRenderer.render(record)
    }
}

fn stub_config() -> BatchConfig {
    BatchConfig::builder()
        .renderer(Arc::new(StubRenderer))
        .build()
        .unwrap()
}

fn archive_entries(bytes: &[u8]) -> Vec<String> {
    let archive = ZipArchive::new(Cursor::new(bytes.to_vec())).expect("valid zip");
    archive.file_names().map(String::from).collect()
}

// ── Ingestion & grouping ─────────────────────────────────────────────────

#[test]
fn rows_group_by_invoice_number_in_first_seen_order() {
    // The second invoice's rows are interleaved with the first's.
    let bytes = workbook(&[
        ["B2", "", "", "", "", "one", "1.00"],
        ["A1", "", "", "", "", "two", "2.00"],
        ["B2", "", "", "", "", "three", "3.00"],
    ]);
    let summary = inspect(&bytes).unwrap();
    assert_eq!(summary.invoice_count, 2);
    assert_eq!(summary.invoices[0].invoice_no, "B2");
    assert_eq!(summary.invoices[0].item_count, 2);
    assert_eq!(summary.invoices[1].invoice_no, "A1");
}

#[test]
fn rows_without_invoice_number_are_dropped_whole() {
    let bytes = workbook(&[
        ["A1", "", "", "", "", "kept", "1.00"],
        ["", "", "", "", "", "dropped", "999.00"],
        ["   ", "", "", "", "", "also dropped", "999.00"],
    ]);
    let summary = inspect(&bytes).unwrap();
    assert_eq!(summary.invoice_count, 1);
    assert_eq!(summary.invoices[0].total, "1.00");
}

#[test]
fn currency_defaults_and_totals_aggregate() {
    let bytes = workbook(&[
        ["A1", "", "", "", "", "ads", "104,893.06"],
        ["A1", "", "", "", "", "fees", "1,000"],
        ["A1", "", "", "", "", "junk amount", "n/a"],
    ]);
    let summary = inspect(&bytes).unwrap();
    assert_eq!(summary.invoices[0].currency, "USD");
    assert_eq!(summary.invoices[0].total, "105,893.06");
}

// ── Batch generation ─────────────────────────────────────────────────────

#[tokio::test]
async fn batch_produces_one_document_per_invoice() {
    let output = generate_batch_from_bytes(&two_invoice_workbook(), &stub_config())
        .await
        .unwrap();

    assert_eq!(output.stats.total_invoices, 2);
    assert_eq!(output.stats.produced_invoices, 2);
    assert_eq!(output.stats.total_line_items, 3);
    assert_eq!(output.archive_name, "invoices.zip");

    let mut names = archive_entries(&output.archive);
    names.sort();
    assert_eq!(names, vec!["Invoice_20260101.pdf", "Invoice_20260102.pdf"]);

    // Each archived document is a PDF.
    let mut archive = ZipArchive::new(Cursor::new(output.archive)).unwrap();
    let mut doc = archive.by_name("Invoice_20260101.pdf").unwrap();
    let mut head = [0u8; 4];
    std::io::Read::read_exact(&mut doc, &mut head).unwrap();
    assert_eq!(&head, b"%PDF");
}

#[tokio::test]
async fn batch_results_carry_totals_and_filenames() {
    let output = generate_batch_from_bytes(&two_invoice_workbook(), &stub_config())
        .await
        .unwrap();

    let first = &output.invoices[0];
    assert_eq!(first.invoice_no, "20260101");
    assert_eq!(first.filename.as_deref(), Some("Invoice_20260101.pdf"));
    assert_eq!(first.item_count, 2);
    assert_eq!(first.total, "1,500.00");
    assert!(first.pdf_len > 0);
    assert!(first.error.is_none());

    assert_eq!(output.invoices[1].total, "50,000.00");
}

#[tokio::test]
async fn empty_spreadsheet_aborts_before_rendering() {
    let bytes = workbook(&[]);
    let err = generate_batch_from_bytes(&bytes, &stub_config())
        .await
        .unwrap_err();
    assert!(matches!(err, Invoice2PdfError::EmptyBatch));
}

#[tokio::test]
async fn batch_writes_archive_atomically_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("batch.xlsx");
    let output_path = dir.path().join("out.zip");
    std::fs::write(&input, two_invoice_workbook()).unwrap();

    let output = generate_batch_to_file(&input, &output_path, &stub_config())
        .await
        .unwrap();

    let on_disk = std::fs::read(&output_path).unwrap();
    assert_eq!(on_disk, output.archive);
    assert!(!dir.path().join("out.zip.tmp").exists());
}

// ── Failure isolation ────────────────────────────────────────────────────

#[tokio::test]
async fn one_failed_invoice_does_not_sink_the_batch() {
    let bytes = workbook(&[
        ["A1", "", "", "", "", "fine", "1.00"],
        ["BAD-2", "", "", "", "", "broken", "2.00"],
        ["C3", "", "", "", "", "fine", "3.00"],
    ]);
    let config = BatchConfig::builder()
        .renderer(Arc::new(SelectiveRenderer))
        .build()
        .unwrap();

    let output = generate_batch_from_bytes(&bytes, &config).await.unwrap();
    assert_eq!(output.stats.produced_invoices, 2);
    assert_eq!(output.stats.failed_invoices, 1);

    let failed = &output.invoices[1];
    assert_eq!(failed.invoice_no, "BAD-2");
    assert!(failed.filename.is_none());
    assert!(matches!(failed.error, Some(RecordError::RenderFailed { .. })));

    // The archive contains only the two produced documents.
    let names = archive_entries(&output.archive);
    assert_eq!(names.len(), 2);
    assert!(!names.iter().any(|n| n.contains("BAD")));

    // Strict callers can still turn the partial run into an error.
    let err = output.into_result().unwrap_err();
    assert!(matches!(
        err,
        Invoice2PdfError::PartialFailure { produced: 2, failed: 1, total: 3 }
    ));
}

#[tokio::test]
async fn all_failed_invoices_turn_fatal() {
    let bytes = workbook(&[
        ["BAD-1", "", "", "", "", "x", "1.00"],
        ["BAD-2", "", "", "", "", "y", "2.00"],
    ]);
    let config = BatchConfig::builder()
        .renderer(Arc::new(SelectiveRenderer))
        .build()
        .unwrap();

    let err = generate_batch_from_bytes(&bytes, &config).await.unwrap_err();
    match err {
        Invoice2PdfError::AllInvoicesFailed { total, first_error } => {
            assert_eq!(total, 2);
            assert!(first_error.contains("BAD-1"));
        }
        other => panic!("expected AllInvoicesFailed, got {other:?}"),
    }
}

// ── Duplicate filenames ──────────────────────────────────────────────────

#[tokio::test]
async fn sanitisation_collisions_are_suffixed_by_default() {
    // Distinct numbers, same filename after sanitisation.
    let bytes = workbook(&[
        ["A?1", "", "", "", "", "x", "1.00"],
        ["A*1", "", "", "", "", "y", "2.00"],
    ]);
    let output = generate_batch_from_bytes(&bytes, &stub_config())
        .await
        .unwrap();

    let mut names = archive_entries(&output.archive);
    names.sort();
    assert_eq!(names, vec!["Invoice_A1.pdf", "Invoice_A1_2.pdf"]);
    assert_eq!(
        output.invoices[1].filename.as_deref(),
        Some("Invoice_A1_2.pdf")
    );
}

#[tokio::test]
async fn reject_policy_aborts_on_collision() {
    let bytes = workbook(&[
        ["A?1", "", "", "", "", "x", "1.00"],
        ["A*1", "", "", "", "", "y", "2.00"],
    ]);
    let config = BatchConfig::builder()
        .renderer(Arc::new(StubRenderer))
        .duplicate_policy(DuplicatePolicy::Reject)
        .build()
        .unwrap();

    let err = generate_batch_from_bytes(&bytes, &config).await.unwrap_err();
    assert!(matches!(
        err,
        Invoice2PdfError::DuplicateDocument { ref filename } if filename == "Invoice_A1.pdf"
    ));
}

// ── Progress events ──────────────────────────────────────────────────────

struct TrackingCallback {
    started: AtomicUsize,
    events: Mutex<Vec<(usize, usize)>>,
}

impl BatchProgressCallback for TrackingCallback {
    fn on_batch_start(&self, total: usize) {
        self.started.store(total, Ordering::SeqCst);
    }
    fn on_invoice_complete(&self, index: usize, total: usize, _no: &str, _len: usize) {
        self.events.lock().unwrap().push((index, total));
    }
    fn on_invoice_error(&self, index: usize, total: usize, _no: &str, _error: &str) {
        self.events.lock().unwrap().push((index, total));
    }
}

#[tokio::test]
async fn progress_events_arrive_in_order_and_reach_the_total() {
    let tracker = Arc::new(TrackingCallback {
        started: AtomicUsize::new(0),
        events: Mutex::new(Vec::new()),
    });
    let config = BatchConfig::builder()
        .renderer(Arc::new(StubRenderer))
        .progress_callback(tracker.clone())
        .build()
        .unwrap();

    generate_batch_from_bytes(&two_invoice_workbook(), &config)
        .await
        .unwrap();

    assert_eq!(tracker.started.load(Ordering::SeqCst), 2);
    let events = tracker.events.lock().unwrap().clone();
    assert_eq!(events, vec![(0, 2), (1, 2)]);
}

// ── Streaming & single-document APIs ─────────────────────────────────────

#[tokio::test]
async fn stream_yields_documents_in_batch_order() {
    let mut stream = generate_stream(&two_invoice_workbook(), &stub_config())
        .await
        .unwrap();

    let mut filenames = Vec::new();
    while let Some(item) = stream.next().await {
        let doc = item.unwrap();
        assert!(doc.pdf.starts_with(b"%PDF"));
        filenames.push(doc.filename);
    }
    assert_eq!(filenames, vec!["Invoice_20260101.pdf", "Invoice_20260102.pdf"]);
}

#[tokio::test]
async fn single_invoice_renders_without_an_archive() {
    let mut record = InvoiceRecord::new("SOLO-1");
    record.items.push(LineItem {
        date: "Dec 2025".into(),
        description: "One-off consulting".into(),
        amount: "250.00".into(),
    });

    let pdf = generate_single(&record, &stub_config()).await.unwrap();
    assert!(pdf.starts_with(b"%PDF"));
}
