//! # invoice2pdf
//!
//! Generate batches of invoice PDFs from a spreadsheet, delivered as a
//! single zip archive.
//!
//! ## Why this crate?
//!
//! Producing a month's worth of invoices by hand — fill a template, export
//! a PDF, repeat — does not scale past a handful of documents. This crate
//! reads one XLSX workbook where each row is a billable line item, groups
//! rows sharing an invoice number into invoice records, renders each record
//! onto an A4 page, and packs the resulting one-page PDFs into
//! `invoices.zip`.
//!
//! ## Pipeline Overview
//!
//! ```text
//! XLSX workbook
//!  │
//!  ├─ 1. Input      validate path + PK zip magic
//!  ├─ 2. Ingest     parse rows, group by invoice number (first-seen order)
//!  ├─ 3. Aggregate  exact decimal totals, "1,234.50" display formatting
//!  ├─ 4. Render     rasterise each record (CPU-bound, spawn_blocking,
//!  │                bounded settle timeout)
//!  ├─ 5. Encode     bitmap → full-bleed single-page A4 PDF
//!  └─ 6. Archive    Invoice_<no>.pdf entries → invoices.zip
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use invoice2pdf::{generate_batch_to_file, BatchConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BatchConfig::default();
//!     let output = generate_batch_to_file("invoices.xlsx", "invoices.zip", &config).await?;
//!     eprintln!(
//!         "{}/{} invoices produced",
//!         output.stats.produced_invoices, output.stats.total_invoices
//!     );
//!     Ok(())
//! }
//! ```
//!
//! Need the template to hand to whoever fills in the data?
//!
//! ```rust,no_run
//! invoice2pdf::write_template(std::path::Path::new("invoice_batch_template.xlsx"))?;
//! # Ok::<(), invoice2pdf::Invoice2PdfError>(())
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `invoice2pdf` binary (clap + indicatif + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! invoice2pdf = { version = "0.3", default-features = false }
//! ```
//!
//! ## Failure model
//!
//! Fatal errors ([`Invoice2PdfError`]) abort before any output: unreadable
//! or malformed spreadsheet, no usable font, broken archive. Per-invoice
//! errors ([`RecordError`]) fail only that invoice; the batch carries on
//! and reports the outcome per invoice in [`BatchOutput`]. Call
//! [`BatchOutput::into_result`] to treat any invoice failure as fatal.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod config;
pub mod error;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod stream;
pub mod template;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{
    generate_batch, generate_batch_from_bytes, generate_batch_sync, generate_batch_to_file,
    generate_single, generate_single_to_file, inspect,
};
pub use config::{BatchConfig, BatchConfigBuilder, DuplicatePolicy, BATCH_ARCHIVE_NAME};
pub use error::{Invoice2PdfError, RecordError};
pub use model::{BrandProfile, InvoiceRecord, LineItem};
pub use output::{BatchOutput, BatchStats, BatchSummary, InvoiceResult, RenderedInvoice};
pub use pipeline::render::InvoiceRenderer;
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
pub use stream::{generate_stream, InvoiceStream};
pub use template::{write_template, TEMPLATE_FILENAME};
