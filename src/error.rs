//! Error types for the invoice2pdf library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Invoice2PdfError`] — **Fatal**: the batch cannot proceed at all
//!   (unreadable spreadsheet, no renderer available, archive cannot be
//!   written). Returned as `Err(Invoice2PdfError)` from the top-level
//!   `generate_*` functions before any partial output is produced.
//!
//! * [`RecordError`] — **Non-fatal**: a single invoice failed (render
//!   timeout, encode glitch) but the rest of the batch is fine. Stored
//!   inside [`crate::output::InvoiceResult`] so callers can inspect partial
//!   success instead of losing the whole archive to one bad invoice.
//!
//! The separation lets callers decide their own tolerance: abort on the
//! first invoice failure via [`crate::output::BatchOutput::into_result`],
//! or log the per-invoice errors and ship the archive that was produced.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the invoice2pdf library.
///
/// Invoice-level failures use [`RecordError`] and are stored in
/// [`crate::output::InvoiceResult`] rather than propagated here.
#[derive(Debug, Error)]
pub enum Invoice2PdfError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Spreadsheet not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not an XLSX workbook.
    #[error("File is not a valid .xlsx workbook: '{path}'\nFirst bytes: {magic:?}")]
    NotASpreadsheet { path: PathBuf, magic: [u8; 4] },

    /// The workbook bytes could not be parsed as a spreadsheet.
    ///
    /// Surfaced to the user before any batch state changes; the batch never
    /// partially proceeds on a malformed upload.
    #[error("Failed to parse spreadsheet: {detail}")]
    ParseFailed { detail: String },

    /// Ingestion produced no valid invoice records.
    #[error("No invoices found: every row was missing an invoice number")]
    EmptyBatch,

    // ── Render errors ─────────────────────────────────────────────────────
    /// No renderer could be constructed (usually: no usable font found).
    ///
    /// Detected up front so a batch never silently produces an archive with
    /// missing entries.
    #[error("Invoice renderer unavailable: {detail}\nSet --font or INVOICE2PDF_FONT to a .ttf file.")]
    RendererUnavailable { detail: String },

    /// A single-invoice run failed; batch runs record this per invoice instead.
    #[error("Invoice '{invoice_no}' failed: {detail}")]
    InvoiceFailed { invoice_no: String, detail: String },

    /// Every invoice in the batch failed; no archive would have content.
    #[error("All {total} invoices failed.\nFirst error: {first_error}")]
    AllInvoicesFailed { total: usize, first_error: String },

    /// Some invoices succeeded but at least one failed.
    ///
    /// Returned by [`crate::output::BatchOutput::into_result`] when the
    /// caller wants to treat any invoice failure as an error.
    #[error("{failed}/{total} invoices failed during batch generation")]
    PartialFailure {
        produced: usize,
        failed: usize,
        total: usize,
    },

    // ── Archive errors ────────────────────────────────────────────────────
    /// Two invoices mapped to the same output filename and the configured
    /// policy is [`crate::config::DuplicatePolicy::Reject`].
    #[error("Duplicate document filename '{filename}' in archive")]
    DuplicateDocument { filename: String },

    /// The zip writer failed.
    #[error("Failed to assemble archive: {detail}")]
    ArchiveFailed { detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single invoice.
///
/// Stored in [`crate::output::InvoiceResult`] when an invoice fails.
/// The overall batch continues unless ALL invoices fail.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum RecordError {
    /// The renderer had no surface to capture for this invoice.
    ///
    /// Callers must treat this as "nothing produced", never as an empty or
    /// corrupt document.
    #[error("Invoice '{invoice_no}': no render surface available: {detail}")]
    CaptureUnavailable { invoice_no: String, detail: String },

    /// Rasterisation failed.
    #[error("Invoice '{invoice_no}': render failed: {detail}")]
    RenderFailed { invoice_no: String, detail: String },

    /// The render did not settle within the configured bound.
    #[error("Invoice '{invoice_no}': render did not settle within {secs}s")]
    SettleTimeout { invoice_no: String, secs: u64 },

    /// PDF encoding of the captured bitmap failed.
    #[error("Invoice '{invoice_no}': PDF encoding failed: {detail}")]
    EncodeFailed { invoice_no: String, detail: String },
}

impl RecordError {
    /// The invoice number this error belongs to.
    pub fn invoice_no(&self) -> &str {
        match self {
            RecordError::CaptureUnavailable { invoice_no, .. }
            | RecordError::RenderFailed { invoice_no, .. }
            | RecordError::SettleTimeout { invoice_no, .. }
            | RecordError::EncodeFailed { invoice_no, .. } => invoice_no,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_failure_display() {
        let e = Invoice2PdfError::PartialFailure {
            produced: 9,
            failed: 1,
            total: 10,
        };
        let msg = e.to_string();
        assert!(msg.contains("1/10"), "got: {msg}");
    }

    #[test]
    fn duplicate_document_display() {
        let e = Invoice2PdfError::DuplicateDocument {
            filename: "Invoice_A1.pdf".into(),
        };
        assert!(e.to_string().contains("Invoice_A1.pdf"));
    }

    #[test]
    fn settle_timeout_display() {
        let e = RecordError::SettleTimeout {
            invoice_no: "20260101".into(),
            secs: 30,
        };
        assert!(e.to_string().contains("20260101"));
        assert!(e.to_string().contains("30s"));
    }

    #[test]
    fn record_error_exposes_invoice_no() {
        let e = RecordError::CaptureUnavailable {
            invoice_no: "A1".into(),
            detail: "view not mounted".into(),
        };
        assert_eq!(e.invoice_no(), "A1");
    }

    #[test]
    fn record_error_serialises() {
        let e = RecordError::RenderFailed {
            invoice_no: "A1".into(),
            detail: "boom".into(),
        };
        let json = serde_json::to_string(&e).expect("serialise");
        assert!(json.contains("RenderFailed"));
    }
}
