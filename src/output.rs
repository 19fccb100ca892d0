//! Output types: per-invoice results, batch statistics, summaries.

use crate::error::{Invoice2PdfError, RecordError};
use serde::{Deserialize, Serialize};

/// Outcome of one invoice within a batch run.
///
/// Exactly one of the two shapes occurs: `filename: Some(..)` with
/// `error: None` when a document landed in the archive, or
/// `filename: None` with `error: Some(..)` when the invoice failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceResult {
    /// Invoice number as ingested.
    pub invoice_no: String,
    /// Final archive entry name, after sanitisation and duplicate handling.
    pub filename: Option<String>,
    /// Number of line items on the invoice.
    pub item_count: usize,
    /// Display total computed by aggregation.
    pub total: String,
    /// Byte length of the encoded document (0 on failure).
    pub pdf_len: usize,
    /// Wall-clock time spent in render + encode for this invoice.
    pub duration_ms: u64,
    /// The failure, if this invoice produced no document.
    pub error: Option<RecordError>,
}

/// Aggregate statistics for a batch run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchStats {
    /// Valid invoice records found by ingestion.
    pub total_invoices: usize,
    /// Invoices whose documents landed in the archive.
    pub produced_invoices: usize,
    /// Invoices that failed render or encode.
    pub failed_invoices: usize,
    /// Line items across all records.
    pub total_line_items: usize,
    /// End-to-end wall-clock time.
    pub total_duration_ms: u64,
    /// Time spent parsing and grouping the spreadsheet.
    pub ingest_duration_ms: u64,
    /// Cumulative render + encode time across invoices.
    pub render_duration_ms: u64,
    /// Time spent finalising the zip archive.
    pub archive_duration_ms: u64,
}

/// The result of a batch run: one archive blob plus per-invoice outcomes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutput {
    /// The finished zip archive.
    #[serde(skip)]
    pub archive: Vec<u8>,
    /// Filename the archive should be saved under.
    pub archive_name: String,
    /// Per-invoice outcomes, in processing (first-seen) order.
    pub invoices: Vec<InvoiceResult>,
    /// Run statistics.
    pub stats: BatchStats,
}

impl BatchOutput {
    /// Treat any invoice failure as an error.
    ///
    /// Returns [`Invoice2PdfError::PartialFailure`] when at least one
    /// invoice failed, otherwise passes the output through unchanged.
    pub fn into_result(self) -> Result<Self, Invoice2PdfError> {
        if self.stats.failed_invoices > 0 {
            return Err(Invoice2PdfError::PartialFailure {
                produced: self.stats.produced_invoices,
                failed: self.stats.failed_invoices,
                total: self.stats.total_invoices,
            });
        }
        Ok(self)
    }
}

/// One rendered invoice document, as yielded by the streaming API.
#[derive(Debug, Clone)]
pub struct RenderedInvoice {
    pub invoice_no: String,
    /// Suggested filename (`Invoice_<no>.pdf`); streaming callers own
    /// collision handling since no archive is involved.
    pub filename: String,
    /// The encoded single-page document.
    pub pdf: Vec<u8>,
}

/// Ingest-only description of a spreadsheet, produced by [`crate::inspect`].
///
/// No rendering happens; totals are computed so the caller can sanity-check
/// grouping and aggregation before committing to a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub invoice_count: usize,
    pub line_item_count: usize,
    pub invoices: Vec<InvoiceSummary>,
}

/// One grouped invoice as seen by [`crate::inspect`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceSummary {
    pub invoice_no: String,
    pub currency: String,
    pub item_count: usize,
    pub total: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok_result(no: &str) -> InvoiceResult {
        InvoiceResult {
            invoice_no: no.to_string(),
            filename: Some(format!("Invoice_{no}.pdf")),
            item_count: 1,
            total: "1.00".into(),
            pdf_len: 10,
            duration_ms: 1,
            error: None,
        }
    }

    #[test]
    fn into_result_passes_clean_output() {
        let output = BatchOutput {
            archive: vec![1, 2, 3],
            archive_name: "invoices.zip".into(),
            invoices: vec![ok_result("A1")],
            stats: BatchStats {
                total_invoices: 1,
                produced_invoices: 1,
                ..Default::default()
            },
        };
        assert!(output.into_result().is_ok());
    }

    #[test]
    fn into_result_rejects_partial_failure() {
        let output = BatchOutput {
            archive: Vec::new(),
            archive_name: "invoices.zip".into(),
            invoices: Vec::new(),
            stats: BatchStats {
                total_invoices: 2,
                produced_invoices: 1,
                failed_invoices: 1,
                ..Default::default()
            },
        };
        let err = output.into_result().unwrap_err();
        assert!(matches!(err, Invoice2PdfError::PartialFailure { failed: 1, .. }));
    }

    #[test]
    fn batch_output_serialises_without_archive_bytes() {
        let output = BatchOutput {
            archive: vec![0xFF; 64],
            archive_name: "invoices.zip".into(),
            invoices: vec![ok_result("A1")],
            stats: BatchStats::default(),
        };
        let json = serde_json::to_string(&output).expect("serialise");
        assert!(json.contains("invoices.zip"));
        assert!(!json.contains("255,255"), "archive bytes must be skipped");
    }
}
