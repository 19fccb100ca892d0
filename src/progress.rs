//! Progress-callback trait for per-invoice batch events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::BatchConfigBuilder::progress_callback`] to receive an
//! event as the orchestrator finishes each invoice.
//!
//! # Why callbacks instead of channels?
//!
//! The callback approach is the least-invasive integration point: callers
//! can forward events to a progress bar, a WebSocket, or a log line without
//! the library knowing how the host application communicates. The trait is
//! `Send + Sync` so the same callback works when generation runs inside
//! `tokio::spawn`.
//!
//! # Ordering guarantee
//!
//! Invoices are processed strictly sequentially, so events arrive in index
//! order and exactly one of `on_invoice_complete` / `on_invoice_error`
//! fires per invoice. The completed-over-total ratio derived from these
//! events is therefore non-decreasing and reaches exactly 1.0 after the
//! last invoice.

use std::sync::Arc;

/// Called by the batch orchestrator as it processes each invoice.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. `index` is 0-based; the user-visible progress
/// ratio after an invoice finishes is `(index + 1) / total`.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once after ingestion, before any invoice is rendered.
    fn on_batch_start(&self, total_invoices: usize) {
        let _ = total_invoices;
    }

    /// Called just before an invoice's render step begins.
    fn on_invoice_start(&self, index: usize, total: usize, invoice_no: &str) {
        let _ = (index, total, invoice_no);
    }

    /// Called when an invoice's document has been added to the archive.
    ///
    /// `pdf_len` is the byte length of the encoded document.
    fn on_invoice_complete(&self, index: usize, total: usize, invoice_no: &str, pdf_len: usize) {
        let _ = (index, total, invoice_no, pdf_len);
    }

    /// Called when an invoice fails; the batch continues with the next one.
    fn on_invoice_error(&self, index: usize, total: usize, invoice_no: &str, error: &str) {
        let _ = (index, total, invoice_no, error);
    }

    /// Called once after all invoices have been attempted.
    fn on_batch_complete(&self, total: usize, produced: usize) {
        let _ = (total, produced);
    }
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the default when no callback is configured.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::BatchConfig`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;

/// Progress ratio after finishing the invoice at `index` (0-based).
pub fn ratio(index: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (index + 1) as f64 / total as f64
}
