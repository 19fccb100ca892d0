//! The renderer seam and the bounded settle-wait driver.
//!
//! ## Why a trait here?
//!
//! The visual invoice template is the one collaborator a host application
//! is likely to replace — a desktop app has its own widget tree, a server
//! might shell out to a browser. Everything upstream and downstream of the
//! bitmap is fixed, so the seam is exactly one method: record in, bitmap
//! out. The built-in implementation is [`crate::pipeline::typeset::TypesetRenderer`].
//!
//! ## Why spawn_blocking + timeout?
//!
//! Rasterisation is CPU-bound; `tokio::task::spawn_blocking` keeps it off
//! the async worker threads. The `tokio::time::timeout` wrapper is the
//! settle contract: a render that does not complete within the bound fails
//! that single invoice rather than stalling the whole batch. Note the
//! blocking task itself is abandoned on timeout, not killed — acceptable
//! because the orchestrator drops its result and moves on.

use crate::config::BatchConfig;
use crate::error::{Invoice2PdfError, RecordError};
use crate::model::InvoiceRecord;
use crate::pipeline::typeset::TypesetRenderer;
use image::DynamicImage;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Renders a fully-populated invoice record into a page bitmap.
///
/// Implementations must be pure with respect to the record: the same
/// record always produces the same visual state, with no hidden shared
/// slot between invocations. Return
/// [`RecordError::CaptureUnavailable`] when there is no surface to
/// capture; callers treat that as "nothing produced", never as an empty
/// document.
pub trait InvoiceRenderer: Send + Sync {
    fn render(&self, record: &InvoiceRecord) -> Result<DynamicImage, RecordError>;
}

/// Resolve the renderer: the injected one from config, or the built-in
/// typeset renderer.
///
/// Built-in construction fails fast (fatal) when no usable font exists, so
/// a batch never starts only to skip every invoice at capture time.
pub fn resolve_renderer(config: &BatchConfig) -> Result<Arc<dyn InvoiceRenderer>, Invoice2PdfError> {
    if let Some(ref renderer) = config.renderer {
        return Ok(Arc::clone(renderer));
    }
    let renderer = TypesetRenderer::from_config(config)?;
    Ok(Arc::new(renderer))
}

/// Drive one record through the renderer under the settle bound.
pub async fn render_record(
    renderer: &Arc<dyn InvoiceRenderer>,
    record: &InvoiceRecord,
    settle_timeout_secs: u64,
) -> Result<DynamicImage, RecordError> {
    let renderer = Arc::clone(renderer);
    let owned = record.clone();
    let invoice_no = record.invoice_no.clone();

    let handle = tokio::task::spawn_blocking(move || renderer.render(&owned));

    match tokio::time::timeout(Duration::from_secs(settle_timeout_secs), handle).await {
        Err(_) => Err(RecordError::SettleTimeout {
            invoice_no,
            secs: settle_timeout_secs,
        }),
        Ok(Err(join_err)) => Err(RecordError::RenderFailed {
            invoice_no,
            detail: format!("render task panicked: {join_err}"),
        }),
        Ok(Ok(result)) => {
            if let Ok(ref img) = result {
                debug!(
                    "Rendered invoice {} → {}x{} px",
                    record.invoice_no,
                    img.width(),
                    img.height()
                );
            }
            result
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    struct SolidRenderer;

    impl InvoiceRenderer for SolidRenderer {
        fn render(&self, _record: &InvoiceRecord) -> Result<DynamicImage, RecordError> {
            Ok(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
                4,
                6,
                Rgba([255, 255, 255, 255]),
            )))
        }
    }

    struct StuckRenderer;

    impl InvoiceRenderer for StuckRenderer {
        fn render(&self, _record: &InvoiceRecord) -> Result<DynamicImage, RecordError> {
            std::thread::sleep(Duration::from_secs(5));
            Err(RecordError::RenderFailed {
                invoice_no: "unreachable".into(),
                detail: "unreachable".into(),
            })
        }
    }

    #[tokio::test]
    async fn renders_through_the_seam() {
        let renderer: Arc<dyn InvoiceRenderer> = Arc::new(SolidRenderer);
        let record = InvoiceRecord::new("A1");
        let img = render_record(&renderer, &record, 30).await.unwrap();
        assert_eq!((img.width(), img.height()), (4, 6));
    }

    #[tokio::test]
    async fn settle_bound_fails_the_single_invoice() {
        let renderer: Arc<dyn InvoiceRenderer> = Arc::new(StuckRenderer);
        let record = InvoiceRecord::new("SLOW-1");
        let err = render_record(&renderer, &record, 1).await.unwrap_err();
        assert!(matches!(err, RecordError::SettleTimeout { secs: 1, .. }));
        assert_eq!(err.invoice_no(), "SLOW-1");
    }
}
