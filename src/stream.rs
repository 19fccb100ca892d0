//! Streaming API: yield invoice documents one at a time instead of
//! collecting an archive.
//!
//! Useful for hosts that deliver documents as they are produced (an HTTP
//! response per invoice, a progress UI with previews). No zip is involved,
//! so duplicate-filename handling is the caller's concern — each yielded
//! item carries only the suggested `Invoice_<no>.pdf` name.
//!
//! Items come out in first-seen order, one render in flight at a time,
//! mirroring the eager batch path. Per-invoice failures are yielded as
//! `Err(RecordError)` items; the stream continues past them.

use crate::config::BatchConfig;
use crate::error::{Invoice2PdfError, RecordError};
use crate::output::RenderedInvoice;
use crate::pipeline::{archive, encode, ingest, render};
use futures::StreamExt;
use std::pin::Pin;
use std::sync::Arc;
use tokio_stream::Stream;

/// The invoice document stream type.
pub type InvoiceStream = Pin<Box<dyn Stream<Item = Result<RenderedInvoice, RecordError>> + Send>>;

/// Ingest workbook bytes and stream one document per invoice.
///
/// Ingestion and renderer construction happen eagerly so their failures
/// stay fatal, exactly as in the batch path; only per-invoice errors flow
/// through the stream.
pub async fn generate_stream(
    bytes: &[u8],
    config: &BatchConfig,
) -> Result<InvoiceStream, Invoice2PdfError> {
    let mut records = ingest::ingest_bytes(bytes)?;
    if records.is_empty() {
        return Err(Invoice2PdfError::EmptyBatch);
    }
    for record in &mut records {
        record.recompute_total();
    }

    let renderer = render::resolve_renderer(config)?;
    let settle_timeout_secs = config.settle_timeout_secs;

    let stream = futures::stream::iter(records).then(move |record| {
        let renderer = Arc::clone(&renderer);
        async move {
            let page = render::render_record(&renderer, &record, settle_timeout_secs).await?;
            let pdf = encode::encode_pdf(&record, &page)?;
            Ok(RenderedInvoice {
                filename: archive::document_filename(&record.invoice_no),
                invoice_no: record.invoice_no,
                pdf,
            })
        }
    });

    Ok(Box::pin(stream))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::InvoiceRecord;
    use crate::pipeline::render::InvoiceRenderer;
    use crate::template;
    use image::{DynamicImage, Rgba, RgbaImage};

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

    #[tokio::test]
    async fn streams_documents_in_first_seen_order() {
        let bytes = template::template_bytes().unwrap();
        let config = BatchConfig::builder()
            .renderer(Arc::new(StubRenderer))
            .build()
            .unwrap();

        let mut stream = generate_stream(&bytes, &config).await.unwrap();
        let mut seen = Vec::new();
        while let Some(item) = stream.next().await {
            let doc = item.expect("stream item");
            assert!(doc.pdf.starts_with(b"%PDF"));
            seen.push(doc.filename);
        }
        assert_eq!(seen, vec!["Invoice_20260101.pdf", "Invoice_20260102.pdf"]);
    }

    #[tokio::test]
    async fn garbage_bytes_fail_before_streaming() {
        let config = BatchConfig::builder()
            .renderer(Arc::new(StubRenderer))
            .build()
            .unwrap();
        let err = generate_stream(b"junk", &config).await.map(|_| ()).unwrap_err();
        assert!(matches!(err, Invoice2PdfError::ParseFailed { .. }));
    }
}
