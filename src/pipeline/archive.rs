//! Archive assembly: collect per-invoice PDFs into one zip delivered as a
//! single download.
//!
//! Filenames follow the `Invoice_<no>.pdf` convention with the invoice
//! number sanitised for the filesystem. Sanitisation can collapse two
//! distinct numbers onto one name; the configured
//! [`DuplicatePolicy`] decides what happens then.

use crate::config::DuplicatePolicy;
use crate::error::Invoice2PdfError;
use std::collections::HashSet;
use std::io::{Cursor, Write};
use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Derive the archive filename for an invoice number.
///
/// The number is sanitised (path separators, reserved characters and
/// control bytes removed); a number that sanitises to nothing falls back
/// to `unnamed` rather than producing `Invoice_.pdf`.
pub fn document_filename(invoice_no: &str) -> String {
    let cleaned = sanitize_filename::sanitize(invoice_no.trim());
    if cleaned.is_empty() {
        "Invoice_unnamed.pdf".to_string()
    } else {
        format!("Invoice_{cleaned}.pdf")
    }
}

/// Incrementally builds the batch zip in memory.
pub struct ArchiveBuilder {
    zip: ZipWriter<Cursor<Vec<u8>>>,
    names: HashSet<String>,
    policy: DuplicatePolicy,
    entries: usize,
}

impl ArchiveBuilder {
    pub fn new(policy: DuplicatePolicy) -> Self {
        Self {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
            names: HashSet::new(),
            policy,
            entries: 0,
        }
    }

    /// Add one PDF under the name derived from `invoice_no`; returns the
    /// filename actually used.
    pub fn add_document(
        &mut self,
        invoice_no: &str,
        pdf: &[u8],
    ) -> Result<String, Invoice2PdfError> {
        let mut filename = document_filename(invoice_no);

        if self.names.contains(&filename) {
            match self.policy {
                DuplicatePolicy::Reject => {
                    return Err(Invoice2PdfError::DuplicateDocument { filename });
                }
                DuplicatePolicy::Suffix => {
                    let stem = filename.trim_end_matches(".pdf").to_string();
                    let mut n = 2usize;
                    while self.names.contains(&filename) {
                        filename = format!("{stem}_{n}.pdf");
                        n += 1;
                    }
                    debug!("Duplicate filename for invoice '{invoice_no}', using '{filename}'");
                }
                DuplicatePolicy::Overwrite => {
                    // The zip format appends; readers resolve the later
                    // entry, which matches last-write-wins.
                    warn!("Duplicate filename '{filename}', later document wins");
                }
            }
        }

        let options =
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        self.zip
            .start_file(filename.as_str(), options)
            .map_err(|e| Invoice2PdfError::ArchiveFailed { detail: e.to_string() })?;
        self.zip
            .write_all(pdf)
            .map_err(|e| Invoice2PdfError::ArchiveFailed { detail: e.to_string() })?;

        self.names.insert(filename.clone());
        self.entries += 1;
        Ok(filename)
    }

    /// Number of documents added so far.
    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Finish the central directory and return the zip bytes.
    pub fn finish(self) -> Result<Vec<u8>, Invoice2PdfError> {
        let cursor = self
            .zip
            .finish()
            .map_err(|e| Invoice2PdfError::ArchiveFailed { detail: e.to_string() })?;
        Ok(cursor.into_inner())
    }
}
