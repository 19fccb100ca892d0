//! Input resolution: validate a user-supplied spreadsheet path.
//!
//! XLSX workbooks are zip containers, so the magic bytes are `PK\x03\x04`.
//! Checking them up front gives the caller a meaningful error instead of a
//! parser failure deep inside calamine, and guarantees the "abort before any
//! batch state changes" contract for malformed uploads.

use crate::error::Invoice2PdfError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Zip local-file-header magic; every `.xlsx` starts with it.
const XLSX_MAGIC: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];

/// Validate that `path` exists, is readable, and looks like an XLSX workbook.
///
/// Returns the canonicalised-enough `PathBuf` for downstream reads.
pub fn resolve_local(path_str: impl AsRef<Path>) -> Result<PathBuf, Invoice2PdfError> {
    let path = path_str.as_ref().to_path_buf();

    if !path.exists() {
        return Err(Invoice2PdfError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && magic != XLSX_MAGIC {
                return Err(Invoice2PdfError::NotASpreadsheet { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(Invoice2PdfError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(Invoice2PdfError::FileNotFound { path });
        }
    }

    debug!("Resolved spreadsheet: {}", path.display());
    Ok(path)
}

/// Magic-byte check for in-memory workbook uploads.
pub fn check_magic(bytes: &[u8]) -> bool {
    bytes.len() >= 4 && bytes[..4] == XLSX_MAGIC
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_is_not_found() {
        let err = resolve_local("/definitely/not/here.xlsx").unwrap_err();
        assert!(matches!(err, Invoice2PdfError::FileNotFound { .. }));
    }

    #[test]
    fn wrong_magic_is_rejected() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"%PDF-1.7 not a workbook").unwrap();
        let err = resolve_local(tmp.path()).unwrap_err();
        assert!(matches!(err, Invoice2PdfError::NotASpreadsheet { .. }));
    }

    #[test]
    fn zip_magic_is_accepted() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(&[0x50, 0x4B, 0x03, 0x04, 0x00, 0x00]).unwrap();
        assert!(resolve_local(tmp.path()).is_ok());
    }

    #[test]
    fn check_magic_on_bytes() {
        assert!(check_magic(&[0x50, 0x4B, 0x03, 0x04, 0x99]));
        assert!(!check_magic(b"%PDF"));
        assert!(!check_magic(&[0x50, 0x4B]));
    }
}
