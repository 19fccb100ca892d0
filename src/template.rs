//! Batch template workbook: the spreadsheet skeleton users fill in.
//!
//! The template carries the exact header row the ingestion stage
//! recognises plus a few sample rows demonstrating the grouping rules (two
//! rows sharing an invoice number become one two-item invoice).

use crate::error::Invoice2PdfError;
use rust_xlsxwriter::{Format, Workbook};
use std::path::Path;
use tracing::info;

/// Default filename for the generated template.
pub const TEMPLATE_FILENAME: &str = "invoice_batch_template.xlsx";

/// Header row, in column order. Ingestion matches these names
/// case- and spacing-insensitively.
pub const TEMPLATE_HEADERS: [&str; 7] = [
    "Invoice No",
    "Invoice Date",
    "Billing Period",
    "Currency",
    "Item Date",
    "Item Description",
    "Item Amount",
];

/// Sample rows: the first invoice spans two rows to show row grouping.
const SAMPLE_ROWS: [[&str; 7]; 3] = [
    [
        "20260101",
        "01/01/2026",
        "December 2025",
        "USD",
        "December 2025",
        "Advertising services",
        "1000.00",
    ],
    [
        "20260101",
        "01/01/2026",
        "December 2025",
        "USD",
        "December 2025",
        "Consulting services",
        "500.00",
    ],
    [
        "20260102",
        "02/01/2026",
        "December 2025",
        "CNY",
        "December 2025",
        "Equipment purchase",
        "50000.00",
    ],
];

/// Build the template workbook in memory.
pub fn template_bytes() -> Result<Vec<u8>, Invoice2PdfError> {
    let mut workbook = Workbook::new();
    let internal = |e: rust_xlsxwriter::XlsxError| Invoice2PdfError::Internal(e.to_string());

    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Invoices").map_err(internal)?;

    let bold = Format::new().set_bold();
    for (col, header) in TEMPLATE_HEADERS.iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, *header, &bold)
            .map_err(internal)?;
    }

    for (row, cells) in SAMPLE_ROWS.iter().enumerate() {
        for (col, cell) in cells.iter().enumerate() {
            worksheet
                .write_string((row + 1) as u32, col as u16, *cell)
                .map_err(internal)?;
        }
    }

    workbook.save_to_buffer().map_err(internal)
}

/// Write the template workbook to `path`.
pub fn write_template(path: &Path) -> Result<(), Invoice2PdfError> {
    let bytes = template_bytes()?;
    std::fs::write(path, &bytes).map_err(|e| Invoice2PdfError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    })?;
    info!("Wrote template: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{ingest, input};

    #[test]
    fn template_is_a_zip_container() {
        let bytes = template_bytes().unwrap();
        assert!(input::check_magic(&bytes));
    }

    #[test]
    fn template_round_trips_through_ingestion() {
        let bytes = template_bytes().unwrap();
        let records = ingest::ingest_bytes(&bytes).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].invoice_no, "20260101");
        assert_eq!(records[0].items.len(), 2);
        assert_eq!(records[0].currency, "USD");
        assert_eq!(records[1].invoice_no, "20260102");
        assert_eq!(records[1].items.len(), 1);
        assert_eq!(records[1].currency, "CNY");
    }

    #[test]
    fn sample_totals_aggregate_correctly() {
        let bytes = template_bytes().unwrap();
        let mut records = ingest::ingest_bytes(&bytes).unwrap();
        for record in &mut records {
            record.recompute_total();
        }
        assert_eq!(records[0].total, "1,500.00");
        assert_eq!(records[1].total, "50,000.00");
    }
}
