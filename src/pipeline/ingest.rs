//! Spreadsheet ingestion: parse an XLSX workbook and group rows into
//! invoice records.
//!
//! ## Grouping contract
//!
//! Rows are visited in file order. Every row carrying an invoice number
//! either opens a new record (first time that number is seen) or appends a
//! line item to the existing one, so records come out in **first-seen
//! order** of their invoice numbers with items in row order. Rows with an
//! empty invoice number are dropped whole — they never produce a partial
//! record and never affect other records.
//!
//! Amounts stay raw text here; numeric parsing is the aggregation stage's
//! job.

use crate::error::Invoice2PdfError;
use crate::model::{InvoiceRecord, LineItem};
use calamine::{Data, Reader, Xlsx};
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info};

/// Recognised columns of the batch template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Column {
    InvoiceNo,
    InvoiceDate,
    BillingPeriod,
    Currency,
    ItemDate,
    ItemDescription,
    ItemAmount,
}

impl Column {
    /// Match a header cell against the recognised names, tolerating case
    /// and spacing variants (`Invoice No`, `invoiceno`, ` INVOICE_NO `).
    fn from_header(header: &str) -> Option<Self> {
        match normalize_header(header).as_str() {
            "invoiceno" | "invoicenumber" => Some(Column::InvoiceNo),
            "invoicedate" => Some(Column::InvoiceDate),
            "billingperiod" => Some(Column::BillingPeriod),
            "currency" => Some(Column::Currency),
            "itemdate" => Some(Column::ItemDate),
            "itemdescription" => Some(Column::ItemDescription),
            "itemamount" => Some(Column::ItemAmount),
            _ => None,
        }
    }
}

/// Lowercase and strip everything that is not alphanumeric.
fn normalize_header(header: &str) -> String {
    header
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// Coerce any cell value to display text.
///
/// Spreadsheet engines store integer-looking values as floats; an invoice
/// number typed as `20260101` comes back as `20260101.0` and must not grow
/// a trailing `.0` in filenames.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < 1e15 {
                format!("{}", *f as i64)
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::Error(_) => String::new(),
        other => other.to_string(),
    }
}

/// Ingest workbook bytes into an ordered sequence of invoice records.
///
/// Fails with [`Invoice2PdfError::ParseFailed`] when the bytes are not a
/// well-formed workbook; callers surface that to the user and abort the
/// batch rather than partially proceeding.
pub fn ingest_bytes(bytes: &[u8]) -> Result<Vec<InvoiceRecord>, Invoice2PdfError> {
    let mut workbook: Xlsx<_> =
        Xlsx::new(Cursor::new(bytes)).map_err(|e| Invoice2PdfError::ParseFailed {
            detail: e.to_string(),
        })?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| Invoice2PdfError::ParseFailed {
            detail: "workbook has no worksheets".into(),
        })?
        .map_err(|e| Invoice2PdfError::ParseFailed {
            detail: e.to_string(),
        })?;

    let mut rows = range.rows();
    let columns: HashMap<Column, usize> = match rows.next() {
        Some(header_row) => header_row
            .iter()
            .enumerate()
            .filter_map(|(idx, cell)| Column::from_header(&cell_text(cell)).map(|c| (c, idx)))
            .collect(),
        None => HashMap::new(),
    };

    // First-seen order: records live in the Vec, the map only indexes them.
    let mut records: Vec<InvoiceRecord> = Vec::new();
    let mut by_no: HashMap<String, usize> = HashMap::new();
    let mut skipped = 0usize;

    for row in rows {
        let field = |wanted: Column| -> String {
            columns
                .get(&wanted)
                .and_then(|idx| row.get(*idx))
                .map(cell_text)
                .unwrap_or_default()
        };

        let invoice_no = field(Column::InvoiceNo).trim().to_string();
        if invoice_no.is_empty() {
            skipped += 1;
            continue;
        }

        let idx = *by_no.entry(invoice_no.clone()).or_insert_with(|| {
            let mut record = InvoiceRecord::new(invoice_no.clone());
            record.invoice_date = field(Column::InvoiceDate);
            record.billing_period = field(Column::BillingPeriod);
            let currency = field(Column::Currency);
            if !currency.trim().is_empty() {
                record.currency = currency;
            }
            records.push(record);
            records.len() - 1
        });

        let amount = field(Column::ItemAmount);
        records[idx].items.push(LineItem {
            date: field(Column::ItemDate),
            description: field(Column::ItemDescription),
            amount: if amount.trim().is_empty() {
                "0".to_string()
            } else {
                amount
            },
        });
    }

    if skipped > 0 {
        debug!("Skipped {skipped} rows with empty invoice number");
    }
    info!(
        "Ingested {} invoices ({} line items)",
        records.len(),
        records.iter().map(|r| r.items.len()).sum::<usize>()
    );

    Ok(records)
}

/// Ingest a workbook from disk.
pub fn ingest_path(path: &Path) -> Result<Vec<InvoiceRecord>, Invoice2PdfError> {
    let bytes = std::fs::read(path).map_err(|e| Invoice2PdfError::ParseFailed {
        detail: format!("{}: {e}", path.display()),
    })?;
    ingest_bytes(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_matching_is_case_and_spacing_tolerant() {
        assert_eq!(Column::from_header("Invoice No"), Some(Column::InvoiceNo));
        assert_eq!(Column::from_header("INVOICENO"), Some(Column::InvoiceNo));
        assert_eq!(Column::from_header(" invoice_no "), Some(Column::InvoiceNo));
        assert_eq!(Column::from_header("Invoice Number"), Some(Column::InvoiceNo));
        assert_eq!(Column::from_header("Item Description"), Some(Column::ItemDescription));
        assert_eq!(Column::from_header("Billing  Period"), Some(Column::BillingPeriod));
        assert_eq!(Column::from_header("Comment"), None);
    }

    #[test]
    fn integral_floats_lose_the_trailing_zero() {
        assert_eq!(cell_text(&Data::Float(20260101.0)), "20260101");
        assert_eq!(cell_text(&Data::Float(10.5)), "10.5");
        assert_eq!(cell_text(&Data::Int(42)), "42");
        assert_eq!(cell_text(&Data::Empty), "");
        assert_eq!(cell_text(&Data::String("CNY".into())), "CNY");
    }

    #[test]
    fn garbage_bytes_fail_to_parse() {
        let err = ingest_bytes(b"this is not a workbook").unwrap_err();
        assert!(matches!(err, Invoice2PdfError::ParseFailed { .. }));
    }
}
