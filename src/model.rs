//! Core invoice data model.
//!
//! An [`InvoiceRecord`] is a transient value: constructed during ingestion,
//! owned by exactly one batch run, and discarded once its document has been
//! produced. Line items are owned by containment — there is no sharing and
//! no shared mutable "current invoice" slot anywhere in the crate; records
//! are passed by value (or by `&`) into a pure render function.

use crate::pipeline::aggregate;
use serde::{Deserialize, Serialize};

/// One billable line on an invoice.
///
/// All fields are display strings. `amount` holds a decimal number as text,
/// possibly with comma thousands separators; it is parsed only during
/// aggregation, never during ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub amount: String,
}

/// One invoice to be produced.
///
/// `invoice_no` uniquely identifies a record within one ingestion batch and
/// doubles as the output filename stem. `total` is always derivable from
/// `items`; call [`InvoiceRecord::recompute_total`] after any item change
/// and before rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceRecord {
    pub invoice_no: String,
    #[serde(default)]
    pub invoice_date: String,
    #[serde(default)]
    pub billing_period: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub total: String,
}

fn default_currency() -> String {
    "USD".to_string()
}

impl InvoiceRecord {
    /// Create an empty record for the given invoice number with defaults.
    pub fn new(invoice_no: impl Into<String>) -> Self {
        Self {
            invoice_no: invoice_no.into(),
            invoice_date: String::new(),
            billing_period: String::new(),
            currency: default_currency(),
            items: Vec::new(),
            total: String::new(),
        }
    }

    /// Re-derive `total` from the current item sequence.
    pub fn recompute_total(&mut self) {
        self.total = aggregate::total_amount(&self.items);
    }

    /// A record is valid only with a non-empty invoice number.
    pub fn is_valid(&self) -> bool {
        !self.invoice_no.trim().is_empty()
    }
}

/// The fixed page chrome surrounding the per-invoice data.
///
/// A company header, a bank-details block and a footer, kept as
/// configuration with neutral defaults so the rendered page has a complete
/// structure without baked-in business data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandProfile {
    /// Company name shown next to the logo in the page header.
    pub company_name: String,
    /// Free-form lines printed in the details block below the item table
    /// (bank account, addresses, SWIFT code and so on).
    pub detail_lines: Vec<String>,
    /// Contact line printed in the footer.
    pub footer_note: String,
}

impl Default for BrandProfile {
    fn default() -> Self {
        Self {
            company_name: "EXAMPLE TECHNOLOGY LIMITED".to_string(),
            detail_lines: vec![
                "Bank Details:".to_string(),
                "Account Name: EXAMPLE TECHNOLOGY LIMITED".to_string(),
                "Account Number: 0000 0000 00".to_string(),
                "Beneficiary Bank: Example Bank N.A.".to_string(),
                "SWIFT Code: EXAMHKXXXX".to_string(),
            ],
            footer_note:
                "If you have any questions concerning this invoice, contact finance@example.com"
                    .to_string(),
        }
    }
}
