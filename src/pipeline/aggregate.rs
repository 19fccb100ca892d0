//! Aggregation: derive an invoice's display total from its line items.
//!
//! ## Why decimals, not floats?
//!
//! Monetary sums of comma-grouped text amounts are exactly what binary
//! floats get subtly wrong (`0.1 + 0.2`). `rust_decimal` keeps every cent
//! exact through the sum, and rounding happens once, at formatting time.
//!
//! ## Lenient by design
//!
//! An unparseable amount cell counts as zero and the batch continues. One
//! bad cell must not drop the whole invoice — the invoice itself is still
//! produced, with the remaining items summed. Skips are logged at debug so
//! they are diagnosable without failing anything.

use crate::model::LineItem;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;
use tracing::debug;

/// Compute the display-ready total for an ordered item sequence.
///
/// Pure: the same items always yield the same string. The empty sequence
/// yields `"0.00"`.
pub fn total_amount(items: &[LineItem]) -> String {
    let sum: Decimal = items.iter().map(|item| parse_amount(&item.amount)).sum();
    format_amount(sum)
}

/// Parse one raw amount cell, tolerating comma separators and garbage.
fn parse_amount(raw: &str) -> Decimal {
    let cleaned: String = raw.trim().chars().filter(|&c| c != ',').collect();
    if cleaned.is_empty() {
        return Decimal::ZERO;
    }
    match Decimal::from_str(&cleaned) {
        Ok(value) => value,
        Err(_) => {
            debug!("Unparseable amount {raw:?} treated as 0");
            Decimal::ZERO
        }
    }
}

/// Format a decimal with exactly two fractional digits and comma thousands
/// grouping, e.g. `1234.5` → `"1,234.50"`.
pub fn format_amount(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded.is_sign_negative();
    let abs = rounded.abs();

    let units = abs.trunc().to_i128().unwrap_or(0);
    let cents = ((abs - abs.trunc()) * Decimal::ONE_HUNDRED)
        .round()
        .to_i128()
        .unwrap_or(0);

    let mut grouped = String::new();
    let digits = units.to_string();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if negative && (units != 0 || cents != 0) { "-" } else { "" };
    format!("{sign}{grouped}.{cents:02}")
}
