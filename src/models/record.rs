//! Transaction record view.

use serde_json::Value;

/// A transaction row exactly as the report service returned it.
pub type RawRecord = Value;

/// Field holding the signed amount (negative for debits).
pub const AMOUNT_FIELD: &str = "TRANAMT";

/// Field holding the merchant name.
pub const MERCHANT_FIELD: &str = "MERCNAME";

/// Why a record could not be aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SkipReason {
    /// The amount field is absent or not a JSON number.
    MissingAmount,
    /// A debit has no string merchant name.
    MissingMerchant,
}

/// What a single raw record contributes to spending.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecordKind<'rec> {
    /// Money spent at a merchant.
    Debit {
        /// Merchant name with surrounding whitespace removed.
        merchant: &'rec str,
        /// Absolute amount spent.
        amount: f64,
    },
    /// A top-up, refund, or any other non-negative amount.
    Credit,
}

/// Classifies a raw record.
///
/// The merchant is only inspected for debits, so a credit without a
/// merchant name is still a valid credit.
///
/// # Errors
///
/// Returns the [`SkipReason`] when the record lacks a usable amount or a
/// debit lacks a merchant name.
#[inline]
pub fn classify(record: &RawRecord) -> Result<RecordKind<'_>, SkipReason> {
    let amount = record
        .get(AMOUNT_FIELD)
        .and_then(Value::as_f64)
        .ok_or(SkipReason::MissingAmount)?;
    if amount >= 0.0_f64 {
        return Ok(RecordKind::Credit);
    }
    let merchant = record
        .get(MERCHANT_FIELD)
        .and_then(Value::as_str)
        .ok_or(SkipReason::MissingMerchant)?;
    Ok(RecordKind::Debit {
        merchant: merchant.trim(),
        amount: amount.abs(),
    })
}
