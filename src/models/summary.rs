//! Aggregated spending shapes.

use alloc::collections::BTreeMap;

use serde::Serialize;

use super::{SkipReason, YearLabel};

/// Trimmed merchant name to total debit amount for one year.
pub type MerchantSpending = BTreeMap<String, f64>;

/// Merchant spending for each academic year.
pub type SpendingByYear = BTreeMap<YearLabel, MerchantSpending>;

/// Merchant name to per-year amounts, every year present for every
/// merchant.
pub type MerchantTable = BTreeMap<String, BTreeMap<YearLabel, f64>>;

/// Number of records skipped during aggregation, by reason.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SkipCounts {
    /// Records without a numeric amount.
    pub missing_amount: usize,
    /// Debits without a merchant name.
    pub missing_merchant: usize,
}

impl SkipCounts {
    /// Counts one skipped record.
    #[inline]
    pub const fn record(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::MissingAmount => self.missing_amount += 1,
            SkipReason::MissingMerchant => self.missing_merchant += 1,
        }
    }

    /// Total skipped records.
    #[inline]
    #[must_use]
    pub const fn total(&self) -> usize {
        self.missing_amount + self.missing_merchant
    }
}

/// Per-year totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct YearSummary {
    /// Sum of the year's merchant totals, rounded to cents.
    pub amount: f64,
    /// Number of distinct merchants with spending (not transactions).
    pub count: usize,
}

/// One merchant's spending across all years.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MerchantRow {
    /// Merchant name.
    pub merchant: String,
    /// Amount per year, zero where the merchant had no spending.
    pub by_year: BTreeMap<YearLabel, f64>,
    /// Sum across years.
    pub total: f64,
}

impl MerchantRow {
    /// Amount for `label`, zero when absent.
    #[inline]
    #[must_use]
    pub fn amount(&self, label: YearLabel) -> f64 {
        self.by_year.get(&label).copied().unwrap_or_default()
    }
}

/// Figures printed in the merchant chart's summary block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ChartSummary {
    /// Merchants appearing in any year.
    pub distinct_merchants: usize,
    /// Sum of per-year merchant counts.
    pub merchant_entries: usize,
    /// Total spend across all years, rounded to one decimal.
    pub total_spend: f64,
}
