//! Data models for campus-card transactions and spending summaries.
//!
//! Raw records are kept as untyped JSON so they can be cached exactly as
//! received; [`classify`] gives the typed view the aggregator needs.

mod period;
mod record;
mod summary;

pub use chrono::NaiveDate;
pub use period::{
    AcademicCalendar, DATE_FORMAT, DateRange, YearEntry, YearLabel, default_span, is_valid_date,
    normalize_date, parse_date,
};
pub use record::{AMOUNT_FIELD, MERCHANT_FIELD, RawRecord, RecordKind, SkipReason, classify};
pub use summary::{
    ChartSummary, MerchantRow, MerchantSpending, MerchantTable, SkipCounts, SpendingByYear,
    YearSummary,
};
