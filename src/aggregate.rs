//! Spending aggregation by merchant and academic year.
//!
//! Only debits count as spending. Credits are tallied and otherwise
//! ignored; records that cannot be classified are skipped and counted by
//! reason instead of aborting the year.

use alloc::collections::BTreeMap;

use crate::fetcher::RecordSource;
use crate::models::{
    AcademicCalendar, ChartSummary, MerchantRow, MerchantSpending, MerchantTable, RawRecord,
    RecordKind, SkipCounts, SpendingByYear, YearLabel, YearSummary, classify,
};

/// Result of aggregating one list of records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregation {
    /// Merchant totals rounded to cents.
    pub spending: MerchantSpending,
    /// Debit records summed into `spending`.
    pub debits: usize,
    /// Non-negative records ignored.
    pub credits: usize,
    /// Records that could not be classified.
    pub skipped: SkipCounts,
}

/// Aggregation of every academic year.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct YearlyAggregation {
    /// Per-year results in chronological order.
    pub years: BTreeMap<YearLabel, Aggregation>,
}

impl YearlyAggregation {
    /// Merchant spending of every year.
    #[inline]
    #[must_use]
    pub fn spending_by_year(&self) -> SpendingByYear {
        self.years
            .iter()
            .map(|(&label, aggregation)| (label, aggregation.spending.clone()))
            .collect()
    }

    /// Consumes the aggregation, keeping only the merchant spending.
    #[inline]
    #[must_use]
    pub fn into_spending_by_year(self) -> SpendingByYear {
        self.years
            .into_iter()
            .map(|(label, aggregation)| (label, aggregation.spending))
            .collect()
    }

    /// Skip counts summed over all years.
    #[inline]
    #[must_use]
    pub fn total_skipped(&self) -> SkipCounts {
        self.years
            .values()
            .fold(SkipCounts::default(), |acc, aggregation| SkipCounts {
                missing_amount: acc.missing_amount + aggregation.skipped.missing_amount,
                missing_merchant: acc.missing_merchant + aggregation.skipped.missing_merchant,
            })
    }
}

/// Rounds to `places` decimal places. Halves go to the even neighbour, so
/// an exact `0.125` becomes `0.12`.
fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10.0_f64.powi(places);
    (value * factor).round_ties_even() / factor
}

/// Sums debits per trimmed merchant name.
#[inline]
#[must_use]
pub fn aggregate(records: &[RawRecord]) -> Aggregation {
    let mut result = Aggregation::default();
    for record in records {
        match classify(record) {
            Ok(RecordKind::Debit { merchant, amount }) => {
                *result.spending.entry(merchant.to_owned()).or_default() += amount;
                result.debits += 1;
            }
            Ok(RecordKind::Credit) => result.credits += 1,
            Err(reason) => result.skipped.record(reason),
        }
    }
    for total in result.spending.values_mut() {
        *total = round_to(*total, 2);
    }
    result
}

/// Fetches and aggregates each academic year independently.
///
/// A year whose fetch failed comes back from the source empty and stays
/// empty here; it is not retried.
#[inline]
pub fn aggregate_by_year<S: RecordSource + ?Sized>(
    source: &S,
    calendar: &AcademicCalendar,
    use_cache: bool,
) -> YearlyAggregation {
    let years = calendar
        .years()
        .map(|(label, range)| {
            tracing::info!(year = %label, range = %range, "aggregating year");
            let records = source.records(&range, use_cache);
            let aggregation = aggregate(&records);
            if aggregation.skipped.total() > 0 {
                tracing::warn!(
                    year = %label,
                    missing_amount = aggregation.skipped.missing_amount,
                    missing_merchant = aggregation.skipped.missing_merchant,
                    "skipped malformed records"
                );
            }
            tracing::debug!(
                year = %label,
                records = records.len(),
                merchants = aggregation.spending.len(),
                "year aggregated"
            );
            (label, aggregation)
        })
        .collect();
    YearlyAggregation { years }
}

/// Total amount and distinct-merchant count of each year.
///
/// `count` is the number of merchants with spending, not the number of
/// transactions.
#[inline]
#[must_use]
pub fn summarize_by_year(spending: &SpendingByYear) -> BTreeMap<YearLabel, YearSummary> {
    spending
        .iter()
        .map(|(&label, merchants)| {
            let summary = YearSummary {
                amount: round_to(merchants.values().sum(), 2),
                count: merchants.len(),
            };
            (label, summary)
        })
        .collect()
}

/// Pivots per-year maps into merchant rows, filling absent years with zero.
#[inline]
#[must_use]
pub fn merge_by_merchant(spending: &SpendingByYear) -> MerchantTable {
    let mut table = MerchantTable::new();
    for (&label, merchants) in spending {
        for (merchant, &amount) in merchants {
            _ = table
                .entry(merchant.clone())
                .or_default()
                .insert(label, amount);
        }
    }
    for by_year in table.values_mut() {
        for &label in spending.keys() {
            _ = by_year.entry(label).or_insert(0.0);
        }
    }
    table
}

/// Merchant rows in ascending order of cross-year total. Equal totals keep
/// merchant-name order.
#[inline]
#[must_use]
pub fn rank_merchants(table: &MerchantTable) -> Vec<MerchantRow> {
    let mut rows: Vec<MerchantRow> = table
        .iter()
        .map(|(merchant, by_year)| MerchantRow {
            merchant: merchant.clone(),
            total: by_year.values().sum(),
            by_year: by_year.clone(),
        })
        .collect();
    rows.sort_by(|left, right| left.total.total_cmp(&right.total));
    rows
}

/// Figures for the merchant chart's summary block.
#[inline]
#[must_use]
pub fn chart_summary(spending: &SpendingByYear) -> ChartSummary {
    let total: f64 = spending.values().flat_map(|merchants| merchants.values()).sum();
    ChartSummary {
        distinct_merchants: merge_by_merchant(spending).len(),
        merchant_entries: spending.values().map(BTreeMap::len).sum(),
        total_spend: round_to(total, 1),
    }
}

/// Years with no spending at all, including years absent from the map.
#[inline]
#[must_use]
pub fn missing_years(spending: &SpendingByYear) -> Vec<YearLabel> {
    YearLabel::ALL
        .into_iter()
        .filter(|label| spending.get(label).is_none_or(BTreeMap::is_empty))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DateRange;
    use serde_json::json;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    fn spending(entries: &[(&str, f64)]) -> MerchantSpending {
        entries
            .iter()
            .map(|&(merchant, amount)| (merchant.to_owned(), amount))
            .collect()
    }

    /// Serves fixed records per year start date.
    struct StubSource {
        /// Records keyed by the range start.
        by_start: BTreeMap<String, Vec<RawRecord>>,
    }

    impl RecordSource for StubSource {
        fn records(&self, range: &DateRange, _use_cache: bool) -> Vec<RawRecord> {
            self.by_start
                .get(&range.start().to_string())
                .cloned()
                .unwrap_or_default()
        }
    }

    #[test]
    fn trims_and_sums_merchants() {
        let records = [
            json!({"TRANAMT": -10, "MERCNAME": "A "}),
            json!({"TRANAMT": -5, "MERCNAME": "A"}),
        ];
        let result = aggregate(&records);
        assert_eq!(result.spending.len(), 1);
        assert_close(result.spending["A"], 15.0);
        assert_eq!(result.debits, 2);
    }

    #[test]
    fn ignores_credits() {
        let records = [
            json!({"TRANAMT": 50, "MERCNAME": "Top-up"}),
            json!({"TRANAMT": 0, "MERCNAME": "Zero"}),
            json!({"TRANAMT": -2.5, "MERCNAME": "Shop"}),
        ];
        let result = aggregate(&records);
        assert_eq!(result.spending, spending(&[("Shop", 2.5)]));
        assert_eq!(result.credits, 2);
        assert_eq!(result.skipped.total(), 0);
    }

    #[test]
    fn counts_malformed_records_without_failing() {
        let records = [
            json!({"MERCNAME": "No amount"}),
            json!({"TRANAMT": "-3", "MERCNAME": "String amount"}),
            json!({"TRANAMT": -3}),
            json!(null),
            json!({"TRANAMT": -1, "MERCNAME": "Ok"}),
        ];
        let result = aggregate(&records);
        assert_eq!(result.spending, spending(&[("Ok", 1.0)]));
        assert_eq!(result.skipped.missing_amount, 3);
        assert_eq!(result.skipped.missing_merchant, 1);
    }

    #[test]
    fn rounds_totals_to_cents() {
        let records = [
            json!({"TRANAMT": -0.1, "MERCNAME": "Tea"}),
            json!({"TRANAMT": -0.2, "MERCNAME": "Tea"}),
            json!({"TRANAMT": -1.005, "MERCNAME": "Odd"}),
        ];
        let result = aggregate(&records);
        assert_close(result.spending["Tea"], 0.3);
        let odd = result.spending["Odd"];
        assert!((odd - 1.0).abs() < 1e-9 || (odd - 1.01).abs() < 1e-9);
    }

    #[test]
    fn exact_halves_round_to_even_cent() {
        let records = [
            json!({"TRANAMT": -0.125, "MERCNAME": "Even down"}),
            json!({"TRANAMT": -0.375, "MERCNAME": "Even up"}),
        ];
        let result = aggregate(&records);
        assert_close(result.spending["Even down"], 0.12);
        assert_close(result.spending["Even up"], 0.38);
    }

    #[test]
    fn empty_input_gives_empty_map() {
        assert_eq!(aggregate(&[]), Aggregation::default());
    }

    #[test]
    fn count_is_distinct_merchants_not_transactions() {
        let records = [
            json!({"TRANAMT": -4, "MERCNAME": "Canteen"}),
            json!({"TRANAMT": -6, "MERCNAME": "Canteen"}),
            json!({"TRANAMT": -5, "MERCNAME": " Canteen "}),
        ];
        let by_year = SpendingByYear::from([(YearLabel::Freshman, aggregate(&records).spending)]);
        let summary = summarize_by_year(&by_year);
        assert_eq!(summary[&YearLabel::Freshman].count, 1);
        assert_close(summary[&YearLabel::Freshman].amount, 15.0);
    }

    #[test]
    fn empty_years_summarize_to_zero() {
        let by_year: SpendingByYear = YearLabel::ALL
            .into_iter()
            .map(|label| (label, MerchantSpending::new()))
            .collect();
        let summary = summarize_by_year(&by_year);
        assert_eq!(summary.len(), 4);
        for year in summary.values() {
            assert_eq!(*year, YearSummary::default());
        }
        assert_eq!(missing_years(&by_year), YearLabel::ALL.to_vec());
    }

    #[test]
    fn merge_zero_fills_absent_years() {
        let by_year = SpendingByYear::from([
            (YearLabel::Freshman, spending(&[("A", 10.0)])),
            (YearLabel::Sophomore, spending(&[("B", 5.0)])),
        ]);
        let expected = MerchantTable::from([
            (
                "A".to_owned(),
                BTreeMap::from([(YearLabel::Freshman, 10.0), (YearLabel::Sophomore, 0.0)]),
            ),
            (
                "B".to_owned(),
                BTreeMap::from([(YearLabel::Freshman, 0.0), (YearLabel::Sophomore, 5.0)]),
            ),
        ]);
        assert_eq!(merge_by_merchant(&by_year), expected);
    }

    #[test]
    fn rank_orders_by_total_ascending() {
        let by_year = SpendingByYear::from([
            (
                YearLabel::Freshman,
                spending(&[("Big", 30.0), ("Small", 1.0), ("Mid", 5.0)]),
            ),
            (YearLabel::Junior, spending(&[("Small", 2.0), ("Mid", 10.0)])),
        ]);
        let rows = rank_merchants(&merge_by_merchant(&by_year));
        let names: Vec<&str> = rows.iter().map(|row| row.merchant.as_str()).collect();
        assert_eq!(names, ["Small", "Mid", "Big"]);
        assert_close(rows[1].total, 15.0);
        assert_close(rows[0].amount(YearLabel::Junior), 2.0);
        assert_close(rows[2].amount(YearLabel::Junior), 0.0);
    }

    #[test]
    fn rank_breaks_ties_by_name() {
        let by_year =
            SpendingByYear::from([(YearLabel::Senior, spending(&[("b", 3.0), ("a", 3.0)]))]);
        let rows = rank_merchants(&merge_by_merchant(&by_year));
        assert_eq!(rows[0].merchant, "a");
        assert_eq!(rows[1].merchant, "b");
    }

    #[test]
    fn chart_summary_counts_entries_across_years() {
        let by_year = SpendingByYear::from([
            (YearLabel::Freshman, spending(&[("A", 10.04), ("B", 2.0)])),
            (YearLabel::Sophomore, spending(&[("A", 3.0)])),
        ]);
        let summary = chart_summary(&by_year);
        assert_eq!(summary.distinct_merchants, 2);
        assert_eq!(summary.merchant_entries, 3);
        assert_close(summary.total_spend, 15.0);
    }

    #[test]
    fn missing_years_lists_empty_and_absent() {
        let by_year = SpendingByYear::from([
            (YearLabel::Freshman, spending(&[("A", 1.0)])),
            (YearLabel::Sophomore, MerchantSpending::new()),
            (YearLabel::Junior, spending(&[("B", 1.0)])),
        ]);
        assert_eq!(
            missing_years(&by_year),
            vec![YearLabel::Sophomore, YearLabel::Senior]
        );
    }

    #[test]
    fn aggregate_by_year_covers_calendar() {
        let source = StubSource {
            by_start: BTreeMap::from([
                (
                    "2021-09-01".to_owned(),
                    vec![json!({"TRANAMT": -3, "MERCNAME": "A"})],
                ),
                (
                    "2023-09-01".to_owned(),
                    vec![
                        json!({"TRANAMT": -4, "MERCNAME": "B"}),
                        json!({"TRANAMT": -1}),
                    ],
                ),
            ]),
        };
        let yearly = aggregate_by_year(&source, &AcademicCalendar::default(), true);
        assert_eq!(yearly.years.len(), 4);

        let by_year = yearly.spending_by_year();
        assert_eq!(by_year[&YearLabel::Freshman], spending(&[("A", 3.0)]));
        assert!(by_year[&YearLabel::Sophomore].is_empty());
        assert_eq!(by_year[&YearLabel::Junior], spending(&[("B", 4.0)]));
        assert!(by_year[&YearLabel::Senior].is_empty());
        assert_eq!(yearly.total_skipped().missing_merchant, 1);
        assert_eq!(
            missing_years(&yearly.into_spending_by_year()),
            vec![YearLabel::Sophomore, YearLabel::Senior]
        );
    }
}
