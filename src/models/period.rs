//! Academic-year periods and calendar-date helpers.

use core::fmt;
use core::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{CardError, Result};

/// Wire and cache format for calendar dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// One of the four academic years the overall span is split into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum YearLabel {
    /// First year.
    Freshman,
    /// Second year.
    Sophomore,
    /// Third year.
    Junior,
    /// Fourth year.
    Senior,
}

impl YearLabel {
    /// All labels in chronological order.
    pub const ALL: [Self; 4] = [Self::Freshman, Self::Sophomore, Self::Junior, Self::Senior];

    /// Returns the lowercase display name.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Freshman => "freshman",
            Self::Sophomore => "sophomore",
            Self::Junior => "junior",
            Self::Senior => "senior",
        }
    }

    /// Position of the label in [`YearLabel::ALL`].
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Freshman => 0,
            Self::Sophomore => 1,
            Self::Junior => 2,
            Self::Senior => 3,
        }
    }
}

impl fmt::Display for YearLabel {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for YearLabel {
    type Err = CardError;

    #[inline]
    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|label| label.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CardError::Config(format!("unknown year label: {s:?}")))
    }
}

/// Parses a `YYYY-MM-DD` calendar date.
///
/// # Errors
///
/// Returns [`CardError::InvalidDate`] if the string is not a valid date.
#[inline]
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|source| CardError::InvalidDate {
        value: value.to_owned(),
        source,
    })
}

/// Returns `true` if the string is a valid `YYYY-MM-DD` calendar date.
#[inline]
#[must_use]
pub fn is_valid_date(value: &str) -> bool {
    parse_date(value).is_ok()
}

/// Re-renders a date with zero-padded month and day (`2021-9-1` becomes
/// `2021-09-01`).
///
/// # Errors
///
/// Returns [`CardError::InvalidDate`] if the string is not a valid date.
#[inline]
pub fn normalize_date(value: &str) -> Result<String> {
    parse_date(value).map(|date| date.format(DATE_FORMAT).to_string())
}

/// An inclusive range of calendar dates with `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "UncheckedRange")]
pub struct DateRange {
    /// First day (inclusive).
    start: NaiveDate,
    /// Last day (inclusive).
    end: NaiveDate,
}

/// Deserialization shape for [`DateRange`] before validation.
#[derive(Deserialize)]
struct UncheckedRange {
    /// First day.
    start: NaiveDate,
    /// Last day.
    end: NaiveDate,
}

impl TryFrom<UncheckedRange> for DateRange {
    type Error = CardError;

    #[inline]
    fn try_from(value: UncheckedRange) -> Result<Self> {
        Self::new(value.start, value.end)
    }
}

impl DateRange {
    /// Creates a range.
    ///
    /// # Errors
    ///
    /// Returns [`CardError::InvalidRange`] if `end` is before `start`.
    #[inline]
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end < start {
            return Err(CardError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Parses a range from two `YYYY-MM-DD` strings.
    ///
    /// # Errors
    ///
    /// Returns an error if either date is invalid or the range is inverted.
    #[inline]
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Self::new(parse_date(start)?, parse_date(end)?)
    }

    /// First day of the range.
    #[inline]
    #[must_use]
    pub const fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last day of the range.
    #[inline]
    #[must_use]
    pub const fn end(&self) -> NaiveDate {
        self.end
    }
}

impl fmt::Display for DateRange {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

/// Builds a date from literal parts known to be valid.
fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN)
}

/// Default overall query span.
#[inline]
#[must_use]
pub fn default_span() -> DateRange {
    DateRange {
        start: ymd(2021, 8, 1),
        end: ymd(2024, 12, 31),
    }
}

/// One configured academic year, as written in the settings file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearEntry {
    /// Which year this entry configures.
    pub label: YearLabel,
    /// First day (inclusive).
    pub start: NaiveDate,
    /// Last day (inclusive).
    pub end: NaiveDate,
}

/// The date range of each of the four academic years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<YearEntry>", into = "Vec<YearEntry>")]
pub struct AcademicCalendar {
    /// Ranges indexed by [`YearLabel::index`].
    ranges: [DateRange; 4],
}

impl Default for AcademicCalendar {
    #[inline]
    fn default() -> Self {
        let year = |start: NaiveDate, end: NaiveDate| DateRange { start, end };
        Self {
            ranges: [
                year(ymd(2021, 9, 1), ymd(2022, 8, 31)),
                year(ymd(2022, 9, 1), ymd(2023, 8, 31)),
                year(ymd(2023, 9, 1), ymd(2024, 8, 31)),
                year(ymd(2024, 9, 1), ymd(2024, 12, 31)),
            ],
        }
    }
}

impl AcademicCalendar {
    /// Builds a calendar from explicit entries.
    ///
    /// Every label must appear exactly once.
    ///
    /// # Errors
    ///
    /// Returns [`CardError::Config`] for a missing or duplicated label and
    /// [`CardError::InvalidRange`] for an inverted range.
    #[inline]
    pub fn from_entries(entries: &[YearEntry]) -> Result<Self> {
        let mut ranges: [Option<DateRange>; 4] = [None; 4];
        for entry in entries {
            let slot = ranges
                .get_mut(entry.label.index())
                .ok_or_else(|| CardError::Config(format!("no slot for {}", entry.label)))?;
            if slot.is_some() {
                return Err(CardError::Config(format!(
                    "year {} configured more than once",
                    entry.label
                )));
            }
            *slot = Some(DateRange::new(entry.start, entry.end)?);
        }
        let mut resolved = Self::default().ranges;
        for (label, (target, configured)) in YearLabel::ALL
            .into_iter()
            .zip(resolved.iter_mut().zip(ranges))
        {
            *target = configured
                .ok_or_else(|| CardError::Config(format!("year {label} is not configured")))?;
        }
        Ok(Self { ranges: resolved })
    }

    /// Returns the range configured for `label`.
    #[inline]
    #[must_use]
    pub fn range(&self, label: YearLabel) -> DateRange {
        self.ranges
            .get(label.index())
            .copied()
            .unwrap_or_else(default_span)
    }

    /// Iterates `(label, range)` pairs in chronological order.
    #[inline]
    pub fn years(&self) -> impl Iterator<Item = (YearLabel, DateRange)> + '_ {
        YearLabel::ALL.into_iter().zip(self.ranges.iter().copied())
    }
}

impl TryFrom<Vec<YearEntry>> for AcademicCalendar {
    type Error = CardError;

    #[inline]
    fn try_from(value: Vec<YearEntry>) -> Result<Self> {
        Self::from_entries(&value)
    }
}

impl From<AcademicCalendar> for Vec<YearEntry> {
    #[inline]
    fn from(value: AcademicCalendar) -> Self {
        value
            .years()
            .map(|(label, range)| YearEntry {
                label,
                start: range.start,
                end: range.end,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_chronological() {
        let mut sorted = YearLabel::ALL;
        sorted.sort();
        assert_eq!(sorted, YearLabel::ALL);
        for (idx, label) in YearLabel::ALL.into_iter().enumerate() {
            assert_eq!(label.index(), idx);
        }
    }

    #[test]
    fn label_parse_is_case_insensitive() {
        assert_eq!("Junior".parse::<YearLabel>().unwrap(), YearLabel::Junior);
        assert!("fifth".parse::<YearLabel>().is_err());
    }

    #[test]
    fn label_serializes_lowercase() {
        let json = serde_json::to_string(&YearLabel::Sophomore).unwrap();
        assert_eq!(json, r#""sophomore""#);
    }

    #[test]
    fn date_validation() {
        assert!(is_valid_date("2024-02-29"));
        assert!(!is_valid_date("2023-02-29"));
        assert!(!is_valid_date("2024/01/01"));
        assert!(!is_valid_date(""));
    }

    #[test]
    fn normalize_pads_month_and_day() {
        assert_eq!(normalize_date("2021-9-1").unwrap(), "2021-09-01");
        assert_eq!(normalize_date("2024-12-31").unwrap(), "2024-12-31");
        assert!(normalize_date("31-12-2024").is_err());
    }

    #[test]
    fn range_rejects_inverted_bounds() {
        let err = DateRange::parse("2024-09-01", "2024-08-31").unwrap_err();
        assert!(matches!(err, CardError::InvalidRange { .. }));
        let single_day = DateRange::parse("2024-09-01", "2024-09-01").unwrap();
        assert_eq!(single_day.start(), single_day.end());
    }

    #[test]
    fn range_deserialization_validates() {
        let ok: DateRange =
            serde_json::from_str(r#"{"start":"2021-08-01","end":"2024-12-31"}"#).unwrap();
        assert_eq!(ok, default_span());
        let bad = serde_json::from_str::<DateRange>(r#"{"start":"2024-12-31","end":"2021-08-01"}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn default_calendar_matches_school_years() {
        let calendar = AcademicCalendar::default();
        let freshman = calendar.range(YearLabel::Freshman);
        assert_eq!(freshman.start().to_string(), "2021-09-01");
        assert_eq!(freshman.end().to_string(), "2022-08-31");
        let senior = calendar.range(YearLabel::Senior);
        assert_eq!(senior.start().to_string(), "2024-09-01");
        assert_eq!(senior.end().to_string(), "2024-12-31");
        assert_eq!(calendar.years().count(), 4);
    }

    #[test]
    fn calendar_requires_every_label_once() {
        let entries: Vec<YearEntry> = AcademicCalendar::default().into();
        let missing = entries.get(..3).unwrap();
        assert!(AcademicCalendar::from_entries(missing).is_err());

        let mut duplicated = entries.clone();
        duplicated.push(*entries.first().unwrap());
        assert!(AcademicCalendar::from_entries(&duplicated).is_err());

        assert_eq!(
            AcademicCalendar::from_entries(&entries).unwrap(),
            AcademicCalendar::default()
        );
    }

    #[test]
    fn calendar_json_roundtrip() {
        let json = serde_json::to_string(&AcademicCalendar::default()).unwrap();
        assert!(json.contains(r#""label":"freshman""#));
        let parsed: AcademicCalendar = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, AcademicCalendar::default());
    }
}
