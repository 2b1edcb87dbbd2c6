//! PNG charts of the aggregated spending.
//!
//! Two independent renderers: a stacked horizontal bar chart of every
//! merchant split by academic year, and a dual-axis chart of yearly totals
//! and merchant counts. Layout is computed up front so it can be tested
//! without rasterising anything.

mod merchant;
mod trend;

use plotters::style::RGBColor;

use crate::config::{DEFAULT_FONT_FAMILY, Settings};
use crate::error::CardError;
use crate::models::YearLabel;

pub use merchant::{BarSegment, MerchantLayout, render_merchant_chart};
pub use trend::{TrendLayout, render_trend_chart};

/// Segment colour of each academic year, in [`YearLabel::ALL`] order.
pub const YEAR_COLORS: [RGBColor; 4] = [
    RGBColor(0x66, 0xc2, 0xa5),
    RGBColor(0xfc, 0x8d, 0x62),
    RGBColor(0x8d, 0xa0, 0xcb),
    RGBColor(0xe7, 0x8a, 0xc3),
];

/// Bar colour of the trend chart's amount series.
pub const AMOUNT_COLOR: RGBColor = RGBColor(0x66, 0xc2, 0xa5);

/// Line colour of the trend chart's merchant-count series.
pub const COUNT_COLOR: RGBColor = RGBColor(0xfc, 0x8d, 0x62);

/// Pixels of the merchant chart taken by caption, axis and margins.
const MERCHANT_CHROME_PX: u32 = 160;

/// Headroom above the largest value on every value axis.
const AXIS_HEADROOM: f64 = 1.2;

/// Fonts and pixel sizes shared by both charts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartStyle {
    /// Font family for all chart text.
    pub font_family: String,
    /// Width of the merchant chart.
    pub merchant_width: u32,
    /// Pixels per merchant row.
    pub row_height: u32,
    /// Lower bound on the merchant chart height.
    pub min_merchant_height: u32,
    /// Width of the merchant-name axis.
    pub merchant_label_area: i32,
    /// Width and height of the trend chart.
    pub trend_size: (u32, u32),
    /// Font size of tick labels and value annotations.
    pub label_font_size: u32,
}

impl Default for ChartStyle {
    #[inline]
    fn default() -> Self {
        Self {
            font_family: DEFAULT_FONT_FAMILY.to_owned(),
            merchant_width: 1600,
            row_height: 18,
            min_merchant_height: 600,
            merchant_label_area: 280,
            trend_size: (1200, 600),
            label_font_size: 12,
        }
    }
}

impl ChartStyle {
    /// Default style with the font family from `settings`.
    #[inline]
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            font_family: settings.font_family.clone(),
            ..Self::default()
        }
    }

    /// Height of a merchant chart with `rows` merchants.
    #[inline]
    #[must_use]
    pub fn merchant_height(&self, rows: usize) -> u32 {
        let row_count = u32::try_from(rows).unwrap_or(u32::MAX);
        self.row_height
            .saturating_mul(row_count)
            .saturating_add(MERCHANT_CHROME_PX)
            .max(self.min_merchant_height)
    }
}

/// Colour of `label`'s segments.
#[inline]
#[must_use]
pub fn year_color(label: YearLabel) -> RGBColor {
    YEAR_COLORS
        .get(label.index())
        .copied()
        .unwrap_or(RGBColor(0, 0, 0))
}

/// Upper bound of a value axis whose largest value is `max`.
const fn axis_max(max: f64) -> f64 {
    if max > 0.0_f64 { max * AXIS_HEADROOM } else { 1.0 }
}

/// Chart coordinate of the `idx`-th category.
#[allow(
    clippy::cast_precision_loss,
    reason = "category counts are far below 2^52"
)]
const fn index_to_f64(idx: usize) -> f64 {
    idx as f64
}

/// Category index at chart coordinate `value`, if it sits on a tick.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "value is rounded and checked to be a non-negative integer first"
)]
fn f64_to_index(value: f64) -> Option<usize> {
    let nearest = value.round();
    if nearest < 0.0_f64 || (value - nearest).abs() > 0.05_f64 {
        return None;
    }
    Some(nearest as usize)
}

/// Pixel offset at `fraction` of `extent`.
#[allow(
    clippy::cast_possible_truncation,
    reason = "chart extents fit comfortably in i32"
)]
fn pixel_at(extent: u32, fraction: f64) -> i32 {
    (f64::from(extent) * fraction).round() as i32
}

/// Annotation text of an amount.
fn format_amount(value: f64) -> String {
    format!("{value:.2}")
}

/// Converts a drawing failure into a [`CardError::Chart`].
#[allow(clippy::needless_pass_by_value, reason = "used as a map_err adapter")]
fn chart_error(err: Box<dyn core::error::Error>) -> CardError {
    CardError::Chart(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_year_has_its_own_color() {
        let colors: Vec<RGBColor> = YearLabel::ALL.into_iter().map(year_color).collect();
        for (idx, color) in colors.iter().enumerate() {
            assert!(!colors.iter().skip(idx + 1).any(|other| other == color));
        }
        assert_eq!(year_color(YearLabel::Freshman), AMOUNT_COLOR);
        assert_eq!(year_color(YearLabel::Sophomore), COUNT_COLOR);
    }

    #[test]
    fn merchant_height_grows_with_rows() {
        let style = ChartStyle::default();
        assert_eq!(style.merchant_height(0), 600);
        assert_eq!(style.merchant_height(100), 100 * 18 + 160);
        assert!(style.merchant_height(usize::MAX) > 0);
    }

    #[test]
    fn axis_max_leaves_headroom() {
        assert!((axis_max(100.0) - 120.0).abs() < 1e-9);
        assert!((axis_max(0.0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn tick_to_index() {
        assert_eq!(f64_to_index(3.0), Some(3));
        assert_eq!(f64_to_index(2.999_999), Some(3));
        assert_eq!(f64_to_index(2.5), None);
        assert_eq!(f64_to_index(-1.0), None);
    }

    #[test]
    fn pixel_fraction() {
        assert_eq!(pixel_at(1000, 0.8), 800);
        assert_eq!(pixel_at(0, 0.5), 0);
    }

    #[test]
    fn style_takes_font_from_settings() {
        let settings = Settings {
            font_family: "Noto Sans CJK SC".to_owned(),
            ..Settings::default()
        };
        assert_eq!(
            ChartStyle::from_settings(&settings).font_family,
            "Noto Sans CJK SC"
        );
    }

    #[test]
    fn amounts_show_cents() {
        assert_eq!(format_amount(12.5), "12.50");
    }
}
