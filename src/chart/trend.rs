//! Yearly spending bars with the merchant count on a second axis.

use alloc::collections::BTreeMap;
use std::path::Path;

use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use super::{
    AMOUNT_COLOR, COUNT_COLOR, ChartStyle, axis_max, chart_error, f64_to_index, format_amount,
    index_to_f64,
};
use crate::error::{CardError, Result};
use crate::models::{YearLabel, YearSummary};

/// Half the width of a yearly bar, in categories.
const BAR_HALF_WIDTH: f64 = 0.3;

/// Radius of the count markers.
const MARKER_RADIUS: i32 = 4;

/// Geometry of the trend chart, one category per year.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendLayout {
    /// Years in chronological order.
    pub years: Vec<YearLabel>,
    /// Spending of each year.
    pub amounts: Vec<f64>,
    /// Merchant count of each year.
    pub counts: Vec<usize>,
    /// Upper bound of the amount axis.
    pub amount_max: f64,
    /// Upper bound of the count axis.
    pub count_max: f64,
}

impl TrendLayout {
    /// Lays out the categories for `summaries`.
    ///
    /// # Errors
    ///
    /// Returns [`CardError::NoData`] if `summaries` is empty.
    #[inline]
    pub fn new(summaries: &BTreeMap<YearLabel, YearSummary>) -> Result<Self> {
        if summaries.is_empty() {
            return Err(CardError::NoData);
        }
        let years: Vec<YearLabel> = summaries.keys().copied().collect();
        let amounts: Vec<f64> = summaries.values().map(|summary| summary.amount).collect();
        let counts: Vec<usize> = summaries.values().map(|summary| summary.count).collect();
        let amount_max = axis_max(amounts.iter().copied().fold(0.0_f64, f64::max));
        let count_max = axis_max(index_to_f64(counts.iter().copied().max().unwrap_or(0)));
        Ok(Self {
            years,
            amounts,
            counts,
            amount_max,
            count_max,
        })
    }

    /// Year at chart coordinate `value`.
    #[inline]
    #[must_use]
    pub fn year_at(&self, value: f64) -> Option<YearLabel> {
        f64_to_index(value).and_then(|idx| self.years.get(idx).copied())
    }

    /// Points of the count line.
    #[inline]
    #[must_use]
    pub fn count_points(&self) -> Vec<(f64, f64)> {
        self.counts
            .iter()
            .enumerate()
            .map(|(idx, &count)| (index_to_f64(idx), index_to_f64(count)))
            .collect()
    }
}

/// Draws the trend chart for `summaries` to a PNG at `path`.
///
/// # Errors
///
/// Returns [`CardError::NoData`] if there is nothing to draw and
/// [`CardError::Chart`] if rendering or writing the file fails.
#[inline]
#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn render_trend_chart(
    path: &Path,
    summaries: &BTreeMap<YearLabel, YearSummary>,
    style: &ChartStyle,
) -> Result<()> {
    let layout = TrendLayout::new(summaries)?;
    draw(path, &layout, style).map_err(chart_error)?;
    tracing::info!(years = layout.years.len(), "trend chart written");
    Ok(())
}

/// Rasterises `layout` into a PNG at `path`.
fn draw(
    path: &Path,
    layout: &TrendLayout,
    style: &ChartStyle,
) -> core::result::Result<(), Box<dyn core::error::Error>> {
    let family = style.font_family.as_str();
    let label_font = (family, style.label_font_size).into_font();
    let categories = -0.5..(index_to_f64(layout.years.len()) - 0.5);

    let root = BitMapBackend::new(path, style.trend_size).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Yearly spending and merchant count", (family, 26.0_f64))
        .margin(20_i32)
        .x_label_area_size(50_i32)
        .y_label_area_size(80_i32)
        .right_y_label_area_size(80_i32)
        .build_cartesian_2d(categories.clone(), 0.0..layout.amount_max)?
        .set_secondary_coord(categories, 0.0..layout.count_max);

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(layout.years.len() + 1)
        .x_label_formatter(&|value: &f64| {
            layout
                .year_at(*value)
                .map(|year| year.as_str().to_owned())
                .unwrap_or_default()
        })
        .x_desc("Academic year")
        .y_desc("Amount (CNY)")
        .label_style(label_font.clone())
        .axis_desc_style((family, 16.0_f64))
        .draw()?;

    chart
        .configure_secondary_axes()
        .y_desc("Merchants")
        .label_style(label_font.clone())
        .axis_desc_style((family, 16.0_f64))
        .draw()?;

    _ = chart
        .draw_series(layout.amounts.iter().enumerate().map(|(idx, &amount)| {
            let x = index_to_f64(idx);
            Rectangle::new(
                [(x - BAR_HALF_WIDTH, 0.0_f64), (x + BAR_HALF_WIDTH, amount)],
                AMOUNT_COLOR.filled(),
            )
        }))?
        .label("Amount")
        .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 12, y + 5)], AMOUNT_COLOR.filled()));

    let above = TextStyle::from(label_font).pos(Pos::new(HPos::Center, VPos::Bottom));
    _ = chart.draw_series(layout.amounts.iter().enumerate().map(|(idx, &amount)| {
        Text::new(format_amount(amount), (index_to_f64(idx), amount), above.clone())
    }))?;

    let points = layout.count_points();
    _ = chart
        .draw_secondary_series(LineSeries::new(
            points.iter().copied(),
            COUNT_COLOR.stroke_width(2),
        ))?
        .label("Merchants")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], COUNT_COLOR.stroke_width(2)));
    _ = chart.draw_secondary_series(
        points
            .iter()
            .map(|&point| Circle::new(point, MARKER_RADIUS, COUNT_COLOR.filled())),
    )?;
    _ = chart.draw_secondary_series(
        points
            .iter()
            .map(|&(x, y)| Text::new(format!("{y:.0}"), (x, y), above.clone())),
    )?;

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summaries() -> BTreeMap<YearLabel, YearSummary> {
        BTreeMap::from([
            (
                YearLabel::Freshman,
                YearSummary {
                    amount: 1200.5,
                    count: 12,
                },
            ),
            (
                YearLabel::Sophomore,
                YearSummary {
                    amount: 800.0,
                    count: 20,
                },
            ),
        ])
    }

    #[test]
    fn categories_follow_year_order() {
        let layout = TrendLayout::new(&summaries()).unwrap();
        assert_eq!(layout.years, [YearLabel::Freshman, YearLabel::Sophomore]);
        assert_eq!(layout.amounts, [1200.5, 800.0]);
        assert_eq!(layout.counts, [12, 20]);
        assert_eq!(layout.year_at(1.0), Some(YearLabel::Sophomore));
        assert_eq!(layout.year_at(2.0), None);
    }

    #[test]
    fn both_axes_have_headroom() {
        let layout = TrendLayout::new(&summaries()).unwrap();
        assert!((layout.amount_max - 1440.6).abs() < 1e-9);
        assert!((layout.count_max - 24.0).abs() < 1e-9);
    }

    #[test]
    fn count_line_points() {
        let layout = TrendLayout::new(&summaries()).unwrap();
        assert_eq!(layout.count_points(), [(0.0, 12.0), (1.0, 20.0)]);
    }

    #[test]
    fn zero_counts_still_get_an_axis() {
        let layout = TrendLayout::new(&BTreeMap::from([(
            YearLabel::Junior,
            YearSummary::default(),
        )]))
        .unwrap();
        assert!((layout.count_max - 1.0).abs() < 1e-9);
        assert!((layout.amount_max - 1.0).abs() < 1e-9);
    }

    #[test]
    fn empty_summaries_are_no_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trend.png");
        let err =
            render_trend_chart(&path, &BTreeMap::new(), &ChartStyle::default()).unwrap_err();
        assert!(matches!(err, CardError::NoData));
    }

    #[test]
    fn renders_png_or_reports_chart_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trend.png");
        match render_trend_chart(&path, &summaries(), &ChartStyle::default()) {
            Ok(()) => {
                let bytes = std::fs::read(&path).unwrap();
                assert!(bytes.starts_with(b"\x89PNG"));
            }
            Err(err) => assert!(matches!(err, CardError::Chart(_)), "{err}"),
        }
    }
}
