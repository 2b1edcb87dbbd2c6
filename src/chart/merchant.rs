//! Stacked horizontal bars of spending per merchant.

use std::path::Path;

use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use super::{
    ChartStyle, axis_max, chart_error, f64_to_index, format_amount, index_to_f64, pixel_at,
    year_color,
};
use crate::aggregate::{chart_summary, merge_by_merchant, rank_merchants};
use crate::error::{CardError, Result};
use crate::models::{ChartSummary, SpendingByYear, YearLabel};

/// Half the thickness of a bar, in rows.
const BAR_HALF_HEIGHT: f64 = 0.4;

/// Horizontal extent of one year's share of a merchant bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarSegment {
    /// Year the segment belongs to.
    pub year: YearLabel,
    /// Left edge.
    pub start: f64,
    /// Right edge.
    pub end: f64,
}

/// Bar geometry of the merchant chart. Row 0 is the smallest merchant and
/// sits at the bottom.
#[derive(Debug, Clone, PartialEq)]
pub struct MerchantLayout {
    /// Years drawn, in stacking order.
    pub years: Vec<YearLabel>,
    /// Merchant name of each row.
    pub labels: Vec<String>,
    /// Segments of each row, one per year.
    pub segments: Vec<Vec<BarSegment>>,
    /// Bar total of each row.
    pub totals: Vec<f64>,
    /// Upper bound of the amount axis.
    pub x_max: f64,
}

impl MerchantLayout {
    /// Lays out the bars for `spending`.
    ///
    /// # Errors
    ///
    /// Returns [`CardError::NoData`] if no year has any spending.
    #[inline]
    pub fn new(spending: &SpendingByYear) -> Result<Self> {
        let rows = rank_merchants(&merge_by_merchant(spending));
        if rows.is_empty() {
            return Err(CardError::NoData);
        }
        let years: Vec<YearLabel> = spending.keys().copied().collect();

        let mut labels = Vec::with_capacity(rows.len());
        let mut segments = Vec::with_capacity(rows.len());
        let mut totals = Vec::with_capacity(rows.len());
        for row in rows {
            let mut offset = 0.0_f64;
            let stacked = years
                .iter()
                .map(|&year| {
                    let start = offset;
                    offset += row.amount(year);
                    BarSegment {
                        year,
                        start,
                        end: offset,
                    }
                })
                .collect();
            segments.push(stacked);
            totals.push(row.total);
            labels.push(row.merchant);
        }
        let x_max = axis_max(totals.iter().copied().fold(0.0_f64, f64::max));

        Ok(Self {
            years,
            labels,
            segments,
            totals,
            x_max,
        })
    }

    /// Merchant name of the row at chart coordinate `value`.
    #[inline]
    #[must_use]
    pub fn label_at(&self, value: f64) -> Option<&str> {
        f64_to_index(value)
            .and_then(|idx| self.labels.get(idx))
            .map(String::as_str)
    }
}

/// Draws the merchant chart for `spending` to a PNG at `path`.
///
/// # Errors
///
/// Returns [`CardError::NoData`] if there is nothing to draw and
/// [`CardError::Chart`] if rendering or writing the file fails.
#[inline]
#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn render_merchant_chart(
    path: &Path,
    spending: &SpendingByYear,
    style: &ChartStyle,
) -> Result<()> {
    let layout = MerchantLayout::new(spending)?;
    let summary = chart_summary(spending);
    draw(path, &layout, &summary, style).map_err(chart_error)?;
    tracing::info!(merchants = layout.labels.len(), "merchant chart written");
    Ok(())
}

/// Rasterises `layout` and the summary block into a PNG at `path`.
fn draw(
    path: &Path,
    layout: &MerchantLayout,
    summary: &ChartSummary,
    style: &ChartStyle,
) -> core::result::Result<(), Box<dyn core::error::Error>> {
    let rows = layout.labels.len();
    let height = style.merchant_height(rows);
    let family = style.font_family.as_str();
    let label_font = (family, style.label_font_size).into_font();

    let root = BitMapBackend::new(path, (style.merchant_width, height)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Campus card spending by merchant", (family, 28.0_f64))
        .margin(20_i32)
        .x_label_area_size(50_i32)
        .y_label_area_size(style.merchant_label_area)
        .build_cartesian_2d(0.0..layout.x_max, -0.5..(index_to_f64(rows) - 0.5))?;

    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_labels(rows + 1)
        .y_label_formatter(&|value: &f64| layout.label_at(*value).unwrap_or_default().to_owned())
        .y_label_style(label_font.clone())
        .x_desc("Amount (CNY)")
        .axis_desc_style((family, 16.0_f64))
        .draw()?;

    for (year_idx, &year) in layout.years.iter().enumerate() {
        let color = year_color(year);
        let bars = layout.segments.iter().enumerate().filter_map(|(row, stacked)| {
            let segment = stacked.get(year_idx)?;
            let y = index_to_f64(row);
            Some(Rectangle::new(
                [
                    (segment.start, y - BAR_HALF_HEIGHT),
                    (segment.end, y + BAR_HALF_HEIGHT),
                ],
                color.filled(),
            ))
        });
        _ = chart
            .draw_series(bars)?
            .label(year.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 12, y + 5)], color.filled()));
    }

    let gap = layout.x_max * 0.01;
    let total_style = TextStyle::from(label_font).pos(Pos::new(HPos::Left, VPos::Center));
    _ = chart.draw_series(layout.totals.iter().enumerate().map(|(row, &total)| {
        Text::new(
            format_amount(total),
            (total + gap, index_to_f64(row)),
            total_style.clone(),
        )
    }))?;

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::LowerRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    let block_style =
        TextStyle::from((family, 16.0_f64).into_font()).pos(Pos::new(HPos::Center, VPos::Top));
    let x = pixel_at(style.merchant_width, 0.8);
    let top = pixel_at(height, 0.7);
    let lines = [
        format!("Distinct merchants: {}", summary.distinct_merchants),
        format!("Merchant entries: {}", summary.merchant_entries),
        format!("Total spend: {:.1}", summary.total_spend),
    ];
    for (offset, line) in (0_i32..).step_by(24).zip(lines) {
        root.draw(&Text::new(line, (x, top + offset), block_style.clone()))?;
    }

    root.present()?;
    Ok(())
}
