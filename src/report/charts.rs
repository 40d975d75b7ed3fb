//! Chart rendering to SVG with plotters.
//!
//! Time axes are plotted as Unix seconds and labelled back as `MM-DD HHh`.

use anyhow::Result;
use chrono::{DateTime, NaiveDateTime};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::FontTransform;
use std::ops::Range;

use crate::kpi::Metric;
use crate::kpi::types::{CellDistribution, LabeledSeries, TimeSeries};
use crate::report::page::{ChartPage, DPI, truncate_cell};

const FONT: &str = "sans-serif";
const LTE_COLOR: RGBColor = BLUE;
const NR_COLOR: RGBColor = RED;

/// Figure size in inches, converted to pixels at [`DPI`].
fn figure(width_in: f32, height_in: f32) -> (u32, u32) {
    ((width_in * DPI) as u32, (height_in * DPI) as u32)
}

fn seconds(date: &NaiveDateTime) -> f64 {
    date.and_utc().timestamp() as f64
}

fn format_tick(x: &f64) -> String {
    DateTime::from_timestamp(*x as i64, 0)
        .map(|d| d.naive_utc().format("%m-%d %Hh").to_string())
        .unwrap_or_default()
}

/// Range covering all values with 5% head-room. Degenerate inputs get a
/// unit-wide window so axes can still be drawn.
fn value_range<I: IntoIterator<Item = f64>>(values: I) -> Range<f64> {
    let (lo, hi) = values
        .into_iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if !lo.is_finite() || !hi.is_finite() {
        return 0.0..1.0;
    }
    if (hi - lo).abs() < f64::EPSILON {
        let pad = if lo == 0.0 { 1.0 } else { lo.abs() * 0.1 };
        return (lo - pad)..(hi + pad);
    }
    let pad = (hi - lo) * 0.05;
    (lo - pad)..(hi + pad)
}

/// Time range of all points; a single instant widens to one hour.
fn time_range<'a, I: IntoIterator<Item = &'a TimeSeries>>(series: I) -> Range<f64> {
    let range = value_range(
        series
            .into_iter()
            .flat_map(|s| s.iter().map(|(d, _)| seconds(d))),
    );
    if range.end - range.start < 3600.0 {
        let mid = (range.start + range.end) / 2.0;
        return (mid - 1800.0)..(mid + 1800.0);
    }
    range
}

fn to_points(series: &TimeSeries) -> Vec<(f64, f64)> {
    series.iter().map(|(d, v)| (seconds(d), *v)).collect()
}

/// Renders `draw` into an SVG string of the given size.
fn render<F>(title: &str, size: (u32, u32), draw: F) -> Result<ChartPage>
where
    F: FnOnce(&DrawingArea<SVGBackend, Shift>) -> Result<()>,
{
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, size).into_drawing_area();
        root.fill(&WHITE)?;
        let body = root.titled(title, (FONT, 22))?;
        draw(&body)?;
        root.present()?;
    }

    Ok(ChartPage {
        title: title.to_string(),
        svg,
        width_px: size.0,
        height_px: size.1,
    })
}

/// One panel per metric, 4G on the left axis and 5G on the right.
pub fn dual_axis_grid(title: &str, panels: &[(Metric, TimeSeries, TimeSeries)]) -> Result<ChartPage> {
    render(title, figure(20.0, 10.0), |area| {
        for (cell, (metric, lte, nr)) in area.split_evenly((2, 3)).iter().zip(panels) {
            dual_axis_panel(cell, *metric, lte, nr)?;
        }
        Ok(())
    })
}

fn dual_axis_panel(
    area: &DrawingArea<SVGBackend, Shift>,
    metric: Metric,
    lte: &TimeSeries,
    nr: &TimeSeries,
) -> Result<()> {
    let x = time_range([lte, nr]);
    let y_lte = value_range(lte.iter().map(|(_, v)| *v));
    let y_nr = value_range(nr.iter().map(|(_, v)| *v));

    let mut chart = ChartBuilder::on(area)
        .caption(metric.name(), (FONT, 16))
        .margin(8)
        .x_label_area_size(70)
        .y_label_area_size(55)
        .right_y_label_area_size(55)
        .build_cartesian_2d(x.clone(), y_lte)?
        .set_secondary_coord(x, y_nr);

    chart
        .configure_mesh()
        .x_labels(6)
        .x_label_formatter(&format_tick)
        .x_label_style((FONT, 10).into_font().transform(FontTransform::Rotate90))
        .y_desc(format!("4G {}", metric.name()))
        .axis_desc_style((FONT, 12).into_font().color(&LTE_COLOR))
        .draw()?;

    chart
        .configure_secondary_axes()
        .y_desc(format!("5G {}", metric.name()))
        .axis_desc_style((FONT, 12).into_font().color(&NR_COLOR))
        .draw()?;

    chart
        .draw_series(LineSeries::new(to_points(lte), LTE_COLOR.stroke_width(2)))?
        .label("4G")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 16, y)], LTE_COLOR));
    chart
        .draw_secondary_series(LineSeries::new(to_points(nr), NR_COLOR.stroke_width(2)))?
        .label("5G")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 16, y)], NR_COLOR));

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    Ok(())
}

/// Per-cell boxplots, cells in the given order.
pub fn boxplots(title: &str, metric: Metric, cells: &[CellDistribution]) -> Result<ChartPage> {
    let names: Vec<String> = cells.iter().map(|c| c.cell.clone()).collect();
    let count = cells.len().max(1) as u32;
    let y = value_range(cells.iter().flat_map(|c| c.values.iter().copied()));
    let y = (y.start as f32)..(y.end as f32);

    let label = |v: &SegmentValue<u32>| match v {
        SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => {
            names.get(*i as usize).cloned().unwrap_or_default()
        }
        SegmentValue::Last => String::new(),
    };

    render(title, figure(20.0, 5.0), |area| {
        let mut chart = ChartBuilder::on(area)
            .margin(10)
            .x_label_area_size(140)
            .y_label_area_size(60)
            .build_cartesian_2d((0u32..count).into_segmented(), y)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(names.len().max(1))
            .x_label_formatter(&label)
            .x_label_style((FONT, 8).into_font().transform(FontTransform::Rotate90))
            .x_desc("Cell")
            .y_desc(metric.name())
            .draw()?;

        chart.draw_series(cells.iter().enumerate().map(|(i, c)| {
            let quartiles = Quartiles::new(&c.values);
            Boxplot::new_vertical(SegmentValue::CenterOf(i as u32), &quartiles)
                .width(10)
                .style(LTE_COLOR)
        }))?;

        Ok(())
    })
}

/// One line per series (e.g. per site), with a legend on the right.
pub fn line_series(title: &str, metric: Metric, series: &[LabeledSeries]) -> Result<ChartPage> {
    render(title, figure(12.0, 6.0), |area| {
        let x = time_range(series.iter().map(|s| &s.points));
        let y = value_range(series.iter().flat_map(|s| s.points.iter().map(|(_, v)| *v)));

        let mut chart = ChartBuilder::on(area)
            .margin(10)
            .margin_right(160)
            .x_label_area_size(80)
            .y_label_area_size(60)
            .build_cartesian_2d(x, y)?;

        chart
            .configure_mesh()
            .x_labels(10)
            .x_label_formatter(&format_tick)
            .x_label_style((FONT, 10).into_font().transform(FontTransform::Rotate90))
            .light_line_style(BLACK.mix(0.05))
            .x_desc("Date")
            .y_desc(metric.name())
            .draw()?;

        for (idx, s) in series.iter().enumerate() {
            let color = Palette99::pick(idx).to_rgba();
            chart
                .draw_series(
                    LineSeries::new(to_points(&s.points), color.stroke_width(2)).point_size(3),
                )?
                .label(s.label.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 16, y)], color));
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::Coordinate(area.dim_in_pixel().0 as i32 - 150, 10))
            .label_font((FONT, 10))
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;

        Ok(())
    })
}

/// Small-multiples page: one users-over-time facet per series.
///
/// Facets beyond `series.len()` are left blank.
pub fn facets(title: &str, series: &[LabeledSeries], rows: usize, cols: usize) -> Result<ChartPage> {
    render(title, figure(15.0, 30.0), |area| {
        for (cell, s) in area.split_evenly((rows, cols)).iter().zip(series) {
            let x = time_range([&s.points]);
            let y = value_range(s.points.iter().map(|(_, v)| *v));

            let mut chart = ChartBuilder::on(cell)
                .caption(truncate_cell(&s.label), (FONT, 10))
                .margin(4)
                .x_label_area_size(22)
                .y_label_area_size(32)
                .build_cartesian_2d(x, y)?;

            chart
                .configure_mesh()
                .x_labels(4)
                .y_labels(4)
                .x_label_formatter(&format_tick)
                .label_style((FONT, 7))
                .light_line_style(BLACK.mix(0.05))
                .draw()?;

            chart.draw_series(
                LineSeries::new(to_points(&s.points), LTE_COLOR.stroke_width(1)).point_size(1),
            )?;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::samples::parse_datetime_str;

    fn series(values: &[(&str, f64)]) -> TimeSeries {
        values
            .iter()
            .map(|(h, v)| (parse_datetime_str(&format!("2025-05-01 {h}")).unwrap(), *v))
            .collect()
    }

    #[test]
    fn test_value_range_pads() {
        let r = value_range([0.0, 100.0]);
        assert_eq!(r, -5.0..105.0);
    }

    #[test]
    fn test_value_range_degenerate() {
        assert_eq!(value_range(std::iter::empty()), 0.0..1.0);
        assert_eq!(value_range([0.0]), -1.0..1.0);
        assert_eq!(value_range([10.0, 10.0]), 9.0..11.0);
    }

    #[test]
    fn test_time_range_single_instant() {
        let s = series(&[("10:00", 1.0)]);
        let r = time_range([&s]);
        assert_eq!(r.end - r.start, 3600.0);
    }

    #[test]
    fn test_format_tick() {
        let d = parse_datetime_str("2025-05-01 21:00").unwrap();
        assert_eq!(format_tick(&seconds(&d)), "05-01 21h");
    }

    #[test]
    fn test_dual_axis_grid_renders_svg() {
        let lte = series(&[("10:00", 1.0), ("11:00", 3.0)]);
        let nr = series(&[("10:00", 2.0)]);
        let panels: Vec<_> = Metric::ALL
            .iter()
            .map(|m| (*m, lte.clone(), nr.clone()))
            .collect();

        let page = dual_axis_grid("Metrics for Grupo G", &panels).unwrap();
        assert_eq!((page.width_px, page.height_px), (2000, 1000));
        assert!(page.svg.contains("<svg"));
        assert!(page.svg.contains("Metrics for Grupo G"));
    }

    #[test]
    fn test_boxplots_render() {
        let cells = vec![
            CellDistribution { cell: "C1".into(), values: vec![1.0, 2.0, 3.0] },
            CellDistribution { cell: "C2".into(), values: vec![5.0] },
        ];
        let page = boxplots("Boxplot", Metric::Users, &cells).unwrap();
        assert!(page.svg.contains("</svg>"));
    }

    #[test]
    fn test_facets_render_with_blank_slots() {
        let s = vec![LabeledSeries {
            label: "CELL-NAME-LONGER-THAN-FIFTEEN".into(),
            points: series(&[("10:00", 4.0), ("11:00", 6.0)]),
        }];
        let page = facets("Users per Cell", &s, 24, 3).unwrap();
        assert_eq!((page.width_px, page.height_px), (1500, 3000));
        assert!(page.svg.contains("CELL-NAME-LONGE..."));
    }
}
