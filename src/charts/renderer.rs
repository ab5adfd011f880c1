//! Static Chart Renderer
//! Exports a chart to a PNG image with plotters.
//!
//! Layout:
//! 1. Title centered on top
//! 2. Date axis at the bottom, value axis on the left
//! 3. One line, band or bar group per trace
//! 4. Legend in the upper-left corner

use super::{date_to_x, series_rgb, x_to_date, Chart, ChartKind};
use plotters::prelude::*;
use std::path::Path;
use thiserror::Error;

/// Portion of a day slot occupied by bars.
const BAR_SLOT: f64 = 0.8;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Nothing to render")]
    Empty,
    #[error("Drawing failed: {0}")]
    Draw(String),
}

fn draw_err<E: std::fmt::Display>(e: E) -> RenderError {
    RenderError::Draw(e.to_string())
}

fn trace_color(index: usize) -> RGBColor {
    let (r, g, b) = series_rgb(index);
    RGBColor(r, g, b)
}

pub struct StaticChartRenderer;

impl StaticChartRenderer {
    /// Render `chart` to a PNG file at `path`.
    pub fn render_png(
        chart: &Chart,
        title: &str,
        path: &Path,
        width: u32,
        height: u32,
    ) -> Result<(), RenderError> {
        if chart.is_empty() {
            return Err(RenderError::Empty);
        }

        let root = BitMapBackend::new(path, (width, height)).into_drawing_area();
        root.fill(&WHITE).map_err(draw_err)?;

        let x_min = chart.x.iter().copied().map(date_to_x).fold(f64::INFINITY, f64::min);
        let x_max = chart
            .x
            .iter()
            .copied()
            .map(date_to_x)
            .fold(f64::NEG_INFINITY, f64::max);
        let y_max = (chart.y_max().max(1) as f64) * 1.1;

        let mut ctx = ChartBuilder::on(&root)
            .caption(title, ("sans-serif", 24))
            .margin(15)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d((x_min - 1.0)..(x_max + 1.0), 0.0..y_max)
            .map_err(draw_err)?;

        let date_label = |x: &f64| {
            x_to_date(*x)
                .map(|d| d.format("%d/%m/%Y").to_string())
                .unwrap_or_default()
        };
        ctx.configure_mesh()
            .x_labels(8)
            .x_label_formatter(&date_label)
            .y_label_formatter(&|y| format!("{:.0}", y))
            .draw()
            .map_err(draw_err)?;

        let xs: Vec<f64> = chart.x.iter().copied().map(date_to_x).collect();
        let baselines = chart.baselines();
        let n = chart.traces.len() as f64;

        for (i, trace) in chart.traces.iter().enumerate() {
            let color = trace_color(i);
            let base = &baselines[i];
            let tops: Vec<f64> = base
                .iter()
                .zip(&trace.values)
                .map(|(b, v)| (b + v) as f64)
                .collect();

            match chart.kind {
                ChartKind::Line => {
                    ctx.draw_series(LineSeries::new(
                        xs.iter().copied().zip(tops.iter().copied()),
                        color.stroke_width(2),
                    ))
                    .map_err(draw_err)?
                    .label(trace.name.as_str())
                    .legend(move |(x, y)| {
                        PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
                    });
                }
                ChartKind::Area => {
                    let mut band: Vec<(f64, f64)> =
                        xs.iter().copied().zip(tops.iter().copied()).collect();
                    band.extend(xs.iter().copied().zip(base.iter().map(|&b| b as f64)).rev());
                    ctx.draw_series(std::iter::once(Polygon::new(band, color.mix(0.4).filled())))
                        .map_err(draw_err)?;
                    ctx.draw_series(LineSeries::new(
                        xs.iter().copied().zip(tops.iter().copied()),
                        color.stroke_width(2),
                    ))
                    .map_err(draw_err)?
                    .label(trace.name.as_str())
                    .legend(move |(x, y)| {
                        Rectangle::new([(x, y - 5), (x + 15, y + 5)], color.mix(0.4).filled())
                    });
                }
                ChartKind::Bar => {
                    let (offset, bar_width) = if chart.stacked {
                        (-BAR_SLOT / 2.0, BAR_SLOT)
                    } else {
                        let w = BAR_SLOT / n;
                        (-BAR_SLOT / 2.0 + i as f64 * w, w)
                    };
                    let bars = xs.iter().zip(base).zip(&tops).map(|((&x, &b), &top)| {
                        let x0 = x + offset;
                        Rectangle::new([(x0, b as f64), (x0 + bar_width, top)], color.filled())
                    });
                    ctx.draw_series(bars)
                        .map_err(draw_err)?
                        .label(trace.name.as_str())
                        .legend(move |(x, y)| {
                            Rectangle::new([(x, y - 5), (x + 15, y + 5)], color.filled())
                        });
                }
            }
        }

        ctx.configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()
            .map_err(draw_err)?;

        root.present().map_err(draw_err)?;
        log::info!("Exported chart to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{AggregatedView, ViewColumn};
    use chrono::NaiveDate;

    fn two_trace_view() -> AggregatedView {
        AggregatedView {
            index: vec![
                NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2023, 1, 2).unwrap(),
                NaiveDate::from_ymd_opt(2023, 1, 3).unwrap(),
            ],
            columns: vec![
                ViewColumn {
                    name: "Planta".to_string(),
                    values: vec![5, 0, 7],
                },
                ViewColumn {
                    name: "UCI".to_string(),
                    values: vec![10, 12, 9],
                },
            ],
        }
    }

    #[test]
    fn every_chart_kind_renders_a_png() {
        let dir = tempfile::tempdir().unwrap();
        for kind in ChartKind::ALL {
            for stacked in [false, true] {
                let chart = Chart::from_view(&two_trace_view(), kind, stacked);
                let path = dir.path().join(format!("{:?}_{}.png", kind, stacked));
                StaticChartRenderer::render_png(&chart, "Madrid", &path, 640, 480).unwrap();

                let bytes = std::fs::read(&path).unwrap();
                assert!(bytes.starts_with(b"\x89PNG"), "{} is not a PNG", path.display());
            }
        }
    }

    #[test]
    fn empty_chart_is_not_rendered() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart.png");
        let chart = Chart::from_view(&AggregatedView::default(), ChartKind::Line, false);
        let err = StaticChartRenderer::render_png(&chart, "empty", &path, 640, 480).unwrap_err();
        assert!(matches!(err, RenderError::Empty));
        assert!(!path.exists());
    }
}
