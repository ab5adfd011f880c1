//! Chart Plotter Module
//! Draws interactive charts using egui_plot.

use super::{date_to_x, series_rgb, x_to_date, Chart, ChartKind};
use egui::Color32;
use egui_plot::{Bar, BarChart, Legend, Line, Plot, PlotPoints};

/// Portion of a day slot occupied by bars.
const BAR_SLOT: f64 = 0.8;

/// Creates interactive charts using egui_plot.
pub struct ChartPlotter;

impl ChartPlotter {
    pub fn series_color(index: usize) -> Color32 {
        let (r, g, b) = series_rgb(index);
        Color32::from_rgb(r, g, b)
    }

    /// Draw a chart with dates on the x-axis.
    pub fn draw(ui: &mut egui::Ui, chart: &Chart, height: f32) {
        Plot::new("capacity_chart")
            .height(height)
            .legend(Legend::default())
            .allow_scroll(false)
            .x_axis_label("Fecha")
            .include_y(0.0)
            .x_axis_formatter(|mark, _range| {
                x_to_date(mark.value)
                    .map(|d| d.format("%d/%m/%Y").to_string())
                    .unwrap_or_default()
            })
            .label_formatter(|name, value| {
                let date = x_to_date(value.x)
                    .map(|d| d.format("%d/%m/%Y").to_string())
                    .unwrap_or_default();
                if name.is_empty() {
                    date
                } else {
                    format!("{}\n{}: {:.0}", date, name, value.y)
                }
            })
            .show(ui, |plot_ui| match chart.kind {
                ChartKind::Line => {
                    for (i, trace) in chart.traces.iter().enumerate() {
                        plot_ui.line(Self::trace_line(chart, i, &trace.values, None));
                    }
                }
                ChartKind::Area => {
                    let baselines = chart.baselines();
                    // Topmost band first so lower bands paint over its fill
                    for (i, trace) in chart.traces.iter().enumerate().rev() {
                        let tops: Vec<i64> = baselines[i]
                            .iter()
                            .zip(&trace.values)
                            .map(|(b, v)| b + v)
                            .collect();
                        plot_ui.line(Self::trace_line(chart, i, &tops, Some(0.0)));
                    }
                }
                ChartKind::Bar => {
                    for bar_chart in Self::bar_charts(chart) {
                        plot_ui.bar_chart(bar_chart);
                    }
                }
            });
    }

    fn trace_line(chart: &Chart, index: usize, values: &[i64], fill: Option<f32>) -> Line {
        let points: PlotPoints = chart
            .x
            .iter()
            .zip(values)
            .map(|(&d, &v)| [date_to_x(d), v as f64])
            .collect();

        let line = Line::new(points)
            .name(&chart.traces[index].name)
            .color(Self::series_color(index))
            .width(1.5);
        match fill {
            Some(y) => line.fill(y),
            None => line,
        }
    }

    /// One bar chart per trace, either stacked or side by side in each day slot.
    fn bar_charts(chart: &Chart) -> Vec<BarChart> {
        let n = chart.traces.len().max(1) as f64;
        let mut charts: Vec<BarChart> = Vec::with_capacity(chart.traces.len());

        for (i, trace) in chart.traces.iter().enumerate() {
            let (offset, width) = if chart.stacked {
                (0.0, BAR_SLOT)
            } else {
                let width = BAR_SLOT / n;
                ((i as f64 - (n - 1.0) / 2.0) * width, width)
            };

            let bars: Vec<Bar> = chart
                .x
                .iter()
                .zip(&trace.values)
                .map(|(&d, &v)| Bar::new(date_to_x(d) + offset, v as f64).width(width))
                .collect();

            let mut bar_chart = BarChart::new(bars)
                .name(&trace.name)
                .color(Self::series_color(i));
            if chart.stacked {
                let below: Vec<&BarChart> = charts.iter().collect();
                bar_chart = bar_chart.stack_on(&below);
            }
            charts.push(bar_chart);
        }

        charts
    }
}
