//! Charts module - Chart model and rendering

mod plotter;
mod renderer;

pub use plotter::ChartPlotter;
pub use renderer::StaticChartRenderer;

use crate::data::AggregatedView;
use chrono::NaiveDate;

/// Series colours, cycled by trace position.
pub const PALETTE: [(u8, u8, u8); 10] = [
    (52, 152, 219),  // Blue
    (231, 76, 60),   // Red
    (46, 204, 113),  // Green
    (155, 89, 182),  // Purple
    (243, 156, 18),  // Orange
    (26, 188, 156),  // Teal
    (233, 30, 99),   // Pink
    (0, 188, 212),   // Cyan
    (121, 85, 72),   // Brown
    (96, 125, 139),  // Blue Grey
];

pub fn series_rgb(index: usize) -> (u8, u8, u8) {
    PALETTE[index % PALETTE.len()]
}

/// Chart primitive used to draw an aggregated view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChartKind {
    #[default]
    Line,
    Area,
    Bar,
}

impl ChartKind {
    pub const ALL: [ChartKind; 3] = [ChartKind::Line, ChartKind::Area, ChartKind::Bar];

    pub fn label(&self) -> &'static str {
        match self {
            ChartKind::Line => "Líneas",
            ChartKind::Area => "Área",
            ChartKind::Bar => "Barras",
        }
    }
}

/// One series of a chart.
#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    pub name: String,
    pub values: Vec<i64>,
}

/// Renderable chart: dates on the x-axis, one trace per view column.
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub kind: ChartKind,
    /// Draw area and bar traces on top of each other. Trace values are
    /// unaffected.
    pub stacked: bool,
    pub x: Vec<NaiveDate>,
    pub traces: Vec<Trace>,
}

impl Chart {
    pub fn from_view(view: &AggregatedView, kind: ChartKind, stacked: bool) -> Self {
        Self {
            kind,
            stacked,
            x: view.index.clone(),
            traces: view
                .columns
                .iter()
                .map(|c| Trace {
                    name: c.name.clone(),
                    values: c.values.clone(),
                })
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty() || self.traces.is_empty()
    }

    /// Baselines for each trace: cumulative sums of the traces before it
    /// when stacking, zero otherwise.
    pub fn baselines(&self) -> Vec<Vec<i64>> {
        let mut running = vec![0i64; self.x.len()];
        self.traces
            .iter()
            .map(|trace| {
                if !self.stacked || self.kind == ChartKind::Line {
                    return vec![0; self.x.len()];
                }
                let base = running.clone();
                for (acc, v) in running.iter_mut().zip(&trace.values) {
                    *acc += v;
                }
                base
            })
            .collect()
    }

    /// Largest value reached on the y-axis, including stacking.
    pub fn y_max(&self) -> i64 {
        self.baselines()
            .iter()
            .zip(&self.traces)
            .flat_map(|(base, trace)| base.iter().zip(&trace.values).map(|(b, v)| b + v))
            .max()
            .unwrap_or(0)
    }
}

/// X coordinate of a date, as days since the common era.
pub fn date_to_x(date: NaiveDate) -> f64 {
    use chrono::Datelike;
    date.num_days_from_ce() as f64
}

pub fn x_to_date(x: f64) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(x.round() as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ViewColumn;

    fn view() -> AggregatedView {
        AggregatedView {
            index: vec![
                NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2023, 1, 2).unwrap(),
            ],
            columns: vec![
                ViewColumn {
                    name: "UCI".to_string(),
                    values: vec![10, 12],
                },
                ViewColumn {
                    name: "Planta".to_string(),
                    values: vec![5, 0],
                },
            ],
        }
    }

    #[test]
    fn chart_preserves_columns_and_values() {
        for kind in ChartKind::ALL {
            let chart = Chart::from_view(&view(), kind, true);
            assert_eq!(chart.x, view().index);
            let names: Vec<&str> = chart.traces.iter().map(|t| t.name.as_str()).collect();
            assert_eq!(names, vec!["UCI", "Planta"]);
            assert_eq!(chart.traces[0].values, vec![10, 12]);
            assert_eq!(chart.traces[1].values, vec![5, 0]);
        }
    }

    #[test]
    fn stacked_baselines_accumulate() {
        let chart = Chart::from_view(&view(), ChartKind::Area, true);
        assert_eq!(chart.baselines(), vec![vec![0, 0], vec![10, 12]]);
        assert_eq!(chart.y_max(), 15);

        let unstacked = Chart::from_view(&view(), ChartKind::Area, false);
        assert_eq!(unstacked.baselines(), vec![vec![0, 0], vec![0, 0]]);
        assert_eq!(unstacked.y_max(), 12);
    }

    #[test]
    fn line_charts_never_stack() {
        let chart = Chart::from_view(&view(), ChartKind::Line, true);
        assert_eq!(chart.y_max(), 12);
    }

    #[test]
    fn date_axis_round_trips() {
        let date = NaiveDate::from_ymd_opt(2022, 2, 28).unwrap();
        assert_eq!(x_to_date(date_to_x(date)), Some(date));
    }

    #[test]
    fn empty_view_gives_empty_chart() {
        let chart = Chart::from_view(&AggregatedView::default(), ChartKind::Bar, false);
        assert!(chart.is_empty());
        assert_eq!(chart.y_max(), 0);
    }
}
