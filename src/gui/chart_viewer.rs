//! Chart Viewer Widget
//! Central panel showing the chart for the current view and the
//! aggregated values behind it.

use crate::charts::ChartPlotter;
use crate::pipeline::DashboardOutput;
use egui::{Color32, RichText, ScrollArea};

const CHART_HEIGHT: f32 = 420.0;
const TABLE_ROW_HEIGHT: f32 = 18.0;

/// Displays the latest pipeline output.
#[derive(Default)]
pub struct ChartViewer {
    output: Option<DashboardOutput>,
}

impl ChartViewer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.output = None;
    }

    pub fn set_output(&mut self, output: DashboardOutput) {
        self.output = Some(output);
    }

    pub fn output(&self) -> Option<&DashboardOutput> {
        self.output.as_ref()
    }

    pub fn show(&mut self, ui: &mut egui::Ui) {
        let Some(output) = &self.output else {
            ui.centered_and_justified(|ui| {
                ui.label(RichText::new("No Data").size(20.0));
            });
            return;
        };

        let view = &output.view;
        if view.is_empty() {
            ui.centered_and_justified(|ui| {
                ui.label(
                    RichText::new("Sin datos en el intervalo seleccionado")
                        .size(16.0)
                        .color(Color32::GRAY),
                );
            });
            return;
        }

        if let (Some(first), Some(last)) = (view.index.first(), view.index.last()) {
            ui.label(
                RichText::new(format!(
                    "{} - {}",
                    first.format("%d/%m/%Y"),
                    last.format("%d/%m/%Y")
                ))
                .size(13.0),
            );
        }

        ChartPlotter::draw(ui, &output.chart, CHART_HEIGHT);

        ui.add_space(10.0);
        ui.label(
            RichText::new(format!("{} filas filtradas", output.table.height()))
                .size(11.0)
                .color(Color32::GRAY),
        );
        ui.add_space(5.0);

        let columns = view.column_names();
        let totals = (columns.len() > 1).then(|| view.row_totals());
        ScrollArea::both()
            .auto_shrink([false, false])
            .show_rows(ui, TABLE_ROW_HEIGHT, view.index.len() + 1, |ui, row_range| {
                egui::Grid::new("view_table")
                    .striped(true)
                    .min_col_width(80.0)
                    .show(ui, |ui| {
                        for row in row_range {
                            if row == 0 {
                                ui.label(RichText::new("Fecha").strong());
                                for name in &columns {
                                    ui.label(RichText::new(*name).strong());
                                }
                                if totals.is_some() {
                                    ui.label(RichText::new("Total").strong());
                                }
                            } else if let Some(date) = view.index.get(row - 1) {
                                ui.label(date.format("%d/%m/%Y").to_string());
                                for value in view.row(row - 1) {
                                    ui.label(value.to_string());
                                }
                                if let Some(totals) = &totals {
                                    ui.label(RichText::new(totals[row - 1].to_string()).strong());
                                }
                            }
                            ui.end_row();
                        }
                    });
            });
    }
}
