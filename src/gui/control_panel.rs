//! Control Panel Widget
//! Left side panel with all input controls and settings.

use crate::charts::ChartKind;
use crate::data::{Aggregation, DataMode, RegionColumn};
use chrono::{Duration, Local, NaiveDate};
use egui::{Color32, ComboBox, RichText, ScrollArea, Slider};
use std::path::PathBuf;

/// User settings for the dashboard
#[derive(Clone)]
pub struct UserSettings {
    pub date: NaiveDate,
    pub date_format: String,
    pub separator: String,
    pub local_csv: Option<PathBuf>,
    pub group: bool,
    pub region_column: RegionColumn,
    pub region: String,
    pub mode: DataMode,
    pub variable: String,
    pub chart_kind: ChartKind,
    pub stacked: bool,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            date: Local::now().date_naive(),
            date_format: "%d/%m/%Y".to_string(),
            separator: ";".to_string(),
            local_csv: None,
            group: false,
            region_column: RegionColumn::Province,
            region: String::new(),
            mode: DataMode::PerUnit,
            variable: String::new(),
            chart_kind: ChartKind::Line,
            stacked: true,
        }
    }
}

/// Left side control panel with source selection and view controls.
pub struct ControlPanel {
    pub settings: UserSettings,
    pub date_formats: Vec<String>,
    pub source_link: Option<String>,
    pub variables: Vec<String>,
    pub selected_variables: Vec<bool>,
    pub regions: Vec<String>,
    pub date_bounds: Option<(NaiveDate, NaiveDate)>,
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    pub status: String,
    pub status_is_error: bool,
    pub export_enabled: bool,
}

impl Default for ControlPanel {
    fn default() -> Self {
        Self {
            settings: UserSettings::default(),
            date_formats: vec!["%d/%m/%Y".to_string(), "%m/%d/%Y".to_string()],
            source_link: None,
            variables: Vec::new(),
            selected_variables: Vec::new(),
            regions: Vec::new(),
            date_bounds: None,
            date_range: None,
            status: "Listo".to_string(),
            status_is_error: false,
            export_enabled: false,
        }
    }
}

impl ControlPanel {
    pub fn new(date_formats: Vec<String>, separator: char) -> Self {
        let mut panel = Self::default();
        if let Some(first) = date_formats.first() {
            panel.settings.date_format = first.clone();
        }
        if !date_formats.is_empty() {
            panel.date_formats = date_formats;
        }
        panel.settings.separator = separator.to_string();
        panel
    }

    /// Update available measurement variables after a load.
    pub fn update_variables(&mut self, variables: Vec<String>) {
        if variables == self.variables {
            return;
        }
        let previous: Vec<String> = self.selected_variable_names();
        self.selected_variables = variables.iter().map(|v| previous.contains(v)).collect();
        if !variables.contains(&self.settings.variable) {
            self.settings.variable = variables.first().cloned().unwrap_or_default();
        }
        self.variables = variables;
    }

    /// Update region options for the current grouping column.
    pub fn update_regions(&mut self, regions: Vec<String>) {
        if !regions.contains(&self.settings.region) {
            self.settings.region = regions.first().cloned().unwrap_or_default();
        }
        self.regions = regions;
    }

    /// Update the selectable date interval, resetting the range when it moves.
    pub fn update_date_bounds(&mut self, bounds: Option<(NaiveDate, NaiveDate)>) {
        if bounds != self.date_bounds {
            self.date_bounds = bounds;
            self.date_range = bounds;
        }
    }

    pub fn selected_variable_names(&self) -> Vec<String> {
        self.variables
            .iter()
            .zip(self.selected_variables.iter())
            .filter(|(_, &selected)| selected)
            .map(|(v, _)| v.clone())
            .collect()
    }

    pub fn aggregation(&self) -> Aggregation {
        match self.settings.mode {
            DataMode::PerUnit => Aggregation::PerUnit {
                variable: self.settings.variable.clone(),
            },
            DataMode::Totals => Aggregation::Totals {
                variables: self.selected_variable_names(),
            },
        }
    }

    pub fn region_filter(&self) -> Option<(RegionColumn, String)> {
        self.settings
            .group
            .then(|| (self.settings.region_column, self.settings.region.clone()))
    }

    /// Single-byte field separator, if the text box holds one.
    pub fn separator_byte(&self) -> Option<u8> {
        let mut chars = self.settings.separator.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii() => Some(c as u8),
            _ => None,
        }
    }

    /// Draw the control panel
    pub fn show(&mut self, ui: &mut egui::Ui) -> ControlPanelAction {
        let mut action = ControlPanelAction::None;

        // ===== Source Section =====
        ui.label(RichText::new("📁 Datos").size(14.0).strong());
        ui.add_space(5.0);

        ui.horizontal(|ui| {
            ui.label("Fecha");
            let picker = ui.add(egui_extras::DatePickerButton::new(&mut self.settings.date));
            if picker.changed() && self.settings.local_csv.is_none() {
                action = ControlPanelAction::Reload;
            }
        });

        ui.label("Formato de fecha");
        ui.horizontal(|ui| {
            for format in &self.date_formats {
                if ui
                    .radio_value(&mut self.settings.date_format, format.clone(), format)
                    .changed()
                {
                    action = ControlPanelAction::Reload;
                }
            }
        });

        ui.horizontal(|ui| {
            ui.label("Separador");
            let edit = ui.add(
                egui::TextEdit::singleline(&mut self.settings.separator)
                    .desired_width(24.0)
                    .char_limit(1),
            );
            if edit.changed() && self.separator_byte().is_some() {
                action = ControlPanelAction::Reload;
            }
        });

        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(5.0)
            .inner_margin(8.0)
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    let source_text = self
                        .settings
                        .local_csv
                        .as_ref()
                        .and_then(|p| p.file_name())
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_else(|| "Publicación oficial".to_string());
                    ui.label(RichText::new(source_text).size(12.0));

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if self.settings.local_csv.is_some() {
                            if ui.small_button("✖").on_hover_text("Usar publicación").clicked() {
                                action = ControlPanelAction::UseRemote;
                            }
                        }
                        if ui.button("📂 Abrir").clicked() {
                            action = ControlPanelAction::BrowseCsv;
                        }
                    });
                });
                if let Some(link) = &self.source_link {
                    ui.hyperlink_to("Datos originales", link);
                }
            });

        ui.add_space(10.0);
        ui.separator();
        ui.add_space(5.0);

        // ===== Region Section =====
        ui.label(RichText::new("🗺 Región").size(14.0).strong());
        ui.add_space(5.0);

        if ui.checkbox(&mut self.settings.group, "Agrupar").changed() {
            action = ControlPanelAction::Recompute;
        }
        ui.add_enabled_ui(self.settings.group, |ui| {
            ui.horizontal(|ui| {
                for (column, label) in [
                    (RegionColumn::Province, "Provincia"),
                    (RegionColumn::Community, "CCAA"),
                ] {
                    if ui
                        .radio_value(&mut self.settings.region_column, column, label)
                        .changed()
                    {
                        action = ControlPanelAction::RegionColumnChanged;
                    }
                }
            });

            ComboBox::from_id_salt("region")
                .width(200.0)
                .selected_text(&self.settings.region)
                .show_ui(ui, |ui| {
                    for region in &self.regions {
                        if ui
                            .selectable_label(self.settings.region == *region, region)
                            .clicked()
                        {
                            self.settings.region = region.clone();
                            action = ControlPanelAction::Recompute;
                        }
                    }
                });
        });

        ui.add_space(10.0);
        ui.separator();
        ui.add_space(5.0);

        // ===== Interval Section =====
        ui.label(RichText::new("📅 Intervalo").size(14.0).strong());
        ui.add_space(5.0);

        if let (Some((min, max)), Some((start, end))) = (self.date_bounds, self.date_range) {
            let span = (max - min).num_days();
            let mut from = (start - min).num_days().clamp(0, span);
            let mut to = (end - min).num_days().clamp(0, span);
            let label = move |v: f64, _: std::ops::RangeInclusive<usize>| {
                (min + Duration::days(v as i64)).format("%d/%m/%Y").to_string()
            };

            let from_changed = ui
                .add(Slider::new(&mut from, 0..=span).custom_formatter(label).text("Desde"))
                .changed();
            let to_changed = ui
                .add(Slider::new(&mut to, 0..=span).custom_formatter(label).text("Hasta"))
                .changed();

            if from_changed || to_changed {
                if from > to {
                    if from_changed {
                        to = from;
                    } else {
                        from = to;
                    }
                }
                self.date_range = Some((min + Duration::days(from), min + Duration::days(to)));
                action = ControlPanelAction::Recompute;
            }
        } else {
            ui.label(RichText::new("Sin fechas").color(Color32::GRAY));
        }

        ui.add_space(10.0);
        ui.separator();
        ui.add_space(5.0);

        // ===== Variables Section =====
        ui.label(RichText::new("⚙️ Variables").size(14.0).strong());
        ui.add_space(5.0);

        let mut legacy = self.settings.mode == DataMode::Totals;
        if ui.checkbox(&mut legacy, "Legacy plot").changed() {
            self.settings.mode = if legacy {
                DataMode::Totals
            } else {
                DataMode::PerUnit
            };
            action = ControlPanelAction::Recompute;
        }

        match self.settings.mode {
            DataMode::PerUnit => {
                ComboBox::from_id_salt("variable")
                    .width(200.0)
                    .selected_text(&self.settings.variable)
                    .show_ui(ui, |ui| {
                        for variable in &self.variables {
                            if ui
                                .selectable_label(self.settings.variable == *variable, variable)
                                .clicked()
                            {
                                self.settings.variable = variable.clone();
                                action = ControlPanelAction::Recompute;
                            }
                        }
                    });
            }
            DataMode::Totals => {
                egui::Frame::none()
                    .fill(ui.visuals().widgets.noninteractive.bg_fill)
                    .rounding(5.0)
                    .inner_margin(5.0)
                    .show(ui, |ui| {
                        ScrollArea::vertical().max_height(140.0).show(ui, |ui| {
                            for (i, variable) in self.variables.iter().enumerate() {
                                if i < self.selected_variables.len()
                                    && ui.checkbox(&mut self.selected_variables[i], variable).changed()
                                {
                                    action = ControlPanelAction::Recompute;
                                }
                            }
                        });
                    });

                ui.horizontal(|ui| {
                    if ui.small_button("Todas").clicked() {
                        self.selected_variables.iter_mut().for_each(|v| *v = true);
                        action = ControlPanelAction::Recompute;
                    }
                    if ui.small_button("Ninguna").clicked() {
                        self.selected_variables.iter_mut().for_each(|v| *v = false);
                        action = ControlPanelAction::Recompute;
                    }
                });
            }
        }

        ui.add_space(10.0);
        ui.separator();
        ui.add_space(5.0);

        // ===== Chart Section =====
        ui.label(RichText::new("📊 Tipo de gráfico").size(14.0).strong());
        ui.add_space(5.0);

        ui.horizontal(|ui| {
            for kind in ChartKind::ALL {
                if ui
                    .radio_value(&mut self.settings.chart_kind, kind, kind.label())
                    .changed()
                {
                    action = ControlPanelAction::Recompute;
                }
            }
        });
        ui.add_enabled_ui(self.settings.chart_kind != ChartKind::Line, |ui| {
            if ui.checkbox(&mut self.settings.stacked, "Apilar").changed() {
                action = ControlPanelAction::Recompute;
            }
        });

        ui.add_space(8.0);
        ui.vertical_centered(|ui| {
            ui.add_enabled_ui(self.export_enabled, |ui| {
                let button = egui::Button::new(RichText::new("🖼 Exportar PNG").size(14.0))
                    .min_size(egui::vec2(150.0, 30.0));
                if ui.add(button).clicked() {
                    action = ControlPanelAction::ExportPng;
                }
            });
        });

        ui.add_space(10.0);
        ui.separator();
        ui.add_space(5.0);

        let status_color = if self.status_is_error {
            Color32::from_rgb(220, 53, 69)
        } else {
            Color32::GRAY
        };
        ui.label(RichText::new(&self.status).size(11.0).color(status_color));

        action
    }

    pub fn set_status(&mut self, status: &str) {
        self.status = status.to_string();
        self.status_is_error = false;
    }

    pub fn set_error(&mut self, error: &str) {
        self.status = error.to_string();
        self.status_is_error = true;
    }
}

/// Actions triggered by control panel
#[derive(Debug, Clone, PartialEq)]
pub enum ControlPanelAction {
    None,
    /// Snapshot inputs changed: date, format, separator or file
    Reload,
    BrowseCsv,
    UseRemote,
    RegionColumnChanged,
    /// View inputs changed: filters, variables or chart
    Recompute,
    ExportPng,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals_use_checked_variables_in_column_order() {
        let mut panel = ControlPanel::new(vec!["%d/%m/%Y".to_string()], ';');
        panel.update_variables(vec!["a".into(), "b".into(), "c".into()]);
        panel.selected_variables = vec![true, false, true];
        panel.settings.mode = DataMode::Totals;
        assert_eq!(
            panel.aggregation(),
            Aggregation::Totals {
                variables: vec!["a".into(), "c".into()]
            }
        );
    }

    #[test]
    fn per_unit_defaults_to_first_variable() {
        let mut panel = ControlPanel::new(vec![], ';');
        panel.update_variables(vec!["TOTAL CAMAS".into(), "ALTAS".into()]);
        assert_eq!(
            panel.aggregation(),
            Aggregation::PerUnit {
                variable: "TOTAL CAMAS".into()
            }
        );
    }

    #[test]
    fn region_filter_only_when_grouping() {
        let mut panel = ControlPanel::new(vec![], ';');
        panel.update_regions(vec!["Álava".into(), "Madrid".into()]);
        assert_eq!(panel.region_filter(), None);

        panel.settings.group = true;
        assert_eq!(
            panel.region_filter(),
            Some((RegionColumn::Province, "Álava".to_string()))
        );
    }

    #[test]
    fn separator_must_be_one_ascii_char() {
        let mut panel = ControlPanel::new(vec![], ',');
        assert_eq!(panel.separator_byte(), Some(b','));
        panel.settings.separator = "ñ".into();
        assert_eq!(panel.separator_byte(), None);
        panel.settings.separator = String::new();
        assert_eq!(panel.separator_byte(), None);
    }

    #[test]
    fn new_bounds_reset_the_range() {
        let mut panel = ControlPanel::new(vec![], ';');
        let d = |day| NaiveDate::from_ymd_opt(2023, 1, day).unwrap();
        panel.update_date_bounds(Some((d(1), d(10))));
        panel.date_range = Some((d(3), d(4)));

        panel.update_date_bounds(Some((d(1), d(10))));
        assert_eq!(panel.date_range, Some((d(3), d(4))));

        panel.update_date_bounds(Some((d(2), d(10))));
        assert_eq!(panel.date_range, Some((d(2), d(10))));
    }
}
