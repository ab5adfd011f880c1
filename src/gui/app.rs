//! Capacidad Asistencial Main Application
//! Main window with control panel and chart viewer.

use crate::charts::{Chart, StaticChartRenderer};
use crate::config::DashboardConfig;
use crate::data::{BoundedCache, CapacityTable, DataLoader, LoadRequest, RegionColumn, Source};
use crate::gui::{ChartViewer, ControlPanel, ControlPanelAction};
use crate::pipeline::{self, ViewRequest};
use anyhow::Context;
use egui::SidePanel;
use std::path::Path;
use std::sync::mpsc::{channel, Receiver};
use std::sync::{Arc, Mutex};
use std::thread;

const EXPORT_WIDTH: u32 = 1400;
const EXPORT_HEIGHT: u32 = 800;

/// Snapshot loading result from background thread
enum LoadResult {
    Complete {
        request: LoadRequest,
        table: CapacityTable,
    },
    Error(String),
}

/// Main application window.
pub struct DashboardApp {
    config: DashboardConfig,
    /// Shared with the loading thread, which owns it while fetching
    loader: Arc<Mutex<DataLoader>>,
    region_cache: BoundedCache<(LoadRequest, RegionColumn), Vec<String>>,
    control_panel: ControlPanel,
    chart_viewer: ChartViewer,

    /// Table for the latest completed load
    current: Option<(LoadRequest, CapacityTable)>,

    // Async snapshot loading
    load_rx: Option<Receiver<LoadResult>>,
    is_loading: bool,
}

impl DashboardApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: DashboardConfig) -> Self {
        let control_panel = ControlPanel::new(config.date_formats.clone(), config.separator);
        let mut app = Self {
            loader: Arc::new(Mutex::new(DataLoader::new(
                config.timeout(),
                config.table_cache_capacity,
            ))),
            region_cache: BoundedCache::new(config.region_cache_capacity),
            control_panel,
            chart_viewer: ChartViewer::new(),
            current: None,
            load_rx: None,
            is_loading: false,
            config,
        };
        app.handle_reload();
        app
    }

    fn load_request(&self) -> Option<LoadRequest> {
        let settings = &self.control_panel.settings;
        let separator = self.control_panel.separator_byte()?;
        let source = match &settings.local_csv {
            Some(path) => Source::File(path.clone()),
            None => Source::for_date(&self.config.base_url, settings.date),
        };
        Some(LoadRequest::new(source, separator, settings.date_format.clone()))
    }

    /// Load the snapshot for the current source settings in the background.
    /// Cached requests come back on the next frame.
    fn handle_reload(&mut self) {
        let Some(request) = self.load_request() else {
            self.control_panel.set_error("El separador debe ser un único carácter");
            return;
        };

        self.control_panel.source_link = match &request.source {
            Source::Url(url) => Some(url.clone()),
            Source::File(_) => None,
        };

        // A newer request supersedes any load still in flight
        self.load_rx = None;
        self.is_loading = false;

        self.current = None;
        self.chart_viewer.clear();
        self.control_panel.export_enabled = false;
        self.control_panel
            .set_status(&format!("Cargando {}...", request.source));
        self.is_loading = true;

        let (tx, rx) = channel();
        self.load_rx = Some(rx);
        let loader = Arc::clone(&self.loader);

        thread::spawn(move || {
            let loaded = match loader.lock() {
                Ok(mut loader) => loader.load(&request).map_err(|e| e.to_string()),
                Err(_) => Err("Loader state is unavailable".to_string()),
            };
            let result = match loaded {
                Ok(table) => LoadResult::Complete { request, table },
                Err(e) => LoadResult::Error(e),
            };
            let _ = tx.send(result);
        });
    }

    /// Check for snapshot loading results
    fn check_load_results(&mut self) {
        let Some(rx) = self.load_rx.take() else {
            return;
        };

        match rx.try_recv() {
            Ok(LoadResult::Complete { request, table }) => {
                self.is_loading = false;
                self.apply_table(request, table);
            }
            Ok(LoadResult::Error(error)) => {
                self.is_loading = false;
                log::warn!("{}", error);
                self.control_panel.set_error(&error);
            }
            Err(std::sync::mpsc::TryRecvError::Empty) => {
                self.load_rx = Some(rx);
            }
            Err(std::sync::mpsc::TryRecvError::Disconnected) => {
                self.is_loading = false;
                self.control_panel.set_error("La carga terminó sin resultado");
            }
        }
    }

    fn apply_table(&mut self, request: LoadRequest, table: CapacityTable) {
        self.control_panel.update_variables(table.measurement_columns());
        if table.is_empty() {
            self.control_panel.set_error("El fichero no contiene filas de datos");
        } else {
            self.control_panel.set_status(&format!(
                "{} filas, {} columnas",
                table.height(),
                table.frame().width()
            ));
        }
        self.current = Some((request, table));
        self.refresh_regions();
        self.recompute();
    }

    /// Region options for the chosen grouping column, memoised per table.
    fn refresh_regions(&mut self) {
        let Some((request, table)) = &self.current else {
            return;
        };
        let column = self.control_panel.settings.region_column;
        let regions = self
            .region_cache
            .get_or_try_insert_with((request.clone(), column), || table.distinct_values(column));

        log::debug!("{} region lists cached", self.region_cache.len());

        match regions {
            Ok(regions) => self.control_panel.update_regions(regions),
            Err(e) => self.control_panel.set_error(&e.to_string()),
        }
    }

    /// Rerun the view part of the pipeline against the current table.
    fn recompute(&mut self) {
        let Some((_, table)) = &self.current else {
            return;
        };

        let mut request = ViewRequest {
            region: self.control_panel.region_filter(),
            date_range: None,
            aggregation: self.control_panel.aggregation(),
            chart_kind: self.control_panel.settings.chart_kind,
            stacked: self.control_panel.settings.stacked,
        };

        match request.date_bounds(table) {
            Ok(bounds) => self.control_panel.update_date_bounds(bounds),
            Err(e) => {
                self.control_panel.set_error(&e.to_string());
                return;
            }
        }
        request.date_range = self.control_panel.date_range;

        match pipeline::build(table, &request) {
            Ok(output) => {
                self.control_panel.export_enabled = !output.chart.is_empty();
                self.control_panel.set_status(&format!(
                    "{} fechas, {} series",
                    output.view.index.len(),
                    output.view.columns.len()
                ));
                self.chart_viewer.set_output(output);
            }
            Err(e) => {
                self.control_panel.export_enabled = false;
                self.chart_viewer.clear();
                self.control_panel.set_error(&e.to_string());
            }
        }
    }

    fn handle_browse_csv(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("CSV Files", &["csv"])
            .pick_file()
        {
            self.control_panel.settings.local_csv = Some(path);
            self.handle_reload();
        }
    }

    fn handle_export_png(&mut self) {
        let Some(output) = self.chart_viewer.output() else {
            self.control_panel.set_error("No hay gráfico para exportar");
            return;
        };

        let output_path = match rfd::FileDialog::new()
            .add_filter("PNG", &["png"])
            .set_file_name("capacidad_asistencial.png")
            .save_file()
        {
            Some(path) => path,
            None => return, // User cancelled
        };

        let title = match &self.control_panel.settings.region {
            region if self.control_panel.settings.group && !region.is_empty() => {
                format!("Capacidad asistencial - {}", region)
            }
            _ => "Capacidad asistencial".to_string(),
        };

        match Self::export_png(&output.chart, &title, &output_path) {
            Ok(()) => self
                .control_panel
                .set_status(&format!("Exportado: {}", output_path.display())),
            Err(e) => {
                log::warn!("{:#}", e);
                self.control_panel.set_error(&format!("{:#}", e));
            }
        }
    }

    /// Render the chart to `path` and open it with the system viewer.
    fn export_png(chart: &Chart, title: &str, path: &Path) -> anyhow::Result<()> {
        StaticChartRenderer::render_png(chart, title, path, EXPORT_WIDTH, EXPORT_HEIGHT)
            .with_context(|| format!("Failed to export {}", path.display()))?;
        open::that(path).with_context(|| format!("Exported but could not open {}", path.display()))?;
        Ok(())
    }
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.check_load_results();

        if self.is_loading {
            ctx.request_repaint();
        }

        SidePanel::left("control_panel")
            .min_width(300.0)
            .max_width(350.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    let action = self.control_panel.show(ui);

                    match action {
                        ControlPanelAction::Reload => self.handle_reload(),
                        ControlPanelAction::BrowseCsv => self.handle_browse_csv(),
                        ControlPanelAction::UseRemote => {
                            self.control_panel.settings.local_csv = None;
                            self.handle_reload();
                        }
                        ControlPanelAction::RegionColumnChanged => {
                            self.refresh_regions();
                            self.recompute();
                        }
                        ControlPanelAction::Recompute => self.recompute(),
                        ControlPanelAction::ExportPng => self.handle_export_png(),
                        ControlPanelAction::None => {}
                    }
                });
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("COVID-19 - Capacidad asistencial");
            ui.add_space(8.0);
            self.chart_viewer.show(ui);
        });
    }
}
