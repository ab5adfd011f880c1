//! Capacidad Asistencial - COVID-19 hospital capacity dashboard
//!
//! Loads the dated capacity snapshots published by the Spanish Ministry of
//! Health and charts them per care unit or as totals of several variables.

mod charts;
mod config;
mod data;
mod gui;
mod pipeline;

use config::DashboardConfig;
use eframe::egui;
use gui::DashboardApp;

fn main() -> eframe::Result<()> {
    env_logger::init();

    let config = DashboardConfig::load().unwrap_or_else(|e| {
        log::warn!("{}; using defaults", e);
        DashboardConfig::default()
    });

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 800.0])
            .with_min_inner_size([1000.0, 600.0])
            .with_title("Capacidad Asistencial"),
        ..Default::default()
    };

    eframe::run_native(
        "Capacidad Asistencial",
        options,
        Box::new(|cc| Ok(Box::new(DashboardApp::new(cc, config)))),
    )
}
