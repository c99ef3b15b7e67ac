mod app;
mod histogram;
mod panels;
mod state;
mod worker;


use std::path::PathBuf;

use eframe::egui;

use crate::runtime::AppConfig;

const WINDOW_SIZE: [f32; 2] = [1200.0, 820.0];

/// Opens the desktop workspace, loading `snapshot` first when given.
pub fn run(snapshot: Option<PathBuf>) -> Result<(), String> {
    let config = AppConfig::resolve(None).map_err(|error| error.to_string())?;
    run_with_config(config, snapshot)
}

pub fn run_with_config(config: AppConfig, snapshot: Option<PathBuf>) -> Result<(), String> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("cellsheet")
            .with_inner_size(WINDOW_SIZE)
            .with_min_inner_size([800.0, 560.0]),
        ..Default::default()
    };
    eframe::run_native(
        "cellsheet",
        options,
        Box::new(move |_cc| {
            Ok(Box::new(app::CellsheetApp::new(
                config.clone(),
                snapshot.clone(),
            )))
        }),
    )
    .map_err(|error| error.to_string())
}
