mod app;
mod cache;
mod color;
mod config;
mod data;
mod events;
mod state;
mod ui;

use app::CrimeLensApp;
use config::Config;
use eframe::egui;

fn main() -> eframe::Result {
    env_logger::init();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            log::error!("{e}");
            eprintln!("crime-lens: {e}");
            std::process::exit(2);
        }
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 860.0])
            .with_min_inner_size([720.0, 480.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Crime Lens – Street Crime Map",
        options,
        Box::new(move |cc| Ok(Box::new(CrimeLensApp::new(&cc.egui_ctx, &config)))),
    )
}
