use std::panic::AssertUnwindSafe;
use std::sync::mpsc::Sender;

use anyhow::{anyhow, Result};
use eframe::egui;

use crate::cache::LoadTicket;
use crate::config::Config;
use crate::data::model::FeatureCollection;
use crate::events::{Event, EventBus};
use crate::state::{AppState, Command};
use crate::ui::map::{self, MapSettings, MapView};
use crate::ui::{chart, panels};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct CrimeLensApp {
    pub state: AppState,
    bus: EventBus,
    map_view: MapView,
    map_settings: MapSettings,
}

impl CrimeLensApp {
    pub fn new(ctx: &egui::Context, config: &Config) -> Self {
        let mut app = Self {
            state: AppState::new(config),
            bus: EventBus::new(),
            map_view: MapView::default(),
            map_settings: MapSettings {
                center: config.center,
                zoom: config.zoom,
                point_radius: config.point_radius,
                heatmap_radius: config.heatmap_radius,
                heatmap_opacity: config.heatmap_opacity,
            },
        };
        let startup = app.state.start();
        app.run(startup, ctx);
        app
    }

    fn run(&self, command: Command, ctx: &egui::Context) {
        match command {
            Command::Load(ticket) => spawn_load(ticket, self.bus.sender(), ctx.clone()),
        }
    }
}

/// Load on a worker thread and post the outcome back to the update loop.
///
/// Every ticket gets exactly one `DatasetLoaded`, even when the thread cannot
/// start or the loader panics, so the cache never stays in the loading state.
fn spawn_load(ticket: LoadTicket, tx: Sender<Event>, ctx: egui::Context) {
    let fallback = (ticket.clone(), tx.clone(), ctx.clone());
    let spawned = std::thread::Builder::new()
        .name("dataset-loader".to_string())
        .spawn(move || {
            let source = ticket.source().clone();
            let result = guarded_load(move || source.load());
            if tx.send(Event::DatasetLoaded { ticket, result }).is_ok() {
                ctx.request_repaint();
            }
        });
    if let Err(e) = spawned {
        log::error!("Failed to start dataset loader: {e}");
        let (ticket, tx, ctx) = fallback;
        let result = Err(anyhow!("could not start the loader thread: {e}"));
        if tx.send(Event::DatasetLoaded { ticket, result }).is_ok() {
            ctx.request_repaint();
        }
    }
}

/// Run `load`, turning a panic into an error.
fn guarded_load(load: impl FnOnce() -> Result<FeatureCollection>) -> Result<FeatureCollection> {
    std::panic::catch_unwind(AssertUnwindSafe(load)).unwrap_or_else(|payload| {
        let reason = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Err(anyhow!("dataset loader panicked: {reason}"))
    })
}

impl eframe::App for CrimeLensApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Apply queued input and load results ----
        for command in self.state.drain(&self.bus) {
            self.run(command, ctx);
        }

        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &self.state, &self.bus);
        });

        // ---- Left side panel: filters ----
        egui::SidePanel::left("filter_panel")
            .default_width(220.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &self.state, &self.bus);
            });

        // ---- Bottom panel: crime count chart ----
        egui::TopBottomPanel::bottom("chart_panel")
            .default_height(220.0)
            .resizable(true)
            .show(ctx, |ui| {
                chart::crime_chart(ui, &self.state);
            });

        // ---- Central panel: map ----
        egui::CentralPanel::default().show(ctx, |ui| {
            map::crime_map(
                ui,
                &self.state,
                &mut self.map_view,
                &self.map_settings,
                &self.bus,
            );
        });

        map::details_window(ctx, &self.state, &self.map_view, &self.bus);
    }
}
