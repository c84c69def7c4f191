use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::data::filter::ALL_TYPES;
use crate::events::{Event, EventBus};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel. Widgets emit events; nothing is mutated here.
pub fn side_panel(ui: &mut Ui, state: &AppState, bus: &EventBus) {
    ui.heading("Crime filters");
    ui.separator();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Layer toggle ----
            let mut heatmap = state.heatmap;
            if ui.checkbox(&mut heatmap, "Show heatmap").changed() {
                bus.emit(Event::ToggleHeatmap(heatmap));
            }
            ui.separator();

            // ---- Month slider ----
            ui.strong("Month");
            let mut month = state.filters.month().get();
            let slider = egui::Slider::new(&mut month, 1..=12).integer().show_value(false);
            if ui.add(slider).changed() {
                bus.emit(Event::SetMonth(month));
            }
            ui.label(format!(
                "Active month: {}  ({})",
                state.filters.month(),
                state.filters.month_key()
            ));
            ui.separator();

            // ---- Crime type ----
            ui.strong("Crime type");
            let current = state.filters.crime_type().selector_value(&state.catalog);
            if ui.radio(current == ALL_TYPES, "All").clicked() {
                bus.emit(Event::SelectCrimeType(ALL_TYPES.to_string()));
            }
            for opt in &state.catalog {
                let text = RichText::new(&opt.label).color(state.colors.color_for(&opt.label));
                if ui.radio(current == opt.value, text).clicked() {
                    bus.emit(Event::SelectCrimeType(opt.value.clone()));
                }
            }
            ui.separator();

            // ---- Legend ----
            egui::CollapsingHeader::new(RichText::new("Legend").strong())
                .default_open(false)
                .show(ui, |ui: &mut Ui| {
                    for (label, color) in state.colors.legend_entries() {
                        ui.colored_label(*color, format!("● {label}"));
                    }
                });

            // ---- Active layer filter ----
            egui::CollapsingHeader::new(RichText::new("Layer filter").strong())
                .default_open(false)
                .show(ui, |ui: &mut Ui| {
                    ui.monospace(state.expression.to_json().to_string());
                });
        });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &AppState, bus: &EventBus) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(bus);
                ui.close_menu();
            }
            if ui.button("Reload dataset").clicked() {
                bus.emit(Event::Refresh);
                ui.close_menu();
            }
        });

        if ui.button("Reset view").clicked() {
            bus.emit(Event::ResetView);
        }

        ui.separator();

        if let Some(ds) = state.dataset() {
            ui.label(format!(
                "{} crimes loaded, {} visible",
                ds.len(),
                state.visible_indices.len()
            ));
        }
        if let Some(source) = state.cache.source() {
            let label = ui.label(RichText::new(source.to_string()).weak());
            if let Some(at) = state.cache.loaded_at() {
                label.on_hover_text(format!("Loaded {}s ago", at.elapsed().as_secs()));
            }
        }
        if state.loading() {
            ui.spinner();
            ui.label("Loading…");
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(bus: &EventBus) {
    let file = rfd::FileDialog::new()
        .set_title("Open crime data")
        .add_filter("Supported files", &["geojson", "json", "csv"])
        .add_filter("GeoJSON", &["geojson", "json"])
        .add_filter("police.uk CSV", &["csv"])
        .pick_file();

    if let Some(path) = file {
        bus.emit(Event::OpenFile(path));
    }
}
