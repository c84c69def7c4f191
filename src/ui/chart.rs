use eframe::egui::{Color32, Ui};
use egui_extras::{Column, TableBuilder};
use egui_plot::{Bar, BarChart, Legend, Plot};

use crate::state::AppState;

/// Bar outline; the fill is the same colour at 20% opacity.
const BAR_COLOR: Color32 = Color32::from_rgb(75, 192, 192);

// ---------------------------------------------------------------------------
// Crime count bar chart (bottom panel)
// ---------------------------------------------------------------------------

/// Bar chart of crime counts for the active filter, with a counts table beside it.
pub fn crime_chart(ui: &mut Ui, state: &AppState) {
    ui.horizontal_top(|ui: &mut Ui| {
        let table_width = 220.0;
        let chart_width = (ui.available_width() - table_width).max(200.0);
        let height = ui.available_height();

        ui.allocate_ui([chart_width, height].into(), |ui: &mut Ui| {
            bar_chart(ui, state);
        });
        ui.separator();
        ui.vertical(|ui: &mut Ui| {
            counts_table(ui, state);
        });
    });
}

fn bar_chart(ui: &mut Ui, state: &AppState) {
    let labels: Vec<String> = state.counts.labels().into_iter().map(String::from).collect();

    let bars: Vec<Bar> = state
        .counts
        .iter()
        .enumerate()
        .map(|(i, (label, n))| Bar::new(i as f64, n as f64).name(label).width(0.6))
        .collect();

    let title = format!("Crime Count ({})", state.filters.month_key());

    Plot::new("crime_chart")
        .legend(Legend::default())
        .y_axis_label("Crimes")
        .include_y(0.0)
        .include_x(-0.5)
        .include_x(labels.len().max(1) as f64 - 0.5)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .allow_boxed_zoom(false)
        .show_grid([false, true])
        .x_axis_formatter(move |mark, _range| {
            let idx = mark.value.round();
            if (mark.value - idx).abs() > 1e-6 || idx < 0.0 {
                return String::new();
            }
            labels.get(idx as usize).cloned().unwrap_or_default()
        })
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).name(title).color(BAR_COLOR));
        });
}

fn counts_table(ui: &mut Ui, state: &AppState) {
    if state.counts.is_empty() {
        ui.label("No crimes match the current filter.");
        return;
    }

    TableBuilder::new(ui)
        .striped(true)
        .column(Column::auto().at_least(120.0))
        .column(Column::remainder())
        .header(20.0, |mut header| {
            header.col(|ui: &mut Ui| {
                ui.strong("Crime type");
            });
            header.col(|ui: &mut Ui| {
                ui.strong("Count");
            });
        })
        .body(|mut body| {
            for (label, n) in state.counts.iter() {
                body.row(18.0, |mut row| {
                    row.col(|ui: &mut Ui| {
                        ui.colored_label(state.colors.color_for(label), label);
                    });
                    row.col(|ui: &mut Ui| {
                        ui.label(n.to_string());
                    });
                });
            }
            body.row(18.0, |mut row| {
                row.col(|ui: &mut Ui| {
                    ui.strong("Total");
                });
                row.col(|ui: &mut Ui| {
                    ui.strong(state.counts.total().to_string());
                });
            });
        });
}
