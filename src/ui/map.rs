use eframe::egui::{self, Align2, CursorIcon, FontId, Pos2, Rect, Stroke, Ui, Vec2};
use egui_plot::{Legend, Plot, PlotBounds, PlotPoints, Points, Polygon};

use crate::color::heat_color;
use crate::data::heatmap::DensityGrid;
use crate::data::model::wrap_longitude_near;
use crate::events::{Event, EventBus};
use crate::state::AppState;

/// Screen pixels per 360° of longitude at zoom 0 (512 px web-map tiles).
const WORLD_PX_AT_ZOOM_0: f64 = 512.0;
const METERS_PER_DEGREE: f64 = 111_320.0;
const SCALE_MAX_WIDTH: f32 = 80.0;
/// Heatmap grid resolution in screen pixels.
const HEAT_CELL_PX: f32 = 6.0;
/// Densities at or below this are not drawn.
const HEAT_FLOOR: f32 = 0.01;

/// Map widget memory kept between frames.
#[derive(Debug, Default)]
pub struct MapView {
    applied_epoch: Option<u64>,
    /// Last clicked position, used to place the details window next to the click.
    last_click_lon: Option<f64>,
}

/// Initial view settings, copied from configuration.
#[derive(Debug, Clone, Copy)]
pub struct MapSettings {
    pub center: [f64; 2],
    pub zoom: f64,
    pub point_radius: f32,
    pub heatmap_radius: f32,
    pub heatmap_opacity: f32,
}

// ---------------------------------------------------------------------------
// Pure view helpers
// ---------------------------------------------------------------------------

/// Plot bounds showing `size` screen pixels around `center` at web-map `zoom`.
pub fn view_bounds(center: [f64; 2], zoom: f64, size: [f32; 2]) -> ([f64; 2], [f64; 2]) {
    let deg_per_px = 360.0 / (WORLD_PX_AT_ZOOM_0 * 2f64.powf(zoom));
    let half_w = size[0] as f64 * deg_per_px / 2.0;
    let half_h = size[1] as f64 * deg_per_px * center[1].to_radians().cos() / 2.0;
    (
        [center[0] - half_w, center[1] - half_h],
        [center[0] + half_w, center[1] + half_h],
    )
}

/// Round down to 1, 2, 3 or 5 times a power of ten.
fn round_scale(value: f64) -> f64 {
    let pow10 = 10f64.powf(value.log10().floor());
    let d = value / pow10;
    let step = if d >= 10.0 {
        10.0
    } else if d >= 5.0 {
        5.0
    } else if d >= 3.0 {
        3.0
    } else if d >= 2.0 {
        2.0
    } else {
        1.0
    };
    pow10 * step
}

/// Metric scale bar label and width in pixels for `meters_per_px`.
pub fn scale_bar(meters_per_px: f64, max_width: f32) -> (String, f32) {
    let max_meters = meters_per_px * max_width as f64;
    if !(max_meters.is_finite() && max_meters > 0.0) {
        return (String::new(), 0.0);
    }
    let (distance, unit, unit_meters) = if max_meters >= 1000.0 {
        (round_scale(max_meters / 1000.0), "km", 1000.0)
    } else {
        (round_scale(max_meters), "m", 1.0)
    };
    let width = (max_width as f64 * distance * unit_meters / max_meters) as f32;
    (format!("{distance} {unit}"), width)
}

// ---------------------------------------------------------------------------
// Map plot (central panel)
// ---------------------------------------------------------------------------

/// What the plot closure reports back about the pointer.
struct PlotInteraction {
    hovered: Option<usize>,
    clicked: bool,
    click_lon: Option<f64>,
    meters_per_px: f64,
}

/// Render the crime map: points or heatmap, plus hover, click and scale bar.
pub fn crime_map(
    ui: &mut Ui,
    state: &AppState,
    view: &mut MapView,
    settings: &MapSettings,
    bus: &EventBus,
) {
    let Some(dataset) = state.dataset() else {
        ui.centered_and_justified(|ui: &mut Ui| {
            if state.loading() {
                ui.spinner();
            } else {
                ui.heading("No crime data loaded  (File → Open…)");
            }
        });
        return;
    };
    if dataset.is_empty() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("The loaded dataset contains no crimes");
        });
        return;
    }

    let aspect = 1.0 / settings.center[1].to_radians().cos();
    let reset = view.applied_epoch != Some(state.view_epoch);
    let size = ui.available_size();

    let response = Plot::new("crime_map")
        .legend(Legend::default())
        .x_axis_label("Longitude")
        .y_axis_label("Latitude")
        .data_aspect(aspect as f32)
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            if reset {
                let (min, max) = view_bounds(settings.center, settings.zoom, [size.x, size.y]);
                plot_ui.set_plot_bounds(PlotBounds::from_min_max(min, max));
            }

            let bounds = plot_ui.plot_bounds();
            let rect = plot_ui.response().rect;
            let deg_per_px_x = bounds.width() / rect.width().max(1.0) as f64;
            let deg_per_px_y = bounds.height() / rect.height().max(1.0) as f64;

            if state.heatmap {
                let cols = (rect.width() / HEAT_CELL_PX).ceil() as usize;
                let rows = (rect.height() / HEAT_CELL_PX).ceil() as usize;
                let radius = settings.heatmap_radius as f64;
                let grid = DensityGrid::build(
                    state
                        .visible_indices
                        .iter()
                        .map(|&i| &dataset.features[i])
                        .map(|f| [f.lon, f.lat]),
                    bounds.min(),
                    bounds.max(),
                    cols,
                    rows,
                    [radius * deg_per_px_x, radius * deg_per_px_y],
                );
                for (min, max, density) in grid.cells(HEAT_FLOOR) {
                    let cell = vec![
                        [min[0], min[1]],
                        [max[0], min[1]],
                        [max[0], max[1]],
                        [min[0], max[1]],
                    ];
                    plot_ui.polygon(
                        Polygon::new(PlotPoints::new(cell))
                            .fill_color(heat_color(density, settings.heatmap_opacity))
                            .stroke(Stroke::NONE)
                            .allow_hover(false),
                    );
                }
            } else {
                for (label, color) in state.colors.legend_entries() {
                    let points: PlotPoints = state
                        .visible_indices
                        .iter()
                        .map(|&i| &dataset.features[i])
                        .filter(|f| &f.crime_type == label)
                        .map(|f| [f.lon, f.lat])
                        .collect();
                    if points.points().is_empty() {
                        continue;
                    }
                    plot_ui.points(
                        Points::new(points)
                            .name(label)
                            .color(*color)
                            .radius(settings.point_radius)
                            .filled(true),
                    );
                }
            }

            let pointer = plot_ui.pointer_coordinate();
            let hovered = if state.heatmap {
                None
            } else {
                pointer.and_then(|p| {
                    dataset.nearest(
                        &state.visible_indices,
                        p.x,
                        p.y,
                        deg_per_px_y / deg_per_px_x,
                        settings.point_radius as f64 * deg_per_px_y,
                    )
                })
            };

            let mid_lat = (bounds.min()[1] + bounds.max()[1]) / 2.0;
            PlotInteraction {
                hovered,
                clicked: plot_ui.response().clicked(),
                click_lon: pointer.map(|p| p.x),
                meters_per_px: deg_per_px_x * METERS_PER_DEGREE * mid_lat.to_radians().cos(),
            }
        });

    if reset {
        view.applied_epoch = Some(state.view_epoch);
    }

    let interaction = response.inner;
    if interaction.hovered.is_some() {
        ui.ctx().set_cursor_icon(CursorIcon::PointingHand);
    }
    if interaction.clicked {
        view.last_click_lon = interaction.click_lon;
        bus.emit(Event::SelectFeature {
            index: interaction.hovered,
            generation: state.cache.generation(),
        });
    }

    draw_scale_bar(ui, response.response.rect, interaction.meters_per_px);
}

fn draw_scale_bar(ui: &Ui, plot_rect: Rect, meters_per_px: f64) {
    let (label, width) = scale_bar(meters_per_px, SCALE_MAX_WIDTH);
    if width <= 0.0 {
        return;
    }
    let painter = ui.painter_at(plot_rect);
    let stroke = Stroke::new(1.5, ui.visuals().text_color());
    let origin = plot_rect.left_bottom() + Vec2::new(12.0, -12.0);
    let end = origin + Vec2::new(width, 0.0);

    painter.line_segment([origin, end], stroke);
    painter.line_segment([origin, origin - Vec2::new(0.0, 5.0)], stroke);
    painter.line_segment([end, end - Vec2::new(0.0, 5.0)], stroke);
    painter.text(
        Pos2::new(origin.x, origin.y - 7.0),
        Align2::LEFT_BOTTOM,
        label,
        FontId::proportional(11.0),
        ui.visuals().text_color(),
    );
}

// ---------------------------------------------------------------------------
// Details window
// ---------------------------------------------------------------------------

/// Popup describing the selected crime.
pub fn details_window(ctx: &egui::Context, state: &AppState, view: &MapView, bus: &EventBus) {
    let Some(feature) = state
        .selected
        .zip(state.dataset())
        .and_then(|(i, ds)| ds.features.get(i).cloned())
    else {
        return;
    };

    let lon = view
        .last_click_lon
        .map(|click| wrap_longitude_near(feature.lon, click))
        .unwrap_or(feature.lon);

    let mut open = true;
    egui::Window::new("Crime details")
        .open(&mut open)
        .collapsible(false)
        .resizable(false)
        .show(ctx, |ui: &mut Ui| {
            egui::Grid::new("crime_details")
                .num_columns(2)
                .striped(true)
                .show(ui, |ui: &mut Ui| {
                    ui.strong("Type of crime:");
                    ui.label(&feature.crime_type);
                    ui.end_row();
                    ui.strong("Time:");
                    ui.label(&feature.month);
                    ui.end_row();
                    ui.strong("Location:");
                    ui.label(&feature.location);
                    ui.end_row();
                    ui.strong("Outcome:");
                    ui.label(feature.outcome.as_deref().unwrap_or("Not recorded"));
                    ui.end_row();
                    ui.strong("Coordinates:");
                    ui.label(format!("{lon:.6}, {:.6}", feature.lat));
                    ui.end_row();
                });
        });

    if !open {
        bus.emit(Event::SelectFeature {
            index: None,
            generation: state.cache.generation(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_bar_rounds_to_nice_steps() {
        assert_eq!(scale_bar(1.0, 80.0), ("50 m".to_string(), 50.0));
        assert_eq!(scale_bar(20.0, 80.0), ("1 km".to_string(), 50.0));
        let (label, width) = scale_bar(0.3, 80.0);
        assert_eq!(label, "20 m");
        assert!((width - 66.666_67).abs() < 1e-3);
        assert_eq!(scale_bar(0.0, 80.0).1, 0.0);
    }

    #[test]
    fn round_scale_steps() {
        assert_eq!(round_scale(7.0), 5.0);
        assert_eq!(round_scale(340.0), 300.0);
        assert_eq!(round_scale(2.5), 2.0);
    }

    #[test]
    fn view_bounds_are_centred() {
        let center = [-0.089932, 51.514442];
        let (min, max) = view_bounds(center, 14.0, [1024.0, 512.0]);
        assert!(((min[0] + max[0]) / 2.0 - center[0]).abs() < 1e-12);
        assert!(((min[1] + max[1]) / 2.0 - center[1]).abs() < 1e-12);
        // 1024 px at zoom 14 spans 360 / 2^14 * 2 degrees of longitude.
        assert!((max[0] - min[0] - 360.0 / 8192.0).abs() < 1e-12);
        assert!(max[1] - min[1] < (max[0] - min[0]) / 2.0);
    }
}
