use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Mix, Srgb, Srgba};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            Color32::from_rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Crime type → Color32
// ---------------------------------------------------------------------------

/// Assigns each crime-type label a distinct colour for points and legend.
#[derive(Debug, Clone, Default)]
pub struct CrimeColors {
    mapping: Vec<(String, Color32)>,
}

impl CrimeColors {
    /// Labels keep their position, so a type's colour is stable across filters.
    pub fn new(labels: &[String]) -> Self {
        let palette = generate_palette(labels.len());
        CrimeColors {
            mapping: labels.iter().cloned().zip(palette).collect(),
        }
    }

    pub fn color_for(&self, label: &str) -> Color32 {
        self.mapping
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, c)| *c)
            .unwrap_or(Color32::GRAY)
    }

    pub fn legend_entries(&self) -> &[(String, Color32)] {
        &self.mapping
    }
}

// ---------------------------------------------------------------------------
// Heatmap colour ramp
// ---------------------------------------------------------------------------

/// Density stops: transparent blue, blue, cyan, lime, yellow, red.
const HEAT_STOPS: [(f32, [u8; 4]); 6] = [
    (0.0, [33, 102, 172, 0]),
    (0.2, [0, 0, 255, 255]),
    (0.4, [0, 255, 255, 255]),
    (0.6, [0, 255, 0, 255]),
    (0.8, [255, 255, 0, 255]),
    (1.0, [255, 0, 0, 255]),
];

fn stop_color([r, g, b, a]: [u8; 4]) -> Srgba {
    Srgba::<u8>::new(r, g, b, a).into_format::<f32, f32>()
}

/// Colour for a normalised density in `[0, 1]`, scaled by layer `opacity`.
pub fn heat_color(density: f32, opacity: f32) -> Color32 {
    let t = density.clamp(0.0, 1.0);
    let upper = HEAT_STOPS
        .iter()
        .position(|(stop, _)| *stop >= t)
        .unwrap_or(HEAT_STOPS.len() - 1)
        .max(1);
    let (t0, c0) = HEAT_STOPS[upper - 1];
    let (t1, c1) = HEAT_STOPS[upper];

    let factor = (t - t0) / (t1 - t0);
    let mixed: Srgba<u8> = stop_color(c0).mix(stop_color(c1), factor).into_format();
    let alpha = (mixed.alpha as f32 * opacity.clamp(0.0, 1.0)).round() as u8;
    Color32::from_rgba_unmultiplied(mixed.red, mixed.green, mixed.blue, alpha)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_has_requested_size() {
        assert!(generate_palette(0).is_empty());
        assert_eq!(generate_palette(5).len(), 5);
    }

    #[test]
    fn crime_colors_are_distinct_and_stable() {
        let labels = vec!["Drugs".to_string(), "Robbery".to_string()];
        let colors = CrimeColors::new(&labels);
        assert_ne!(colors.color_for("Drugs"), colors.color_for("Robbery"));
        assert_eq!(colors.color_for("Arson"), Color32::GRAY);
        assert_eq!(colors.legend_entries().len(), 2);
    }

    #[test]
    fn heat_ramp_hits_its_stops() {
        assert_eq!(heat_color(0.0, 1.0), Color32::from_rgba_unmultiplied(33, 102, 172, 0));
        assert_eq!(heat_color(1.0, 1.0), Color32::from_rgb(255, 0, 0));
        assert_eq!(heat_color(0.6, 1.0), Color32::from_rgb(0, 255, 0));
        assert_eq!(heat_color(2.0, 1.0), heat_color(1.0, 1.0));
    }

    #[test]
    fn heat_opacity_scales_alpha() {
        assert_eq!(heat_color(1.0, 0.5).a(), 128);
    }
}
