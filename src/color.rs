use std::collections::BTreeMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, LinSrgb, Mix, Srgb};

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
            to_color32(rgb)
        })
        .collect()
}

fn to_color32(rgb: Srgb) -> Color32 {
    Color32::from_rgb(
        (rgb.red.clamp(0.0, 1.0) * 255.0).round() as u8,
        (rgb.green.clamp(0.0, 1.0) * 255.0).round() as u8,
        (rgb.blue.clamp(0.0, 1.0) * 255.0).round() as u8,
    )
}

// ---------------------------------------------------------------------------
// Cluster colours: label → Color32
// ---------------------------------------------------------------------------

/// Maps the labels of one cluster scheme to distinct colours.
#[derive(Debug, Clone, Default)]
pub struct ColorMap {
    mapping: BTreeMap<String, Color32>,
}

impl ColorMap {
    /// Build a colour map from the sorted labels of a cluster scheme.
    pub fn new(labels: &[String]) -> Self {
        let palette = generate_palette(labels.len());
        let mapping = labels.iter().cloned().zip(palette).collect();
        ColorMap { mapping }
    }

    /// Look up the colour for a cluster label.
    pub fn color_for(&self, label: &str) -> Color32 {
        self.mapping.get(label).copied().unwrap_or(Color32::GRAY)
    }
}

// ---------------------------------------------------------------------------
// Diverging scale for the correlation heatmap
// ---------------------------------------------------------------------------

/// Blue at −1, white at 0, red at +1.
pub fn diverging(coefficient: f64) -> Color32 {
    let t = coefficient.clamp(-1.0, 1.0) as f32;
    let white = LinSrgb::new(1.0, 1.0, 1.0);
    let end = if t < 0.0 {
        LinSrgb::new(0.02, 0.12, 0.60)
    } else {
        LinSrgb::new(0.62, 0.02, 0.03)
    };
    let rgb: Srgb = white.mix(end, t.abs()).into_color();
    to_color32(rgb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_has_requested_size() {
        assert!(generate_palette(0).is_empty());
        let p = generate_palette(4);
        assert_eq!(p.len(), 4);
        assert_ne!(p[0], p[1]);
    }

    #[test]
    fn unknown_label_is_gray() {
        let cm = ColorMap::new(&["1".to_string(), "2".to_string()]);
        assert_ne!(cm.color_for("1"), cm.color_for("2"));
        assert_eq!(cm.color_for("7"), Color32::GRAY);
    }

    #[test]
    fn diverging_scale_is_white_at_zero() {
        assert_eq!(diverging(0.0), Color32::from_rgb(255, 255, 255));
        let neg = diverging(-1.0);
        let pos = diverging(1.0);
        assert!(neg.b() > neg.r());
        assert!(pos.r() > pos.b());
    }
}
