use std::collections::BTreeMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

use transformer_dashboard::data::model::{ApprovalStatus, Category};

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
            let hue = (i as f32 / n as f32) * 360.0 + 210.0;
            let hsl = Hsl::new(hue, 0.65, 0.55);
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
// Category → Color32
// ---------------------------------------------------------------------------

/// Fixed colours for every value of a category, so a model keeps its colour
/// whatever the filters leave in the view.
#[derive(Debug, Clone)]
pub struct CategoryColors {
    mapping: BTreeMap<&'static str, Color32>,
    default_color: Color32,
}

impl CategoryColors {
    pub fn of<C: Category>() -> Self {
        let mapping = C::ALL
            .iter()
            .zip(generate_palette(C::ALL.len()))
            .map(|(value, color)| (value.label(), color))
            .collect();
        Self {
            mapping,
            default_color: Color32::GRAY,
        }
    }

    pub fn color_for<C: Category>(&self, value: C) -> Color32 {
        self.mapping
            .get(value.label())
            .copied()
            .unwrap_or(self.default_color)
    }
}

pub fn status_color(status: ApprovalStatus) -> Color32 {
    match status {
        ApprovalStatus::Approved => Color32::from_rgb(0x1e, 0xcb, 0x4f),
        ApprovalStatus::Rejected => Color32::from_rgb(0xe0, 0x3c, 0x3c),
    }
}

/// Green for a healthy margin, red otherwise.
pub fn delta_color(delta: f64) -> Color32 {
    if delta >= 0.0 {
        status_color(ApprovalStatus::Approved)
    } else {
        status_color(ApprovalStatus::Rejected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use transformer_dashboard::data::model::TransformerModel;

    #[test]
    fn every_model_gets_a_distinct_colour() {
        let colors = CategoryColors::of::<TransformerModel>();
        let distinct: std::collections::BTreeSet<[u8; 4]> = TransformerModel::ALL
            .iter()
            .map(|m| colors.color_for(*m).to_array())
            .collect();
        assert_eq!(distinct.len(), TransformerModel::ALL.len());
    }
}
