use std::collections::HashMap;

use eframe::egui::Color32;

pub const DEFAULT_NODE_GRAY: Color32 = Color32::from_rgb(128, 128, 128);
pub const HIGHLIGHT_COLOR: Color32 = Color32::from_rgb(255, 196, 0);
pub const MIN_EDGE_WIDTH: f32 = 1.0;
pub const MAX_EDGE_WIDTH: f32 = 5.0;

/// Attribute -> colour lookup loaded from settings. Unknown attributes fall back
/// to `default_color`.
#[derive(Clone, Debug, PartialEq)]
pub struct ColorMap {
    entries: HashMap<String, Color32>,
    default_color: Color32,
}

impl Default for ColorMap {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            default_color: DEFAULT_NODE_GRAY,
        }
    }
}

impl ColorMap {
    pub fn new(entries: HashMap<String, Color32>, default_color: Color32) -> Self {
        Self {
            entries,
            default_color,
        }
    }

    pub fn insert(&mut self, attribute: impl Into<String>, color: Color32) {
        self.entries.insert(attribute.into(), color);
    }

    pub fn color_for(&self, attribute: &str) -> Color32 {
        self.entries
            .get(attribute)
            .copied()
            .unwrap_or(self.default_color)
    }
}

pub fn blend_color(base: Color32, overlay: Color32, amount: f32) -> Color32 {
    let amount = amount.clamp(0.0, 1.0);
    let inverse = 1.0 - amount;

    Color32::from_rgba_unmultiplied(
        ((base.r() as f32 * inverse) + (overlay.r() as f32 * amount)) as u8,
        ((base.g() as f32 * inverse) + (overlay.g() as f32 * amount)) as u8,
        ((base.b() as f32 * inverse) + (overlay.b() as f32 * amount)) as u8,
        ((base.a() as f32 * inverse) + (overlay.a() as f32 * amount)) as u8,
    )
}

/// Weight relative to the heaviest edge, in `[0, 1]`. A zero or non-finite
/// maximum normalises against 1; a NaN ratio maps to 0.
pub fn normalized_weight(weight: f32, max_weight: f32) -> f32 {
    let max_weight = if max_weight > 0.0 && max_weight.is_finite() {
        max_weight
    } else {
        1.0
    };
    let t = weight / max_weight;
    if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) }
}

/// Line width and colour for an edge. Heavier edges are thicker and closer to
/// the configured edge colour; light ones fade toward a pale tint of it.
pub fn edge_style(weight: f32, max_weight: f32, edge_color: Color32) -> (f32, Color32) {
    if max_weight <= 0.0 {
        return (MIN_EDGE_WIDTH, blend_color(Color32::WHITE, edge_color, 0.25));
    }

    let t = normalized_weight(weight, max_weight);
    let width = MIN_EDGE_WIDTH + (MAX_EDGE_WIDTH - MIN_EDGE_WIDTH) * t;
    let color = blend_color(Color32::WHITE, edge_color, 0.25 + 0.75 * t);
    (width, color)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_attribute_uses_default_gray() {
        let mut colors = ColorMap::default();
        colors.insert("mammal", Color32::RED);
        assert_eq!(colors.color_for("mammal"), Color32::RED);
        assert_eq!(colors.color_for("fungus"), DEFAULT_NODE_GRAY);
    }

    #[test]
    fn edge_width_spans_configured_range() {
        let red = Color32::from_rgb(199, 0, 57);
        let weights = [0.0, 5.0, 10.0];
        let max = weights.iter().copied().fold(0.0, f32::max);

        let widths = weights.map(|weight| edge_style(weight, max, red).0);
        assert_eq!(widths[0], MIN_EDGE_WIDTH);
        assert_eq!(widths[1], (MIN_EDGE_WIDTH + MAX_EDGE_WIDTH) / 2.0);
        assert_eq!(widths[2], MAX_EDGE_WIDTH);
        assert_eq!(edge_style(10.0, max, red).1, red);
    }

    #[test]
    fn all_zero_weights_draw_minimal_width() {
        let (width, _) = edge_style(0.0, 0.0, Color32::RED);
        assert_eq!(width, MIN_EDGE_WIDTH);
        assert_eq!(normalized_weight(3.0, 0.0), 1.0);
    }

    #[test]
    fn non_finite_weights_never_yield_nan_widths() {
        assert_eq!(normalized_weight(f32::INFINITY, f32::INFINITY), 1.0);
        assert_eq!(normalized_weight(f32::NAN, 4.0), 0.0);
        assert_eq!(normalized_weight(2.0, f32::INFINITY), 1.0);

        let (width, _) = edge_style(f32::NAN, f32::INFINITY, Color32::RED);
        assert!(width.is_finite());
    }
}
