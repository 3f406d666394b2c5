//! Text layer.

use super::{Bounds, LayerStyle, LayerTrait};
use crate::config::TextDefaults;
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// A text box. The body is laid out inside its bounds by the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLayer {
    #[serde(flatten)]
    pub bounds: Bounds,
    #[serde(flatten)]
    pub style: LayerStyle,
    pub text: String,
    /// Font size in pixels.
    pub font_size: f64,
    /// Numeric font weight (400 = regular).
    pub font_weight: u16,
    pub font_family: String,
}

impl TextLayer {
    /// Create a text layer using the configured text defaults.
    pub fn new(bounds: Bounds, style: LayerStyle, defaults: &TextDefaults) -> Self {
        Self {
            bounds,
            style,
            text: defaults.content.clone(),
            font_size: defaults.font_size,
            font_weight: defaults.font_weight,
            font_family: defaults.font_family.clone(),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }
}

impl LayerTrait for TextLayer {
    fn bounds(&self) -> Bounds {
        self.bounds
    }

    fn set_bounds(&mut self, bounds: Bounds) {
        self.bounds = bounds;
    }

    fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        self.bounds.to_rect().inflate(tolerance, tolerance).contains(point)
    }

    fn style(&self) -> &LayerStyle {
        &self.style
    }

    fn style_mut(&mut self) -> &mut LayerStyle {
        &mut self.style
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_defaults() {
        let text = TextLayer::new(
            Bounds::new(0.0, 0.0, 100.0, 100.0),
            LayerStyle::default(),
            &TextDefaults::default(),
        );
        assert_eq!(text.text, "Text");
        assert_eq!(text.font_weight, 400);
        assert_eq!(text.font_family, "Inter");
        assert!((text.font_size - 16.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_with_text() {
        let text = TextLayer::new(
            Bounds::new(0.0, 0.0, 100.0, 100.0),
            LayerStyle::default(),
            &TextDefaults::default(),
        )
        .with_text("Hello");
        assert_eq!(text.text, "Hello");
        assert!(text.hit_test(Point::new(99.0, 1.0), 0.0));
    }
}
