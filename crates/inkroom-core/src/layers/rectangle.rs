//! Rectangle layer.

use super::{Bounds, LayerStyle, LayerTrait};
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// A rectangle layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RectangleLayer {
    #[serde(flatten)]
    pub bounds: Bounds,
    #[serde(flatten)]
    pub style: LayerStyle,
}

impl RectangleLayer {
    pub fn new(bounds: Bounds, style: LayerStyle) -> Self {
        Self { bounds, style }
    }

    pub fn as_rect(&self) -> Rect {
        self.bounds.to_rect()
    }
}

impl LayerTrait for RectangleLayer {
    fn bounds(&self) -> Bounds {
        self.bounds
    }

    fn set_bounds(&mut self, bounds: Bounds) {
        self.bounds = bounds;
    }

    fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        self.as_rect().inflate(tolerance, tolerance).contains(point)
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
    fn test_hit_test() {
        let rect = RectangleLayer::new(Bounds::new(0.0, 0.0, 100.0, 100.0), LayerStyle::default());
        assert!(rect.hit_test(Point::new(50.0, 50.0), 0.0));
        assert!(!rect.hit_test(Point::new(150.0, 50.0), 0.0));
        assert!(rect.hit_test(Point::new(105.0, 50.0), 10.0)); // Within tolerance
    }
}
