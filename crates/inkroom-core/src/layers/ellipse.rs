//! Ellipse layer.

use super::{Bounds, LayerStyle, LayerTrait};
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// An ellipse inscribed in its bounding box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EllipseLayer {
    #[serde(flatten)]
    pub bounds: Bounds,
    #[serde(flatten)]
    pub style: LayerStyle,
}

impl EllipseLayer {
    pub fn new(bounds: Bounds, style: LayerStyle) -> Self {
        Self { bounds, style }
    }

    pub fn center(&self) -> Point {
        self.bounds.center()
    }

    pub fn radius_x(&self) -> f64 {
        self.bounds.width / 2.0
    }

    pub fn radius_y(&self) -> f64 {
        self.bounds.height / 2.0
    }
}

impl LayerTrait for EllipseLayer {
    fn bounds(&self) -> Bounds {
        self.bounds
    }

    fn set_bounds(&mut self, bounds: Bounds) {
        self.bounds = bounds;
    }

    fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        let center = self.center();
        let rx = self.radius_x() + tolerance;
        let ry = self.radius_y() + tolerance;
        if rx < f64::EPSILON || ry < f64::EPSILON {
            return false;
        }
        let dx = (point.x - center.x) / rx;
        let dy = (point.y - center.y) / ry;
        dx * dx + dy * dy <= 1.0
    }

    fn style(&self) -> &LayerStyle {
        &self.style
    }

    fn style_mut(&mut self) -> &mut LayerStyle {
        &mut self.style
    }
}
