//! Freehand path layer.

use super::{Bounds, LayerStyle, LayerTrait};
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

/// A pressure-sensitive pen sample.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PenPoint {
    pub x: f64,
    pub y: f64,
    /// Normalized pen pressure, 0.0..=1.0.
    pub pressure: f64,
}

impl PenPoint {
    pub const fn new(x: f64, y: f64, pressure: f64) -> Self {
        Self { x, y, pressure }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// A committed pencil stroke.
///
/// Points are stored relative to the layer origin so that moving the layer
/// only touches `x`/`y`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathLayer {
    #[serde(flatten)]
    pub bounds: Bounds,
    #[serde(flatten)]
    pub style: LayerStyle,
    pub points: Vec<PenPoint>,
}

impl PathLayer {
    pub fn new(bounds: Bounds, style: LayerStyle, points: Vec<PenPoint>) -> Self {
        Self {
            bounds,
            style,
            points,
        }
    }

    /// Points translated into canvas coordinates.
    pub fn absolute_points(&self) -> impl Iterator<Item = Point> + '_ {
        let origin = self.bounds.origin().to_vec2();
        self.points.iter().map(move |p| p.position() + origin)
    }
}

impl LayerTrait for PathLayer {
    fn bounds(&self) -> Bounds {
        self.bounds
    }

    fn set_bounds(&mut self, bounds: Bounds) {
        self.bounds = bounds;
    }

    fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        let points: Vec<Point> = self.absolute_points().collect();
        if points.len() < 2 {
            return points
                .first()
                .is_some_and(|p| p.distance(point) <= tolerance);
        }

        points.windows(2).any(|window| {
            let start = window[0];
            let end = window[1];
            let line_vec: Vec2 = end - start;
            let line_len_sq = line_vec.hypot2();
            if line_len_sq < f64::EPSILON {
                return start.distance(point) <= tolerance;
            }
            let t = ((point - start).dot(line_vec) / line_len_sq).clamp(0.0, 1.0);
            let projection = start + line_vec * t;
            projection.distance(point) <= tolerance
        })
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

    fn stroke() -> PathLayer {
        PathLayer::new(
            Bounds::new(100.0, 100.0, 50.0, 0.0),
            LayerStyle::default(),
            vec![PenPoint::new(0.0, 0.0, 0.5), PenPoint::new(50.0, 0.0, 0.5)],
        )
    }

    #[test]
    fn test_absolute_points() {
        let points: Vec<Point> = stroke().absolute_points().collect();
        assert_eq!(points, vec![Point::new(100.0, 100.0), Point::new(150.0, 100.0)]);
    }

    #[test]
    fn test_hit_test_near_segment() {
        let path = stroke();
        assert!(path.hit_test(Point::new(125.0, 102.0), 3.0));
        assert!(!path.hit_test(Point::new(125.0, 110.0), 3.0));
        assert!(!path.hit_test(Point::new(160.0, 100.0), 3.0));
    }

    #[test]
    fn test_hit_test_single_point() {
        let path = PathLayer::new(
            Bounds::new(10.0, 10.0, 0.0, 0.0),
            LayerStyle::default(),
            vec![PenPoint::new(0.0, 0.0, 1.0)],
        );
        assert!(path.hit_test(Point::new(11.0, 10.0), 2.0));
        assert!(!path.hit_test(Point::new(20.0, 10.0), 2.0));
    }
}
