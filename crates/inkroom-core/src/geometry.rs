//! Resize math, marquee selection, stroke fitting and selection handles.

use crate::layers::{Bounds, LayerId, LayerStyle, PathLayer, PenPoint, Rgb};
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Corner positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// Edge positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Edge {
    Top,
    Right,
    Bottom,
    Left,
}

impl Edge {
    pub fn opposite(self) -> Edge {
        match self {
            Edge::Top => Edge::Bottom,
            Edge::Right => Edge::Left,
            Edge::Bottom => Edge::Top,
            Edge::Left => Edge::Right,
        }
    }
}

/// The corner or side of a bounding box grabbed for resizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResizeHandle {
    Corner(Corner),
    Edge(Edge),
}

impl ResizeHandle {
    /// All eight handles, corners first.
    pub const ALL: [ResizeHandle; 8] = [
        ResizeHandle::Corner(Corner::TopLeft),
        ResizeHandle::Corner(Corner::TopRight),
        ResizeHandle::Corner(Corner::BottomRight),
        ResizeHandle::Corner(Corner::BottomLeft),
        ResizeHandle::Edge(Edge::Top),
        ResizeHandle::Edge(Edge::Right),
        ResizeHandle::Edge(Edge::Bottom),
        ResizeHandle::Edge(Edge::Left),
    ];

    /// The left or right side this handle drags, if any.
    fn horizontal_side(self) -> Option<Edge> {
        match self {
            ResizeHandle::Corner(Corner::TopLeft | Corner::BottomLeft)
            | ResizeHandle::Edge(Edge::Left) => Some(Edge::Left),
            ResizeHandle::Corner(Corner::TopRight | Corner::BottomRight)
            | ResizeHandle::Edge(Edge::Right) => Some(Edge::Right),
            ResizeHandle::Edge(Edge::Top | Edge::Bottom) => None,
        }
    }

    /// The top or bottom side this handle drags, if any.
    fn vertical_side(self) -> Option<Edge> {
        match self {
            ResizeHandle::Corner(Corner::TopLeft | Corner::TopRight)
            | ResizeHandle::Edge(Edge::Top) => Some(Edge::Top),
            ResizeHandle::Corner(Corner::BottomLeft | Corner::BottomRight)
            | ResizeHandle::Edge(Edge::Bottom) => Some(Edge::Bottom),
            ResizeHandle::Edge(Edge::Left | Edge::Right) => None,
        }
    }

    /// The handle diagonally (or directly) across the box.
    pub fn opposite(self) -> ResizeHandle {
        match self {
            ResizeHandle::Corner(Corner::TopLeft) => ResizeHandle::Corner(Corner::BottomRight),
            ResizeHandle::Corner(Corner::TopRight) => ResizeHandle::Corner(Corner::BottomLeft),
            ResizeHandle::Corner(Corner::BottomLeft) => ResizeHandle::Corner(Corner::TopRight),
            ResizeHandle::Corner(Corner::BottomRight) => ResizeHandle::Corner(Corner::TopLeft),
            ResizeHandle::Edge(edge) => ResizeHandle::Edge(edge.opposite()),
        }
    }

    /// Position of this handle on `bounds`.
    pub fn position(self, bounds: &Bounds) -> Point {
        let x = match self.horizontal_side() {
            Some(Edge::Left) => bounds.x,
            Some(_) => bounds.right(),
            None => bounds.x + bounds.width / 2.0,
        };
        let y = match self.vertical_side() {
            Some(Edge::Top) => bounds.y,
            Some(_) => bounds.bottom(),
            None => bounds.y + bounds.height / 2.0,
        };
        Point::new(x, y)
    }
}

/// Move the grabbed corner or side of `initial` to `point`, keeping the
/// opposite side fixed. Dragging past the opposite side flips the box instead
/// of producing a negative size.
pub fn resize_bounds(initial: &Bounds, handle: ResizeHandle, point: Point) -> Bounds {
    let mut result = *initial;

    match handle.horizontal_side() {
        Some(Edge::Left) => {
            result.x = point.x.min(initial.right());
            result.width = (initial.right() - point.x).abs();
        }
        Some(_) => {
            result.x = point.x.min(initial.x);
            result.width = (point.x - initial.x).abs();
        }
        None => {}
    }

    match handle.vertical_side() {
        Some(Edge::Top) => {
            result.y = point.y.min(initial.bottom());
            result.height = (initial.bottom() - point.y).abs();
        }
        Some(_) => {
            result.y = point.y.min(initial.y);
            result.height = (point.y - initial.y).abs();
        }
        None => {}
    }

    result
}

/// Ids (in the given order) whose bounds overlap the net spanned by `a` and `b`.
pub fn find_intersecting_layers<I>(layers: I, a: Point, b: Point) -> Vec<LayerId>
where
    I: IntoIterator<Item = (LayerId, Bounds)>,
{
    let net = Bounds::from_corners(a, b);
    layers
        .into_iter()
        .filter(|(_, bounds)| bounds.overlaps(&net))
        .map(|(id, _)| id)
        .collect()
}

/// Fit a path layer around pen samples.
///
/// The box spans the samples plus `padding` on every side; points are stored
/// relative to its origin with order and pressure preserved. Returns `None`
/// for an empty sample list.
pub fn stroke_to_path(samples: &[PenPoint], color: Rgb, padding: f64) -> Option<PathLayer> {
    let first = samples.first()?;

    let (mut left, mut top, mut right, mut bottom) = (first.x, first.y, first.x, first.y);
    for sample in samples {
        left = left.min(sample.x);
        top = top.min(sample.y);
        right = right.max(sample.x);
        bottom = bottom.max(sample.y);
    }

    let bounds = Bounds::new(
        left - padding,
        top - padding,
        right - left + 2.0 * padding,
        bottom - top + 2.0 * padding,
    );
    let points = samples
        .iter()
        .map(|s| PenPoint::new(s.x - bounds.x, s.y - bounds.y, s.pressure))
        .collect();

    Some(PathLayer::new(
        bounds,
        LayerStyle::new(Some(color), Some(color), 100),
        points,
    ))
}

/// A resize handle with its position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Handle {
    /// Position in canvas coordinates.
    pub position: Point,
    pub kind: ResizeHandle,
}

impl Handle {
    /// Check if a canvas point hits this handle.
    /// `tolerance` should be adjusted for camera zoom.
    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        let dx = point.x - self.position.x;
        let dy = point.y - self.position.y;
        dx * dx + dy * dy <= tolerance * tolerance
    }
}

/// The eight resize handles of a bounding box.
pub fn selection_handles(bounds: &Bounds) -> Vec<Handle> {
    ResizeHandle::ALL
        .iter()
        .map(|&kind| Handle {
            position: kind.position(bounds),
            kind,
        })
        .collect()
}

/// Union of the given bounds, or `None` when empty.
pub fn selection_bounds<I>(bounds: I) -> Option<Bounds>
where
    I: IntoIterator<Item = Bounds>,
{
    bounds.into_iter().reduce(|acc, b| acc.union(&b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn assert_bounds_eq(actual: Bounds, expected: Bounds) {
        assert!((actual.x - expected.x).abs() < 1e-9, "{actual:?} != {expected:?}");
        assert!((actual.y - expected.y).abs() < 1e-9, "{actual:?} != {expected:?}");
        assert!((actual.width - expected.width).abs() < 1e-9, "{actual:?} != {expected:?}");
        assert!((actual.height - expected.height).abs() < 1e-9, "{actual:?} != {expected:?}");
    }

    #[test]
    fn test_resize_bottom_right() {
        let initial = Bounds::new(10.0, 10.0, 100.0, 100.0);
        let resized = resize_bounds(
            &initial,
            ResizeHandle::Corner(Corner::BottomRight),
            Point::new(210.0, 160.0),
        );
        assert_bounds_eq(resized, Bounds::new(10.0, 10.0, 200.0, 150.0));
    }

    #[test]
    fn test_resize_edge_keeps_other_axis() {
        let initial = Bounds::new(0.0, 0.0, 100.0, 50.0);
        let resized = resize_bounds(&initial, ResizeHandle::Edge(Edge::Left), Point::new(20.0, 999.0));
        assert_bounds_eq(resized, Bounds::new(20.0, 0.0, 80.0, 50.0));

        let resized = resize_bounds(&initial, ResizeHandle::Edge(Edge::Bottom), Point::new(-5.0, 70.0));
        assert_bounds_eq(resized, Bounds::new(0.0, 0.0, 100.0, 70.0));
    }

    #[test]
    fn test_resize_past_opposite_side_flips() {
        let initial = Bounds::new(0.0, 0.0, 100.0, 100.0);
        let resized = resize_bounds(
            &initial,
            ResizeHandle::Corner(Corner::BottomRight),
            Point::new(-50.0, -20.0),
        );
        assert_bounds_eq(resized, Bounds::new(-50.0, -20.0, 50.0, 20.0));
        assert!(resized.width >= 0.0 && resized.height >= 0.0);
    }

    #[test]
    fn test_resize_to_opposite_corner_is_degenerate() {
        let boxes = [
            Bounds::new(0.0, 0.0, 100.0, 100.0),
            Bounds::new(-30.5, 12.25, 7.0, 300.0),
            Bounds::new(1e3, -1e3, 0.5, 0.25),
        ];
        for b in boxes {
            for handle in ResizeHandle::ALL {
                let ResizeHandle::Corner(_) = handle else {
                    continue;
                };
                let opposite = handle.opposite().position(&b);
                let resized = resize_bounds(&b, handle, opposite);
                assert!(resized.width.abs() < 1e-9);
                assert!(resized.height.abs() < 1e-9);
                let fixed = handle.opposite().position(&resized);
                assert!((fixed.x - opposite.x).abs() < 1e-9);
                assert!((fixed.y - opposite.y).abs() < 1e-9);
                let grabbed = handle.position(&resized);
                assert!((grabbed.x - opposite.x).abs() < 1e-9);
                assert!((grabbed.y - opposite.y).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_intersection_any_overlap() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let layers = vec![
            (a, Bounds::new(0.0, 0.0, 10.0, 10.0)),
            (b, Bounds::new(50.0, 50.0, 10.0, 10.0)),
            (c, Bounds::new(5.0, 5.0, 100.0, 100.0)),
        ];
        let hits = find_intersecting_layers(layers, Point::new(8.0, 8.0), Point::new(20.0, 20.0));
        assert_eq!(hits, vec![a, c]);
    }

    #[test]
    fn test_intersection_symmetric_under_corner_swap() {
        let ids: Vec<LayerId> = (0..4).map(|_| Uuid::new_v4()).collect();
        let layers: Vec<(LayerId, Bounds)> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| (*id, Bounds::new(i as f64 * 30.0, i as f64 * 15.0, 25.0, 25.0)))
            .collect();

        let corners = [
            (Point::new(0.0, 0.0), Point::new(40.0, 40.0)),
            (Point::new(100.0, 0.0), Point::new(20.0, 60.0)),
            (Point::new(-10.0, 80.0), Point::new(70.0, 10.0)),
        ];
        for (p, q) in corners {
            assert_eq!(
                find_intersecting_layers(layers.clone(), p, q),
                find_intersecting_layers(layers.clone(), q, p)
            );
        }
    }

    #[test]
    fn test_stroke_to_path() {
        let samples = [
            PenPoint::new(0.0, 0.0, 0.5),
            PenPoint::new(10.0, 0.0, 0.6),
            PenPoint::new(10.0, 10.0, 0.7),
        ];
        let path = stroke_to_path(&samples, Rgb::new(1, 2, 3), 0.0).unwrap();
        assert_bounds_eq(path.bounds, Bounds::new(0.0, 0.0, 10.0, 10.0));
        assert_eq!(path.points, samples.to_vec());
        assert_eq!(path.style.fill, Some(Rgb::new(1, 2, 3)));
        assert_eq!(path.style.stroke, Some(Rgb::new(1, 2, 3)));
        assert_eq!(path.style.opacity, 100);
    }

    #[test]
    fn test_stroke_to_path_relative_points_with_padding() {
        let samples = [PenPoint::new(20.0, 30.0, 0.5), PenPoint::new(40.0, 35.0, 1.0)];
        let path = stroke_to_path(&samples, Rgb::black(), 2.0).unwrap();
        assert_bounds_eq(path.bounds, Bounds::new(18.0, 28.0, 24.0, 9.0));
        assert_eq!(path.points[0], PenPoint::new(2.0, 2.0, 0.5));
        assert_eq!(path.points[1], PenPoint::new(22.0, 7.0, 1.0));
        assert!(stroke_to_path(&[], Rgb::black(), 0.0).is_none());
    }

    #[test]
    fn test_selection_handles() {
        let handles = selection_handles(&Bounds::new(0.0, 0.0, 100.0, 50.0));
        assert_eq!(handles.len(), 8);
        let bottom_right = handles
            .iter()
            .find(|h| h.kind == ResizeHandle::Corner(Corner::BottomRight))
            .unwrap();
        assert_eq!(bottom_right.position, Point::new(100.0, 50.0));
        let top = handles.iter().find(|h| h.kind == ResizeHandle::Edge(Edge::Top)).unwrap();
        assert_eq!(top.position, Point::new(50.0, 0.0));
        assert!(top.hit_test(Point::new(53.0, 4.0), 5.0));
    }

    #[test]
    fn test_selection_bounds() {
        let union = selection_bounds([
            Bounds::new(0.0, 0.0, 10.0, 10.0),
            Bounds::new(20.0, -5.0, 5.0, 5.0),
        ])
        .unwrap();
        assert_bounds_eq(union, Bounds::new(0.0, -5.0, 25.0, 15.0));
        assert!(selection_bounds(std::iter::empty()).is_none());
    }
}
