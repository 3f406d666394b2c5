//! Layer definitions for the shared canvas.

mod ellipse;
mod path;
mod rectangle;
mod text;

pub use ellipse::EllipseLayer;
pub use path::{PathLayer, PenPoint};
pub use rectangle::RectangleLayer;
pub use text::TextLayer;

use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for layers.
pub type LayerId = Uuid;

/// Generate a fresh layer id (UUID v4, 122 random bits).
pub fn new_layer_id() -> LayerId {
    Uuid::new_v4()
}

/// CSS color used when a layer color is unset.
pub const FALLBACK_CSS_COLOR: &str = "#cccccc";

/// An RGB color with 8-bit channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const fn black() -> Self {
        Self::new(0, 0, 0)
    }

    /// Format as a `#rrggbb` hex string.
    pub fn to_css(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Encode an optional color, falling back to [`FALLBACK_CSS_COLOR`].
pub fn color_to_css(color: Option<Rgb>) -> String {
    match color {
        Some(color) => color.to_css(),
        None => FALLBACK_CSS_COLOR.to_string(),
    }
}

/// Axis-aligned bounding box in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Normalized box spanned by two arbitrary corner points.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: (a.x - b.x).abs(),
            height: (a.y - b.y).abs(),
        }
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Get the bounds as a kurbo Rect.
    pub fn to_rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.right(), self.bottom())
    }

    /// Check for overlap with positive area (touching edges do not count).
    pub fn overlaps(&self, other: &Bounds) -> bool {
        other.right() > self.x
            && other.x < self.right()
            && other.bottom() > self.y
            && other.y < self.bottom()
    }

    /// Smallest box containing both.
    pub fn union(&self, other: &Bounds) -> Bounds {
        let rect = self.to_rect().union(other.to_rect());
        Bounds::new(rect.x0, rect.y0, rect.width(), rect.height())
    }
}

impl From<Rect> for Bounds {
    fn from(rect: Rect) -> Self {
        let rect = rect.abs();
        Bounds::new(rect.x0, rect.y0, rect.width(), rect.height())
    }
}

/// Paint properties shared by all layer kinds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayerStyle {
    /// Fill color (None = renderer default).
    pub fill: Option<Rgb>,
    /// Stroke color (None = renderer default).
    pub stroke: Option<Rgb>,
    /// Opacity percent, 0..=100.
    pub opacity: u8,
}

impl LayerStyle {
    pub fn new(fill: Option<Rgb>, stroke: Option<Rgb>, opacity: u8) -> Self {
        Self {
            fill,
            stroke,
            opacity: opacity.min(100),
        }
    }

    pub fn fill_css(&self) -> String {
        color_to_css(self.fill)
    }

    pub fn stroke_css(&self) -> String {
        color_to_css(self.stroke)
    }
}

impl Default for LayerStyle {
    fn default() -> Self {
        Self {
            fill: None,
            stroke: None,
            opacity: 100,
        }
    }
}

/// Layer kind discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerType {
    Rectangle,
    Ellipse,
    Path,
    Text,
}

/// Common behavior of all layer kinds.
pub trait LayerTrait {
    /// Get the bounding box in canvas coordinates.
    fn bounds(&self) -> Bounds;

    /// Replace the bounding box.
    fn set_bounds(&mut self, bounds: Bounds);

    /// Check if a canvas point hits this layer.
    fn hit_test(&self, point: Point, tolerance: f64) -> bool;

    fn style(&self) -> &LayerStyle;

    fn style_mut(&mut self) -> &mut LayerStyle;
}

/// Field-level partial update of a layer. `None` leaves a field untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LayerPatch {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub fill: Option<Option<Rgb>>,
    pub stroke: Option<Option<Rgb>>,
    pub opacity: Option<u8>,
}

impl LayerPatch {
    /// Patch overwriting position and size.
    pub fn bounds(bounds: Bounds) -> Self {
        Self {
            x: Some(bounds.x),
            y: Some(bounds.y),
            width: Some(bounds.width),
            height: Some(bounds.height),
            ..Self::default()
        }
    }

    /// Patch overwriting the position only.
    pub fn position(x: f64, y: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Self::default()
        }
    }

    pub fn fill(fill: Option<Rgb>) -> Self {
        Self {
            fill: Some(fill),
            ..Self::default()
        }
    }

    pub fn stroke(stroke: Option<Rgb>) -> Self {
        Self {
            stroke: Some(stroke),
            ..Self::default()
        }
    }

    pub fn opacity(opacity: u8) -> Self {
        Self {
            opacity: Some(opacity.min(100)),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A drawable layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Layer {
    Rectangle(RectangleLayer),
    Ellipse(EllipseLayer),
    Path(PathLayer),
    Text(TextLayer),
}

impl Layer {
    pub fn layer_type(&self) -> LayerType {
        match self {
            Layer::Rectangle(_) => LayerType::Rectangle,
            Layer::Ellipse(_) => LayerType::Ellipse,
            Layer::Path(_) => LayerType::Path,
            Layer::Text(_) => LayerType::Text,
        }
    }

    pub fn bounds(&self) -> Bounds {
        match self {
            Layer::Rectangle(l) => l.bounds(),
            Layer::Ellipse(l) => l.bounds(),
            Layer::Path(l) => l.bounds(),
            Layer::Text(l) => l.bounds(),
        }
    }

    pub fn set_bounds(&mut self, bounds: Bounds) {
        match self {
            Layer::Rectangle(l) => l.set_bounds(bounds),
            Layer::Ellipse(l) => l.set_bounds(bounds),
            Layer::Path(l) => l.set_bounds(bounds),
            Layer::Text(l) => l.set_bounds(bounds),
        }
    }

    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        match self {
            Layer::Rectangle(l) => l.hit_test(point, tolerance),
            Layer::Ellipse(l) => l.hit_test(point, tolerance),
            Layer::Path(l) => l.hit_test(point, tolerance),
            Layer::Text(l) => l.hit_test(point, tolerance),
        }
    }

    pub fn style(&self) -> &LayerStyle {
        match self {
            Layer::Rectangle(l) => l.style(),
            Layer::Ellipse(l) => l.style(),
            Layer::Path(l) => l.style(),
            Layer::Text(l) => l.style(),
        }
    }

    pub fn style_mut(&mut self) -> &mut LayerStyle {
        match self {
            Layer::Rectangle(l) => l.style_mut(),
            Layer::Ellipse(l) => l.style_mut(),
            Layer::Path(l) => l.style_mut(),
            Layer::Text(l) => l.style_mut(),
        }
    }

    /// Apply a field-level patch and return the patch that reverts it.
    pub fn apply_patch(&mut self, patch: &LayerPatch) -> LayerPatch {
        let mut bounds = self.bounds();
        let mut inverse = LayerPatch::default();

        if let Some(x) = patch.x {
            inverse.x = Some(bounds.x);
            bounds.x = x;
        }
        if let Some(y) = patch.y {
            inverse.y = Some(bounds.y);
            bounds.y = y;
        }
        if let Some(width) = patch.width {
            inverse.width = Some(bounds.width);
            bounds.width = width.max(0.0);
        }
        if let Some(height) = patch.height {
            inverse.height = Some(bounds.height);
            bounds.height = height.max(0.0);
        }
        self.set_bounds(bounds);

        let style = self.style_mut();
        if let Some(fill) = patch.fill {
            inverse.fill = Some(style.fill);
            style.fill = fill;
        }
        if let Some(stroke) = patch.stroke {
            inverse.stroke = Some(style.stroke);
            style.stroke = stroke;
        }
        if let Some(opacity) = patch.opacity {
            inverse.opacity = Some(style.opacity);
            style.opacity = opacity.min(100);
        }

        inverse
    }

    pub fn as_path(&self) -> Option<&PathLayer> {
        match self {
            Layer::Path(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&TextLayer> {
        match self {
            Layer::Text(t) => Some(t),
            _ => None,
        }
    }
}
