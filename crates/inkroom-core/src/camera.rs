//! Camera module for pan/zoom transforms.

use crate::config::EngineConfig;
use kurbo::{Affine, Point, Vec2};
use serde::{Deserialize, Serialize};

/// Zoom values are snapped to this resolution so repeated stepping does not drift.
const ZOOM_RESOLUTION: f64 = 1e6;

/// Camera manages the local view transform for the canvas.
///
/// A canvas point maps to the screen as `(p + pan) * zoom`, so input is
/// converted back with `screen / zoom - pan`. The camera is per-client view
/// state and never enters the shared document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Current translation offset (pan)
    pub pan: Vec2,
    /// Current zoom level (1.0 = 100%)
    pub zoom: f64,
    /// Minimum allowed zoom level
    pub min_zoom: f64,
    /// Maximum allowed zoom level
    pub max_zoom: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            pan: Vec2::ZERO,
            zoom: 1.0,
            min_zoom: 0.5,
            max_zoom: 2.0,
        }
    }
}

impl Camera {
    /// Create a new camera with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a camera using the configured zoom range.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            min_zoom: config.min_zoom,
            max_zoom: config.max_zoom,
            zoom: 1.0_f64.clamp(config.min_zoom, config.max_zoom),
            ..Self::default()
        }
    }

    /// Get the affine transform for rendering.
    ///
    /// This transform converts canvas coordinates to screen coordinates.
    pub fn transform(&self) -> Affine {
        Affine::scale(self.zoom) * Affine::translate(self.pan)
    }

    /// Get the inverse transform for input handling.
    pub fn inverse_transform(&self) -> Affine {
        Affine::translate(-self.pan) * Affine::scale(1.0 / self.zoom)
    }

    /// Convert a screen point to canvas coordinates.
    pub fn screen_to_canvas(&self, screen_point: Point) -> Point {
        self.inverse_transform() * screen_point
    }

    /// Convert a canvas point to screen coordinates.
    pub fn canvas_to_screen(&self, canvas_point: Point) -> Point {
        self.transform() * canvas_point
    }

    /// Convert a screen-space length (handle radius, hit tolerance) to canvas units.
    pub fn screen_length(&self, length: f64) -> f64 {
        length / self.zoom
    }

    /// Pan the camera by a delta in canvas units.
    pub fn pan(&mut self, delta: Vec2) {
        self.pan += delta;
    }

    /// Set the zoom, clamped to the allowed range.
    pub fn set_zoom(&mut self, zoom: f64) {
        let snapped = (zoom * ZOOM_RESOLUTION).round() / ZOOM_RESOLUTION;
        self.zoom = snapped.clamp(self.min_zoom, self.max_zoom);
    }

    pub fn zoom_in(&mut self, step: f64) {
        self.set_zoom(self.zoom + step);
    }

    pub fn zoom_out(&mut self, step: f64) {
        self.set_zoom(self.zoom - step);
    }

    pub fn can_zoom_in(&self) -> bool {
        self.zoom < self.max_zoom - f64::EPSILON
    }

    pub fn can_zoom_out(&self) -> bool {
        self.zoom > self.min_zoom + f64::EPSILON
    }

    /// Reset camera to default position and zoom.
    pub fn reset(&mut self) {
        self.pan = Vec2::ZERO;
        self.set_zoom(1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_camera() {
        let camera = Camera::new();
        assert_eq!(camera.pan, Vec2::ZERO);
        assert!((camera.zoom - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_screen_to_canvas_with_pan() {
        let mut camera = Camera::new();
        camera.pan = Vec2::new(50.0, 100.0);
        let canvas = camera.screen_to_canvas(Point::new(100.0, 200.0));
        assert!((canvas.x - 50.0).abs() < f64::EPSILON);
        assert!((canvas.y - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_screen_to_canvas_with_zoom() {
        let mut camera = Camera::new();
        camera.set_zoom(2.0);
        camera.pan = Vec2::new(10.0, 0.0);
        let canvas = camera.screen_to_canvas(Point::new(100.0, 200.0));
        // 100 / 2 - 10
        assert!((canvas.x - 40.0).abs() < f64::EPSILON);
        assert!((canvas.y - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_roundtrip_over_camera_grid() {
        let pans = [Vec2::ZERO, Vec2::new(30.0, -20.0), Vec2::new(-1234.5, 987.25)];
        let zooms = [0.5, 0.75, 1.0, 1.3, 2.0];
        let points = [
            Point::new(0.0, 0.0),
            Point::new(123.0, 456.0),
            Point::new(-77.7, 0.001),
            Point::new(1e4, -1e4),
        ];

        for pan in pans {
            for zoom in zooms {
                let mut camera = Camera::new();
                camera.pan = pan;
                camera.set_zoom(zoom);
                for p in points {
                    let back = camera.screen_to_canvas(camera.canvas_to_screen(p));
                    assert!((back.x - p.x).abs() < 1e-9);
                    assert!((back.y - p.y).abs() < 1e-9);
                }
            }
        }
    }

    #[test]
    fn test_zoom_clamp() {
        let mut camera = Camera::new();
        camera.set_zoom(0.001);
        assert!((camera.zoom - camera.min_zoom).abs() < f64::EPSILON);
        assert!(!camera.can_zoom_out());

        camera.set_zoom(1000.0);
        assert!((camera.zoom - camera.max_zoom).abs() < f64::EPSILON);
        assert!(!camera.can_zoom_in());
    }

    #[test]
    fn test_zoom_steps_do_not_drift() {
        let mut camera = Camera::new();
        for _ in 0..10 {
            camera.zoom_in(0.1);
        }
        assert!((camera.zoom - 2.0).abs() < f64::EPSILON);
        for _ in 0..5 {
            camera.zoom_out(0.1);
        }
        assert!((camera.zoom - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_pan() {
        let mut camera = Camera::new();
        camera.pan(Vec2::new(10.0, 20.0));
        assert!((camera.pan.x - 10.0).abs() < f64::EPSILON);
        assert!((camera.pan.y - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_screen_length_scales_with_zoom() {
        let mut camera = Camera::new();
        camera.set_zoom(2.0);
        assert!((camera.screen_length(8.0) - 4.0).abs() < f64::EPSILON);
    }
}
