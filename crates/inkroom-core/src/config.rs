//! Engine configuration.

use crate::error::ConfigError;
use crate::layers::Rgb;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default text layer contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextDefaults {
    /// Initial text body.
    pub content: String,
    /// Font size in pixels.
    pub font_size: f64,
    /// CSS-style numeric font weight.
    pub font_weight: u16,
    /// Font family name.
    pub font_family: String,
}

impl Default for TextDefaults {
    fn default() -> Self {
        Self {
            content: "Text".to_string(),
            font_size: 16.0,
            font_weight: 400,
            font_family: "Inter".to_string(),
        }
    }
}

/// Tunable constants of the interaction engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of layers in a document.
    pub max_layers: usize,
    /// Manhattan distance (canvas units) a press must travel before it becomes a selection net.
    pub selection_net_threshold: f64,
    /// Minimum camera zoom.
    pub min_zoom: f64,
    /// Maximum camera zoom.
    pub max_zoom: f64,
    /// Zoom increment of the zoom in/out controls.
    pub zoom_step: f64,
    /// Width and height of newly inserted layers.
    pub default_layer_size: f64,
    /// Fill color of newly inserted layers.
    pub default_fill: Rgb,
    /// Stroke color of newly inserted layers.
    pub default_stroke: Rgb,
    /// Color of pencil strokes.
    pub default_pen_color: Rgb,
    /// Opacity (percent) of newly inserted layers.
    pub default_opacity: u8,
    /// Padding added around a committed pencil stroke's bounding box.
    pub stroke_padding: f64,
    /// Resize handle hit radius in screen pixels.
    pub handle_radius: f64,
    /// Layer hit tolerance in screen pixels.
    pub hit_tolerance: f64,
    /// Text layer defaults.
    pub text: TextDefaults,
    /// Undo steps kept by the in-memory document backend.
    pub max_history: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_layers: 100,
            selection_net_threshold: 5.0,
            min_zoom: 0.5,
            max_zoom: 2.0,
            zoom_step: 0.1,
            default_layer_size: 100.0,
            default_fill: Rgb::new(217, 217, 217),
            default_stroke: Rgb::new(217, 217, 217),
            default_pen_color: Rgb::new(217, 217, 217),
            default_opacity: 100,
            stroke_padding: 0.0,
            handle_radius: 8.0,
            hit_tolerance: 4.0,
            text: TextDefaults::default(),
            max_history: 100,
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Check the configuration for values the engine cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_layers == 0 {
            return Err(ConfigError::Invalid("max_layers must be positive".to_string()));
        }
        if !(self.min_zoom > 0.0 && self.min_zoom <= self.max_zoom) {
            return Err(ConfigError::Invalid(format!(
                "zoom range [{}, {}] is not a positive ordered range",
                self.min_zoom, self.max_zoom
            )));
        }
        if self.zoom_step <= 0.0 {
            return Err(ConfigError::Invalid("zoom_step must be positive".to_string()));
        }
        let non_negative = [
            ("selection_net_threshold", self.selection_net_threshold),
            ("default_layer_size", self.default_layer_size),
            ("stroke_padding", self.stroke_padding),
            ("handle_radius", self.handle_radius),
            ("hit_tolerance", self.hit_tolerance),
        ];
        for (name, value) in non_negative {
            if value < 0.0 || !value.is_finite() {
                return Err(ConfigError::Invalid(format!("{name} must be a non-negative number")));
            }
        }
        if self.default_opacity > 100 {
            return Err(ConfigError::Invalid("default_opacity must be within 0..=100".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_layers, 100);
        assert_eq!(config.text.font_family, "Inter");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EngineConfig::from_json_str(r#"{ "max_layers": 3, "text": { "font_size": 24.0 } }"#).unwrap();
        assert_eq!(config.max_layers, 3);
        assert!((config.text.font_size - 24.0).abs() < f64::EPSILON);
        assert_eq!(config.text.content, "Text");
        assert!((config.max_zoom - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_invalid_zoom_range_rejected() {
        let result = EngineConfig::from_json_str(r#"{ "min_zoom": 3.0, "max_zoom": 2.0 }"#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_malformed_json_rejected() {
        let result = EngineConfig::from_json_str("{ max_layers: }");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "stroke_padding": 2.5, "default_fill": {{ "r": 1, "g": 2, "b": 3 }} }}"#).unwrap();

        let config = EngineConfig::from_path(file.path()).unwrap();
        assert!((config.stroke_padding - 2.5).abs() < f64::EPSILON);
        assert_eq!(config.default_fill, Rgb::new(1, 2, 3));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = EngineConfig::from_path(dir.path().join("missing.json"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
