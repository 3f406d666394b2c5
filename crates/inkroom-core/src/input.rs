//! Input boundary types for pointer, wheel and keyboard events.
//!
//! Positions are in screen coordinates; the canvas converts them through the
//! camera before use.

use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

/// Pointer button identifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerButton {
    #[default]
    Primary,
    Secondary,
    Middle,
}

impl PointerButton {
    /// Bit of this button in [`PointerEvent::buttons`].
    pub const fn mask(self) -> u8 {
        match self {
            PointerButton::Primary => 1,
            PointerButton::Secondary => 2,
            PointerButton::Middle => 4,
        }
    }
}

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    /// Ctrl on most platforms, Cmd on macOS.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

fn default_pressure() -> f64 {
    0.5
}

/// A pointer down/move/up/leave event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    /// Position in screen coordinates.
    pub position: Point,
    /// Normalized pen pressure (0.5 for devices without pressure).
    #[serde(default = "default_pressure")]
    pub pressure: f64,
    /// Button that changed state (down/up events).
    #[serde(default)]
    pub button: PointerButton,
    /// Bitmask of buttons currently held.
    #[serde(default)]
    pub buttons: u8,
    #[serde(default)]
    pub modifiers: Modifiers,
}

impl PointerEvent {
    /// A primary-button event at a screen position.
    pub fn primary(x: f64, y: f64) -> Self {
        Self {
            position: Point::new(x, y),
            pressure: default_pressure(),
            button: PointerButton::Primary,
            buttons: PointerButton::Primary.mask(),
            modifiers: Modifiers::NONE,
        }
    }

    /// A move with no buttons held.
    pub fn hover(x: f64, y: f64) -> Self {
        Self {
            buttons: 0,
            ..Self::primary(x, y)
        }
    }

    pub fn with_button(mut self, button: PointerButton) -> Self {
        self.button = button;
        self.buttons = button.mask();
        self
    }

    /// Check if only the primary button is held.
    pub fn is_primary_held(&self) -> bool {
        self.buttons == PointerButton::Primary.mask()
    }
}

/// A scroll/trackpad event used for panning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WheelEvent {
    pub delta: Vec2,
}

/// A key press.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    /// Logical key name ("z", "Delete", "Backspace", ...).
    pub key: String,
    #[serde(default)]
    pub modifiers: Modifiers,
    /// Focus is inside a text-editing field.
    #[serde(default)]
    pub in_text_field: bool,
}

impl KeyEvent {
    pub fn new(key: impl Into<String>, modifiers: Modifiers) -> Self {
        Self {
            key: key.into(),
            modifiers,
            in_text_field: false,
        }
    }
}

/// Any event accepted by the canvas dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum InputEvent {
    PointerDown(PointerEvent),
    PointerMove(PointerEvent),
    PointerUp(PointerEvent),
    PointerLeave,
    Wheel(WheelEvent),
    KeyDown(KeyEvent),
}
