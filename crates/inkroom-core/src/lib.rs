//! InkRoom Core Library
//!
//! Interaction engine for a multiplayer vector canvas: layer model, geometry,
//! camera, the pointer state machine, and shared-document backends.

pub mod camera;
pub mod canvas;
pub mod config;
pub mod crdt;
pub mod document;
pub mod error;
pub mod geometry;
pub mod history;
pub mod input;
pub mod layers;
pub mod mutations;
pub mod shortcuts;

pub use camera::Camera;
pub use canvas::{Canvas, CanvasState, Scene, Tool};
pub use config::{EngineConfig, TextDefaults};
pub use crdt::LoroRoom;
pub use document::{
    ChangeOrigin, ClientId, DEFAULT_BACKGROUND, DocumentEvent, MemoryClient, MemoryRoom, Presence,
    PresencePatch, SharedDocument,
};
pub use error::{CanvasError, CanvasResult, ConfigError, DocumentError, DocumentResult};
pub use geometry::{Corner, Edge, Handle, ResizeHandle};
pub use history::HistoryController;
pub use input::{InputEvent, KeyEvent, Modifiers, PointerButton, PointerEvent, WheelEvent};
pub use layers::{Bounds, Layer, LayerId, LayerPatch, LayerStyle, LayerType, PenPoint, Rgb};
pub use shortcuts::{Shortcut, ShortcutAction, ShortcutRegistry};
