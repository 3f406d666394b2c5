//! CRDT integration using Loro for collaborative editing.
//!
//! # Schema
//!
//! ```text
//! LoroDoc
//! ├── "layers": LoroMap<LayerId, LoroMap> (layer data)
//! ├── "layer_order": LoroList<String> (layer ids, bottom first)
//! └── "room": LoroMap ("background": packed 0xRRGGBB i64)
//! ```
//!
//! Each layer map holds:
//! - "type": String ("rectangle", "ellipse", "path", "text")
//! - "x", "y", "width", "height": f64
//! - "fill", "stroke": packed 0xRRGGBB i64, or null when unset
//! - "opacity": i64 percent
//! - Type-specific fields (`[x, y, pressure]` point lists, text and font)

mod convert;
mod room;

pub use convert::{color_from_value, color_to_value, layer_from_loro, layer_to_loro, patch_to_loro};
pub use room::{BACKGROUND_KEY, LAYER_ORDER_KEY, LAYERS_KEY, LoroRoom, ROOM_KEY};

// Re-export Loro types peers need to exchange updates
pub use loro::{ExportMode, VersionVector};
