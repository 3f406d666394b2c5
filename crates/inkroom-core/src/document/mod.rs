//! The shared-document contract the interaction engine mutates.
//!
//! A backend exposes the replicated layer map, the layer order list, a
//! presence slot per client and local history primitives. Conflict
//! resolution, persistence and transport belong to the backend.

mod memory;

pub use memory::{MemoryClient, MemoryRoom};

use crate::error::DocumentResult;
use crate::layers::{Layer, LayerId, LayerPatch, PenPoint, Rgb};
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Background color of a new room.
pub const DEFAULT_BACKGROUND: Rgb = Rgb::black();

/// Identifier of a participant in a room.
pub type ClientId = u64;

/// Handle returned by [`SharedDocument::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);

/// Per-client interaction state replicated to other participants.
///
/// Only its owner may change it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Presence {
    /// Selected layer ids. Order is kept so "first selected" is deterministic.
    pub selection: Vec<LayerId>,
    /// Pointer position in canvas coordinates.
    pub cursor: Option<Point>,
    /// In-progress pencil stroke.
    pub pencil_draft: Option<Vec<PenPoint>>,
    pub pen_color: Option<Rgb>,
}

/// Partial presence update. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PresencePatch {
    pub selection: Option<Vec<LayerId>>,
    pub cursor: Option<Option<Point>>,
    pub pencil_draft: Option<Option<Vec<PenPoint>>>,
    pub pen_color: Option<Option<Rgb>>,
}

impl PresencePatch {
    pub fn selection(ids: Vec<LayerId>) -> Self {
        Self {
            selection: Some(ids),
            ..Self::default()
        }
    }

    pub fn cursor(cursor: Option<Point>) -> Self {
        Self {
            cursor: Some(cursor),
            ..Self::default()
        }
    }

    pub fn pencil_draft(draft: Option<Vec<PenPoint>>) -> Self {
        Self {
            pencil_draft: Some(draft),
            ..Self::default()
        }
    }

    pub fn with_pen_color(mut self, color: Option<Rgb>) -> Self {
        self.pen_color = Some(color);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge the inverse of a later update into this one. Fields already set
    /// here hold older values and are kept.
    pub fn absorb(&mut self, later: PresencePatch) {
        if self.selection.is_none() {
            self.selection = later.selection;
        }
        if self.cursor.is_none() {
            self.cursor = later.cursor;
        }
        if self.pencil_draft.is_none() {
            self.pencil_draft = later.pencil_draft;
        }
        if self.pen_color.is_none() {
            self.pen_color = later.pen_color;
        }
    }

    /// Apply to a presence and return the patch that reverts it.
    pub fn apply(self, presence: &mut Presence) -> PresencePatch {
        let mut inverse = PresencePatch::default();
        if let Some(selection) = self.selection {
            inverse.selection = Some(std::mem::replace(&mut presence.selection, selection));
        }
        if let Some(cursor) = self.cursor {
            inverse.cursor = Some(std::mem::replace(&mut presence.cursor, cursor));
        }
        if let Some(draft) = self.pencil_draft {
            inverse.pencil_draft = Some(std::mem::replace(&mut presence.pencil_draft, draft));
        }
        if let Some(color) = self.pen_color {
            inverse.pen_color = Some(std::mem::replace(&mut presence.pen_color, color));
        }
        inverse
    }
}

/// Where a change came from, relative to the subscribing client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeOrigin {
    Local,
    Remote,
}

/// Notification delivered to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentEvent {
    /// A layer was inserted, updated or deleted.
    LayerChanged { id: LayerId, origin: ChangeOrigin },
    /// The layer order changed.
    OrderChanged { origin: ChangeOrigin },
    /// A participant's presence changed.
    PresenceChanged { client: ClientId, origin: ChangeOrigin },
    /// The shared background color changed.
    BackgroundChanged { origin: ChangeOrigin },
}

impl DocumentEvent {
    pub fn origin(&self) -> ChangeOrigin {
        match self {
            DocumentEvent::LayerChanged { origin, .. }
            | DocumentEvent::OrderChanged { origin }
            | DocumentEvent::PresenceChanged { origin, .. }
            | DocumentEvent::BackgroundChanged { origin } => *origin,
        }
    }
}

/// Subscriber callback.
pub type Listener = Box<dyn FnMut(&DocumentEvent)>;

/// A replicated layer document plus presence channel, as seen by one client.
///
/// Every mutation applies locally at once and is replicated by the backend.
/// Mutations that target a missing layer are no-ops and report `false`.
pub trait SharedDocument {
    /// Id of the local participant.
    fn client_id(&self) -> ClientId;

    /// Get a layer by id.
    fn layer(&self, id: &LayerId) -> Option<Layer>;

    /// Number of layers in the map.
    fn layer_count(&self) -> usize;

    /// Layer ids in paint order (bottom first).
    fn layer_ids(&self) -> Vec<LayerId>;

    fn contains_layer(&self, id: &LayerId) -> bool {
        self.layer(id).is_some()
    }

    /// Insert or replace a layer.
    fn set_layer(&mut self, id: LayerId, layer: Layer) -> DocumentResult<()>;

    /// Apply a field-level patch. Returns `false` if the layer is missing.
    fn update_layer(&mut self, id: &LayerId, patch: &LayerPatch) -> DocumentResult<bool>;

    /// Remove a layer from the map. Returns `false` if it was already gone.
    fn delete_layer(&mut self, id: &LayerId) -> DocumentResult<bool>;

    /// Append an id to the layer order. Ids already present are ignored.
    fn push_layer_id(&mut self, id: LayerId) -> DocumentResult<()>;

    /// Insert an id into the layer order at `index` (clamped to the length).
    fn insert_layer_id(&mut self, index: usize, id: LayerId) -> DocumentResult<()>;

    /// Remove an id from the layer order. Returns `false` if it was absent.
    fn remove_layer_id(&mut self, id: &LayerId) -> DocumentResult<bool>;

    /// The local participant's presence.
    fn presence(&self) -> Presence;

    /// Presence of every other participant.
    fn others(&self) -> Vec<(ClientId, Presence)>;

    /// Partially update the local presence. With `add_to_history` the update
    /// is recorded as an undoable step.
    fn update_presence(&mut self, patch: PresencePatch, add_to_history: bool) -> DocumentResult<()>;

    /// Background color shared by everyone in the room.
    fn background(&self) -> Rgb;

    /// Replace the shared background color as an undoable change.
    fn set_background(&mut self, color: Rgb) -> DocumentResult<()>;

    /// Start an atomic batch. Batches nest; changes inside one form a single
    /// history step and subscribers are notified when the outermost batch ends.
    fn begin_batch(&mut self);

    fn end_batch(&mut self) -> DocumentResult<()>;

    /// Stop recording separate history steps. Everything recorded until
    /// [`resume_history`](Self::resume_history) becomes one step.
    fn pause_history(&mut self);

    fn resume_history(&mut self);

    fn undo(&mut self) -> DocumentResult<bool>;

    fn redo(&mut self) -> DocumentResult<bool>;

    fn can_undo(&self) -> bool;

    fn can_redo(&self) -> bool;

    /// Register a listener for local and remote changes.
    fn subscribe(&mut self, listener: Listener) -> SubscriptionId;

    /// Remove a listener. Returns `false` if the id is unknown.
    fn unsubscribe(&mut self, id: SubscriptionId) -> bool;
}
