//! Shared document backed by a Loro CRDT.

use super::convert::{color_from_value, color_to_value, layer_from_loro, layer_to_loro, patch_to_loro};
use crate::document::{
    ChangeOrigin, ClientId, DEFAULT_BACKGROUND, DocumentEvent, Listener, Presence, PresencePatch,
    SharedDocument, SubscriptionId,
};
use crate::error::{DocumentError, DocumentResult};
use crate::layers::{Layer, LayerId, LayerPatch, Rgb};
use loro::{
    Container, ExportMode, LoroDoc, LoroError, LoroList, LoroMap, LoroValue, UndoManager,
    ValueOrContainer, VersionVector,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use uuid::Uuid;

/// Key for the layers map in the document.
pub const LAYERS_KEY: &str = "layers";
/// Key for the layer order list in the document.
pub const LAYER_ORDER_KEY: &str = "layer_order";
/// Key for the room-wide settings map in the document.
pub const ROOM_KEY: &str = "room";
/// Key of the background color inside the room map.
pub const BACKGROUND_KEY: &str = "background";

const DEFAULT_MAX_HISTORY: usize = 100;

/// One local history step.
///
/// `doc` marks a step that owns the top item of Loro's undo (or redo) stack.
/// `presence` holds the patch that restores the local presence.
#[derive(Debug, Default)]
struct Step {
    doc: bool,
    presence: Option<PresencePatch>,
}

impl Step {
    fn is_empty(&self) -> bool {
        !self.doc && self.presence.is_none()
    }
}

/// A [`SharedDocument`] on top of a `LoroDoc`.
///
/// Each layer is a nested `LoroMap`, so concurrent writes to different fields
/// of the same layer both survive and writes to the same field resolve
/// last-writer-wins. Presence is ephemeral and lives beside the document;
/// peers exchange it through [`apply_remote_presence`](Self::apply_remote_presence).
///
/// Document history comes from Loro's `UndoManager` and covers changes made
/// by this peer. Presence updates flagged for history are kept on a step
/// stack beside it, so one undo reverts both halves of a step.
pub struct LoroRoom {
    doc: LoroDoc,
    undo_manager: UndoManager,
    presence: Presence,
    others: BTreeMap<ClientId, Presence>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
    batch_depth: usize,
    history_paused: bool,
    pending_events: Vec<DocumentEvent>,
    undo_steps: Vec<Step>,
    redo_steps: Vec<Step>,
    /// Step being recorded by the open batch or paused gesture.
    open_step: Step,
    /// Local op counter at the last step boundary.
    recorded_counter: i32,
    max_history: usize,
    max_layers: Option<usize>,
}

impl LoroRoom {
    /// Create a new empty document.
    pub fn new() -> Self {
        Self::from_doc(LoroDoc::new())
    }

    /// Create a document from a snapshot.
    pub fn from_snapshot(bytes: &[u8]) -> DocumentResult<Self> {
        let doc = LoroDoc::new();
        doc.import(bytes)?;
        Ok(Self::from_doc(doc))
    }

    fn from_doc(doc: LoroDoc) -> Self {
        let mut undo_manager = UndoManager::new(&doc);
        undo_manager.set_max_undo_steps(DEFAULT_MAX_HISTORY);
        // Steps are delimited explicitly by commits and groups.
        undo_manager.set_merge_interval(0);
        let mut room = Self {
            doc,
            undo_manager,
            presence: Presence::default(),
            others: BTreeMap::new(),
            listeners: Vec::new(),
            next_subscription: 0,
            batch_depth: 0,
            history_paused: false,
            pending_events: Vec::new(),
            undo_steps: Vec::new(),
            redo_steps: Vec::new(),
            open_step: Step::default(),
            recorded_counter: 0,
            max_history: DEFAULT_MAX_HISTORY,
            max_layers: None,
        };
        room.recorded_counter = room.local_counter();
        room
    }

    /// Get the underlying LoroDoc.
    pub fn loro_doc(&self) -> &LoroDoc {
        &self.doc
    }

    fn layers_map(&self) -> LoroMap {
        self.doc.get_map(LAYERS_KEY)
    }

    fn order_list(&self) -> LoroList {
        self.doc.get_list(LAYER_ORDER_KEY)
    }

    fn layer_map(&self, id: &LayerId) -> Option<LoroMap> {
        match self.layers_map().get(&id.to_string())? {
            ValueOrContainer::Container(Container::Map(map)) => Some(map),
            _ => None,
        }
    }

    fn order_index(&self, id: &LayerId) -> Option<usize> {
        let key = id.to_string();
        let list = self.order_list();
        (0..list.len()).find(|&i| {
            matches!(
                list.get(i),
                Some(ValueOrContainer::Value(LoroValue::String(s))) if s.to_string() == key
            )
        })
    }

    /// Commit pending operations unless a batch is open.
    fn commit(&mut self) {
        if self.batch_depth == 0 {
            self.doc.commit();
            self.close_step();
        }
    }

    /// Number of ops this peer has written so far.
    fn local_counter(&self) -> i32 {
        self.doc
            .oplog_vv()
            .get(&self.doc.peer_id())
            .copied()
            .unwrap_or(0)
    }

    /// Seal the open step and push it onto the undo stack. Does nothing while
    /// a batch is open or history is paused.
    fn close_step(&mut self) {
        if self.batch_depth > 0 || self.history_paused {
            return;
        }
        let counter = self.local_counter();
        // Loro records an undo item exactly when the commit wrote local ops.
        self.open_step.doc = counter != self.recorded_counter;
        self.recorded_counter = counter;

        let step = std::mem::take(&mut self.open_step);
        if step.is_empty() {
            return;
        }
        self.undo_steps.push(step);
        if self.undo_steps.len() > self.max_history {
            let excess = self.undo_steps.len() - self.max_history;
            self.undo_steps.drain(..excess);
        }
        self.redo_steps.clear();
    }

    /// Apply a presence patch outside history, returning its inverse.
    fn restore_presence(&mut self, mut patch: PresencePatch) -> PresencePatch {
        if let Some(selection) = patch.selection.as_mut() {
            selection.retain(|id| self.layer_map(id).is_some());
        }
        let inverse = patch.apply(&mut self.presence);
        let client = self.client_id();
        self.emit(DocumentEvent::PresenceChanged {
            client,
            origin: ChangeOrigin::Local,
        });
        inverse
    }

    /// Replay one history step through `manager_op` (Loro's undo or redo),
    /// returning the step that reverts it. A step the layer limit refuses is
    /// handed back unapplied.
    fn apply_step(
        &mut self,
        step: Step,
        manager_op: fn(&mut UndoManager) -> Result<bool, LoroError>,
        revert_op: fn(&mut UndoManager) -> Result<bool, LoroError>,
    ) -> DocumentResult<Result<Step, Step>> {
        if step.doc {
            let max_layers = self.max_layers;
            let refused = self.with_change_detection(ChangeOrigin::Local, |room| {
                let before = room.layer_count();
                manager_op(&mut room.undo_manager)?;
                let after = room.layer_count();
                let refused = max_layers.is_some_and(|max| after > max && after > before);
                if refused {
                    revert_op(&mut room.undo_manager)?;
                }
                room.doc.commit();
                Ok(refused)
            })?;
            self.recorded_counter = self.local_counter();
            if refused {
                log::warn!("History step refused, layer limit reached");
                return Ok(Err(step));
            }
        }
        let presence = step.presence.map(|patch| self.restore_presence(patch));
        Ok(Ok(Step {
            doc: step.doc,
            presence,
        }))
    }

    fn emit(&mut self, event: DocumentEvent) {
        self.pending_events.push(event);
        self.flush_events();
    }

    fn flush_events(&mut self) {
        if self.batch_depth > 0 {
            return;
        }
        let events = std::mem::take(&mut self.pending_events);
        for (_, listener) in self.listeners.iter_mut() {
            for event in &events {
                listener(event);
            }
        }
    }

    /// All layers keyed by id, for change detection around imports and undo.
    fn layer_state(&self) -> (Vec<LayerId>, HashMap<LayerId, Layer>, Rgb) {
        let mut layers = HashMap::new();
        if let LoroValue::Map(map) = self.layers_map().get_deep_value() {
            for (key, value) in map.iter() {
                let (Ok(id), LoroValue::Map(layer)) = (Uuid::parse_str(key), value) else {
                    continue;
                };
                if let Some(layer) = layer_from_loro(layer) {
                    layers.insert(id, layer);
                }
            }
        }
        (self.layer_ids(), layers, self.background())
    }

    /// Run a document-wide operation and notify subscribers of what it changed.
    fn with_change_detection<T>(
        &mut self,
        origin: ChangeOrigin,
        op: impl FnOnce(&mut Self) -> DocumentResult<T>,
    ) -> DocumentResult<T> {
        let (order_before, layers_before, background_before) = self.layer_state();
        let result = op(self)?;
        let (order_after, layers_after, background_after) = self.layer_state();

        let mut ids: Vec<LayerId> = layers_before
            .keys()
            .chain(layers_after.keys())
            .copied()
            .filter(|id| layers_before.get(id) != layers_after.get(id))
            .collect();
        ids.sort();
        ids.dedup();
        for id in ids {
            self.pending_events.push(DocumentEvent::LayerChanged { id, origin });
        }
        if order_before != order_after {
            self.pending_events.push(DocumentEvent::OrderChanged { origin });
        }
        if background_before != background_after {
            self.pending_events.push(DocumentEvent::BackgroundChanged { origin });
        }
        self.flush_events();
        Ok(result)
    }

    /// Export the document as a snapshot (full state).
    pub fn export_snapshot(&self) -> DocumentResult<Vec<u8>> {
        self.doc
            .export(ExportMode::Snapshot)
            .map_err(|e| DocumentError::Backend(e.to_string()))
    }

    /// Export incremental updates since a version.
    pub fn export_updates(&self, since: &VersionVector) -> DocumentResult<Vec<u8>> {
        self.doc
            .export(ExportMode::updates(since))
            .map_err(|e| DocumentError::Backend(e.to_string()))
    }

    /// Get the current version vector.
    pub fn version(&self) -> VersionVector {
        self.doc.oplog_vv()
    }

    /// Import updates or a snapshot from another peer.
    pub fn import(&mut self, bytes: &[u8]) -> DocumentResult<()> {
        self.with_change_detection(ChangeOrigin::Remote, |room| {
            room.doc.import(bytes)?;
            Ok(())
        })?;
        log::debug!("Imported {} bytes from peer", bytes.len());
        Ok(())
    }

    /// Record another peer's presence as received over the wire.
    pub fn apply_remote_presence(&mut self, client: ClientId, presence: Presence) {
        self.others.insert(client, presence);
        self.emit(DocumentEvent::PresenceChanged {
            client,
            origin: ChangeOrigin::Remote,
        });
    }

    /// Forget a peer that left.
    pub fn remove_peer(&mut self, client: ClientId) {
        if self.others.remove(&client).is_some() {
            self.emit(DocumentEvent::PresenceChanged {
                client,
                origin: ChangeOrigin::Remote,
            });
        }
    }

    /// Limit how many undo steps are kept.
    pub fn set_max_history(&mut self, steps: usize) {
        self.max_history = steps;
        self.undo_manager.set_max_undo_steps(steps);
    }

    /// Refuse undo and redo steps that would grow the document past `max` layers.
    pub fn set_max_layers(&mut self, max: usize) {
        self.max_layers = Some(max);
    }

    /// Get the number of available undo steps.
    pub fn undo_count(&self) -> usize {
        self.undo_steps.len()
    }
}

impl Default for LoroRoom {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedDocument for LoroRoom {
    fn client_id(&self) -> ClientId {
        self.doc.peer_id()
    }

    fn layer(&self, id: &LayerId) -> Option<Layer> {
        match self.layer_map(id)?.get_deep_value() {
            LoroValue::Map(map) => layer_from_loro(&map),
            _ => None,
        }
    }

    fn layer_count(&self) -> usize {
        self.layer_ids().len()
    }

    /// Concurrent reorders and deletes can leave duplicate or dangling ids in
    /// the list; only the first entry of a live layer counts.
    fn layer_ids(&self) -> Vec<LayerId> {
        let list = self.order_list();
        let layers = self.layers_map();
        let mut seen = HashSet::new();
        let mut result = Vec::with_capacity(list.len());
        for i in 0..list.len() {
            let Some(ValueOrContainer::Value(LoroValue::String(key))) = list.get(i) else {
                continue;
            };
            let key = key.to_string();
            let Ok(id) = Uuid::parse_str(&key) else {
                continue;
            };
            if layers.get(&key).is_some() && seen.insert(id) {
                result.push(id);
            }
        }
        result
    }

    fn contains_layer(&self, id: &LayerId) -> bool {
        self.layer_map(id).is_some()
    }

    fn set_layer(&mut self, id: LayerId, layer: Layer) -> DocumentResult<()> {
        let map = self
            .layers_map()
            .insert_container(&id.to_string(), LoroMap::new())?;
        layer_to_loro(&layer, &map)?;
        self.commit();
        self.emit(DocumentEvent::LayerChanged {
            id,
            origin: ChangeOrigin::Local,
        });
        Ok(())
    }

    fn update_layer(&mut self, id: &LayerId, patch: &LayerPatch) -> DocumentResult<bool> {
        let Some(map) = self.layer_map(id) else {
            return Ok(false);
        };
        if patch.is_empty() {
            return Ok(true);
        }
        patch_to_loro(patch, &map)?;
        self.commit();
        self.emit(DocumentEvent::LayerChanged {
            id: *id,
            origin: ChangeOrigin::Local,
        });
        Ok(true)
    }

    fn delete_layer(&mut self, id: &LayerId) -> DocumentResult<bool> {
        if !self.contains_layer(id) {
            return Ok(false);
        }
        self.layers_map().delete(&id.to_string())?;
        self.commit();
        self.emit(DocumentEvent::LayerChanged {
            id: *id,
            origin: ChangeOrigin::Local,
        });
        Ok(true)
    }

    fn push_layer_id(&mut self, id: LayerId) -> DocumentResult<()> {
        let len = self.order_list().len();
        self.insert_layer_id(len, id)
    }

    fn insert_layer_id(&mut self, index: usize, id: LayerId) -> DocumentResult<()> {
        if self.order_index(&id).is_some() {
            return Ok(());
        }
        let list = self.order_list();
        let index = index.min(list.len());
        list.insert(index, id.to_string())?;
        self.commit();
        self.emit(DocumentEvent::OrderChanged {
            origin: ChangeOrigin::Local,
        });
        Ok(())
    }

    fn remove_layer_id(&mut self, id: &LayerId) -> DocumentResult<bool> {
        let key = id.to_string();
        let list = self.order_list();
        let indices: Vec<usize> = (0..list.len())
            .filter(|&i| {
                matches!(
                    list.get(i),
                    Some(ValueOrContainer::Value(LoroValue::String(s))) if s.to_string() == key
                )
            })
            .collect();
        if indices.is_empty() {
            return Ok(false);
        }
        for index in indices.into_iter().rev() {
            list.delete(index, 1)?;
        }
        self.commit();
        self.emit(DocumentEvent::OrderChanged {
            origin: ChangeOrigin::Local,
        });
        Ok(true)
    }

    fn presence(&self) -> Presence {
        self.presence.clone()
    }

    fn others(&self) -> Vec<(ClientId, Presence)> {
        self.others
            .iter()
            .map(|(client, presence)| (*client, presence.clone()))
            .collect()
    }

    fn update_presence(&mut self, patch: PresencePatch, add_to_history: bool) -> DocumentResult<()> {
        if patch.is_empty() {
            return Ok(());
        }
        let inverse = patch.apply(&mut self.presence);
        if add_to_history {
            match self.open_step.presence.as_mut() {
                Some(open) => open.absorb(inverse),
                None => self.open_step.presence = Some(inverse),
            }
            self.close_step();
        }
        let client = self.client_id();
        self.emit(DocumentEvent::PresenceChanged {
            client,
            origin: ChangeOrigin::Local,
        });
        Ok(())
    }

    fn background(&self) -> Rgb {
        match self.doc.get_map(ROOM_KEY).get(BACKGROUND_KEY) {
            Some(ValueOrContainer::Value(value)) => color_from_value(&value),
            _ => None,
        }
        .unwrap_or(DEFAULT_BACKGROUND)
    }

    fn set_background(&mut self, color: Rgb) -> DocumentResult<()> {
        if self.background() == color {
            return Ok(());
        }
        self.doc
            .get_map(ROOM_KEY)
            .insert(BACKGROUND_KEY, color_to_value(Some(color)))?;
        self.commit();
        self.emit(DocumentEvent::BackgroundChanged {
            origin: ChangeOrigin::Local,
        });
        Ok(())
    }

    fn begin_batch(&mut self) {
        self.batch_depth += 1;
    }

    fn end_batch(&mut self) -> DocumentResult<()> {
        if self.batch_depth == 0 {
            return Err(DocumentError::Backend("end_batch without begin_batch".to_string()));
        }
        self.batch_depth -= 1;
        if self.batch_depth == 0 {
            self.doc.commit();
            self.close_step();
            self.flush_events();
        }
        Ok(())
    }

    fn pause_history(&mut self) {
        if self.history_paused {
            return;
        }
        self.doc.commit();
        self.close_step();
        let _ = self.undo_manager.group_start();
        self.history_paused = true;
    }

    fn resume_history(&mut self) {
        if !self.history_paused {
            return;
        }
        self.doc.commit();
        self.undo_manager.group_end();
        self.history_paused = false;
        self.close_step();
    }

    fn undo(&mut self) -> DocumentResult<bool> {
        let Some(step) = self.undo_steps.pop() else {
            return Ok(false);
        };
        match self.apply_step(step, UndoManager::undo, UndoManager::redo)? {
            Ok(inverse) => {
                self.redo_steps.push(inverse);
                Ok(true)
            }
            Err(step) => {
                self.undo_steps.push(step);
                Ok(false)
            }
        }
    }

    fn redo(&mut self) -> DocumentResult<bool> {
        let Some(step) = self.redo_steps.pop() else {
            return Ok(false);
        };
        match self.apply_step(step, UndoManager::redo, UndoManager::undo)? {
            Ok(inverse) => {
                self.undo_steps.push(inverse);
                Ok(true)
            }
            Err(step) => {
                self.redo_steps.push(step);
                Ok(false)
            }
        }
    }

    fn can_undo(&self) -> bool {
        !self.undo_steps.is_empty()
    }

    fn can_redo(&self) -> bool {
        !self.redo_steps.is_empty()
    }

    fn subscribe(&mut self, listener: Listener) -> SubscriptionId {
        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        self.listeners.push((id, listener));
        id
    }

    fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }
}
