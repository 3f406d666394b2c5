//! In-process room with several participants.
//!
//! Every client joined to a [`MemoryRoom`] sees the same layer map, layer
//! order and presence table. History is kept per client as inverse
//! operations, so undoing one client's step only reverts the fields that step
//! wrote and never rolls back other clients' work wholesale.

use super::{
    ChangeOrigin, ClientId, DocumentEvent, Listener, Presence, PresencePatch, SharedDocument,
    SubscriptionId,
};
use crate::error::{DocumentError, DocumentResult};
use crate::layers::{Layer, LayerId, LayerPatch, Rgb};
use std::cell::{RefCell, RefMut};
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

/// Default number of undo steps kept per client.
pub const DEFAULT_MAX_HISTORY: usize = 100;

/// What a mutation touched, turned into a [`DocumentEvent`] per subscriber.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Change {
    Layer(LayerId),
    Order,
    Presence(ClientId),
    Background,
}

impl Change {
    fn event(self, origin: ChangeOrigin) -> DocumentEvent {
        match self {
            Change::Layer(id) => DocumentEvent::LayerChanged { id, origin },
            Change::Order => DocumentEvent::OrderChanged { origin },
            Change::Presence(client) => DocumentEvent::PresenceChanged { client, origin },
            Change::Background => DocumentEvent::BackgroundChanged { origin },
        }
    }
}

/// A reversible primitive operation.
#[derive(Debug, Clone)]
enum Op {
    SetLayer { id: LayerId, layer: Option<Layer> },
    PatchLayer { id: LayerId, patch: LayerPatch },
    InsertId { index: usize, id: LayerId },
    RemoveId { id: LayerId },
    Presence(PresencePatch),
    Background(Rgb),
}

struct ListenerEntry {
    id: SubscriptionId,
    client: ClientId,
    listener: Listener,
}

#[derive(Default)]
struct RoomState {
    layers: HashMap<LayerId, Layer>,
    order: Vec<LayerId>,
    background: Rgb,
    presences: BTreeMap<ClientId, Presence>,
    listeners: Vec<ListenerEntry>,
    next_client: ClientId,
    next_subscription: u64,
    /// Layer limit enforced on undo and redo.
    max_layers: Option<usize>,
}

impl RoomState {
    /// Replace (or remove) a layer, returning the operation that restores it.
    fn set_layer(&mut self, id: LayerId, layer: Option<Layer>) -> Op {
        let previous = match layer {
            Some(layer) => self.layers.insert(id, layer),
            None => self.layers.remove(&id),
        };
        Op::SetLayer { id, layer: previous }
    }

    fn patch_layer(&mut self, id: LayerId, patch: &LayerPatch) -> Option<Op> {
        let layer = self.layers.get_mut(&id)?;
        let inverse = layer.apply_patch(patch);
        Some(Op::PatchLayer { id, patch: inverse })
    }

    fn insert_id(&mut self, index: usize, id: LayerId) -> Option<Op> {
        if self.order.contains(&id) {
            return None;
        }
        let index = index.min(self.order.len());
        self.order.insert(index, id);
        Some(Op::RemoveId { id })
    }

    fn remove_id(&mut self, id: LayerId) -> Option<Op> {
        let index = self.order.iter().position(|existing| *existing == id)?;
        self.order.remove(index);
        Some(Op::InsertId { index, id })
    }

    fn patch_presence(&mut self, client: ClientId, patch: PresencePatch) -> Op {
        let presence = self.presences.entry(client).or_default();
        Op::Presence(patch.apply(presence))
    }

    fn set_background(&mut self, color: Rgb) -> Op {
        Op::Background(std::mem::replace(&mut self.background, color))
    }

    /// Number of layers once `step` is applied.
    fn layer_count_after(&self, step: &[Op]) -> usize {
        // Steps apply back to front, so the first write to an id wins.
        let mut present: HashMap<LayerId, bool> = HashMap::new();
        for op in step.iter().rev() {
            if let Op::SetLayer { id, layer } = op {
                present.insert(*id, layer.is_some());
            }
        }
        present
            .into_iter()
            .fold(self.layers.len(), |count, (id, present)| {
                match (self.layers.contains_key(&id), present) {
                    (false, true) => count + 1,
                    (true, false) => count - 1,
                    _ => count,
                }
            })
    }

    /// Whether applying `step` would grow the room past its layer limit.
    fn exceeds_capacity(&self, step: &[Op]) -> bool {
        let Some(max) = self.max_layers else {
            return false;
        };
        let after = self.layer_count_after(step);
        after > max && after > self.layers.len()
    }

    /// Apply an operation on behalf of `client`, returning its inverse and
    /// the change it caused. Operations on vanished layers are skipped.
    fn apply(&mut self, op: Op, client: ClientId) -> Option<(Op, Change)> {
        match op {
            Op::SetLayer { id, layer } => Some((self.set_layer(id, layer), Change::Layer(id))),
            Op::PatchLayer { id, patch } => {
                self.patch_layer(id, &patch).map(|inverse| (inverse, Change::Layer(id)))
            }
            // Never restore an id whose layer is gone.
            Op::InsertId { index, id } if self.layers.contains_key(&id) => {
                self.insert_id(index, id).map(|inverse| (inverse, Change::Order))
            }
            Op::InsertId { .. } => None,
            Op::RemoveId { id } => self.remove_id(id).map(|inverse| (inverse, Change::Order)),
            Op::Presence(patch) => {
                let patch = retain_existing(patch, &self.layers);
                Some((self.patch_presence(client, patch), Change::Presence(client)))
            }
            Op::Background(color) => Some((self.set_background(color), Change::Background)),
        }
    }
}

/// Drop ids of layers that no longer exist from a restored selection.
fn retain_existing(mut patch: PresencePatch, layers: &HashMap<LayerId, Layer>) -> PresencePatch {
    if let Some(selection) = patch.selection.as_mut() {
        selection.retain(|id| layers.contains_key(id));
    }
    patch
}

/// Undo/redo stacks of one client.
#[derive(Debug)]
struct History {
    undo: Vec<Vec<Op>>,
    redo: Vec<Vec<Op>>,
    /// Operations of the batch in progress.
    batch: Vec<Op>,
    /// Operations recorded while paused.
    paused: Option<Vec<Op>>,
    max_steps: usize,
}

impl History {
    fn new(max_steps: usize) -> Self {
        Self {
            undo: Vec::new(),
            redo: Vec::new(),
            batch: Vec::new(),
            paused: None,
            max_steps,
        }
    }

    fn commit(&mut self, ops: Vec<Op>) {
        if ops.is_empty() {
            return;
        }
        if let Some(paused) = self.paused.as_mut() {
            paused.extend(ops);
            return;
        }
        self.push_undo(ops);
        self.redo.clear();
    }

    fn push_undo(&mut self, ops: Vec<Op>) {
        self.undo.push(ops);
        if self.undo.len() > self.max_steps {
            let excess = self.undo.len() - self.max_steps;
            self.undo.drain(..excess);
        }
    }
}

/// A shared in-process room.
#[derive(Clone, Default)]
pub struct MemoryRoom {
    state: Rc<RefCell<RoomState>>,
}

impl MemoryRoom {
    /// Create an empty room.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty room whose undo and redo never grow it past `max_layers`.
    pub fn with_max_layers(max_layers: usize) -> Self {
        let room = Self::default();
        room.state.borrow_mut().max_layers = Some(max_layers);
        room
    }

    /// Join the room as a new participant.
    pub fn join(&self) -> MemoryClient {
        self.join_with_history(DEFAULT_MAX_HISTORY)
    }

    /// Join with a custom undo depth.
    pub fn join_with_history(&self, max_steps: usize) -> MemoryClient {
        let id = {
            let mut state = self.state.borrow_mut();
            state.next_client += 1;
            let id = state.next_client;
            state.presences.insert(id, Presence::default());
            id
        };
        log::debug!("Client {} joined room", id);
        MemoryClient {
            id,
            room: Rc::clone(&self.state),
            history: History::new(max_steps),
            batch_depth: 0,
            pending_changes: Vec::new(),
        }
    }

    /// Number of connected participants.
    pub fn client_count(&self) -> usize {
        self.state.borrow().presences.len()
    }

    /// Current layers in paint order.
    pub fn layers(&self) -> Vec<(LayerId, Layer)> {
        let state = self.state.borrow();
        state
            .order
            .iter()
            .filter_map(|id| state.layers.get(id).map(|layer| (*id, layer.clone())))
            .collect()
    }
}

/// One participant's handle on a [`MemoryRoom`].
pub struct MemoryClient {
    id: ClientId,
    room: Rc<RefCell<RoomState>>,
    history: History,
    batch_depth: usize,
    pending_changes: Vec<Change>,
}

impl MemoryClient {
    fn state_mut(&self) -> DocumentResult<RefMut<'_, RoomState>> {
        self.room
            .try_borrow_mut()
            .map_err(|_| DocumentError::Backend("room is already being mutated".to_string()))
    }

    fn record(&mut self, op: Op) {
        if self.batch_depth > 0 {
            self.history.batch.push(op);
        } else {
            self.history.commit(vec![op]);
        }
    }

    fn changed(&mut self, change: Change) {
        self.pending_changes.push(change);
        self.flush_changes();
    }

    /// Notify subscribers of everything changed since the last flush.
    fn flush_changes(&mut self) {
        if self.batch_depth > 0 || self.pending_changes.is_empty() {
            return;
        }
        let changes = std::mem::take(&mut self.pending_changes);

        // Listeners run without the room borrowed so they can read it.
        let mut listeners = match self.room.try_borrow_mut() {
            Ok(mut state) => std::mem::take(&mut state.listeners),
            Err(_) => {
                log::warn!("Dropping {} change notifications: room busy", changes.len());
                return;
            }
        };
        for entry in listeners.iter_mut() {
            let origin = if entry.client == self.id {
                ChangeOrigin::Local
            } else {
                ChangeOrigin::Remote
            };
            for change in &changes {
                (entry.listener)(&change.event(origin));
            }
        }
        if let Ok(mut state) = self.room.try_borrow_mut() {
            listeners.append(&mut state.listeners);
            state.listeners = listeners;
        }
    }

    /// Apply a history step, returning the step that reverts it.
    fn apply_step(&mut self, step: Vec<Op>) -> DocumentResult<Vec<Op>> {
        let mut inverse = Vec::with_capacity(step.len());
        let mut changes = Vec::with_capacity(step.len());
        {
            // Layers first, then the order ids and selections that refer to them.
            let mut layer_ops = Vec::new();
            let mut order_ops = Vec::new();
            let mut presence_ops = Vec::new();
            for op in step.into_iter().rev() {
                match op {
                    Op::InsertId { .. } | Op::RemoveId { .. } => order_ops.push(op),
                    Op::Presence(_) => presence_ops.push(op),
                    Op::SetLayer { .. } | Op::PatchLayer { .. } | Op::Background(_) => layer_ops.push(op),
                }
            }
            let mut state = self.state_mut()?;
            for op in layer_ops.into_iter().chain(order_ops).chain(presence_ops) {
                if let Some((op, change)) = state.apply(op, self.id) {
                    inverse.push(op);
                    changes.push(change);
                }
            }
        }
        self.pending_changes.extend(changes);
        self.flush_changes();
        Ok(inverse)
    }

    /// Refuse a step that would break the room's layer limit.
    fn fits_capacity(&self, step: &[Op]) -> bool {
        if self.room.borrow().exceeds_capacity(step) {
            log::warn!("Client {}: history step refused, layer limit reached", self.id);
            return false;
        }
        true
    }

    /// Number of available undo steps.
    pub fn undo_count(&self) -> usize {
        self.history.undo.len()
    }

    pub fn redo_count(&self) -> usize {
        self.history.redo.len()
    }

    /// Check if history recording is paused.
    pub fn is_history_paused(&self) -> bool {
        self.history.paused.is_some()
    }
}

impl Drop for MemoryClient {
    fn drop(&mut self) {
        if let Ok(mut state) = self.room.try_borrow_mut() {
            state.presences.remove(&self.id);
            state.listeners.retain(|entry| entry.client != self.id);
        }
    }
}

impl SharedDocument for MemoryClient {
    fn client_id(&self) -> ClientId {
        self.id
    }

    fn layer(&self, id: &LayerId) -> Option<Layer> {
        self.room.borrow().layers.get(id).cloned()
    }

    fn layer_count(&self) -> usize {
        self.room.borrow().layers.len()
    }

    fn layer_ids(&self) -> Vec<LayerId> {
        self.room.borrow().order.clone()
    }

    fn contains_layer(&self, id: &LayerId) -> bool {
        self.room.borrow().layers.contains_key(id)
    }

    fn set_layer(&mut self, id: LayerId, layer: Layer) -> DocumentResult<()> {
        let inverse = self.state_mut()?.set_layer(id, Some(layer));
        self.record(inverse);
        self.changed(Change::Layer(id));
        Ok(())
    }

    fn update_layer(&mut self, id: &LayerId, patch: &LayerPatch) -> DocumentResult<bool> {
        if patch.is_empty() {
            return Ok(self.contains_layer(id));
        }
        let Some(inverse) = self.state_mut()?.patch_layer(*id, patch) else {
            return Ok(false);
        };
        self.record(inverse);
        self.changed(Change::Layer(*id));
        Ok(true)
    }

    fn delete_layer(&mut self, id: &LayerId) -> DocumentResult<bool> {
        let inverse = self.state_mut()?.set_layer(*id, None);
        let Op::SetLayer { layer: Some(_), .. } = &inverse else {
            return Ok(false);
        };
        self.record(inverse);
        self.changed(Change::Layer(*id));
        Ok(true)
    }

    fn push_layer_id(&mut self, id: LayerId) -> DocumentResult<()> {
        self.insert_layer_id(usize::MAX, id)
    }

    fn insert_layer_id(&mut self, index: usize, id: LayerId) -> DocumentResult<()> {
        let Some(inverse) = self.state_mut()?.insert_id(index, id) else {
            return Ok(());
        };
        self.record(inverse);
        self.changed(Change::Order);
        Ok(())
    }

    fn remove_layer_id(&mut self, id: &LayerId) -> DocumentResult<bool> {
        let Some(inverse) = self.state_mut()?.remove_id(*id) else {
            return Ok(false);
        };
        self.record(inverse);
        self.changed(Change::Order);
        Ok(true)
    }

    fn presence(&self) -> Presence {
        self.room
            .borrow()
            .presences
            .get(&self.id)
            .cloned()
            .unwrap_or_default()
    }

    fn others(&self) -> Vec<(ClientId, Presence)> {
        self.room
            .borrow()
            .presences
            .iter()
            .filter(|(client, _)| **client != self.id)
            .map(|(client, presence)| (*client, presence.clone()))
            .collect()
    }

    fn update_presence(&mut self, patch: PresencePatch, add_to_history: bool) -> DocumentResult<()> {
        if patch.is_empty() {
            return Ok(());
        }
        let inverse = self.state_mut()?.patch_presence(self.id, patch);
        if add_to_history {
            self.record(inverse);
        }
        self.changed(Change::Presence(self.id));
        Ok(())
    }

    fn background(&self) -> Rgb {
        self.room.borrow().background
    }

    fn set_background(&mut self, color: Rgb) -> DocumentResult<()> {
        if self.background() == color {
            return Ok(());
        }
        let inverse = self.state_mut()?.set_background(color);
        self.record(inverse);
        self.changed(Change::Background);
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
            let ops = std::mem::take(&mut self.history.batch);
            self.history.commit(ops);
            self.flush_changes();
        }
        Ok(())
    }

    fn pause_history(&mut self) {
        if self.history.paused.is_none() {
            self.history.paused = Some(Vec::new());
        }
    }

    fn resume_history(&mut self) {
        if let Some(ops) = self.history.paused.take() {
            self.history.commit(ops);
        }
    }

    fn undo(&mut self) -> DocumentResult<bool> {
        let Some(step) = self.history.undo.pop() else {
            return Ok(false);
        };
        if !self.fits_capacity(&step) {
            self.history.undo.push(step);
            return Ok(false);
        }
        let inverse = self.apply_step(step)?;
        if !inverse.is_empty() {
            self.history.redo.push(inverse);
        }
        Ok(true)
    }

    fn redo(&mut self) -> DocumentResult<bool> {
        let Some(step) = self.history.redo.pop() else {
            return Ok(false);
        };
        if !self.fits_capacity(&step) {
            self.history.redo.push(step);
            return Ok(false);
        }
        let inverse = self.apply_step(step)?;
        if !inverse.is_empty() {
            self.history.push_undo(inverse);
        }
        Ok(true)
    }

    fn can_undo(&self) -> bool {
        !self.history.undo.is_empty()
    }

    fn can_redo(&self) -> bool {
        !self.history.redo.is_empty()
    }

    fn subscribe(&mut self, listener: Listener) -> SubscriptionId {
        let mut state = self.room.borrow_mut();
        state.next_subscription += 1;
        let id = SubscriptionId(state.next_subscription);
        state.listeners.push(ListenerEntry {
            id,
            client: self.id,
            listener,
        });
        id
    }

    fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let mut state = self.room.borrow_mut();
        let before = state.listeners.len();
        state.listeners.retain(|entry| entry.id != id);
        state.listeners.len() != before
    }
}
