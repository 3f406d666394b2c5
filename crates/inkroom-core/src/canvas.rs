//! Canvas interaction state machine.
//!
//! [`Canvas`] turns pointer, wheel and keyboard input into document mutations,
//! presence updates and camera changes. It owns the caller's camera and
//! interaction state; everything shared lives in the [`SharedDocument`].

use crate::camera::Camera;
use crate::config::EngineConfig;
use crate::document::{ClientId, Presence, SharedDocument};
use crate::error::CanvasResult;
use crate::geometry::{
    Handle, ResizeHandle, find_intersecting_layers, resize_bounds, selection_bounds,
    selection_handles,
};
use crate::history::HistoryController;
use crate::input::{InputEvent, KeyEvent, PointerButton, PointerEvent, WheelEvent};
use crate::layers::{Bounds, Layer, LayerId, LayerType, Rgb};
use crate::mutations;
use crate::shortcuts::{ShortcutAction, ShortcutRegistry};
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Tools the caller can switch to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tool {
    #[default]
    Select,
    Pan,
    Insert(LayerType),
    Pencil,
}

/// Local interaction mode. Never shared with other participants.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum CanvasState {
    #[default]
    Idle,
    /// Pressed on empty canvas; becomes a selection net once dragged far enough.
    PointerDown { origin: Point },
    /// Pan tool. `origin` is the last screen position while the pointer is held.
    Dragging { origin: Option<Point> },
    /// Waiting for a pointer release to place a layer.
    Inserting { layer_type: LayerType },
    SelectionNet { origin: Point, current: Point },
    /// Moving the selection; `current` is the last canvas position applied.
    Translating { current: Point },
    Resizing {
        initial_bounds: Bounds,
        handle: ResizeHandle,
    },
    Pencil,
    ContextMenu,
}

impl CanvasState {
    /// The tool this state belongs to.
    pub fn tool(&self) -> Tool {
        match self {
            CanvasState::Dragging { .. } => Tool::Pan,
            CanvasState::Inserting { layer_type } => Tool::Insert(*layer_type),
            CanvasState::Pencil => Tool::Pencil,
            _ => Tool::Select,
        }
    }
}

/// Everything a renderer needs to draw one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scene {
    /// Layers bottom to top.
    pub layers: Vec<(LayerId, Layer)>,
    pub presence: Presence,
    pub others: Vec<(ClientId, Presence)>,
    pub camera: Camera,
    /// Selection net rectangle in canvas coordinates.
    pub selection_net: Option<Bounds>,
    /// Union of the selected layers' bounds.
    pub selection_bounds: Option<Bounds>,
    /// Shared canvas background.
    pub background: Rgb,
    #[serde(skip)]
    pub handles: Vec<Handle>,
}

/// Interaction engine for one participant.
pub struct Canvas<D: SharedDocument> {
    doc: D,
    camera: Camera,
    state: CanvasState,
    config: EngineConfig,
    history: HistoryController,
    pen_color: Rgb,
}

impl<D: SharedDocument> Canvas<D> {
    pub fn new(doc: D, config: EngineConfig) -> Self {
        Self {
            doc,
            camera: Camera::from_config(&config),
            state: CanvasState::Idle,
            pen_color: config.default_pen_color,
            config,
            history: HistoryController::new(),
        }
    }

    pub fn document(&self) -> &D {
        &self.doc
    }

    pub fn document_mut(&mut self) -> &mut D {
        &mut self.doc
    }

    pub fn into_document(self) -> D {
        self.doc
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn state(&self) -> CanvasState {
        self.state
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn pen_color(&self) -> Rgb {
        self.pen_color
    }

    /// Color used for the next pencil stroke.
    pub fn set_pen_color(&mut self, color: Rgb) {
        self.pen_color = color;
    }

    /// Switch tools. An open gesture is closed first, and leaving the pencil
    /// discards its uncommitted stroke.
    pub fn set_tool(&mut self, tool: Tool) -> CanvasResult<()> {
        self.history.end_gesture(&mut self.doc);
        if self.state == CanvasState::Pencil && tool != Tool::Pencil {
            mutations::discard_pencil_draft(&mut self.doc)?;
        }
        self.state = match tool {
            Tool::Select => CanvasState::Idle,
            Tool::Pan => CanvasState::Dragging { origin: None },
            Tool::Insert(layer_type) => CanvasState::Inserting { layer_type },
            Tool::Pencil => CanvasState::Pencil,
        };
        log::debug!("Tool changed to {:?}", tool);
        Ok(())
    }

    /// The caller's selection, without ids of layers that no longer exist.
    pub fn selection(&self) -> Vec<LayerId> {
        self.doc
            .presence()
            .selection
            .into_iter()
            .filter(|id| self.doc.contains_layer(id))
            .collect()
    }

    pub fn dispatch(&mut self, event: &InputEvent) -> CanvasResult<()> {
        match event {
            InputEvent::PointerDown(e) => self.pointer_down(e),
            InputEvent::PointerMove(e) => self.pointer_move(e),
            InputEvent::PointerUp(e) => self.pointer_up(e),
            InputEvent::PointerLeave => self.pointer_leave(),
            InputEvent::Wheel(e) => {
                self.wheel(e);
                Ok(())
            }
            InputEvent::KeyDown(e) => self.key_down(e),
        }
    }

    /// Pointer pressed on the canvas. Resize handles win over layers, and
    /// layers are hit-tested top-most first.
    pub fn pointer_down(&mut self, event: &PointerEvent) -> CanvasResult<()> {
        let point = self.camera.screen_to_canvas(event.position);

        match self.state {
            CanvasState::Dragging { .. } => {
                self.state = CanvasState::Dragging {
                    origin: Some(event.position),
                };
            }
            CanvasState::Pencil => {
                if event.button == PointerButton::Primary {
                    mutations::start_drawing(&mut self.doc, point, event.pressure, self.pen_color)?;
                }
            }
            CanvasState::Idle => {
                let handle = match event.button {
                    PointerButton::Primary => self.handle_at(point),
                    _ => None,
                };
                if let Some((handle, initial_bounds)) = handle {
                    self.resize_handle_pointer_down(handle, initial_bounds);
                } else if let Some(id) = self.layer_at(point) {
                    self.layer_pointer_down(event, id)?;
                } else {
                    self.state = CanvasState::PointerDown { origin: point };
                }
            }
            // Placement happens on release; other states already own a gesture.
            _ => {}
        }
        Ok(())
    }

    /// Pointer pressed on a layer.
    pub fn layer_pointer_down(&mut self, event: &PointerEvent, id: LayerId) -> CanvasResult<()> {
        if matches!(self.state, CanvasState::Pencil | CanvasState::Inserting { .. }) {
            return Ok(());
        }

        // The selection change joins the gesture's undo step.
        self.history.begin_gesture(&mut self.doc);
        if !self.doc.presence().selection.contains(&id) {
            mutations::set_selection(&mut self.doc, vec![id], true)?;
        }

        let point = self.camera.screen_to_canvas(event.position);
        self.state = if event.button == PointerButton::Secondary {
            CanvasState::ContextMenu
        } else {
            CanvasState::Translating { current: point }
        };
        log::trace!("Pressed layer {} -> {:?}", id, self.state);
        Ok(())
    }

    /// Pointer pressed on one of the selection's resize handles.
    pub fn resize_handle_pointer_down(&mut self, handle: ResizeHandle, initial_bounds: Bounds) {
        self.history.begin_gesture(&mut self.doc);
        self.state = CanvasState::Resizing {
            initial_bounds,
            handle,
        };
        log::trace!("Resize started from {:?}", handle);
    }

    pub fn pointer_move(&mut self, event: &PointerEvent) -> CanvasResult<()> {
        let point = self.camera.screen_to_canvas(event.position);

        match self.state {
            CanvasState::PointerDown { origin } => {
                let distance = (point.x - origin.x).abs() + (point.y - origin.y).abs();
                if distance > self.config.selection_net_threshold {
                    self.state = CanvasState::SelectionNet {
                        origin,
                        current: point,
                    };
                }
            }
            CanvasState::Dragging {
                origin: Some(origin),
            } => {
                self.camera.pan(event.position - origin);
                self.state = CanvasState::Dragging {
                    origin: Some(event.position),
                };
            }
            CanvasState::SelectionNet { origin, .. } => {
                let candidates: Vec<(LayerId, Bounds)> = self
                    .doc
                    .layer_ids()
                    .into_iter()
                    .filter_map(|id| self.doc.layer(&id).map(|layer| (id, layer.bounds())))
                    .collect();
                let ids = find_intersecting_layers(candidates, origin, point);
                mutations::set_selection(&mut self.doc, ids, false)?;
                self.state = CanvasState::SelectionNet {
                    origin,
                    current: point,
                };
            }
            CanvasState::Translating { current } => {
                let selection = self.selection();
                mutations::translate_layers(&mut self.doc, &selection, point - current)?;
                self.state = CanvasState::Translating { current: point };
            }
            CanvasState::Resizing {
                initial_bounds,
                handle,
            } => {
                if let Some(id) = self.selection().first() {
                    let bounds = resize_bounds(&initial_bounds, handle, point);
                    mutations::resize_layer(&mut self.doc, id, bounds)?;
                }
            }
            CanvasState::Pencil => {
                if event.is_primary_held() {
                    mutations::continue_drawing(&mut self.doc, point, event.pressure)?;
                }
            }
            _ => {}
        }

        mutations::set_cursor(&mut self.doc, Some(point))
    }

    /// Pointer released. Always ends the open gesture, so a failed insert
    /// still leaves history running.
    pub fn pointer_up(&mut self, event: &PointerEvent) -> CanvasResult<()> {
        let point = self.camera.screen_to_canvas(event.position);
        let result = self.finish_pointer(point);
        self.history.end_gesture(&mut self.doc);
        result
    }

    fn finish_pointer(&mut self, point: Point) -> CanvasResult<()> {
        match self.state {
            CanvasState::Idle | CanvasState::PointerDown { .. } => {
                mutations::clear_selection(&mut self.doc)?;
                self.state = CanvasState::Idle;
            }
            CanvasState::Inserting { layer_type } => {
                // Stay in the insert tool when the layer is rejected.
                mutations::insert_layer(&mut self.doc, layer_type, point, &self.config)?;
                self.state = CanvasState::Idle;
            }
            CanvasState::Dragging { .. } => {
                self.state = CanvasState::Dragging { origin: None };
            }
            CanvasState::Pencil => {
                mutations::commit_pencil_draft(&mut self.doc, &self.config)?;
            }
            CanvasState::SelectionNet { .. }
            | CanvasState::Translating { .. }
            | CanvasState::Resizing { .. }
            | CanvasState::ContextMenu => {
                self.state = CanvasState::Idle;
            }
        }
        Ok(())
    }

    /// Pointer left the canvas. Gestures stay open until the pointer is released.
    pub fn pointer_leave(&mut self) -> CanvasResult<()> {
        mutations::set_cursor(&mut self.doc, None)
    }

    pub fn wheel(&mut self, event: &WheelEvent) {
        self.camera.pan(-event.delta);
    }

    pub fn key_down(&mut self, event: &KeyEvent) -> CanvasResult<()> {
        let Some(action) = ShortcutRegistry::resolve(event) else {
            return Ok(());
        };
        log::debug!("Shortcut {:?}", action);
        match action {
            ShortcutAction::DeleteSelection => {
                mutations::delete_selected(&mut self.doc)?;
            }
            ShortcutAction::Undo => {
                self.undo()?;
            }
            ShortcutAction::Redo => {
                self.redo()?;
            }
            ShortcutAction::SelectAll => mutations::select_all(&mut self.doc)?,
        }
        Ok(())
    }

    pub fn undo(&mut self) -> CanvasResult<bool> {
        self.history.undo(&mut self.doc)
    }

    pub fn redo(&mut self) -> CanvasResult<bool> {
        self.history.redo(&mut self.doc)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo(&self.doc)
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo(&self.doc)
    }

    pub fn zoom_in(&mut self) {
        self.camera.zoom_in(self.config.zoom_step);
    }

    pub fn zoom_out(&mut self) {
        self.camera.zoom_out(self.config.zoom_step);
    }

    pub fn can_zoom_in(&self) -> bool {
        self.camera.can_zoom_in()
    }

    pub fn can_zoom_out(&self) -> bool {
        self.camera.can_zoom_out()
    }

    pub fn reset_camera(&mut self) {
        self.camera.reset();
    }

    pub fn delete_selected(&mut self) -> CanvasResult<usize> {
        mutations::delete_selected(&mut self.doc)
    }

    pub fn select_all(&mut self) -> CanvasResult<()> {
        mutations::select_all(&mut self.doc)
    }

    pub fn set_selected_fill(&mut self, fill: Option<Rgb>) -> CanvasResult<usize> {
        mutations::set_selected_fill(&mut self.doc, fill)
    }

    pub fn set_selected_stroke(&mut self, stroke: Option<Rgb>) -> CanvasResult<usize> {
        mutations::set_selected_stroke(&mut self.doc, stroke)
    }

    pub fn set_selected_opacity(&mut self, opacity: u8) -> CanvasResult<usize> {
        mutations::set_selected_opacity(&mut self.doc, opacity)
    }

    pub fn background(&self) -> Rgb {
        self.doc.background()
    }

    /// Change the background everyone in the room sees.
    pub fn set_background(&mut self, color: Rgb) -> CanvasResult<()> {
        mutations::set_background(&mut self.doc, color)
    }

    pub fn bring_selected_to_front(&mut self) -> CanvasResult<()> {
        mutations::bring_selected_to_front(&mut self.doc)
    }

    pub fn send_selected_to_back(&mut self) -> CanvasResult<()> {
        mutations::send_selected_to_back(&mut self.doc)
    }

    /// Snapshot of what to draw.
    pub fn scene(&self) -> Scene {
        let layers: Vec<(LayerId, Layer)> = self
            .doc
            .layer_ids()
            .into_iter()
            .filter_map(|id| self.doc.layer(&id).map(|layer| (id, layer)))
            .collect();

        let selection = self.selection();
        let selected_bounds = selection_bounds(
            layers
                .iter()
                .filter(|(id, _)| selection.contains(id))
                .map(|(_, layer)| layer.bounds()),
        );
        let handles = match (selection.len(), selected_bounds) {
            (1, Some(bounds)) => selection_handles(&bounds),
            _ => Vec::new(),
        };
        let selection_net = match self.state {
            CanvasState::SelectionNet { origin, current } => Some(Bounds::from_corners(origin, current)),
            _ => None,
        };

        Scene {
            layers,
            presence: self.doc.presence(),
            others: self.doc.others(),
            camera: self.camera.clone(),
            selection_net,
            selection_bounds: selected_bounds,
            background: self.doc.background(),
            handles,
        }
    }

    /// Resize handle of a lone selected layer under `point`.
    fn handle_at(&self, point: Point) -> Option<(ResizeHandle, Bounds)> {
        let selection = self.selection();
        let [id] = selection.as_slice() else {
            return None;
        };
        let bounds = self.doc.layer(id)?.bounds();
        let tolerance = self.camera.screen_length(self.config.handle_radius);
        selection_handles(&bounds)
            .into_iter()
            .find(|handle| handle.hit_test(point, tolerance))
            .map(|handle| (handle.kind, bounds))
    }

    /// Top-most layer under `point`.
    fn layer_at(&self, point: Point) -> Option<LayerId> {
        let tolerance = self.camera.screen_length(self.config.hit_tolerance);
        self.doc.layer_ids().into_iter().rev().find(|id| {
            self.doc
                .layer(id)
                .is_some_and(|layer| layer.hit_test(point, tolerance))
        })
    }
}
