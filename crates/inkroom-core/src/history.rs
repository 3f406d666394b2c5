//! Gesture-scoped history control.

use crate::document::SharedDocument;
use crate::error::CanvasResult;

/// Groups every mutation made during a pointer gesture into one undo step.
///
/// Starting a gesture pauses document history; ending it resumes history and
/// commits the buffered changes as a single step. Undo and redo are refused
/// while a gesture is open.
#[derive(Debug, Default, Clone)]
pub struct HistoryController {
    gesture_active: bool,
}

impl HistoryController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_gesture_active(&self) -> bool {
        self.gesture_active
    }

    /// Pause history until [`end_gesture`](Self::end_gesture). Nested calls are ignored.
    pub fn begin_gesture<D: SharedDocument>(&mut self, doc: &mut D) {
        if self.gesture_active {
            return;
        }
        doc.pause_history();
        self.gesture_active = true;
        log::trace!("Gesture started, history paused");
    }

    pub fn end_gesture<D: SharedDocument>(&mut self, doc: &mut D) {
        if !self.gesture_active {
            return;
        }
        doc.resume_history();
        self.gesture_active = false;
        log::trace!("Gesture ended, history resumed");
    }

    pub fn undo<D: SharedDocument>(&mut self, doc: &mut D) -> CanvasResult<bool> {
        if self.gesture_active {
            log::debug!("Ignoring undo during a gesture");
            return Ok(false);
        }
        Ok(doc.undo()?)
    }

    pub fn redo<D: SharedDocument>(&mut self, doc: &mut D) -> CanvasResult<bool> {
        if self.gesture_active {
            log::debug!("Ignoring redo during a gesture");
            return Ok(false);
        }
        Ok(doc.redo()?)
    }

    pub fn can_undo<D: SharedDocument>(&self, doc: &D) -> bool {
        !self.gesture_active && doc.can_undo()
    }

    pub fn can_redo<D: SharedDocument>(&self, doc: &D) -> bool {
        !self.gesture_active && doc.can_redo()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::MemoryRoom;
    use crate::layers::{Bounds, Layer, LayerPatch, LayerStyle, RectangleLayer, new_layer_id};

    #[test]
    fn test_gesture_is_one_step() {
        let room = MemoryRoom::new();
        let mut doc = room.join();
        let id = new_layer_id();
        doc.set_layer(
            id,
            Layer::Rectangle(RectangleLayer::new(Bounds::new(0.0, 0.0, 10.0, 10.0), LayerStyle::default())),
        )
        .unwrap();

        let mut history = HistoryController::new();
        history.begin_gesture(&mut doc);
        history.begin_gesture(&mut doc);
        for x in [1.0, 2.0, 3.0] {
            doc.update_layer(&id, &LayerPatch::position(x, 0.0)).unwrap();
        }
        assert!(!history.can_undo(&doc));
        assert!(!history.undo(&mut doc).unwrap());
        history.end_gesture(&mut doc);

        assert!(history.can_undo(&doc));
        assert!(history.undo(&mut doc).unwrap());
        assert!(doc.layer(&id).unwrap().bounds().x.abs() < f64::EPSILON);
        assert!(history.redo(&mut doc).unwrap());
        assert!((doc.layer(&id).unwrap().bounds().x - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_end_without_begin_is_noop() {
        let room = MemoryRoom::new();
        let mut doc = room.join();
        let mut history = HistoryController::new();
        history.end_gesture(&mut doc);
        assert!(!history.is_gesture_active());
        assert!(!doc.is_history_paused());
    }
}
