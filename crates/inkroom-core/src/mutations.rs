//! Layer mutation operations.
//!
//! Each operation is one atomic batch against the shared document. Ids that
//! vanished because of a concurrent delete are skipped silently.

use crate::config::EngineConfig;
use crate::document::{PresencePatch, SharedDocument};
use crate::error::{CanvasError, CanvasResult};
use crate::geometry::stroke_to_path;
use crate::layers::{
    Bounds, EllipseLayer, Layer, LayerId, LayerPatch, LayerStyle, LayerType, PathLayer, PenPoint,
    RectangleLayer, Rgb, TextLayer, new_layer_id,
};
use kurbo::{Point, Vec2};

/// Run `f` inside a document batch, closing the batch even when `f` fails.
pub fn in_batch<D, T, F>(doc: &mut D, f: F) -> CanvasResult<T>
where
    D: SharedDocument,
    F: FnOnce(&mut D) -> CanvasResult<T>,
{
    doc.begin_batch();
    let result = f(doc);
    doc.end_batch()?;
    result
}

fn ensure_capacity<D: SharedDocument>(doc: &D, config: &EngineConfig) -> CanvasResult<()> {
    if doc.layer_count() >= config.max_layers {
        log::warn!("Rejected insert: {} layers already present", config.max_layers);
        return Err(CanvasError::CapacityExceeded {
            max: config.max_layers,
        });
    }
    Ok(())
}

/// Build a layer of `layer_type` with its top-left corner at `position`.
pub fn default_layer(layer_type: LayerType, position: Point, config: &EngineConfig) -> Layer {
    let size = config.default_layer_size;
    let bounds = Bounds::new(position.x, position.y, size, size);
    let style = LayerStyle::new(
        Some(config.default_fill),
        Some(config.default_stroke),
        config.default_opacity,
    );
    match layer_type {
        LayerType::Rectangle => Layer::Rectangle(RectangleLayer::new(bounds, style)),
        LayerType::Ellipse => Layer::Ellipse(EllipseLayer::new(bounds, style)),
        LayerType::Path => Layer::Path(PathLayer::new(bounds, style, Vec::new())),
        LayerType::Text => Layer::Text(TextLayer::new(bounds, style, &config.text)),
    }
}

/// Insert a new layer at `position` and make it the caller's selection.
pub fn insert_layer<D: SharedDocument>(
    doc: &mut D,
    layer_type: LayerType,
    position: Point,
    config: &EngineConfig,
) -> CanvasResult<LayerId> {
    ensure_capacity(doc, config)?;

    let id = new_layer_id();
    let layer = default_layer(layer_type, position, config);
    in_batch(doc, |doc| {
        doc.set_layer(id, layer)?;
        doc.push_layer_id(id)?;
        doc.update_presence(PresencePatch::selection(vec![id]), true)?;
        Ok(())
    })?;

    log::debug!("Inserted {:?} layer {} at ({}, {})", layer_type, id, position.x, position.y);
    Ok(id)
}

/// Delete every selected layer and clear the selection. Returns how many
/// layers were removed.
pub fn delete_selected<D: SharedDocument>(doc: &mut D) -> CanvasResult<usize> {
    let selection = doc.presence().selection;
    if selection.is_empty() {
        return Ok(0);
    }

    let deleted = in_batch(doc, |doc| {
        let mut deleted = 0;
        for id in &selection {
            if doc.delete_layer(id)? {
                deleted += 1;
            }
            doc.remove_layer_id(id)?;
        }
        doc.update_presence(PresencePatch::selection(Vec::new()), true)?;
        Ok(deleted)
    })?;

    log::debug!("Deleted {} layers", deleted);
    Ok(deleted)
}

/// Overwrite a layer's bounds. Returns `false` if the layer is gone.
pub fn resize_layer<D: SharedDocument>(doc: &mut D, id: &LayerId, bounds: Bounds) -> CanvasResult<bool> {
    Ok(doc.update_layer(id, &LayerPatch::bounds(bounds))?)
}

/// Move layers by `delta`. Returns how many were moved.
pub fn translate_layers<D: SharedDocument>(doc: &mut D, ids: &[LayerId], delta: Vec2) -> CanvasResult<usize> {
    in_batch(doc, |doc| {
        let mut moved = 0;
        for id in ids {
            let Some(layer) = doc.layer(id) else {
                continue;
            };
            let bounds = layer.bounds();
            if doc.update_layer(id, &LayerPatch::position(bounds.x + delta.x, bounds.y + delta.y))? {
                moved += 1;
            }
        }
        Ok(moved)
    })
}

/// Insert a path layer fitted around `samples`.
///
/// Fewer than two samples is not a stroke: nothing is inserted and `None` is
/// returned.
pub fn commit_stroke<D: SharedDocument>(
    doc: &mut D,
    samples: &[PenPoint],
    color: Rgb,
    config: &EngineConfig,
) -> CanvasResult<Option<LayerId>> {
    if samples.len() < 2 {
        log::debug!("Discarded stroke with {} samples", samples.len());
        return Ok(None);
    }
    ensure_capacity(doc, config)?;
    let Some(path) = stroke_to_path(samples, color, config.stroke_padding) else {
        return Ok(None);
    };

    let id = new_layer_id();
    in_batch(doc, |doc| {
        doc.set_layer(id, Layer::Path(path))?;
        doc.push_layer_id(id)?;
        Ok(())
    })?;

    log::debug!("Committed stroke {} with {} samples", id, samples.len());
    Ok(Some(id))
}

/// Commit the caller's pencil draft and clear it. The draft is cleared even
/// when the commit is rejected.
pub fn commit_pencil_draft<D: SharedDocument>(doc: &mut D, config: &EngineConfig) -> CanvasResult<Option<LayerId>> {
    let presence = doc.presence();
    let Some(draft) = presence.pencil_draft else {
        return Ok(None);
    };
    let color = presence.pen_color.unwrap_or(config.default_pen_color);

    let result = commit_stroke(doc, &draft, color, config);
    doc.update_presence(PresencePatch::pencil_draft(None), false)?;
    result
}

/// Start a new pencil draft at `point`.
pub fn start_drawing<D: SharedDocument>(doc: &mut D, point: Point, pressure: f64, color: Rgb) -> CanvasResult<()> {
    let patch = PresencePatch::pencil_draft(Some(vec![PenPoint::new(point.x, point.y, pressure)]))
        .with_pen_color(Some(color));
    doc.update_presence(patch, false)?;
    Ok(())
}

/// Append a sample to the pencil draft, if one is in progress.
pub fn continue_drawing<D: SharedDocument>(doc: &mut D, point: Point, pressure: f64) -> CanvasResult<bool> {
    let Some(mut draft) = doc.presence().pencil_draft else {
        return Ok(false);
    };
    draft.push(PenPoint::new(point.x, point.y, pressure));
    doc.update_presence(PresencePatch::pencil_draft(Some(draft)), false)?;
    Ok(true)
}

/// Drop an in-progress pencil stroke without committing it.
pub fn discard_pencil_draft<D: SharedDocument>(doc: &mut D) -> CanvasResult<bool> {
    if doc.presence().pencil_draft.is_none() {
        return Ok(false);
    }
    doc.update_presence(PresencePatch::pencil_draft(None), false)?;
    log::debug!("Discarded pencil draft");
    Ok(true)
}

pub fn set_background<D: SharedDocument>(doc: &mut D, color: Rgb) -> CanvasResult<()> {
    doc.set_background(color)?;
    Ok(())
}

pub fn set_cursor<D: SharedDocument>(doc: &mut D, cursor: Option<Point>) -> CanvasResult<()> {
    if doc.presence().cursor == cursor {
        return Ok(());
    }
    doc.update_presence(PresencePatch::cursor(cursor), false)?;
    Ok(())
}

/// Replace the caller's selection.
pub fn set_selection<D: SharedDocument>(doc: &mut D, ids: Vec<LayerId>, add_to_history: bool) -> CanvasResult<()> {
    doc.update_presence(PresencePatch::selection(ids), add_to_history)?;
    Ok(())
}

/// Select every layer, in layer order.
pub fn select_all<D: SharedDocument>(doc: &mut D) -> CanvasResult<()> {
    let ids = doc.layer_ids();
    set_selection(doc, ids, true)
}

/// Clear the caller's selection if it is not already empty.
pub fn clear_selection<D: SharedDocument>(doc: &mut D) -> CanvasResult<()> {
    if doc.presence().selection.is_empty() {
        return Ok(());
    }
    set_selection(doc, Vec::new(), true)
}

fn patch_selected<D: SharedDocument>(doc: &mut D, patch: LayerPatch) -> CanvasResult<usize> {
    let selection = doc.presence().selection;
    in_batch(doc, |doc| {
        let mut updated = 0;
        for id in &selection {
            if doc.update_layer(id, &patch)? {
                updated += 1;
            }
        }
        Ok(updated)
    })
}

pub fn set_selected_fill<D: SharedDocument>(doc: &mut D, fill: Option<Rgb>) -> CanvasResult<usize> {
    patch_selected(doc, LayerPatch::fill(fill))
}

pub fn set_selected_stroke<D: SharedDocument>(doc: &mut D, stroke: Option<Rgb>) -> CanvasResult<usize> {
    patch_selected(doc, LayerPatch::stroke(stroke))
}

/// Set the opacity percent of the selected layers (clamped to 100).
pub fn set_selected_opacity<D: SharedDocument>(doc: &mut D, opacity: u8) -> CanvasResult<usize> {
    patch_selected(doc, LayerPatch::opacity(opacity))
}

/// Selected ids in their current paint order.
fn selected_in_order<D: SharedDocument>(doc: &D) -> Vec<LayerId> {
    let selection = doc.presence().selection;
    doc.layer_ids()
        .into_iter()
        .filter(|id| selection.contains(id))
        .collect()
}

/// Move the selected layers to the top, keeping their relative order.
pub fn bring_selected_to_front<D: SharedDocument>(doc: &mut D) -> CanvasResult<()> {
    let ids = selected_in_order(doc);
    if ids.is_empty() {
        return Ok(());
    }
    in_batch(doc, |doc| {
        for id in &ids {
            if doc.remove_layer_id(id)? {
                doc.push_layer_id(*id)?;
            }
        }
        Ok(())
    })
}

/// Move the selected layers to the bottom, keeping their relative order.
pub fn send_selected_to_back<D: SharedDocument>(doc: &mut D) -> CanvasResult<()> {
    let ids = selected_in_order(doc);
    if ids.is_empty() {
        return Ok(());
    }
    in_batch(doc, |doc| {
        for (index, id) in ids.iter().enumerate() {
            if doc.remove_layer_id(id)? {
                doc.insert_layer_id(index, *id)?;
            }
        }
        Ok(())
    })
}
