//! Conversion between layers and Loro values.

use crate::layers::{
    Bounds, EllipseLayer, Layer, LayerPatch, LayerStyle, PathLayer, PenPoint, RectangleLayer, Rgb,
    TextLayer,
};
use loro::{LoroList, LoroMap, LoroMapValue, LoroResult, LoroValue};

// Layer type identifiers
const TYPE_RECTANGLE: &str = "rectangle";
const TYPE_ELLIPSE: &str = "ellipse";
const TYPE_PATH: &str = "path";
const TYPE_TEXT: &str = "text";

// Common keys
const KEY_TYPE: &str = "type";
const KEY_X: &str = "x";
const KEY_Y: &str = "y";
const KEY_WIDTH: &str = "width";
const KEY_HEIGHT: &str = "height";

// Style keys
const KEY_FILL: &str = "fill";
const KEY_STROKE: &str = "stroke";
const KEY_OPACITY: &str = "opacity";

const KEY_POINTS: &str = "points";

// Text keys
const KEY_TEXT: &str = "text";
const KEY_FONT_SIZE: &str = "font_size";
const KEY_FONT_WEIGHT: &str = "font_weight";
const KEY_FONT_FAMILY: &str = "font_family";

fn get_double(map: &LoroMapValue, key: &str) -> Option<f64> {
    match map.get(key)? {
        LoroValue::Double(d) => Some(*d),
        LoroValue::I64(i) => Some(*i as f64),
        _ => None,
    }
}

fn get_i64(map: &LoroMapValue, key: &str) -> Option<i64> {
    match map.get(key)? {
        LoroValue::I64(i) => Some(*i),
        LoroValue::Double(d) => Some(*d as i64),
        _ => None,
    }
}

fn get_string(map: &LoroMapValue, key: &str) -> Option<String> {
    match map.get(key)? {
        LoroValue::String(s) => Some(s.to_string()),
        _ => None,
    }
}

/// Colors are stored packed as `0xRRGGBB`, unset colors as null.
pub fn color_to_value(color: Option<Rgb>) -> LoroValue {
    match color {
        Some(c) => LoroValue::I64(((c.r as i64) << 16) | ((c.g as i64) << 8) | c.b as i64),
        None => LoroValue::Null,
    }
}

pub fn color_from_value(value: &LoroValue) -> Option<Rgb> {
    let packed = match value {
        LoroValue::I64(i) => *i,
        LoroValue::Double(d) => *d as i64,
        _ => return None,
    };
    Some(Rgb::new(
        ((packed >> 16) & 0xff) as u8,
        ((packed >> 8) & 0xff) as u8,
        (packed & 0xff) as u8,
    ))
}

fn get_color(map: &LoroMapValue, key: &str) -> Option<Rgb> {
    color_from_value(map.get(key)?)
}

fn bounds_to_loro(bounds: &Bounds, map: &LoroMap) -> LoroResult<()> {
    map.insert(KEY_X, bounds.x)?;
    map.insert(KEY_Y, bounds.y)?;
    map.insert(KEY_WIDTH, bounds.width)?;
    map.insert(KEY_HEIGHT, bounds.height)?;
    Ok(())
}

fn style_to_loro(style: &LayerStyle, map: &LoroMap) -> LoroResult<()> {
    map.insert(KEY_FILL, color_to_value(style.fill))?;
    map.insert(KEY_STROKE, color_to_value(style.stroke))?;
    map.insert(KEY_OPACITY, style.opacity as i64)?;
    Ok(())
}

/// Write every field of a layer into a Loro map.
pub fn layer_to_loro(layer: &Layer, map: &LoroMap) -> LoroResult<()> {
    bounds_to_loro(&layer.bounds(), map)?;
    style_to_loro(layer.style(), map)?;

    match layer {
        Layer::Rectangle(_) => {
            map.insert(KEY_TYPE, TYPE_RECTANGLE)?;
        }
        Layer::Ellipse(_) => {
            map.insert(KEY_TYPE, TYPE_ELLIPSE)?;
        }
        Layer::Path(path) => {
            map.insert(KEY_TYPE, TYPE_PATH)?;
            // Store points as a list of [x, y, pressure] triples
            let points_list = map.insert_container(KEY_POINTS, LoroList::new())?;
            for point in &path.points {
                let point_list = points_list.insert_container(points_list.len(), LoroList::new())?;
                point_list.push(point.x)?;
                point_list.push(point.y)?;
                point_list.push(point.pressure)?;
            }
        }
        Layer::Text(text) => {
            map.insert(KEY_TYPE, TYPE_TEXT)?;
            map.insert(KEY_TEXT, text.text.as_str())?;
            map.insert(KEY_FONT_SIZE, text.font_size)?;
            map.insert(KEY_FONT_WEIGHT, text.font_weight as i64)?;
            map.insert(KEY_FONT_FAMILY, text.font_family.as_str())?;
        }
    }

    Ok(())
}

/// Write only the fields a patch sets, so concurrent edits to other fields survive.
pub fn patch_to_loro(patch: &LayerPatch, map: &LoroMap) -> LoroResult<()> {
    if let Some(x) = patch.x {
        map.insert(KEY_X, x)?;
    }
    if let Some(y) = patch.y {
        map.insert(KEY_Y, y)?;
    }
    if let Some(width) = patch.width {
        map.insert(KEY_WIDTH, width.max(0.0))?;
    }
    if let Some(height) = patch.height {
        map.insert(KEY_HEIGHT, height.max(0.0))?;
    }
    if let Some(fill) = patch.fill {
        map.insert(KEY_FILL, color_to_value(fill))?;
    }
    if let Some(stroke) = patch.stroke {
        map.insert(KEY_STROKE, color_to_value(stroke))?;
    }
    if let Some(opacity) = patch.opacity {
        map.insert(KEY_OPACITY, opacity.min(100) as i64)?;
    }
    Ok(())
}

fn point_from_loro(value: &LoroValue) -> Option<PenPoint> {
    let LoroValue::List(coords) = value else {
        return None;
    };
    let number = |v: &LoroValue| match v {
        LoroValue::Double(d) => Some(*d),
        LoroValue::I64(i) => Some(*i as f64),
        _ => None,
    };
    let x = number(coords.first()?)?;
    let y = number(coords.get(1)?)?;
    let pressure = coords.get(2).and_then(number).unwrap_or(0.5);
    Some(PenPoint::new(x, y, pressure))
}

/// Read a layer back from the deep value of its Loro map.
pub fn layer_from_loro(map: &LoroMapValue) -> Option<Layer> {
    let layer_type = get_string(map, KEY_TYPE)?;
    let bounds = Bounds::new(
        get_double(map, KEY_X)?,
        get_double(map, KEY_Y)?,
        get_double(map, KEY_WIDTH)?,
        get_double(map, KEY_HEIGHT)?,
    );
    let style = LayerStyle::new(
        get_color(map, KEY_FILL),
        get_color(map, KEY_STROKE),
        get_i64(map, KEY_OPACITY).unwrap_or(100).clamp(0, 100) as u8,
    );

    let layer = match layer_type.as_str() {
        TYPE_RECTANGLE => Layer::Rectangle(RectangleLayer::new(bounds, style)),
        TYPE_ELLIPSE => Layer::Ellipse(EllipseLayer::new(bounds, style)),
        TYPE_PATH => {
            let points = match map.get(KEY_POINTS) {
                Some(LoroValue::List(list)) => list.iter().filter_map(point_from_loro).collect(),
                _ => Vec::new(),
            };
            Layer::Path(PathLayer::new(bounds, style, points))
        }
        TYPE_TEXT => Layer::Text(TextLayer {
            bounds,
            style,
            text: get_string(map, KEY_TEXT).unwrap_or_default(),
            font_size: get_double(map, KEY_FONT_SIZE)?,
            font_weight: get_i64(map, KEY_FONT_WEIGHT)?.clamp(1, 1000) as u16,
            font_family: get_string(map, KEY_FONT_FAMILY).unwrap_or_default(),
        }),
        other => {
            log::warn!("Unknown layer type in document: {}", other);
            return None;
        }
    };

    Some(layer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TextDefaults;
    use loro::LoroDoc;

    fn roundtrip(layer: &Layer) -> Layer {
        let doc = LoroDoc::new();
        let layers = doc.get_map("layers");
        let map = layers.insert_container("a", LoroMap::new()).unwrap();
        layer_to_loro(layer, &map).unwrap();
        doc.commit();

        let LoroValue::Map(value) = map.get_deep_value() else {
            panic!("expected map value");
        };
        layer_from_loro(&value).unwrap()
    }

    #[test]
    fn test_path_keeps_pressure() {
        let layer = Layer::Path(PathLayer::new(
            Bounds::new(1.0, 2.0, 10.0, 10.0),
            LayerStyle::new(Some(Rgb::new(217, 217, 217)), Some(Rgb::new(217, 217, 217)), 100),
            vec![PenPoint::new(0.0, 0.0, 0.25), PenPoint::new(10.0, 10.0, 0.75)],
        ));
        assert_eq!(roundtrip(&layer), layer);
    }

    #[test]
    fn test_text_and_unset_colors() {
        let layer = Layer::Text(
            TextLayer::new(
                Bounds::new(5.0, 5.0, 100.0, 100.0),
                LayerStyle::new(None, Some(Rgb::new(1, 2, 3)), 60),
                &TextDefaults::default(),
            )
            .with_text("hello"),
        );
        let back = roundtrip(&layer);
        assert_eq!(back, layer);
        assert_eq!(back.style().fill, None);
    }

    #[test]
    fn test_patch_writes_only_set_fields() {
        let doc = LoroDoc::new();
        let map = doc.get_map("layers").insert_container("a", LoroMap::new()).unwrap();
        let layer = Layer::Rectangle(RectangleLayer::new(
            Bounds::new(0.0, 0.0, 100.0, 100.0),
            LayerStyle::default(),
        ));
        layer_to_loro(&layer, &map).unwrap();
        patch_to_loro(&LayerPatch::opacity(30), &map).unwrap();
        doc.commit();

        let LoroValue::Map(value) = map.get_deep_value() else {
            panic!("expected map value");
        };
        let back = layer_from_loro(&value).unwrap();
        assert_eq!(back.style().opacity, 30);
        assert_eq!(back.bounds(), layer.bounds());
    }
}
