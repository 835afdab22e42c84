use super::LayerType;
use serde_json::{json, Value};

/// Documented default value of a layer property. Returns [`Value::Null`] for properties unknown to the
/// annotation layers, which makes the native style fall back to its own default.
pub fn layer_property_default_value(layer_type: LayerType, property: &str) -> Value {
    match layer_type {
        LayerType::Symbol => symbol_default(property),
        LayerType::Circle => circle_default(property),
        LayerType::Line => line_default(property),
        LayerType::Fill => fill_default(property),
    }
    .unwrap_or(Value::Null)
}

fn symbol_default(property: &str) -> Option<Value> {
    let value = match property {
        "icon-allow-overlap" | "icon-ignore-placement" | "icon-keep-upright" | "icon-optional" => json!(false),
        "text-allow-overlap" | "text-ignore-placement" | "text-optional" => json!(false),
        "symbol-avoid-edges" => json!(false),
        "text-keep-upright" => json!(true),
        "icon-anchor" | "text-anchor" => json!("center"),
        "icon-image" | "text-field" => json!(""),
        "icon-size" | "icon-opacity" | "text-opacity" => json!(1.0),
        "icon-rotate" | "text-rotate" | "symbol-sort-key" => json!(0.0),
        "icon-offset" | "icon-translate" | "text-translate" => json!([0.0, 0.0]),
        "text-offset" => json!([0.0, 0.0]),
        "icon-padding" => json!([2.0]),
        "icon-color" | "text-color" => json!("rgba(0, 0, 0, 1)"),
        "icon-halo-color" | "text-halo-color" => json!("rgba(0, 0, 0, 0)"),
        "icon-halo-width" | "icon-halo-blur" | "text-halo-width" | "text-halo-blur" => json!(0.0),
        "icon-pitch-alignment" | "icon-rotation-alignment" => json!("auto"),
        "text-pitch-alignment" | "text-rotation-alignment" => json!("auto"),
        "symbol-placement" => json!("point"),
        "symbol-spacing" => json!(250.0),
        "symbol-z-order" => json!("auto"),
        "text-size" => json!(16.0),
        "text-font" => json!(["Open Sans Regular", "Arial Unicode MS Regular"]),
        "text-justify" => json!("center"),
        "text-letter-spacing" => json!(0.0),
        "text-line-height" => json!(1.2),
        "text-max-width" => json!(10.0),
        "text-padding" => json!(2.0),
        "text-transform" => json!("none"),
        _ => return None,
    };

    Some(value)
}

fn circle_default(property: &str) -> Option<Value> {
    let value = match property {
        "circle-radius" => json!(5.0),
        "circle-color" => json!("rgba(0, 0, 0, 1)"),
        "circle-opacity" | "circle-stroke-opacity" => json!(1.0),
        "circle-blur" | "circle-stroke-width" | "circle-sort-key" => json!(0.0),
        "circle-stroke-color" => json!("rgba(0, 0, 0, 1)"),
        "circle-pitch-alignment" => json!("viewport"),
        "circle-pitch-scale" => json!("map"),
        "circle-translate" => json!([0.0, 0.0]),
        "circle-translate-anchor" => json!("map"),
        _ => return None,
    };

    Some(value)
}

fn line_default(property: &str) -> Option<Value> {
    let value = match property {
        "line-width" => json!(1.0),
        "line-color" => json!("rgba(0, 0, 0, 1)"),
        "line-opacity" => json!(1.0),
        "line-blur" | "line-gap-width" | "line-offset" | "line-sort-key" => json!(0.0),
        "line-join" => json!("miter"),
        "line-cap" => json!("butt"),
        "line-miter-limit" => json!(2.0),
        "line-round-limit" => json!(1.05),
        "line-translate" => json!([0.0, 0.0]),
        "line-translate-anchor" => json!("map"),
        _ => return None,
    };

    Some(value)
}

fn fill_default(property: &str) -> Option<Value> {
    let value = match property {
        "fill-antialias" => json!(true),
        "fill-color" | "fill-outline-color" => json!("rgba(0, 0, 0, 1)"),
        "fill-opacity" => json!(1.0),
        "fill-sort-key" => json!(0.0),
        "fill-translate" => json!([0.0, 0.0]),
        "fill-translate-anchor" => json!("map"),
        _ => return None,
    };

    Some(value)
}
