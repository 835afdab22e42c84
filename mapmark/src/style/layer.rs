use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Type of a style layer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerType {
    /// Icons and text.
    Symbol,
    /// Circles.
    Circle,
    /// Lines.
    Line,
    /// Polygon fills.
    Fill,
}

/// Style layer definition, as given to [`StyleDelegate::add_persistent_layer`](super::StyleDelegate::add_persistent_layer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    /// Id of the layer.
    pub id: String,
    /// Type of the layer.
    #[serde(rename = "type")]
    pub layer_type: LayerType,
    /// Id of the source the layer draws.
    pub source: String,
    /// Filter expression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    /// Layout and paint properties.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,
}

impl Layer {
    /// Creates a layer without filter and properties.
    pub fn new(id: impl Into<String>, layer_type: LayerType, source: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            layer_type,
            source: source.into(),
            filter: None,
            properties: Map::new(),
        }
    }

    /// Sets the filter expression.
    pub fn with_filter(mut self, filter: Value) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Sets a layout or paint property.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// Position of a layer in the style.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerPosition {
    /// Directly above the layer with the given id.
    Above(String),
    /// Directly below the layer with the given id.
    Below(String),
    /// At the given index.
    At(usize),
    /// On top of all layers.
    #[default]
    Default,
}
