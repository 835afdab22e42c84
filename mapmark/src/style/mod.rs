//! Interface of the native style: the registry of sources, layers and images the annotation managers write to.
//!
//! The style is owned by the host and shared with other code, so nothing in this crate assumes it has exclusive
//! access to it: every mutation that can conflict is preceded by an existence check, and every failure is treated
//! as non-fatal.

mod color;
pub mod defaults;
mod layer;
mod source;
mod sprite;

pub use color::Color;
pub use layer::{Layer, LayerPosition, LayerType};
pub use source::GeoJsonSource;
pub use sprite::StyleImage;

pub(crate) use source::empty_collection;

use crate::error::StyleError;
use geojson::{Feature, GeoJson};
use serde_json::{Map, Value};

/// Native style operations used by annotation managers.
///
/// All methods take `&self`: implementations are handles to a host-owned style and are expected to use interior
/// mutability.
pub trait StyleDelegate {
    /// Adds a GeoJSON source.
    fn add_source(&self, source: &GeoJsonSource) -> Result<(), StyleError>;
    /// Removes a source.
    fn remove_source(&self, id: &str) -> Result<(), StyleError>;
    /// Returns true if a source with the given id exists.
    fn source_exists(&self, id: &str) -> bool;

    /// Adds a layer that survives style reloads.
    fn add_persistent_layer(&self, layer: &Layer, position: &LayerPosition) -> Result<(), StyleError>;
    /// Removes a layer.
    fn remove_layer(&self, id: &str) -> Result<(), StyleError>;
    /// Returns true if a layer with the given id exists.
    fn layer_exists(&self, id: &str) -> bool;
    /// Moves a layer to a new position.
    fn move_layer(&self, id: &str, position: &LayerPosition) -> Result<(), StyleError>;
    /// Sets several layout and paint properties of a layer in one call.
    fn set_layer_properties(&self, layer_id: &str, properties: &Map<String, Value>) -> Result<(), StyleError>;

    /// Adds features to a GeoJSON source.
    fn add_geojson_source_features(&self, source_id: &str, features: &[Feature]) -> Result<(), StyleError>;
    /// Replaces features of a GeoJSON source with the same ids.
    fn update_geojson_source_features(&self, source_id: &str, features: &[Feature]) -> Result<(), StyleError>;
    /// Removes features with the given ids from a GeoJSON source.
    fn remove_geojson_source_features(&self, source_id: &str, feature_ids: &[String]) -> Result<(), StyleError>;
    /// Replaces all data of a GeoJSON source.
    fn update_geojson_source(&self, source_id: &str, data: &GeoJson) -> Result<(), StyleError>;

    /// Adds an image to the style.
    fn add_image(&self, id: &str, image: &StyleImage) -> Result<(), StyleError>;
    /// Removes an image from the style.
    fn remove_image(&self, id: &str) -> Result<(), StyleError>;
    /// Returns true if an image with the given id exists.
    fn image_exists(&self, id: &str) -> bool;

    /// Value a property takes when it is not set. Used to reset properties that an annotation manager stopped
    /// setting.
    fn layer_property_default_value(&self, layer_type: LayerType, property: &str) -> Value {
        defaults::layer_property_default_value(layer_type, property)
    }
}
