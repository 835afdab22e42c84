//! Style-backed annotations: points, circles, polylines and polygons drawn by the native renderer from a GeoJSON
//! source managed by an [`AnnotationManager`].
//!
//! Annotations of one kind are owned by a manager. The manager keeps the source and the layers of the style in
//! sync with its collection on every render tick, sending only the changes since the previous tick, and routes
//! gestures on its layers back to the annotations.

use std::any::Any;
use std::fmt::Debug;
use std::rc::Rc;

use geojson::feature::Id;
use geojson::Feature;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::map::{InteractionContext, MapDelegate};
use crate::style::{Layer, LayerType};

mod circle;
mod cluster;
mod diff;
mod handlers;
mod images;
mod manager;
mod offset;
mod orchestrator;
mod point;
mod polygon;
mod polyline;

pub use circle::CircleAnnotation;
pub use cluster::{cluster_circle_layer_id, cluster_text_layer_id, ClusterOptions};
pub use diff::AnnotationsDiff;
pub use handlers::{DragBeginHandler, DragHandler, GestureHandler, GestureHandlers};
pub use images::AnnotationImagesManager;
pub use manager::{
    AnnotationManager, AnnotationManagerDeps, AnnotationManagerParams, CircleAnnotationManager,
    ClusterGestureHandler, PointAnnotationManager, PolygonAnnotationManager, PolylineAnnotationManager,
};
pub use offset::AnnotationGeometry;
pub use orchestrator::AnnotationOrchestrator;
pub use point::{AnnotationImage, PointAnnotation, DEFAULT_MARKER_IMAGE_NAME};
pub use polygon::PolygonAnnotation;
pub use polyline::{LineJoin, PolylineAnnotation};

/// Key of the feature property that holds per-annotation layer properties.
pub const LAYER_PROPERTIES_KEY: &str = "layerProperties";
/// Key of the feature property that holds user data of an annotation.
pub const CUSTOM_DATA_KEY: &str = "custom_data";

/// A kind of style-backed annotation.
///
/// The set of kinds is closed: [`PointAnnotation`], [`CircleAnnotation`], [`PolylineAnnotation`] and
/// [`PolygonAnnotation`]. A manager is generic over the kind, so kind-specific behavior (layer type, geometry
/// offsetting, images) is resolved statically.
pub trait Annotation: Clone + PartialEq + Debug + Into<AnyAnnotation> + 'static {
    /// Geometry the annotation is bound to.
    type Geometry: AnnotationGeometry;
    /// Type of the style layer that draws annotations of this kind.
    const LAYER_TYPE: LayerType;

    /// Unique id of the annotation. Used as the id of its feature in the source.
    fn id(&self) -> &str;
    /// Changes the id.
    fn set_id(&mut self, id: String);

    /// Geometry of the annotation.
    fn geometry(&self) -> &Self::Geometry;
    /// Changes the geometry.
    fn set_geometry(&mut self, geometry: Self::Geometry);

    /// Whether the annotation is selected. Tapping an annotation toggles selection.
    fn is_selected(&self) -> bool;
    /// Changes selection state.
    fn set_selected(&mut self, selected: bool);

    /// Whether the annotation can be dragged.
    fn is_draggable(&self) -> bool;
    /// Allows or forbids dragging.
    fn set_draggable(&mut self, draggable: bool);

    /// Layer properties set on this annotation. They take precedence over manager-level properties.
    fn layer_properties(&self) -> &Map<String, Value>;
    /// User data copied into the feature properties.
    fn custom_data(&self) -> &Map<String, Value>;
    /// Interaction handlers.
    fn handlers(&self) -> &GestureHandlers<Self>;

    /// Name and content of the style image used by the annotation, if any.
    fn image(&self) -> Option<&AnnotationImage> {
        None
    }

    /// GeoJSON feature representing the annotation in the source.
    fn feature(&self) -> Feature {
        let mut properties = Map::new();
        properties.insert(
            LAYER_PROPERTIES_KEY.to_string(),
            Value::Object(self.layer_properties().clone()),
        );
        properties.insert(
            CUSTOM_DATA_KEY.to_string(),
            Value::Object(self.custom_data().clone()),
        );

        Feature {
            bbox: None,
            geometry: Some(self.geometry().to_geojson()),
            id: Some(Id::String(self.id().to_string())),
            properties: Some(properties),
            foreign_members: None,
        }
    }

    /// Moves the annotation by a screen-space translation. Does nothing if the geometry cannot be moved that far.
    fn drag(&mut self, translation: &mapmark_types::Vector2<f64>, map: &dyn MapDelegate) {
        if let Some(geometry) = self.geometry().offset(translation, map) {
            self.set_geometry(geometry);
        }
    }

    /// Style layer drawing annotations of this kind from the given source.
    fn make_layer(id: &str, source_id: &str) -> Layer {
        Layer::new(id, Self::LAYER_TYPE, source_id)
    }
}

/// Fields shared by all annotation kinds.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AnnotationBase<T> {
    pub(crate) id: String,
    pub(crate) is_selected: bool,
    pub(crate) is_draggable: bool,
    pub(crate) layer_properties: Map<String, Value>,
    pub(crate) custom_data: Map<String, Value>,
    pub(crate) handlers: GestureHandlers<T>,
}

impl<T> AnnotationBase<T> {
    pub(crate) fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_selected: false,
            is_draggable: false,
            layer_properties: Map::new(),
            custom_data: Map::new(),
            handlers: GestureHandlers::default(),
        }
    }

    pub(crate) fn with_generated_id() -> Self {
        Self::new(uuid::Uuid::new_v4().to_string())
    }

    pub(crate) fn layer_property<V: DeserializeOwned>(&self, key: &str) -> Option<V> {
        self.layer_properties
            .get(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    pub(crate) fn set_layer_property<V: Serialize>(&mut self, key: &str, value: Option<V>) {
        let Some(value) = value else {
            self.layer_properties.remove(key);
            return;
        };

        match serde_json::to_value(value) {
            Ok(value) => {
                self.layer_properties.insert(key.to_string(), value);
            }
            Err(err) => log::warn!("Failed to serialize layer property {key}: {err}"),
        }
    }
}

/// Generates a getter, a setter and a builder method for each typed layer property of an annotation kind.
macro_rules! layer_properties {
    ($($(#[$meta:meta])* $key:literal => $getter:ident, $setter:ident, $builder:ident: $ty:ty;)*) => {
        $(
            $(#[$meta])*
            pub fn $getter(&self) -> Option<$ty> {
                self.base.layer_property($key)
            }

            #[doc = concat!("Sets `", $key, "`. `None` falls back to the manager-level value or the style default.")]
            pub fn $setter(&mut self, value: Option<$ty>) {
                self.base.set_layer_property($key, value);
            }

            #[doc = concat!("Builder version of [`Self::", stringify!($setter), "`].")]
            pub fn $builder(mut self, value: $ty) -> Self {
                self.$setter(Some(value));
                self
            }
        )*
    };
}

/// Implements [`Annotation`] and the common builder methods for an annotation kind with `base` and a geometry
/// field. Extra trait items can be given in braces.
macro_rules! impl_annotation {
    ($kind:ty, $geometry:ty, $field:ident, $layer_type:expr $(, { $($extra:tt)* })?) => {
        impl $crate::annotation::Annotation for $kind {
            type Geometry = $geometry;
            $($($extra)*)?
            const LAYER_TYPE: $crate::style::LayerType = $layer_type;

            fn id(&self) -> &str {
                &self.base.id
            }

            fn set_id(&mut self, id: String) {
                self.base.id = id;
            }

            fn geometry(&self) -> &Self::Geometry {
                &self.$field
            }

            fn set_geometry(&mut self, geometry: Self::Geometry) {
                self.$field = geometry;
            }

            fn is_selected(&self) -> bool {
                self.base.is_selected
            }

            fn set_selected(&mut self, selected: bool) {
                self.base.is_selected = selected;
            }

            fn is_draggable(&self) -> bool {
                self.base.is_draggable
            }

            fn set_draggable(&mut self, draggable: bool) {
                self.base.is_draggable = draggable;
            }

            fn layer_properties(&self) -> &serde_json::Map<String, serde_json::Value> {
                &self.base.layer_properties
            }

            fn custom_data(&self) -> &serde_json::Map<String, serde_json::Value> {
                &self.base.custom_data
            }

            fn handlers(&self) -> &$crate::annotation::GestureHandlers<Self> {
                &self.base.handlers
            }
        }

        impl $kind {
            /// Sets selection state.
            pub fn with_selected(mut self, selected: bool) -> Self {
                self.base.is_selected = selected;
                self
            }

            /// Allows or forbids dragging.
            pub fn with_draggable(mut self, draggable: bool) -> Self {
                self.base.is_draggable = draggable;
                self
            }

            /// Replaces user data of the annotation.
            pub fn set_custom_data(&mut self, data: serde_json::Map<String, serde_json::Value>) {
                self.base.custom_data = data;
            }

            /// Builder version of [`Self::set_custom_data`].
            pub fn with_custom_data(mut self, data: serde_json::Map<String, serde_json::Value>) -> Self {
                self.base.custom_data = data;
                self
            }

            /// Sets the tap handler. The handler returns true if the tap is consumed.
            pub fn on_tap(mut self, handler: impl Fn(&$crate::map::InteractionContext) -> bool + 'static) -> Self {
                self.base.handlers.tap = Some(std::rc::Rc::new(handler));
                self
            }

            /// Sets the long press handler. The handler returns true if the gesture is consumed.
            pub fn on_long_press(
                mut self,
                handler: impl Fn(&$crate::map::InteractionContext) -> bool + 'static,
            ) -> Self {
                self.base.handlers.long_press = Some(std::rc::Rc::new(handler));
                self
            }

            /// Sets the drag start handler. Returning false cancels the drag.
            pub fn on_drag_begin(
                mut self,
                handler: impl Fn(&mut Self, &$crate::map::InteractionContext) -> bool + 'static,
            ) -> Self {
                self.base.handlers.drag_begin = Some(std::rc::Rc::new(handler));
                self
            }

            /// Sets the handler called on every drag movement, after the annotation is moved.
            pub fn on_drag_change(
                mut self,
                handler: impl Fn(&mut Self, &$crate::map::InteractionContext) + 'static,
            ) -> Self {
                self.base.handlers.drag_change = Some(std::rc::Rc::new(handler));
                self
            }

            /// Sets the drag end handler.
            pub fn on_drag_end(
                mut self,
                handler: impl Fn(&mut Self, &$crate::map::InteractionContext) + 'static,
            ) -> Self {
                self.base.handlers.drag_end = Some(std::rc::Rc::new(handler));
                self
            }
        }
    };
}

pub(crate) use impl_annotation;
pub(crate) use layer_properties;

/// Any annotation, as reported to [`AnnotationInteractionDelegate`].
#[derive(Debug, Clone, PartialEq)]
pub enum AnyAnnotation {
    /// Point annotation.
    Point(PointAnnotation),
    /// Circle annotation.
    Circle(CircleAnnotation),
    /// Polyline annotation.
    Polyline(PolylineAnnotation),
    /// Polygon annotation.
    Polygon(PolygonAnnotation),
}

impl AnyAnnotation {
    /// Id of the annotation.
    pub fn id(&self) -> &str {
        match self {
            AnyAnnotation::Point(a) => a.id(),
            AnyAnnotation::Circle(a) => a.id(),
            AnyAnnotation::Polyline(a) => a.id(),
            AnyAnnotation::Polygon(a) => a.id(),
        }
    }

    /// Whether the annotation is selected.
    pub fn is_selected(&self) -> bool {
        match self {
            AnyAnnotation::Point(a) => a.is_selected(),
            AnyAnnotation::Circle(a) => a.is_selected(),
            AnyAnnotation::Polyline(a) => a.is_selected(),
            AnyAnnotation::Polygon(a) => a.is_selected(),
        }
    }
}

impl From<PointAnnotation> for AnyAnnotation {
    fn from(value: PointAnnotation) -> Self {
        Self::Point(value)
    }
}

impl From<CircleAnnotation> for AnyAnnotation {
    fn from(value: CircleAnnotation) -> Self {
        Self::Circle(value)
    }
}

impl From<PolylineAnnotation> for AnyAnnotation {
    fn from(value: PolylineAnnotation) -> Self {
        Self::Polyline(value)
    }
}

impl From<PolygonAnnotation> for AnyAnnotation {
    fn from(value: PolygonAnnotation) -> Self {
        Self::Polygon(value)
    }
}

/// Receives taps on annotations of a manager.
pub trait AnnotationInteractionDelegate {
    /// Called after the selection of tapped annotations has been toggled, before their own tap handlers run.
    fn did_detect_tapped_annotations(&self, manager_id: &str, annotations: &[AnyAnnotation]);
}

/// Type-erased annotation manager, as stored by [`AnnotationOrchestrator`].
pub trait AnnotationManagerInternal {
    /// Id of the manager. Also the id of its source and main layer.
    fn id(&self) -> String;
    /// Ids of all layers the manager owns: main, drag and cluster layers.
    fn all_layer_ids(&self) -> Vec<String>;
    /// Removes all layers and sources of the manager from the style. Repeated calls do nothing.
    fn destroy(&self);
    /// Handles a tap on a feature rendered by one of the manager layers. Returns true if the tap is consumed.
    fn handle_tap(&self, layer_id: &str, feature: &Feature, context: &InteractionContext) -> bool;
    /// Handles a long press on a feature rendered by one of the manager layers. Returns true if consumed.
    fn handle_long_press(&self, layer_id: &str, feature: &Feature, context: &InteractionContext) -> bool;
    /// Starts dragging the feature. Returns true if the drag started.
    fn handle_drag_begin(&self, layer_id: &str, feature: &Feature, context: &InteractionContext) -> bool;
    /// Moves the dragged annotation.
    fn handle_drag_change(&self, context: &InteractionContext);
    /// Finishes the drag.
    fn handle_drag_end(&self, context: &InteractionContext);
    /// Managers are stored as trait objects. This method can be used to convert the trait object into the concrete
    /// type.
    fn as_any(&self) -> &dyn Any;
}

pub(crate) fn feature_id(feature: &Feature) -> Option<String> {
    match feature.id.as_ref()? {
        Id::String(id) => Some(id.clone()),
        Id::Number(id) => Some(id.to_string()),
    }
}

pub(crate) type SharedManager = Rc<dyn AnnotationManagerInternal>;
