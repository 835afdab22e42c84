//! Interfaces of the map the annotations are shown on: camera, coordinate conversion, view annotation
//! positioning engine and asynchronous feature queries.

use std::rc::Rc;

use geojson::Feature;
use mapmark_types::cartesian::{Rect, ScreenPoint};
use mapmark_types::geo::GeoPoint2d;
use serde::{Deserialize, Serialize};

use crate::error::{MapError, QueryError};
use crate::signal::Cancelable;
use crate::view_annotation::{ViewAnnotationOptions, ViewAnnotationPositionDescriptor};

/// Current position of the map camera.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CameraState {
    /// Geographic point in the center of the map view.
    pub center: GeoPoint2d,
    /// Zoom level.
    pub zoom: f64,
    /// Rotation in degrees, clockwise from north.
    pub bearing: f64,
    /// Tilt in degrees.
    pub pitch: f64,
}

/// Where a gesture happened.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InteractionContext {
    /// Gesture position in screen coordinates.
    pub point: ScreenPoint,
    /// Gesture position on the map.
    pub coordinate: GeoPoint2d,
}

/// Information about a tapped or long-pressed cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationClusterGestureContext {
    /// Gesture position in screen coordinates.
    pub point: ScreenPoint,
    /// Gesture position on the map.
    pub coordinate: GeoPoint2d,
    /// Zoom level at which the cluster breaks apart into its children.
    pub expansion_zoom: f64,
}

/// A feature returned by a rendered features query, together with the layer it was rendered by.
#[derive(Debug, Clone, PartialEq)]
pub struct QueriedFeature {
    /// Id of the layer.
    pub layer_id: String,
    /// The feature.
    pub feature: Feature,
}

/// Receives placement of view annotations computed by the map on every frame.
pub trait ViewAnnotationPositionsListener {
    /// Called with the positions of all view annotations that are visible in the current frame.
    fn on_positions_update(&self, positions: &[ViewAnnotationPositionDescriptor]);
}

/// Camera state, coordinate conversion and the view annotation positioning engine of the map.
pub trait MapDelegate {
    /// Current camera.
    fn camera_state(&self) -> CameraState;
    /// Screen position of a geographic point.
    fn point_for(&self, coordinate: &GeoPoint2d) -> ScreenPoint;
    /// Geographic point at a screen position.
    fn coordinate_for(&self, point: &ScreenPoint) -> GeoPoint2d;

    /// Registers a view annotation in the positioning engine.
    fn add_view_annotation(&self, id: &str, options: &ViewAnnotationOptions) -> Result<(), MapError>;
    /// Updates the set fields of the options of a registered view annotation.
    fn update_view_annotation(&self, id: &str, options: &ViewAnnotationOptions) -> Result<(), MapError>;
    /// Removes a view annotation from the positioning engine.
    fn remove_view_annotation(&self, id: &str) -> Result<(), MapError>;
    /// Options of a registered view annotation, as known to the positioning engine.
    fn view_annotation_options(&self, id: &str) -> Result<ViewAnnotationOptions, MapError>;
    /// Sets the single listener of placement updates. `None` removes the listener.
    fn set_view_annotation_positions_listener(&self, listener: Option<Rc<dyn ViewAnnotationPositionsListener>>);
}

/// Completion of the cluster expansion zoom query.
pub type ClusterExpansionCompletion = Box<dyn FnOnce(Result<f64, QueryError>)>;
/// Completion of the rendered features query.
pub type RenderedFeaturesCompletion = Box<dyn FnOnce(Result<Vec<QueriedFeature>, QueryError>)>;

/// Asynchronous queries into the rendered map.
///
/// Completions may be called synchronously, before the method returns, or at any later point. Dropping the
/// returned token cancels the query, after which the completion must not be called.
pub trait FeatureQueryDelegate {
    /// Queries the zoom level at which the given cluster feature of the source expands.
    fn query_cluster_expansion_zoom(
        &self,
        source_id: &str,
        cluster: &Feature,
        completion: ClusterExpansionCompletion,
    ) -> Cancelable;

    /// Queries features rendered inside the screen rectangle by the given layers.
    fn query_rendered_features(
        &self,
        rect: &Rect,
        layer_ids: &[String],
        completion: RenderedFeaturesCompletion,
    ) -> Cancelable;
}
