//! Recording in-memory implementations of the host interfaces, shared by unit tests.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use ahash::{HashMap, HashSet};
use geojson::{Feature, GeoJson};
use mapmark_types::cartesian::{Rect, ScreenPoint};
use mapmark_types::geo::{mercator, GeoPoint2d};
use serde_json::{Map, Value};

use crate::error::{MapError, QueryError, StyleError};
use crate::map::{
    CameraState, ClusterExpansionCompletion, FeatureQueryDelegate, MapDelegate, QueriedFeature,
    RenderedFeaturesCompletion, ViewAnnotationPositionsListener,
};
use crate::signal::Cancelable;
use crate::style::{GeoJsonSource, Layer, LayerPosition, StyleDelegate, StyleImage};
use crate::view_annotation::{ViewAnnotationOptions, ViewAnnotationPositionDescriptor};

pub(crate) fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum StyleCall {
    AddSource(GeoJsonSource),
    RemoveSource(String),
    AddLayer(Layer, LayerPosition),
    RemoveLayer(String),
    MoveLayer(String, LayerPosition),
    SetLayerProperties(String, Map<String, Value>),
    AddFeatures(String, Vec<Feature>),
    UpdateFeatures(String, Vec<Feature>),
    RemoveFeatures(String, Vec<String>),
    UpdateSource(String, GeoJson),
    AddImage(String),
    RemoveImage(String),
}

/// Style that records every call and keeps track of which objects exist.
#[derive(Default)]
pub(crate) struct TestStyle {
    calls: RefCell<Vec<StyleCall>>,
    sources: RefCell<HashSet<String>>,
    layers: RefCell<HashSet<String>>,
    images: RefCell<HashSet<String>>,
}

impl TestStyle {
    pub(crate) fn calls(&self) -> Vec<StyleCall> {
        self.calls.borrow().clone()
    }

    pub(crate) fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    pub(crate) fn count(&self, predicate: impl Fn(&StyleCall) -> bool) -> usize {
        self.calls.borrow().iter().filter(|call| predicate(call)).count()
    }

    /// Adds an image without recording a call, as if someone else added it.
    pub(crate) fn insert_image(&self, id: &str) {
        self.images.borrow_mut().insert(id.to_string());
    }

    /// Adds a layer without recording a call, as if someone else added it.
    pub(crate) fn insert_layer(&self, id: &str) {
        self.layers.borrow_mut().insert(id.to_string());
    }

    pub(crate) fn last_layer_properties(&self, layer_id: &str) -> Option<Map<String, Value>> {
        self.calls.borrow().iter().rev().find_map(|call| match call {
            StyleCall::SetLayerProperties(id, properties) if id == layer_id => Some(properties.clone()),
            _ => None,
        })
    }

    fn record(&self, call: StyleCall) {
        self.calls.borrow_mut().push(call);
    }

    fn insert(set: &RefCell<HashSet<String>>, id: &str) -> Result<(), StyleError> {
        if set.borrow_mut().insert(id.to_string()) {
            Ok(())
        } else {
            Err(StyleError::AlreadyExists(id.to_string()))
        }
    }

    fn remove(set: &RefCell<HashSet<String>>, id: &str) -> Result<(), StyleError> {
        if set.borrow_mut().remove(id) {
            Ok(())
        } else {
            Err(StyleError::NotFound(id.to_string()))
        }
    }

    fn check(set: &RefCell<HashSet<String>>, id: &str) -> Result<(), StyleError> {
        if set.borrow().contains(id) {
            Ok(())
        } else {
            Err(StyleError::NotFound(id.to_string()))
        }
    }
}

impl StyleDelegate for TestStyle {
    fn add_source(&self, source: &GeoJsonSource) -> Result<(), StyleError> {
        self.record(StyleCall::AddSource(source.clone()));
        Self::insert(&self.sources, &source.id)
    }

    fn remove_source(&self, id: &str) -> Result<(), StyleError> {
        self.record(StyleCall::RemoveSource(id.to_string()));
        Self::remove(&self.sources, id)
    }

    fn source_exists(&self, id: &str) -> bool {
        self.sources.borrow().contains(id)
    }

    fn add_persistent_layer(&self, layer: &Layer, position: &LayerPosition) -> Result<(), StyleError> {
        self.record(StyleCall::AddLayer(layer.clone(), position.clone()));
        Self::insert(&self.layers, &layer.id)
    }

    fn remove_layer(&self, id: &str) -> Result<(), StyleError> {
        self.record(StyleCall::RemoveLayer(id.to_string()));
        Self::remove(&self.layers, id)
    }

    fn layer_exists(&self, id: &str) -> bool {
        self.layers.borrow().contains(id)
    }

    fn move_layer(&self, id: &str, position: &LayerPosition) -> Result<(), StyleError> {
        self.record(StyleCall::MoveLayer(id.to_string(), position.clone()));
        Self::check(&self.layers, id)
    }

    fn set_layer_properties(&self, layer_id: &str, properties: &Map<String, Value>) -> Result<(), StyleError> {
        self.record(StyleCall::SetLayerProperties(layer_id.to_string(), properties.clone()));
        Self::check(&self.layers, layer_id)
    }

    fn add_geojson_source_features(&self, source_id: &str, features: &[Feature]) -> Result<(), StyleError> {
        self.record(StyleCall::AddFeatures(source_id.to_string(), features.to_vec()));
        Self::check(&self.sources, source_id)
    }

    fn update_geojson_source_features(&self, source_id: &str, features: &[Feature]) -> Result<(), StyleError> {
        self.record(StyleCall::UpdateFeatures(source_id.to_string(), features.to_vec()));
        Self::check(&self.sources, source_id)
    }

    fn remove_geojson_source_features(&self, source_id: &str, feature_ids: &[String]) -> Result<(), StyleError> {
        self.record(StyleCall::RemoveFeatures(source_id.to_string(), feature_ids.to_vec()));
        Self::check(&self.sources, source_id)
    }

    fn update_geojson_source(&self, source_id: &str, data: &GeoJson) -> Result<(), StyleError> {
        self.record(StyleCall::UpdateSource(source_id.to_string(), data.clone()));
        Self::check(&self.sources, source_id)
    }

    fn add_image(&self, id: &str, _image: &StyleImage) -> Result<(), StyleError> {
        self.record(StyleCall::AddImage(id.to_string()));
        self.images.borrow_mut().insert(id.to_string());
        Ok(())
    }

    fn remove_image(&self, id: &str) -> Result<(), StyleError> {
        self.record(StyleCall::RemoveImage(id.to_string()));
        Self::remove(&self.images, id)
    }

    fn image_exists(&self, id: &str) -> bool {
        self.images.borrow().contains(id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum MapCall {
    Add(String, ViewAnnotationOptions),
    Update(String, ViewAnnotationOptions),
    Remove(String),
}

/// Map with a fixed camera over an 800x600 viewport and an in-memory view annotation registry.
pub(crate) struct TestMap {
    camera: CameraState,
    viewport_center: ScreenPoint,
    registry: RefCell<HashMap<String, ViewAnnotationOptions>>,
    calls: RefCell<Vec<MapCall>>,
    listener: RefCell<Option<Rc<dyn ViewAnnotationPositionsListener>>>,
    next_add_error: RefCell<Option<MapError>>,
}

impl Default for TestMap {
    fn default() -> Self {
        Self::new(CameraState {
            center: GeoPoint2d::default(),
            zoom: 3.0,
            ..Default::default()
        })
    }
}

impl TestMap {
    pub(crate) fn new(camera: CameraState) -> Self {
        Self {
            camera,
            viewport_center: ScreenPoint::new(400.0, 300.0),
            registry: RefCell::default(),
            calls: RefCell::default(),
            listener: RefCell::default(),
            next_add_error: RefCell::default(),
        }
    }

    pub(crate) fn calls(&self) -> Vec<MapCall> {
        self.calls.borrow().clone()
    }

    pub(crate) fn options(&self, id: &str) -> Option<ViewAnnotationOptions> {
        self.registry.borrow().get(id).cloned()
    }

    pub(crate) fn registered_ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.registry.borrow().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub(crate) fn fail_next_add(&self, error: MapError) {
        *self.next_add_error.borrow_mut() = Some(error);
    }

    pub(crate) fn has_positions_listener(&self) -> bool {
        self.listener.borrow().is_some()
    }

    /// Reports placement to the listener, as the map does on every frame.
    pub(crate) fn fire_positions(&self, positions: &[ViewAnnotationPositionDescriptor]) {
        let listener = self.listener.borrow().clone();
        if let Some(listener) = listener {
            listener.on_positions_update(positions);
        }
    }
}

impl MapDelegate for TestMap {
    fn camera_state(&self) -> CameraState {
        self.camera
    }

    fn point_for(&self, coordinate: &GeoPoint2d) -> ScreenPoint {
        let world = mercator::project(coordinate, self.camera.zoom);
        let center = mercator::project(&self.camera.center, self.camera.zoom);
        ScreenPoint::new(
            world.x - center.x + self.viewport_center.x,
            world.y - center.y + self.viewport_center.y,
        )
    }

    fn coordinate_for(&self, point: &ScreenPoint) -> GeoPoint2d {
        let center = mercator::project(&self.camera.center, self.camera.zoom);
        mercator::unproject(
            mercator::MercatorCoordinate::new(
                point.x - self.viewport_center.x + center.x,
                point.y - self.viewport_center.y + center.y,
            ),
            self.camera.zoom,
        )
    }

    fn add_view_annotation(&self, id: &str, options: &ViewAnnotationOptions) -> Result<(), MapError> {
        self.calls
            .borrow_mut()
            .push(MapCall::Add(id.to_string(), options.clone()));
        if let Some(err) = self.next_add_error.borrow_mut().take() {
            return Err(err);
        }

        let mut registry = self.registry.borrow_mut();
        if registry.contains_key(id) {
            return Err(MapError::Generic(format!("view annotation {id} already exists")));
        }
        registry.insert(id.to_string(), options.clone());
        Ok(())
    }

    fn update_view_annotation(&self, id: &str, options: &ViewAnnotationOptions) -> Result<(), MapError> {
        self.calls
            .borrow_mut()
            .push(MapCall::Update(id.to_string(), options.clone()));
        match self.registry.borrow_mut().get_mut(id) {
            Some(existing) => {
                existing.merge(options.clone());
                Ok(())
            }
            None => Err(MapError::ViewAnnotationNotFound(id.to_string())),
        }
    }

    fn remove_view_annotation(&self, id: &str) -> Result<(), MapError> {
        self.calls.borrow_mut().push(MapCall::Remove(id.to_string()));
        match self.registry.borrow_mut().remove(id) {
            Some(_) => Ok(()),
            None => Err(MapError::ViewAnnotationNotFound(id.to_string())),
        }
    }

    fn view_annotation_options(&self, id: &str) -> Result<ViewAnnotationOptions, MapError> {
        self.options(id)
            .ok_or_else(|| MapError::ViewAnnotationNotFound(id.to_string()))
    }

    fn set_view_annotation_positions_listener(&self, listener: Option<Rc<dyn ViewAnnotationPositionsListener>>) {
        *self.listener.borrow_mut() = listener;
    }
}

/// Feature queries answered from preset results. Expansion zoom queries can be deferred and completed later.
#[derive(Default)]
pub(crate) struct TestQuery {
    expansion_zoom: RefCell<Option<Result<f64, QueryError>>>,
    deferred: Cell<bool>,
    pending: RefCell<Vec<ClusterExpansionCompletion>>,
    expansion_queries: RefCell<Vec<String>>,
    rendered_features: RefCell<Vec<QueriedFeature>>,
    rendered_queries: RefCell<Vec<(Rect, Vec<String>)>>,
    canceled: Rc<Cell<usize>>,
}

impl TestQuery {
    pub(crate) fn set_expansion_zoom(&self, result: Result<f64, QueryError>) {
        *self.expansion_zoom.borrow_mut() = Some(result);
    }

    pub(crate) fn set_deferred(&self, deferred: bool) {
        self.deferred.set(deferred);
    }

    /// Calls all deferred completions, including the ones whose tokens were canceled.
    pub(crate) fn complete_pending(&self, result: Result<f64, QueryError>) {
        let pending: Vec<_> = self.pending.borrow_mut().drain(..).collect();
        for completion in pending {
            completion(result.clone());
        }
    }

    pub(crate) fn expansion_queries(&self) -> Vec<String> {
        self.expansion_queries.borrow().clone()
    }

    pub(crate) fn canceled_count(&self) -> usize {
        self.canceled.get()
    }

    pub(crate) fn set_rendered_features(&self, features: Vec<QueriedFeature>) {
        *self.rendered_features.borrow_mut() = features;
    }

    pub(crate) fn rendered_queries(&self) -> Vec<(Rect, Vec<String>)> {
        self.rendered_queries.borrow().clone()
    }

    fn token(&self) -> Cancelable {
        let canceled = self.canceled.clone();
        Cancelable::new(move || canceled.set(canceled.get() + 1))
    }
}

impl FeatureQueryDelegate for TestQuery {
    fn query_cluster_expansion_zoom(
        &self,
        source_id: &str,
        _cluster: &Feature,
        completion: ClusterExpansionCompletion,
    ) -> Cancelable {
        self.expansion_queries.borrow_mut().push(source_id.to_string());
        if self.deferred.get() {
            self.pending.borrow_mut().push(completion);
        } else {
            let result = self
                .expansion_zoom
                .borrow()
                .clone()
                .unwrap_or(Err(QueryError::NotACluster));
            completion(result);
        }

        self.token()
    }

    fn query_rendered_features(
        &self,
        rect: &Rect,
        layer_ids: &[String],
        completion: RenderedFeaturesCompletion,
    ) -> Cancelable {
        self.rendered_queries
            .borrow_mut()
            .push((*rect, layer_ids.to_vec()));
        let features: Vec<_> = self
            .rendered_features
            .borrow()
            .iter()
            .filter(|queried| layer_ids.contains(&queried.layer_id))
            .cloned()
            .collect();
        completion(Ok(features));

        self.token()
    }
}
