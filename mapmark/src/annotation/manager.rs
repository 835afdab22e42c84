use std::any::Any;
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::{Rc, Weak};

use ahash::{HashMap, HashMapExt, HashSet, HashSetExt};
use geojson::{Feature, FeatureCollection, GeoJson};
use mapmark_types::cartesian::ScreenPoint;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::cluster::{cluster_circle_layer_id, cluster_text_layer_id, ClusterOptions};
use super::diff::{remove_duplicates, AnnotationsDiff};
use super::images::AnnotationImagesManager;
use super::{
    feature_id, Annotation, AnnotationInteractionDelegate, AnnotationManagerInternal, CircleAnnotation,
    DragHandler, GestureHandler, GestureHandlers, PointAnnotation, PolygonAnnotation, PolylineAnnotation,
    LAYER_PROPERTIES_KEY,
};
use crate::map::{AnnotationClusterGestureContext, FeatureQueryDelegate, InteractionContext, MapDelegate};
use crate::signal::{Cancelable, Signal};
use crate::style::{GeoJsonSource, LayerPosition, StyleDelegate};
use crate::sync_flag::{DirtyFlag, OneShot};

/// Manager of point annotations.
pub type PointAnnotationManager = AnnotationManager<PointAnnotation>;
/// Manager of circle annotations.
pub type CircleAnnotationManager = AnnotationManager<CircleAnnotation>;
/// Manager of polyline annotations.
pub type PolylineAnnotationManager = AnnotationManager<PolylineAnnotation>;
/// Manager of polygon annotations.
pub type PolygonAnnotationManager = AnnotationManager<PolygonAnnotation>;

/// Handler of a tap or long press on a cluster.
pub type ClusterGestureHandler = Rc<dyn Fn(&AnnotationClusterGestureContext)>;

/// Construction parameters of an annotation manager.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationManagerParams {
    /// Id of the manager. Also used as the id of its source and main layer.
    pub id: String,
    /// Where the main layer is inserted. `None` puts it on top of the style.
    #[serde(default)]
    pub layer_position: Option<LayerPosition>,
    /// Clustering of annotations. Meaningful for point annotations only.
    #[serde(default)]
    pub cluster_options: Option<ClusterOptions>,
}

impl AnnotationManagerParams {
    /// Parameters of a manager with the given id, no clustering, on top of the style.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            layer_position: None,
            cluster_options: None,
        }
    }

    /// Sets the position of the main layer.
    pub fn with_layer_position(mut self, position: LayerPosition) -> Self {
        self.layer_position = Some(position);
        self
    }

    /// Enables clustering.
    pub fn with_cluster_options(mut self, options: ClusterOptions) -> Self {
        self.cluster_options = Some(options);
        self
    }
}

/// Collaborators of an annotation manager.
#[derive(Clone)]
pub struct AnnotationManagerDeps {
    /// Style the source and layers are created in.
    pub style: Rc<dyn StyleDelegate>,
    /// Map used to convert drag gestures into geographic offsets.
    pub map: Rc<dyn MapDelegate>,
    /// Feature queries, used for cluster gestures.
    pub queryable: Rc<dyn FeatureQueryDelegate>,
    /// Emitted before every frame. Pending changes are pushed to the style on each emission.
    pub display_link: Signal,
    /// Shared image registry. Required only by managers of annotations with images.
    pub images: Option<AnnotationImagesManager>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Location {
    Main(usize),
    Dragged(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClusterGesture {
    Tap,
    LongPress,
}

struct ManagerState<T: Annotation> {
    id: String,
    drag_id: String,
    style: Rc<dyn StyleDelegate>,
    map: Rc<dyn MapDelegate>,
    queryable: Rc<dyn FeatureQueryDelegate>,
    images: Option<AnnotationImagesManager>,

    main: Vec<T>,
    displayed: Vec<T>,
    dragged: Vec<T>,
    dragged_index: Option<usize>,
    last_drag_point: Option<ScreenPoint>,

    layer_properties: Map<String, Value>,
    previously_set_keys: HashSet<String>,
    used_images: HashSet<String>,
    layer_position: Option<LayerPosition>,
    cluster_options: Option<ClusterOptions>,

    ids_by_key: HashMap<String, String>,
    is_declarative: bool,

    interaction_delegate: Option<Weak<dyn AnnotationInteractionDelegate>>,
    on_cluster_tap: Option<ClusterGestureHandler>,
    on_cluster_long_press: Option<ClusterGestureHandler>,

    sync_source: DirtyFlag,
    sync_drag_source: DirtyFlag,
    sync_layer: DirtyFlag,
    drag_layer_inserted: OneShot,
    destroyed: OneShot,

    display_link_token: Option<Cancelable>,
    cluster_query_token: Option<Cancelable>,
}

/// Owner of a collection of annotations of one kind.
///
/// The manager creates a GeoJSON source and a layer with its own id in the style, plus a drag layer and source
/// created on the first drag, plus two cluster layers if clustering is enabled. Changes to the collection are
/// accumulated and pushed to the style on the next display link emission: features are added, updated and removed
/// incrementally, and layer properties are recomputed only when they might have changed.
///
/// The manager is a cheap handle. Clones share the same state.
pub struct AnnotationManager<T: Annotation> {
    state: Rc<RefCell<ManagerState<T>>>,
}

impl<T: Annotation> Clone for AnnotationManager<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<T: Annotation> std::fmt::Debug for AnnotationManager<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("AnnotationManager")
            .field("id", &state.id)
            .field("annotations", &state.main.len())
            .field("dragged", &state.dragged.len())
            .field("is_destroyed", &state.destroyed.happened())
            .finish()
    }
}

impl<T: Annotation> AnnotationManager<T> {
    /// Creates the manager and its source and layers in the style.
    ///
    /// Failures to create style objects are logged; the manager stays usable and keeps trying to push its changes.
    pub fn new(params: AnnotationManagerParams, deps: AnnotationManagerDeps) -> Self {
        let AnnotationManagerParams {
            id,
            layer_position,
            cluster_options,
        } = params;
        let AnnotationManagerDeps {
            style,
            map,
            queryable,
            display_link,
            images,
        } = deps;

        let mut source = GeoJsonSource::new(&id);
        if let Some(options) = &cluster_options {
            options.apply_to(&mut source);
        }

        let layer = T::make_layer(&id, &id);
        let position = layer_position.clone().unwrap_or_default();
        if let Err(err) = style
            .add_source(&source)
            .and_then(|()| style.add_persistent_layer(&layer, &position))
        {
            log::error!("Failed to create source and layer of annotation manager {id}: {err}");
        }

        if let Some(options) = &cluster_options {
            add_cluster_layers(&*style, options, &id);
        }

        if let Some(images) = &images {
            images.register_consumer(&id);
        }

        let state = Rc::new(RefCell::new(ManagerState {
            drag_id: format!("{id}_drag"),
            id,
            style,
            map,
            queryable,
            images,
            main: vec![],
            displayed: vec![],
            dragged: vec![],
            dragged_index: None,
            last_drag_point: None,
            layer_properties: Map::new(),
            previously_set_keys: HashSet::new(),
            used_images: HashSet::new(),
            layer_position,
            cluster_options,
            ids_by_key: HashMap::new(),
            is_declarative: false,
            interaction_delegate: None,
            on_cluster_tap: None,
            on_cluster_long_press: None,
            sync_source: DirtyFlag::clean(),
            sync_drag_source: DirtyFlag::clean(),
            sync_layer: DirtyFlag::clean(),
            drag_layer_inserted: OneShot::default(),
            destroyed: OneShot::default(),
            display_link_token: None,
            cluster_query_token: None,
        }));

        let weak = Rc::downgrade(&state);
        let token = display_link.observe(move || {
            if let Some(state) = weak.upgrade() {
                sync_if_needed(&state);
            }
        });
        state.borrow_mut().display_link_token = Some(token);

        Self { state }
    }

    /// Id of the manager, its source and its main layer.
    pub fn id(&self) -> String {
        self.state.borrow().id.clone()
    }

    /// Id of the layer and source that show annotations being dragged.
    pub fn drag_layer_id(&self) -> String {
        self.state.borrow().drag_id.clone()
    }

    /// All annotations of the manager, including the ones being dragged (at the end).
    pub fn annotations(&self) -> Vec<T> {
        let state = self.state.borrow();
        state.main.iter().chain(&state.dragged).cloned().collect()
    }

    /// Replaces the collection. Annotations with repeated ids are dropped, keeping the first occurrence. Any drag in
    /// progress is abandoned.
    pub fn set_annotations(&self, annotations: Vec<T>) {
        self.state.borrow_mut().replace_annotations(annotations);
    }

    /// Replaces the collection from keyed entries, for declarative callers that rebuild annotations on every
    /// update.
    ///
    /// The annotation created for a key keeps the id it got the first time the key was seen, so the style sees
    /// updates instead of remove-and-add. Keys absent from the call are forgotten. Declared annotations are never
    /// draggable or selected, and the manager switches into declarative mode.
    pub fn set_keyed_annotations<K: Into<String>>(&self, annotations: impl IntoIterator<Item = (K, T)>) {
        let mut state = self.state.borrow_mut();

        let mut ids_by_key = HashMap::new();
        let mut resolved = vec![];
        for (key, mut annotation) in annotations {
            let key = key.into();
            let id = state
                .ids_by_key
                .get(&key)
                .cloned()
                .unwrap_or_else(|| annotation.id().to_string());

            annotation.set_id(id.clone());
            annotation.set_draggable(false);
            annotation.set_selected(false);
            ids_by_key.insert(key, id);
            resolved.push(annotation);
        }

        state.ids_by_key = ids_by_key;
        state.is_declarative = true;
        state.replace_annotations(resolved);
    }

    /// Declarative managers never write interaction results back into their collection and do not start drags.
    pub fn set_declarative(&self, is_declarative: bool) {
        self.state.borrow_mut().is_declarative = is_declarative;
    }

    /// Whether the manager is in declarative mode.
    pub fn is_declarative(&self) -> bool {
        self.state.borrow().is_declarative
    }

    /// Manager-level layer properties. They apply to annotations that do not set the property themselves.
    pub fn layer_properties(&self) -> Map<String, Value> {
        self.state.borrow().layer_properties.clone()
    }

    /// Value of a manager-level layer property.
    pub fn layer_property(&self, key: &str) -> Option<Value> {
        self.state.borrow().layer_properties.get(key).cloned()
    }

    /// Sets a manager-level layer property. `None` resets it to the style default on the next sync.
    pub fn set_layer_property(&self, key: &str, value: Option<Value>) {
        let mut state = self.state.borrow_mut();
        match value {
            Some(value) => {
                state.layer_properties.insert(key.to_string(), value);
            }
            None => {
                state.layer_properties.remove(key);
            }
        }
        state.sync_layer.mark();
    }

    /// Replaces all manager-level layer properties.
    pub fn set_layer_properties(&self, properties: Map<String, Value>) {
        let mut state = self.state.borrow_mut();
        state.layer_properties = properties;
        state.sync_layer.mark();
    }

    /// Position of the main layer given at creation or by [`Self::set_layer_position`].
    pub fn layer_position(&self) -> Option<LayerPosition> {
        self.state.borrow().layer_position.clone()
    }

    /// Moves the main layer. `None` moves it on top of the style.
    pub fn set_layer_position(&self, position: Option<LayerPosition>) {
        let mut state = self.state.borrow_mut();
        if state.layer_position == position {
            return;
        }

        let target = position.clone().unwrap_or_default();
        if let Err(err) = state.style.move_layer(&state.id, &target) {
            log::error!("Failed to move layer of annotation manager {}: {err}", state.id);
        }
        state.layer_position = position;
    }

    /// Clustering options given at creation.
    pub fn cluster_options(&self) -> Option<ClusterOptions> {
        self.state.borrow().cluster_options.clone()
    }

    /// Sets the handler of taps on clusters. It is called once the expansion zoom of the cluster is known.
    pub fn on_cluster_tap(&self, handler: impl Fn(&AnnotationClusterGestureContext) + 'static) {
        self.state.borrow_mut().on_cluster_tap = Some(Rc::new(handler));
    }

    /// Sets the handler of long presses on clusters.
    pub fn on_cluster_long_press(&self, handler: impl Fn(&AnnotationClusterGestureContext) + 'static) {
        self.state.borrow_mut().on_cluster_long_press = Some(Rc::new(handler));
    }

    /// Sets the receiver of tapped annotations. The manager does not keep the delegate alive.
    pub fn set_interaction_delegate(&self, delegate: Option<Weak<dyn AnnotationInteractionDelegate>>) {
        self.state.borrow_mut().interaction_delegate = delegate;
    }

    /// Removes the source and all layers of the manager from the style and stops syncing. Only the first call has
    /// any effect.
    pub fn destroy(&self) {
        let (display_link_token, cluster_query_token) = {
            let mut state = self.state.borrow_mut();
            if !state.destroyed.fire() {
                return;
            }

            state.remove_style_objects();
            state.release_images();
            (state.display_link_token.take(), state.cluster_query_token.take())
        };

        drop(display_link_token);
        drop(cluster_query_token);
    }

    /// Returns true if [`Self::destroy`] was called.
    pub fn is_destroyed(&self) -> bool {
        self.state.borrow().destroyed.happened()
    }

    /// Pushes pending changes to the style. Called on every display link emission.
    pub fn sync_if_needed(&self) {
        sync_if_needed(&self.state);
    }

    /// Toggles selection of the first annotation with the given id, notifies the interaction delegate and calls the
    /// tap handler of the annotation. Returns the result of the handler, or false if there is none.
    pub fn tap_annotation(&self, annotation_id: &str, context: &InteractionContext) -> bool {
        let (manager_id, annotation, delegate) = {
            let mut state = self.state.borrow_mut();
            if state.destroyed.happened() {
                return false;
            }

            let Some(location) = state.find_first(annotation_id) else {
                return false;
            };
            let Some(mut annotation) = state.get(location).cloned() else {
                return false;
            };

            annotation.set_selected(!annotation.is_selected());
            if !state.is_declarative {
                state.put(location, annotation.clone());
            }

            let delegate = state.interaction_delegate.as_ref().and_then(Weak::upgrade);
            (state.id.clone(), annotation, delegate)
        };

        if let Some(delegate) = delegate {
            delegate.did_detect_tapped_annotations(&manager_id, &[annotation.clone().into()]);
        }

        call_gesture_handler(annotation.handlers().tap.clone(), context)
    }

    /// Calls the long press handler of the first annotation with the given id. Returns its result, or false if
    /// there is none.
    pub fn long_press_annotation(&self, annotation_id: &str, context: &InteractionContext) -> bool {
        let handler = {
            let state = self.state.borrow();
            if state.destroyed.happened() {
                return false;
            }

            let Some(annotation) = state.find_first(annotation_id).and_then(|l| state.get(l)) else {
                return false;
            };
            annotation.handlers().long_press.clone()
        };

        call_gesture_handler(handler, context)
    }

    /// Starts dragging the annotation with the given id.
    ///
    /// The annotation must be draggable. Its drag begin handler can modify it and veto the drag. On success the
    /// annotation moves from the main layer to the drag layer, created on first use above the main one.
    pub fn begin_drag(&self, annotation_id: &str, context: &InteractionContext) -> bool {
        let (location, mut annotation) = {
            let state = self.state.borrow();
            if state.is_declarative || state.destroyed.happened() {
                return false;
            }

            let Some(location) = state.find_draggable(annotation_id) else {
                return false;
            };
            let Some(annotation) = state.get(location).cloned() else {
                return false;
            };
            (location, annotation)
        };

        let allowed = match annotation.handlers().drag_begin.clone() {
            Some(handler) => handler(&mut annotation, context),
            None => true,
        };

        let mut state = self.state.borrow_mut();
        if state.get(location).map(Annotation::id) != Some(annotation_id) {
            log::debug!("Annotation {annotation_id} was replaced during drag begin, the drag is canceled");
            return false;
        }

        state.put(location, annotation);
        if !allowed {
            return false;
        }

        match location {
            Location::Dragged(index) => {
                state.dragged_index = Some(index);
            }
            Location::Main(index) => {
                state.insert_drag_layer();
                let annotation = state.main.remove(index);
                state.sync_source.mark();
                state.dragged.push(annotation);
                state.mark_dragged_changed();
                state.dragged_index = Some(state.dragged.len() - 1);
                state.sync_layer.mark();
            }
        }

        state.last_drag_point = Some(context.point);
        true
    }

    /// Moves the dragged annotation by the distance between the previous and the current gesture points, then calls
    /// its drag change handler.
    pub fn change_drag(&self, context: &InteractionContext) {
        let (index, annotation) = {
            let mut state = self.state.borrow_mut();
            if state.is_declarative {
                return;
            }

            let (Some(index), Some(last_point)) = (state.dragged_index, state.last_drag_point) else {
                return;
            };
            if index >= state.dragged.len() {
                return;
            }

            let translation = last_point - context.point;
            state.last_drag_point = Some(context.point);

            let map = state.map.clone();
            state.dragged[index].drag(&translation, &*map);
            state.mark_dragged_changed();
            (index, state.dragged[index].clone())
        };

        self.call_drag_handler(index, annotation, context, |h| h.drag_change.clone());
    }

    /// Calls the drag end handler of the dragged annotation and finishes the drag. The annotation stays in the drag
    /// layer until the collection is replaced.
    pub fn end_drag(&self, context: &InteractionContext) {
        let dragged = {
            let state = self.state.borrow();
            state
                .dragged_index
                .and_then(|index| state.dragged.get(index).map(|a| (index, a.clone())))
        };

        if let Some((index, annotation)) = dragged {
            self.call_drag_handler(index, annotation, context, |h| h.drag_end.clone());
        }

        let mut state = self.state.borrow_mut();
        state.dragged_index = None;
        state.last_drag_point = None;
    }

    fn call_drag_handler(
        &self,
        index: usize,
        mut annotation: T,
        context: &InteractionContext,
        select: impl Fn(&GestureHandlers<T>) -> Option<DragHandler<T>>,
    ) {
        let Some(handler) = select(annotation.handlers()) else {
            return;
        };

        handler(&mut annotation, context);

        let mut state = self.state.borrow_mut();
        let location = Location::Dragged(index);
        if state.get(location).map(Annotation::id) == Some(annotation.id()) {
            state.put(location, annotation);
        }
    }

    fn handle_cluster_gesture(
        &self,
        gesture: ClusterGesture,
        cluster: &Feature,
        context: &InteractionContext,
    ) -> bool {
        let (handler, queryable, source_id) = {
            let state = self.state.borrow();
            let handler = match gesture {
                ClusterGesture::Tap => state.on_cluster_tap.clone(),
                ClusterGesture::LongPress => state.on_cluster_long_press.clone(),
            };
            let Some(handler) = handler else {
                return false;
            };
            (handler, state.queryable.clone(), state.id.clone())
        };

        let weak = Rc::downgrade(&self.state);
        let manager_id = source_id.clone();
        let point = context.point;
        let coordinate = context.coordinate;
        let token = queryable.query_cluster_expansion_zoom(
            &source_id,
            cluster,
            Box::new(move |result| {
                let Some(state) = weak.upgrade() else {
                    return;
                };
                if state.borrow().destroyed.happened() {
                    return;
                }

                match result {
                    Ok(expansion_zoom) => handler(&AnnotationClusterGestureContext {
                        point,
                        coordinate,
                        expansion_zoom,
                    }),
                    Err(err) => log::warn!("Failed to query cluster expansion zoom of {manager_id}: {err}"),
                }
            }),
        );

        let _previous = std::mem::replace(&mut self.state.borrow_mut().cluster_query_token, Some(token));
        true
    }

    fn is_cluster_layer(&self, layer_id: &str) -> bool {
        let state = self.state.borrow();
        state.cluster_options.is_some()
            && (layer_id == cluster_circle_layer_id(&state.id) || layer_id == cluster_text_layer_id(&state.id))
    }
}

impl<T: Annotation> ManagerState<T> {
    fn replace_annotations(&mut self, mut annotations: Vec<T>) {
        remove_duplicates(&mut annotations, &self.id);
        self.main = annotations;
        self.sync_source.mark();

        if !self.dragged.is_empty() {
            self.dragged.clear();
            self.mark_dragged_changed();
            self.sync_layer.mark();
        }
        self.dragged_index = None;
        self.last_drag_point = None;
    }

    fn find_first(&self, id: &str) -> Option<Location> {
        if let Some(index) = self.main.iter().position(|a| a.id() == id) {
            return Some(Location::Main(index));
        }

        self.dragged
            .iter()
            .position(|a| a.id() == id)
            .map(Location::Dragged)
    }

    fn find_draggable(&self, id: &str) -> Option<Location> {
        let matches = |a: &T| a.id() == id && a.is_draggable();
        if let Some(index) = self.dragged.iter().position(matches) {
            return Some(Location::Dragged(index));
        }

        self.main.iter().rposition(matches).map(Location::Main)
    }

    fn get(&self, location: Location) -> Option<&T> {
        match location {
            Location::Main(index) => self.main.get(index),
            Location::Dragged(index) => self.dragged.get(index),
        }
    }

    fn put(&mut self, location: Location, annotation: T) {
        match location {
            Location::Main(index) => {
                if let Some(slot) = self.main.get_mut(index) {
                    *slot = annotation;
                    self.sync_source.mark();
                }
            }
            Location::Dragged(index) => {
                if let Some(slot) = self.dragged.get_mut(index) {
                    *slot = annotation;
                    self.mark_dragged_changed();
                }
            }
        }
    }

    fn mark_dragged_changed(&mut self) {
        self.sync_drag_source.mark_if(self.drag_layer_inserted.happened());
    }

    fn insert_drag_layer(&mut self) {
        if !self.drag_layer_inserted.fire() {
            return;
        }

        let source = GeoJsonSource::new(&self.drag_id);
        let layer = T::make_layer(&self.drag_id, &self.drag_id);
        let position = LayerPosition::Above(self.id.clone());
        if let Err(err) = self
            .style
            .add_source(&source)
            .and_then(|()| self.style.add_persistent_layer(&layer, &position))
        {
            log::error!("Failed to create drag layer of annotation manager {}: {err}", self.id);
        }
    }

    fn sync_source(&mut self) {
        if !self.sync_source.take() {
            return;
        }

        let diff = AnnotationsDiff::between(&self.displayed, &self.main);
        if diff.is_empty() {
            return;
        }

        diff.apply(&*self.style, &self.id);
        self.displayed = self.main.clone();
        self.sync_layer.mark();
    }

    fn sync_drag_source(&mut self) {
        if !self.sync_drag_source.take() {
            return;
        }

        let collection = FeatureCollection {
            bbox: None,
            features: self.dragged.iter().map(Annotation::feature).collect(),
            foreign_members: None,
        };
        if let Err(err) = self
            .style
            .update_geojson_source(&self.drag_id, &GeoJson::FeatureCollection(collection))
        {
            log::warn!("Failed to update drag source of annotation manager {}: {err}", self.id);
        }
    }

    fn sync_layer(&mut self) {
        if !self.sync_layer.take() {
            return;
        }

        self.sync_images();

        let data_driven_keys: BTreeSet<&String> = self
            .main
            .iter()
            .chain(&self.dragged)
            .flat_map(|a| a.layer_properties().keys())
            .collect();

        let mut properties = Map::new();
        for key in data_driven_keys {
            let fallback = self
                .layer_properties
                .get(key)
                .cloned()
                .unwrap_or_else(|| self.style.layer_property_default_value(T::LAYER_TYPE, key));
            properties.insert(
                key.clone(),
                json!(["coalesce", ["get", key, ["get", LAYER_PROPERTIES_KEY]], fallback]),
            );
        }

        for (key, value) in &self.layer_properties {
            properties.entry(key.clone()).or_insert_with(|| value.clone());
        }

        let set_keys: HashSet<String> = properties.keys().cloned().collect();
        let unused_keys: Vec<String> = self.previously_set_keys.difference(&set_keys).cloned().collect();
        for key in unused_keys {
            let default = self.style.layer_property_default_value(T::LAYER_TYPE, &key);
            properties.insert(key, default);
        }
        self.previously_set_keys = set_keys;

        if let Err(err) = self.style.set_layer_properties(&self.id, &properties) {
            log::error!("Failed to set layer properties of annotation manager {}: {err}", self.id);
            return;
        }

        if !self.dragged.is_empty() {
            if let Err(err) = self.style.set_layer_properties(&self.drag_id, &properties) {
                log::error!("Failed to set drag layer properties of annotation manager {}: {err}", self.id);
            }
        }
    }

    fn sync_images(&mut self) {
        let Some(images) = &self.images else {
            return;
        };

        let mut used = HashSet::new();
        for annotation in self.main.iter().chain(&self.dragged) {
            let Some(image) = annotation.image() else {
                continue;
            };

            let name = image.name();
            if used.insert(name.to_string()) && !self.style.image_exists(name) {
                images.add_image(name, &image.style_image());
            }
        }

        images.update_consumer_images(&self.id, used.clone());
        for name in self.used_images.difference(&used) {
            images.remove_image(name);
        }
        self.used_images = used;
    }

    fn release_images(&mut self) {
        let Some(images) = &self.images else {
            return;
        };

        images.unregister_consumer(&self.id);
        for name in self.used_images.drain() {
            images.remove_image(&name);
        }
    }

    fn remove_style_objects(&self) {
        let style = &*self.style;
        let remove_layer = |id: &str| {
            if let Err(err) = style.remove_layer(id) {
                log::warn!("Failed to remove layer {id} of annotation manager {}: {err}", self.id);
            }
        };
        let remove_source = |id: &str| {
            if let Err(err) = style.remove_source(id) {
                log::warn!("Failed to remove source {id} of annotation manager {}: {err}", self.id);
            }
        };

        if self.cluster_options.is_some() {
            remove_layer(&cluster_circle_layer_id(&self.id));
            remove_layer(&cluster_text_layer_id(&self.id));
        }

        remove_layer(&self.id);
        remove_source(&self.id);

        if self.drag_layer_inserted.happened() {
            remove_layer(&self.drag_id);
            remove_source(&self.drag_id);
        }
    }
}

fn add_cluster_layers(style: &dyn StyleDelegate, options: &ClusterOptions, manager_id: &str) {
    for layer in [options.circle_layer(manager_id), options.text_layer(manager_id)] {
        if style.layer_exists(&layer.id) {
            continue;
        }

        if let Err(err) = style.add_persistent_layer(&layer, &LayerPosition::Default) {
            log::error!("Failed to add cluster layer {} of annotation manager {manager_id}: {err}", layer.id);
        }
    }
}

fn sync_if_needed<T: Annotation>(state: &RefCell<ManagerState<T>>) {
    let Ok(mut state) = state.try_borrow_mut() else {
        log::debug!("Annotation manager is busy, sync is postponed to the next frame");
        return;
    };

    if state.destroyed.happened() {
        return;
    }

    state.sync_source();
    if state.drag_layer_inserted.happened() {
        state.sync_drag_source();
    }
    state.sync_layer();
}

fn call_gesture_handler(handler: Option<GestureHandler>, context: &InteractionContext) -> bool {
    handler.map(|handler| handler(context)).unwrap_or(false)
}

impl<T: Annotation> AnnotationManagerInternal for AnnotationManager<T> {
    fn id(&self) -> String {
        AnnotationManager::id(self)
    }

    fn all_layer_ids(&self) -> Vec<String> {
        let state = self.state.borrow();
        let mut ids = vec![state.id.clone(), state.drag_id.clone()];
        if state.cluster_options.is_some() {
            ids.push(cluster_circle_layer_id(&state.id));
            ids.push(cluster_text_layer_id(&state.id));
        }
        ids
    }

    fn destroy(&self) {
        AnnotationManager::destroy(self)
    }

    fn handle_tap(&self, layer_id: &str, feature: &Feature, context: &InteractionContext) -> bool {
        if self.is_cluster_layer(layer_id) {
            return self.handle_cluster_gesture(ClusterGesture::Tap, feature, context);
        }

        feature_id(feature).is_some_and(|id| self.tap_annotation(&id, context))
    }

    fn handle_long_press(&self, layer_id: &str, feature: &Feature, context: &InteractionContext) -> bool {
        if self.is_cluster_layer(layer_id) {
            return self.handle_cluster_gesture(ClusterGesture::LongPress, feature, context);
        }

        feature_id(feature).is_some_and(|id| self.long_press_annotation(&id, context))
    }

    fn handle_drag_begin(&self, layer_id: &str, feature: &Feature, context: &InteractionContext) -> bool {
        if self.is_cluster_layer(layer_id) {
            return false;
        }

        feature_id(feature).is_some_and(|id| self.begin_drag(&id, context))
    }

    fn handle_drag_change(&self, context: &InteractionContext) {
        self.change_drag(context)
    }

    fn handle_drag_end(&self, context: &InteractionContext) {
        self.end_drag(context)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Generates typed accessors of manager-level layer properties that annotations cannot set individually.
macro_rules! manager_layer_properties {
    ($kind:ty { $($(#[$meta:meta])* $key:literal => $getter:ident, $setter:ident: $ty:ty;)* }) => {
        impl AnnotationManager<$kind> {
            $(
                $(#[$meta])*
                pub fn $getter(&self) -> Option<$ty> {
                    self.layer_property($key)
                        .and_then(|value| serde_json::from_value(value).ok())
                }

                #[doc = concat!("Sets `", $key, "`. `None` resets it to the style default.")]
                pub fn $setter(&self, value: Option<$ty>) {
                    self.set_layer_property($key, value.and_then(|value| serde_json::to_value(value).ok()));
                }
            )*
        }
    };
}

manager_layer_properties!(PointAnnotation {
    /// Whether icons are drawn even if they collide with other symbols.
    "icon-allow-overlap" => icon_allow_overlap, set_icon_allow_overlap: bool;
    /// Whether other symbols can be drawn over the icons.
    "icon-ignore-placement" => icon_ignore_placement, set_icon_ignore_placement: bool;
    /// Whether labels are drawn even if they collide with other symbols.
    "text-allow-overlap" => text_allow_overlap, set_text_allow_overlap: bool;
    /// Whether other symbols can be drawn over the labels.
    "text-ignore-placement" => text_ignore_placement, set_text_ignore_placement: bool;
    /// Font stack of labels.
    "text-font" => text_font, set_text_font: Vec<String>;
    /// Label placement relative to its geometry.
    "symbol-placement" => symbol_placement, set_symbol_placement: String;
});

manager_layer_properties!(CircleAnnotation {
    /// Orientation of circles when the map is pitched: `map` or `viewport`.
    "circle-pitch-alignment" => circle_pitch_alignment, set_circle_pitch_alignment: String;
    /// Scaling of circles when the map is pitched: `map` or `viewport`.
    "circle-pitch-scale" => circle_pitch_scale, set_circle_pitch_scale: String;
    /// Offset of circles in screen pixels.
    "circle-translate" => circle_translate, set_circle_translate: [f64; 2];
});

manager_layer_properties!(PolylineAnnotation {
    /// Display of line ends: `butt`, `round` or `square`.
    "line-cap" => line_cap, set_line_cap: String;
    /// Used to automatically convert miter joins to bevel joins for sharp angles.
    "line-miter-limit" => line_miter_limit, set_line_miter_limit: f64;
    /// Dash pattern of lines, in line widths.
    "line-dasharray" => line_dasharray, set_line_dasharray: Vec<f64>;
    /// Offset of lines in screen pixels.
    "line-translate" => line_translate, set_line_translate: [f64; 2];
});

manager_layer_properties!(PolygonAnnotation {
    /// Whether the fill is antialiased.
    "fill-antialias" => fill_antialias, set_fill_antialias: bool;
    /// Offset of fills in screen pixels.
    "fill-translate" => fill_translate, set_fill_translate: [f64; 2];
});

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use assert_matches::assert_matches;
    use mapmark_types::latlon;

    use super::*;
    use crate::annotation::{AnnotationImage, AnyAnnotation, DEFAULT_MARKER_IMAGE_NAME};
    use crate::style::Color;
    use crate::tests::{init_logger, StyleCall, TestMap, TestQuery, TestStyle};

    struct Setup {
        style: Rc<TestStyle>,
        map: Rc<TestMap>,
        query: Rc<TestQuery>,
        display_link: Signal,
        images: AnnotationImagesManager,
    }

    impl Setup {
        fn new() -> Self {
            init_logger();
            let style = Rc::new(TestStyle::default());
            Self {
                images: AnnotationImagesManager::new(style.clone()),
                style,
                map: Rc::new(TestMap::default()),
                query: Rc::new(TestQuery::default()),
                display_link: Signal::new(),
            }
        }

        fn deps(&self) -> AnnotationManagerDeps {
            AnnotationManagerDeps {
                style: self.style.clone(),
                map: self.map.clone(),
                queryable: self.query.clone(),
                display_link: self.display_link.clone(),
                images: Some(self.images.clone()),
            }
        }

        fn manager<T: Annotation>(&self, params: AnnotationManagerParams) -> AnnotationManager<T> {
            AnnotationManager::new(params, self.deps())
        }

        fn circles(&self) -> CircleAnnotationManager {
            let manager = self.manager(AnnotationManagerParams::new("circles"));
            self.style.clear_calls();
            manager
        }

        fn tick(&self) {
            self.display_link.emit();
        }
    }

    fn circle(id: &str) -> CircleAnnotation {
        CircleAnnotation::new(id, latlon!(10.0, 20.0))
    }

    fn context() -> InteractionContext {
        InteractionContext {
            point: ScreenPoint::new(100.0, 100.0),
            coordinate: latlon!(10.0, 20.0),
        }
    }

    fn feature(id: &str) -> Feature {
        circle(id).feature()
    }

    fn ids<T: Annotation>(annotations: &[T]) -> Vec<String> {
        annotations.iter().map(|a| a.id().to_string()).collect()
    }

    fn feature_ids(features: &[Feature]) -> Vec<String> {
        features.iter().filter_map(feature_id).collect()
    }

    #[test]
    fn creates_source_and_layer() {
        let setup = Setup::new();
        let _manager: CircleAnnotationManager = setup.manager(AnnotationManagerParams::new("m"));

        let calls = setup.style.calls();
        assert_eq!(calls.len(), 2);
        assert_matches!(&calls[0], StyleCall::AddSource(source) if source.id == "m" && !source.cluster);
        assert_matches!(
            &calls[1],
            StyleCall::AddLayer(layer, LayerPosition::Default) if layer.id == "m" && layer.source == "m"
        );
    }

    #[test]
    fn main_layer_is_inserted_at_requested_position() {
        let setup = Setup::new();
        let position = LayerPosition::Below("roads".to_string());
        let _manager: PolylineAnnotationManager =
            setup.manager(AnnotationManagerParams::new("m").with_layer_position(position.clone()));

        assert_eq!(
            setup.style.count(|c| matches!(c, StyleCall::AddLayer(_, p) if *p == position)),
            1
        );
    }

    #[test]
    fn clustered_manager_adds_cluster_layers() {
        let setup = Setup::new();
        let manager: PointAnnotationManager =
            setup.manager(AnnotationManagerParams::new("m").with_cluster_options(ClusterOptions::default()));

        assert_eq!(setup.style.count(|c| matches!(c, StyleCall::AddLayer(..))), 3);
        let sources: Vec<GeoJsonSource> = setup
            .style
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                StyleCall::AddSource(source) => Some(source),
                _ => None,
            })
            .collect();
        assert_eq!(sources.len(), 1);
        assert!(sources[0].cluster);
        assert_eq!(sources[0].cluster_radius, Some(50.0));
        assert_eq!(sources[0].cluster_max_zoom, Some(14.0));
        assert_eq!(sources[0].cluster_min_points, Some(2.0));

        let layer_ids = AnnotationManagerInternal::all_layer_ids(&manager);
        assert!(layer_ids.contains(&cluster_circle_layer_id("m")));
        assert!(layer_ids.contains(&cluster_text_layer_id("m")));
    }

    #[test]
    fn existing_cluster_layers_are_not_added_again() {
        let setup = Setup::new();
        setup.style.insert_layer(&cluster_circle_layer_id("m"));
        let _manager: PointAnnotationManager =
            setup.manager(AnnotationManagerParams::new("m").with_cluster_options(ClusterOptions::default()));

        assert_eq!(setup.style.count(|c| matches!(c, StyleCall::AddLayer(..))), 2);
    }

    #[test]
    fn many_clustered_points_are_sent_in_one_call() {
        let setup = Setup::new();
        let manager: PointAnnotationManager =
            setup.manager(AnnotationManagerParams::new("m").with_cluster_options(ClusterOptions::default()));
        let points = (0..501)
            .map(|i| PointAnnotation::new(format!("p{i}"), latlon!(i as f64 / 10.0, 0.0)))
            .collect();
        manager.set_annotations(points);
        setup.tick();

        let added: Vec<usize> = setup
            .style
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                StyleCall::AddFeatures(source, features) if source == "m" => Some(features.len()),
                _ => None,
            })
            .collect();
        assert_eq!(added, vec![501]);
        assert_eq!(manager.annotations().len(), 501);
    }

    #[test]
    fn duplicate_ids_keep_first() {
        let setup = Setup::new();
        let manager = setup.circles();
        let first = circle("x").with_circle_radius(1.0);
        manager.set_annotations(vec![first.clone(), circle("y"), circle("x").with_circle_radius(2.0)]);

        let annotations = manager.annotations();
        assert_eq!(ids(&annotations), vec!["x", "y"]);
        assert_eq!(annotations[0], first);
    }

    #[test]
    fn changes_are_sent_incrementally_on_tick() {
        let setup = Setup::new();
        let manager = setup.circles();
        manager.set_annotations(vec![circle("a"), circle("b")]);
        manager.set_annotations(vec![circle("a"), circle("b"), circle("c")]);
        assert!(setup.style.calls().is_empty());

        setup.tick();
        let calls = setup.style.calls();
        assert_matches!(&calls[0], StyleCall::AddFeatures(source, features) if source == "circles" && feature_ids(features) == ["a", "b", "c"]);
        setup.style.clear_calls();

        manager.set_annotations(vec![circle("b").with_circle_radius(3.0), circle("c"), circle("d")]);
        setup.tick();
        let calls = setup.style.calls();
        assert_matches!(&calls[0], StyleCall::AddFeatures(_, features) if feature_ids(features) == ["d"]);
        assert_matches!(&calls[1], StyleCall::UpdateFeatures(_, features) if feature_ids(features) == ["b"]);
        assert_matches!(&calls[2], StyleCall::RemoveFeatures(_, ids) if ids == &["a".to_string()]);
    }

    #[test]
    fn tick_without_changes_does_nothing() {
        let setup = Setup::new();
        let manager = setup.circles();
        manager.set_annotations(vec![circle("a")]);
        setup.tick();
        setup.style.clear_calls();

        setup.tick();
        manager.set_annotations(vec![circle("a")]);
        setup.tick();
        assert!(setup.style.calls().is_empty());
    }

    #[test]
    fn data_driven_properties_fall_back_to_manager_value() {
        let setup = Setup::new();
        let manager = setup.circles();
        manager.set_layer_property("circle-color", Some(Color::BLUE.into()));
        manager.set_circle_pitch_alignment(Some("map".to_string()));
        manager.set_annotations(vec![circle("a").with_circle_color(Color::RED), circle("b").with_circle_radius(7.0)]);
        setup.tick();

        let properties = setup.style.last_layer_properties("circles").expect("properties are set");
        assert_eq!(
            properties["circle-color"],
            json!(["coalesce", ["get", "circle-color", ["get", "layerProperties"]], "rgba(0, 0, 255, 1)"])
        );
        assert_eq!(
            properties["circle-radius"],
            json!(["coalesce", ["get", "circle-radius", ["get", "layerProperties"]], 5.0])
        );
        assert_eq!(properties["circle-pitch-alignment"], json!("map"));
        assert_eq!(manager.circle_pitch_alignment().as_deref(), Some("map"));
    }

    #[test]
    fn cleared_manager_property_is_reset_to_default() {
        let setup = Setup::new();
        let manager = setup.circles();
        manager.set_layer_property("circle-pitch-alignment", Some(json!("map")));
        setup.tick();
        assert_eq!(
            setup.style.last_layer_properties("circles").expect("set")["circle-pitch-alignment"],
            json!("map")
        );

        manager.set_circle_pitch_alignment(None);
        setup.tick();
        assert_eq!(
            setup.style.last_layer_properties("circles").expect("set")["circle-pitch-alignment"],
            json!("viewport")
        );

        setup.style.clear_calls();
        manager.set_layer_properties(Map::new());
        setup.tick();
        let properties = setup.style.last_layer_properties("circles").expect("set");
        assert!(properties.is_empty());
    }

    #[test]
    fn destroy_removes_everything_once() {
        let setup = Setup::new();
        let manager: PointAnnotationManager =
            setup.manager(AnnotationManagerParams::new("m").with_cluster_options(ClusterOptions::default()));
        setup.style.clear_calls();

        manager.destroy();
        let calls = setup.style.calls();
        assert_eq!(calls.iter().filter(|c| matches!(c, StyleCall::RemoveLayer(_))).count(), 3);
        assert_eq!(calls.iter().filter(|c| matches!(c, StyleCall::RemoveSource(_))).count(), 1);
        assert!(manager.is_destroyed());
        assert_eq!(setup.display_link.subscribers_count(), 0);

        setup.style.clear_calls();
        manager.destroy();
        manager.set_annotations(vec![PointAnnotation::new("a", latlon!(0.0, 0.0))]);
        setup.tick();
        assert!(setup.style.calls().is_empty());
    }

    #[test]
    fn dropping_manager_unsubscribes_from_display_link() {
        let setup = Setup::new();
        let manager = setup.circles();
        assert_eq!(setup.display_link.subscribers_count(), 1);
        drop(manager);
        setup.tick();
        assert_eq!(setup.display_link.subscribers_count(), 0);
    }

    #[test]
    fn non_draggable_annotation_does_not_start_drag() {
        let setup = Setup::new();
        let manager = setup.circles();
        manager.set_annotations(vec![circle("a")]);

        assert!(!AnnotationManagerInternal::handle_drag_begin(&manager, "circles", &feature("a"), &context()));
        setup.tick();
        assert_eq!(setup.style.count(|c| matches!(c, StyleCall::AddSource(_))), 0);
        assert_eq!(setup.style.count(|c| matches!(c, StyleCall::AddLayer(..))), 0);
    }

    #[test]
    fn drag_begin_handler_can_veto() {
        let setup = Setup::new();
        let manager = setup.circles();
        manager.set_annotations(vec![circle("a").with_draggable(true).on_drag_begin(|_, _| false)]);

        assert!(!manager.begin_drag("a", &context()));
        setup.tick();
        assert_matches!(&setup.style.calls()[0], StyleCall::AddFeatures(_, features) if feature_ids(features) == ["a"]);
        assert_eq!(setup.style.count(|c| matches!(c, StyleCall::AddSource(_))), 0);
    }

    #[test]
    fn dragged_annotation_moves_to_drag_layer() {
        let setup = Setup::new();
        let manager = setup.circles();
        manager.set_annotations(vec![circle("a").with_draggable(true), circle("b")]);
        setup.tick();
        setup.style.clear_calls();

        assert!(manager.begin_drag("a", &context()));
        assert_eq!(ids(&manager.annotations()), vec!["b", "a"]);

        setup.tick();
        let calls = setup.style.calls();
        assert_matches!(&calls[0], StyleCall::AddSource(source) if source.id == "circles_drag");
        assert_matches!(
            &calls[1],
            StyleCall::AddLayer(layer, LayerPosition::Above(below)) if layer.id == "circles_drag" && below == "circles"
        );
        assert_matches!(&calls[2], StyleCall::RemoveFeatures(source, ids) if source == "circles" && ids == &["a".to_string()]);
        assert_matches!(&calls[3], StyleCall::UpdateSource(source, GeoJson::FeatureCollection(c)) if source == "circles_drag" && feature_ids(&c.features) == ["a"]);
        assert_eq!(
            setup.style.count(|c| matches!(c, StyleCall::SetLayerProperties(id, _) if id == "circles_drag")),
            1
        );
    }

    #[test]
    fn drag_moves_annotation_and_calls_handlers() {
        let setup = Setup::new();
        let manager = setup.circles();
        let ended = Rc::new(Cell::new(false));
        let ended_clone = ended.clone();
        manager.set_annotations(vec![circle("a")
            .with_draggable(true)
            .on_drag_change(|annotation, _| annotation.set_circle_radius(Some(42.0)))
            .on_drag_end(move |_, _| ended_clone.set(true))]);

        let start = context();
        assert!(manager.begin_drag("a", &start));

        let moved = InteractionContext {
            point: ScreenPoint::new(150.0, 120.0),
            ..start
        };
        manager.change_drag(&moved);
        manager.end_drag(&moved);

        let annotations = manager.annotations();
        let annotation = &annotations[0];
        assert_ne!(annotation.point(), start.coordinate);
        assert_eq!(annotation.circle_radius(), Some(42.0));
        assert!(ended.get());

        manager.change_drag(&start);
        assert_eq!(manager.annotations()[0].point(), annotation.point());
    }

    #[test]
    fn declarative_manager_does_not_drag() {
        let setup = Setup::new();
        let manager = setup.circles();
        manager.set_annotations(vec![circle("a").with_draggable(true)]);
        manager.set_declarative(true);

        assert!(!manager.begin_drag("a", &context()));
    }

    #[test]
    fn replacing_collection_clears_drag_source() {
        let setup = Setup::new();
        let manager = setup.circles();
        manager.set_annotations(vec![circle("a").with_draggable(true)]);
        assert!(manager.begin_drag("a", &context()));
        setup.tick();
        setup.style.clear_calls();

        manager.set_annotations(vec![circle("a")]);
        setup.tick();
        assert_eq!(
            setup.style.count(
                |c| matches!(c, StyleCall::UpdateSource(id, GeoJson::FeatureCollection(c)) if id == "circles_drag" && c.features.is_empty())
            ),
            1
        );
        assert_eq!(ids(&manager.annotations()), vec!["a"]);
    }

    #[derive(Default)]
    struct RecordingDelegate {
        tapped: RefCell<Vec<(String, Vec<AnyAnnotation>)>>,
    }

    impl AnnotationInteractionDelegate for RecordingDelegate {
        fn did_detect_tapped_annotations(&self, manager_id: &str, annotations: &[AnyAnnotation]) {
            self.tapped
                .borrow_mut()
                .push((manager_id.to_string(), annotations.to_vec()));
        }
    }

    #[test]
    fn tap_toggles_selection_and_notifies_delegate() {
        let setup = Setup::new();
        let manager = setup.circles();
        let delegate = Rc::new(RecordingDelegate::default());
        let as_dyn: Rc<dyn AnnotationInteractionDelegate> = delegate.clone();
        manager.set_interaction_delegate(Some(Rc::downgrade(&as_dyn)));
        manager.set_annotations(vec![circle("a").on_tap(|_| true), circle("b")]);

        assert!(AnnotationManagerInternal::handle_tap(&manager, "circles", &feature("a"), &context()));
        assert!(manager.annotations()[0].is_selected());
        assert!(!manager.tap_annotation("b", &context()));
        assert!(!manager.tap_annotation("unknown", &context()));

        let tapped = delegate.tapped.borrow();
        assert_eq!(tapped.len(), 2);
        assert_eq!(tapped[0].0, "circles");
        assert_eq!(tapped[0].1[0].id(), "a");
        assert!(tapped[0].1[0].is_selected());
    }

    #[test]
    fn declarative_tap_does_not_write_back() {
        let setup = Setup::new();
        let manager = setup.circles();
        manager.set_keyed_annotations([("k", circle("a").on_tap(|_| true))]);

        assert!(manager.tap_annotation("a", &context()));
        assert!(!manager.annotations()[0].is_selected());
    }

    #[test]
    fn long_press_calls_handler_of_first_match() {
        let setup = Setup::new();
        let manager = setup.circles();
        manager.set_annotations(vec![circle("a").on_long_press(|_| true), circle("b")]);

        assert!(AnnotationManagerInternal::handle_long_press(&manager, "circles", &feature("a"), &context()));
        assert!(!AnnotationManagerInternal::handle_long_press(&manager, "circles", &feature("b"), &context()));
    }

    #[test]
    fn keyed_annotations_keep_their_ids() {
        let setup = Setup::new();
        let manager = setup.circles();
        manager.set_keyed_annotations([
            ("first", CircleAnnotation::at(latlon!(1.0, 1.0)).with_draggable(true).with_selected(true)),
            ("second", CircleAnnotation::at(latlon!(2.0, 2.0))),
        ]);
        let initial = manager.annotations();
        assert!(manager.is_declarative());
        assert!(!initial[0].is_draggable());
        assert!(!initial[0].is_selected());
        setup.tick();
        setup.style.clear_calls();

        manager.set_keyed_annotations([("first", CircleAnnotation::at(latlon!(1.5, 1.0)))]);
        let updated = manager.annotations();
        assert_eq!(updated[0].id(), initial[0].id());

        setup.tick();
        let calls = setup.style.calls();
        assert_matches!(&calls[0], StyleCall::UpdateFeatures(_, features) if feature_ids(features) == [initial[0].id()]);
        assert_matches!(&calls[1], StyleCall::RemoveFeatures(_, ids) if ids == &[initial[1].id().to_string()]);

        manager.set_keyed_annotations([("second", CircleAnnotation::new("fresh", latlon!(2.0, 2.0)))]);
        assert_eq!(ids(&manager.annotations()), vec!["fresh"]);
    }

    #[test]
    fn cluster_tap_reports_expansion_zoom() {
        let setup = Setup::new();
        setup.query.set_expansion_zoom(Ok(7.0));
        let manager: PointAnnotationManager =
            setup.manager(AnnotationManagerParams::new("m").with_cluster_options(ClusterOptions::default()));
        let cluster_layer = cluster_circle_layer_id("m");

        assert!(!AnnotationManagerInternal::handle_tap(&manager, &cluster_layer, &feature("c"), &context()));

        let reported = Rc::new(RefCell::new(None));
        let reported_clone = reported.clone();
        manager.on_cluster_tap(move |ctx| *reported_clone.borrow_mut() = Some(ctx.clone()));
        assert!(AnnotationManagerInternal::handle_tap(&manager, &cluster_layer, &feature("c"), &context()));

        let reported = reported.borrow();
        let reported = reported.as_ref().expect("handler called");
        assert_eq!(reported.expansion_zoom, 7.0);
        assert_eq!(reported.point, context().point);
        assert_eq!(setup.query.expansion_queries(), vec!["m".to_string()]);
    }

    #[test]
    fn cluster_query_after_destroy_is_ignored() {
        let setup = Setup::new();
        setup.query.set_deferred(true);
        let manager: PointAnnotationManager =
            setup.manager(AnnotationManagerParams::new("m").with_cluster_options(ClusterOptions::default()));
        let called = Rc::new(Cell::new(false));
        let called_clone = called.clone();
        manager.on_cluster_long_press(move |_| called_clone.set(true));

        assert!(AnnotationManagerInternal::handle_long_press(
            &manager,
            &cluster_text_layer_id("m"),
            &feature("c"),
            &context()
        ));
        manager.destroy();
        setup.query.complete_pending(Ok(3.0));
        assert!(!called.get());
    }

    #[test]
    fn new_cluster_query_cancels_previous() {
        let setup = Setup::new();
        setup.query.set_deferred(true);
        let manager: PointAnnotationManager =
            setup.manager(AnnotationManagerParams::new("m").with_cluster_options(ClusterOptions::default()));
        manager.on_cluster_tap(|_| {});

        let layer = cluster_circle_layer_id("m");
        assert!(AnnotationManagerInternal::handle_tap(&manager, &layer, &feature("c"), &context()));
        assert!(AnnotationManagerInternal::handle_tap(&manager, &layer, &feature("c"), &context()));
        assert_eq!(setup.query.canceled_count(), 1);
    }

    #[test]
    fn point_images_are_added_and_released() {
        let setup = Setup::new();
        let manager: PointAnnotationManager = setup.manager(AnnotationManagerParams::new("points"));
        manager.set_annotations(vec![
            PointAnnotation::new("a", latlon!(0.0, 0.0)).with_image(AnnotationImage::Default),
            PointAnnotation::new("b", latlon!(1.0, 0.0)).with_image(AnnotationImage::Default),
        ]);
        setup.tick();
        assert_eq!(setup.style.count(|c| matches!(c, StyleCall::AddImage(_))), 1);
        assert!(setup.style.image_exists(DEFAULT_MARKER_IMAGE_NAME));
        assert!(setup.images.is_used(DEFAULT_MARKER_IMAGE_NAME));

        manager.set_annotations(vec![PointAnnotation::new("c", latlon!(0.0, 0.0))]);
        setup.tick();
        assert!(!setup.style.image_exists(DEFAULT_MARKER_IMAGE_NAME));
    }

    #[test]
    fn image_removed_from_style_is_added_again() {
        let setup = Setup::new();
        let manager: PointAnnotationManager = setup.manager(AnnotationManagerParams::new("points"));
        manager.set_annotations(vec![PointAnnotation::new("a", latlon!(0.0, 0.0)).with_image(AnnotationImage::Default)]);
        setup.tick();

        setup.style.remove_image(DEFAULT_MARKER_IMAGE_NAME).expect("image exists");
        manager.set_layer_property("icon-allow-overlap", Some(Value::Bool(true)));
        setup.tick();

        assert_eq!(setup.style.count(|c| matches!(c, StyleCall::AddImage(_))), 2);
        assert!(setup.style.image_exists(DEFAULT_MARKER_IMAGE_NAME));
    }

    #[test]
    fn shared_image_survives_destroy_of_one_manager() {
        let setup = Setup::new();
        let first: PointAnnotationManager = setup.manager(AnnotationManagerParams::new("first"));
        let second: PointAnnotationManager = setup.manager(AnnotationManagerParams::new("second"));
        for manager in [&first, &second] {
            manager.set_annotations(vec![PointAnnotation::new("a", latlon!(0.0, 0.0)).with_image(AnnotationImage::Default)]);
        }
        setup.tick();

        first.destroy();
        assert!(setup.style.image_exists(DEFAULT_MARKER_IMAGE_NAME));
        second.destroy();
        assert!(!setup.style.image_exists(DEFAULT_MARKER_IMAGE_NAME));
    }

    #[test]
    fn layer_can_be_moved() {
        let setup = Setup::new();
        let manager = setup.circles();
        let position = LayerPosition::At(2);
        manager.set_layer_position(Some(position.clone()));
        manager.set_layer_position(Some(position.clone()));

        assert_eq!(setup.style.calls(), vec![StyleCall::MoveLayer("circles".to_string(), position.clone())]);
        assert_eq!(manager.layer_position(), Some(position));
    }
}
