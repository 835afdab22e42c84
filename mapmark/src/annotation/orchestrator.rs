use std::cell::RefCell;
use std::panic::Location;
use std::rc::Rc;

use ahash::{HashMap, HashMapExt};
use geojson::Feature;
use mapmark_types::cartesian::Rect;

use super::images::AnnotationImagesManager;
use super::manager::{AnnotationManager, AnnotationManagerDeps, AnnotationManagerParams};
use super::{
    Annotation, CircleAnnotation, PointAnnotation, PolygonAnnotation, PolylineAnnotation, SharedManager,
};
use crate::map::{FeatureQueryDelegate, InteractionContext, MapDelegate};
use crate::signal::{Cancelable, Signal};
use crate::style::StyleDelegate;

/// Half size of the square around a tap point that is searched for annotations, in screen points.
const TAP_TOLERANCE: f64 = 5.0;

struct OrchestratorState {
    deps: AnnotationManagerDeps,
    managers_by_id: HashMap<String, SharedManager>,
    managers_by_layer_id: HashMap<String, SharedManager>,
    dragged_manager: Option<SharedManager>,
    query_token: Option<Cancelable>,
}

impl OrchestratorState {
    fn rebuild_layer_index(&mut self) {
        self.managers_by_layer_id.clear();
        for manager in self.managers_by_id.values() {
            for layer_id in manager.all_layer_ids() {
                self.managers_by_layer_id.insert(layer_id, manager.clone());
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Gesture {
    Tap,
    LongPress,
}

/// Registry of annotation managers of a map.
///
/// Guarantees at most one live manager per id, and routes gestures on rendered features to the manager that owns
/// the layer they were rendered by. All managers share one [`AnnotationImagesManager`].
#[derive(Clone)]
pub struct AnnotationOrchestrator {
    state: Rc<RefCell<OrchestratorState>>,
}

impl AnnotationOrchestrator {
    /// Creates an empty registry. Managers created by it use the given collaborators.
    pub fn new(
        style: Rc<dyn StyleDelegate>,
        map: Rc<dyn MapDelegate>,
        queryable: Rc<dyn FeatureQueryDelegate>,
        display_link: Signal,
    ) -> Self {
        let images = AnnotationImagesManager::new(style.clone());
        Self {
            state: Rc::new(RefCell::new(OrchestratorState {
                deps: AnnotationManagerDeps {
                    style,
                    map,
                    queryable,
                    display_link,
                    images: Some(images),
                },
                managers_by_id: HashMap::new(),
                managers_by_layer_id: HashMap::new(),
                dragged_manager: None,
                query_token: None,
            })),
        }
    }

    /// Image registry shared by the managers.
    pub fn images(&self) -> Option<AnnotationImagesManager> {
        self.state.borrow().deps.images.clone()
    }

    /// Creates a point annotation manager. A manager with the same id is destroyed first.
    #[track_caller]
    pub fn make_point_annotation_manager(
        &self,
        params: AnnotationManagerParams,
    ) -> AnnotationManager<PointAnnotation> {
        self.make_manager(params)
    }

    /// Creates a circle annotation manager. A manager with the same id is destroyed first. Clustering is not
    /// supported for circles.
    #[track_caller]
    pub fn make_circle_annotation_manager(
        &self,
        params: AnnotationManagerParams,
    ) -> AnnotationManager<CircleAnnotation> {
        self.make_manager(without_clustering(params))
    }

    /// Creates a polygon annotation manager. A manager with the same id is destroyed first. Clustering is not
    /// supported for polygons.
    #[track_caller]
    pub fn make_polygon_annotation_manager(
        &self,
        params: AnnotationManagerParams,
    ) -> AnnotationManager<PolygonAnnotation> {
        self.make_manager(without_clustering(params))
    }

    /// Creates a polyline annotation manager. A manager with the same id is destroyed first. Clustering is not
    /// supported for polylines.
    #[track_caller]
    pub fn make_polyline_annotation_manager(
        &self,
        params: AnnotationManagerParams,
    ) -> AnnotationManager<PolylineAnnotation> {
        self.make_manager(without_clustering(params))
    }

    #[track_caller]
    fn make_manager<T: Annotation>(&self, params: AnnotationManagerParams) -> AnnotationManager<T> {
        let caller = Location::caller();
        let previous = self.state.borrow_mut().managers_by_id.remove(&params.id);
        if let Some(previous) = previous {
            log::warn!(
                "Annotation manager with id {} is replaced by a new one created at {caller}, the previous manager is \
                 destroyed",
                params.id
            );
            previous.destroy();
        }

        let id = params.id.clone();
        let deps = self.state.borrow().deps.clone();
        let manager = AnnotationManager::<T>::new(params, deps);

        let mut state = self.state.borrow_mut();
        state.managers_by_id.insert(id, Rc::new(manager.clone()));
        state.rebuild_layer_index();

        manager
    }

    /// Destroys and forgets the manager with the given id. Unknown ids are ignored.
    pub fn remove_annotation_manager(&self, id: &str) {
        let removed = {
            let mut state = self.state.borrow_mut();
            let removed = state.managers_by_id.remove(id);
            if removed.is_some() {
                state.rebuild_layer_index();
            }
            removed
        };

        if let Some(manager) = removed {
            manager.destroy();
        }
    }

    /// Manager with the given id, as a trait object.
    pub fn annotation_manager_by_id(&self, id: &str) -> Option<SharedManager> {
        self.state.borrow().managers_by_id.get(id).cloned()
    }

    /// Manager with the given id, if it manages annotations of kind `T`.
    pub fn annotation_manager<T: Annotation>(&self, id: &str) -> Option<AnnotationManager<T>> {
        self.annotation_manager_by_id(id)?
            .as_any()
            .downcast_ref::<AnnotationManager<T>>()
            .cloned()
    }

    /// Ids of all live managers, in no particular order.
    pub fn annotation_manager_ids(&self) -> Vec<String> {
        self.state.borrow().managers_by_id.keys().cloned().collect()
    }

    /// Id of the manager owning the layer.
    pub fn manager_id_for_layer(&self, layer_id: &str) -> Option<String> {
        self.manager_for_layer(layer_id).map(|manager| manager.id())
    }

    fn manager_for_layer(&self, layer_id: &str) -> Option<SharedManager> {
        self.state.borrow().managers_by_layer_id.get(layer_id).cloned()
    }

    /// Routes a tap on a feature rendered by the given layer. Returns true if the owning manager consumed it.
    pub fn handle_tap(&self, layer_id: &str, feature: &Feature, context: &InteractionContext) -> bool {
        self.manager_for_layer(layer_id)
            .is_some_and(|manager| manager.handle_tap(layer_id, feature, context))
    }

    /// Routes a long press on a feature rendered by the given layer.
    pub fn handle_long_press(&self, layer_id: &str, feature: &Feature, context: &InteractionContext) -> bool {
        self.manager_for_layer(layer_id)
            .is_some_and(|manager| manager.handle_long_press(layer_id, feature, context))
    }

    /// Starts dragging a feature rendered by the given layer. Subsequent drag events go to the same manager.
    pub fn handle_drag_begin(&self, layer_id: &str, feature: &Feature, context: &InteractionContext) -> bool {
        let Some(manager) = self.manager_for_layer(layer_id) else {
            return false;
        };

        if !manager.handle_drag_begin(layer_id, feature, context) {
            return false;
        }

        self.state.borrow_mut().dragged_manager = Some(manager);
        true
    }

    /// Moves the feature being dragged.
    pub fn handle_drag_change(&self, context: &InteractionContext) {
        let manager = self.state.borrow().dragged_manager.clone();
        if let Some(manager) = manager {
            manager.handle_drag_change(context);
        }
    }

    /// Finishes the current drag.
    pub fn handle_drag_end(&self, context: &InteractionContext) {
        let manager = self.state.borrow_mut().dragged_manager.take();
        if let Some(manager) = manager {
            manager.handle_drag_end(context);
        }
    }

    /// Finds annotations rendered around the screen point and delivers the tap to them, topmost first, until one
    /// of them consumes it. A new query cancels the previous one.
    pub fn handle_tap_at(&self, context: &InteractionContext) {
        self.query_gesture_at(Gesture::Tap, context);
    }

    /// Same as [`Self::handle_tap_at`] for long presses.
    pub fn handle_long_press_at(&self, context: &InteractionContext) {
        self.query_gesture_at(Gesture::LongPress, context);
    }

    fn query_gesture_at(&self, gesture: Gesture, context: &InteractionContext) {
        let (queryable, mut layer_ids) = {
            let state = self.state.borrow();
            let layer_ids: Vec<String> = state.managers_by_layer_id.keys().cloned().collect();
            (state.deps.queryable.clone(), layer_ids)
        };
        if layer_ids.is_empty() {
            return;
        }
        layer_ids.sort();

        let rect = Rect::new(
            context.point.x - TAP_TOLERANCE,
            context.point.y - TAP_TOLERANCE,
            context.point.x + TAP_TOLERANCE,
            context.point.y + TAP_TOLERANCE,
        );

        let weak = Rc::downgrade(&self.state);
        let context = *context;
        let token = queryable.query_rendered_features(
            &rect,
            &layer_ids,
            Box::new(move |result| {
                let Some(state) = weak.upgrade() else {
                    return;
                };
                let features = match result {
                    Ok(features) => features,
                    Err(err) => {
                        log::debug!("Rendered features query for {gesture:?} failed: {err}");
                        return;
                    }
                };

                let orchestrator = AnnotationOrchestrator { state };
                for queried in features {
                    let handled = match gesture {
                        Gesture::Tap => orchestrator.handle_tap(&queried.layer_id, &queried.feature, &context),
                        Gesture::LongPress => {
                            orchestrator.handle_long_press(&queried.layer_id, &queried.feature, &context)
                        }
                    };
                    if handled {
                        break;
                    }
                }
            }),
        );

        let _previous = std::mem::replace(&mut self.state.borrow_mut().query_token, Some(token));
    }
}

impl std::fmt::Debug for AnnotationOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("AnnotationOrchestrator")
            .field("managers", &state.managers_by_id.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn without_clustering(mut params: AnnotationManagerParams) -> AnnotationManagerParams {
    if params.cluster_options.take().is_some() {
        log::warn!(
            "Clustering is supported by point annotation managers only, options of manager {} are ignored",
            params.id
        );
    }
    params
}
