use std::cell::RefCell;
use std::rc::{Rc, Weak};

use ahash::{HashMap, HashMapExt, HashSet, HashSetExt};

use super::annotation::{ViewAnnotation, ViewAnnotationDeps};
use super::options::{ViewAnnotationOptions, ViewAnnotationPositionDescriptor};
use super::view::{ContainerView, PlatformView, ViewId};
use crate::error::ViewAnnotationError;
use crate::map::{MapDelegate, ViewAnnotationPositionsListener};
use crate::signal::Signal;

/// Receives changes made to views added with [`ViewAnnotationManager::add_view`] during placement.
pub trait ViewAnnotationUpdateObserver {
    /// Frames of the views were changed.
    fn frames_did_change(&self, views: &[Rc<dyn PlatformView>]);
    /// The views were shown or hidden.
    fn visibility_did_change(&self, views: &[Rc<dyn PlatformView>]);
}

struct ManagerState {
    container: Rc<dyn ContainerView>,
    map: Rc<dyn MapDelegate>,
    display_link: Signal,
    views_by_id: HashMap<String, Rc<dyn PlatformView>>,
    ids_by_view: HashMap<ViewId, String>,
    views_by_feature_id: HashMap<String, Rc<dyn PlatformView>>,
    expected_hidden: HashMap<ViewId, bool>,
    annotations_by_id: HashMap<String, ViewAnnotation>,
    observers: Vec<Rc<dyn ViewAnnotationUpdateObserver>>,
    validates_views: bool,
}

impl ManagerState {
    /// Puts the view back to the state the manager left it in, if something else changed it.
    fn validate(&self, view: &Rc<dyn PlatformView>) {
        if !self.validates_views {
            return;
        }

        if view.superview() != Some(self.container.view_id()) {
            log::warn!(
                "Superview of annotation view {:?} was changed outside of the manager, use remove_view() instead",
                view.view_id()
            );
            self.container.add_subview(view.clone());
        }

        if let Some(&expected) = self.expected_hidden.get(&view.view_id()) {
            if view.is_hidden() != expected {
                log::warn!(
                    "Visibility of annotation view {:?} was changed outside of the manager, set `visible` option \
                     instead",
                    view.view_id()
                );
                view.set_hidden(expected);
            }
        }
    }

    fn forget(&mut self, id: &str, view_id: ViewId) {
        self.views_by_id.remove(id);
        self.ids_by_view.remove(&view_id);
        self.expected_hidden.remove(&view_id);
        self.views_by_feature_id
            .retain(|_, view| view.view_id() != view_id);
    }
}

struct PositionsListener {
    state: Weak<RefCell<ManagerState>>,
}

impl ViewAnnotationPositionsListener for PositionsListener {
    fn on_positions_update(&self, positions: &[ViewAnnotationPositionDescriptor]) {
        if let Some(state) = self.state.upgrade() {
            place_annotations(&state, positions);
        }
    }
}

/// Keeps platform views placed over the map.
///
/// Views can be added in two ways:
/// * [`ViewAnnotation`] objects added with [`add_annotation`](Self::add_annotation) manage their options and
///   placement themselves;
/// * raw views added with [`add_view`](Self::add_view) are placed by the manager, which also reports frame and
///   visibility changes to [`ViewAnnotationUpdateObserver`]s.
///
/// The manager listens to the positions computed by the map from creation until it is dropped.
pub struct ViewAnnotationManager {
    state: Rc<RefCell<ManagerState>>,
}

impl ViewAnnotationManager {
    /// Creates a manager that adds views to the `container` and starts listening for placements of the `map`.
    pub fn new(container: Rc<dyn ContainerView>, map: Rc<dyn MapDelegate>, display_link: Signal) -> Self {
        let state = Rc::new(RefCell::new(ManagerState {
            container,
            map: map.clone(),
            display_link,
            views_by_id: HashMap::new(),
            ids_by_view: HashMap::new(),
            views_by_feature_id: HashMap::new(),
            expected_hidden: HashMap::new(),
            annotations_by_id: HashMap::new(),
            observers: vec![],
            validates_views: true,
        }));

        map.set_view_annotation_positions_listener(Some(Rc::new(PositionsListener {
            state: Rc::downgrade(&state),
        })));

        Self { state }
    }

    /// Whether the manager restores views changed by someone else before placing them. Enabled by default.
    pub fn validates_views(&self) -> bool {
        self.state.borrow().validates_views
    }

    /// Enables or disables restoring of views changed by someone else.
    pub fn set_validates_views(&self, validates: bool) {
        let annotations: Vec<_> = {
            let mut state = self.state.borrow_mut();
            state.validates_views = validates;
            state.annotations_by_id.values().cloned().collect()
        };

        for annotation in annotations {
            annotation.set_validates_view(validates);
        }
    }

    /// Binds the annotation to the container of the manager.
    pub fn add_annotation(&self, annotation: &ViewAnnotation) -> Result<(), ViewAnnotationError> {
        let id = annotation.id();
        let (deps, validates) = {
            let state = self.state.borrow();
            if state.views_by_id.contains_key(&id) {
                return Err(ViewAnnotationError::ViewIsAlreadyAdded);
            }

            let weak = Rc::downgrade(&self.state);
            let removed_id = id.clone();
            let deps = ViewAnnotationDeps {
                map: state.map.clone(),
                superview: state.container.clone(),
                display_link: state.display_link.clone(),
                on_remove: Some(Rc::new(move || {
                    if let Some(state) = weak.upgrade() {
                        state.borrow_mut().annotations_by_id.remove(&removed_id);
                    }
                })),
            };
            (deps, state.validates_views)
        };

        annotation.set_validates_view(validates);
        annotation.bind(deps)?;
        self.state
            .borrow_mut()
            .annotations_by_id
            .insert(id, annotation.clone());

        Ok(())
    }

    /// Annotations added with [`add_annotation`](Self::add_annotation) and not removed yet.
    pub fn annotations(&self) -> Vec<ViewAnnotation> {
        self.state
            .borrow()
            .annotations_by_id
            .values()
            .cloned()
            .collect()
    }

    /// Adds the view as an annotation with the given options and returns its id.
    ///
    /// If `id` is `None`, a random one is generated. Missing width and height are taken from the current frame of
    /// the view.
    pub fn add_view(
        &self,
        view: Rc<dyn PlatformView>,
        id: Option<&str>,
        options: ViewAnnotationOptions,
    ) -> Result<String, ViewAnnotationError> {
        let mut state = self.state.borrow_mut();
        let id_in_use = id.is_some_and(|id| {
            state.views_by_id.contains_key(id) || state.annotations_by_id.contains_key(id)
        });
        if id_in_use || state.ids_by_view.contains_key(&view.view_id()) {
            return Err(ViewAnnotationError::ViewIsAlreadyAdded);
        }

        if options.annotated_feature.is_none() {
            return Err(ViewAnnotationError::GeometryFieldMissing);
        }

        let feature_id = options.associated_feature_id().map(str::to_string);
        if let Some(feature_id) = &feature_id {
            if state.views_by_feature_id.contains_key(feature_id) {
                return Err(ViewAnnotationError::AssociatedFeatureIdIsAlreadyInUse);
            }
        }

        let mut options = options;
        let frame = view.frame();
        options.width.get_or_insert(frame.width());
        options.height.get_or_insert(frame.height());

        let id = id.map_or_else(|| uuid::Uuid::new_v4().to_string(), str::to_string);
        state.map.add_view_annotation(&id, &options)?;

        let view_id = view.view_id();
        state.views_by_id.insert(id.clone(), view.clone());
        state.ids_by_view.insert(view_id, id.clone());
        state
            .expected_hidden
            .insert(view_id, !options.visible.unwrap_or(true));
        if let Some(feature_id) = feature_id {
            state.views_by_feature_id.insert(feature_id, view.clone());
        }

        state.container.add_subview(view);

        Ok(id)
    }

    /// Removes the view added with [`add_view`](Self::add_view). Does nothing if the view is unknown.
    pub fn remove_view(&self, view: &dyn PlatformView) {
        let mut state = self.state.borrow_mut();
        let view_id = view.view_id();
        let Some(id) = state.ids_by_view.get(&view_id).cloned() else {
            return;
        };

        if let Err(err) = state.map.remove_view_annotation(&id) {
            log::warn!("Failed to remove view annotation {id}: {err}");
        }

        view.remove_from_superview();
        state.forget(&id, view_id);
    }

    /// Removes all views and annotations.
    pub fn remove_all(&self) {
        let annotations = {
            let mut state = self.state.borrow_mut();
            let views: Vec<_> = state.views_by_id.drain().collect();
            for (id, view) in views {
                if let Err(err) = state.map.remove_view_annotation(&id) {
                    log::warn!("Failed to remove view annotation {id}: {err}");
                }
                view.remove_from_superview();
            }

            state.ids_by_view.clear();
            state.views_by_feature_id.clear();
            state.expected_hidden.clear();

            state.annotations_by_id.values().cloned().collect::<Vec<_>>()
        };

        for annotation in annotations {
            annotation.remove();
        }
    }

    /// Updates options of the view added with [`add_view`](Self::add_view). Only the options that are set are
    /// changed.
    pub fn update_view(
        &self,
        view: &dyn PlatformView,
        options: ViewAnnotationOptions,
    ) -> Result<(), ViewAnnotationError> {
        let mut state = self.state.borrow_mut();
        let view_id = view.view_id();
        let Some(id) = state.ids_by_view.get(&view_id).cloned() else {
            return Err(ViewAnnotationError::AnnotationNotFound);
        };

        let feature_id = options.associated_feature_id().map(str::to_string);
        if let Some(feature_id) = &feature_id {
            let used_by_other = state
                .views_by_feature_id
                .get(feature_id)
                .is_some_and(|other| other.view_id() != view_id);
            if used_by_other {
                return Err(ViewAnnotationError::AssociatedFeatureIdIsAlreadyInUse);
            }
        }

        state.map.update_view_annotation(&id, &options)?;

        if let Some(visible) = options.visible {
            view.set_hidden(!visible);
            state.expected_hidden.insert(view_id, !visible);
        }

        if let Some(feature_id) = feature_id {
            state
                .views_by_feature_id
                .retain(|_, other| other.view_id() != view_id);
            if let Some(view) = state.views_by_id.get(&id).cloned() {
                state.views_by_feature_id.insert(feature_id, view);
            }
        }

        Ok(())
    }

    /// View added with the given id.
    pub fn view_for_id(&self, id: &str) -> Option<Rc<dyn PlatformView>> {
        self.state.borrow().views_by_id.get(id).cloned()
    }

    /// View associated with the feature.
    pub fn view_for_feature_id(&self, feature_id: &str) -> Option<Rc<dyn PlatformView>> {
        self.state
            .borrow()
            .views_by_feature_id
            .get(feature_id)
            .cloned()
    }

    /// Options of the view associated with the feature, as known to the map.
    pub fn options_for_feature_id(&self, feature_id: &str) -> Option<ViewAnnotationOptions> {
        let view = self.view_for_feature_id(feature_id)?;
        self.options_for_view(&*view)
    }

    /// Options of the view, as known to the map.
    pub fn options_for_view(&self, view: &dyn PlatformView) -> Option<ViewAnnotationOptions> {
        let state = self.state.borrow();
        let id = state.ids_by_view.get(&view.view_id())?;
        match state.map.view_annotation_options(id) {
            Ok(options) => Some(options),
            Err(err) => {
                log::warn!("Failed to get options of view annotation {id}: {err}");
                None
            }
        }
    }

    /// Adds an observer of placement changes.
    pub fn add_update_observer(&self, observer: Rc<dyn ViewAnnotationUpdateObserver>) {
        self.state.borrow_mut().observers.push(observer);
    }

    /// Removes the observer previously added with [`add_update_observer`](Self::add_update_observer).
    pub fn remove_update_observer(&self, observer: &Rc<dyn ViewAnnotationUpdateObserver>) {
        self.state
            .borrow_mut()
            .observers
            .retain(|existing| !Rc::ptr_eq(existing, observer));
    }
}

impl Drop for ViewAnnotationManager {
    fn drop(&mut self) {
        if let Ok(state) = self.state.try_borrow() {
            state.map.set_view_annotation_positions_listener(None);
        }
    }
}

impl std::fmt::Debug for ViewAnnotationManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("ViewAnnotationManager")
            .field("views", &state.views_by_id.len())
            .field("annotations", &state.annotations_by_id.len())
            .field("validates_views", &state.validates_views)
            .finish()
    }
}

fn place_annotations(state: &RefCell<ManagerState>, positions: &[ViewAnnotationPositionDescriptor]) {
    let Ok(mut state) = state.try_borrow_mut() else {
        log::debug!("View annotation placement during a manager call is skipped");
        return;
    };

    let mut placed_ids = HashSet::with_capacity(positions.len());
    let mut placed_annotations = vec![];
    let mut frames_changed: Vec<Rc<dyn PlatformView>> = vec![];
    let mut visibility_changed: Vec<Rc<dyn PlatformView>> = vec![];

    for position in positions {
        if let Some(annotation) = state.annotations_by_id.get(&position.identifier) {
            placed_annotations.push((annotation.clone(), position));
            placed_ids.insert(position.identifier.as_str());
            continue;
        }

        let Some(view) = state.views_by_id.get(&position.identifier).cloned() else {
            log::debug!("Placement of unknown view annotation {} is ignored", position.identifier);
            continue;
        };

        state.validate(&view);

        if view.frame() != position.frame {
            view.set_frame(position.frame);
            frames_changed.push(view.clone());
        }

        if view.is_hidden() {
            visibility_changed.push(view.clone());
        }

        view.set_hidden(false);
        state.expected_hidden.insert(view.view_id(), false);
        placed_ids.insert(position.identifier.as_str());
    }

    let unplaced_views: Vec<_> = state
        .views_by_id
        .iter()
        .filter(|(id, _)| !placed_ids.contains(id.as_str()))
        .map(|(_, view)| view.clone())
        .collect();

    for view in unplaced_views {
        state.validate(&view);
        if !view.is_hidden() {
            visibility_changed.push(view.clone());
        }

        view.set_hidden(true);
        state.expected_hidden.insert(view.view_id(), true);
    }

    let unplaced_annotations: Vec<_> = state
        .annotations_by_id
        .iter()
        .filter(|(id, _)| !placed_ids.contains(id.as_str()))
        .map(|(_, annotation)| annotation.clone())
        .collect();

    let observers = state.observers.clone();
    drop(state);

    for (annotation, position) in placed_annotations {
        annotation.place(position);
    }

    for annotation in unplaced_annotations {
        annotation.hide();
    }

    if !frames_changed.is_empty() {
        for observer in &observers {
            observer.frames_did_change(&frames_changed);
        }
    }

    if !visibility_changed.is_empty() {
        for observer in &observers {
            observer.visibility_did_change(&visibility_changed);
        }
    }
}
