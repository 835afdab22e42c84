use std::cell::RefCell;
use std::rc::Rc;

use mapmark_types::cartesian::Rect;
use mapmark_types::geo::GeoPoint2d;

use super::options::{
    AnnotatedFeature, ViewAnnotationAnchorConfig, ViewAnnotationOptions, ViewAnnotationPositionDescriptor,
};
use super::view::{ContainerView, PlatformView};
use crate::error::ViewAnnotationError;
use crate::map::MapDelegate;
use crate::signal::{Cancelable, Signal};
use crate::sync_flag::DirtyFlag;

/// Collaborators a view annotation is bound to.
#[derive(Clone)]
pub struct ViewAnnotationDeps {
    /// Positioning engine of the map.
    pub map: Rc<dyn MapDelegate>,
    /// Container the view is added to.
    pub superview: Rc<dyn ContainerView>,
    /// Emitted before every frame. Pending option changes are pushed to the map on each emission.
    pub display_link: Signal,
    /// Called after the annotation is removed.
    pub on_remove: Option<Rc<dyn Fn()>>,
}

struct Binding {
    map: Rc<dyn MapDelegate>,
    superview: Rc<dyn ContainerView>,
    on_remove: Option<Rc<dyn Fn()>>,
    _display_link_token: Cancelable,
}

#[derive(Default, Clone)]
struct Callbacks {
    on_frame_changed: Option<Rc<dyn Fn(Rect)>>,
    on_anchor_changed: Option<Rc<dyn Fn(&ViewAnnotationAnchorConfig)>>,
    on_anchor_coordinate_changed: Option<Rc<dyn Fn(GeoPoint2d)>>,
    on_visibility_changed: Option<Rc<dyn Fn(bool)>>,
}

struct ViewAnnotationState {
    id: String,
    view: Rc<dyn PlatformView>,
    options: ViewAnnotationOptions,
    pending: ViewAnnotationOptions,
    needs_size_update: DirtyFlag,
    binding: Option<Binding>,
    anchor_config: Option<ViewAnnotationAnchorConfig>,
    anchor_coordinate: Option<GeoPoint2d>,
    callbacks: Callbacks,
    expected_hidden: bool,
    validates_view: bool,
}

impl ViewAnnotationState {
    /// Puts the view back to the container and the visibility the annotation left it in.
    fn validate(&self) {
        if !self.validates_view {
            return;
        }
        let Some(binding) = &self.binding else {
            return;
        };

        if self.view.superview() != Some(binding.superview.view_id()) {
            log::warn!(
                "Superview of view annotation {} was changed outside of the annotation, use remove() instead",
                self.id
            );
            binding.superview.add_subview(self.view.clone());
        }

        if self.view.is_hidden() != self.expected_hidden {
            log::warn!(
                "Visibility of view annotation {} was changed outside of the annotation, use set_visible() instead",
                self.id
            );
            self.view.set_hidden(self.expected_hidden);
        }
    }
}

/// A platform view shown on the map at a geographic feature.
///
/// The annotation is created unbound and hidden. [`ViewAnnotation::bind`] adds the view to a container and
/// registers the annotation in the positioning engine of the map; from then on the map places the view on every
/// frame by calling [`ViewAnnotation::place`]. Property changes of a bound annotation are batched and sent to the
/// map as one update on the next display link emission.
///
/// The annotation is a handle: clones refer to the same annotation.
#[derive(Clone)]
pub struct ViewAnnotation {
    state: Rc<RefCell<ViewAnnotationState>>,
}

macro_rules! option_properties {
    ($($(#[$meta:meta])* $field:ident, $setter:ident: $ty:ty = $default:expr;)*) => {
        $(
            $(#[$meta])*
            pub fn $field(&self) -> $ty {
                self.state.borrow().options.$field.clone().unwrap_or($default)
            }

            #[doc = concat!("Changes [`Self::", stringify!($field), "`].")]
            pub fn $setter(&self, value: $ty) {
                self.update_option(|options| &mut options.$field, value);
            }
        )*
    };
}

impl ViewAnnotation {
    /// Creates an unbound annotation of the view attached to the feature. The view is hidden until placed.
    pub fn new(annotated_feature: impl Into<AnnotatedFeature>, view: Rc<dyn PlatformView>) -> Self {
        view.set_hidden(true);
        Self {
            state: Rc::new(RefCell::new(ViewAnnotationState {
                id: uuid::Uuid::new_v4().to_string(),
                view,
                options: ViewAnnotationOptions::new(annotated_feature),
                pending: ViewAnnotationOptions::default(),
                needs_size_update: DirtyFlag::clean(),
                binding: None,
                anchor_config: None,
                anchor_coordinate: None,
                callbacks: Callbacks::default(),
                expected_hidden: true,
                validates_view: true,
            })),
        }
    }

    /// Unique id of the annotation in the positioning engine.
    pub fn id(&self) -> String {
        self.state.borrow().id.clone()
    }

    /// The annotated view.
    pub fn view(&self) -> Rc<dyn PlatformView> {
        self.state.borrow().view.clone()
    }

    /// Current options, including the ones not yet sent to the map.
    pub fn options(&self) -> ViewAnnotationOptions {
        self.state.borrow().options.clone()
    }

    /// Whether the annotation is bound.
    pub fn is_bound(&self) -> bool {
        self.state.borrow().binding.is_some()
    }

    /// Anchor chosen by the map in the last placement.
    pub fn anchor_config(&self) -> Option<ViewAnnotationAnchorConfig> {
        self.state.borrow().anchor_config
    }

    /// Geographic point the annotation was anchored to in the last placement.
    pub fn anchor_coordinate(&self) -> Option<GeoPoint2d> {
        self.state.borrow().anchor_coordinate
    }

    /// Whether placement puts the view back to its container and visibility if they were changed from outside.
    pub fn validates_view(&self) -> bool {
        self.state.borrow().validates_view
    }

    /// Changes [`Self::validates_view`]. Enabled by default.
    pub fn set_validates_view(&self, validates: bool) {
        self.state.borrow_mut().validates_view = validates;
    }

    /// What the annotation is attached to.
    pub fn annotated_feature(&self) -> Option<AnnotatedFeature> {
        self.state.borrow().options.annotated_feature.clone()
    }

    /// Attaches the annotation to another feature.
    pub fn set_annotated_feature(&self, feature: impl Into<AnnotatedFeature>) {
        self.update_option(|options| &mut options.annotated_feature, feature.into());
    }

    option_properties! {
        /// Whether the annotation is shown even if it collides with other annotations.
        allow_overlap, set_allow_overlap: bool = false;
        /// Whether the annotation can be shown over the location puck.
        allow_overlap_with_puck, set_allow_overlap_with_puck: bool = false;
        /// Whether the annotation is placed at the elevation of the terrain.
        allow_z_elevate, set_allow_z_elevate: bool = false;
        /// Whether the annotation is shown.
        visible, set_visible: bool = true;
        /// Selected annotations are placed above the others.
        selected, set_selected: bool = false;
        /// Annotations with higher priority are placed first.
        priority, set_priority: i64 = 0;
        /// Anchors the map can choose from, in order of preference.
        variable_anchors, set_variable_anchors: Vec<ViewAnnotationAnchorConfig> = vec![];
        /// Whether the annotation is shown when it is outside of the camera padding.
        ignore_camera_padding, set_ignore_camera_padding: bool = false;
        /// Minimum zoom level at which the annotation is shown.
        min_zoom, set_min_zoom: f64 = 0.0;
        /// Maximum zoom level at which the annotation is shown.
        max_zoom, set_max_zoom: f64 = 22.0;
    }

    fn update_option<V: Clone + PartialEq>(
        &self,
        field: impl Fn(&mut ViewAnnotationOptions) -> &mut Option<V>,
        value: V,
    ) {
        let mut state = self.state.borrow_mut();
        if field(&mut state.options).as_ref() == Some(&value) {
            return;
        }

        *field(&mut state.options) = Some(value.clone());
        if state.binding.is_some() {
            *field(&mut state.pending) = Some(value);
        }
    }

    /// Measures the view again on the next display link emission and sends the new size to the map.
    pub fn set_needs_update_size(&self) {
        self.state.borrow_mut().needs_size_update.mark();
    }

    /// Sets the handler called when the frame of the view changes.
    pub fn on_frame_changed(&self, handler: impl Fn(Rect) + 'static) {
        self.state.borrow_mut().callbacks.on_frame_changed = Some(Rc::new(handler));
    }

    /// Sets the handler called when the map chooses another anchor.
    pub fn on_anchor_changed(&self, handler: impl Fn(&ViewAnnotationAnchorConfig) + 'static) {
        self.state.borrow_mut().callbacks.on_anchor_changed = Some(Rc::new(handler));
    }

    /// Sets the handler called when the annotation is anchored to another geographic point.
    pub fn on_anchor_coordinate_changed(&self, handler: impl Fn(GeoPoint2d) + 'static) {
        self.state.borrow_mut().callbacks.on_anchor_coordinate_changed = Some(Rc::new(handler));
    }

    /// Sets the handler called when the view is shown (`true`) or hidden (`false`) by placement.
    pub fn on_visibility_changed(&self, handler: impl Fn(bool) + 'static) {
        self.state.borrow_mut().callbacks.on_visibility_changed = Some(Rc::new(handler));
    }

    /// Adds the view to the container and registers the annotation in the map.
    ///
    /// The view is measured against the bounds of the container. Binding an annotation that is already bound is
    /// an error; a removed annotation can be bound again.
    pub fn bind(&self, deps: ViewAnnotationDeps) -> Result<(), ViewAnnotationError> {
        let mut state = self.state.borrow_mut();
        if state.binding.is_some() {
            return Err(ViewAnnotationError::AlreadyBound);
        }

        let view = state.view.clone();
        view.set_hidden(true);
        state.expected_hidden = true;
        deps.superview.add_subview(view.clone());

        let size = view.size_that_fits(deps.superview.bounds().size()).ceil();
        state.options.width = Some(size.width());
        state.options.height = Some(size.height());

        if let Err(err) = deps.map.add_view_annotation(&state.id, &state.options) {
            view.remove_from_superview();
            return Err(err.into());
        }

        let weak = Rc::downgrade(&self.state);
        let token = deps.display_link.observe(move || {
            if let Some(state) = weak.upgrade() {
                sync_pending(&state);
            }
        });

        state.pending = ViewAnnotationOptions::default();
        state.needs_size_update = DirtyFlag::clean();
        state.binding = Some(Binding {
            map: deps.map,
            superview: deps.superview,
            on_remove: deps.on_remove,
            _display_link_token: token,
        });

        Ok(())
    }

    /// Removes the view from its container and the annotation from the map. Does nothing if the annotation is not
    /// bound.
    pub fn remove(&self) {
        let (binding, view, id) = {
            let mut state = self.state.borrow_mut();
            let Some(binding) = state.binding.take() else {
                return;
            };
            state.pending = ViewAnnotationOptions::default();
            state.anchor_config = None;
            state.anchor_coordinate = None;
            state.expected_hidden = true;
            (binding, state.view.clone(), state.id.clone())
        };

        view.remove_from_superview();
        view.set_hidden(true);

        if let Err(err) = binding.map.remove_view_annotation(&id) {
            log::warn!("Failed to remove view annotation {id}: {err}");
        }

        if let Some(on_remove) = &binding.on_remove {
            on_remove();
        }
    }

    /// Applies placement computed by the map: moves the view, shows it, and reports the changes to the handlers.
    pub fn place(&self, descriptor: &ViewAnnotationPositionDescriptor) {
        let mut frame_changed = None;
        let mut became_visible = false;
        let mut anchor_changed = None;
        let mut coordinate_changed = None;

        let callbacks = {
            let mut state = self.state.borrow_mut();
            if state.binding.is_none() {
                log::debug!("Placement of unbound view annotation {} is ignored", state.id);
                return;
            }

            state.validate();

            let view = state.view.clone();
            if view.frame() != descriptor.frame {
                view.set_frame(descriptor.frame);
                frame_changed = Some(descriptor.frame);
            }

            view.set_hidden(false);
            if state.expected_hidden {
                state.expected_hidden = false;
                became_visible = true;
            }

            if state.anchor_config != Some(descriptor.anchor_config) {
                state.anchor_config = Some(descriptor.anchor_config);
                anchor_changed = Some(descriptor.anchor_config);
            }

            if state.anchor_coordinate != Some(descriptor.anchor_coordinate) {
                state.anchor_coordinate = Some(descriptor.anchor_coordinate);
                coordinate_changed = Some(descriptor.anchor_coordinate);
            }

            state.callbacks.clone()
        };

        if let (Some(frame), Some(handler)) = (frame_changed, &callbacks.on_frame_changed) {
            handler(frame);
        }
        if let (Some(anchor), Some(handler)) = (anchor_changed, &callbacks.on_anchor_changed) {
            handler(&anchor);
        }
        if let (Some(coordinate), Some(handler)) = (coordinate_changed, &callbacks.on_anchor_coordinate_changed) {
            handler(coordinate);
        }
        if let (true, Some(handler)) = (became_visible, &callbacks.on_visibility_changed) {
            handler(true);
        }
    }

    /// Hides the view because the map did not place it in the current frame.
    pub(crate) fn hide(&self) {
        let callback = {
            let mut state = self.state.borrow_mut();
            if state.binding.is_none() {
                return;
            }

            state.validate();
            state.view.set_hidden(true);
            if state.expected_hidden {
                return;
            }

            state.expected_hidden = true;
            state.callbacks.on_visibility_changed.clone()
        };

        if let Some(handler) = callback {
            handler(false);
        }
    }
}

fn sync_pending(state: &RefCell<ViewAnnotationState>) {
    let Ok(mut guard) = state.try_borrow_mut() else {
        return;
    };
    let state = &mut *guard;
    let Some(binding) = &state.binding else {
        return;
    };

    if state.needs_size_update.take() {
        let size = state.view.size_that_fits(binding.superview.bounds().size()).ceil();
        state.options.width = Some(size.width());
        state.options.height = Some(size.height());
        state.pending.width = Some(size.width());
        state.pending.height = Some(size.height());
    }

    if state.pending.is_empty() {
        return;
    }

    let pending = std::mem::take(&mut state.pending);
    log::debug!("Updating view annotation {}", state.id);
    if let Err(err) = binding.map.update_view_annotation(&state.id, &pending) {
        log::warn!("Failed to update view annotation {}: {err}", state.id);
    }
}

impl std::fmt::Debug for ViewAnnotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("ViewAnnotation")
            .field("id", &state.id)
            .field("options", &state.options)
            .field("is_bound", &state.binding.is_some())
            .finish()
    }
}
