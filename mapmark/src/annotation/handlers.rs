use std::fmt::{Debug, Formatter};
use std::rc::Rc;

use crate::map::InteractionContext;

/// Handler of a tap or long press. Returns true if the gesture is consumed.
pub type GestureHandler = Rc<dyn Fn(&InteractionContext) -> bool>;
/// Handler of a drag start. Can modify the annotation, returns false to veto the drag.
pub type DragBeginHandler<T> = Rc<dyn Fn(&mut T, &InteractionContext) -> bool>;
/// Handler of drag movement or drag end. Can modify the annotation.
pub type DragHandler<T> = Rc<dyn Fn(&mut T, &InteractionContext)>;

/// Interaction handlers of a single annotation.
///
/// Handlers do not take part in comparison: two annotations that differ only in handlers are equal, so replacing a
/// handler does not cause the feature to be re-sent to the style.
pub struct GestureHandlers<T> {
    pub(crate) tap: Option<GestureHandler>,
    pub(crate) long_press: Option<GestureHandler>,
    pub(crate) drag_begin: Option<DragBeginHandler<T>>,
    pub(crate) drag_change: Option<DragHandler<T>>,
    pub(crate) drag_end: Option<DragHandler<T>>,
}

impl<T> GestureHandlers<T> {
    /// Returns true if a tap handler is set.
    pub fn handles_tap(&self) -> bool {
        self.tap.is_some()
    }

    /// Returns true if a long press handler is set.
    pub fn handles_long_press(&self) -> bool {
        self.long_press.is_some()
    }
}

impl<T> Default for GestureHandlers<T> {
    fn default() -> Self {
        Self {
            tap: None,
            long_press: None,
            drag_begin: None,
            drag_change: None,
            drag_end: None,
        }
    }
}

impl<T> Clone for GestureHandlers<T> {
    fn clone(&self) -> Self {
        Self {
            tap: self.tap.clone(),
            long_press: self.long_press.clone(),
            drag_begin: self.drag_begin.clone(),
            drag_change: self.drag_change.clone(),
            drag_end: self.drag_end.clone(),
        }
    }
}

impl<T> PartialEq for GestureHandlers<T> {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl<T> Debug for GestureHandlers<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GestureHandlers")
            .field("tap", &self.tap.is_some())
            .field("long_press", &self.long_press.is_some())
            .field("drag_begin", &self.drag_begin.is_some())
            .field("drag_change", &self.drag_change.is_some())
            .field("drag_end", &self.drag_end.is_some())
            .finish()
    }
}
