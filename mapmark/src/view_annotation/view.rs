use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use mapmark_types::cartesian::{Rect, Size};

/// Identity of a platform view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(u64);

impl ViewId {
    /// Returns a new id, distinct from all ids returned before.
    pub fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A view of the UI toolkit that can be shown as a view annotation.
///
/// All methods take `&self`: views are shared between the toolkit and the annotation code, so implementations
/// use interior mutability.
pub trait PlatformView {
    /// Identity of the view.
    fn view_id(&self) -> ViewId;
    /// Frame of the view in the coordinates of its superview.
    fn frame(&self) -> Rect;
    /// Moves and resizes the view.
    fn set_frame(&self, frame: Rect);
    /// Whether the view is hidden.
    fn is_hidden(&self) -> bool;
    /// Hides or shows the view.
    fn set_hidden(&self, hidden: bool);
    /// Id of the container the view is currently in.
    fn superview(&self) -> Option<ViewId>;
    /// Called by a container when the view is added to it or removed from it.
    fn set_superview(&self, superview: Option<Weak<dyn ContainerView>>);
    /// Removes the view from its container, if any.
    fn remove_from_superview(&self);
    /// Size the view wants to have when at most `available` space is given.
    fn size_that_fits(&self, available: Size) -> Size;
}

/// A view that hosts view annotations.
pub trait ContainerView {
    /// Identity of the container.
    fn view_id(&self) -> ViewId;
    /// Bounds of the container. Annotations are measured against its size.
    fn bounds(&self) -> Rect;
    /// Adds the view on top of other subviews, removing it from its previous container first.
    fn add_subview(&self, view: Rc<dyn PlatformView>);
    /// Removes the subview with the given id. Called by the view itself from
    /// [`PlatformView::remove_from_superview`].
    fn remove_subview(&self, view_id: ViewId);
    /// Ids of the subviews, bottom to top.
    fn subview_ids(&self) -> Vec<ViewId>;
}
