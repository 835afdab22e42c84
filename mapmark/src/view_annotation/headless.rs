//! In-memory views, for running view annotations without a UI toolkit (in tests or on a server that renders
//! snapshots).

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use mapmark_types::cartesian::{Rect, Size};

use super::view::{ContainerView, PlatformView, ViewId};

/// A view with a fixed content size.
#[derive(Debug)]
pub struct HeadlessView {
    id: ViewId,
    frame: Cell<Rect>,
    hidden: Cell<bool>,
    content_size: Cell<Size>,
    last_available_size: Cell<Option<Size>>,
    superview: RefCell<Option<Weak<dyn ContainerView>>>,
}

impl HeadlessView {
    /// Creates a visible view that wants to be `content_size` big.
    pub fn new(content_size: Size) -> Self {
        Self {
            id: ViewId::next(),
            frame: Cell::new(Rect::default()),
            hidden: Cell::new(false),
            content_size: Cell::new(content_size),
            last_available_size: Cell::new(None),
            superview: RefCell::new(None),
        }
    }

    /// Changes the size the view wants to have.
    pub fn set_content_size(&self, size: Size) {
        self.content_size.set(size);
    }

    /// Available size given in the last [`PlatformView::size_that_fits`] call.
    pub fn last_available_size(&self) -> Option<Size> {
        self.last_available_size.get()
    }
}

impl PlatformView for HeadlessView {
    fn view_id(&self) -> ViewId {
        self.id
    }

    fn frame(&self) -> Rect {
        self.frame.get()
    }

    fn set_frame(&self, frame: Rect) {
        self.frame.set(frame);
    }

    fn is_hidden(&self) -> bool {
        self.hidden.get()
    }

    fn set_hidden(&self, hidden: bool) {
        self.hidden.set(hidden);
    }

    fn superview(&self) -> Option<ViewId> {
        self.superview
            .borrow()
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|superview| superview.view_id())
    }

    fn set_superview(&self, superview: Option<Weak<dyn ContainerView>>) {
        *self.superview.borrow_mut() = superview;
    }

    fn remove_from_superview(&self) {
        let superview = self.superview.borrow_mut().take();
        if let Some(superview) = superview.and_then(|superview| superview.upgrade()) {
            superview.remove_subview(self.id);
        }
    }

    fn size_that_fits(&self, available: Size) -> Size {
        self.last_available_size.set(Some(available));
        self.content_size.get()
    }
}

/// A container keeping its subviews in a list.
pub struct HeadlessContainer {
    id: ViewId,
    bounds: Cell<Rect>,
    subviews: RefCell<Vec<Rc<dyn PlatformView>>>,
    me: Weak<HeadlessContainer>,
}

impl HeadlessContainer {
    /// Creates an empty container.
    pub fn new(bounds: Rect) -> Rc<Self> {
        Rc::new_cyclic(|me| Self {
            id: ViewId::next(),
            bounds: Cell::new(bounds),
            subviews: RefCell::new(vec![]),
            me: me.clone(),
        })
    }

    /// Resizes the container.
    pub fn set_bounds(&self, bounds: Rect) {
        self.bounds.set(bounds);
    }

    /// Number of subviews.
    pub fn subviews_count(&self) -> usize {
        self.subviews.borrow().len()
    }
}

impl ContainerView for HeadlessContainer {
    fn view_id(&self) -> ViewId {
        self.id
    }

    fn bounds(&self) -> Rect {
        self.bounds.get()
    }

    fn add_subview(&self, view: Rc<dyn PlatformView>) {
        view.remove_from_superview();
        self.subviews.borrow_mut().push(view.clone());

        let me: Weak<dyn ContainerView> = self.me.clone();
        view.set_superview(Some(me));
    }

    fn remove_subview(&self, view_id: ViewId) {
        self.subviews
            .borrow_mut()
            .retain(|view| view.view_id() != view_id);
    }

    fn subview_ids(&self) -> Vec<ViewId> {
        self.subviews.borrow().iter().map(|view| view.view_id()).collect()
    }
}

impl std::fmt::Debug for HeadlessContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeadlessContainer")
            .field("id", &self.id)
            .field("bounds", &self.bounds.get())
            .field("subviews", &self.subview_ids())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adding_to_another_container_moves_the_view() {
        let first = HeadlessContainer::new(Rect::new(0.0, 0.0, 100.0, 100.0));
        let second = HeadlessContainer::new(Rect::new(0.0, 0.0, 100.0, 100.0));
        let view = Rc::new(HeadlessView::new(Size::new(10.0, 10.0)));

        first.add_subview(view.clone());
        assert_eq!(view.superview(), Some(first.view_id()));

        second.add_subview(view.clone());
        assert_eq!(view.superview(), Some(second.view_id()));
        assert_eq!(first.subviews_count(), 0);
        assert_eq!(second.subview_ids(), vec![view.view_id()]);

        view.remove_from_superview();
        assert_eq!(view.superview(), None);
        assert_eq!(second.subviews_count(), 0);
    }

    #[test]
    fn size_that_fits_records_available_size() {
        let view = HeadlessView::new(Size::new(20.0, 30.0));
        assert_eq!(view.size_that_fits(Size::new(100.0, 200.0)), Size::new(20.0, 30.0));
        assert_eq!(view.last_available_size(), Some(Size::new(100.0, 200.0)));
    }
}
