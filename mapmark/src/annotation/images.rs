use std::cell::RefCell;
use std::rc::Rc;

use ahash::{HashMap, HashMapExt, HashSet, HashSetExt};

use crate::style::{StyleDelegate, StyleImage};

struct ImagesState {
    style: Rc<dyn StyleDelegate>,
    added_by_self: HashSet<String>,
    consumers: HashMap<String, HashSet<String>>,
}

/// Shared registry of style images used by annotations.
///
/// Several managers can show the same image (the default marker, for example). An image added through this
/// registry is removed from the style only when no registered consumer reports using it anymore. Images that were
/// already in the style, added by someone else, are never removed.
///
/// Consumers are identified by string ids (annotation managers use their own id). Cloning gives another handle to
/// the same registry.
#[derive(Clone)]
pub struct AnnotationImagesManager {
    state: Rc<RefCell<ImagesState>>,
}

impl AnnotationImagesManager {
    /// Creates a registry for the given style.
    pub fn new(style: Rc<dyn StyleDelegate>) -> Self {
        Self {
            state: Rc::new(RefCell::new(ImagesState {
                style,
                added_by_self: HashSet::new(),
                consumers: HashMap::new(),
            })),
        }
    }

    /// Adds an image to the style unless an image with this id is already there.
    pub fn add_image(&self, id: &str, image: &StyleImage) {
        let mut state = self.state.borrow_mut();
        if state.style.image_exists(id) {
            return;
        }

        match state.style.add_image(id, image) {
            Ok(()) => {
                state.added_by_self.insert(id.to_string());
            }
            Err(err) => log::warn!("Failed to add annotation image {id}: {err}"),
        }
    }

    /// Removes the image if it was added through this registry, no consumer uses it, and it is still in the style.
    /// Otherwise does nothing.
    pub fn remove_image(&self, id: &str) {
        let mut state = self.state.borrow_mut();
        if !state.added_by_self.contains(id) {
            return;
        }

        if state.consumers.values().any(|images| images.contains(id)) {
            return;
        }

        state.added_by_self.remove(id);
        if !state.style.image_exists(id) {
            return;
        }

        if let Err(err) = state.style.remove_image(id) {
            log::warn!("Failed to remove annotation image {id}: {err}");
        }
    }

    /// Registers a consumer with no images in use.
    pub fn register_consumer(&self, consumer_id: &str) {
        self.state
            .borrow_mut()
            .consumers
            .entry(consumer_id.to_string())
            .or_default();
    }

    /// Forgets the consumer and the images it used. The images themselves are not removed.
    pub fn unregister_consumer(&self, consumer_id: &str) {
        self.state.borrow_mut().consumers.remove(consumer_id);
    }

    /// Replaces the set of image ids the consumer uses. Unregistered consumers are registered.
    pub fn update_consumer_images(&self, consumer_id: &str, image_ids: HashSet<String>) {
        self.state
            .borrow_mut()
            .consumers
            .insert(consumer_id.to_string(), image_ids);
    }

    /// Returns true if the image was added through this registry and has not been removed since.
    pub fn is_added_by_self(&self, id: &str) -> bool {
        self.state.borrow().added_by_self.contains(id)
    }

    /// Returns true if any registered consumer uses the image.
    pub fn is_used(&self, id: &str) -> bool {
        self.state
            .borrow()
            .consumers
            .values()
            .any(|images| images.contains(id))
    }
}

impl std::fmt::Debug for AnnotationImagesManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("AnnotationImagesManager")
            .field("added_by_self", &state.added_by_self)
            .field("consumers", &state.consumers)
            .finish()
    }
}
