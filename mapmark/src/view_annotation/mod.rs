//! View annotations: platform views positioned over the map by its placement engine.
//!
//! The map decides where (and whether) every view annotation is shown in the current frame and reports the result
//! through [`ViewAnnotationPositionsListener`](crate::map::ViewAnnotationPositionsListener). A
//! [`ViewAnnotationManager`] receives those reports and moves, shows and hides the views accordingly.
//!
//! The crate does not depend on any UI toolkit. Views are accessed through the [`PlatformView`] and
//! [`ContainerView`] traits; [`HeadlessView`] and [`HeadlessContainer`] are in-memory implementations.

mod annotation;
mod headless;
mod manager;
mod options;
mod view;

pub use annotation::{ViewAnnotation, ViewAnnotationDeps};
pub use headless::{HeadlessContainer, HeadlessView};
pub use manager::{ViewAnnotationManager, ViewAnnotationUpdateObserver};
pub use options::{
    AnnotatedFeature, ViewAnnotationAnchor, ViewAnnotationAnchorConfig, ViewAnnotationOptions,
    ViewAnnotationPositionDescriptor,
};
pub use view::{ContainerView, PlatformView, ViewId};
