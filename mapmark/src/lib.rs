//! Mapmark keeps annotations drawn on top of a native map renderer in sync with the application state.
//!
//! The renderer itself (the style registry, the camera, the placement engine and feature queries) is provided by
//! the host through a few traits: [`StyleDelegate`](style::StyleDelegate), [`MapDelegate`](map::MapDelegate) and
//! [`FeatureQueryDelegate`](map::FeatureQueryDelegate). On every rendered frame the host emits the display link
//! [`Signal`], and the components of this crate push their accumulated changes to the renderer.
//!
//! # Main components
//!
//! * [`AnnotationManager`](annotation::AnnotationManager) owns a collection of style-backed annotations of one
//!   kind (points, circles, polylines or polygons), mirrors them into a GeoJSON source and a layer, and handles
//!   taps, long presses and drags on them. Point managers can cluster their annotations.
//! * [`AnnotationOrchestrator`](annotation::AnnotationOrchestrator) is the registry of managers of one map. It
//!   creates and removes them, shares the images used by point annotations between them, and routes gestures to
//!   the manager owning the layer the gesture hit.
//! * [`ViewAnnotation`](view_annotation::ViewAnnotation) and
//!   [`ViewAnnotationManager`](view_annotation::ViewAnnotationManager) place platform views over the map at the
//!   positions computed by the placement engine.
//!
//! ```
//! use mapmark::annotation::{Annotation, CircleAnnotation};
//! use mapmark::style::Color;
//! use mapmark_types::latlon;
//!
//! let circle = CircleAnnotation::new("home", latlon!(52.37, 4.89))
//!     .with_circle_radius(8.0)
//!     .with_circle_color(Color::rgba(255, 0, 0, 255));
//!
//! assert_eq!(circle.id(), "home");
//! assert_eq!(circle.circle_radius(), Some(8.0));
//! ```
//!
//! All the components are single-threaded: they are handles to shared state and must be used from the thread
//! that renders the map.

#![warn(clippy::unwrap_used)]
#![warn(missing_docs)]

pub mod annotation;
pub mod error;
pub mod map;
mod signal;
pub mod style;
mod sync_flag;
pub mod view_annotation;

#[cfg(test)]
pub(crate) mod tests;

pub use signal::{Cancelable, Signal};

// Reexport mapmark_types
pub use mapmark_types;
