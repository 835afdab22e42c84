//! Primitive types shared by the `mapmark` crates.
//!
//! * [`geo`] - points in geographic coordinates and the spherical Mercator projection used to move them
//!   around by screen-space offsets.
//! * [`cartesian`] - screen-space points, sizes and rectangles (frames of annotation views).
//! * [`geometry`] - geometries annotations are bound to: points, line strings and polygons.

pub mod cartesian;
pub mod error;
pub mod geo;
pub mod geometry;

pub use cartesian::{Rect, ScreenPoint, Size, Vector2};
pub use error::MapmarkTypesError;
pub use geo::{GeoPoint, GeoPoint2d, NewGeoPoint};
pub use geometry::{Geometry, LineString, Polygon};
