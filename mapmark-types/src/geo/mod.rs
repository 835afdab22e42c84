//! Geometries in geographic coordinates (latitude and longitude) (see [`GeoPoint`]) and the spherical Mercator
//! projection (see [`mercator`]).

mod datum;
pub mod mercator;
mod point;

pub use datum::Datum;
pub use mercator::MercatorCoordinate;
pub use point::{GeoPoint, GeoPoint2d, NewGeoPoint};
