//! Spherical Mercator projection into "world" coordinates at a given zoom level.
//!
//! A world at zoom `z` is a square of `512 * 2^z` points. The top left corner of the square is `(-180, 85.05...)`
//! and the bottom right corner is `(180, -85.05...)`, so the `y` axis points down, as on a screen.

use crate::geo::point::{GeoPoint, GeoPoint2d, NewGeoPoint};
use serde::{Deserialize, Serialize};
use std::ops::{Add, RangeInclusive, Sub};

/// Maximum latitude that can be represented in the projection.
pub const LATITUDE_MAX: f64 = 85.051128779806604;
/// Minimum latitude that can be represented in the projection.
pub const LATITUDE_MIN: f64 = -85.051128779806604;
/// Size of the world at zoom 0 in screen points.
pub const TILE_SIZE: f64 = 512.0;

/// Valid latitude range of the projection.
pub fn latitude_range() -> RangeInclusive<f64> {
    LATITUDE_MIN..=LATITUDE_MAX
}

/// Size of the world in screen points at the given zoom level.
pub fn world_size(zoom: f64) -> f64 {
    TILE_SIZE * zoom.exp2()
}

/// Point in world coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MercatorCoordinate {
    /// Horizontal position, grows to the east.
    pub x: f64,
    /// Vertical position, grows to the south.
    pub y: f64,
}

impl MercatorCoordinate {
    /// Creates a new coordinate.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl Add for MercatorCoordinate {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for MercatorCoordinate {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Projects the point into world coordinates at the given zoom level. Latitude is clamped into
/// [`latitude_range`].
pub fn project(point: &impl GeoPoint<Num = f64>, zoom: f64) -> MercatorCoordinate {
    project_lat_lon(point.lat().clamp(LATITUDE_MIN, LATITUDE_MAX), point.lon(), zoom)
}

fn project_lat_lon(lat: f64, lon: f64, zoom: f64) -> MercatorCoordinate {
    let size = world_size(zoom);

    let x = (180.0 + lon) / 360.0 * size;
    let y = (180.0
        - 180.0 / std::f64::consts::PI
            * (std::f64::consts::FRAC_PI_4 + lat.to_radians() / 2.0)
                .tan()
                .ln())
        / 360.0
        * size;

    MercatorCoordinate::new(x, y)
}

/// Inverse of [`project`].
pub fn unproject(coordinate: MercatorCoordinate, zoom: f64) -> GeoPoint2d {
    let size = world_size(zoom);

    let lon = coordinate.x * 360.0 / size - 180.0;
    let y = 180.0 - coordinate.y * 360.0 / size;
    let lat = 360.0 / std::f64::consts::PI * (y.to_radians()).exp().atan() - 90.0;

    GeoPoint2d::latlon(lat, lon)
}

/// Difference between two points in world coordinates.
///
/// Unlike [`project`], latitudes are not clamped, so a shift towards a pole is not truncated at the edge of the
/// projection. Check the result of [`shift_point`] against [`latitude_range`] instead.
pub fn coordinate_shift(start: &GeoPoint2d, end: &GeoPoint2d, zoom: f64) -> MercatorCoordinate {
    project_lat_lon(end.lat(), end.lon(), zoom) - project_lat_lon(start.lat(), start.lon(), zoom)
}

/// Moves the point by the given shift in world coordinates.
pub fn shift_point(point: &GeoPoint2d, shift: MercatorCoordinate, zoom: f64) -> GeoPoint2d {
    unproject(project_lat_lon(point.lat(), point.lon(), zoom) + shift, zoom)
}
