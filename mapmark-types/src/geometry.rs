//! Geometries annotations are bound to.

use crate::geo::{GeoPoint, GeoPoint2d};
use serde::{Deserialize, Serialize};

/// Sequence of connected points.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineString {
    points: Vec<GeoPoint2d>,
}

impl LineString {
    /// Creates a new line string.
    pub fn new(points: Vec<GeoPoint2d>) -> Self {
        Self { points }
    }

    /// Points of the line.
    pub fn points(&self) -> &[GeoPoint2d] {
        &self.points
    }

    /// Returns true if the line has no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl From<Vec<GeoPoint2d>> for LineString {
    fn from(points: Vec<GeoPoint2d>) -> Self {
        Self::new(points)
    }
}

/// Polygon with an outer ring and optional holes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    outer_ring: Vec<GeoPoint2d>,
    inner_rings: Vec<Vec<GeoPoint2d>>,
}

impl Polygon {
    /// Creates a new polygon.
    pub fn new(outer_ring: Vec<GeoPoint2d>, inner_rings: Vec<Vec<GeoPoint2d>>) -> Self {
        Self {
            outer_ring,
            inner_rings,
        }
    }

    /// Outer ring.
    pub fn outer_ring(&self) -> &[GeoPoint2d] {
        &self.outer_ring
    }

    /// Holes.
    pub fn inner_rings(&self) -> &[Vec<GeoPoint2d>] {
        &self.inner_rings
    }
}

/// Any geometry an annotation can be bound to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Geometry {
    /// Single point.
    Point(GeoPoint2d),
    /// Line string.
    LineString(LineString),
    /// Polygon.
    Polygon(Polygon),
}

impl From<GeoPoint2d> for Geometry {
    fn from(value: GeoPoint2d) -> Self {
        Self::Point(value)
    }
}

impl From<LineString> for Geometry {
    fn from(value: LineString) -> Self {
        Self::LineString(value)
    }
}

impl From<Polygon> for Geometry {
    fn from(value: Polygon) -> Self {
        Self::Polygon(value)
    }
}

#[cfg(feature = "geojson")]
mod geojson_impl {
    use super::*;
    use crate::error::MapmarkTypesError;
    use crate::geo::NewGeoPoint;
    use geojson::{Position, Value};

    fn position(point: &GeoPoint2d) -> Position {
        vec![point.lon(), point.lat()]
    }

    fn point(position: &Position) -> Result<GeoPoint2d, MapmarkTypesError> {
        if position.len() < 2 {
            return Err(MapmarkTypesError::Conversion(
                "point must contain at least 2 dimensions".to_string(),
            ));
        }

        Ok(GeoPoint2d::latlon(position[1], position[0]))
    }

    fn points(positions: &[Position]) -> Result<Vec<GeoPoint2d>, MapmarkTypesError> {
        positions.iter().map(point).collect()
    }

    impl From<&GeoPoint2d> for Value {
        fn from(value: &GeoPoint2d) -> Self {
            Value::Point(position(value))
        }
    }

    impl From<&LineString> for Value {
        fn from(value: &LineString) -> Self {
            Value::LineString(value.points.iter().map(position).collect())
        }
    }

    impl From<&Polygon> for Value {
        fn from(value: &Polygon) -> Self {
            let rings = std::iter::once(&value.outer_ring)
                .chain(value.inner_rings.iter())
                .map(|ring| ring.iter().map(position).collect())
                .collect();
            Value::Polygon(rings)
        }
    }

    impl From<&Geometry> for geojson::Geometry {
        fn from(value: &Geometry) -> Self {
            let value = match value {
                Geometry::Point(p) => Value::from(p),
                Geometry::LineString(l) => Value::from(l),
                Geometry::Polygon(p) => Value::from(p),
            };
            geojson::Geometry::new(value)
        }
    }

    impl TryFrom<&geojson::Geometry> for Geometry {
        type Error = MapmarkTypesError;

        fn try_from(value: &geojson::Geometry) -> Result<Self, Self::Error> {
            match &value.value {
                Value::Point(p) => Ok(Geometry::Point(point(p)?)),
                Value::LineString(l) => Ok(Geometry::LineString(LineString::new(points(l)?))),
                Value::Polygon(rings) => {
                    let Some((outer, inner)) = rings.split_first() else {
                        return Err(MapmarkTypesError::Conversion(
                            "polygon must have an outer ring".to_string(),
                        ));
                    };
                    Ok(Geometry::Polygon(Polygon::new(
                        points(outer)?,
                        inner
                            .iter()
                            .map(|ring| points(ring))
                            .collect::<Result<_, _>>()?,
                    )))
                }
                other => Err(MapmarkTypesError::Conversion(format!(
                    "unsupported geometry type: {}",
                    other.type_name()
                ))),
            }
        }
    }
}
