//! Moving annotation geometries by screen-space drag translations.
//!
//! A translation is converted into a shift in Mercator world coordinates at the current zoom, and the shift is then
//! applied to every vertex. Applying the same world shift to all vertices keeps the shape of the geometry intact,
//! which moving each vertex by the screen translation separately would not do far from the equator.

use mapmark_types::cartesian::Vector2;
use mapmark_types::geo::mercator::{self, MercatorCoordinate};
use mapmark_types::geo::{GeoPoint, GeoPoint2d};
use mapmark_types::geometry::{LineString, Polygon};
use std::fmt::Debug;

use crate::map::MapDelegate;

/// Geometry of an annotation.
pub trait AnnotationGeometry: Clone + PartialEq + Debug {
    /// Converts the geometry into GeoJSON.
    fn to_geojson(&self) -> geojson::Geometry;

    /// Returns the geometry moved by the screen-space `translation`. The translation is the vector from the new
    /// position of the drag pointer to the previous one.
    ///
    /// Returns `None` if the result would leave the latitude range of the projection or the geometry is empty.
    fn offset(&self, translation: &Vector2<f64>, map: &dyn MapDelegate) -> Option<Self>;
}

impl AnnotationGeometry for GeoPoint2d {
    fn to_geojson(&self) -> geojson::Geometry {
        geojson::Geometry::new(geojson::Value::from(self))
    }

    fn offset(&self, translation: &Vector2<f64>, map: &dyn MapDelegate) -> Option<Self> {
        let zoom = map.camera_state().zoom;
        let shift = world_shift(self, translation, map, zoom);
        let target = mercator::shift_point(self, shift, zoom);

        mercator::latitude_range()
            .contains(&target.lat())
            .then_some(target)
    }
}

impl AnnotationGeometry for LineString {
    fn to_geojson(&self) -> geojson::Geometry {
        geojson::Geometry::new(geojson::Value::from(self))
    }

    fn offset(&self, translation: &Vector2<f64>, map: &dyn MapDelegate) -> Option<Self> {
        let zoom = map.camera_state().zoom;
        offset_ring(self.points(), translation, map, zoom).map(LineString::new)
    }
}

impl AnnotationGeometry for Polygon {
    fn to_geojson(&self) -> geojson::Geometry {
        geojson::Geometry::new(geojson::Value::from(self))
    }

    fn offset(&self, translation: &Vector2<f64>, map: &dyn MapDelegate) -> Option<Self> {
        let zoom = map.camera_state().zoom;
        let outer_ring = offset_ring(self.outer_ring(), translation, map, zoom)?;
        let inner_rings = self
            .inner_rings()
            .iter()
            .map(|ring| offset_ring(ring, translation, map, zoom))
            .collect::<Option<Vec<_>>>()?;

        Some(Polygon::new(outer_ring, inner_rings))
    }
}

/// Moves all points by the shift of their average point.
fn offset_ring(
    points: &[GeoPoint2d],
    translation: &Vector2<f64>,
    map: &dyn MapDelegate,
    zoom: f64,
) -> Option<Vec<GeoPoint2d>> {
    let center = GeoPoint2d::average(points)?;
    let shift = world_shift(&center, translation, map, zoom);

    let shifted: Vec<GeoPoint2d> = points
        .iter()
        .map(|point| mercator::shift_point(point, shift, zoom))
        .collect();

    if !mercator::latitude_range().contains(&shifted.first()?.lat()) {
        return None;
    }

    Some(shifted)
}

fn world_shift(
    anchor: &GeoPoint2d,
    translation: &Vector2<f64>,
    map: &dyn MapDelegate,
    zoom: f64,
) -> MercatorCoordinate {
    let screen_position = map.point_for(anchor);
    let target = map.coordinate_for(&(screen_position - translation));
    mercator::coordinate_shift(anchor, &target, zoom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::CameraState;
    use crate::tests::TestMap;
    use approx::assert_abs_diff_eq;
    use mapmark_types::latlon;

    fn map_at(zoom: f64) -> TestMap {
        TestMap::new(CameraState {
            center: latlon!(0.0, 0.0),
            zoom,
            ..Default::default()
        })
    }

    #[test]
    fn point_moves_with_pointer() {
        let map = map_at(3.0);
        let point = latlon!(10.0, 20.0);
        // Pointer moved 30 points right and 40 points down.
        let translation = Vector2::new(-30.0, -40.0);

        let moved = point.offset(&translation, &map).expect("inside projection");
        let expected = map.point_for(&point) + Vector2::new(30.0, 40.0);
        let actual = map.point_for(&moved);

        assert_abs_diff_eq!(actual.x, expected.x, epsilon = 1e-6);
        assert_abs_diff_eq!(actual.y, expected.y, epsilon = 1e-6);
        assert!(moved.lat() < point.lat());
        assert!(moved.lon() > point.lon());
    }

    #[test]
    fn point_cannot_leave_latitude_range() {
        let map = map_at(0.0);
        let point = latlon!(80.0, 0.0);
        assert!(point
            .offset(&Vector2::new(0.0, 10_000.0), &map)
            .is_none());
    }

    #[test]
    fn line_keeps_its_shape() {
        let map = map_at(5.0);
        let line = LineString::new(vec![latlon!(40.0, 10.0), latlon!(45.0, 12.0), latlon!(50.0, 8.0)]);
        let translation = Vector2::new(15.0, -25.0);

        let moved = line.offset(&translation, &map).expect("inside projection");
        assert_eq!(moved.points().len(), 3);

        let original: Vec<_> = line.points().iter().map(|p| map.point_for(p)).collect();
        let shifted: Vec<_> = moved.points().iter().map(|p| map.point_for(p)).collect();
        let first_delta = shifted[0] - original[0];
        for (before, after) in original.iter().zip(&shifted) {
            let delta = after - before;
            assert_abs_diff_eq!(delta.x, first_delta.x, epsilon = 1e-6);
            assert_abs_diff_eq!(delta.y, first_delta.y, epsilon = 1e-6);
        }
        assert_abs_diff_eq!(first_delta.x, -15.0, epsilon = 1e-6);
        assert_abs_diff_eq!(first_delta.y, 25.0, epsilon = 1e-6);
    }

    #[test]
    fn empty_geometries_are_not_moved() {
        let map = map_at(1.0);
        let translation = Vector2::new(1.0, 1.0);
        assert!(LineString::default().offset(&translation, &map).is_none());
        assert!(Polygon::default().offset(&translation, &map).is_none());
        assert!(Polygon::new(vec![latlon!(1.0, 1.0)], vec![vec![]])
            .offset(&translation, &map)
            .is_none());
    }

    #[test]
    fn polygon_moves_inner_rings() {
        let map = map_at(4.0);
        let polygon = Polygon::new(
            vec![latlon!(0.0, 0.0), latlon!(0.0, 10.0), latlon!(10.0, 10.0), latlon!(10.0, 0.0)],
            vec![vec![latlon!(2.0, 2.0), latlon!(2.0, 4.0), latlon!(4.0, 4.0)]],
        );

        let moved = polygon
            .offset(&Vector2::new(-100.0, 0.0), &map)
            .expect("inside projection");
        assert_eq!(moved.inner_rings().len(), 1);
        for (before, after) in polygon.inner_rings()[0].iter().zip(&moved.inner_rings()[0]) {
            assert_abs_diff_eq!(after.lat(), before.lat(), epsilon = 1e-9);
            assert!(after.lon() > before.lon());
        }
    }
}
