use mapmark_types::geo::GeoPoint2d;

use super::{impl_annotation, layer_properties, AnnotationBase};
use crate::style::{Color, LayerType};

/// A circle at a geographic point, drawn by a circle layer. The radius is in screen points.
#[derive(Debug, Clone, PartialEq)]
pub struct CircleAnnotation {
    pub(crate) base: AnnotationBase<CircleAnnotation>,
    point: GeoPoint2d,
}

impl_annotation!(CircleAnnotation, GeoPoint2d, point, LayerType::Circle);

impl CircleAnnotation {
    /// Creates a new annotation with the given id.
    pub fn new(id: impl Into<String>, point: GeoPoint2d) -> Self {
        Self {
            base: AnnotationBase::new(id),
            point,
        }
    }

    /// Creates a new annotation with a random unique id.
    pub fn at(point: GeoPoint2d) -> Self {
        Self {
            base: AnnotationBase::with_generated_id(),
            point,
        }
    }

    /// Center of the circle.
    pub fn point(&self) -> GeoPoint2d {
        self.point
    }

    layer_properties! {
        /// Radius in screen points.
        "circle-radius" => circle_radius, set_circle_radius, with_circle_radius: f64;
        /// Fill color.
        "circle-color" => circle_color, set_circle_color, with_circle_color: Color;
        /// Fill opacity.
        "circle-opacity" => circle_opacity, set_circle_opacity, with_circle_opacity: f64;
        /// Amount of blur applied to the circle.
        "circle-blur" => circle_blur, set_circle_blur, with_circle_blur: f64;
        /// Width of the stroke in screen points.
        "circle-stroke-width" => circle_stroke_width, set_circle_stroke_width, with_circle_stroke_width: f64;
        /// Color of the stroke.
        "circle-stroke-color" => circle_stroke_color, set_circle_stroke_color, with_circle_stroke_color: Color;
        /// Sort key: features with a higher key are drawn above features with a lower one.
        "circle-sort-key" => circle_sort_key, set_circle_sort_key, with_circle_sort_key: f64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::Annotation;
    use mapmark_types::latlon;

    #[test]
    fn content_changes_break_equality_handlers_do_not() {
        let a = CircleAnnotation::new("c", latlon!(1.0, 1.0)).with_circle_radius(4.0);
        let with_handler = a.clone().on_tap(|_| true);
        assert_eq!(a, with_handler);
        assert!(with_handler.handlers().handles_tap());

        let mut moved = a.clone();
        moved.set_geometry(latlon!(2.0, 1.0));
        assert_ne!(a, moved);

        let mut restyled = a.clone();
        restyled.set_circle_radius(None);
        assert_ne!(a, restyled);
        assert_eq!(restyled.circle_radius(), None);
    }
}
