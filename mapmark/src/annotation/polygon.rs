use mapmark_types::geometry::Polygon;

use super::{impl_annotation, layer_properties, AnnotationBase};
use crate::style::{Color, LayerType};

/// A filled polygon, drawn by a fill layer.
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonAnnotation {
    pub(crate) base: AnnotationBase<PolygonAnnotation>,
    polygon: Polygon,
}

impl_annotation!(PolygonAnnotation, Polygon, polygon, LayerType::Fill);

impl PolygonAnnotation {
    /// Creates a new annotation with the given id.
    pub fn new(id: impl Into<String>, polygon: Polygon) -> Self {
        Self {
            base: AnnotationBase::new(id),
            polygon,
        }
    }

    /// Creates a new annotation with a random unique id.
    pub fn covering(polygon: Polygon) -> Self {
        Self {
            base: AnnotationBase::with_generated_id(),
            polygon,
        }
    }

    /// The polygon.
    pub fn polygon(&self) -> &Polygon {
        &self.polygon
    }

    layer_properties! {
        /// Fill color.
        "fill-color" => fill_color, set_fill_color, with_fill_color: Color;
        /// Fill opacity.
        "fill-opacity" => fill_opacity, set_fill_opacity, with_fill_opacity: f64;
        /// Color of the 1-pixel outline.
        "fill-outline-color" => fill_outline_color, set_fill_outline_color, with_fill_outline_color: Color;
        /// Sort key: features with a higher key are drawn above features with a lower one.
        "fill-sort-key" => fill_sort_key, set_fill_sort_key, with_fill_sort_key: f64;
    }
}
