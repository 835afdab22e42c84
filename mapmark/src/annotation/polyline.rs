use mapmark_types::geometry::LineString;
use serde::{Deserialize, Serialize};

use super::{impl_annotation, layer_properties, AnnotationBase};
use crate::style::{Color, LayerType};

/// Display of joined lines.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineJoin {
    /// Sharp corners.
    Miter,
    /// Rounded corners.
    Round,
    /// Squared-off corners.
    Bevel,
}

/// A line along a sequence of points, drawn by a line layer.
#[derive(Debug, Clone, PartialEq)]
pub struct PolylineAnnotation {
    pub(crate) base: AnnotationBase<PolylineAnnotation>,
    line: LineString,
}

impl_annotation!(PolylineAnnotation, LineString, line, LayerType::Line);

impl PolylineAnnotation {
    /// Creates a new annotation with the given id.
    pub fn new(id: impl Into<String>, line: LineString) -> Self {
        Self {
            base: AnnotationBase::new(id),
            line,
        }
    }

    /// Creates a new annotation with a random unique id.
    pub fn along(line: LineString) -> Self {
        Self {
            base: AnnotationBase::with_generated_id(),
            line,
        }
    }

    /// The line.
    pub fn line(&self) -> &LineString {
        &self.line
    }

    layer_properties! {
        /// Width of the line in screen points.
        "line-width" => line_width, set_line_width, with_line_width: f64;
        /// Color of the line.
        "line-color" => line_color, set_line_color, with_line_color: Color;
        /// Opacity of the line.
        "line-opacity" => line_opacity, set_line_opacity, with_line_opacity: f64;
        /// Blur applied to the line, in screen points.
        "line-blur" => line_blur, set_line_blur, with_line_blur: f64;
        /// Display of joined segments.
        "line-join" => line_join, set_line_join, with_line_join: LineJoin;
        /// Sort key: features with a higher key are drawn above features with a lower one.
        "line-sort-key" => line_sort_key, set_line_sort_key, with_line_sort_key: f64;
    }
}
