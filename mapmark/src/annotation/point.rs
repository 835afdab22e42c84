use mapmark_types::geo::GeoPoint2d;

use super::{impl_annotation, layer_properties, AnnotationBase};
use crate::style::{Color, LayerType, StyleImage};

/// Name under which the built-in marker image is added to the style.
pub const DEFAULT_MARKER_IMAGE_NAME: &str = "mapmark-default-marker";

/// Image of a point annotation.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationImage {
    /// The built-in red pin.
    Default,
    /// Custom image, added to the style under the given name.
    Custom {
        /// Name of the image in the style. Annotations using the same name share the image.
        name: String,
        /// Image content.
        image: StyleImage,
    },
}

impl AnnotationImage {
    /// Name of the image in the style.
    pub fn name(&self) -> &str {
        match self {
            AnnotationImage::Default => DEFAULT_MARKER_IMAGE_NAME,
            AnnotationImage::Custom { name, .. } => name,
        }
    }

    /// Image content.
    pub fn style_image(&self) -> StyleImage {
        match self {
            AnnotationImage::Default => StyleImage::default_marker(),
            AnnotationImage::Custom { image, .. } => image.clone(),
        }
    }
}

/// An icon and/or a text label at a geographic point, drawn by a symbol layer.
#[derive(Debug, Clone, PartialEq)]
pub struct PointAnnotation {
    pub(crate) base: AnnotationBase<PointAnnotation>,
    point: GeoPoint2d,
    image: Option<AnnotationImage>,
}

impl_annotation!(PointAnnotation, GeoPoint2d, point, LayerType::Symbol, {
    fn image(&self) -> Option<&AnnotationImage> {
        self.image.as_ref()
    }
});

impl PointAnnotation {
    /// Creates a new annotation with the given id.
    pub fn new(id: impl Into<String>, point: GeoPoint2d) -> Self {
        Self {
            base: AnnotationBase::new(id),
            point,
            image: None,
        }
    }

    /// Creates a new annotation with a random unique id.
    pub fn at(point: GeoPoint2d) -> Self {
        Self {
            base: AnnotationBase::with_generated_id(),
            point,
            image: None,
        }
    }

    /// Position of the annotation.
    pub fn point(&self) -> GeoPoint2d {
        self.point
    }

    /// Image shown by the annotation.
    pub fn annotation_image(&self) -> Option<&AnnotationImage> {
        self.image.as_ref()
    }

    /// Sets the image shown by the annotation. Also sets `icon-image` to the name of the image.
    pub fn set_image(&mut self, image: Option<AnnotationImage>) {
        self.set_icon_image(image.as_ref().map(|image| image.name().to_string()));
        self.image = image;
    }

    /// Builder version of [`Self::set_image`].
    pub fn with_image(mut self, image: AnnotationImage) -> Self {
        self.set_image(Some(image));
        self
    }

    layer_properties! {
        /// Name of the style image of the icon.
        "icon-image" => icon_image, set_icon_image, with_icon_image: String;
        /// Scale factor of the icon.
        "icon-size" => icon_size, set_icon_size, with_icon_size: f64;
        /// Rotation of the icon in degrees clockwise.
        "icon-rotate" => icon_rotate, set_icon_rotate, with_icon_rotate: f64;
        /// Color of an SDF icon.
        "icon-color" => icon_color, set_icon_color, with_icon_color: Color;
        /// Opacity of the icon.
        "icon-opacity" => icon_opacity, set_icon_opacity, with_icon_opacity: f64;
        /// Offset of the icon from its anchor, in icon pixels.
        "icon-offset" => icon_offset, set_icon_offset, with_icon_offset: [f64; 2];
        /// Label text.
        "text-field" => text_field, set_text_field, with_text_field: String;
        /// Font size of the label.
        "text-size" => text_size, set_text_size, with_text_size: f64;
        /// Color of the label.
        "text-color" => text_color, set_text_color, with_text_color: Color;
        /// Sort key: features with a higher key are drawn above features with a lower one.
        "symbol-sort-key" => symbol_sort_key, set_symbol_sort_key, with_symbol_sort_key: f64;
    }
}
