use mapmark_types::cartesian::Rect;
use mapmark_types::geo::GeoPoint2d;
use mapmark_types::geometry::Geometry;
use serde::{Deserialize, Serialize};

/// What a view annotation is attached to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AnnotatedFeature {
    /// A geometry. The annotation is anchored to a point of it chosen by the map.
    Geometry(Geometry),
    /// A feature rendered by a style layer. The annotation follows the visibility of the feature.
    #[serde(rename_all = "camelCase")]
    LayerFeature {
        /// Id of the layer rendering the feature.
        layer_id: String,
        /// Id of the feature. `None` makes the annotation follow the first feature of the layer.
        feature_id: Option<String>,
    },
}

impl AnnotatedFeature {
    /// Feature id this annotation is associated with, if it is attached to a layer feature.
    pub fn feature_id(&self) -> Option<&str> {
        match self {
            AnnotatedFeature::Geometry(_) => None,
            AnnotatedFeature::LayerFeature { feature_id, .. } => feature_id.as_deref(),
        }
    }
}

impl From<Geometry> for AnnotatedFeature {
    fn from(value: Geometry) -> Self {
        Self::Geometry(value)
    }
}

impl From<GeoPoint2d> for AnnotatedFeature {
    fn from(value: GeoPoint2d) -> Self {
        Self::Geometry(Geometry::Point(value))
    }
}

/// Side of the view annotation that touches the anchor point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViewAnnotationAnchor {
    /// Center of the view is at the anchor point.
    #[default]
    Center,
    /// Top edge center.
    Top,
    /// Top left corner.
    TopLeft,
    /// Top right corner.
    TopRight,
    /// Bottom edge center.
    Bottom,
    /// Bottom left corner.
    BottomLeft,
    /// Bottom right corner.
    BottomRight,
    /// Left edge center.
    Left,
    /// Right edge center.
    Right,
}

/// Anchor with an extra offset, in screen points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewAnnotationAnchorConfig {
    /// The anchor.
    pub anchor: ViewAnnotationAnchor,
    /// Offset along the x-axis.
    pub offset_x: f64,
    /// Offset along the y-axis.
    pub offset_y: f64,
}

impl ViewAnnotationAnchorConfig {
    /// Anchor without offset.
    pub fn new(anchor: ViewAnnotationAnchor) -> Self {
        Self {
            anchor,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }

    /// Sets the offset.
    pub fn with_offset(mut self, offset_x: f64, offset_y: f64) -> Self {
        self.offset_x = offset_x;
        self.offset_y = offset_y;
        self
    }
}

/// Layout and visibility settings of a view annotation, as understood by the positioning engine of the map.
///
/// All fields are optional. On update only the set fields are changed, the rest keep their values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewAnnotationOptions {
    /// What the annotation is attached to. Required when an annotation is added.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotated_feature: Option<AnnotatedFeature>,
    /// Width in screen points.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    /// Height in screen points.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    /// Whether the annotation is shown even if it collides with other annotations. Default is `false`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_overlap: Option<bool>,
    /// Whether the annotation can be shown over the location puck. Default is `false`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_overlap_with_puck: Option<bool>,
    /// Whether the annotation is placed at the elevation of the terrain. Default is `false`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_z_elevate: Option<bool>,
    /// Whether the annotation is shown. Default is `true`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    /// Selected annotations are placed above the others. Default is `false`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected: Option<bool>,
    /// Annotations with higher priority are placed first.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    /// Anchors the map can choose from, in order of preference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variable_anchors: Option<Vec<ViewAnnotationAnchorConfig>>,
    /// Whether the annotation is shown when it is outside of the camera padding. Default is `false`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_camera_padding: Option<bool>,
    /// Minimum zoom level at which the annotation is shown.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_zoom: Option<f64>,
    /// Maximum zoom level at which the annotation is shown.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_zoom: Option<f64>,
}

impl ViewAnnotationOptions {
    /// Options attached to the given feature, with all other fields unset.
    pub fn new(annotated_feature: impl Into<AnnotatedFeature>) -> Self {
        Self {
            annotated_feature: Some(annotated_feature.into()),
            ..Default::default()
        }
    }

    /// Returns true if no field is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Id of the associated layer feature, if any.
    pub fn associated_feature_id(&self) -> Option<&str> {
        self.annotated_feature.as_ref()?.feature_id()
    }

    /// Overwrites fields of `self` with the fields set in `other`.
    pub fn merge(&mut self, other: ViewAnnotationOptions) {
        macro_rules! merge_fields {
            ($($field:ident),*) => {
                $(
                    if other.$field.is_some() {
                        self.$field = other.$field;
                    }
                )*
            };
        }

        merge_fields!(
            annotated_feature,
            width,
            height,
            allow_overlap,
            allow_overlap_with_puck,
            allow_z_elevate,
            visible,
            selected,
            priority,
            variable_anchors,
            ignore_camera_padding,
            min_zoom,
            max_zoom
        );
    }

    /// Frame of the annotation relative to its anchor point, for the given anchor configuration. When no
    /// configuration is given, the first of the variable anchors is used.
    ///
    /// Returns an empty rectangle if width or height is not set.
    pub fn frame(&self, chosen_anchor: Option<&ViewAnnotationAnchorConfig>) -> Rect {
        let (Some(width), Some(height)) = (self.width, self.height) else {
            return Rect::default();
        };

        let half_width = width * 0.5;
        let half_height = height * 0.5;
        let frame = Rect::from_origin(-half_width, -half_height, width, height);

        let anchor_config =
            chosen_anchor.or_else(|| self.variable_anchors.as_ref().and_then(|anchors| anchors.first()));
        let anchor = anchor_config.map(|config| config.anchor).unwrap_or_default();

        let (dx, dy) = match anchor {
            ViewAnnotationAnchor::Center => (0.0, 0.0),
            ViewAnnotationAnchor::Top => (0.0, half_height),
            ViewAnnotationAnchor::TopLeft => (half_width, half_height),
            ViewAnnotationAnchor::TopRight => (-half_width, half_height),
            ViewAnnotationAnchor::Bottom => (0.0, -half_height),
            ViewAnnotationAnchor::BottomLeft => (half_width, -half_height),
            ViewAnnotationAnchor::BottomRight => (-half_width, -half_height),
            ViewAnnotationAnchor::Left => (half_width, 0.0),
            ViewAnnotationAnchor::Right => (-half_width, 0.0),
        };

        let (offset_x, offset_y) = anchor_config
            .map(|config| (config.offset_x, config.offset_y))
            .unwrap_or_default();

        frame.offset_by(dx + offset_x, dy + offset_y)
    }
}

/// Placement of a view annotation in the current frame, computed by the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewAnnotationPositionDescriptor {
    /// Id of the annotation.
    pub identifier: String,
    /// Frame of the view in the coordinates of the annotation container.
    pub frame: Rect,
    /// Geographic point the annotation is anchored to.
    pub anchor_coordinate: GeoPoint2d,
    /// Anchor chosen by the map.
    pub anchor_config: ViewAnnotationAnchorConfig,
}
