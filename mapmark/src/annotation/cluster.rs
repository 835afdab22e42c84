use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::style::{Color, GeoJsonSource, Layer, LayerType};

/// Id of the layer drawing cluster circles of the manager with the given id.
pub fn cluster_circle_layer_id(manager_id: &str) -> String {
    format!("mapmark-cluster-circle-layer-manager-{manager_id}")
}

/// Id of the layer drawing cluster labels of the manager with the given id.
pub fn cluster_text_layer_id(manager_id: &str) -> String {
    format!("mapmark-cluster-text-layer-manager-{manager_id}")
}

/// Clustering of point annotations.
///
/// Style values (radius, colors, text) can be constants or expressions evaluated per cluster, e.g. a `step`
/// expression over `point_count`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterOptions {
    /// Radius of cluster circles.
    pub circle_radius: Value,
    /// Color of cluster circles.
    pub circle_color: Value,
    /// Color of cluster labels.
    pub text_color: Value,
    /// Font size of cluster labels.
    pub text_size: Value,
    /// Text of cluster labels.
    pub text_field: Value,
    /// Radius of each cluster when clustering points, in screen points.
    pub cluster_radius: f64,
    /// Max zoom on which to cluster points.
    pub cluster_max_zoom: f64,
    /// Minimum number of points necessary to form a cluster.
    pub cluster_min_points: f64,
    /// Custom aggregated properties of clusters: property name to `[operator, map expression]`.
    pub cluster_properties: Option<Map<String, Value>>,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            circle_radius: json!(18.0),
            circle_color: Color::BLACK.into(),
            text_color: Color::WHITE.into(),
            text_size: json!(12.0),
            text_field: json!(["get", "point_count"]),
            cluster_radius: 50.0,
            cluster_max_zoom: 14.0,
            cluster_min_points: 2.0,
            cluster_properties: None,
        }
    }
}

impl ClusterOptions {
    /// Sets the radius of cluster circles.
    pub fn with_circle_radius(mut self, radius: impl Into<Value>) -> Self {
        self.circle_radius = radius.into();
        self
    }

    /// Sets the color of cluster circles.
    pub fn with_circle_color(mut self, color: impl Into<Value>) -> Self {
        self.circle_color = color.into();
        self
    }

    /// Sets the color of cluster labels.
    pub fn with_text_color(mut self, color: impl Into<Value>) -> Self {
        self.text_color = color.into();
        self
    }

    /// Sets the font size of cluster labels.
    pub fn with_text_size(mut self, size: impl Into<Value>) -> Self {
        self.text_size = size.into();
        self
    }

    /// Sets the text of cluster labels.
    pub fn with_text_field(mut self, field: impl Into<Value>) -> Self {
        self.text_field = field.into();
        self
    }

    /// Sets the clustering radius.
    pub fn with_cluster_radius(mut self, radius: f64) -> Self {
        self.cluster_radius = radius;
        self
    }

    /// Sets the max zoom of clustering.
    pub fn with_cluster_max_zoom(mut self, zoom: f64) -> Self {
        self.cluster_max_zoom = zoom;
        self
    }

    /// Sets the minimum number of points in a cluster.
    pub fn with_cluster_min_points(mut self, points: f64) -> Self {
        self.cluster_min_points = points;
        self
    }

    /// Sets aggregated cluster properties.
    pub fn with_cluster_properties(mut self, properties: Map<String, Value>) -> Self {
        self.cluster_properties = Some(properties);
        self
    }

    pub(crate) fn apply_to(&self, source: &mut GeoJsonSource) {
        source.cluster = true;
        source.cluster_radius = Some(self.cluster_radius);
        source.cluster_max_zoom = Some(self.cluster_max_zoom);
        source.cluster_min_points = Some(self.cluster_min_points);
        source.cluster_properties = self.cluster_properties.clone();
    }

    /// Circle layer showing clusters only: features with the `point_count` property.
    pub(crate) fn circle_layer(&self, manager_id: &str) -> Layer {
        Layer::new(cluster_circle_layer_id(manager_id), LayerType::Circle, manager_id)
            .with_filter(json!(["has", "point_count"]))
            .with_property("circle-radius", self.circle_radius.clone())
            .with_property("circle-color", self.circle_color.clone())
    }

    pub(crate) fn text_layer(&self, manager_id: &str) -> Layer {
        Layer::new(cluster_text_layer_id(manager_id), LayerType::Symbol, manager_id)
            .with_property("text-field", self.text_field.clone())
            .with_property("text-size", self.text_size.clone())
            .with_property("text-color", self.text_color.clone())
    }
}
