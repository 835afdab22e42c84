use geojson::{FeatureCollection, GeoJson};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// GeoJSON source definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoJsonSource {
    /// Id of the source.
    pub id: String,
    /// Initial data. Annotation managers create their sources empty and then push features incrementally.
    pub data: GeoJson,
    /// Whether point features are clustered.
    pub cluster: bool,
    /// Radius of each cluster in screen points.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_radius: Option<f64>,
    /// Max zoom level to cluster points on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_max_zoom: Option<f64>,
    /// Minimum number of points to form a cluster.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_min_points: Option<f64>,
    /// Aggregated properties of clusters: property name to `[operator, map expression]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_properties: Option<Map<String, Value>>,
}

impl GeoJsonSource {
    /// Creates a non-clustered source with an empty feature collection.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            data: GeoJson::FeatureCollection(empty_collection()),
            cluster: false,
            cluster_radius: None,
            cluster_max_zoom: None,
            cluster_min_points: None,
            cluster_properties: None,
        }
    }
}

pub(crate) fn empty_collection() -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: vec![],
        foreign_members: None,
    }
}
