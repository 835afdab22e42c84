//! Error types used by the crate.

use thiserror::Error;

/// Failure reported by the native style (sources, layers and images registry).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StyleError {
    /// Style object with the given id does not exist.
    #[error("style object not found: {0}")]
    NotFound(String),
    /// Style object with the given id is already in the style.
    #[error("style object already exists: {0}")]
    AlreadyExists(String),
    /// Generic error - details are inside.
    #[error("{0}")]
    Generic(String),
}

/// Failure reported by the map (camera and view annotation positioning engine).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MapError {
    /// View annotation with the given id is not registered in the map.
    #[error("view annotation not found: {0}")]
    ViewAnnotationNotFound(String),
    /// Generic error - details are inside.
    #[error("{0}")]
    Generic(String),
}

/// Failure of an asynchronous feature query.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    /// The query was superseded or its owner went away.
    #[error("query was canceled")]
    Canceled,
    /// Cluster expansion was requested for a feature that is not a cluster.
    #[error("feature is not a cluster")]
    NotACluster,
    /// Generic error - details are inside.
    #[error("{0}")]
    Generic(String),
}

/// Misuse of the view annotation API.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ViewAnnotationError {
    /// The view (or the id) is already registered as an annotation.
    #[error("view is already added")]
    ViewIsAlreadyAdded,
    /// The associated feature id is used by another annotation.
    #[error("associated feature id is already in use")]
    AssociatedFeatureIdIsAlreadyInUse,
    /// The view is not registered as an annotation.
    #[error("annotation not found")]
    AnnotationNotFound,
    /// Options of a new annotation do not specify the annotated feature.
    #[error("annotated feature is missing")]
    GeometryFieldMissing,
    /// The view annotation is already bound to a host.
    #[error("view annotation is already bound")]
    AlreadyBound,
    /// The map rejected the operation.
    #[error("map error: {0}")]
    Map(#[from] MapError),
}

/// Failure to construct a style image.
#[derive(Debug, Error)]
pub enum ImageError {
    /// Number of bytes does not match `width * height * 4`.
    #[error("expected {expected} bytes of RGBA data, got {actual}")]
    InvalidSize {
        /// Expected length of the buffer.
        expected: usize,
        /// Actual length of the buffer.
        actual: usize,
    },
    /// Image decoding error.
    #[cfg(feature = "image")]
    #[error("image decode error: {0:?}")]
    Decode(#[from] image::ImageError),
}
