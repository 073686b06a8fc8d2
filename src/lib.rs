//! # pinmap
//!
//! A viewport and clustering engine for interactive dashboard maps.
//!
//! pinmap converts live pointer input (pan, zoom, drag) into a pan/zoom
//! transform with anchor preservation, partitions the visible point set into
//! proximity clusters, keys incremental data loading off the visible region,
//! and aggregates point attributes into a categorical heatmap. Rendering is
//! owned by the host: the engine exposes projected points, clusters and the
//! current transform on every tick and consumes raw input events in return.

pub mod core;
pub mod data;
pub mod engine;
pub mod heatmap;
pub mod input;
pub mod prelude;
pub mod spatial;

// Re-export public API
pub use crate::core::{
    bounds::Bounds,
    config::EngineConfig,
    geo::{LatLng, LatLngBounds, Point},
    projector::CoordinateProjector,
    viewport::Viewport,
};

pub use crate::input::{
    events::InputEvent,
    pan_zoom::{DragSession, PanZoomController, PanZoomState},
};

pub use crate::spatial::{
    cluster::{Cluster, ClusterIndex, GreedyClusterer},
    drilldown::DrillDown,
    hierarchy::HierarchicalClusterer,
    index::{SpatialEntry, SpatialIndex},
};

pub use crate::data::{
    loader::{FetchOutcome, ViewportTracker},
    point::{GeoPoint, PointDetail},
    provider::{FetchKey, FetchRequest, PointProvider},
    rest::RestPointSource,
};

pub use crate::engine::{DataStatus, MapEngine, ProjectedCluster, ProjectedPoint, RenderState};

pub use crate::heatmap::{HeatCell, HeatGrid, HeatmapAggregator};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("Unknown cluster: {0}")]
    UnknownCluster(String),

    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("Data source unavailable")]
    DataUnavailable,
}

/// Error type alias for convenience
pub type Error = MapError;
