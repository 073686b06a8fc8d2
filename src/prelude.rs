//! Prelude module for common pinmap types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use pinmap::prelude::*;`

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
    cluster::{strategy_for_dataset, Cluster, ClusterIndex, GreedyClusterer},
    drilldown::DrillDown,
    hierarchy::HierarchicalClusterer,
    index::{SpatialEntry, SpatialIndex},
};

pub use crate::data::{
    loader::{FetchOutcome, ViewportTracker},
    point::{sanitize_points, GeoPoint, PointDetail, UnitOccupancy},
    provider::{FetchKey, FetchRequest, PointProvider},
    rest::RestPointSource,
};

pub use crate::engine::{DataStatus, MapEngine, ProjectedCluster, ProjectedPoint, RenderState};

pub use crate::heatmap::{HeatCell, HeatGrid, HeatmapAggregator};

pub use crate::{Error as MapError, Result};

pub use std::sync::Arc;

pub use instant::{Duration, Instant};

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet};

#[cfg(feature = "tokio-runtime")]
pub use futures::Future;
