use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::metrics::GraphMetrics;

/// Configuration supplied when creating a [`super::Graph`].
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphOptions {
    /// Whether the vertex index refuses a second vertex with an equal key
    pub unique_vertex_keys: bool,
    /// Maximum number of live edges, `None` for unbounded
    pub edge_pool_limit: Option<usize>,
    /// Number of vertex slots to reserve up front
    pub vertex_capacity: usize,
    /// Number of edge slots to reserve up front
    pub edge_capacity: usize,
    /// Optional metrics collection implementation
    #[serde(skip)]
    pub metrics: Option<Arc<dyn GraphMetrics>>,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            unique_vertex_keys: true,
            edge_pool_limit: None,
            vertex_capacity: 0,
            edge_capacity: 0,
            metrics: None,
        }
    }
}

impl GraphOptions {
    /// Creates options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allows or refuses vertices with equal keys.
    pub fn unique_vertex_keys(mut self, unique: bool) -> Self {
        self.unique_vertex_keys = unique;
        self
    }

    /// Caps the number of live edges.
    pub fn edge_pool_limit(mut self, limit: usize) -> Self {
        self.edge_pool_limit = Some(limit);
        self
    }

    /// Reserves vertex slots.
    pub fn vertex_capacity(mut self, capacity: usize) -> Self {
        self.vertex_capacity = capacity;
        self
    }

    /// Reserves edge slots.
    pub fn edge_capacity(mut self, capacity: usize) -> Self {
        self.edge_capacity = capacity;
        self
    }

    /// Sets the metrics collection implementation.
    pub fn metrics(mut self, metrics: Arc<dyn GraphMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }
}
