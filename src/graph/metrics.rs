use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Trait for counting graph and traversal operations.
///
/// Implementations receive one call per structural change or traversal
/// step. Nothing is called on read-only queries.
pub trait GraphMetrics: Send + Sync {
    /// Records a vertex insertion.
    fn vertex_inserted(&self);

    /// Records a vertex removal, after its edges are gone.
    fn vertex_removed(&self);

    /// Records a new edge.
    ///
    /// # Parameters
    /// * `recycled` - Whether the edge reused a pooled slot.
    fn edge_connected(&self, recycled: bool);

    /// Records an edge removal.
    fn edge_disconnected(&self);

    /// Records one traversal step.
    ///
    /// # Parameters
    /// * `kind` - "bfs", "dfs" or "dijkstra".
    fn traversal_step(&self, kind: &'static str);

    /// Records a shortest-path tree rebuilt from scratch.
    fn dijkstra_reset(&self);

    /// Records a shortest-path tree repaired incrementally.
    fn dijkstra_update(&self);
}

/// A no-op implementation of [`GraphMetrics`].
#[derive(Default)]
pub struct NoopMetrics;

impl GraphMetrics for NoopMetrics {
    fn vertex_inserted(&self) {}
    fn vertex_removed(&self) {}
    fn edge_connected(&self, _recycled: bool) {}
    fn edge_disconnected(&self) {}
    fn traversal_step(&self, _kind: &'static str) {}
    fn dijkstra_reset(&self) {}
    fn dijkstra_update(&self) {}
}

/// A thread-safe counter-based implementation of [`GraphMetrics`].
#[derive(Default)]
pub struct CounterMetrics {
    /// Number of vertices inserted.
    pub vertices_inserted: AtomicU64,

    /// Number of vertices removed.
    pub vertices_removed: AtomicU64,

    /// Number of edges connected.
    pub edges_connected: AtomicU64,

    /// Number of connected edges that reused a pooled slot.
    pub edges_recycled: AtomicU64,

    /// Number of edges disconnected.
    pub edges_disconnected: AtomicU64,

    /// Number of breadth-first steps.
    pub bfs_steps: AtomicU64,

    /// Number of depth-first steps.
    pub dfs_steps: AtomicU64,

    /// Number of Dijkstra steps.
    pub dijkstra_steps: AtomicU64,

    /// Number of full Dijkstra recomputations.
    pub dijkstra_resets: AtomicU64,

    /// Number of incremental Dijkstra repairs.
    pub dijkstra_updates: AtomicU64,
}

impl GraphMetrics for CounterMetrics {
    fn vertex_inserted(&self) {
        self.vertices_inserted.fetch_add(1, Ordering::Relaxed);
    }

    fn vertex_removed(&self) {
        self.vertices_removed.fetch_add(1, Ordering::Relaxed);
    }

    fn edge_connected(&self, recycled: bool) {
        self.edges_connected.fetch_add(1, Ordering::Relaxed);
        if recycled {
            self.edges_recycled.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn edge_disconnected(&self) {
        self.edges_disconnected.fetch_add(1, Ordering::Relaxed);
    }

    fn traversal_step(&self, kind: &'static str) {
        match kind {
            "bfs" => {
                self.bfs_steps.fetch_add(1, Ordering::Relaxed);
            }
            "dfs" => {
                self.dfs_steps.fetch_add(1, Ordering::Relaxed);
            }
            "dijkstra" => {
                self.dijkstra_steps.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
    }

    fn dijkstra_reset(&self) {
        self.dijkstra_resets.fetch_add(1, Ordering::Relaxed);
    }

    fn dijkstra_update(&self) {
        self.dijkstra_updates.fetch_add(1, Ordering::Relaxed);
    }
}

/// Returns the default metrics implementation wrapped in an [`Arc`].
///
/// The default is [`NoopMetrics`].
pub fn default_metrics() -> Arc<dyn GraphMetrics> {
    Arc::new(NoopMetrics)
}
