//! Directed graph engine with pooled edges and intrusive indexes.
//!
//! Vertices live in an arena and are indexed by key in a graph-wide
//! [`SortedIndex`](crate::index::SortedIndex)-style structure. Each vertex
//! owns two intrusive indexes over the shared edge arena:
//!
//! * its adjacency, ordered by [`EdgeData::edge_key`] (cost order for
//!   [`weighted::WeightedGraph`]), and
//! * its connectors, a trie of incoming edges keyed by source vertex, which
//!   answers [`Graph::has_edge`] and [`Graph::edge_between`] in O(log degree).
//!
//! Removed edges park their slots in the edge arena's free list and are reused
//! by the next [`Graph::connect`]. Queue membership for traversals is kept
//! outside the graph, in a [`queue::QueuePool`].

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{Result, VeredaError};
use crate::index::sorted::SortedCore;
use crate::primitives::arena::Arena;
use crate::primitives::bits::{KeyBuf, KeyRef};
use crate::types::VertexId;

mod edge_ops;
mod iter;
/// Counters for graph and traversal activity.
pub mod metrics;
/// Graph configuration.
pub mod options;
/// Multi-queue vertex membership.
pub mod queue;
pub(crate) mod store;
/// Cost-weighted edges.
pub mod weighted;


pub use iter::{AdjacencyIter, ConnectorIter, EdgeRef, Neighbors, Vertices};
pub use metrics::{default_metrics, CounterMetrics, GraphMetrics, NoopMetrics};
pub use options::GraphOptions;
pub use queue::{QueueKind, QueuePool, QueueState};
pub use weighted::{Cost, Link, WeightedEdge, WeightedGraph};

use store::{EdgeSlot, VertexIndex, VertexSlot};

/// Payload stored in a vertex.
///
/// The key orders the vertex index and must not change while the vertex is
/// in a graph.
pub trait VertexData {
    /// Key of this vertex.
    fn vertex_key(&self) -> KeyRef<'_>;
}

impl VertexData for KeyBuf {
    fn vertex_key(&self) -> KeyRef<'_> {
        self.as_key()
    }
}

impl VertexData for String {
    fn vertex_key(&self) -> KeyRef<'_> {
        KeyRef::from_bytes(self.as_bytes())
    }
}

impl VertexData for Vec<u8> {
    fn vertex_key(&self) -> KeyRef<'_> {
        KeyRef::from_bytes(self)
    }
}

/// Payload stored in an edge.
pub trait EdgeData {
    /// Adjacency ordering key. Edges without one are ordered by destination.
    fn edge_key(&self) -> Option<KeyBuf> {
        None
    }
}

impl EdgeData for () {}

/// Directed graph with at most one edge per ordered vertex pair.
pub struct Graph<V, E = ()> {
    pub(crate) vertices: Arena<VertexSlot<V>>,
    pub(crate) edges: Arena<EdgeSlot<E>>,
    index: SortedCore<VertexIndex>,
    options: GraphOptions,
    metrics: Arc<dyn GraphMetrics>,
}

impl<V: VertexData, E: EdgeData> Default for Graph<V, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: VertexData, E: EdgeData> Graph<V, E> {
    /// Creates an empty graph with default options.
    pub fn new() -> Self {
        Self::with_options(GraphOptions::default())
    }

    /// Creates an empty graph.
    pub fn with_options(options: GraphOptions) -> Self {
        let metrics = options.metrics.clone().unwrap_or_else(default_metrics);
        Self {
            vertices: Arena::with_capacity(options.vertex_capacity),
            edges: Arena::with_capacity(options.edge_capacity),
            index: SortedCore::new(options.unique_vertex_keys),
            options,
            metrics,
        }
    }

    /// Options the graph was created with.
    pub fn options(&self) -> &GraphOptions {
        &self.options
    }

    pub(crate) fn metrics(&self) -> &Arc<dyn GraphMetrics> {
        &self.metrics
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of live edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Edge slots ever allocated, live or pooled.
    pub fn edge_slots(&self) -> usize {
        self.edges.slots()
    }

    /// Edge slots waiting for reuse.
    pub fn pooled_edges(&self) -> usize {
        self.edges.pooled()
    }

    /// Returns true when `v` names a vertex of this graph.
    pub fn contains_vertex(&self, v: VertexId) -> bool {
        self.vertices.contains(v.0)
    }

    pub(crate) fn check_vertex(&self, v: VertexId) -> Result<()> {
        if self.vertices.contains(v.0) {
            Ok(())
        } else {
            Err(VeredaError::UnknownVertex)
        }
    }

    /// Adds a vertex.
    pub fn insert_vertex(&mut self, data: V) -> Result<VertexId> {
        if self.index.is_unique() && self.index.find_rep(&self.vertices, data.vertex_key()).is_some()
        {
            warn!(key = ?data.vertex_key(), "graph.vertex.duplicate_key");
            return Err(VeredaError::DuplicateKey);
        }
        let handle = self.vertices.insert(VertexSlot::new(data));
        if !self.index.insert(&mut self.vertices, handle.index()) {
            self.vertices.remove(handle);
            return Err(VeredaError::DuplicateKey);
        }
        self.metrics.vertex_inserted();
        let id = VertexId(handle);
        debug!(vertex = %id, "graph.vertex.inserted");
        Ok(id)
    }

    /// Removes a vertex with every edge that touches it.
    ///
    /// Outgoing edges go first, then incoming ones, and the vertex leaves the
    /// vertex index last, so no edge ever names a vertex that is gone.
    pub fn remove_vertex(&mut self, v: VertexId) -> Result<V> {
        self.check_vertex(v)?;
        let slot = v.0.index();
        let mut dropped = 0usize;
        while let Some(edge) = self.vertices.at(slot).adjacency.first() {
            self.unlink_edge(edge);
            dropped += 1;
        }
        while let Some(edge) = self.vertices.at(slot).connectors.first(&self.edges) {
            self.unlink_edge(edge);
            dropped += 1;
        }
        self.index.remove(&mut self.vertices, slot);
        let removed = self
            .vertices
            .remove(v.0)
            .ok_or(VeredaError::UnknownVertex)?;
        self.metrics.vertex_removed();
        debug!(vertex = %v, edges = dropped, "graph.vertex.removed");
        Ok(removed.data)
    }

    /// Payload of `v`.
    pub fn vertex(&self, v: VertexId) -> Option<&V> {
        self.vertices.get(v.0).map(|slot| &slot.data)
    }

    /// First vertex whose key equals `key`.
    pub fn find_vertex(&self, key: KeyRef<'_>) -> Option<VertexId> {
        self.index
            .find(&self.vertices, key)
            .and_then(|slot| self.vertices.handle_at(slot))
            .map(VertexId)
    }

    /// Vertices in key order.
    pub fn vertices(&self) -> Vertices<'_, V, E> {
        Vertices::new(self, self.index.first())
    }

    pub(crate) fn next_vertex_slot(&self, slot: u32) -> Option<u32> {
        self.index.next(&self.vertices, slot)
    }

    /// Removes every vertex and edge. Edge slots stay pooled.
    pub fn clear(&mut self) {
        let (vertices, edges) = (self.vertices.len(), self.edges.len());
        self.edges.clear();
        self.vertices.clear();
        self.index = SortedCore::new(self.options.unique_vertex_keys);
        debug!(vertices, edges, "graph.cleared");
    }
}
