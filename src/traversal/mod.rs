//! Graph traversals built on queue pools.
//!
//! Both traversals keep their frontier and visited sets as queues in a
//! [`QueuePool`](crate::graph::QueuePool), so membership tests are trie
//! lookups and no per-vertex flags are stored in the graph.

use serde::{Deserialize, Serialize};

use crate::graph::EdgeRef;
use crate::types::VertexId;

/// Shortest-path traversal with incremental repair.
pub mod dijkstra;
/// Breadth-first and depth-first traversal.
pub mod simple;

pub use dijkstra::DijkstraTraversal;
pub use simple::SimpleTraversal;

/// Decides whether a traversal may cross an edge.
pub trait EdgeFilter<E> {
    /// Returns true when `edge` may be followed.
    fn allow(&mut self, edge: EdgeRef<'_, E>) -> bool;
}

impl<E, F> EdgeFilter<E> for F
where
    F: FnMut(EdgeRef<'_, E>) -> bool,
{
    fn allow(&mut self, edge: EdgeRef<'_, E>) -> bool {
        self(edge)
    }
}

/// Filter that follows every edge.
#[derive(Copy, Clone, Debug, Default)]
pub struct AllowAll;

impl<E> EdgeFilter<E> for AllowAll {
    fn allow(&mut self, _edge: EdgeRef<'_, E>) -> bool {
        true
    }
}

/// Visit order of a [`SimpleTraversal`].
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraversalOrder {
    /// Breadth-first.
    #[default]
    Bfs,
    /// Depth-first.
    Dfs,
}

/// Settings for a traversal.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TraversalOptions {
    /// Visit order
    pub order: TraversalOrder,
    /// Vertices at this level are visited but not expanded
    pub max_level: Option<u32>,
    /// Number of queue records to reserve up front
    pub capacity: usize,
}

impl Default for TraversalOptions {
    fn default() -> Self {
        Self {
            order: TraversalOrder::Bfs,
            max_level: None,
            capacity: 0,
        }
    }
}

impl TraversalOptions {
    /// Breadth-first options.
    pub fn bfs() -> Self {
        Self::default()
    }

    /// Depth-first options.
    pub fn dfs() -> Self {
        Self {
            order: TraversalOrder::Dfs,
            ..Self::default()
        }
    }

    /// Stops expanding below `level`.
    pub fn max_level(mut self, level: u32) -> Self {
        self.max_level = Some(level);
        self
    }

    /// Reserves queue records.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }
}

/// One vertex reported by a traversal.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Visit {
    /// Vertex reached.
    pub vertex: VertexId,
    /// Hops from the start vertex along the traversal tree.
    pub level: u32,
}

// Level tracking for FIFO walks. The marker is the first vertex enqueued at
// the next level; reaching it bumps the level and re-arms the marker with the
// first vertex enqueued from there on.
#[derive(Default)]
pub(crate) struct LevelMarker {
    level: u32,
    marker: Option<VertexId>,
    rearm: bool,
}

impl LevelMarker {
    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }

    pub(crate) fn enter(&mut self, vertex: VertexId) -> u32 {
        match self.marker {
            None => self.rearm = true,
            Some(marker) if marker == vertex => {
                self.level += 1;
                self.rearm = true;
            }
            Some(_) => self.rearm = false,
        }
        self.level
    }

    pub(crate) fn leave(&mut self, first_enqueued: Option<VertexId>) {
        if self.rearm {
            self.marker = first_enqueued;
        }
    }
}
