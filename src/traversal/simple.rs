use tracing::debug;

use super::{AllowAll, EdgeFilter, LevelMarker, TraversalOptions, TraversalOrder, Visit};
use crate::error::Result;
use crate::graph::{EdgeData, Graph, QueueKind, QueuePool, VertexData};
use crate::types::{QueueId, VertexId};

/// Breadth-first or depth-first walk from one start vertex.
///
/// Each vertex is reported once. Breadth-first levels come from a
/// level-transition marker; depth-first levels are the depth at which a
/// vertex was first discovered.
pub struct SimpleTraversal<'g, V, E, F = AllowAll> {
    graph: &'g Graph<V, E>,
    start: VertexId,
    options: TraversalOptions,
    filter: F,
    pool: QueuePool<u32>,
    pending: QueueId,
    visited: QueueId,
    marker: LevelMarker,
}

impl<'g, V: VertexData, E: EdgeData> SimpleTraversal<'g, V, E, AllowAll> {
    /// Traversal that follows every edge.
    pub fn new(graph: &'g Graph<V, E>, start: VertexId, options: TraversalOptions) -> Result<Self> {
        Self::with_filter(graph, start, options, AllowAll)
    }
}

impl<'g, V: VertexData, E: EdgeData, F: EdgeFilter<E>> SimpleTraversal<'g, V, E, F> {
    /// Traversal that only crosses edges `filter` allows.
    pub fn with_filter(
        graph: &'g Graph<V, E>,
        start: VertexId,
        options: TraversalOptions,
        filter: F,
    ) -> Result<Self> {
        graph.check_vertex(start)?;
        let mut pool = QueuePool::with_capacity(options.capacity);
        let pending = pool.create_queue(QueueKind::List);
        let visited = pool.create_queue(QueueKind::List);
        let mut traversal = Self {
            graph,
            start,
            options,
            filter,
            pool,
            pending,
            visited,
            marker: LevelMarker::default(),
        };
        traversal.reset();
        Ok(traversal)
    }

    /// Restarts from the start vertex.
    pub fn reset(&mut self) {
        // Both queues are owned by this traversal, so clearing cannot fail
        // and the append into an empty queue cannot collide.
        let cleared = self
            .pool
            .clear(self.pending)
            .and_then(|()| self.pool.clear(self.visited));
        debug_assert!(cleared.is_ok(), "traversal queues must exist");
        self.marker.reset();
        let seeded = self.pool.append(self.pending, self.start, 0);
        debug_assert!(seeded.is_ok(), "start vertex must seed an empty queue");
    }

    /// Returns true once `vertex` has been reported.
    pub fn is_visited(&self, vertex: VertexId) -> bool {
        self.pool.contains(self.visited, vertex)
    }

    /// Reports the next vertex, or `None` when the walk is complete.
    pub fn next_vertex(&mut self) -> Option<Visit> {
        let current = self.pool.head(self.pending)?;
        let depth = self
            .pool
            .state(self.pending, current)
            .map_or(0, |state| *state.payload());
        self.pool
            .transfer(current, self.pending, self.visited)
            .ok()?;
        let order = self.options.order;
        let level = match order {
            TraversalOrder::Bfs => self.marker.enter(current),
            TraversalOrder::Dfs => depth,
        };
        let expand = self.options.max_level.map_or(true, |max| level < max);
        let mut first_enqueued = None;
        if expand {
            let graph = self.graph;
            for edge in graph.adjacency(current) {
                let next = edge.dst;
                if self.pool.contains(self.visited, next) || self.pool.contains(self.pending, next) {
                    continue;
                }
                if !self.filter.allow(edge) {
                    continue;
                }
                let queued = match order {
                    TraversalOrder::Bfs => self.pool.append(self.pending, next, depth + 1),
                    TraversalOrder::Dfs => self.pool.prepend(self.pending, next, depth + 1),
                };
                if queued.is_ok() && first_enqueued.is_none() {
                    first_enqueued = Some(next);
                }
            }
        }
        if order == TraversalOrder::Bfs {
            self.marker.leave(first_enqueued);
        }
        let kind = match order {
            TraversalOrder::Bfs => "bfs",
            TraversalOrder::Dfs => "dfs",
        };
        self.graph.metrics().traversal_step(kind);
        if self.pool.is_empty(self.pending) {
            debug!(
                start = %self.start,
                visited = self.pool.len(self.visited),
                "traversal.simple.completed"
            );
        }
        Some(Visit {
            vertex: current,
            level,
        })
    }
}

impl<V: VertexData, E: EdgeData, F: EdgeFilter<E>> Iterator for SimpleTraversal<'_, V, E, F> {
    type Item = Visit;

    fn next(&mut self) -> Option<Visit> {
        self.next_vertex()
    }
}
