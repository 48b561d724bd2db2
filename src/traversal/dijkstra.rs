//! Single-source shortest paths with incremental repair.
//!
//! The traversal owns two sorted queues: `pending` holds discovered vertices
//! by tentative cost and `visited` holds settled ones. Each record carries a
//! [`Route`]. Because the queues live outside the graph, the graph is passed
//! to every call and may be edited between calls; [`DijkstraTraversal::update`]
//! then repairs the affected part of the tree instead of starting over.
//!
//! ```
//! use vereda::graph::WeightedGraph;
//! use vereda::traversal::DijkstraTraversal;
//!
//! let mut graph: WeightedGraph<String, u32> = WeightedGraph::new();
//! let a = graph.insert_vertex("a".into())?;
//! let b = graph.insert_vertex("b".into())?;
//! let c = graph.insert_vertex("c".into())?;
//! graph.connect_with_cost(a, b, 1, true)?;
//! graph.connect_with_cost(b, c, 1, true)?;
//! graph.connect_with_cost(a, c, 5, true)?;
//!
//! let mut paths = DijkstraTraversal::new();
//! paths.reset(&graph, a)?;
//! paths.run(&graph);
//! assert_eq!(paths.cost(c), Some(2));
//! assert_eq!(paths.next_hop(&graph, c), Some(b));
//! # Ok::<(), vereda::VeredaError>(())
//! ```

use tracing::{debug, trace};

use super::{AllowAll, EdgeFilter, LevelMarker};
use crate::error::Result;
use crate::graph::{Cost, Graph, QueueKind, QueuePool, VertexData, WeightedEdge};
use crate::types::{EdgeId, QueueId, VertexId};

/// Path information kept for every reached vertex.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Route<C> {
    /// Total cost from the start vertex.
    pub cost: C,
    /// Vertex preceding this one on the path.
    pub prev_hop: Option<VertexId>,
    /// First edge of the path, leaving the start vertex.
    pub next_hop: Option<EdgeId>,
}

/// Shortest-path tree rooted at one start vertex.
pub struct DijkstraTraversal<C, F = AllowAll> {
    pool: QueuePool<Route<C>>,
    pending: QueueId,
    visited: QueueId,
    walk: QueuePool<()>,
    walk_queue: QueueId,
    marker: LevelMarker,
    filter: F,
    start: Option<VertexId>,
    completed: bool,
    in_update: bool,
    reset_required: bool,
}

impl<C: Cost> DijkstraTraversal<C, AllowAll> {
    /// Traversal that follows every edge.
    pub fn new() -> Self {
        Self::with_filter(AllowAll)
    }
}

impl<C: Cost> Default for DijkstraTraversal<C, AllowAll> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Cost, F> DijkstraTraversal<C, F> {
    /// Traversal that only crosses edges `filter` allows.
    pub fn with_filter(filter: F) -> Self {
        let mut pool = QueuePool::new();
        let pending = pool.create_queue(QueueKind::Sorted);
        let visited = pool.create_queue(QueueKind::Sorted);
        let mut walk = QueuePool::new();
        let walk_queue = walk.create_queue(QueueKind::List);
        Self {
            pool,
            pending,
            visited,
            walk,
            walk_queue,
            marker: LevelMarker::default(),
            filter,
            start: None,
            completed: false,
            in_update: false,
            reset_required: false,
        }
    }

    /// Start vertex of the current tree.
    pub fn start(&self) -> Option<VertexId> {
        self.start
    }

    /// Returns true once every reachable vertex has been settled.
    pub fn is_complete(&self) -> bool {
        self.completed
    }

    /// Number of settled vertices.
    pub fn settled(&self) -> usize {
        self.pool.len(self.visited)
    }

    fn route(&self, vertex: VertexId) -> Option<&Route<C>> {
        self.pool
            .state(self.visited, vertex)
            .or_else(|| self.pool.state(self.pending, vertex))
            .map(|state| state.payload())
    }

    /// Path cost of `vertex`, settled or tentative.
    pub fn cost(&self, vertex: VertexId) -> Option<C> {
        self.route(vertex).map(|route| route.cost)
    }

    /// Vertex preceding `vertex` on its path.
    pub fn prev_hop(&self, vertex: VertexId) -> Option<VertexId> {
        self.route(vertex).and_then(|route| route.prev_hop)
    }

    /// First edge on the path to `vertex`.
    pub fn next_hop_link(&self, vertex: VertexId) -> Option<EdgeId> {
        self.route(vertex).and_then(|route| route.next_hop)
    }

    /// Full route record of `vertex`.
    pub fn route_of(&self, vertex: VertexId) -> Option<Route<C>> {
        self.route(vertex).copied()
    }

    /// Settled vertices in cost order.
    pub fn settled_vertices(&self) -> impl Iterator<Item = (VertexId, Route<C>)> + '_ {
        self.pool
            .iter(self.visited)
            .map(|state| (state.vertex(), *state.payload()))
    }

    // Lowers the cost of a queued vertex. Only a strict improvement counts.
    fn adjust_downward(&mut self, queue: QueueId, vertex: VertexId, cost: C, prev_hop: VertexId) -> bool {
        let Some(route) = self.pool.payload_mut(queue, vertex) else {
            return false;
        };
        if !(cost < route.cost) {
            return false;
        }
        route.cost = cost;
        route.prev_hop = Some(prev_hop);
        self.pool.rekey(queue, vertex, cost.index_key()).is_ok()
    }

    fn adjust_upward(&mut self, queue: QueueId, vertex: VertexId, cost: C) -> bool {
        let Some(route) = self.pool.payload_mut(queue, vertex) else {
            return false;
        };
        if !(cost > route.cost) {
            return false;
        }
        route.cost = cost;
        self.pool.rekey(queue, vertex, cost.index_key()).is_ok()
    }

    // Records how `vertex` was reached from `current` over `edge`. The next
    // hop is inherited from `current` unless it is the tree root, so repairs
    // rooted elsewhere keep first hops that leave the real start.
    fn set_route(&mut self, vertex: VertexId, edge: EdgeId, current: VertexId) {
        let next_hop = if Some(current) == self.start {
            Some(edge)
        } else {
            self.next_hop_link(current)
        };
        if let Some(route) = self.pool.payload_mut(self.pending, vertex) {
            route.prev_hop = Some(current);
            route.next_hop = next_hop;
        }
    }
}

impl<C: Cost, F> DijkstraTraversal<C, F> {
    /// Clears the tree and seeds it with `start` at the minimum cost.
    pub fn reset<V, E>(&mut self, graph: &Graph<V, E>, start: VertexId) -> Result<()>
    where
        V: VertexData,
        E: WeightedEdge<Cost = C>,
    {
        graph.check_vertex(start)?;
        self.pool.clear(self.pending)?;
        self.pool.clear(self.visited)?;
        self.walk.clear(self.walk_queue)?;
        self.marker.reset();
        let cost = C::minimum();
        self.pool.insert(
            self.pending,
            start,
            cost.index_key(),
            Route {
                cost,
                prev_hop: None,
                next_hop: None,
            },
        )?;
        self.start = Some(start);
        self.completed = false;
        self.in_update = false;
        self.reset_required = false;
        graph.metrics().dijkstra_reset();
        trace!(%start, "traversal.dijkstra.reset");
        Ok(())
    }
}

impl<C: Cost, F> DijkstraTraversal<C, F> {
    /// Settles the cheapest pending vertex and relaxes its edges.
    ///
    /// Returns the settled vertex, or `None` when no pending vertex remains.
    pub fn next_vertex<V, E>(&mut self, graph: &Graph<V, E>) -> Option<VertexId>
    where
        V: VertexData,
        E: WeightedEdge<Cost = C>,
        F: EdgeFilter<E>,
    {
        let Some(current) = self.pool.head(self.pending) else {
            self.finish();
            return None;
        };
        if !graph.contains_vertex(current) {
            // Removed since it was queued; drop it and keep going.
            self.pool.evict(current);
            return self.next_vertex(graph);
        }
        self.pool.transfer(current, self.pending, self.visited).ok()?;
        let base = self.cost(current)?;
        for edge in graph.adjacency(current) {
            if !self.filter.allow(edge) {
                continue;
            }
            let next = edge.dst;
            // A sum past the cost type's range cannot be a shortest path.
            let Some(cost) = base.checked_add(edge.data.cost()) else {
                continue;
            };
            let record = if !self.in_update {
                if self.pool.contains(self.pending, next) {
                    self.adjust_downward(self.pending, next, cost, current)
                } else if self.pool.contains(self.visited, next) {
                    false
                } else {
                    self.enqueue(next, cost, current)
                }
            } else {
                let settled = self.pool.contains(self.visited, next);
                let queue = if settled { self.visited } else { self.pending };
                if !settled && !self.pool.contains(self.pending, next) {
                    self.enqueue(next, cost, current)
                } else if self.adjust_downward(queue, next, cost, current) {
                    if settled {
                        let moved = self.pool.transfer(next, self.visited, self.pending);
                        debug_assert!(moved.is_ok(), "settled vertex must move back to pending");
                    }
                    true
                } else if self.prev_hop(next) == Some(current) && self.adjust_upward(queue, next, cost) {
                    // A path through this vertex got longer; local repair
                    // cannot find the replacement.
                    self.reset_required = true;
                    return None;
                } else {
                    false
                }
            };
            if record {
                self.set_route(next, edge.id, current);
            }
        }
        graph.metrics().traversal_step("dijkstra");
        if self.pool.is_empty(self.pending) {
            self.finish();
        }
        Some(current)
    }

    fn enqueue(&mut self, vertex: VertexId, cost: C, prev_hop: VertexId) -> bool {
        self.pool
            .insert(
                self.pending,
                vertex,
                cost.index_key(),
                Route {
                    cost,
                    prev_hop: Some(prev_hop),
                    next_hop: None,
                },
            )
            .is_ok()
    }

    fn finish(&mut self) {
        if !self.completed && !self.in_update {
            debug!(settled = self.pool.len(self.visited), "traversal.dijkstra.completed");
        }
        if !self.in_update {
            self.completed = true;
        }
    }

    /// Settles every reachable vertex.
    pub fn run<V, E>(&mut self, graph: &Graph<V, E>)
    where
        V: VertexData,
        E: WeightedEdge<Cost = C>,
        F: EdgeFilter<E>,
    {
        while self.next_vertex(graph).is_some() {}
    }

    fn recompute<V, E>(&mut self, graph: &Graph<V, E>) -> Result<()>
    where
        V: VertexData,
        E: WeightedEdge<Cost = C>,
        F: EdgeFilter<E>,
    {
        let Some(start) = self.start else {
            return Ok(());
        };
        self.reset(graph, start)?;
        self.run(graph);
        Ok(())
    }

    /// Returns true when the recorded previous hop of `vertex` still explains
    /// its cost: the edge exists, is allowed, and costs no more than the gap.
    pub fn prev_hop_is_valid<V, E>(&mut self, graph: &Graph<V, E>, vertex: VertexId) -> bool
    where
        V: VertexData,
        E: WeightedEdge<Cost = C>,
        F: EdgeFilter<E>,
    {
        if Some(vertex) == self.start {
            return true;
        }
        let Some(route) = self.route_of(vertex) else {
            return false;
        };
        let Some(prev) = route.prev_hop else {
            return false;
        };
        let Some(prev_cost) = self.cost(prev) else {
            return false;
        };
        let Some(edge) = graph.edge_between(prev, vertex).and_then(|id| graph.edge(id)) else {
            return false;
        };
        if !self.filter.allow(edge) {
            return false;
        }
        match prev_cost.checked_add(edge.data.cost()) {
            Some(through) => !(through > route.cost),
            None => false,
        }
    }

    /// Repairs the tree after edges leaving `vertex` changed.
    ///
    /// Cost decreases are propagated from `vertex` outward. When a path on the
    /// tree got longer, or `vertex` itself is no longer explained by its
    /// previous hop, the whole tree is recomputed.
    pub fn update<V, E>(&mut self, graph: &Graph<V, E>, vertex: VertexId) -> Result<()>
    where
        V: VertexData,
        E: WeightedEdge<Cost = C>,
        F: EdgeFilter<E>,
    {
        if self.start.is_none() {
            return Ok(());
        }
        if !graph.contains_vertex(vertex) {
            self.pool.evict(vertex);
            return self.recompute(graph);
        }
        if !self.completed || !self.prev_hop_is_valid(graph, vertex) {
            return self.recompute(graph);
        }
        self.in_update = true;
        self.reset_required = !self.pool.contains(self.visited, vertex)
            || self.pool.transfer(vertex, self.visited, self.pending).is_err();
        while !self.reset_required && self.next_vertex(graph).is_some() {}
        self.in_update = false;
        if self.reset_required {
            debug!(%vertex, "traversal.dijkstra.update_reset");
            return self.recompute(graph);
        }
        self.completed = self.pool.is_empty(self.pending);
        graph.metrics().dijkstra_update();
        trace!(%vertex, "traversal.dijkstra.updated");
        Ok(())
    }

    /// Repairs the tree after the edge between `a` and `b` changed.
    ///
    /// The repair starts at whichever endpoint is closer to the start and
    /// still has an allowed edge toward the other one.
    pub fn update_edge<V, E>(&mut self, graph: &Graph<V, E>, a: VertexId, b: VertexId) -> Result<()>
    where
        V: VertexData,
        E: WeightedEdge<Cost = C>,
        F: EdgeFilter<E>,
    {
        let origin = match (self.cost(a), self.cost(b)) {
            (Some(cost_a), Some(cost_b)) => {
                let (near, far) = if cost_a > cost_b { (b, a) } else { (a, b) };
                let usable = graph
                    .edge_between(near, far)
                    .and_then(|id| graph.edge(id))
                    .map_or(false, |edge| self.filter.allow(edge));
                if usable {
                    near
                } else {
                    far
                }
            }
            (Some(_), None) => a,
            (None, Some(_)) => b,
            (None, None) => return Ok(()),
        };
        self.update(graph, origin)
    }

    /// Vertex at the far end of the first edge toward `vertex`.
    pub fn next_hop<V, E>(&self, graph: &Graph<V, E>, vertex: VertexId) -> Option<VertexId>
    where
        V: VertexData,
        E: WeightedEdge<Cost = C>,
    {
        let edge = self.next_hop_link(vertex)?;
        graph.edge(edge).map(|edge| edge.dst)
    }

    /// Restarts a breadth-first walk over the shortest-path tree.
    ///
    /// Completes the tree first if needed.
    pub fn tree_walk_reset<V, E>(&mut self, graph: &Graph<V, E>) -> Result<()>
    where
        V: VertexData,
        E: WeightedEdge<Cost = C>,
        F: EdgeFilter<E>,
    {
        if !self.completed {
            self.recompute(graph)?;
        }
        self.walk.clear(self.walk_queue)?;
        self.marker.reset();
        if let Some(start) = self.start {
            self.walk.append(self.walk_queue, start, ())?;
        }
        Ok(())
    }

    /// Next vertex of the tree walk with its depth in the tree.
    pub fn tree_walk_next<V, E>(&mut self, graph: &Graph<V, E>) -> Option<(VertexId, u32)>
    where
        V: VertexData,
        E: WeightedEdge<Cost = C>,
    {
        let (current, ()) = self.walk.remove_head(self.walk_queue)?;
        let level = self.marker.enter(current);
        let mut first_child = None;
        for edge in graph.adjacency(current) {
            let child = edge.dst;
            if !self.pool.contains(self.visited, child) || self.prev_hop(child) != Some(current) {
                continue;
            }
            if self.walk.append(self.walk_queue, child, ()).is_ok() && first_child.is_none() {
                first_child = Some(child);
            }
        }
        self.marker.leave(first_child);
        Some((current, level))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeRef, Link, WeightedGraph};

    fn diamond() -> Result<(WeightedGraph<String, u32>, Vec<VertexId>)> {
        let mut graph = WeightedGraph::new();
        let v: Vec<VertexId> = ["a", "b", "c", "d"]
            .iter()
            .map(|n| graph.insert_vertex((*n).to_owned()))
            .collect::<Result<_>>()?;
        graph.connect_with_cost(v[0], v[1], 1, true)?;
        graph.connect_with_cost(v[1], v[2], 2, true)?;
        graph.connect_with_cost(v[0], v[2], 5, true)?;
        graph.connect_with_cost(v[2], v[3], 1, true)?;
        Ok((graph, v))
    }

    #[test]
    fn shortest_costs_and_hops() -> Result<()> {
        let (graph, v) = diamond()?;
        let mut paths = DijkstraTraversal::new();
        paths.reset(&graph, v[0])?;
        paths.run(&graph);
        assert!(paths.is_complete());
        assert_eq!(paths.cost(v[0]), Some(0));
        assert_eq!(paths.cost(v[2]), Some(3));
        assert_eq!(paths.cost(v[3]), Some(4));
        assert_eq!(paths.prev_hop(v[3]), Some(v[2]));
        assert_eq!(paths.prev_hop(v[2]), Some(v[1]));
        assert_eq!(paths.next_hop(&graph, v[3]), Some(v[1]));
        assert_eq!(paths.next_hop_link(v[0]), None);
        Ok(())
    }

    #[test]
    fn settles_in_cost_order() -> Result<()> {
        let (graph, v) = diamond()?;
        let mut paths = DijkstraTraversal::new();
        paths.reset(&graph, v[0])?;
        let mut order = Vec::new();
        while let Some(vertex) = paths.next_vertex(&graph) {
            order.push(vertex);
        }
        assert_eq!(order, vec![v[0], v[1], v[2], v[3]]);
        let costs: Vec<u32> = paths.settled_vertices().map(|(_, route)| route.cost).collect();
        assert_eq!(costs, vec![0, 1, 3, 4]);
        Ok(())
    }

    #[test]
    fn update_after_decrease_matches_recompute() -> Result<()> {
        let (mut graph, v) = diamond()?;
        let mut paths = DijkstraTraversal::new();
        paths.reset(&graph, v[0])?;
        paths.run(&graph);
        graph.connect_with_cost(v[0], v[2], 1, true)?;
        paths.update_edge(&graph, v[0], v[2])?;
        assert!(paths.is_complete());
        assert_eq!(paths.cost(v[2]), Some(1));
        assert_eq!(paths.cost(v[3]), Some(2));
        assert_eq!(paths.prev_hop(v[2]), Some(v[0]));
        assert_eq!(paths.next_hop(&graph, v[3]), Some(v[2]));
        Ok(())
    }

    #[test]
    fn update_after_increase_recomputes() -> Result<()> {
        let (mut graph, v) = diamond()?;
        let mut paths = DijkstraTraversal::new();
        paths.reset(&graph, v[0])?;
        paths.run(&graph);
        graph.connect_with_cost(v[1], v[2], 10, true)?;
        paths.update_edge(&graph, v[1], v[2])?;
        assert_eq!(paths.cost(v[2]), Some(5));
        assert_eq!(paths.prev_hop(v[2]), Some(v[0]));
        assert_eq!(paths.cost(v[3]), Some(6));
        Ok(())
    }

    #[test]
    fn removed_vertex_drops_out() -> Result<()> {
        let (mut graph, v) = diamond()?;
        let mut paths = DijkstraTraversal::new();
        paths.reset(&graph, v[0])?;
        paths.run(&graph);
        graph.remove_vertex(v[1])?;
        paths.update(&graph, v[1])?;
        assert_eq!(paths.cost(v[1]), None);
        assert_eq!(paths.cost(v[2]), Some(5));
        assert_eq!(paths.cost(v[3]), Some(6));
        Ok(())
    }

    #[test]
    fn filter_excludes_edges() -> Result<()> {
        let (graph, v) = diamond()?;
        let (from, to) = (v[1], v[2]);
        let filter = move |edge: EdgeRef<'_, Link<u32>>| !(edge.src == from && edge.dst == to);
        let mut paths = DijkstraTraversal::with_filter(filter);
        paths.reset(&graph, v[0])?;
        paths.run(&graph);
        assert_eq!(paths.cost(v[2]), Some(5));
        assert_eq!(paths.prev_hop(v[2]), Some(v[0]));
        Ok(())
    }

    #[test]
    fn tree_walk_reports_depths() -> Result<()> {
        let (graph, v) = diamond()?;
        let mut paths = DijkstraTraversal::new();
        paths.reset(&graph, v[0])?;
        paths.tree_walk_reset(&graph)?;
        let mut walk = Vec::new();
        while let Some(step) = paths.tree_walk_next(&graph) {
            walk.push(step);
        }
        assert_eq!(walk, vec![(v[0], 0), (v[1], 1), (v[2], 2), (v[3], 3)]);
        Ok(())
    }

    #[test]
    fn unreachable_vertices_have_no_cost() -> Result<()> {
        let (mut graph, v) = diamond()?;
        let lonely = graph.insert_vertex("z".into())?;
        let mut paths = DijkstraTraversal::new();
        paths.reset(&graph, v[0])?;
        paths.run(&graph);
        assert_eq!(paths.cost(lonely), None);
        assert_eq!(paths.settled(), 4);
        assert!(!paths.prev_hop_is_valid(&graph, lonely));
        Ok(())
    }

    #[test]
    fn overflowing_paths_are_unreachable() -> Result<()> {
        let mut graph: WeightedGraph<String, u8> = WeightedGraph::new();
        let a = graph.insert_vertex("a".into())?;
        let b = graph.insert_vertex("b".into())?;
        let c = graph.insert_vertex("c".into())?;
        graph.connect_with_cost(a, b, 200, false)?;
        graph.connect_with_cost(b, c, 100, false)?;
        let mut paths = DijkstraTraversal::new();
        paths.reset(&graph, a)?;
        paths.run(&graph);
        assert_eq!(paths.cost(b), Some(200));
        assert_eq!(paths.cost(c), None);

        graph.connect_with_cost(a, c, 250, false)?;
        paths.update(&graph, a)?;
        assert_eq!(paths.cost(c), Some(250));
        assert_eq!(paths.prev_hop(c), Some(a));
        assert!(paths.prev_hop_is_valid(&graph, c));
        Ok(())
    }
}
