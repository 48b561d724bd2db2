use crate::index::links::Slot;
use crate::index::patricia::LeafWalk;
use crate::index::sorted::SortedCore;
use crate::primitives::arena::Arena;
use crate::types::{EdgeId, VertexId};

use super::store::{Adjacency, Connectors, EdgeSlot};
use super::{EdgeData, Graph, VertexData};

/// Borrowed view of one edge.
pub struct EdgeRef<'a, E> {
    /// Identifier of the edge.
    pub id: EdgeId,
    /// Source vertex.
    pub src: VertexId,
    /// Destination vertex.
    pub dst: VertexId,
    /// Edge payload.
    pub data: &'a E,
}

impl<'a, E> EdgeRef<'a, E> {
    pub(crate) fn new(id: EdgeId, entry: &'a EdgeSlot<E>) -> Self {
        Self {
            id,
            src: VertexId(entry.src),
            dst: VertexId(entry.dst),
            data: &entry.data,
        }
    }
}

impl<E> Clone for EdgeRef<'_, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for EdgeRef<'_, E> {}

fn edge_at<E>(edges: &Arena<EdgeSlot<E>>, slot: Slot) -> Option<EdgeRef<'_, E>> {
    let handle = edges.handle_at(slot)?;
    Some(EdgeRef::new(EdgeId(handle), edges.at(slot)))
}

/// Vertices of a graph in key order.
pub struct Vertices<'a, V, E> {
    graph: &'a Graph<V, E>,
    next: Option<Slot>,
}

impl<'a, V, E> Vertices<'a, V, E> {
    pub(crate) fn new(graph: &'a Graph<V, E>, first: Option<Slot>) -> Self {
        Self { graph, next: first }
    }
}

impl<'a, V: VertexData, E: EdgeData> Iterator for Vertices<'a, V, E> {
    type Item = (VertexId, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.next?;
        self.next = self.graph.next_vertex_slot(slot);
        let handle = self.graph.vertices.handle_at(slot)?;
        Some((VertexId(handle), &self.graph.vertices.at(slot).data))
    }
}

/// Outgoing edges of a vertex in edge-key order.
pub struct AdjacencyIter<'a, E> {
    edges: &'a Arena<EdgeSlot<E>>,
    core: Option<&'a SortedCore<Adjacency>>,
    next: Option<Slot>,
}

impl<'a, E> Iterator for AdjacencyIter<'a, E> {
    type Item = EdgeRef<'a, E>;

    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.next?;
        self.next = self.core.and_then(|core| core.next(self.edges, slot));
        edge_at(self.edges, slot)
    }
}

/// Destinations of the outgoing edges of a vertex.
pub struct Neighbors<'a, E> {
    inner: AdjacencyIter<'a, E>,
}

impl<E> Iterator for Neighbors<'_, E> {
    type Item = VertexId;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|edge| edge.dst)
    }
}

/// Incoming edges of a vertex, ordered by source identifier.
pub struct ConnectorIter<'a, E> {
    edges: &'a Arena<EdgeSlot<E>>,
    walk: LeafWalk<Connectors>,
}

impl<'a, E> Iterator for ConnectorIter<'a, E> {
    type Item = EdgeRef<'a, E>;

    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.walk.next(self.edges)?;
        edge_at(self.edges, slot)
    }
}

impl<V: VertexData, E: EdgeData> Graph<V, E> {
    /// Outgoing edges of `v` in edge-key order. Empty for an unknown vertex.
    pub fn adjacency(&self, v: VertexId) -> AdjacencyIter<'_, E> {
        let core = self.vertices.get(v.0).map(|slot| &slot.adjacency);
        AdjacencyIter {
            edges: &self.edges,
            core,
            next: core.and_then(|core| core.first()),
        }
    }

    /// Destinations reachable over one outgoing edge of `v`.
    pub fn neighbors(&self, v: VertexId) -> Neighbors<'_, E> {
        Neighbors {
            inner: self.adjacency(v),
        }
    }

    /// Incoming edges of `v`. Empty for an unknown vertex.
    pub fn connectors(&self, v: VertexId) -> ConnectorIter<'_, E> {
        let walk = match self.vertices.get(v.0) {
            Some(slot) => slot.connectors.walk(false),
            None => LeafWalk::empty(false),
        };
        ConnectorIter {
            edges: &self.edges,
            walk,
        }
    }
}
