use tracing::{debug, trace, warn};

use super::iter::EdgeRef;
use super::store::EdgeSlot;
use super::{EdgeData, Graph, VertexData};
use crate::error::{Result, VeredaError};
use crate::primitives::bits::KeyRef;
use crate::types::{EdgeId, VertexId};

impl<V: VertexData, E: EdgeData> Graph<V, E> {
    /// Adds the edge `src -> dst`.
    ///
    /// Fails with [`VeredaError::AlreadyConnected`] if the pair already has
    /// an edge and with [`VeredaError::PoolExhausted`] once the configured
    /// edge limit is reached.
    pub fn connect(&mut self, src: VertexId, dst: VertexId, data: E) -> Result<EdgeId> {
        self.check_vertex(src)?;
        self.check_vertex(dst)?;
        if self.edge_between(src, dst).is_some() {
            warn!(%src, %dst, "graph.edge.already_connected");
            return Err(VeredaError::AlreadyConnected);
        }
        if let Some(limit) = self.options().edge_pool_limit {
            if self.edges.len() >= limit {
                warn!(limit, "graph.edge.pool_exhausted");
                return Err(VeredaError::PoolExhausted("edge pool"));
            }
        }
        let recycled = self.edges.pooled() > 0;
        let handle = self.edges.insert(EdgeSlot::new(data, src.0, dst.0));
        let slot = handle.index();
        self.vertices
            .at_mut(src.0.index())
            .adjacency
            .insert(&mut self.edges, slot);
        self.vertices
            .at_mut(dst.0.index())
            .connectors
            .insert(&mut self.edges, slot);
        self.metrics().edge_connected(recycled);
        let id = EdgeId(handle);
        trace!(edge = %id, %src, %dst, recycled, "graph.edge.connected");
        Ok(id)
    }

    /// Adds `a -> b` and `b -> a` with the same payload. Either both edges
    /// are added or neither is.
    pub fn connect_duplex(&mut self, a: VertexId, b: VertexId, data: E) -> Result<(EdgeId, EdgeId)>
    where
        E: Clone,
    {
        let forward = self.connect(a, b, data.clone())?;
        match self.connect(b, a, data) {
            Ok(backward) => Ok((forward, backward)),
            Err(err) => {
                self.unlink_edge(forward.0.index());
                Err(err)
            }
        }
    }

    /// Replaces the payload of an edge and re-sorts it in its source's
    /// adjacency. Returns the previous payload.
    pub fn reconnect(&mut self, edge: EdgeId, data: E) -> Result<E> {
        if !self.edges.contains(edge.0) {
            return Err(VeredaError::UnknownEdge);
        }
        let slot = edge.0.index();
        let src = self.edges.at(slot).src.index();
        self.vertices
            .at_mut(src)
            .adjacency
            .remove(&mut self.edges, slot);
        let previous = {
            let entry = self.edges.at_mut(slot);
            let previous = std::mem::replace(&mut entry.data, data);
            entry.refresh_order();
            previous
        };
        self.vertices
            .at_mut(src)
            .adjacency
            .insert(&mut self.edges, slot);
        trace!(%edge, "graph.edge.reconnected");
        Ok(previous)
    }

    /// Removes `src -> dst`, and `dst -> src` as well when `duplex` is set.
    /// Returns how many edges were removed.
    pub fn disconnect(&mut self, src: VertexId, dst: VertexId, duplex: bool) -> Result<usize> {
        self.check_vertex(src)?;
        self.check_vertex(dst)?;
        let mut removed = 0;
        if let Some(edge) = self.edge_between(src, dst) {
            self.unlink_edge(edge.0.index());
            removed += 1;
        }
        if duplex && src != dst {
            if let Some(edge) = self.edge_between(dst, src) {
                self.unlink_edge(edge.0.index());
                removed += 1;
            }
        }
        debug!(%src, %dst, duplex, removed, "graph.edge.disconnected");
        Ok(removed)
    }

    /// Removes one edge and returns its payload.
    pub fn remove_edge(&mut self, edge: EdgeId) -> Result<E> {
        if !self.edges.contains(edge.0) {
            return Err(VeredaError::UnknownEdge);
        }
        Ok(self.unlink_edge(edge.0.index()))
    }

    // Takes the edge out of both endpoint indexes and pools its slot.
    pub(crate) fn unlink_edge(&mut self, slot: u32) -> E {
        let (src, dst) = {
            let entry = self.edges.at(slot);
            (entry.src.index(), entry.dst.index())
        };
        self.vertices
            .at_mut(src)
            .adjacency
            .remove(&mut self.edges, slot);
        self.vertices
            .at_mut(dst)
            .connectors
            .remove(&mut self.edges, slot);
        let entry = self
            .edges
            .handle_at(slot)
            .and_then(|handle| self.edges.remove(handle))
            .expect("linked edge slot must be live");
        self.metrics().edge_disconnected();
        entry.data
    }

    /// Edge `src -> dst`, found through the connector index of `dst`.
    pub fn edge_between(&self, src: VertexId, dst: VertexId) -> Option<EdgeId> {
        let target = self.vertices.get(dst.0)?;
        let key = src.0.to_key_bytes();
        target
            .connectors
            .find(&self.edges, KeyRef::from_bytes(&key))
            .and_then(|slot| self.edges.handle_at(slot))
            .map(EdgeId)
    }

    /// Returns true when `src -> dst` exists.
    pub fn has_edge(&self, src: VertexId, dst: VertexId) -> bool {
        self.edge_between(src, dst).is_some()
    }

    /// Edge behind `edge`.
    pub fn edge(&self, edge: EdgeId) -> Option<EdgeRef<'_, E>> {
        self.edges
            .get(edge.0)
            .map(|entry| EdgeRef::new(edge, entry))
    }

    /// Number of outgoing edges of `v`.
    pub fn adjacency_count(&self, v: VertexId) -> usize {
        self.vertices
            .get(v.0)
            .map_or(0, |slot| slot.adjacency.len())
    }

    /// Number of incoming edges of `v`.
    pub fn connector_count(&self, v: VertexId) -> usize {
        self.vertices
            .get(v.0)
            .map_or(0, |slot| slot.connectors.len())
    }
}
