//! Cost-weighted graphs.
//!
//! A [`WeightedGraph`] is a [`Graph`] whose edges carry a [`Link`]. The link
//! cost doubles as the adjacency key, so every adjacency is walked in cost
//! order.

use std::fmt::Debug;

use tracing::warn;

use super::{EdgeData, Graph, VertexData};
use crate::error::{Result, VeredaError};
use crate::primitives::bits::KeyBuf;
use crate::types::{EdgeId, VertexId};

/// Edge weight used by shortest-path traversal.
///
/// Costs add along a path and compare with `PartialOrd`. The index key must
/// order the same way the values compare.
pub trait Cost: Copy + PartialOrd + Debug {
    /// Cost of the empty path.
    fn minimum() -> Self;

    /// Sum of two costs, or `None` when it does not fit the type.
    fn checked_add(self, other: Self) -> Option<Self>;

    /// Key that sorts like the value.
    fn index_key(&self) -> KeyBuf;

    /// Returns false for values that cannot be ordered, such as NaN.
    fn is_valid(&self) -> bool {
        true
    }
}

macro_rules! int_cost {
    ($($ty:ty => $key:ident),* $(,)?) => {
        $(
            impl Cost for $ty {
                fn minimum() -> Self {
                    0
                }

                fn checked_add(self, other: Self) -> Option<Self> {
                    <$ty>::checked_add(self, other)
                }

                fn index_key(&self) -> KeyBuf {
                    KeyBuf::$key(*self)
                }
            }
        )*
    };
}

int_cost! {
    u8 => from_u8,
    u16 => from_u16,
    u32 => from_u32,
    u64 => from_u64,
    i32 => from_i32,
    i64 => from_i64,
}

impl Cost for f64 {
    fn minimum() -> Self {
        0.0
    }

    fn checked_add(self, other: Self) -> Option<Self> {
        let sum = self + other;
        sum.is_finite().then_some(sum)
    }

    fn index_key(&self) -> KeyBuf {
        KeyBuf::from_f64(*self)
    }

    fn is_valid(&self) -> bool {
        !self.is_nan()
    }
}

impl Cost for f32 {
    fn minimum() -> Self {
        0.0
    }

    fn checked_add(self, other: Self) -> Option<Self> {
        let sum = self + other;
        sum.is_finite().then_some(sum)
    }

    fn index_key(&self) -> KeyBuf {
        KeyBuf::from_f32(*self)
    }

    fn is_valid(&self) -> bool {
        !self.is_nan()
    }
}

/// Edge payload that exposes a cost.
pub trait WeightedEdge: EdgeData {
    /// Cost type of the edge.
    type Cost: Cost;

    /// Current cost.
    fn cost(&self) -> Self::Cost;
}

/// Weighted edge payload.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Link<C> {
    /// Cost of crossing the edge.
    pub cost: C,
}

impl<C: Cost> Link<C> {
    /// Creates a link with the given cost.
    pub fn new(cost: C) -> Self {
        Self { cost }
    }
}

impl<C: Cost> EdgeData for Link<C> {
    fn edge_key(&self) -> Option<KeyBuf> {
        Some(self.cost.index_key())
    }
}

impl<C: Cost> WeightedEdge for Link<C> {
    type Cost = C;

    fn cost(&self) -> C {
        self.cost
    }
}

/// Graph whose edges are ordered by cost.
pub type WeightedGraph<V, C> = Graph<V, Link<C>>;

impl<V: VertexData, C: Cost> Graph<V, Link<C>> {
    /// Connects `src -> dst` (and `dst -> src` when `duplex`) with `cost`.
    ///
    /// An existing edge is given the new cost instead. The duplex form
    /// leaves the graph unchanged if the second direction fails.
    pub fn connect_with_cost(
        &mut self,
        src: VertexId,
        dst: VertexId,
        cost: C,
        duplex: bool,
    ) -> Result<EdgeId> {
        if !cost.is_valid() {
            return Err(VeredaError::Invalid("cost cannot be ordered"));
        }
        let previous = self.cost(src, dst);
        let forward = self.set_cost(src, dst, cost)?;
        if duplex && src != dst {
            if let Err(err) = self.set_cost(dst, src, cost) {
                match previous {
                    Some(old) => {
                        self.reconnect(forward, Link::new(old))?;
                    }
                    None => {
                        self.remove_edge(forward)?;
                    }
                }
                return Err(err);
            }
        }
        Ok(forward)
    }

    fn set_cost(&mut self, src: VertexId, dst: VertexId, cost: C) -> Result<EdgeId> {
        match self.edge_between(src, dst) {
            Some(edge) => {
                warn!(%src, %dst, ?cost, "graph.edge.recosted");
                self.reconnect(edge, Link::new(cost))?;
                Ok(edge)
            }
            None => self.connect(src, dst, Link::new(cost)),
        }
    }

    /// Changes the cost of an existing edge and re-sorts it.
    pub fn reconnect_with_cost(&mut self, edge: EdgeId, cost: C) -> Result<C> {
        if !cost.is_valid() {
            return Err(VeredaError::Invalid("cost cannot be ordered"));
        }
        self.reconnect(edge, Link::new(cost)).map(|old| old.cost)
    }

    /// Cost of `src -> dst`.
    pub fn cost(&self, src: VertexId, dst: VertexId) -> Option<C> {
        let edge = self.edge_between(src, dst)?;
        self.edge(edge).map(|edge| edge.data.cost)
    }
}
