//! Vereda: ordered key indexes and a graph engine built on them.
//!
//! The crate is layered. [`primitives`] holds the slot arena and key bit
//! helpers. [`index`] builds the Patricia trie and the sorted index with
//! duplicate keys on top of them. [`graph`] uses those indexes for vertex
//! lookup, cost-ordered adjacency and queue membership, and [`traversal`]
//! walks graphs with breadth-first, depth-first and shortest-path orders.

#![warn(missing_docs)]

pub mod error;
pub mod graph;
pub mod index;
pub mod primitives;
pub mod traversal;
pub mod types;

pub use error::{Result, VeredaError};
pub use graph::{
    Cost, EdgeData, EdgeRef, Graph, GraphOptions, Link, QueueKind, QueuePool, VertexData,
    WeightedEdge, WeightedGraph,
};
pub use index::{Bound, PatriciaIndex, SortedIndex};
pub use primitives::bits::{IndexKey, KeyBuf, KeyRef};
pub use traversal::{DijkstraTraversal, SimpleTraversal, TraversalOptions, Visit};
pub use types::{EdgeId, ItemId, QueueId, VertexId};
