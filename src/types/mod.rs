#![forbid(unsafe_code)]
//! Stable identifiers handed out by indexes, graphs and queue pools.
//!
//! Each identifier wraps an arena handle, so it goes stale once the thing it
//! names is removed and is never confused with an identifier from another
//! container.

use std::fmt;

use crate::primitives::arena::Handle;

/// Item stored in a [`PatriciaIndex`](crate::index::PatriciaIndex) or
/// [`SortedIndex`](crate::index::SortedIndex).
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct ItemId(pub(crate) Handle);
/// Graph vertex.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct VertexId(pub(crate) Handle);
/// Directed graph edge.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct EdgeId(pub(crate) Handle);
/// Queue of a [`QueuePool`](crate::graph::QueuePool).
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct QueueId(pub(crate) Handle);

macro_rules! display_handle {
    ($($ty:ident => $prefix:literal),* $(,)?) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, concat!($prefix, "{}.{}"), self.0.index(), self.0.generation())
                }
            }

            impl $ty {
                /// Underlying arena handle.
                pub fn handle(&self) -> Handle {
                    self.0
                }
            }
        )*
    };
}

display_handle! {
    ItemId => "i",
    VertexId => "v",
    EdgeId => "e",
    QueueId => "q",
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::arena::Arena;

    #[test]
    fn display_shows_slot_and_generation() {
        let mut arena = Arena::new();
        let first = arena.insert(1u8);
        arena.remove(first);
        let second = arena.insert(2u8);
        assert_eq!(VertexId(first).to_string(), "v0.0");
        assert_eq!(VertexId(second).to_string(), "v0.1");
        assert_ne!(VertexId(first), VertexId(second));
    }
}
