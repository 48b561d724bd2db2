//! Vertex and edge slots and the link views the index algorithms run on.
//!
//! A vertex slot carries its own adjacency (outgoing edges ordered by edge
//! key) and connector index (incoming edges keyed by source). Both are
//! intrusive: the links live in the edge slots, one set per role, selected
//! by the marker types below.

use crate::index::links::{ListLinks, ListStore, Slot, TrieLinks, TrieStore};
use crate::index::patricia::PatriciaCore;
use crate::index::sorted::SortedCore;
use crate::primitives::arena::{Arena, Handle};
use crate::primitives::bits::{KeyBuf, KeyRef};

use super::{EdgeData, VertexData};

/// Links of a vertex inside the graph-wide vertex index.
pub(crate) struct VertexIndex;
/// Links of an edge inside its source's adjacency.
pub(crate) struct Adjacency;
/// Links of an edge inside its destination's connector index.
pub(crate) struct Connectors;

pub(crate) struct VertexSlot<V> {
    pub(crate) data: V,
    pub(crate) index_trie: TrieLinks,
    pub(crate) index_list: ListLinks,
    pub(crate) adjacency: SortedCore<Adjacency>,
    pub(crate) connectors: PatriciaCore<Connectors>,
}

impl<V> VertexSlot<V> {
    pub(crate) fn new(data: V) -> Self {
        Self {
            data,
            index_trie: TrieLinks::default(),
            index_list: ListLinks::default(),
            adjacency: SortedCore::new(false),
            connectors: PatriciaCore::new(),
        }
    }
}

pub(crate) struct EdgeSlot<E> {
    pub(crate) data: E,
    pub(crate) src: Handle,
    pub(crate) dst: Handle,
    pub(crate) order: KeyBuf,
    pub(crate) adjacency_trie: TrieLinks,
    pub(crate) adjacency_list: ListLinks,
    pub(crate) tracker: TrieLinks,
    pub(crate) tracker_key: [u8; 8],
}

impl<E: EdgeData> EdgeSlot<E> {
    pub(crate) fn new(data: E, src: Handle, dst: Handle) -> Self {
        let order = data
            .edge_key()
            .unwrap_or_else(|| KeyBuf::from_slice(&dst.to_key_bytes()));
        Self {
            data,
            src,
            dst,
            order,
            adjacency_trie: TrieLinks::default(),
            adjacency_list: ListLinks::default(),
            tracker: TrieLinks::default(),
            tracker_key: src.to_key_bytes(),
        }
    }

    /// Recomputes the adjacency key after the payload changed.
    pub(crate) fn refresh_order(&mut self) {
        self.order = self
            .data
            .edge_key()
            .unwrap_or_else(|| KeyBuf::from_slice(&self.dst.to_key_bytes()));
    }
}

impl<V: VertexData> TrieStore<VertexIndex> for Arena<VertexSlot<V>> {
    fn trie_links(&self, at: Slot) -> &TrieLinks {
        &self.at(at).index_trie
    }

    fn trie_links_mut(&mut self, at: Slot) -> &mut TrieLinks {
        &mut self.at_mut(at).index_trie
    }

    fn trie_key(&self, at: Slot) -> KeyRef<'_> {
        self.at(at).data.vertex_key()
    }
}

impl<V> ListStore<VertexIndex> for Arena<VertexSlot<V>> {
    fn list_links(&self, at: Slot) -> &ListLinks {
        &self.at(at).index_list
    }

    fn list_links_mut(&mut self, at: Slot) -> &mut ListLinks {
        &mut self.at_mut(at).index_list
    }
}

impl<E> TrieStore<Adjacency> for Arena<EdgeSlot<E>> {
    fn trie_links(&self, at: Slot) -> &TrieLinks {
        &self.at(at).adjacency_trie
    }

    fn trie_links_mut(&mut self, at: Slot) -> &mut TrieLinks {
        &mut self.at_mut(at).adjacency_trie
    }

    fn trie_key(&self, at: Slot) -> KeyRef<'_> {
        self.at(at).order.as_key()
    }
}

impl<E> ListStore<Adjacency> for Arena<EdgeSlot<E>> {
    fn list_links(&self, at: Slot) -> &ListLinks {
        &self.at(at).adjacency_list
    }

    fn list_links_mut(&mut self, at: Slot) -> &mut ListLinks {
        &mut self.at_mut(at).adjacency_list
    }
}

impl<E> TrieStore<Connectors> for Arena<EdgeSlot<E>> {
    fn trie_links(&self, at: Slot) -> &TrieLinks {
        &self.at(at).tracker
    }

    fn trie_links_mut(&mut self, at: Slot) -> &mut TrieLinks {
        &mut self.at_mut(at).tracker
    }

    fn trie_key(&self, at: Slot) -> KeyRef<'_> {
        KeyRef::from_bytes(&self.at(at).tracker_key)
    }
}
