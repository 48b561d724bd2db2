//! Intrusive link records and the store traits the index algorithms run on.
//!
//! The algorithms in this module tree never own items. They operate on slot
//! numbers inside some arena and reach the links and keys of a slot through
//! [`TrieStore`] and [`ListStore`]. The marker type `M` selects one set of
//! links when an item carries several (an edge sits in its source's adjacency
//! and in its destination's connector index at the same time).

use crate::primitives::bits::KeyRef;

/// Slot number inside an arena.
pub(crate) type Slot = u32;

/// Absent link.
pub(crate) const NIL: Slot = u32::MAX;

/// Trie position of an item: parent, two children and the decision bit.
///
/// A child link whose target has this node as parent is a tree edge. Any
/// other child link points back up (or at the node itself) and marks the
/// target as the leaf reached through it.
#[derive(Copy, Clone, Debug)]
pub struct TrieLinks {
    pub(crate) parent: Slot,
    pub(crate) left: Slot,
    pub(crate) right: Slot,
    pub(crate) bit: u32,
    pub(crate) linked: bool,
}

impl Default for TrieLinks {
    fn default() -> Self {
        Self {
            parent: NIL,
            left: NIL,
            right: NIL,
            bit: 0,
            linked: false,
        }
    }
}

impl TrieLinks {
    /// Returns true when the item is reachable from the trie root.
    pub fn is_linked(&self) -> bool {
        self.linked
    }

    pub(crate) fn child(&self, right: bool) -> Slot {
        if right {
            self.right
        } else {
            self.left
        }
    }

    pub(crate) fn set_child(&mut self, right: bool, to: Slot) {
        if right {
            self.right = to;
        } else {
            self.left = to;
        }
    }
}

/// Doubly-linked list position of an item.
#[derive(Copy, Clone, Debug)]
pub struct ListLinks {
    pub(crate) prev: Slot,
    pub(crate) next: Slot,
    pub(crate) linked: bool,
}

impl Default for ListLinks {
    fn default() -> Self {
        Self {
            prev: NIL,
            next: NIL,
            linked: false,
        }
    }
}

impl ListLinks {
    /// Returns true when the item is threaded into a list.
    pub fn is_linked(&self) -> bool {
        self.linked
    }
}

/// Access to the trie links and key of slots in a store.
pub(crate) trait TrieStore<M = ()> {
    fn trie_links(&self, at: Slot) -> &TrieLinks;
    fn trie_links_mut(&mut self, at: Slot) -> &mut TrieLinks;
    fn trie_key(&self, at: Slot) -> KeyRef<'_>;
}

/// Access to the list links of slots in a store.
pub(crate) trait ListStore<M = ()> {
    fn list_links(&self, at: Slot) -> &ListLinks;
    fn list_links_mut(&mut self, at: Slot) -> &mut ListLinks;
}
