//! Patricia trie over arbitrary-length bit-string keys.
//!
//! Every item is a trie node (no wrapper allocation). The root item hangs the
//! whole tree off its left link; every other item is an internal branch that
//! tests one bit. Each item is also reached exactly once through a link that
//! does not descend (an up-link or self-link), and that link is where the item
//! sits as a leaf. Leaves read left to right are in lexical order of the
//! extended key.

use std::marker::PhantomData;

use smallvec::SmallVec;
use tracing::{trace, warn};

use super::links::{Slot, TrieLinks, TrieStore, NIL};
use crate::error::{Result, VeredaError};
use crate::primitives::arena::{Arena, Handle};
use crate::primitives::bits::{first_difference, IndexKey, KeyBuf, KeyRef};
use crate::types::ItemId;

/// Lexical bound used by ordered lookups.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Bound {
    /// Greatest key `<=` the query key.
    Floor,
    /// Least key `>=` the query key.
    Ceil,
    /// Greatest key `<` the query key.
    Below,
    /// Least key `>` the query key.
    Above,
}

impl Bound {
    /// Same bound with the direction flipped.
    pub fn mirror(self) -> Bound {
        match self {
            Bound::Floor => Bound::Ceil,
            Bound::Ceil => Bound::Floor,
            Bound::Below => Bound::Above,
            Bound::Above => Bound::Below,
        }
    }

    /// Returns true for bounds that look towards larger keys.
    pub fn is_forward(self) -> bool {
        matches!(self, Bound::Ceil | Bound::Above)
    }
}

#[derive(Copy, Clone, Debug)]
struct Step {
    node: Slot,
    right: bool,
}

type Path = SmallVec<[Step; 32]>;

/// Trie header. Item storage is supplied on every call.
pub(crate) struct PatriciaCore<M = ()> {
    root: Slot,
    len: usize,
    _marker: PhantomData<fn() -> M>,
}

impl<M> Default for PatriciaCore<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> PatriciaCore<M> {
    pub(crate) fn new() -> Self {
        Self {
            root: NIL,
            len: 0,
            _marker: PhantomData,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.root == NIL
    }

    fn is_down<S: TrieStore<M>>(store: &S, from: Slot, to: Slot) -> bool {
        to != NIL && store.trie_links(to).parent == from
    }

    // Link followed out of `node` for `key`. The root only uses its left link.
    fn branch(&self, store: &impl TrieStore<M>, node: Slot, key: KeyRef<'_>) -> (bool, Slot) {
        let links = store.trie_links(node);
        if node == self.root {
            (false, links.left)
        } else {
            let right = key.bit(links.bit);
            (right, links.child(right))
        }
    }

    // Node holding the non-descending link that `key` ends on, and that leaf.
    fn search(&self, store: &impl TrieStore<M>, key: KeyRef<'_>) -> (Slot, Slot) {
        let mut parent = self.root;
        let (_, mut node) = self.branch(store, parent, key);
        while Self::is_down(store, parent, node) {
            parent = node;
            node = self.branch(store, node, key).1;
        }
        (parent, node)
    }

    /// Links `at` into the trie. Returns false if an equal key is present.
    pub(crate) fn insert<S: TrieStore<M>>(&mut self, store: &mut S, at: Slot) -> bool {
        if store.trie_links(at).linked {
            return false;
        }
        if self.root == NIL {
            *store.trie_links_mut(at) = TrieLinks {
                parent: NIL,
                left: at,
                right: NIL,
                bit: 0,
                linked: true,
            };
            self.root = at;
            self.len = 1;
            return true;
        }
        let (parent, side, child, bit, own_side) = {
            let key = store.trie_key(at);
            let (_, leaf) = self.search(store, key);
            let Some(bit) = first_difference(key, store.trie_key(leaf)) else {
                return false;
            };
            let mut parent = self.root;
            let (mut side, mut child) = self.branch(store, parent, key);
            while Self::is_down(store, parent, child) && store.trie_links(child).bit < bit {
                parent = child;
                (side, child) = self.branch(store, child, key);
            }
            (parent, side, child, bit, key.bit(bit))
        };
        let child_is_down = Self::is_down(store, parent, child);
        {
            let links = store.trie_links_mut(at);
            links.parent = parent;
            links.bit = bit;
            links.linked = true;
            links.set_child(own_side, at);
            links.set_child(!own_side, child);
        }
        store.trie_links_mut(parent).set_child(side, at);
        if child_is_down {
            store.trie_links_mut(child).parent = at;
        }
        self.len += 1;
        trace!(slot = at, bit, "index.trie.inserted");
        true
    }

    fn replace_child<S: TrieStore<M>>(store: &mut S, parent: Slot, old: Slot, new: Slot) {
        let links = store.trie_links_mut(parent);
        if links.left == old {
            links.left = new;
        } else {
            links.right = new;
        }
    }

    /// Unlinks `at`. Returns false if it was not in this trie.
    pub(crate) fn remove<S: TrieStore<M>>(&mut self, store: &mut S, at: Slot) -> bool {
        if self.root == NIL || !store.trie_links(at).linked {
            return false;
        }
        let (holder, leaf) = {
            let key = store.trie_key(at);
            self.search(store, key)
        };
        if leaf != at {
            warn!(slot = at, "index.trie.remove_unreachable");
            return false;
        }
        if holder == at {
            // `at` points at itself: splice its other link into its parent.
            if at == self.root {
                self.root = NIL;
            } else {
                let links = *store.trie_links(at);
                let other = if links.left == at {
                    links.right
                } else {
                    links.left
                };
                Self::replace_child(store, links.parent, at, other);
                if Self::is_down(store, at, other) {
                    store.trie_links_mut(other).parent = links.parent;
                }
            }
        } else {
            // `holder` is the predecessor whose link reaches `at`: detach it
            // and move it into the slot `at` occupied.
            let holder_links = *store.trie_links(holder);
            let sibling = if holder_links.left == at {
                holder_links.right
            } else {
                holder_links.left
            };
            let grand = holder_links.parent;
            Self::replace_child(store, grand, holder, sibling);
            if Self::is_down(store, holder, sibling) {
                store.trie_links_mut(sibling).parent = grand;
            }
            let removed = *store.trie_links(at);
            {
                let links = store.trie_links_mut(holder);
                links.parent = removed.parent;
                links.left = removed.left;
                links.right = removed.right;
                links.bit = removed.bit;
            }
            for child in [removed.left, removed.right] {
                if Self::is_down(store, at, child) {
                    store.trie_links_mut(child).parent = holder;
                }
            }
            if at == self.root {
                self.root = holder;
            } else {
                Self::replace_child(store, removed.parent, at, holder);
            }
        }
        *store.trie_links_mut(at) = TrieLinks::default();
        self.len -= 1;
        trace!(slot = at, "index.trie.removed");
        true
    }

    /// Exact lookup.
    pub(crate) fn find<S: TrieStore<M>>(&self, store: &S, key: KeyRef<'_>) -> Option<Slot> {
        if self.root == NIL {
            return None;
        }
        let (_, leaf) = self.search(store, key);
        store.trie_key(leaf).same_key(&key).then_some(leaf)
    }

    /// Structural neighbour reached by following `key` no deeper than its length.
    pub(crate) fn find_closest<S: TrieStore<M>>(&self, store: &S, key: KeyRef<'_>) -> Option<Slot> {
        if self.root == NIL {
            return None;
        }
        let mut parent = self.root;
        let (_, mut node) = self.branch(store, parent, key);
        while Self::is_down(store, parent, node) && store.trie_links(node).bit < key.bits() {
            parent = node;
            node = self.branch(store, node, key).1;
        }
        Some(node)
    }

    /// Longest stored key that is a prefix of `key`.
    pub(crate) fn find_prefix<S: TrieStore<M>>(&self, store: &S, key: KeyRef<'_>) -> Option<Slot> {
        if self.root == NIL {
            return None;
        }
        (0..=key.bits())
            .rev()
            .find_map(|len| self.find(store, key.truncate(len)))
    }

    /// Link whose subtree holds every key starting with `prefix`.
    pub(crate) fn prefix_subtree<S: TrieStore<M>>(
        &self,
        store: &S,
        prefix: KeyRef<'_>,
    ) -> Option<(Slot, bool)> {
        if self.root == NIL {
            return None;
        }
        let mut parent = self.root;
        let (mut side, mut node) = self.branch(store, parent, prefix);
        while Self::is_down(store, parent, node) && store.trie_links(node).bit < prefix.bits() {
            parent = node;
            (side, node) = self.branch(store, node, prefix);
        }
        Some((parent, side))
    }

    fn first_under<S: TrieStore<M>>(&self, store: &S, node: Slot, right: bool) -> Slot {
        self.edge_under(store, node, right, false)
    }

    fn last_under<S: TrieStore<M>>(&self, store: &S, node: Slot, right: bool) -> Slot {
        self.edge_under(store, node, right, true)
    }

    // Leftmost (or rightmost) leaf below the link `node.child(right)`.
    fn edge_under<S: TrieStore<M>>(&self, store: &S, node: Slot, right: bool, last: bool) -> Slot {
        let mut parent = node;
        let mut child = store.trie_links(node).child(right);
        while Self::is_down(store, parent, child) {
            parent = child;
            child = store.trie_links(child).child(last);
        }
        child
    }

    pub(crate) fn first<S: TrieStore<M>>(&self, store: &S) -> Option<Slot> {
        (self.root != NIL).then(|| self.first_under(store, self.root, false))
    }

    pub(crate) fn last<S: TrieStore<M>>(&self, store: &S) -> Option<Slot> {
        (self.root != NIL).then(|| self.last_under(store, self.root, false))
    }

    fn descend<S: TrieStore<M>>(&self, store: &S, key: KeyRef<'_>) -> (Path, Slot) {
        let mut path = Path::new();
        path.push(Step {
            node: self.root,
            right: false,
        });
        let mut parent = self.root;
        let mut node = store.trie_links(parent).left;
        while Self::is_down(store, parent, node) {
            let right = key.bit(store.trie_links(node).bit);
            path.push(Step { node, right });
            parent = node;
            node = store.trie_links(node).child(right);
        }
        (path, node)
    }

    // First leaf after the subtree at the last step of `path`.
    fn after<S: TrieStore<M>>(&self, store: &S, path: &[Step]) -> Option<Slot> {
        path.iter()
            .skip(1)
            .rev()
            .find(|step| !step.right)
            .map(|step| self.first_under(store, step.node, true))
    }

    // Last leaf before the subtree at the last step of `path`.
    fn before<S: TrieStore<M>>(&self, store: &S, path: &[Step]) -> Option<Slot> {
        path.iter()
            .skip(1)
            .rev()
            .find(|step| step.right)
            .map(|step| self.last_under(store, step.node, false))
    }

    /// Ordered lookup relative to `key`, which need not be stored.
    pub(crate) fn bound<S: TrieStore<M>>(
        &self,
        store: &S,
        key: KeyRef<'_>,
        bound: Bound,
    ) -> Option<Slot> {
        if self.root == NIL {
            return None;
        }
        let (mut path, leaf) = self.descend(store, key);
        let Some(bit) = first_difference(key, store.trie_key(leaf)) else {
            return match bound {
                Bound::Floor | Bound::Ceil => Some(leaf),
                Bound::Below => self.before(store, &path),
                Bound::Above => self.after(store, &path),
            };
        };
        // Keep only the steps above the differing bit. Everything below the
        // last kept link shares every bit before `bit` with `key` and sits on
        // the same side of it.
        let mut keep = 1;
        while keep < path.len() && store.trie_links(path[keep].node).bit < bit {
            keep += 1;
        }
        path.truncate(keep);
        let Step { node, right } = path[keep - 1];
        if key.bit(bit) {
            match bound {
                Bound::Floor | Bound::Below => Some(self.last_under(store, node, right)),
                Bound::Ceil | Bound::Above => self.after(store, &path),
            }
        } else {
            match bound {
                Bound::Ceil | Bound::Above => Some(self.first_under(store, node, right)),
                Bound::Floor | Bound::Below => self.before(store, &path),
            }
        }
    }

    /// Lexical neighbour of a linked item.
    pub(crate) fn neighbor<S: TrieStore<M>>(&self, store: &S, at: Slot, bound: Bound) -> Option<Slot> {
        self.bound(store, store.trie_key(at), bound)
    }

    /// Unlinks every item.
    pub(crate) fn clear<S: TrieStore<M>>(&mut self, store: &mut S) {
        if self.root == NIL {
            return;
        }
        let mut stack: SmallVec<[Slot; 32]> = SmallVec::new();
        stack.push(self.root);
        while let Some(node) = stack.pop() {
            let links = *store.trie_links(node);
            for child in [links.left, links.right] {
                if Self::is_down(store, node, child) {
                    stack.push(child);
                }
            }
            *store.trie_links_mut(node) = TrieLinks::default();
        }
        self.root = NIL;
        self.len = 0;
    }

    pub(crate) fn walk(&self, reverse: bool) -> LeafWalk<M> {
        let mut walk = LeafWalk::empty(reverse);
        if self.root != NIL {
            walk.stack.push((self.root, false));
        }
        walk
    }

    pub(crate) fn walk_under(&self, node: Slot, right: bool, reverse: bool) -> LeafWalk<M> {
        let mut walk = LeafWalk::empty(reverse);
        walk.stack.push((node, right));
        walk
    }
}

/// In-order leaf traversal driven by an explicit stack of links.
pub(crate) struct LeafWalk<M = ()> {
    stack: SmallVec<[(Slot, bool); 32]>,
    reverse: bool,
    _marker: PhantomData<fn() -> M>,
}

impl<M> LeafWalk<M> {
    pub(crate) fn empty(reverse: bool) -> Self {
        Self {
            stack: SmallVec::new(),
            reverse,
            _marker: PhantomData,
        }
    }

    pub(crate) fn next<S: TrieStore<M>>(&mut self, store: &S) -> Option<Slot> {
        while let Some((node, right)) = self.stack.pop() {
            let child = store.trie_links(node).child(right);
            if child != NIL && store.trie_links(child).parent == node {
                // Push the side visited second first.
                self.stack.push((child, !self.reverse));
                self.stack.push((child, self.reverse));
            } else {
                return Some(child);
            }
        }
        None
    }
}

/// An item together with its trie links.
pub(crate) struct TrieEntry<T> {
    item: T,
    links: TrieLinks,
}

impl<T: IndexKey> TrieStore for Arena<TrieEntry<T>> {
    fn trie_links(&self, at: Slot) -> &TrieLinks {
        &self.at(at).links
    }

    fn trie_links_mut(&mut self, at: Slot) -> &mut TrieLinks {
        &mut self.at_mut(at).links
    }

    fn trie_key(&self, at: Slot) -> KeyRef<'_> {
        self.at(at).item.index_key()
    }
}

/// Owning Patricia index with unique keys.
///
/// ```
/// use vereda::index::PatriciaIndex;
/// use vereda::primitives::bits::KeyRef;
///
/// let mut routes = PatriciaIndex::new();
/// routes.insert(vec![10u8, 0]).unwrap();
/// routes.insert(vec![10u8, 0, 0, 1]).unwrap();
/// let hit = routes.find_prefix(KeyRef::from_bytes(&[10, 0, 0, 7])).unwrap();
/// assert_eq!(routes.get(hit).unwrap(), &vec![10u8, 0]);
/// ```
pub struct PatriciaIndex<T> {
    entries: Arena<TrieEntry<T>>,
    core: PatriciaCore,
}

impl<T: IndexKey> Default for PatriciaIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: IndexKey> PatriciaIndex<T> {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty index with room for `capacity` items.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Arena::with_capacity(capacity),
            core: PatriciaCore::new(),
        }
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.core.len()
    }

    /// Returns true when the index holds no items.
    pub fn is_empty(&self) -> bool {
        self.core.is_empty()
    }

    fn id_at(&self, slot: Slot) -> Option<ItemId> {
        self.entries.handle_at(slot).map(ItemId)
    }

    /// Inserts `item`. Fails without side effects if its key is already present.
    pub fn insert(&mut self, item: T) -> Result<ItemId> {
        if let Some(existing) = self.core.find(&self.entries, item.index_key()) {
            warn!(existing, "index.trie.duplicate_key");
            return Err(VeredaError::DuplicateKey);
        }
        let handle = self.entries.insert(TrieEntry {
            item,
            links: TrieLinks::default(),
        });
        if !self.core.insert(&mut self.entries, handle.index()) {
            self.entries.remove(handle);
            return Err(VeredaError::DuplicateKey);
        }
        Ok(ItemId(handle))
    }

    /// Removes and returns the item behind `id`.
    pub fn remove(&mut self, id: ItemId) -> Option<T> {
        if !self.entries.contains(id.0) {
            return None;
        }
        self.core.remove(&mut self.entries, id.0.index());
        self.entries.remove(id.0).map(|entry| entry.item)
    }

    /// Item behind `id`.
    pub fn get(&self, id: ItemId) -> Option<&T> {
        self.entries.get(id.0).map(|entry| &entry.item)
    }

    /// Exact lookup.
    pub fn find(&self, key: KeyRef<'_>) -> Option<ItemId> {
        self.core
            .find(&self.entries, key)
            .and_then(|slot| self.id_at(slot))
    }

    /// Longest stored key that is a prefix of `key`.
    pub fn find_prefix(&self, key: KeyRef<'_>) -> Option<ItemId> {
        self.core
            .find_prefix(&self.entries, key)
            .and_then(|slot| self.id_at(slot))
    }

    /// Structurally closest item to `key`, whether or not it matches.
    pub fn find_closest(&self, key: KeyRef<'_>) -> Option<ItemId> {
        self.core
            .find_closest(&self.entries, key)
            .and_then(|slot| self.id_at(slot))
    }

    /// Ordered lookup relative to a key that need not be stored.
    pub fn bound(&self, key: KeyRef<'_>, bound: Bound) -> Option<ItemId> {
        self.core
            .bound(&self.entries, key, bound)
            .and_then(|slot| self.id_at(slot))
    }

    /// Lexically smallest item.
    pub fn first(&self) -> Option<ItemId> {
        self.core.first(&self.entries).and_then(|s| self.id_at(s))
    }

    /// Lexically largest item.
    pub fn last(&self) -> Option<ItemId> {
        self.core.last(&self.entries).and_then(|s| self.id_at(s))
    }

    /// Item following `id` in key order.
    pub fn next(&self, id: ItemId) -> Option<ItemId> {
        let entry = self.entries.get(id.0)?;
        self.bound(entry.item.index_key(), Bound::Above)
    }

    /// Item preceding `id` in key order.
    pub fn prev(&self, id: ItemId) -> Option<ItemId> {
        let entry = self.entries.get(id.0)?;
        self.bound(entry.item.index_key(), Bound::Below)
    }

    /// Removes every item.
    pub fn clear(&mut self) {
        self.core.clear(&mut self.entries);
        self.entries.clear();
    }

    /// Items in key order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            index: self,
            walk: self.core.walk(false),
            prefix: None,
        }
    }

    /// Items in descending key order.
    pub fn iter_rev(&self) -> Iter<'_, T> {
        Iter {
            index: self,
            walk: self.core.walk(true),
            prefix: None,
        }
    }

    /// Items whose keys start with `prefix`, in key order.
    pub fn iter_prefix(&self, prefix: KeyRef<'_>) -> Iter<'_, T> {
        let walk = match self.core.prefix_subtree(&self.entries, prefix) {
            Some((node, right)) => self.core.walk_under(node, right, false),
            None => LeafWalk::empty(false),
        };
        Iter {
            index: self,
            walk,
            prefix: Some(prefix.to_key_buf()),
        }
    }

    /// Detached cursor that tolerates inserts and removals between steps.
    pub fn cursor(&self, reverse: bool) -> Cursor {
        Cursor {
            last: None,
            reverse,
            done: false,
        }
    }
}

/// Borrowing iterator over a [`PatriciaIndex`].
pub struct Iter<'a, T> {
    index: &'a PatriciaIndex<T>,
    walk: LeafWalk,
    prefix: Option<KeyBuf>,
}

impl<'a, T: IndexKey> Iterator for Iter<'a, T> {
    type Item = (ItemId, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let slot = self.walk.next(&self.index.entries)?;
            let handle: Handle = self.index.entries.handle_at(slot)?;
            let item = &self.index.entries.at(slot).item;
            match &self.prefix {
                Some(prefix) if !prefix.as_key().is_prefix_of(&item.index_key()) => continue,
                _ => return Some((ItemId(handle), item)),
            }
        }
    }
}

/// Position in a [`PatriciaIndex`] remembered by key.
///
/// The cursor keeps a copy of the last key it returned, so the index may be
/// modified between steps; the next step resumes at the first key past it.
#[derive(Clone, Debug)]
pub struct Cursor {
    last: Option<KeyBuf>,
    reverse: bool,
    done: bool,
}

impl Cursor {
    /// Positions the cursor so the next step returns the first key past `key`.
    pub fn seek(&mut self, key: KeyRef<'_>) {
        self.last = Some(key.to_key_buf());
        self.done = false;
    }

    /// Flips direction around the current position.
    pub fn reverse(&mut self) {
        self.reverse = !self.reverse;
        self.done = false;
    }

    /// Advances and returns the next item.
    pub fn next<T: IndexKey>(&mut self, index: &PatriciaIndex<T>) -> Option<ItemId> {
        if self.done {
            return None;
        }
        let found = match &self.last {
            None if self.reverse => index.last(),
            None => index.first(),
            Some(key) => {
                let bound = if self.reverse { Bound::Below } else { Bound::Above };
                index.bound(key.as_key(), bound)
            }
        };
        match found.and_then(|id| index.get(id).map(|item| (id, item))) {
            Some((id, item)) => {
                self.last = Some(item.index_key().to_key_buf());
                Some(id)
            }
            None => {
                self.done = true;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::bits::Endian;

    fn keys(index: &PatriciaIndex<Vec<u8>>) -> Vec<Vec<u8>> {
        index.iter().map(|(_, k)| k.clone()).collect()
    }

    #[test]
    fn insert_find_remove() {
        let mut index = PatriciaIndex::new();
        let a = index.insert(vec![1, 2, 3]).unwrap();
        let b = index.insert(vec![1, 2, 4]).unwrap();
        let c = index.insert(vec![9]).unwrap();
        assert_eq!(index.len(), 3);
        assert_eq!(index.find(KeyRef::from_bytes(&[1, 2, 4])), Some(b));
        assert!(index.find(KeyRef::from_bytes(&[1, 2])).is_none());
        assert_eq!(index.remove(a), Some(vec![1, 2, 3]));
        assert!(index.find(KeyRef::from_bytes(&[1, 2, 3])).is_none());
        assert_eq!(index.find(KeyRef::from_bytes(&[9])), Some(c));
        assert_eq!(index.remove(a), None);
    }

    #[test]
    fn duplicate_key_is_rejected() {
        let mut index = PatriciaIndex::new();
        index.insert(vec![5u8]).unwrap();
        assert!(matches!(
            index.insert(vec![5u8]),
            Err(VeredaError::DuplicateKey)
        ));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn keys_of_different_bit_lengths_coexist() {
        let mut index = PatriciaIndex::new();
        let keys = [
            KeyBuf::with_bits(&[0x00], 1),
            KeyBuf::with_bits(&[0x00], 2),
            KeyBuf::with_bits(&[0x80], 1),
            KeyBuf::with_bits(&[0x80], 2),
            KeyBuf::with_bits(&[0x00], 8),
        ];
        let ids: Vec<ItemId> = keys.iter().map(|k| index.insert(k.clone()).unwrap()).collect();
        assert_eq!(index.len(), keys.len());
        for (key, id) in keys.iter().zip(&ids) {
            assert_eq!(index.find(key.as_key()), Some(*id));
        }
        index.remove(ids[0]);
        assert!(index.find(keys[0].as_key()).is_none());
        assert_eq!(index.find(keys[1].as_key()), Some(ids[1]));
    }

    #[test]
    fn iteration_is_lexical() {
        let mut index = PatriciaIndex::new();
        for k in [[7u8], [1], [200], [3], [64], [0], [255]] {
            index.insert(k.to_vec()).unwrap();
        }
        let got: Vec<u8> = keys(&index).into_iter().map(|k| k[0]).collect();
        assert_eq!(got, vec![0, 1, 3, 7, 64, 200, 255]);
        let rev: Vec<u8> = index.iter_rev().map(|(_, k)| k[0]).collect();
        assert_eq!(rev, vec![255, 200, 64, 7, 3, 1, 0]);
    }

    #[test]
    fn removing_the_root_keeps_order() {
        let mut index = PatriciaIndex::new();
        let ids: Vec<_> = (0u8..16)
            .map(|k| index.insert(vec![k.wrapping_mul(37)]).unwrap())
            .collect();
        for id in ids.iter().step_by(3) {
            index.remove(*id);
        }
        let got: Vec<u8> = keys(&index).into_iter().map(|k| k[0]).collect();
        let mut expected: Vec<u8> = (0u8..16)
            .enumerate()
            .filter(|(i, _)| i % 3 != 0)
            .map(|(_, k)| k.wrapping_mul(37))
            .collect();
        expected.sort_unstable();
        assert_eq!(got, expected);
        for id in ids {
            index.remove(id);
        }
        assert!(index.is_empty());
        assert!(index.first().is_none());
    }

    #[test]
    fn longest_prefix_wins() {
        let mut index = PatriciaIndex::new();
        let short = index.insert(vec![10u8]).unwrap();
        let long = index.insert(vec![10u8, 1]).unwrap();
        index.insert(vec![11u8, 1]).unwrap();
        assert_eq!(index.find_prefix(KeyRef::from_bytes(&[10, 1, 5])), Some(long));
        assert_eq!(index.find_prefix(KeyRef::from_bytes(&[10, 2, 5])), Some(short));
        assert!(index.find_prefix(KeyRef::from_bytes(&[12])).is_none());
    }

    #[test]
    fn bounds_on_missing_keys() {
        let mut index = PatriciaIndex::new();
        for k in [10u8, 20, 30] {
            index.insert(vec![k]).unwrap();
        }
        let at = |b| {
            index
                .bound(KeyRef::from_bytes(&[25]), b)
                .and_then(|id| index.get(id))
                .map(|k| k[0])
        };
        assert_eq!(at(Bound::Floor), Some(20));
        assert_eq!(at(Bound::Ceil), Some(30));
        assert_eq!(at(Bound::Below), Some(20));
        assert_eq!(at(Bound::Above), Some(30));
        assert!(index.bound(KeyRef::from_bytes(&[31]), Bound::Ceil).is_none());
        assert!(index.bound(KeyRef::from_bytes(&[10]), Bound::Below).is_none());
    }

    #[test]
    fn prefix_iteration() {
        let mut index = PatriciaIndex::new();
        for k in [[1u8, 1], [1, 2], [2, 1], [1, 3], [0, 9]] {
            index.insert(k.to_vec()).unwrap();
        }
        let got: Vec<Vec<u8>> = index
            .iter_prefix(KeyRef::from_bytes(&[1]))
            .map(|(_, k)| k.clone())
            .collect();
        assert_eq!(got, vec![vec![1, 1], vec![1, 2], vec![1, 3]]);
        assert_eq!(index.iter_prefix(KeyRef::from_bytes(&[3])).count(), 0);
    }

    #[test]
    fn cursor_survives_removal() {
        let mut index = PatriciaIndex::new();
        let ids: Vec<_> = (0u8..6).map(|k| index.insert(vec![k]).unwrap()).collect();
        let mut cursor = index.cursor(false);
        let mut seen = Vec::new();
        while let Some(id) = cursor.next(&index) {
            let key = index.get(id).unwrap()[0];
            seen.push(key);
            if key == 1 {
                index.remove(id);
                index.remove(ids[2]);
                index.insert(vec![4, 0]).unwrap();
            }
        }
        assert_eq!(seen, vec![0, 1, 3, 4, 4, 5]);
        let mut back = index.cursor(true);
        assert_eq!(index.get(back.next(&index).unwrap()).unwrap(), &vec![5u8]);
    }

    #[test]
    fn little_endian_keys_order_from_low_byte() {
        #[derive(Debug)]
        struct Le([u8; 2]);
        impl IndexKey for Le {
            fn index_key(&self) -> KeyRef<'_> {
                KeyRef::from_bytes(&self.0).with_endian(Endian::Little)
            }
        }
        let mut index = PatriciaIndex::new();
        for v in [0x0102u16, 0x0201, 0x0001] {
            index.insert(Le(v.to_le_bytes())).unwrap();
        }
        let got: Vec<[u8; 2]> = index.iter().map(|(_, k)| k.0).collect();
        // Little-endian bytes of u16 values read from the high byte first.
        assert_eq!(
            got,
            vec![
                0x0001u16.to_le_bytes(),
                0x0102u16.to_le_bytes(),
                0x0201u16.to_le_bytes()
            ]
        );
    }
}
