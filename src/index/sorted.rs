//! Ordered index with optional duplicates and numeric ordering of signed keys.
//!
//! Distinct keys live in a Patricia trie. Every item, including duplicates,
//! is also threaded into a list in numeric order. Only one item per key is
//! in the trie: the representative, which is the last item of its group in
//! list order because duplicates are linked in front of it.
//!
//! Signed keys are ordered lexically by the trie, which puts every
//! non-negative key in front of every negative one. The list corrects for
//! that: negatives come first, then `positive_min` and the rest of the
//! non-negative keys. Under sign-magnitude the negatives also run in reverse
//! lexical order.

use tracing::{trace, warn};

use super::links::{ListLinks, ListStore, Slot, TrieLinks, TrieStore, NIL};
use super::list::ListCore;
use super::patricia::{Bound, LeafWalk, PatriciaCore};
use crate::error::{Result, VeredaError};
use crate::primitives::arena::Arena;
use crate::primitives::bits::{IndexKey, KeyBuf, KeyRef, SignOrder};
use crate::types::ItemId;

pub(crate) struct SortedCore<M = ()> {
    trie: PatriciaCore<M>,
    list: ListCore<M>,
    positive_min: Slot,
    unique: bool,
}

impl<M> SortedCore<M> {
    pub(crate) fn new(unique: bool) -> Self {
        Self {
            trie: PatriciaCore::new(),
            list: ListCore::new(),
            positive_min: NIL,
            unique,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.list.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub(crate) fn is_unique(&self) -> bool {
        self.unique
    }

    /// Number of distinct keys.
    pub(crate) fn distinct(&self) -> usize {
        self.trie.len()
    }

    pub(crate) fn first(&self) -> Option<Slot> {
        self.list.head()
    }

    pub(crate) fn last(&self) -> Option<Slot> {
        self.list.tail()
    }

    pub(crate) fn trie(&self) -> &PatriciaCore<M> {
        &self.trie
    }
}

impl<M> SortedCore<M> {
    pub(crate) fn next<S: ListStore<M>>(&self, store: &S, at: Slot) -> Option<Slot> {
        self.list.next(store, at)
    }

    pub(crate) fn prev<S: ListStore<M>>(&self, store: &S, at: Slot) -> Option<Slot> {
        self.list.prev(store, at)
    }

    pub(crate) fn contains<S: ListStore<M>>(&self, store: &S, at: Slot) -> bool {
        store.list_links(at).linked
    }
}

impl<M> SortedCore<M> {
    fn is_rep<S: TrieStore<M>>(store: &S, at: Slot) -> bool {
        store.trie_links(at).linked
    }

    fn is_negative<S: TrieStore<M>>(store: &S, at: Slot) -> bool {
        store.trie_key(at).is_negative()
    }

    /// Links `at` in order. Returns false if keys are unique and already present.
    pub(crate) fn insert<S>(&mut self, store: &mut S, at: Slot) -> bool
    where
        S: TrieStore<M> + ListStore<M>,
    {
        if let Some(rep) = self.trie.find(store, store.trie_key(at)) {
            if self.unique {
                return false;
            }
            self.list.insert_before(store, at, rep);
            if rep == self.positive_min {
                self.positive_min = at;
            }
            trace!(slot = at, rep, "index.sorted.duplicate_linked");
            return true;
        }
        if !self.trie.insert(store, at) {
            return false;
        }
        let (sign, negative, pred) = {
            let key = store.trie_key(at);
            (
                key.sign(),
                key.is_negative(),
                self.trie.bound(store, key, Bound::Below),
            )
        };
        match pred {
            None => self.link_lowest(store, at, sign, negative),
            Some(pred) => self.link_after_pred(store, at, pred, sign, negative),
        }
        true
    }

    // `at` is lexically smaller than every other key.
    fn link_lowest<S>(&mut self, store: &mut S, at: Slot, sign: SignOrder, negative: bool)
    where
        S: TrieStore<M> + ListStore<M>,
    {
        if self.list.is_empty() {
            self.list.push_back(store, at);
            if sign.is_signed() && !negative {
                self.positive_min = at;
            }
            return;
        }
        if !sign.is_signed() {
            self.list.push_front(store, at);
            return;
        }
        if negative {
            // No non-negative keys exist here.
            match sign {
                SignOrder::SignMagnitude => self.list.push_back(store, at),
                _ => self.list.push_front(store, at),
            }
            return;
        }
        let head_negative = self
            .list
            .head()
            .is_some_and(|head| Self::is_negative(store, head));
        if head_negative {
            self.link_before_positives(store, at);
        } else {
            self.list.push_front(store, at);
        }
        self.positive_min = at;
    }

    fn link_before_positives<S: ListStore<M>>(&mut self, store: &mut S, at: Slot) {
        if self.positive_min == NIL {
            self.list.push_back(store, at);
        } else {
            self.list.insert_before(store, at, self.positive_min);
        }
    }

    fn link_after_pred<S>(&mut self, store: &mut S, at: Slot, pred: Slot, sign: SignOrder, negative: bool)
    where
        S: TrieStore<M> + ListStore<M>,
    {
        if !sign.is_signed() || !negative {
            self.list.insert_after(store, at, pred);
            return;
        }
        let pred_negative = Self::is_negative(store, pred);
        match (sign, pred_negative) {
            (SignOrder::SignMagnitude, true) => {
                let succ = self.trie.bound(store, store.trie_key(at), Bound::Above);
                match succ {
                    Some(succ) => self.list.insert_after(store, at, succ),
                    None => self.list.push_front(store, at),
                }
            }
            (SignOrder::SignMagnitude, false) => self.link_before_positives(store, at),
            (_, true) => self.list.insert_after(store, at, pred),
            (_, false) => self.list.push_front(store, at),
        }
    }

    /// Unlinks `at`. A removed representative hands the trie slot to the
    /// item in front of it, which is the new end of its group.
    pub(crate) fn remove<S>(&mut self, store: &mut S, at: Slot) -> bool
    where
        S: TrieStore<M> + ListStore<M>,
    {
        if !store.list_links(at).linked {
            return false;
        }
        let prev = self.list.prev(store, at);
        if self.positive_min == at {
            self.positive_min = self.list.next(store, at).unwrap_or(NIL);
        }
        self.list.remove(store, at);
        if Self::is_rep(store, at) {
            self.trie.remove(store, at);
            if let Some(prev) = prev {
                if !Self::is_rep(store, prev) {
                    self.trie.insert(store, prev);
                    trace!(slot = prev, "index.sorted.rep_promoted");
                }
            }
        }
        true
    }

    /// Representative holding `key`.
    pub(crate) fn find_rep<S: TrieStore<M>>(&self, store: &S, key: KeyRef<'_>) -> Option<Slot> {
        self.trie.find(store, key)
    }

    /// First item in list order of the group that ends with `rep`.
    pub(crate) fn group_first<S>(&self, store: &S, rep: Slot) -> Slot
    where
        S: TrieStore<M> + ListStore<M>,
    {
        let mut at = rep;
        while let Some(prev) = self.list.prev(store, at) {
            if Self::is_rep(store, prev) {
                break;
            }
            at = prev;
        }
        at
    }

    /// First item (in list order) whose key equals `key`.
    pub(crate) fn find<S>(&self, store: &S, key: KeyRef<'_>) -> Option<Slot>
    where
        S: TrieStore<M> + ListStore<M>,
    {
        self.find_rep(store, key)
            .map(|rep| self.group_first(store, rep))
    }

    /// Numeric bound. Forward bounds return the first item of a group,
    /// backward bounds its representative.
    pub(crate) fn bound<S>(&self, store: &S, key: KeyRef<'_>, bound: Bound) -> Option<Slot>
    where
        S: TrieStore<M> + ListStore<M>,
    {
        let found = if key.sign().is_signed() {
            self.signed_bound(store, key, bound)
        } else {
            self.trie.bound(store, key, bound)
        };
        if bound.is_forward() {
            found.map(|rep| self.group_first(store, rep))
        } else {
            found
        }
    }

    fn signed_bound<S>(&self, store: &S, key: KeyRef<'_>, bound: Bound) -> Option<Slot>
    where
        S: TrieStore<M> + ListStore<M>,
    {
        let negative = key.is_negative();
        let lexical = if negative && key.sign() == SignOrder::SignMagnitude {
            bound.mirror()
        } else {
            bound
        };
        let found = self.trie.bound(store, key, lexical);
        let same_side = found.filter(|&r| Self::is_negative(store, r) == negative);
        match (bound.is_forward(), negative) {
            (true, true) => same_side.or((self.positive_min != NIL).then_some(self.positive_min)),
            (true, false) | (false, true) => same_side,
            (false, false) => same_side.or_else(|| self.greatest_negative(store)),
        }
    }

    fn greatest_negative<S>(&self, store: &S) -> Option<Slot>
    where
        S: TrieStore<M> + ListStore<M>,
    {
        let candidate = if self.positive_min == NIL {
            self.list.tail()
        } else {
            self.list.prev(store, self.positive_min)
        };
        candidate.filter(|&at| Self::is_negative(store, at))
    }

    pub(crate) fn clear<S>(&mut self, store: &mut S)
    where
        S: TrieStore<M> + ListStore<M>,
    {
        self.trie.clear(store);
        self.list.clear(store);
        self.positive_min = NIL;
    }
}

/// An item together with its trie and list links.
pub(crate) struct SortedEntry<T> {
    item: T,
    trie: TrieLinks,
    list: ListLinks,
}

impl<T: IndexKey> TrieStore for Arena<SortedEntry<T>> {
    fn trie_links(&self, at: Slot) -> &TrieLinks {
        &self.at(at).trie
    }

    fn trie_links_mut(&mut self, at: Slot) -> &mut TrieLinks {
        &mut self.at_mut(at).trie
    }

    fn trie_key(&self, at: Slot) -> KeyRef<'_> {
        self.at(at).item.index_key()
    }
}

impl<T> ListStore for Arena<SortedEntry<T>> {
    fn list_links(&self, at: Slot) -> &ListLinks {
        &self.at(at).list
    }

    fn list_links_mut(&mut self, at: Slot) -> &mut ListLinks {
        &mut self.at_mut(at).list
    }
}

/// Owning ordered index.
///
/// Items iterate in numeric order of their keys: lexical for unsigned keys,
/// signed order for keys tagged [`SignOrder::TwosComplement`] or
/// [`SignOrder::SignMagnitude`]. Items with equal keys keep insertion order.
/// All keys in one index are expected to share a sign interpretation.
pub struct SortedIndex<T> {
    entries: Arena<SortedEntry<T>>,
    core: SortedCore,
}

impl<T: IndexKey> Default for SortedIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: IndexKey> SortedIndex<T> {
    /// Index that accepts duplicate keys.
    pub fn new() -> Self {
        Self {
            entries: Arena::new(),
            core: SortedCore::new(false),
        }
    }

    /// Index that rejects duplicate keys.
    pub fn unique() -> Self {
        Self {
            entries: Arena::new(),
            core: SortedCore::new(true),
        }
    }

    /// Number of items, duplicates included.
    pub fn len(&self) -> usize {
        self.core.len()
    }

    /// Returns true when the index holds no items.
    pub fn is_empty(&self) -> bool {
        self.core.is_empty()
    }

    /// Number of distinct keys.
    pub fn distinct_keys(&self) -> usize {
        self.core.distinct()
    }

    /// Returns true when duplicates are rejected.
    pub fn is_unique(&self) -> bool {
        self.core.is_unique()
    }

    fn id_at(&self, slot: Slot) -> Option<ItemId> {
        self.entries.handle_at(slot).map(ItemId)
    }

    /// Inserts `item` next to any items with an equal key.
    pub fn insert(&mut self, item: T) -> Result<ItemId> {
        if self.core.is_unique() && self.core.find_rep(&self.entries, item.index_key()).is_some() {
            warn!("index.sorted.duplicate_key");
            return Err(VeredaError::DuplicateKey);
        }
        let handle = self.entries.insert(SortedEntry {
            item,
            trie: TrieLinks::default(),
            list: ListLinks::default(),
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

    /// Removes and returns the smallest item.
    pub fn remove_first(&mut self) -> Option<T> {
        let id = self.first()?;
        self.remove(id)
    }

    /// Item behind `id`.
    pub fn get(&self, id: ItemId) -> Option<&T> {
        self.entries.get(id.0).map(|entry| &entry.item)
    }

    /// First item with an equal key.
    pub fn find(&self, key: KeyRef<'_>) -> Option<ItemId> {
        self.core
            .find(&self.entries, key)
            .and_then(|slot| self.id_at(slot))
    }

    /// Every item with an equal key.
    pub fn find_all(&self, key: KeyRef<'_>) -> Iter<'_, T> {
        match self.core.find_rep(&self.entries, key) {
            Some(rep) => Iter {
                index: self,
                front: self.core.group_first(&self.entries, rep),
                back: rep,
            },
            None => Iter::empty(self),
        }
    }

    /// First item of the longest stored key that is a prefix of `key`.
    pub fn find_prefix(&self, key: KeyRef<'_>) -> Option<ItemId> {
        self.core
            .trie()
            .find_prefix(&self.entries, key)
            .map(|rep| self.core.group_first(&self.entries, rep))
            .and_then(|slot| self.id_at(slot))
    }

    /// Structurally closest item to `key`, whether or not it matches.
    pub fn find_closest(&self, key: KeyRef<'_>) -> Option<ItemId> {
        self.core
            .trie()
            .find_closest(&self.entries, key)
            .and_then(|slot| self.id_at(slot))
    }

    /// Numeric bound relative to a key that need not be stored.
    ///
    /// Forward bounds return the first item of the matching group, backward
    /// bounds the last.
    pub fn bound(&self, key: KeyRef<'_>, bound: Bound) -> Option<ItemId> {
        self.core
            .bound(&self.entries, key, bound)
            .and_then(|slot| self.id_at(slot))
    }

    /// Smallest item.
    pub fn first(&self) -> Option<ItemId> {
        self.core.first().and_then(|slot| self.id_at(slot))
    }

    /// Largest item.
    pub fn last(&self) -> Option<ItemId> {
        self.core.last().and_then(|slot| self.id_at(slot))
    }

    /// Item after `id` in order.
    pub fn next(&self, id: ItemId) -> Option<ItemId> {
        if !self.entries.contains(id.0) {
            return None;
        }
        self.core
            .next(&self.entries, id.0.index())
            .and_then(|slot| self.id_at(slot))
    }

    /// Item before `id` in order.
    pub fn prev(&self, id: ItemId) -> Option<ItemId> {
        if !self.entries.contains(id.0) {
            return None;
        }
        self.core
            .prev(&self.entries, id.0.index())
            .and_then(|slot| self.id_at(slot))
    }

    /// Removes every item.
    pub fn clear(&mut self) {
        self.core.clear(&mut self.entries);
        self.entries.clear();
    }

    /// Items in order, from either end.
    pub fn iter(&self) -> Iter<'_, T> {
        match (self.core.first(), self.core.last()) {
            (Some(front), Some(back)) => Iter {
                index: self,
                front,
                back,
            },
            _ => Iter::empty(self),
        }
    }

    /// Items whose keys start with `prefix`, grouped by key in lexical order.
    pub fn iter_prefix(&self, prefix: KeyRef<'_>) -> PrefixIter<'_, T> {
        let walk = match self.core.trie().prefix_subtree(&self.entries, prefix) {
            Some((node, right)) => self.core.trie().walk_under(node, right, false),
            None => LeafWalk::empty(false),
        };
        PrefixIter {
            index: self,
            walk,
            prefix: prefix.to_key_buf(),
            group: Iter::empty(self),
        }
    }

    /// Detached cursor positioned before the first item.
    pub fn cursor(&self) -> Cursor {
        Cursor {
            at: None,
            key: None,
            started: false,
        }
    }
}

/// Double-ended iterator over a [`SortedIndex`].
pub struct Iter<'a, T> {
    index: &'a SortedIndex<T>,
    front: Slot,
    back: Slot,
}

impl<'a, T> Iter<'a, T> {
    fn empty(index: &'a SortedIndex<T>) -> Self {
        Self {
            index,
            front: NIL,
            back: NIL,
        }
    }

    fn take(&mut self, slot: Slot) -> Option<(ItemId, &'a T)> {
        let handle = self.index.entries.handle_at(slot)?;
        Some((ItemId(handle), &self.index.entries.at(slot).item))
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (ItemId, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        if self.front == NIL {
            return None;
        }
        let slot = self.front;
        if slot == self.back {
            self.front = NIL;
            self.back = NIL;
        } else {
            self.front = self.index.entries.list_links(slot).next;
        }
        self.take(slot)
    }
}

impl<T> DoubleEndedIterator for Iter<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.back == NIL {
            return None;
        }
        let slot = self.back;
        if slot == self.front {
            self.front = NIL;
            self.back = NIL;
        } else {
            self.back = self.index.entries.list_links(slot).prev;
        }
        self.take(slot)
    }
}

/// Iterator over the items of a [`SortedIndex`] that share a key prefix.
pub struct PrefixIter<'a, T> {
    index: &'a SortedIndex<T>,
    walk: LeafWalk,
    prefix: KeyBuf,
    group: Iter<'a, T>,
}

impl<'a, T: IndexKey> Iterator for PrefixIter<'a, T> {
    type Item = (ItemId, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.group.next() {
                return Some(item);
            }
            let rep = self.walk.next(&self.index.entries)?;
            let key = self.index.entries.trie_key(rep);
            if self.prefix.as_key().is_prefix_of(&key) {
                self.group = Iter {
                    index: self.index,
                    front: self.index.core.group_first(&self.index.entries, rep),
                    back: rep,
                };
            }
        }
    }
}

/// Position in a [`SortedIndex`] that survives modification of the index.
///
/// The cursor follows list links while its current item is still present.
/// If that item was removed it resumes at the first item with a greater key.
#[derive(Clone, Debug)]
pub struct Cursor {
    at: Option<ItemId>,
    key: Option<KeyBuf>,
    started: bool,
}

impl Cursor {
    /// Item the cursor stands on.
    pub fn current(&self) -> Option<ItemId> {
        self.at
    }

    /// Positions the cursor on the first item `>= key` (forward) or the last
    /// item `<= key` (backward) and returns it.
    pub fn seek<T: IndexKey>(
        &mut self,
        index: &SortedIndex<T>,
        key: KeyRef<'_>,
        forward: bool,
    ) -> Option<ItemId> {
        let bound = if forward { Bound::Ceil } else { Bound::Floor };
        let found = index.bound(key, bound);
        self.started = true;
        self.at = found;
        self.key = Some(match found.and_then(|id| index.get(id)) {
            Some(item) => item.index_key().to_key_buf(),
            None => key.to_key_buf(),
        });
        found
    }

    /// Moves forward and returns the new position.
    pub fn next<T: IndexKey>(&mut self, index: &SortedIndex<T>) -> Option<ItemId> {
        self.step(index, true)
    }

    /// Moves backward and returns the new position.
    pub fn prev<T: IndexKey>(&mut self, index: &SortedIndex<T>) -> Option<ItemId> {
        self.step(index, false)
    }

    fn step<T: IndexKey>(&mut self, index: &SortedIndex<T>, forward: bool) -> Option<ItemId> {
        let found = match (self.at, &self.key) {
            (Some(at), _) if index.entries.contains(at.0) => {
                if forward {
                    index.next(at)
                } else {
                    index.prev(at)
                }
            }
            (_, Some(key)) => {
                let bound = if forward { Bound::Above } else { Bound::Below };
                index.bound(key.as_key(), bound)
            }
            _ if self.started => None,
            _ if forward => index.first(),
            _ => index.last(),
        };
        self.started = true;
        if let Some(id) = found {
            self.at = Some(id);
            self.key = index.get(id).map(|item| item.index_key().to_key_buf());
        }
        found
    }
}
