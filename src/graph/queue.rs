//! Pools of queue-state records that let one vertex sit in many queues.
//!
//! A [`QueuePool`] owns any number of queues and one [`QueueState`] record for
//! every (vertex, queue) membership. Records are found through a pool-wide
//! trie keyed by vertex (arena, slot, generation) then queue, so a membership test is a single trie
//! lookup and all memberships of a vertex are a prefix walk. Records of
//! removed memberships return to the pool's free list.
//!
//! A queue is either a FIFO/LIFO list or a priority queue ordered by a
//! per-record key. Vertices are referenced by [`VertexId`]; the pool never
//! touches the graph they belong to.

use tracing::{trace, warn};

use crate::error::{Result, VeredaError};
use crate::index::links::{ListLinks, ListStore, Slot, TrieLinks, TrieStore};
use crate::index::list::ListCore;
use crate::index::patricia::{LeafWalk, PatriciaCore};
use crate::index::sorted::SortedCore;
use crate::primitives::arena::{Arena, Handle};
use crate::primitives::bits::{KeyBuf, KeyRef};
use crate::types::{QueueId, VertexId};

/// Ordering discipline of a queue.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum QueueKind {
    /// Insertion order, with appends and prepends.
    List,
    /// Ordered by a key given on insert.
    Sorted,
}

pub(crate) struct Membership;
pub(crate) struct Order;

enum QueueOrder {
    List(ListCore<Order>),
    Sorted(SortedCore<Order>),
}

/// Record of one vertex in one queue.
pub struct QueueState<R> {
    vertex: VertexId,
    queue: QueueId,
    member_key: [u8; 20],
    member_links: TrieLinks,
    sort_key: KeyBuf,
    order_trie: TrieLinks,
    order_list: ListLinks,
    payload: R,
}

impl<R> QueueState<R> {
    /// Vertex this record belongs to.
    pub fn vertex(&self) -> VertexId {
        self.vertex
    }

    /// Queue holding the record.
    pub fn queue(&self) -> QueueId {
        self.queue
    }

    /// Ordering key inside a sorted queue. Empty for list queues.
    pub fn sort_key(&self) -> KeyRef<'_> {
        self.sort_key.as_key()
    }

    /// Caller data attached to the membership.
    pub fn payload(&self) -> &R {
        &self.payload
    }
}

// Vertices may come from several graphs, so their arena is part of the key.
fn member_key(vertex: VertexId, queue: QueueId) -> [u8; 20] {
    let mut key = [0u8; 20];
    key[..12].copy_from_slice(&vertex.0.to_qualified_key_bytes());
    key[12..].copy_from_slice(&queue.0.to_key_bytes());
    key
}

impl<R> TrieStore<Membership> for Arena<QueueState<R>> {
    fn trie_links(&self, at: Slot) -> &TrieLinks {
        &self.at(at).member_links
    }

    fn trie_links_mut(&mut self, at: Slot) -> &mut TrieLinks {
        &mut self.at_mut(at).member_links
    }

    fn trie_key(&self, at: Slot) -> KeyRef<'_> {
        KeyRef::from_bytes(&self.at(at).member_key)
    }
}

impl<R> TrieStore<Order> for Arena<QueueState<R>> {
    fn trie_links(&self, at: Slot) -> &TrieLinks {
        &self.at(at).order_trie
    }

    fn trie_links_mut(&mut self, at: Slot) -> &mut TrieLinks {
        &mut self.at_mut(at).order_trie
    }

    fn trie_key(&self, at: Slot) -> KeyRef<'_> {
        self.at(at).sort_key.as_key()
    }
}

impl<R> ListStore<Order> for Arena<QueueState<R>> {
    fn list_links(&self, at: Slot) -> &ListLinks {
        &self.at(at).order_list
    }

    fn list_links_mut(&mut self, at: Slot) -> &mut ListLinks {
        &mut self.at_mut(at).order_list
    }
}

/// Owner of queues and of the membership records that populate them.
pub struct QueuePool<R = ()> {
    states: Arena<QueueState<R>>,
    queues: Arena<QueueOrder>,
    members: PatriciaCore<Membership>,
}

impl<R> Default for QueuePool<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> QueuePool<R> {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty pool with room for `capacity` memberships.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            states: Arena::with_capacity(capacity),
            queues: Arena::new(),
            members: PatriciaCore::new(),
        }
    }

    /// Adds an empty queue.
    pub fn create_queue(&mut self, kind: QueueKind) -> QueueId {
        let order = match kind {
            QueueKind::List => QueueOrder::List(ListCore::new()),
            QueueKind::Sorted => QueueOrder::Sorted(SortedCore::new(false)),
        };
        QueueId(self.queues.insert(order))
    }

    /// Empties a queue and retires its identifier.
    pub fn destroy_queue(&mut self, queue: QueueId) -> Result<()> {
        self.clear(queue)?;
        self.queues.remove(queue.0);
        Ok(())
    }

    /// Ordering discipline of `queue`.
    pub fn kind(&self, queue: QueueId) -> Option<QueueKind> {
        self.queues.get(queue.0).map(|order| match order {
            QueueOrder::List(_) => QueueKind::List,
            QueueOrder::Sorted(_) => QueueKind::Sorted,
        })
    }

    /// Number of vertices in `queue`.
    pub fn len(&self, queue: QueueId) -> usize {
        match self.queues.get(queue.0) {
            Some(QueueOrder::List(list)) => list.len(),
            Some(QueueOrder::Sorted(sorted)) => sorted.len(),
            None => 0,
        }
    }

    /// Returns true when `queue` holds no vertex.
    pub fn is_empty(&self, queue: QueueId) -> bool {
        self.len(queue) == 0
    }

    /// Membership records currently allocated, live or pooled.
    pub fn slots(&self) -> usize {
        self.states.slots()
    }

    /// Membership records waiting for reuse.
    pub fn pooled(&self) -> usize {
        self.states.pooled()
    }

    fn find_slot(&self, queue: QueueId, vertex: VertexId) -> Option<Slot> {
        let key = member_key(vertex, queue);
        self.members.find(&self.states, KeyRef::from_bytes(&key))
    }

    fn state_handle(&self, slot: Slot) -> Handle {
        self.states
            .handle_at(slot)
            .expect("indexed membership must be live")
    }

    /// Returns true when `vertex` is in `queue`.
    pub fn contains(&self, queue: QueueId, vertex: VertexId) -> bool {
        self.find_slot(queue, vertex).is_some()
    }

    /// Membership record of `vertex` in `queue`.
    pub fn state(&self, queue: QueueId, vertex: VertexId) -> Option<&QueueState<R>> {
        self.find_slot(queue, vertex)
            .map(|slot| self.states.at(slot))
    }

    /// Payload of the membership of `vertex` in `queue`.
    pub fn payload_mut(&mut self, queue: QueueId, vertex: VertexId) -> Option<&mut R> {
        let slot = self.find_slot(queue, vertex)?;
        Some(&mut self.states.at_mut(slot).payload)
    }

    fn check_queue(&self, queue: QueueId) -> Result<()> {
        if self.queues.contains(queue.0) {
            Ok(())
        } else {
            Err(VeredaError::UnknownQueue)
        }
    }

    // Allocates and indexes a record that is not yet threaded into its queue.
    fn admit(&mut self, queue: QueueId, vertex: VertexId, sort_key: KeyBuf, payload: R) -> Result<Slot> {
        self.check_queue(queue)?;
        if self.contains(queue, vertex) {
            warn!(%vertex, %queue, "graph.queue.already_member");
            return Err(VeredaError::AlreadyMember);
        }
        let handle = self.states.insert(QueueState {
            vertex,
            queue,
            member_key: member_key(vertex, queue),
            member_links: TrieLinks::default(),
            sort_key,
            order_trie: TrieLinks::default(),
            order_list: ListLinks::default(),
            payload,
        });
        self.members.insert(&mut self.states, handle.index());
        Ok(handle.index())
    }

    fn list_of(&mut self, queue: QueueId) -> Result<&mut ListCore<Order>> {
        match self.queues.get_mut(queue.0) {
            Some(QueueOrder::List(list)) => Ok(list),
            Some(QueueOrder::Sorted(_)) => Err(VeredaError::Invalid("queue is sorted")),
            None => Err(VeredaError::UnknownQueue),
        }
    }

    /// Adds `vertex` at the tail of a list queue.
    pub fn append(&mut self, queue: QueueId, vertex: VertexId, payload: R) -> Result<()> {
        self.list_of(queue)?;
        let slot = self.admit(queue, vertex, KeyBuf::empty(), payload)?;
        let Some(QueueOrder::List(list)) = self.queues.get_mut(queue.0) else {
            unreachable!("queue kind checked above");
        };
        list.push_back(&mut self.states, slot);
        trace!(%vertex, %queue, "graph.queue.appended");
        Ok(())
    }

    /// Adds `vertex` at the head of a list queue.
    pub fn prepend(&mut self, queue: QueueId, vertex: VertexId, payload: R) -> Result<()> {
        self.list_of(queue)?;
        let slot = self.admit(queue, vertex, KeyBuf::empty(), payload)?;
        let Some(QueueOrder::List(list)) = self.queues.get_mut(queue.0) else {
            unreachable!("queue kind checked above");
        };
        list.push_front(&mut self.states, slot);
        trace!(%vertex, %queue, "graph.queue.prepended");
        Ok(())
    }

    /// Adds `vertex` to a sorted queue under `key`.
    pub fn insert(&mut self, queue: QueueId, vertex: VertexId, key: KeyBuf, payload: R) -> Result<()> {
        match self.queues.get(queue.0) {
            Some(QueueOrder::Sorted(_)) => {}
            Some(QueueOrder::List(_)) => return Err(VeredaError::Invalid("queue is a list")),
            None => return Err(VeredaError::UnknownQueue),
        }
        let slot = self.admit(queue, vertex, key, payload)?;
        let Some(QueueOrder::Sorted(sorted)) = self.queues.get_mut(queue.0) else {
            unreachable!("queue kind checked above");
        };
        sorted.insert(&mut self.states, slot);
        trace!(%vertex, %queue, "graph.queue.inserted");
        Ok(())
    }

    /// Moves `vertex` to a new position in a sorted queue.
    pub fn rekey(&mut self, queue: QueueId, vertex: VertexId, key: KeyBuf) -> Result<()> {
        self.check_queue(queue)?;
        let slot = self.find_slot(queue, vertex).ok_or(VeredaError::NotMember)?;
        let Some(QueueOrder::Sorted(sorted)) = self.queues.get_mut(queue.0) else {
            return Err(VeredaError::Invalid("queue is a list"));
        };
        sorted.remove(&mut self.states, slot);
        self.states.at_mut(slot).sort_key = key;
        sorted.insert(&mut self.states, slot);
        Ok(())
    }

    // Takes a record out of its queue's order without touching membership.
    fn unthread(&mut self, queue: QueueId, slot: Slot) {
        match self.queues.get_mut(queue.0) {
            Some(QueueOrder::List(list)) => {
                list.remove(&mut self.states, slot);
            }
            Some(QueueOrder::Sorted(sorted)) => {
                sorted.remove(&mut self.states, slot);
            }
            None => {}
        }
    }

    fn release(&mut self, slot: Slot) -> (VertexId, R) {
        self.members.remove(&mut self.states, slot);
        let handle = self.state_handle(slot);
        let state = self
            .states
            .remove(handle)
            .expect("membership handle resolved above");
        (state.vertex, state.payload)
    }

    /// Removes `vertex` from `queue` and returns its payload.
    pub fn remove(&mut self, queue: QueueId, vertex: VertexId) -> Result<R> {
        self.check_queue(queue)?;
        let slot = self.find_slot(queue, vertex).ok_or(VeredaError::NotMember)?;
        self.unthread(queue, slot);
        Ok(self.release(slot).1)
    }

    fn head_slot(&self, queue: QueueId) -> Option<Slot> {
        match self.queues.get(queue.0)? {
            QueueOrder::List(list) => list.head(),
            QueueOrder::Sorted(sorted) => sorted.first(),
        }
    }

    fn tail_slot(&self, queue: QueueId) -> Option<Slot> {
        match self.queues.get(queue.0)? {
            QueueOrder::List(list) => list.tail(),
            QueueOrder::Sorted(sorted) => sorted.last(),
        }
    }

    /// First vertex of `queue`: the list head or the smallest key.
    pub fn head(&self, queue: QueueId) -> Option<VertexId> {
        self.head_slot(queue).map(|slot| self.states.at(slot).vertex)
    }

    /// Last vertex of `queue`.
    pub fn tail(&self, queue: QueueId) -> Option<VertexId> {
        self.tail_slot(queue).map(|slot| self.states.at(slot).vertex)
    }

    /// Removes the head of `queue`.
    pub fn remove_head(&mut self, queue: QueueId) -> Option<(VertexId, R)> {
        let slot = self.head_slot(queue)?;
        self.unthread(queue, slot);
        Some(self.release(slot))
    }

    /// Moves `vertex` from one queue to another, keeping its record.
    ///
    /// The record keeps its sort key and payload. A list destination receives
    /// it at the tail.
    pub fn transfer(&mut self, vertex: VertexId, from: QueueId, to: QueueId) -> Result<()> {
        self.check_queue(from)?;
        self.check_queue(to)?;
        let slot = self.find_slot(from, vertex).ok_or(VeredaError::NotMember)?;
        if from == to {
            return Ok(());
        }
        if self.contains(to, vertex) {
            return Err(VeredaError::AlreadyMember);
        }
        self.unthread(from, slot);
        self.members.remove(&mut self.states, slot);
        {
            let state = self.states.at_mut(slot);
            state.queue = to;
            state.member_key = member_key(vertex, to);
        }
        self.members.insert(&mut self.states, slot);
        match self.queues.get_mut(to.0) {
            Some(QueueOrder::List(list)) => list.push_back(&mut self.states, slot),
            Some(QueueOrder::Sorted(sorted)) => {
                sorted.insert(&mut self.states, slot);
            }
            None => unreachable!("destination checked above"),
        }
        trace!(%vertex, %from, %to, "graph.queue.transferred");
        Ok(())
    }

    /// Removes every vertex from `queue`. Records return to the pool.
    pub fn clear(&mut self, queue: QueueId) -> Result<()> {
        self.check_queue(queue)?;
        while let Some(slot) = self.head_slot(queue) {
            self.unthread(queue, slot);
            self.release(slot);
        }
        Ok(())
    }

    /// Removes `vertex` from every queue of the pool. Returns how many
    /// memberships were dropped.
    pub fn evict(&mut self, vertex: VertexId) -> usize {
        let queues: Vec<QueueId> = self.memberships(vertex).collect();
        for queue in &queues {
            if let Some(slot) = self.find_slot(*queue, vertex) {
                self.unthread(*queue, slot);
                self.release(slot);
            }
        }
        queues.len()
    }

    /// Vertices of `queue` in queue order, with their records.
    pub fn iter(&self, queue: QueueId) -> QueueIter<'_, R> {
        QueueIter {
            pool: self,
            queue,
            next: self.head_slot(queue),
        }
    }

    /// Every queue of this pool that holds `vertex`.
    pub fn memberships(&self, vertex: VertexId) -> Memberships<'_, R> {
        let prefix = vertex.0.to_qualified_key_bytes();
        let walk = match self
            .members
            .prefix_subtree(&self.states, KeyRef::from_bytes(&prefix))
        {
            Some((node, right)) => self.members.walk_under(node, right, false),
            None => LeafWalk::empty(false),
        };
        Memberships {
            pool: self,
            vertex,
            walk,
        }
    }
}

/// Iterator over the records of one queue.
pub struct QueueIter<'a, R> {
    pool: &'a QueuePool<R>,
    queue: QueueId,
    next: Option<Slot>,
}

impl<'a, R> Iterator for QueueIter<'a, R> {
    type Item = &'a QueueState<R>;

    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.next?;
        self.next = match self.pool.queues.get(self.queue.0)? {
            QueueOrder::List(list) => list.next(&self.pool.states, slot),
            QueueOrder::Sorted(sorted) => sorted.next(&self.pool.states, slot),
        };
        Some(self.pool.states.at(slot))
    }
}

/// Iterator over the queues holding one vertex.
pub struct Memberships<'a, R> {
    pool: &'a QueuePool<R>,
    vertex: VertexId,
    walk: LeafWalk<Membership>,
}

impl<R> Iterator for Memberships<'_, R> {
    type Item = QueueId;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let slot = self.walk.next(&self.pool.states)?;
            let state = self.pool.states.at(slot);
            if state.vertex == self.vertex {
                return Some(state.queue);
            }
        }
    }
}
