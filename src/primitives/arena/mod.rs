#![forbid(unsafe_code)]
//! Generation-checked slot arena.
//!
//! Every pooled structure in the crate (index items, graph vertices and edges,
//! queue states) lives in an [`Arena`]. Removing a value bumps the slot's
//! generation and parks the slot on a free list, so the next insert reuses
//! the memory. A [`Handle`] records the arena it came from, the slot index and
//! the generation it was issued with; a handle that outlives its value, or
//! that belongs to another arena, simply fails to resolve.

use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_ARENA_ID: AtomicU32 = AtomicU32::new(1);

/// Reference to a value stored in an [`Arena`].
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct Handle {
    arena: u32,
    index: u32,
    generation: u32,
}

impl Handle {
    /// Identity of the arena that issued this handle.
    pub fn arena(&self) -> u32 {
        self.arena
    }

    /// Slot index inside the arena.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Generation of the slot when the handle was issued.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Index and generation packed big-endian, usable as an index key.
    pub fn to_key_bytes(&self) -> [u8; 8] {
        let mut out = [0u8; 8];
        out[..4].copy_from_slice(&self.index.to_be_bytes());
        out[4..].copy_from_slice(&self.generation.to_be_bytes());
        out
    }

    /// Arena identity followed by [`Handle::to_key_bytes`]. Handles from
    /// different arenas never share these bytes.
    pub fn to_qualified_key_bytes(&self) -> [u8; 12] {
        let mut out = [0u8; 12];
        out[..4].copy_from_slice(&self.arena.to_be_bytes());
        out[4..].copy_from_slice(&self.to_key_bytes());
        out
    }
}

enum Entry<T> {
    Occupied { generation: u32, value: T },
    Vacant { generation: u32 },
}

/// Slot storage with a free list and generation checks.
pub struct Arena<T> {
    id: u32,
    entries: Vec<Entry<T>>,
    free: Vec<u32>,
    len: usize,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Arena<T> {
    /// Creates an empty arena with a fresh identity.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty arena with room for `capacity` values.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            id: NEXT_ARENA_ID.fetch_add(1, Ordering::Relaxed),
            entries: Vec::with_capacity(capacity),
            free: Vec::new(),
            len: 0,
        }
    }

    /// Identity stamped into every handle issued by this arena.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Number of live values.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true when no value is live.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of slots ever allocated, live or pooled.
    pub fn slots(&self) -> usize {
        self.entries.len()
    }

    /// Number of vacant slots waiting for reuse.
    pub fn pooled(&self) -> usize {
        self.free.len()
    }

    /// Stores `value`, reusing a pooled slot when one is available.
    pub fn insert(&mut self, value: T) -> Handle {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let entry = &mut self.entries[index as usize];
            let generation = match entry {
                Entry::Vacant { generation } => *generation,
                Entry::Occupied { .. } => unreachable!("free list holds occupied slot {index}"),
            };
            *entry = Entry::Occupied { generation, value };
            return Handle {
                arena: self.id,
                index,
                generation,
            };
        }
        let index = self.entries.len() as u32;
        self.entries.push(Entry::Occupied {
            generation: 0,
            value,
        });
        Handle {
            arena: self.id,
            index,
            generation: 0,
        }
    }

    /// Removes the value behind `handle` and pools its slot.
    pub fn remove(&mut self, handle: Handle) -> Option<T> {
        if !self.contains(handle) {
            return None;
        }
        let entry = &mut self.entries[handle.index as usize];
        let next = Entry::Vacant {
            generation: handle.generation.wrapping_add(1),
        };
        match std::mem::replace(entry, next) {
            Entry::Occupied { value, .. } => {
                self.free.push(handle.index);
                self.len -= 1;
                Some(value)
            }
            Entry::Vacant { .. } => None,
        }
    }

    /// Returns true when `handle` resolves to a live value of this arena.
    pub fn contains(&self, handle: Handle) -> bool {
        handle.arena == self.id
            && matches!(
                self.entries.get(handle.index as usize),
                Some(Entry::Occupied { generation, .. }) if *generation == handle.generation
            )
    }

    /// Resolves `handle`.
    pub fn get(&self, handle: Handle) -> Option<&T> {
        if handle.arena != self.id {
            return None;
        }
        match self.entries.get(handle.index as usize) {
            Some(Entry::Occupied { generation, value }) if *generation == handle.generation => {
                Some(value)
            }
            _ => None,
        }
    }

    /// Resolves `handle` mutably.
    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        if handle.arena != self.id {
            return None;
        }
        match self.entries.get_mut(handle.index as usize) {
            Some(Entry::Occupied { generation, value }) if *generation == handle.generation => {
                Some(value)
            }
            _ => None,
        }
    }

    /// Current handle of an occupied slot.
    pub fn handle_at(&self, index: u32) -> Option<Handle> {
        match self.entries.get(index as usize) {
            Some(Entry::Occupied { generation, .. }) => Some(Handle {
                arena: self.id,
                index,
                generation: *generation,
            }),
            _ => None,
        }
    }

    /// Value in an occupied slot. Internal links only ever name live slots.
    pub(crate) fn at(&self, index: u32) -> &T {
        match &self.entries[index as usize] {
            Entry::Occupied { value, .. } => value,
            Entry::Vacant { .. } => panic!("arena slot {index} is vacant"),
        }
    }

    pub(crate) fn at_mut(&mut self, index: u32) -> &mut T {
        match &mut self.entries[index as usize] {
            Entry::Occupied { value, .. } => value,
            Entry::Vacant { .. } => panic!("arena slot {index} is vacant"),
        }
    }

    /// Drops every value and pools all slots. Outstanding handles go stale.
    pub fn clear(&mut self) {
        self.free.clear();
        for (index, entry) in self.entries.iter_mut().enumerate() {
            let generation = match entry {
                Entry::Occupied { generation, .. } => generation.wrapping_add(1),
                Entry::Vacant { generation } => *generation,
            };
            *entry = Entry::Vacant { generation };
            self.free.push(index as u32);
        }
        // Reuse low slots first.
        self.free.reverse();
        self.len = 0;
    }

    /// Iterates live values with their handles in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &T)> + '_ {
        let id = self.id;
        self.entries
            .iter()
            .enumerate()
            .filter_map(move |(index, entry)| match entry {
                Entry::Occupied { generation, value } => Some((
                    Handle {
                        arena: id,
                        index: index as u32,
                        generation: *generation,
                    },
                    value,
                )),
                Entry::Vacant { .. } => None,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removed_handles_go_stale() {
        let mut arena = Arena::new();
        let a = arena.insert("a");
        assert_eq!(arena.remove(a), Some("a"));
        assert!(arena.get(a).is_none());
        let b = arena.insert("b");
        assert_eq!(a.index(), b.index());
        assert_ne!(a.generation(), b.generation());
        assert_eq!(arena.get(b), Some(&"b"));
        assert_eq!(arena.remove(a), None);
    }

    #[test]
    fn handles_do_not_cross_arenas() {
        let mut left = Arena::new();
        let mut right = Arena::new();
        let l = left.insert(1u32);
        let _ = right.insert(2u32);
        assert!(right.get(l).is_none());
        assert!(!right.contains(l));
    }

    #[test]
    fn slots_are_recycled() {
        let mut arena = Arena::new();
        for round in 0..100u32 {
            let h = arena.insert(round);
            arena.remove(h);
        }
        assert_eq!(arena.slots(), 1);
        assert_eq!(arena.pooled(), 1);
    }

    #[test]
    fn clear_invalidates_everything() {
        let mut arena = Arena::new();
        let handles: Vec<_> = (0..4).map(|i| arena.insert(i)).collect();
        arena.clear();
        assert!(arena.is_empty());
        assert!(handles.iter().all(|h| !arena.contains(*h)));
        let fresh = arena.insert(9);
        assert_eq!(fresh.index(), 0);
    }
}
