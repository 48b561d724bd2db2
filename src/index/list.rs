//! Intrusive doubly-linked list over slots in a [`ListStore`].

use std::marker::PhantomData;

use super::links::{ListLinks, ListStore, Slot, NIL};

pub(crate) struct ListCore<M = ()> {
    head: Slot,
    tail: Slot,
    len: usize,
    _marker: PhantomData<fn() -> M>,
}

impl<M> Default for ListCore<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> ListCore<M> {
    pub(crate) fn new() -> Self {
        Self {
            head: NIL,
            tail: NIL,
            len: 0,
            _marker: PhantomData,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.head == NIL
    }

    pub(crate) fn head(&self) -> Option<Slot> {
        (self.head != NIL).then_some(self.head)
    }

    pub(crate) fn tail(&self) -> Option<Slot> {
        (self.tail != NIL).then_some(self.tail)
    }

    pub(crate) fn next<S: ListStore<M>>(&self, store: &S, at: Slot) -> Option<Slot> {
        let next = store.list_links(at).next;
        (next != NIL).then_some(next)
    }

    pub(crate) fn prev<S: ListStore<M>>(&self, store: &S, at: Slot) -> Option<Slot> {
        let prev = store.list_links(at).prev;
        (prev != NIL).then_some(prev)
    }

    pub(crate) fn push_back<S: ListStore<M>>(&mut self, store: &mut S, at: Slot) {
        *store.list_links_mut(at) = ListLinks {
            prev: self.tail,
            next: NIL,
            linked: true,
        };
        if self.tail == NIL {
            self.head = at;
        } else {
            store.list_links_mut(self.tail).next = at;
        }
        self.tail = at;
        self.len += 1;
    }

    pub(crate) fn push_front<S: ListStore<M>>(&mut self, store: &mut S, at: Slot) {
        *store.list_links_mut(at) = ListLinks {
            prev: NIL,
            next: self.head,
            linked: true,
        };
        if self.head == NIL {
            self.tail = at;
        } else {
            store.list_links_mut(self.head).prev = at;
        }
        self.head = at;
        self.len += 1;
    }

    /// Links `at` directly in front of the linked item `before`.
    pub(crate) fn insert_before<S: ListStore<M>>(&mut self, store: &mut S, at: Slot, before: Slot) {
        let prev = store.list_links(before).prev;
        if prev == NIL {
            self.push_front(store, at);
            return;
        }
        *store.list_links_mut(at) = ListLinks {
            prev,
            next: before,
            linked: true,
        };
        store.list_links_mut(prev).next = at;
        store.list_links_mut(before).prev = at;
        self.len += 1;
    }

    /// Links `at` directly behind the linked item `after`.
    pub(crate) fn insert_after<S: ListStore<M>>(&mut self, store: &mut S, at: Slot, after: Slot) {
        let next = store.list_links(after).next;
        if next == NIL {
            self.push_back(store, at);
        } else {
            self.insert_before(store, at, next);
        }
    }

    /// Unlinks `at`. Returns false if it was not linked.
    pub(crate) fn remove<S: ListStore<M>>(&mut self, store: &mut S, at: Slot) -> bool {
        let links = *store.list_links(at);
        if !links.linked {
            return false;
        }
        if links.prev == NIL {
            self.head = links.next;
        } else {
            store.list_links_mut(links.prev).next = links.next;
        }
        if links.next == NIL {
            self.tail = links.prev;
        } else {
            store.list_links_mut(links.next).prev = links.prev;
        }
        *store.list_links_mut(at) = ListLinks::default();
        self.len -= 1;
        true
    }

    pub(crate) fn clear<S: ListStore<M>>(&mut self, store: &mut S) {
        let mut at = self.head;
        while at != NIL {
            let next = store.list_links(at).next;
            *store.list_links_mut(at) = ListLinks::default();
            at = next;
        }
        self.head = NIL;
        self.tail = NIL;
        self.len = 0;
    }
}
