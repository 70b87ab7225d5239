//! Insertion order for a [`SlotTable`](crate::slot_table::SlotTable).
//!
//! [`OrderIndex`] keeps a doubly linked list threaded through slot indices:
//! every occupied slot has a [`Link`] to the slots before and after it in
//! logical order. Because the links are addressed by slot, the index follows
//! the table through every physical change it is notified of, and gives
//! O(1) access to both ends and O(1) relocation of any entry to either end.

use alloc::vec;
use alloc::vec::Vec;
use core::iter::FusedIterator;

use crate::slot_table::SlotHooks;

/// Neighbours of a slot in logical order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Link {
    /// Slot before this one, `None` at the head.
    pub prev: Option<usize>,
    /// Slot after this one, `None` at the tail.
    pub next: Option<usize>,
}

/// Doubly linked list over slot indices, maintained through [`SlotHooks`].
///
/// New entries are appended at the tail, so traversal follows insertion
/// order unless entries are explicitly moved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderIndex {
    links: Vec<Link>,
    first: Option<usize>,
    last: Option<usize>,
}

impl OrderIndex {
    /// Slot at the head.
    #[inline]
    pub fn first(&self) -> Option<usize> {
        self.first
    }

    /// Slot at the tail.
    #[inline]
    pub fn last(&self) -> Option<usize> {
        self.last
    }

    /// Slot after `slot`.
    #[inline]
    pub fn next(&self, slot: usize) -> Option<usize> {
        self.links.get(slot)?.next
    }

    /// Slot before `slot`.
    #[inline]
    pub fn prev(&self, slot: usize) -> Option<usize> {
        self.links.get(slot)?.prev
    }

    /// Links of `slot`.
    #[inline]
    pub fn link(&self, slot: usize) -> Option<Link> {
        self.links.get(slot).copied()
    }

    /// Slots from head to tail.
    pub fn slots(&self) -> Slots<'_> {
        Slots {
            index: self,
            cursor: self.first,
        }
    }

    /// Makes the linked slot `slot` the head.
    pub fn move_to_first(&mut self, slot: usize) {
        if self.first == Some(slot) {
            return;
        }
        self.unlink(slot);
        self.link_first(slot);
    }

    /// Makes the linked slot `slot` the tail.
    pub fn move_to_last(&mut self, slot: usize) {
        if self.last == Some(slot) {
            return;
        }
        self.unlink(slot);
        self.link_last(slot);
    }

    fn unlink(&mut self, slot: usize) {
        let Link { prev, next } = self.links[slot];
        match prev {
            Some(prev) => self.links[prev].next = next,
            None => self.first = next,
        }
        match next {
            Some(next) => self.links[next].prev = prev,
            None => self.last = prev,
        }
        self.links[slot] = Link::default();
    }

    fn link_first(&mut self, slot: usize) {
        self.links[slot] = Link {
            prev: None,
            next: self.first,
        };
        match self.first {
            Some(first) => self.links[first].prev = Some(slot),
            None => self.last = Some(slot),
        }
        self.first = Some(slot);
    }

    fn link_last(&mut self, slot: usize) {
        self.links[slot] = Link {
            prev: self.last,
            next: None,
        };
        match self.last {
            Some(last) => self.links[last].next = Some(slot),
            None => self.first = Some(slot),
        }
        self.last = Some(slot);
    }

    fn reset(&mut self, capacity: usize) {
        self.links.clear();
        self.links.resize(capacity, Link::default());
        self.first = None;
        self.last = None;
    }
}

impl SlotHooks for OrderIndex {
    fn on_init(&mut self, capacity: usize) {
        self.reset(capacity);
    }

    fn on_node_added(&mut self, slot: usize) {
        self.link_last(slot);
    }

    fn on_node_removed(&mut self, slot: usize) {
        self.unlink(slot);
    }

    fn on_node_moved(&mut self, from: usize, to: usize) {
        let link = self.links[from];
        match link.prev {
            Some(prev) => self.links[prev].next = Some(to),
            None => self.first = Some(to),
        }
        match link.next {
            Some(next) => self.links[next].prev = Some(to),
            None => self.last = Some(to),
        }
        self.links[to] = link;
        self.links[from] = Link::default();
    }

    fn on_rehash(&mut self, capacity: usize, relocated: &[Option<usize>]) {
        let mut links = vec![Link::default(); capacity];
        let mut first = None;
        let mut last: Option<usize> = None;

        let mut cursor = self.first;
        while let Some(old) = cursor {
            cursor = self.links[old].next;
            let Some(slot) = relocated.get(old).copied().flatten() else {
                continue;
            };
            links[slot].prev = last;
            match last {
                Some(prev) => links[prev].next = Some(slot),
                None => first = Some(slot),
            }
            last = Some(slot);
        }

        self.links = links;
        self.first = first;
        self.last = last;
    }

    fn on_clear(&mut self, capacity: usize) {
        self.reset(capacity);
    }

    #[inline]
    fn first_slot(&self, _capacity: usize, _occupied: impl Fn(usize) -> bool) -> Option<usize> {
        self.first
    }

    #[inline]
    fn last_slot(&self, _capacity: usize, _occupied: impl Fn(usize) -> bool) -> Option<usize> {
        self.last
    }

    #[inline]
    fn next_slot(
        &self,
        slot: usize,
        _capacity: usize,
        _occupied: impl Fn(usize) -> bool,
    ) -> Option<usize> {
        self.next(slot)
    }

    #[inline]
    fn prev_slot(
        &self,
        slot: usize,
        _capacity: usize,
        _occupied: impl Fn(usize) -> bool,
    ) -> Option<usize> {
        self.prev(slot)
    }
}

/// Iterator over the slots of an [`OrderIndex`], head to tail.
#[derive(Debug, Clone)]
pub struct Slots<'a> {
    index: &'a OrderIndex,
    cursor: Option<usize>,
}

impl Iterator for Slots<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let slot = self.cursor?;
        self.cursor = self.index.next(slot);
        Some(slot)
    }
}

impl FusedIterator for Slots<'_> {}
