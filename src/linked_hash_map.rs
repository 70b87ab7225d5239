//! Insertion-ordered maps.
//!
//! A [`LinkedHashMap`] is a [`HashMap`] whose table carries an
//! [`OrderIndex`]. Iteration, [`drain`](HashMap::drain) and
//! [`into_iter`](HashMap::into_iter) follow insertion order, and the methods
//! in this module give O(1) access to both ends of that order and O(1)
//! repositioning of any entry.

use core::fmt::Debug;
use core::iter::FusedIterator;

use crate::error::IterError;
use crate::hash_map::HashMap;
use crate::order_index::OrderIndex;
use crate::slot_table::SlotTable;
use crate::strategy::HashStrategy;

/// A hash map that remembers insertion order.
///
/// Re-inserting an existing key keeps its position; use
/// [`put_and_move_to_last`](HashMap::put_and_move_to_last) to refresh it.
///
/// # Examples
///
/// ```rust
/// use probe_map::LinkedHashMap;
/// use probe_map::strategy::DefaultStrategy;
///
/// let mut map: LinkedHashMap<&str, i32, DefaultStrategy> = LinkedHashMap::new();
/// map.insert("a", 1);
/// map.insert("b", 2);
/// map.insert("c", 3);
/// map.move_to_last(&"a");
///
/// let keys: Vec<_> = map.keys().copied().collect();
/// assert_eq!(keys, ["b", "c", "a"]);
/// assert_eq!(map.pop_first(), Some(("b", 2)));
/// ```
pub type LinkedHashMap<K, V, S> = HashMap<K, V, S, OrderIndex>;

impl<K, V, S> HashMap<K, V, S, OrderIndex> {
    /// Returns the first entry in order.
    pub fn first(&self) -> Option<(&K, &V)> {
        self.table().get(self.table().hooks().first()?)
    }

    /// Returns the last entry in order.
    pub fn last(&self) -> Option<(&K, &V)> {
        self.table().get(self.table().hooks().last()?)
    }

    /// Returns the first key in order.
    pub fn first_key(&self) -> Option<&K> {
        self.first().map(|(k, _)| k)
    }

    /// Returns the last key in order.
    pub fn last_key(&self) -> Option<&K> {
        self.last().map(|(k, _)| k)
    }
}

impl<K, V, S> HashMap<K, V, S, OrderIndex>
where
    S: HashStrategy<K>,
{
    /// Removes and returns the first entry in order.
    pub fn pop_first(&mut self) -> Option<(K, V)> {
        let slot = self.table().hooks().first()?;
        self.table_mut().remove_slot(slot)
    }

    /// Removes and returns the last entry in order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use probe_map::LinkedHashMap;
    /// use probe_map::strategy::DefaultStrategy;
    ///
    /// let mut map: LinkedHashMap<i32, i32, DefaultStrategy> = (0..3).map(|k| (k, k)).collect();
    /// assert_eq!(map.pop_last(), Some((2, 2)));
    /// assert_eq!(map.pop_last(), Some((1, 1)));
    /// assert_eq!(map.last_key(), Some(&0));
    /// ```
    pub fn pop_last(&mut self) -> Option<(K, V)> {
        let slot = self.table().hooks().last()?;
        self.table_mut().remove_slot(slot)
    }

    /// Moves `key` to the front of the order. Returns `false` if it is
    /// absent.
    pub fn move_to_first(&mut self, key: &K) -> bool {
        match self.table().find_slot(key) {
            Ok(slot) => {
                self.table_mut().hooks_mut().move_to_first(slot);
                true
            }
            Err(_) => false,
        }
    }

    /// Moves `key` to the back of the order. Returns `false` if it is absent.
    pub fn move_to_last(&mut self, key: &K) -> bool {
        match self.table().find_slot(key) {
            Ok(slot) => {
                self.table_mut().hooks_mut().move_to_last(slot);
                true
            }
            Err(_) => false,
        }
    }

    /// Returns the value of `key`, moving the entry to the front.
    pub fn get_and_move_to_first(&mut self, key: &K) -> Option<&mut V> {
        let slot = self.table().find_slot(key).ok()?;
        let table = self.table_mut();
        table.hooks_mut().move_to_first(slot);
        Some(table.value_at_mut(slot))
    }

    /// Returns the value of `key`, moving the entry to the back.
    ///
    /// This is the access pattern of an LRU cache, where the front holds the
    /// eviction candidate.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use probe_map::LinkedHashMap;
    /// use probe_map::strategy::DefaultStrategy;
    ///
    /// let mut cache: LinkedHashMap<&str, i32, DefaultStrategy> = LinkedHashMap::new();
    /// cache.insert("a", 1);
    /// cache.insert("b", 2);
    /// assert_eq!(cache.get_and_move_to_last(&"a"), Some(&mut 1));
    /// assert_eq!(cache.first_key(), Some(&"b"));
    /// ```
    pub fn get_and_move_to_last(&mut self, key: &K) -> Option<&mut V> {
        let slot = self.table().find_slot(key).ok()?;
        let table = self.table_mut();
        table.hooks_mut().move_to_last(slot);
        Some(table.value_at_mut(slot))
    }

    /// Inserts or updates `key` and places the entry at the front.
    pub fn put_and_move_to_first(&mut self, key: K, value: V) -> Option<V> {
        let table = self.table_mut();
        match table.find_slot(&key) {
            Ok(slot) => {
                table.hooks_mut().move_to_first(slot);
                Some(core::mem::replace(table.value_at_mut(slot), value))
            }
            Err(slot) => {
                let slot = table.insert(slot, key, value);
                table.hooks_mut().move_to_first(slot);
                None
            }
        }
    }

    /// Inserts or updates `key` and places the entry at the back.
    pub fn put_and_move_to_last(&mut self, key: K, value: V) -> Option<V> {
        let table = self.table_mut();
        match table.find_slot(&key) {
            Ok(slot) => {
                table.hooks_mut().move_to_last(slot);
                Some(core::mem::replace(table.value_at_mut(slot), value))
            }
            Err(slot) => {
                table.insert(slot, key, value);
                None
            }
        }
    }

    /// Iterates over the entries that follow `key` in order, or returns
    /// `None` if `key` is absent.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use probe_map::LinkedHashMap;
    /// use probe_map::strategy::DefaultStrategy;
    ///
    /// let map: LinkedHashMap<i32, (), DefaultStrategy> = (0..5).map(|k| (k, ())).collect();
    /// let after: Vec<_> = map.iter_from(&2).unwrap().map(|(k, _)| *k).collect();
    /// assert_eq!(after, [3, 4]);
    /// assert!(map.iter_from(&9).is_none());
    /// ```
    pub fn iter_from(&self, key: &K) -> Option<IterFrom<'_, K, V, S>> {
        let slot = self.table().find_slot(key).ok()?;
        Some(IterFrom {
            table: self.table(),
            next: self.table().hooks().next(slot),
        })
    }

    /// Returns a cursor positioned before the first entry.
    pub fn cursor_mut(&mut self) -> CursorMut<'_, K, V, S> {
        let table = self.table_mut();
        let state = LinkState {
            next: table.hooks().first(),
            prev: None,
            current: None,
            modifications: table.modifications(),
        };
        CursorMut { table, state }
    }

    /// Returns a cursor positioned just after `key`, or `None` if `key` is
    /// absent.
    pub fn cursor_mut_at(&mut self, key: &K) -> Option<CursorMut<'_, K, V, S>> {
        let table = self.table_mut();
        let slot = table.find_slot(key).ok()?;
        let state = LinkState {
            next: table.hooks().next(slot),
            prev: Some(slot),
            current: None,
            modifications: table.modifications(),
        };
        Some(CursorMut { table, state })
    }

    /// Recreates the cursor saved in `checkpoint`.
    ///
    /// Fails with [`IterError::ConcurrentModification`] if the map was
    /// structurally modified or reordered since. That includes a rehash or a
    /// removal that left the saved positions pointing at the wrong slots: a
    /// stale position is reported as a concurrent modification, never as
    /// [`IterError::IllegalState`].
    pub fn resume(&mut self, checkpoint: Checkpoint) -> Result<CursorMut<'_, K, V, S>, IterError> {
        let table = self.table_mut();
        if checkpoint.state.modifications != table.modifications() {
            return Err(IterError::ConcurrentModification);
        }
        Ok(CursorMut {
            table,
            state: checkpoint.state,
        })
    }
}

/// Iterator over the entries after a given key, in order.
pub struct IterFrom<'a, K, V, S> {
    table: &'a SlotTable<K, V, S, OrderIndex>,
    next: Option<usize>,
}

impl<'a, K, V, S> Iterator for IterFrom<'a, K, V, S> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.next?;
        self.next = self.table.hooks().next(slot);
        self.table.get(slot)
    }
}

impl<K, V, S> FusedIterator for IterFrom<'_, K, V, S> {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LinkState {
    next: Option<usize>,
    prev: Option<usize>,
    /// Slot last returned, equal to `prev` after a forward step and to
    /// `next` after a backward one.
    current: Option<usize>,
    modifications: u64,
}

/// A bidirectional cursor over a [`LinkedHashMap`] that can remove the entry
/// it is on.
///
/// The cursor sits between two entries. [`advance`](Self::advance) and
/// [`advance_back`](Self::advance_back) step over an entry and make it
/// current. Removing through the cursor never shrinks the table.
///
/// # Examples
///
/// ```rust
/// use probe_map::LinkedHashMap;
/// use probe_map::strategy::DefaultStrategy;
///
/// let mut map: LinkedHashMap<i32, i32, DefaultStrategy> = (0..6).map(|k| (k, k)).collect();
/// let mut cursor = map.cursor_mut();
/// while let Ok((key, _)) = cursor.advance() {
///     if key % 2 == 1 {
///         cursor.remove_current()?;
///     }
/// }
/// let (last, _) = cursor.advance_back()?;
/// assert_eq!(*last, 4);
///
/// assert_eq!(map.keys().copied().collect::<Vec<_>>(), [0, 2, 4]);
/// # Ok::<(), probe_map::error::IterError>(())
/// ```
pub struct CursorMut<'a, K, V, S> {
    table: &'a mut SlotTable<K, V, S, OrderIndex>,
    state: LinkState,
}

impl<K, V, S> Debug for CursorMut<'_, K, V, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CursorMut")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Saved position of a linked [`CursorMut`], detached from the map's
/// borrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    state: LinkState,
}

impl<K, V, S> CursorMut<'_, K, V, S>
where
    S: HashStrategy<K>,
{
    /// Returns `true` if [`advance`](Self::advance) will yield an entry.
    pub fn has_next(&self) -> bool {
        self.state.next.is_some()
    }

    /// Returns `true` if [`advance_back`](Self::advance_back) will yield an
    /// entry.
    pub fn has_prev(&self) -> bool {
        self.state.prev.is_some()
    }

    /// Steps forward over the next entry and returns it.
    pub fn advance(&mut self) -> Result<(&K, &mut V), IterError> {
        let slot = self.state.next.ok_or(IterError::NoSuchElement)?;
        self.state.current = Some(slot);
        self.state.prev = Some(slot);
        self.state.next = self.table.hooks().next(slot);
        Ok(self.table.entry_at_mut(slot))
    }

    /// Steps backward over the previous entry and returns it.
    pub fn advance_back(&mut self) -> Result<(&K, &mut V), IterError> {
        let slot = self.state.prev.ok_or(IterError::NoSuchElement)?;
        self.state.current = Some(slot);
        self.state.next = Some(slot);
        self.state.prev = self.table.hooks().prev(slot);
        Ok(self.table.entry_at_mut(slot))
    }

    /// The entry last stepped over, unless it has been removed.
    pub fn current(&mut self) -> Option<(&K, &mut V)> {
        let slot = self.state.current?;
        Some(self.table.entry_at_mut(slot))
    }

    /// Removes the entry last stepped over.
    ///
    /// Fails with [`IterError::IllegalState`] before the first step and
    /// after a removal.
    pub fn remove_current(&mut self) -> Result<(K, V), IterError> {
        let slot = self.state.current.take().ok_or(IterError::IllegalState)?;
        let order = self.table.hooks();
        if self.state.prev == Some(slot) {
            self.state.prev = order.prev(slot);
        } else {
            self.state.next = order.next(slot);
        }

        let LinkState { next, prev, .. } = &mut self.state;
        let entry = self
            .table
            .remove_slot_with(slot, |from, to| {
                if *next == Some(from) {
                    *next = Some(to);
                }
                if *prev == Some(from) {
                    *prev = Some(to);
                }
            })
            .ok_or(IterError::ConcurrentModification)?;
        self.state.modifications = self.table.modifications();
        Ok(entry)
    }

    /// Detaches the cursor from the map, keeping its position.
    pub fn checkpoint(self) -> Checkpoint {
        Checkpoint { state: self.state }
    }
}
