//! Open-addressing slot engine.
//!
//! [`SlotTable`] stores `(K, V)` pairs in a power-of-two array of slots and
//! resolves collisions by linear probing from `mix(hash) & mask`. Deletion
//! uses backward shifting, so there are no tombstones: every key sits in the
//! contiguous run of occupied slots that starts at its ideal slot.
//!
//! Everything that depends on where entries physically live (insertion
//! order, for example) is notified through the [`SlotHooks`] attached to the
//! table. [`Unordered`] is the no-op implementation.

use alloc::boxed::Box;
use alloc::collections::TryReserveError;
use alloc::vec;
use alloc::vec::Vec;
use core::alloc::Layout;
use core::fmt::Debug;
use core::iter::FusedIterator;
use core::marker::PhantomData;
use core::ptr::NonNull;

use crate::config;
use crate::config::TableConfig;
use crate::error::ConfigError;
use crate::error::ReserveError;
use crate::strategy::HashStrategy;
use crate::strategy::mix;

type Slot<K, V> = Option<(K, V)>;

/// Observer of physical slot changes, and the source of traversal order.
///
/// A table calls these methods after the corresponding change has been
/// applied to its slots. Every method has a no-op default except the four
/// traversal methods, which decide the order in which iterators visit
/// occupied slots. Traversal methods receive an `occupied` predicate over
/// slot indices for implementations that derive order from the slots
/// themselves.
pub trait SlotHooks {
    /// A fresh slot array of `capacity` slots was installed at construction.
    fn on_init(&mut self, _capacity: usize) {}

    /// An entry was written into the empty slot `slot`.
    fn on_node_added(&mut self, _slot: usize) {}

    /// The entry at `slot` was taken out.
    fn on_node_removed(&mut self, _slot: usize) {}

    /// Backward shifting moved the entry at `from` into the empty slot `to`.
    fn on_node_moved(&mut self, _from: usize, _to: usize) {}

    /// Every entry was reinserted into a new array of `capacity` slots.
    ///
    /// `relocated[old]` is the new slot of the entry that lived at `old`, or
    /// `None` if `old` was empty.
    fn on_rehash(&mut self, _capacity: usize, _relocated: &[Option<usize>]) {}

    /// All entries were dropped and the array now has `capacity` slots.
    fn on_clear(&mut self, _capacity: usize) {}

    /// Slot visited first.
    fn first_slot(&self, capacity: usize, occupied: impl Fn(usize) -> bool) -> Option<usize>;

    /// Slot visited last.
    fn last_slot(&self, capacity: usize, occupied: impl Fn(usize) -> bool) -> Option<usize>;

    /// Slot visited after `slot`.
    fn next_slot(
        &self,
        slot: usize,
        capacity: usize,
        occupied: impl Fn(usize) -> bool,
    ) -> Option<usize>;

    /// Slot visited before `slot`.
    fn prev_slot(
        &self,
        slot: usize,
        capacity: usize,
        occupied: impl Fn(usize) -> bool,
    ) -> Option<usize>;
}

/// Hooks of a table without any ordering guarantee.
///
/// Traversal walks the slot array from the highest index down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Unordered;

impl SlotHooks for Unordered {
    #[inline]
    fn first_slot(&self, capacity: usize, occupied: impl Fn(usize) -> bool) -> Option<usize> {
        (0..capacity).rev().find(|&slot| occupied(slot))
    }

    #[inline]
    fn last_slot(&self, capacity: usize, occupied: impl Fn(usize) -> bool) -> Option<usize> {
        (0..capacity).find(|&slot| occupied(slot))
    }

    #[inline]
    fn next_slot(
        &self,
        slot: usize,
        _capacity: usize,
        occupied: impl Fn(usize) -> bool,
    ) -> Option<usize> {
        (0..slot).rev().find(|&slot| occupied(slot))
    }

    #[inline]
    fn prev_slot(
        &self,
        slot: usize,
        capacity: usize,
        occupied: impl Fn(usize) -> bool,
    ) -> Option<usize> {
        (slot + 1..capacity).find(|&slot| occupied(slot))
    }
}

fn try_allocate<K, V>(capacity: usize) -> Result<Box<[Slot<K, V>]>, TryReserveError> {
    let mut slots = Vec::new();
    slots.try_reserve_exact(capacity)?;
    slots.resize_with(capacity, || None);
    Ok(slots.into_boxed_slice())
}

fn allocate<K, V>(capacity: usize) -> Box<[Slot<K, V>]> {
    match try_allocate(capacity) {
        Ok(slots) => slots,
        Err(_) => match Layout::array::<Slot<K, V>>(capacity) {
            Ok(layout) => alloc::alloc::handle_alloc_error(layout),
            Err(_) => capacity_overflow(),
        },
    }
}

fn try_relocation_table(len: usize) -> Result<Vec<Option<usize>>, TryReserveError> {
    let mut relocated = Vec::new();
    relocated.try_reserve_exact(len)?;
    relocated.resize(len, None);
    Ok(relocated)
}

#[cold]
#[inline(never)]
fn capacity_overflow() -> ! {
    panic!("capacity overflow")
}

#[inline]
fn sized_or_panic(expected: usize, load_factor: f32) -> usize {
    match config::array_size(expected, load_factor) {
        Ok(capacity) => capacity,
        Err(err) => panic!("{err}"),
    }
}

/// Debug statistics for probe length analysis.
///
/// Available in tests and with the `stats` feature.
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone)]
pub struct DebugStats {
    /// Number of entries in the table
    pub len: usize,
    /// Number of slots
    pub capacity: usize,
    /// Entry count that triggers the next growth
    pub max_fill: usize,
    /// Ratio of entries to slots
    pub occupancy: f64,
    /// Configured load factor
    pub load_factor: f32,
    /// Largest distance of an entry from its ideal slot
    pub longest_probe: usize,
    /// Mean distance of an entry from its ideal slot
    pub mean_probe: f64,
    /// Bytes held by the slot array
    pub total_bytes: usize,
}

#[cfg(any(test, feature = "stats"))]
impl DebugStats {
    /// Pretty-print the debug statistics.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("=== Slot Table Debug Statistics ===");
        println!(
            "Population: {}/{} slots ({:.2}% occupancy, load factor {:.2})",
            self.len,
            self.capacity,
            self.occupancy * 100.0,
            self.load_factor
        );
        println!("Next growth at: {} entries", self.max_fill);
        println!(
            "Probe length: {:.2} mean, {} longest",
            self.mean_probe, self.longest_probe
        );
        println!("Total Allocated: {} bytes", self.total_bytes);
    }
}

/// Open-addressing table of `(K, V)` pairs.
///
/// `S` decides hashing and key equality, `H` observes slot changes and
/// decides traversal order.
///
/// The table works in terms of slot indices: [`find_slot`] reports either
/// the slot holding a key or the empty slot where it belongs, and
/// [`insert`] fills exactly that slot. Slot indices stay valid until the next
/// insertion or removal.
///
/// [`find_slot`]: SlotTable::find_slot
/// [`insert`]: SlotTable::insert
///
/// # Examples
///
/// ```rust
/// use probe_map::slot_table::SlotTable;
/// use probe_map::slot_table::Unordered;
/// use probe_map::strategy::DefaultStrategy;
///
/// let mut table: SlotTable<&str, i32, DefaultStrategy, Unordered> =
///     SlotTable::new(DefaultStrategy::default());
///
/// let slot = match table.find_slot(&"a") {
///     Ok(slot) => slot,
///     Err(empty) => table.insert(empty, "a", 1),
/// };
/// assert_eq!(table.get(slot), Some((&"a", &1)));
///
/// let found = table.find_slot(&"a").unwrap();
/// assert_eq!(table.remove_slot(found), Some(("a", 1)));
/// assert!(table.is_empty());
/// ```
#[derive(Clone)]
pub struct SlotTable<K, V, S, H = Unordered> {
    slots: Box<[Slot<K, V>]>,
    len: usize,
    mask: usize,
    max_fill: usize,
    min_slots: usize,
    load_factor: f32,
    modifications: u64,
    strategy: S,
    hooks: H,
}

impl<K, V, S, H> Debug for SlotTable<K, V, S, H>
where
    S: HashStrategy<K>,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        struct Displacements<'a, K, V, S, H>(&'a SlotTable<K, V, S, H>);

        impl<K, V, S: HashStrategy<K>, H> Debug for Displacements<'_, K, V, S, H> {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                let table = self.0;
                f.debug_list()
                    .entries((0..table.capacity()).map(|slot| table.displacement(slot)))
                    .finish()
            }
        }

        f.debug_struct("SlotTable")
            .field("len", &self.len)
            .field("capacity", &self.capacity())
            .field("max_fill", &self.max_fill)
            .field("load_factor", &self.load_factor)
            .field("displacements", &Displacements(self))
            .finish()
    }
}

impl<K, V, S, H> SlotTable<K, V, S, H>
where
    H: SlotHooks + Default,
{
    /// Creates a table sized for the default number of entries.
    pub fn new(strategy: S) -> Self {
        Self::with_capacity(config::DEFAULT_INITIAL_SIZE, strategy)
    }

    /// Creates a table that holds `capacity` entries at the default load
    /// factor before growing.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` cannot be backed by any slot array.
    pub fn with_capacity(capacity: usize, strategy: S) -> Self {
        let slots = sized_or_panic(capacity, config::DEFAULT_LOAD_FACTOR);
        Self::with_slots(slots, config::DEFAULT_LOAD_FACTOR, strategy)
    }

    /// Creates a table from a validated configuration.
    pub fn with_config(config: TableConfig, strategy: S) -> Result<Self, ConfigError> {
        let slots = config.initial_capacity()?;
        Ok(Self::with_slots(slots, config.load_factor, strategy))
    }

    fn with_slots(capacity: usize, load_factor: f32, strategy: S) -> Self {
        let mut hooks = H::default();
        hooks.on_init(capacity);
        Self {
            slots: allocate(capacity),
            len: 0,
            mask: capacity - 1,
            max_fill: config::max_fill(capacity, load_factor),
            min_slots: capacity,
            load_factor,
            modifications: 0,
            strategy,
            hooks,
        }
    }
}

impl<K, V, S, H> SlotTable<K, V, S, H> {
    /// Number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the table holds no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of slots. Always a power of two.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Entry count at which the next insertion grows the table.
    #[inline]
    pub fn max_fill(&self) -> usize {
        self.max_fill
    }

    /// Configured load factor.
    #[inline]
    pub fn load_factor(&self) -> f32 {
        self.load_factor
    }

    /// Slot count below which removals never shrink the table.
    #[inline]
    pub fn min_capacity(&self) -> usize {
        self.min_slots
    }

    /// The hashing strategy.
    #[inline]
    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// The attached hooks.
    #[inline]
    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    /// Mutable access to the hooks for reordering. Counts as a structural
    /// modification.
    #[inline]
    pub(crate) fn hooks_mut(&mut self) -> &mut H {
        self.bump();
        &mut self.hooks
    }

    /// Counter advanced by every structural modification.
    #[inline]
    pub(crate) fn modifications(&self) -> u64 {
        self.modifications
    }

    #[inline]
    fn bump(&mut self) {
        self.modifications = self.modifications.wrapping_add(1);
    }

    /// Returns `true` if `slot` holds an entry.
    #[inline]
    pub fn is_occupied(&self, slot: usize) -> bool {
        matches!(self.slots.get(slot), Some(Some(_)))
    }

    /// Entry stored at `slot`.
    #[inline]
    pub fn get(&self, slot: usize) -> Option<(&K, &V)> {
        self.slots.get(slot)?.as_ref().map(|(k, v)| (k, v))
    }

    /// Entry stored at `slot`, with a mutable value.
    #[inline]
    pub fn get_mut(&mut self, slot: usize) -> Option<(&K, &mut V)> {
        self.slots.get_mut(slot)?.as_mut().map(|(k, v)| (&*k, v))
    }

    #[inline]
    pub(crate) fn key_at(&self, slot: usize) -> &K {
        match &self.slots[slot] {
            Some((key, _)) => key,
            None => unreachable!("slot {slot} is empty"),
        }
    }

    #[inline]
    pub(crate) fn value_at(&self, slot: usize) -> &V {
        match &self.slots[slot] {
            Some((_, value)) => value,
            None => unreachable!("slot {slot} is empty"),
        }
    }

    #[inline]
    pub(crate) fn value_at_mut(&mut self, slot: usize) -> &mut V {
        match &mut self.slots[slot] {
            Some((_, value)) => value,
            None => unreachable!("slot {slot} is empty"),
        }
    }

    #[inline]
    pub(crate) fn entry_at_mut(&mut self, slot: usize) -> (&K, &mut V) {
        match &mut self.slots[slot] {
            Some((key, value)) => (&*key, value),
            None => unreachable!("slot {slot} is empty"),
        }
    }
}

impl<K, V, S, H> SlotTable<K, V, S, H>
where
    S: HashStrategy<K>,
{
    /// Slot where probing for `key` starts.
    #[inline]
    pub fn ideal_slot(&self, key: &K) -> usize {
        mix(self.strategy.hash(key)) as usize & self.mask
    }

    /// Locates `key`.
    ///
    /// Returns `Ok(slot)` if the key is stored at `slot`, or `Err(slot)` with
    /// the empty slot that terminated the probe, which is where the key
    /// belongs.
    #[inline]
    pub fn find_slot(&self, key: &K) -> Result<usize, usize> {
        let mut pos = self.ideal_slot(key);
        loop {
            match &self.slots[pos] {
                None => return Err(pos),
                Some((stored, _)) if self.strategy.equals(stored, key) => return Ok(pos),
                Some(_) => pos = (pos + 1) & self.mask,
            }
        }
    }

    /// Distance of the entry at `slot` from its ideal slot.
    fn displacement(&self, slot: usize) -> Option<usize> {
        let (key, _) = self.slots.get(slot)?.as_ref()?;
        Some(slot.wrapping_sub(self.ideal_slot(key)) & self.mask)
    }

    /// Returns a histogram of probe lengths.
    ///
    /// `hist[d]` counts the entries stored `d` slots past their ideal slot.
    #[cfg(any(test, feature = "stats"))]
    pub fn probe_histogram(&self) -> Vec<usize> {
        let mut hist = Vec::new();
        for slot in 0..self.capacity() {
            if let Some(distance) = self.displacement(slot) {
                if hist.len() <= distance {
                    hist.resize(distance + 1, 0);
                }
                hist[distance] += 1;
            }
        }
        hist
    }

    /// Returns occupancy and probe length statistics.
    #[cfg(any(test, feature = "stats"))]
    pub fn debug_stats(&self) -> DebugStats {
        let hist = self.probe_histogram();
        let total: usize = hist.iter().enumerate().map(|(d, &n)| d * n).sum();
        DebugStats {
            len: self.len,
            capacity: self.capacity(),
            max_fill: self.max_fill,
            occupancy: self.len as f64 / self.capacity() as f64,
            load_factor: self.load_factor,
            longest_probe: hist.len().saturating_sub(1),
            mean_probe: if self.len == 0 {
                0.0
            } else {
                total as f64 / self.len as f64
            },
            total_bytes: core::mem::size_of_val::<[Slot<K, V>]>(&self.slots),
        }
    }
}

impl<K, V, S, H> SlotTable<K, V, S, H>
where
    S: HashStrategy<K>,
    H: SlotHooks,
{
    /// Writes `(key, value)` into the empty slot `slot`, as returned by
    /// [`find_slot`](Self::find_slot).
    ///
    /// Grows the table if it was already at its fill threshold, and returns
    /// the slot the entry finally lives in.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is out of range or occupied.
    pub fn insert(&mut self, slot: usize, key: K, value: V) -> usize {
        assert!(
            !self.is_occupied(slot) && slot < self.capacity(),
            "insert into slot {slot}, which is not an empty slot of this table"
        );
        self.slots[slot] = Some((key, value));
        self.hooks.on_node_added(slot);
        self.bump();

        let grow = self.len >= self.max_fill;
        self.len += 1;
        if grow { self.grow(slot) } else { slot }
    }

    #[cold]
    #[inline(never)]
    fn grow(&mut self, tracked: usize) -> usize {
        let capacity = sized_or_panic(self.len + 1, self.load_factor);
        let relocated = vec![None; self.capacity()];
        self.rehash_into(allocate(capacity), relocated)[tracked].unwrap_or(tracked)
    }

    /// Moves every entry into `slots`, visiting the old array from the top
    /// down, and returns the old-to-new slot mapping.
    fn rehash_into(
        &mut self,
        mut slots: Box<[Slot<K, V>]>,
        mut relocated: Vec<Option<usize>>,
    ) -> Vec<Option<usize>> {
        let capacity = slots.len();
        let mask = capacity - 1;

        for from in (0..self.slots.len()).rev() {
            let Some(entry) = self.slots[from].take() else {
                continue;
            };
            let mut to = mix(self.strategy.hash(&entry.0)) as usize & mask;
            while slots[to].is_some() {
                to = (to + 1) & mask;
            }
            slots[to] = Some(entry);
            relocated[from] = Some(to);
        }

        self.slots = slots;
        self.mask = mask;
        self.max_fill = config::max_fill(capacity, self.load_factor);
        self.bump();
        self.hooks.on_rehash(capacity, &relocated);
        relocated
    }

    /// Removes the entry at `slot`, shrinking the table if it has become
    /// sparse.
    pub fn remove_slot(&mut self, slot: usize) -> Option<(K, V)> {
        let entry = self.remove_slot_with(slot, |_, _| {})?;
        self.maybe_shrink();
        Some(entry)
    }

    /// Removes the entry at a slot known to be occupied.
    pub(crate) fn remove_occupied(&mut self, slot: usize) -> (K, V) {
        match self.remove_slot(slot) {
            Some(entry) => entry,
            None => unreachable!("slot {slot} is empty"),
        }
    }

    /// Removes the entry at `slot` without ever shrinking, reporting every
    /// `(from, to)` relocation made by backward shifting to `on_move`.
    ///
    /// This is what cursors use: a cursor tracks its position through the
    /// reported moves, which would be impossible across a rehash.
    pub fn remove_slot_with(
        &mut self,
        slot: usize,
        mut on_move: impl FnMut(usize, usize),
    ) -> Option<(K, V)> {
        let entry = self.slots.get_mut(slot)?.take()?;
        self.release(slot, &mut on_move);
        Some(entry)
    }

    /// Bookkeeping for a slot whose entry has already been taken out.
    fn release(&mut self, slot: usize, on_move: &mut impl FnMut(usize, usize)) {
        self.hooks.on_node_removed(slot);
        self.len -= 1;
        self.bump();
        self.shift_keys(slot, on_move);
    }

    /// Closes the hole at `pos` by pulling back every later entry of the
    /// probe run that may legally sit in it.
    fn shift_keys(&mut self, mut pos: usize, on_move: &mut impl FnMut(usize, usize)) {
        loop {
            let last = pos;
            pos = (last + 1) & self.mask;
            loop {
                let ideal = match &self.slots[pos] {
                    None => return,
                    Some((key, _)) => self.ideal_slot(key),
                };
                // The entry may move back iff `last` lies cyclically within
                // [ideal, pos).
                let movable = if last <= pos {
                    ideal <= last || ideal > pos
                } else {
                    ideal <= last && ideal > pos
                };
                if movable {
                    break;
                }
                pos = (pos + 1) & self.mask;
            }
            self.slots[last] = self.slots[pos].take();
            self.hooks.on_node_moved(pos, last);
            on_move(pos, last);
        }
    }

    /// Capacity a sparse table shrinks to, or `None` if it keeps its size.
    fn shrink_target(&self) -> Option<usize> {
        let mut capacity = self.capacity();
        while capacity > self.min_slots
            && self.len < config::max_fill(capacity, self.load_factor) / 4
        {
            capacity = (capacity / 2).max(self.min_slots);
        }
        (capacity != self.capacity()).then_some(capacity)
    }

    fn maybe_shrink(&mut self) {
        let capacity = self.capacity();
        if capacity > self.min_slots && self.len < self.max_fill / 4 {
            let target = (capacity / 2).max(self.min_slots);
            self.rehash_into(allocate(target), vec![None; capacity]);
        }
    }

    /// Runs `f` on the value at `slot` by value.
    ///
    /// If `f` returns `Some`, the new value is stored in place and `true` is
    /// returned. If it returns `None` the entry is removed (possibly
    /// shrinking the table) and `false` is returned. If `f` panics the entry
    /// is removed.
    pub fn compute_in_place(&mut self, slot: usize, f: impl FnOnce(&K, V) -> Option<V>) -> bool {
        struct Vacancy<'a, K, V, S, H>
        where
            S: HashStrategy<K>,
            H: SlotHooks,
        {
            table: &'a mut SlotTable<K, V, S, H>,
            slot: usize,
            refilled: bool,
        }

        impl<K, V, S, H> Drop for Vacancy<'_, K, V, S, H>
        where
            S: HashStrategy<K>,
            H: SlotHooks,
        {
            fn drop(&mut self) {
                if !self.refilled {
                    self.table.release(self.slot, &mut |_, _| {});
                }
            }
        }

        let Some((key, value)) = self.slots.get_mut(slot).and_then(Option::take) else {
            return false;
        };
        let mut vacancy = Vacancy {
            table: self,
            slot,
            refilled: false,
        };
        if let Some(value) = f(&key, value) {
            vacancy.table.slots[slot] = Some((key, value));
            vacancy.refilled = true;
        }
        let refilled = vacancy.refilled;
        drop(vacancy);

        if !refilled {
            self.maybe_shrink();
        }
        refilled
    }

    /// Keeps only the entries for which `f` returns `true`, visiting entries
    /// in traversal order.
    ///
    /// Rejected entries are taken out in a single pass and the survivors are
    /// then reinserted once, into a smaller array if the table has become
    /// sparse.
    pub fn retain(&mut self, mut f: impl FnMut(&K, &mut V) -> bool) {
        struct Rebuild<'a, K, V, S, H>
        where
            S: HashStrategy<K>,
            H: SlotHooks,
        {
            table: &'a mut SlotTable<K, V, S, H>,
            removed: bool,
        }

        impl<K, V, S, H> Drop for Rebuild<'_, K, V, S, H>
        where
            S: HashStrategy<K>,
            H: SlotHooks,
        {
            fn drop(&mut self) {
                if self.removed {
                    let table = &mut *self.table;
                    let capacity = table.shrink_target().unwrap_or(table.capacity());
                    table.rehash_into(allocate(capacity), vec![None; table.capacity()]);
                }
            }
        }

        let mut rebuild = Rebuild {
            table: self,
            removed: false,
        };
        let mut cursor = rebuild.table.first_slot();
        while let Some(slot) = cursor {
            cursor = rebuild.table.next_slot(slot);
            let keep = match &mut rebuild.table.slots[slot] {
                Some((key, value)) => f(key, value),
                None => true,
            };
            if !keep {
                let table = &mut *rebuild.table;
                table.slots[slot] = None;
                table.hooks.on_node_removed(slot);
                table.len -= 1;
                table.bump();
                rebuild.removed = true;
            }
        }
    }

    /// Drops every entry, keeping the slot array.
    pub fn clear(&mut self) {
        if self.len == 0 {
            return;
        }
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.len = 0;
        self.bump();
        self.hooks.on_clear(self.capacity());
    }

    /// Drops every entry and reallocates the slot array for `expected`
    /// entries if that is smaller than the current one.
    pub fn clear_and_trim(&mut self, expected: usize) {
        let capacity = match config::array_size(expected, self.load_factor) {
            Ok(capacity) if capacity < self.capacity() => capacity,
            _ => return self.clear(),
        };
        self.slots = allocate(capacity);
        self.mask = capacity - 1;
        self.max_fill = config::max_fill(capacity, self.load_factor);
        self.len = 0;
        self.bump();
        self.hooks.on_clear(capacity);
    }

    /// Reallocates the slot array to the smallest size holding the current
    /// entries. See [`trim_to`](Self::trim_to).
    pub fn trim(&mut self) -> Result<(), ReserveError> {
        self.trim_to(self.len)
    }

    /// Reallocates the slot array to the smallest size holding
    /// `max(expected, len)` entries, if that is smaller than the current one.
    ///
    /// On allocation failure the table is left untouched.
    pub fn trim_to(&mut self, expected: usize) -> Result<(), ReserveError> {
        let Ok(capacity) = config::array_size(expected.max(self.len), self.load_factor) else {
            return Ok(());
        };
        if capacity >= self.capacity() {
            return Ok(());
        }
        let slots = try_allocate(capacity)?;
        let relocated = try_relocation_table(self.capacity())?;
        self.rehash_into(slots, relocated);
        Ok(())
    }

    /// Makes room for `additional` more entries without growing.
    ///
    /// # Panics
    ///
    /// Panics if the new size overflows, and aborts through
    /// [`handle_alloc_error`](alloc::alloc::handle_alloc_error) if the
    /// allocation fails.
    pub fn reserve(&mut self, additional: usize) {
        let Some(required) = self.len.checked_add(additional) else {
            capacity_overflow()
        };
        if required <= self.max_fill {
            return;
        }
        let capacity = sized_or_panic(required, self.load_factor);
        if capacity > self.capacity() {
            let relocated = vec![None; self.capacity()];
            self.rehash_into(allocate(capacity), relocated);
        }
    }

    /// Fallible [`reserve`](Self::reserve). On failure the table is left
    /// untouched.
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), ReserveError> {
        let required = self
            .len
            .checked_add(additional)
            .ok_or(ReserveError::CapacityOverflow)?;
        if required <= self.max_fill {
            return Ok(());
        }
        let capacity = config::array_size(required, self.load_factor)
            .map_err(|_| ReserveError::CapacityOverflow)?;
        if capacity > self.capacity() {
            let slots = try_allocate(capacity)?;
            let relocated = try_relocation_table(self.capacity())?;
            self.rehash_into(slots, relocated);
        }
        Ok(())
    }
}

impl<K, V, S, H> SlotTable<K, V, S, H>
where
    H: SlotHooks,
{
    #[inline]
    pub(crate) fn first_slot(&self) -> Option<usize> {
        let slots = &self.slots;
        self.hooks.first_slot(slots.len(), |i| slots[i].is_some())
    }

    #[inline]
    pub(crate) fn last_slot(&self) -> Option<usize> {
        let slots = &self.slots;
        self.hooks.last_slot(slots.len(), |i| slots[i].is_some())
    }

    #[inline]
    pub(crate) fn next_slot(&self, slot: usize) -> Option<usize> {
        let slots = &self.slots;
        self.hooks.next_slot(slot, slots.len(), |i| slots[i].is_some())
    }

    #[inline]
    pub(crate) fn prev_slot(&self, slot: usize) -> Option<usize> {
        let slots = &self.slots;
        self.hooks.prev_slot(slot, slots.len(), |i| slots[i].is_some())
    }

    /// Iterates over the entries in traversal order.
    pub fn iter(&self) -> Iter<'_, K, V, H> {
        Iter {
            slots: &self.slots,
            hooks: &self.hooks,
            front: self.first_slot(),
            back: self.last_slot(),
            remaining: self.len,
        }
    }

    /// Iterates over the entries in traversal order, with mutable values.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V, H> {
        let front = self.first_slot();
        let back = self.last_slot();
        let capacity = self.slots.len();
        IterMut {
            slots: NonNull::from(&mut *self.slots).cast(),
            capacity,
            hooks: &self.hooks,
            front,
            back,
            remaining: self.len,
            _marker: PhantomData,
        }
    }
}

impl<K, V, S, H> SlotTable<K, V, S, H>
where
    H: SlotHooks + Default,
{
    /// Removes every entry, yielding them in traversal order.
    ///
    /// The slot array moves into the iterator and is handed back, emptied,
    /// when the iterator is dropped, so the table keeps its capacity even if
    /// the iterator was not exhausted. A leaked iterator leaves the table
    /// empty at the minimum capacity.
    pub fn drain(&mut self) -> Drain<'_, K, V, S, H> {
        let front = self.first_slot();
        let back = self.last_slot();
        let remaining = self.len;

        let mut placeholder = H::default();
        placeholder.on_init(config::MIN_ARRAY_SIZE);
        let slots = core::mem::replace(&mut self.slots, allocate(config::MIN_ARRAY_SIZE));
        let hooks = core::mem::replace(&mut self.hooks, placeholder);
        self.mask = config::MIN_ARRAY_SIZE - 1;
        self.max_fill = config::max_fill(config::MIN_ARRAY_SIZE, self.load_factor);
        self.len = 0;
        if remaining > 0 {
            self.bump();
        }

        Drain {
            table: self,
            slots,
            hooks,
            front,
            back,
            remaining,
        }
    }
}

/// Iterator over the entries of a [`SlotTable`] in traversal order.
pub struct Iter<'a, K, V, H> {
    slots: &'a [Slot<K, V>],
    hooks: &'a H,
    front: Option<usize>,
    back: Option<usize>,
    remaining: usize,
}

impl<K, V, H> Clone for Iter<'_, K, V, H> {
    fn clone(&self) -> Self {
        Self {
            slots: self.slots,
            hooks: self.hooks,
            front: self.front,
            back: self.back,
            remaining: self.remaining,
        }
    }
}

impl<K: Debug, V: Debug, H: SlotHooks> Debug for Iter<'_, K, V, H> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

impl<'a, K, V, H: SlotHooks> Iterator for Iter<'a, K, V, H> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let slot = self.front?;
        let slots = self.slots;
        self.remaining -= 1;
        if self.remaining > 0 {
            self.front = self
                .hooks
                .next_slot(slot, slots.len(), |i| slots[i].is_some());
        }
        slots[slot].as_ref().map(|(k, v)| (k, v))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V, H: SlotHooks> DoubleEndedIterator for Iter<'_, K, V, H> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let slot = self.back?;
        let slots = self.slots;
        self.remaining -= 1;
        if self.remaining > 0 {
            self.back = self
                .hooks
                .prev_slot(slot, slots.len(), |i| slots[i].is_some());
        }
        slots[slot].as_ref().map(|(k, v)| (k, v))
    }
}

impl<K, V, H: SlotHooks> ExactSizeIterator for Iter<'_, K, V, H> {}

impl<K, V, H: SlotHooks> FusedIterator for Iter<'_, K, V, H> {}

/// Iterator over the entries of a [`SlotTable`] in traversal order, with
/// mutable values.
pub struct IterMut<'a, K, V, H> {
    slots: NonNull<Slot<K, V>>,
    capacity: usize,
    hooks: &'a H,
    front: Option<usize>,
    back: Option<usize>,
    remaining: usize,
    _marker: PhantomData<&'a mut [Slot<K, V>]>,
}

// SAFETY: `IterMut` behaves like `&mut [(K, V)]` plus a shared `&H`.
unsafe impl<K: Send, V: Send, H: Sync> Send for IterMut<'_, K, V, H> {}
// SAFETY: Shared access to `IterMut` grants no access to the slots.
unsafe impl<K: Sync, V: Sync, H: Sync> Sync for IterMut<'_, K, V, H> {}

impl<K, V, H: SlotHooks> IterMut<'_, K, V, H> {
    #[inline]
    fn occupied(&self) -> impl Fn(usize) -> bool {
        let slots = self.slots;
        let capacity = self.capacity;
        move |i| {
            debug_assert!(i < capacity);
            // SAFETY: `i < capacity`, and only the occupancy tag of slots
            // that have not been yielded is read: both traversal ends stop at
            // the first occupied slot, which is never past the other end
            // while `remaining > 0`.
            unsafe { (*slots.as_ptr().add(i)).is_some() }
        }
    }

    /// # Safety
    ///
    /// `slot` must be in bounds and must not have been yielded before.
    #[inline]
    unsafe fn yield_slot<'b>(&mut self, slot: usize) -> Option<(&'b K, &'b mut V)> {
        // SAFETY: Guaranteed by the caller; each slot is handed out once, so
        // the mutable borrows never alias.
        let entry = unsafe { &mut *self.slots.as_ptr().add(slot) };
        entry.as_mut().map(|(k, v)| (&*k, v))
    }
}

impl<'a, K, V, H: SlotHooks> Iterator for IterMut<'a, K, V, H> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let slot = self.front?;
        self.remaining -= 1;
        if self.remaining > 0 {
            self.front = self.hooks.next_slot(slot, self.capacity, self.occupied());
        }
        // SAFETY: `slot` came from the traversal, which visits every slot at
        // most once and stops after `len` slots.
        unsafe { self.yield_slot(slot) }
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V, H: SlotHooks> DoubleEndedIterator for IterMut<'_, K, V, H> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let slot = self.back?;
        self.remaining -= 1;
        if self.remaining > 0 {
            self.back = self.hooks.prev_slot(slot, self.capacity, self.occupied());
        }
        // SAFETY: See `next`.
        unsafe { self.yield_slot(slot) }
    }
}

impl<K, V, H: SlotHooks> ExactSizeIterator for IterMut<'_, K, V, H> {}

impl<K, V, H: SlotHooks> FusedIterator for IterMut<'_, K, V, H> {}

/// Draining iterator over the entries of a [`SlotTable`].
///
/// Owns the table's slot array and hooks until dropped. The borrowed table
/// meanwhile holds an empty minimum-size array.
pub struct Drain<'a, K, V, S, H: SlotHooks> {
    table: &'a mut SlotTable<K, V, S, H>,
    slots: Box<[Slot<K, V>]>,
    hooks: H,
    front: Option<usize>,
    back: Option<usize>,
    remaining: usize,
}

impl<K, V, S, H: SlotHooks> Iterator for Drain<'_, K, V, S, H> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let slot = self.front?;
        self.remaining -= 1;
        // Take after stepping: the unordered traversal reads occupancy.
        if self.remaining > 0 {
            let slots = &self.slots;
            self.front = self
                .hooks
                .next_slot(slot, slots.len(), |i| slots[i].is_some());
        }
        self.slots[slot].take()
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V, S, H: SlotHooks> DoubleEndedIterator for Drain<'_, K, V, S, H> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let slot = self.back?;
        self.remaining -= 1;
        if self.remaining > 0 {
            let slots = &self.slots;
            self.back = self
                .hooks
                .prev_slot(slot, slots.len(), |i| slots[i].is_some());
        }
        self.slots[slot].take()
    }
}

impl<K, V, S, H: SlotHooks> ExactSizeIterator for Drain<'_, K, V, S, H> {}

impl<K, V, S, H: SlotHooks> FusedIterator for Drain<'_, K, V, S, H> {}

impl<K, V, S, H: SlotHooks> Drop for Drain<'_, K, V, S, H> {
    fn drop(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        let table = &mut *self.table;
        core::mem::swap(&mut table.slots, &mut self.slots);
        core::mem::swap(&mut table.hooks, &mut self.hooks);
        let capacity = table.slots.len();
        table.mask = capacity - 1;
        table.max_fill = config::max_fill(capacity, table.load_factor);
        table.hooks.on_clear(capacity);
    }
}

/// Owning iterator over the entries of a [`SlotTable`].
pub struct IntoIter<K, V, S, H: SlotHooks> {
    table: SlotTable<K, V, S, H>,
    front: Option<usize>,
    back: Option<usize>,
    remaining: usize,
}

impl<K, V, S, H: SlotHooks> IntoIterator for SlotTable<K, V, S, H> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V, S, H>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            front: self.first_slot(),
            back: self.last_slot(),
            remaining: self.len,
            table: self,
        }
    }
}

impl<K, V, S, H: SlotHooks> Iterator for IntoIter<K, V, S, H> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let slot = self.front?;
        self.remaining -= 1;
        if self.remaining > 0 {
            self.front = self.table.next_slot(slot);
        }
        self.table.slots[slot].take()
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V, S, H: SlotHooks> DoubleEndedIterator for IntoIter<K, V, S, H> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let slot = self.back?;
        self.remaining -= 1;
        if self.remaining > 0 {
            self.back = self.table.prev_slot(slot);
        }
        self.table.slots[slot].take()
    }
}

impl<K, V, S, H: SlotHooks> ExactSizeIterator for IntoIter<K, V, S, H> {}

impl<K, V, S, H: SlotHooks> FusedIterator for IntoIter<K, V, S, H> {}

#[cfg(test)]
impl<K, V, S, H> SlotTable<K, V, S, H>
where
    S: HashStrategy<K>,
    H: SlotHooks,
{
    /// Asserts probe contiguity, the length count and traversal coverage.
    pub(crate) fn assert_invariants(&self) {
        let mut occupied = 0;
        for slot in 0..self.capacity() {
            let Some((key, _)) = &self.slots[slot] else {
                continue;
            };
            occupied += 1;
            let mut pos = self.ideal_slot(key);
            while pos != slot {
                assert!(
                    self.slots[pos].is_some(),
                    "hole at {pos} between ideal slot and slot {slot}"
                );
                pos = (pos + 1) & self.mask;
            }
            assert_eq!(self.find_slot(key), Ok(slot));
        }
        assert_eq!(occupied, self.len);
        assert!(self.len <= self.max_fill);
        assert!(self.capacity().is_power_of_two());

        let mut seen = vec![false; self.capacity()];
        let mut forward = 0;
        let mut cursor = self.first_slot();
        while let Some(slot) = cursor {
            assert!(self.is_occupied(slot));
            assert!(!seen[slot], "slot {slot} visited twice");
            seen[slot] = true;
            forward += 1;
            cursor = self.next_slot(slot);
        }
        assert_eq!(forward, self.len);

        let mut backward = 0;
        let mut cursor = self.last_slot();
        while let Some(slot) = cursor {
            assert!(seen[slot]);
            backward += 1;
            cursor = self.prev_slot(slot);
        }
        assert_eq!(backward, self.len);
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;
    use alloc::vec::Vec;

    use super::*;
    use crate::strategy::FnStrategy;

    type KeyFn = fn(&u64) -> u64;
    type EqFn = fn(&u64, &u64) -> bool;
    type Strategy = FnStrategy<KeyFn, EqFn>;

    fn same(a: &u64, b: &u64) -> bool {
        a == b
    }

    /// Hashes keys to themselves.
    fn identity() -> Strategy {
        fn hash(key: &u64) -> u64 {
            *key
        }
        FnStrategy::new(hash as KeyFn, same as EqFn)
    }

    /// Hashes keys to `key / 100`, so keys of the same hundred collide.
    fn hundreds() -> Strategy {
        fn hash(key: &u64) -> u64 {
            key / 100
        }
        FnStrategy::new(hash as KeyFn, same as EqFn)
    }

    fn small<H: SlotHooks + Default>(strategy: Strategy) -> SlotTable<u64, u64, Strategy, H> {
        let config = TableConfig::new(6, 0.75).unwrap();
        SlotTable::with_config(config, strategy).unwrap()
    }

    fn put<H: SlotHooks>(table: &mut SlotTable<u64, u64, Strategy, H>, key: u64) -> usize {
        match table.find_slot(&key) {
            Ok(slot) => slot,
            Err(slot) => table.insert(slot, key, key * 10),
        }
    }

    fn take<H: SlotHooks>(table: &mut SlotTable<u64, u64, Strategy, H>, key: u64) -> Option<u64> {
        let slot = table.find_slot(&key).ok()?;
        table.remove_slot(slot).map(|(_, v)| v)
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Event {
        Init(usize),
        Added(usize),
        Removed(usize),
        Moved(usize, usize),
        Rehash(usize),
        Clear(usize),
    }

    #[derive(Default)]
    struct Recorder {
        events: Vec<Event>,
    }

    impl SlotHooks for Recorder {
        fn on_init(&mut self, capacity: usize) {
            self.events.push(Event::Init(capacity));
        }

        fn on_node_added(&mut self, slot: usize) {
            self.events.push(Event::Added(slot));
        }

        fn on_node_removed(&mut self, slot: usize) {
            self.events.push(Event::Removed(slot));
        }

        fn on_node_moved(&mut self, from: usize, to: usize) {
            self.events.push(Event::Moved(from, to));
        }

        fn on_rehash(&mut self, capacity: usize, _relocated: &[Option<usize>]) {
            self.events.push(Event::Rehash(capacity));
        }

        fn on_clear(&mut self, capacity: usize) {
            self.events.push(Event::Clear(capacity));
        }

        fn first_slot(&self, capacity: usize, occupied: impl Fn(usize) -> bool) -> Option<usize> {
            Unordered.first_slot(capacity, occupied)
        }

        fn last_slot(&self, capacity: usize, occupied: impl Fn(usize) -> bool) -> Option<usize> {
            Unordered.last_slot(capacity, occupied)
        }

        fn next_slot(
            &self,
            slot: usize,
            capacity: usize,
            occupied: impl Fn(usize) -> bool,
        ) -> Option<usize> {
            Unordered.next_slot(slot, capacity, occupied)
        }

        fn prev_slot(
            &self,
            slot: usize,
            capacity: usize,
            occupied: impl Fn(usize) -> bool,
        ) -> Option<usize> {
            Unordered.prev_slot(slot, capacity, occupied)
        }
    }

    #[test]
    fn test_keys_land_on_ideal_slots() {
        let mut table = small::<Unordered>(identity());
        assert_eq!(table.capacity(), 8);

        for key in [5, 0, 9] {
            put(&mut table, key);
        }
        assert_eq!(table.find_slot(&5), Ok(7));
        assert_eq!(table.find_slot(&0), Ok(0));
        assert_eq!(table.find_slot(&9), Ok(5));
        assert_eq!(table.get(7), Some((&5, &50)));
        assert_eq!(table.len(), 3);
        table.assert_invariants();
    }

    #[test]
    fn test_missing_key_reports_insertion_point() {
        let mut table = small::<Unordered>(identity());
        put(&mut table, 5);
        // 9 and 4 both start probing at slot 5.
        put(&mut table, 9);
        assert_eq!(table.find_slot(&4), Err(6));
        assert_eq!(table.find_slot(&1), Err(1));
    }

    #[test]
    fn test_growth_at_fill_threshold() {
        let mut table = small::<Unordered>(identity());
        assert_eq!(table.max_fill(), 6);

        for key in 0..6 {
            put(&mut table, key);
        }
        assert_eq!(table.capacity(), 8);

        put(&mut table, 6);
        assert_eq!(table.capacity(), 16);
        assert_eq!(table.max_fill(), 12);
        for key in 0..7 {
            assert_eq!(table.get(table.find_slot(&key).unwrap()), Some((&key, &(key * 10))));
        }
        table.assert_invariants();
    }

    #[test]
    fn test_insert_returns_final_slot_after_growth() {
        let mut table = small::<Unordered>(identity());
        for key in 0..6 {
            put(&mut table, key);
        }
        let slot = put(&mut table, 100);
        assert_eq!(table.get(slot), Some((&100, &1000)));
    }

    #[test]
    fn test_remove_shifts_collided_key_back() {
        let mut table = small::<Unordered>(hundreds());
        for key in [100, 101, 102] {
            put(&mut table, key);
        }
        assert_eq!(table.find_slot(&100), Ok(1));
        assert_eq!(table.find_slot(&101), Ok(2));
        assert_eq!(table.find_slot(&102), Ok(3));

        assert_eq!(take(&mut table, 101), Some(1010));
        assert_eq!(table.find_slot(&102), Ok(2));
        assert_eq!(table.find_slot(&100), Ok(1));
        assert!(!table.is_occupied(3));
        table.assert_invariants();
    }

    #[test]
    fn test_remove_leaves_entries_at_home() {
        let mut table = small::<Unordered>(hundreds());
        for key in [100, 200, 101] {
            put(&mut table, key);
        }
        assert_eq!(table.find_slot(&101), Ok(3));

        take(&mut table, 100);
        assert_eq!(table.find_slot(&200), Ok(2));
        assert_eq!(table.find_slot(&101), Ok(1));
        table.assert_invariants();
    }

    #[test]
    fn test_remove_across_wraparound() {
        let mut table = small::<Recorder>(hundreds());
        // 500..=502 start at slot 7, 0 starts at slot 0.
        for key in [500, 501, 0, 502] {
            put(&mut table, key);
        }
        assert_eq!(table.find_slot(&500), Ok(7));
        assert_eq!(table.find_slot(&501), Ok(0));
        assert_eq!(table.find_slot(&0), Ok(1));
        assert_eq!(table.find_slot(&502), Ok(2));

        let mut moves = Vec::new();
        let removed = table.remove_slot_with(7, |from, to| moves.push((from, to)));
        assert_eq!(removed, Some((500, 5000)));
        assert_eq!(moves, vec![(0, 7), (1, 0), (2, 1)]);

        assert_eq!(table.find_slot(&501), Ok(7));
        assert_eq!(table.find_slot(&0), Ok(0));
        assert_eq!(table.find_slot(&502), Ok(1));
        assert!(table.hooks().events.ends_with(&[
            Event::Removed(7),
            Event::Moved(0, 7),
            Event::Moved(1, 0),
            Event::Moved(2, 1),
        ]));
        table.assert_invariants();
    }

    #[test]
    fn test_hooks_see_every_change() {
        let mut table = small::<Recorder>(identity());
        put(&mut table, 5);
        take(&mut table, 5);
        for key in 0..7 {
            put(&mut table, key);
        }
        table.clear();

        let events = &table.hooks().events;
        assert_eq!(events[0], Event::Init(8));
        assert_eq!(events[1], Event::Added(7));
        assert_eq!(events[2], Event::Removed(7));
        assert!(events.contains(&Event::Rehash(16)));
        assert_eq!(events.last(), Some(&Event::Clear(16)));
    }

    #[test]
    fn test_shrink_after_removals() {
        let mut table = small::<Unordered>(identity());
        for key in 0..7 {
            put(&mut table, key);
        }
        assert_eq!(table.capacity(), 16);

        for key in 0..4 {
            take(&mut table, key);
        }
        assert_eq!(table.len(), 3);
        assert_eq!(table.capacity(), 16);

        take(&mut table, 4);
        assert_eq!(table.len(), 2);
        assert_eq!(table.capacity(), 8);
        assert_eq!(table.max_fill(), 6);
        for key in [5, 6] {
            assert!(table.find_slot(&key).is_ok());
        }
        table.assert_invariants();
    }

    #[test]
    fn test_never_shrinks_below_initial_capacity() {
        let mut table = small::<Unordered>(identity());
        for key in 0..100 {
            put(&mut table, key);
        }
        for key in 0..100 {
            assert_eq!(take(&mut table, key), Some(key * 10));
        }
        assert!(table.is_empty());
        assert_eq!(table.capacity(), table.min_capacity());
        assert_eq!(table.capacity(), 8);
    }

    #[test]
    fn test_remove_slot_with_never_shrinks() {
        let mut table = small::<Unordered>(identity());
        for key in 0..7 {
            put(&mut table, key);
        }
        for key in 0..7 {
            let slot = table.find_slot(&key).unwrap();
            table.remove_slot_with(slot, |_, _| {});
        }
        assert_eq!(table.capacity(), 16);
        assert_eq!(table.remove_slot_with(0, |_, _| {}), None);
        assert_eq!(table.remove_slot_with(99, |_, _| {}), None);
    }

    #[test]
    #[should_panic]
    fn test_insert_into_occupied_slot_panics() {
        let mut table = small::<Unordered>(identity());
        let slot = put(&mut table, 5);
        table.insert(slot, 13, 0);
    }

    #[test]
    fn test_compute_in_place() {
        let mut table = small::<Unordered>(hundreds());
        for key in [100, 101, 102] {
            put(&mut table, key);
        }

        assert!(table.compute_in_place(1, |_, v| Some(v + 1)));
        assert_eq!(table.get(1), Some((&100, &1001)));

        assert!(!table.compute_in_place(2, |_, _| None));
        assert_eq!(table.len(), 2);
        assert_eq!(table.find_slot(&102), Ok(2));
        assert!(!table.compute_in_place(5, |_, v| Some(v)));
        table.assert_invariants();
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_compute_in_place_panic_removes_entry() {
        use std::panic::AssertUnwindSafe;
        use std::panic::catch_unwind;

        let mut table = small::<Unordered>(hundreds());
        for key in [100, 101, 102] {
            put(&mut table, key);
        }
        let result = catch_unwind(AssertUnwindSafe(|| {
            table.compute_in_place(1, |_, _| panic!("boom"));
        }));
        assert!(result.is_err());
        assert_eq!(table.len(), 2);
        assert!(table.find_slot(&100).is_err());
        assert_eq!(table.find_slot(&101), Ok(1));
        table.assert_invariants();
    }

    #[test]
    fn test_retain_rebuilds_and_shrinks() {
        let mut table = small::<Unordered>(hundreds());
        for key in (0..40).chain(100..140) {
            put(&mut table, key);
        }
        let before = table.capacity();

        let mut visited = 0;
        table.retain(|key, value| {
            visited += 1;
            *value += 1;
            key % 10 == 0
        });
        assert_eq!(visited, 80);
        assert_eq!(table.len(), 8);
        assert!(table.capacity() < before);
        for key in (0..40).chain(100..140).filter(|k| k % 10 == 0) {
            let slot = table.find_slot(&key).unwrap();
            assert_eq!(table.get(slot), Some((&key, &(key * 10 + 1))));
        }
        table.assert_invariants();
    }

    #[test]
    fn test_retain_keeping_everything_is_not_a_modification() {
        let mut table = small::<Unordered>(identity());
        for key in 0..5 {
            put(&mut table, key);
        }
        let modifications = table.modifications();
        table.retain(|_, _| true);
        assert_eq!(table.modifications(), modifications);
    }

    #[test]
    fn test_clear_keeps_capacity() {
        let mut table = small::<Unordered>(identity());
        for key in 0..20 {
            put(&mut table, key);
        }
        let capacity = table.capacity();
        table.clear();
        assert!(table.is_empty());
        assert_eq!(table.capacity(), capacity);
        assert_eq!(table.iter().count(), 0);
        put(&mut table, 3);
        table.assert_invariants();
    }

    #[test]
    fn test_clear_and_trim() {
        let mut table = small::<Unordered>(identity());
        for key in 0..100 {
            put(&mut table, key);
        }
        table.clear_and_trim(3);
        assert!(table.is_empty());
        assert_eq!(table.capacity(), 4);

        table.clear_and_trim(1000);
        assert_eq!(table.capacity(), 4);
        put(&mut table, 1);
        table.assert_invariants();
    }

    #[test]
    fn test_trim_to_current_size() {
        let mut table = SlotTable::<u64, u64, Strategy, Unordered>::new(identity());
        for key in 0..100 {
            put(&mut table, key);
        }
        assert_eq!(table.capacity(), 256);
        for key in 10..100 {
            let slot = table.find_slot(&key).unwrap();
            table.remove_slot_with(slot, |_, _| {});
        }
        assert_eq!(table.capacity(), 256);

        assert!(table.trim().is_ok());
        assert_eq!(table.capacity(), 16);
        for key in 0..10 {
            assert!(table.find_slot(&key).is_ok());
        }
        table.assert_invariants();

        assert!(table.trim_to(100).is_ok());
        assert_eq!(table.capacity(), 16);
    }

    #[test]
    fn test_reserve() {
        let mut table = small::<Unordered>(identity());
        table.reserve(100);
        assert!(table.max_fill() >= 100);
        let capacity = table.capacity();
        for key in 0..100 {
            put(&mut table, key);
        }
        assert_eq!(table.capacity(), capacity);

        assert!(table.try_reserve(10).is_ok());
        assert_eq!(
            table.try_reserve(usize::MAX),
            Err(ReserveError::CapacityOverflow)
        );
        assert_eq!(table.len(), 100);
        table.assert_invariants();
    }

    #[test]
    fn test_iter_both_ends() {
        let mut table = small::<Unordered>(identity());
        for key in 0..10 {
            put(&mut table, key);
        }
        let forward: Vec<_> = table.iter().map(|(k, _)| *k).collect();
        let mut backward: Vec<_> = table.iter().rev().map(|(k, _)| *k).collect();
        backward.reverse();
        assert_eq!(forward, backward);
        assert_eq!(table.iter().len(), 10);

        let mut iter = table.iter();
        let first = iter.next();
        let last = iter.next_back();
        assert_eq!(iter.len(), 8);
        assert_ne!(first, last);
        assert_eq!(iter.count(), 8);
    }

    #[test]
    fn test_iter_mut_updates_values() {
        let mut table = small::<Unordered>(identity());
        for key in 0..10 {
            put(&mut table, key);
        }
        let mut iter = table.iter_mut();
        while let Some((_, value)) = iter.next() {
            *value += 1;
            if let Some((_, value)) = iter.next_back() {
                *value += 2;
            }
        }
        let total: u64 = table.iter().map(|(_, v)| *v).sum();
        assert_eq!(total, (0..10).map(|k| k * 10).sum::<u64>() + 15);
    }

    #[test]
    fn test_drain_empties_table() {
        let mut table = small::<Unordered>(identity());
        for key in 0..10 {
            put(&mut table, key);
        }
        let mut drained: Vec<_> = table.drain().map(|(k, _)| k).collect();
        drained.sort_unstable();
        assert_eq!(drained, (0..10).collect::<Vec<_>>());
        assert!(table.is_empty());

        for key in 0..10 {
            put(&mut table, key);
        }
        let mut drain = table.drain();
        drain.next();
        drop(drain);
        assert!(table.is_empty());
        assert_eq!(table.iter().count(), 0);
        table.assert_invariants();
    }

    #[test]
    fn test_leaked_drain_leaves_empty_table() {
        let mut table = small::<Unordered>(identity());
        for key in 0..6 {
            put(&mut table, key);
        }
        let before = table.modifications();
        let mut drain = table.drain();
        assert!(drain.next().is_some());
        core::mem::forget(drain);

        assert!(table.is_empty());
        assert_eq!(table.capacity(), config::MIN_ARRAY_SIZE);
        assert_eq!(table.iter().count(), 0);
        assert_ne!(table.modifications(), before);
        table.assert_invariants();

        for key in 0..6 {
            put(&mut table, key);
        }
        assert_eq!(table.len(), 6);
        for key in 0..6 {
            assert!(table.find_slot(&key).is_ok());
        }
        table.assert_invariants();
    }

    #[test]
    fn test_drain_restores_capacity_and_hooks() {
        let mut table = small::<Recorder>(identity());
        for key in 0..5 {
            put(&mut table, key);
        }
        let capacity = table.capacity();
        let mut drain = table.drain();
        assert!(drain.next_back().is_some());
        drop(drain);

        assert!(table.is_empty());
        assert_eq!(table.capacity(), capacity);
        assert_eq!(table.hooks().events.last(), Some(&Event::Clear(capacity)));
        table.assert_invariants();
    }

    #[test]
    fn test_into_iter() {
        let mut table = small::<Unordered>(identity());
        for key in 0..10 {
            put(&mut table, key);
        }
        let mut keys: Vec<_> = table.into_iter().map(|(k, _)| k).collect();
        keys.sort_unstable();
        assert_eq!(keys, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_debug_stats() {
        let mut table = small::<Unordered>(hundreds());
        for key in [100, 101, 102, 500] {
            put(&mut table, key);
        }
        let stats = table.debug_stats();
        assert_eq!(stats.len, 4);
        assert_eq!(stats.capacity, 8);
        assert_eq!(stats.longest_probe, 2);
        assert_eq!(table.probe_histogram(), vec![2, 1, 1]);

        let debug = alloc::format!("{table:?}");
        assert!(debug.contains("displacements"));
    }
}
