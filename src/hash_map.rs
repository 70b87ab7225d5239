use alloc::vec::Vec;
use core::fmt::Debug;
use core::iter::FusedIterator;
use core::ops::Index;

use crate::config::TableConfig;
use crate::error::ConfigError;
use crate::error::IterError;
use crate::error::ReserveError;
#[cfg(any(test, feature = "stats"))]
use crate::slot_table::DebugStats;
pub use crate::slot_table::Drain;
pub use crate::slot_table::IntoIter;
pub use crate::slot_table::Iter;
pub use crate::slot_table::IterMut;
use crate::slot_table::SlotHooks;
use crate::slot_table::SlotTable;
use crate::slot_table::Unordered;
use crate::strategy::HashStrategy;

/// A hash map backed by an open-addressing [`SlotTable`].
///
/// `HashMap<K, V, S, O>` stores key-value pairs, hashing and comparing keys
/// through the [`HashStrategy`] `S`. The order parameter `O` decides
/// iteration order: [`Unordered`] (the default) gives no guarantee, while
/// [`OrderIndex`](crate::order_index::OrderIndex) gives insertion order (see
/// [`LinkedHashMap`](crate::LinkedHashMap)).
///
/// # Performance Characteristics
///
/// - **Memory**: one `Option<(K, V)>` per slot, with at least
///   `1 / load_factor` slots per entry. Insertion-ordered maps add two
///   `Option<usize>` links per slot.
/// - **Lookups**: a single linear probe from the key's ideal slot; removals
///   shift entries back instead of leaving tombstones, so probe runs never
///   degrade over time.
#[derive(Clone)]
pub struct HashMap<K, V, S, O = Unordered> {
    table: SlotTable<K, V, S, O>,
}

impl<K, V, S, O> Debug for HashMap<K, V, S, O>
where
    K: Debug,
    V: Debug,
    O: SlotHooks,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut map = f.debug_map();
        for (k, v) in self.iter() {
            map.entry(k, v);
        }
        map.finish()
    }
}

impl<K, V, S, O> HashMap<K, V, S, O>
where
    S: HashStrategy<K>,
    O: SlotHooks + Default,
{
    /// Creates an empty map using `strategy` for hashing and equality.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use probe_map::HashMap;
    /// use probe_map::strategy::FnStrategy;
    ///
    /// // Keys that differ only in ASCII case are the same key.
    /// let strategy = FnStrategy::new(
    ///     |key: &String| {
    ///         key.bytes().fold(0u64, |h, b| {
    ///             h.wrapping_mul(31).wrapping_add(b.to_ascii_lowercase() as u64)
    ///         })
    ///     },
    ///     |a: &String, b: &String| a.eq_ignore_ascii_case(b),
    /// );
    /// let mut map: HashMap<_, i32, _> = HashMap::with_strategy(strategy);
    /// map.insert("Key".to_string(), 1);
    /// assert_eq!(map.insert("KEY".to_string(), 2), Some(1));
    /// assert_eq!(map.len(), 1);
    /// ```
    pub fn with_strategy(strategy: S) -> Self {
        Self {
            table: SlotTable::new(strategy),
        }
    }

    /// Creates an empty map that holds at least `capacity` entries before
    /// growing.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` cannot be backed by any slot array.
    pub fn with_capacity_and_strategy(capacity: usize, strategy: S) -> Self {
        Self {
            table: SlotTable::with_capacity(capacity, strategy),
        }
    }

    /// Creates an empty map from a validated configuration.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use probe_map::HashMap;
    /// use probe_map::config::TableConfig;
    /// use probe_map::error::ConfigError;
    /// use probe_map::strategy::DefaultStrategy;
    ///
    /// let config = TableConfig::new(6, 0.75)?;
    /// let map: HashMap<u64, u64, _> = HashMap::with_config(config, DefaultStrategy::default())?;
    /// assert_eq!(map.capacity(), 8);
    ///
    /// let config = TableConfig::default().with_load_factor(1.5);
    /// let err = HashMap::<u64, u64, _>::with_config(config, DefaultStrategy::default());
    /// assert!(matches!(err, Err(ConfigError::InvalidLoadFactor(_))));
    /// # Ok::<(), ConfigError>(())
    /// ```
    pub fn with_config(config: TableConfig, strategy: S) -> Result<Self, ConfigError> {
        Ok(Self {
            table: SlotTable::with_config(config, strategy)?,
        })
    }
}

impl<K, V, S, O> HashMap<K, V, S, O>
where
    S: HashStrategy<K> + Default,
    O: SlotHooks + Default,
{
    /// Creates an empty map with the default strategy.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use probe_map::HashMap;
    /// use probe_map::strategy::DefaultStrategy;
    ///
    /// let map: HashMap<i32, String, DefaultStrategy> = HashMap::new();
    /// assert!(map.is_empty());
    /// ```
    pub fn new() -> Self {
        Self::with_strategy(S::default())
    }

    /// Creates an empty map with the default strategy that holds at least
    /// `capacity` entries before growing.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_strategy(capacity, S::default())
    }
}

impl<K, V, S, O> Default for HashMap<K, V, S, O>
where
    S: HashStrategy<K> + Default,
    O: SlotHooks + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S, O> HashMap<K, V, S, O>
where
    O: SlotHooks,
{
    /// Returns the number of entries in the map.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use probe_map::HashMap;
    /// use probe_map::strategy::DefaultStrategy;
    ///
    /// let mut map: HashMap<i32, &str, DefaultStrategy> = HashMap::new();
    /// assert_eq!(map.len(), 0);
    /// map.insert(1, "a");
    /// assert_eq!(map.len(), 1);
    /// ```
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the map contains no entries.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns the number of slots in the underlying table.
    ///
    /// The map grows once it holds `capacity() * load_factor()` entries.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Returns the configured load factor.
    pub fn load_factor(&self) -> f32 {
        self.table.load_factor()
    }

    /// Returns the map's hashing strategy.
    pub fn strategy(&self) -> &S {
        self.table.strategy()
    }

    /// Returns the underlying slot table.
    pub fn table(&self) -> &SlotTable<K, V, S, O> {
        &self.table
    }

    pub(crate) fn table_mut(&mut self) -> &mut SlotTable<K, V, S, O> {
        &mut self.table
    }

    /// An iterator visiting all key-value pairs.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use probe_map::HashMap;
    /// use probe_map::strategy::DefaultStrategy;
    ///
    /// let mut map: HashMap<&str, i32, DefaultStrategy> = HashMap::new();
    /// map.insert("a", 1);
    /// map.insert("b", 2);
    ///
    /// let mut pairs: Vec<_> = map.iter().collect();
    /// pairs.sort();
    /// assert_eq!(pairs, [(&"a", &1), (&"b", &2)]);
    /// ```
    pub fn iter(&self) -> Iter<'_, K, V, O> {
        self.table.iter()
    }

    /// An iterator visiting all key-value pairs, with mutable references to
    /// the values.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V, O> {
        self.table.iter_mut()
    }

    /// An iterator visiting all keys.
    pub fn keys(&self) -> Keys<'_, K, V, O> {
        Keys { inner: self.iter() }
    }

    /// An iterator visiting all values.
    pub fn values(&self) -> Values<'_, K, V, O> {
        Values { inner: self.iter() }
    }

    /// An iterator visiting all values mutably.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use probe_map::HashMap;
    /// use probe_map::strategy::DefaultStrategy;
    ///
    /// let mut map: HashMap<&str, i32, DefaultStrategy> = HashMap::new();
    /// map.insert("a", 1);
    /// map.insert("b", 2);
    /// for value in map.values_mut() {
    ///     *value *= 10;
    /// }
    /// assert_eq!(map.get(&"b"), Some(&20));
    /// ```
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V, O> {
        ValuesMut {
            inner: self.iter_mut(),
        }
    }

    /// Clears the map, returning all key-value pairs as an iterator.
    ///
    /// The map keeps its capacity. If the iterator is dropped before being
    /// fully consumed, the remaining pairs are dropped. If it is leaked, the
    /// map is left empty at its smallest capacity.
    pub fn drain(&mut self) -> Drain<'_, K, V, S, O>
    where
        O: Default,
    {
        self.table.drain()
    }

    /// Calls `f` on every entry.
    pub fn for_each(&self, mut f: impl FnMut(&K, &V)) {
        self.iter().for_each(|(k, v)| f(k, v));
    }

    /// Replaces every value with `f(key, value)`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use probe_map::HashMap;
    /// use probe_map::strategy::DefaultStrategy;
    ///
    /// let mut map: HashMap<i32, i32, DefaultStrategy> = (1..=3).map(|k| (k, k)).collect();
    /// map.replace_all(|k, v| k * 100 + v);
    /// assert_eq!(map[&2], 202);
    /// ```
    pub fn replace_all(&mut self, mut f: impl FnMut(&K, &V) -> V) {
        for (k, v) in self.iter_mut() {
            *v = f(k, v);
        }
    }

    /// Returns `true` if some entry holds `value`. This is a linear scan.
    pub fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.values().any(|v| v == value)
    }

    /// Returns a histogram of probe lengths; `hist[d]` counts the entries
    /// stored `d` slots past their ideal slot.
    #[cfg(any(test, feature = "stats"))]
    pub fn probe_histogram(&self) -> Vec<usize>
    where
        S: HashStrategy<K>,
    {
        self.table.probe_histogram()
    }

    /// Returns occupancy and probe length statistics.
    #[cfg(any(test, feature = "stats"))]
    pub fn debug_stats(&self) -> DebugStats
    where
        S: HashStrategy<K>,
    {
        self.table.debug_stats()
    }
}

impl<K, V, S, O> HashMap<K, V, S, O>
where
    S: HashStrategy<K>,
    O: SlotHooks,
{
    /// Inserts a key-value pair into the map.
    ///
    /// If the map did not have this key present, `None` is returned.
    /// Otherwise the value is updated, the old value is returned, and the
    /// stored key is kept.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use probe_map::HashMap;
    /// use probe_map::strategy::DefaultStrategy;
    ///
    /// let mut map: HashMap<i32, &str, DefaultStrategy> = HashMap::new();
    /// assert_eq!(map.insert(37, "a"), None);
    /// assert_eq!(map.insert(37, "b"), Some("a"));
    /// assert_eq!(map.get(&37), Some(&"b"));
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        match self.table.find_slot(&key) {
            Ok(slot) => Some(core::mem::replace(self.table.value_at_mut(slot), value)),
            Err(slot) => {
                self.table.insert(slot, key, value);
                None
            }
        }
    }

    /// Inserts `value` only if `key` is absent. Returns the existing value
    /// otherwise, leaving it untouched.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use probe_map::HashMap;
    /// use probe_map::strategy::DefaultStrategy;
    ///
    /// let mut map: HashMap<i32, &str, DefaultStrategy> = HashMap::new();
    /// assert_eq!(map.put_if_absent(1, "a"), None);
    /// assert_eq!(map.put_if_absent(1, "b"), Some(&"a"));
    /// assert_eq!(map[&1], "a");
    /// ```
    pub fn put_if_absent(&mut self, key: K, value: V) -> Option<&V> {
        match self.table.find_slot(&key) {
            Ok(slot) => Some(self.table.value_at(slot)),
            Err(slot) => {
                self.table.insert(slot, key, value);
                None
            }
        }
    }

    /// Returns a reference to the value corresponding to the key.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use probe_map::HashMap;
    /// use probe_map::strategy::DefaultStrategy;
    ///
    /// let mut map: HashMap<i32, &str, DefaultStrategy> = HashMap::new();
    /// map.insert(1, "a");
    /// assert_eq!(map.get(&1), Some(&"a"));
    /// assert_eq!(map.get(&2), None);
    /// ```
    pub fn get(&self, key: &K) -> Option<&V> {
        let slot = self.table.find_slot(key).ok()?;
        Some(self.table.value_at(slot))
    }

    /// Returns a mutable reference to the value corresponding to the key.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let slot = self.table.find_slot(key).ok()?;
        Some(self.table.value_at_mut(slot))
    }

    /// Returns the stored key and its value.
    ///
    /// The stored key may differ from `key` when the strategy considers
    /// distinct values equal.
    pub fn get_key_value(&self, key: &K) -> Option<(&K, &V)> {
        let slot = self.table.find_slot(key).ok()?;
        self.table.get(slot)
    }

    /// Returns `true` if the map contains the key.
    pub fn contains_key(&self, key: &K) -> bool {
        self.table.find_slot(key).is_ok()
    }

    /// Removes a key from the map, returning its value if it was present.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use probe_map::HashMap;
    /// use probe_map::strategy::DefaultStrategy;
    ///
    /// let mut map: HashMap<i32, &str, DefaultStrategy> = HashMap::new();
    /// map.insert(1, "a");
    /// assert_eq!(map.remove(&1), Some("a"));
    /// assert_eq!(map.remove(&1), None);
    /// ```
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.remove_entry(key).map(|(_, v)| v)
    }

    /// Removes a key from the map, returning the stored key and value.
    pub fn remove_entry(&mut self, key: &K) -> Option<(K, V)> {
        let slot = self.table.find_slot(key).ok()?;
        self.table.remove_slot(slot)
    }

    /// Removes the entry for `key` only if it currently maps to `value`.
    pub fn remove_if_eq(&mut self, key: &K, value: &V) -> bool
    where
        V: PartialEq,
    {
        match self.table.find_slot(key) {
            Ok(slot) if self.table.value_at(slot) == value => {
                self.table.remove_slot(slot);
                true
            }
            _ => false,
        }
    }

    /// Replaces the value of a present key, returning the old value. Absent
    /// keys are not inserted.
    pub fn replace(&mut self, key: &K, value: V) -> Option<V> {
        self.get_mut(key).map(|v| core::mem::replace(v, value))
    }

    /// Replaces the value of `key` with `new` only if it currently maps to
    /// `old`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use probe_map::HashMap;
    /// use probe_map::strategy::DefaultStrategy;
    ///
    /// let mut map: HashMap<i32, i32, DefaultStrategy> = HashMap::new();
    /// map.insert(1, 10);
    /// assert!(!map.replace_if_eq(&1, &11, 12));
    /// assert!(map.replace_if_eq(&1, &10, 12));
    /// assert_eq!(map[&1], 12);
    /// ```
    pub fn replace_if_eq(&mut self, key: &K, old: &V, new: V) -> bool
    where
        V: PartialEq,
    {
        match self.get_mut(key) {
            Some(v) if *v == *old => {
                *v = new;
                true
            }
            _ => false,
        }
    }

    /// Returns the value of `key`, inserting `f(&key)` first if it is
    /// absent.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use probe_map::HashMap;
    /// use probe_map::strategy::DefaultStrategy;
    ///
    /// let mut map: HashMap<&str, usize, DefaultStrategy> = HashMap::new();
    /// assert_eq!(*map.compute_if_absent("four", |k| k.len()), 4);
    /// assert_eq!(*map.compute_if_absent("four", |_| 0), 4);
    /// ```
    pub fn compute_if_absent(&mut self, key: K, f: impl FnOnce(&K) -> V) -> &mut V {
        let slot = match self.table.find_slot(&key) {
            Ok(slot) => slot,
            Err(slot) => {
                let value = f(&key);
                self.table.insert(slot, key, value)
            }
        };
        self.table.value_at_mut(slot)
    }

    /// Recomputes the value of a present key.
    ///
    /// `f` receives the current value by value; returning `None` removes the
    /// entry. Returns the new value, or `None` if the key was absent or has
    /// been removed. If `f` panics, the entry is removed.
    pub fn compute_if_present(
        &mut self,
        key: &K,
        f: impl FnOnce(&K, V) -> Option<V>,
    ) -> Option<&mut V> {
        let slot = self.table.find_slot(key).ok()?;
        if self.table.compute_in_place(slot, f) {
            Some(self.table.value_at_mut(slot))
        } else {
            None
        }
    }

    /// Computes a new value for `key` from its current value, if any.
    ///
    /// Returning `None` removes the entry (or leaves the key absent).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use probe_map::HashMap;
    /// use probe_map::strategy::DefaultStrategy;
    ///
    /// let mut counts: HashMap<&str, u32, DefaultStrategy> = HashMap::new();
    /// for word in ["a", "b", "a"] {
    ///     counts.compute(word, |_, count| Some(count.unwrap_or(0) + 1));
    /// }
    /// assert_eq!(counts[&"a"], 2);
    ///
    /// counts.compute("a", |_, _| None);
    /// assert!(!counts.contains_key(&"a"));
    /// ```
    pub fn compute(
        &mut self,
        key: K,
        f: impl FnOnce(&K, Option<V>) -> Option<V>,
    ) -> Option<&mut V> {
        match self.table.find_slot(&key) {
            Ok(slot) => {
                if self.table.compute_in_place(slot, |k, v| f(k, Some(v))) {
                    Some(self.table.value_at_mut(slot))
                } else {
                    None
                }
            }
            Err(slot) => {
                let value = f(&key, None)?;
                let slot = self.table.insert(slot, key, value);
                Some(self.table.value_at_mut(slot))
            }
        }
    }

    /// Inserts `value` if `key` is absent, and otherwise replaces the current
    /// value with `f(current, value)`, removing the entry if that is `None`.
    pub fn merge(&mut self, key: K, value: V, f: impl FnOnce(V, V) -> Option<V>) -> Option<&mut V> {
        match self.table.find_slot(&key) {
            Ok(slot) => {
                if self.table.compute_in_place(slot, |_, current| f(current, value)) {
                    Some(self.table.value_at_mut(slot))
                } else {
                    None
                }
            }
            Err(slot) => {
                let slot = self.table.insert(slot, key, value);
                Some(self.table.value_at_mut(slot))
            }
        }
    }

    /// Gets the given key's corresponding entry in the map for in-place
    /// manipulation.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use probe_map::HashMap;
    /// use probe_map::strategy::DefaultStrategy;
    ///
    /// let mut map: HashMap<&str, i32, DefaultStrategy> = HashMap::new();
    /// *map.entry("a").or_insert(0) += 1;
    /// *map.entry("a").or_insert(0) += 1;
    /// assert_eq!(map[&"a"], 2);
    /// ```
    pub fn entry(&mut self, key: K) -> Entry<'_, K, V, S, O> {
        match self.table.find_slot(&key) {
            Ok(slot) => Entry::Occupied(OccupiedEntry {
                table: &mut self.table,
                slot,
            }),
            Err(slot) => Entry::Vacant(VacantEntry {
                table: &mut self.table,
                key,
                slot,
            }),
        }
    }

    /// Retains only the entries for which `f` returns `true`.
    ///
    /// The table is rebuilt once after all rejected entries are removed,
    /// shrinking it if it has become sparse.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use probe_map::HashMap;
    /// use probe_map::strategy::DefaultStrategy;
    ///
    /// let mut map: HashMap<i32, i32, DefaultStrategy> = (0..8).map(|x| (x, x * 10)).collect();
    /// map.retain(|&k, _| k % 2 == 0);
    /// assert_eq!(map.len(), 4);
    /// ```
    pub fn retain(&mut self, f: impl FnMut(&K, &mut V) -> bool) {
        self.table.retain(f);
    }

    /// Removes all entries, keeping the allocated slots.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use probe_map::HashMap;
    /// use probe_map::strategy::DefaultStrategy;
    ///
    /// let mut map: HashMap<i32, &str, DefaultStrategy> = HashMap::new();
    /// map.insert(1, "a");
    /// map.clear();
    /// assert!(map.is_empty());
    /// ```
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Removes all entries and reallocates for `expected` entries if that
    /// needs fewer slots than the current table.
    pub fn clear_and_trim(&mut self, expected: usize) {
        self.table.clear_and_trim(expected);
    }

    /// Shrinks the table to the smallest size holding the current entries.
    ///
    /// On failure the map is unchanged.
    pub fn trim(&mut self) -> Result<(), ReserveError> {
        self.table.trim()
    }

    /// Shrinks the table to the smallest size holding `max(expected, len)`
    /// entries.
    pub fn trim_to(&mut self, expected: usize) -> Result<(), ReserveError> {
        self.table.trim_to(expected)
    }

    /// Shrinks the table as much as possible, keeping the current table if
    /// the smaller one cannot be allocated.
    pub fn shrink_to_fit(&mut self) {
        // A failed trim leaves the map untouched.
        if self.table.trim().is_err() {}
    }

    /// Reserves room for at least `additional` more entries without growing.
    pub fn reserve(&mut self, additional: usize) {
        self.table.reserve(additional);
    }

    /// Fallible [`reserve`](Self::reserve).
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), ReserveError> {
        self.table.try_reserve(additional)
    }
}

impl<K, V, S, O> PartialEq for HashMap<K, V, S, O>
where
    V: PartialEq,
    S: HashStrategy<K>,
    O: SlotHooks,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl<K, V, S, O> Eq for HashMap<K, V, S, O>
where
    V: Eq,
    S: HashStrategy<K>,
    O: SlotHooks,
{
}

impl<K, V, S, O> Index<&K> for HashMap<K, V, S, O>
where
    S: HashStrategy<K>,
    O: SlotHooks,
{
    type Output = V;

    /// # Panics
    ///
    /// Panics if the key is not present.
    fn index(&self, key: &K) -> &V {
        match self.get(key) {
            Some(value) => value,
            None => panic!("key not present in map"),
        }
    }
}

impl<K, V, S, O> Extend<(K, V)> for HashMap<K, V, S, O>
where
    S: HashStrategy<K>,
    O: SlotHooks,
{
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        let iter = iter.into_iter();
        let (lower, _) = iter.size_hint();
        // Duplicate keys are likely when extending a non-empty map.
        let additional = if self.is_empty() { lower } else { lower.div_ceil(2) };
        self.reserve(additional);
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<'a, K, V, S, O> Extend<(&'a K, &'a V)> for HashMap<K, V, S, O>
where
    K: Copy,
    V: Copy,
    S: HashStrategy<K>,
    O: SlotHooks,
{
    fn extend<T: IntoIterator<Item = (&'a K, &'a V)>>(&mut self, iter: T) {
        self.extend(iter.into_iter().map(|(k, v)| (*k, *v)));
    }
}

impl<K, V, S, O> FromIterator<(K, V)> for HashMap<K, V, S, O>
where
    S: HashStrategy<K> + Default,
    O: SlotHooks + Default,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<K, V, S, O> IntoIterator for HashMap<K, V, S, O>
where
    O: SlotHooks,
{
    type Item = (K, V);
    type IntoIter = IntoIter<K, V, S, O>;

    fn into_iter(self) -> Self::IntoIter {
        self.table.into_iter()
    }
}

impl<'a, K, V, S, O> IntoIterator for &'a HashMap<K, V, S, O>
where
    O: SlotHooks,
{
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V, O>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, S, O> IntoIterator for &'a mut HashMap<K, V, S, O>
where
    O: SlotHooks,
{
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V, O>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

/// A view into a single entry in the map, which may either be vacant or
/// occupied.
///
/// This enum is constructed from the [`entry`] method on [`HashMap`].
///
/// [`entry`]: HashMap::entry
pub enum Entry<'a, K, V, S, O> {
    /// A vacant entry.
    Vacant(VacantEntry<'a, K, V, S, O>),
    /// An occupied entry.
    Occupied(OccupiedEntry<'a, K, V, S, O>),
}

impl<'a, K, V, S, O> Entry<'a, K, V, S, O>
where
    S: HashStrategy<K>,
    O: SlotHooks,
{
    /// Inserts a default value if the entry is vacant and returns a mutable
    /// reference.
    pub fn or_insert(self, default: V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default),
        }
    }

    /// Inserts a value computed from a closure if the entry is vacant and
    /// returns a mutable reference.
    pub fn or_insert_with<F>(self, default: F) -> &'a mut V
    where
        F: FnOnce() -> V,
    {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }

    /// Like [`or_insert_with`](Self::or_insert_with), with the key passed to
    /// the closure.
    pub fn or_insert_with_key<F>(self, default: F) -> &'a mut V
    where
        F: FnOnce(&K) -> V,
    {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let value = default(&entry.key);
                entry.insert(value)
            }
        }
    }

    /// Provides in-place mutable access to an occupied entry before any
    /// potential inserts.
    pub fn and_modify<F>(self, f: F) -> Self
    where
        F: FnOnce(&mut V),
    {
        match self {
            Entry::Occupied(mut entry) => {
                f(entry.get_mut());
                Entry::Occupied(entry)
            }
            Entry::Vacant(entry) => Entry::Vacant(entry),
        }
    }

    /// Returns a reference to this entry's key.
    pub fn key(&self) -> &K {
        match self {
            Entry::Occupied(entry) => entry.key(),
            Entry::Vacant(entry) => entry.key(),
        }
    }
}

impl<'a, K, V, S, O> Entry<'a, K, V, S, O>
where
    V: Default,
    S: HashStrategy<K>,
    O: SlotHooks,
{
    /// Inserts the default value if the entry is vacant and returns a mutable
    /// reference.
    pub fn or_default(self) -> &'a mut V {
        self.or_insert_with(Default::default)
    }
}

/// A view into a vacant entry in the map.
pub struct VacantEntry<'a, K, V, S, O> {
    table: &'a mut SlotTable<K, V, S, O>,
    key: K,
    slot: usize,
}

impl<'a, K, V, S, O> VacantEntry<'a, K, V, S, O>
where
    S: HashStrategy<K>,
    O: SlotHooks,
{
    /// Gets a reference to the key that would be used when inserting a value.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Take ownership of the key.
    pub fn into_key(self) -> K {
        self.key
    }

    /// Inserts the value into the map and returns a mutable reference to it.
    pub fn insert(self, value: V) -> &'a mut V {
        let slot = self.table.insert(self.slot, self.key, value);
        self.table.value_at_mut(slot)
    }
}

/// A view into an occupied entry in the map.
pub struct OccupiedEntry<'a, K, V, S, O> {
    table: &'a mut SlotTable<K, V, S, O>,
    slot: usize,
}

impl<'a, K, V, S, O> OccupiedEntry<'a, K, V, S, O>
where
    S: HashStrategy<K>,
    O: SlotHooks,
{
    /// Gets a reference to the key in the entry.
    pub fn key(&self) -> &K {
        self.table.key_at(self.slot)
    }

    /// Gets a reference to the value in the entry.
    pub fn get(&self) -> &V {
        self.table.value_at(self.slot)
    }

    /// Gets a mutable reference to the value in the entry.
    pub fn get_mut(&mut self) -> &mut V {
        self.table.value_at_mut(self.slot)
    }

    /// Converts the entry into a mutable reference to the value.
    pub fn into_mut(self) -> &'a mut V {
        self.table.value_at_mut(self.slot)
    }

    /// Inserts a value into the entry and returns the old value.
    pub fn insert(&mut self, value: V) -> V {
        core::mem::replace(self.get_mut(), value)
    }

    /// Removes the entry from the map and returns the value.
    pub fn remove(self) -> V {
        self.remove_entry().1
    }

    /// Removes the entry from the map and returns the key and value.
    pub fn remove_entry(self) -> (K, V) {
        self.table.remove_occupied(self.slot)
    }
}

/// An iterator over the keys of a `HashMap`.
pub struct Keys<'a, K, V, O> {
    inner: Iter<'a, K, V, O>,
}

impl<'a, K, V, O: SlotHooks> Iterator for Keys<'a, K, V, O> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V, O: SlotHooks> DoubleEndedIterator for Keys<'_, K, V, O> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(k, _)| k)
    }
}

impl<K, V, O: SlotHooks> ExactSizeIterator for Keys<'_, K, V, O> {}

impl<K, V, O: SlotHooks> FusedIterator for Keys<'_, K, V, O> {}

/// An iterator over the values of a `HashMap`.
pub struct Values<'a, K, V, O> {
    inner: Iter<'a, K, V, O>,
}

impl<'a, K, V, O: SlotHooks> Iterator for Values<'a, K, V, O> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V, O: SlotHooks> DoubleEndedIterator for Values<'_, K, V, O> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(_, v)| v)
    }
}

impl<K, V, O: SlotHooks> ExactSizeIterator for Values<'_, K, V, O> {}

impl<K, V, O: SlotHooks> FusedIterator for Values<'_, K, V, O> {}

/// A mutable iterator over the values of a `HashMap`.
pub struct ValuesMut<'a, K, V, O> {
    inner: IterMut<'a, K, V, O>,
}

impl<'a, K, V, O: SlotHooks> Iterator for ValuesMut<'a, K, V, O> {
    type Item = &'a mut V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V, O: SlotHooks> DoubleEndedIterator for ValuesMut<'_, K, V, O> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(_, v)| v)
    }
}

impl<K, V, O: SlotHooks> ExactSizeIterator for ValuesMut<'_, K, V, O> {}

impl<K, V, O: SlotHooks> FusedIterator for ValuesMut<'_, K, V, O> {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Current {
    /// Reached by the downward scan of the slot array.
    Scanned(usize),
    /// Reached through the list of keys that wrapped behind the scan.
    Wrapped(usize),
}

#[derive(Debug, Clone)]
struct ScanState<K> {
    /// The scan continues below this slot.
    pos: usize,
    remaining: usize,
    /// Keys shifted from the unvisited bottom of the array into the visited
    /// top by cursor removals. They are visited after the scan.
    wrapped: Vec<K>,
    wrapped_next: usize,
    current: Option<Current>,
    modifications: u64,
    capacity: usize,
}

/// A cursor over an unordered [`HashMap`] that can remove the entry it is on.
///
/// Every entry present when the cursor was created is visited exactly once,
/// even though removals shift other entries around. Removing through the
/// cursor never shrinks the table.
///
/// # Examples
///
/// ```rust
/// use probe_map::HashMap;
/// use probe_map::strategy::DefaultStrategy;
///
/// let mut map: HashMap<u32, u32, DefaultStrategy> = (0..100).map(|k| (k, k)).collect();
/// let mut cursor = map.cursor_mut();
/// while cursor.has_next() {
///     let (key, value) = cursor.advance()?;
///     if key % 3 == 0 {
///         cursor.remove_current()?;
///     } else {
///         *value += 1;
///     }
/// }
/// assert_eq!(map.len(), 66);
/// assert!(map.iter().all(|(k, v)| *v == k + 1));
/// # Ok::<(), probe_map::error::IterError>(())
/// ```
pub struct CursorMut<'a, K, V, S> {
    table: &'a mut SlotTable<K, V, S, Unordered>,
    state: ScanState<K>,
}

impl<K: Debug, V, S> Debug for CursorMut<'_, K, V, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CursorMut")
            .field("remaining", &self.state.remaining)
            .field("current", &self.state.current)
            .finish_non_exhaustive()
    }
}

/// Saved position of a [`CursorMut`], detached from the map's borrow.
///
/// Resuming fails with [`IterError::ConcurrentModification`] if the map was
/// structurally modified since the checkpoint was taken.
#[derive(Debug, Clone)]
pub struct Checkpoint<K> {
    state: ScanState<K>,
}

impl<K, V, S> HashMap<K, V, S, Unordered>
where
    K: Clone,
    S: HashStrategy<K>,
{
    /// Returns a cursor positioned before the first entry.
    pub fn cursor_mut(&mut self) -> CursorMut<'_, K, V, S> {
        let state = ScanState {
            pos: self.table.capacity(),
            remaining: self.table.len(),
            wrapped: Vec::new(),
            wrapped_next: 0,
            current: None,
            modifications: self.table.modifications(),
            capacity: self.table.capacity(),
        };
        CursorMut {
            table: &mut self.table,
            state,
        }
    }

    /// Recreates the cursor saved in `checkpoint`.
    ///
    /// Fails with [`IterError::ConcurrentModification`] if the map was
    /// structurally modified or its table was resized since. A saved slot
    /// position made stale by a rehash or a removal is reported this way,
    /// never as [`IterError::IllegalState`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use probe_map::HashMap;
    /// use probe_map::error::IterError;
    /// use probe_map::strategy::DefaultStrategy;
    ///
    /// let mut map: HashMap<u32, u32, DefaultStrategy> = (0..4).map(|k| (k, k)).collect();
    /// let mut cursor = map.cursor_mut();
    /// cursor.advance()?;
    /// let checkpoint = cursor.checkpoint();
    ///
    /// map.insert(10, 10);
    /// assert_eq!(map.resume(checkpoint).unwrap_err(), IterError::ConcurrentModification);
    /// # Ok::<(), IterError>(())
    /// ```
    pub fn resume(&mut self, checkpoint: Checkpoint<K>) -> Result<CursorMut<'_, K, V, S>, IterError> {
        let state = checkpoint.state;
        if state.modifications != self.table.modifications()
            || state.capacity != self.table.capacity()
        {
            return Err(IterError::ConcurrentModification);
        }
        Ok(CursorMut {
            table: &mut self.table,
            state,
        })
    }
}

impl<'a, K, V, S> CursorMut<'a, K, V, S>
where
    K: Clone,
    S: HashStrategy<K>,
{
    /// Returns `true` if [`advance`](Self::advance) will yield an entry.
    pub fn has_next(&self) -> bool {
        self.state.remaining > 0
    }

    /// Number of entries not yet visited.
    pub fn remaining(&self) -> usize {
        self.state.remaining
    }

    /// Moves to the next entry and returns it.
    ///
    /// Fails with [`IterError::NoSuchElement`] once every entry has been
    /// visited.
    pub fn advance(&mut self) -> Result<(&K, &mut V), IterError> {
        let state = &mut self.state;
        if state.remaining == 0 {
            return Err(IterError::NoSuchElement);
        }

        while state.pos > 0 {
            state.pos -= 1;
            if self.table.is_occupied(state.pos) {
                state.remaining -= 1;
                state.current = Some(Current::Scanned(state.pos));
                return Ok(self.table.entry_at_mut(state.pos));
            }
        }

        let key = state
            .wrapped
            .get(state.wrapped_next)
            .ok_or(IterError::ConcurrentModification)?;
        let slot = self
            .table
            .find_slot(key)
            .map_err(|_| IterError::ConcurrentModification)?;
        state.wrapped_next += 1;
        state.remaining -= 1;
        state.current = Some(Current::Wrapped(slot));
        Ok(self.table.entry_at_mut(slot))
    }

    /// The entry last returned by [`advance`](Self::advance), unless it has
    /// been removed.
    pub fn current(&mut self) -> Option<(&K, &mut V)> {
        match self.state.current? {
            Current::Scanned(slot) | Current::Wrapped(slot) => Some(self.table.entry_at_mut(slot)),
        }
    }

    /// Removes the entry last returned by [`advance`](Self::advance).
    ///
    /// Fails with [`IterError::IllegalState`] if there is no such entry, that
    /// is before the first advance or after a removal.
    pub fn remove_current(&mut self) -> Result<(K, V), IterError> {
        let current = self.state.current.take().ok_or(IterError::IllegalState)?;
        let (slot, scanning) = match current {
            Current::Scanned(slot) => (slot, true),
            Current::Wrapped(slot) => (slot, false),
        };

        let mut displaced = Vec::new();
        let entry = self
            .table
            .remove_slot_with(slot, |from, to| {
                // Moving up means wrapping from below the scan to above it.
                if scanning && from < to {
                    displaced.push(to);
                }
            })
            .ok_or(IterError::ConcurrentModification)?;
        for slot in displaced {
            let key = self.table.key_at(slot).clone();
            self.state.wrapped.push(key);
        }
        self.state.modifications = self.table.modifications();
        Ok(entry)
    }

    /// Detaches the cursor from the map, keeping its position.
    pub fn checkpoint(self) -> Checkpoint<K> {
        Checkpoint { state: self.state }
    }
}
