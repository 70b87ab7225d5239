//! Pluggable hashing and equality.
//!
//! A [`HashStrategy`] is handed to a table at construction and decides both
//! where a key probes from and when two keys are the same key. The table
//! never calls [`Hash`] or [`Eq`] on keys directly, which makes it possible
//! to key a map by, for example, case-insensitive strings or by a subset of
//! a struct's fields.

use core::fmt::Debug;
use core::hash::BuildHasher;
use core::hash::Hash;

/// Hashing and equality capability pair for keys of type `K`.
///
/// Implementations must be consistent: keys that compare equal through
/// [`equals`](HashStrategy::equals) must produce the same
/// [`hash`](HashStrategy::hash).
pub trait HashStrategy<K: ?Sized> {
    /// Hashes a key.
    fn hash(&self, key: &K) -> u64;

    /// Returns `true` if both keys denote the same entry.
    fn equals(&self, a: &K, b: &K) -> bool;
}

impl<K: ?Sized, T: HashStrategy<K> + ?Sized> HashStrategy<K> for &T {
    #[inline]
    fn hash(&self, key: &K) -> u64 {
        (**self).hash(key)
    }

    #[inline]
    fn equals(&self, a: &K, b: &K) -> bool {
        (**self).equals(a, b)
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "foldhash")] {
        /// Hasher builder used by [`DefaultStrategy`].
        pub type DefaultHashBuilder = foldhash::fast::RandomState;
    } else if #[cfg(feature = "std")] {
        /// Hasher builder used by [`DefaultStrategy`].
        pub type DefaultHashBuilder = std::collections::hash_map::RandomState;
    }
}

/// Strategy used by the convenience constructors: the key's own [`Hash`] and
/// [`Eq`] through a randomly seeded hasher.
#[cfg(any(feature = "foldhash", feature = "std"))]
pub type DefaultStrategy = StdStrategy<DefaultHashBuilder>;

/// Strategy delegating to the key's [`Hash`] and [`Eq`] implementations,
/// hashing through a [`BuildHasher`].
///
/// # Examples
///
/// ```rust
/// use std::collections::hash_map::RandomState;
///
/// use probe_map::strategy::HashStrategy;
/// use probe_map::strategy::StdStrategy;
///
/// let strategy = StdStrategy::new(RandomState::new());
/// assert_eq!(strategy.hash(&"a"), strategy.hash(&"a"));
/// assert!(strategy.equals(&"a", &"a"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct StdStrategy<B> {
    hash_builder: B,
}

impl<B> StdStrategy<B> {
    /// Wraps a hasher builder.
    pub fn new(hash_builder: B) -> Self {
        Self { hash_builder }
    }

    /// Returns the wrapped hasher builder.
    pub fn hasher(&self) -> &B {
        &self.hash_builder
    }
}

impl<K, B> HashStrategy<K> for StdStrategy<B>
where
    K: Hash + Eq + ?Sized,
    B: BuildHasher,
{
    #[inline]
    fn hash(&self, key: &K) -> u64 {
        self.hash_builder.hash_one(key)
    }

    #[inline]
    fn equals(&self, a: &K, b: &K) -> bool {
        a == b
    }
}

/// Strategy assembled from a hashing closure and an equality closure.
///
/// # Examples
///
/// ```rust
/// use probe_map::strategy::FnStrategy;
/// use probe_map::strategy::HashStrategy;
///
/// // Case-insensitive ASCII keys.
/// let strategy = FnStrategy::new(
///     |key: &String| {
///         key.bytes()
///             .fold(0xcbf2_9ce4_8422_2325u64, |h, b| {
///                 (h ^ b.to_ascii_lowercase() as u64).wrapping_mul(0x0100_0000_01b3)
///             })
///     },
///     |a: &String, b: &String| a.eq_ignore_ascii_case(b),
/// );
/// let (a, b) = ("Key".to_string(), "kEY".to_string());
/// assert!(strategy.equals(&a, &b));
/// assert_eq!(strategy.hash(&a), strategy.hash(&b));
/// ```
#[derive(Clone)]
pub struct FnStrategy<H, E> {
    hash: H,
    equals: E,
}

impl<H, E> FnStrategy<H, E> {
    /// Builds a strategy from a hash function and an equality predicate.
    pub fn new(hash: H, equals: E) -> Self {
        Self { hash, equals }
    }
}

impl<H, E> Debug for FnStrategy<H, E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FnStrategy").finish_non_exhaustive()
    }
}

impl<K, H, E> HashStrategy<K> for FnStrategy<H, E>
where
    K: ?Sized,
    H: Fn(&K) -> u64,
    E: Fn(&K, &K) -> bool,
{
    #[inline]
    fn hash(&self, key: &K) -> u64 {
        (self.hash)(key)
    }

    #[inline]
    fn equals(&self, a: &K, b: &K) -> bool {
        (self.equals)(a, b)
    }
}

/// 2^64 divided by the golden ratio.
const PHI: u64 = 0x9e37_79b9_7f4a_7c15;

/// Scrambles a strategy hash before it is masked down to a slot index.
///
/// Strategies are free to return weak hashes (identity hashes of integers
/// are common), and masking keeps only the low bits, so the high bits are
/// folded down first.
#[inline(always)]
pub fn mix(hash: u64) -> u64 {
    let h = hash.wrapping_mul(PHI);
    let h = h ^ (h >> 32);
    h ^ (h >> 16)
}
