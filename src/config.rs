//! Table sizing policy.
//!
//! All capacities handed to the slot table come from [`array_size`]: a power
//! of two, at least 2, large enough that `expected` entries stay at or below
//! the load factor. The fill threshold of a capacity is [`max_fill`].

use crate::error::ConfigError;

/// Number of entries a table is sized for when no capacity is requested.
pub const DEFAULT_INITIAL_SIZE: usize = 16;

/// Load factor used when none is requested.
pub const DEFAULT_LOAD_FACTOR: f32 = 0.75;

/// Load factor trading memory for shorter probe sequences.
pub const FAST_LOAD_FACTOR: f32 = 0.5;

/// Load factor trading even more memory for even shorter probe sequences.
pub const VERY_FAST_LOAD_FACTOR: f32 = 0.25;

/// Smallest slot array the sizing policy hands out.
pub(crate) const MIN_ARRAY_SIZE: usize = 2;

/// Largest slot array the sizing policy hands out.
const MAX_ARRAY_SIZE: usize = 1 << (usize::BITS - 2);

/// Construction-time configuration of a table.
///
/// `min_capacity` is the number of entries the table holds without growing.
/// The slot array allocated for it is also the floor below which removals
/// never shrink the table.
///
/// # Examples
///
/// ```rust
/// use probe_map::config::TableConfig;
///
/// let config = TableConfig::default()
///     .with_min_capacity(100)
///     .with_load_factor(0.5);
/// assert!(config.validate().is_ok());
///
/// assert!(TableConfig::new(8, 1.0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableConfig {
    /// Number of entries the table must hold before its first growth.
    pub min_capacity: usize,
    /// Target ratio of occupied slots to slots, within `(0, 1)`.
    pub load_factor: f32,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            min_capacity: DEFAULT_INITIAL_SIZE,
            load_factor: DEFAULT_LOAD_FACTOR,
        }
    }
}

impl TableConfig {
    /// Creates a validated configuration.
    pub fn new(min_capacity: usize, load_factor: f32) -> Result<Self, ConfigError> {
        let config = Self {
            min_capacity,
            load_factor,
        };
        config.validate()?;
        Ok(config)
    }

    /// Replaces the minimum capacity.
    pub fn with_min_capacity(mut self, min_capacity: usize) -> Self {
        self.min_capacity = min_capacity;
        self
    }

    /// Replaces the load factor.
    pub fn with_load_factor(mut self, load_factor: f32) -> Self {
        self.load_factor = load_factor;
        self
    }

    /// Checks the load factor range and that the initial slot array can be
    /// sized.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.initial_capacity().map(|_| ())
    }

    /// Slot count allocated for this configuration.
    pub fn initial_capacity(&self) -> Result<usize, ConfigError> {
        check_load_factor(self.load_factor)?;
        array_size(self.min_capacity, self.load_factor)
    }
}

fn check_load_factor(load_factor: f32) -> Result<(), ConfigError> {
    // NaN fails both comparisons.
    if load_factor > 0.0 && load_factor < 1.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidLoadFactor(load_factor))
    }
}

#[inline]
fn ceil_div_load(expected: usize, load_factor: f32) -> Option<usize> {
    let exact = expected as f64 / load_factor as f64;
    if !exact.is_finite() || exact >= MAX_ARRAY_SIZE as f64 {
        return None;
    }
    let truncated = exact as usize;
    if (truncated as f64) < exact {
        Some(truncated + 1)
    } else {
        Some(truncated)
    }
}

/// Returns the slot count needed to hold `expected` entries at `load_factor`.
///
/// The result is a power of two and at least 2.
pub fn array_size(expected: usize, load_factor: f32) -> Result<usize, ConfigError> {
    ceil_div_load(expected, load_factor)
        .and_then(usize::checked_next_power_of_two)
        .filter(|&size| size <= MAX_ARRAY_SIZE)
        .map(|size| size.max(MIN_ARRAY_SIZE))
        .ok_or(ConfigError::CapacityOverflow {
            expected,
            load_factor,
        })
}

/// Returns the fill threshold of a table with `capacity` slots.
///
/// The threshold is `floor(capacity * load_factor)` capped at
/// `capacity - 1`, so a full table always keeps an empty slot to terminate
/// probing.
#[inline]
pub fn max_fill(capacity: usize, load_factor: f32) -> usize {
    let fill = (capacity as f64 * load_factor as f64) as usize;
    fill.min(capacity.saturating_sub(1))
}
