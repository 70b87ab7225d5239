use alloc::collections::TryReserveError;

use thiserror::Error;

/// Rejected table configuration.
///
/// Returned eagerly by [`TableConfig::validate`] and every constructor that
/// accepts a [`TableConfig`], so a table is never built in an unusable state.
///
/// [`TableConfig::validate`]: crate::config::TableConfig::validate
/// [`TableConfig`]: crate::config::TableConfig
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ConfigError {
    /// The load factor is not strictly between 0 and 1.
    #[error("load factor must be within (0, 1), got {0}")]
    InvalidLoadFactor(f32),
    /// The requested number of entries cannot be backed by a power-of-two
    /// slot array at the given load factor.
    #[error("capacity overflow: cannot size a table for {expected} entries at load factor {load_factor}")]
    CapacityOverflow {
        /// Number of entries the table was asked to hold.
        expected: usize,
        /// Load factor the table was configured with.
        load_factor: f32,
    },
}

/// Failure of a fallible resize ([`try_reserve`], [`trim`]).
///
/// The table is left exactly as it was when this is returned.
///
/// [`try_reserve`]: crate::slot_table::SlotTable::try_reserve
/// [`trim`]: crate::slot_table::SlotTable::trim
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReserveError {
    /// The requested entry count cannot be backed by any slot array.
    #[error("capacity overflow")]
    CapacityOverflow,
    /// The allocator refused the new slot array.
    #[error(transparent)]
    Alloc(#[from] TryReserveError),
}

/// Faults raised by map cursors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IterError {
    /// The map was structurally modified after the checkpoint was taken.
    #[error("map was structurally modified since the cursor position was recorded")]
    ConcurrentModification,
    /// The cursor was advanced past its last element.
    #[error("no more elements")]
    NoSuchElement,
    /// The cursor has no current element to operate on.
    #[error("cursor has no current element")]
    IllegalState,
}
