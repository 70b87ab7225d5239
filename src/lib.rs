#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod config;

/// Error types.
pub mod error;

/// Hash maps over a [`SlotTable`](slot_table::SlotTable).
///
/// This module provides the [`HashMap`] façade, generic over the hashing
/// strategy and over the [`SlotHooks`](slot_table::SlotHooks) that decide
/// its iteration order.
pub mod hash_map;

pub mod linked_hash_map;

pub mod order_index;

pub mod slot_table;

pub mod strategy;

#[cfg(test)]
mod table_proptest;

pub use hash_map::Entry;
pub use hash_map::HashMap;
pub use linked_hash_map::LinkedHashMap;
pub use slot_table::SlotTable;
