//! Duplicate candidate tracking.
//!
//! - [`key`]: the `(name, size)` matching key and its persisted encoding
//! - [`index`]: the key-to-locations map with running waste counters

pub mod index;
pub mod key;

pub use index::{AggregateCounters, DuplicateIndex, Observation, PersistedIndex};
pub use key::{FileKey, KeyDecodeError};
