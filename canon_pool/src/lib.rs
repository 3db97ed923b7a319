//! Thread-safe string interning.
//!
//! A [`SharedPool`] composes thirty-two single-threaded intern tables into
//! one concurrently usable pool: candidates route to a shard by their first
//! byte, each shard serializes behind its own mutex, and a background trim
//! pass driven by host collection notifications keeps resident entries from
//! outliving their usefulness. Equal values presented to one pool return the
//! same stored [`CanonStr`] instance until eviction, which makes interned
//! strings cheap to compare and cheap to keep.

#![deny(clippy::all)]
pub mod error;
mod pool;
pub mod stats;
pub mod trim;

pub use error::{PoolError, PoolResult};
pub use pool::{Entries, SharedPool, SharedPoolBuilder, MAX_SHARED_LENGTH, SHARD_COUNT};
pub use stats::PoolStats;
pub use trim::{CollectionHandle, MemoryPressure};

pub use canon_core::encoding::Encoding;
pub use canon_core::{CanonStr, TrimLevel};
