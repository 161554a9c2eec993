//! Cache module for storing upstream responses in memory
//!
//! One `CacheStore` is instantiated per resource class, each with its own TTL.
//! Entries live for the lifetime of the process; expired entries are kept so
//! the gateway can serve them when the upstream API is unavailable.

mod store;

pub use store::{CacheEntry, CacheStore};
