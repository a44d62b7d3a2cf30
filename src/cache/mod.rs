//! Cache Module
//!
//! Provides in-memory caching with cost-based LRU eviction and TTL expiration.

mod cost;
mod deadline;
mod entry;
mod lru;
mod shared;
mod stats;
mod store;


// Re-export public types
pub use cost::{ConstantCost, CostLimit, Coster};
pub use deadline::{DeadlineIndex, DeadlineKey};
pub use entry::{Deadline, Entry, Hit};
pub use lru::{NodeHandle, RecencyList};
pub use shared::Cache;
pub use stats::CacheStats;
pub use store::CacheStore;
