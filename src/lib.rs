//! tlru - An in-memory key-value cache with cost-based LRU eviction and TTL expiration
//!
//! Entries carry a caller-defined cost and an absolute deadline. When the
//! running cost exceeds the limit, least recently used entries are evicted;
//! entries past their deadline are reaped lazily by the next call that
//! touches the cache.
//!
//! ```
//! use chrono::TimeDelta;
//! use tlru::{Cache, CostLimit};
//!
//! let cache = Cache::with_cost_limit(CostLimit::Limited(2));
//! cache.set("a", 1, TimeDelta::seconds(60));
//! cache.set("b", 2, TimeDelta::seconds(60));
//! cache.get("a");
//! cache.set("c", 3, TimeDelta::seconds(60));
//!
//! // "b" was least recently used
//! assert!(cache.get("b").is_none());
//! assert_eq!(cache.get("a").map(|hit| hit.value), Some(1));
//!
//! let memo: Result<i32, std::convert::Infallible> =
//!     cache.get_or_compute("d", || Ok(4), TimeDelta::seconds(60));
//! assert_eq!(memo, Ok(4));
//! ```

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{Cache, CacheStats, CacheStore, ConstantCost, CostLimit, Coster, Hit};
pub use config::CacheConfig;
pub use error::CorruptionError;
