//! Configuration Module
//!
//! Serializable construction parameters, meant to be embedded in a host
//! application's own configuration.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::cache::CostLimit;

/// Cache configuration parameters.
///
/// Missing fields fall back to their defaults when deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum running cost; `None` disables cost-based eviction
    pub cost_limit: Option<u64>,
    /// TTL in seconds applied by `insert`
    pub default_ttl_secs: u64,
}

impl CacheConfig {
    /// Returns the configured limit as a [`CostLimit`].
    pub fn cost_limit(&self) -> CostLimit {
        self.cost_limit.into()
    }

    /// Returns the default TTL, saturating at the largest representable delta.
    pub fn default_ttl(&self) -> TimeDelta {
        i64::try_from(self.default_ttl_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cost_limit: Some(1000),
            default_ttl_secs: 300,
        }
    }
}
