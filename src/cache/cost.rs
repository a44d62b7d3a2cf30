//! Cost Module
//!
//! Caller-defined weighting of cached values and the limit they are held to.

use serde::{Deserialize, Serialize};

// == Coster ==
/// Maps a value to its non-negative contribution to the cache's running cost.
///
/// Any `Fn(&V) -> u64` closure is a `Coster`.
pub trait Coster<V> {
    fn cost(&self, value: &V) -> u64;
}

impl<V, F> Coster<V> for F
where
    F: Fn(&V) -> u64,
{
    fn cost(&self, value: &V) -> u64 {
        self(value)
    }
}

/// Weighs every value as 1, turning the cost limit into an entry count limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConstantCost;

impl<V> Coster<V> for ConstantCost {
    fn cost(&self, _value: &V) -> u64 {
        1
    }
}

// == Cost Limit ==
/// Upper bound on the running cost of a cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostLimit {
    /// Evict least recently used entries while the running cost exceeds the bound
    Limited(u64),
    /// Never evict for cost; only TTL expiration removes entries
    Unlimited,
}

impl CostLimit {
    /// Returns true if `cost` is over the limit.
    pub fn is_exceeded_by(self, cost: u128) -> bool {
        match self {
            CostLimit::Limited(limit) => cost > u128::from(limit),
            CostLimit::Unlimited => false,
        }
    }
}

impl From<Option<u64>> for CostLimit {
    fn from(limit: Option<u64>) -> Self {
        limit.map_or(CostLimit::Unlimited, CostLimit::Limited)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_cost() {
        assert_eq!(ConstantCost.cost(&"anything"), 1);
        assert_eq!(Coster::<Vec<u8>>::cost(&ConstantCost, &vec![0; 1024]), 1);
    }

    #[test]
    fn test_closure_coster() {
        let by_len = |v: &String| v.len() as u64;
        assert_eq!(by_len.cost(&"some value".to_string()), 10);
    }

    #[test]
    fn test_cost_limit_exceeded() {
        assert!(!CostLimit::Limited(10).is_exceeded_by(10));
        assert!(CostLimit::Limited(10).is_exceeded_by(11));
        assert!(CostLimit::Limited(u64::MAX).is_exceeded_by(u128::from(u64::MAX) + 1));
        assert!(!CostLimit::Unlimited.is_exceeded_by(u128::MAX));
    }

    #[test]
    fn test_cost_limit_from_option() {
        assert_eq!(CostLimit::from(Some(5)), CostLimit::Limited(5));
        assert_eq!(CostLimit::from(None), CostLimit::Unlimited);
    }
}
