//! Error types for the cache
//!
//! Misses are reported as `None` and compute failures are returned to the
//! caller unchanged, so the only errors defined here are fatal ones.

use thiserror::Error;
use tracing::error;

// == Corruption Error ==
/// Detected mismatch between the cache's internal structures.
///
/// These are programming-invariant violations. They are never returned to
/// callers; [`fail_fast`] panics with them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CorruptionError {
    /// Key index handle points at a vacant list slot
    #[error("key index handle {0} points at a vacant list slot")]
    DanglingHandle(usize),

    /// Entry's deadline is missing from the deadline index
    #[error("deadline {0} missing from the deadline index")]
    MissingDeadline(String),

    /// Deadline slot still occupied after collision probing
    #[error("deadline slot {0} already occupied after collision probing")]
    OccupiedDeadline(String),

    /// Collision probing found no vacant slot anywhere in the deadline range
    #[error("no vacant deadline slot around {0}")]
    DeadlineExhausted(String),

    /// Entry found through the list or deadline index has no key index slot
    #[error("entry has no key index slot")]
    MissingIndex,

    /// Running cost dropped below zero
    #[error("running cost {cost} cannot give back {reclaimed}")]
    CostUnderflow { cost: u128, reclaimed: u64 },

    /// A caller panicked while holding the cache lock
    #[error("cache lock poisoned by a panic in another caller")]
    Poisoned,
}

// == Fail Fast ==
/// Logs the violation and aborts the current operation by panicking.
#[cold]
#[track_caller]
pub(crate) fn fail_fast(err: CorruptionError) -> ! {
    error!(error = %err, "cache corrupt");
    panic!("cache corrupt: {err}");
}
