//! Cache Entry Module
//!
//! Defines individual cache entries and the absolute deadlines they expire at.

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};

// == Deadline ==
/// Absolute expiration instant, in nanoseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Deadline(i64);

impl Deadline {
    // == Constructors ==
    /// Returns the current wall-clock instant.
    ///
    /// Instants past the year 2262 saturate to the largest representable deadline.
    pub fn now() -> Self {
        Self(Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX))
    }

    /// Creates a deadline from raw nanoseconds since the Unix epoch.
    pub fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    /// Returns the deadline `ttl` after `self`, saturating at the representable range.
    ///
    /// A zero or negative `ttl` yields a deadline that has already passed.
    pub fn after(self, ttl: TimeDelta) -> Self {
        match ttl.num_nanoseconds() {
            Some(nanos) => Self(self.0.saturating_add(nanos)),
            None if ttl > TimeDelta::zero() => Self(i64::MAX),
            None => Self(i64::MIN),
        }
    }

    /// Advances the deadline by `nanos`, or `None` on overflow.
    pub fn checked_add_nanos(self, nanos: i64) -> Option<Self> {
        self.0.checked_add(nanos).map(Self)
    }

    // == Accessors ==
    /// Nanoseconds since the Unix epoch.
    pub fn as_nanos(self) -> i64 {
        self.0
    }

    /// Converts the deadline into a UTC timestamp.
    pub fn to_datetime(self) -> DateTime<Utc> {
        DateTime::from_timestamp_nanos(self.0)
    }

    // == Has Passed ==
    /// Checks whether the deadline has been reached at `now`.
    ///
    /// Boundary condition: an entry is expired once `now` is greater than or
    /// equal to its deadline, so a zero TTL expires immediately.
    pub fn has_passed(self, now: Deadline) -> bool {
        now >= self
    }
}

impl fmt::Display for Deadline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_datetime().to_rfc3339())
    }
}

// == Entry ==
/// The unit of storage owned by a recency list node.
///
/// Entries are never updated in place; a re-set replaces the whole entry.
#[derive(Debug, Clone)]
pub struct Entry<K, V> {
    pub key: K,
    pub value: V,
    pub deadline: Deadline,
    /// Weight computed once when the entry was created
    pub cost: u64,
}

// == Hit ==
/// A successful lookup: the cached value and the instant it expires at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit<V> {
    pub value: V,
    pub deadline: DateTime<Utc>,
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deadline_after_positive_ttl() {
        let start = Deadline::from_nanos(1_000);
        let deadline = start.after(TimeDelta::microseconds(2));
        assert_eq!(deadline.as_nanos(), 3_000);
        assert!(!deadline.has_passed(start));
    }

    #[test]
    fn test_deadline_zero_ttl_has_passed() {
        let start = Deadline::now();
        let deadline = start.after(TimeDelta::zero());
        assert!(deadline.has_passed(start), "Zero TTL should expire at once");
    }

    #[test]
    fn test_deadline_negative_ttl_has_passed() {
        let start = Deadline::now();
        let deadline = start.after(TimeDelta::seconds(-5));
        assert!(deadline < start);
        assert!(deadline.has_passed(start));
    }

    #[test]
    fn test_deadline_saturates() {
        let start = Deadline::from_nanos(i64::MAX - 10);
        assert_eq!(start.after(TimeDelta::seconds(1)).as_nanos(), i64::MAX);

        let huge = TimeDelta::MAX;
        assert_eq!(Deadline::now().after(huge).as_nanos(), i64::MAX);
        assert_eq!(Deadline::now().after(-huge).as_nanos(), i64::MIN);
    }

    #[test]
    fn test_checked_add_nanos_overflow() {
        assert_eq!(
            Deadline::from_nanos(5).checked_add_nanos(2),
            Some(Deadline::from_nanos(7))
        );
        assert_eq!(Deadline::from_nanos(i64::MAX).checked_add_nanos(1), None);
    }

    #[test]
    fn test_to_datetime_preserves_nanos() {
        let deadline = Deadline::from_nanos(1_700_000_000_123_456_789);
        let datetime = deadline.to_datetime();
        assert_eq!(datetime.timestamp_nanos_opt(), Some(1_700_000_000_123_456_789));
    }

    #[test]
    fn test_now_is_close_to_chrono_now() {
        let before = Utc::now();
        let now = Deadline::now().to_datetime();
        let after = Utc::now();
        assert!(before <= now && now <= after);
    }
}
