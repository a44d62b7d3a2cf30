//! Cache Store Module
//!
//! Eviction engine combining a key index, a recency list and a deadline
//! index, with cost accounting tying them together.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

use chrono::TimeDelta;
use tracing::{debug, trace};

use crate::cache::{
    CacheStats, ConstantCost, CostLimit, Coster, Deadline, DeadlineIndex, DeadlineKey, Entry, Hit,
    NodeHandle, RecencyList,
};
use crate::config::CacheConfig;
use crate::error::{fail_fast, CorruptionError};

// == Cache Store ==
/// Single-owner cache engine with cost-based LRU eviction and TTL expiration.
///
/// Every live entry is owned by one node of the recency list. The key index
/// maps keys to node handles and the deadline index maps encoded deadlines
/// back to keys; both are kept in lockstep with the list.
///
/// Expiration is lazy: expired entries are reaped by the next `get`, `set` or
/// `evict` that touches them. Use [`Cache`](crate::cache::Cache) to share a
/// store between threads.
#[derive(Debug)]
pub struct CacheStore<K, V, C = ConstantCost> {
    /// Key to list node
    index: HashMap<K, NodeHandle>,
    /// Entries from most to least recently used
    lru: RecencyList<Entry<K, V>>,
    /// Entries from earliest to latest deadline
    deadlines: DeadlineIndex<K>,
    coster: C,
    /// Sum of the costs of all live entries, wide enough that no number of
    /// `u64` weights can overflow it
    cost: u128,
    cost_limit: CostLimit,
    /// TTL applied by `insert`
    default_ttl: TimeDelta,
    stats: CacheStats,
}

impl<K, V> CacheStore<K, V, ConstantCost>
where
    K: Hash + Eq + Clone,
{
    /// Creates a store where every entry costs 1.
    pub fn with_cost_limit(cost_limit: CostLimit) -> Self {
        Self::new(ConstantCost, cost_limit)
    }
}

impl<K, V, C> CacheStore<K, V, C>
where
    K: Hash + Eq + Clone,
    C: Coster<V>,
{
    // == Constructor ==
    /// Creates a new empty store.
    ///
    /// # Arguments
    /// * `coster` - Weighs each value; use [`ConstantCost`] to count entries
    /// * `cost_limit` - Bound on the running cost, or [`CostLimit::Unlimited`]
    pub fn new(coster: C, cost_limit: CostLimit) -> Self {
        let defaults = CacheConfig::default();
        Self {
            index: HashMap::new(),
            lru: RecencyList::new(),
            deadlines: DeadlineIndex::new(),
            coster,
            cost: 0,
            cost_limit,
            default_ttl: defaults.default_ttl(),
            stats: CacheStats::new(),
        }
    }

    /// Creates a new empty store from configuration.
    pub fn from_config(config: &CacheConfig, coster: C) -> Self {
        let mut store = Self::new(coster, config.cost_limit());
        store.default_ttl = config.default_ttl();
        store
    }

    // == Set ==
    /// Stores `value` under `key`, expiring `ttl` from now.
    ///
    /// An existing entry for `key` is replaced and becomes most recently used.
    /// Expired entries are reaped and, if the cost limit is exceeded, least
    /// recently used entries are evicted before the new entry is inserted.
    /// A zero or negative `ttl` stores an entry that the next `get` reports
    /// as a miss.
    pub fn set(&mut self, key: K, value: V, ttl: TimeDelta) {
        let cost = self.coster.cost(&value);

        self.remove_entry(&key);
        self.cost += u128::from(cost);

        let now = Deadline::now();
        self.evict_expired(now);
        self.evict_overages();

        let deadline = self.free_deadline(now.after(ttl));
        if self.deadlines.insert(DeadlineKey::from(deadline), key.clone()) {
            fail_fast(CorruptionError::OccupiedDeadline(deadline.to_string()));
        }

        let handle = self.lru.append(Entry {
            key: key.clone(),
            value,
            deadline,
            cost,
        });
        self.index.insert(key, handle);
        trace!(cost, deadline = %deadline, "entry stored");
    }

    // == Insert ==
    /// Stores `value` under `key` with the default TTL.
    pub fn insert(&mut self, key: K, value: V) {
        self.set(key, value, self.default_ttl);
    }

    // == Get ==
    /// Retrieves a value and its deadline.
    ///
    /// A live entry becomes most recently used. An expired entry is removed
    /// and reported as a miss.
    pub fn get<Q>(&mut self, key: &Q) -> Option<Hit<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        let Some(&handle) = self.index.get(key) else {
            self.stats.record_miss();
            return None;
        };

        if self.entry(handle).deadline.has_passed(Deadline::now()) {
            self.remove_entry(key);
            self.stats.record_expiration();
            self.stats.record_miss();
            trace!("expired entry reaped on read");
            return None;
        }

        if !self.lru.promote(handle) {
            fail_fast(CorruptionError::DanglingHandle(handle.index()));
        }
        self.stats.record_hit();

        let entry = self.entry(handle);
        Some(Hit {
            value: entry.value.clone(),
            deadline: entry.deadline.to_datetime(),
        })
    }

    // == Contains ==
    /// Checks for a live entry without promoting or reaping it.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index
            .get(key)
            .is_some_and(|&handle| !self.entry(handle).deadline.has_passed(Deadline::now()))
    }

    // == Delete ==
    /// Removes an entry, returning the cost reclaimed (0 if absent).
    pub fn delete<Q>(&mut self, key: &Q) -> u64
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.remove_entry(key).map_or(0, |entry| entry.cost)
    }

    // == Evict ==
    /// Reaps every expired entry, then evicts least recently used entries
    /// until the running cost is within the limit.
    ///
    /// `set` already does this, so most callers never need to. Returns the
    /// total cost reclaimed.
    pub fn evict(&mut self) -> u128 {
        self.evict_expired(Deadline::now()) + self.evict_overages()
    }

    // == Get Or Compute ==
    /// Returns the cached value for `key`, computing and storing it on a miss.
    ///
    /// `compute` runs at most once. If it fails, its error is returned
    /// unchanged and nothing is cached, so the next call retries.
    pub fn get_or_compute<F, E>(&mut self, key: K, compute: F, ttl: TimeDelta) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
        V: Clone,
    {
        if let Some(hit) = self.get(&key) {
            return Ok(hit.value);
        }

        let value = compute()?;
        self.set(key, value.clone(), ttl);
        Ok(value)
    }

    // == Peek LRU ==
    /// Returns the key that cost-based eviction would remove next.
    pub fn peek_lru(&self) -> Option<&K> {
        self.lru.peek_tail().map(|handle| &self.entry(handle).key)
    }

    // == Accessors ==
    /// Returns the number of entries, including expired ones not yet reaped.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Returns the running cost of all entries.
    pub fn cost(&self) -> u128 {
        self.cost
    }

    pub fn cost_limit(&self) -> CostLimit {
        self.cost_limit
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.entries = self.index.len();
        stats.cost = self.cost;
        stats.next_deadline = self
            .deadlines
            .minimum()
            .map(|(deadline, _)| deadline.decode().to_datetime());
        stats
    }

    // == Internal ==

    fn entry(&self, handle: NodeHandle) -> &Entry<K, V> {
        self.lru
            .get(handle)
            .unwrap_or_else(|| fail_fast(CorruptionError::DanglingHandle(handle.index())))
    }

    /// Removes `key` from all three structures.
    fn remove_entry<Q>(&mut self, key: &Q) -> Option<Entry<K, V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let handle = self.index.remove(key)?;
        let entry = self
            .lru
            .remove(handle)
            .unwrap_or_else(|| fail_fast(CorruptionError::DanglingHandle(handle.index())));
        self.release(&entry);
        Some(entry)
    }

    /// Drops an unlinked entry's deadline slot and gives back its cost.
    fn release(&mut self, entry: &Entry<K, V>) {
        if !self.deadlines.delete(entry.deadline.into()) {
            fail_fast(CorruptionError::MissingDeadline(entry.deadline.to_string()));
        }
        let Some(cost) = self.cost.checked_sub(u128::from(entry.cost)) else {
            fail_fast(CorruptionError::CostUnderflow {
                cost: self.cost,
                reclaimed: entry.cost,
            });
        };
        self.cost = cost;
    }

    /// Reaps entries whose deadline is at or before `now`, earliest first.
    fn evict_expired(&mut self, now: Deadline) -> u128 {
        let mut reclaimed = 0;
        let mut count = 0u64;

        while let Some((deadline, key)) = self.deadlines.minimum() {
            if !deadline.decode().has_passed(now) {
                // Reached live entries
                break;
            }
            let key = key.clone();
            let entry = self
                .remove_entry(&key)
                .unwrap_or_else(|| fail_fast(CorruptionError::MissingIndex));
            reclaimed += u128::from(entry.cost);
            count += 1;
            self.stats.record_expiration();
        }

        if count > 0 {
            debug!(count, reclaimed, "expired entries reaped");
        }
        reclaimed
    }

    /// Pops least recently used entries while the running cost is over the limit.
    fn evict_overages(&mut self) -> u128 {
        let mut reclaimed = 0;
        let mut count = 0u64;

        while self.cost_limit.is_exceeded_by(self.cost) {
            // An empty list ends the sweep even if the cost is still over
            let Some(entry) = self.lru.pop_tail() else {
                break;
            };
            if self.index.remove(&entry.key).is_none() {
                fail_fast(CorruptionError::MissingIndex);
            }
            self.release(&entry);
            reclaimed += u128::from(entry.cost);
            count += 1;
            self.stats.record_eviction();
        }

        if count > 0 {
            debug!(count, reclaimed, "least recently used entries evicted");
        }
        reclaimed
    }

    /// Finds a vacant deadline slot for `requested`.
    ///
    /// Occupied slots are skipped upward in growing steps of 1, 2, 4, ...
    /// nanoseconds. Past the end of the deadline range, the latest vacant
    /// slot before `requested` is taken instead, so far-future deadlines
    /// that saturated to the same instant still get distinct slots.
    fn free_deadline(&self, requested: Deadline) -> Deadline {
        let candidate = self
            .probe_later(requested)
            .or_else(|| {
                self.deadlines
                    .vacant_before(requested.into())
                    .map(DeadlineKey::decode)
            })
            .unwrap_or_else(|| {
                fail_fast(CorruptionError::DeadlineExhausted(requested.to_string()))
            });

        if candidate != requested {
            trace!(requested = %requested, assigned = %candidate, "deadline collision resolved");
        }
        candidate
    }

    /// Probes upward from `requested`, or `None` once probing leaves the range.
    fn probe_later(&self, requested: Deadline) -> Option<Deadline> {
        let mut candidate = requested;
        let mut step: i64 = 1;

        while self.deadlines.contains(candidate.into()) {
            candidate = candidate.checked_add_nanos(step)?;
            step = step.saturating_mul(2);
        }
        Some(candidate)
    }

    /// Asserts every cross-structure invariant.
    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        assert_eq!(self.index.len(), self.lru.len(), "key index and list disagree");
        assert_eq!(
            self.deadlines.len(),
            self.lru.len(),
            "deadline index and list disagree"
        );

        let mut total = 0u128;
        for entry in self.lru.iter() {
            let handle = self.index.get(&entry.key).expect("list entry missing from key index");
            assert!(
                std::ptr::eq(self.entry(*handle), entry),
                "key index points at another node"
            );
            let slot = self
                .deadlines
                .iter()
                .find(|(deadline, _)| **deadline == DeadlineKey::encode(entry.deadline))
                .map(|(_, key)| key);
            assert!(slot == Some(&entry.key), "deadline index points at another key");
            total += u128::from(entry.cost);
        }
        assert_eq!(total, self.cost, "running cost drifted");
    }
}
