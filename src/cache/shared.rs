//! Shared Cache Module
//!
//! Thread-safe handle around a [`CacheStore`].

use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard};

use chrono::TimeDelta;

use crate::cache::{CacheStats, CacheStore, ConstantCost, CostLimit, Coster, Hit};
use crate::config::CacheConfig;
use crate::error::{fail_fast, CorruptionError};

// == Cache ==
/// A cost-limited, TTL-aware LRU cache that is safe for concurrent use.
///
/// One mutex guards the whole store, so every operation is serialized and the
/// observable effects of concurrent calls match some total order of them.
/// Wrap it in an `Arc` to share it between threads.
///
/// No background work is done: expired entries are reclaimed only by a later
/// `get`, `set` or `evict`.
pub struct Cache<K, V, C = ConstantCost> {
    store: Mutex<CacheStore<K, V, C>>,
}

impl<K, V> Cache<K, V, ConstantCost>
where
    K: Hash + Eq + Clone,
{
    /// Creates a cache where every entry costs 1.
    pub fn with_cost_limit(cost_limit: CostLimit) -> Self {
        Self::new(ConstantCost, cost_limit)
    }
}

impl<K, V, C> Cache<K, V, C>
where
    K: Hash + Eq + Clone,
    C: Coster<V>,
{
    /// Creates a new empty cache.
    ///
    /// # Arguments
    /// * `coster` - Weighs each value; use [`ConstantCost`] to count entries
    /// * `cost_limit` - Bound on the running cost, or [`CostLimit::Unlimited`]
    pub fn new(coster: C, cost_limit: CostLimit) -> Self {
        Self::from_store(CacheStore::new(coster, cost_limit))
    }

    /// Creates a new empty cache from configuration.
    pub fn from_config(config: &CacheConfig, coster: C) -> Self {
        Self::from_store(CacheStore::from_config(config, coster))
    }

    /// Wraps an existing store.
    pub fn from_store(store: CacheStore<K, V, C>) -> Self {
        Self {
            store: Mutex::new(store),
        }
    }

    /// Stores `value` under `key`, expiring `ttl` from now.
    ///
    /// See [`CacheStore::set`].
    pub fn set(&self, key: K, value: V, ttl: TimeDelta) {
        self.lock().set(key, value, ttl);
    }

    /// Stores `value` under `key` with the configured default TTL.
    pub fn insert(&self, key: K, value: V) {
        self.lock().insert(key, value);
    }

    /// Retrieves a value and its deadline, promoting it to most recently used.
    pub fn get<Q>(&self, key: &Q) -> Option<Hit<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        self.lock().get(key)
    }

    /// Checks for a live entry without promoting it.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.lock().contains(key)
    }

    /// Removes an entry, returning the cost reclaimed (0 if absent).
    pub fn delete<Q>(&self, key: &Q) -> u64
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.lock().delete(key)
    }

    /// Reaps expired entries and evicts down to the cost limit.
    ///
    /// Returns the total cost reclaimed.
    pub fn evict(&self) -> u128 {
        self.lock().evict()
    }

    /// Returns the cached value for `key`, computing and storing it on a miss.
    ///
    /// The cache lock is held while `compute` runs. Concurrent callers for the
    /// same key therefore compute at most once, but every other operation on
    /// this cache blocks until `compute` returns. `compute` must not use this
    /// cache itself, or it deadlocks. A panicking `compute` poisons the cache.
    ///
    /// If `compute` fails its error is returned unchanged and nothing is cached.
    pub fn get_or_compute<F, E>(&self, key: K, compute: F, ttl: TimeDelta) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
        V: Clone,
    {
        self.lock().get_or_compute(key, compute, ttl)
    }

    /// Returns the key that cost-based eviction would remove next.
    pub fn peek_lru(&self) -> Option<K> {
        self.lock().peek_lru().cloned()
    }

    /// Returns the number of entries, including expired ones not yet reaped.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Returns the running cost of all entries.
    pub fn cost(&self) -> u128 {
        self.lock().cost()
    }

    pub fn cost_limit(&self) -> CostLimit {
        self.lock().cost_limit()
    }

    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.lock().stats()
    }

    fn lock(&self) -> MutexGuard<'_, CacheStore<K, V, C>> {
        // A panic mid-operation may have left the store inconsistent
        self.store
            .lock()
            .unwrap_or_else(|_| fail_fast(CorruptionError::Poisoned))
    }
}

impl<K, V, C> fmt::Debug for Cache<K, V, C>
where
    K: Hash + Eq + Clone,
    C: Coster<V>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Cache");
        match self.store.try_lock() {
            Ok(store) => debug
                .field("len", &store.len())
                .field("cost", &store.cost()),
            Err(_) => debug.field("store", &"<locked>"),
        };
        debug.finish()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_cache_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Cache<String, Vec<u8>>>();
    }

    #[test]
    fn test_cache_shared_between_threads() {
        let cache = Arc::new(Cache::with_cost_limit(CostLimit::Limited(1000)));

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for i in 0..100 {
                        cache.set(format!("{t}:{i}"), i, TimeDelta::seconds(60));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.len(), 400);
        assert_eq!(cache.cost(), 400);
        assert_eq!(cache.get("3:99").map(|h| h.value), Some(99));
        cache.lock().check_invariants();
    }

    #[test]
    fn test_cache_debug_shows_size() {
        let cache = Cache::with_cost_limit(CostLimit::Unlimited);
        cache.set("a", 1, TimeDelta::seconds(60));
        assert_eq!(format!("{cache:?}"), "Cache { len: 1, cost: 1 }");
    }

    #[test]
    fn test_cache_poisoned_by_panicking_compute() {
        let cache = Arc::new(Cache::with_cost_limit(CostLimit::Unlimited));
        cache.set("a", 1, TimeDelta::seconds(60));

        let worker = Arc::clone(&cache);
        let result = thread::spawn(move || {
            let compute = || -> Result<i32, ()> { panic!("compute failed") };
            worker.get_or_compute("b", compute, TimeDelta::seconds(60))
        })
        .join();
        assert!(result.is_err());

        let after = thread::spawn(move || cache.get("a")).join();
        assert!(after.is_err(), "poisoned cache should fail fast");
    }
}
