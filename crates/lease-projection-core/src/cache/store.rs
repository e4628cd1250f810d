//! Bounded LRU cache of engine outputs keyed by input fingerprint.
//!
//! Concurrent requests for the same fingerprint are coalesced: the first
//! caller computes, later callers block on the in-flight slot and receive
//! the same result. Only successful outputs are stored; errors (including
//! timeouts) are handed to every waiter and then forgotten.

use chrono::{DateTime, Utc};
use log::debug;
use lru::LruCache;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::cache::fingerprint::{fingerprint, Fingerprint};
use crate::config::CacheConfig;
use crate::decimal::safe_divide;
use crate::error::LeaseProjectionError;
use crate::projection::deadline::run_with_deadline;
use crate::projection::engine::{run_projection, CalculationEngineOutput};
use crate::projection::input::EngineInput;
use crate::types::Rate;
use crate::LeaseProjectionResult;

type SharedOutput = Arc<CalculationEngineOutput>;
type SharedResult = LeaseProjectionResult<SharedOutput>;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub capacity: usize,
    pub entries: usize,
    /// Lookups served without computing, including coalesced waits
    pub hits: u64,
    pub misses: u64,
    /// Hits that waited on an in-flight computation
    pub coalesced: u64,
    pub evictions: u64,
    pub hit_ratio: Rate,
}

struct CacheEntry {
    output: SharedOutput,
    stored_at: DateTime<Utc>,
}

/// Result slot for a computation in progress.
struct InFlight {
    result: Mutex<Option<SharedResult>>,
    ready: Condvar,
}

impl InFlight {
    fn new() -> Self {
        Self {
            result: Mutex::new(None),
            ready: Condvar::new(),
        }
    }

    fn publish(&self, result: SharedResult) {
        let mut slot = self.result.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(result);
        self.ready.notify_all();
    }

    fn wait(&self) -> SharedResult {
        let mut slot = self.result.lock().unwrap_or_else(PoisonError::into_inner);
        while slot.is_none() {
            slot = self.ready.wait(slot).unwrap_or_else(PoisonError::into_inner);
        }
        match slot.as_ref() {
            Some(result) => result.clone(),
            None => Err(LeaseProjectionError::ComputationAbandoned(
                "in-flight computation produced no result".into(),
            )),
        }
    }
}

struct CacheState {
    /// None when storage is disabled (capacity 0)
    entries: Option<LruCache<Fingerprint, CacheEntry>>,
    in_flight: HashMap<Fingerprint, Arc<InFlight>>,
    hits: u64,
    misses: u64,
    coalesced: u64,
    evictions: u64,
}

impl CacheState {
    fn new(capacity: usize) -> Self {
        Self {
            entries: NonZeroUsize::new(capacity).map(LruCache::new),
            in_flight: HashMap::new(),
            hits: 0,
            misses: 0,
            coalesced: 0,
            evictions: 0,
        }
    }

    /// Stored output for `key`, marking it most recently used.
    fn touch(&mut self, key: &Fingerprint) -> Option<SharedOutput> {
        self.entries
            .as_mut()?
            .get(key)
            .map(|entry| entry.output.clone())
    }

    fn store(&mut self, key: Fingerprint, output: SharedOutput) {
        let Some(entries) = self.entries.as_mut() else {
            return;
        };
        let entry = CacheEntry {
            output,
            stored_at: Utc::now(),
        };
        // `push` hands back either the replaced entry for the same key or
        // the least recently used one it displaced
        if let Some((displaced, _)) = entries.push(key.clone(), entry) {
            if displaced != key {
                self.evictions += 1;
                debug!("Evicted projection {displaced}");
            }
        }
    }

    fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, LruCache::len)
    }
}

enum Role {
    Leader(Arc<InFlight>),
    Follower(Arc<InFlight>),
}

/// Thread-safe, shareable projection cache.
pub struct FingerprintCache {
    capacity: usize,
    state: Mutex<CacheState>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

impl FingerprintCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            capacity: config.capacity,
            state: Mutex::new(CacheState::new(config.capacity)),
        }
    }

    /// Coalesces concurrent runs but stores nothing.
    pub fn disabled() -> Self {
        Self::new(CacheConfig { capacity: 0 })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, input: &EngineInput) -> LeaseProjectionResult<Option<SharedOutput>> {
        let key = fingerprint(input)?;
        Ok(self.get_by_key(&key))
    }

    pub fn get_by_key(&self, key: &Fingerprint) -> Option<SharedOutput> {
        let mut state = self.lock_state();
        let hit = state.touch(key);
        if hit.is_some() {
            state.hits += 1;
        } else {
            state.misses += 1;
        }
        hit
    }

    pub fn put(&self, input: &EngineInput, output: CalculationEngineOutput) -> LeaseProjectionResult<Fingerprint> {
        let key = fingerprint(input)?;
        self.lock_state().store(key.clone(), Arc::new(output));
        Ok(key)
    }

    pub fn contains(&self, key: &Fingerprint) -> bool {
        self.lock_state()
            .entries
            .as_ref()
            .is_some_and(|entries| entries.contains(key))
    }

    /// When the entry for `key` was stored, if it is still cached.
    pub fn stored_at(&self, key: &Fingerprint) -> Option<DateTime<Utc>> {
        self.lock_state()
            .entries
            .as_ref()?
            .peek(key)
            .map(|e| e.stored_at)
    }

    pub fn len(&self) -> usize {
        self.lock_state().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every stored output. Counters and in-flight work are untouched.
    pub fn clear(&self) {
        if let Some(entries) = self.lock_state().entries.as_mut() {
            entries.clear();
        }
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.lock_state();
        let lookups = state.hits + state.misses;
        CacheStats {
            capacity: self.capacity,
            entries: state.len(),
            hits: state.hits,
            misses: state.misses,
            coalesced: state.coalesced,
            evictions: state.evictions,
            hit_ratio: safe_divide(Decimal::from(state.hits), Decimal::from(lookups)),
        }
    }

    /// Cached output for `input`, computing it with `compute` at most once
    /// across concurrent callers.
    pub fn get_or_compute<F>(&self, input: &EngineInput, compute: F) -> SharedResult
    where
        F: FnOnce(&EngineInput) -> LeaseProjectionResult<CalculationEngineOutput>,
    {
        let key = fingerprint(input)?;

        let role = {
            let mut state = self.lock_state();
            if let Some(hit) = state.touch(&key) {
                state.hits += 1;
                return Ok(hit);
            }
            match state.in_flight.get(&key).cloned() {
                Some(flight) => {
                    state.hits += 1;
                    state.coalesced += 1;
                    Role::Follower(flight)
                }
                None => {
                    state.misses += 1;
                    let flight = Arc::new(InFlight::new());
                    state.in_flight.insert(key.clone(), flight.clone());
                    Role::Leader(flight)
                }
            }
        };

        match role {
            Role::Follower(flight) => {
                debug!("Waiting on in-flight projection {key}");
                flight.wait()
            }
            Role::Leader(flight) => {
                let mut guard = LeaderGuard {
                    cache: self,
                    key: &key,
                    flight: &flight,
                    finished: false,
                };
                let result = compute(input).map(Arc::new);
                guard.finish(result.clone());
                result
            }
        }
    }

    /// `run_projection` through the cache.
    pub fn run(&self, input: &EngineInput) -> SharedResult {
        self.get_or_compute(input, run_projection)
    }

    /// Budgeted run through the cache; a timeout is returned to every
    /// waiter and nothing is stored.
    pub fn run_with_deadline(&self, input: &EngineInput, budget: Duration) -> SharedResult {
        self.get_or_compute(input, |i| run_with_deadline(i, budget))
    }

    fn lock_state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for FingerprintCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

/// Retires the in-flight slot even if the computation panics, so waiters
/// are never left blocked.
struct LeaderGuard<'a> {
    cache: &'a FingerprintCache,
    key: &'a Fingerprint,
    flight: &'a InFlight,
    finished: bool,
}

impl LeaderGuard<'_> {
    fn finish(&mut self, result: SharedResult) {
        {
            let mut state = self.cache.lock_state();
            state.in_flight.remove(self.key);
            if let Ok(output) = &result {
                state.store(self.key.clone(), output.clone());
            }
        }
        self.flight.publish(result);
        self.finished = true;
    }
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.finish(Err(LeaseProjectionError::ComputationAbandoned(
                "computation panicked".into(),
            )));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::fixtures::sample_input;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn small_cache(capacity: usize) -> FingerprintCache {
        FingerprintCache::new(CacheConfig { capacity })
    }

    #[test]
    fn test_second_run_hits() {
        let cache = small_cache(4);
        let input = sample_input();
        let a = cache.run(&input).unwrap();
        let b = cache.run(&input).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hit_ratio, dec!(0.5));
    }

    #[test]
    fn test_errors_not_cached() {
        let cache = small_cache(4);
        let input = sample_input();
        let calls = AtomicUsize::new(0);
        for _ in 0..2 {
            let result = cache.get_or_compute(&input, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(LeaseProjectionError::Timeout { budget_ms: 1 })
            });
            assert!(result.is_err());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_lru_eviction() {
        let cache = small_cache(2);
        let base = sample_input();
        let mut inputs = Vec::new();
        for years in [10u32, 11, 12] {
            let mut input = base.clone();
            input.dynamic.years = years;
            inputs.push(input);
        }
        let k0 = cache.put(&inputs[0], run_projection(&inputs[0]).unwrap()).unwrap();
        let k1 = cache.put(&inputs[1], run_projection(&inputs[1]).unwrap()).unwrap();
        // Touch the first so the second becomes least recently used
        assert!(cache.get_by_key(&k0).is_some());
        let k2 = cache.put(&inputs[2], run_projection(&inputs[2]).unwrap()).unwrap();

        assert!(cache.contains(&k0));
        assert!(!cache.contains(&k1));
        assert!(cache.contains(&k2));
        assert_eq!(cache.stats().evictions, 1);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_restoring_a_key_is_not_an_eviction() {
        let cache = small_cache(1);
        let input = sample_input();
        let key = cache.put(&input, run_projection(&input).unwrap()).unwrap();
        let first = cache.stored_at(&key).unwrap();
        cache.put(&input, run_projection(&input).unwrap()).unwrap();

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().evictions, 0);
        assert!(cache.stored_at(&key).unwrap() >= first);
    }

    #[test]
    fn test_zero_capacity_stores_nothing() {
        let cache = FingerprintCache::disabled();
        let input = sample_input();
        cache.run(&input).unwrap();
        cache.run(&input).unwrap();
        assert!(cache.is_empty());
        assert_eq!(cache.stats().misses, 2);
    }

    #[test]
    fn test_clear() {
        let cache = small_cache(4);
        let input = sample_input();
        cache.run(&input).unwrap();
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.get(&input).unwrap().is_none());
    }

    #[test]
    fn test_panicking_leader_releases_slot() {
        let cache = small_cache(4);
        let input = sample_input();
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            cache.get_or_compute(&input, |_| panic!("boom"))
        }));
        assert!(outcome.is_err());
        // Slot retired; a fresh computation runs normally
        assert!(cache.run(&input).is_ok());
    }
}
