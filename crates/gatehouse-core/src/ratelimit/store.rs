//! Counter storage for fixed-window rate limiting.
//!
//! The limiter never touches counters directly; it goes through the
//! [`CounterStore`] port so that a shared backend can replace the in-process
//! map without changing the decision logic.

use std::fmt::Debug;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

/// Counter identity: one counter per client per route.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CounterKey {
    pub identity: String,
    pub route: String,
}

impl CounterKey {
    pub fn new(identity: impl Into<String>, route: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            route: route.into(),
        }
    }
}

/// State of one fixed window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Counter {
    pub window_start: Instant,
    pub count: u32,
}

/// Port for counter storage.
///
/// [`CounterStore::increment`] must be atomic per key: the window reset, the
/// increment and the returned snapshot happen under one critical section, so
/// two concurrent requests for the same key never observe the same count.
/// Different keys need no coordination.
#[async_trait]
pub trait CounterStore: Send + Sync + Debug {
    /// Current counter for `key`, if one exists.
    async fn get(&self, key: &CounterKey) -> Option<Counter>;

    /// Starts a new window at `now` if `window` has elapsed since the current
    /// window began (or no counter exists), then adds one hit.
    ///
    /// Returns the counter after the increment. A `now` earlier than the
    /// window start counts as zero elapsed time and never resets.
    async fn increment(&self, key: &CounterKey, window: Duration, now: Instant) -> Counter;

    /// Forgets the counter for `key`.
    async fn reset(&self, key: &CounterKey);

    /// Drops counters whose window has elapsed at `now`. Returns how many were removed.
    async fn purge_expired(&self, now: Instant) -> usize;

    /// Number of live counters.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    counter: Counter,
    window: Duration,
}

impl Slot {
    fn expired_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.counter.window_start) >= self.window
    }
}

/// Process-local counter store.
///
/// Backed by a sharded `DashMap`; the shard write lock held by the entry API
/// serializes increments for a key. Counters do not survive a restart.
#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    counters: DashMap<CounterKey, Slot>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn get(&self, key: &CounterKey) -> Option<Counter> {
        self.counters.get(key).map(|slot| slot.counter)
    }

    async fn increment(&self, key: &CounterKey, window: Duration, now: Instant) -> Counter {
        let mut slot = self.counters.entry(key.clone()).or_insert(Slot {
            counter: Counter {
                window_start: now,
                count: 0,
            },
            window,
        });

        slot.window = window;
        if slot.expired_at(now) {
            slot.counter = Counter {
                window_start: now,
                count: 0,
            };
        }
        slot.counter.count = slot.counter.count.saturating_add(1);
        slot.counter
    }

    async fn reset(&self, key: &CounterKey) {
        self.counters.remove(key);
    }

    async fn purge_expired(&self, now: Instant) -> usize {
        let before = self.counters.len();
        self.counters.retain(|_, slot| !slot.expired_at(now));
        let removed = before.saturating_sub(self.counters.len());
        if removed > 0 {
            tracing::debug!(
                removed,
                remaining = self.counters.len(),
                "purged expired rate limit counters"
            );
        }
        removed
    }

    fn len(&self) -> usize {
        self.counters.len()
    }
}
