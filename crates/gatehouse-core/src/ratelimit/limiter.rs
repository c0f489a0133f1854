//! Fixed-window rate limiter.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::settings::{RateLimitSettings, StorageKind};
use crate::error::CoreResult;

use super::clock::{Clock, SystemClock};
use super::policy::RateLimitTable;
use super::store::{CounterKey, CounterStore, MemoryCounterStore};

/// Outcome of a rate-limit check.
///
/// A denial is an ordinary value: callers turn it into a "too many requests"
/// response instead of propagating a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow {
        /// Requests left in the current window.
        remaining: u32,
    },
    Deny {
        /// Time until the current window closes.
        retry_after: Duration,
    },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow { .. })
    }
}

/// Decides allow/deny per `(identity, route)` using the policy table and an
/// injected counter store.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    table: RateLimitTable,
    store: Arc<dyn CounterStore>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(table: RateLimitTable, store: Arc<dyn CounterStore>) -> Self {
        Self {
            table,
            store,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces the time source used by [`RateLimiter::check_now`].
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Builds a limiter from the `[rate_limit]` section.
    ///
    /// Returns `Ok(None)` when rate limiting is disabled.
    ///
    /// # Errors
    ///
    /// Any policy error from [`RateLimitTable::from_settings`].
    pub fn from_settings(settings: &RateLimitSettings) -> CoreResult<Option<Self>> {
        if !settings.enabled {
            return Ok(None);
        }

        let table = RateLimitTable::from_settings(settings)?;
        let store: Arc<dyn CounterStore> = match settings.storage {
            StorageKind::Memory => Arc::new(MemoryCounterStore::new()),
        };
        Ok(Some(Self::new(table, store)))
    }

    pub fn table(&self) -> &RateLimitTable {
        &self.table
    }

    /// Counts one request from `identity` against `route` at time `now`.
    ///
    /// The hit is recorded before the comparison and is kept even when the
    /// request is denied, so retrying while limited keeps the client limited.
    pub async fn check(&self, identity: &str, route: &str, now: Instant) -> Decision {
        let policy = self.table.lookup(route);
        let window = policy.window();
        let key = CounterKey::new(identity, route);

        let counter = self.store.increment(&key, window, now).await;

        if counter.count > policy.max_requests() {
            let retry_after = counter
                .window_start
                .checked_add(window)
                .map_or(Duration::MAX, |end| end.saturating_duration_since(now));
            tracing::debug!(
                identity,
                route,
                count = counter.count,
                limit = policy.max_requests(),
                retry_after_secs = retry_after.as_secs(),
                "rate limit exceeded"
            );
            Decision::Deny { retry_after }
        } else {
            Decision::Allow {
                remaining: policy.max_requests() - counter.count,
            }
        }
    }

    /// [`RateLimiter::check`] at the limiter's clock time.
    pub async fn check_now(&self, identity: &str, route: &str) -> Decision {
        self.check(identity, route, self.clock.now()).await
    }

    /// Drops counters whose window has closed.
    pub async fn purge_expired(&self) -> usize {
        self.store.purge_expired(self.clock.now()).await
    }
}
