//! Per-route fixed-window rate limiting.
//!
//! - [`policy`]: the route → `(window, max)` table with a default policy.
//! - [`store`]: the counter store port and its in-memory implementation.
//! - [`limiter`]: the allow/deny decision.
//! - [`clock`]: time sources.

pub mod clock;
pub mod limiter;
pub mod policy;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use limiter::{Decision, RateLimiter};
pub use policy::{RateLimitPolicy, RateLimitTable};
pub use store::{Counter, CounterKey, CounterStore, MemoryCounterStore};
