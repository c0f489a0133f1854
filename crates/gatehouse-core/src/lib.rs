//! Gatehouse core library: HTTP-agnostic auth gateway logic.
//!
//! `gatehouse-core` holds the decisions the web layer delegates: whether a
//! request is within its rate limit, whether a sign-up form is acceptable,
//! what message an auth error code maps to, and how the locale placeholder
//! is patched into outgoing HTML. Nothing here depends on a web framework.
//!
//! # Modules
//!
//! - [`ratelimit`]: policy table, counter store port, fixed-window limiter.
//! - [`validation`]: field validators and cross-field checks returning [`FieldError`] lists.
//! - [`auth_errors`]: static error-code → message table.
//! - [`locale`]: streaming placeholder rewriter.
//! - [`config`]: TOML settings.
//! - [`error`]: unified error type ([`CoreError`]) and result alias ([`CoreResult`]).

pub mod auth_errors;
pub mod config;
pub mod error;
pub mod locale;
pub mod ratelimit;
pub mod validation;

pub use auth_errors::auth_error_message;
pub use config::settings::{LocaleSettings, RateLimitSettings, RuleSettings, Settings, StorageKind};
pub use error::{CoreError, CoreResult};
pub use locale::PlaceholderRewriter;
pub use ratelimit::{
    Clock, CounterKey, CounterStore, Decision, ManualClock, MemoryCounterStore, RateLimitPolicy,
    RateLimitTable, RateLimiter, SystemClock,
};
pub use validation::{validate_signup, FieldError, SignupForm};
