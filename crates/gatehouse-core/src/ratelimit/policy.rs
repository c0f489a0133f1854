//! Route → policy lookup table.

use std::collections::HashMap;
use std::time::Duration;

use crate::config::settings::{RateLimitSettings, RuleSettings};
use crate::error::{CoreError, CoreResult};

/// Route pattern reported in errors for the default policy.
const DEFAULT_ROUTE: &str = "<default>";

/// The `(window, max)` pair governing one route.
///
/// Both values are strictly positive; construction through [`RateLimitPolicy::new`]
/// is the only way to obtain one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    window_seconds: u64,
    max_requests: u32,
}

impl RateLimitPolicy {
    /// Creates a policy allowing `max_requests` per `window_seconds`.
    ///
    /// # Errors
    ///
    /// [`CoreError::InvalidPolicy`] if either value is zero.
    pub fn new(window_seconds: u64, max_requests: u32) -> CoreResult<Self> {
        let window = i64::try_from(window_seconds).unwrap_or(i64::MAX);
        Self::checked(DEFAULT_ROUTE, window, i64::from(max_requests))
    }

    pub fn window_seconds(&self) -> u64 {
        self.window_seconds
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_seconds)
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    fn checked(route: &str, window: i64, max: i64) -> CoreResult<Self> {
        let invalid = |reason: &str| CoreError::InvalidPolicy {
            route: route.to_string(),
            reason: reason.to_string(),
        };

        let window_seconds = u64::try_from(window)
            .ok()
            .filter(|w| *w > 0)
            .ok_or_else(|| invalid(&format!("window must be positive, got {window}")))?;
        let max_requests = u32::try_from(max)
            .ok()
            .filter(|m| *m > 0)
            .ok_or_else(|| invalid(&format!("max must be a positive 32-bit count, got {max}")))?;

        Ok(Self {
            window_seconds,
            max_requests,
        })
    }

    fn from_rule(route: &str, rule: RuleSettings) -> CoreResult<Self> {
        Self::checked(route, rule.window, rule.max)
    }
}

/// Exact-match overrides plus one default policy.
///
/// Lookup is O(1): there is no prefix or wildcard matching, so
/// `/sign-in/email/` and `/sign-in/email` are different routes.
#[derive(Debug, Clone)]
pub struct RateLimitTable {
    default: RateLimitPolicy,
    overrides: HashMap<String, RateLimitPolicy>,
}

impl RateLimitTable {
    /// A table with no overrides.
    pub fn new(default: RateLimitPolicy) -> Self {
        Self {
            default,
            overrides: HashMap::new(),
        }
    }

    /// Adds an override for `route`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// [`CoreError::InvalidRoute`] if `route` does not start with `/`.
    pub fn with_rule(
        mut self,
        route: impl Into<String>,
        policy: RateLimitPolicy,
    ) -> CoreResult<Self> {
        let route = route.into();
        validate_route(&route)?;
        self.overrides.insert(route, policy);
        Ok(self)
    }

    /// Builds the table from the `[rate_limit]` settings section.
    ///
    /// Fails on the first non-positive window or max, naming the offending
    /// route. Route keys come from a map, so they are already unique.
    pub fn from_settings(settings: &RateLimitSettings) -> CoreResult<Self> {
        let default = RateLimitPolicy::from_rule(DEFAULT_ROUTE, settings.default_rule())?;
        let mut overrides = HashMap::with_capacity(settings.custom_rules.len());
        for (route, rule) in &settings.custom_rules {
            validate_route(route)?;
            overrides.insert(route.clone(), RateLimitPolicy::from_rule(route, *rule)?);
        }
        Ok(Self { default, overrides })
    }

    /// The override whose pattern equals `route`, or the default policy.
    pub fn lookup(&self, route: &str) -> RateLimitPolicy {
        self.overrides.get(route).copied().unwrap_or(self.default)
    }

    pub fn default_policy(&self) -> RateLimitPolicy {
        self.default
    }
}

fn validate_route(route: &str) -> CoreResult<()> {
    if route.starts_with('/') {
        Ok(())
    } else {
        Err(CoreError::InvalidRoute(route.to_string()))
    }
}
