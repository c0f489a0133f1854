//! Error types for `gatehouse-core`.
//!
//! All fallible operations in the core library return [`CoreResult<T>`],
//! which is an alias for `Result<T, CoreError>`.

use std::path::PathBuf;

/// Unified error type for all core operations.
///
/// Every variant is a configuration-time failure: per-request outcomes such
/// as rate-limit denials or validation failures are plain values, not errors.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A rate-limit policy has a zero or negative window or request budget.
    #[error("invalid rate limit policy for {route}: {reason}")]
    InvalidPolicy { route: String, reason: String },

    /// A custom rule names a route pattern that cannot match any request path.
    #[error("invalid route pattern: {0:?}")]
    InvalidRoute(String),

    /// The configuration file does not exist.
    #[error("config not found: {0}")]
    NotFound(PathBuf),

    /// The process lacks permission to read the configuration file.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// Failed to parse a TOML configuration file.
    #[error("config parse error: {0}")]
    ConfigParse(String),

    /// An I/O error that doesn't fit a more specific variant.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout `gatehouse-core`.
pub type CoreResult<T> = Result<T, CoreError>;
