//! Form validation.
//!
//! Validators never fail fast: each returns every problem it finds as a
//! [`FieldError`], and form-level functions concatenate those lists so a
//! client can show all messages at once.

pub mod signup;

use serde::Serialize;

pub use signup::{validate_signup, SignupForm};

/// One validation failure, attached to the form field it concerns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Wire name of the field (e.g. `"confirmPassword"`).
    pub field: &'static str,
    /// Stable message key a client can localize.
    pub code: &'static str,
    /// Default English message.
    pub message: &'static str,
}

impl FieldError {
    pub const fn new(field: &'static str, code: &'static str, message: &'static str) -> Self {
        Self {
            field,
            code,
            message,
        }
    }
}

/// Checks that `value` has between `min` and `max` characters, inclusive.
///
/// Length is counted in Unicode scalar values, not bytes.
pub fn check_length(
    value: &str,
    min: usize,
    max: usize,
    too_short: FieldError,
    too_long: FieldError,
) -> Option<FieldError> {
    let len = value.chars().count();
    if len < min {
        Some(too_short)
    } else if len > max {
        Some(too_long)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHORT: FieldError = FieldError::new("f", "short", "too short");
    const LONG: FieldError = FieldError::new("f", "long", "too long");

    #[test]
    fn length_counts_characters_not_bytes() {
        // 2 characters, 6 bytes
        assert_eq!(check_length("한글", 2, 3, SHORT, LONG), None);
        assert_eq!(check_length("한", 2, 3, SHORT, LONG), Some(SHORT));
    }

    #[test]
    fn length_bounds_are_inclusive() {
        assert_eq!(check_length("ab", 2, 3, SHORT, LONG), None);
        assert_eq!(check_length("abc", 2, 3, SHORT, LONG), None);
        assert_eq!(check_length("abcd", 2, 3, SHORT, LONG), Some(LONG));
    }
}
