//! User-facing messages for auth provider error codes.
//!
//! Codes are passed through from the provider untouched; this table only
//! decides what text a person sees for them.

/// Message shown for any code not in the table.
pub const UNKNOWN_ERROR_MESSAGE: &str = "An unknown error occurred. Please try again.";

pub const USER_ALREADY_EXISTS: &str = "USER_ALREADY_EXISTS_USE_ANOTHER_EMAIL";
pub const FAILED_TO_CREATE_USER: &str = "FAILED_TO_CREATE_USER";
pub const FAILED_TO_CREATE_SESSION: &str = "FAILED_TO_CREATE_SESSION";
pub const INVALID_EMAIL_OR_PASSWORD: &str = "INVALID_EMAIL_OR_PASSWORD";
pub const VALIDATION_FAILED: &str = "VALIDATION_FAILED";
pub const INVALID_REQUEST_BODY: &str = "INVALID_REQUEST_BODY";
pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
pub const NOT_FOUND: &str = "NOT_FOUND";
pub const TOO_MANY_REQUESTS: &str = "TOO_MANY_REQUESTS";
/// A server-side failure unrelated to what the client sent.
pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";

const MESSAGES: &[(&str, &str)] = &[
    (
        USER_ALREADY_EXISTS,
        "An account with this email already exists. Please use another email.",
    ),
    (FAILED_TO_CREATE_USER, "We couldn't create your account. Please try again."),
    (
        FAILED_TO_CREATE_SESSION,
        "Your account was created but we couldn't sign you in. Please sign in.",
    ),
    (INVALID_EMAIL_OR_PASSWORD, "Invalid email or password."),
    (VALIDATION_FAILED, "Please fix the highlighted fields."),
    (INVALID_REQUEST_BODY, "The request could not be read."),
    (UNAUTHORIZED, "You need to sign in to continue."),
    (NOT_FOUND, "Not found."),
    (TOO_MANY_REQUESTS, "Too many requests. Please try again later."),
    (INTERNAL_ERROR, "Something went wrong on our side. Please try again."),
];

/// Looks up the message for `code`, falling back to [`UNKNOWN_ERROR_MESSAGE`].
pub fn auth_error_message(code: &str) -> &'static str {
    MESSAGES
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, message)| *message)
        .unwrap_or(UNKNOWN_ERROR_MESSAGE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_have_specific_messages() {
        for code in [
            USER_ALREADY_EXISTS,
            FAILED_TO_CREATE_USER,
            FAILED_TO_CREATE_SESSION,
            INTERNAL_ERROR,
        ] {
            assert_ne!(auth_error_message(code), UNKNOWN_ERROR_MESSAGE);
        }
    }

    #[test]
    fn unknown_code_falls_back() {
        assert_eq!(auth_error_message("SOMETHING_NEW"), UNKNOWN_ERROR_MESSAGE);
        assert_eq!(auth_error_message(""), UNKNOWN_ERROR_MESSAGE);
    }

    #[test]
    fn internal_error_does_not_blame_credentials() {
        assert_ne!(
            auth_error_message(INTERNAL_ERROR),
            auth_error_message(INVALID_EMAIL_OR_PASSWORD)
        );
    }

    #[test]
    fn lookup_is_case_sensitive() {
        assert_eq!(
            auth_error_message("user_already_exists_use_another_email"),
            UNKNOWN_ERROR_MESSAGE
        );
    }

    #[test]
    fn table_has_no_duplicate_codes() {
        for (i, (a, _)) in MESSAGES.iter().enumerate() {
            assert!(MESSAGES[i + 1..].iter().all(|(b, _)| a != b), "duplicate code {a}");
        }
    }
}
