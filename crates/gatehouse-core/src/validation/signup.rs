//! Email sign-up form rules.

use serde::Deserialize;
use validator::ValidateEmail;

use super::{check_length, FieldError};

pub const NAME_MIN: FieldError = FieldError::new(
    "name",
    "auth_validation_name_min",
    "Name must be at least 2 characters",
);
pub const NAME_MAX: FieldError = FieldError::new(
    "name",
    "auth_validation_name_max",
    "Name must be at most 50 characters",
);
pub const EMAIL_INVALID: FieldError = FieldError::new(
    "email",
    "auth_validation_email",
    "Please enter a valid email address",
);
pub const PASSWORD_MIN: FieldError = FieldError::new(
    "password",
    "auth_validation_password_min",
    "Password must be at least 8 characters",
);
pub const PASSWORD_MAX: FieldError = FieldError::new(
    "password",
    "auth_validation_password_max",
    "Password must be at most 128 characters",
);
pub const PASSWORD_COMPLEXITY: FieldError = FieldError::new(
    "password",
    "auth_validation_password_complexity",
    "Password must contain at least one letter and one number",
);
pub const CONFIRM_REQUIRED: FieldError = FieldError::new(
    "confirmPassword",
    "auth_validation_confirm_required",
    "Please confirm your password",
);
pub const PASSWORDS_MISMATCH: FieldError = FieldError::new(
    "confirmPassword",
    "auth_validation_passwords_mismatch",
    "Passwords do not match",
);

/// Sign-up request body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupForm {
    pub name: String,
    pub email: String,
    pub password: String,
    /// A missing field reads as empty and fails validation on `confirmPassword`.
    #[serde(default)]
    pub confirm_password: String,
}

pub fn validate_name(name: &str) -> Vec<FieldError> {
    check_length(name, 2, 50, NAME_MIN, NAME_MAX).into_iter().collect()
}

pub fn validate_email(email: &str) -> Vec<FieldError> {
    if email.validate_email() {
        Vec::new()
    } else {
        vec![EMAIL_INVALID]
    }
}

/// Length and composition rules. Both may fail together.
pub fn validate_password(password: &str) -> Vec<FieldError> {
    let mut errors: Vec<FieldError> =
        check_length(password, 8, 128, PASSWORD_MIN, PASSWORD_MAX).into_iter().collect();

    let has_letter = password.chars().any(|c| c.is_ascii_alphabetic());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !(has_letter && has_digit) {
        errors.push(PASSWORD_COMPLEXITY);
    }
    errors
}

/// Cross-field rule: the confirmation must repeat the password.
pub fn check_passwords_match(form: &SignupForm) -> Option<FieldError> {
    if form.confirm_password.is_empty() {
        Some(CONFIRM_REQUIRED)
    } else if form.confirm_password != form.password {
        Some(PASSWORDS_MISMATCH)
    } else {
        None
    }
}

/// Runs every field rule and the cross-field rule.
///
/// The cross-field rule runs even when individual fields already failed.
pub fn validate_signup(form: &SignupForm) -> Result<(), Vec<FieldError>> {
    let mut errors = validate_name(&form.name);
    errors.extend(validate_email(&form.email));
    errors.extend(validate_password(&form.password));
    errors.extend(check_passwords_match(form));

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(name: &str, email: &str, password: &str, confirm: &str) -> SignupForm {
        SignupForm {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            confirm_password: confirm.to_string(),
        }
    }

    #[test]
    fn valid_form_passes() {
        let f = form("Ada", "ada@example.com", "hunter22", "hunter22");
        assert_eq!(validate_signup(&f), Ok(()));
    }

    #[test]
    fn name_bounds() {
        assert_eq!(validate_name("A"), vec![NAME_MIN]);
        assert!(validate_name("Al").is_empty());
        assert!(validate_name(&"x".repeat(50)).is_empty());
        assert_eq!(validate_name(&"x".repeat(51)), vec![NAME_MAX]);
    }

    #[test]
    fn email_must_be_an_address() {
        assert!(validate_email("ada@example.com").is_empty());
        assert_eq!(validate_email("ada"), vec![EMAIL_INVALID]);
        assert_eq!(validate_email("ada@"), vec![EMAIL_INVALID]);
        assert_eq!(validate_email(""), vec![EMAIL_INVALID]);
    }

    #[test]
    fn password_needs_letter_and_digit() {
        assert_eq!(validate_password("abcdefgh"), vec![PASSWORD_COMPLEXITY]);
        assert_eq!(validate_password("12345678"), vec![PASSWORD_COMPLEXITY]);
        assert!(validate_password("abcdefg1").is_empty());
    }

    #[test]
    fn short_simple_password_reports_both_failures() {
        assert_eq!(validate_password("abc"), vec![PASSWORD_MIN, PASSWORD_COMPLEXITY]);
    }

    #[test]
    fn long_password_is_rejected() {
        let long = format!("a1{}", "b".repeat(127));
        assert_eq!(validate_password(&long), vec![PASSWORD_MAX]);
    }

    #[test]
    fn mismatch_is_reported_on_confirm_field() {
        let f = form("Ada", "ada@example.com", "hunter22", "hunter23");
        let errors = validate_signup(&f).unwrap_err();
        assert_eq!(errors, vec![PASSWORDS_MISMATCH]);
        assert_eq!(errors[0].field, "confirmPassword");
    }

    #[test]
    fn mismatch_checked_even_when_fields_fail() {
        let f = form("A", "nope", "abc", "xyz");
        let errors = validate_signup(&f).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec!["name", "email", "password", "password", "confirmPassword"]
        );
    }

    #[test]
    fn missing_confirmation_is_reported_on_confirm_field() {
        let f: SignupForm = serde_json::from_str(
            r#"{"name":"Ada","email":"ada@example.com","password":"hunter22"}"#,
        )
        .unwrap();
        assert_eq!(validate_signup(&f), Err(vec![CONFIRM_REQUIRED]));
        assert_eq!(CONFIRM_REQUIRED.field, "confirmPassword");
    }

    #[test]
    fn deserializes_camel_case_body() {
        let body = r#"{"name":"Ada","email":"ada@example.com",
            "password":"hunter22","confirmPassword":"hunter22"}"#;
        let f: SignupForm = serde_json::from_str(body).unwrap();
        assert_eq!(f.confirm_password, "hunter22");
    }
}
