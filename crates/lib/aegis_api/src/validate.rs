//! Request validation for the auth endpoints.

use crate::error::ApiError;

/// Minimal structural email check: `local@domain` with a dotted domain.
pub fn email(value: &str) -> Result<(), ApiError> {
    let valid = value
        .split_once('@')
        .is_some_and(|(local, domain)| {
            !local.is_empty()
                && !domain.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !value.contains(char::is_whitespace)
        });
    if valid {
        Ok(())
    } else {
        Err(ApiError::Validation("Valid email is required".into()))
    }
}

/// Registration password policy: at least 8 characters with upper- and
/// lowercase letters, a digit, and a special character.
pub fn new_password(value: &str) -> Result<(), ApiError> {
    let strong = value.len() >= 8
        && value.chars().any(|c| c.is_ascii_lowercase())
        && value.chars().any(|c| c.is_ascii_uppercase())
        && value.chars().any(|c| c.is_ascii_digit())
        && value.chars().any(|c| !c.is_ascii_alphanumeric());
    if strong {
        Ok(())
    } else {
        Err(ApiError::Validation(
            "Password must be at least 8 characters and contain uppercase, lowercase, number and special character".into(),
        ))
    }
}

/// Login only requires the password to be present; the policy above is
/// for new credentials.
pub fn password_present(value: &str) -> Result<(), ApiError> {
    if value.is_empty() {
        Err(ApiError::Validation("Password is required".into()))
    } else {
        Ok(())
    }
}
