//! Input hygiene shared by the account and entry operations.
//!
//! Free-text fields are cleaned here; ciphertext fields (entry username,
//! password, IV) pass through untouched because altering them would corrupt
//! what only the client can decrypt.

use crate::error::ServiceError;

pub(crate) const MAX_USERNAME_LEN: usize = 100;
pub(crate) const MAX_EMAIL_LEN: usize = 255;
pub(crate) const MAX_NAME_LEN: usize = 255;
pub(crate) const MAX_URL_LEN: usize = 500;
pub(crate) const MAX_NOTES_LEN: usize = 10_000;

/// Strip NUL bytes, cap the length in characters, and trim surrounding
/// whitespace, in that order.
pub(crate) fn sanitize_text(input: &str, max_len: usize) -> String {
    let cleaned: String = input.chars().filter(|c| *c != '\0').take(max_len).collect();
    cleaned.trim().to_string()
}

pub(crate) fn require_non_empty(value: &str, field: &str) -> Result<(), ServiceError> {
    if value.is_empty() {
        return Err(ServiceError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

/// Minimum bar for a master password: 8+ characters with an uppercase
/// letter, a lowercase letter, and a digit.
pub(crate) fn password_strength(password: &str) -> Result<(), ServiceError> {
    if password.chars().count() < 8 {
        return Err(ServiceError::Validation(
            "Password must be at least 8 characters long".into(),
        ));
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(ServiceError::Validation(
            "Password must contain an uppercase letter".into(),
        ));
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(ServiceError::Validation(
            "Password must contain a lowercase letter".into(),
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(ServiceError::Validation(
            "Password must contain a digit".into(),
        ));
    }
    Ok(())
}
