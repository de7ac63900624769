//! Service-level error taxonomy. Callers can rely on the variant to pick a
//! response: validation and not-found map to client errors, storage and
//! crypto to server errors.

use thiserror::Error;

use kf_crypto::CryptoError;
use kf_store::StoreError;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Input rejected before any storage work happened.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Username or email collides with an existing account.
    #[error("Username or email already exists")]
    UniquenessViolation,

    /// Login failed. Deliberately identical for unknown usernames and wrong
    /// passwords so the message does not leak which accounts exist.
    #[error("Invalid username or password")]
    AuthenticationFailed,

    /// Bearer token is missing, malformed, tampered with, or expired.
    #[error("Invalid or expired token")]
    TokenInvalid,

    /// The record does not exist, or belongs to a different account. The two
    /// cases are indistinguishable on purpose.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// The per-account entry cap would be exceeded.
    #[error("Vault limit reached: at most {0} entries per account")]
    LimitExceeded(u32),

    #[error("Cryptography error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Storage error: {0}")]
    Storage(StoreError),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniquenessViolation => Self::UniquenessViolation,
            StoreError::Configuration(msg) => Self::Configuration(msg),
            other => Self::Storage(other),
        }
    }
}
