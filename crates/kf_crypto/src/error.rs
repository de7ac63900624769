use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Stored password hash is malformed: {0}")]
    MalformedHash(String),

    #[error("Token issue failed: {0}")]
    TokenIssue(String),

    #[error("Token is invalid or expired")]
    InvalidToken,

    #[error("Unknown token algorithm: {0}")]
    UnknownAlgorithm(String),
}
