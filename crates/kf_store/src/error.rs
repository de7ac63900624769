use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Username or email collided with an existing owner. Both engines
    /// translate their native unique-constraint failure into this variant.
    #[error("Username or email already exists")]
    UniquenessViolation,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Stored record is malformed: {0}")]
    Decode(String),
}
