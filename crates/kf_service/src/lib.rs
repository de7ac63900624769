//! Keyfort service layer.
//!
//! [`VaultService`] ties the pieces together: credential hashing and bearer
//! tokens from `kf_crypto`, persistence behind the `kf_store` repository
//! interface. It owns all policy decisions: input hygiene, password strength,
//! the per-account entry cap, and the uniform login failure.
//!
//! The service works against `Arc<dyn Repository>`, so the same code runs
//! unchanged on either storage backend.

pub mod auth;
pub mod config;
pub mod entries;
pub mod error;
mod validate;

use std::sync::Arc;

use tracing::info;

use kf_store::{open_repository, Repository};

pub use auth::AuthSession;
pub use config::Settings;
pub use entries::EntryDraft;
pub use error::ServiceError;

pub struct VaultService {
    pub(crate) repo: Arc<dyn Repository>,
    pub(crate) settings: Settings,
}

impl VaultService {
    /// Wrap an already-open repository. Used by tests and by embedders that
    /// manage the store themselves.
    pub fn new(repo: Arc<dyn Repository>, settings: Settings) -> Result<Self, ServiceError> {
        settings.validate()?;
        Ok(Self { repo, settings })
    }

    /// Open the configured backend and return a ready service.
    pub async fn connect(settings: Settings) -> Result<Self, ServiceError> {
        settings.validate()?;
        let repo = open_repository(&settings.store_config()).await?;
        info!("vault service ready, backend: {}", settings.backend);
        Ok(Self { repo, settings })
    }
}
