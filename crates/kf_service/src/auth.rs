//! Account registration, login, and bearer-token checks.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use kf_crypto::password::{generate_salt, hash_master_password, verify_master_password};
use kf_crypto::token::{self, TokenClaims};
use kf_store::{NewOwner, OwnerProfile};

use crate::error::ServiceError;
use crate::validate::{
    password_strength, require_non_empty, sanitize_text, MAX_EMAIL_LEN, MAX_USERNAME_LEN,
};
use crate::VaultService;

/// Salt burned on login attempts against unknown usernames, so a miss costs
/// the same Argon2 work as a wrong password.
const DUMMY_SALT: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// What a successful registration or login hands back: the owner's public
/// profile and a bearer token for subsequent calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub owner: OwnerProfile,
    pub token: String,
}

impl VaultService {
    /// Create an account and log it in.
    ///
    /// The username/email pre-check gives a friendly error in the common
    /// case; under a race the storage layer's unique constraint is the
    /// arbiter and surfaces as the same [`ServiceError::UniquenessViolation`].
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        master_password: &str,
    ) -> Result<AuthSession, ServiceError> {
        let username = sanitize_text(username, MAX_USERNAME_LEN);
        let email = sanitize_text(email, MAX_EMAIL_LEN);
        require_non_empty(&username, "username")?;
        require_non_empty(&email, "email")?;
        if !email.contains('@') {
            return Err(ServiceError::Validation("Email address is not valid".into()));
        }
        password_strength(master_password)?;

        if self.repo.owner_by_username(&username).await?.is_some()
            || self.repo.owner_by_email(&email).await?.is_some()
        {
            return Err(ServiceError::UniquenessViolation);
        }

        let salt = generate_salt();
        let master_password_hash = hash_master_password(master_password, &salt)?;

        let owner = self
            .repo
            .create_owner(NewOwner {
                username,
                email,
                master_password_hash,
                salt,
            })
            .await?;

        info!("registered account {}", owner.id);
        let token = self.issue_token(&owner.id, &owner.username)?;
        Ok(AuthSession {
            owner: owner.profile(),
            token,
        })
    }

    /// Verify credentials and hand out a fresh token.
    ///
    /// Unknown usernames and wrong passwords are indistinguishable to the
    /// caller, in both the error value and the time taken.
    pub async fn login(
        &self,
        username: &str,
        master_password: &str,
    ) -> Result<AuthSession, ServiceError> {
        let username = sanitize_text(username, MAX_USERNAME_LEN);

        let Some(owner) = self.repo.owner_by_username(&username).await? else {
            let _ = hash_master_password(master_password, DUMMY_SALT);
            warn!("login failed: unknown username");
            return Err(ServiceError::AuthenticationFailed);
        };

        let verified =
            verify_master_password(master_password, &owner.salt, &owner.master_password_hash)?;
        if !verified {
            warn!("login failed for account {}", owner.id);
            return Err(ServiceError::AuthenticationFailed);
        }

        info!("login succeeded for account {}", owner.id);
        let token = self.issue_token(&owner.id, &owner.username)?;
        Ok(AuthSession {
            owner: owner.profile(),
            token,
        })
    }

    /// Check a bearer token and return its claims. All failure modes
    /// (malformed, tampered, expired, wrong algorithm) collapse into
    /// [`ServiceError::TokenInvalid`].
    pub fn authorize(&self, token: &str) -> Result<TokenClaims, ServiceError> {
        token::validate(
            token,
            self.settings.token_secret.as_bytes(),
            self.settings.token_algorithm,
        )
        .map_err(|_| ServiceError::TokenInvalid)
    }

    fn issue_token(&self, owner_id: &str, username: &str) -> Result<String, ServiceError> {
        let token = token::issue(
            owner_id,
            username,
            self.settings.token_secret.as_bytes(),
            self.settings.token_algorithm,
            self.settings.token_ttl_hours,
        )?;
        Ok(token)
    }
}
