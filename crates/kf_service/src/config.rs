//! Runtime settings, loaded from `KEYFORT_*` environment variables.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use kf_crypto::token::TokenAlgorithm;
use kf_store::{BackendKind, StoreConfig};

use crate::error::ServiceError;

/// Upper bound on the configurable token lifetime, one year. The expiry
/// arithmetic in `kf_crypto::token` needs the lifetime to fit in `i64` hours.
pub const MAX_TOKEN_TTL_HOURS: u64 = 24 * 365;

#[derive(Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Storage engine to open (`KEYFORT_BACKEND`).
    pub backend: BackendKind,
    /// SQLite database file (`KEYFORT_SQLITE_PATH`).
    pub sqlite_path: PathBuf,
    /// MongoDB connection URI (`KEYFORT_MONGODB_URI`).
    pub mongodb_uri: String,
    /// HMAC secret for bearer tokens (`KEYFORT_TOKEN_SECRET`, required).
    pub token_secret: String,
    /// Signing algorithm (`KEYFORT_TOKEN_ALGORITHM`).
    pub token_algorithm: TokenAlgorithm,
    /// Token lifetime in hours (`KEYFORT_TOKEN_TTL_HOURS`).
    pub token_ttl_hours: u64,
    /// Per-account entry cap (`KEYFORT_MAX_ENTRIES`).
    pub max_entries: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend: BackendKind::Sqlite,
            sqlite_path: PathBuf::from("keyfort.db"),
            mongodb_uri: "mongodb://localhost:27017/keyfort".into(),
            token_secret: String::new(),
            token_algorithm: TokenAlgorithm::Hs256,
            token_ttl_hours: 24,
            max_entries: 1000,
        }
    }
}

// The secret never reaches debug or log output.
impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("backend", &self.backend)
            .field("sqlite_path", &self.sqlite_path)
            .field("mongodb_uri", &self.mongodb_uri)
            .field("token_secret", &"<redacted>")
            .field("token_algorithm", &self.token_algorithm)
            .field("token_ttl_hours", &self.token_ttl_hours)
            .field("max_entries", &self.max_entries)
            .finish()
    }
}

impl Settings {
    /// Load settings from the environment, falling back to defaults for
    /// everything except the token secret.
    pub fn from_env() -> Result<Self, ServiceError> {
        let defaults = Self::default();

        let backend = match non_empty_var("KEYFORT_BACKEND") {
            Some(raw) => raw
                .parse::<BackendKind>()
                .map_err(|e| ServiceError::Configuration(e.to_string()))?,
            None => defaults.backend,
        };

        let sqlite_path = non_empty_var("KEYFORT_SQLITE_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.sqlite_path);

        let mongodb_uri = non_empty_var("KEYFORT_MONGODB_URI").unwrap_or(defaults.mongodb_uri);

        let token_secret = non_empty_var("KEYFORT_TOKEN_SECRET").ok_or_else(|| {
            ServiceError::Configuration("KEYFORT_TOKEN_SECRET must be set".into())
        })?;

        let token_algorithm = match non_empty_var("KEYFORT_TOKEN_ALGORITHM") {
            Some(raw) => raw
                .parse::<TokenAlgorithm>()
                .map_err(|e| ServiceError::Configuration(e.to_string()))?,
            None => defaults.token_algorithm,
        };

        let token_ttl_hours = match non_empty_var("KEYFORT_TOKEN_TTL_HOURS") {
            Some(raw) => raw.parse::<u64>().map_err(|_| {
                ServiceError::Configuration(format!(
                    "KEYFORT_TOKEN_TTL_HOURS must be a whole number of hours, got {raw:?}"
                ))
            })?,
            None => defaults.token_ttl_hours,
        };

        let max_entries = match non_empty_var("KEYFORT_MAX_ENTRIES") {
            Some(raw) => raw.parse::<u32>().map_err(|_| {
                ServiceError::Configuration(format!(
                    "KEYFORT_MAX_ENTRIES must be a whole number, got {raw:?}"
                ))
            })?,
            None => defaults.max_entries,
        };

        let settings = Self {
            backend,
            sqlite_path,
            mongodb_uri,
            token_secret,
            token_algorithm,
            token_ttl_hours,
            max_entries,
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings no deployment should run with.
    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.token_secret.is_empty() {
            return Err(ServiceError::Configuration(
                "token secret must not be empty".into(),
            ));
        }
        if self.token_ttl_hours == 0 {
            return Err(ServiceError::Configuration(
                "token lifetime must be at least one hour".into(),
            ));
        }
        if self.token_ttl_hours > MAX_TOKEN_TTL_HOURS {
            return Err(ServiceError::Configuration(format!(
                "token lifetime must be at most {MAX_TOKEN_TTL_HOURS} hours"
            )));
        }
        if self.max_entries == 0 {
            return Err(ServiceError::Configuration(
                "per-account entry cap must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            backend: self.backend,
            sqlite_path: self.sqlite_path.clone(),
            mongodb_uri: self.mongodb_uri.clone(),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_local_sqlite() {
        let settings = Settings::default();
        assert_eq!(settings.backend, BackendKind::Sqlite);
        assert_eq!(settings.sqlite_path, PathBuf::from("keyfort.db"));
        assert_eq!(settings.token_ttl_hours, 24);
        assert_eq!(settings.max_entries, 1000);
    }

    #[test]
    fn validate_rejects_unusable_settings() {
        let good = Settings {
            token_secret: "secret".into(),
            ..Settings::default()
        };
        assert!(good.validate().is_ok());

        let no_secret = Settings::default();
        assert!(matches!(
            no_secret.validate(),
            Err(ServiceError::Configuration(_))
        ));

        let zero_ttl = Settings {
            token_secret: "secret".into(),
            token_ttl_hours: 0,
            ..Settings::default()
        };
        assert!(matches!(
            zero_ttl.validate(),
            Err(ServiceError::Configuration(_))
        ));

        let zero_cap = Settings {
            token_secret: "secret".into(),
            max_entries: 0,
            ..Settings::default()
        };
        assert!(matches!(
            zero_cap.validate(),
            Err(ServiceError::Configuration(_))
        ));

        // The lifetime is bounded above as well; one year is the ceiling.
        let absurd_ttl = Settings {
            token_secret: "secret".into(),
            token_ttl_hours: u64::MAX,
            ..Settings::default()
        };
        assert!(matches!(
            absurd_ttl.validate(),
            Err(ServiceError::Configuration(_))
        ));

        let one_year = Settings {
            token_secret: "secret".into(),
            token_ttl_hours: MAX_TOKEN_TTL_HOURS,
            ..Settings::default()
        };
        assert!(one_year.validate().is_ok());
    }

    #[test]
    fn debug_output_redacts_the_token_secret() {
        let settings = Settings {
            token_secret: "hmac-key-7f3a".into(),
            ..Settings::default()
        };
        let printed = format!("{settings:?}");
        assert!(!printed.contains("hmac-key-7f3a"));
        assert!(printed.contains("<redacted>"));
        assert!(printed.contains("keyfort.db"));
    }

    // Single test for everything env-driven: the variables are process-global,
    // so spreading them over parallel tests would race.
    #[test]
    fn from_env_reads_overrides_and_requires_the_secret() {
        let vars = [
            "KEYFORT_BACKEND",
            "KEYFORT_SQLITE_PATH",
            "KEYFORT_MONGODB_URI",
            "KEYFORT_TOKEN_SECRET",
            "KEYFORT_TOKEN_ALGORITHM",
            "KEYFORT_TOKEN_TTL_HOURS",
            "KEYFORT_MAX_ENTRIES",
        ];
        for name in vars {
            std::env::remove_var(name);
        }

        // Missing secret is fatal even though everything else has a default.
        assert!(matches!(
            Settings::from_env(),
            Err(ServiceError::Configuration(_))
        ));

        std::env::set_var("KEYFORT_TOKEN_SECRET", "env-secret");
        let defaulted = Settings::from_env().expect("secret alone suffices");
        assert_eq!(defaulted.backend, BackendKind::Sqlite);
        assert_eq!(defaulted.token_secret, "env-secret");

        std::env::set_var("KEYFORT_BACKEND", "mongodb");
        std::env::set_var("KEYFORT_TOKEN_ALGORITHM", "HS512");
        std::env::set_var("KEYFORT_TOKEN_TTL_HOURS", "6");
        std::env::set_var("KEYFORT_MAX_ENTRIES", "25");
        let tuned = Settings::from_env().expect("overrides parse");
        assert_eq!(tuned.backend, BackendKind::MongoDb);
        assert_eq!(tuned.token_algorithm, TokenAlgorithm::Hs512);
        assert_eq!(tuned.token_ttl_hours, 6);
        assert_eq!(tuned.max_entries, 25);

        std::env::set_var("KEYFORT_BACKEND", "couchdb");
        assert!(matches!(
            Settings::from_env(),
            Err(ServiceError::Configuration(_))
        ));

        std::env::set_var("KEYFORT_BACKEND", "sqlite");
        std::env::set_var("KEYFORT_TOKEN_TTL_HOURS", "soon");
        assert!(matches!(
            Settings::from_env(),
            Err(ServiceError::Configuration(_))
        ));

        for name in vars {
            std::env::remove_var(name);
        }
    }
}
