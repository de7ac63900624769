//! Backend selection. Callers name an engine; the factory hands back a
//! ready-to-use [`Repository`] with connectivity verified and the schema or
//! indexes in place.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::StoreError;
use crate::mongo::MongoRepository;
use crate::repository::Repository;
use crate::sqlite::SqliteRepository;

/// The storage engines this crate can open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Sqlite,
    MongoDb,
}

impl FromStr for BackendKind {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("sqlite") {
            Ok(Self::Sqlite)
        } else if s.eq_ignore_ascii_case("mongodb") {
            Ok(Self::MongoDb)
        } else {
            Err(StoreError::Configuration(format!(
                "unknown storage backend {s:?}, expected \"sqlite\" or \"mongodb\""
            )))
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqlite => write!(f, "sqlite"),
            Self::MongoDb => write!(f, "mongodb"),
        }
    }
}

/// Everything the factory needs to open either engine.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: BackendKind,
    pub sqlite_path: PathBuf,
    pub mongodb_uri: String,
}

/// Open the configured backend and run its one-time initialization. Both
/// engines initialize idempotently, so restarting against existing data is
/// safe.
pub async fn open_repository(config: &StoreConfig) -> Result<Arc<dyn Repository>, StoreError> {
    match config.backend {
        BackendKind::Sqlite => {
            info!("opening sqlite store at {}", config.sqlite_path.display());
            let repo = SqliteRepository::open(&config.sqlite_path).await?;
            Ok(Arc::new(repo))
        }
        BackendKind::MongoDb => {
            info!("connecting to mongodb store");
            let repo = MongoRepository::connect(&config.mongodb_uri).await?;
            Ok(Arc::new(repo))
        }
    }
}
