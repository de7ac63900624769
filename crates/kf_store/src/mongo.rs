//! Backend B: document storage on MongoDB.
//!
//! Observable behavior must match the SQLite backend exactly: same snapshot
//! shapes, same timestamp strings, same ordering, same uniqueness signal.
//! Uniqueness is enforced by unique indexes on `owners.username` and
//! `owners.email`; the server's duplicate-key error (code 11000) is
//! translated into [`StoreError::UniquenessViolation`].

use std::time::Duration;

use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::{Client, Collection, IndexModel};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::entities::{
    format_timestamp, now_utc, parse_timestamp, EntryUpdate, NewEntry, NewOwner, VaultEntry,
    VaultOwner,
};
use crate::error::StoreError;
use crate::repository::Repository;

/// Database name used when the connection URI carries no path component.
const DEFAULT_DB_NAME: &str = "keyfort";

const MAX_POOL_SIZE: u32 = 50;
const MIN_POOL_SIZE: u32 = 10;
const MAX_IDLE_SECS: u64 = 30;
const SERVER_SELECTION_TIMEOUT_SECS: u64 = 10;
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// MongoDB-backed repository. Cheap to clone (collections share the client).
#[derive(Clone)]
pub struct MongoRepository {
    owners: Collection<OwnerDoc>,
    entries: Collection<EntryDoc>,
}

impl MongoRepository {
    /// Connect to the server behind `uri`, verify it answers a ping, and
    /// ensure all indexes exist. Index creation is idempotent, so connecting
    /// to an already-initialized database is safe.
    pub async fn connect(uri: &str) -> Result<Self, StoreError> {
        let mut options = ClientOptions::parse(uri).await?;
        options.max_pool_size = Some(MAX_POOL_SIZE);
        options.min_pool_size = Some(MIN_POOL_SIZE);
        options.max_idle_time = Some(Duration::from_secs(MAX_IDLE_SECS));
        options.server_selection_timeout = Some(Duration::from_secs(SERVER_SELECTION_TIMEOUT_SECS));
        options.connect_timeout = Some(Duration::from_secs(CONNECT_TIMEOUT_SECS));

        let db_name = match options.default_database.clone() {
            Some(name) => name,
            None => {
                warn!(
                    "MongoDB URI has no database path; falling back to {:?}",
                    DEFAULT_DB_NAME
                );
                DEFAULT_DB_NAME.to_string()
            }
        };

        let client = Client::with_options(options)?;
        let db = client.database(&db_name);

        // Fail at startup, not on first use, when the server is unreachable.
        db.run_command(doc! { "ping": 1 }).await?;

        let repo = Self {
            owners: db.collection("owners"),
            entries: db.collection("entries"),
        };
        repo.ensure_indexes().await?;
        Ok(repo)
    }

    async fn ensure_indexes(&self) -> Result<(), StoreError> {
        let unique = IndexOptions::builder().unique(true).build();
        self.owners
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "username": 1 })
                    .options(unique.clone())
                    .build(),
            )
            .await?;
        self.owners
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "email": 1 })
                    .options(unique)
                    .build(),
            )
            .await?;
        self.entries
            .create_index(IndexModel::builder().keys(doc! { "owner_id": 1 }).build())
            .await?;
        self.entries
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "owner_id": 1, "created_at": 1 })
                    .build(),
            )
            .await?;
        Ok(())
    }

    /// Map a duplicate-key write failure onto the interface's collision
    /// signal; everything else passes through as a MongoDB error.
    fn write_error(err: mongodb::error::Error) -> StoreError {
        let duplicate = matches!(
            *err.kind,
            ErrorKind::Write(WriteFailure::WriteError(ref write)) if write.code == 11000
        );
        if duplicate {
            StoreError::UniquenessViolation
        } else {
            StoreError::Mongo(err)
        }
    }

    fn creation_order() -> Document {
        doc! { "created_at": 1, "_id": 1 }
    }
}

/// Escape a search fragment so `$regex` matches it literally.
fn escape_regex(fragment: &str) -> String {
    let mut escaped = String::with_capacity(fragment.len());
    for c in fragment.chars() {
        if matches!(
            c,
            '.' | '^' | '$' | '*' | '+' | '?' | '(' | ')' | '[' | ']' | '{' | '}' | '|' | '\\' | '/'
        ) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

// ── Document types ───────────────────────────────────────────────────────────
// `_id` holds the repository-minted UUID string; timestamps are the shared
// RFC 3339 exchange strings, never BSON dates.

#[derive(Debug, Serialize, Deserialize)]
struct OwnerDoc {
    #[serde(rename = "_id")]
    id: String,
    username: String,
    email: String,
    master_password_hash: String,
    salt: String,
    created_at: String,
    updated_at: String,
}

impl OwnerDoc {
    fn from_owner(owner: &VaultOwner) -> Self {
        Self {
            id: owner.id.clone(),
            username: owner.username.clone(),
            email: owner.email.clone(),
            master_password_hash: owner.master_password_hash.clone(),
            salt: owner.salt.clone(),
            created_at: format_timestamp(owner.created_at),
            updated_at: format_timestamp(owner.updated_at),
        }
    }

    fn into_owner(self) -> Result<VaultOwner, StoreError> {
        Ok(VaultOwner {
            id: self.id,
            username: self.username,
            email: self.email,
            master_password_hash: self.master_password_hash,
            salt: self.salt,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct EntryDoc {
    #[serde(rename = "_id")]
    id: String,
    owner_id: String,
    website_url: String,
    website_name: String,
    username: String,
    encrypted_password: String,
    iv: String,
    notes: Option<String>,
    created_at: String,
    updated_at: String,
    last_used: Option<String>,
}

impl EntryDoc {
    fn from_entry(entry: &VaultEntry) -> Self {
        Self {
            id: entry.id.clone(),
            owner_id: entry.owner_id.clone(),
            website_url: entry.website_url.clone(),
            website_name: entry.website_name.clone(),
            username: entry.username.clone(),
            encrypted_password: entry.encrypted_password.clone(),
            iv: entry.iv.clone(),
            notes: entry.notes.clone(),
            created_at: format_timestamp(entry.created_at),
            updated_at: format_timestamp(entry.updated_at),
            last_used: entry.last_used.map(format_timestamp),
        }
    }

    fn into_entry(self) -> Result<VaultEntry, StoreError> {
        Ok(VaultEntry {
            id: self.id,
            owner_id: self.owner_id,
            website_url: self.website_url,
            website_name: self.website_name,
            username: self.username,
            encrypted_password: self.encrypted_password,
            iv: self.iv,
            notes: self.notes,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
            last_used: self.last_used.as_deref().map(parse_timestamp).transpose()?,
        })
    }
}

#[async_trait]
impl Repository for MongoRepository {
    async fn create_owner(&self, owner: NewOwner) -> Result<VaultOwner, StoreError> {
        let now = now_utc();
        let created = VaultOwner {
            id: Uuid::new_v4().to_string(),
            username: owner.username,
            email: owner.email,
            master_password_hash: owner.master_password_hash,
            salt: owner.salt,
            created_at: now,
            updated_at: now,
        };

        self.owners
            .insert_one(OwnerDoc::from_owner(&created))
            .await
            .map_err(Self::write_error)?;

        Ok(created)
    }

    async fn owner_by_username(&self, username: &str) -> Result<Option<VaultOwner>, StoreError> {
        let found = self.owners.find_one(doc! { "username": username }).await?;
        found.map(OwnerDoc::into_owner).transpose()
    }

    async fn owner_by_email(&self, email: &str) -> Result<Option<VaultOwner>, StoreError> {
        let found = self.owners.find_one(doc! { "email": email }).await?;
        found.map(OwnerDoc::into_owner).transpose()
    }

    async fn owner_by_id(&self, id: &str) -> Result<Option<VaultOwner>, StoreError> {
        let found = self.owners.find_one(doc! { "_id": id }).await?;
        found.map(OwnerDoc::into_owner).transpose()
    }

    async fn create_entry(&self, entry: NewEntry) -> Result<VaultEntry, StoreError> {
        let now = now_utc();
        let created = VaultEntry {
            id: Uuid::new_v4().to_string(),
            owner_id: entry.owner_id,
            website_url: entry.website_url,
            website_name: entry.website_name,
            username: entry.username,
            encrypted_password: entry.encrypted_password,
            iv: entry.iv,
            notes: entry.notes,
            created_at: now,
            updated_at: now,
            last_used: None,
        };

        self.entries.insert_one(EntryDoc::from_entry(&created)).await?;
        Ok(created)
    }

    async fn entries_for_owner(&self, owner_id: &str) -> Result<Vec<VaultEntry>, StoreError> {
        let docs: Vec<EntryDoc> = self
            .entries
            .find(doc! { "owner_id": owner_id })
            .sort(Self::creation_order())
            .await?
            .try_collect()
            .await?;
        docs.into_iter().map(EntryDoc::into_entry).collect()
    }

    async fn entry_by_id(
        &self,
        id: &str,
        owner_id: &str,
    ) -> Result<Option<VaultEntry>, StoreError> {
        let found = self
            .entries
            .find_one(doc! { "_id": id, "owner_id": owner_id })
            .await?;

        let Some(doc) = found else { return Ok(None) };
        let mut entry = doc.into_entry()?;

        // Best-effort usage stamp: a failed write must not fail the read.
        let stamp = now_utc();
        let stamped = self
            .entries
            .update_one(
                doc! { "_id": id, "owner_id": owner_id },
                doc! { "$set": { "last_used": format_timestamp(stamp) } },
            )
            .await;
        match stamped {
            Ok(_) => entry.last_used = Some(stamp),
            Err(e) => warn!("last_used stamp failed for entry {}: {}", id, e),
        }

        Ok(Some(entry))
    }

    async fn update_entry(
        &self,
        id: &str,
        owner_id: &str,
        update: EntryUpdate,
    ) -> Result<bool, StoreError> {
        let mut set = doc! { "updated_at": format_timestamp(now_utc()) };
        if let Some(v) = update.website_url {
            set.insert("website_url", v);
        }
        if let Some(v) = update.website_name {
            set.insert("website_name", v);
        }
        if let Some(v) = update.username {
            set.insert("username", v);
        }
        if let Some(v) = update.encrypted_password {
            set.insert("encrypted_password", v);
        }
        if let Some(v) = update.iv {
            set.insert("iv", v);
        }
        if let Some(v) = update.notes {
            set.insert("notes", v);
        }

        let result = self
            .entries
            .update_one(doc! { "_id": id, "owner_id": owner_id }, doc! { "$set": set })
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn delete_entry(&self, id: &str, owner_id: &str) -> Result<bool, StoreError> {
        let result = self
            .entries
            .delete_one(doc! { "_id": id, "owner_id": owner_id })
            .await?;
        Ok(result.deleted_count > 0)
    }

    async fn search_entries(
        &self,
        owner_id: &str,
        fragment: &str,
    ) -> Result<Vec<VaultEntry>, StoreError> {
        let filter = doc! {
            "owner_id": owner_id,
            "website_url": { "$regex": escape_regex(fragment), "$options": "i" },
        };
        let docs: Vec<EntryDoc> = self
            .entries
            .find(filter)
            .sort(Self::creation_order())
            .await?
            .try_collect()
            .await?;
        docs.into_iter().map(EntryDoc::into_entry).collect()
    }

    async fn entry_count(&self, owner_id: &str) -> Result<u64, StoreError> {
        let count = self
            .entries
            .count_documents(doc! { "owner_id": owner_id })
            .await?;
        Ok(count)
    }
}
