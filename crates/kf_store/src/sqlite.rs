//! Backend A: relational storage on SQLite via sqlx.

use std::path::Path;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool};
use tracing::warn;
use uuid::Uuid;

use crate::entities::{
    format_timestamp, now_utc, parse_timestamp, EntryUpdate, NewEntry, NewOwner, VaultEntry,
    VaultOwner,
};
use crate::error::StoreError;
use crate::repository::Repository;

/// SQLite-backed repository. Cheap to clone (the pool is an Arc internally).
#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Open (or create) the database at `db_path` and run pending migrations.
    ///
    /// WAL journal mode and foreign-key enforcement are configured at
    /// connection time here, NOT inside a migration; SQLite forbids changing
    /// `journal_mode` inside a transaction and sqlx wraps every migration in
    /// one. Running migrations against an already-migrated file is a no-op.
    pub async fn open(db_path: &Path) -> Result<Self, StoreError> {
        let opts = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true);

        let pool = SqlitePool::connect_with(opts).await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Migration(e.to_string()))?;

        Ok(Self { pool })
    }

    /// Map a unique-constraint failure onto the interface's collision signal;
    /// everything else passes through as a database error.
    fn write_error(err: sqlx::Error) -> StoreError {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::UniquenessViolation
            }
            _ => StoreError::Database(err),
        }
    }
}

// ── Row types ────────────────────────────────────────────────────────────────

#[derive(sqlx::FromRow)]
struct OwnerRow {
    id: String,
    username: String,
    email: String,
    master_password_hash: String,
    salt: String,
    created_at: String,
    updated_at: String,
}

impl OwnerRow {
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

#[derive(sqlx::FromRow)]
struct EntryRow {
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

impl EntryRow {
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

const OWNER_COLS: &str = "id, username, email, master_password_hash, salt, created_at, updated_at";
const ENTRY_COLS: &str = "id, owner_id, website_url, website_name, username, encrypted_password, \
                          iv, notes, created_at, updated_at, last_used";

#[async_trait]
impl Repository for SqliteRepository {
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

        sqlx::query(
            "INSERT INTO owners (id, username, email, master_password_hash, salt, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&created.id)
        .bind(&created.username)
        .bind(&created.email)
        .bind(&created.master_password_hash)
        .bind(&created.salt)
        .bind(format_timestamp(created.created_at))
        .bind(format_timestamp(created.updated_at))
        .execute(&self.pool)
        .await
        .map_err(Self::write_error)?;

        Ok(created)
    }

    async fn owner_by_username(&self, username: &str) -> Result<Option<VaultOwner>, StoreError> {
        let row: Option<OwnerRow> =
            sqlx::query_as(&format!("SELECT {OWNER_COLS} FROM owners WHERE username = ?"))
                .bind(username)
                .fetch_optional(&self.pool)
                .await?;
        row.map(OwnerRow::into_owner).transpose()
    }

    async fn owner_by_email(&self, email: &str) -> Result<Option<VaultOwner>, StoreError> {
        let row: Option<OwnerRow> =
            sqlx::query_as(&format!("SELECT {OWNER_COLS} FROM owners WHERE email = ?"))
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;
        row.map(OwnerRow::into_owner).transpose()
    }

    async fn owner_by_id(&self, id: &str) -> Result<Option<VaultOwner>, StoreError> {
        let row: Option<OwnerRow> =
            sqlx::query_as(&format!("SELECT {OWNER_COLS} FROM owners WHERE id = ?"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(OwnerRow::into_owner).transpose()
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

        sqlx::query(
            "INSERT INTO entries (id, owner_id, website_url, website_name, username, \
             encrypted_password, iv, notes, created_at, updated_at, last_used) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, NULL)",
        )
        .bind(&created.id)
        .bind(&created.owner_id)
        .bind(&created.website_url)
        .bind(&created.website_name)
        .bind(&created.username)
        .bind(&created.encrypted_password)
        .bind(&created.iv)
        .bind(&created.notes)
        .bind(format_timestamp(created.created_at))
        .bind(format_timestamp(created.updated_at))
        .execute(&self.pool)
        .await?;

        Ok(created)
    }

    async fn entries_for_owner(&self, owner_id: &str) -> Result<Vec<VaultEntry>, StoreError> {
        let rows: Vec<EntryRow> = sqlx::query_as(&format!(
            "SELECT {ENTRY_COLS} FROM entries WHERE owner_id = ? ORDER BY created_at, id"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(EntryRow::into_entry).collect()
    }

    async fn entry_by_id(
        &self,
        id: &str,
        owner_id: &str,
    ) -> Result<Option<VaultEntry>, StoreError> {
        let row: Option<EntryRow> = sqlx::query_as(&format!(
            "SELECT {ENTRY_COLS} FROM entries WHERE id = ? AND owner_id = ?"
        ))
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else { return Ok(None) };
        let mut entry = row.into_entry()?;

        // Best-effort usage stamp: a failed write must not fail the read.
        let stamp = now_utc();
        let stamped = sqlx::query("UPDATE entries SET last_used = ? WHERE id = ? AND owner_id = ?")
            .bind(format_timestamp(stamp))
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
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
        let result = sqlx::query(
            "UPDATE entries SET \
                website_url = COALESCE(?, website_url), \
                website_name = COALESCE(?, website_name), \
                username = COALESCE(?, username), \
                encrypted_password = COALESCE(?, encrypted_password), \
                iv = COALESCE(?, iv), \
                notes = COALESCE(?, notes), \
                updated_at = ? \
             WHERE id = ? AND owner_id = ?",
        )
        .bind(&update.website_url)
        .bind(&update.website_name)
        .bind(&update.username)
        .bind(&update.encrypted_password)
        .bind(&update.iv)
        .bind(&update.notes)
        .bind(format_timestamp(now_utc()))
        .bind(id)
        .bind(owner_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_entry(&self, id: &str, owner_id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM entries WHERE id = ? AND owner_id = ?")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn search_entries(
        &self,
        owner_id: &str,
        fragment: &str,
    ) -> Result<Vec<VaultEntry>, StoreError> {
        // instr() instead of LIKE: the fragment is matched literally, with no
        // wildcard characters to escape.
        let rows: Vec<EntryRow> = sqlx::query_as(&format!(
            "SELECT {ENTRY_COLS} FROM entries \
             WHERE owner_id = ? AND instr(lower(website_url), lower(?)) > 0 \
             ORDER BY created_at, id"
        ))
        .bind(owner_id)
        .bind(fragment)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(EntryRow::into_entry).collect()
    }

    async fn entry_count(&self, owner_id: &str) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM entries WHERE owner_id = ?")
            .bind(owner_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}
