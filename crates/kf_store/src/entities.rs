//! Domain entities and the timestamp exchange format shared by every engine.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

// ── Timestamp exchange format ────────────────────────────────────────────────
// Both engines persist timestamps as RFC 3339 UTC strings with microsecond
// precision and a `Z` suffix (e.g. `2026-08-23T10:15:30.123456Z`). The fixed
// fractional width keeps lexicographic order equal to chronological order.

/// Serialize a timestamp into the exchange format.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp back out of the exchange format.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StoreError::Decode(format!("bad timestamp {raw:?}: {e}")))
}

/// Current UTC time truncated to the exchange precision, so the snapshot a
/// repository returns equals what a later read will parse back.
pub fn now_utc() -> DateTime<Utc> {
    let now = Utc::now();
    now.with_nanosecond(now.nanosecond() / 1_000 * 1_000).unwrap_or(now)
}

// ── Owners ───────────────────────────────────────────────────────────────────

/// A vault owner as the repository sees it, credential material included.
/// Deliberately not serializable; the exposable subset is [`OwnerProfile`].
#[derive(Clone)]
pub struct VaultOwner {
    pub id: String,
    pub username: String,
    pub email: String,
    /// PHC string produced by `kf_crypto::password`.
    pub master_password_hash: String,
    /// Hex-encoded per-owner salt, generated once at registration.
    pub salt: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VaultOwner {
    /// The safe-to-expose snapshot: no hash, no salt.
    pub fn profile(&self) -> OwnerProfile {
        OwnerProfile {
            id: self.id.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl fmt::Debug for VaultOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultOwner")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("master_password_hash", &"<redacted>")
            .field("salt", &"<redacted>")
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Owner snapshot handed to callers outside the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerProfile {
    pub id: String,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for owner creation. The repository mints id and timestamps.
#[derive(Debug, Clone)]
pub struct NewOwner {
    pub username: String,
    pub email: String,
    pub master_password_hash: String,
    pub salt: String,
}

// ── Entries ──────────────────────────────────────────────────────────────────

/// One stored credential record. The `username`, `encrypted_password`, `iv`
/// and `notes` fields are opaque, client-encrypted payloads; the core never
/// inspects them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultEntry {
    pub id: String,
    pub owner_id: String,
    pub website_url: String,
    pub website_name: String,
    pub username: String,
    pub encrypted_password: String,
    pub iv: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Stamped as a side effect of single-entry reads; null until first read.
    pub last_used: Option<DateTime<Utc>>,
}

/// Input for entry creation. The repository mints id and timestamps;
/// `last_used` starts null.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub owner_id: String,
    pub website_url: String,
    pub website_name: String,
    pub username: String,
    pub encrypted_password: String,
    pub iv: String,
    pub notes: Option<String>,
}

/// Partial update: each field is independently present-or-absent, and only
/// present fields are applied. Absent fields stay untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntryUpdate {
    #[serde(default)]
    pub website_url: Option<String>,
    #[serde(default)]
    pub website_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub encrypted_password: Option<String>,
    #[serde(default)]
    pub iv: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl EntryUpdate {
    /// True when no field is present (nothing to apply).
    pub fn is_empty(&self) -> bool {
        self.website_url.is_none()
            && self.website_name.is_none()
            && self.username.is_none()
            && self.encrypted_password.is_none()
            && self.iv.is_none()
            && self.notes.is_none()
    }
}
