//! The storage capability interface implemented by every engine.

use async_trait::async_trait;

use crate::entities::{EntryUpdate, NewEntry, NewOwner, VaultEntry, VaultOwner};
use crate::error::StoreError;

/// Uniform persistence surface over vault owners and entries.
///
/// Implementations must be behaviorally interchangeable: same ordering, same
/// timestamp format, same uniqueness signal, same scoping rules. Every entry
/// operation takes the owner id and rejects cross-tenant access by scoping
/// the underlying query, never by trusting a prior lookup.
///
/// Ids are opaque strings minted by the repository at creation time,
/// independent of any engine-native key.
#[async_trait]
pub trait Repository: Send + Sync {
    // ── Owners ───────────────────────────────────────────────────────────────

    /// Persist a new owner. Username/email collisions surface as
    /// [`StoreError::UniquenessViolation`], enforced by the engine's native
    /// unique constraint so concurrent racers leave exactly one record.
    async fn create_owner(&self, owner: NewOwner) -> Result<VaultOwner, StoreError>;

    async fn owner_by_username(&self, username: &str) -> Result<Option<VaultOwner>, StoreError>;

    async fn owner_by_email(&self, email: &str) -> Result<Option<VaultOwner>, StoreError>;

    async fn owner_by_id(&self, id: &str) -> Result<Option<VaultOwner>, StoreError>;

    // ── Entries ──────────────────────────────────────────────────────────────

    async fn create_entry(&self, entry: NewEntry) -> Result<VaultEntry, StoreError>;

    /// All entries for one owner, ordered by creation time (id as tiebreak).
    async fn entries_for_owner(&self, owner_id: &str) -> Result<Vec<VaultEntry>, StoreError>;

    /// Single-entry read. Side effect: stamps `last_used` best-effort; a
    /// failed stamp write logs a warning and never fails the read.
    async fn entry_by_id(&self, id: &str, owner_id: &str)
        -> Result<Option<VaultEntry>, StoreError>;

    /// Apply the present fields of `update`. Returns false (not an error)
    /// when the id/owner pair does not resolve.
    async fn update_entry(
        &self,
        id: &str,
        owner_id: &str,
        update: EntryUpdate,
    ) -> Result<bool, StoreError>;

    /// Returns false when the id/owner pair does not resolve.
    async fn delete_entry(&self, id: &str, owner_id: &str) -> Result<bool, StoreError>;

    /// Case-insensitive substring match on the stored `website_url` only;
    /// encrypted payloads are never inspected.
    async fn search_entries(
        &self,
        owner_id: &str,
        fragment: &str,
    ) -> Result<Vec<VaultEntry>, StoreError>;

    async fn entry_count(&self, owner_id: &str) -> Result<u64, StoreError>;
}
