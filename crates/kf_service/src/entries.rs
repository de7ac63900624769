//! Vault-entry operations.
//!
//! Every call takes the owner id from an already-authorized token; an entry
//! id belonging to a different account behaves exactly like an id that never
//! existed. Entry credentials (username, password, IV) arrive encrypted from
//! the client and are stored verbatim.

use serde::{Deserialize, Serialize};
use tracing::info;

use kf_store::{EntryUpdate, NewEntry, VaultEntry};

use crate::error::ServiceError;
use crate::validate::{
    require_non_empty, sanitize_text, MAX_NAME_LEN, MAX_NOTES_LEN, MAX_URL_LEN,
};
use crate::VaultService;

/// Client-supplied material for a new entry. Only `website_url` and
/// `encrypted_password` must be non-empty; everything else may arrive blank.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryDraft {
    pub website_url: String,
    pub website_name: String,
    pub username: String,
    pub encrypted_password: String,
    pub iv: String,
    #[serde(default)]
    pub notes: Option<String>,
}

impl VaultService {
    /// Store a new entry, enforcing the per-account cap.
    pub async fn create_entry(
        &self,
        owner_id: &str,
        draft: EntryDraft,
    ) -> Result<VaultEntry, ServiceError> {
        let website_url = sanitize_text(&draft.website_url, MAX_URL_LEN);
        let website_name = sanitize_text(&draft.website_name, MAX_NAME_LEN);
        let notes = draft
            .notes
            .as_deref()
            .map(|n| sanitize_text(n, MAX_NOTES_LEN))
            .filter(|n| !n.is_empty());

        require_non_empty(&website_url, "website_url")?;
        require_non_empty(&draft.encrypted_password, "encrypted_password")?;

        let cap = self.settings.max_entries;
        if self.repo.entry_count(owner_id).await? >= u64::from(cap) {
            return Err(ServiceError::LimitExceeded(cap));
        }

        let entry = self
            .repo
            .create_entry(NewEntry {
                owner_id: owner_id.to_string(),
                website_url,
                website_name,
                username: draft.username,
                encrypted_password: draft.encrypted_password,
                iv: draft.iv,
                notes,
            })
            .await?;

        info!("created entry {} for account {}", entry.id, owner_id);
        Ok(entry)
    }

    /// All entries for the account, oldest first.
    pub async fn entries(&self, owner_id: &str) -> Result<Vec<VaultEntry>, ServiceError> {
        Ok(self.repo.entries_for_owner(owner_id).await?)
    }

    /// One entry by id. Reading it also stamps `last_used`.
    pub async fn entry(&self, owner_id: &str, entry_id: &str) -> Result<VaultEntry, ServiceError> {
        self.repo
            .entry_by_id(entry_id, owner_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(entry_id.to_string()))
    }

    /// Apply a partial update. Fields left `None` keep their stored values.
    pub async fn update_entry(
        &self,
        owner_id: &str,
        entry_id: &str,
        mut update: EntryUpdate,
    ) -> Result<(), ServiceError> {
        if update.is_empty() {
            return Err(ServiceError::Validation("Update carries no fields".into()));
        }

        if let Some(url) = update.website_url.take() {
            let url = sanitize_text(&url, MAX_URL_LEN);
            require_non_empty(&url, "website_url")?;
            update.website_url = Some(url);
        }
        if let Some(name) = update.website_name.take() {
            update.website_name = Some(sanitize_text(&name, MAX_NAME_LEN));
        }
        if let Some(notes) = update.notes.take() {
            // Whitespace-only notes collapse to absent, as on create.
            update.notes = Some(sanitize_text(&notes, MAX_NOTES_LEN)).filter(|n| !n.is_empty());
        }
        if let Some(ref password) = update.encrypted_password {
            require_non_empty(password, "encrypted_password")?;
        }

        let applied = self.repo.update_entry(entry_id, owner_id, update).await?;
        if !applied {
            return Err(ServiceError::NotFound(entry_id.to_string()));
        }
        Ok(())
    }

    pub async fn delete_entry(&self, owner_id: &str, entry_id: &str) -> Result<(), ServiceError> {
        let removed = self.repo.delete_entry(entry_id, owner_id).await?;
        if !removed {
            return Err(ServiceError::NotFound(entry_id.to_string()));
        }
        info!("deleted entry {} for account {}", entry_id, owner_id);
        Ok(())
    }

    /// Entries whose URL contains the fragment, matched case-insensitively.
    pub async fn search_entries(
        &self,
        owner_id: &str,
        fragment: &str,
    ) -> Result<Vec<VaultEntry>, ServiceError> {
        let fragment = fragment.trim();
        if fragment.is_empty() {
            return Err(ServiceError::Validation(
                "Search fragment must not be empty".into(),
            ));
        }
        Ok(self.repo.search_entries(owner_id, fragment).await?)
    }

    pub async fn entry_count(&self, owner_id: &str) -> Result<u64, ServiceError> {
        Ok(self.repo.entry_count(owner_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Settings;
    use tempfile::TempDir;

    async fn service_with_cap(max_entries: u32) -> (VaultService, TempDir) {
        let dir = TempDir::new().expect("tempdir");
        let settings = Settings {
            sqlite_path: dir.path().join("vault.db"),
            token_secret: "unit-test-secret".into(),
            max_entries,
            ..Settings::default()
        };
        let service = VaultService::connect(settings).await.expect("connect");
        (service, dir)
    }

    async fn service() -> (VaultService, TempDir) {
        service_with_cap(1000).await
    }

    async fn register_owner(service: &VaultService, username: &str) -> String {
        service
            .register(username, &format!("{username}@example.com"), "Passw0rd!")
            .await
            .expect("register")
            .owner
            .id
    }

    fn draft(url: &str, name: &str) -> EntryDraft {
        EntryDraft {
            website_url: url.into(),
            website_name: name.into(),
            username: "enc-user".into(),
            encrypted_password: "enc-pass".into(),
            iv: "enc-iv".into(),
            notes: None,
        }
    }

    #[tokio::test]
    async fn full_entry_lifecycle() {
        let (service, _dir) = service().await;
        let owner_id = register_owner(&service, "alice").await;

        let created = service
            .create_entry(&owner_id, draft("https://github.com/login", "GitHub"))
            .await
            .expect("create");
        assert_eq!(created.website_name, "GitHub");
        assert!(created.last_used.is_none());

        let listed = service.entries(&owner_id).await.expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, created.id);

        let read = service.entry(&owner_id, &created.id).await.expect("read");
        assert!(read.last_used.is_some());

        service
            .update_entry(
                &owner_id,
                &created.id,
                EntryUpdate {
                    website_name: Some("GitHub (work)".into()),
                    ..Default::default()
                },
            )
            .await
            .expect("update");
        let updated = service.entry(&owner_id, &created.id).await.expect("reread");
        assert_eq!(updated.website_name, "GitHub (work)");
        assert_eq!(updated.website_url, "https://github.com/login");

        service
            .delete_entry(&owner_id, &created.id)
            .await
            .expect("delete");
        assert_eq!(service.entry_count(&owner_id).await.expect("count"), 0);
        assert!(matches!(
            service.entry(&owner_id, &created.id).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn create_rejects_blank_required_fields() {
        let (service, _dir) = service().await;
        let owner_id = register_owner(&service, "alice").await;

        let blank_url = service
            .create_entry(&owner_id, draft("   ", "GitHub"))
            .await;
        assert!(matches!(blank_url, Err(ServiceError::Validation(_))));

        let mut no_password = draft("https://github.com", "GitHub");
        no_password.encrypted_password = String::new();
        let result = service.create_entry(&owner_id, no_password).await;
        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn create_needs_only_url_and_encrypted_password() {
        let (service, _dir) = service().await;
        let owner_id = register_owner(&service, "alice").await;

        let minimal = EntryDraft {
            website_url: "https://a.com".into(),
            website_name: String::new(),
            username: String::new(),
            encrypted_password: "X".into(),
            iv: "Y".into(),
            notes: None,
        };
        let created = service.create_entry(&owner_id, minimal).await.expect("create");
        assert!(!created.id.is_empty());
        assert_eq!(created.website_name, "");
        assert_eq!(created.username, "");
        assert_eq!(created.iv, "Y");
        assert!(created.notes.is_none());

        // The IV may be blank too.
        let mut bare = draft("https://b.com", "");
        bare.username = String::new();
        bare.iv = String::new();
        let second = service.create_entry(&owner_id, bare).await.expect("create");
        assert_eq!(second.iv, "");

        assert_eq!(service.entry_count(&owner_id).await.expect("count"), 2);
    }

    #[tokio::test]
    async fn update_may_blank_optional_fields() {
        let (service, _dir) = service().await;
        let owner_id = register_owner(&service, "alice").await;
        let entry = service
            .create_entry(&owner_id, draft("https://site.test", "Site"))
            .await
            .expect("create");

        service
            .update_entry(
                &owner_id,
                &entry.id,
                EntryUpdate {
                    website_name: Some("   ".into()),
                    username: Some(String::new()),
                    ..Default::default()
                },
            )
            .await
            .expect("update");
        let after = service.entry(&owner_id, &entry.id).await.expect("read");
        assert_eq!(after.website_name, "");
        assert_eq!(after.username, "");

        // The URL and the ciphertext password stay required on update.
        let blank_url = service
            .update_entry(
                &owner_id,
                &entry.id,
                EntryUpdate { website_url: Some("  ".into()), ..Default::default() },
            )
            .await;
        assert!(matches!(blank_url, Err(ServiceError::Validation(_))));

        let blank_password = service
            .update_entry(
                &owner_id,
                &entry.id,
                EntryUpdate { encrypted_password: Some(String::new()), ..Default::default() },
            )
            .await;
        assert!(matches!(blank_password, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn blank_notes_are_absent_in_create_and_update() {
        let (service, _dir) = service().await;
        let owner_id = register_owner(&service, "alice").await;

        let mut padded = draft("https://site.test", "Site");
        padded.notes = Some("   ".into());
        let created = service.create_entry(&owner_id, padded).await.expect("create");
        assert!(created.notes.is_none());

        service
            .update_entry(
                &owner_id,
                &created.id,
                EntryUpdate { notes: Some("  shared with ops  ".into()), ..Default::default() },
            )
            .await
            .expect("set notes");
        let noted = service.entry(&owner_id, &created.id).await.expect("read");
        assert_eq!(noted.notes.as_deref(), Some("shared with ops"));

        // A whitespace-only value leaves the stored notes untouched.
        service
            .update_entry(
                &owner_id,
                &created.id,
                EntryUpdate {
                    website_name: Some("Renamed".into()),
                    notes: Some("   ".into()),
                    ..Default::default()
                },
            )
            .await
            .expect("update");
        let after = service.entry(&owner_id, &created.id).await.expect("reread");
        assert_eq!(after.website_name, "Renamed");
        assert_eq!(after.notes.as_deref(), Some("shared with ops"));
    }

    #[tokio::test]
    async fn entry_cap_is_enforced() {
        let (service, _dir) = service_with_cap(3).await;
        let owner_id = register_owner(&service, "alice").await;

        for i in 0..3 {
            service
                .create_entry(&owner_id, draft(&format!("https://site{i}.test"), "Site"))
                .await
                .expect("create under cap");
        }

        let over = service
            .create_entry(&owner_id, draft("https://one-too-many.test", "Site"))
            .await;
        assert!(matches!(over, Err(ServiceError::LimitExceeded(3))));
        assert!(over.unwrap_err().to_string().contains('3'));

        // Deleting one frees a slot.
        let first = service.entries(&owner_id).await.expect("list")[0].clone();
        service
            .delete_entry(&owner_id, &first.id)
            .await
            .expect("delete");
        service
            .create_entry(&owner_id, draft("https://replacement.test", "Site"))
            .await
            .expect("create after delete");
    }

    #[tokio::test]
    async fn entries_are_scoped_to_their_owner() {
        let (service, _dir) = service().await;
        let alice = register_owner(&service, "alice").await;
        let bob = register_owner(&service, "bob").await;

        let secret = service
            .create_entry(&alice, draft("https://bank.test", "Bank"))
            .await
            .expect("create");

        assert!(matches!(
            service.entry(&bob, &secret.id).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            service
                .update_entry(
                    &bob,
                    &secret.id,
                    EntryUpdate {
                        website_name: Some("Hijacked".into()),
                        ..Default::default()
                    },
                )
                .await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            service.delete_entry(&bob, &secret.id).await,
            Err(ServiceError::NotFound(_))
        ));

        // Alice's entry is untouched by all of that.
        let still_there = service.entry(&alice, &secret.id).await.expect("read");
        assert_eq!(still_there.website_name, "Bank");
        assert_eq!(service.entries(&bob).await.expect("list").len(), 0);
    }

    #[tokio::test]
    async fn empty_update_is_a_validation_error() {
        let (service, _dir) = service().await;
        let owner_id = register_owner(&service, "alice").await;
        let entry = service
            .create_entry(&owner_id, draft("https://site.test", "Site"))
            .await
            .expect("create");

        let result = service
            .update_entry(&owner_id, &entry.id, EntryUpdate::default())
            .await;
        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn search_goes_through_url_only() {
        let (service, _dir) = service().await;
        let owner_id = register_owner(&service, "alice").await;

        service
            .create_entry(&owner_id, draft("https://github.com/x", "Work"))
            .await
            .expect("create");
        service
            .create_entry(&owner_id, draft("https://gitlab.com/y", "Personal"))
            .await
            .expect("create");
        service
            .create_entry(&owner_id, draft("https://example.com", "GitHub mirror"))
            .await
            .expect("create");

        let hits = service
            .search_entries(&owner_id, "GIT")
            .await
            .expect("search");
        let urls: Vec<&str> = hits.iter().map(|e| e.website_url.as_str()).collect();
        assert_eq!(urls, ["https://github.com/x", "https://gitlab.com/y"]);

        assert!(matches!(
            service.search_entries(&owner_id, "   ").await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn free_text_is_sanitized_but_ciphertext_is_not() {
        let (service, _dir) = service().await;
        let owner_id = register_owner(&service, "alice").await;

        let mut messy = draft("  https://site.test  ", "  My\0Site  ");
        messy.notes = Some("  note\0 text  ".into());
        messy.username = "  spaced ciphertext  ".into();

        let created = service.create_entry(&owner_id, messy).await.expect("create");
        assert_eq!(created.website_url, "https://site.test");
        assert_eq!(created.website_name, "MySite");
        assert_eq!(created.notes.as_deref(), Some("note text"));
        // Ciphertext fields are stored byte-for-byte as sent.
        assert_eq!(created.username, "  spaced ciphertext  ");
    }
}
