//! Credential record types stored inside a vault.
//!
//! Records only ever exist in plaintext inside an unlocked
//! `VaultStore`; on disk they live inside the sealed container
//! payload, never as individual ciphertexts.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// A single credential stored in the vault.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialRecord {
    /// Opaque unique identifier, assigned at creation and immutable
    /// for the record's lifetime.
    pub id: String,

    /// Name of the service this credential belongs to (e.g. "github").
    pub service_name: String,

    /// Username or email.
    pub username: String,

    /// The protected value (password, API key, ...).
    pub secret: String,

    /// Optional service URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Optional free-form notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    /// Tags for organization. Stored sorted so serialization is
    /// deterministic.
    #[serde(default)]
    pub tags: BTreeSet<String>,

    /// When this record was first created.
    pub created_at: DateTime<Utc>,

    /// When this record was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when creating a new credential.
#[derive(Debug, Clone, Default)]
pub struct CredentialFields {
    pub service_name: String,
    pub username: String,
    pub secret: String,
    pub url: Option<String>,
    pub notes: Option<String>,
    pub tags: BTreeSet<String>,
}

/// Partial update to an existing credential. `None` fields are left
/// untouched.
#[derive(Debug, Clone, Default)]
pub struct CredentialPatch {
    pub service_name: Option<String>,
    pub username: Option<String>,
    pub secret: Option<String>,
    pub url: Option<Option<String>>,
    pub notes: Option<Option<String>>,
    pub tags: Option<BTreeSet<String>>,
}

impl CredentialRecord {
    /// Build a fresh record from creation fields, assigning a random
    /// id and timestamps.
    pub fn new(fields: CredentialFields) -> Self {
        let now = Utc::now();
        Self {
            id: generate_record_id(),
            service_name: fields.service_name,
            username: fields.username,
            secret: fields.secret,
            url: fields.url,
            notes: fields.notes,
            tags: fields.tags,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a partial update, bumping `updated_at`. The id and
    /// `created_at` never change.
    pub fn apply(&mut self, patch: CredentialPatch) {
        if let Some(v) = patch.service_name {
            self.service_name = v;
        }
        if let Some(v) = patch.username {
            self.username = v;
        }
        if let Some(v) = patch.secret {
            self.secret = v;
        }
        if let Some(v) = patch.url {
            self.url = v;
        }
        if let Some(v) = patch.notes {
            self.notes = v;
        }
        if let Some(v) = patch.tags {
            self.tags = v;
        }
        self.updated_at = Utc::now();
    }

    /// Search predicate: case-insensitive substring match on
    /// service name, username, or notes, plus any-tag overlap.
    ///
    /// An empty query and no tags match everything.
    pub fn matches(&self, query: Option<&str>, tags: Option<&[String]>) -> bool {
        if let Some(q) = query {
            let q = q.to_lowercase();
            let text_hit = self.service_name.to_lowercase().contains(&q)
                || self.username.to_lowercase().contains(&q)
                || self
                    .notes
                    .as_deref()
                    .is_some_and(|n| n.to_lowercase().contains(&q));
            if !text_hit {
                return false;
            }
        }

        if let Some(wanted) = tags {
            if !wanted.is_empty() && !wanted.iter().any(|t| self.tags.contains(t)) {
                return false;
            }
        }

        true
    }
}

/// Generate a random 32-character hex record id.
pub fn generate_record_id() -> String {
    let mut bytes = [0u8; 16];
    rand::rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
