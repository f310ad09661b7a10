//! Audit log — append-only, hash-chained record of security events.
//!
//! Each entry's hash covers the previous entry's hash plus its own
//! fields, so truncating, reordering, or editing any entry breaks the
//! chain.  `verify_chain` recomputes the whole chain from the first
//! entry; it is meant for recovery/diagnostic tooling, not the hot
//! path.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::errors::{CredVaultError, Result};

/// The kinds of security-relevant events the engine records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    VaultCreated,
    AuthSuccess,
    AuthFailure,
    Lockout,
    Logout,
    CredentialAdded,
    CredentialUpdated,
    CredentialDeleted,
    CredentialViewed,
    CredentialsListed,
    CredentialsSearched,
    PassphraseChanged,
    VaultExported,
    VaultImported,
    ShareIssued,
    ShareRedeemed,
    ShareRedeemDenied,
}

impl EventKind {
    /// Stable string form used both for display and for hashing.
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::VaultCreated => "vault_created",
            EventKind::AuthSuccess => "auth_success",
            EventKind::AuthFailure => "auth_failure",
            EventKind::Lockout => "lockout",
            EventKind::Logout => "logout",
            EventKind::CredentialAdded => "credential_added",
            EventKind::CredentialUpdated => "credential_updated",
            EventKind::CredentialDeleted => "credential_deleted",
            EventKind::CredentialViewed => "credential_viewed",
            EventKind::CredentialsListed => "credentials_listed",
            EventKind::CredentialsSearched => "credentials_searched",
            EventKind::PassphraseChanged => "passphrase_changed",
            EventKind::VaultExported => "vault_exported",
            EventKind::VaultImported => "vault_imported",
            EventKind::ShareIssued => "share_issued",
            EventKind::ShareRedeemed => "share_redeemed",
            EventKind::ShareRedeemDenied => "share_redeem_denied",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single entry in the audit chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Position in the chain, starting at 0.
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub event: EventKind,
    /// The affected credential, session, or token id, if any.
    pub subject: Option<String>,
    /// Base64 SHA-256 of the previous entry (genesis value for the
    /// first entry).
    pub prior_hash: String,
    /// Base64 SHA-256 over `prior_hash` and this entry's fields.
    pub hash: String,
}

/// Append-only hash-chained audit log.
#[derive(Default)]
pub struct AuditLog {
    entries: Vec<AuditEntry>,
}

/// Prior-hash value for the first entry in a chain.
fn genesis_hash() -> String {
    BASE64.encode(Sha256::digest(b"credvault-audit-genesis"))
}

/// Canonical hash over one entry's fields and its predecessor's hash.
fn entry_hash(
    prior_hash: &str,
    sequence: u64,
    timestamp: DateTime<Utc>,
    event: EventKind,
    subject: Option<&str>,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prior_hash.as_bytes());
    hasher.update(b"|");
    hasher.update(sequence.to_le_bytes());
    hasher.update(b"|");
    hasher.update(timestamp.to_rfc3339().as_bytes());
    hasher.update(b"|");
    hasher.update(event.as_str().as_bytes());
    hasher.update(b"|");
    hasher.update(subject.unwrap_or("").as_bytes());
    BASE64.encode(hasher.finalize())
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event, extending the hash chain.
    pub fn append(&mut self, event: EventKind, subject: Option<&str>) {
        let sequence = self.entries.len() as u64;
        let timestamp = Utc::now();
        let prior_hash = self
            .entries
            .last()
            .map_or_else(genesis_hash, |e| e.hash.clone());

        let hash = entry_hash(&prior_hash, sequence, timestamp, event, subject);

        self.entries.push(AuditEntry {
            sequence,
            timestamp,
            event,
            subject: subject.map(str::to_string),
            prior_hash,
            hash,
        });
    }

    /// Recompute the hash chain from the first entry.
    ///
    /// Returns `TamperDetected` with the sequence number of the first
    /// entry whose hash or linkage does not verify.
    pub fn verify_chain(&self) -> Result<()> {
        let mut expected_prior = genesis_hash();

        for entry in &self.entries {
            if entry.prior_hash != expected_prior {
                return Err(CredVaultError::TamperDetected(entry.sequence));
            }

            let recomputed = entry_hash(
                &entry.prior_hash,
                entry.sequence,
                entry.timestamp,
                entry.event,
                entry.subject.as_deref(),
            );
            if recomputed != entry.hash {
                return Err(CredVaultError::TamperDetected(entry.sequence));
            }

            expected_prior = entry.hash.clone();
        }

        Ok(())
    }

    /// The most recent `limit` entries, oldest first.
    pub fn recent(&self, limit: usize) -> &[AuditEntry] {
        let start = self.entries.len().saturating_sub(limit);
        &self.entries[start..]
    }

    /// Total number of entries recorded.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
