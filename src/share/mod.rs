//! Share tokens — single-use, time-limited grants to one credential.
//!
//! A token is minted against an *unlocked* vault, but redemption
//! works without the vault: the shareable fields are snapshotted at
//! issuance, sealed under a random in-memory service key, and the
//! sealed snapshot travels with the token record.  Deleting or
//! editing the underlying credential after issuance therefore does
//! not invalidate a live token — a deliberate, documented scope
//! boundary.

use std::collections::HashMap;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, Zeroizing};

use crate::crypto::cipher::{open, seal};
use crate::crypto::kdf::{derive_key, generate_salt, SALT_LEN};
use crate::errors::{CredVaultError, Result};
use crate::vault::CredentialRecord;

/// The shareable fields of a credential, frozen at issuance time.
/// Never includes record ids, tags, or any key material.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareSnapshot {
    pub service_name: String,
    pub username: String,
    pub secret: String,
    pub url: Option<String>,
    pub notes: Option<String>,
}

impl From<&CredentialRecord> for ShareSnapshot {
    fn from(record: &CredentialRecord) -> Self {
        Self {
            service_name: record.service_name.clone(),
            username: record.username.clone(),
            secret: record.secret.clone(),
            url: record.url.clone(),
            notes: record.notes.clone(),
        }
    }
}

/// Salted PBKDF2 hash of an optional share passphrase.
struct PassphraseHash {
    salt: [u8; SALT_LEN],
    hash: [u8; 32],
}

impl PassphraseHash {
    fn new(passphrase: &str, kdf_iterations: u32) -> Result<Self> {
        let salt = generate_salt();
        let hash = derive_key(passphrase.as_bytes(), &salt, kdf_iterations)?;
        Ok(Self { salt, hash })
    }

    fn verify(&self, passphrase: &str, kdf_iterations: u32) -> Result<bool> {
        let candidate = derive_key(passphrase.as_bytes(), &self.salt, kdf_iterations)?;
        Ok(bool::from(candidate.ct_eq(&self.hash)))
    }
}

/// One outstanding share grant.
struct ShareToken {
    credential_id: String,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    passphrase_hash: Option<PassphraseHash>,
    redeemed: bool,
    sealed_snapshot: Vec<u8>,
}

/// Returned by `issue` so callers can show the expiry to the user.
#[derive(Debug, Clone)]
pub struct IssuedShare {
    pub token_id: String,
    pub expires_at: DateTime<Utc>,
}

/// In-memory registry of share tokens for one vault.
pub struct ShareTokenService {
    /// Random per-process key sealing the snapshots, zeroed on drop.
    sealing_key: Zeroizing<[u8; 32]>,
    tokens: HashMap<String, ShareToken>,
    default_ttl: Duration,
    kdf_iterations: u32,
}

impl ShareTokenService {
    pub fn new(default_ttl: Duration, kdf_iterations: u32) -> Self {
        let mut key = Zeroizing::new([0u8; 32]);
        rand::rng().fill_bytes(&mut *key);
        Self {
            sealing_key: key,
            tokens: HashMap::new(),
            default_ttl,
            kdf_iterations,
        }
    }

    /// Mint a token for `record`, valid for `ttl` (or the configured
    /// default).  If a share passphrase is supplied only its salted
    /// hash is kept.
    pub fn issue(
        &mut self,
        record: &CredentialRecord,
        ttl: Option<Duration>,
        share_passphrase: Option<&str>,
    ) -> Result<IssuedShare> {
        self.purge_expired();

        let now = Utc::now();
        let expires_at = now + ttl.unwrap_or(self.default_ttl);

        let snapshot = ShareSnapshot::from(record);
        let mut payload = serde_json::to_vec(&snapshot)
            .map_err(|e| CredVaultError::SerializationError(format!("snapshot: {e}")))?;
        let sealed_snapshot = seal(self.sealing_key.as_slice(), &payload);
        payload.zeroize();

        let passphrase_hash = share_passphrase
            .map(|p| PassphraseHash::new(p, self.kdf_iterations))
            .transpose()?;

        let token_id = generate_token_id();
        self.tokens.insert(
            token_id.clone(),
            ShareToken {
                credential_id: record.id.clone(),
                issued_at: now,
                expires_at,
                passphrase_hash,
                redeemed: false,
                sealed_snapshot: sealed_snapshot?,
            },
        );

        Ok(IssuedShare {
            token_id,
            expires_at,
        })
    }

    /// Redeem a token, returning the frozen snapshot.
    ///
    /// Single use: the first successful redemption marks the token
    /// spent, and every later attempt — like any attempt past expiry —
    /// fails with `TokenExpired`.  A wrong or missing share passphrase
    /// fails with `AuthenticationFailed` and does *not* consume the
    /// token.
    pub fn redeem(
        &mut self,
        token_id: &str,
        share_passphrase: Option<&str>,
    ) -> Result<ShareSnapshot> {
        let now = Utc::now();

        let token = self
            .tokens
            .get_mut(token_id)
            .ok_or_else(|| CredVaultError::TokenNotFound(token_id.to_string()))?;

        if token.redeemed || now > token.expires_at {
            return Err(CredVaultError::TokenExpired);
        }

        if let Some(ref expected) = token.passphrase_hash {
            let supplied = share_passphrase.ok_or(CredVaultError::AuthenticationFailed)?;
            if !expected.verify(supplied, self.kdf_iterations)? {
                return Err(CredVaultError::AuthenticationFailed);
            }
        }

        token.redeemed = true;

        let mut plaintext = open(self.sealing_key.as_slice(), &token.sealed_snapshot)?;
        let snapshot: std::result::Result<ShareSnapshot, _> = serde_json::from_slice(&plaintext);
        plaintext.zeroize();

        snapshot.map_err(|e| CredVaultError::SerializationError(format!("snapshot: {e}")))
    }

    /// The credential a token points at, if the token is still known.
    pub fn credential_id(&self, token_id: &str) -> Option<&str> {
        self.tokens.get(token_id).map(|t| t.credential_id.as_str())
    }

    /// When a token was minted, if it is still known.
    pub fn issued_at(&self, token_id: &str) -> Option<DateTime<Utc>> {
        self.tokens.get(token_id).map(|t| t.issued_at)
    }

    /// Number of outstanding (non-purged) tokens.
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    /// Drop expired and spent tokens.
    pub fn purge_expired(&mut self) {
        let now = Utc::now();
        self.tokens.retain(|_, t| !t.redeemed && now <= t.expires_at);
    }
}

/// Generate an unguessable URL-safe token id (192 bits of entropy).
fn generate_token_id() -> String {
    let mut bytes = [0u8; 24];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::CredentialFields;

    fn sample_record() -> CredentialRecord {
        CredentialRecord::new(CredentialFields {
            service_name: "github".into(),
            username: "alice".into(),
            secret: "s3cr3t".into(),
            url: None,
            notes: Some("shared".into()),
            tags: Default::default(),
        })
    }

    fn service() -> ShareTokenService {
        ShareTokenService::new(Duration::seconds(3600), 100_000)
    }

    #[test]
    fn issue_and_redeem_roundtrip() {
        let mut svc = service();
        let record = sample_record();

        let issued = svc.issue(&record, None, None).unwrap();
        let snapshot = svc.redeem(&issued.token_id, None).unwrap();

        assert_eq!(snapshot.service_name, "github");
        assert_eq!(snapshot.username, "alice");
        assert_eq!(snapshot.secret, "s3cr3t");
    }

    #[test]
    fn token_is_single_use() {
        let mut svc = service();
        let issued = svc.issue(&sample_record(), None, None).unwrap();

        svc.redeem(&issued.token_id, None).unwrap();
        let second = svc.redeem(&issued.token_id, None);
        assert!(matches!(second, Err(CredVaultError::TokenExpired)));
    }

    #[test]
    fn expired_token_rejected() {
        let mut svc = service();
        let issued = svc.issue(&sample_record(), None, None).unwrap();

        // Backdate the expiry rather than sleeping.
        svc.tokens.get_mut(&issued.token_id).unwrap().expires_at =
            Utc::now() - Duration::seconds(1);

        let result = svc.redeem(&issued.token_id, None);
        assert!(matches!(result, Err(CredVaultError::TokenExpired)));
    }

    #[test]
    fn passphrase_protected_token() {
        let mut svc = service();
        let issued = svc.issue(&sample_record(), None, Some("hunter2")).unwrap();

        // Missing passphrase.
        assert!(matches!(
            svc.redeem(&issued.token_id, None),
            Err(CredVaultError::AuthenticationFailed)
        ));
        // Wrong passphrase does not consume the token.
        assert!(matches!(
            svc.redeem(&issued.token_id, Some("wrong")),
            Err(CredVaultError::AuthenticationFailed)
        ));
        // Correct passphrase succeeds.
        let snapshot = svc.redeem(&issued.token_id, Some("hunter2")).unwrap();
        assert_eq!(snapshot.secret, "s3cr3t");
    }

    #[test]
    fn unknown_token_rejected() {
        let mut svc = service();
        assert!(matches!(
            svc.redeem("nope", None),
            Err(CredVaultError::TokenNotFound(_))
        ));
    }

    #[test]
    fn snapshot_survives_record_deletion() {
        // The snapshot is taken at issuance; the record's later fate
        // is irrelevant to redemption.
        let mut svc = service();
        let record = sample_record();
        let issued = svc.issue(&record, None, None).unwrap();
        drop(record);

        let snapshot = svc.redeem(&issued.token_id, None).unwrap();
        assert_eq!(snapshot.username, "alice");
    }

    #[test]
    fn purge_drops_spent_and_expired() {
        let mut svc = service();
        let spent = svc.issue(&sample_record(), None, None).unwrap();
        let expired = svc.issue(&sample_record(), None, None).unwrap();
        let live = svc.issue(&sample_record(), None, None).unwrap();

        svc.redeem(&spent.token_id, None).unwrap();
        svc.tokens.get_mut(&expired.token_id).unwrap().expires_at =
            Utc::now() - Duration::seconds(1);

        svc.purge_expired();
        assert_eq!(svc.token_count(), 1);
        assert!(svc.credential_id(&live.token_id).is_some());
    }

    #[test]
    fn token_ids_are_unguessable_length() {
        let id = generate_token_id();
        assert_eq!(id.len(), 32); // 24 bytes, base64url, no padding
        assert_ne!(id, generate_token_id());
    }
}
