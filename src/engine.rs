//! The engine facade exposed to presentation layers.
//!
//! `Engine` wires the session manager, vault store, share service,
//! and audit log together behind one synchronous call surface.  All
//! vault mutations are serialized through `&mut self`, so no
//! operation can interleave with another on the same handle; callers
//! are expected to hold one engine per vault (advisory file locking
//! against concurrent *processes* is the caller's job).
//!
//! Every authentication attempt, credential mutation, sensitive read,
//! and share issuance/redemption appends exactly one audit entry.

use std::path::{Path, PathBuf};

use chrono::Duration;

use crate::audit::{AuditEntry, AuditLog, EventKind};
use crate::auth::AuthSessionManager;
use crate::config::Settings;
use crate::errors::{CredVaultError, Result};
use crate::share::{IssuedShare, ShareSnapshot, ShareTokenService};
use crate::vault::{CredentialFields, CredentialPatch, CredentialRecord, VaultStore};

/// Summary statistics for an unlocked vault.
#[derive(Debug, Clone)]
pub struct VaultStats {
    pub total_credentials: usize,
    pub vault_size_bytes: u64,
    pub active_sessions: usize,
    pub audit_entries: usize,
}

/// One engine instance owns one vault file.
pub struct Engine {
    vault_path: PathBuf,
    kdf_iterations: u32,
    auth: AuthSessionManager,
    share: ShareTokenService,
    audit: AuditLog,
}

impl Engine {
    pub fn new(vault_path: &Path, settings: &Settings) -> Self {
        Self {
            vault_path: vault_path.to_path_buf(),
            kdf_iterations: settings.kdf_iterations,
            auth: AuthSessionManager::new(vault_path.to_path_buf(), settings),
            share: ShareTokenService::new(settings.default_share_ttl(), settings.kdf_iterations),
            audit: AuditLog::new(),
        }
    }

    /// Whether a vault file exists at this engine's path.
    pub fn vault_exists(&self) -> bool {
        self.vault_path.exists()
    }

    // ------------------------------------------------------------------
    // Vault lifecycle & authentication
    // ------------------------------------------------------------------

    /// Create a new vault file.  Does not open a session; callers
    /// authenticate separately.
    pub fn create_vault(&mut self, passphrase: &[u8]) -> Result<()> {
        // The returned handle is dropped immediately, zeroing the key.
        VaultStore::create(&self.vault_path, passphrase, self.kdf_iterations)?;
        self.audit.append(EventKind::VaultCreated, None);
        Ok(())
    }

    /// Unlock the vault, returning a session id on success.
    pub fn authenticate(&mut self, passphrase: &[u8]) -> Result<String> {
        match self.auth.authenticate(passphrase) {
            Ok(session) => {
                self.audit.append(EventKind::AuthSuccess, Some(&session));
                Ok(session)
            }
            Err(e @ CredVaultError::LockedOut { .. }) => {
                self.audit.append(EventKind::Lockout, None);
                Err(e)
            }
            Err(e @ CredVaultError::AuthenticationFailed) => {
                self.audit.append(EventKind::AuthFailure, None);
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// End a session, zeroing key material once no session remains.
    pub fn logout(&mut self, session: &str) {
        self.auth.logout(session);
        self.audit.append(EventKind::Logout, Some(session));
    }

    // ------------------------------------------------------------------
    // Credential operations
    // ------------------------------------------------------------------

    pub fn list_credentials(&mut self, session: &str) -> Result<Vec<CredentialRecord>> {
        self.auth.validate(session)?;
        let list = self.auth.store()?.list();
        self.audit.append(EventKind::CredentialsListed, None);
        Ok(list)
    }

    pub fn get_credential(&mut self, session: &str, id: &str) -> Result<CredentialRecord> {
        self.auth.validate(session)?;
        let record = self.auth.store()?.get(id)?.clone();
        self.audit.append(EventKind::CredentialViewed, Some(id));
        Ok(record)
    }

    pub fn add_credential(&mut self, session: &str, fields: CredentialFields) -> Result<String> {
        self.auth.validate(session)?;
        let id = self.auth.store_mut()?.add(fields)?;
        self.audit.append(EventKind::CredentialAdded, Some(&id));
        Ok(id)
    }

    pub fn update_credential(
        &mut self,
        session: &str,
        id: &str,
        patch: CredentialPatch,
    ) -> Result<()> {
        self.auth.validate(session)?;
        self.auth.store_mut()?.update(id, patch)?;
        self.audit.append(EventKind::CredentialUpdated, Some(id));
        Ok(())
    }

    pub fn delete_credential(&mut self, session: &str, id: &str) -> Result<()> {
        self.auth.validate(session)?;
        self.auth.store_mut()?.delete(id)?;
        self.audit.append(EventKind::CredentialDeleted, Some(id));
        Ok(())
    }

    pub fn search(
        &mut self,
        session: &str,
        query: Option<&str>,
        tags: Option<&[String]>,
    ) -> Result<Vec<CredentialRecord>> {
        self.auth.validate(session)?;
        let hits = self.auth.store()?.search(query, tags);
        self.audit.append(EventKind::CredentialsSearched, None);
        Ok(hits)
    }

    pub fn change_passphrase(&mut self, session: &str, old: &[u8], new: &[u8]) -> Result<()> {
        self.auth.validate(session)?;
        self.auth.store_mut()?.change_passphrase(old, new)?;
        self.audit.append(EventKind::PassphraseChanged, None);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Export / import
    // ------------------------------------------------------------------

    pub fn export_vault(&mut self, session: &str, export_passphrase: &[u8]) -> Result<Vec<u8>> {
        self.auth.validate(session)?;
        let blob = self.auth.store()?.export(export_passphrase)?;
        self.audit.append(EventKind::VaultExported, None);
        Ok(blob)
    }

    /// Merge an export bundle into the unlocked vault, all-or-nothing.
    /// Returns the number of records imported.
    pub fn import_vault(
        &mut self,
        session: &str,
        blob: &[u8],
        export_passphrase: &[u8],
    ) -> Result<usize> {
        self.auth.validate(session)?;
        let count = self.auth.store_mut()?.import(blob, export_passphrase)?;
        self.audit.append(EventKind::VaultImported, None);
        Ok(count)
    }

    // ------------------------------------------------------------------
    // Sharing
    // ------------------------------------------------------------------

    /// Mint a share token for one credential.  `ttl_secs` falls back
    /// to the configured default.
    pub fn issue_share(
        &mut self,
        session: &str,
        credential_id: &str,
        ttl_secs: Option<u64>,
        share_passphrase: Option<&str>,
    ) -> Result<IssuedShare> {
        self.auth.validate(session)?;
        let record = self.auth.store()?.get(credential_id)?.clone();

        let ttl = ttl_secs.map(|s| Duration::seconds(s as i64));
        let issued = self.share.issue(&record, ttl, share_passphrase)?;
        self.audit.append(EventKind::ShareIssued, Some(credential_id));
        Ok(issued)
    }

    /// Redeem a share token.  No session required: redemption
    /// resolves against the snapshot frozen at issuance.
    pub fn redeem_share(
        &mut self,
        token_id: &str,
        share_passphrase: Option<&str>,
    ) -> Result<ShareSnapshot> {
        match self.share.redeem(token_id, share_passphrase) {
            Ok(snapshot) => {
                self.audit.append(EventKind::ShareRedeemed, Some(token_id));
                Ok(snapshot)
            }
            Err(e) => {
                self.audit
                    .append(EventKind::ShareRedeemDenied, Some(token_id));
                Err(e)
            }
        }
    }

    // ------------------------------------------------------------------
    // Audit & diagnostics
    // ------------------------------------------------------------------

    /// The most recent `limit` audit entries, oldest first.
    pub fn read_audit_log(&mut self, session: &str, limit: usize) -> Result<Vec<AuditEntry>> {
        self.auth.validate(session)?;
        Ok(self.audit.recent(limit).to_vec())
    }

    /// Recompute the audit hash chain from the first entry.
    pub fn verify_audit_chain(&mut self, session: &str) -> Result<()> {
        self.auth.validate(session)?;
        self.audit.verify_chain()
    }

    /// Structural check of the vault file, for recovery tooling.
    /// Reports corruption in detail — unlike `authenticate`, which
    /// deliberately does not.
    pub fn verify_vault_file(&self) -> Result<()> {
        VaultStore::verify_file(&self.vault_path)
    }

    pub fn vault_stats(&mut self, session: &str) -> Result<VaultStats> {
        self.auth.validate(session)?;
        let total_credentials = self.auth.store()?.record_count();
        let vault_size_bytes = std::fs::metadata(&self.vault_path)
            .map(|m| m.len())
            .unwrap_or(0);

        Ok(VaultStats {
            total_credentials,
            vault_size_bytes,
            active_sessions: self.auth.active_sessions(),
            audit_entries: self.audit.len(),
        })
    }
}
