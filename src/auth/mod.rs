//! Authentication sessions and lockout tracking.
//!
//! `AuthSessionManager` owns the unlock/lockout state machine for one
//! vault: it attempts unlocks, counts failures, enforces the lockout
//! window, and hands out session ids whose inactivity timeout is
//! evaluated lazily on every access (no background timer).
//!
//! Lockout state lives only in memory.  A process restart clears it —
//! an accepted tradeoff, not a backdoor: restarting does not let the
//! passphrase be derived any faster.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;

use crate::config::Settings;
use crate::errors::{CredVaultError, Result};
use crate::vault::VaultStore;

/// An in-memory handle representing a successful unlock.
///
/// Never persisted.  The key material itself is owned by the unlocked
/// `VaultStore` held by the manager and is zeroed when the last
/// session ends.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

/// Failed-attempt bookkeeping for one vault.
#[derive(Debug, Default)]
struct LockoutState {
    failed_attempts: u32,
    first_failure_at: Option<DateTime<Utc>>,
    locked_until: Option<DateTime<Utc>>,
}

/// Unlock/lockout state machine and session registry for one vault.
pub struct AuthSessionManager {
    vault_path: PathBuf,
    session_timeout: Duration,
    max_failed_attempts: u32,
    lockout_duration: Duration,
    failure_window: Duration,

    /// The unlocked vault, present while at least one session lives.
    store: Option<VaultStore>,
    sessions: HashMap<String, AuthSession>,
    lockout: LockoutState,
}

impl AuthSessionManager {
    pub fn new(vault_path: PathBuf, settings: &Settings) -> Self {
        Self {
            vault_path,
            session_timeout: settings.session_timeout(),
            max_failed_attempts: settings.max_failed_attempts,
            lockout_duration: settings.lockout_duration(),
            failure_window: settings.failure_window(),
            store: None,
            sessions: HashMap::new(),
            lockout: LockoutState::default(),
        }
    }

    /// Attempt to unlock the vault with `passphrase`.
    ///
    /// While locked out this refuses immediately, without spending
    /// CPU on key derivation.  On success the lockout state resets
    /// and a fresh session id is returned.  On a wrong passphrase the
    /// failure counter advances and, at the configured threshold
    /// within the failure window, a lockout begins.
    pub fn authenticate(&mut self, passphrase: &[u8]) -> Result<String> {
        let now = Utc::now();
        self.refresh_lockout(now);

        if let Some(until) = self.lockout.locked_until {
            return Err(CredVaultError::LockedOut {
                locked_until: until,
            });
        }

        match VaultStore::open(&self.vault_path, passphrase) {
            Ok(store) => {
                self.store = Some(store);
                self.lockout = LockoutState::default();

                let session = AuthSession {
                    id: generate_session_id(),
                    created_at: now,
                    last_activity_at: now,
                };
                let id = session.id.clone();
                self.sessions.insert(id.clone(), session);
                Ok(id)
            }
            Err(CredVaultError::AuthenticationFailed) => {
                self.record_failure(now);
                Err(CredVaultError::AuthenticationFailed)
            }
            Err(e) => Err(e),
        }
    }

    /// Validate a session handle and refresh its activity timestamp.
    ///
    /// An expired or unknown session is treated identically to no
    /// session: the handle is discarded and every operation against
    /// it fails with `SessionExpired`.
    pub fn validate(&mut self, session_id: &str) -> Result<()> {
        let now = Utc::now();

        let expired = match self.sessions.get_mut(session_id) {
            None => return Err(CredVaultError::SessionExpired),
            Some(session) => {
                if now - session.last_activity_at > self.session_timeout {
                    true
                } else {
                    session.last_activity_at = now;
                    false
                }
            }
        };

        if expired {
            self.drop_session(session_id);
            return Err(CredVaultError::SessionExpired);
        }

        Ok(())
    }

    /// Destroy a session.  When the last session ends the unlocked
    /// store is dropped, which zeroes the derived key immediately.
    pub fn logout(&mut self, session_id: &str) {
        self.drop_session(session_id);
    }

    /// The unlocked vault. Call `validate` first.
    pub fn store(&self) -> Result<&VaultStore> {
        self.store.as_ref().ok_or(CredVaultError::SessionExpired)
    }

    /// Mutable access to the unlocked vault. Call `validate` first.
    pub fn store_mut(&mut self) -> Result<&mut VaultStore> {
        self.store.as_mut().ok_or(CredVaultError::SessionExpired)
    }

    /// Number of live sessions (expiry not re-evaluated).
    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn drop_session(&mut self, session_id: &str) {
        self.sessions.remove(session_id);
        if self.sessions.is_empty() {
            // Dropping the store zeroizes the MasterKey.
            self.store = None;
        }
    }

    /// Clear expired lockouts and stale failure windows.
    fn refresh_lockout(&mut self, now: DateTime<Utc>) {
        if let Some(until) = self.lockout.locked_until {
            if now >= until {
                self.lockout = LockoutState::default();
            }
            return;
        }

        if let Some(first) = self.lockout.first_failure_at {
            if now - first > self.failure_window {
                self.lockout = LockoutState::default();
            }
        }
    }

    fn record_failure(&mut self, now: DateTime<Utc>) {
        if self.lockout.first_failure_at.is_none() {
            self.lockout.first_failure_at = Some(now);
        }
        self.lockout.failed_attempts += 1;

        if self.lockout.failed_attempts >= self.max_failed_attempts {
            self.lockout.locked_until = Some(now + self.lockout_duration);
        }
    }
}

/// Generate a random 32-character hex session id.
fn generate_session_id() -> String {
    let mut bytes = [0u8; 16];
    rand::rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::kdf::DEFAULT_ITERATIONS;
    use tempfile::TempDir;

    const PASSPHRASE: &[u8] = b"correct horse battery staple";

    fn manager_with_vault() -> (TempDir, AuthSessionManager) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.vault");
        VaultStore::create(&path, PASSPHRASE, DEFAULT_ITERATIONS).unwrap();

        let manager = AuthSessionManager::new(path, &Settings::default());
        (dir, manager)
    }

    #[test]
    fn authenticate_and_validate() {
        let (_dir, mut mgr) = manager_with_vault();

        let session = mgr.authenticate(PASSPHRASE).unwrap();
        assert!(mgr.validate(&session).is_ok());
        assert!(mgr.store().is_ok());
        assert_eq!(mgr.active_sessions(), 1);
    }

    #[test]
    fn wrong_passphrase_fails_uniformly() {
        let (_dir, mut mgr) = manager_with_vault();

        let result = mgr.authenticate(b"wrong");
        assert!(matches!(result, Err(CredVaultError::AuthenticationFailed)));
        assert_eq!(mgr.active_sessions(), 0);
    }

    #[test]
    fn lockout_after_max_failures_even_with_correct_passphrase() {
        let (_dir, mut mgr) = manager_with_vault();

        for _ in 0..5 {
            let result = mgr.authenticate(b"wrong");
            assert!(matches!(result, Err(CredVaultError::AuthenticationFailed)));
        }

        // The 6th attempt is refused before key derivation, even
        // though the passphrase is correct.
        let result = mgr.authenticate(PASSPHRASE);
        assert!(matches!(result, Err(CredVaultError::LockedOut { .. })));
    }

    #[test]
    fn lockout_clears_after_duration() {
        let (_dir, mut mgr) = manager_with_vault();

        for _ in 0..5 {
            let _ = mgr.authenticate(b"wrong");
        }
        assert!(matches!(
            mgr.authenticate(PASSPHRASE),
            Err(CredVaultError::LockedOut { .. })
        ));

        // Backdate the lockout expiry instead of sleeping.
        mgr.lockout.locked_until = Some(Utc::now() - Duration::seconds(1));

        let session = mgr.authenticate(PASSPHRASE);
        assert!(session.is_ok(), "lockout must clear once it expires");
    }

    #[test]
    fn failure_counter_resets_after_window() {
        let (_dir, mut mgr) = manager_with_vault();

        for _ in 0..4 {
            let _ = mgr.authenticate(b"wrong");
        }

        // Pretend the first failure happened outside the window.
        mgr.lockout.first_failure_at = Some(Utc::now() - Duration::seconds(301));

        // This failure starts a fresh count, so no lockout yet.
        let _ = mgr.authenticate(b"wrong");
        assert!(matches!(
            mgr.authenticate(PASSPHRASE),
            Ok(_)
        ));
    }

    #[test]
    fn successful_unlock_resets_failures() {
        let (_dir, mut mgr) = manager_with_vault();

        for _ in 0..4 {
            let _ = mgr.authenticate(b"wrong");
        }
        mgr.authenticate(PASSPHRASE).unwrap();

        // Counter reset: four more failures do not lock out.
        for _ in 0..4 {
            let _ = mgr.authenticate(b"wrong");
        }
        assert!(mgr.authenticate(PASSPHRASE).is_ok());
    }

    #[test]
    fn idle_session_expires_and_is_discarded() {
        let (_dir, mut mgr) = manager_with_vault();
        let session = mgr.authenticate(PASSPHRASE).unwrap();

        // Backdate activity past the timeout.
        mgr.sessions.get_mut(&session).unwrap().last_activity_at =
            Utc::now() - Duration::seconds(301);

        assert!(matches!(
            mgr.validate(&session),
            Err(CredVaultError::SessionExpired)
        ));
        // The handle is gone and the key material was dropped.
        assert!(matches!(
            mgr.validate(&session),
            Err(CredVaultError::SessionExpired)
        ));
        assert!(mgr.store().is_err());
    }

    #[test]
    fn unknown_session_treated_as_expired() {
        let (_dir, mut mgr) = manager_with_vault();
        assert!(matches!(
            mgr.validate("no-such-session"),
            Err(CredVaultError::SessionExpired)
        ));
    }

    #[test]
    fn logout_drops_store() {
        let (_dir, mut mgr) = manager_with_vault();
        let session = mgr.authenticate(PASSPHRASE).unwrap();

        mgr.logout(&session);
        assert_eq!(mgr.active_sessions(), 0);
        assert!(mgr.store().is_err());
        assert!(matches!(
            mgr.validate(&session),
            Err(CredVaultError::SessionExpired)
        ));
    }

    #[test]
    fn validate_touches_activity() {
        let (_dir, mut mgr) = manager_with_vault();
        let session = mgr.authenticate(PASSPHRASE).unwrap();

        let before = mgr.sessions[&session].last_activity_at;
        std::thread::sleep(std::time::Duration::from_millis(5));
        mgr.validate(&session).unwrap();
        let after = mgr.sessions[&session].last_activity_at;

        assert!(after > before);
    }
}
