//! Integration tests for the engine facade: authentication, lockout,
//! sessions, sharing, and audit behavior.

use std::collections::BTreeSet;
use std::thread::sleep;
use std::time::Duration;

use credvault::config::Settings;
use credvault::engine::Engine;
use credvault::errors::CredVaultError;
use credvault::vault::{CredentialFields, CredentialPatch};
use tempfile::TempDir;

const MASTER: &[u8] = b"Tr0ub4dor&3";

fn engine_with(settings: Settings) -> (TempDir, Engine) {
    let dir = TempDir::new().unwrap();
    let vault_path = dir.path().join("test.vault");
    let mut engine = Engine::new(&vault_path, &settings);
    engine.create_vault(MASTER).unwrap();
    (dir, engine)
}

fn engine() -> (TempDir, Engine) {
    engine_with(Settings::default())
}

fn github_fields() -> CredentialFields {
    CredentialFields {
        service_name: "github".to_string(),
        username: "alice".to_string(),
        secret: "s3cr3t".to_string(),
        url: Some("https://github.com".to_string()),
        notes: None,
        tags: BTreeSet::new(),
    }
}

// ---------------------------------------------------------------------------
// Credential flow through the engine
// ---------------------------------------------------------------------------

#[test]
fn full_credential_lifecycle() {
    let (_dir, mut engine) = engine();
    let session = engine.authenticate(MASTER).unwrap();

    let id = engine.add_credential(&session, github_fields()).unwrap();
    assert_eq!(engine.list_credentials(&session).unwrap().len(), 1);

    engine
        .update_credential(
            &session,
            &id,
            CredentialPatch {
                secret: Some("rotated".into()),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(engine.get_credential(&session, &id).unwrap().secret, "rotated");

    let hits = engine.search(&session, Some("github"), None).unwrap();
    assert_eq!(hits.len(), 1);

    engine.delete_credential(&session, &id).unwrap();
    assert!(matches!(
        engine.get_credential(&session, &id),
        Err(CredVaultError::CredentialNotFound(_))
    ));

    engine.logout(&session);
}

#[test]
fn operations_require_a_live_session() {
    let (_dir, mut engine) = engine();

    assert!(matches!(
        engine.list_credentials("bogus-session"),
        Err(CredVaultError::SessionExpired)
    ));

    let session = engine.authenticate(MASTER).unwrap();
    engine.logout(&session);

    assert!(matches!(
        engine.list_credentials(&session),
        Err(CredVaultError::SessionExpired)
    ));
}

#[test]
fn idle_session_expires() {
    let settings = Settings {
        session_timeout_secs: 0,
        ..Settings::default()
    };
    let (_dir, mut engine) = engine_with(settings);

    let session = engine.authenticate(MASTER).unwrap();
    sleep(Duration::from_millis(20));

    assert!(matches!(
        engine.list_credentials(&session),
        Err(CredVaultError::SessionExpired)
    ));
    // The handle stays dead.
    assert!(matches!(
        engine.get_credential(&session, "anything"),
        Err(CredVaultError::SessionExpired)
    ));
}

// ---------------------------------------------------------------------------
// Lockout
// ---------------------------------------------------------------------------

#[test]
fn end_to_end_lockout_scenario() {
    // The full scenario: create, add, logout, five wrong attempts,
    // lockout even with the correct passphrase, wait it out, recover.
    let settings = Settings {
        lockout_duration_secs: 1,
        ..Settings::default()
    };
    let (_dir, mut engine) = engine_with(settings);

    let session = engine.authenticate(MASTER).unwrap();
    let id = engine.add_credential(&session, github_fields()).unwrap();
    engine.logout(&session);

    for _ in 0..5 {
        assert!(matches!(
            engine.authenticate(b"wrong-passphrase"),
            Err(CredVaultError::AuthenticationFailed)
        ));
    }

    // Sixth attempt fails fast even though the passphrase is correct.
    assert!(matches!(
        engine.authenticate(MASTER),
        Err(CredVaultError::LockedOut { .. })
    ));

    sleep(Duration::from_millis(1200));

    let session = engine.authenticate(MASTER).expect("lockout must expire");
    let record = engine.get_credential(&session, &id).unwrap();
    assert_eq!(record.secret, "s3cr3t");
}

// ---------------------------------------------------------------------------
// Sharing
// ---------------------------------------------------------------------------

#[test]
fn share_token_redeems_exactly_once() {
    let (_dir, mut engine) = engine();
    let session = engine.authenticate(MASTER).unwrap();
    let id = engine.add_credential(&session, github_fields()).unwrap();

    let issued = engine.issue_share(&session, &id, None, None).unwrap();
    engine.logout(&session);

    // Redemption needs no unlocked vault.
    let snapshot = engine.redeem_share(&issued.token_id, None).unwrap();
    assert_eq!(snapshot.service_name, "github");
    assert_eq!(snapshot.secret, "s3cr3t");

    assert!(matches!(
        engine.redeem_share(&issued.token_id, None),
        Err(CredVaultError::TokenExpired)
    ));
}

#[test]
fn share_token_expires_after_ttl() {
    let (_dir, mut engine) = engine();
    let session = engine.authenticate(MASTER).unwrap();
    let id = engine.add_credential(&session, github_fields()).unwrap();

    let issued = engine.issue_share(&session, &id, Some(0), None).unwrap();
    sleep(Duration::from_millis(20));

    assert!(matches!(
        engine.redeem_share(&issued.token_id, None),
        Err(CredVaultError::TokenExpired)
    ));
}

#[test]
fn passphrase_protected_share() {
    let (_dir, mut engine) = engine();
    let session = engine.authenticate(MASTER).unwrap();
    let id = engine.add_credential(&session, github_fields()).unwrap();

    let issued = engine
        .issue_share(&session, &id, None, Some("hunter2"))
        .unwrap();

    assert!(matches!(
        engine.redeem_share(&issued.token_id, Some("wrong")),
        Err(CredVaultError::AuthenticationFailed)
    ));
    let snapshot = engine.redeem_share(&issued.token_id, Some("hunter2")).unwrap();
    assert_eq!(snapshot.username, "alice");
}

#[test]
fn issuing_for_unknown_credential_fails() {
    let (_dir, mut engine) = engine();
    let session = engine.authenticate(MASTER).unwrap();

    assert!(matches!(
        engine.issue_share(&session, "no-such-id", None, None),
        Err(CredVaultError::CredentialNotFound(_))
    ));
}

#[test]
fn deleting_record_does_not_revoke_live_token() {
    let (_dir, mut engine) = engine();
    let session = engine.authenticate(MASTER).unwrap();
    let id = engine.add_credential(&session, github_fields()).unwrap();

    let issued = engine.issue_share(&session, &id, None, None).unwrap();
    engine.delete_credential(&session, &id).unwrap();
    engine.logout(&session);

    // Documented scope boundary: redemption resolves against the
    // snapshot taken at issuance.
    let snapshot = engine.redeem_share(&issued.token_id, None).unwrap();
    assert_eq!(snapshot.secret, "s3cr3t");
}

// ---------------------------------------------------------------------------
// Export / import through the engine
// ---------------------------------------------------------------------------

#[test]
fn export_import_between_engines() {
    let (_dir, mut engine) = engine();
    let session = engine.authenticate(MASTER).unwrap();
    let id = engine.add_credential(&session, github_fields()).unwrap();
    let blob = engine.export_vault(&session, b"bundle-pass").unwrap();
    engine.logout(&session);

    let dir2 = TempDir::new().unwrap();
    let mut engine2 = Engine::new(&dir2.path().join("b.vault"), &Settings::default());
    engine2.create_vault(b"another-master").unwrap();
    let session2 = engine2.authenticate(b"another-master").unwrap();

    let count = engine2.import_vault(&session2, &blob, b"bundle-pass").unwrap();
    assert_eq!(count, 1);
    assert_eq!(
        engine2.get_credential(&session2, &id).unwrap().secret,
        "s3cr3t"
    );
}

// ---------------------------------------------------------------------------
// Audit
// ---------------------------------------------------------------------------

#[test]
fn every_operation_is_audited_and_chain_verifies() {
    let (_dir, mut engine) = engine();

    // Engine ops: 1 failed auth + 1 success + add + get + update +
    // search + issue + redeem + delete = 9 audited operations, plus
    // the vault creation entry.
    let _ = engine.authenticate(b"wrong");
    let session = engine.authenticate(MASTER).unwrap();
    let id = engine.add_credential(&session, github_fields()).unwrap();
    engine.get_credential(&session, &id).unwrap();
    engine
        .update_credential(&session, &id, CredentialPatch::default())
        .unwrap();
    engine.search(&session, Some("git"), None).unwrap();
    let issued = engine.issue_share(&session, &id, None, None).unwrap();
    engine.redeem_share(&issued.token_id, None).unwrap();
    engine.delete_credential(&session, &id).unwrap();

    let entries = engine.read_audit_log(&session, 100).unwrap();
    assert!(entries.len() >= 10, "expected >= 10 entries, got {}", entries.len());
    engine.verify_audit_chain(&session).unwrap();

    // Spot-check ordering: the chain links hold in the returned view.
    for pair in entries.windows(2) {
        assert_eq!(pair[1].prior_hash, pair[0].hash);
        assert_eq!(pair[1].sequence, pair[0].sequence + 1);
    }
}

#[test]
fn auth_attempts_are_audited_by_kind() {
    let settings = Settings {
        max_failed_attempts: 2,
        lockout_duration_secs: 1,
        ..Settings::default()
    };
    let (_dir, mut engine) = engine_with(settings);

    let _ = engine.authenticate(b"wrong");
    let _ = engine.authenticate(b"wrong");
    let _ = engine.authenticate(MASTER); // refused: locked out

    sleep(Duration::from_millis(1200));
    let session = engine.authenticate(MASTER).unwrap();

    let entries = engine.read_audit_log(&session, 100).unwrap();
    let kinds: Vec<String> = entries.iter().map(|e| e.event.to_string()).collect();
    assert!(kinds.contains(&"vault_created".to_string()));
    assert!(kinds.contains(&"lockout".to_string()));
    assert!(kinds.contains(&"auth_success".to_string()));
    assert_eq!(
        kinds.iter().filter(|k| *k == "auth_failure").count(),
        2,
        "one entry per failed attempt"
    );
}

// ---------------------------------------------------------------------------
// Stats & diagnostics
// ---------------------------------------------------------------------------

#[test]
fn vault_stats_reflect_state() {
    let (_dir, mut engine) = engine();
    let session = engine.authenticate(MASTER).unwrap();
    engine.add_credential(&session, github_fields()).unwrap();

    let stats = engine.vault_stats(&session).unwrap();
    assert_eq!(stats.total_credentials, 1);
    assert_eq!(stats.active_sessions, 1);
    assert!(stats.vault_size_bytes > 0);
    assert!(stats.audit_entries >= 3);
}

#[test]
fn verify_vault_file_passes_on_healthy_vault() {
    let (_dir, engine) = engine();
    assert!(engine.verify_vault_file().is_ok());
}
