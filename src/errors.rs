use std::path::PathBuf;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// All errors that can occur in CredVault.
///
/// This is a closed set: every engine operation returns one of these
/// variants, so presentation layers must handle each case explicitly
/// instead of catching a broad exception class.
#[derive(Debug, Error)]
pub enum CredVaultError {
    // --- Authentication & session errors ---
    /// Wrong passphrase or corrupted vault. The two cases are
    /// intentionally indistinguishable so an attacker cannot learn
    /// which one occurred.
    #[error("Authentication failed — invalid credentials")]
    AuthenticationFailed,

    #[error("Too many failed attempts — locked out until {locked_until}")]
    LockedOut { locked_until: DateTime<Utc> },

    #[error("Session expired — authenticate again")]
    SessionExpired,

    // --- Vault errors ---
    #[error("Vault not found at {0}")]
    VaultNotFound(PathBuf),

    #[error("Vault already exists at {0}")]
    VaultAlreadyExists(PathBuf),

    #[error("Invalid vault format: {0}")]
    InvalidVaultFormat(String),

    #[error("Credential '{0}' not found")]
    CredentialNotFound(String),

    // --- Share token errors ---
    #[error("Share token expired or already redeemed")]
    TokenExpired,

    #[error("Share token '{0}' not found")]
    TokenNotFound(String),

    // --- Crypto errors ---
    /// Authenticated decryption or import verification failed.
    #[error("Integrity check failed — data is tampered or the passphrase is wrong")]
    IntegrityFailure,

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    // --- Audit errors ---
    #[error("Audit log hash chain broken at entry {0}")]
    TamperDetected(u64),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("User cancelled operation")]
    UserCancelled,

    #[error("Passphrase mismatch — passphrases do not match")]
    PassphraseMismatch,
}

/// Convenience type alias for CredVault results.
pub type Result<T> = std::result::Result<T, CredVaultError>;
