//! Cryptographic primitives for CredVault.
//!
//! This module provides:
//! - AES-256-GCM authenticated encryption (`cipher`)
//! - PBKDF2-HMAC-SHA256 passphrase-based key derivation (`kdf`)
//! - Master-key wrapper and HKDF sub-key derivation (`keys`)

pub mod cipher;
pub mod kdf;
pub mod keys;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{seal, open, derive_key, ...};
pub use cipher::{open, seal};
pub use kdf::{derive_key, generate_salt, DEFAULT_ITERATIONS, MIN_ITERATIONS, SALT_LEN};
pub use keys::MasterKey;
