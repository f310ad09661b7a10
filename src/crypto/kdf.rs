//! Passphrase-based key derivation using PBKDF2-HMAC-SHA256.
//!
//! PBKDF2 is deliberately CPU-bound: the iteration count (stored in the
//! vault header, so it can be raised without breaking existing vaults)
//! makes brute-forcing the master passphrase expensive.

use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;

use crate::errors::{CredVaultError, Result};

/// Length of the salt in bytes (128 bits).
pub const SALT_LEN: usize = 16;

/// Length of the derived key in bytes (256 bits, for AES-256).
pub const KEY_LEN: usize = 32;

/// Default PBKDF2 iteration count.
pub const DEFAULT_ITERATIONS: u32 = 100_000;

/// Minimum accepted iteration count. Anything below this is a
/// dangerously weak KDF setting, not a tunable.
pub const MIN_ITERATIONS: u32 = 100_000;

/// Derive a 32-byte key from a passphrase and salt.
///
/// Deterministic: the same passphrase + salt + iterations always
/// produce the same key. Rejects out-of-range parameters (short salt,
/// iteration count below the floor) — those are caller bugs, not
/// runtime conditions.
pub fn derive_key(passphrase: &[u8], salt: &[u8], iterations: u32) -> Result<[u8; KEY_LEN]> {
    if salt.len() != SALT_LEN {
        return Err(CredVaultError::KeyDerivationFailed(format!(
            "salt must be {SALT_LEN} bytes (got {})",
            salt.len()
        )));
    }
    if iterations < MIN_ITERATIONS {
        return Err(CredVaultError::KeyDerivationFailed(format!(
            "iteration count must be at least {MIN_ITERATIONS} (got {iterations})"
        )));
    }

    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(passphrase, salt, iterations, &mut key);
    Ok(key)
}

/// Generate a cryptographically random 16-byte salt.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut salt);
    salt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_inputs_same_key() {
        let salt = [7u8; SALT_LEN];
        let a = derive_key(b"passphrase", &salt, DEFAULT_ITERATIONS).unwrap();
        let b = derive_key(b"passphrase", &salt, DEFAULT_ITERATIONS).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_salt_different_key() {
        let a = derive_key(b"passphrase", &[1u8; SALT_LEN], DEFAULT_ITERATIONS).unwrap();
        let b = derive_key(b"passphrase", &[2u8; SALT_LEN], DEFAULT_ITERATIONS).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn rejects_short_salt() {
        assert!(derive_key(b"pw", &[0u8; 8], DEFAULT_ITERATIONS).is_err());
    }

    #[test]
    fn rejects_weak_iteration_count() {
        assert!(derive_key(b"pw", &[0u8; SALT_LEN], 1_000).is_err());
    }

    #[test]
    fn generated_salts_differ() {
        assert_ne!(generate_salt(), generate_salt());
    }
}
