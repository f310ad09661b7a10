//! AES-256-GCM authenticated encryption.
//!
//! Each call to `seal` generates a fresh random 12-byte nonce and
//! prepends it to the ciphertext, so callers never supply (and can
//! never reuse) a nonce.  `open` splits the nonce back out before
//! decrypting and fails closed on any tag mismatch.
//!
//! Layout of the returned byte buffer:
//!   [ 12-byte nonce | ciphertext + 16-byte auth tag ]

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};

use crate::errors::{CredVaultError, Result};

/// Size of the AES-256-GCM nonce in bytes.
pub const NONCE_LEN: usize = 12;

/// Size of the GCM authentication tag in bytes.
pub const TAG_LEN: usize = 16;

/// Encrypt `plaintext` with a 32-byte `key`.
///
/// Returns the nonce prepended to the ciphertext (nonce || ciphertext).
pub fn seal(key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| CredVaultError::EncryptionFailed(format!("invalid key length: {e}")))?;

    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| CredVaultError::EncryptionFailed(format!("encryption error: {e}")))?;

    // Prepend the nonce so the caller only needs to store one blob.
    let mut output = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    output.extend_from_slice(&nonce);
    output.extend_from_slice(&ciphertext);
    Ok(output)
}

/// Decrypt data that was produced by `seal`.
///
/// Expects the first 12 bytes to be the nonce, followed by the
/// ciphertext and tag.  Any failure — truncation, bad key, flipped
/// bit anywhere in the buffer — is reported as the same
/// `IntegrityFailure`, and no partial plaintext is ever returned.
/// The underlying GCM tag check is constant-time.
pub fn open(key: &[u8], sealed: &[u8]) -> Result<Vec<u8>> {
    if sealed.len() < NONCE_LEN + TAG_LEN {
        return Err(CredVaultError::IntegrityFailure);
    }

    let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
    let nonce = Nonce::from_slice(nonce_bytes);

    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CredVaultError::IntegrityFailure)?;

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| CredVaultError::IntegrityFailure)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; 32] = [42u8; 32];

    #[test]
    fn seal_open_roundtrip() {
        let sealed = seal(&KEY, b"attack at dawn").unwrap();
        let plain = open(&KEY, &sealed).unwrap();
        assert_eq!(plain, b"attack at dawn");
    }

    #[test]
    fn nonce_is_fresh_per_call() {
        let a = seal(&KEY, b"same input").unwrap();
        let b = seal(&KEY, b"same input").unwrap();
        assert_ne!(a, b, "two seals of the same plaintext must differ");
    }

    #[test]
    fn wrong_key_fails() {
        let sealed = seal(&KEY, b"secret").unwrap();
        let result = open(&[1u8; 32], &sealed);
        assert!(matches!(result, Err(CredVaultError::IntegrityFailure)));
    }

    #[test]
    fn any_bit_flip_is_detected() {
        let mut sealed = seal(&KEY, b"integrity matters").unwrap();
        for i in 0..sealed.len() {
            sealed[i] ^= 0x01;
            assert!(
                open(&KEY, &sealed).is_err(),
                "flipping byte {i} must be detected"
            );
            sealed[i] ^= 0x01;
        }
    }

    #[test]
    fn truncated_input_fails_closed() {
        assert!(open(&KEY, b"short").is_err());
        assert!(open(&KEY, &[]).is_err());
    }
}
