//! Master-key handling and HKDF sub-key derivation.
//!
//! The PBKDF2 output never encrypts anything directly.  HKDF-SHA256
//! (RFC 5869) expands it into a dedicated vault cipher key, so the
//! container format can grow additional sub-keys later without
//! re-deriving from the passphrase.

use hkdf::Hkdf;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::errors::{CredVaultError, Result};

/// Length of derived sub-keys (256 bits).
const KEY_LEN: usize = 32;

/// A wrapper around a 32-byte master key that zeroes its memory when
/// dropped, so key material cannot linger after a session ends.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct MasterKey {
    bytes: [u8; KEY_LEN],
}

impl MasterKey {
    /// Create a new `MasterKey` from raw KDF output.
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Derive the vault cipher key from this master key.
    pub fn derive_cipher_key(&self) -> Result<[u8; KEY_LEN]> {
        hkdf_derive(&self.bytes, b"credvault-cipher-key")
    }

    /// Constant-time equality against another master key.
    ///
    /// Used to verify the old passphrase before a passphrase change
    /// without re-reading the vault file.
    pub fn ct_eq(&self, other: &MasterKey) -> bool {
        self.bytes.ct_eq(&other.bytes).into()
    }
}

/// Run HKDF-SHA256 expand with the given `info` context string.
///
/// The extract step is skipped: the master key already has full
/// entropy (it came from PBKDF2), so it is used directly as the PRK.
fn hkdf_derive(ikm: &[u8], info: &[u8]) -> Result<[u8; KEY_LEN]> {
    let hk = Hkdf::<Sha256>::new(None, ikm);

    let mut okm = [0u8; KEY_LEN];
    hk.expand(info, &mut okm)
        .map_err(|e| CredVaultError::KeyDerivationFailed(format!("HKDF expand failed: {e}")))?;

    Ok(okm)
}
