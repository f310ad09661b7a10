//! Binary container format for vault files and export bundles.
//!
//! A container has this layout:
//!
//! ```text
//! [magic: 4 bytes][version: 1 byte][salt: 16 bytes][kdf_iterations: 4 bytes LE][sealed payload]
//! ```
//!
//! - **Magic**: `CVLT` for a live vault file, `CVXB` for an export
//!   bundle.  The two are never interchangeable.
//! - **Version**: container format version (currently `1`).
//! - **Salt** / **kdf_iterations**: PBKDF2 parameters, stored so the
//!   iteration count can be raised without breaking existing vaults.
//! - **Sealed payload**: AES-256-GCM output (nonce ‖ ciphertext ‖ tag)
//!   over the serialized record collection.
//!
//! Everything after the iteration count is authenticated by the GCM
//! tag; the header fields are implicitly authenticated because a
//! mismatched salt or iteration count derives the wrong key.

use std::fs;
use std::path::Path;

use crate::crypto::cipher::{NONCE_LEN, TAG_LEN};
use crate::crypto::kdf::SALT_LEN;
use crate::errors::{CredVaultError, Result};

/// Magic bytes at the start of a live vault file.
pub const VAULT_MAGIC: &[u8; 4] = b"CVLT";

/// Magic bytes at the start of an export bundle.
pub const EXPORT_MAGIC: &[u8; 4] = b"CVXB";

/// Current container format version.
pub const CURRENT_VERSION: u8 = 1;

/// Fixed-size prefix: 4 (magic) + 1 (version) + 16 (salt) + 4 (iterations).
const PREFIX_LEN: usize = 4 + 1 + SALT_LEN + 4;

/// A parsed container: KDF parameters plus the sealed payload.
pub struct Container {
    pub version: u8,
    pub salt: [u8; SALT_LEN],
    pub kdf_iterations: u32,
    pub sealed: Vec<u8>,
}

/// Serialize a container to its binary form.
pub fn encode(magic: &[u8; 4], salt: &[u8; SALT_LEN], kdf_iterations: u32, sealed: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(PREFIX_LEN + sealed.len());
    buf.extend_from_slice(magic);
    buf.push(CURRENT_VERSION);
    buf.extend_from_slice(salt);
    buf.extend_from_slice(&kdf_iterations.to_le_bytes());
    buf.extend_from_slice(sealed);
    buf
}

/// Parse a binary container, checking the expected magic.
pub fn decode(magic: &[u8; 4], data: &[u8]) -> Result<Container> {
    // Smallest valid container: prefix + an empty sealed payload.
    if data.len() < PREFIX_LEN + NONCE_LEN + TAG_LEN {
        return Err(CredVaultError::InvalidVaultFormat(
            "file too small to be a valid container".into(),
        ));
    }

    if &data[0..4] != magic {
        return Err(CredVaultError::InvalidVaultFormat(
            "missing or wrong magic bytes".into(),
        ));
    }

    let version = data[4];
    if version != CURRENT_VERSION {
        return Err(CredVaultError::InvalidVaultFormat(format!(
            "unsupported version {version}, expected {CURRENT_VERSION}"
        )));
    }

    let mut salt = [0u8; SALT_LEN];
    salt.copy_from_slice(&data[5..5 + SALT_LEN]);

    let iter_start = 5 + SALT_LEN;
    let kdf_iterations = u32::from_le_bytes(
        data[iter_start..iter_start + 4]
            .try_into()
            .map_err(|_| CredVaultError::InvalidVaultFormat("bad iteration count".into()))?,
    );

    Ok(Container {
        version,
        salt,
        kdf_iterations,
        sealed: data[PREFIX_LEN..].to_vec(),
    })
}

/// Write a container file to disk **atomically**.
///
/// Writes to a temp file in the same directory, then renames it over
/// the target path, so a crash mid-write never corrupts a previously
/// valid vault.
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let parent = path.parent().unwrap_or(Path::new("."));
    let tmp_path = parent.join(format!(
        ".{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy()
    ));

    fs::write(&tmp_path, data)?;
    fs::rename(&tmp_path, path)?;

    Ok(())
}

/// Read and parse a vault file from disk.
pub fn read_vault_file(path: &Path) -> Result<Container> {
    if !path.exists() {
        return Err(CredVaultError::VaultNotFound(path.to_path_buf()));
    }

    let data = fs::read(path)?;
    decode(VAULT_MAGIC, &data)
}
