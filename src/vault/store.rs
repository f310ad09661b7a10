//! High-level vault operations.
//!
//! `VaultStore` wraps the container format and the crypto layer so the
//! rest of the engine can work with simple method calls like
//! `store.add(fields)`.  Every mutating call re-encrypts the full
//! record collection and atomically rewrites the vault file, so no
//! dirty-but-unpersisted state survives past the call boundary.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use zeroize::Zeroize;

use crate::crypto::cipher::{open, seal};
use crate::crypto::kdf::{derive_key, generate_salt, SALT_LEN};
use crate::crypto::keys::MasterKey;
use crate::errors::{CredVaultError, Result};

use super::format::{self, EXPORT_MAGIC, VAULT_MAGIC};
use super::record::{CredentialFields, CredentialPatch, CredentialRecord};

/// The unlocked vault handle.  Create one with `VaultStore::create` or
/// `VaultStore::open`, then use its methods to manage records.
///
/// Holds the decrypted record collection and the master key; dropping
/// the store zeroes the key material.
pub struct VaultStore {
    /// Path to the vault file on disk.
    path: PathBuf,

    /// PBKDF2 salt. Generated once at creation, rotated on
    /// passphrase change.
    salt: [u8; SALT_LEN],

    /// PBKDF2 iteration count stored in the container header.
    kdf_iterations: u32,

    /// In-memory map of record id -> decrypted record.
    records: HashMap<String, CredentialRecord>,

    /// The derived master key (zeroized on drop).
    master_key: MasterKey,
}

impl VaultStore {
    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Create a brand-new vault file at `path`.
    ///
    /// Generates a random salt, derives the master key from the
    /// passphrase, and writes an empty sealed record collection to
    /// disk.  Fails if a vault already exists at the target location.
    pub fn create(path: &Path, passphrase: &[u8], kdf_iterations: u32) -> Result<Self> {
        if path.exists() {
            return Err(CredVaultError::VaultAlreadyExists(path.to_path_buf()));
        }

        let salt = generate_salt();
        let mut key_bytes = derive_key(passphrase, &salt, kdf_iterations)?;
        let master_key = MasterKey::new(key_bytes);
        key_bytes.zeroize();

        let mut store = Self {
            path: path.to_path_buf(),
            salt,
            kdf_iterations,
            records: HashMap::new(),
            master_key,
        };

        store.save()?;
        Ok(store)
    }

    /// Open an existing vault file.
    ///
    /// Derives the master key from the stored salt and iteration
    /// count, then authenticates and decrypts the sealed payload.
    ///
    /// A wrong passphrase and a corrupted file both surface as the
    /// same `AuthenticationFailed`: distinguishing them would hand an
    /// attacker an oracle.  Recovery tooling should use
    /// `verify_file` instead, which reports structural corruption.
    pub fn open(path: &Path, passphrase: &[u8]) -> Result<Self> {
        let container = match format::read_vault_file(path) {
            Ok(c) => c,
            Err(e @ CredVaultError::VaultNotFound(_)) => return Err(e),
            Err(CredVaultError::Io(e)) => return Err(CredVaultError::Io(e)),
            Err(_) => return Err(CredVaultError::AuthenticationFailed),
        };

        let mut key_bytes = derive_key(passphrase, &container.salt, container.kdf_iterations)
            .map_err(|_| CredVaultError::AuthenticationFailed)?;
        let master_key = MasterKey::new(key_bytes);
        key_bytes.zeroize();

        let mut cipher_key = master_key.derive_cipher_key()?;
        let plaintext = open(&cipher_key, &container.sealed);
        cipher_key.zeroize();

        let mut plaintext = plaintext.map_err(|_| CredVaultError::AuthenticationFailed)?;

        let parsed: std::result::Result<Vec<CredentialRecord>, _> =
            serde_json::from_slice(&plaintext);
        plaintext.zeroize();

        let records: HashMap<String, CredentialRecord> = parsed
            .map_err(|_| CredVaultError::AuthenticationFailed)?
            .into_iter()
            .map(|r| (r.id.clone(), r))
            .collect();

        Ok(Self {
            path: path.to_path_buf(),
            salt: container.salt,
            kdf_iterations: container.kdf_iterations,
            records,
            master_key,
        })
    }

    /// Structural integrity check for recovery/diagnostic tooling.
    ///
    /// Parses the container prefix without a key, so it can tell
    /// "this file is not a vault / is truncated" apart from "the
    /// passphrase is wrong" — a distinction `open` deliberately
    /// refuses to make.
    pub fn verify_file(path: &Path) -> Result<()> {
        format::read_vault_file(path).map(|_| ())
    }

    // ------------------------------------------------------------------
    // Record operations
    // ------------------------------------------------------------------

    /// Add a new record and persist. Returns the assigned id.
    pub fn add(&mut self, fields: CredentialFields) -> Result<String> {
        let record = CredentialRecord::new(fields);
        let id = record.id.clone();
        self.records.insert(id.clone(), record);
        self.save()?;
        Ok(id)
    }

    /// Look up a record by id.
    pub fn get(&self, id: &str) -> Result<&CredentialRecord> {
        self.records
            .get(id)
            .ok_or_else(|| CredVaultError::CredentialNotFound(id.to_string()))
    }

    /// Apply a partial update to a record and persist.
    pub fn update(&mut self, id: &str, patch: CredentialPatch) -> Result<()> {
        let record = self
            .records
            .get_mut(id)
            .ok_or_else(|| CredVaultError::CredentialNotFound(id.to_string()))?;
        record.apply(patch);
        self.save()
    }

    /// Remove a record and persist.
    pub fn delete(&mut self, id: &str) -> Result<()> {
        if self.records.remove(id).is_none() {
            return Err(CredVaultError::CredentialNotFound(id.to_string()));
        }
        self.save()
    }

    /// All records, sorted by service name then id.
    pub fn list(&self) -> Vec<CredentialRecord> {
        let mut list: Vec<CredentialRecord> = self.records.values().cloned().collect();
        list.sort_by(|a, b| {
            a.service_name
                .cmp(&b.service_name)
                .then_with(|| a.id.cmp(&b.id))
        });
        list
    }

    /// Linear predicate scan over the decrypted collection.
    ///
    /// Vault sizes are bounded by human data entry; no index needed.
    pub fn search(&self, query: Option<&str>, tags: Option<&[String]>) -> Vec<CredentialRecord> {
        let mut hits: Vec<CredentialRecord> = self
            .records
            .values()
            .filter(|r| r.matches(query, tags))
            .cloned()
            .collect();
        hits.sort_by(|a, b| {
            a.service_name
                .cmp(&b.service_name)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits
    }

    /// Number of records in the vault.
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    // ------------------------------------------------------------------
    // Passphrase change
    // ------------------------------------------------------------------

    /// Change the master passphrase.
    ///
    /// Verifies `old` against the current key (constant-time), then
    /// rotates the salt, re-derives, re-encrypts, and atomically
    /// replaces the file.
    pub fn change_passphrase(&mut self, old: &[u8], new: &[u8]) -> Result<()> {
        let mut old_bytes = derive_key(old, &self.salt, self.kdf_iterations)
            .map_err(|_| CredVaultError::AuthenticationFailed)?;
        let old_key = MasterKey::new(old_bytes);
        old_bytes.zeroize();

        if !old_key.ct_eq(&self.master_key) {
            return Err(CredVaultError::AuthenticationFailed);
        }

        // Rotating the salt on every passphrase change means an
        // attacker with an old copy of the file learns nothing about
        // the new key.
        let new_salt = generate_salt();
        let mut new_bytes = derive_key(new, &new_salt, self.kdf_iterations)?;
        let new_key = MasterKey::new(new_bytes);
        new_bytes.zeroize();

        self.salt = new_salt;
        self.master_key = new_key;
        self.save()
    }

    // ------------------------------------------------------------------
    // Export / import
    // ------------------------------------------------------------------

    /// Produce a self-contained encrypted bundle of all records,
    /// keyed by `export_passphrase` with its own fresh salt —
    /// independent of the live vault's key.
    pub fn export(&self, export_passphrase: &[u8]) -> Result<Vec<u8>> {
        let salt = generate_salt();
        let mut key = derive_key(export_passphrase, &salt, self.kdf_iterations)?;

        let mut payload = self.serialize_records()?;
        let sealed = seal(&key, &payload);
        key.zeroize();
        payload.zeroize();

        Ok(format::encode(
            EXPORT_MAGIC,
            &salt,
            self.kdf_iterations,
            &sealed?,
        ))
    }

    /// Merge records from an export bundle into the live vault.
    ///
    /// All-or-nothing: the bundle is fully decrypted and parsed
    /// before any record is touched, so a tampered bundle or wrong
    /// passphrase never partially merges.  Records with an id already
    /// present replace the existing record.
    pub fn import(&mut self, blob: &[u8], export_passphrase: &[u8]) -> Result<usize> {
        let container =
            format::decode(EXPORT_MAGIC, blob).map_err(|_| CredVaultError::IntegrityFailure)?;

        let mut key = derive_key(export_passphrase, &container.salt, container.kdf_iterations)
            .map_err(|_| CredVaultError::IntegrityFailure)?;
        let plaintext = open(&key, &container.sealed);
        key.zeroize();

        let mut plaintext = plaintext.map_err(|_| CredVaultError::IntegrityFailure)?;
        let parsed: std::result::Result<Vec<CredentialRecord>, _> =
            serde_json::from_slice(&plaintext);
        plaintext.zeroize();

        let incoming = parsed.map_err(|_| CredVaultError::IntegrityFailure)?;
        let count = incoming.len();

        for record in incoming {
            self.records.insert(record.id.clone(), record);
        }
        self.save()?;

        Ok(count)
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Seal the record collection and write the container atomically.
    fn save(&mut self) -> Result<()> {
        let mut payload = self.serialize_records()?;

        let mut cipher_key = self.master_key.derive_cipher_key()?;
        let sealed = seal(&cipher_key, &payload);
        cipher_key.zeroize();
        payload.zeroize();

        let bytes = format::encode(VAULT_MAGIC, &self.salt, self.kdf_iterations, &sealed?);
        format::write_atomic(&self.path, &bytes)
    }

    /// Serialize records to JSON, sorted by id for deterministic output.
    fn serialize_records(&self) -> Result<Vec<u8>> {
        let mut list: Vec<&CredentialRecord> = self.records.values().collect();
        list.sort_by(|a, b| a.id.cmp(&b.id));

        serde_json::to_vec(&list)
            .map_err(|e| CredVaultError::SerializationError(format!("records: {e}")))
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Returns the path to the vault file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the stored PBKDF2 iteration count.
    pub fn kdf_iterations(&self) -> u32 {
        self.kdf_iterations
    }
}
