//! Vault module — encrypted credential storage.
//!
//! This module provides:
//! - `CredentialRecord` and its create/update types (`record`)
//! - The binary container format with atomic writes (`format`)
//! - The high-level `VaultStore` handle (`store`)

pub mod format;
pub mod record;
pub mod store;

// Re-export the most commonly used items.
pub use record::{CredentialFields, CredentialPatch, CredentialRecord};
pub use store::VaultStore;
