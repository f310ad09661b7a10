use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::errors::{CredVaultError, Result};

/// Engine configuration, loaded from `credvault.toml`.
///
/// Every field has a sensible default so CredVault works
/// out-of-the-box without any config file at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Vault file name, relative to the data directory.
    #[serde(default = "default_vault_file")]
    pub vault_file: String,

    /// Inactivity timeout for unlocked sessions, in seconds.
    #[serde(default = "default_session_timeout_secs")]
    pub session_timeout_secs: u64,

    /// Failed authentication attempts before lockout.
    #[serde(default = "default_max_failed_attempts")]
    pub max_failed_attempts: u32,

    /// How long a lockout lasts, in seconds.
    #[serde(default = "default_lockout_duration_secs")]
    pub lockout_duration_secs: u64,

    /// Window in which consecutive failures count toward lockout,
    /// in seconds.
    #[serde(default = "default_failure_window_secs")]
    pub failure_window_secs: u64,

    /// PBKDF2 iteration count for new vaults and exports.
    #[serde(default = "default_kdf_iterations")]
    pub kdf_iterations: u32,

    /// Default lifetime of share tokens, in seconds.
    #[serde(default = "default_share_ttl_secs")]
    pub default_share_ttl_secs: u64,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_vault_file() -> String {
    "credvault.vault".to_string()
}

fn default_session_timeout_secs() -> u64 {
    300 // 5 minutes
}

fn default_max_failed_attempts() -> u32 {
    5
}

fn default_lockout_duration_secs() -> u64 {
    300 // 5 minutes
}

fn default_failure_window_secs() -> u64 {
    300
}

fn default_kdf_iterations() -> u32 {
    crate::crypto::kdf::DEFAULT_ITERATIONS
}

fn default_share_ttl_secs() -> u64 {
    3600 // 1 hour
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            vault_file: default_vault_file(),
            session_timeout_secs: default_session_timeout_secs(),
            max_failed_attempts: default_max_failed_attempts(),
            lockout_duration_secs: default_lockout_duration_secs(),
            failure_window_secs: default_failure_window_secs(),
            kdf_iterations: default_kdf_iterations(),
            default_share_ttl_secs: default_share_ttl_secs(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the data directory.
    const FILE_NAME: &'static str = "credvault.toml";

    /// Load settings from `<dir>/credvault.toml`.
    ///
    /// If the file does not exist, sensible defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(dir: &Path) -> Result<Self> {
        let config_path = dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            CredVaultError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        Ok(settings)
    }

    /// Full path to the vault file inside `dir`.
    pub fn vault_path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.vault_file)
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::seconds(self.session_timeout_secs as i64)
    }

    pub fn lockout_duration(&self) -> Duration {
        Duration::seconds(self.lockout_duration_secs as i64)
    }

    pub fn failure_window(&self) -> Duration {
        Duration::seconds(self.failure_window_secs as i64)
    }

    pub fn default_share_ttl(&self) -> Duration {
        Duration::seconds(self.default_share_ttl_secs as i64)
    }
}

// ── Tests ────────────────────────────────────────────────────────────
