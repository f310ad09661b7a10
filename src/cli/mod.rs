//! CLI module — Clap argument parser, output helpers, and command
//! implementations.
//!
//! The CLI is a thin, stateless wrapper: each invocation loads the
//! config, builds an `Engine`, authenticates, performs one operation,
//! and logs out.  All security decisions live in the engine.

pub mod commands;
pub mod output;

use clap::Parser;
use dialoguer::Password;
use zeroize::Zeroizing;

use crate::errors::{CredVaultError, Result};

/// Minimum passphrase length to prevent trivially weak passphrases.
const MIN_PASSPHRASE_LEN: usize = 8;

/// CredVault CLI: encrypted credential vault.
#[derive(Parser)]
#[command(
    name = "credvault",
    about = "Encrypted credential vault with audit logging",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Data directory holding the vault and config (default: .)
    #[arg(long, default_value = ".", global = true)]
    pub dir: String,

    /// Master passphrase (intended for scripting; interactive prompt
    /// otherwise)
    #[arg(long, env = "CREDVAULT_PASSPHRASE", hide_env_values = true, global = true)]
    pub passphrase: Option<String>,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Create a new vault
    Init,

    /// Add a credential
    Add {
        /// Service name (e.g. github)
        service: String,
        /// Username or email
        username: String,
        /// Secret value (omit for interactive prompt)
        #[arg(long)]
        secret: Option<String>,
        /// Service URL
        #[arg(long)]
        url: Option<String>,
        /// Free-form notes
        #[arg(long)]
        notes: Option<String>,
        /// Comma-separated tags
        #[arg(long)]
        tags: Option<String>,
    },

    /// Show a credential, including its secret
    Get {
        /// Credential id
        id: String,
        /// Copy the secret to the clipboard instead of printing it
        #[arg(long)]
        copy: bool,
    },

    /// List all credentials (metadata only)
    List,

    /// Search credentials by text and/or tags
    Search {
        /// Substring to match against service, username, and notes
        query: Option<String>,
        /// Restrict to credentials carrying any of these tags
        #[arg(long)]
        tag: Vec<String>,
    },

    /// Update fields of a credential
    Update {
        /// Credential id
        id: String,
        #[arg(long)]
        service: Option<String>,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        secret: Option<String>,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        /// Comma-separated tags (replaces the existing set)
        #[arg(long)]
        tags: Option<String>,
    },

    /// Delete a credential
    Delete {
        /// Credential id
        id: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Change the master passphrase
    Passwd,

    /// Export an encrypted backup bundle
    Export {
        /// Output file path
        #[arg(short, long)]
        output: String,
    },

    /// Import credentials from an encrypted backup bundle
    Import {
        /// Path to the bundle file
        file: String,
    },

    /// Show this invocation's audit trail
    Audit {
        /// Number of entries to show (default: 50)
        #[arg(long, default_value = "50")]
        last: usize,
    },

    /// Check the vault file's structure without unlocking it
    Verify,

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, powershell)
        shell: String,
    },
}

/// Resolve the master passphrase: `--passphrase`/env if given,
/// otherwise an interactive prompt.
pub fn resolve_passphrase(cli: &Cli, prompt: &str) -> Result<Zeroizing<String>> {
    if let Some(ref p) = cli.passphrase {
        return Ok(Zeroizing::new(p.clone()));
    }

    let entered = Password::new()
        .with_prompt(prompt)
        .interact()
        .map_err(|e| CredVaultError::CommandFailed(format!("passphrase prompt: {e}")))?;

    Ok(Zeroizing::new(entered))
}

/// Prompt for a new passphrase with confirmation and a length check.
pub fn prompt_new_passphrase(prompt: &str) -> Result<Zeroizing<String>> {
    let entered = Password::new()
        .with_prompt(prompt)
        .with_confirmation("Confirm passphrase", "Passphrases do not match")
        .interact()
        .map_err(|e| CredVaultError::CommandFailed(format!("passphrase prompt: {e}")))?;

    if entered.len() < MIN_PASSPHRASE_LEN {
        return Err(CredVaultError::CommandFailed(format!(
            "passphrase must be at least {MIN_PASSPHRASE_LEN} characters"
        )));
    }

    Ok(Zeroizing::new(entered))
}
