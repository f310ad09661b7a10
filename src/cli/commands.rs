//! Command implementations.  Each function is a thin mapping from
//! parsed arguments onto engine operations — no security logic here.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::CommandFactory;
use dialoguer::{Confirm, Password};

use crate::config::Settings;
use crate::engine::Engine;
use crate::errors::{CredVaultError, Result};
use crate::vault::{CredentialFields, CredentialPatch};

use super::{output, prompt_new_passphrase, resolve_passphrase, Cli};

/// Build an engine for the configured data directory.
fn build_engine(cli: &Cli) -> Result<Engine> {
    let dir = PathBuf::from(&cli.dir);
    let settings = Settings::load(&dir)?;
    let vault_path = settings.vault_path(&dir);
    Ok(Engine::new(&vault_path, &settings))
}

/// Authenticate and return a session id.
fn unlock(cli: &Cli, engine: &mut Engine) -> Result<String> {
    let passphrase = resolve_passphrase(cli, "Master passphrase")?;
    engine.authenticate(passphrase.as_bytes())
}

/// Split a comma-separated tag list into a set.
fn parse_tags(tags: &str) -> BTreeSet<String> {
    tags.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn init(cli: &Cli) -> Result<()> {
    let mut engine = build_engine(cli)?;

    let passphrase = match cli.passphrase {
        Some(ref p) => zeroize::Zeroizing::new(p.clone()),
        None => prompt_new_passphrase("Choose a master passphrase")?,
    };

    engine.create_vault(passphrase.as_bytes())?;
    output::success("Vault created.");
    output::tip("There is no passphrase recovery — store it somewhere safe.");
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn add(
    cli: &Cli,
    service: &str,
    username: &str,
    secret: Option<&str>,
    url: Option<&str>,
    notes: Option<&str>,
    tags: Option<&str>,
) -> Result<()> {
    let mut engine = build_engine(cli)?;
    let session = unlock(cli, &mut engine)?;

    let secret = match secret {
        Some(s) => zeroize::Zeroizing::new(s.to_string()),
        None => zeroize::Zeroizing::new(
            Password::new()
                .with_prompt(format!("Secret for {service}"))
                .interact()
                .map_err(|e| CredVaultError::CommandFailed(format!("secret prompt: {e}")))?,
        ),
    };

    let id = engine.add_credential(
        &session,
        CredentialFields {
            service_name: service.to_string(),
            username: username.to_string(),
            secret: secret.to_string(),
            url: url.map(str::to_string),
            notes: notes.map(str::to_string),
            tags: tags.map(parse_tags).unwrap_or_default(),
        },
    )?;
    engine.logout(&session);

    output::success(&format!("Added credential {id}"));
    Ok(())
}

pub fn get(cli: &Cli, id: &str, copy: bool) -> Result<()> {
    let mut engine = build_engine(cli)?;
    let session = unlock(cli, &mut engine)?;

    let record = engine.get_credential(&session, id)?;
    engine.logout(&session);

    println!("Service:  {}", record.service_name);
    println!("Username: {}", record.username);
    if let Some(ref url) = record.url {
        println!("URL:      {url}");
    }
    if let Some(ref notes) = record.notes {
        println!("Notes:    {notes}");
    }
    if !record.tags.is_empty() {
        let tags: Vec<&str> = record.tags.iter().map(String::as_str).collect();
        println!("Tags:     {}", tags.join(", "));
    }

    if copy {
        let mut clipboard = arboard::Clipboard::new()
            .map_err(|e| CredVaultError::CommandFailed(format!("clipboard: {e}")))?;
        clipboard
            .set_text(record.secret.clone())
            .map_err(|e| CredVaultError::CommandFailed(format!("clipboard: {e}")))?;
        output::success("Secret copied to clipboard.");
    } else {
        println!("Secret:   {}", record.secret);
    }

    Ok(())
}

pub fn list(cli: &Cli) -> Result<()> {
    let mut engine = build_engine(cli)?;
    let session = unlock(cli, &mut engine)?;

    let records = engine.list_credentials(&session)?;
    engine.logout(&session);

    output::print_credentials_table(&records);
    Ok(())
}

pub fn search(cli: &Cli, query: Option<&str>, tags: &[String]) -> Result<()> {
    let mut engine = build_engine(cli)?;
    let session = unlock(cli, &mut engine)?;

    let tags = (!tags.is_empty()).then_some(tags);
    let hits = engine.search(&session, query, tags)?;
    engine.logout(&session);

    output::print_credentials_table(&hits);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn update(
    cli: &Cli,
    id: &str,
    service: Option<&str>,
    username: Option<&str>,
    secret: Option<&str>,
    url: Option<&str>,
    notes: Option<&str>,
    tags: Option<&str>,
) -> Result<()> {
    let mut engine = build_engine(cli)?;
    let session = unlock(cli, &mut engine)?;

    engine.update_credential(
        &session,
        id,
        CredentialPatch {
            service_name: service.map(str::to_string),
            username: username.map(str::to_string),
            secret: secret.map(str::to_string),
            url: url.map(|u| Some(u.to_string())),
            notes: notes.map(|n| Some(n.to_string())),
            tags: tags.map(parse_tags),
        },
    )?;
    engine.logout(&session);

    output::success(&format!("Updated credential {id}"));
    Ok(())
}

pub fn delete(cli: &Cli, id: &str, force: bool) -> Result<()> {
    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete credential {id}?"))
            .default(false)
            .interact()
            .map_err(|e| CredVaultError::CommandFailed(format!("confirm prompt: {e}")))?;
        if !confirmed {
            return Err(CredVaultError::UserCancelled);
        }
    }

    let mut engine = build_engine(cli)?;
    let session = unlock(cli, &mut engine)?;

    engine.delete_credential(&session, id)?;
    engine.logout(&session);

    output::success(&format!("Deleted credential {id}"));
    Ok(())
}

pub fn passwd(cli: &Cli) -> Result<()> {
    let mut engine = build_engine(cli)?;

    let old = resolve_passphrase(cli, "Current master passphrase")?;
    let session = engine.authenticate(old.as_bytes())?;

    let new = prompt_new_passphrase("New master passphrase")?;
    engine.change_passphrase(&session, old.as_bytes(), new.as_bytes())?;
    engine.logout(&session);

    output::success("Master passphrase changed; the vault salt was rotated.");
    Ok(())
}

pub fn export(cli: &Cli, output_path: &str) -> Result<()> {
    let mut engine = build_engine(cli)?;
    let session = unlock(cli, &mut engine)?;

    let export_passphrase = prompt_new_passphrase("Export passphrase")?;
    let blob = engine.export_vault(&session, export_passphrase.as_bytes())?;
    engine.logout(&session);

    std::fs::write(output_path, blob)?;
    output::success(&format!("Exported encrypted bundle to {output_path}"));
    Ok(())
}

pub fn import(cli: &Cli, file: &str) -> Result<()> {
    let blob = std::fs::read(Path::new(file))?;

    let mut engine = build_engine(cli)?;
    let session = unlock(cli, &mut engine)?;

    let bundle_passphrase = zeroize::Zeroizing::new(
        Password::new()
            .with_prompt("Bundle passphrase")
            .interact()
            .map_err(|e| CredVaultError::CommandFailed(format!("passphrase prompt: {e}")))?,
    );

    let count = engine.import_vault(&session, &blob, bundle_passphrase.as_bytes())?;
    engine.logout(&session);

    output::success(&format!("Imported {count} credential(s)."));
    Ok(())
}

pub fn audit(cli: &Cli, last: usize) -> Result<()> {
    let mut engine = build_engine(cli)?;
    let session = unlock(cli, &mut engine)?;

    let entries = engine.read_audit_log(&session, last)?;
    engine.verify_audit_chain(&session)?;
    engine.logout(&session);

    output::print_audit_table(&entries);
    output::success("Audit hash chain verifies.");
    Ok(())
}

pub fn verify(cli: &Cli) -> Result<()> {
    let engine = build_engine(cli)?;
    engine.verify_vault_file()?;
    output::success("Vault file structure is intact.");
    output::tip("This checks the container layout only; content integrity is verified on unlock.");
    Ok(())
}

pub fn completions(shell: &str) -> Result<()> {
    let shell = clap_complete::Shell::from_str(shell)
        .map_err(|_| CredVaultError::CommandFailed(format!("unsupported shell '{shell}'")))?;

    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "credvault", &mut std::io::stdout());
    Ok(())
}
