//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::audit::AuditEntry;
use crate::vault::CredentialRecord;

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Print a table of credentials (Id, Service, Username, Tags, Updated).
/// Secrets are never shown here.
pub fn print_credentials_table(records: &[CredentialRecord]) {
    if records.is_empty() {
        info("No credentials in this vault yet.");
        tip("Run `credvault add <SERVICE> <USERNAME>` to add your first credential.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Id", "Service", "Username", "Tags", "Updated"]);

    for r in records {
        table.add_row(vec![
            r.id.clone(),
            r.service_name.clone(),
            r.username.clone(),
            r.tags.iter().cloned().collect::<Vec<_>>().join(", "),
            r.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ]);
    }

    println!("{table}");
}

/// Print a table of audit entries (Seq, Time, Event, Subject).
pub fn print_audit_table(entries: &[AuditEntry]) {
    if entries.is_empty() {
        info("No audit entries recorded.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Seq", "Time", "Event", "Subject"]);

    for e in entries {
        table.add_row(vec![
            e.sequence.to_string(),
            e.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            e.event.to_string(),
            e.subject.clone().unwrap_or_default(),
        ]);
    }

    println!("{table}");
}
