//! Human and JSON rendering of a synchronization outcome.

use anyhow::{Context, Result};
use colored::Colorize;
use serde_json::json;

use tplsync_sync::{CopyResult, SyncError, SyncErrorKind, SyncReport};

pub fn print_report(report: &SyncReport) {
    let prefix = if report.dry_run { "[dry-run] " } else { "" };
    let destination = report.destination.display();

    if report.files.is_empty() {
        println!(
            "{prefix}{} '{}' has no template files",
            "✓".green(),
            report.subpath.display()
        );
    } else {
        println!(
            "{prefix}{} templates {} {destination} ({} {}, {} unchanged)",
            "✓".green(),
            if report.dry_run { "checked against" } else { "updated in" },
            report.changed(),
            if report.dry_run { "to write" } else { "written" },
            report.unchanged(),
        );
    }

    for r in &report.files {
        match r {
            CopyResult::Written { path } => println!("  ✎  {}", path.display()),
            CopyResult::WouldWrite { path } => println!("  ~  {}", path.display()),
            CopyResult::Unchanged { path } => println!("  ·  {}", path.display()),
        }
    }

    if let Some(err) = report.cleanup_error() {
        eprintln!("{} {err}", "warning:".yellow().bold());
        eprintln!(
            "  remove {} manually to reclaim disk space",
            report.workspace.display()
        );
    }
}

pub fn print_error(err: &SyncError) {
    eprintln!("{} {err}", "error:".red().bold());
    if let Some(hint) = hint(err.kind()) {
        eprintln!("  {hint}");
    }
}

fn hint(kind: SyncErrorKind) -> Option<&'static str> {
    match kind {
        SyncErrorKind::FetchFailed => {
            Some("check the repository address, your network and git credentials")
        }
        SyncErrorKind::TemplateSubpathMissing => {
            Some("the destination was left untouched; check --subpath")
        }
        SyncErrorKind::MaterializationFailed => {
            Some("the destination may be partially updated; re-run once the cause is fixed")
        }
        SyncErrorKind::WorkspaceCreationFailed | SyncErrorKind::CleanupFailed => None,
    }
}

pub fn print_report_json(report: &SyncReport) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(report).context("failed to serialize sync report")?
    );
    Ok(())
}

pub fn print_error_json(err: &SyncError) -> Result<()> {
    let payload = json!({
        "error": {
            "kind": err.kind(),
            "message": err.to_string(),
        }
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize error JSON")?
    );
    Ok(())
}
