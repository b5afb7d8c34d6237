//! `tplsync [DESTINATION]` — resolve settings and run one synchronization.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;

use tplsync_core::{config, Config, Destination};
use tplsync_sync::{synchronize, GitFetcher, SyncOptions};

use crate::output;
use crate::{EXIT_CLEANUP_FAILED, EXIT_FAILURE};

// Flattened into the top-level parser; see `main.rs` for exit codes.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Folder that receives the templates, relative to the current directory.
    /// Defaults to `typescript-cypress-templates`.
    pub destination: Option<PathBuf>,

    /// Repository to clone the templates from.
    #[arg(long, value_name = "URL")]
    pub repo: Option<String>,

    /// Template folder inside the repository.
    #[arg(long, value_name = "PATH")]
    pub subpath: Option<PathBuf>,

    /// Git executable used for the shallow clone.
    #[arg(long, value_name = "PROGRAM")]
    pub git: Option<String>,

    /// Abort the clone after this many seconds (0 disables the limit).
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Read settings from this YAML file instead of ~/.tplsync/config.yaml.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Fetch and validate, but only show what would be copied.
    #[arg(long)]
    pub dry_run: bool,

    /// Emit a machine-readable JSON report on stdout.
    #[arg(long)]
    pub json: bool,
}

impl SyncArgs {
    pub fn run(self) -> Result<ExitCode> {
        let file_config = match &self.config {
            Some(path) => config::load_from(path)
                .with_context(|| format!("failed to load config '{}'", path.display()))?,
            None => config::load().context("failed to load ~/.tplsync/config.yaml")?,
        };
        let settings = file_config.overlay(self.flag_config());

        let source = settings
            .remote_source()
            .context("invalid template source")?;
        let cwd = std::env::current_dir().context("could not determine current directory")?;
        let destination = Destination::resolve(&cwd, &settings.destination_name());
        tracing::debug!(
            repository = %source.repository,
            subpath = %source.subpath,
            destination = %destination,
            git = settings.git_program(),
            "resolved settings"
        );

        let fetcher =
            GitFetcher::new(settings.git_program()).with_timeout(settings.fetch_timeout());
        let options = SyncOptions::new(&fetcher).dry_run(self.dry_run);

        let code = match synchronize(&source, &destination, &options) {
            Ok(report) => {
                let code = if report.cleanup_error().is_some() {
                    ExitCode::from(EXIT_CLEANUP_FAILED)
                } else {
                    ExitCode::SUCCESS
                };
                if self.json {
                    output::print_report_json(&report)?;
                } else {
                    output::print_report(&report);
                }
                code
            }
            Err(err) => {
                if self.json {
                    output::print_error_json(&err)?;
                } else {
                    output::print_error(&err);
                }
                ExitCode::from(EXIT_FAILURE)
            }
        };
        Ok(code)
    }

    fn flag_config(&self) -> Config {
        Config {
            repository: self.repo.clone(),
            subpath: self.subpath.clone(),
            destination: self.destination.clone(),
            git: self.git.clone(),
            fetch_timeout_secs: self.timeout,
        }
    }
}
