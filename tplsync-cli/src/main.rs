//! tplsync — refresh a local copy of code-generation templates.
//!
//! # Usage
//!
//! ```text
//! tplsync [DESTINATION] [--repo <URL>] [--subpath <PATH>] [--git <PROGRAM>]
//!         [--timeout <SECS>] [--config <FILE>] [--dry-run] [--json] [-v | -q]
//! ```
//!
//! # Exit codes
//!
//! | code | meaning |
//! |------|---------|
//! | 0 | templates synchronized, workspace removed |
//! | 1 | sync failed or configuration invalid |
//! | 2 | invalid command line |
//! | 3 | templates synchronized, but the temporary workspace was left behind |

mod output;
mod sync;

use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;

use sync::SyncArgs;

pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_CLEANUP_FAILED: u8 = 3;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "tplsync",
    version,
    about = "Fetch the latest code-generation templates into a local folder",
    long_about = None,
)]
struct Cli {
    #[command(flatten)]
    sync: SyncArgs,

    /// Log debug detail to stderr.
    #[arg(long, short = 'v', conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors to stderr.
    #[arg(long, short = 'q')]
    quiet: bool,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match cli.sync.run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{} {err:#}", "error:".red().bold());
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

fn init_tracing(verbose: bool, quiet: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
