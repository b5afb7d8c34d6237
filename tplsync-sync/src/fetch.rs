//! Version-control fetch.
//!
//! The synchronizer only needs "put a shallow clone of this repository into
//! this empty directory". [`Fetcher`] is that seam; [`GitFetcher`] implements
//! it by running `git clone --depth 1`. Success is judged by exit status
//! alone; the client's output is captured for diagnostics, never parsed.

use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tplsync_core::types::{RepositoryAddress, DEFAULT_GIT};

use crate::error::FetchFailure;

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Produces a clone of `repository` inside the existing, empty directory `into`.
pub trait Fetcher {
    fn fetch(&self, repository: &RepositoryAddress, into: &Path) -> Result<(), FetchFailure>;
}

impl<F> Fetcher for F
where
    F: Fn(&RepositoryAddress, &Path) -> Result<(), FetchFailure>,
{
    fn fetch(&self, repository: &RepositoryAddress, into: &Path) -> Result<(), FetchFailure> {
        self(repository, into)
    }
}

/// Shallow clone through an external `git` executable.
#[derive(Debug, Clone)]
pub struct GitFetcher {
    program: String,
    timeout: Option<Duration>,
}

impl Default for GitFetcher {
    fn default() -> Self {
        Self {
            program: DEFAULT_GIT.to_string(),
            timeout: None,
        }
    }
}

impl GitFetcher {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            timeout: None,
        }
    }

    /// Kill the clone if it runs longer than `timeout`.
    ///
    /// Only the client process itself is killed and reaped. Helpers it spawned
    /// (such as `git-remote-https`) are outside its reach and can keep writing
    /// into the workspace for a moment while it is being removed.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn command(&self, repository: &RepositoryAddress, into: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(["clone", "--depth", "1", "--quiet"])
            .arg(repository.as_str())
            .arg(into)
            // Never block on a credential prompt.
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        cmd
    }
}

impl Fetcher for GitFetcher {
    fn fetch(&self, repository: &RepositoryAddress, into: &Path) -> Result<(), FetchFailure> {
        tracing::info!("cloning template repository: {repository}");
        let mut child = self
            .command(repository, into)
            .spawn()
            .map_err(|e| FetchFailure::Spawn {
                program: self.program.clone(),
                source: e,
            })?;

        // A full stderr pipe would stall the client, so drain it off-thread.
        let stderr_reader = child.stderr.take().map(|mut pipe| {
            thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = pipe.read_to_end(&mut buf);
                String::from_utf8_lossy(&buf).into_owned()
            })
        });

        // On timeout the reader is detached: helpers spawned by the client may
        // still hold the pipe open.
        let status = wait(&mut child, self.timeout)?;
        let stderr = stderr_reader
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        if status.success() {
            tracing::debug!("clone finished: {}", into.display());
            Ok(())
        } else {
            Err(FetchFailure::Exited {
                code: status.code(),
                stderr,
            })
        }
    }
}

fn wait(child: &mut Child, timeout: Option<Duration>) -> Result<ExitStatus, FetchFailure> {
    let outcome = match timeout {
        Some(timeout) => poll_until(child, timeout),
        None => child.wait().map_err(FetchFailure::Wait),
    };
    if outcome.is_err() {
        // The workspace is removed next; the client must not outlive this call.
        let _ = child.kill();
        let _ = child.wait();
    }
    outcome
}

fn poll_until(child: &mut Child, timeout: Duration) -> Result<ExitStatus, FetchFailure> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait().map_err(FetchFailure::Wait)? {
            return Ok(status);
        }
        if Instant::now() >= deadline {
            tracing::warn!("fetch exceeded {}s, killing client", timeout.as_secs_f64());
            return Err(FetchFailure::TimedOut { after: timeout });
        }
        thread::sleep(POLL_INTERVAL);
    }
}
