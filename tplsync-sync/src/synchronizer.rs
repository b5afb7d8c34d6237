//! The guarded synchronization run.
//!
//! ```text
//! provision ──► fetch ──► validate ──► materialize
//!     │            └──────────┴────────────┴──► release (always)
//!     └─ failure: nothing to release
//! ```
//!
//! The workspace guard is created before anything else can fail, so every
//! exit path after provisioning (errors and panics included) removes it.

use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;

use tplsync_core::{Destination, RemoteSource};

use crate::error::SyncError;
use crate::fetch::Fetcher;
use crate::materialize::{materialize, CopyResult};
use crate::workspace::Workspace;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Collaborators and switches for one run.
pub struct SyncOptions<'a> {
    pub fetcher: &'a dyn Fetcher,
    /// Where the workspace is created. Defaults to the OS temp dir.
    pub temp_root: Option<PathBuf>,
    /// Fetch and validate, but only report what would be copied.
    pub dry_run: bool,
}

impl<'a> SyncOptions<'a> {
    pub fn new(fetcher: &'a dyn Fetcher) -> Self {
        Self {
            fetcher,
            temp_root: None,
            dry_run: false,
        }
    }

    pub fn temp_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.temp_root = Some(root.into());
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// What happened to the workspace at the end of a successful run.
#[derive(Debug)]
pub enum Cleanup {
    Removed,
    Failed(SyncError),
}

impl Serialize for Cleanup {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Cleanup::Removed => {
                let mut s = serializer.serialize_struct("Cleanup", 1)?;
                s.serialize_field("status", "removed")?;
                s.end()
            }
            Cleanup::Failed(err) => {
                let mut s = serializer.serialize_struct("Cleanup", 2)?;
                s.serialize_field("status", "failed")?;
                s.serialize_field("error", &err.to_string())?;
                s.end()
            }
        }
    }
}

/// Outcome of a run whose primary phases all succeeded.
#[derive(Debug, Serialize)]
pub struct SyncReport {
    pub repository: String,
    pub subpath: PathBuf,
    pub destination: PathBuf,
    pub workspace: PathBuf,
    pub dry_run: bool,
    pub files: Vec<CopyResult>,
    pub duration_ms: u128,
    pub cleanup: Cleanup,
}

impl SyncReport {
    /// Files written (or that would be written in a dry run).
    pub fn changed(&self) -> usize {
        self.files
            .iter()
            .filter(|r| {
                matches!(
                    r,
                    CopyResult::Written { .. } | CopyResult::WouldWrite { .. }
                )
            })
            .count()
    }

    pub fn unchanged(&self) -> usize {
        self.files
            .iter()
            .filter(|r| matches!(r, CopyResult::Unchanged { .. }))
            .count()
    }

    /// The `CleanupFailed` error, if the workspace was left behind.
    pub fn cleanup_error(&self) -> Option<&SyncError> {
        match &self.cleanup {
            Cleanup::Removed => None,
            Cleanup::Failed(err) => Some(err),
        }
    }
}

// ---------------------------------------------------------------------------
// synchronize
// ---------------------------------------------------------------------------

/// Fetch the latest templates from `source` and install them into `destination`.
///
/// Returns the primary failure if fetch, validation or copy fails; a cleanup
/// failure on top of it is logged. On success a cleanup failure is carried in
/// [`SyncReport::cleanup`] instead of failing the run.
pub fn synchronize(
    source: &RemoteSource,
    destination: &Destination,
    options: &SyncOptions<'_>,
) -> Result<SyncReport, SyncError> {
    let started = Instant::now();
    let root = options
        .temp_root
        .clone()
        .unwrap_or_else(std::env::temp_dir);

    let workspace = Workspace::provision(&root, &source.repository.repo_name())?;
    let workspace_path = workspace.path().to_path_buf();

    let outcome = fetch_and_materialize(source, destination, workspace.path(), options);
    let released = workspace.release();

    let files = match outcome {
        Ok(files) => files,
        Err(err) => {
            if let Err(cleanup_err) = released {
                tracing::error!("{cleanup_err}; remove it manually");
            }
            return Err(err);
        }
    };

    let cleanup = match released {
        Ok(_) => Cleanup::Removed,
        Err(err) => {
            tracing::error!("{err}; remove it manually");
            Cleanup::Failed(err)
        }
    };

    if options.dry_run {
        tracing::info!("dry run finished, {} left untouched", destination);
    } else {
        tracing::info!("templates updated successfully");
    }

    Ok(SyncReport {
        repository: source.repository.to_string(),
        subpath: source.subpath.as_path().to_path_buf(),
        destination: destination.path().to_path_buf(),
        workspace: workspace_path,
        dry_run: options.dry_run,
        files,
        duration_ms: started.elapsed().as_millis(),
        cleanup,
    })
}

fn fetch_and_materialize(
    source: &RemoteSource,
    destination: &Destination,
    workspace: &Path,
    options: &SyncOptions<'_>,
) -> Result<Vec<CopyResult>, SyncError> {
    options
        .fetcher
        .fetch(&source.repository, workspace)
        .map_err(|reason| SyncError::FetchFailed {
            repository: source.repository.to_string(),
            reason,
        })?;

    let Some(template_dir) = template_dir(workspace, source.subpath.as_path()) else {
        return Err(SyncError::TemplateSubpathMissing {
            repository: source.repository.to_string(),
            subpath: source.subpath.as_path().to_path_buf(),
        });
    };

    materialize(&template_dir, destination.path(), options.dry_run)
}

/// The template folder with symlinks resolved, if it is a directory that
/// stays inside the clone.
fn template_dir(workspace: &Path, subpath: &Path) -> Option<PathBuf> {
    let root = workspace.canonicalize().ok()?;
    let dir = workspace.join(subpath).canonicalize().ok()?;
    if !dir.starts_with(&root) {
        tracing::warn!(
            "template folder {} resolves outside the clone: {}",
            subpath.display(),
            dir.display()
        );
        return None;
    }
    dir.is_dir().then_some(dir)
}
