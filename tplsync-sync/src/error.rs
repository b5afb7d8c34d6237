//! Error types for tplsync-sync.

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// Why the version-control fetch did not produce a clone.
#[derive(Debug, Error)]
pub enum FetchFailure {
    /// The client process could not be started (missing binary, permissions).
    #[error("could not start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Waiting on or killing the client process failed.
    #[error("lost track of the fetch process: {0}")]
    Wait(#[source] std::io::Error),

    /// The client exited with a non-zero status.
    #[error("{}{}", exit_label(*code), stderr_suffix(stderr))]
    Exited { code: Option<i32>, stderr: String },

    /// The caller-supplied timeout elapsed and the process was killed.
    #[error("timed out after {}s", after.as_secs_f64())]
    TimedOut { after: Duration },
}

fn exit_label(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exited with status {code}"),
        None => "terminated by signal".to_string(),
    }
}

fn stderr_suffix(stderr: &str) -> String {
    let last = stderr.lines().rev().find(|l| !l.trim().is_empty());
    match last {
        Some(line) => format!(": {}", line.trim()),
        None => String::new(),
    }
}

/// Classification of a failed synchronization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncErrorKind {
    WorkspaceCreationFailed,
    FetchFailed,
    TemplateSubpathMissing,
    MaterializationFailed,
    CleanupFailed,
}

/// All errors that can arise from a synchronization run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// No temporary workspace could be allocated. Nothing needs cleanup.
    #[error("could not create temporary workspace under {root}: {source}")]
    WorkspaceCreationFailed {
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The shallow clone failed.
    #[error("failed to fetch {repository}: {reason}")]
    FetchFailed {
        repository: String,
        #[source]
        reason: FetchFailure,
    },

    /// The clone succeeded but has no template folder at the expected subpath.
    #[error("template folder '{}' not found in {repository}", subpath.display())]
    TemplateSubpathMissing { repository: String, subpath: PathBuf },

    /// Copying into the destination failed; it may be partially updated.
    #[error("failed to copy templates at {path}: {source}")]
    MaterializationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The temporary workspace could not be removed and is left on disk.
    #[error("failed to remove temporary workspace {path}: {source}")]
    CleanupFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SyncError {
    pub fn kind(&self) -> SyncErrorKind {
        match self {
            SyncError::WorkspaceCreationFailed { .. } => SyncErrorKind::WorkspaceCreationFailed,
            SyncError::FetchFailed { .. } => SyncErrorKind::FetchFailed,
            SyncError::TemplateSubpathMissing { .. } => SyncErrorKind::TemplateSubpathMissing,
            SyncError::MaterializationFailed { .. } => SyncErrorKind::MaterializationFailed,
            SyncError::CleanupFailed { .. } => SyncErrorKind::CleanupFailed,
        }
    }
}

/// Convenience constructor for [`SyncError::MaterializationFailed`].
pub(crate) fn copy_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::MaterializationFailed {
        path: path.into(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exited_message_uses_last_stderr_line() {
        let failure = FetchFailure::Exited {
            code: Some(128),
            stderr: "Cloning into '/tmp/x'...\nfatal: repository not found\n\n".to_string(),
        };
        assert_eq!(
            failure.to_string(),
            "exited with status 128: fatal: repository not found"
        );
    }

    #[test]
    fn exited_without_stderr_or_code() {
        let failure = FetchFailure::Exited {
            code: None,
            stderr: String::new(),
        };
        assert_eq!(failure.to_string(), "terminated by signal");
    }

    #[test]
    fn kind_matches_variant() {
        let err = SyncError::TemplateSubpathMissing {
            repository: "r".into(),
            subpath: PathBuf::from("t"),
        };
        assert_eq!(err.kind(), SyncErrorKind::TemplateSubpathMissing);
        assert!(err.to_string().contains("'t'"));
    }
}
