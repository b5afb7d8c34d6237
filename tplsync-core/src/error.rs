//! Error types for tplsync-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from loading or resolving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure while reading a config file.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on load, with file path and serde_yaml's line context.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// An explicitly requested config file does not exist.
    #[error("config not found at {path}")]
    ConfigNotFound { path: PathBuf },

    /// The repository address is blank.
    #[error("repository address must not be empty")]
    EmptyRepository,

    /// The template subpath cannot be used inside a clone.
    #[error("invalid template subpath '{}': {reason}", subpath.display())]
    InvalidSubpath {
        subpath: PathBuf,
        reason: &'static str,
    },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}
