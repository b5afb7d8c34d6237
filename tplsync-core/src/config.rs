//! Optional YAML configuration.
//!
//! # Storage layout
//!
//! ```text
//! ~/.tplsync/
//!   config.yaml   (optional, every key may be omitted)
//! ```
//!
//! ```yaml
//! repository: https://github.com/acme/templates.git
//! subpath: typescript-cypress-templates
//! destination: templates
//! git: /usr/local/bin/git
//! fetch_timeout_secs: 120
//! ```
//!
//! # API pattern
//!
//! - `load_at(home)` — explicit home; used in tests with `TempDir`
//! - `load()` — derives home from `dirs::home_dir()`, delegates to `load_at`
//!
//! Settings resolve as: command-line flag > config file > built-in default.
//! The CLI expresses its flags as a second [`Config`] and calls
//! [`Config::overlay`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{io_err, ConfigError};
use crate::types::{
    RemoteSource, RepositoryAddress, TemplateSubpath, DEFAULT_GIT, DEFAULT_REPOSITORY,
    DEFAULT_SUBPATH,
};

pub const CONFIG_DIR: &str = ".tplsync";
pub const CONFIG_FILE: &str = "config.yaml";

/// User-tunable settings. `None` means "not set here".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub repository: Option<String>,
    pub subpath: Option<PathBuf>,
    pub destination: Option<PathBuf>,
    pub git: Option<String>,
    pub fetch_timeout_secs: Option<u64>,
}

impl Config {
    /// Field-wise merge where every value set in `other` wins.
    pub fn overlay(self, other: Config) -> Config {
        Config {
            repository: other.repository.or(self.repository),
            subpath: other.subpath.or(self.subpath),
            destination: other.destination.or(self.destination),
            git: other.git.or(self.git),
            fetch_timeout_secs: other.fetch_timeout_secs.or(self.fetch_timeout_secs),
        }
    }

    /// Validated remote source, falling back to the built-in defaults.
    pub fn remote_source(&self) -> Result<RemoteSource, ConfigError> {
        let repository =
            RepositoryAddress::parse(self.repository.as_deref().unwrap_or(DEFAULT_REPOSITORY))?;
        let subpath = TemplateSubpath::parse(
            self.subpath
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SUBPATH)),
        )?;
        Ok(RemoteSource::new(repository, subpath))
    }

    /// Destination name, relative to the working directory unless absolute.
    pub fn destination_name(&self) -> PathBuf {
        self.destination
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SUBPATH))
    }

    pub fn git_program(&self) -> &str {
        self.git.as_deref().unwrap_or(DEFAULT_GIT)
    }

    /// `None` (or `0`) disables the fetch timeout.
    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

/// `<home>/.tplsync/config.yaml`. Pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    home.join(CONFIG_DIR).join(CONFIG_FILE)
}

/// Load `<home>/.tplsync/config.yaml`, or the default config if it is absent.
pub fn load_at(home: &Path) -> Result<Config, ConfigError> {
    let path = config_path_at(home);
    if !path.exists() {
        return Ok(Config::default());
    }
    load_from(&path)
}

/// `load_at` convenience wrapper. Without a home directory there is no
/// config file to read, so the defaults apply.
pub fn load() -> Result<Config, ConfigError> {
    match dirs::home_dir() {
        Some(home) => load_at(&home),
        None => Ok(Config::default()),
    }
}

/// Load an explicitly named config file, which must exist.
///
/// An empty file yields the default config.
pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::ConfigNotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    if contents.trim().is_empty() {
        return Ok(Config::default());
    }
    serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}
