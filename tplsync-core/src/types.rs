//! Domain types for template synchronization.
//!
//! All path fields use `PathBuf`; never `&str` or `String` for filesystem paths.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Built-in defaults
// ---------------------------------------------------------------------------

/// Repository that hosts the canonical templates.
pub const DEFAULT_REPOSITORY: &str =
    "https://github.com/QualityMinds/openapi-generator-typescript-cypress.git";

/// Folder inside [`DEFAULT_REPOSITORY`] that holds the templates. Also the
/// default destination name.
pub const DEFAULT_SUBPATH: &str = "typescript-cypress-templates";

/// Default version-control client executable.
pub const DEFAULT_GIT: &str = "git";

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Address of a remote repository, as understood by the version-control client.
///
/// Anything `git clone` accepts is allowed (URL, scp-like address, local path);
/// the only constraint enforced here is that it is not blank.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryAddress(String);

impl RepositoryAddress {
    pub fn parse(raw: impl Into<String>) -> Result<Self, ConfigError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::EmptyRepository);
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment of the address without a trailing `.git`.
    ///
    /// `https://host/org/templates.git` → `templates`. Falls back to `repo`
    /// when the address has no usable segment.
    pub fn repo_name(&self) -> String {
        let trimmed = self.0.trim_end_matches(['/', '\\']);
        let last = trimmed
            .rsplit(['/', '\\', ':'])
            .next()
            .unwrap_or_default();
        let name = last.strip_suffix(".git").unwrap_or(last);
        let cleaned: String = name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
            "repo".to_string()
        } else {
            cleaned
        }
    }
}

impl fmt::Display for RepositoryAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Relative path of the template folder inside a fetched repository.
///
/// Must be non-empty, relative, and free of `..` components so that it can
/// never point outside the clone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TemplateSubpath(PathBuf);

impl TemplateSubpath {
    pub fn parse(raw: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let raw = raw.into();
        let invalid = |reason: &'static str| ConfigError::InvalidSubpath {
            subpath: raw.clone(),
            reason,
        };

        let mut normal = PathBuf::new();
        for component in raw.components() {
            match component {
                Component::Normal(part) => normal.push(part),
                Component::CurDir => {}
                Component::ParentDir => return Err(invalid("must not contain '..'")),
                Component::RootDir | Component::Prefix(_) => {
                    return Err(invalid("must be a relative path"))
                }
            }
        }
        if normal.as_os_str().is_empty() {
            return Err(invalid("must name a folder inside the repository"));
        }
        Ok(Self(normal))
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for TemplateSubpath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.display().fmt(f)
    }
}

// ---------------------------------------------------------------------------
// Remote source reference
// ---------------------------------------------------------------------------

/// Where the templates live upstream: a repository plus the folder inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSource {
    pub repository: RepositoryAddress,
    pub subpath: TemplateSubpath,
}

impl RemoteSource {
    pub fn new(repository: RepositoryAddress, subpath: TemplateSubpath) -> Self {
        Self {
            repository,
            subpath,
        }
    }
}

impl Default for RemoteSource {
    fn default() -> Self {
        Self {
            repository: RepositoryAddress(DEFAULT_REPOSITORY.to_owned()),
            subpath: TemplateSubpath(PathBuf::from(DEFAULT_SUBPATH)),
        }
    }
}

// ---------------------------------------------------------------------------
// Destination
// ---------------------------------------------------------------------------

/// Local directory that receives the synchronized templates.
///
/// Owned by the caller: it may not exist yet, or may hold stale content that
/// gets overwritten entry by entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Destination(PathBuf);

impl Destination {
    /// Resolve `name` against `base`. An absolute `name` is used as-is.
    pub fn resolve(base: &Path, name: &Path) -> Self {
        Self(base.join(name))
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl From<PathBuf> for Destination {
    fn from(p: PathBuf) -> Self {
        Self(p)
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.display().fmt(f)
    }
}
