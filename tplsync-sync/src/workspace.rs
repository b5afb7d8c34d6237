//! Ephemeral clone workspace.
//!
//! A [`Workspace`] is a uniquely-named temporary directory that exists for
//! exactly one synchronization run. It is an RAII guard: dropping it removes
//! the directory, so every early return and unwinding panic still cleans up.
//! The normal path calls [`Workspace::release`] instead, which reports a
//! removal failure rather than ignoring it.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::error::SyncError;

#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create `<root>/<repo_name>-clone-<random>`.
    pub fn provision(root: &Path, repo_name: &str) -> Result<Self, SyncError> {
        let dir = tempfile::Builder::new()
            .prefix(&format!("{repo_name}-clone-"))
            .tempdir_in(root)
            .map_err(|e| SyncError::WorkspaceCreationFailed {
                root: root.to_path_buf(),
                source: e,
            })?;
        tracing::info!("created temporary workspace: {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Remove the workspace and everything under it.
    ///
    /// A workspace that has already disappeared counts as released.
    pub fn release(self) -> Result<PathBuf, SyncError> {
        let path = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(SyncError::CleanupFailed { path, source: e }),
        }
        tracing::info!("removed temporary workspace: {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provision_uses_repo_name_prefix() {
        let root = TempDir::new().unwrap();
        let ws = Workspace::provision(root.path(), "templates").unwrap();
        let name = ws.path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("templates-clone-"), "got: {name}");
        assert!(ws.path().is_dir());
        assert_eq!(ws.path().parent(), Some(root.path()));
    }

    #[test]
    fn two_workspaces_never_share_a_path() {
        let root = TempDir::new().unwrap();
        let a = Workspace::provision(root.path(), "tpl").unwrap();
        let b = Workspace::provision(root.path(), "tpl").unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn release_removes_populated_tree() {
        let root = TempDir::new().unwrap();
        let ws = Workspace::provision(root.path(), "tpl").unwrap();
        std::fs::create_dir_all(ws.path().join("a/b")).unwrap();
        std::fs::write(ws.path().join("a/b/c.txt"), "x").unwrap();

        let path = ws.release().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn release_tolerates_vanished_directory() {
        let root = TempDir::new().unwrap();
        let ws = Workspace::provision(root.path(), "tpl").unwrap();
        std::fs::remove_dir_all(ws.path()).unwrap();
        assert!(ws.release().is_ok());
    }

    #[test]
    fn drop_removes_directory() {
        let root = TempDir::new().unwrap();
        let path = {
            let ws = Workspace::provision(root.path(), "tpl").unwrap();
            ws.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn provision_in_missing_root_fails() {
        let root = TempDir::new().unwrap();
        let err = Workspace::provision(&root.path().join("absent"), "tpl").unwrap_err();
        assert!(matches!(err, SyncError::WorkspaceCreationFailed { .. }));
    }
}
