//! Copy a validated template tree into the destination.
//!
//! ## Protocol
//!
//! 1. Walk the template folder without following symlinks, entries sorted by
//!    name.
//! 2. Mirror every directory under the destination.
//! 3. Recreate every symlink as a symlink with the same target text. The
//!    link is never dereferenced, so nothing outside the clone is read.
//! 4. SHA-256 hash each template file and the destination file at the same
//!    relative path, if any.
//! 5. Identical hash and permissions → skip. Identical hash only → refresh the
//!    permissions. Otherwise copy over the destination file.
//!
//! Destination entries absent from the template tree are never touched.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::error::{copy_err, SyncError};

// ---------------------------------------------------------------------------
// Copy result
// ---------------------------------------------------------------------------

/// Outcome of an individual template file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CopyResult {
    /// Destination file was created or overwritten.
    Written { path: PathBuf },
    /// Destination entry already had identical content and permissions.
    Unchanged { path: PathBuf },
    /// `--dry-run` mode: the file *would* have been written.
    WouldWrite { path: PathBuf },
}

impl CopyResult {
    pub fn path(&self) -> &Path {
        match self {
            CopyResult::Written { path }
            | CopyResult::Unchanged { path }
            | CopyResult::WouldWrite { path } => path,
        }
    }
}

// ---------------------------------------------------------------------------
// materialize
// ---------------------------------------------------------------------------

/// Copy every entry under `source` into `destination`, creating it if needed.
///
/// In `dry_run` mode nothing under `destination` is created or modified.
/// A failure partway through leaves the files copied so far in place.
pub fn materialize(
    source: &Path,
    destination: &Path,
    dry_run: bool,
) -> Result<Vec<CopyResult>, SyncError> {
    tracing::info!("copying templates to: {}", destination.display());

    if !dry_run {
        fs::create_dir_all(destination).map_err(|e| copy_err(destination, e))?;
    }

    let mut results = Vec::new();
    for entry in WalkDir::new(source)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(source).to_path_buf();
            copy_err(path, e.into())
        })?;
        let relative = entry.path().strip_prefix(source).map_err(|e| {
            copy_err(entry.path(), io::Error::new(io::ErrorKind::InvalidInput, e))
        })?;
        let target = destination.join(relative);
        let file_type = entry.file_type();

        if file_type.is_symlink() {
            results.push(copy_link(entry.path(), &target, dry_run)?);
            continue;
        }

        if file_type.is_dir() {
            if !dry_run {
                remove_stale_link(&target)?;
                fs::create_dir_all(&target).map_err(|e| copy_err(&target, e))?;
            }
            continue;
        }

        results.push(copy_file(entry.path(), &target, dry_run)?);
    }
    Ok(results)
}

fn copy_file(source: &Path, target: &Path, dry_run: bool) -> Result<CopyResult, SyncError> {
    let existing = fs::symlink_metadata(target).ok().filter(|m| m.is_file());
    if let Some(current) = existing {
        if digest(source)? == digest(target)? {
            let wanted = fs::metadata(source)
                .map_err(|e| copy_err(source, e))?
                .permissions();
            if current.permissions() == wanted {
                tracing::debug!("unchanged: {}", target.display());
                return Ok(CopyResult::Unchanged {
                    path: target.to_path_buf(),
                });
            }
            if dry_run {
                return Ok(would_write(target));
            }
            fs::set_permissions(target, wanted).map_err(|e| copy_err(target, e))?;
            tracing::debug!("refreshed permissions: {}", target.display());
            return Ok(CopyResult::Written {
                path: target.to_path_buf(),
            });
        }
    }

    if dry_run {
        return Ok(would_write(target));
    }

    // Writing through a link left by an earlier run would land outside the
    // destination.
    remove_stale_link(target)?;
    fs::copy(source, target).map_err(|e| copy_err(target, e))?;
    tracing::debug!("wrote: {}", target.display());
    Ok(CopyResult::Written {
        path: target.to_path_buf(),
    })
}

fn copy_link(source: &Path, target: &Path, dry_run: bool) -> Result<CopyResult, SyncError> {
    let link = fs::read_link(source).map_err(|e| copy_err(source, e))?;
    let existing = fs::symlink_metadata(target).ok();

    if let Some(current) = &existing {
        if current.file_type().is_symlink()
            && fs::read_link(target).ok().as_deref() == Some(link.as_path())
        {
            tracing::debug!("unchanged: {}", target.display());
            return Ok(CopyResult::Unchanged {
                path: target.to_path_buf(),
            });
        }
    }

    if dry_run {
        return Ok(would_write(target));
    }

    match existing {
        Some(current) if current.is_dir() => {
            return Err(copy_err(
                target,
                io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("a directory is in the way of symlink -> {}", link.display()),
                ),
            ));
        }
        Some(_) => fs::remove_file(target).map_err(|e| copy_err(target, e))?,
        None => {}
    }

    symlink(&link, target).map_err(|e| copy_err(target, e))?;
    tracing::debug!("linked: {} -> {}", target.display(), link.display());
    Ok(CopyResult::Written {
        path: target.to_path_buf(),
    })
}

#[cfg(unix)]
fn symlink(link: &Path, target: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(link, target)
}

#[cfg(not(unix))]
fn symlink(_link: &Path, _target: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "symlinks in templates are only supported on unix",
    ))
}

fn remove_stale_link(target: &Path) -> Result<(), SyncError> {
    match fs::symlink_metadata(target) {
        Ok(meta) if meta.file_type().is_symlink() => {
            fs::remove_file(target).map_err(|e| copy_err(target, e))
        }
        _ => Ok(()),
    }
}

fn would_write(target: &Path) -> CopyResult {
    tracing::info!("[dry-run] would write: {}", target.display());
    CopyResult::WouldWrite {
        path: target.to_path_buf(),
    }
}

fn digest(path: &Path) -> Result<String, SyncError> {
    let bytes = fs::read(path).map_err(|e| copy_err(path, e))?;
    let mut h = Sha256::new();
    h.update(&bytes);
    Ok(hex::encode(h.finalize()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tree(root: &Path, files: &[(&str, &str)]) {
        for (rel, content) in files {
            let path = root.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
    }

    #[test]
    fn copies_nested_tree_into_missing_destination() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        tree(
            src.path(),
            &[("api.mustache", "api"), ("model/model.mustache", "model")],
        );
        let dest = out.path().join("templates");

        let results = materialize(src.path(), &dest, false).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results
            .iter()
            .all(|r| matches!(r, CopyResult::Written { .. })));
        assert_eq!(fs::read_to_string(dest.join("api.mustache")).unwrap(), "api");
        assert_eq!(
            fs::read_to_string(dest.join("model/model.mustache")).unwrap(),
            "model"
        );
    }

    #[test]
    fn empty_directories_are_mirrored() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        fs::create_dir_all(src.path().join("partials/empty")).unwrap();

        let results = materialize(src.path(), out.path(), false).unwrap();
        assert!(results.is_empty());
        assert!(out.path().join("partials/empty").is_dir());
    }

    #[test]
    fn identical_file_is_unchanged_and_different_file_is_overwritten() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        tree(src.path(), &[("same.txt", "same"), ("diff.txt", "new")]);
        tree(out.path(), &[("same.txt", "same"), ("diff.txt", "old")]);

        let results = materialize(src.path(), out.path(), false).unwrap();
        assert_eq!(
            results,
            vec![
                CopyResult::Written {
                    path: out.path().join("diff.txt")
                },
                CopyResult::Unchanged {
                    path: out.path().join("same.txt")
                },
            ]
        );
        assert_eq!(fs::read_to_string(out.path().join("diff.txt")).unwrap(), "new");
    }

    #[test]
    fn orphaned_destination_files_are_left_alone() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        tree(src.path(), &[("a.txt", "a")]);
        tree(out.path(), &[("local-only.txt", "mine")]);

        materialize(src.path(), out.path(), false).unwrap();
        assert_eq!(
            fs::read_to_string(out.path().join("local-only.txt")).unwrap(),
            "mine"
        );
    }

    #[test]
    fn dry_run_writes_nothing() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        tree(src.path(), &[("a.txt", "a"), ("sub/b.txt", "b")]);
        let dest = out.path().join("never");

        let results = materialize(src.path(), &dest, true).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results
            .iter()
            .all(|r| matches!(r, CopyResult::WouldWrite { .. })));
        assert!(!dest.exists(), "dry-run must not create the destination");
    }

    #[test]
    fn file_in_place_of_destination_is_a_materialization_failure() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        tree(src.path(), &[("a.txt", "a")]);
        let dest = out.path().join("blocked");
        fs::write(&dest, "not a directory").unwrap();

        let err = materialize(src.path(), &dest, false).unwrap_err();
        assert!(matches!(err, SyncError::MaterializationFailed { .. }), "got: {err}");
    }

    #[test]
    #[cfg(unix)]
    fn dangling_symlink_is_recreated_as_is() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        std::os::unix::fs::symlink("missing", src.path().join("dangling")).unwrap();

        let results = materialize(src.path(), out.path(), false).unwrap();
        assert_eq!(
            results,
            vec![CopyResult::Written {
                path: out.path().join("dangling")
            }]
        );
        assert_eq!(
            fs::read_link(out.path().join("dangling")).unwrap(),
            Path::new("missing")
        );
    }

    #[test]
    #[cfg(unix)]
    fn link_to_host_file_is_not_dereferenced() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let host = TempDir::new().unwrap();
        let secret = host.path().join("id_rsa");
        fs::write(&secret, "HOST-SECRET").unwrap();
        std::os::unix::fs::symlink(&secret, src.path().join("leak.txt")).unwrap();

        materialize(src.path(), out.path(), false).unwrap();

        let copied = out.path().join("leak.txt");
        assert!(fs::symlink_metadata(&copied).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_link(&copied).unwrap(), secret);
    }

    #[test]
    #[cfg(unix)]
    fn link_to_ancestor_directory_does_not_loop() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        tree(src.path(), &[("sub/a.txt", "a")]);
        std::os::unix::fs::symlink("..", src.path().join("sub/up")).unwrap();

        let results = materialize(src.path(), out.path(), false).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(fs::read_link(out.path().join("sub/up")).unwrap(), Path::new(".."));

        let again = materialize(src.path(), out.path(), false).unwrap();
        assert!(again
            .iter()
            .all(|r| matches!(r, CopyResult::Unchanged { .. })));
    }

    #[test]
    #[cfg(unix)]
    fn stale_destination_link_is_replaced_not_written_through() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let elsewhere = TempDir::new().unwrap();
        let victim = elsewhere.path().join("victim.txt");
        fs::write(&victim, "untouched").unwrap();
        tree(src.path(), &[("a.txt", "alpha")]);
        std::os::unix::fs::symlink(&victim, out.path().join("a.txt")).unwrap();

        materialize(src.path(), out.path(), false).unwrap();

        let a = out.path().join("a.txt");
        assert!(!fs::symlink_metadata(&a).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_to_string(a).unwrap(), "alpha");
        assert_eq!(fs::read_to_string(victim).unwrap(), "untouched");
    }

    #[test]
    #[cfg(unix)]
    fn permission_change_alone_is_applied() {
        use std::os::unix::fs::PermissionsExt;

        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        tree(src.path(), &[("run.sh", "#!/bin/sh\n")]);
        tree(out.path(), &[("run.sh", "#!/bin/sh\n")]);
        fs::set_permissions(src.path().join("run.sh"), fs::Permissions::from_mode(0o755))
            .unwrap();
        fs::set_permissions(out.path().join("run.sh"), fs::Permissions::from_mode(0o644))
            .unwrap();

        let dry = materialize(src.path(), out.path(), true).unwrap();
        assert!(matches!(dry[0], CopyResult::WouldWrite { .. }));

        let results = materialize(src.path(), out.path(), false).unwrap();
        assert!(matches!(results[0], CopyResult::Written { .. }));
        let mode = fs::metadata(out.path().join("run.sh")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);

        let again = materialize(src.path(), out.path(), false).unwrap();
        assert!(matches!(again[0], CopyResult::Unchanged { .. }));
    }
}
