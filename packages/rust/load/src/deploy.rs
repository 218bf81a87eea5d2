//! Publishing a rendered directory to its deployment target.
//!
//! **Switch protocol:**
//! 1. Stage the new content at `.<name>.staging-<uuid>` next to the target
//!    (rename, or recursive copy when `copy` is set).
//! 2. Move the current target aside: to `<name>.<YYYYmmddTHHMMSS>[-n]` when
//!    archiving a non-empty target, else to `.<name>.old-<uuid>`.
//! 3. Rename the staging directory onto the target. On failure the previous
//!    target is moved back.
//! 4. Remove the `.old` directory, and in copy mode the source.
//!
//! Readers of the target see either the old or the new content, never a mix.

use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use curator_shared::{CuratorError, DeploymentTarget, Result};

/// Result of a successful deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployOutcome {
    /// The published target directory.
    pub path: PathBuf,
    /// Where the previous deployment was archived, if it was.
    pub backup: Option<PathBuf>,
}

/// Publishes a built site directory.
pub trait Deployer {
    /// Move or copy `source` into place as `target.path`. `source` is consumed.
    fn deploy(&self, source: &Path, target: &DeploymentTarget) -> Result<DeployOutcome>;
}

/// Filesystem deployer implementing the staged switch.
#[derive(Debug, Clone, Default)]
pub struct FsDeployer;

impl Deployer for FsDeployer {
    #[instrument(skip_all, fields(target = %target.path.display(), archive = target.archive, copy = target.copy))]
    fn deploy(&self, source: &Path, target: &DeploymentTarget) -> Result<DeployOutcome> {
        let dest = &target.path;
        if dest.exists() && !dest.is_dir() {
            return Err(CuratorError::filesystem(dest, "deployment target exists and is not a directory"));
        }
        if !source.is_dir() {
            return Err(CuratorError::deployment(source, "rendered site directory is missing"));
        }

        let name = dest
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| CuratorError::deployment(dest, "deployment target has no directory name"))?;
        let parent = match dest.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent).map_err(|e| CuratorError::io(&parent, e))?;

        // Step 1: stage next to the target.
        let staging = parent.join(format!(".{name}.staging-{}", Uuid::now_v7()));
        stage(source, &staging, target.copy)?;

        // Step 2: move the previous deployment aside.
        let previous = if dest.exists() {
            let archive = target.archive && !is_empty_dir(dest)?;
            let aside = if archive {
                backup_path(&parent, &name)
            } else {
                parent.join(format!(".{name}.old-{}", Uuid::now_v7()))
            };
            if let Err(e) = std::fs::rename(dest, &aside) {
                remove_quietly(&staging);
                return Err(CuratorError::deployment(
                    dest,
                    format!("could not move previous deployment aside: {e}"),
                ));
            }
            debug!(from = %dest.display(), to = %aside.display(), "moved previous deployment aside");
            Some((aside, archive))
        } else {
            None
        };

        // Step 3: switch.
        if let Err(e) = std::fs::rename(&staging, dest) {
            if let Some((aside, _)) = &previous {
                if let Err(restore) = std::fs::rename(aside, dest) {
                    warn!(
                        aside = %aside.display(),
                        error = %restore,
                        "could not restore previous deployment"
                    );
                }
            }
            remove_quietly(&staging);
            return Err(CuratorError::deployment(dest, format!("switch failed: {e}")));
        }

        if target.copy {
            remove_quietly(source);
        }

        // Step 4: drop the replaced deployment unless it was archived.
        let backup = match previous {
            Some((aside, true)) => Some(aside),
            Some((aside, false)) => {
                remove_quietly(&aside);
                None
            }
            None => None,
        };

        info!(
            path = %dest.display(),
            backup = ?backup,
            "deployed site"
        );
        Ok(DeployOutcome {
            path: dest.clone(),
            backup,
        })
    }
}

fn stage(source: &Path, staging: &Path, copy: bool) -> Result<()> {
    if copy {
        if let Err(e) = copy_dir_recursive(source, staging) {
            remove_quietly(staging);
            return Err(e);
        }
        return Ok(());
    }

    std::fs::rename(source, staging).map_err(|e| {
        CuratorError::deployment(
            source,
            format!("rename into place failed ({e}); enable copy when the target is on another filesystem"),
        )
    })
}

/// Recursively copy a directory tree. Symlinks are copied as the files they point to.
pub fn copy_dir_recursive(from: &Path, to: &Path) -> Result<()> {
    std::fs::create_dir_all(to).map_err(|e| CuratorError::io(to, e))?;
    let entries = std::fs::read_dir(from).map_err(|e| CuratorError::io(from, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| CuratorError::io(from, e))?;
        let src = entry.path();
        let dst = to.join(entry.file_name());
        if src.is_dir() {
            copy_dir_recursive(&src, &dst)?;
        } else {
            std::fs::copy(&src, &dst).map_err(|e| CuratorError::io(&src, e))?;
        }
    }
    Ok(())
}

/// `<parent>/<name>.<YYYYmmddTHHMMSS>`, suffixed `-1`, `-2`, ... when taken.
fn backup_path(parent: &Path, name: &str) -> PathBuf {
    let stamp = Local::now().format("%Y%m%dT%H%M%S");
    let base = parent.join(format!("{name}.{stamp}"));
    if !base.exists() {
        return base;
    }
    (1..)
        .map(|n| parent.join(format!("{name}.{stamp}-{n}")))
        .find(|candidate| !candidate.exists())
        .unwrap_or(base)
}

fn is_empty_dir(path: &Path) -> Result<bool> {
    let mut entries = std::fs::read_dir(path).map_err(|e| CuratorError::io(path, e))?;
    Ok(entries.next().is_none())
}

fn remove_quietly(path: &Path) {
    if path.exists() {
        if let Err(e) = std::fs::remove_dir_all(path) {
            warn!(path = %path.display(), error = %e, "could not remove directory");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("curator-deploy-test-{}", Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn rendered(root: &Path, marker: &str) -> PathBuf {
        let dir = root.join(format!("work-{marker}"));
        std::fs::create_dir_all(dir.join("entities")).unwrap();
        std::fs::write(dir.join("index.html"), marker).unwrap();
        std::fs::write(dir.join("entities/a.html"), marker).unwrap();
        dir
    }

    fn target(path: PathBuf, archive: bool, copy: bool) -> DeploymentTarget {
        DeploymentTarget {
            path,
            archive,
            copy,
            dev: false,
            base_url_path: None,
        }
    }

    fn siblings(root: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(root)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn fresh_target_by_rename() {
        let tmp = temp_dir();
        let source = rendered(&tmp, "new");
        let dest = tmp.join("site");

        let outcome = FsDeployer.deploy(&source, &target(dest.clone(), false, false)).unwrap();
        assert_eq!(outcome, DeployOutcome { path: dest.clone(), backup: None });
        assert_eq!(std::fs::read_to_string(dest.join("index.html")).unwrap(), "new");
        assert!(!source.exists());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn replace_without_archive_leaves_no_leftovers() {
        let tmp = temp_dir();
        let dest = tmp.join("site");
        std::fs::create_dir_all(&dest).unwrap();
        std::fs::write(dest.join("stale.html"), "old").unwrap();

        let source = rendered(&tmp, "new");
        FsDeployer.deploy(&source, &target(dest.clone(), false, false)).unwrap();

        assert!(!dest.join("stale.html").exists());
        assert_eq!(siblings(&tmp), vec!["site".to_string()]);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn archive_keeps_previous_deployment() {
        let tmp = temp_dir();
        let dest = tmp.join("site");
        std::fs::create_dir_all(&dest).unwrap();
        std::fs::write(dest.join("index.html"), "old").unwrap();

        let source = rendered(&tmp, "new");
        let outcome = FsDeployer.deploy(&source, &target(dest.clone(), true, false)).unwrap();

        let backup = outcome.backup.expect("backup path");
        assert_ne!(backup, dest);
        assert!(backup.file_name().unwrap().to_string_lossy().starts_with("site."));
        assert_eq!(std::fs::read_to_string(backup.join("index.html")).unwrap(), "old");
        assert_eq!(std::fs::read_to_string(dest.join("index.html")).unwrap(), "new");

        // A second archive within the same second gets a distinct path.
        let source = rendered(&tmp, "newer");
        let second = FsDeployer.deploy(&source, &target(dest.clone(), true, false)).unwrap();
        let second_backup = second.backup.expect("second backup");
        assert_ne!(second_backup, backup);
        assert_eq!(std::fs::read_to_string(second_backup.join("index.html")).unwrap(), "new");

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn empty_target_is_not_archived() {
        let tmp = temp_dir();
        let dest = tmp.join("site");
        std::fs::create_dir_all(&dest).unwrap();

        let source = rendered(&tmp, "new");
        let outcome = FsDeployer.deploy(&source, &target(dest.clone(), true, false)).unwrap();
        assert!(outcome.backup.is_none());
        assert_eq!(siblings(&tmp), vec!["site".to_string()]);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn copy_mode_copies_then_removes_source() {
        let tmp = temp_dir();
        let source = rendered(&tmp, "new");
        let dest = tmp.join("nested/site");

        FsDeployer.deploy(&source, &target(dest.clone(), false, true)).unwrap();
        assert_eq!(std::fs::read_to_string(dest.join("entities/a.html")).unwrap(), "new");
        assert!(!source.exists());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[cfg(unix)]
    #[test]
    fn failed_copy_leaves_target_and_source_intact() {
        let tmp = temp_dir();
        let dest = tmp.join("site");
        std::fs::create_dir_all(&dest).unwrap();
        std::fs::write(dest.join("index.html"), "old").unwrap();

        let source = rendered(&tmp, "new");
        std::os::unix::fs::symlink(tmp.join("nowhere"), source.join("broken.html")).unwrap();

        let err = FsDeployer.deploy(&source, &target(dest.clone(), true, true)).unwrap_err();
        assert!(matches!(err, CuratorError::Io { .. } | CuratorError::Deployment { .. }), "{err}");

        assert_eq!(std::fs::read_to_string(dest.join("index.html")).unwrap(), "old");
        assert!(source.join("index.html").is_file());
        assert_eq!(siblings(&tmp), vec!["site".to_string(), "work-new".to_string()]);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn file_target_is_filesystem_error() {
        let tmp = temp_dir();
        let dest = tmp.join("site");
        std::fs::write(&dest, "not a dir").unwrap();

        let source = rendered(&tmp, "new");
        let err = FsDeployer.deploy(&source, &target(dest.clone(), false, false)).unwrap_err();
        assert!(matches!(err, CuratorError::Filesystem { .. }));
        assert!(source.exists());
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "not a dir");

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn missing_source_is_deployment_error() {
        let tmp = temp_dir();
        let err = FsDeployer
            .deploy(&tmp.join("nope"), &target(tmp.join("site"), false, false))
            .unwrap_err();
        assert!(matches!(err, CuratorError::Deployment { .. }));

        let _ = std::fs::remove_dir_all(&tmp);
    }
}
