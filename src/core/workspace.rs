//! Workspace management for publish attempts.
//!
//! A workspace is a throwaway local clone of one remote branch:
//! - placed under a unique directory name (repo name + microsecond stamp + ULID),
//!   which is the only isolation between concurrent publishers
//! - populated by a shallow clone, falling back to full clone + checkout, and
//!   creating the branch locally when the remote does not have it
//! - configured with the commit identity before anything is written
//! - removed on every exit path: explicitly via [`Workspace::release`], or by
//!   `Drop` if the owner bails out early

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use ulid::Ulid;

use crate::core::error::{Result, ScoutError};
use crate::core::remote::{RemoteRepo, Secret};
use crate::core::time;
use crate::core::vcs::{CommitIdentity, VcsClient};

const DIR_PREFIX: &str = "scraper_clone";

/// Exclusively owned local mirror of a remote branch.
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
    released: bool,
}

impl Workspace {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Recursively removes the directory. Failure is logged, never raised;
    /// returns whether the directory is gone afterwards.
    pub fn release(mut self) -> bool {
        self.released = true;
        remove_tree(&self.path)
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if !self.released {
            self.released = true;
            remove_tree(&self.path);
        }
    }
}

fn remove_tree(path: &Path) -> bool {
    if !path.exists() {
        return true;
    }
    match fs::remove_dir_all(path) {
        Ok(()) => {
            info!(path = %path.display(), "removed workspace");
            true
        }
        Err(e) => {
            warn!(path = %path.display(), "could not remove workspace: {e}");
            false
        }
    }
}

pub struct WorkspaceManager<'a> {
    vcs: &'a dyn VcsClient,
    root: PathBuf,
    identity: CommitIdentity,
}

impl<'a> WorkspaceManager<'a> {
    pub fn new(vcs: &'a dyn VcsClient, root: impl Into<PathBuf>, identity: CommitIdentity) -> Self {
        Self {
            vcs,
            root: root.into(),
            identity,
        }
    }

    /// Unique directory for one publish attempt; not created here.
    pub fn unique_path(&self, remote: &RemoteRepo) -> PathBuf {
        let stamp = time::workspace_stamp(&time::now_utc());
        self.root.join(format!(
            "{DIR_PREFIX}_{}_{stamp}_{}",
            remote.name(),
            Ulid::new()
        ))
    }

    /// Clones `branch` of `remote` into a fresh workspace. On error nothing is
    /// left on disk.
    pub fn acquire(
        &self,
        remote: &RemoteRepo,
        token: Option<&Secret>,
        branch: &str,
    ) -> Result<Workspace> {
        fs::create_dir_all(&self.root)?;
        let path = self.unique_path(remote);
        if path.exists() {
            info!(path = %path.display(), "removing existing clone directory");
            remove_tree(&path);
        }

        // From here on the guard owns the path; any early return cleans it up.
        let workspace = Workspace {
            path,
            released: false,
        };
        let clone_url = remote.clone_url(token)?;

        info!(remote = %remote, branch, path = %workspace.path.display(), "cloning");
        if let Err(shallow_err) = self
            .vcs
            .clone_branch_shallow(&clone_url, branch, &workspace.path)
        {
            warn!(branch, "shallow clone failed ({shallow_err}); attempting full clone");
            remove_tree(&workspace.path);
            self.vcs
                .clone_full(&clone_url, &workspace.path)
                .map_err(|e| ScoutError::WorkspaceError(format!("failed to clone repository: {e}")))?;

            if self.vcs.checkout(&workspace.path, branch).is_err() {
                info!(branch, "branch not found on remote; creating it");
                self.vcs
                    .create_branch(&workspace.path, branch)
                    .map_err(|e| {
                        ScoutError::WorkspaceError(format!("failed to create branch {branch}: {e}"))
                    })?;
            }
        }

        self.vcs
            .set_identity(&workspace.path, &self.identity)
            .map_err(|e| ScoutError::WorkspaceError(format!("failed to set commit identity: {e}")))?;

        Ok(workspace)
    }

    /// Explicit counterpart to [`Self::acquire`].
    pub fn release(&self, workspace: Workspace) -> bool {
        workspace.release()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_release_removes_directory() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("ws");
        fs::create_dir_all(path.join("nested")).expect("mkdir");
        fs::write(path.join("nested/file.json"), "[]").expect("write");

        let ws = Workspace {
            path: path.clone(),
            released: false,
        };
        assert!(ws.release());
        assert!(!path.exists());
    }

    #[test]
    fn test_drop_removes_unreleased_directory() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("ws");
        fs::create_dir_all(&path).expect("mkdir");
        {
            let _ws = Workspace {
                path: path.clone(),
                    released: false,
            };
        }
        assert!(!path.exists());
    }

    #[test]
    fn test_release_of_missing_directory_is_ok() {
        let tmp = tempdir().expect("tempdir");
        let ws = Workspace {
            path: tmp.path().join("never-created"),
            released: false,
        };
        assert!(ws.release());
    }
}
