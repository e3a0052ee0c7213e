//! Snapshot publisher: commit/retry protocol against a shared remote branch.
//!
//! ```text
//! ACQUIRING -> WRITING -> STAGING -> COMMITTING -> PUSHING -> DONE
//!                            \______________________________/
//!                             no delta: straight to DONE
//! any state --error--> FAILED
//! ```
//!
//! The remote branch tip is the only shared resource. A push rejected as
//! non-fast-forward gets exactly one recovery (rebase-pull, push again);
//! every other push failure is final. The workspace is released exactly
//! once on every path out of [`Publisher::publish`]; a panic inside a state
//! still releases it through `Drop`.

use std::fmt;
use std::fs;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::core::error::ScoutError;
use crate::core::remote::{RemoteRepo, Secret};
use crate::core::snapshot::{Snapshot, validate_prefix};
use crate::core::vcs::VcsClient;
use crate::core::workspace::{Workspace, WorkspaceManager};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishState {
    Acquiring,
    Writing,
    Staging,
    Committing,
    Pushing,
    Done,
    Failed,
}

impl fmt::Display for PublishState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PublishState::Acquiring => "ACQUIRING",
            PublishState::Writing => "WRITING",
            PublishState::Staging => "STAGING",
            PublishState::Committing => "COMMITTING",
            PublishState::Pushing => "PUSHING",
            PublishState::Done => "DONE",
            PublishState::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// Where snapshots are published.
#[derive(Debug, Clone)]
pub struct PublishTarget {
    pub remote: RemoteRepo,
    pub branch: String,
    pub path_prefix: String,
}

/// Outcome of a publish attempt that reached `DONE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    /// Public, credential-free URL of the published file.
    pub url: String,
    /// File path inside the repository.
    pub path: String,
    /// False when the content was already on the branch tip.
    pub committed: bool,
    /// True when a non-fast-forward rejection was recovered from.
    pub retried: bool,
    /// States visited, ending in `Done`.
    pub trail: Vec<PublishState>,
}

#[derive(Error, Debug)]
#[error("publish failed in {state}: {source}")]
pub struct PublishFailure {
    /// State the attempt failed in.
    pub state: PublishState,
    #[source]
    pub source: ScoutError,
    /// States visited, ending in `Failed`.
    pub trail: Vec<PublishState>,
}

struct Progress {
    trail: Vec<PublishState>,
}

impl Progress {
    fn start() -> Self {
        Self {
            trail: vec![PublishState::Acquiring],
        }
    }

    fn current(&self) -> PublishState {
        self.trail
            .last()
            .copied()
            .unwrap_or(PublishState::Acquiring)
    }

    fn enter(&mut self, state: PublishState) {
        info!(from = %self.current(), to = %state, "publish transition");
        self.trail.push(state);
    }

    fn fail(mut self, source: impl Into<ScoutError>) -> PublishFailure {
        let state = self.current();
        let source = source.into();
        error!(state = %state, "publish failed: {source}");
        self.trail.push(PublishState::Failed);
        PublishFailure {
            state,
            source,
            trail: self.trail,
        }
    }
}

pub struct Publisher<'a> {
    vcs: &'a dyn VcsClient,
    workspaces: WorkspaceManager<'a>,
    target: PublishTarget,
    token: Option<Secret>,
}

impl<'a> Publisher<'a> {
    pub fn new(
        vcs: &'a dyn VcsClient,
        workspaces: WorkspaceManager<'a>,
        target: PublishTarget,
        token: Option<Secret>,
    ) -> Self {
        Self {
            vcs,
            workspaces,
            target,
            token,
        }
    }

    /// Publishes `snapshot` and returns the public URL of the file on success.
    pub fn publish(&self, snapshot: Snapshot) -> Result<PublishReport, PublishFailure> {
        let progress = Progress::start();
        match snapshot.digest() {
            Ok(digest) => info!(
                observations = snapshot.observations().len(),
                digest = %digest,
                branch = %self.target.branch,
                "publishing snapshot"
            ),
            Err(e) => return Err(progress.fail(e)),
        }

        let workspace = match self.workspaces.acquire(
            &self.target.remote,
            self.token.as_ref(),
            &self.target.branch,
        ) {
            Ok(ws) => ws,
            Err(e) => return Err(progress.fail(e)),
        };

        let outcome = self.drive(&workspace, &snapshot, progress);
        self.workspaces.release(workspace);
        outcome
    }

    fn drive(
        &self,
        workspace: &Workspace,
        snapshot: &Snapshot,
        mut progress: Progress,
    ) -> Result<PublishReport, PublishFailure> {
        let dir = workspace.path();
        let rel_path = snapshot.relative_path(&self.target.path_prefix);

        progress.enter(PublishState::Writing);
        if let Err(e) = write_snapshot(workspace, &self.target.path_prefix, &rel_path, snapshot) {
            return Err(progress.fail(e));
        }
        info!(path = %rel_path, "snapshot written");

        progress.enter(PublishState::Staging);
        if let Err(e) = self.vcs.add(dir, &rel_path) {
            return Err(progress.fail(e));
        }
        let changed = match self.vcs.has_changes(dir) {
            Ok(changed) => changed,
            Err(e) => return Err(progress.fail(e)),
        };
        if !changed {
            info!(path = %rel_path, "no changes to commit; content already published");
            return Ok(self.done(progress, rel_path, false, false));
        }

        progress.enter(PublishState::Committing);
        if let Err(e) = self.vcs.commit(dir, &snapshot.commit_message()) {
            return Err(progress.fail(e));
        }

        progress.enter(PublishState::Pushing);
        let branch = &self.target.branch;
        let retried = match self.vcs.push(dir, branch) {
            Ok(()) => false,
            Err(e) if e.is_non_fast_forward() => {
                warn!(branch = %branch, "non-fast-forward push; rebasing onto remote and retrying once");
                if let Err(e) = self.vcs.pull_rebase(dir, branch) {
                    return Err(progress.fail(e));
                }
                if let Err(e) = self.vcs.push(dir, branch) {
                    error!(branch = %branch, "push after rebase also failed");
                    return Err(progress.fail(e));
                }
                true
            }
            Err(e) => return Err(progress.fail(e)),
        };

        Ok(self.done(progress, rel_path, true, retried))
    }

    fn done(
        &self,
        mut progress: Progress,
        path: String,
        committed: bool,
        retried: bool,
    ) -> PublishReport {
        progress.enter(PublishState::Done);
        let url = self.target.remote.public_file_url(&self.target.branch, &path);
        info!(url = %url, committed, retried, "snapshot published");
        PublishReport {
            url,
            path,
            committed,
            retried,
            trail: progress.trail,
        }
    }
}

fn write_snapshot(
    workspace: &Workspace,
    prefix: &str,
    rel_path: &str,
    snapshot: &Snapshot,
) -> Result<(), ScoutError> {
    validate_prefix(prefix)?;
    let full_path = workspace.path().join(rel_path);
    if let Some(parent) = full_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let bytes = snapshot.to_canonical_json()?;
    fs::write(&full_path, bytes)?;
    Ok(())
}
