//! Versioned-store client capability.
//!
//! The publisher drives the repository only through [`VcsClient`]. [`GitCli`]
//! implements it by invoking the `git` binary; every invocation is bounded by
//! a timeout and killed when it expires. Command lines and captured output
//! are redacted before they are logged or stored in an error.

use std::io::Read;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use std::sync::LazyLock;
use std::thread;
use std::time::{Duration, Instant};

use regex::Regex;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::remote::{Secret, redact_credentials};

pub const DEFAULT_GIT_TIMEOUT: Duration = Duration::from_secs(120);

static NON_FAST_FORWARD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)non-fast-forward|\(fetch first\)|updates were rejected because the (remote contains work|tip of your current branch is behind)").unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushRejection {
    /// The remote branch advanced since the workspace was cloned.
    NonFastForward,
    Other,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VcsError {
    #[error("failed to launch `{command}`: {message}")]
    Spawn { command: String, message: String },
    #[error("`{command}` timed out after {secs}s")]
    Timeout { command: String, secs: u64 },
    #[error("`{command}` exited with {code:?}: {stderr}")]
    Failed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
    #[error("push rejected ({kind:?}): {stderr}")]
    PushRejected { kind: PushRejection, stderr: String },
}

impl VcsError {
    pub fn is_non_fast_forward(&self) -> bool {
        matches!(
            self,
            VcsError::PushRejected {
                kind: PushRejection::NonFastForward,
                ..
            }
        )
    }
}

pub type VcsResult<T> = std::result::Result<T, VcsError>;

/// Author/committer identity written into the workspace before any commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitIdentity {
    pub name: String,
    pub email: String,
}

/// Classifies push stderr.
pub fn classify_push_failure(stderr: &str) -> PushRejection {
    if NON_FAST_FORWARD.is_match(stderr) {
        PushRejection::NonFastForward
    } else {
        PushRejection::Other
    }
}

pub trait VcsClient {
    /// Shallow (depth 1) clone of `branch` into `dest`.
    fn clone_branch_shallow(&self, remote: &str, branch: &str, dest: &Path) -> VcsResult<()>;
    /// Full clone of the remote's default state into `dest`.
    fn clone_full(&self, remote: &str, dest: &Path) -> VcsResult<()>;
    fn checkout(&self, dir: &Path, branch: &str) -> VcsResult<()>;
    /// Creates `branch` locally and switches to it.
    fn create_branch(&self, dir: &Path, branch: &str) -> VcsResult<()>;
    fn set_identity(&self, dir: &Path, identity: &CommitIdentity) -> VcsResult<()>;
    fn add(&self, dir: &Path, path: &str) -> VcsResult<()>;
    /// True when the working tree or index differs from the branch tip.
    fn has_changes(&self, dir: &Path) -> VcsResult<bool>;
    fn commit(&self, dir: &Path, message: &str) -> VcsResult<()>;
    /// Push failures come back as [`VcsError::PushRejected`].
    fn push(&self, dir: &Path, branch: &str) -> VcsResult<()>;
    fn pull_rebase(&self, dir: &Path, branch: &str) -> VcsResult<()>;
}

/// [`VcsClient`] backed by the `git` binary.
pub struct GitCli {
    program: String,
    timeout: Duration,
    secret: Option<Secret>,
}

impl GitCli {
    pub fn new(timeout: Duration) -> Self {
        Self {
            program: "git".to_string(),
            timeout,
            secret: None,
        }
    }

    /// Secret to scrub from logged command lines and output.
    pub fn with_secret(mut self, secret: Secret) -> Self {
        self.secret = Some(secret);
        self
    }

    fn redact(&self, text: &str) -> String {
        match &self.secret {
            Some(secret) => secret.redact(text),
            None => redact_credentials(text),
        }
    }

    fn run(&self, cwd: Option<&Path>, args: &[&str]) -> VcsResult<String> {
        let cmdline = self.redact(&format!("{} {}", self.program, args.join(" ")));
        info!(cwd = ?cwd, "running {cmdline}");

        let mut cmd = Command::new(&self.program);
        cmd.args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null());
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        let output = execute_with_timeout(cmd, self.timeout).map_err(|e| match e {
            RunError::Spawn(message) => VcsError::Spawn {
                command: cmdline.clone(),
                message,
            },
            RunError::TimedOut => VcsError::Timeout {
                command: cmdline.clone(),
                secs: self.timeout.as_secs(),
            },
        })?;

        let stdout = self.redact(String::from_utf8_lossy(&output.stdout).trim());
        let stderr = self.redact(String::from_utf8_lossy(&output.stderr).trim());
        if output.status.success() {
            if !stdout.is_empty() {
                debug!("git stdout: {stdout}");
            }
            if !stderr.is_empty() {
                debug!("git stderr: {stderr}");
            }
            Ok(stdout)
        } else {
            warn!(code = ?output.status.code(), "{cmdline} failed: {stderr}");
            Err(VcsError::Failed {
                command: cmdline,
                code: output.status.code(),
                stderr,
            })
        }
    }
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new(DEFAULT_GIT_TIMEOUT)
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

impl VcsClient for GitCli {
    fn clone_branch_shallow(&self, remote: &str, branch: &str, dest: &Path) -> VcsResult<()> {
        let dest = path_arg(dest);
        self.run(
            None,
            &["clone", "--quiet", "--branch", branch, "--depth", "1", remote, &dest],
        )
        .map(|_| ())
    }

    fn clone_full(&self, remote: &str, dest: &Path) -> VcsResult<()> {
        let dest = path_arg(dest);
        self.run(None, &["clone", "--quiet", remote, &dest]).map(|_| ())
    }

    fn checkout(&self, dir: &Path, branch: &str) -> VcsResult<()> {
        self.run(Some(dir), &["checkout", branch]).map(|_| ())
    }

    fn create_branch(&self, dir: &Path, branch: &str) -> VcsResult<()> {
        self.run(Some(dir), &["checkout", "-b", branch]).map(|_| ())
    }

    fn set_identity(&self, dir: &Path, identity: &CommitIdentity) -> VcsResult<()> {
        self.run(Some(dir), &["config", "user.name", &identity.name])?;
        self.run(Some(dir), &["config", "user.email", &identity.email])?;
        Ok(())
    }

    fn add(&self, dir: &Path, path: &str) -> VcsResult<()> {
        self.run(Some(dir), &["add", "--", path]).map(|_| ())
    }

    fn has_changes(&self, dir: &Path) -> VcsResult<bool> {
        let status = self.run(Some(dir), &["status", "--porcelain"])?;
        Ok(!status.trim().is_empty())
    }

    fn commit(&self, dir: &Path, message: &str) -> VcsResult<()> {
        self.run(Some(dir), &["commit", "--quiet", "-m", message]).map(|_| ())
    }

    fn push(&self, dir: &Path, branch: &str) -> VcsResult<()> {
        match self.run(Some(dir), &["push", "origin", branch]) {
            Ok(_) => Ok(()),
            Err(VcsError::Failed { stderr, .. }) => Err(VcsError::PushRejected {
                kind: classify_push_failure(&stderr),
                stderr,
            }),
            Err(other) => Err(other),
        }
    }

    fn pull_rebase(&self, dir: &Path, branch: &str) -> VcsResult<()> {
        self.run(Some(dir), &["pull", "--rebase", "origin", branch])
            .map(|_| ())
    }
}

enum RunError {
    Spawn(String),
    TimedOut,
}

/// Runs `cmd` to completion or kills it once `timeout` elapses. Output pipes
/// are drained on helper threads so a chatty child cannot block on a full pipe.
fn execute_with_timeout(mut cmd: Command, timeout: Duration) -> Result<Output, RunError> {
    let start = Instant::now();
    let mut child = cmd
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| RunError::Spawn(e.to_string()))?;

    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if start.elapsed() > timeout => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(RunError::TimedOut);
            }
            Ok(None) => thread::sleep(Duration::from_millis(25)),
            Err(e) => {
                let _ = child.kill();
                return Err(RunError::Spawn(e.to_string()));
            }
        }
    };

    let collect = |handle: Option<thread::JoinHandle<Vec<u8>>>| {
        handle.and_then(|h| h.join().ok()).unwrap_or_default()
    };
    Ok(Output {
        status,
        stdout: collect(stdout),
        stderr: collect(stderr),
    })
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}
