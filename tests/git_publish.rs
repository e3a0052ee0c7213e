//! Publishes through the real `git` binary into a bare repository on disk.
//! Every test is a no-op when `git` is not installed.

use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use pricescout::core::model::PriceObservation;
use pricescout::core::publish::{PublishTarget, Publisher};
use pricescout::core::remote::RemoteRepo;
use pricescout::core::snapshot::Snapshot;
use pricescout::core::vcs::{CommitIdentity, GitCli, VcsClient, VcsResult};
use pricescout::core::workspace::WorkspaceManager;
use tempfile::{TempDir, tempdir};
use url::Url;

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args([
            "-c",
            "user.name=seed",
            "-c",
            "user.email=seed@example.com",
            "-c",
            "commit.gpgsign=false",
        ])
        .args(args)
        .current_dir(dir)
        .env("GIT_TERMINAL_PROMPT", "0")
        .output()
        .expect("run git");
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("utf-8 temp path")
}

/// Bare repository with one seed commit on `main`.
struct Fixture {
    tmp: TempDir,
    remote: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let tmp = tempdir().expect("tempdir");
        let remote = tmp.path().join("remote.git");
        git(tmp.path(), &["init", "--quiet", "--bare", path_str(&remote)]);
        git(&remote, &["symbolic-ref", "HEAD", "refs/heads/main"]);

        let seed = tmp.path().join("seed");
        git(tmp.path(), &["init", "--quiet", path_str(&seed)]);
        git(&seed, &["checkout", "--quiet", "-b", "main"]);
        fs::write(seed.join("README.md"), "price snapshots\n").expect("write readme");
        git(&seed, &["add", "README.md"]);
        git(&seed, &["commit", "--quiet", "-m", "seed"]);
        git(&seed, &["push", "--quiet", path_str(&remote), "main"]);

        Self { tmp, remote }
    }

    fn remote_repo(&self) -> RemoteRepo {
        let url = Url::from_directory_path(&self.remote).expect("file url");
        RemoteRepo::parse(url.as_str()).expect("remote")
    }

    fn work_root(&self) -> PathBuf {
        self.tmp.path().join("work")
    }

    fn commit_count(&self, branch: &str) -> usize {
        git(&self.remote, &["rev-list", "--count", branch])
            .parse()
            .expect("count")
    }

    fn show(&self, branch: &str, path: &str) -> String {
        git(&self.remote, &["show", &format!("{branch}:{path}")])
    }

    /// Lands a commit on `main` from an unrelated clone.
    fn push_rival_commit(&self) {
        let rival = self.tmp.path().join("rival");
        git(self.tmp.path(), &["clone", "--quiet", path_str(&self.remote), path_str(&rival)]);
        fs::write(rival.join("rival.txt"), "someone else\n").expect("write rival");
        git(&rival, &["add", "rival.txt"]);
        git(&rival, &["commit", "--quiet", "-m", "rival"]);
        git(&rival, &["push", "--quiet", "origin", "main"]);
    }
}

fn snapshot(seconds: u32) -> Snapshot {
    let at = Utc
        .with_ymd_and_hms(2026, 3, 1, 12, 0, seconds)
        .single()
        .expect("valid timestamp");
    let obs = vec![
        PriceObservation::new("milk", "Whole Milk 1L", 1.99, "1L", "Store A", "https://a.example/p/1", at),
        PriceObservation::new("bread", "Rye Bread", 3.25, "500g", "Store B", "https://b.example/p/2", at),
    ];
    Snapshot::new(obs, at)
}

fn identity() -> CommitIdentity {
    CommitIdentity {
        name: "prices-bot".to_string(),
        email: "prices-bot@example.com".to_string(),
    }
}

fn target(fixture: &Fixture, branch: &str) -> PublishTarget {
    PublishTarget {
        remote: fixture.remote_repo(),
        branch: branch.to_string(),
        path_prefix: "data".to_string(),
    }
}

fn git_cli() -> GitCli {
    GitCli::new(Duration::from_secs(60))
}

#[test]
fn snapshot_lands_on_remote_branch() {
    if !git_available() {
        eprintln!("skipping: git not installed");
        return;
    }
    let fixture = Fixture::new();
    let vcs = git_cli();
    let workspaces = WorkspaceManager::new(&vcs, fixture.work_root(), identity());
    let snap = snapshot(0);
    let expected = String::from_utf8(snap.to_canonical_json().expect("json")).expect("utf-8");

    let report = Publisher::new(&vcs, workspaces, target(&fixture, "main"), None)
        .publish(snap)
        .expect("publish");

    assert!(report.committed);
    assert_eq!(report.path, "data/pricing_data_20260301_120000_000000.json");
    assert!(report.url.ends_with("/remote/blob/main/data/pricing_data_20260301_120000_000000.json"));
    assert_eq!(fixture.commit_count("main"), 2);
    assert_eq!(fixture.show("main", &report.path), expected.trim_end());
    assert_eq!(
        git(&fixture.remote, &["log", "-1", "--format=%s|%an", "main"]),
        "Update pricing data - 20260301_120000_000000|prices-bot"
    );
    let leftover = fs::read_dir(fixture.work_root()).expect("work root").count();
    assert_eq!(leftover, 0, "workspace must be removed");
}

#[test]
fn republishing_identical_snapshot_adds_no_commit() {
    if !git_available() {
        eprintln!("skipping: git not installed");
        return;
    }
    let fixture = Fixture::new();
    let vcs = git_cli();

    let first = Publisher::new(
        &vcs,
        WorkspaceManager::new(&vcs, fixture.work_root(), identity()),
        target(&fixture, "main"),
        None,
    )
    .publish(snapshot(1))
    .expect("first publish");
    assert!(first.committed);
    let after_first = fixture.commit_count("main");

    let second = Publisher::new(
        &vcs,
        WorkspaceManager::new(&vcs, fixture.work_root(), identity()),
        target(&fixture, "main"),
        None,
    )
    .publish(snapshot(1))
    .expect("second publish");

    assert!(!second.committed);
    assert_eq!(second.url, first.url);
    assert_eq!(fixture.commit_count("main"), after_first);
}

#[test]
fn missing_branch_is_created_on_remote() {
    if !git_available() {
        eprintln!("skipping: git not installed");
        return;
    }
    let fixture = Fixture::new();
    let vcs = git_cli();
    let workspaces = WorkspaceManager::new(&vcs, fixture.work_root(), identity());

    let report = Publisher::new(&vcs, workspaces, target(&fixture, "prices-nightly"), None)
        .publish(snapshot(2))
        .expect("publish to new branch");

    assert!(report.url.contains("/blob/prices-nightly/"));
    assert_eq!(fixture.commit_count("prices-nightly"), 2);
    assert_eq!(fixture.commit_count("main"), 1);
}

/// Lets a rival commit land on the remote right before the first push.
struct RacingGit<'a> {
    inner: GitCli,
    fixture: &'a Fixture,
    raced: Cell<bool>,
}

impl VcsClient for RacingGit<'_> {
    fn clone_branch_shallow(&self, remote: &str, branch: &str, dest: &Path) -> VcsResult<()> {
        self.inner.clone_branch_shallow(remote, branch, dest)
    }

    fn clone_full(&self, remote: &str, dest: &Path) -> VcsResult<()> {
        self.inner.clone_full(remote, dest)
    }

    fn checkout(&self, dir: &Path, branch: &str) -> VcsResult<()> {
        self.inner.checkout(dir, branch)
    }

    fn create_branch(&self, dir: &Path, branch: &str) -> VcsResult<()> {
        self.inner.create_branch(dir, branch)
    }

    fn set_identity(&self, dir: &Path, identity: &CommitIdentity) -> VcsResult<()> {
        self.inner.set_identity(dir, identity)
    }

    fn add(&self, dir: &Path, path: &str) -> VcsResult<()> {
        self.inner.add(dir, path)
    }

    fn has_changes(&self, dir: &Path) -> VcsResult<bool> {
        self.inner.has_changes(dir)
    }

    fn commit(&self, dir: &Path, message: &str) -> VcsResult<()> {
        self.inner.commit(dir, message)
    }

    fn push(&self, dir: &Path, branch: &str) -> VcsResult<()> {
        if !self.raced.replace(true) {
            self.fixture.push_rival_commit();
        }
        self.inner.push(dir, branch)
    }

    fn pull_rebase(&self, dir: &Path, branch: &str) -> VcsResult<()> {
        self.inner.pull_rebase(dir, branch)
    }
}

#[test]
fn concurrent_writer_is_absorbed_by_one_rebase() {
    if !git_available() {
        eprintln!("skipping: git not installed");
        return;
    }
    let fixture = Fixture::new();
    let vcs = RacingGit {
        inner: git_cli(),
        fixture: &fixture,
        raced: Cell::new(false),
    };
    let workspaces = WorkspaceManager::new(&vcs, fixture.work_root(), identity());

    let report = Publisher::new(&vcs, workspaces, target(&fixture, "main"), None)
        .publish(snapshot(3))
        .expect("publish after rebase");

    assert!(report.retried);
    assert_eq!(fixture.commit_count("main"), 3);
    assert_eq!(fixture.show("main", "rival.txt"), "someone else");
    assert!(fixture.show("main", &report.path).contains("\"Rye Bread\""));
}
