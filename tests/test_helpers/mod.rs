//! Shared fixtures: throwaway bare repositories built with the git CLI
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use refgate::git::{RepositoryHandle, RepositoryManager};
use tempfile::TempDir;
use url::Url;

pub const API_BASE_URL: &str = "http://localhost:3000/api/v1";
pub const OWNER: &str = "alice";
pub const REPO: &str = "demo";

/// Runs git in `dir` and returns its trimmed stdout, panicking on failure
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(args)
        .env("GIT_AUTHOR_NAME", "Test")
        .env("GIT_AUTHOR_EMAIL", "test@example.com")
        .env("GIT_COMMITTER_NAME", "Test")
        .env("GIT_COMMITTER_EMAIL", "test@example.com")
        .stdin(Stdio::null())
        .output()
        .expect("failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// A repositories root holding `alice/demo.git` with this history:
///
/// * `first` <- `second`
/// * `refs/heads/main` -> `second`
/// * `refs/heads/dev` -> `first`
/// * `refs/tags/v0` -> `first` (lightweight)
pub struct Fixture {
    pub root: TempDir,
    pub repo_path: PathBuf,
    pub first: String,
    pub second: String,
}

impl Fixture {
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("failed to create temp dir");
        let repo_path = root.path().join(OWNER).join(format!("{}.git", REPO));
        std::fs::create_dir_all(&repo_path).expect("failed to create repository dir");
        git(&repo_path, &["init", "--bare", "--quiet"]);

        // Empty tree, built without a worktree
        let tree = git(&repo_path, &["mktree"]);
        let first = git(&repo_path, &["commit-tree", &tree, "-m", "first"]);
        let second = git(&repo_path, &["commit-tree", &tree, "-p", &first, "-m", "second"]);

        git(&repo_path, &["update-ref", "refs/heads/main", &second]);
        git(&repo_path, &["update-ref", "refs/heads/dev", &first]);
        git(&repo_path, &["update-ref", "refs/tags/v0", &first]);

        Self {
            root,
            repo_path,
            first,
            second,
        }
    }

    pub fn manager(&self) -> RepositoryManager {
        RepositoryManager::new(
            self.root.path().to_path_buf(),
            Url::parse(API_BASE_URL).expect("valid url"),
        )
        .expect("failed to create repository manager")
    }

    pub fn handle(&self) -> RepositoryHandle {
        self.manager()
            .open_by_name(OWNER, REPO)
            .expect("failed to open fixture repository")
    }

    pub fn git(&self, args: &[&str]) -> String {
        git(&self.repo_path, args)
    }

    /// Current value of a reference as git itself sees it
    pub fn read_ref(&self, name: &str) -> Option<String> {
        let output = Command::new("git")
            .arg("-C")
            .arg(&self.repo_path)
            .args(["rev-parse", "--verify", "--quiet", name])
            .output()
            .expect("failed to run git");
        output
            .status
            .success()
            .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Name of the repository as used by protection rules
    pub fn full_name(&self) -> String {
        format!("{}/{}", OWNER, REPO)
    }
}
