use std::path::PathBuf;
use std::process::{Output, Stdio};

use async_trait::async_trait;
use tokio::process::Command;

use crate::git::{ExpectedOld, ObjectId, RefStore, StoreError, StoredRef, Tagger};

mod reference;
pub use reference::{escape_path_segments, GitRefObject, ObjectType, RefObject};

/// A repository on local disk whose refs are managed through the `git` binary.
///
/// Every operation spawns one or more `git -C <repository> ...` subprocesses.
/// Writes go through `git update-ref` with an explicit old value, so git
/// itself serializes concurrent writers to the same reference.
#[derive(Debug, Clone)]
pub struct GitCommandRepository {
    repository_location: PathBuf,
    git_binary: PathBuf,
}

impl GitCommandRepository {
    /// Binary used when none is configured
    pub const DEFAULT_GIT_BINARY: &'static str = "git";

    /// Reflog message recorded for writes made through this service
    const REFLOG_MESSAGE: &'static str = "refgate: update reference";

    /// Creates a new GitCommandRepository for the given path
    ///
    /// This just records the path, it doesn't validate anything.
    /// Use validate() if that's needed.
    pub fn new(repository_location: PathBuf) -> Self {
        Self {
            repository_location,
            git_binary: PathBuf::from(Self::DEFAULT_GIT_BINARY),
        }
    }

    /// Uses a specific git executable instead of the one found on `PATH`
    pub fn with_git_binary(mut self, git_binary: impl Into<PathBuf>) -> Self {
        self.git_binary = git_binary.into();
        self
    }

    /// Validates that the repository location is a valid git repository
    ///
    /// This validation checks both that:
    /// 1. The directory exists and is accessible
    /// 2. The directory contains a git repository (bare or with a worktree)
    pub fn validate(&self) -> Result<(), String> {
        if !self.repository_location.is_dir() {
            return Err(format!(
                "Local path '{}' is not a directory",
                self.repository_location.display()
            ));
        }

        let git_dir = self.repository_location.join(".git");
        let is_bare_repo = self.repository_location.join("HEAD").exists();

        if !git_dir.exists() && !is_bare_repo {
            return Err(format!(
                "The directory '{}' does not appear to be a git repository",
                self.repository_location.display()
            ));
        }

        Ok(())
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut command = Command::new(&self.git_binary);
        command
            .arg("-C")
            .arg(&self.repository_location)
            .args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("LC_ALL", "C")
            .stdin(Stdio::null())
            .kill_on_drop(true);
        command
    }

    async fn output(&self, mut command: Command, args: &[&str]) -> Result<Output, StoreError> {
        tracing::debug!(
            repository = %self.repository_location.display(),
            "git {}",
            args.join(" ")
        );
        Ok(command.output().await?)
    }

    async fn run(&self, args: &[&str]) -> Result<Output, StoreError> {
        self.output(self.command(args), args).await
    }

    async fn run_checked(&self, args: &[&str]) -> Result<String, StoreError> {
        let output = self.run(args).await?;
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            Err(command_failed(args, &output))
        }
    }

    /// Returns whether another reference occupies the directory/file slot `name` needs.
    ///
    /// `refs/heads/a` and `refs/heads/a/b` can never coexist.
    async fn has_hierarchy_collision(&self, name: &str) -> Result<bool, StoreError> {
        let as_dir = format!("{}/", name);
        let refs = self.list_refs("").await?;
        Ok(refs.iter().any(|existing| {
            existing.name.starts_with(&as_dir) || name.starts_with(&format!("{}/", existing.name))
        }))
    }

    /// Returns whether another writer currently holds the lock for `name`
    async fn is_locked(&self, name: &str) -> Result<bool, StoreError> {
        let git_dir = self.run_checked(&["rev-parse", "--absolute-git-dir"]).await?;
        let git_dir = PathBuf::from(git_dir.trim());
        Ok(git_dir.join(format!("{}.lock", name)).exists()
            || git_dir.join("packed-refs.lock").exists())
    }

    /// Decides whether a rejected write lost a race or collided with another ref
    async fn is_conflict(
        &self,
        name: &str,
        expected_old: &ExpectedOld,
    ) -> Result<bool, StoreError> {
        let current = self.read_ref(name).await?;
        let moved = match expected_old {
            ExpectedOld::Absent => current.is_some(),
            ExpectedOld::Value(id) => current.as_ref() != Some(id),
        };
        if moved {
            return Ok(true);
        }
        Ok(self.has_hierarchy_collision(name).await? || self.is_locked(name).await?)
    }
}

fn command_failed(args: &[&str], output: &Output) -> StoreError {
    StoreError::CommandFailed {
        command: args.join(" "),
        status: output.status.to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    }
}

fn parse_object_id(command: &str, output: &str) -> Result<ObjectId, StoreError> {
    output
        .trim()
        .parse()
        .map_err(|_| StoreError::UnexpectedOutput {
            command: command.to_string(),
            output: output.trim().to_string(),
        })
}

/// Parses one line of [`FOR_EACH_REF_FORMAT`] output.
///
/// The symref field is empty for direct references.
fn parse_ref_line(line: &str) -> Option<StoredRef> {
    let mut parts = line.splitn(4, ' ');
    let target = parts.next()?.parse().ok()?;
    let object_type = parts.next()?.parse().ok()?;
    let name = parts.next()?.to_string();
    let symbolic_target = parts
        .next()
        .filter(|symref| !symref.is_empty())
        .map(String::from);
    Some(StoredRef {
        name,
        target,
        object_type,
        symbolic_target,
    })
}

const FOR_EACH_REF_FORMAT: &str =
    "--format=%(objectname) %(objecttype) %(refname) %(symref)";

#[async_trait]
impl RefStore for GitCommandRepository {
    async fn is_valid_ref_name(&self, name: &str) -> Result<bool, StoreError> {
        if name.starts_with('-') {
            return Ok(false);
        }
        let output = self.run(&["check-ref-format", name]).await?;
        Ok(output.status.success())
    }

    async fn list_refs(&self, prefix: &str) -> Result<Vec<StoredRef>, StoreError> {
        let stdout = self.run_checked(&["for-each-ref", FOR_EACH_REF_FORMAT]).await?;

        let mut refs = Vec::new();
        for line in stdout.lines().filter(|line| !line.is_empty()) {
            match parse_ref_line(line) {
                Some(stored) if stored.name.starts_with(prefix) => refs.push(stored),
                Some(_) => {}
                None => {
                    return Err(StoreError::UnexpectedOutput {
                        command: "for-each-ref".to_string(),
                        output: line.to_string(),
                    });
                }
            }
        }
        Ok(refs)
    }

    async fn resolve_commit(&self, commitish: &str) -> Result<Option<ObjectId>, StoreError> {
        // Never let a caller-supplied value be read as an option
        if commitish.is_empty() || commitish.starts_with('-') {
            return Ok(None);
        }

        let spec = format!("{}^{{commit}}", commitish);
        let args = ["rev-parse", "--verify", "--quiet", spec.as_str()];
        let output = self.run(&args).await?;

        if output.status.success() {
            let stdout = String::from_utf8_lossy(&output.stdout);
            return parse_object_id("rev-parse", &stdout).map(Some);
        }
        // `--verify --quiet` exits with 1 when the name does not resolve
        if output.status.code() == Some(1) {
            return Ok(None);
        }
        Err(command_failed(&args, &output))
    }

    async fn read_ref(&self, name: &str) -> Result<Option<ObjectId>, StoreError> {
        if !name.starts_with("refs/") {
            return Ok(None);
        }
        let stdout = self
            .run_checked(&["for-each-ref", FOR_EACH_REF_FORMAT, name])
            .await?;

        // The pattern also matches everything below `name/`, keep the exact hit only
        let Some(stored) = stdout
            .lines()
            .filter_map(parse_ref_line)
            .find(|stored| stored.name == name)
        else {
            return Ok(None);
        };

        if let Some(target) = stored.symbolic_target {
            return Err(StoreError::SymbolicRef {
                name: stored.name,
                target,
            });
        }
        Ok(Some(stored.target))
    }

    async fn create_or_update_ref(
        &self,
        name: &str,
        target: &ObjectId,
        expected_old: ExpectedOld,
    ) -> Result<(), StoreError> {
        if !self.is_valid_ref_name(name).await? {
            return Err(StoreError::InvalidName(name.to_string()));
        }

        // An empty old value tells git the reference must not exist yet
        let old_value = match &expected_old {
            ExpectedOld::Absent => "",
            ExpectedOld::Value(id) => id.as_str(),
        };
        // --no-deref: write `name` itself, never the reference a symref points at
        let args = [
            "update-ref",
            "-m",
            Self::REFLOG_MESSAGE,
            "--no-deref",
            name,
            target.as_str(),
            old_value,
        ];
        let output = self.run(&args).await?;
        if output.status.success() {
            return Ok(());
        }

        if self.is_conflict(name, &expected_old).await? {
            return Err(StoreError::NameConflict(name.to_string()));
        }
        Err(command_failed(&args, &output))
    }

    async fn delete_ref(&self, name: &str, expected_old: ExpectedOld) -> Result<(), StoreError> {
        let old_value = match &expected_old {
            ExpectedOld::Absent => return Err(StoreError::NotFound(name.to_string())),
            ExpectedOld::Value(id) => id.as_str(),
        };
        let args = [
            "update-ref",
            "-m",
            Self::REFLOG_MESSAGE,
            "--no-deref",
            "-d",
            name,
            old_value,
        ];
        let output = self.run(&args).await?;
        if output.status.success() {
            return Ok(());
        }

        if !self.reference_exists(name).await? {
            return Err(StoreError::NotFound(name.to_string()));
        }
        if self.is_conflict(name, &expected_old).await? {
            return Err(StoreError::NameConflict(name.to_string()));
        }
        Err(command_failed(&args, &output))
    }

    async fn create_annotated_tag(
        &self,
        tag_name: &str,
        target: &ObjectId,
        message: &str,
        tagger: &Tagger,
    ) -> Result<ObjectId, StoreError> {
        let ref_name = format!("refs/tags/{}", tag_name);
        if tag_name.starts_with('-') || !self.is_valid_ref_name(&ref_name).await? {
            return Err(StoreError::InvalidName(ref_name));
        }

        let args = ["tag", "-a", "-m", message, tag_name, target.as_str()];
        let mut command = self.command(&args);
        command
            .env("GIT_COMMITTER_NAME", &tagger.name)
            .env("GIT_COMMITTER_EMAIL", &tagger.email);
        let output = self.output(command, &args).await?;

        if !output.status.success() {
            if self.reference_exists(&ref_name).await? {
                return Err(StoreError::NameConflict(ref_name));
            }
            return Err(command_failed(&args, &output));
        }

        self.read_ref(&ref_name)
            .await?
            .ok_or_else(|| StoreError::UnexpectedOutput {
                command: "tag -a".to_string(),
                output: format!("tag '{}' missing after creation", tag_name),
            })
    }
}
