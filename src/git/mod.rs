//! Git backend for reference storage
//!
//! This module provides the collaborator that owns a repository's ref store:
//! - Listing references (optionally filtered by name prefix)
//! - Resolving commit-ish strings to object ids
//! - Creating, updating and deleting references with compare-and-swap semantics
//!
//! The only implementation, [`GitCommandRepository`], drives the external `git`
//! binary as a subprocess. Everything above this module talks to the
//! [`RefStore`] trait so that policy code never depends on how refs are stored.
//!
//! ## Error reporting
//!
//! Backend failures are classified into [`StoreError`] variants from exit
//! statuses and follow-up queries against the repository. The text git prints
//! on stderr is kept for diagnostics only and is never inspected.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;

pub mod local_repository;
pub mod repository_manager;

pub use local_repository::{GitCommandRepository, GitRefObject, ObjectType, RefObject};
pub use repository_manager::{RepositoryHandle, RepositoryManager};

/// A git object id in its hexadecimal form.
///
/// Both SHA-1 (40 hex characters) and SHA-256 (64 hex characters) repositories
/// are supported. The id is always stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectId(String);

impl ObjectId {
    /// Returns the hexadecimal representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ObjectId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if !matches!(trimmed.len(), 40 | 64) {
            return Err(format!("object id '{}' has an invalid length", trimmed));
        }
        if !trimmed.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(format!("object id '{}' is not hexadecimal", trimmed));
        }
        Ok(ObjectId(trimmed.to_ascii_lowercase()))
    }
}

impl TryFrom<String> for ObjectId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ObjectId> for String {
    fn from(value: ObjectId) -> Self {
        value.0
    }
}

/// The value a reference must hold for a write to go through.
///
/// Passed straight to `git update-ref` as the old value, which makes the
/// backend check and write the reference atomically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpectedOld {
    /// The reference must not exist yet
    Absent,
    /// The reference must currently point at this object
    Value(ObjectId),
}

/// A reference as read from the ref store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRef {
    /// Fully qualified name, e.g. `refs/heads/main`
    pub name: String,
    /// Object the reference points at (a tag object for annotated tags)
    pub target: ObjectId,
    /// Type of the object the reference points at
    pub object_type: ObjectType,
    /// For symbolic references, the name of the reference they point to
    pub symbolic_target: Option<String>,
}

/// Identity recorded in annotated tag objects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tagger {
    pub name: String,
    pub email: String,
}

/// Errors reported by a [`RefStore`]
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The name is already bound to a different object, collides with an
    /// existing reference hierarchy, or was moved by a concurrent writer
    #[error("reference '{0}' conflicts with an existing reference")]
    NameConflict(String),

    /// The name violates git's own reference naming rules
    #[error("'{0}' is not a valid reference name")]
    InvalidName(String),

    /// The reference does not exist
    #[error("reference '{0}' does not exist")]
    NotFound(String),

    /// The reference is symbolic; it is listed but never written through
    #[error("reference '{name}' is a symbolic reference to '{target}'")]
    SymbolicRef { name: String, target: String },

    /// The git binary could not be started
    #[error("failed to run git: {0}")]
    Spawn(#[from] std::io::Error),

    /// git exited unsuccessfully for a reason that is not a ref conflict
    #[error("`git {command}` exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    /// git produced output that could not be parsed
    #[error("unexpected output from `git {command}`: {output}")]
    UnexpectedOutput { command: String, output: String },
}

/// A repository's reference store.
///
/// Implementations must make every single-reference write atomic with respect
/// to [`ExpectedOld`]: if the reference does not hold the expected value at
/// write time, the write fails with [`StoreError::NameConflict`].
#[async_trait]
pub trait RefStore: Send + Sync {
    /// Checks a fully qualified reference name against the backend's naming rules
    async fn is_valid_ref_name(&self, name: &str) -> Result<bool, StoreError>;

    /// Lists references whose full name starts with `prefix` (all refs when empty)
    async fn list_refs(&self, prefix: &str) -> Result<Vec<StoredRef>, StoreError>;

    /// Resolves a commit-ish (SHA, branch, tag) to the id of the commit it names.
    ///
    /// Returns `Ok(None)` when nothing matching exists.
    async fn resolve_commit(&self, commitish: &str) -> Result<Option<ObjectId>, StoreError>;

    /// Reads the current value of a fully qualified reference.
    ///
    /// Fails with [`StoreError::SymbolicRef`] when `name` is a symbolic reference.
    async fn read_ref(&self, name: &str) -> Result<Option<ObjectId>, StoreError>;

    /// Returns whether a fully qualified reference exists
    async fn reference_exists(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.read_ref(name).await?.is_some())
    }

    /// Points `name` at `target`, provided the reference currently matches `expected_old`
    async fn create_or_update_ref(
        &self,
        name: &str,
        target: &ObjectId,
        expected_old: ExpectedOld,
    ) -> Result<(), StoreError>;

    /// Deletes `name`, provided the reference currently matches `expected_old`
    async fn delete_ref(&self, name: &str, expected_old: ExpectedOld) -> Result<(), StoreError>;

    /// Creates an annotated tag object for `target` and points `refs/tags/{tag_name}` at it.
    ///
    /// Fails with [`StoreError::NameConflict`] when the tag already exists.
    /// Returns the id of the new tag object.
    async fn create_annotated_tag(
        &self,
        tag_name: &str,
        target: &ObjectId,
        message: &str,
        tagger: &Tagger,
    ) -> Result<ObjectId, StoreError>;
}
