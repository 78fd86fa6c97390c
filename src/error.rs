//! Outcomes that stop a reference mutation
//!
//! Each variant is recoverable at the request boundary and maps to its own
//! client-facing status (see `api::error`). Only [`RefError::Backend`] denotes
//! an unexpected failure.

use crate::git::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum RefError {
    /// Empty, or not rooted at `refs/`
    #[error("'{0}' is not a fully qualified reference name")]
    MalformedRefName(String),

    /// The namespace is maintained by the server and cannot be written
    #[error("reference '{0}' is read-only")]
    ReadOnlyNamespace(String),

    /// The commit-ish the reference should point at does not exist
    #[error("target '{0}' does not exist")]
    TargetNotFound(String),

    /// A protection rule forbids the acting principal to touch the reference
    #[error("not allowed to modify protected reference '{0}'")]
    Denied(String),

    /// The name is already taken, or the reference moved concurrently
    #[error("reference '{0}' already exists or was changed concurrently")]
    RefConflict(String),

    /// The reference to update or delete does not exist
    #[error("reference '{0}' does not exist")]
    RefNotFound(String),

    /// The name breaks git's own reference naming rules
    #[error("'{0}' is not a valid reference name")]
    InvalidRefName(String),

    #[error(transparent)]
    Backend(StoreError),
}

impl From<StoreError> for RefError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NameConflict(name) => RefError::RefConflict(name),
            StoreError::InvalidName(name) => RefError::InvalidRefName(name),
            StoreError::NotFound(name) => RefError::RefNotFound(name),
            StoreError::SymbolicRef { name, .. } => RefError::RefConflict(name),
            other => RefError::Backend(other),
        }
    }
}

pub type RefResult<T> = Result<T, RefError>;
