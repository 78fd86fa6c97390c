mod repository_location;

use std::{path::PathBuf, sync::Arc};

pub use repository_location::{validate_segment, RepositoryLocation};
use url::Url;

use crate::git::local_repository::{escape_path_segments, GitCommandRepository};
use crate::git::RefStore;

/// Errors raised while locating a repository on disk
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("repository '{0}' does not exist")]
    NotFound(String),

    #[error("invalid repository path: {0}")]
    InvalidPath(String),

    #[error("repository root is unusable: {0}")]
    Io(#[from] std::io::Error),
}

/// An opened repository: its public name, API URL and ref store.
///
/// Handles are cheap to clone; every request opens its own.
#[derive(Clone)]
pub struct RepositoryHandle {
    /// `owner/repo`
    pub full_name: String,
    /// API endpoint of the repository without a trailing slash
    pub api_url: String,
    /// The repository's reference store
    pub store: Arc<dyn RefStore>,
}

impl std::fmt::Debug for RepositoryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryHandle")
            .field("full_name", &self.full_name)
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

/// Repository manager for Git operations
///
/// Maps `owner/repo` names onto bare repositories stored below a single root
/// directory (`{root}/{owner}/{repo}.git`, or `{root}/{owner}/{repo}`).
#[derive(Debug, Clone)]
pub struct RepositoryManager {
    repositories_root: PathBuf,
    api_base_url: Url,
    git_binary: PathBuf,
}

impl RepositoryManager {
    /// Creates a new RepositoryManager
    ///
    /// # Parameters
    ///
    /// * `repositories_root` - Directory holding one sub-directory per owner.
    /// * `api_base_url` - Public base URL of the API, e.g. `http://host/api/v1`.
    ///
    /// # Returns
    ///
    /// * `Result<Self, RepositoryError>` - An error if the root is not a directory.
    pub fn new(repositories_root: PathBuf, api_base_url: Url) -> Result<Self, RepositoryError> {
        if !repositories_root.is_dir() {
            return Err(RepositoryError::InvalidPath(format!(
                "repositories root '{}' is not a directory",
                repositories_root.display()
            )));
        }

        Ok(Self {
            repositories_root,
            api_base_url,
            git_binary: PathBuf::from(GitCommandRepository::DEFAULT_GIT_BINARY),
        })
    }

    /// Uses a specific git executable for every opened repository
    pub fn with_git_binary(mut self, git_binary: impl Into<PathBuf>) -> Self {
        self.git_binary = git_binary.into();
        self
    }

    pub fn repositories_root(&self) -> &PathBuf {
        &self.repositories_root
    }

    /// API endpoint for a repository, e.g. `http://host/api/v1/repos/owner/repo`
    pub fn repository_api_url(&self, location: &RepositoryLocation) -> String {
        format!(
            "{}/repos/{}/{}",
            self.api_base_url.as_str().trim_end_matches('/'),
            escape_path_segments(&location.owner),
            escape_path_segments(&location.repo)
        )
    }

    /// Opens the repository stored for `location`
    pub fn open(&self, location: &RepositoryLocation) -> Result<RepositoryHandle, RepositoryError> {
        let path = self.locate(location)?;
        let repository = GitCommandRepository::new(path).with_git_binary(&self.git_binary);

        Ok(RepositoryHandle {
            full_name: location.full_name(),
            api_url: self.repository_api_url(location),
            store: Arc::new(repository),
        })
    }

    /// Opens the repository for the `owner` and `repo` path parameters
    pub fn open_by_name(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<RepositoryHandle, RepositoryError> {
        let location =
            RepositoryLocation::new(owner, repo).map_err(RepositoryError::InvalidPath)?;
        self.open(&location)
    }

    fn locate(&self, location: &RepositoryLocation) -> Result<PathBuf, RepositoryError> {
        let owner_dir = self.repositories_root.join(&location.owner);
        let candidates = [
            owner_dir.join(format!("{}.git", location.repo)),
            owner_dir.join(&location.repo),
        ];

        for candidate in candidates {
            if GitCommandRepository::new(candidate.clone()).validate().is_ok() {
                tracing::debug!("Resolved {} to {}", location, candidate.display());
                return Ok(candidate);
            }
        }
        Err(RepositoryError::NotFound(location.full_name()))
    }
}

/// Opens a repository at an arbitrary local path, outside any repositories root.
///
/// `name` and `api_url` are only used to render reference records.
pub fn open_local_repository(
    path: PathBuf,
    name: &str,
    api_url: &str,
    git_binary: Option<PathBuf>,
) -> Result<RepositoryHandle, RepositoryError> {
    let mut repository = GitCommandRepository::new(path);
    if let Some(git_binary) = git_binary {
        repository = repository.with_git_binary(git_binary);
    }
    repository.validate().map_err(RepositoryError::InvalidPath)?;

    Ok(RepositoryHandle {
        full_name: name.to_string(),
        api_url: api_url.trim_end_matches('/').to_string(),
        store: Arc::new(repository),
    })
}
