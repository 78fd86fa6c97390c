//! This module defines structs for git references.

use strum::{AsRefStr, Display, EnumString};

use crate::git::ObjectId;

/// Type of the object a reference points at.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    serde::Serialize,
    serde::Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum ObjectType {
    #[serde(rename = "commit")]
    Commit,
    #[serde(rename = "tag")]
    Tag,
    #[serde(rename = "tree")]
    Tree,
    #[serde(rename = "blob")]
    Blob,
}

/// The target object of a git reference, including its SHA, type and API URL.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RefObject {
    /// The hash of the target object
    pub sha: ObjectId,
    /// The type of the target object, usually "commit"
    #[serde(rename = "type")]
    pub object_type: ObjectType,
    /// API URL of the target object
    pub url: String,
}

/// A git reference in a repository, including its name and target object.
///
/// This matches the GitHub API format for references:
/// ```json
/// {
///   "ref": "refs/heads/main",
///   "url": "http://localhost:3000/api/v1/repos/owner/repo/git/refs/heads/main",
///   "object": {
///     "sha": "a94a8fe5ccb19ba61c4c0873d391e987982fbbd3",
///     "type": "commit",
///     "url": "http://localhost:3000/api/v1/repos/owner/repo/git/commits/a94a8fe5ccb19ba61c4c0873d391e987982fbbd3"
///   }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GitRefObject {
    /// The fully qualified name of the reference (e.g., "refs/heads/main")
    #[serde(rename = "ref")]
    pub ref_name: String,
    /// API URL of the reference itself
    pub url: String,
    /// The target object that this reference points to
    pub object: RefObject,
}

impl GitRefObject {
    /// Create a new GitRefObject rooted at the repository's API URL
    ///
    /// `repository_api_url` is the repository endpoint without a trailing
    /// slash, e.g. `http://host/api/v1/repos/owner/repo`.
    pub fn new(
        repository_api_url: &str,
        ref_name: String,
        sha: ObjectId,
        object_type: ObjectType,
    ) -> Self {
        let url = format!(
            "{}/git/{}",
            repository_api_url,
            escape_path_segments(&ref_name)
        );
        let object_url = format!(
            "{}/git/{}s/{}",
            repository_api_url,
            urlencoding::encode(object_type.as_ref()),
            urlencoding::encode(sha.as_str())
        );
        GitRefObject {
            ref_name,
            url,
            object: RefObject {
                sha,
                object_type,
                url: object_url,
            },
        }
    }
}

/// Percent-encodes every `/`-separated segment of a path, keeping the separators
pub fn escape_path_segments(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
