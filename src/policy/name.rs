//! Reference name validation
//!
//! Every reference a client names passes through [`ReferenceName::parse`]
//! before anything reaches the backend. Parsing is structural only: git's own
//! grammar (forbidden characters, `..`, `.lock` suffixes) is enforced later by
//! the ref store and reported as [`RefError::InvalidRefName`].

use std::fmt;

use strum::{AsRefStr, Display};

use crate::error::RefError;

/// Root every fully qualified reference name starts with
pub const REFS_PREFIX: &str = "refs/";
/// Branch namespace
pub const HEADS_PREFIX: &str = "refs/heads/";
/// Tag namespace
pub const TAGS_PREFIX: &str = "refs/tags/";
/// Pull request namespace, maintained by the hosting application
pub const PULL_PREFIX: &str = "refs/pull/";

/// Category of a reference, derived once from its name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum RefNamespace {
    /// `refs/tags/*`
    Tags,
    /// `refs/heads/*`
    Heads,
    /// `refs/pull/*`
    Pull,
    /// Everything else below `refs/`
    Other,
}

impl RefNamespace {
    fn of(name: &str) -> Self {
        if name.starts_with(TAGS_PREFIX) {
            RefNamespace::Tags
        } else if name.starts_with(HEADS_PREFIX) {
            RefNamespace::Heads
        } else if name.starts_with(PULL_PREFIX) {
            RefNamespace::Pull
        } else {
            RefNamespace::Other
        }
    }

    /// Prefix stripped to obtain the bare name
    pub fn prefix(self) -> &'static str {
        match self {
            RefNamespace::Tags => TAGS_PREFIX,
            RefNamespace::Heads => HEADS_PREFIX,
            RefNamespace::Pull => PULL_PREFIX,
            RefNamespace::Other => REFS_PREFIX,
        }
    }
}

/// A structurally valid, mutable reference name such as `refs/heads/main`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReferenceName {
    full: String,
    namespace: RefNamespace,
}

impl ReferenceName {
    /// Parses a client-supplied reference name.
    ///
    /// A single leading `--` is dropped first so that the name can never be
    /// taken for an option by the git subprocess.
    ///
    /// # Errors
    ///
    /// * [`RefError::MalformedRefName`] - empty, or not below `refs/`
    /// * [`RefError::ReadOnlyNamespace`] - below `refs/pull/`
    pub fn parse(raw: &str) -> Result<Self, RefError> {
        let name = raw.strip_prefix("--").unwrap_or(raw);

        if name.is_empty() || !name.starts_with(REFS_PREFIX) || name.len() == REFS_PREFIX.len() {
            return Err(RefError::MalformedRefName(raw.to_string()));
        }

        let namespace = RefNamespace::of(name);
        if namespace == RefNamespace::Pull {
            return Err(RefError::ReadOnlyNamespace(name.to_string()));
        }

        Ok(Self {
            full: name.to_string(),
            namespace,
        })
    }

    /// The full name, e.g. `refs/tags/v1`
    pub fn as_str(&self) -> &str {
        &self.full
    }

    pub fn namespace(&self) -> RefNamespace {
        self.namespace
    }

    /// The name below the namespace prefix, e.g. `v1` for `refs/tags/v1`
    pub fn short_name(&self) -> &str {
        &self.full[self.namespace.prefix().len()..]
    }
}

impl fmt::Display for ReferenceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full)
    }
}

impl AsRef<str> for ReferenceName {
    fn as_ref(&self) -> &str {
        &self.full
    }
}

/// Expands a reference taken from a URL path to its full name.
///
/// Paths may omit the `refs/` root (`heads/main`), as in the GitHub API.
/// The result still has to go through [`ReferenceName::parse`].
pub fn expand_path(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() || trimmed.starts_with(REFS_PREFIX) || trimmed.starts_with("--") {
        trimmed.to_string()
    } else {
        format!("{}{}", REFS_PREFIX, trimmed)
    }
}

/// Normalizes a listing filter to a full `refs/...` prefix
///
/// An empty filter lists everything below `refs/`.
pub fn normalize_filter(filter: &str) -> String {
    let trimmed = filter.trim_start_matches('/');
    if trimmed.starts_with(REFS_PREFIX) {
        trimmed.to_string()
    } else {
        format!("{}{}", REFS_PREFIX, trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_name_per_namespace() {
        let tag = ReferenceName::parse("refs/tags/release/v1").unwrap();
        assert_eq!(tag.namespace(), RefNamespace::Tags);
        assert_eq!(tag.short_name(), "release/v1");

        let other = ReferenceName::parse("refs/notes/commits").unwrap();
        assert_eq!(other.namespace(), RefNamespace::Other);
        assert_eq!(other.short_name(), "notes/commits");
    }

    #[test]
    fn test_expand_path() {
        assert_eq!(expand_path("heads/main"), "refs/heads/main");
        assert_eq!(expand_path("refs/tags/v1"), "refs/tags/v1");
        assert_eq!(expand_path("/heads/main/"), "refs/heads/main");
        assert_eq!(expand_path(""), "");
    }

    #[test]
    fn test_normalize_filter() {
        assert_eq!(normalize_filter(""), "refs/");
        assert_eq!(normalize_filter("heads/"), "refs/heads/");
        assert_eq!(normalize_filter("refs/tags/v1"), "refs/tags/v1");
        assert_eq!(normalize_filter("/heads/main"), "refs/heads/main");
    }
}
