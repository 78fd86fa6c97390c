use std::{fmt, str::FromStr};

/// An `owner/repo` pair identifying a hosted repository
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Deserialize)]
#[serde(try_from = "String")]
pub struct RepositoryLocation {
    pub owner: String,
    pub repo: String,
}

impl RepositoryLocation {
    /// Builds a location from already separated path segments
    pub fn new(owner: &str, repo: &str) -> Result<Self, String> {
        validate_segment(owner)?;
        validate_segment(repo)?;
        Ok(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }

    /// `owner/repo`
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

impl fmt::Display for RepositoryLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

impl FromStr for RepositoryLocation {
    type Err = String;

    fn from_str(full_name: &str) -> Result<Self, Self::Err> {
        let sanitized = full_name.trim();
        match sanitized.split_once('/') {
            Some((owner, repo)) => Self::new(owner, repo),
            None => Err(format!(
                "repository '{}' must be written as owner/repo",
                sanitized
            )),
        }
    }
}

impl TryFrom<String> for RepositoryLocation {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Rejects path segments that could escape the repositories root
///
/// Segments are joined onto a filesystem path, so anything that is not a
/// plain directory name is refused.
pub fn validate_segment(segment: &str) -> Result<(), String> {
    if segment.is_empty() {
        return Err("repository path segment is empty".to_string());
    }
    if segment == "." || segment == ".." {
        return Err(format!("'{}' is not a valid repository path segment", segment));
    }
    if segment.starts_with('-') {
        return Err(format!("repository path segment '{}' starts with '-'", segment));
    }
    if segment
        .chars()
        .any(|c| c == '/' || c == '\\' || c == '\0' || c.is_control())
    {
        return Err(format!(
            "repository path segment '{}' contains a forbidden character",
            segment
        ));
    }
    Ok(())
}
