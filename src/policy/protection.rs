//! Protection rules for tags and branches
//!
//! Rules are keyed by repository (`owner/repo`, compared case-insensitively)
//! and matched against the bare reference name. A pattern wrapped in slashes
//! (`/^v[0-9]+$/`) is a regular expression, anything else is a glob.

use std::collections::HashMap;

use async_trait::async_trait;
use regex::Regex;

use crate::policy::Principal;

/// Errors raised while looking up or evaluating protection rules
#[derive(Debug, thiserror::Error)]
pub enum ProtectionError {
    #[error("invalid protection pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("protection rules unavailable: {0}")]
    Unavailable(String),
}

/// A compiled reference name pattern
#[derive(Debug, Clone)]
pub enum NamePattern {
    Regex(Regex),
    Glob(glob::Pattern),
}

impl NamePattern {
    pub fn compile(pattern: &str) -> Result<Self, ProtectionError> {
        let invalid = |reason: String| ProtectionError::InvalidPattern {
            pattern: pattern.to_string(),
            reason,
        };

        if pattern.len() > 1 && pattern.starts_with('/') && pattern.ends_with('/') {
            let expression = &pattern[1..pattern.len() - 1];
            return Regex::new(expression)
                .map(NamePattern::Regex)
                .map_err(|e| invalid(e.to_string()));
        }
        glob::Pattern::new(pattern)
            .map(NamePattern::Glob)
            .map_err(|e| invalid(e.to_string()))
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            NamePattern::Regex(regex) => regex.is_match(name),
            NamePattern::Glob(glob) => glob.matches(name),
        }
    }
}

/// A protection rule restricting who may create, move or delete matching references
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProtectionRule {
    /// Glob or `/regex/` matched against the bare reference name
    pub pattern: String,
    /// Users allowed to control matching references
    #[serde(default)]
    pub allow_users: Vec<String>,
    /// Teams whose members are allowed to control matching references
    #[serde(default)]
    pub allow_teams: Vec<String>,
}

impl ProtectionRule {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            allow_users: Vec::new(),
            allow_teams: Vec::new(),
        }
    }

    pub fn allow_user(mut self, user: impl Into<String>) -> Self {
        self.allow_users.push(user.into());
        self
    }

    pub fn allow_team(mut self, team: impl Into<String>) -> Self {
        self.allow_teams.push(team.into());
        self
    }

    /// Returns whether this rule applies to the bare reference name
    pub fn matches(&self, name: &str) -> Result<bool, ProtectionError> {
        Ok(NamePattern::compile(&self.pattern)?.matches(name))
    }

    /// Returns whether the principal is on one of the rule's allow-lists
    pub fn allows(&self, principal: &Principal) -> bool {
        self.allow_users.iter().any(|user| user == &principal.name)
            || self
                .allow_teams
                .iter()
                .any(|team| principal.teams.iter().any(|member_of| member_of == team))
    }
}

/// Source of protection rules
///
/// Implementations may be backed by anything; errors make the
/// authorization gate deny the mutation.
#[async_trait]
pub trait ProtectionStore: Send + Sync {
    /// All tag protection rules of a repository
    async fn protected_tags_for(&self, repository: &str)
    -> Result<Vec<ProtectionRule>, ProtectionError>;

    /// Whether the branch (bare name) is protected in the repository
    async fn is_branch_protected(&self, repository: &str, branch: &str)
    -> Result<bool, ProtectionError>;
}

/// Protected branch entry: a branch name or glob
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProtectedBranch {
    pub repository: String,
    pub branch: String,
}

/// Protected tag entry as written in the configuration file
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProtectedTag {
    pub repository: String,
    #[serde(flatten)]
    pub rule: ProtectionRule,
}

/// In-memory protection rules, loaded from the configuration file
#[derive(Debug, Clone, Default)]
pub struct ConfigProtectionStore {
    tags: HashMap<String, Vec<ProtectionRule>>,
    branches: HashMap<String, Vec<String>>,
}

impl ConfigProtectionStore {
    pub fn new(protected_tags: &[ProtectedTag], protected_branches: &[ProtectedBranch]) -> Self {
        let mut store = Self::default();
        for entry in protected_tags {
            store = store.with_tag_rule(&entry.repository, entry.rule.clone());
        }
        for entry in protected_branches {
            store = store.with_protected_branch(&entry.repository, &entry.branch);
        }
        store
    }

    pub fn with_tag_rule(mut self, repository: &str, rule: ProtectionRule) -> Self {
        self.tags
            .entry(repository.to_lowercase())
            .or_default()
            .push(rule);
        self
    }

    pub fn with_protected_branch(mut self, repository: &str, branch: &str) -> Self {
        self.branches
            .entry(repository.to_lowercase())
            .or_default()
            .push(branch.to_string());
        self
    }

    /// Compiles every pattern once so that configuration mistakes surface at startup
    pub fn check_patterns(&self) -> Result<(), ProtectionError> {
        for rule in self.tags.values().flatten() {
            NamePattern::compile(&rule.pattern)?;
        }
        for pattern in self.branches.values().flatten() {
            NamePattern::compile(pattern)?;
        }
        Ok(())
    }
}

#[async_trait]
impl ProtectionStore for ConfigProtectionStore {
    async fn protected_tags_for(
        &self,
        repository: &str,
    ) -> Result<Vec<ProtectionRule>, ProtectionError> {
        Ok(self
            .tags
            .get(&repository.to_lowercase())
            .cloned()
            .unwrap_or_default())
    }

    async fn is_branch_protected(
        &self,
        repository: &str,
        branch: &str,
    ) -> Result<bool, ProtectionError> {
        let Some(patterns) = self.branches.get(&repository.to_lowercase()) else {
            return Ok(false);
        };
        for pattern in patterns {
            if pattern == branch || NamePattern::compile(pattern)?.matches(branch) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
