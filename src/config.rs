//! refgate configuration.
//!
//! Loaded from `<config dir>/refgate/config.toml` (e.g. `~/.config/refgate/config.toml`)
//! unless a path is given explicitly. Every field has a default except
//! `repositories-root`, which may also come from the command line.
//!
//! ```toml
//! listen = "127.0.0.1:3000"
//! repositories-root = "/srv/git"
//! api-base-url = "https://git.example.com/api/v1"
//!
//! [[protected-tags]]
//! repository = "alice/demo"
//! pattern = "v*"
//! allow-users = ["alice"]
//! allow-teams = ["release"]
//!
//! [[protected-branches]]
//! repository = "alice/demo"
//! branch = "main"
//! ```

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::git::{GitCommandRepository, RepositoryManager};
use crate::policy::protection::{ConfigProtectionStore, ProtectedBranch, ProtectedTag};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    /// Address the HTTP server binds to
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Directory holding `{owner}/{repo}.git` repositories
    #[serde(default)]
    pub repositories_root: Option<PathBuf>,

    /// Public base URL of the API, used to render `url` fields
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// git executable
    #[serde(default = "default_git_binary")]
    pub git_binary: PathBuf,

    /// Domain of the e-mail address recorded in annotated tags
    #[serde(default = "default_noreply_domain")]
    pub noreply_domain: String,

    #[serde(default)]
    pub protected_tags: Vec<ProtectedTag>,

    #[serde(default)]
    pub protected_branches: Vec<ProtectedBranch>,
}

fn default_listen() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_api_base_url() -> String {
    "http://localhost:3000/api/v1".to_string()
}

fn default_git_binary() -> PathBuf {
    PathBuf::from(GitCommandRepository::DEFAULT_GIT_BINARY)
}

fn default_noreply_domain() -> String {
    "noreply.localhost".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            repositories_root: None,
            api_base_url: default_api_base_url(),
            git_binary: default_git_binary(),
            noreply_domain: default_noreply_domain(),
            protected_tags: Vec::new(),
            protected_branches: Vec::new(),
        }
    }
}

impl Config {
    /// The default config file path
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("refgate").join("config.toml"))
    }

    /// Loads the configuration.
    ///
    /// An explicitly given file must exist. Without one, the default path is
    /// used when present and built-in defaults otherwise.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match Self::path().filter(|path| path.exists()) {
                Some(path) => path,
                None => {
                    tracing::debug!("No config file found, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml(&contents).with_context(|| format!("invalid config at {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen
            .parse()
            .with_context(|| format!("invalid listen address '{}'", self.listen))
    }

    pub fn api_base_url(&self) -> Result<Url> {
        Url::parse(&self.api_base_url)
            .with_context(|| format!("invalid api-base-url '{}'", self.api_base_url))
    }

    /// Builds the protection rule store, rejecting patterns that do not compile
    pub fn protection_store(&self) -> Result<ConfigProtectionStore> {
        let store = ConfigProtectionStore::new(&self.protected_tags, &self.protected_branches);
        store.check_patterns()?;
        Ok(store)
    }

    pub fn repository_manager(&self) -> Result<RepositoryManager> {
        let root = self
            .repositories_root
            .clone()
            .ok_or_else(|| anyhow!("repositories-root is not configured"))?;
        let manager = RepositoryManager::new(root, self.api_base_url()?)?;
        Ok(manager.with_git_binary(&self.git_binary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_file() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.listen, "127.0.0.1:3000");
        assert!(config.repositories_root.is_none());
        assert!(config.protected_tags.is_empty());
        assert!(config.listen_addr().is_ok());
    }

    #[test]
    fn test_protection_rules() {
        let config = Config::from_toml(
            r#"
            repositories-root = "/srv/git"

            [[protected-tags]]
            repository = "alice/demo"
            pattern = "v*"
            allow-users = ["alice"]

            [[protected-branches]]
            repository = "alice/demo"
            branch = "main"
            "#,
        )
        .unwrap();

        assert_eq!(config.protected_tags.len(), 1);
        assert_eq!(config.protected_tags[0].rule.pattern, "v*");
        assert_eq!(config.protected_tags[0].rule.allow_users, vec!["alice"]);
        assert!(config.protected_tags[0].rule.allow_teams.is_empty());
        assert_eq!(config.protected_branches[0].branch, "main");
        assert!(config.protection_store().is_ok());
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        assert!(Config::from_toml("listne = \"0.0.0.0:80\"").is_err());
    }

    #[test]
    fn test_invalid_pattern_is_reported() {
        let config = Config::from_toml(
            r#"
            [[protected-tags]]
            repository = "alice/demo"
            pattern = "/([/"
            "#,
        )
        .unwrap();
        assert!(config.protection_store().is_err());
    }

    #[test]
    fn test_missing_repositories_root() {
        assert!(Config::default().repository_manager().is_err());
    }
}
