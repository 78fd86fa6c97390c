//! Reference mutation policy: name validation, protection rules and the
//! authorization gate.

pub mod gate;
pub mod name;
pub mod protection;

pub use gate::{authorize, Decision, DenyReason};
pub use name::{RefNamespace, ReferenceName};
pub use protection::{ConfigProtectionStore, ProtectionError, ProtectionRule, ProtectionStore};

/// The user on whose behalf a request is made
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub name: String,
    pub teams: Vec<String>,
}

impl Principal {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            teams: Vec::new(),
        }
    }

    pub fn with_teams<I, S>(mut self, teams: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.teams.extend(teams.into_iter().map(Into::into));
        self
    }
}
