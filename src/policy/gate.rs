//! Authorization gate for reference mutations
//!
//! The gate is fail-closed: when protection rules cannot be read or evaluated
//! the mutation is denied.

use crate::policy::name::{RefNamespace, ReferenceName};
use crate::policy::protection::{ProtectionError, ProtectionStore};
use crate::policy::Principal;

/// Result of an authorization check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }
}

/// Why a mutation was refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    /// A tag protection rule matches and the principal is on none of its allow-lists
    ProtectedTag,
    /// The branch is protected
    ProtectedBranch,
    /// Protection rules could not be read or evaluated
    RulesUnavailable(String),
}

/// Decides whether `principal` may create, move or delete `reference` in `repository`
pub async fn authorize(
    protection: &dyn ProtectionStore,
    repository: &str,
    reference: &ReferenceName,
    principal: &Principal,
) -> Decision {
    let outcome = match reference.namespace() {
        RefNamespace::Tags => {
            check_tag(protection, repository, reference.short_name(), principal).await
        }
        RefNamespace::Heads => check_branch(protection, repository, reference.short_name()).await,
        RefNamespace::Pull | RefNamespace::Other => Ok(Decision::Allowed),
    };

    let decision = outcome
        .unwrap_or_else(|e| Decision::Denied(DenyReason::RulesUnavailable(e.to_string())));
    if let Decision::Denied(reason) = &decision {
        tracing::warn!(
            repository,
            reference = %reference,
            principal = %principal.name,
            ?reason,
            "Reference mutation denied"
        );
    }
    decision
}

/// Tags: allowed when no rule matches, or when any matching rule allows the principal
async fn check_tag(
    protection: &dyn ProtectionStore,
    repository: &str,
    tag: &str,
    principal: &Principal,
) -> Result<Decision, ProtectionError> {
    let rules = protection.protected_tags_for(repository).await?;

    let mut protected = false;
    for rule in &rules {
        if !rule.matches(tag)? {
            continue;
        }
        if rule.allows(principal) {
            return Ok(Decision::Allowed);
        }
        protected = true;
    }

    if protected {
        Ok(Decision::Denied(DenyReason::ProtectedTag))
    } else {
        Ok(Decision::Allowed)
    }
}

async fn check_branch(
    protection: &dyn ProtectionStore,
    repository: &str,
    branch: &str,
) -> Result<Decision, ProtectionError> {
    if protection.is_branch_protected(repository, branch).await? {
        Ok(Decision::Denied(DenyReason::ProtectedBranch))
    } else {
        Ok(Decision::Allowed)
    }
}
