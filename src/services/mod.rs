//! Reference services: listing, creating, updating and deleting references
//!
//! Every mutation runs the same pipeline, and each stage can end the request:
//!
//! 1. Validate the reference name ([`ReferenceName::parse`])
//! 2. Resolve the target commit-ish ([`resolve_target`])
//! 3. Check protection rules ([`authorize`])
//! 4. Write through the repository's ref store
//!
//! The functions take all their collaborators as parameters and touch no
//! global state, so they are used unchanged by the HTTP API and the CLI.

pub mod tags;

use crate::error::{RefError, RefResult};
use crate::git::{ExpectedOld, GitRefObject, ObjectId, ObjectType, RefStore, RepositoryHandle};
use crate::policy::name::{normalize_filter, RefNamespace};
use crate::policy::{authorize, Decision, Principal, ProtectionStore, ReferenceName};

pub use tags::{create_tag, NewTag, TagError};

/// Who is asking, and against which repository and rules
#[derive(Clone, Copy)]
pub struct MutationContext<'a> {
    pub repository: &'a RepositoryHandle,
    pub protection: &'a dyn ProtectionStore,
    pub principal: &'a Principal,
    /// Domain of the e-mail address recorded in annotated tags
    pub noreply_domain: &'a str,
}

/// Terminal state of a successful mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefOutcome {
    Created(GitRefObject),
    Updated(GitRefObject),
    Deleted,
}

impl RefOutcome {
    pub fn record(&self) -> Option<&GitRefObject> {
        match self {
            RefOutcome::Created(record) | RefOutcome::Updated(record) => Some(record),
            RefOutcome::Deleted => None,
        }
    }
}

/// Result of a listing: a single object when the filter names exactly one reference
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(untagged)]
pub enum RefListing {
    Single(GitRefObject),
    Many(Vec<GitRefObject>),
}

/// Lists references whose name starts with `filter`
///
/// The filter may omit the `refs/` root. When exactly one reference matches
/// and its name equals the filter, it is returned on its own.
///
/// # Errors
///
/// Returns [`RefError::RefNotFound`] when nothing matches.
pub async fn list_refs(repository: &RepositoryHandle, filter: &str) -> RefResult<RefListing> {
    let prefix = normalize_filter(filter);
    let stored = repository.store.list_refs(&prefix).await?;

    let mut records: Vec<GitRefObject> = stored
        .into_iter()
        .map(|stored| {
            GitRefObject::new(
                &repository.api_url,
                stored.name,
                stored.target,
                stored.object_type,
            )
        })
        .collect();

    match records.len() {
        0 => Err(RefError::RefNotFound(prefix)),
        1 if records[0].ref_name == prefix => Ok(RefListing::Single(records.remove(0))),
        _ => Ok(RefListing::Many(records)),
    }
}

/// Resolves a commit-ish to the commit it names
///
/// # Errors
///
/// Returns [`RefError::TargetNotFound`] when the target is empty or does not resolve.
pub async fn resolve_target(store: &dyn RefStore, target: &str) -> RefResult<ObjectId> {
    store
        .resolve_commit(target)
        .await?
        .ok_or_else(|| RefError::TargetNotFound(target.to_string()))
}

async fn ensure_allowed(ctx: &MutationContext<'_>, reference: &ReferenceName) -> RefResult<()> {
    match authorize(
        ctx.protection,
        &ctx.repository.full_name,
        reference,
        ctx.principal,
    )
    .await
    {
        Decision::Allowed => Ok(()),
        Decision::Denied(_) => Err(RefError::Denied(reference.to_string())),
    }
}

/// Creates a new reference pointing at `target`
///
/// References in the tag namespace are created through [`create_tag`];
/// a non-empty `message` makes an annotated tag.
///
/// # Errors
///
/// * [`RefError::MalformedRefName`], [`RefError::ReadOnlyNamespace`] - the name is refused
/// * [`RefError::TargetNotFound`] - the target does not resolve to a commit
/// * [`RefError::Denied`] - the reference is protected
/// * [`RefError::RefConflict`] - a reference with that name exists
/// * [`RefError::InvalidRefName`] - git rejects the name
pub async fn create_ref(
    ctx: &MutationContext<'_>,
    ref_name: &str,
    target: &str,
    message: Option<&str>,
) -> RefResult<RefOutcome> {
    let reference = ReferenceName::parse(ref_name)?;
    let store = ctx.repository.store.as_ref();
    let commit = resolve_target(store, target).await?;
    ensure_allowed(ctx, &reference).await?;

    if reference.namespace() == RefNamespace::Tags {
        let record = create_tag(
            ctx.repository,
            ctx.protection,
            ctx.principal,
            NewTag {
                name: reference.short_name(),
                commit: &commit,
                message: message.unwrap_or_default(),
            },
            ctx.noreply_domain,
        )
        .await?;
        return Ok(RefOutcome::Created(record));
    }

    if store.reference_exists(reference.as_str()).await? {
        return Err(RefError::RefConflict(reference.to_string()));
    }
    store
        .create_or_update_ref(reference.as_str(), &commit, ExpectedOld::Absent)
        .await?;

    tracing::info!(
        repository = %ctx.repository.full_name,
        reference = %reference,
        commit = %commit,
        principal = %ctx.principal.name,
        "Created reference"
    );
    Ok(RefOutcome::Created(GitRefObject::new(
        &ctx.repository.api_url,
        reference.to_string(),
        commit,
        ObjectType::Commit,
    )))
}

/// Moves an existing reference to `target`; an empty target deletes it
///
/// # Errors
///
/// As [`create_ref`], plus [`RefError::RefNotFound`] when the reference does not exist.
/// A symbolic reference is refused with [`RefError::RefConflict`].
pub async fn update_ref(
    ctx: &MutationContext<'_>,
    ref_name: &str,
    target: &str,
) -> RefResult<RefOutcome> {
    if target.is_empty() {
        return delete_ref(ctx, ref_name).await;
    }

    let reference = ReferenceName::parse(ref_name)?;
    let store = ctx.repository.store.as_ref();
    let commit = resolve_target(store, target).await?;
    ensure_allowed(ctx, &reference).await?;

    let current = store
        .read_ref(reference.as_str())
        .await?
        .ok_or_else(|| RefError::RefNotFound(reference.to_string()))?;
    store
        .create_or_update_ref(reference.as_str(), &commit, ExpectedOld::Value(current.clone()))
        .await?;

    tracing::info!(
        repository = %ctx.repository.full_name,
        reference = %reference,
        from = %current,
        to = %commit,
        principal = %ctx.principal.name,
        "Updated reference"
    );
    Ok(RefOutcome::Updated(GitRefObject::new(
        &ctx.repository.api_url,
        reference.to_string(),
        commit,
        ObjectType::Commit,
    )))
}

/// Deletes an existing reference
///
/// # Errors
///
/// * [`RefError::MalformedRefName`], [`RefError::ReadOnlyNamespace`] - the name is refused
/// * [`RefError::Denied`] - the reference is protected
/// * [`RefError::RefNotFound`] - the reference does not exist
/// * [`RefError::RefConflict`] - the reference moved while it was being deleted, or is symbolic
pub async fn delete_ref(ctx: &MutationContext<'_>, ref_name: &str) -> RefResult<RefOutcome> {
    let reference = ReferenceName::parse(ref_name)?;
    ensure_allowed(ctx, &reference).await?;

    let store = ctx.repository.store.as_ref();
    let current = store
        .read_ref(reference.as_str())
        .await?
        .ok_or_else(|| RefError::RefNotFound(reference.to_string()))?;
    store
        .delete_ref(reference.as_str(), ExpectedOld::Value(current.clone()))
        .await?;

    tracing::info!(
        repository = %ctx.repository.full_name,
        reference = %reference,
        was = %current,
        principal = %ctx.principal.name,
        "Deleted reference"
    );
    Ok(RefOutcome::Deleted)
}
