//! Tag creation
//!
//! Tags are not written as raw refs: creation re-checks tag protection and
//! existence, and writes an annotated tag object when a message is given.

use crate::error::RefError;
use crate::git::{
    ExpectedOld, GitRefObject, ObjectId, ObjectType, RepositoryHandle, StoreError, Tagger,
};
use crate::policy::name::TAGS_PREFIX;
use crate::policy::{authorize, Decision, Principal, ProtectionStore, ReferenceName};

#[derive(Debug, thiserror::Error)]
pub enum TagError {
    #[error("tag '{0}' already exists")]
    AlreadyExists(String),

    #[error("not allowed to create protected tag '{0}'")]
    ProtectedName(String),

    #[error("'{0}' is not a valid tag name")]
    InvalidName(String),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for TagError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NameConflict(name) => TagError::AlreadyExists(name),
            StoreError::InvalidName(name) => TagError::InvalidName(name),
            other => TagError::Store(other),
        }
    }
}

impl From<TagError> for RefError {
    fn from(error: TagError) -> Self {
        match error {
            TagError::AlreadyExists(name) => RefError::RefConflict(name),
            TagError::ProtectedName(name) => RefError::Denied(name),
            TagError::InvalidName(name) => RefError::InvalidRefName(name),
            TagError::Store(error) => error.into(),
        }
    }
}

impl Tagger {
    /// Tagger identity for a principal, using a no-reply e-mail address
    pub fn for_principal(principal: &Principal, noreply_domain: &str) -> Self {
        Tagger {
            name: principal.name.clone(),
            email: format!("{}@{}", principal.name, noreply_domain),
        }
    }
}

/// Parameters for [`create_tag`]
#[derive(Debug, Clone, Copy)]
pub struct NewTag<'a> {
    /// Bare tag name, without `refs/tags/`
    pub name: &'a str,
    /// Commit the tag points at
    pub commit: &'a ObjectId,
    /// Annotation message; an empty message creates a lightweight tag
    pub message: &'a str,
}

/// Creates a tag in the repository on behalf of `principal`
///
/// # Errors
///
/// * [`TagError::InvalidName`] - the name is empty, starts with `-` or breaks git's rules
/// * [`TagError::AlreadyExists`] - a tag with that name exists
/// * [`TagError::ProtectedName`] - a protection rule excludes the principal
pub async fn create_tag(
    repository: &RepositoryHandle,
    protection: &dyn ProtectionStore,
    principal: &Principal,
    tag: NewTag<'_>,
    noreply_domain: &str,
) -> Result<GitRefObject, TagError> {
    let full_name = format!("{}{}", TAGS_PREFIX, tag.name);
    if tag.name.is_empty() || tag.name.starts_with('-') {
        return Err(TagError::InvalidName(full_name));
    }
    let reference =
        ReferenceName::parse(&full_name).map_err(|_| TagError::InvalidName(full_name.clone()))?;

    let store = repository.store.as_ref();
    if store.reference_exists(reference.as_str()).await? {
        return Err(TagError::AlreadyExists(full_name));
    }

    if let Decision::Denied(_) =
        authorize(protection, &repository.full_name, &reference, principal).await
    {
        return Err(TagError::ProtectedName(full_name));
    }

    let record = if tag.message.trim().is_empty() {
        store
            .create_or_update_ref(reference.as_str(), tag.commit, ExpectedOld::Absent)
            .await?;
        GitRefObject::new(
            &repository.api_url,
            full_name,
            tag.commit.clone(),
            ObjectType::Commit,
        )
    } else {
        let tagger = Tagger::for_principal(principal, noreply_domain);
        let tag_object = store
            .create_annotated_tag(tag.name, tag.commit, tag.message, &tagger)
            .await?;
        GitRefObject::new(&repository.api_url, full_name, tag_object, ObjectType::Tag)
    };

    tracing::info!(
        repository = %repository.full_name,
        tag = tag.name,
        commit = %tag.commit,
        principal = %principal.name,
        "Created tag"
    );
    Ok(record)
}
