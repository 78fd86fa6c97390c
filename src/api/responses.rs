//! Request and response bodies of the HTTP API
//!
//! Reference records themselves are [`crate::git::GitRefObject`]; listings are
//! [`crate::services::RefListing`].
//!
//! # Field names
//!
//! Clients in the wild send reference creation bodies in several shapes:
//! `{"ref", "target"}`, `{"RefName", "Target"}` or `{"ref", "sha"}`.
//! All of them deserialize into the same request type.

use serde::{Deserialize, Serialize};

/// Body of `POST /repos/{owner}/{repo}/git/refs`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRefRequest {
    /// Fully qualified name of the reference to create
    #[serde(rename = "ref", alias = "ref_name", alias = "RefName")]
    pub ref_name: String,

    /// Commit-ish the reference should point at
    #[serde(default, alias = "Target", alias = "sha", alias = "Sha")]
    pub target: String,

    /// Message for annotated tags (tag namespace only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Body of `PATCH /repos/{owner}/{repo}/git/refs/{ref}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateRefRequest {
    /// New target; an empty target deletes the reference
    #[serde(default, alias = "Target", alias = "sha", alias = "Sha")]
    pub target: String,
}

/// Body of `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_accepts_all_field_spellings() {
        let bodies = [
            r#"{"ref": "refs/heads/x", "target": "main"}"#,
            r#"{"RefName": "refs/heads/x", "Target": "main"}"#,
            r#"{"ref": "refs/heads/x", "sha": "main"}"#,
            r#"{"ref_name": "refs/heads/x", "Sha": "main"}"#,
        ];

        for body in bodies {
            let request: CreateRefRequest = serde_json::from_str(body).unwrap();
            assert_eq!(request.ref_name, "refs/heads/x", "body: {}", body);
            assert_eq!(request.target, "main", "body: {}", body);
        }
    }

    #[test]
    fn test_update_request_defaults_to_empty_target() {
        let request: UpdateRefRequest = serde_json::from_str("{}").unwrap();
        assert!(request.target.is_empty());
    }
}
