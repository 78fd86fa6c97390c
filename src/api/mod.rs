//! HTTP API for git references
//!
//! The routes follow the Gitea/GitHub layout, mounted below `/api/v1`:
//!
//! | Method | Path | Success |
//! |---|---|---|
//! | GET | `/repos/{owner}/{repo}/git/refs` | 200 |
//! | GET | `/repos/{owner}/{repo}/git/refs/{ref}` | 200 |
//! | POST | `/repos/{owner}/{repo}/git/refs` | 201 |
//! | PATCH | `/repos/{owner}/{repo}/git/refs/{ref}` | 200, or 204 when the target is empty |
//! | DELETE | `/repos/{owner}/{repo}/git/refs/{ref}` | 204 |
//!
//! `{ref}` may be given with or without the leading `refs/`.
//!
//! ## Authentication
//!
//! The service does not authenticate anyone itself. A proxy in front of it is
//! expected to set [`principal::USER_HEADER`] (and optionally
//! [`principal::TEAMS_HEADER`]); mutating endpoints answer 401 without it.

pub mod error;
pub mod handlers;
pub mod principal;
pub mod responses;

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::git::RepositoryManager;
use crate::policy::ProtectionStore;

/// Prefix all API routes are mounted below
pub const API_PREFIX: &str = "/api/v1";

/// Shared state of the HTTP API
pub struct AppState {
    pub repositories: RepositoryManager,
    pub protection: Arc<dyn ProtectionStore>,
    /// Domain of the e-mail address recorded in annotated tags
    pub noreply_domain: String,
}

/// Builds the complete router, including request tracing
pub fn router(state: Arc<AppState>) -> Router {
    let refs = Router::new()
        .route(
            "/repos/{owner}/{repo}/git/refs",
            get(handlers::list_all_refs).post(handlers::create_ref),
        )
        .route(
            "/repos/{owner}/{repo}/git/refs/{*ref_path}",
            get(handlers::get_refs)
                .patch(handlers::update_ref)
                .delete(handlers::delete_ref),
        );

    Router::new()
        .route("/health", get(handlers::health))
        .nest(API_PREFIX, refs)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
