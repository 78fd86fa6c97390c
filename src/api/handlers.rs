//! Handlers for the git reference endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use crate::api::error::ApiResult;
use crate::api::responses::{CreateRefRequest, HealthResponse, UpdateRefRequest};
use crate::api::AppState;
use crate::policy::{name::expand_path, Principal};
use crate::services::{self, MutationContext, RefOutcome};

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /repos/{owner}/{repo}/git/refs
pub async fn list_all_refs(
    State(state): State<Arc<AppState>>,
    Path((owner, repo)): Path<(String, String)>,
) -> ApiResult<Response> {
    let repository = state.repositories.open_by_name(&owner, &repo)?;
    let listing = services::list_refs(&repository, "").await?;
    Ok(Json(listing).into_response())
}

/// GET /repos/{owner}/{repo}/git/refs/{ref}
pub async fn get_refs(
    State(state): State<Arc<AppState>>,
    Path((owner, repo, ref_path)): Path<(String, String, String)>,
) -> ApiResult<Response> {
    let repository = state.repositories.open_by_name(&owner, &repo)?;
    let listing = services::list_refs(&repository, &ref_path).await?;
    Ok(Json(listing).into_response())
}

/// POST /repos/{owner}/{repo}/git/refs
pub async fn create_ref(
    State(state): State<Arc<AppState>>,
    Path((owner, repo)): Path<(String, String)>,
    principal: Principal,
    payload: Result<Json<CreateRefRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = payload?;
    let repository = state.repositories.open_by_name(&owner, &repo)?;
    let ctx = state.mutation_context(&repository, &principal);

    let outcome = services::create_ref(
        &ctx,
        &request.ref_name,
        &request.target,
        request.message.as_deref(),
    )
    .await?;
    Ok(outcome_response(outcome))
}

/// PATCH /repos/{owner}/{repo}/git/refs/{ref}
pub async fn update_ref(
    State(state): State<Arc<AppState>>,
    Path((owner, repo, ref_path)): Path<(String, String, String)>,
    principal: Principal,
    payload: Result<Json<UpdateRefRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = payload?;
    let repository = state.repositories.open_by_name(&owner, &repo)?;
    let ctx = state.mutation_context(&repository, &principal);

    let outcome = services::update_ref(&ctx, &expand_path(&ref_path), &request.target).await?;
    Ok(outcome_response(outcome))
}

/// DELETE /repos/{owner}/{repo}/git/refs/{ref}
pub async fn delete_ref(
    State(state): State<Arc<AppState>>,
    Path((owner, repo, ref_path)): Path<(String, String, String)>,
    principal: Principal,
) -> ApiResult<Response> {
    let repository = state.repositories.open_by_name(&owner, &repo)?;
    let ctx = state.mutation_context(&repository, &principal);

    let outcome = services::delete_ref(&ctx, &expand_path(&ref_path)).await?;
    Ok(outcome_response(outcome))
}

fn outcome_response(outcome: RefOutcome) -> Response {
    match outcome {
        RefOutcome::Created(record) => (StatusCode::CREATED, Json(record)).into_response(),
        RefOutcome::Updated(record) => (StatusCode::OK, Json(record)).into_response(),
        RefOutcome::Deleted => StatusCode::NO_CONTENT.into_response(),
    }
}

impl AppState {
    fn mutation_context<'a>(
        &'a self,
        repository: &'a crate::git::RepositoryHandle,
        principal: &'a Principal,
    ) -> MutationContext<'a> {
        MutationContext {
            repository,
            protection: self.protection.as_ref(),
            principal,
            noreply_domain: &self.noreply_domain,
        }
    }
}
