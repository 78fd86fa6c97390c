//! Acting principal, as identified by the authenticating proxy in front of the service

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::api::error::ApiError;
use crate::policy::Principal;

/// Header carrying the authenticated user name
pub const USER_HEADER: &str = "x-refgate-user";
/// Header carrying a comma separated list of the user's teams
pub const TEAMS_HEADER: &str = "x-refgate-teams";

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let name = parts
            .headers
            .get(USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ApiError::unauthorized("request does not identify a user"))?;

        let teams = parts
            .headers
            .get(TEAMS_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|team| !team.is_empty())
                    .map(String::from)
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        Ok(Principal::new(name).with_teams(teams))
    }
}
