// Bearer-token gate for the API. Stands in for a real session framework:
// one configured token, one owning user.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::app::AppState;
use crate::error::ApiError;

/// The authenticated caller. Handlers that take this reject
/// requests without a valid `Authorization: Bearer` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: String,
}

pub fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match bearer_token(parts) {
            Some(token) if token == state.config.api_token => Ok(AuthUser {
                user_id: state.config.user_id.clone(),
            }),
            _ => {
                tracing::debug!(path = %parts.uri.path(), "rejected request without valid token");
                Err(ApiError::Unauthorized)
            }
        }
    }
}
