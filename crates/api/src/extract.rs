use crate::error::ApiError;
use crate::AppState;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use fintrack_core::auth::{bearer_token, AuthError};
use uuid::Uuid;

/// The authenticated caller, resolved from the bearer token.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Uuid);

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(verifier) = &state.auth else {
            return Err(ApiError::Unavailable);
        };

        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(bearer_token)
            .ok_or(ApiError::Unauthorized)?;

        match verifier.verify(token).await {
            Ok(user_id) => Ok(AuthUser(user_id)),
            Err(AuthError::InvalidToken) => Err(ApiError::Unauthorized),
            Err(AuthError::Upstream(err)) => Err(ApiError::Internal(err)),
        }
    }
}
