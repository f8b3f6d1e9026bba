use axum::extract::FromRequestParts;
use axum::http::{header::AUTHORIZATION, request::Parts};
use bookreview_authz::Principal;
use bookreview_db::{User, UserStore};
use bookreview_http::AppError;

use crate::state::AppState;

/// The caller behind a valid `Authorization: Bearer <token>` header.
///
/// The account is re-read from the store so a deleted user or a revoked
/// admin flag takes effect before the token expires.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub principal: Principal,
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::unauthorized("not authorized, no token"))?;

        let claims = state.signer.verify(token).inspect_err(|e| {
            tracing::debug!(error = %e, "bearer token rejected");
        })?;

        let user = state
            .store
            .get_user(claims.sub)
            .await?
            .ok_or_else(|| AppError::unauthorized("not authorized, user not found"))?;

        let principal = Principal {
            user_id: user.id,
            is_admin: user.is_admin,
        };
        Ok(Self { user, principal })
    }
}
