use axum::{extract::State, http::StatusCode, Json};
use bookreview_db::UserStore;
use bookreview_http::{ApiJson, AppError};
use serde_json::json;

use super::models::{LoginRequest, LoginResponse, SignupRequest, SignupResponse};
use crate::modules::users::models::UserProfile;
use crate::state::AppState;
use crate::utils::{hash_password, trimmed, validate, verify_password};

const INVALID_CREDENTIALS: &str = "Invalid email or password.";

/// Registers an account. No token is issued; clients log in afterwards.
pub async fn signup(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>), AppError> {
    let input = input.normalized();
    validate(&input)?;

    if state.store.find_user_by_email(&input.email).await?.is_some() {
        return Err(duplicate("email", "User with this email already exists."));
    }
    if state.store.find_user_by_username(&input.username).await?.is_some() {
        return Err(duplicate("username", "Username is already taken."));
    }

    let password_hash = hash_password(input.password.clone()).await?;
    let user = state.store.insert_user(input.into_new_user(password_hash)).await?;
    tracing::info!(user_id = %user.id, username = %user.username, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            message: "User registered successfully. Please log in.".to_string(),
            user: UserProfile::from(&user),
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let (Some(email), Some(password)) = (
        trimmed(input.email),
        input.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::bad_request("Please provide both email and password."));
    };

    let Some(user) = state.store.find_user_by_email(&email.to_lowercase()).await? else {
        tracing::debug!("login for unknown email");
        return Err(AppError::unauthorized(INVALID_CREDENTIALS));
    };

    if !verify_password(password, user.password_hash.clone()).await? {
        tracing::info!(user_id = %user.id, "login rejected: wrong password");
        return Err(AppError::unauthorized(INVALID_CREDENTIALS));
    }

    let token = state.signer.issue(user.id, user.is_admin)?;
    tracing::info!(user_id = %user.id, "user logged in");

    Ok(Json(LoginResponse {
        message: "Login successful.".to_string(),
        user: UserProfile::from(&user),
        token,
    }))
}

fn duplicate(field: &str, message: &str) -> AppError {
    AppError::conflict(vec![json!({ "field": field, "error": "duplicate" })], message)
}
