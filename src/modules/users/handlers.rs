use axum::{extract::State, Json};
use bookreview_authz::require_admin;
use bookreview_db::{UserId, UserStore};
use bookreview_http::{ApiJson, ApiPath, AppError};
use serde_json::{json, Value};

use super::models::{
    AdminUpdateUser, ProfileEnvelope, PublicProfile, PublicProfileEnvelope, UpdateProfile,
    UserListEnvelope, UserProfile,
};
use crate::extract::CurrentUser;
use crate::state::AppState;
use crate::utils::{hash_password, validate};

pub async fn get_profile(caller: CurrentUser) -> Json<ProfileEnvelope> {
    Json(ProfileEnvelope {
        message: "User profile fetched successfully.".to_string(),
        user: UserProfile::from(&caller.user),
    })
}

pub async fn update_profile(
    State(state): State<AppState>,
    caller: CurrentUser,
    ApiJson(input): ApiJson<UpdateProfile>,
) -> Result<Json<ProfileEnvelope>, AppError> {
    let mut input = input.normalized();
    validate(&input)?;

    let password_hash = match input.password.take() {
        Some(plain) => Some(hash_password(plain).await?),
        None => None,
    };

    let user = state
        .store
        .update_user(caller.user.id, input.into_patch(password_hash))
        .await?
        .ok_or_else(|| AppError::not_found("User not found."))?;
    tracing::info!(user_id = %user.id, "profile updated");

    Ok(Json(ProfileEnvelope {
        message: "User profile updated successfully.".to_string(),
        user: UserProfile::from(&user),
    }))
}

pub async fn get_public_profile(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<UserId>,
) -> Result<Json<PublicProfileEnvelope>, AppError> {
    let user = state
        .store
        .get_user(id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found."))?;

    Ok(Json(PublicProfileEnvelope {
        message: "User public profile fetched successfully.".to_string(),
        user: PublicProfile::from(&user),
    }))
}

pub async fn list_users(
    State(state): State<AppState>,
    caller: CurrentUser,
) -> Result<Json<UserListEnvelope>, AppError> {
    require_admin(&caller.principal)?;

    let users = state.store.list_users().await?;

    Ok(Json(UserListEnvelope {
        message: "Users fetched successfully.".to_string(),
        users: users.iter().map(UserProfile::from).collect(),
    }))
}

pub async fn update_user(
    State(state): State<AppState>,
    caller: CurrentUser,
    ApiPath(id): ApiPath<UserId>,
    ApiJson(input): ApiJson<AdminUpdateUser>,
) -> Result<Json<ProfileEnvelope>, AppError> {
    require_admin(&caller.principal)?;

    let input = input.normalized();
    validate(&input)?;

    let user = state
        .store
        .update_user(id, input.into())
        .await?
        .ok_or_else(|| AppError::not_found("User not found."))?;
    tracing::info!(user_id = %user.id, admin = %caller.user.id, is_admin = user.is_admin, "user updated by admin");

    Ok(Json(ProfileEnvelope {
        message: "User updated by admin.".to_string(),
        user: UserProfile::from(&user),
    }))
}

/// Reviews written by the removed account are kept.
pub async fn delete_user(
    State(state): State<AppState>,
    caller: CurrentUser,
    ApiPath(id): ApiPath<UserId>,
) -> Result<Json<Value>, AppError> {
    require_admin(&caller.principal)?;

    let user = state
        .store
        .delete_user(id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found."))?;
    tracing::info!(user_id = %user.id, admin = %caller.user.id, "user deleted");

    Ok(Json(json!({ "message": "User removed successfully." })))
}
