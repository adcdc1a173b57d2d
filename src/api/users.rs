use axum::{
    Extension, Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
};
use std::sync::Arc;

use super::auth::AuthUser;
use super::validation::validate_user_id;
use super::{ApiError, ApiResponse, AppState, RegisterUserRequest};
use crate::db::User;
use crate::services::{Registration, UserError};

/// POST /v1/authentication/user
/// Registers an inactive user and mails the activation link.
pub async fn register_user(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Registration>>), ApiError> {
    let Json(payload) = payload?;

    crate::services::validation::validate_registration(
        &payload.username,
        &payload.email,
        &payload.password,
    )?;

    let registration = state
        .users
        .register(&payload.username, &payload.email, &payload.password)
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(registration))))
}

/// PUT /v1/users/activate/{token}
pub async fn activate_user(
    State(state): State<Arc<AppState>>,
    token: Result<Path<String>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(token) = token?;

    match state.users.activate(&token).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(UserError::NotFound) => Err(ApiError::validation(
            "invalid or expired activation token",
        )),
        Err(e) => Err(e.into()),
    }
}

/// GET /v1/users/{user_id}
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    user_id: Result<Path<i32>, PathRejection>,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    let Path(user_id) = user_id?;
    let user_id = validate_user_id(user_id)?;

    let user = state.users.get_user(user_id).await.map_err(|e| match e {
        UserError::NotFound => ApiError::not_found("User", user_id),
        other => other.into(),
    })?;

    Ok(Json(ApiResponse::success(user)))
}

/// PUT /v1/users/{user_id}/follow
/// The authenticated user starts following `user_id`.
pub async fn follow_user(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    user_id: Result<Path<i32>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(user_id) = user_id?;
    let user_id = validate_user_id(user_id)?;

    state.follows.follow(auth.id, user_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// PUT /v1/users/{user_id}/unfollow
pub async fn unfollow_user(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    user_id: Result<Path<i32>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(user_id) = user_id?;
    let user_id = validate_user_id(user_id)?;

    state.follows.unfollow(auth.id, user_id).await?;

    Ok(StatusCode::NO_CONTENT)
}
