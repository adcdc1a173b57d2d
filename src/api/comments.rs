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
use super::validation::validate_post_id;
use super::{ApiError, ApiResponse, AppState, CreateCommentRequest};
use crate::db::{Comment, CommentWithAuthor};

/// POST /v1/comments/create
pub async fn create_comment(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    payload: Result<Json<CreateCommentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Comment>>), ApiError> {
    let Json(payload) = payload?;
    let post_id = validate_post_id(payload.post_id)?;

    let comment = state
        .comments
        .create(post_id, auth.id, &payload.content)
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(comment))))
}

/// GET /v1/comments/{post_id}
pub async fn list_comments(
    State(state): State<Arc<AppState>>,
    post_id: Result<Path<i32>, PathRejection>,
) -> Result<Json<ApiResponse<Vec<CommentWithAuthor>>>, ApiError> {
    let Path(post_id) = post_id?;
    let post_id = validate_post_id(post_id)?;

    let comments = state.comments.list_for_post(post_id).await?;

    Ok(Json(ApiResponse::success(comments)))
}
