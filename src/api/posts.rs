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
use super::{ApiError, ApiResponse, AppState, CreatePostRequest, PostDetail};
use crate::db::Post;
use crate::services::PostPatch;

/// POST /v1/posts/create
pub async fn create_post(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    payload: Result<Json<CreatePostRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Post>>), ApiError> {
    let Json(payload) = payload?;

    let post = state
        .posts
        .create(auth.id, &payload.title, &payload.content, payload.tags)
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(post))))
}

/// GET /v1/posts/{post_id}
/// The post together with its comments.
pub async fn get_post(
    State(state): State<Arc<AppState>>,
    post_id: Result<Path<i32>, PathRejection>,
) -> Result<Json<ApiResponse<PostDetail>>, ApiError> {
    let Path(post_id) = post_id?;
    let post_id = validate_post_id(post_id)?;

    let post = state.posts.get(post_id).await?;
    let comments = state.comments.list_for_post(post_id).await?;

    Ok(Json(ApiResponse::success(PostDetail { post, comments })))
}

/// PATCH /v1/posts/{post_id}
/// Partial update guarded by the post's version.
pub async fn update_post(
    State(state): State<Arc<AppState>>,
    post_id: Result<Path<i32>, PathRejection>,
    payload: Result<Json<PostPatch>, JsonRejection>,
) -> Result<Json<ApiResponse<Post>>, ApiError> {
    let Path(post_id) = post_id?;
    let post_id = validate_post_id(post_id)?;
    let Json(patch) = payload?;

    let post = state.posts.patch(post_id, patch).await?;

    Ok(Json(ApiResponse::success(post)))
}

/// DELETE /v1/posts/{post_id}
pub async fn delete_post(
    State(state): State<Arc<AppState>>,
    post_id: Result<Path<i32>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(post_id) = post_id?;
    let post_id = validate_post_id(post_id)?;

    state.posts.delete(post_id).await?;

    Ok(StatusCode::NO_CONTENT)
}
