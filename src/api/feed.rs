use axum::{
    Extension, Json,
    extract::{Query, State, rejection::QueryRejection},
};
use std::sync::Arc;

use super::auth::AuthUser;
use super::validation::feed_query;
use super::{ApiError, ApiResponse, AppState, FeedParams};
use crate::db::FeedPost;

/// GET /v1/users/feed?limit=&offset=&sort=
pub async fn get_feed(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    params: Result<Query<FeedParams>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<FeedPost>>>, ApiError> {
    let Query(params) = params?;
    let query = feed_query(&params)?;

    let feed = state.posts.feed(auth.id, query).await?;

    Ok(Json(ApiResponse::success(feed)))
}
