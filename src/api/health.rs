use axum::{Json, extract::State};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, HealthResponse};

/// GET /v1/health
pub async fn health(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<HealthResponse>>, ApiError> {
    state
        .store
        .ping()
        .await
        .map_err(|e| ApiError::DatabaseError(format!("health check failed: {e}")))?;

    Ok(Json(ApiResponse::success(HealthResponse {
        status: "ok",
        env: state.config.general.environment.clone(),
        version: state.config.general.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })))
}
