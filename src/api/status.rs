use axum::extract::State;
use axum::Json;

use crate::models::StatusResponse;
use crate::state::AppState;

/// GET /api/status - whether a corpus is loaded, and its size.
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(state.service.status())
}

/// GET /health
pub async fn health() -> &'static str {
    "ok"
}
