use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use super::error_response;
use crate::models::{Answer, AskRequest};
use crate::state::AppState;

/// POST /api/ask - retrieve context for the question and generate an answer.
pub async fn ask(
    State(state): State<AppState>,
    Json(req): Json<AskRequest>,
) -> Result<Json<Answer>, (StatusCode, String)> {
    let answer = state.service.ask(&req.question).await.map_err(error_response)?;
    Ok(Json(answer))
}
