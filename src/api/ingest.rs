use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use super::error_response;
use crate::ingest::{ConfluenceSource, DocumentSource, PdfSource};
use crate::models::{IngestRequest, IngestResponse};
use crate::state::AppState;

/// POST /api/ingest - rebuild the corpus from a Confluence space, or from the
/// configured PDF directory when no space key is given.
pub async fn ingest(
    State(state): State<AppState>,
    body: Option<Json<IngestRequest>>,
) -> Result<Json<IngestResponse>, (StatusCode, String)> {
    let req = body.map(|Json(r)| r).unwrap_or_default();

    let source: Box<dyn DocumentSource> = match req.space_key.as_deref().map(str::trim) {
        Some(space_key) if !space_key.is_empty() => Box::new(ConfluenceSource::new(
            state.http_client.clone(),
            state.config.confluence.clone(),
            space_key,
        )),
        _ => Box::new(PdfSource::new(state.config.pdf_path.clone())),
    };

    let summary = state
        .service
        .ingest_from(source.as_ref())
        .await
        .map_err(error_response)?;

    Ok(Json(IngestResponse {
        status: "success".to_string(),
        chunks: summary.chunk_count,
        documents: summary.document_count,
        corpus_id: summary.corpus_id,
    }))
}
