//! Axum HTTP handlers.

pub mod ask;
pub mod ingest;
pub mod status;

use axum::http::StatusCode;

use crate::error::Error;

/// Map a service error onto the `(StatusCode, String)` pair handlers return.
pub fn error_response(err: Error) -> (StatusCode, String) {
    let status = match &err {
        Error::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        Error::NotReady | Error::Upstream(_) => StatusCode::SERVICE_UNAVAILABLE,
        Error::Source(_) => StatusCode::BAD_GATEWAY,
        Error::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!("{err}");
    }
    (status, err.to_string())
}
