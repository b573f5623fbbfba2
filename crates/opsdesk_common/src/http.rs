// --- File: crates/opsdesk_common/src/http.rs ---
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::error::{HttpStatusCode, OpsdeskError};

pub mod client;

/// Renders the uniform failure body `{"success": false, "code", "message"}`.
pub fn error_response(status: u16, code: &str, message: &str) -> Response {
    let status_code = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = Json(json!({
        "success": false,
        "code": code,
        "message": message,
    }));
    (status_code, body).into_response()
}

/// Extension trait for converting errors into an Axum HTTP response.
pub trait IntoHttpResponse {
    fn into_http_response(self) -> Response;
}

impl IntoHttpResponse for OpsdeskError {
    fn into_http_response(self) -> Response {
        // Storage and config details stay in the logs.
        let message = match &self {
            OpsdeskError::DatabaseError(_)
            | OpsdeskError::ConfigError(_)
            | OpsdeskError::InternalError(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };
        error_response(self.status_code(), self.code(), &message)
    }
}

impl IntoResponse for OpsdeskError {
    fn into_response(self) -> Response {
        self.into_http_response()
    }
}

/// Converts a `Result<T, OpsdeskError>` into a handler-friendly `Result<T, Response>`.
pub fn handle_result<T>(result: Result<T, OpsdeskError>) -> Result<T, Response>
where
    T: IntoResponse,
{
    result.map_err(|err| err.into_response())
}

/// Same as [`handle_result`], wrapping the success value in `Json`.
pub fn handle_json_result<T>(result: Result<T, OpsdeskError>) -> Result<Json<T>, Response>
where
    T: serde::Serialize,
{
    result.map(Json).map_err(|err| err.into_response())
}

/// Maps a domain error through `f` before rendering it.
pub fn map_json_error<T, E, F>(result: Result<T, E>, f: F) -> Result<Json<T>, Response>
where
    T: serde::Serialize,
    F: FnOnce(E) -> OpsdeskError,
{
    result.map(Json).map_err(|err| f(err).into_response())
}
