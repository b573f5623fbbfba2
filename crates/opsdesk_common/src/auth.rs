// --- File: crates/opsdesk_common/src/auth.rs ---

use axum::{
    body::Body as AxumBody,
    extract::State,
    http::{header::AUTHORIZATION, Request},
    middleware::Next,
    response::Response,
};
use constant_time_eq::constant_time_eq;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::http::error_response;

pub const OPERATOR_ID_HEADER: &str = "X-Operator-Id";

/// State for [`operator_auth_middleware`]: the shared operator API secret.
#[derive(Clone)]
pub struct OperatorAuthState {
    pub api_secret: Arc<String>,
}

impl OperatorAuthState {
    pub fn new(api_secret: impl Into<String>) -> Self {
        Self {
            api_secret: Arc::new(api_secret.into()),
        }
    }
}

/// The authenticated operator, inserted as a request extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorId(pub String);

fn unauthorized(message: &str) -> Response {
    error_response(401, "UNAUTHORIZED", message)
}

/// Axum middleware guarding the operator surface.
///
/// Requires `Authorization: Bearer <operator_api_secret>` and a non-empty
/// `X-Operator-Id` header. On success the operator id is available to
/// handlers as `Extension<OperatorId>`.
pub async fn operator_auth_middleware(
    State(auth_state): State<OperatorAuthState>,
    mut req: Request<AxumBody>,
    next: Next,
) -> Response {
    if auth_state.api_secret.is_empty() {
        warn!("Operator API secret is not configured; rejecting operator request");
        return error_response(500, "INTERNAL_ERROR", "Operator authentication is not configured");
    }

    let provided = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    let Some(provided) = provided else {
        warn!("Operator request without bearer credentials");
        return unauthorized("Missing bearer credentials");
    };

    if !constant_time_eq(provided.as_bytes(), auth_state.api_secret.as_bytes()) {
        warn!("Operator request with invalid credentials");
        return unauthorized("Invalid credentials");
    }

    let operator_id = req
        .headers()
        .get(OPERATOR_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string);

    let Some(operator_id) = operator_id else {
        warn!("Operator request missing {} header", OPERATOR_ID_HEADER);
        return unauthorized("Missing X-Operator-Id header");
    };

    debug!(operator_id = %operator_id, "Operator request authenticated");
    req.extensions_mut().insert(OperatorId(operator_id));
    next.run(req).await
}
