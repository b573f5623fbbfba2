// --- File: crates/services/opsdesk_backend/src/app_state.rs ---
use axum::{extract::State, http::StatusCode, response::Json};
use opsdesk_config::AppConfig;
use opsdesk_db::SqlStore;
use serde::Serialize;
use std::sync::Arc;

/// State for the service-level routes (welcome, health).
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: SqlStore,
}

#[derive(Serialize, Debug)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: bool,
    pub calendar_sync: bool,
}

pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database = state.store.is_healthy().await;
    let status = if database {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(HealthResponse {
            status: if database { "ok" } else { "degraded" },
            database,
            calendar_sync: state.config.use_gcal && state.config.gcal.is_some(),
        }),
    )
}
