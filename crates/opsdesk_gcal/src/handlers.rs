// File: crates/opsdesk_gcal/src/handlers.rs
use axum::{
    extract::{Query, State},
    response::Json,
    Extension,
};
use chrono::{DateTime, Utc};
use opsdesk_codec::{SecretCipher, TokenSigner};
use opsdesk_common::OperatorId;
use opsdesk_config::GcalConfig;
use opsdesk_db::SchedulingStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::error::GcalError;
use crate::oauth::{authorization_url, complete_connect};

// Shared state for the calendar connect surface
#[derive(Clone)]
pub struct GcalState<S> {
    pub store: S,
    pub cipher: Arc<SecretCipher>,
    pub signer: Arc<TokenSigner>,
    /// `None` when the Google integration is switched off.
    pub config: Option<GcalConfig>,
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CalendarStatusResponse {
    pub connected: bool,
    pub provider_email: Option<String>,
    pub calendar_id: Option<String>,
    pub sync_enabled: bool,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub sync_error: Option<String>,
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ConnectResponse {
    pub authorization_url: String,
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DisconnectResponse {
    pub success: bool,
    pub disconnected: bool,
}

#[derive(Deserialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
pub struct OAuthCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    /// Set by the provider when the operator declined consent.
    pub error: Option<String>,
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ConnectedResponse {
    pub success: bool,
    pub operator_id: String,
    pub provider_email: Option<String>,
}

/// Connection status for the calling operator. Never includes credentials.
pub async fn calendar_status_handler<S: SchedulingStore>(
    State(state): State<Arc<GcalState<S>>>,
    Extension(OperatorId(operator_id)): Extension<OperatorId>,
) -> Result<Json<CalendarStatusResponse>, GcalError> {
    let account = state.store.get_calendar_account(&operator_id).await?;
    let response = match account {
        Some(account) => CalendarStatusResponse {
            connected: true,
            provider_email: account.provider_email,
            calendar_id: Some(account.calendar_id),
            sync_enabled: account.sync_enabled,
            last_synced_at: account.last_synced_at,
            sync_error: account.sync_error,
        },
        None => CalendarStatusResponse {
            connected: false,
            provider_email: None,
            calendar_id: None,
            sync_enabled: false,
            last_synced_at: None,
            sync_error: None,
        },
    };
    Ok(Json(response))
}

pub async fn connect_handler<S: SchedulingStore>(
    State(state): State<Arc<GcalState<S>>>,
    Extension(OperatorId(operator_id)): Extension<OperatorId>,
) -> Result<Json<ConnectResponse>, GcalError> {
    let config = state.config.as_ref().ok_or(GcalError::NotConfigured)?;
    let authorization_url = authorization_url(config, &state.signer, &operator_id, Utc::now())?;
    Ok(Json(ConnectResponse { authorization_url }))
}

pub async fn disconnect_handler<S: SchedulingStore>(
    State(state): State<Arc<GcalState<S>>>,
    Extension(OperatorId(operator_id)): Extension<OperatorId>,
) -> Result<Json<DisconnectResponse>, GcalError> {
    let disconnected = state.store.delete_calendar_account(&operator_id).await?;
    if disconnected {
        info!(operator_id = %operator_id, "Calendar disconnected");
    }
    Ok(Json(DisconnectResponse {
        success: true,
        disconnected,
    }))
}

/// Provider redirect target. The signed `state` identifies the operator.
pub async fn oauth_callback_handler<S: SchedulingStore>(
    State(state): State<Arc<GcalState<S>>>,
    Query(query): Query<OAuthCallbackQuery>,
) -> Result<Json<ConnectedResponse>, GcalError> {
    let config = state.config.as_ref().ok_or(GcalError::NotConfigured)?;
    if let Some(error) = query.error {
        return Err(GcalError::AuthorizationDenied(error));
    }
    let oauth_state = query.state.ok_or(GcalError::InvalidState)?;
    let code = query
        .code
        .ok_or_else(|| GcalError::AuthorizationDenied("missing authorization code".to_string()))?;

    let account = complete_connect(
        &state.store,
        &state.cipher,
        &state.signer,
        config,
        &code,
        &oauth_state,
        Utc::now(),
    )
    .await?;

    Ok(Json(ConnectedResponse {
        success: true,
        operator_id: account.operator_id,
        provider_email: account.provider_email,
    }))
}
