// --- File: crates/opsdesk_gcal/src/oauth.rs ---
//! Operator calendar connect flow.
//!
//! The operator is sent to Google's consent screen with a signed `state`
//! naming them. On callback the code is exchanged for a refresh token, which
//! is encrypted before it is stored. The access token from that exchange is
//! used once to look up the account email and then dropped.

use chrono::{DateTime, Duration, Utc};
use opsdesk_codec::{SecretCipher, TokenSigner};
use opsdesk_common::models::CalendarAccount;
use opsdesk_common::post_form;
use opsdesk_config::GcalConfig;
use opsdesk_db::CalendarAccountRepository;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::auth::{hub_with_token, CALENDAR_SCOPE};
use crate::error::GcalError;

pub const AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";

/// How long an operator has to finish the consent screen.
pub const STATE_TTL_MINUTES: i64 = 10;

#[derive(Serialize)]
struct AuthorizationParams<'a> {
    client_id: &'a str,
    redirect_uri: &'a str,
    response_type: &'a str,
    scope: &'a str,
    access_type: &'a str,
    prompt: &'a str,
    state: &'a str,
}

#[derive(Serialize)]
struct CodeExchangeForm<'a> {
    code: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
    redirect_uri: &'a str,
    grant_type: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// Builds the consent URL for `operator_id`.
pub fn authorization_url(
    config: &GcalConfig,
    signer: &TokenSigner,
    operator_id: &str,
    now: DateTime<Utc>,
) -> Result<String, GcalError> {
    let nonce = uuid::Uuid::new_v4().to_string();
    let state = signer.sign_oauth_state(operator_id, &nonce, now, Duration::minutes(STATE_TTL_MINUTES))?;

    let query = serde_urlencoded::to_string(AuthorizationParams {
        client_id: &config.client_id,
        redirect_uri: &config.redirect_uri,
        response_type: "code",
        scope: CALENDAR_SCOPE,
        // offline + consent makes Google return a refresh token every time
        access_type: "offline",
        prompt: "consent",
        state: &state,
    })
    .map_err(|e| GcalError::Connector(e.to_string()))?;

    Ok(format!("{AUTH_ENDPOINT}?{query}"))
}

/// Verifies the callback `state` and returns the operator it was issued to.
pub fn operator_from_state(
    signer: &TokenSigner,
    state: &str,
    now: DateTime<Utc>,
) -> Result<String, GcalError> {
    signer
        .verify_oauth_state(state, now)
        .map(|claims| claims.operator_id)
        .map_err(|e| {
            debug!("Rejected OAuth state: {}", e);
            GcalError::InvalidState
        })
}

/// Exchanges an authorization code at the token endpoint.
pub async fn exchange_code(config: &GcalConfig, code: &str) -> Result<TokenResponse, GcalError> {
    let form = CodeExchangeForm {
        code,
        client_id: &config.client_id,
        client_secret: &config.client_secret,
        redirect_uri: &config.redirect_uri,
        grant_type: "authorization_code",
    };

    let response = post_form(TOKEN_ENDPOINT, &form)
        .await
        .map_err(|e| GcalError::TokenExchange(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        warn!("Token endpoint returned {}: {}", status, body);
        return Err(GcalError::TokenExchange(format!(
            "token endpoint returned {status}"
        )));
    }

    response
        .json::<TokenResponse>()
        .await
        .map_err(|e| GcalError::TokenExchange(e.to_string()))
}

/// Looks up the email behind the connected calendar. Best-effort.
async fn provider_email(access_token: String) -> Option<String> {
    let hub = match hub_with_token(access_token) {
        Ok(hub) => hub,
        Err(e) => {
            warn!("Could not build calendar client: {}", e);
            return None;
        }
    };
    match hub.calendars().get("primary").doit().await {
        Ok((_response, calendar)) => calendar.id,
        Err(e) => {
            warn!("Could not read primary calendar id: {}", e);
            None
        }
    }
}

/// Stores the connected account for the operator named in `state`.
pub async fn complete_connect<S>(
    store: &S,
    cipher: &SecretCipher,
    signer: &TokenSigner,
    config: &GcalConfig,
    code: &str,
    state: &str,
    now: DateTime<Utc>,
) -> Result<CalendarAccount, GcalError>
where
    S: CalendarAccountRepository + Sync,
{
    let operator_id = operator_from_state(signer, state, now)?;
    let tokens = exchange_code(config, code).await?;

    let refresh_token = tokens.refresh_token.ok_or_else(|| {
        GcalError::TokenExchange("no refresh token returned; consent must be re-granted".to_string())
    })?;

    let account = CalendarAccount {
        operator_id: operator_id.clone(),
        provider_email: provider_email(tokens.access_token).await,
        encrypted_refresh_token: cipher.encrypt(&refresh_token)?,
        calendar_id: config.default_calendar_id.clone(),
        sync_enabled: true,
        last_synced_at: Some(now),
        sync_error: None,
    };
    store.upsert_calendar_account(account.clone()).await?;

    info!(operator_id = %operator_id, "Calendar connected");
    Ok(account)
}
