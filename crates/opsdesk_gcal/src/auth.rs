// File: crates/opsdesk_gcal/src/auth.rs
//
// Access tokens are obtained per operation from the operator's stored
// refresh token and dropped with the hub that used them.

use google_calendar3::{
    hyper_rustls::{self, HttpsConnectorBuilder},
    hyper_util::client::legacy::connect::HttpConnector,
    hyper_util::client::legacy::Client,
    CalendarHub,
};
use opsdesk_config::GcalConfig;
use yup_oauth2::{authorized_user::AuthorizedUserSecret, AuthorizedUserAuthenticator};

use crate::error::GcalError;

pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";

// Type aliases for clarity
type Connector = hyper_rustls::HttpsConnector<HttpConnector>;

/// A hub authorized with a single short-lived access token.
pub type HubType = CalendarHub<Connector>;

fn https_connector() -> Result<Connector, GcalError> {
    Ok(HttpsConnectorBuilder::new()
        .with_native_roots()
        .map_err(|e| GcalError::Connector(e.to_string()))?
        .https_or_http()
        .enable_http1()
        .build())
}

/// Builds a hub that presents `access_token` on every request it makes.
pub fn hub_with_token(access_token: String) -> Result<HubType, GcalError> {
    let client = Client::builder(hyper_util::rt::TokioExecutor::new()).build(https_connector()?);
    Ok(CalendarHub::new(client, access_token))
}

/// Exchanges a refresh token for an access token.
///
/// The authenticator is built for this one exchange and dropped afterwards,
/// so nothing outlives the call except the returned token.
pub async fn exchange_refresh_token(
    config: &GcalConfig,
    refresh_token: String,
) -> Result<String, GcalError> {
    let secret = AuthorizedUserSecret {
        client_id: config.client_id.clone(),
        client_secret: config.client_secret.clone(),
        refresh_token,
        key_type: "authorized_user".to_string(),
    };

    let auth = AuthorizedUserAuthenticator::builder(secret)
        .build()
        .await
        .map_err(|e| GcalError::TokenExchange(e.to_string()))?;

    let token = auth
        .token(&[CALENDAR_SCOPE])
        .await
        .map_err(|e| GcalError::TokenExchange(e.to_string()))?;

    token
        .token()
        .map(str::to_string)
        .ok_or_else(|| GcalError::TokenExchange("provider returned no access token".to_string()))
}
