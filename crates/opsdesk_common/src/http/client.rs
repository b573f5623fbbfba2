// --- File: crates/opsdesk_common/src/http/client.rs ---
use once_cell::sync::Lazy;
use reqwest::{Client, Error as ReqwestError, Response};
use std::time::Duration;

/// Default timeout for outbound HTTP requests in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Shared client for provider calls (token exchange, anti-automation checks).
pub static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
        .build()
        .unwrap_or_else(|_| Client::new())
});

/// POSTs an `application/x-www-form-urlencoded` body with the shared client.
pub async fn post_form<T: serde::Serialize + ?Sized>(
    url: &str,
    form: &T,
) -> Result<Response, ReqwestError> {
    HTTP_CLIENT.post(url).form(form).send().await
}
