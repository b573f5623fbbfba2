// --- File: crates/opsdesk_meetings/src/extract.rs ---

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::{header::USER_AGENT, request::Parts, HeaderMap};
use std::convert::Infallible;
use std::net::SocketAddr;

/// Where a request came from, recorded on meetings and audit entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientMeta {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// How much of `X-Forwarded-For` to believe when identifying a client.
///
/// Each trusted proxy appends the address it received the request from, so
/// with `n` proxies the client is the `n`-th entry from the right. Anything
/// further left was written by the client and is ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientIpPolicy {
    pub trusted_proxy_hops: usize,
}

impl ClientIpPolicy {
    pub fn new(trusted_proxy_hops: usize) -> Self {
        Self { trusted_proxy_hops }
    }

    fn forwarded_client<'a>(&self, headers: &'a HeaderMap) -> Option<&'a str> {
        if self.trusted_proxy_hops == 0 {
            return None;
        }
        let Some(forwarded) = header_str(headers, "x-forwarded-for") else {
            return header_str(headers, "x-real-ip");
        };
        let hops: Vec<&str> = forwarded
            .split(',')
            .map(str::trim)
            .filter(|hop| !hop.is_empty())
            .collect();
        // Fewer hops than proxies: every entry came from a trusted proxy.
        let index = hops.len().saturating_sub(self.trusted_proxy_hops);
        hops.get(index).copied()
    }
}

impl ClientMeta {
    /// Client address per `policy`, falling back to the socket peer.
    pub fn from_parts(parts: &Parts, policy: ClientIpPolicy) -> Self {
        let ip = policy
            .forwarded_client(&parts.headers)
            .map(str::to_string)
            .or_else(|| {
                parts
                    .extensions
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip().to_string())
            });

        let user_agent = parts
            .headers
            .get(USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .map(|ua| ua.chars().take(512).collect());

        Self { ip, user_agent }
    }

    /// Key for per-client rate limiting.
    pub fn rate_limit_key(&self) -> &str {
        self.ip.as_deref().unwrap_or("unknown")
    }
}

impl<S> FromRequestParts<S> for ClientMeta
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let policy = parts
            .extensions
            .get::<ClientIpPolicy>()
            .copied()
            .unwrap_or_default();
        Ok(Self::from_parts(parts, policy))
    }
}
