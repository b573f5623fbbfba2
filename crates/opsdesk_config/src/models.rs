// --- File: crates/opsdesk_config/src/models.rs ---

use serde::{Deserialize, Serialize};

// --- General Server Config ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

// --- Database Config ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    pub url: String, // e.g. sqlite:data/opsdesk.db, overridable via OPSDESK__DATABASE__URL
}

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// When set, logs are additionally written to a daily rolling file in this directory.
    #[serde(default)]
    pub directory: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: None,
        }
    }
}

// --- Meeting engine Config ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MeetingsConfig {
    /// Base URL used when building the view/cancel/reschedule links sent to clients.
    pub public_base_url: String,
    /// Widest date range the public slots endpoint accepts.
    #[serde(default = "default_max_range_days")]
    pub max_range_days: i64,
    /// Upper bound for every calendar/notification call made after a commit.
    #[serde(default = "default_downstream_timeout_secs")]
    pub downstream_timeout_secs: u64,
    #[serde(default = "default_reminder_interval_secs")]
    pub reminder_interval_secs: u64,
    #[serde(default = "default_dedupe_window_minutes")]
    pub dedupe_window_minutes: i64,
    #[serde(default = "default_view_token_ttl_days")]
    pub view_token_ttl_days: i64,
    /// Timezone given to operators whose settings row is created lazily.
    #[serde(default = "default_timezone")]
    pub default_timezone: String,
}

impl Default for MeetingsConfig {
    fn default() -> Self {
        Self {
            public_base_url: "http://localhost:8086".to_string(),
            max_range_days: default_max_range_days(),
            downstream_timeout_secs: default_downstream_timeout_secs(),
            reminder_interval_secs: default_reminder_interval_secs(),
            dedupe_window_minutes: default_dedupe_window_minutes(),
            view_token_ttl_days: default_view_token_ttl_days(),
            default_timezone: default_timezone(),
        }
    }
}

// --- Rate limit Config ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RateLimitConfig {
    #[serde(default = "default_requests_per_window")]
    pub requests_per_window: i64,
    #[serde(default = "default_window_minutes")]
    pub window_minutes: i64,
    /// Reverse proxies in front of the service that append to `X-Forwarded-For`.
    /// Zero keys clients on the socket peer and ignores forwarding headers.
    #[serde(default)]
    pub trusted_proxy_hops: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_window: default_requests_per_window(),
            window_minutes: default_window_minutes(),
            trusted_proxy_hops: 0,
        }
    }
}

// --- Secrets ---
// Every value may be the marker "secret_from_env"; it is then replaced with
// SECRETS_<FIELD> from the environment (see apply_env_overrides_from_marker).
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SecretsConfig {
    /// Hashed into the AES-256-GCM key protecting stored calendar refresh tokens.
    pub encryption_secret: String,
    /// HMAC key for capability tokens and OAuth state.
    pub token_signing_secret: String,
    /// Shared bearer secret for the operator surface.
    pub operator_api_secret: String,
    /// Anti-automation verification secret; verification is skipped when absent.
    #[serde(default)]
    pub turnstile_secret: Option<String>,
}

// --- Google Calendar Config ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GcalConfig {
    pub client_id: String,
    pub client_secret: String, // usually "secret_from_env" -> GCAL_CLIENT_SECRET
    pub redirect_uri: String,
    #[serde(default = "default_calendar_id")]
    pub default_calendar_id: String,
}

/// Operator row seeded into the directory at startup.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OperatorSeed {
    pub id: String,
    pub display_name: String,
    pub email: String,
}

// --- Unified App Configuration ---
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    // Server config is mandatory
    pub server: ServerConfig,

    // --- Runtime Flags (optional in config file, default to false) ---
    #[serde(default)]
    pub use_gcal: bool,

    pub database: DatabaseConfig,
    pub secrets: SecretsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub meetings: MeetingsConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub gcal: Option<GcalConfig>,
    #[serde(default)]
    pub operators: Vec<OperatorSeed>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_range_days() -> i64 {
    30
}

fn default_downstream_timeout_secs() -> u64 {
    5
}

fn default_reminder_interval_secs() -> u64 {
    300
}

fn default_dedupe_window_minutes() -> i64 {
    60
}

fn default_view_token_ttl_days() -> i64 {
    7
}

fn default_timezone() -> String {
    "Asia/Riyadh".to_string()
}

fn default_requests_per_window() -> i64 {
    5
}

fn default_window_minutes() -> i64 {
    60
}

fn default_calendar_id() -> String {
    "primary".to_string()
}
