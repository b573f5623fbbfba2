use crate::{apply_env_overrides_from_marker, AppConfig};

fn config_from_json(json: serde_json::Value) -> AppConfig {
    serde_json::from_value(json).expect("test config must deserialize")
}

#[test]
fn test_defaults_fill_optional_sections() {
    let config = config_from_json(serde_json::json!({
        "server": { "host": "127.0.0.1", "port": 8086 },
        "database": { "url": "sqlite::memory:" },
        "secrets": {
            "encryption_secret": "enc",
            "token_signing_secret": "sign",
            "operator_api_secret": "op"
        }
    }));

    assert_eq!(config.rate_limit.requests_per_window, 5);
    assert_eq!(config.rate_limit.window_minutes, 60);
    assert_eq!(config.rate_limit.trusted_proxy_hops, 0);
    assert_eq!(config.meetings.max_range_days, 30);
    assert_eq!(config.meetings.dedupe_window_minutes, 60);
    assert!(config.gcal.is_none());
    assert!(!config.use_gcal);
    assert!(config.operators.is_empty());
}

#[test]
fn test_secret_marker_is_replaced_from_env() {
    std::env::set_var("SECRETS_TOKEN_SIGNING_SECRET", "from-the-environment");
    let config = config_from_json(serde_json::json!({
        "server": { "host": "127.0.0.1", "port": 8086 },
        "database": { "url": "sqlite::memory:" },
        "secrets": {
            "encryption_secret": "plain",
            "token_signing_secret": "secret_from_env",
            "operator_api_secret": "op"
        }
    }));

    let resolved = apply_env_overrides_from_marker(config).unwrap();
    assert_eq!(resolved.secrets.token_signing_secret, "from-the-environment");
    assert_eq!(resolved.secrets.encryption_secret, "plain");
}
