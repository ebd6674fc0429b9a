use std::env;
use std::sync::{Mutex, OnceLock};

use fixbid_cli::commands::{migrate, seed};
use serde_json::Value;

#[test]
fn migrate_returns_success_against_an_in_memory_database() {
    with_env(&[("FIXBID_DATABASE_URL", "sqlite::memory:?cache=shared")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_reports_config_failure_for_malformed_overrides() {
    with_env(&[("FIXBID_PORT", "not-a-port")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn seed_loads_demo_providers() {
    with_env(&[("FIXBID_DATABASE_URL", "sqlite::memory:?cache=shared")], || {
        let result = seed::run();
        assert_eq!(result.exit_code, 0, "expected successful seed run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "seed");
        assert_eq!(payload["status"], "ok");
        assert!(payload["message"]
            .as_str()
            .expect("message should be a string")
            .contains("demo providers"));
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "FIXBID_CONFIG",
        "FIXBID_DATABASE_URL",
        "FIXBID_DATABASE_MAX_CONNECTIONS",
        "FIXBID_DATABASE_TIMEOUT_SECS",
        "FIXBID_BIND_ADDRESS",
        "FIXBID_PORT",
        "FIXBID_FANOUT_RADIUS_KM",
        "FIXBID_BROWSE_RADIUS_KM",
        "FIXBID_QUOTE_WINDOW_MINUTES",
        "FIXBID_REQUEST_EXPIRY_DAYS",
        "FIXBID_MIN_DEPOSIT_BALANCE",
        "FIXBID_CURRENCY",
        "FIXBID_LOG_LEVEL",
        "FIXBID_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
