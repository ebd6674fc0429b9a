use fixbid_core::config::{AppConfig, LoadOptions};
use serde_json::json;

/// Renders the effective configuration after file, environment, and default
/// layering. Nothing here is secret; the payload is safe to paste into a
/// support ticket.
pub fn run() -> String {
    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            let payload = json!({
                "database": {
                    "url": config.database.url,
                    "max_connections": config.database.max_connections,
                    "timeout_secs": config.database.timeout_secs,
                },
                "server": {
                    "bind_address": config.server.bind_address,
                    "port": config.server.port,
                },
                "workflow": {
                    "fanout_radius_km": config.workflow.fanout_radius_km,
                    "browse_radius_km": config.workflow.browse_radius_km,
                    "quote_window_minutes": config.workflow.quote_window_minutes,
                    "request_expiry_days": config.workflow.request_expiry_days,
                    "min_deposit_balance": config.workflow.min_deposit_balance,
                    "currency": config.workflow.currency,
                },
                "logging": {
                    "level": config.logging.level,
                },
            });
            serde_json::to_string_pretty(&payload)
                .unwrap_or_else(|error| format!("{{\"error\":\"{error}\"}}"))
        }
        Err(error) => {
            json!({"error": format!("configuration issue: {error}")}).to_string()
        }
    }
}
