use std::env;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

const ENV_CONFIG_PATH: &str = "FIXBID_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "fixbid.toml";

#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub workflow: WorkflowConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

/// Product constants of the quoting workflow. Deployment-tunable rather than
/// hard-coded; the defaults are the documented contract values.
#[derive(Clone, Debug, PartialEq)]
pub struct WorkflowConfig {
    /// Radius for the push fan-out on request creation.
    pub fanout_radius_km: f64,
    /// Wider radius for the passive provider browse feed.
    pub browse_radius_km: f64,
    /// How long a fresh request collects quotes.
    pub quote_window_minutes: i64,
    /// How long until an unanswered request expires.
    pub request_expiry_days: i64,
    /// Deposit floor a provider must hold to browse the feed.
    pub min_deposit_balance: Decimal,
    pub currency: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub fanout_radius_km: Option<f64>,
    pub browse_radius_km: Option<f64>,
    pub quote_window_minutes: Option<i64>,
    pub request_expiry_days: Option<i64>,
    pub min_deposit_balance: Option<Decimal>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://fixbid.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            server: ServerConfig { bind_address: "127.0.0.1".to_string(), port: 8080 },
            workflow: WorkflowConfig {
                fanout_radius_km: 15.0,
                browse_radius_km: 50.0,
                quote_window_minutes: 10,
                request_expiry_days: 7,
                min_deposit_balance: Decimal::new(500, 0),
                currency: "INR".to_string(),
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    database: Option<FileDatabase>,
    server: Option<FileServer>,
    workflow: Option<FileWorkflow>,
    logging: Option<FileLogging>,
}

#[derive(Debug, Default, Deserialize)]
struct FileDatabase {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct FileServer {
    bind_address: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct FileWorkflow {
    fanout_radius_km: Option<f64>,
    browse_radius_km: Option<f64>,
    quote_window_minutes: Option<i64>,
    request_expiry_days: Option<i64>,
    min_deposit_balance: Option<Decimal>,
    currency: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FileLogging {
    level: Option<String>,
    format: Option<LogFormat>,
}

impl AppConfig {
    /// Loads configuration in layers: defaults, then the TOML file, then
    /// `FIXBID_*` environment variables, then programmatic overrides.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let path = options
            .config_path
            .or_else(|| env::var(ENV_CONFIG_PATH).ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        if path.exists() {
            let raw = fs::read_to_string(&path)
                .map_err(|source| ConfigError::ReadFile { path: path.clone(), source })?;
            let file: FileConfig = toml::from_str(&raw)
                .map_err(|source| ConfigError::ParseFile { path: path.clone(), source })?;
            config.apply_file(file);
        } else if options.require_file {
            return Err(ConfigError::MissingConfigFile(path));
        }

        config.apply_env(env::vars())?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_file(&mut self, file: FileConfig) {
        if let Some(database) = file.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(server) = file.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
        }

        if let Some(workflow) = file.workflow {
            if let Some(value) = workflow.fanout_radius_km {
                self.workflow.fanout_radius_km = value;
            }
            if let Some(value) = workflow.browse_radius_km {
                self.workflow.browse_radius_km = value;
            }
            if let Some(value) = workflow.quote_window_minutes {
                self.workflow.quote_window_minutes = value;
            }
            if let Some(value) = workflow.request_expiry_days {
                self.workflow.request_expiry_days = value;
            }
            if let Some(value) = workflow.min_deposit_balance {
                self.workflow.min_deposit_balance = value;
            }
            if let Some(value) = workflow.currency {
                self.workflow.currency = value;
            }
        }

        if let Some(logging) = file.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env<I>(&mut self, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            match key.as_str() {
                "FIXBID_DATABASE_URL" => self.database.url = value,
                "FIXBID_DATABASE_MAX_CONNECTIONS" => {
                    self.database.max_connections = parse_env(&key, &value)?;
                }
                "FIXBID_DATABASE_TIMEOUT_SECS" => {
                    self.database.timeout_secs = parse_env(&key, &value)?;
                }
                "FIXBID_BIND_ADDRESS" => self.server.bind_address = value,
                "FIXBID_PORT" => self.server.port = parse_env(&key, &value)?,
                "FIXBID_FANOUT_RADIUS_KM" => {
                    self.workflow.fanout_radius_km = parse_env(&key, &value)?;
                }
                "FIXBID_BROWSE_RADIUS_KM" => {
                    self.workflow.browse_radius_km = parse_env(&key, &value)?;
                }
                "FIXBID_QUOTE_WINDOW_MINUTES" => {
                    self.workflow.quote_window_minutes = parse_env(&key, &value)?;
                }
                "FIXBID_REQUEST_EXPIRY_DAYS" => {
                    self.workflow.request_expiry_days = parse_env(&key, &value)?;
                }
                "FIXBID_MIN_DEPOSIT_BALANCE" => {
                    self.workflow.min_deposit_balance = parse_env(&key, &value)?;
                }
                "FIXBID_CURRENCY" => self.workflow.currency = value,
                "FIXBID_LOG_LEVEL" => self.logging.level = value,
                "FIXBID_LOG_FORMAT" => {
                    self.logging.format = value.parse().map_err(|_| {
                        ConfigError::InvalidEnvOverride { key: key.clone(), value: value.clone() }
                    })?;
                }
                _ => {}
            }
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(url) = overrides.database_url {
            self.database.url = url;
        }
        if let Some(bind_address) = overrides.bind_address {
            self.server.bind_address = bind_address;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
        if let Some(format) = overrides.log_format {
            self.logging.format = format;
        }
        if let Some(value) = overrides.fanout_radius_km {
            self.workflow.fanout_radius_km = value;
        }
        if let Some(value) = overrides.browse_radius_km {
            self.workflow.browse_radius_km = value;
        }
        if let Some(value) = overrides.quote_window_minutes {
            self.workflow.quote_window_minutes = value;
        }
        if let Some(value) = overrides.request_expiry_days {
            self.workflow.request_expiry_days = value;
        }
        if let Some(value) = overrides.min_deposit_balance {
            self.workflow.min_deposit_balance = value;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Validation("database.url must not be empty".to_string()));
        }
        if self.workflow.fanout_radius_km <= 0.0 {
            return Err(ConfigError::Validation(
                "workflow.fanout_radius_km must be positive".to_string(),
            ));
        }
        if self.workflow.browse_radius_km < self.workflow.fanout_radius_km {
            return Err(ConfigError::Validation(
                "workflow.browse_radius_km must not be narrower than the fan-out radius"
                    .to_string(),
            ));
        }
        if self.workflow.quote_window_minutes <= 0 {
            return Err(ConfigError::Validation(
                "workflow.quote_window_minutes must be positive".to_string(),
            ));
        }
        if self.workflow.request_expiry_days <= 0 {
            return Err(ConfigError::Validation(
                "workflow.request_expiry_days must be positive".to_string(),
            ));
        }
        if self.workflow.min_deposit_balance < Decimal::ZERO {
            return Err(ConfigError::Validation(
                "workflow.min_deposit_balance must not be negative".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use rust_decimal::Decimal;

    use super::{AppConfig, ConfigError, LoadOptions, LogFormat};

    #[test]
    fn defaults_carry_the_documented_contract_values() {
        let config = AppConfig::default();
        assert_eq!(config.workflow.fanout_radius_km, 15.0);
        assert_eq!(config.workflow.browse_radius_km, 50.0);
        assert_eq!(config.workflow.quote_window_minutes, 10);
        assert_eq!(config.workflow.request_expiry_days, 7);
        assert_eq!(config.workflow.min_deposit_balance, Decimal::new(500, 0));
    }

    #[test]
    fn file_values_override_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            "[database]\nurl = \"sqlite::memory:\"\n\n[workflow]\nfanout_radius_km = 25.0\n\n[logging]\nformat = \"json\""
        )
        .expect("write config");

        let config = AppConfig::load(LoadOptions {
            config_path: Some(file.path().to_path_buf()),
            ..LoadOptions::default()
        })
        .expect("load");

        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.workflow.fanout_radius_km, 25.0);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn missing_required_file_is_an_error() {
        let result = AppConfig::load(LoadOptions {
            config_path: Some("does/not/exist.toml".into()),
            require_file: true,
            ..LoadOptions::default()
        });

        assert!(matches!(result, Err(ConfigError::MissingConfigFile(_))));
    }

    #[test]
    fn malformed_env_override_is_reported_with_key_and_value() {
        let mut config = AppConfig::default();
        let error = config
            .apply_env(vec![("FIXBID_PORT".to_string(), "not-a-port".to_string())])
            .expect_err("parse failure");

        assert!(matches!(
            error,
            ConfigError::InvalidEnvOverride { ref key, ref value }
                if key == "FIXBID_PORT" && value == "not-a-port"
        ));
    }

    #[test]
    fn browse_radius_narrower_than_fanout_fails_validation() {
        let mut config = AppConfig::default();
        config.workflow.browse_radius_km = 5.0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }
}
