/// Configuration management for sentinel-cache

use crate::core::descriptor::ConnectionDescriptor;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Option names recognized by [`SentinelOptions::from_options`]
pub const OPT_SENTINEL_TIMEOUT: &str = "SENTINEL_TIMEOUT";
pub const OPT_PASSWORD: &str = "PASSWORD";
pub const OPT_CLOSE_CONNECTION: &str = "CLOSE_CONNECTION";
pub const OPT_MIN_OTHER_SENTINELS: &str = "MIN_OTHER_SENTINELS";
pub const OPT_READ_STRATEGY: &str = "READ_STRATEGY";

const DEFAULT_SENTINEL_TIMEOUT: Duration = Duration::from_secs(1);

/// Main sentinel-cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Which cluster to connect to
    pub connection: ConnectionConfig,
    /// Sentinel discovery and teardown behavior
    #[serde(default)]
    pub sentinel: SentinelOptions,
    /// Data connection settings
    #[serde(default)]
    pub store: StoreConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// `<cluster_name>/<host>:<port>,.../<db_index>`
    pub descriptor: String,
}

/// Options consumed by the connection manager
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentinelOptions {
    /// Socket timeout for sentinel queries, in seconds
    pub sentinel_timeout_sec: f64,
    /// Secret forwarded to both the sentinels and the data connection
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Actively disconnect pooled sockets on reset instead of only dropping them
    pub close_connection: bool,
    /// Minimum number of peer sentinels a primary report must carry
    pub min_other_sentinels: usize,
    /// Replica selection policy for reads
    pub read_strategy: ReadStrategy,
}

/// Data connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Timeout applied to connecting and to every command, in milliseconds
    pub command_timeout_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Log format (text, compact)
    pub format: String,
}

/// How a read connection picks among the replicas reported by the sentinels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadStrategy {
    #[default]
    Random,
    RoundRobin,
}

impl FromStr for ReadStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "random" => Ok(ReadStrategy::Random),
            "round_robin" | "round-robin" => Ok(ReadStrategy::RoundRobin),
            other => Err(ConfigError::ValidationError(format!(
                "Invalid read strategy: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for ReadStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadStrategy::Random => write!(f, "random"),
            ReadStrategy::RoundRobin => write!(f, "round_robin"),
        }
    }
}

impl Default for SentinelOptions {
    fn default() -> Self {
        Self {
            sentinel_timeout_sec: 1.0,
            password: None,
            close_connection: false,
            min_other_sentinels: 0,
            read_strategy: ReadStrategy::Random,
        }
    }
}

impl SentinelOptions {
    /// Create options from a name/value mapping such as a cache backend's
    /// `OPTIONS` table. Unknown names are ignored.
    pub fn from_options(opts: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut options = Self::default();

        if let Some(timeout) = opts.get(OPT_SENTINEL_TIMEOUT) {
            options.sentinel_timeout_sec = timeout.trim().parse::<f64>().map_err(|_| {
                ConfigError::ParseError(format!("{}={}", OPT_SENTINEL_TIMEOUT, timeout))
            })?;
        }

        // An empty secret means no auth at all
        options.password = opts
            .get(OPT_PASSWORD)
            .filter(|p| !p.is_empty())
            .cloned();

        if let Some(close) = opts.get(OPT_CLOSE_CONNECTION) {
            options.close_connection = parse_flag(close).ok_or_else(|| {
                ConfigError::ParseError(format!("{}={}", OPT_CLOSE_CONNECTION, close))
            })?;
        }

        if let Some(min_other) = opts.get(OPT_MIN_OTHER_SENTINELS) {
            options.min_other_sentinels = min_other.trim().parse::<usize>().map_err(|_| {
                ConfigError::ParseError(format!("{}={}", OPT_MIN_OTHER_SENTINELS, min_other))
            })?;
        }

        if let Some(strategy) = opts.get(OPT_READ_STRATEGY) {
            options.read_strategy = strategy.parse()?;
        }

        options.validate()?;
        Ok(options)
    }

    /// Sentinel socket timeout as a `Duration`. Values rejected by
    /// [`SentinelOptions::validate`] fall back to the default of one second.
    pub fn sentinel_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.sentinel_timeout_sec).unwrap_or(DEFAULT_SENTINEL_TIMEOUT)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = || {
            ConfigError::ValidationError(format!(
                "sentinel_timeout_sec must be a positive number of seconds, got {}",
                self.sentinel_timeout_sec
            ))
        };

        let timeout = Duration::try_from_secs_f64(self.sentinel_timeout_sec).map_err(|_| invalid())?;
        if timeout.is_zero() {
            return Err(invalid());
        }
        Ok(())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            command_timeout_ms: 5000,
        }
    }
}

impl StoreConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig {
                descriptor: "mymaster/127.0.0.1:26379/0".to_string(),
            },
            sentinel: SentinelOptions::default(),
            store: StoreConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        fs::write(path, content)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        ConnectionDescriptor::parse(&self.connection.descriptor)?;

        self.sentinel.validate()?;

        if self.store.command_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "command_timeout_ms must be greater than 0".to_string(),
            ));
        }

        match self.logging.level.as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => {}
            _ => return Err(ConfigError::ValidationError(
                format!("Invalid log level: {}", self.logging.level)
            )),
        }

        match self.logging.format.as_str() {
            "text" | "compact" => {}
            _ => return Err(ConfigError::ValidationError(
                format!("Invalid log format: {}", self.logging.format)
            )),
        }

        Ok(())
    }

    /// Create example configuration file
    pub fn create_example_config<P: AsRef<Path>>(path: P) -> Result<(), ConfigError> {
        let config = Config {
            connection: ConnectionConfig {
                descriptor: "mymaster/10.0.0.1:26379,10.0.0.2:26379,10.0.0.3:26379/0"
                    .to_string(),
            },
            sentinel: SentinelOptions {
                min_other_sentinels: 1,
                ..Default::default()
            },
            ..Default::default()
        };

        config.save_to_file(path)
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Carries the raw descriptor string that failed to parse
    #[error("Incorrect connection descriptor format '{0}'")]
    DescriptorError(String),
}
