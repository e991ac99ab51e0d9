//! Shop configuration loaded from environment variables.

use std::str::FromStr;

use thiserror::Error;

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(ConfigError::InvalidValue {
                key: "LOG_FORMAT",
                value: s.to_string(),
                reason: "expected `pretty` or `json`",
            }),
        }
    }
}

/// Error raised for an environment value that cannot be used.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value `{value}` for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Shop configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `PAYMENT_TIMEOUT_HOURS` - hours a buyer has to pay (default: `24`)
/// - `RUST_LOG` - tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT` - `pretty` or `json` (default: `pretty`)
#[derive(Debug, Clone)]
pub struct ShopConfig {
    pub payment_timeout_hours: i64,
    pub log_level: String,
    pub log_format: LogFormat,
}

impl ShopConfig {
    pub const DEFAULT_PAYMENT_TIMEOUT_HOURS: i64 = 24;

    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, falling back to defaults for
    /// missing keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let payment_timeout_hours = match lookup("PAYMENT_TIMEOUT_HOURS") {
            Some(raw) => parse_timeout_hours(&raw)?,
            None => defaults.payment_timeout_hours,
        };
        let log_format = match lookup("LOG_FORMAT") {
            Some(raw) => raw.parse()?,
            None => defaults.log_format,
        };

        Ok(Self {
            payment_timeout_hours,
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format,
        })
    }
}

fn parse_timeout_hours(raw: &str) -> Result<i64, ConfigError> {
    let invalid = |reason| ConfigError::InvalidValue {
        key: "PAYMENT_TIMEOUT_HOURS",
        value: raw.to_string(),
        reason,
    };

    let hours: i64 = raw.trim().parse().map_err(|_| invalid("not an integer"))?;
    if hours <= 0 {
        return Err(invalid("must be greater than zero"));
    }
    Ok(hours)
}

impl Default for ShopConfig {
    fn default() -> Self {
        Self {
            payment_timeout_hours: Self::DEFAULT_PAYMENT_TIMEOUT_HOURS,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}
