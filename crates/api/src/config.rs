//! Process configuration read from the environment.

use std::env;
use std::net::SocketAddr;

use thiserror::Error;

use ridepool_observability::{DEFAULT_SENSITIVE_PATTERN, LogFormat, UnknownLogFormat};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_MAX_LOGGED_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {name}: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error(transparent)]
    LogFormat(#[from] UnknownLogFormat),

    #[error("invalid SENSITIVE_TARGET_PATTERN: {0}")]
    Pattern(#[from] regex::Error),
}

impl ConfigError {
    fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            name,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub bind_addr: SocketAddr,
    pub log_format: LogFormat,
    /// Regex matched against controller identities; matches skip payload logging.
    pub sensitive_target_pattern: String,
    /// Upper bound for the duplicate body read done for payload logging.
    pub max_logged_body_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            log_format: LogFormat::Json,
            sensitive_target_pattern: DEFAULT_SENSITIVE_PATTERN.to_string(),
            max_logged_body_bytes: DEFAULT_MAX_LOGGED_BODY_BYTES,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build settings from any variable source; unset variables take defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = lookup("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::invalid("BIND_ADDR", e.to_string()))?;

        let log_format = match lookup("LOG_FORMAT") {
            Some(raw) => raw.parse::<LogFormat>()?,
            None => LogFormat::default(),
        };

        let sensitive_target_pattern = lookup("SENSITIVE_TARGET_PATTERN")
            .unwrap_or_else(|| DEFAULT_SENSITIVE_PATTERN.to_string());

        let max_logged_body_bytes = match lookup("MAX_LOGGED_BODY_BYTES") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .map_err(|e| ConfigError::invalid("MAX_LOGGED_BODY_BYTES", e.to_string()))?,
            None => DEFAULT_MAX_LOGGED_BODY_BYTES,
        };

        let settings = Self {
            bind_addr,
            log_format,
            sensitive_target_pattern,
            max_logged_body_bytes,
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Validates the settings and returns an error if invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sensitive_target_pattern.trim().is_empty() {
            return Err(ConfigError::invalid(
                "SENSITIVE_TARGET_PATTERN",
                "pattern cannot be empty",
            ));
        }
        regex::Regex::new(&self.sensitive_target_pattern)?;

        if self.max_logged_body_bytes == 0 {
            return Err(ConfigError::invalid(
                "MAX_LOGGED_BODY_BYTES",
                "limit must be positive",
            ));
        }
        Ok(())
    }
}
