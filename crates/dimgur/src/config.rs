//! Service configuration with TOML file support.

use std::net::SocketAddr;
use std::path::Path;

use dimgur_core::Limits;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::logging::LogFormat;

/// Value of `database_path` that selects an in-memory database.
pub const IN_MEMORY: &str = ":memory:";

/// Configuration for a dimgur server.
///
/// Can be loaded from a TOML file via [`ServiceConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Address the HTTP API listens on.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,

    /// SQLite database file, or `:memory:`.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Log format: "human" or "json".
    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Reject messages whose embedded timestamp is further than this from
    /// now. Unset disables the check.
    #[serde(default)]
    pub max_message_age_secs: Option<u64>,

    /// Require the signed message to be the canonical message for the
    /// declared action.
    #[serde(default)]
    pub bind_message_to_action: bool,

    #[serde(default = "default_max_comment_len")]
    pub max_comment_len: usize,

    #[serde(default = "default_max_title_len")]
    pub max_title_len: usize,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 3000))
}

fn default_database_path() -> String {
    "./dimgur.db".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_comment_len() -> usize {
    Limits::default().max_comment_len
}

fn default_max_title_len() -> usize {
    Limits::default().max_title_len
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            database_path: default_database_path(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            max_message_age_secs: None,
            bind_message_to_action: false,
            max_comment_len: default_max_comment_len(),
            max_title_len: default_max_title_len(),
        }
    }
}

// ── Impl ───────────────────────────────────────────────────────────────

impl ServiceConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_comment_len == 0 {
            return Err(ConfigError::Invalid("max_comment_len must be positive".into()));
        }
        if self.max_title_len == 0 {
            return Err(ConfigError::Invalid("max_title_len must be positive".into()));
        }
        if self.database_path.trim().is_empty() {
            return Err(ConfigError::Invalid("database_path is empty".into()));
        }
        if let Some(secs) = self.max_message_age_secs {
            if message_age(secs).is_none() {
                return Err(ConfigError::Invalid(format!(
                    "max_message_age_secs {secs} is out of range"
                )));
            }
        }
        Ok(())
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path == IN_MEMORY
    }

    /// The request policy this configuration describes.
    pub fn policy(&self) -> Policy {
        Policy {
            limits: Limits {
                max_comment_len: self.max_comment_len,
                max_title_len: self.max_title_len,
                ..Limits::default()
            },
            max_message_age: self.max_message_age_secs.and_then(message_age),
            bind_message_to_action: self.bind_message_to_action,
        }
    }
}

fn message_age(secs: u64) -> Option<chrono::Duration> {
    i64::try_from(secs).ok().and_then(chrono::Duration::try_seconds)
}

/// Checks applied to every mutating request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Policy {
    pub limits: Limits,
    pub max_message_age: Option<chrono::Duration>,
    pub bind_message_to_action: bool,
}
