use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::event::EventDetails;
use crate::services::fallback_store::DEFAULT_STORAGE_KEY;
use crate::services::validation::FormRules;

pub const ENV_HOST: &str = "REVEAL_HOST";
pub const ENV_PORT: &str = "REVEAL_PORT";
pub const ENV_DATABASE: &str = "REVEAL_DATABASE";
pub const ENV_FALLBACK_PATH: &str = "REVEAL_FALLBACK_PATH";
pub const ENV_ADMIN_PASSWORD: &str = "REVEAL_ADMIN_PASSWORD";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "reveal.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FallbackConfig {
    pub path: PathBuf,
    pub key: String,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("rsvp_fallback.json"),
            key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RateLimitConfig {
    pub max_requests: usize,
    pub window_secs: u64,
    pub cleanup_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 5,
            window_secs: 60,
            cleanup_interval_secs: 60,
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AdminConfig {
    /// Shared secret for the admin routes. Unset disables them.
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FormConfig {
    pub require_dietary_when_attending: bool,
}

impl FormConfig {
    pub fn rules(&self) -> FormRules {
        FormRules::new(self.require_dietary_when_attending)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub fallback: FallbackConfig,
    pub rate_limit: RateLimitConfig,
    pub admin: AdminConfig,
    pub form: FormConfig,
    pub event: EventDetails,
}

impl AppConfig {
    /// Reads `path` when it exists, otherwise starts from defaults. `REVEAL_*`
    /// environment variables win over both.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(path)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            info!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let write_err = |source: std::io::Error| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(write_err)?;
            }
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(write_err)?;
        info!(path = %path.display(), "Configuration saved");
        Ok(())
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(ENV_HOST) {
            self.server.host = host;
        }
        if let Some(raw) = lookup(ENV_PORT) {
            self.server.port =
                raw.trim()
                    .parse()
                    .map_err(|e: std::num::ParseIntError| ConfigError::InvalidValue {
                        key: ENV_PORT,
                        value: raw.clone(),
                        reason: e.to_string(),
                    })?;
        }
        if let Some(path) = lookup(ENV_DATABASE) {
            self.database.path = path;
        }
        if let Some(path) = lookup(ENV_FALLBACK_PATH) {
            self.fallback.path = PathBuf::from(path);
        }
        if let Some(password) = lookup(ENV_ADMIN_PASSWORD) {
            self.admin.password = Some(password);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rate_limit.max_requests == 0 {
            return Err(ConfigError::InvalidValue {
                key: "rate_limit.max_requests",
                value: "0".to_string(),
                reason: "must allow at least one request".to_string(),
            });
        }
        if self.rate_limit.window_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "rate_limit.window_secs",
                value: "0".to_string(),
                reason: "window must be at least one second".to_string(),
            });
        }
        if self.database.path.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "database.path",
                value: self.database.path.clone(),
                reason: "path cannot be empty".to_string(),
            });
        }
        if self.admin.password.as_deref().is_some_and(|p| p.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                key: "admin.password",
                value: String::new(),
                reason: "password cannot be blank".to_string(),
            });
        }
        if self.admin.password.is_none() {
            warn!("No admin password configured, admin routes are disabled");
        }
        self.bind_address().map(|_| ())
    }

    pub fn bind_address(&self) -> Result<SocketAddr, ConfigError> {
        let raw = format!("{}:{}", self.server.host, self.server.port);
        raw.parse().map_err(|e: std::net::AddrParseError| ConfigError::InvalidValue {
            key: "server.host",
            value: self.server.host.clone(),
            reason: e.to_string(),
        })
    }
}
