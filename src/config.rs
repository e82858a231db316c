//! # Configuration
//!
//! Service configuration loaded from defaults, an optional TOML file and
//! the environment.
//!
//! Sources, lowest precedence first:
//!
//! 1. built-in defaults ([`AppConfig::default`])
//! 2. `statistics.toml` in the working directory, or the file passed to
//!    [`AppConfig::load`]
//! 3. `STATS__*` environment variables, e.g. `STATS__DATABASE__HOST`
//! 4. the legacy database variables `DB_HOST`, `DB_PORT`, `DB_USERNAME`,
//!    `DB_TABLE` (database name), `DB_PASSWORD` and `SSL_MODE`
//!
//! A `.env` file is read first if present.
//!
//! # Examples
//!
//! ```
//! use statistics_service::config::AppConfig;
//!
//! let config = AppConfig::default();
//! assert!(config.validate().is_ok());
//! assert_eq!(config.server_address(), "0.0.0.0:8080");
//! ```

use crate::infrastructure::persistence::ClientConflictPolicy;
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgSslMode;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Default configuration file name, looked up without extension.
pub const DEFAULT_CONFIG_FILE: &str = "statistics";

/// Prefix of the structured environment overrides.
pub const ENV_PREFIX: &str = "STATS";

/// Legacy environment variables and the keys they override.
const LEGACY_DATABASE_VARS: [(&str, &str); 6] = [
    ("DB_HOST", "database.host"),
    ("DB_PORT", "database.port"),
    ("DB_USERNAME", "database.username"),
    ("DB_TABLE", "database.name"),
    ("DB_PASSWORD", "database.password"),
    ("SSL_MODE", "database.ssl_mode"),
];

/// Error type for configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A source could not be read or deserialized.
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// A value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// Creates an invalid value error.
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Deadline applied to every request's context, in milliseconds.
    pub request_timeout_ms: u64,
    /// Maximum time to drain in-flight requests on shutdown, in seconds.
    pub shutdown_grace_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout_ms: 5000,
            shutdown_grace_secs: 5,
        }
    }
}

impl ServerConfig {
    /// Returns the per-request deadline.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Returns the shutdown drain limit.
    #[must_use]
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

/// PostgreSQL connection configuration.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database host.
    pub host: String,
    /// Database port.
    pub port: u16,
    /// Login role.
    pub username: String,
    /// Login password.
    pub password: String,
    /// Database name.
    pub name: String,
    /// libpq-style SSL mode: `disable`, `allow`, `prefer`, `require`,
    /// `verify-ca` or `verify-full`.
    pub ssl_mode: String,
    /// Upper bound on pooled connections.
    pub max_connections: u32,
    /// How long a caller waits for a pooled connection, in milliseconds.
    pub acquire_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            username: "postgres".to_string(),
            password: String::new(),
            name: "postgres".to_string(),
            ssl_mode: "disable".to_string(),
            max_connections: 10,
            acquire_timeout_ms: 3000,
        }
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("name", &self.name)
            .field("ssl_mode", &self.ssl_mode)
            .field("max_connections", &self.max_connections)
            .field("acquire_timeout_ms", &self.acquire_timeout_ms)
            .finish()
    }
}

impl DatabaseConfig {
    /// Returns the pool acquire timeout.
    #[must_use]
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    /// Parses the configured SSL mode.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` for an unknown mode.
    pub fn parsed_ssl_mode(&self) -> Result<PgSslMode, ConfigError> {
        PgSslMode::from_str(&self.ssl_mode)
            .map_err(|_| ConfigError::invalid(format!("unknown ssl mode '{}'", self.ssl_mode)))
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// Filter directive used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            filter: "statistics_service=info,tower_http=info".to_string(),
        }
    }
}

/// Store behaviour configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// How re-saving a known client is treated.
    pub client_conflict: ClientConflictPolicy,
}

/// Top-level service configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Database settings.
    pub database: DatabaseConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Store settings.
    pub store: StoreConfig,
}

impl AppConfig {
    /// Loads and validates the configuration.
    ///
    /// With `path` the file must exist; without it `statistics.toml` is
    /// used when present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Load` if a source cannot be read or
    /// deserialized, and `ConfigError::Invalid` if validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        // A missing .env file is not an error.
        let _ = dotenvy::dotenv();

        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?)
            .add_source(file)
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"));

        for (var, key) in LEGACY_DATABASE_VARS {
            builder = builder.set_override_option(key, std::env::var(var).ok())?;
        }

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.host.trim().is_empty() {
            return Err(ConfigError::invalid("server.host must not be empty"));
        }
        if self.server.port == 0 {
            return Err(ConfigError::invalid("server.port must be non-zero"));
        }
        if self.server.request_timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "server.request_timeout_ms must be non-zero",
            ));
        }
        if self.database.host.trim().is_empty() {
            return Err(ConfigError::invalid("database.host must not be empty"));
        }
        if self.database.port == 0 {
            return Err(ConfigError::invalid("database.port must be non-zero"));
        }
        if self.database.name.trim().is_empty() {
            return Err(ConfigError::invalid("database.name must not be empty"));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::invalid(
                "database.max_connections must be non-zero",
            ));
        }
        self.database.parsed_ssl_mode()?;
        Ok(())
    }

    /// Returns the `host:port` the server binds to.
    #[must_use]
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
