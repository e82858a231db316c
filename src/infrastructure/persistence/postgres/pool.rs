//! Connection pool construction and schema migrations.

use crate::config::DatabaseConfig;
use sqlx::PgPool;
use sqlx::migrate::MigrateError;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

/// Error raised while bootstrapping the database.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The configured SSL mode is not a libpq mode.
    #[error("invalid ssl mode: {0}")]
    InvalidSslMode(String),

    /// The pool could not open a connection.
    #[error("database connection failed: {0}")]
    Connect(#[from] sqlx::Error),

    /// A migration failed to apply.
    #[error("migration failed: {0}")]
    Migrate(#[from] MigrateError),
}

/// Builds connect options from the database configuration.
///
/// # Errors
///
/// Returns `PoolError::InvalidSslMode` for an unknown SSL mode.
pub fn connect_options(config: &DatabaseConfig) -> Result<PgConnectOptions, PoolError> {
    let ssl_mode = PgSslMode::from_str(&config.ssl_mode)
        .map_err(|_| PoolError::InvalidSslMode(config.ssl_mode.clone()))?;

    Ok(PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.username)
        .password(&config.password)
        .database(&config.name)
        .ssl_mode(ssl_mode))
}

/// Opens a connection pool bounded by `max_connections`.
///
/// Callers block for at most `acquire_timeout` when the pool is exhausted.
///
/// # Errors
///
/// Returns an error if the options are invalid or the first connection
/// cannot be established.
pub async fn connect_pool(config: &DatabaseConfig) -> Result<PgPool, PoolError> {
    let options = connect_options(config)?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout())
        .connect_with(options)
        .await?;

    info!(
        host = %config.host,
        port = config.port,
        database = %config.name,
        max_connections = config.max_connections,
        "Connected to PostgreSQL"
    );
    Ok(pool)
}

/// Applies the embedded migrations.
///
/// # Errors
///
/// Returns `PoolError::Migrate` if a migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<(), PoolError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Database migrations applied");
    Ok(())
}
