//! Statistics service binary.

use anyhow::{Context, Result};
use clap::Parser;
use statistics_service::api::rest::{AppState, create_router};
use statistics_service::application::StatisticsService;
use statistics_service::config::{AppConfig, LogFormat, LoggingConfig};
use statistics_service::infrastructure::persistence::postgres::{
    PostgresStatisticsStore, connect_pool, run_migrations,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Command line arguments.
#[derive(Debug, Parser)]
#[command(name = "statistics-service", version, about)]
struct Args {
    /// Configuration file, overriding `statistics.toml`.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Do not apply database migrations on startup.
    #[arg(long)]
    skip_migrations: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = AppConfig::load(args.config.as_deref()).context("loading configuration")?;

    init_tracing(&config.logging);
    info!(version = env!("CARGO_PKG_VERSION"), "Starting statistics service");
    info!(database = ?config.database, "Database configuration");

    let pool = connect_pool(&config.database)
        .await
        .context("connecting to database")?;
    if args.skip_migrations {
        info!("Skipping database migrations");
    } else {
        run_migrations(&pool).await.context("applying migrations")?;
    }

    let store = PostgresStatisticsStore::new(pool.clone())
        .with_client_policy(config.store.client_conflict);
    let service = StatisticsService::new(Arc::new(store));
    let router = create_router(AppState::new(service, config.server.request_timeout()));

    let address = config.server_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("binding {address}"))?;
    info!(%address, "Listening");

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let server = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.wait_for(|stop| *stop).await;
            })
            .await
    });

    shutdown_signal().await;
    info!("Shutdown signal received, draining requests");
    shutdown_tx.send_replace(true);

    drain(server, config.server.shutdown_grace()).await?;
    pool.close().await;
    info!("Shut down gracefully");
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.filter));
    let registry = tracing_subscriber::registry().with(filter);

    match logging.format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

/// Waits for the server task, giving up after `grace`.
async fn drain(
    server: tokio::task::JoinHandle<std::io::Result<()>>,
    grace: Duration,
) -> Result<()> {
    match tokio::time::timeout(grace, server).await {
        Ok(joined) => joined.context("server task panicked")?.context("server error"),
        Err(_) => {
            warn!(grace_secs = grace.as_secs(), "Grace period elapsed with requests in flight");
            Ok(())
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
