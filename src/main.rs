//! Threat Prediction Service - Main Application Entry Point
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool
//! 3. Run database migrations
//! 4. Create the real-time channel registry and the prediction writer
//! 5. Build HTTP router with routes and middleware
//! 6. Serve until SIGINT/SIGTERM, then close dashboard connections

use std::net::SocketAddr;
use std::sync::Arc;

use threat_prediction_server::{
    build_router,
    config::Config,
    db,
    services::{
        model_client::ModelClient, notifier::PredictionNotifier,
        prediction_service::PredictionWriter,
    },
    state::AppState,
    ws::ChannelRegistry,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Reads RUST_LOG environment variable (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()?;
    tracing::info!(
        model_service_url = %config.model_service_url,
        model_timeout_secs = config.model_timeout_secs,
        "Configuration loaded"
    );

    let pool = db::create_pool(&config.database_url, config.db_max_connections).await?;
    tracing::info!(max_connections = config.db_max_connections, "Database pool created");

    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    // The registry lives for the whole process and is torn down on shutdown
    let channels = Arc::new(ChannelRegistry::new());

    let model = ModelClient::new(&config.model_service_url, config.model_timeout())?;
    let writer = PredictionWriter::new(
        pool.clone(),
        model,
        PredictionNotifier::new(channels.clone()),
        config.model_timeout(),
        config.model_version.clone(),
    );

    let addr = format!("0.0.0.0:{}", config.server_port);

    let state = AppState {
        pool: pool.clone(),
        config: Arc::new(config),
        channels: channels.clone(),
        writer,
    };
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        shutdown_signal().await;
        // Open websockets would otherwise keep their tasks alive past shutdown
        let remaining = channels.connection_count().await;
        tracing::info!(remaining, "Closing dashboard connections");
        channels.shutdown_all().await;
    })
    .await?;

    pool.close().await;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Resolve on SIGINT (Ctrl-C) or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
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
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received SIGINT, starting graceful shutdown"),
        () = terminate => tracing::info!("Received SIGTERM, starting graceful shutdown"),
    }
}
