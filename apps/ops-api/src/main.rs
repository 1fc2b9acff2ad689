//! # Supper Ops API
//!
//! Binary entry point: wire configuration, database, relay and router.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use supper_db::{Database, DbConfig};
use supper_ops_api::{routes, ApiConfig, AppState, OrderService};
use supper_relay::{EventHub, EventPublisher, RelayLoop};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(true)
        .init();

    info!("Starting Supper ops API...");

    // Load configuration
    let config = ApiConfig::load()?;
    info!(
        port = config.http_port,
        channels = ?config.notify_channels,
        "Configuration loaded"
    );

    // Connect to database (runs migrations)
    let db = Database::connect(
        DbConfig::new(&config.database_url).max_connections(config.max_db_connections),
    )
    .await?;
    info!("Connected to PostgreSQL");

    // Start the relay: one long-lived LISTEN task per process
    let relay_config = config.relay_config();
    let hub = EventHub::new(relay_config.hub_capacity);
    let (relay, relay_handle) = RelayLoop::new(db.pool().clone(), relay_config.clone(), hub.clone());
    tokio::spawn(relay.run());

    // The commit-gated producer side of the relay
    let publisher = EventPublisher::new(db.pool().clone(), &relay_config);

    // Shared state
    let state = Arc::new(AppState {
        orders: OrderService::new(db.clone(), publisher),
        db,
        hub,
        config: config.clone(),
    });

    // Serve
    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    info!(%addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, routes::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    relay_handle.shutdown().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
