mod api;
mod metrics;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use figaro_core::{
    create_authenticator, create_sms_sender, load_config, validate_config, Authenticator,
    EventSink, QueueEngine, ShopStatusStore, SqliteQueueStore,
};

use api::{create_router, WsBroadcaster};
use state::AppState;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("FIGARO_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Auth method: {:?}", config.auth.method);
    info!("Database path: {:?}", config.database.path);

    // Create authenticator
    let authenticator: Arc<dyn Authenticator> = Arc::from(
        create_authenticator(&config.auth).context("Failed to create authenticator")?,
    );
    info!("Using authenticator: {}", authenticator.method_name());

    // Create the SQLite store; it backs both the queue and the shop gate
    let store = Arc::new(
        SqliteQueueStore::new(&config.database.path).context("Failed to create queue store")?,
    );
    info!("Queue store initialized");

    // Shop gate record comes into existence on first read
    let shop = store.clone() as Arc<dyn ShopStatusStore>;
    let status = shop.get().context("Failed to read shop status")?;
    info!("Shop is {}", if status.is_open { "open" } else { "closed" });

    // SMS delivery (falls back to logging when not configured)
    let sms = create_sms_sender(config.sms.as_ref());
    info!("SMS backend: {}", sms.backend_name());

    // WebSocket broadcaster for real-time updates
    let ws_broadcaster = WsBroadcaster::default();
    let sink = Arc::new(ws_broadcaster.clone()) as Arc<dyn EventSink>;
    info!("WebSocket broadcaster initialized");

    let engine = QueueEngine::new(store.clone(), shop, &config.queue, sink, sms);
    info!(
        "Queue engine initialized ({} services on the menu)",
        engine.catalog().len()
    );

    // Create app state and router
    let state = Arc::new(AppState::new(
        config.clone(),
        authenticator,
        engine,
        ws_broadcaster,
    ));
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
