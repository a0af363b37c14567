//! Worldsync server - authoritative multiplayer position sync
//!
//! Usage: `worldsync <port> <root>`
//!
//! Serves the static client from `<root>` and accepts WebSocket sync
//! connections on `/`.

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use worldsync::app::AppState;
use worldsync::config::{Config, LogFormat};
use worldsync::game::WorldSession;
use worldsync::http::build_router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Configuration errors are fatal before anything is bound
    let config = Config::from_args(std::env::args().skip(1))?;

    init_tracing(&config.log_level, config.log_format);

    info!("Starting Worldsync server");
    info!(root = %config.static_root.display(), "Static root");

    // Spawn the world task
    let (session, world) = WorldSession::new(config.tick_interval, config.broadcast_interval);
    tokio::spawn(session.run());

    let addr: SocketAddr = config.server_addr;
    let state = AppState::new(config, world);
    let router = build_router(state);

    let listener = TcpListener::bind(addr).await?;

    info!("Server listening on {}", addr);
    info!("Client page: http://{}/", addr);
    info!("WebSocket endpoint: ws://{}/", addr);

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str, format: LogFormat) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    match format {
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init(),
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        }
    }
}
