use portal_service::config::PortalConfig;
use portal_service::services::Database;
use portal_service::{build_router, AppState};
use service_core::observability::init_tracing;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::signal;

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

    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    init_tracing(&log_level);

    let config = PortalConfig::load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        std::io::Error::other(format!("Configuration error: {}", e))
    })?;

    let db = Database::new(
        &config.database.url,
        config.database.max_connections,
        config.database.min_connections,
    )
    .await
    .map_err(|e| {
        tracing::error!("Failed to connect to PostgreSQL: {}", e);
        std::io::Error::other(format!("Database connection error: {}", e))
    })?;

    db.run_migrations().await.map_err(|e| {
        tracing::error!("Failed to run migrations: {}", e);
        std::io::Error::other(format!("Database migration error: {}", e))
    })?;

    let port = config.common.port;
    let state = AppState::new(config, db);
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        tracing::error!("Failed to bind listener to {}: {}", addr, e);
        e
    })?;

    tracing::info!("portal-service listening on port {}", port);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
}
