//! Punch server entry point.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{Router, extract::DefaultBodyLimit, middleware};
use punch_api::{AppState, auth_middleware, health_router, router as api_router};
use punch_common::{Config, StorageBackend};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Largest accepted request body; avatar and logo uploads are the big ones.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// How often idle inbox channels are swept.
const HUB_CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C. If a handler cannot be
/// installed, that signal is simply never observed.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env is fine
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "punch=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting punch server...");

    // Load configuration
    let config = Config::load()?;

    // Connect to database
    let db = punch_db::init(&config).await?;
    info!("Connected to database");

    // Run migrations
    info!("Running database migrations...");
    punch_db::migrate(&db).await?;
    info!("Migrations completed");

    // Object storage
    let storage_config = config.storage.to_storage_config();
    let storage: Arc<dyn StorageBackend> = Arc::new(storage_config.build());
    info!(path = %config.storage.base_path.display(), "Using local object storage");

    let state = AppState::new(Arc::new(db), &config, Some(storage));

    // Sweep channels left behind by dropped streams
    let hub = state.change_hub.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(HUB_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            let removed = hub.cleanup();
            if removed > 0 {
                tracing::debug!(removed, "Removed idle inbox channels");
            }
        }
    });

    // Build router
    let app = Router::new()
        .nest("/api", api_router())
        .merge(health_router())
        .nest_service("/files", ServeDir::new(&config.storage.base_path))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    // Start server with graceful shutdown
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
