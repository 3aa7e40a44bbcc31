use crate::config::Config;
use crate::store::MediaStore;
use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method},
    response::IntoResponse,
    Router,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod respond;
pub mod routes_media;
pub mod routes_stream;

/// Maximum accepted upload body (2 GiB).
const MAX_UPLOAD_BYTES: usize = 2 * 1024 * 1024 * 1024;

/// Shared application context.
#[derive(Clone)]
pub struct AppContext {
    pub store: Arc<MediaStore>,
    pub config: Arc<Config>,
    /// Process-wide signing secret.
    pub secret: Arc<String>,
    pub hls_root: PathBuf,
    pub scratch_dir: PathBuf,
}

impl AppContext {
    pub fn new(config: Config, store: MediaStore, secret: String) -> Self {
        let hls_root = config.storage.hls_root();
        let scratch_dir = config.storage.scratch_dir();
        Self {
            store: Arc::new(store),
            config: Arc::new(config),
            secret: Arc::new(secret),
            hls_root,
            scratch_dir,
        }
    }
}

/// Create the Axum router with all routes.
pub fn create_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .merge(routes_media::media_routes())
        .merge(routes_stream::stream_routes())
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

async fn health_check() -> impl IntoResponse {
    axum::Json(serde_json::json!({"status": "ok"}))
}

/// Start the HTTP server.
pub async fn start_server(ctx: AppContext) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", ctx.config.server.host, ctx.config.server.port)
        .parse()
        .context("Invalid server address")?;

    tokio::fs::create_dir_all(&ctx.hls_root).await?;
    tokio::fs::create_dir_all(&ctx.scratch_dir).await?;

    let app = create_router(ctx);

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
