// src/server/mod.rs
//! HTTP transport (`server` feature)
//!
//! A small axum app over the comparison service: health, CSV preview,
//! quickcheck and compare, all under /api. Configuration comes from
//! environment variables with local-dev defaults.

mod error;
mod handlers;

pub use error::ServerError;

use std::io;
use std::net::SocketAddr;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Server configuration, read from the environment
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Origins allowed by CORS, comma-separated in `CORS_ORIGINS`
    pub cors_origins: Vec<String>,
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|raw| {
                    raw.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_else(|_| {
                    vec![
                        "http://localhost:5173".to_string(),
                        "http://127.0.0.1:5173".to_string(),
                    ]
                }),
            max_upload_size: std::env::var("MAX_UPLOAD_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(25 * 1024 * 1024),
        }
    }
}

/// Build the /api router with CORS, tracing and the upload size limit
pub fn create_router(config: &ServerConfig) -> Router {
    let api = Router::new()
        .route("/health", get(handlers::health))
        .route("/preview", post(handlers::preview))
        .route("/quickcheck", post(handlers::quickcheck))
        .route("/compare", post(handlers::compare));

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "ignoring unparseable CORS origin");
                None
            }
        })
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(config.max_upload_size))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Bind and serve until ctrl-c
pub async fn serve(config: ServerConfig) -> io::Result<()> {
    let app = create_router(&config);
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        address = %addr,
        max_upload_size_mb = config.max_upload_size / 1024 / 1024,
        "server listening"
    );

    let shutdown = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("shutdown signal received"),
            Err(err) => {
                tracing::error!(%err, "failed to install shutdown handler");
                std::future::pending::<()>().await;
            }
        }
    };

    axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;
    info!("server shut down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_dev_origins() {
        let config = ServerConfig::default();
        assert!(config.port > 0);
        assert!(!config.cors_origins.is_empty());
    }
}
