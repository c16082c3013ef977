//! Relay server: the single generation endpoint plus health and uploads.
//!
//! [`build`] assembles the router:
//! - `POST /api/generate` relays submissions to the provider
//! - `GET /health` reports liveness
//! - `/uploads/*` serves the local blob store when it is active
//!
//! and wraps it with CORS, request tracing, a body limit and panic recovery.

mod config;
mod error;
mod routes;
mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use config::Config;
pub use error::{ServerError, STORAGE_NOT_CONFIGURED};
pub use routes::generate::GenerateBody;
pub use state::AppState;

use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::json;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Build the complete Axum [`Router`] for the application.
pub fn build(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .merge(routes::health::router())
        .nest("/api", routes::generate::router());

    if let Some(root) = state.config.local_upload_root() {
        let dir = root.join(crate::storage::UPLOAD_PREFIX);
        info!(dir = %dir.display(), "serving local uploads");
        app = app.nest_service("/uploads", ServeDir::new(dir));
    }

    app.layer(DefaultBodyLimit::max(state.config.body_limit))
        .layer(cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(panic_response))
        .with_state(state)
}

/// CORS layer from `GENRELAY_CORS_ORIGINS`; wildcard when unset or unparsable.
fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    let cors = CorsLayer::new().allow_headers(AnyOrigin).allow_methods(AnyOrigin);
    if origins.is_empty() {
        cors.allow_origin(AnyOrigin)
    } else {
        cors.allow_origin(origins)
    }
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!(detail, "handler panicked");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Internal error" })),
    )
        .into_response()
}

/// Bind `state.config.bind_address` and serve until Ctrl-C or SIGTERM.
pub async fn serve(state: Arc<AppState>) -> std::io::Result<()> {
    let addr: SocketAddr = state
        .config
        .bind_address
        .parse()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, provider = state.provider.name(), "HTTP server listening");

    axum::serve(listener, build(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

/// Returns a future that resolves when SIGINT (Ctrl-C) or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install CTRL+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received; starting graceful shutdown");
}
