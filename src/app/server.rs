// ==========================================
// College ERP - HTTP server
// ==========================================

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    http::{header, HeaderValue, Method},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::app::routes::api_router;
use crate::app::state::{AppState, SharedState};
use crate::config::AppConfig;

/// Router with CORS and request tracing applied.
pub fn build_app(state: SharedState, cors_origin: Option<&str>) -> anyhow::Result<Router> {
    Ok(api_router(state)
        .layer(cors_layer(cors_origin)?)
        .layer(TraceLayer::new_for_http()))
}

fn cors_layer(origin: Option<&str>) -> anyhow::Result<CorsLayer> {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    Ok(match origin {
        Some(origin) => {
            let value = HeaderValue::from_str(origin)
                .with_context(|| format!("invalid ERP_CORS_ORIGIN: {}", origin))?;
            layer.allow_origin(value)
        }
        None => layer.allow_origin(tower_http::cors::Any),
    })
}

/// Builds the state, binds the port and serves until SIGINT/SIGTERM.
pub async fn serve(config: AppConfig) -> anyhow::Result<()> {
    let state_config = config.clone();
    let state = tokio::task::spawn_blocking(move || AppState::new(&state_config))
        .await
        .context("state initialization task failed")?
        .map_err(anyhow::Error::msg)?;
    let app = build_app(Arc::new(state), config.cors_origin.as_deref())?;

    let address = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("cannot bind {}", address))?;
    info!("server running on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("received Ctrl+C, shutting down"),
            Err(e) => warn!(error = %e, "cannot listen for Ctrl+C"),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("received SIGTERM, shutting down");
            }
            Err(e) => {
                warn!(error = %e, "cannot install SIGTERM handler");
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
}
