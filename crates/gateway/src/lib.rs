//! HTTP API gateway for DocForge.
//!
//! Exposes a health check and the v1 document API. Jobs run in the
//! process-local `JobRegistry`; the HTTP layer only submits and polls.
//!
//! Built on Axum.

pub mod api_v1;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::{Router, response::Json, routing::get};
use docforge_agent::JobRegistry;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::info;

/// Build the full router: `/health` plus the v1 API under `/v1`.
///
/// Layers applied:
/// - Request body size limit (1 MB)
/// - CORS for browser clients on localhost only
/// - HTTP trace logging
pub fn build_router(api_state: api_v1::SharedApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(|origin, _| is_local_origin(origin)))
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers([axum::http::header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    Router::new()
        .route("/health", get(health_handler))
        .nest("/v1", api_v1::v1_router(api_state))
        .layer(DefaultBodyLimit::max(1024 * 1024)) // 1 MB body limit
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// `http(s)://localhost`, `127.0.0.1` or `[::1]`, any port.
fn is_local_origin(origin: &HeaderValue) -> bool {
    let Ok(origin) = origin.to_str() else {
        return false;
    };
    let Some(authority) = origin
        .strip_prefix("http://")
        .or_else(|| origin.strip_prefix("https://"))
    else {
        return false;
    };
    let host = match authority.rsplit_once(':') {
        Some((host, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => host,
        _ => authority,
    };
    matches!(host, "localhost" | "127.0.0.1" | "[::1]")
}

/// Start the gateway HTTP server.
pub async fn start(config: docforge_config::AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let registry = Arc::new(JobRegistry::from_config(&config));
    if let Some(secs) = config.jobs.retention_secs {
        info!(retention_secs = secs, "Finished jobs will be evicted");
        registry.clone().spawn_retention_sweeper(Duration::from_secs(secs));
    }

    let api_state = Arc::new(api_v1::ApiV1State {
        registry,
        default_provider: config.default_provider,
    });
    let app = build_router(api_state);

    info!(addr = %addr, provider = %config.default_provider, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
