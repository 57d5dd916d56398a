//! HTTP server: WebSocket endpoint, health probes and Prometheus metrics
//!
//! Routes:
//! - `/ws?token=...` game sessions
//! - `/health`, `/ready`, `/alive` probes
//! - `/metrics` Prometheus text format
//! - `/stats` detailed service statistics

use crate::service::app::ServiceContext;
use crate::service::health::{HealthCheck, HealthStatus};
use crate::service::ws::ws_handler;
use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct HttpServerConfig {
    /// Port to bind to
    pub port: u16,
    /// Host to bind to (typically "0.0.0.0" for all interfaces)
    pub host: String,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "0.0.0.0".to_string(),
        }
    }
}

/// Axum server exposing the arena over HTTP
pub struct HttpServer {
    config: HttpServerConfig,
    context: ServiceContext,
    shutdown_tx: broadcast::Sender<()>,
}

impl HttpServer {
    pub fn new(config: HttpServerConfig, context: ServiceContext) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            config,
            context,
            shutdown_tx,
        }
    }

    /// Bind and serve until [`HttpServer::stop`] is called
    pub async fn start(&self) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .context("Invalid listen address")?;

        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        info!("Listening on http://{} (WebSocket at /ws)", addr);

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                info!("HTTP server shutdown signal received");
            })
            .await?;

        info!("HTTP server stopped");
        Ok(())
    }

    pub fn router(&self) -> Router {
        create_router(self.context.clone())
    }

    pub async fn stop(&self) -> Result<()> {
        info!("Stopping HTTP server...");
        if let Err(e) = self.shutdown_tx.send(()) {
            warn!("Failed to send shutdown signal to HTTP server: {}", e);
        }
        Ok(())
    }
}

/// Build the router over a service context
pub fn create_router(context: ServiceContext) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/alive", get(alive_handler))
        .route("/metrics", get(metrics_handler))
        .route("/stats", get(stats_handler))
        .with_state(context)
}

async fn root_handler(State(context): State<ServiceContext>) -> impl IntoResponse {
    Json(json!({
        "service": context.service_name,
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": ["/ws", "/health", "/ready", "/alive", "/metrics", "/stats"]
    }))
}

async fn health_handler(State(context): State<ServiceContext>) -> impl IntoResponse {
    debug!("Health check requested");

    let status = HealthCheck::liveness_check(&context).await;
    let code = match status {
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::OK,
    };
    (
        code,
        Json(json!({
            "status": status,
            "service": context.service_name,
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

async fn ready_handler(State(context): State<ServiceContext>) -> impl IntoResponse {
    match HealthCheck::readiness_check(&context).await {
        HealthStatus::Healthy => (StatusCode::OK, "Ready"),
        HealthStatus::Degraded => (StatusCode::OK, "Degraded but ready"),
        HealthStatus::Unhealthy => (StatusCode::SERVICE_UNAVAILABLE, "Not ready"),
    }
}

async fn alive_handler(State(context): State<ServiceContext>) -> impl IntoResponse {
    match HealthCheck::liveness_check(&context).await {
        HealthStatus::Unhealthy => (StatusCode::SERVICE_UNAVAILABLE, "Not alive"),
        _ => (StatusCode::OK, "Alive"),
    }
}

async fn metrics_handler(State(context): State<ServiceContext>) -> impl IntoResponse {
    match context.metrics.render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
            body,
        ),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "text/plain")],
                "Failed to encode metrics".to_string(),
            )
        }
    }
}

async fn stats_handler(State(context): State<ServiceContext>) -> impl IntoResponse {
    match HealthCheck::check(&context).await {
        Ok(health) => (StatusCode::OK, Json(json!(health))),
        Err(e) => {
            error!("Failed to get stats: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "service": context.service_name,
                    "error": "Failed to get service stats",
                    "timestamp": chrono::Utc::now()
                })),
            )
        }
    }
}
