// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post, put},
};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use switchboard_config::SwitchboardConfig;
use switchboard_core::SwitchboardError;
use switchboard_engine::Engine;

use crate::auth::{AuthConfig, auth_middleware};
use crate::{handlers, webhook, ws};

/// Health state for unauthenticated health/metrics endpoints.
#[derive(Clone)]
pub struct HealthState {
    /// Process start time for uptime calculation.
    pub start_time: std::time::Instant,
    /// Optional Prometheus metrics render function.
    pub prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>,
}

/// Settings for the channel webhook endpoints.
#[derive(Clone, Default)]
pub struct WebhookSettings {
    pub verify_token: Option<String>,
    /// Enables `X-Hub-Signature-256` checking when set.
    pub app_secret: Option<String>,
    /// Only payloads addressed to this business number are ingested.
    pub phone_number_id: Option<String>,
}

impl std::fmt::Debug for WebhookSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookSettings")
            .field("verify_token", &self.verify_token.as_ref().map(|_| "[redacted]"))
            .field("app_secret", &self.app_secret.as_ref().map(|_| "[redacted]"))
            .field("phone_number_id", &self.phone_number_id)
            .finish()
    }
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub engine: Engine,
    pub auth: AuthConfig,
    pub webhook: WebhookSettings,
    pub health: HealthState,
}

impl GatewayState {
    /// Builds handler state from the loaded configuration.
    pub fn new(engine: Engine, config: &SwitchboardConfig) -> Self {
        Self {
            engine,
            auth: AuthConfig {
                bearer_token: config.server.bearer_token.clone(),
            },
            webhook: WebhookSettings {
                verify_token: config.whatsapp.verify_token.clone(),
                app_secret: config.whatsapp.app_secret.clone(),
                phone_number_id: config.whatsapp.phone_number_id.clone(),
            },
            health: HealthState {
                start_time: std::time::Instant::now(),
                prometheus_render: None,
            },
        }
    }

    /// Exposes rendered metrics at `/metrics`.
    pub fn with_metrics(mut self, render: Arc<dyn Fn() -> String + Send + Sync>) -> Self {
        self.health.prometheus_render = Some(render);
        self
    }
}

/// Builds the full route table:
/// - GET /health, GET /metrics (public)
/// - GET|POST /webhook/whatsapp (verify token / optional signature)
/// - GET /ws (token query param, checked during the handshake)
/// - /v1/* (bearer token + `X-Agent-Id`)
pub fn router(state: GatewayState) -> Router {
    let auth_state = state.auth.clone();

    let public_routes = Router::new()
        .route("/health", get(handlers::get_public_health))
        .route("/metrics", get(handlers::get_public_metrics))
        .route(
            "/webhook/whatsapp",
            get(webhook::verify_subscription).post(webhook::receive),
        )
        .route("/ws", get(ws::ws_handler));

    let api_routes = Router::new()
        .route("/v1/conversations", get(handlers::list_conversations))
        .route(
            "/v1/conversations/{id}/messages",
            get(handlers::get_messages),
        )
        .route(
            "/v1/conversations/{id}/resolve",
            post(handlers::resolve_conversation),
        )
        .route("/v1/messages", post(handlers::post_messages))
        .route("/v1/agents/{id}/presence", put(handlers::put_presence))
        .route_layer(axum_middleware::from_fn_with_state(
            auth_state,
            auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the gateway HTTP/WebSocket server and serve until `shutdown` fires.
pub async fn start_server(
    host: &str,
    port: u16,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<(), SwitchboardError> {
    let app = router(state);

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| SwitchboardError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("gateway server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| SwitchboardError::Internal(format!("gateway server error: {e}")))?;

    tracing::info!("gateway server stopped");
    Ok(())
}
