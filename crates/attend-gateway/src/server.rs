// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;

use attend_bus::EventBus;
use attend_core::{AttendError, StorageAdapter};
use attend_routing::RoutingEngine;
use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post, put},
};
use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;

use crate::auth::{AuthConfig, auth_middleware};
use crate::departments;
use crate::handlers;
use crate::ws::{self, WsClient};

/// Health state for the unauthenticated health endpoint.
#[derive(Clone)]
pub struct HealthState {
    /// Process start time for uptime calculation.
    pub start_time: std::time::Instant,
    /// Storage backend probed on every health request.
    pub storage: Arc<dyn StorageAdapter>,
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub engine: RoutingEngine,
    /// Source of the events pushed to WebSocket clients.
    pub bus: EventBus,
    /// Authentication configuration.
    pub auth: AuthConfig,
    /// Health state for unauthenticated endpoints.
    pub health: HealthState,
    /// Connected WebSocket clients by connection id.
    pub ws_clients: Arc<DashMap<String, WsClient>>,
    /// Cancelled when the server shuts down; open sockets close on it.
    pub shutdown: CancellationToken,
}

impl GatewayState {
    pub fn new(
        engine: RoutingEngine,
        bus: EventBus,
        auth: AuthConfig,
        storage: Arc<dyn StorageAdapter>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            engine,
            bus,
            auth,
            health: HealthState {
                start_time: std::time::Instant::now(),
                storage,
            },
            ws_clients: Arc::new(DashMap::new()),
            shutdown,
        }
    }
}

/// Gateway server configuration (mirrors GatewayConfig from attend-config).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
}

/// Build the complete router.
///
/// - `GET /health` (public)
/// - `/v1/...` REST routes (bearer auth)
/// - `GET /ws` (auth via query params, not middleware)
pub fn router(state: GatewayState) -> Router {
    let auth_state = state.auth.clone();

    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/v1/attendances", get(handlers::list_attendances))
        .route("/v1/attendances/stats", get(handlers::get_stats))
        .route("/v1/attendances/{id}", get(handlers::get_attendance))
        .route("/v1/attendances/{id}/transfer", post(handlers::transfer))
        .route("/v1/attendances/{id}/accept", post(handlers::accept))
        .route("/v1/attendances/{id}/close", post(handlers::close))
        .route("/v1/attendances/{id}/reopen", post(handlers::reopen))
        .route("/v1/attendances/{id}/priority", put(handlers::update_priority))
        .route("/v1/queue", get(handlers::get_queue))
        .route("/v1/leads/{lead_id}", put(handlers::put_lead))
        .route("/v1/leads/{lead_id}/claim", post(handlers::claim))
        .route("/v1/sync", post(handlers::sync))
        .route(
            "/v1/departments",
            get(departments::list_departments).post(departments::create_department),
        )
        .route(
            "/v1/departments/{id}",
            put(departments::update_department).delete(departments::delete_department),
        )
        .route("/v1/departments/{id}/members", get(departments::list_members))
        .route(
            "/v1/departments/{id}/members/{user_id}",
            put(departments::put_member).delete(departments::delete_member),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            auth_state,
            auth_middleware,
        ))
        .with_state(state.clone());

    let ws_routes = Router::new()
        .route("/ws", get(ws::ws_handler))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .merge(ws_routes)
        .layer(CorsLayer::permissive())
}

/// Serve the gateway until `state.shutdown` is cancelled.
pub async fn start_server(config: &ServerConfig, state: GatewayState) -> Result<(), AttendError> {
    let shutdown = state.shutdown.clone();
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AttendError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(|e| AttendError::Internal(format!("gateway server error: {e}")))?;

    tracing::info!("gateway stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_config_debug() {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3080,
        };
        let debug = format!("{config:?}");
        assert!(debug.contains("127.0.0.1"));
        assert!(debug.contains("3080"));
    }
}
