// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the admin API.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use herald_core::error::HeraldError;
use herald_core::traits::{NotificationStore, RecipientStore};
use herald_dispatch::Dispatcher;

use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// Dispatch engine driving broadcast runs.
    pub dispatcher: Arc<Dispatcher>,
    /// Notification store for read and CRUD endpoints.
    pub notifications: Arc<dyn NotificationStore>,
    /// Recipient registry for the audience endpoints.
    pub recipients: Arc<dyn RecipientStore>,
    /// Process start time for uptime reporting.
    pub start_time: Instant,
}

/// Gateway server configuration (mirrors `GatewayConfig` from
/// herald-config, avoiding a config-crate dependency here).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
}

/// Builds the admin API router.
///
/// Split out of [`start_server`] so tests can drive the router without
/// binding a socket.
pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route("/health", get(handlers::get_health))
        .route("/api/notifications/send", post(handlers::post_send))
        .route("/api/notifications/{id}/status", get(handlers::get_status))
        .route("/api/notifications/recent", get(handlers::get_recent))
        .route("/api/notifications/retry/{id}", post(handlers::post_retry))
        .route(
            "/notifications",
            get(handlers::list_notifications).post(handlers::create_notification),
        )
        .route(
            "/notifications/{id}",
            get(handlers::get_notification)
                .put(handlers::update_notification)
                .delete(handlers::delete_notification),
        )
        .route("/recipients", get(handlers::list_recipients))
        .route("/recipients/count", get(handlers::count_recipients))
        .route(
            "/recipients/{id}",
            get(handlers::get_recipient).put(handlers::upsert_recipient),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Starts the gateway HTTP server.
///
/// Binds to the configured host:port and serves until the task is
/// dropped or the process shuts down.
pub async fn start_server(config: &ServerConfig, state: GatewayState) -> Result<(), HeraldError> {
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| HeraldError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .await
        .map_err(|e| HeraldError::Internal(format!("gateway server error: {e}")))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_test_utils::{MemoryStore, MockTransport};

    #[test]
    fn gateway_state_is_clone() {
        let store = Arc::new(MemoryStore::new());
        let transport = Arc::new(MockTransport::new());
        let dispatcher = Arc::new(Dispatcher::new(store.clone(), store.clone(), transport));
        let state = GatewayState {
            dispatcher,
            notifications: store.clone(),
            recipients: store,
            start_time: Instant::now(),
        };
        let _ = state.clone();
    }

    #[tokio::test]
    async fn router_builds_with_all_routes() {
        let store = Arc::new(MemoryStore::new());
        let transport = Arc::new(MockTransport::new());
        let dispatcher = Arc::new(Dispatcher::new(store.clone(), store.clone(), transport));
        let _router = build_router(GatewayState {
            dispatcher,
            notifications: store.clone(),
            recipients: store,
            start_time: Instant::now(),
        });
    }
}
