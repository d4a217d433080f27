// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `herald serve` command implementation.
//!
//! Wires the SQLite store, Telegram transport, dispatch engine, retry
//! queue, and HTTP gateway together, then runs until SIGTERM/SIGINT.
//! Shutdown drains the retry queue before the database is closed, so no
//! accepted delivery is dropped.

use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, warn};

use herald_config::model::HeraldConfig;
use herald_core::error::HeraldError;
use herald_dispatch::{DeliveryQueue, Dispatcher};
use herald_gateway::{start_server, GatewayState, ServerConfig};
use herald_storage::SqliteStore;
use herald_telegram::TelegramTransport;

use crate::shutdown;

/// Runs the `herald serve` command.
pub async fn run_serve(config: HeraldConfig) -> Result<(), HeraldError> {
    init_tracing(&config.service.log_level);

    info!(service = %config.service.name, "starting herald serve");

    let store = Arc::new(SqliteStore::open(&config.storage).await?);
    info!(path = %config.storage.database_path, "storage ready");

    let transport = Arc::new(TelegramTransport::new(&config.telegram)?);
    if let Err(e) = transport.verify_token().await {
        // The service still starts; admin CRUD works without Telegram.
        warn!(error = %e, "Telegram token verification failed");
    }

    let dispatcher = Arc::new(
        Dispatcher::new(store.clone(), store.clone(), transport)
            .with_max_retries(config.dispatch.max_retries),
    );

    let queue = Arc::new(DeliveryQueue::new());
    queue.start(config.dispatch.queue_workers, dispatcher.queue_send_fn());

    let state = GatewayState {
        dispatcher,
        notifications: store.clone(),
        recipients: store.clone(),
        start_time: Instant::now(),
    };
    let server_config = ServerConfig {
        host: config.gateway.host.clone(),
        port: config.gateway.port,
    };
    let server = tokio::spawn(async move {
        if let Err(e) = start_server(&server_config, state).await {
            error!(error = %e, "gateway server exited");
        }
    });

    let cancel = shutdown::install_signal_handler();
    cancel.cancelled().await;

    info!("draining delivery queue");
    queue.stop().await;

    server.abort();
    store.close().await?;
    info!("herald stopped");
    Ok(())
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("herald={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
