// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `switchboard serve` command implementation.
//!
//! Wires SQLite storage, the WhatsApp gateway, the fan-out hub and the
//! engine behind the HTTP surface, then serves until SIGINT/SIGTERM.

use std::sync::Arc;

use tracing::{error, info, warn};

use switchboard_bus::FanoutHub;
use switchboard_config::model::SwitchboardConfig;
use switchboard_core::{PluginAdapter, StorageAdapter, SwitchboardError};
use switchboard_engine::{Engine, shutdown};
use switchboard_gateway::{GatewayState, start_server};
use switchboard_prometheus::PrometheusAdapter;
use switchboard_storage::SqliteStorage;
use switchboard_whatsapp::WhatsAppClient;

/// Runs the `switchboard serve` command.
pub async fn run_serve(config: SwitchboardConfig) -> Result<(), SwitchboardError> {
    init_tracing(&config.service.log_level);

    info!(name = %config.service.name, "starting switchboard serve");

    // The recorder is process-global; a second install (tests) only loses /metrics.
    let prometheus = match PrometheusAdapter::new() {
        Ok(adapter) => {
            switchboard_prometheus::register_metrics();
            Some(adapter)
        }
        Err(e) => {
            warn!(error = %e, "metrics disabled");
            None
        }
    };

    let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
    storage.initialize().await?;
    info!(path = %config.storage.database_path, "storage initialized");

    let gateway = Arc::new(WhatsAppClient::new(&config.whatsapp)?);

    let hub = Arc::new(FanoutHub::from_config(&config.fanout));
    let engine = Engine::new(
        storage.clone(),
        storage.clone(),
        gateway.clone(),
        hub,
        &config.engine,
    );

    let mut state = GatewayState::new(engine.clone(), &config);
    if let Some(adapter) = prometheus {
        state = state.with_metrics(Arc::new(move || adapter.render()));
    }
    if state.auth.bearer_token.is_none() {
        warn!("server.bearer_token is not set, agent API will refuse every request");
    }

    let cancel = shutdown::install_signal_handler();
    let server = {
        let host = config.server.host.clone();
        let port = config.server.port;
        let cancel = cancel.clone();
        tokio::spawn(async move { start_server(&host, port, state, cancel).await })
    };

    let served = match server.await {
        Ok(result) => result,
        Err(e) => Err(SwitchboardError::Internal(format!("server task failed: {e}"))),
    };
    if let Err(e) = &served {
        error!(error = %e, "gateway server exited with error");
    }

    // Also reached when the server fails to bind: release everything.
    cancel.cancel();
    engine.shutdown();
    if let Err(e) = gateway.shutdown().await {
        warn!(error = %e, "gateway client shutdown failed");
    }
    if let Err(e) = storage.close().await {
        warn!(error = %e, "storage close failed");
    }

    info!("switchboard stopped");
    served
}

/// Initializes the tracing subscriber with the given log level.
///
/// `RUST_LOG` wins over the configured level when set.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("switchboard={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
