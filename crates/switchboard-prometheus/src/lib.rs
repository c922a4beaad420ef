// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prometheus metrics adapter for Switchboard.
//!
//! Uses the metrics-rs facade with the Prometheus exporter.
//! Metrics are rendered as Prometheus text format via the `render()` method,
//! which is exposed through the gateway's /metrics endpoint.

pub mod recording;

use async_trait::async_trait;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use switchboard_core::traits::adapter::PluginAdapter;
use switchboard_core::types::{AdapterType, HealthStatus};
use switchboard_core::SwitchboardError;

pub use recording::{
    record_assignment, record_fanout_dropped, record_gateway_latency, record_inbound,
    record_outbound, register_metrics, set_live_connections,
};

/// Prometheus metrics adapter.
///
/// Installs the Prometheus recorder and exposes a handle for rendering
/// metrics in Prometheus text format.
#[derive(Clone)]
pub struct PrometheusAdapter {
    handle: PrometheusHandle,
}

impl PrometheusAdapter {
    /// Create a new PrometheusAdapter.
    ///
    /// Installs the Prometheus recorder globally. Only one recorder can be
    /// installed per process. Returns an error if a recorder is already installed.
    pub fn new() -> Result<Self, SwitchboardError> {
        let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
            SwitchboardError::Internal(format!("failed to install Prometheus recorder: {e}"))
        })?;

        recording::register_metrics();

        tracing::info!("prometheus metrics recorder installed");

        Ok(Self { handle })
    }

    /// Wraps a handle from a recorder built elsewhere (tests build a local one).
    pub fn from_handle(handle: PrometheusHandle) -> Self {
        Self { handle }
    }

    pub fn handle(&self) -> &PrometheusHandle {
        &self.handle
    }

    /// Render all collected metrics in Prometheus text format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

#[async_trait]
impl PluginAdapter for PrometheusAdapter {
    fn name(&self) -> &str {
        "prometheus"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Observability
    }

    async fn health_check(&self) -> Result<HealthStatus, SwitchboardError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), SwitchboardError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The global recorder can only be installed once per process, so tests
    // render through a local recorder instead of calling `new()`.
    fn local_adapter() -> (PrometheusAdapter, metrics_exporter_prometheus::PrometheusRecorder) {
        let recorder = PrometheusBuilder::new().build_recorder();
        let adapter = PrometheusAdapter::from_handle(recorder.handle());
        (adapter, recorder)
    }

    #[test]
    fn renders_recorded_counters() {
        let (adapter, recorder) = local_adapter();
        metrics::with_local_recorder(&recorder, || {
            record_inbound("accepted");
            record_inbound("accepted");
            record_outbound("gateway_error");
        });
        let text = adapter.render();
        assert!(text.contains("switchboard_inbound_messages_total{outcome=\"accepted\"} 2"));
        assert!(text.contains("switchboard_outbound_messages_total{outcome=\"gateway_error\"} 1"));
    }

    #[test]
    fn renders_live_connection_gauge() {
        let (adapter, recorder) = local_adapter();
        metrics::with_local_recorder(&recorder, || set_live_connections(4));
        assert!(adapter.render().contains("switchboard_live_connections 4"));
    }

    #[tokio::test]
    async fn adapter_reports_observability_type() {
        let (adapter, _recorder) = local_adapter();
        assert_eq!(adapter.name(), "prometheus");
        assert_eq!(adapter.adapter_type(), AdapterType::Observability);
        assert_eq!(adapter.health_check().await.unwrap(), HealthStatus::Healthy);
    }
}
