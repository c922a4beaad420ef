// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock channel gateway for deterministic testing.
//!
//! `MockGateway` implements `ChannelGateway`, captures every dispatch for
//! assertions and can be told to fail or to stall.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use switchboard_core::SwitchboardError;
use switchboard_core::traits::adapter::PluginAdapter;
use switchboard_core::traits::channel::ChannelGateway;
use switchboard_core::types::{AdapterType, HealthStatus, OutboundDispatch};

/// A channel gateway double.
///
/// Every call to `send()` is recorded, including failing ones.
pub struct MockGateway {
    dispatched: Mutex<Vec<OutboundDispatch>>,
    failure: Mutex<Option<String>>,
    latency: Mutex<Duration>,
    counter: AtomicU64,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            dispatched: Mutex::new(Vec::new()),
            failure: Mutex::new(None),
            latency: Mutex::new(Duration::ZERO),
            counter: AtomicU64::new(0),
        }
    }

    /// Make every subsequent send fail with `message` (or succeed again with `None`).
    pub fn set_failure(&self, message: Option<&str>) {
        *lock(&self.failure) = message.map(str::to_string);
    }

    /// Delay every subsequent send by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        *lock(&self.latency) = latency;
    }

    /// All dispatches seen so far, in call order.
    pub fn dispatched(&self) -> Vec<OutboundDispatch> {
        lock(&self.dispatched).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.dispatched).len()
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

// A panicking test thread must not cascade into unrelated assertions.
fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

#[async_trait]
impl PluginAdapter for MockGateway {
    fn name(&self) -> &str {
        "mock-gateway"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, SwitchboardError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), SwitchboardError> {
        Ok(())
    }
}

#[async_trait]
impl ChannelGateway for MockGateway {
    async fn send(&self, dispatch: &OutboundDispatch) -> Result<String, SwitchboardError> {
        lock(&self.dispatched).push(dispatch.clone());

        let latency = *lock(&self.latency);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let failure = lock(&self.failure).clone();
        if let Some(message) = failure {
            return Err(SwitchboardError::gateway(message));
        }

        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("wamid.mock-{n}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchboard_core::types::MessageKind;

    fn dispatch(body: &str) -> OutboundDispatch {
        OutboundDispatch {
            to: "+15550001".into(),
            content: body.into(),
            kind: MessageKind::Text,
            media_link: None,
        }
    }

    #[tokio::test]
    async fn send_records_and_returns_unique_ids() {
        let gw = MockGateway::new();
        let a = gw.send(&dispatch("one")).await.unwrap();
        let b = gw.send(&dispatch("two")).await.unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with("wamid.mock-"));
        assert_eq!(gw.call_count(), 2);
        assert_eq!(gw.dispatched()[1].content, "two");
    }

    #[tokio::test]
    async fn injected_failure_is_a_gateway_error() {
        let gw = MockGateway::new();
        gw.set_failure(Some("rate limited"));
        let err = gw.send(&dispatch("x")).await.unwrap_err();
        assert!(matches!(err, SwitchboardError::Gateway { .. }));
        assert!(err.to_string().contains("rate limited"));
        assert_eq!(gw.call_count(), 1);

        gw.set_failure(None);
        assert!(gw.send(&dispatch("y")).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn latency_delays_the_reply() {
        let gw = MockGateway::new();
        gw.set_latency(Duration::from_secs(5));
        let started = tokio::time::Instant::now();
        gw.send(&dispatch("slow")).await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(5));
    }
}
