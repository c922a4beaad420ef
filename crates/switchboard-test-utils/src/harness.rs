// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles the full routing stack over a temp SQLite
//! database, a [`FlakyStore`] in front of it and a [`MockGateway`], with
//! helpers to provision agents and build inbound events.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use switchboard_bus::FanoutHub;
use switchboard_config::model::{EngineConfig, StorageConfig};
use switchboard_core::types::{Agent, AgentStatus, InboundContent, InboundEvent, now};
use switchboard_core::{AgentDirectory, StorageAdapter, SwitchboardError};
use switchboard_engine::Engine;
use switchboard_storage::SqliteStorage;

use crate::flaky_store::FlakyStore;
use crate::mock_gateway::MockGateway;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    engine: EngineConfig,
    connection_buffer: usize,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            engine: EngineConfig::default(),
            connection_buffer: 64,
        }
    }

    /// Upper bound on a gateway call, in seconds.
    pub fn with_send_timeout(mut self, secs: u64) -> Self {
        self.engine.send_timeout_secs = secs;
        self
    }

    /// Whether an agent coming online picks up pending conversations.
    pub fn with_requeue_on_presence(mut self, enabled: bool) -> Self {
        self.engine.requeue_pending_on_presence = enabled;
        self
    }

    /// Per-connection fan-out queue depth.
    pub fn with_connection_buffer(mut self, buffer: usize) -> Self {
        self.connection_buffer = buffer;
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, SwitchboardError> {
        let temp_dir = tempfile::TempDir::new().map_err(SwitchboardError::storage)?;
        let db_path = temp_dir.path().join("test.db");

        let storage = SqliteStorage::new(StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
        });
        storage.initialize().await?;
        let storage = Arc::new(storage);
        let store = Arc::new(FlakyStore::new(storage.clone()));

        let gateway = Arc::new(MockGateway::new());
        let hub = Arc::new(FanoutHub::new(self.connection_buffer));
        let engine = Engine::new(
            store.clone(),
            storage.clone(),
            gateway.clone(),
            hub.clone(),
            &self.engine,
        );

        Ok(TestHarness {
            storage,
            store,
            gateway,
            hub,
            engine,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with a mock gateway and temp storage.
pub struct TestHarness {
    /// SQLite storage (temp DB, cleaned up on drop).
    pub storage: Arc<SqliteStorage>,
    /// The conversation store the engine writes through.
    pub store: Arc<FlakyStore>,
    pub gateway: Arc<MockGateway>,
    pub hub: Arc<FanoutHub>,
    pub engine: Engine,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Harness with default settings.
    pub async fn new() -> Result<Self, SwitchboardError> {
        Self::builder().build().await
    }

    /// Provisions an agent with a unique email derived from `name`.
    pub async fn add_agent(
        &self,
        name: &str,
        status: AgentStatus,
    ) -> Result<Agent, SwitchboardError> {
        let agent = Agent::new(name, format!("{}@example.com", name.to_lowercase()), status);
        self.storage.insert_agent(&agent).await?;
        Ok(agent)
    }
}

/// A text message from `from` with channel id `id`, sent now.
pub fn text_event(from: &str, id: &str, body: &str) -> InboundEvent {
    event_at(
        from,
        id,
        InboundContent::Text {
            body: body.to_string(),
        },
        now(),
    )
}

/// An image message with an optional caption.
pub fn image_event(from: &str, id: &str, media_id: &str, caption: Option<&str>) -> InboundEvent {
    event_at(
        from,
        id,
        InboundContent::Image {
            media_id: media_id.to_string(),
            caption: caption.map(str::to_string),
        },
        now(),
    )
}

pub fn audio_event(from: &str, id: &str, media_id: &str) -> InboundEvent {
    event_at(
        from,
        id,
        InboundContent::Audio {
            media_id: media_id.to_string(),
        },
        now(),
    )
}

fn event_at(
    from: &str,
    id: &str,
    content: InboundContent,
    at: DateTime<Utc>,
) -> InboundEvent {
    InboundEvent {
        external_address: from.to_string(),
        customer_name: Some(format!("Customer {from}")),
        content,
        external_timestamp: at,
        external_message_id: id.to_string(),
    }
}
