// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation routing engine for Switchboard.
//!
//! The [`Engine`] is the central coordinator that:
//! - Ingests normalized inbound events into conversation and message state
//! - Assigns new conversations to the least-loaded online agent
//! - Sends agent replies through the channel gateway
//! - Re-queues pending conversations when agents come online
//! - Publishes every state change to the fan-out hub

pub mod assignment;
pub mod context;
pub mod inbox;
pub mod ingest;
pub mod locks;
pub mod outbound;
pub mod presence;
pub mod shutdown;

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use switchboard_bus::FanoutHub;
use switchboard_config::model::EngineConfig;
use switchboard_core::types::{
    AgentId, AgentStatus, AgentWorkload, Conversation, ConversationId, ConversationStatus,
    InboundEvent, Message, SendRequest,
};
use switchboard_core::{AgentDirectory, ChannelGateway, ConversationStore, SwitchboardError};

pub use context::EngineContext;
pub use inbox::Inbox;
pub use ingest::{IngestOutcome, IngestionPipeline};
pub use locks::{KeyedGuard, KeyedMutex};
pub use outbound::{OutboundSender, SendOutcome};
pub use presence::{PresenceChange, PresenceService};

/// Facade over the ingestion pipeline, send path, presence service and inbox.
///
/// Cheap to clone; clones share stores, hub, locks and in-flight tokens.
#[derive(Clone)]
pub struct Engine {
    ctx: EngineContext,
    ingestion: IngestionPipeline,
    outbound: OutboundSender,
    presence: PresenceService,
    inbox: Inbox,
}

impl Engine {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        agents: Arc<dyn AgentDirectory>,
        gateway: Arc<dyn ChannelGateway>,
        hub: Arc<FanoutHub>,
        config: &EngineConfig,
    ) -> Self {
        let ctx = EngineContext::new(store, agents, hub);
        let timeout = Duration::from_secs(config.send_timeout_secs);

        info!(
            gateway = gateway.name(),
            send_timeout_secs = config.send_timeout_secs,
            requeue_pending = config.requeue_pending_on_presence,
            "engine initialized"
        );

        Self {
            ingestion: IngestionPipeline::new(ctx.clone()),
            outbound: OutboundSender::new(ctx.clone(), gateway, timeout),
            presence: PresenceService::new(ctx.clone(), config.requeue_pending_on_presence),
            inbox: Inbox::new(ctx.clone()),
            ctx,
        }
    }

    pub async fn ingest(&self, event: InboundEvent) -> Result<IngestOutcome, SwitchboardError> {
        self.ingestion.ingest(event).await
    }

    pub async fn send(&self, request: SendRequest) -> Result<SendOutcome, SwitchboardError> {
        self.outbound.send(request).await
    }

    pub async fn set_presence(
        &self,
        agent: &AgentId,
        status: AgentStatus,
    ) -> Result<PresenceChange, SwitchboardError> {
        self.presence.set_presence(agent, status).await
    }

    pub async fn list_conversations(
        &self,
        agent: &AgentId,
        status: Option<ConversationStatus>,
    ) -> Result<Vec<Conversation>, SwitchboardError> {
        self.inbox.list(agent, status).await
    }

    pub async fn history(
        &self,
        agent: &AgentId,
        conversation: &ConversationId,
    ) -> Result<Vec<Message>, SwitchboardError> {
        self.inbox.history(agent, conversation).await
    }

    pub async fn resolve(
        &self,
        agent: &AgentId,
        conversation: &ConversationId,
    ) -> Result<Conversation, SwitchboardError> {
        self.inbox.resolve(agent, conversation).await
    }

    /// Every agent with its current active workload.
    pub async fn workloads(&self) -> Result<Vec<AgentWorkload>, SwitchboardError> {
        let agents = self.ctx.agents.list_agents().await?;
        let mut out = Vec::with_capacity(agents.len());
        for agent in agents {
            let workload = self.ctx.store.count_active_for_agent(&agent.id).await?;
            out.push(AgentWorkload { agent, workload });
        }
        Ok(out)
    }

    pub fn hub(&self) -> &Arc<FanoutHub> {
        &self.ctx.hub
    }

    pub fn agents(&self) -> &Arc<dyn AgentDirectory> {
        &self.ctx.agents
    }

    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.ctx.store
    }

    /// Closes the fan-out hub; in-flight requests finish on their own.
    pub fn shutdown(&self) {
        self.ctx.hub.shutdown();
        info!("engine stopped");
    }
}
