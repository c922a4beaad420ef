// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Agent presence changes and re-queue of pending conversations.
//!
//! Going online hands waiting conversations out by least load, oldest
//! activity first. Going offline only updates the directory: conversations
//! already assigned stay with their agent.

use tracing::{debug, info};

use switchboard_bus::{FanoutEvent, Target};
use switchboard_core::SwitchboardError;
use switchboard_core::types::{Agent, AgentId, AgentStatus, Conversation, ConversationStatus};

use crate::assignment::try_select_agent;
use crate::context::EngineContext;

/// Outcome of a presence update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceChange {
    pub agent: Agent,
    /// Pending conversations that received an agent as a consequence.
    pub assigned: Vec<Conversation>,
}

#[derive(Clone)]
pub struct PresenceService {
    ctx: EngineContext,
    requeue_pending: bool,
}

impl PresenceService {
    pub fn new(ctx: EngineContext, requeue_pending: bool) -> Self {
        Self {
            ctx,
            requeue_pending,
        }
    }

    pub async fn set_presence(
        &self,
        agent_id: &AgentId,
        status: AgentStatus,
    ) -> Result<PresenceChange, SwitchboardError> {
        let agent = self
            .ctx
            .agents
            .set_agent_status(agent_id, status)
            .await?
            .ok_or_else(|| SwitchboardError::not_found("agent", agent_id.as_str()))?;

        info!(agent_id = %agent.id, status = %status, "agent presence updated");
        self.ctx.hub.publish(
            FanoutEvent::AgentPresence {
                agent_id: agent.id.clone(),
                status,
            },
            &Target::Broadcast,
        );

        let assigned = if status == AgentStatus::Online && self.requeue_pending {
            self.assign_pending().await?
        } else {
            Vec::new()
        };

        Ok(PresenceChange { agent, assigned })
    }

    /// Offers every pending conversation to the least-loaded online agent.
    ///
    /// Stops early once nobody is online.
    pub async fn assign_pending(&self) -> Result<Vec<Conversation>, SwitchboardError> {
        let store = self.ctx.store.as_ref();
        let agents = self.ctx.agents.as_ref();
        let pending = store.list_pending_conversations().await?;
        let mut assigned = Vec::new();

        for candidate in pending {
            let _guard = self.ctx.lock_address(&candidate.customer_address).await;

            // Re-read under the lock: an inbound event may have assigned it already.
            let Some(current) = store.find_conversation(&candidate.id).await? else {
                continue;
            };
            if current.status != ConversationStatus::Pending {
                continue;
            }

            let Some(choice) = try_select_agent(agents, store).await? else {
                debug!("no agent online, leaving remaining conversations pending");
                break;
            };
            let Some(conversation) = store
                .assign_conversation(&current.id, &choice.agent.id)
                .await?
            else {
                continue;
            };

            switchboard_prometheus::record_assignment("assigned");
            info!(
                conversation_id = %conversation.id,
                agent_id = %choice.agent.id,
                "pending conversation assigned"
            );
            self.ctx.publish_for(
                &conversation,
                FanoutEvent::ConversationAssigned {
                    conversation: conversation.clone(),
                },
            );
            assigned.push(conversation);
        }

        Ok(assigned)
    }
}
