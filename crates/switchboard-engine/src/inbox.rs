// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Agent-facing reads and the resolve transition.

use tracing::info;

use switchboard_bus::FanoutEvent;
use switchboard_core::SwitchboardError;
use switchboard_core::types::{
    AgentId, Conversation, ConversationFilter, ConversationId, ConversationStatus,
    ConversationUpdate, Message,
};

use crate::context::EngineContext;

#[derive(Clone)]
pub struct Inbox {
    ctx: EngineContext,
}

impl Inbox {
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    /// Conversations assigned to `agent`, newest activity first.
    pub async fn list(
        &self,
        agent: &AgentId,
        status: Option<ConversationStatus>,
    ) -> Result<Vec<Conversation>, SwitchboardError> {
        self.ctx
            .agents
            .find_agent(agent)
            .await?
            .ok_or_else(|| SwitchboardError::not_found("agent", agent.as_str()))?;

        self.ctx
            .store
            .list_conversations(&ConversationFilter {
                agent: Some(agent.clone()),
                status,
            })
            .await
    }

    /// Full message history, visible to the assigned agent only.
    pub async fn history(
        &self,
        agent: &AgentId,
        conversation_id: &ConversationId,
    ) -> Result<Vec<Message>, SwitchboardError> {
        let conversation = self.fetch(conversation_id).await?;
        conversation.authorize(agent)?;
        self.ctx.store.list_messages(conversation_id).await
    }

    /// Marks a conversation resolved. Resolving twice returns the resolved record.
    ///
    /// The next inbound message from the same address opens a new conversation.
    pub async fn resolve(
        &self,
        agent: &AgentId,
        conversation_id: &ConversationId,
    ) -> Result<Conversation, SwitchboardError> {
        let snapshot = self.fetch(conversation_id).await?;
        snapshot.authorize(agent)?;

        let _guard = self.ctx.lock_address(&snapshot.customer_address).await;
        let conversation = self.fetch(conversation_id).await?;
        if conversation.status == ConversationStatus::Resolved {
            return Ok(conversation);
        }

        let resolved = self
            .ctx
            .store
            .update_conversation(
                conversation_id,
                ConversationUpdate::Status(ConversationStatus::Resolved),
            )
            .await?
            .ok_or_else(|| SwitchboardError::not_found("conversation", conversation_id.as_str()))?;

        info!(conversation_id = %resolved.id, agent_id = %agent, "conversation resolved");
        self.ctx.publish_for(
            &resolved,
            FanoutEvent::ConversationUpdated {
                conversation: resolved.clone(),
            },
        );
        Ok(resolved)
    }

    async fn fetch(&self, id: &ConversationId) -> Result<Conversation, SwitchboardError> {
        self.ctx
            .store
            .find_conversation(id)
            .await?
            .ok_or_else(|| SwitchboardError::not_found("conversation", id.as_str()))
    }
}
