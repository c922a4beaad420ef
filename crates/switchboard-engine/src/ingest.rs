// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound ingestion: normalized channel events become conversation and message state.
//!
//! Each event runs under the lock of its customer address:
//! duplicate check, find-or-create conversation (assigning an agent when one
//! is online), append the message together with the summary bump, publish.
//! The conversation is always written before its first message, and the
//! message only exists once its summary bump has committed, so retrying a
//! half-processed event finds the conversation by address and redoes the rest.

use tracing::{debug, info, warn};

use switchboard_bus::FanoutEvent;
use switchboard_core::SwitchboardError;
use switchboard_core::types::{
    Conversation, ConversationStatus, ConversationUpdate, InboundEvent, Message, MessageId,
    Sender,
};

use crate::assignment::try_select_agent;
use crate::context::EngineContext;

/// Result of ingesting one inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The message was stored.
    Accepted {
        conversation: Conversation,
        message: Message,
        /// A new conversation was opened for this message.
        created: bool,
        /// The conversation got its agent while processing this message.
        assigned: bool,
    },
    /// The external message id was already processed; nothing changed.
    Duplicate { external_message_id: String },
}

impl IngestOutcome {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate { .. })
    }
}

/// Turns inbound events into stored state and fan-out events.
#[derive(Clone)]
pub struct IngestionPipeline {
    ctx: EngineContext,
}

impl IngestionPipeline {
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    /// Ingests one event. Replays of the same external message id are a no-op success.
    pub async fn ingest(&self, event: InboundEvent) -> Result<IngestOutcome, SwitchboardError> {
        if let Err(e) = event.validate() {
            switchboard_prometheus::record_inbound("rejected");
            return Err(e);
        }

        let _guard = self.ctx.lock_address(&event.external_address).await;

        if self
            .ctx
            .store
            .find_message_by_external_id(&event.external_message_id)
            .await?
            .is_some()
        {
            return Ok(self.duplicate(&event));
        }

        let (conversation, created, assigned) = self.find_or_open(&event).await?;

        let message = Message {
            id: MessageId::generate(),
            conversation_id: conversation.id.clone(),
            content: event.content.text().to_string(),
            kind: event.content.kind(),
            sender: Sender::Customer,
            timestamp: event.external_timestamp,
            media_ref: event.content.media_ref().map(str::to_string),
            external_id: Some(event.external_message_id.clone()),
            idempotency_key: None,
        };

        let update = ConversationUpdate::InboundMessage {
            preview: message.preview(),
            at: message.timestamp,
        };
        let Some(conversation) = self.ctx.store.append_message(&message, update).await? else {
            // Written by another process between our check and insert.
            return Ok(self.duplicate(&event));
        };

        if assigned {
            self.ctx.publish_for(
                &conversation,
                FanoutEvent::ConversationAssigned {
                    conversation: conversation.clone(),
                },
            );
        }
        self.ctx.publish_for(
            &conversation,
            FanoutEvent::NewMessage {
                conversation: conversation.clone(),
                message: message.clone(),
            },
        );

        switchboard_prometheus::record_inbound("accepted");
        debug!(
            conversation_id = %conversation.id,
            external_message_id = %event.external_message_id,
            kind = %message.kind,
            unread = conversation.unread_count,
            "inbound message stored"
        );

        Ok(IngestOutcome::Accepted {
            conversation,
            message,
            created,
            assigned,
        })
    }

    /// Returns the open conversation for the event's address, creating it if
    /// needed, and retries assignment for a pending one.
    ///
    /// Yields `(conversation, created, newly_assigned)`.
    async fn find_or_open(
        &self,
        event: &InboundEvent,
    ) -> Result<(Conversation, bool, bool), SwitchboardError> {
        let store = self.ctx.store.as_ref();
        let agents = self.ctx.agents.as_ref();

        if let Some(existing) = store.find_open_conversation(&event.external_address).await? {
            if existing.status != ConversationStatus::Pending {
                return Ok((existing, false, false));
            }
            let Some(choice) = try_select_agent(agents, store).await? else {
                switchboard_prometheus::record_assignment("pending");
                return Ok((existing, false, false));
            };
            return match store.assign_conversation(&existing.id, &choice.agent.id).await? {
                Some(assigned) => {
                    switchboard_prometheus::record_assignment("assigned");
                    info!(
                        conversation_id = %assigned.id,
                        agent_id = %choice.agent.id,
                        "pending conversation assigned on new inbound message"
                    );
                    Ok((assigned, false, true))
                }
                None => {
                    // Assigned concurrently by a presence change.
                    let current = store
                        .find_conversation(&existing.id)
                        .await?
                        .unwrap_or(existing);
                    Ok((current, false, false))
                }
            };
        }

        let choice = try_select_agent(agents, store).await?;
        let agent_id = choice.map(|c| c.agent.id);
        let fresh = Conversation::open(
            event.external_address.clone(),
            event.display_name(),
            agent_id.clone(),
            event.external_timestamp,
        );
        let stored = store.insert_conversation(&fresh).await?;
        let created = stored.id == fresh.id;

        if !created {
            debug!(
                conversation_id = %stored.id,
                "attached to conversation opened concurrently"
            );
            return Ok((stored, false, false));
        }

        match &agent_id {
            Some(agent) => {
                switchboard_prometheus::record_assignment("assigned");
                info!(
                    conversation_id = %stored.id,
                    agent_id = %agent,
                    "conversation opened and assigned"
                );
            }
            None => {
                switchboard_prometheus::record_assignment("pending");
                warn!(
                    conversation_id = %stored.id,
                    "no agent online, conversation left pending"
                );
            }
        }
        let assigned = agent_id.is_some();
        Ok((stored, true, assigned))
    }

    fn duplicate(&self, event: &InboundEvent) -> IngestOutcome {
        switchboard_prometheus::record_inbound("duplicate");
        debug!(
            external_message_id = %event.external_message_id,
            "duplicate inbound event ignored"
        );
        IngestOutcome::Duplicate {
            external_message_id: event.external_message_id.clone(),
        }
    }
}
