// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound send path: an agent's reply goes to the channel, then into the store.
//!
//! The gateway call happens before anything is persisted and outside any
//! address lock. A failed or timed-out call leaves no trace locally. The
//! optional client token makes a client-side retry safe: a token already
//! stored returns the stored message without calling the gateway again.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::{debug, error, info};

use switchboard_bus::FanoutEvent;
use switchboard_core::types::{
    Conversation, ConversationUpdate, Message, MessageId, OutboundDispatch, SendRequest, Sender,
    now,
};
use switchboard_core::{ChannelGateway, SwitchboardError};

use crate::context::EngineContext;

/// Result of a successful send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendOutcome {
    pub message: Message,
    pub conversation: Conversation,
    /// The client token matched an earlier successful send; nothing was dispatched.
    pub replayed: bool,
}

/// Dispatches agent replies through the channel gateway.
#[derive(Clone)]
pub struct OutboundSender {
    ctx: EngineContext,
    gateway: Arc<dyn ChannelGateway>,
    timeout: Duration,
    in_flight: Arc<DashMap<String, ()>>,
}

impl OutboundSender {
    pub fn new(ctx: EngineContext, gateway: Arc<dyn ChannelGateway>, timeout: Duration) -> Self {
        Self {
            ctx,
            gateway,
            timeout,
            in_flight: Arc::new(DashMap::new()),
        }
    }

    pub async fn send(&self, request: SendRequest) -> Result<SendOutcome, SwitchboardError> {
        request.validate_payload()?;

        let conversation = self
            .ctx
            .store
            .find_conversation(&request.conversation_id)
            .await?
            .ok_or_else(|| {
                SwitchboardError::not_found("conversation", request.conversation_id.as_str())
            })?;
        conversation.authorize(&request.agent_id)?;

        let _claim = match request.client_token.as_deref() {
            Some(token) => {
                let claim = InFlightClaim::acquire(&self.in_flight, token)?;
                if let Some(outcome) = self.replay(&conversation, token).await? {
                    return Ok(outcome);
                }
                Some(claim)
            }
            None => None,
        };

        let dispatch = OutboundDispatch {
            to: conversation.customer_address.clone(),
            content: request.content.clone(),
            kind: request.kind,
            media_link: request.media_ref.clone(),
        };

        let external_id = self.dispatch(&conversation, &dispatch).await?;

        let message = Message {
            id: MessageId::generate(),
            conversation_id: conversation.id.clone(),
            content: request.content,
            kind: request.kind,
            sender: Sender::Agent,
            timestamp: now(),
            media_ref: request.media_ref,
            external_id: Some(external_id),
            idempotency_key: request.client_token,
        };

        let _guard = self.ctx.lock_address(&conversation.customer_address).await;

        let update = ConversationUpdate::AgentReply {
            preview: message.preview(),
            at: message.timestamp,
        };
        let Some(updated) = self.ctx.store.append_message(&message, update).await? else {
            // Another process stored this token between our check and insert.
            if let Some(token) = message.idempotency_key.as_deref()
                && let Some(outcome) = self.replay(&conversation, token).await?
            {
                return Ok(outcome);
            }
            return Err(SwitchboardError::Internal(format!(
                "message {} was sent but could not be stored",
                message.id
            )));
        };

        self.ctx.publish_for(
            &updated,
            FanoutEvent::NewMessage {
                conversation: updated.clone(),
                message: message.clone(),
            },
        );

        switchboard_prometheus::record_outbound("sent");
        info!(
            conversation_id = %updated.id,
            agent_id = %request.agent_id,
            message_id = %message.id,
            "agent reply sent"
        );

        Ok(SendOutcome {
            message,
            conversation: updated,
            replayed: false,
        })
    }

    /// Calls the gateway with the configured timeout. Never retried here.
    async fn dispatch(
        &self,
        conversation: &Conversation,
        dispatch: &OutboundDispatch,
    ) -> Result<String, SwitchboardError> {
        let started = Instant::now();
        let result = tokio::time::timeout(self.timeout, self.gateway.send(dispatch)).await;
        switchboard_prometheus::record_gateway_latency(started.elapsed().as_secs_f64());

        let result = match result {
            Ok(inner) => inner,
            Err(_) => Err(SwitchboardError::gateway(format!(
                "gateway call timed out after {}s",
                self.timeout.as_secs_f64()
            ))),
        };

        result.inspect_err(|e| {
            switchboard_prometheus::record_outbound("gateway_error");
            error!(
                conversation_id = %conversation.id,
                error = %e,
                "outbound dispatch failed"
            );
        })
    }

    /// Looks up a stored send for `token`.
    async fn replay(
        &self,
        conversation: &Conversation,
        token: &str,
    ) -> Result<Option<SendOutcome>, SwitchboardError> {
        let Some(message) = self.ctx.store.find_message_by_idempotency_key(token).await? else {
            return Ok(None);
        };
        if message.conversation_id != conversation.id {
            return Err(SwitchboardError::InvalidRequest(format!(
                "client_token {token} was already used on another conversation"
            )));
        }

        let current = self
            .ctx
            .store
            .find_conversation(&conversation.id)
            .await?
            .unwrap_or_else(|| conversation.clone());

        switchboard_prometheus::record_outbound("replayed");
        debug!(
            conversation_id = %conversation.id,
            message_id = %message.id,
            "send replayed from client token"
        );
        Ok(Some(SendOutcome {
            message,
            conversation: current,
            replayed: true,
        }))
    }

    /// Number of client tokens currently being sent.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }
}

/// Marks a client token as executing; released on drop.
struct InFlightClaim {
    tokens: Arc<DashMap<String, ()>>,
    token: String,
}

impl InFlightClaim {
    fn acquire(tokens: &Arc<DashMap<String, ()>>, token: &str) -> Result<Self, SwitchboardError> {
        use dashmap::mapref::entry::Entry;

        match tokens.entry(token.to_string()) {
            Entry::Occupied(_) => Err(SwitchboardError::InFlight {
                token: token.to_string(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(());
                Ok(Self {
                    tokens: Arc::clone(tokens),
                    token: token.to_string(),
                })
            }
        }
    }
}

impl Drop for InFlightClaim {
    fn drop(&mut self) {
        self.tokens.remove(&self.token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_is_exclusive_until_dropped() {
        let tokens = Arc::new(DashMap::new());
        let claim = InFlightClaim::acquire(&tokens, "tok").unwrap();
        assert!(matches!(
            InFlightClaim::acquire(&tokens, "tok"),
            Err(SwitchboardError::InFlight { .. })
        ));
        assert!(InFlightClaim::acquire(&tokens, "other").is_ok());

        drop(claim);
        assert!(InFlightClaim::acquire(&tokens, "tok").is_ok());
        assert!(tokens.is_empty());
    }
}
