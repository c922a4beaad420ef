// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Events pushed to agent connections.

use serde::{Deserialize, Serialize};

use switchboard_core::types::{AgentId, AgentStatus, Conversation, ConversationId, Message};

/// A state change delivered to agent sessions, serialized with a `type` tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FanoutEvent {
    /// A conversation was bound to its agent.
    ConversationAssigned { conversation: Conversation },
    /// A customer or agent message was appended.
    NewMessage {
        conversation: Conversation,
        message: Message,
    },
    /// Conversation status changed (e.g. resolved).
    ConversationUpdated { conversation: Conversation },
    /// An agent went online or offline.
    AgentPresence {
        agent_id: AgentId,
        status: AgentStatus,
    },
}

impl FanoutEvent {
    /// The wire `type` tag.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ConversationAssigned { .. } => "conversation_assigned",
            Self::NewMessage { .. } => "new_message",
            Self::ConversationUpdated { .. } => "conversation_updated",
            Self::AgentPresence { .. } => "agent_presence",
        }
    }

    pub fn conversation_id(&self) -> Option<&ConversationId> {
        match self {
            Self::ConversationAssigned { conversation }
            | Self::NewMessage { conversation, .. }
            | Self::ConversationUpdated { conversation } => Some(&conversation.id),
            Self::AgentPresence { .. } => None,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Who receives a published event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Every live connection of one agent.
    Agent(AgentId),
    /// Every live connection of every agent.
    Broadcast,
}

impl Target {
    /// Routes conversation events: the assigned agent, or everyone while unassigned.
    pub fn for_conversation(conversation: &Conversation) -> Self {
        match &conversation.assigned_agent {
            Some(agent) => Self::Agent(agent.clone()),
            None => Self::Broadcast,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchboard_core::types::now;

    #[test]
    fn serializes_with_type_tag() {
        let event = FanoutEvent::AgentPresence {
            agent_id: AgentId::from("a-1"),
            status: AgentStatus::Online,
        };
        let json: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(json["type"], "agent_presence");
        assert_eq!(json["agent_id"], "a-1");
        assert_eq!(json["status"], "online");
        assert_eq!(event.event_type(), "agent_presence");
        assert!(event.conversation_id().is_none());
    }

    #[test]
    fn conversation_events_expose_their_conversation() {
        let conversation = Conversation::open("+1555", "Ana", Some(AgentId::from("a-1")), now());
        let event = FanoutEvent::ConversationAssigned {
            conversation: conversation.clone(),
        };
        assert_eq!(event.conversation_id(), Some(&conversation.id));

        let parsed: FanoutEvent = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn unassigned_conversations_broadcast() {
        let pending = Conversation::open("+1555", "Ana", None, now());
        assert_eq!(Target::for_conversation(&pending), Target::Broadcast);

        let active = Conversation::open("+1555", "Ana", Some(AgentId::from("a-7")), now());
        assert_eq!(
            Target::for_conversation(&active),
            Target::Agent(AgentId::from("a-7"))
        );
    }
}
