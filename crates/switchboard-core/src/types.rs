// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across adapter traits and the Switchboard engine.

use std::fmt;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::SwitchboardError;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Generates a fresh random identifier.
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(
    /// Unique identifier for an agent.
    AgentId
);
string_id!(
    /// Unique identifier for a conversation.
    ConversationId
);
string_id!(
    /// Unique identifier for a stored message.
    MessageId
);

/// Current UTC time truncated to millisecond precision, the resolution stored on disk.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a [`PluginAdapter`](crate::PluginAdapter).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Storage,
    Channel,
    Observability,
}

/// Agent presence as pushed by the session layer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AgentStatus {
    Online,
    Offline,
}

/// Lifecycle of a conversation. Conversations are never deleted, only resolved.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConversationStatus {
    /// Assigned to an agent and open.
    Active,
    /// Created while no agent was online; waiting for assignment.
    Pending,
    /// Closed by the assigned agent.
    Resolved,
}

/// The three message kinds carried through the system.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MessageKind {
    Text,
    Image,
    Audio,
}

impl MessageKind {
    /// Whether this kind carries a media reference.
    pub fn is_media(self) -> bool {
        matches!(self, MessageKind::Image | MessageKind::Audio)
    }
}

/// Who authored a message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Sender {
    Customer,
    Agent,
}

/// A human operator who handles conversations.
///
/// Workload is never stored on the record; see [`AgentWorkload`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    pub email: String,
    pub status: AgentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Agent {
    /// Creates a new agent record with a generated id.
    pub fn new(name: impl Into<String>, email: impl Into<String>, status: AgentStatus) -> Self {
        let ts = now();
        Self {
            id: AgentId::generate(),
            name: name.into(),
            email: email.into(),
            status,
            created_at: ts,
            updated_at: ts,
        }
    }
}

/// An agent paired with the number of active conversations assigned to it,
/// computed from the conversation set at the time of reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentWorkload {
    pub agent: Agent,
    pub workload: u64,
}

/// The persistent thread between one external customer address and one agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    /// External customer address (phone number for WhatsApp).
    pub customer_address: String,
    pub customer_name: String,
    /// Set once; `None` only while the conversation is pending.
    pub assigned_agent: Option<AgentId>,
    pub status: ConversationStatus,
    pub last_message: String,
    pub last_message_at: DateTime<Utc>,
    pub unread_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Builds a new conversation for a first inbound message.
    ///
    /// With an agent the conversation starts `active`; without one it starts `pending`.
    pub fn open(
        customer_address: impl Into<String>,
        customer_name: impl Into<String>,
        assigned_agent: Option<AgentId>,
        first_message_at: DateTime<Utc>,
    ) -> Self {
        let ts = now();
        let status = if assigned_agent.is_some() {
            ConversationStatus::Active
        } else {
            ConversationStatus::Pending
        };
        Self {
            id: ConversationId::generate(),
            customer_address: customer_address.into(),
            customer_name: customer_name.into(),
            assigned_agent,
            status,
            last_message: String::new(),
            last_message_at: first_message_at,
            unread_count: 0,
            created_at: ts,
            updated_at: ts,
        }
    }

    /// Whether `agent` is the agent assigned to this conversation.
    pub fn is_assigned_to(&self, agent: &AgentId) -> bool {
        self.assigned_agent.as_ref() == Some(agent)
    }

    /// Fails with [`SwitchboardError::Forbidden`] unless `agent` is the assigned agent.
    pub fn authorize(&self, agent: &AgentId) -> Result<(), SwitchboardError> {
        if self.is_assigned_to(agent) {
            Ok(())
        } else {
            Err(SwitchboardError::Forbidden {
                agent_id: agent.to_string(),
                conversation_id: self.id.to_string(),
            })
        }
    }
}

/// A single immutable message within a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    /// Text body, or caption for media.
    pub content: String,
    pub kind: MessageKind,
    pub sender: Sender,
    /// Channel-reported send time for customer messages, dispatch time for agent messages.
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_ref: Option<String>,
    /// Identifier assigned by the external channel.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    /// Client-supplied token used to deduplicate agent sends.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
}

impl Message {
    /// Text used for the conversation's last-message preview.
    pub fn preview(&self) -> String {
        preview_text(&self.content, self.kind)
    }
}

/// Preview text for a message body; captionless media get a placeholder.
pub fn preview_text(content: &str, kind: MessageKind) -> String {
    if !content.trim().is_empty() {
        return content.to_string();
    }
    match kind {
        MessageKind::Text => String::new(),
        MessageKind::Image => "[image]".to_string(),
        MessageKind::Audio => "[audio]".to_string(),
    }
}

/// Closed set of inbound content shapes accepted from the channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InboundContent {
    Text {
        body: String,
    },
    Image {
        media_id: String,
        caption: Option<String>,
    },
    Audio {
        media_id: String,
    },
}

impl InboundContent {
    pub fn kind(&self) -> MessageKind {
        match self {
            InboundContent::Text { .. } => MessageKind::Text,
            InboundContent::Image { .. } => MessageKind::Image,
            InboundContent::Audio { .. } => MessageKind::Audio,
        }
    }

    /// Text body or caption; empty for audio and captionless images.
    pub fn text(&self) -> &str {
        match self {
            InboundContent::Text { body } => body,
            InboundContent::Image { caption, .. } => caption.as_deref().unwrap_or(""),
            InboundContent::Audio { .. } => "",
        }
    }

    pub fn media_ref(&self) -> Option<&str> {
        match self {
            InboundContent::Text { .. } => None,
            InboundContent::Image { media_id, .. } | InboundContent::Audio { media_id } => {
                Some(media_id)
            }
        }
    }
}

/// A normalized inbound customer message, ready for ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundEvent {
    pub external_address: String,
    /// Display name reported by the channel, if any.
    pub customer_name: Option<String>,
    pub content: InboundContent,
    pub external_timestamp: DateTime<Utc>,
    pub external_message_id: String,
}

impl InboundEvent {
    /// Checks the invariants the ingestion pipeline relies on.
    pub fn validate(&self) -> Result<(), SwitchboardError> {
        if self.external_address.trim().is_empty() {
            return Err(SwitchboardError::InvalidEvent(
                "missing external address".to_string(),
            ));
        }
        if self.external_message_id.trim().is_empty() {
            return Err(SwitchboardError::InvalidEvent(
                "missing external message id".to_string(),
            ));
        }
        match &self.content {
            InboundContent::Text { body } if body.is_empty() => Err(
                SwitchboardError::InvalidEvent("text message without body".to_string()),
            ),
            InboundContent::Image { media_id, .. } | InboundContent::Audio { media_id }
                if media_id.is_empty() =>
            {
                Err(SwitchboardError::InvalidEvent(
                    "media message without media id".to_string(),
                ))
            }
            _ => Ok(()),
        }
    }

    /// Display name to store on a newly created conversation.
    pub fn display_name(&self) -> &str {
        self.customer_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.external_address)
    }
}

/// An agent's request to reply on a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendRequest {
    pub conversation_id: ConversationId,
    pub agent_id: AgentId,
    pub content: String,
    pub kind: MessageKind,
    /// Pre-uploaded media location; required for image and audio.
    #[serde(default)]
    pub media_ref: Option<String>,
    /// Optional idempotency key supplied by the client.
    #[serde(default)]
    pub client_token: Option<String>,
}

impl SendRequest {
    /// Validates the payload shape (not authorization).
    pub fn validate_payload(&self) -> Result<(), SwitchboardError> {
        if self.kind.is_media() {
            let has_media = self
                .media_ref
                .as_deref()
                .is_some_and(|m| !m.trim().is_empty());
            if !has_media {
                return Err(SwitchboardError::InvalidRequest(format!(
                    "{} messages require a pre-uploaded media reference",
                    self.kind
                )));
            }
        } else if self.content.trim().is_empty() {
            return Err(SwitchboardError::InvalidRequest(
                "text messages require content".to_string(),
            ));
        }
        if self
            .client_token
            .as_deref()
            .is_some_and(|t| t.trim().is_empty())
        {
            return Err(SwitchboardError::InvalidRequest(
                "client_token must not be blank".to_string(),
            ));
        }
        Ok(())
    }
}

/// What the channel gateway is asked to deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundDispatch {
    pub to: String,
    pub content: String,
    pub kind: MessageKind,
    pub media_link: Option<String>,
}

/// A single atomic change to a conversation record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationUpdate {
    /// A customer message arrived: bump unread, refresh preview if not older.
    InboundMessage {
        preview: String,
        at: DateTime<Utc>,
    },
    /// The assigned agent replied: reset unread, refresh preview if not older.
    AgentReply {
        preview: String,
        at: DateTime<Utc>,
    },
    /// Lifecycle transition.
    Status(ConversationStatus),
}

/// Filter for listing conversations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationFilter {
    pub agent: Option<AgentId>,
    pub status: Option<ConversationStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn event(content: InboundContent) -> InboundEvent {
        InboundEvent {
            external_address: "+15550001".into(),
            customer_name: None,
            content,
            external_timestamp: now(),
            external_message_id: "wamid.1".into(),
        }
    }

    #[test]
    fn enums_use_snake_case_on_the_wire() {
        assert_eq!(ConversationStatus::Pending.to_string(), "pending");
        assert_eq!(
            ConversationStatus::from_str("resolved").unwrap(),
            ConversationStatus::Resolved
        );
        assert_eq!(
            serde_json::to_string(&AgentStatus::Online).unwrap(),
            "\"online\""
        );
        assert_eq!(MessageKind::from_str("audio").unwrap(), MessageKind::Audio);
        assert!(MessageKind::from_str("sticker").is_err());
    }

    #[test]
    fn open_without_agent_is_pending() {
        let conv = Conversation::open("+1", "Ann", None, now());
        assert_eq!(conv.status, ConversationStatus::Pending);
        assert!(conv.assigned_agent.is_none());
        assert_eq!(conv.unread_count, 0);

        let conv = Conversation::open("+1", "Ann", Some(AgentId::from("a-1")), now());
        assert_eq!(conv.status, ConversationStatus::Active);
    }

    #[test]
    fn authorize_rejects_other_agents_and_pending() {
        let conv = Conversation::open("+1", "Ann", Some(AgentId::from("a-1")), now());
        assert!(conv.authorize(&AgentId::from("a-1")).is_ok());
        assert!(matches!(
            conv.authorize(&AgentId::from("a-2")),
            Err(SwitchboardError::Forbidden { .. })
        ));

        let pending = Conversation::open("+1", "Ann", None, now());
        assert!(pending.authorize(&AgentId::from("a-1")).is_err());
    }

    #[test]
    fn inbound_content_accessors() {
        let image = InboundContent::Image {
            media_id: "media-7".into(),
            caption: Some("look".into()),
        };
        assert_eq!(image.kind(), MessageKind::Image);
        assert_eq!(image.text(), "look");
        assert_eq!(image.media_ref(), Some("media-7"));

        let audio = InboundContent::Audio {
            media_id: "media-8".into(),
        };
        assert_eq!(audio.text(), "");
        assert_eq!(preview_text(audio.text(), audio.kind()), "[audio]");
    }

    #[test]
    fn inbound_event_validation() {
        assert!(event(InboundContent::Text { body: "hi".into() }).validate().is_ok());
        assert!(event(InboundContent::Text { body: String::new() }).validate().is_err());
        assert!(
            event(InboundContent::Audio {
                media_id: String::new()
            })
            .validate()
            .is_err()
        );

        let mut missing_id = event(InboundContent::Text { body: "hi".into() });
        missing_id.external_message_id = " ".into();
        assert!(matches!(
            missing_id.validate(),
            Err(SwitchboardError::InvalidEvent(_))
        ));
    }

    #[test]
    fn display_name_falls_back_to_address() {
        let mut ev = event(InboundContent::Text { body: "hi".into() });
        assert_eq!(ev.display_name(), "+15550001");
        ev.customer_name = Some("Dana".into());
        assert_eq!(ev.display_name(), "Dana");
    }

    #[test]
    fn send_request_payload_rules() {
        let base = SendRequest {
            conversation_id: ConversationId::from("c"),
            agent_id: AgentId::from("a"),
            content: "hello".into(),
            kind: MessageKind::Text,
            media_ref: None,
            client_token: None,
        };
        assert!(base.validate_payload().is_ok());

        let empty_text = SendRequest {
            content: "  ".into(),
            ..base.clone()
        };
        assert!(empty_text.validate_payload().is_err());

        let image_without_media = SendRequest {
            kind: MessageKind::Image,
            ..base.clone()
        };
        assert!(matches!(
            image_without_media.validate_payload(),
            Err(SwitchboardError::InvalidRequest(_))
        ));

        let audio = SendRequest {
            kind: MessageKind::Audio,
            content: String::new(),
            media_ref: Some("https://cdn.example/a.ogg".into()),
            ..base
        };
        assert!(audio.validate_payload().is_ok());
    }

    #[test]
    fn inbound_content_is_internally_tagged() {
        let json = serde_json::to_value(InboundContent::Text { body: "x".into() }).unwrap();
        assert_eq!(json["kind"], "text");
        let bad: Result<InboundContent, _> =
            serde_json::from_str(r#"{"kind":"sticker","media_id":"m"}"#);
        assert!(bad.is_err());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn media_previews_are_never_empty(caption in ".{0,40}") {
            for kind in [MessageKind::Image, MessageKind::Audio] {
                prop_assert!(!preview_text(&caption, kind).is_empty());
            }
        }

        #[test]
        fn non_blank_content_is_the_preview(content in "[a-z]{1,40}") {
            prop_assert_eq!(preview_text(&content, MessageKind::Text), content);
        }
    }
}
