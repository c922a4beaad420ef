// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Switchboard routing engine.

use thiserror::Error;

/// The primary error type used across all Switchboard adapter traits and engine operations.
///
/// Replayed inbound events and replayed sends are not errors: they surface as
/// successful outcomes flagged as duplicates by the engine.
#[derive(Debug, Error)]
pub enum SwitchboardError {
    /// Configuration errors (invalid TOML, missing required fields, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, row decoding).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The external messaging channel rejected the call, failed, or timed out.
    #[error("gateway error: {message}")]
    Gateway {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A conversation, message, or agent does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The caller is not the agent assigned to the target conversation.
    #[error("agent {agent_id} is not assigned to conversation {conversation_id}")]
    Forbidden {
        agent_id: String,
        conversation_id: String,
    },

    /// No agent is online to take a new conversation.
    #[error("no agent available for assignment")]
    NoAgentAvailable,

    /// A caller-supplied request failed validation.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// An inbound channel event failed validation at the ingestion boundary.
    #[error("invalid inbound event: {0}")]
    InvalidEvent(String),

    /// A send carrying the same client token is still executing.
    #[error("a send with client token {token} is already in flight")]
    InFlight { token: String },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SwitchboardError {
    /// Shorthand for a [`SwitchboardError::NotFound`].
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Shorthand for a [`SwitchboardError::Gateway`] without an underlying source.
    pub fn gateway(message: impl Into<String>) -> Self {
        Self::Gateway {
            message: message.into(),
            source: None,
        }
    }

    /// Wraps any error as a [`SwitchboardError::Storage`].
    pub fn storage(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Storage {
            source: Box::new(source),
        }
    }

    /// Returns `true` when a caller may safely retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Gateway { .. } | Self::Storage { .. } | Self::InFlight { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_entity() {
        let err = SwitchboardError::not_found("conversation", "c-1");
        assert_eq!(err.to_string(), "conversation not found: c-1");
    }

    #[test]
    fn forbidden_message_names_both_sides() {
        let err = SwitchboardError::Forbidden {
            agent_id: "a-2".into(),
            conversation_id: "c-9".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("a-2"));
        assert!(msg.contains("c-9"));
    }

    #[test]
    fn retryable_classification() {
        assert!(SwitchboardError::gateway("503").is_retryable());
        assert!(SwitchboardError::storage(std::io::Error::other("disk")).is_retryable());
        assert!(!SwitchboardError::not_found("message", "m").is_retryable());
        assert!(!SwitchboardError::NoAgentAvailable.is_retryable());
        assert!(
            !SwitchboardError::Forbidden {
                agent_id: "a".into(),
                conversation_id: "c".into()
            }
            .is_retryable()
        );
    }
}
