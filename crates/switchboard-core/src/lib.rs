// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Switchboard conversation router.
//!
//! This crate provides the domain types, error type and adapter traits used
//! throughout the workspace. Storage backends and channel gateways implement
//! the traits defined here; the engine only ever sees the traits.

pub mod error;
pub mod traits;
pub mod types;

pub use error::SwitchboardError;
pub use types::{
    AdapterType, Agent, AgentId, AgentStatus, AgentWorkload, Conversation, ConversationFilter,
    ConversationId, ConversationStatus, ConversationUpdate, HealthStatus, InboundContent,
    InboundEvent, Message, MessageId, MessageKind, OutboundDispatch, SendRequest, Sender,
};

pub use traits::{AgentDirectory, ChannelGateway, ConversationStore, PluginAdapter, StorageAdapter};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapter_type_round_trips_through_strings() {
        use std::str::FromStr;

        for variant in [
            AdapterType::Storage,
            AdapterType::Channel,
            AdapterType::Observability,
        ] {
            let parsed = AdapterType::from_str(&variant.to_string()).expect("should parse back");
            assert_eq!(variant, parsed);
        }
    }

    #[test]
    fn health_status_variants() {
        let healthy = HealthStatus::Healthy;
        assert_ne!(HealthStatus::Degraded("slow".into()), healthy);
        assert_ne!(HealthStatus::Unhealthy("down".into()), healthy);
    }

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(ConversationId::generate(), ConversationId::generate());
        assert_ne!(MessageId::generate(), MessageId::generate());
    }

    #[test]
    fn all_traits_are_object_safe() {
        fn _assert_store(_: &dyn ConversationStore) {}
        fn _assert_directory(_: &dyn AgentDirectory) {}
        fn _assert_gateway(_: &dyn ChannelGateway) {}
        fn _assert_storage(_: &dyn StorageAdapter) {}
    }
}
