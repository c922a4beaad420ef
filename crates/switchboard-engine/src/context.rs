// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborators shared by every engine component.

use std::sync::Arc;

use switchboard_bus::{FanoutEvent, FanoutHub, PublishReport, Target};
use switchboard_core::types::Conversation;
use switchboard_core::{AgentDirectory, ConversationStore};

use crate::locks::{KeyedGuard, KeyedMutex};

/// Handles to the stores, the fan-out hub and the per-address locks.
///
/// Cheap to clone; all clones share the same lock table.
#[derive(Clone)]
pub struct EngineContext {
    pub store: Arc<dyn ConversationStore>,
    pub agents: Arc<dyn AgentDirectory>,
    pub hub: Arc<FanoutHub>,
    address_locks: Arc<KeyedMutex<String>>,
}

impl EngineContext {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        agents: Arc<dyn AgentDirectory>,
        hub: Arc<FanoutHub>,
    ) -> Self {
        Self {
            store,
            agents,
            hub,
            address_locks: Arc::new(KeyedMutex::new()),
        }
    }

    /// Serializes every read-modify-write on the conversation(s) of one customer address.
    ///
    /// Must never be held across a channel gateway call.
    pub async fn lock_address(&self, customer_address: &str) -> KeyedGuard<String> {
        self.address_locks.lock(&customer_address.to_string()).await
    }

    /// Publishes a conversation event to its assigned agent, or to everyone while pending.
    pub fn publish_for(&self, conversation: &Conversation, event: FanoutEvent) -> PublishReport {
        self.hub.publish(event, &Target::for_conversation(conversation))
    }

    pub fn locked_addresses(&self) -> usize {
        self.address_locks.active_keys()
    }
}
