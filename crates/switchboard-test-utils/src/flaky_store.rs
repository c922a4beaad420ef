// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation store wrapper that can fail writes on demand.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use switchboard_core::types::{
    AgentId, Conversation, ConversationFilter, ConversationId, ConversationUpdate, Message,
};
use switchboard_core::{ConversationStore, SwitchboardError};

/// Delegates to an inner store, failing the next N `append_message` calls
/// before they reach it.
pub struct FlakyStore {
    inner: Arc<dyn ConversationStore>,
    failing_appends: AtomicUsize,
}

impl FlakyStore {
    pub fn new(inner: Arc<dyn ConversationStore>) -> Self {
        Self {
            inner,
            failing_appends: AtomicUsize::new(0),
        }
    }

    /// Make the next `count` message appends fail with a storage error.
    pub fn fail_next_appends(&self, count: usize) {
        self.failing_appends.store(count, Ordering::SeqCst);
    }

    fn take_failure(&self) -> bool {
        self.failing_appends
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl ConversationStore for FlakyStore {
    async fn find_open_conversation(
        &self,
        customer_address: &str,
    ) -> Result<Option<Conversation>, SwitchboardError> {
        self.inner.find_open_conversation(customer_address).await
    }

    async fn find_conversation(
        &self,
        id: &ConversationId,
    ) -> Result<Option<Conversation>, SwitchboardError> {
        self.inner.find_conversation(id).await
    }

    async fn insert_conversation(
        &self,
        conversation: &Conversation,
    ) -> Result<Conversation, SwitchboardError> {
        self.inner.insert_conversation(conversation).await
    }

    async fn update_conversation(
        &self,
        id: &ConversationId,
        update: ConversationUpdate,
    ) -> Result<Option<Conversation>, SwitchboardError> {
        self.inner.update_conversation(id, update).await
    }

    async fn assign_conversation(
        &self,
        id: &ConversationId,
        agent: &AgentId,
    ) -> Result<Option<Conversation>, SwitchboardError> {
        self.inner.assign_conversation(id, agent).await
    }

    async fn count_active_for_agent(&self, agent: &AgentId) -> Result<u64, SwitchboardError> {
        self.inner.count_active_for_agent(agent).await
    }

    async fn list_conversations(
        &self,
        filter: &ConversationFilter,
    ) -> Result<Vec<Conversation>, SwitchboardError> {
        self.inner.list_conversations(filter).await
    }

    async fn list_pending_conversations(&self) -> Result<Vec<Conversation>, SwitchboardError> {
        self.inner.list_pending_conversations().await
    }

    async fn append_message(
        &self,
        message: &Message,
        update: ConversationUpdate,
    ) -> Result<Option<Conversation>, SwitchboardError> {
        if self.take_failure() {
            return Err(SwitchboardError::Storage {
                source: "injected write failure".into(),
            });
        }
        self.inner.append_message(message, update).await
    }

    async fn find_message_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Message>, SwitchboardError> {
        self.inner.find_message_by_external_id(external_id).await
    }

    async fn find_message_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<Message>, SwitchboardError> {
        self.inner.find_message_by_idempotency_key(key).await
    }

    async fn list_messages(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<Message>, SwitchboardError> {
        self.inner.list_messages(conversation_id).await
    }
}
