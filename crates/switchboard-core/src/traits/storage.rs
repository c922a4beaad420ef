// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage traits: backend lifecycle, the conversation store and the agent directory.

use async_trait::async_trait;

use crate::error::SwitchboardError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    Agent, AgentId, AgentStatus, Conversation, ConversationFilter, ConversationId,
    ConversationUpdate, Message,
};

/// Adapter for storage and persistence backends.
///
/// Storage adapters manage the lifecycle of database connections
/// and provide the foundation for the conversation store and agent directory.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (migrations, connection, etc.).
    async fn initialize(&self) -> Result<(), SwitchboardError>;

    /// Closes the storage backend, flushing pending writes and releasing connections.
    async fn close(&self) -> Result<(), SwitchboardError>;
}

/// Durable conversation and message persistence.
///
/// Every mutating method is atomic with respect to concurrent callers.
#[async_trait]
pub trait ConversationStore: Send + Sync + 'static {
    /// Finds the non-resolved conversation for a customer address, if any.
    async fn find_open_conversation(
        &self,
        customer_address: &str,
    ) -> Result<Option<Conversation>, SwitchboardError>;

    async fn find_conversation(
        &self,
        id: &ConversationId,
    ) -> Result<Option<Conversation>, SwitchboardError>;

    /// Inserts a new conversation.
    ///
    /// If another open conversation already exists for the same customer
    /// address, nothing is written and the existing record is returned.
    async fn insert_conversation(
        &self,
        conversation: &Conversation,
    ) -> Result<Conversation, SwitchboardError>;

    /// Applies an atomic update and returns the new record, or `None` if it does not exist.
    async fn update_conversation(
        &self,
        id: &ConversationId,
        update: ConversationUpdate,
    ) -> Result<Option<Conversation>, SwitchboardError>;

    /// Assigns a pending, unassigned conversation to `agent` and marks it active.
    ///
    /// Returns `None` when the conversation was not pending (someone else won).
    async fn assign_conversation(
        &self,
        id: &ConversationId,
        agent: &AgentId,
    ) -> Result<Option<Conversation>, SwitchboardError>;

    /// Number of `active` conversations assigned to `agent`.
    async fn count_active_for_agent(&self, agent: &AgentId) -> Result<u64, SwitchboardError>;

    /// Lists conversations matching `filter`, most recent activity first.
    async fn list_conversations(
        &self,
        filter: &ConversationFilter,
    ) -> Result<Vec<Conversation>, SwitchboardError>;

    /// Lists pending conversations, oldest first.
    async fn list_pending_conversations(&self) -> Result<Vec<Conversation>, SwitchboardError>;

    /// Stores `message` and applies `update` to its conversation as one
    /// transaction, returning the updated conversation.
    ///
    /// Returns `None` and writes nothing when the message's external id or
    /// idempotency key is already stored. On error neither write is kept.
    async fn append_message(
        &self,
        message: &Message,
        update: ConversationUpdate,
    ) -> Result<Option<Conversation>, SwitchboardError>;

    async fn find_message_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Message>, SwitchboardError>;

    async fn find_message_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<Message>, SwitchboardError>;

    /// Messages of a conversation ordered by timestamp, then insertion order.
    async fn list_messages(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<Message>, SwitchboardError>;
}

/// Registry of agents and their presence.
#[async_trait]
pub trait AgentDirectory: Send + Sync + 'static {
    async fn list_online_agents(&self) -> Result<Vec<Agent>, SwitchboardError>;

    async fn list_agents(&self) -> Result<Vec<Agent>, SwitchboardError>;

    async fn find_agent(&self, id: &AgentId) -> Result<Option<Agent>, SwitchboardError>;

    async fn insert_agent(&self, agent: &Agent) -> Result<(), SwitchboardError>;

    /// Updates presence and returns the updated record, or `None` for an unknown agent.
    async fn set_agent_status(
        &self,
        id: &AgentId,
        status: AgentStatus,
    ) -> Result<Option<Agent>, SwitchboardError>;
}
