// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the storage, conversation store and agent directory traits.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use switchboard_config::model::StorageConfig;
use switchboard_core::types::{
    Agent, AgentId, AgentStatus, Conversation, ConversationFilter, ConversationId,
    ConversationStatus, ConversationUpdate, Message,
};
use switchboard_core::{
    AdapterType, AgentDirectory, ConversationStore, HealthStatus, PluginAdapter, StorageAdapter,
    SwitchboardError,
};

use crate::database::{Database, map_tr_err};
use crate::queries;

/// SQLite-backed storage adapter.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is lazily initialized on the first
/// call to [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    ///
    /// The database connection is not opened until [`StorageAdapter::initialize`] is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Returns a reference to the underlying Database, or an error if not initialized.
    pub fn db(&self) -> Result<&Database, SwitchboardError> {
        self.db.get().ok_or_else(|| SwitchboardError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, SwitchboardError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), SwitchboardError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), SwitchboardError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| SwitchboardError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), SwitchboardError> {
        self.db()?.close().await
    }
}

#[async_trait]
impl ConversationStore for SqliteStorage {
    async fn find_open_conversation(
        &self,
        customer_address: &str,
    ) -> Result<Option<Conversation>, SwitchboardError> {
        queries::conversations::find_open_by_address(self.db()?, customer_address).await
    }

    async fn find_conversation(
        &self,
        id: &ConversationId,
    ) -> Result<Option<Conversation>, SwitchboardError> {
        queries::conversations::find_conversation(self.db()?, id).await
    }

    async fn insert_conversation(
        &self,
        conversation: &Conversation,
    ) -> Result<Conversation, SwitchboardError> {
        queries::conversations::insert_conversation(self.db()?, conversation).await
    }

    async fn update_conversation(
        &self,
        id: &ConversationId,
        update: ConversationUpdate,
    ) -> Result<Option<Conversation>, SwitchboardError> {
        queries::conversations::update_conversation(self.db()?, id, update).await
    }

    async fn assign_conversation(
        &self,
        id: &ConversationId,
        agent: &AgentId,
    ) -> Result<Option<Conversation>, SwitchboardError> {
        queries::conversations::assign_conversation(self.db()?, id, agent).await
    }

    async fn count_active_for_agent(&self, agent: &AgentId) -> Result<u64, SwitchboardError> {
        queries::conversations::count_by_agent_and_status(
            self.db()?,
            agent,
            ConversationStatus::Active,
        )
        .await
    }

    async fn list_conversations(
        &self,
        filter: &ConversationFilter,
    ) -> Result<Vec<Conversation>, SwitchboardError> {
        queries::conversations::list_conversations(self.db()?, filter).await
    }

    async fn list_pending_conversations(&self) -> Result<Vec<Conversation>, SwitchboardError> {
        queries::conversations::list_pending(self.db()?).await
    }

    async fn append_message(
        &self,
        message: &Message,
        update: ConversationUpdate,
    ) -> Result<Option<Conversation>, SwitchboardError> {
        queries::messages::append_message(self.db()?, message, update).await
    }

    async fn find_message_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Message>, SwitchboardError> {
        queries::messages::find_by_external_id(self.db()?, external_id).await
    }

    async fn find_message_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<Message>, SwitchboardError> {
        queries::messages::find_by_idempotency_key(self.db()?, key).await
    }

    async fn list_messages(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<Message>, SwitchboardError> {
        queries::messages::list_for_conversation(self.db()?, conversation_id).await
    }
}

#[async_trait]
impl AgentDirectory for SqliteStorage {
    async fn list_online_agents(&self) -> Result<Vec<Agent>, SwitchboardError> {
        queries::agents::list_agents(self.db()?, Some(AgentStatus::Online)).await
    }

    async fn list_agents(&self) -> Result<Vec<Agent>, SwitchboardError> {
        queries::agents::list_agents(self.db()?, None).await
    }

    async fn find_agent(&self, id: &AgentId) -> Result<Option<Agent>, SwitchboardError> {
        queries::agents::find_agent(self.db()?, id).await
    }

    async fn insert_agent(&self, agent: &Agent) -> Result<(), SwitchboardError> {
        queries::agents::insert_agent(self.db()?, agent).await
    }

    async fn set_agent_status(
        &self,
        id: &AgentId,
        status: AgentStatus,
    ) -> Result<Option<Agent>, SwitchboardError> {
        queries::agents::set_agent_status(self.db()?, id, status).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchboard_core::types::{MessageId, MessageKind, Sender, now};
    use tempfile::tempdir;

    fn make_config(path: &str) -> StorageConfig {
        StorageConfig {
            database_path: path.to_string(),
            wal_mode: true,
        }
    }

    #[tokio::test]
    async fn sqlite_storage_implements_plugin_adapter() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        assert_eq!(storage.name(), "sqlite");
        assert_eq!(storage.version(), semver::Version::new(0, 1, 0));
        assert_eq!(storage.adapter_type(), AdapterType::Storage);
    }

    #[tokio::test]
    async fn initialize_twice_returns_error() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("double_init.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        storage.initialize().await.unwrap();
        assert!(db_path.exists(), "database file should be created");
        assert!(storage.initialize().await.is_err());
    }

    #[tokio::test]
    async fn health_check_requires_initialize() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("health.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        assert!(storage.health_check().await.is_err());
        storage.initialize().await.unwrap();
        assert_eq!(storage.health_check().await.unwrap(), HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn conversation_lifecycle_through_traits() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("lifecycle.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));
        storage.initialize().await.unwrap();

        let agent = Agent::new("Ana", "ana@example.com", AgentStatus::Online);
        storage.insert_agent(&agent).await.unwrap();
        assert_eq!(storage.list_online_agents().await.unwrap().len(), 1);

        let conv = storage
            .insert_conversation(&Conversation::open("+1", "Cust", None, now()))
            .await
            .unwrap();
        let conv = storage
            .assign_conversation(&conv.id, &agent.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(storage.count_active_for_agent(&agent.id).await.unwrap(), 1);

        let msg = Message {
            id: MessageId::generate(),
            conversation_id: conv.id.clone(),
            content: "hello".into(),
            kind: MessageKind::Text,
            sender: Sender::Customer,
            timestamp: now(),
            media_ref: None,
            external_id: Some("wamid.1".into()),
            idempotency_key: None,
        };
        let update = ConversationUpdate::InboundMessage {
            preview: msg.preview(),
            at: msg.timestamp,
        };
        let bumped = storage
            .append_message(&msg, update.clone())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(bumped.unread_count, 1);
        assert!(storage.append_message(&msg, update).await.unwrap().is_none());
        assert_eq!(storage.list_messages(&conv.id).await.unwrap(), vec![msg]);

        storage
            .set_agent_status(&agent.id, AgentStatus::Offline)
            .await
            .unwrap();
        assert!(storage.list_online_agents().await.unwrap().is_empty());

        storage.shutdown().await.unwrap();
        storage.close().await.unwrap();
    }
}
