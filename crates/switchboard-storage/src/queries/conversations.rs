// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation queries.
//!
//! Every mutation is a single statement (or a single closure on the writer
//! thread), so concurrent callers never lose updates.

use rusqlite::{Connection, OptionalExtension, params};
use switchboard_core::SwitchboardError;
use switchboard_core::types::{
    AgentId, Conversation, ConversationFilter, ConversationId, ConversationStatus,
    ConversationUpdate, now,
};

use crate::database::{Database, map_tr_err};
use crate::models::{CONVERSATION_COLUMNS, conversation_from_row, format_timestamp};

fn select_by_id(conn: &Connection, id: &str) -> rusqlite::Result<Option<Conversation>> {
    conn.query_row(
        &format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = ?1"),
        params![id],
        conversation_from_row,
    )
    .optional()
}

fn select_open_by_address(
    conn: &Connection,
    address: &str,
) -> rusqlite::Result<Option<Conversation>> {
    conn.query_row(
        &format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations
             WHERE customer_address = ?1 AND status != 'resolved'"
        ),
        params![address],
        conversation_from_row,
    )
    .optional()
}

/// Find the open (non-resolved) conversation for a customer address.
pub async fn find_open_by_address(
    db: &Database,
    address: &str,
) -> Result<Option<Conversation>, SwitchboardError> {
    let address = address.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Conversation>, rusqlite::Error> {
            select_open_by_address(conn, &address)
        })
        .await
        .map_err(map_tr_err)
}

/// Get a conversation by id.
pub async fn find_conversation(
    db: &Database,
    id: &ConversationId,
) -> Result<Option<Conversation>, SwitchboardError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Conversation>, rusqlite::Error> {
            select_by_id(conn, &id)
        })
        .await
        .map_err(map_tr_err)
}

/// Insert a conversation, or return the open conversation already held by
/// the same customer address.
pub async fn insert_conversation(
    db: &Database,
    conversation: &Conversation,
) -> Result<Conversation, SwitchboardError> {
    let conv = conversation.clone();
    db.connection()
        .call(move |conn| -> Result<Conversation, rusqlite::Error> {
            let inserted = conn.execute(
                "INSERT INTO conversations (id, customer_address, customer_name, assigned_agent,
                     status, last_message, last_message_at, unread_count, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                 ON CONFLICT DO NOTHING",
                params![
                    conv.id.as_str(),
                    conv.customer_address,
                    conv.customer_name,
                    conv.assigned_agent.as_ref().map(|a| a.as_str()),
                    conv.status.to_string(),
                    conv.last_message,
                    format_timestamp(&conv.last_message_at),
                    conv.unread_count,
                    format_timestamp(&conv.created_at),
                    format_timestamp(&conv.updated_at),
                ],
            )?;
            if inserted == 1 {
                return Ok(conv);
            }
            select_open_by_address(conn, &conv.customer_address)?
                .ok_or(rusqlite::Error::QueryReturnedNoRows)
        })
        .await
        .map_err(map_tr_err)
}

/// Apply one update on `conn`. Returns the updated record, or `None` if the id is unknown.
///
/// The preview and its timestamp only move forward: a message older than the
/// current preview still counts as unread but does not replace it.
pub(crate) fn apply_update(
    conn: &Connection,
    id: &str,
    update: ConversationUpdate,
) -> rusqlite::Result<Option<Conversation>> {
    let updated_at = format_timestamp(&now());
    let changed = match update {
        ConversationUpdate::InboundMessage { preview, at } => conn.execute(
            "UPDATE conversations SET
                 unread_count = unread_count + 1,
                 last_message = CASE WHEN ?1 >= last_message_at THEN ?2 ELSE last_message END,
                 last_message_at = MAX(last_message_at, ?1),
                 updated_at = ?3
             WHERE id = ?4",
            params![format_timestamp(&at), preview, updated_at, id],
        )?,
        ConversationUpdate::AgentReply { preview, at } => conn.execute(
            "UPDATE conversations SET
                 unread_count = 0,
                 last_message = CASE WHEN ?1 >= last_message_at THEN ?2 ELSE last_message END,
                 last_message_at = MAX(last_message_at, ?1),
                 updated_at = ?3
             WHERE id = ?4",
            params![format_timestamp(&at), preview, updated_at, id],
        )?,
        ConversationUpdate::Status(status) => conn.execute(
            "UPDATE conversations SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status.to_string(), updated_at, id],
        )?,
    };
    if changed == 0 {
        return Ok(None);
    }
    select_by_id(conn, id)
}

/// Apply one atomic update. Returns the updated record, or `None` if the id is unknown.
pub async fn update_conversation(
    db: &Database,
    id: &ConversationId,
    update: ConversationUpdate,
) -> Result<Option<Conversation>, SwitchboardError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Conversation>, rusqlite::Error> {
            apply_update(conn, &id, update)
        })
        .await
        .map_err(map_tr_err)
}

/// Compare-and-swap assignment: only a pending conversation with no agent is
/// bound to `agent` and becomes active. Returns `None` when the swap lost.
pub async fn assign_conversation(
    db: &Database,
    id: &ConversationId,
    agent: &AgentId,
) -> Result<Option<Conversation>, SwitchboardError> {
    let id = id.to_string();
    let agent = agent.to_string();
    let updated_at = format_timestamp(&now());
    db.connection()
        .call(move |conn| -> Result<Option<Conversation>, rusqlite::Error> {
            let changed = conn.execute(
                "UPDATE conversations SET assigned_agent = ?1, status = 'active', updated_at = ?2
                 WHERE id = ?3 AND status = 'pending' AND assigned_agent IS NULL",
                params![agent, updated_at, id],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            select_by_id(conn, &id)
        })
        .await
        .map_err(map_tr_err)
}

/// Count conversations assigned to an agent in the given status.
pub async fn count_by_agent_and_status(
    db: &Database,
    agent: &AgentId,
    status: ConversationStatus,
) -> Result<u64, SwitchboardError> {
    let agent = agent.to_string();
    db.connection()
        .call(move |conn| -> Result<u64, rusqlite::Error> {
            conn.query_row(
                "SELECT COUNT(*) FROM conversations WHERE assigned_agent = ?1 AND status = ?2",
                params![agent, status.to_string()],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}

/// List conversations matching the filter, most recent activity first.
pub async fn list_conversations(
    db: &Database,
    filter: &ConversationFilter,
) -> Result<Vec<Conversation>, SwitchboardError> {
    let agent = filter.agent.as_ref().map(|a| a.to_string());
    let status = filter.status.map(|s| s.to_string());
    db.connection()
        .call(move |conn| -> Result<Vec<Conversation>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CONVERSATION_COLUMNS} FROM conversations
                 WHERE (?1 IS NULL OR assigned_agent = ?1)
                   AND (?2 IS NULL OR status = ?2)
                 ORDER BY last_message_at DESC, id ASC"
            ))?;
            let rows = stmt.query_map(params![agent, status], conversation_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Pending conversations, oldest activity first.
pub async fn list_pending(db: &Database) -> Result<Vec<Conversation>, SwitchboardError> {
    db.connection()
        .call(move |conn| -> Result<Vec<Conversation>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CONVERSATION_COLUMNS} FROM conversations
                 WHERE status = 'pending'
                 ORDER BY last_message_at ASC, created_at ASC, id ASC"
            ))?;
            let rows = stmt.query_map([], conversation_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::agents::insert_agent;
    use chrono::{Duration, TimeZone, Utc};
    use switchboard_core::types::{Agent, AgentStatus};
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        for id in ["a-1", "a-2"] {
            let mut agent = Agent::new(id, format!("{id}@example.com"), AgentStatus::Online);
            agent.id = AgentId::from(id);
            insert_agent(&db, &agent).await.unwrap();
        }
        (db, dir)
    }

    fn t(secs: i64) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap() + Duration::seconds(secs)
    }

    #[tokio::test]
    async fn insert_then_find_open_by_address() {
        let (db, _dir) = setup_db().await;
        let conv = Conversation::open("+100", "Ann", Some(AgentId::from("a-1")), t(0));
        let stored = insert_conversation(&db, &conv).await.unwrap();
        assert_eq!(stored.id, conv.id);

        let found = find_open_by_address(&db, "+100").await.unwrap().unwrap();
        assert_eq!(found, conv);
        assert!(find_open_by_address(&db, "+999").await.unwrap().is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn second_open_conversation_for_address_returns_existing() {
        let (db, _dir) = setup_db().await;
        let first = Conversation::open("+100", "Ann", Some(AgentId::from("a-1")), t(0));
        insert_conversation(&db, &first).await.unwrap();

        let second = Conversation::open("+100", "Ann", Some(AgentId::from("a-2")), t(1));
        let stored = insert_conversation(&db, &second).await.unwrap();
        assert_eq!(stored.id, first.id);
        assert_eq!(stored.assigned_agent, Some(AgentId::from("a-1")));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn resolved_conversation_frees_the_address() {
        let (db, _dir) = setup_db().await;
        let first = Conversation::open("+100", "Ann", Some(AgentId::from("a-1")), t(0));
        insert_conversation(&db, &first).await.unwrap();
        update_conversation(&db, &first.id, ConversationUpdate::Status(ConversationStatus::Resolved))
            .await
            .unwrap();

        let second = Conversation::open("+100", "Ann", Some(AgentId::from("a-2")), t(5));
        let stored = insert_conversation(&db, &second).await.unwrap();
        assert_eq!(stored.id, second.id);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn inbound_updates_increment_and_keep_newest_preview() {
        let (db, _dir) = setup_db().await;
        let conv = Conversation::open("+100", "Ann", Some(AgentId::from("a-1")), t(0));
        insert_conversation(&db, &conv).await.unwrap();

        let inbound = |preview: &str, at| ConversationUpdate::InboundMessage {
            preview: preview.to_string(),
            at,
        };
        update_conversation(&db, &conv.id, inbound("first", t(0))).await.unwrap();
        update_conversation(&db, &conv.id, inbound("third", t(20))).await.unwrap();
        let after = update_conversation(&db, &conv.id, inbound("second (late)", t(10)))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(after.unread_count, 3);
        assert_eq!(after.last_message, "third");
        assert_eq!(after.last_message_at, t(20));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn agent_reply_resets_unread() {
        let (db, _dir) = setup_db().await;
        let conv = Conversation::open("+100", "Ann", Some(AgentId::from("a-1")), t(0));
        insert_conversation(&db, &conv).await.unwrap();
        update_conversation(
            &db,
            &conv.id,
            ConversationUpdate::InboundMessage {
                preview: "hi".into(),
                at: t(1),
            },
        )
        .await
        .unwrap();

        let after = update_conversation(
            &db,
            &conv.id,
            ConversationUpdate::AgentReply {
                preview: "hello!".into(),
                at: t(2),
            },
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(after.unread_count, 0);
        assert_eq!(after.last_message, "hello!");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn update_unknown_conversation_returns_none() {
        let (db, _dir) = setup_db().await;
        let result = update_conversation(
            &db,
            &ConversationId::from("missing"),
            ConversationUpdate::Status(ConversationStatus::Resolved),
        )
        .await
        .unwrap();
        assert!(result.is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_inbound_updates_are_not_lost() {
        let (db, _dir) = setup_db().await;
        let conv = Conversation::open("+100", "Ann", Some(AgentId::from("a-1")), t(0));
        insert_conversation(&db, &conv).await.unwrap();

        let updates = (0..25).map(|i| {
            let db = db.clone();
            let id = conv.id.clone();
            async move {
                update_conversation(
                    &db,
                    &id,
                    ConversationUpdate::InboundMessage {
                        preview: format!("m{i}"),
                        at: t(i),
                    },
                )
                .await
            }
        });
        futures::future::try_join_all(updates).await.unwrap();

        let after = find_conversation(&db, &conv.id).await.unwrap().unwrap();
        assert_eq!(after.unread_count, 25);
        assert_eq!(after.last_message, "m24");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn assignment_is_compare_and_swap() {
        let (db, _dir) = setup_db().await;
        let conv = Conversation::open("+100", "Ann", None, t(0));
        insert_conversation(&db, &conv).await.unwrap();

        let won = assign_conversation(&db, &conv.id, &AgentId::from("a-1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(won.status, ConversationStatus::Active);
        assert_eq!(won.assigned_agent, Some(AgentId::from("a-1")));

        let lost = assign_conversation(&db, &conv.id, &AgentId::from("a-2"))
            .await
            .unwrap();
        assert!(lost.is_none());
        let still = find_conversation(&db, &conv.id).await.unwrap().unwrap();
        assert_eq!(still.assigned_agent, Some(AgentId::from("a-1")));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn active_without_agent_violates_schema() {
        let (db, _dir) = setup_db().await;
        let conv = Conversation::open("+100", "Ann", None, t(0));
        insert_conversation(&db, &conv).await.unwrap();
        let result = update_conversation(
            &db,
            &conv.id,
            ConversationUpdate::Status(ConversationStatus::Active),
        )
        .await;
        assert!(matches!(result, Err(SwitchboardError::Storage { .. })));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn counts_and_listing() {
        let (db, _dir) = setup_db().await;
        let a1 = AgentId::from("a-1");
        let c1 = Conversation::open("+1", "One", Some(a1.clone()), t(10));
        let c2 = Conversation::open("+2", "Two", Some(a1.clone()), t(30));
        let c3 = Conversation::open("+3", "Three", Some(AgentId::from("a-2")), t(20));
        let c4 = Conversation::open("+4", "Four", None, t(5));
        for c in [&c1, &c2, &c3, &c4] {
            insert_conversation(&db, c).await.unwrap();
        }
        update_conversation(&db, &c1.id, ConversationUpdate::Status(ConversationStatus::Resolved))
            .await
            .unwrap();

        let active = count_by_agent_and_status(&db, &a1, ConversationStatus::Active)
            .await
            .unwrap();
        assert_eq!(active, 1);

        let mine = list_conversations(
            &db,
            &ConversationFilter {
                agent: Some(a1.clone()),
                status: None,
            },
        )
        .await
        .unwrap();
        let ids: Vec<_> = mine.iter().map(|c| c.id.clone()).collect();
        assert_eq!(ids, vec![c2.id.clone(), c1.id.clone()]);

        let pending = list_pending(&db).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, c4.id);

        let all = list_conversations(&db, &ConversationFilter::default()).await.unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(all[0].id, c2.id);
        db.close().await.unwrap();
    }
}
