// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message queries.

use rusqlite::{Connection, OptionalExtension, params};
use switchboard_core::SwitchboardError;
use switchboard_core::types::{Conversation, ConversationId, ConversationUpdate, Message};

use crate::database::{Database, map_tr_err};
use crate::queries::conversations::apply_update;
use crate::models::{MESSAGE_COLUMNS, format_timestamp, message_from_row};

fn insert_row(conn: &Connection, msg: &Message) -> rusqlite::Result<bool> {
    let inserted = conn.execute(
        "INSERT INTO messages (id, conversation_id, content, kind, sender, timestamp,
             media_ref, external_id, idempotency_key)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT DO NOTHING",
        params![
            msg.id.as_str(),
            msg.conversation_id.as_str(),
            msg.content,
            msg.kind.to_string(),
            msg.sender.to_string(),
            format_timestamp(&msg.timestamp),
            msg.media_ref,
            msg.external_id,
            msg.idempotency_key,
        ],
    )?;
    Ok(inserted == 1)
}

/// Insert a message and apply `update` to its conversation in one transaction.
///
/// Returns `None` without writing when the message id, external id or
/// idempotency key is already stored. A failed update rolls the insert back,
/// so a retry of the same message is never mistaken for a duplicate.
pub async fn append_message(
    db: &Database,
    msg: &Message,
    update: ConversationUpdate,
) -> Result<Option<Conversation>, SwitchboardError> {
    let msg = msg.clone();
    db.connection()
        .call(move |conn| -> Result<Option<Conversation>, rusqlite::Error> {
            let tx = conn.transaction()?;
            if !insert_row(&tx, &msg)? {
                return Ok(None);
            }
            let conversation = apply_update(&tx, msg.conversation_id.as_str(), update)?
                .ok_or(rusqlite::Error::QueryReturnedNoRows)?;
            tx.commit()?;
            Ok(Some(conversation))
        })
        .await
        .map_err(map_tr_err)
}

async fn find_by_column(
    db: &Database,
    column: &'static str,
    value: &str,
) -> Result<Option<Message>, SwitchboardError> {
    let value = value.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Message>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE {column} = ?1"),
                params![value],
                message_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Find a message by the identifier the external channel assigned to it.
pub async fn find_by_external_id(
    db: &Database,
    external_id: &str,
) -> Result<Option<Message>, SwitchboardError> {
    find_by_column(db, "external_id", external_id).await
}

/// Find a message by its client idempotency key.
pub async fn find_by_idempotency_key(
    db: &Database,
    key: &str,
) -> Result<Option<Message>, SwitchboardError> {
    find_by_column(db, "idempotency_key", key).await
}

/// Messages of a conversation by timestamp; insertion order breaks ties.
pub async fn list_for_conversation(
    db: &Database,
    conversation_id: &ConversationId,
) -> Result<Vec<Message>, SwitchboardError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<Message>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE conversation_id = ?1
                 ORDER BY timestamp ASC, seq ASC"
            ))?;
            let rows = stmt.query_map(params![conversation_id], message_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}
