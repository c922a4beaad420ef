// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row decoding and column encoding for storage entities.
//!
//! The canonical types live in `switchboard-core::types`; this module maps
//! them to and from SQLite rows.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::Row;
use rusqlite::types::Type;

use switchboard_core::types::{Agent, AgentId, Conversation, ConversationId, Message, MessageId};

/// Column list matching [`agent_from_row`].
pub(crate) const AGENT_COLUMNS: &str = "id, name, email, status, created_at, updated_at";

/// Column list matching [`conversation_from_row`].
pub(crate) const CONVERSATION_COLUMNS: &str = "id, customer_address, customer_name, assigned_agent, status, \
     last_message, last_message_at, unread_count, created_at, updated_at";

/// Column list matching [`message_from_row`].
pub(crate) const MESSAGE_COLUMNS: &str = "id, conversation_id, content, kind, sender, timestamp, \
     media_ref, external_id, idempotency_key";

/// Fixed-width millisecond RFC 3339 so text order equals time order.
pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

fn timestamp_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn enum_at<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn agent_from_row(row: &Row<'_>) -> rusqlite::Result<Agent> {
    Ok(Agent {
        id: AgentId(row.get(0)?),
        name: row.get(1)?,
        email: row.get(2)?,
        status: enum_at(row, 3)?,
        created_at: timestamp_at(row, 4)?,
        updated_at: timestamp_at(row, 5)?,
    })
}

pub(crate) fn conversation_from_row(row: &Row<'_>) -> rusqlite::Result<Conversation> {
    Ok(Conversation {
        id: ConversationId(row.get(0)?),
        customer_address: row.get(1)?,
        customer_name: row.get(2)?,
        assigned_agent: row.get::<_, Option<String>>(3)?.map(AgentId),
        status: enum_at(row, 4)?,
        last_message: row.get(5)?,
        last_message_at: timestamp_at(row, 6)?,
        unread_count: row.get(7)?,
        created_at: timestamp_at(row, 8)?,
        updated_at: timestamp_at(row, 9)?,
    })
}

pub(crate) fn message_from_row(row: &Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        id: MessageId(row.get(0)?),
        conversation_id: ConversationId(row.get(1)?),
        content: row.get(2)?,
        kind: enum_at(row, 3)?,
        sender: enum_at(row, 4)?,
        timestamp: timestamp_at(row, 5)?,
        media_ref: row.get(6)?,
        external_id: row.get(7)?,
        idempotency_key: row.get(8)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamps_are_fixed_width() {
        let a = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let b = a + chrono::Duration::milliseconds(7);
        assert_eq!(format_timestamp(&a), "2026-01-02T03:04:05.000Z");
        assert_eq!(format_timestamp(&b), "2026-01-02T03:04:05.007Z");
        assert!(format_timestamp(&a) < format_timestamp(&b));
    }
}
