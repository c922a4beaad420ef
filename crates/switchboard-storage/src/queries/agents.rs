// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Agent directory queries.

use rusqlite::{OptionalExtension, params};
use switchboard_core::SwitchboardError;
use switchboard_core::types::{Agent, AgentId, AgentStatus};

use crate::database::{Database, is_constraint_violation, map_tr_err};
use crate::models::{AGENT_COLUMNS, agent_from_row, format_timestamp};

/// Insert a new agent. Fails with `InvalidRequest` if the email is already registered.
pub async fn insert_agent(db: &Database, agent: &Agent) -> Result<(), SwitchboardError> {
    let agent = agent.clone();
    let email = agent.email.clone();
    let inserted = db
        .connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let result = conn.execute(
                "INSERT INTO agents (id, name, email, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    agent.id.as_str(),
                    agent.name,
                    agent.email,
                    agent.status.to_string(),
                    format_timestamp(&agent.created_at),
                    format_timestamp(&agent.updated_at),
                ],
            );
            match result {
                Ok(_) => Ok(true),
                Err(e) if is_constraint_violation(&e) => Ok(false),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)?;

    if inserted {
        Ok(())
    } else {
        Err(SwitchboardError::InvalidRequest(format!(
            "an agent with email {email} already exists"
        )))
    }
}

/// Get an agent by id.
pub async fn find_agent(db: &Database, id: &AgentId) -> Result<Option<Agent>, SwitchboardError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Agent>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {AGENT_COLUMNS} FROM agents WHERE id = ?1"),
                params![id],
                agent_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// List agents, optionally restricted to one presence status, ordered by id.
pub async fn list_agents(
    db: &Database,
    status: Option<AgentStatus>,
) -> Result<Vec<Agent>, SwitchboardError> {
    let status = status.map(|s| s.to_string());
    db.connection()
        .call(move |conn| -> Result<Vec<Agent>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {AGENT_COLUMNS} FROM agents
                 WHERE (?1 IS NULL OR status = ?1)
                 ORDER BY id ASC"
            ))?;
            let rows = stmt.query_map(params![status], agent_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Update an agent's presence. Returns `None` for an unknown agent.
pub async fn set_agent_status(
    db: &Database,
    id: &AgentId,
    status: AgentStatus,
) -> Result<Option<Agent>, SwitchboardError> {
    let id = id.to_string();
    let now = format_timestamp(&switchboard_core::types::now());
    db.connection()
        .call(move |conn| -> Result<Option<Agent>, rusqlite::Error> {
            let changed = conn.execute(
                "UPDATE agents SET status = ?1, updated_at = ?2 WHERE id = ?3",
                params![status.to_string(), now, id],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            conn.query_row(
                &format!("SELECT {AGENT_COLUMNS} FROM agents WHERE id = ?1"),
                params![id],
                agent_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn agent(id: &str, status: AgentStatus) -> Agent {
        let mut a = Agent::new(format!("Agent {id}"), format!("{id}@example.com"), status);
        a.id = AgentId::from(id);
        a
    }

    #[tokio::test]
    async fn insert_and_find_agent() {
        let (db, _dir) = setup_db().await;
        let a = agent("a-1", AgentStatus::Online);
        insert_agent(&db, &a).await.unwrap();

        let found = find_agent(&db, &a.id).await.unwrap().unwrap();
        assert_eq!(found, a);
        assert!(find_agent(&db, &AgentId::from("missing")).await.unwrap().is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_email_is_invalid_request() {
        let (db, _dir) = setup_db().await;
        insert_agent(&db, &agent("a-1", AgentStatus::Online)).await.unwrap();

        let mut dup = agent("a-2", AgentStatus::Online);
        dup.email = "a-1@example.com".into();
        let err = insert_agent(&db, &dup).await.unwrap_err();
        assert!(matches!(err, SwitchboardError::InvalidRequest(_)));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn list_filters_by_status() {
        let (db, _dir) = setup_db().await;
        insert_agent(&db, &agent("a-2", AgentStatus::Online)).await.unwrap();
        insert_agent(&db, &agent("a-1", AgentStatus::Online)).await.unwrap();
        insert_agent(&db, &agent("a-3", AgentStatus::Offline)).await.unwrap();

        let online = list_agents(&db, Some(AgentStatus::Online)).await.unwrap();
        let ids: Vec<_> = online.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["a-1", "a-2"]);

        let all = list_agents(&db, None).await.unwrap();
        assert_eq!(all.len(), 3);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn set_status_updates_presence() {
        let (db, _dir) = setup_db().await;
        let a = agent("a-1", AgentStatus::Offline);
        insert_agent(&db, &a).await.unwrap();

        let updated = set_agent_status(&db, &a.id, AgentStatus::Online)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, AgentStatus::Online);

        let missing = set_agent_status(&db, &AgentId::from("nope"), AgentStatus::Online)
            .await
            .unwrap();
        assert!(missing.is_none());
        db.close().await.unwrap();
    }
}
