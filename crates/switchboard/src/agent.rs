// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `switchboard agent` operator helpers.
//!
//! `add` and `list` work on the database directly. `presence` goes through
//! the running server so pending conversations are handed out and live
//! clients see the change.

use std::io::IsTerminal;
use std::time::Duration;

use clap::{Subcommand, ValueEnum};
use serde::Deserialize;

use switchboard_config::model::SwitchboardConfig;
use switchboard_core::types::{Agent, AgentStatus, ConversationId};
use switchboard_core::{AgentDirectory, ConversationStore, StorageAdapter, SwitchboardError};
use switchboard_storage::SqliteStorage;

use crate::status::local_base_url;

#[derive(Subcommand, Debug)]
pub enum AgentCommand {
    /// Provision a new agent.
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        /// Start the agent online.
        #[arg(long)]
        online: bool,
    },
    /// List agents with their active conversation counts.
    List {
        /// Output JSON.
        #[arg(long)]
        json: bool,
    },
    /// Set an agent's presence on the running server.
    Presence {
        id: String,
        status: PresenceArg,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceArg {
    Online,
    Offline,
}

impl From<PresenceArg> for AgentStatus {
    fn from(arg: PresenceArg) -> Self {
        match arg {
            PresenceArg::Online => AgentStatus::Online,
            PresenceArg::Offline => AgentStatus::Offline,
        }
    }
}

pub async fn run_agent(
    config: &SwitchboardConfig,
    command: AgentCommand,
) -> Result<(), SwitchboardError> {
    match command {
        AgentCommand::Add {
            name,
            email,
            online,
        } => {
            let storage = open_storage(config).await?;
            let status = if online {
                AgentStatus::Online
            } else {
                AgentStatus::Offline
            };
            let agent = add_agent(&storage, &name, &email, status).await;
            storage.close().await?;
            let agent = agent?;
            println!("{}\t{}\t{}", agent.id, agent.email, agent.status);
            Ok(())
        }
        AgentCommand::List { json } => {
            let storage = open_storage(config).await?;
            let rows = agent_rows(&storage).await;
            storage.close().await?;
            print_agents(&rows?, json);
            Ok(())
        }
        AgentCommand::Presence { id, status } => {
            set_remote_presence(config, &id, status.into()).await
        }
    }
}

async fn open_storage(config: &SwitchboardConfig) -> Result<SqliteStorage, SwitchboardError> {
    let storage = SqliteStorage::new(config.storage.clone());
    storage.initialize().await?;
    Ok(storage)
}

/// Inserts a new agent. Blank fields are refused before touching storage.
pub async fn add_agent(
    directory: &dyn AgentDirectory,
    name: &str,
    email: &str,
    status: AgentStatus,
) -> Result<Agent, SwitchboardError> {
    let (name, email) = (name.trim(), email.trim());
    if name.is_empty() || email.is_empty() {
        return Err(SwitchboardError::InvalidRequest(
            "agent name and email must not be blank".into(),
        ));
    }
    let agent = Agent::new(name, email, status);
    directory.insert_agent(&agent).await?;
    Ok(agent)
}

/// One line of `agent list`.
#[derive(Debug, serde::Serialize)]
pub struct AgentRow {
    #[serde(flatten)]
    pub agent: Agent,
    pub active_conversations: u64,
}

pub async fn agent_rows(storage: &SqliteStorage) -> Result<Vec<AgentRow>, SwitchboardError> {
    let mut rows = Vec::new();
    for agent in storage.list_agents().await? {
        let active_conversations = storage.count_active_for_agent(&agent.id).await?;
        rows.push(AgentRow {
            agent,
            active_conversations,
        });
    }
    Ok(rows)
}

fn print_agents(rows: &[AgentRow], json: bool) {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(rows).unwrap_or_else(|_| "[]".to_string())
        );
        return;
    }
    if rows.is_empty() {
        println!("no agents");
        return;
    }

    let use_color = std::io::stdout().is_terminal();
    println!(
        "{:<38} {:<20} {:<28} {:<8} {:>6}",
        "ID", "NAME", "EMAIL", "STATUS", "ACTIVE"
    );
    for row in rows {
        let status = row.agent.status.to_string();
        let status = if use_color {
            use colored::Colorize;
            match row.agent.status {
                AgentStatus::Online => format!("{:<8}", status).green().to_string(),
                AgentStatus::Offline => format!("{:<8}", status).dimmed().to_string(),
            }
        } else {
            format!("{status:<8}")
        };
        println!(
            "{:<38} {:<20} {:<28} {} {:>6}",
            row.agent.id.as_str(),
            row.agent.name,
            row.agent.email,
            status,
            row.active_conversations
        );
    }
}

#[derive(Debug, Deserialize)]
struct PresenceReply {
    agent: Agent,
    assigned: Vec<ConversationId>,
}

async fn set_remote_presence(
    config: &SwitchboardConfig,
    id: &str,
    status: AgentStatus,
) -> Result<(), SwitchboardError> {
    let token = config.server.bearer_token.as_deref().ok_or_else(|| {
        SwitchboardError::Config("server.bearer_token is required to reach the agent API".into())
    })?;
    let url = format!("{}/v1/agents/{id}/presence", local_base_url(&config.server));

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .map_err(|e| SwitchboardError::Internal(format!("failed to create HTTP client: {e}")))?;

    let resp = client
        .put(&url)
        .bearer_auth(token)
        .json(&serde_json::json!({ "status": status }))
        .send()
        .await
        .map_err(|e| SwitchboardError::Internal(format!("server not reachable at {url}: {e}")))?;

    match resp.status().as_u16() {
        200 => {}
        404 => return Err(SwitchboardError::not_found("agent", id)),
        code => {
            let body = resp.text().await.unwrap_or_default();
            return Err(SwitchboardError::Internal(format!(
                "presence update failed ({code}): {body}"
            )));
        }
    }

    let reply: PresenceReply = resp
        .json()
        .await
        .map_err(|e| SwitchboardError::Internal(format!("unexpected presence reply: {e}")))?;
    println!("{} is now {}", reply.agent.id, reply.agent.status);
    if !reply.assigned.is_empty() {
        println!("assigned {} pending conversation(s):", reply.assigned.len());
        for id in reply.assigned {
            println!("  {id}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchboard_config::model::StorageConfig;

    async fn temp_storage(dir: &tempfile::TempDir) -> SqliteStorage {
        let config = StorageConfig {
            database_path: dir.path().join("agents.db").display().to_string(),
            ..StorageConfig::default()
        };
        let storage = SqliteStorage::new(config);
        storage.initialize().await.unwrap();
        storage
    }

    #[tokio::test]
    async fn add_then_list_shows_zero_workload() {
        let dir = tempfile::tempdir().unwrap();
        let storage = temp_storage(&dir).await;

        let agent = add_agent(&storage, " Ana ", "ana@example.com", AgentStatus::Online)
            .await
            .unwrap();
        assert_eq!(agent.name, "Ana");

        let rows = agent_rows(&storage).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].agent.id, agent.id);
        assert_eq!(rows[0].active_conversations, 0);
    }

    #[tokio::test]
    async fn blank_fields_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        let storage = temp_storage(&dir).await;

        let err = add_agent(&storage, "  ", "x@example.com", AgentStatus::Offline)
            .await
            .unwrap_err();
        assert!(matches!(err, SwitchboardError::InvalidRequest(_)));
        assert!(agent_rows(&storage).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_email_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let storage = temp_storage(&dir).await;

        add_agent(&storage, "Ana", "ana@example.com", AgentStatus::Online)
            .await
            .unwrap();
        let err = add_agent(&storage, "Ana Two", "ana@example.com", AgentStatus::Online)
            .await
            .unwrap_err();
        assert!(matches!(err, SwitchboardError::InvalidRequest(_)));
    }

    #[test]
    fn presence_arg_maps_to_status() {
        assert_eq!(AgentStatus::from(PresenceArg::Online), AgentStatus::Online);
        assert_eq!(AgentStatus::from(PresenceArg::Offline), AgentStatus::Offline);
    }

    #[test]
    fn agent_row_flattens_agent() {
        let row = AgentRow {
            agent: Agent::new("Bo", "bo@example.com", AgentStatus::Offline),
            active_conversations: 3,
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["name"], "Bo");
        assert_eq!(json["status"], "offline");
        assert_eq!(json["active_conversations"], 3);
    }
}
