// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Least-loaded agent selection.
//!
//! Workload is recomputed from the conversation set on every call. Two
//! conversations created at the same instant may both see the same agent as
//! least loaded and both land on it; that imbalance is transient and accepted
//! rather than serializing all conversation creation behind one lock.

use futures::future::try_join_all;
use tracing::debug;

use switchboard_core::SwitchboardError;
use switchboard_core::types::AgentWorkload;
use switchboard_core::{AgentDirectory, ConversationStore};

/// Picks the online agent with the fewest active conversations.
///
/// Fails with [`SwitchboardError::NoAgentAvailable`] when nobody is online.
pub async fn select_agent(
    agents: &dyn AgentDirectory,
    store: &dyn ConversationStore,
) -> Result<AgentWorkload, SwitchboardError> {
    let online = agents.list_online_agents().await?;
    if online.is_empty() {
        return Err(SwitchboardError::NoAgentAvailable);
    }

    let workloads = try_join_all(online.into_iter().map(|agent| async move {
        let workload = store.count_active_for_agent(&agent.id).await?;
        Ok::<_, SwitchboardError>(AgentWorkload { agent, workload })
    }))
    .await?;

    let chosen = least_loaded(workloads).ok_or(SwitchboardError::NoAgentAvailable)?;
    debug!(
        agent_id = %chosen.agent.id,
        workload = chosen.workload,
        "selected least-loaded agent"
    );
    Ok(chosen)
}

/// Minimum workload, ties broken by ascending agent id.
pub fn least_loaded(candidates: Vec<AgentWorkload>) -> Option<AgentWorkload> {
    candidates
        .into_iter()
        .min_by(|a, b| (a.workload, &a.agent.id).cmp(&(b.workload, &b.agent.id)))
}

/// Like [`select_agent`] but maps "nobody online" to `None`.
pub async fn try_select_agent(
    agents: &dyn AgentDirectory,
    store: &dyn ConversationStore,
) -> Result<Option<AgentWorkload>, SwitchboardError> {
    match select_agent(agents, store).await {
        Ok(chosen) => Ok(Some(chosen)),
        Err(SwitchboardError::NoAgentAvailable) => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchboard_core::types::{Agent, AgentId, AgentStatus};

    fn workload(id: &str, workload: u64) -> AgentWorkload {
        let mut agent = Agent::new(id, format!("{id}@example.com"), AgentStatus::Online);
        agent.id = AgentId::from(id);
        AgentWorkload { agent, workload }
    }

    #[test]
    fn picks_minimum_workload() {
        let chosen = least_loaded(vec![workload("a", 2), workload("b", 0), workload("c", 1)]).unwrap();
        assert_eq!(chosen.agent.id.as_str(), "b");
    }

    #[test]
    fn ties_break_on_agent_id() {
        for _ in 0..10 {
            let chosen = least_loaded(vec![workload("b", 0), workload("a", 0)]).unwrap();
            assert_eq!(chosen.agent.id.as_str(), "a");
        }
        let chosen = least_loaded(vec![workload("a", 0), workload("b", 0)]).unwrap();
        assert_eq!(chosen.agent.id.as_str(), "a");
    }

    #[test]
    fn empty_candidate_set() {
        assert!(least_loaded(Vec::new()).is_none());
    }
}
