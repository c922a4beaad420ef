// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection registry and non-blocking publish.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

use switchboard_config::model::FanoutConfig;
use switchboard_core::SwitchboardError;
use switchboard_core::types::AgentId;

use crate::event::{FanoutEvent, Target};

type EventSender = mpsc::Sender<Arc<FanoutEvent>>;

/// Opaque handle for one live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A registered connection and the receiving end of its event queue.
#[derive(Debug)]
pub struct Subscription {
    pub id: ConnectionId,
    pub agent_id: AgentId,
    pub receiver: mpsc::Receiver<Arc<FanoutEvent>>,
}

impl Subscription {
    /// Next event, or `None` once the hub dropped this connection.
    pub async fn recv(&mut self) -> Option<Arc<FanoutEvent>> {
        self.receiver.recv().await
    }
}

/// Per-call delivery summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Connections the event was queued on.
    pub delivered: usize,
    /// Connections whose queue was full.
    pub dropped: usize,
    /// Connections found closed and removed.
    pub pruned: usize,
}

/// Registry of agent connections, owned by the running service.
///
/// Every operation is synchronous and never awaits, so no shard lock is held
/// across a suspension point and a stuck client can never stall a publisher.
pub struct FanoutHub {
    buffer: usize,
    connections: DashMap<AgentId, HashMap<ConnectionId, EventSender>>,
    owners: DashMap<ConnectionId, AgentId>,
    next_id: AtomicU64,
    closed: AtomicBool,
}

impl FanoutHub {
    /// Creates a hub whose connection queues hold `buffer` events each.
    pub fn new(buffer: usize) -> Self {
        Self {
            buffer: buffer.max(1),
            connections: DashMap::new(),
            owners: DashMap::new(),
            next_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
        }
    }

    pub fn from_config(config: &FanoutConfig) -> Self {
        Self::new(config.connection_buffer)
    }

    /// Opens a new connection for `agent` with a queue owned by the hub.
    pub fn subscribe(&self, agent: &AgentId) -> Result<Subscription, SwitchboardError> {
        let (tx, rx) = mpsc::channel(self.buffer);
        let id = self.register(agent, tx)?;
        Ok(Subscription {
            id,
            agent_id: agent.clone(),
            receiver: rx,
        })
    }

    /// Registers a caller-built sender as a connection of `agent`.
    pub fn register(
        &self,
        agent: &AgentId,
        sender: EventSender,
    ) -> Result<ConnectionId, SwitchboardError> {
        if self.is_closed() {
            return Err(SwitchboardError::Internal(
                "fan-out hub is shut down".to_string(),
            ));
        }

        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.owners.insert(id, agent.clone());
        self.connections
            .entry(agent.clone())
            .or_default()
            .insert(id, sender);

        // shutdown() may have cleared the registry between the check and the insert
        if self.is_closed() {
            self.unsubscribe(id);
            return Err(SwitchboardError::Internal(
                "fan-out hub is shut down".to_string(),
            ));
        }

        debug!(agent_id = %agent, connection_id = %id, "connection subscribed");
        self.update_gauge();
        Ok(id)
    }

    /// Removes a connection. Unknown or already-removed ids are a no-op.
    ///
    /// Returns whether a connection was actually removed.
    pub fn unsubscribe(&self, id: ConnectionId) -> bool {
        let Some((_, agent)) = self.owners.remove(&id) else {
            return false;
        };

        let removed = self
            .connections
            .get_mut(&agent)
            .is_some_and(|mut conns| conns.remove(&id).is_some());
        self.connections.remove_if(&agent, |_, conns| conns.is_empty());

        if removed {
            debug!(agent_id = %agent, connection_id = %id, "connection unsubscribed");
            self.update_gauge();
        }
        removed
    }

    /// Queues `event` on every connection selected by `target` without waiting.
    pub fn publish(&self, event: FanoutEvent, target: &Target) -> PublishReport {
        let event = Arc::new(event);
        let mut report = PublishReport::default();
        let mut closed = Vec::new();

        match target {
            Target::Agent(agent) => {
                if let Some(mut conns) = self.connections.get_mut(agent) {
                    deliver(&event, &mut conns, &mut report, &mut closed);
                }
                self.connections.remove_if(agent, |_, conns| conns.is_empty());
            }
            Target::Broadcast => {
                for mut entry in self.connections.iter_mut() {
                    deliver(&event, entry.value_mut(), &mut report, &mut closed);
                }
                self.connections.retain(|_, conns| !conns.is_empty());
            }
        }

        if !closed.is_empty() {
            for id in &closed {
                self.owners.remove(id);
            }
            self.update_gauge();
        }
        if report.dropped > 0 {
            warn!(
                event_type = event.event_type(),
                dropped = report.dropped,
                "fan-out queue full, event dropped"
            );
            switchboard_prometheus::record_fanout_dropped(report.dropped as u64);
        }
        debug!(
            event_type = event.event_type(),
            delivered = report.delivered,
            pruned = report.pruned,
            "fan-out event published"
        );
        report
    }

    /// Total live connections across all agents.
    pub fn connection_count(&self) -> usize {
        self.owners.len()
    }

    pub fn agent_connection_count(&self, agent: &AgentId) -> usize {
        self.connections.get(agent).map_or(0, |conns| conns.len())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Drops every connection and refuses new ones.
    ///
    /// Receivers observe the end of their stream once queued events are drained.
    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let count = self.owners.len();
        self.connections.clear();
        self.owners.clear();
        self.update_gauge();
        info!(connections = count, "fan-out hub shut down");
    }

    fn update_gauge(&self) {
        switchboard_prometheus::set_live_connections(self.owners.len());
    }
}

impl Default for FanoutHub {
    fn default() -> Self {
        Self::from_config(&FanoutConfig::default())
    }
}

fn deliver(
    event: &Arc<FanoutEvent>,
    conns: &mut HashMap<ConnectionId, EventSender>,
    report: &mut PublishReport,
    closed: &mut Vec<ConnectionId>,
) {
    conns.retain(|id, tx| match tx.try_send(Arc::clone(event)) {
        Ok(()) => {
            report.delivered += 1;
            true
        }
        Err(TrySendError::Full(_)) => {
            report.dropped += 1;
            true
        }
        Err(TrySendError::Closed(_)) => {
            report.pruned += 1;
            closed.push(*id);
            false
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use switchboard_core::types::{AgentStatus, Conversation, now};

    fn presence(agent: &str) -> FanoutEvent {
        FanoutEvent::AgentPresence {
            agent_id: AgentId::from(agent),
            status: AgentStatus::Online,
        }
    }

    fn agent(id: &str) -> AgentId {
        AgentId::from(id)
    }

    #[tokio::test]
    async fn delivers_to_every_connection_of_target_agent() {
        let hub = FanoutHub::new(8);
        let mut first = hub.subscribe(&agent("a")).unwrap();
        let mut second = hub.subscribe(&agent("a")).unwrap();
        let mut other = hub.subscribe(&agent("b")).unwrap();

        let report = hub.publish(presence("x"), &Target::Agent(agent("a")));
        assert_eq!(report.delivered, 2);

        assert_eq!(first.recv().await.unwrap().event_type(), "agent_presence");
        assert_eq!(second.recv().await.unwrap().event_type(), "agent_presence");
        assert!(other.receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn broadcast_reaches_all_agents() {
        let hub = FanoutHub::new(8);
        let mut a = hub.subscribe(&agent("a")).unwrap();
        let mut b = hub.subscribe(&agent("b")).unwrap();

        let report = hub.publish(presence("a"), &Target::Broadcast);
        assert_eq!(report.delivered, 2);
        assert!(a.recv().await.is_some());
        assert!(b.recv().await.is_some());
    }

    #[tokio::test]
    async fn publish_to_agent_without_connections_is_empty() {
        let hub = FanoutHub::new(8);
        let report = hub.publish(presence("a"), &Target::Agent(agent("nobody")));
        assert_eq!(report, PublishReport::default());
    }

    #[tokio::test]
    async fn full_queue_drops_without_blocking() {
        let hub = FanoutHub::new(1);
        let mut sub = hub.subscribe(&agent("a")).unwrap();

        let first = hub.publish(presence("1"), &Target::Agent(agent("a")));
        let second = tokio::time::timeout(
            Duration::from_millis(100),
            async { hub.publish(presence("2"), &Target::Agent(agent("a"))) },
        )
        .await
        .expect("publish must not block on a full queue");

        assert_eq!(first.delivered, 1);
        assert_eq!(second.dropped, 1);
        assert_eq!(second.delivered, 0);
        // the connection stays registered
        assert_eq!(hub.agent_connection_count(&agent("a")), 1);

        match sub.recv().await.unwrap().as_ref() {
            FanoutEvent::AgentPresence { agent_id, .. } => assert_eq!(agent_id.as_str(), "1"),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn closed_connections_are_pruned_on_publish() {
        let hub = FanoutHub::new(4);
        let sub = hub.subscribe(&agent("a")).unwrap();
        let _live = hub.subscribe(&agent("a")).unwrap();
        drop(sub);

        let report = hub.publish(presence("a"), &Target::Agent(agent("a")));
        assert_eq!(report.pruned, 1);
        assert_eq!(report.delivered, 1);
        assert_eq!(hub.connection_count(), 1);
    }

    #[tokio::test]
    async fn unsubscribe_is_idempotent() {
        let hub = FanoutHub::new(4);
        let sub = hub.subscribe(&agent("a")).unwrap();
        assert_eq!(hub.connection_count(), 1);

        assert!(hub.unsubscribe(sub.id));
        assert!(!hub.unsubscribe(sub.id));
        assert!(!hub.unsubscribe(ConnectionId(9_999)));
        assert_eq!(hub.connection_count(), 0);
        assert_eq!(hub.agent_connection_count(&agent("a")), 0);
    }

    #[tokio::test]
    async fn unsubscribed_connection_sees_end_of_stream() {
        let hub = FanoutHub::new(4);
        let mut sub = hub.subscribe(&agent("a")).unwrap();
        hub.unsubscribe(sub.id);
        assert!(sub.recv().await.is_none());
    }

    #[tokio::test]
    async fn per_connection_order_follows_publish_order() {
        let hub = FanoutHub::new(16);
        let mut sub = hub.subscribe(&agent("a")).unwrap();
        let conversation = Conversation::open("+1", "c", Some(agent("a")), now());

        hub.publish(
            FanoutEvent::ConversationAssigned {
                conversation: conversation.clone(),
            },
            &Target::Agent(agent("a")),
        );
        hub.publish(
            FanoutEvent::ConversationUpdated { conversation },
            &Target::Agent(agent("a")),
        );

        assert_eq!(sub.recv().await.unwrap().event_type(), "conversation_assigned");
        assert_eq!(sub.recv().await.unwrap().event_type(), "conversation_updated");
    }

    #[tokio::test]
    async fn shutdown_drops_connections_and_refuses_new_ones() {
        let hub = FanoutHub::new(4);
        let mut sub = hub.subscribe(&agent("a")).unwrap();

        hub.shutdown();
        hub.shutdown();

        assert!(hub.is_closed());
        assert!(sub.recv().await.is_none());
        assert_eq!(hub.connection_count(), 0);
        assert!(matches!(
            hub.subscribe(&agent("a")),
            Err(SwitchboardError::Internal(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_subscribe_publish_unsubscribe() {
        let hub = Arc::new(FanoutHub::new(4));
        let mut tasks = Vec::new();

        for i in 0..16 {
            let hub = Arc::clone(&hub);
            tasks.push(tokio::spawn(async move {
                let id = agent(&format!("agent-{}", i % 4));
                let sub = hub.subscribe(&id).unwrap();
                for _ in 0..10 {
                    hub.publish(presence("p"), &Target::Agent(id.clone()));
                    hub.publish(presence("p"), &Target::Broadcast);
                }
                hub.unsubscribe(sub.id);
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(hub.connection_count(), 0);
        for i in 0..4 {
            assert_eq!(hub.agent_connection_count(&agent(&format!("agent-{i}"))), 0);
        }
    }
}
