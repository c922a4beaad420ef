// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket endpoint for live agent events.
//!
//! `GET /ws?agent_id=<id>&token=<bearer>` upgrades to a socket that receives
//! every fan-out event for that agent as a JSON text frame:
//!
//! ```json
//! {"type": "new_message", "conversation": {...}, "message": {...}}
//! {"type": "conversation_assigned", "conversation": {...}}
//! {"type": "agent_presence", "agent_id": "...", "status": "online"}
//! ```
//!
//! Client frames are ignored apart from close. Missed events are not
//! replayed; clients re-fetch over the REST API after reconnecting.

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade, rejection::WebSocketUpgradeRejection},
    },
    response::{IntoResponse, Response},
};
use futures::{Sink, SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, warn};

use switchboard_bus::Subscription;
use switchboard_core::types::AgentId;
use switchboard_core::SwitchboardError;

use crate::error::ApiError;
use crate::server::GatewayState;

/// Handshake query parameters.
#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub agent_id: String,
    #[serde(default)]
    pub token: Option<String>,
}

/// WebSocket upgrade handler.
///
/// Authenticates and resolves the agent before upgrading.
pub async fn ws_handler(
    State(state): State<GatewayState>,
    Query(params): Query<WsParams>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    if !state.auth.accepts(params.token.as_deref()) {
        return ApiError::Unauthorized("invalid token").into_response();
    }

    let agent_id = AgentId::from(params.agent_id);
    match state.engine.agents().find_agent(&agent_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return ApiError::from(SwitchboardError::not_found("agent", agent_id.as_str()))
                .into_response();
        }
        Err(e) => return ApiError::from(e).into_response(),
    }

    let ws = match upgrade {
        Ok(ws) => ws,
        Err(rejection) => return rejection.into_response(),
    };

    let subscription = match state.engine.hub().subscribe(&agent_id) {
        Ok(sub) => sub,
        Err(e) => return ApiError::from(e).into_response(),
    };

    ws.on_upgrade(move |socket| handle_socket(socket, state, subscription))
}

/// Runs one connection until either side goes away, then unsubscribes.
async fn handle_socket(socket: WebSocket, state: GatewayState, subscription: Subscription) {
    let (ws_sender, mut ws_receiver) = socket.split();
    let connection_id = subscription.id;
    let agent_id = subscription.agent_id.clone();
    debug!(%agent_id, %connection_id, "websocket connected");

    let mut sender_task = tokio::spawn(pump_events(subscription, ws_sender));

    loop {
        tokio::select! {
            _ = &mut sender_task => break,
            frame = ws_receiver.next() => match frame {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            },
        }
    }

    state.engine.hub().unsubscribe(connection_id);
    sender_task.abort();
    debug!(%agent_id, %connection_id, "websocket disconnected");
}

/// Forwards hub events to `sink` as JSON text frames.
///
/// Ends when the hub drops the subscription or the sink fails.
pub async fn pump_events<S>(mut subscription: Subscription, mut sink: S)
where
    S: Sink<Message> + Unpin,
{
    while let Some(event) = subscription.recv().await {
        let text = match event.to_json() {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "failed to serialize fan-out event");
                continue;
            }
        };
        if sink.send(Message::Text(text.into())).await.is_err() {
            break;
        }
    }
    let _ = sink.close().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchboard_bus::{FanoutEvent, FanoutHub, Target};
    use switchboard_core::types::AgentStatus;

    #[test]
    fn ws_params_deserialize() {
        let params: WsParams = serde_json::from_str(r#"{"agent_id": "a-1", "token": "t"}"#).unwrap();
        assert_eq!(params.agent_id, "a-1");
        assert_eq!(params.token.as_deref(), Some("t"));
    }

    #[tokio::test]
    async fn pump_forwards_events_as_json_and_stops_on_shutdown() {
        let hub = FanoutHub::new(8);
        let agent = AgentId::from("a-1");
        let sub = hub.subscribe(&agent).unwrap();
        let (tx, mut rx) = futures::channel::mpsc::unbounded::<Message>();

        let pump = tokio::spawn(pump_events(sub, tx));
        hub.publish(
            FanoutEvent::AgentPresence {
                agent_id: agent.clone(),
                status: AgentStatus::Offline,
            },
            &Target::Agent(agent.clone()),
        );

        let frame = rx.next().await.unwrap();
        let Message::Text(text) = frame else {
            panic!("expected text frame");
        };
        let json: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
        assert_eq!(json["type"], "agent_presence");
        assert_eq!(json["status"], "offline");

        hub.shutdown();
        pump.await.unwrap();
        assert!(rx.next().await.is_none());
    }
}
