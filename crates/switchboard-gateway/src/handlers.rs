// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the agent REST API and the public endpoints.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use switchboard_core::types::{
    Agent, AgentId, AgentStatus, Conversation, ConversationId, ConversationStatus, Message,
    MessageKind, SendRequest,
};

use crate::auth::AgentIdentity;
use crate::error::ApiError;
use crate::server::GatewayState;

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// Query string for GET /v1/conversations.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub status: Option<ConversationStatus>,
}

#[derive(Debug, Serialize)]
pub struct ConversationList {
    pub conversations: Vec<Conversation>,
}

#[derive(Debug, Serialize)]
pub struct MessageList {
    pub conversation_id: ConversationId,
    pub messages: Vec<Message>,
}

/// Request body for POST /v1/messages.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageBody {
    pub conversation_id: ConversationId,
    /// Text body, or caption for media.
    #[serde(default)]
    pub content: String,
    #[serde(default = "default_kind")]
    pub kind: MessageKind,
    #[serde(default)]
    pub media_ref: Option<String>,
    #[serde(default)]
    pub client_token: Option<String>,
}

fn default_kind() -> MessageKind {
    MessageKind::Text
}

/// Response body for POST /v1/messages.
#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    pub message: Message,
    pub conversation: Conversation,
    pub replayed: bool,
}

/// Request body for PUT /v1/agents/{id}/presence.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PresenceBody {
    pub status: AgentStatus,
}

#[derive(Debug, Serialize)]
pub struct PresenceResponse {
    pub agent: Agent,
    /// Pending conversations handed out because of this change.
    pub assigned: Vec<ConversationId>,
}

/// GET /health (unauthenticated)
pub async fn get_public_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.health.start_time.elapsed().as_secs(),
    })
}

/// GET /metrics (unauthenticated). 404 when no recorder is installed.
pub async fn get_public_metrics(State(state): State<GatewayState>) -> Response {
    match &state.health.prometheus_render {
        Some(render) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4")],
            render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// GET /v1/conversations?status=
pub async fn list_conversations(
    State(state): State<GatewayState>,
    AgentIdentity(agent): AgentIdentity,
    Query(query): Query<ListQuery>,
) -> Result<Json<ConversationList>, ApiError> {
    let conversations = state
        .engine
        .list_conversations(&agent, query.status)
        .await?;
    Ok(Json(ConversationList { conversations }))
}

/// GET /v1/conversations/{id}/messages
pub async fn get_messages(
    State(state): State<GatewayState>,
    AgentIdentity(agent): AgentIdentity,
    Path(id): Path<String>,
) -> Result<Json<MessageList>, ApiError> {
    let conversation_id = ConversationId::from(id);
    let messages = state.engine.history(&agent, &conversation_id).await?;
    Ok(Json(MessageList {
        conversation_id,
        messages,
    }))
}

/// POST /v1/conversations/{id}/resolve
pub async fn resolve_conversation(
    State(state): State<GatewayState>,
    AgentIdentity(agent): AgentIdentity,
    Path(id): Path<String>,
) -> Result<Json<Conversation>, ApiError> {
    let conversation = state
        .engine
        .resolve(&agent, &ConversationId::from(id))
        .await?;
    Ok(Json(conversation))
}

/// POST /v1/messages
///
/// 201 for a new send, 200 when the client token replayed an earlier one.
pub async fn post_messages(
    State(state): State<GatewayState>,
    AgentIdentity(agent): AgentIdentity,
    Json(body): Json<SendMessageBody>,
) -> Result<(StatusCode, Json<SendMessageResponse>), ApiError> {
    let request = SendRequest {
        conversation_id: body.conversation_id,
        agent_id: agent,
        content: body.content,
        kind: body.kind,
        media_ref: body.media_ref,
        client_token: body.client_token,
    };
    let outcome = state.engine.send(request).await?;
    let status = if outcome.replayed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((
        status,
        Json(SendMessageResponse {
            message: outcome.message,
            conversation: outcome.conversation,
            replayed: outcome.replayed,
        }),
    ))
}

/// PUT /v1/agents/{id}/presence
pub async fn put_presence(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
    Json(body): Json<PresenceBody>,
) -> Result<Json<PresenceResponse>, ApiError> {
    let change = state
        .engine
        .set_presence(&AgentId::from(id), body.status)
        .await?;
    Ok(Json(PresenceResponse {
        agent: change.agent,
        assigned: change.assigned.into_iter().map(|c| c.id).collect(),
    }))
}
