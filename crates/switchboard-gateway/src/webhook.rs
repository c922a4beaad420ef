// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp webhook endpoints.
//!
//! The channel retries deliveries that do not get a 2xx. Ingestion is
//! idempotent per message id, so storage failures answer 500 and let the
//! channel redeliver, while malformed or unauthentic bodies are refused.

use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::{debug, warn};

use switchboard_core::SwitchboardError;
use switchboard_engine::IngestOutcome;
use switchboard_whatsapp::webhook::{SIGNATURE_HEADER, verify_signature};
use switchboard_whatsapp::{VerifyParams, WebhookPayload, normalize_payload};

use crate::error::ApiError;
use crate::server::GatewayState;

/// Response body for POST /webhook/whatsapp.
#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct WebhookSummary {
    pub status: &'static str,
    pub accepted: usize,
    pub duplicates: usize,
    pub rejected: usize,
}

/// GET /webhook/whatsapp: subscription handshake.
pub async fn verify_subscription(
    State(state): State<GatewayState>,
    Query(params): Query<VerifyParams>,
) -> Response {
    match switchboard_whatsapp::webhook::verify_subscription(
        &params,
        state.webhook.verify_token.as_deref(),
    ) {
        Some(challenge) => (StatusCode::OK, challenge).into_response(),
        None => StatusCode::FORBIDDEN.into_response(),
    }
}

/// POST /webhook/whatsapp: message deliveries.
pub async fn receive(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookSummary>, Response> {
    if let Some(secret) = state.webhook.app_secret.as_deref() {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !verify_signature(&body, signature, secret) {
            warn!("webhook signature mismatch, delivery discarded");
            return Err(ApiError::Unauthorized("invalid webhook signature").into_response());
        }
    }

    let payload: WebhookPayload = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, "malformed webhook payload");
        ApiError::from(SwitchboardError::InvalidEvent(format!("malformed payload: {e}")))
            .into_response()
    })?;

    let batch = normalize_payload(&payload, state.webhook.phone_number_id.as_deref());
    let mut summary = WebhookSummary {
        status: "ok",
        rejected: batch.rejected.len(),
        ..WebhookSummary::default()
    };
    for rejection in &batch.rejected {
        switchboard_prometheus::record_inbound("rejected");
        debug!(
            external_message_id = %rejection.external_message_id,
            reason = %rejection.reason,
            "webhook message rejected"
        );
    }

    for event in batch.events {
        let external_message_id = event.external_message_id.clone();
        match state.engine.ingest(event).await {
            Ok(IngestOutcome::Accepted { .. }) => summary.accepted += 1,
            Ok(IngestOutcome::Duplicate { .. }) => summary.duplicates += 1,
            Err(SwitchboardError::InvalidEvent(reason)) => {
                warn!(%external_message_id, %reason, "inbound event rejected");
                summary.rejected += 1;
            }
            Err(e) => return Err(ApiError::from(e).into_response()),
        }
    }

    Ok(Json(summary))
}
