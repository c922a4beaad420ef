// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Converts raw webhook payloads into closed [`InboundEvent`] values.
//!
//! Anything that cannot be represented as text, image or audio is rejected
//! here, before it reaches the engine.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use switchboard_core::{InboundContent, InboundEvent};
use tracing::{debug, warn};

use crate::types::{BUSINESS_ACCOUNT_OBJECT, WebhookMessage, WebhookPayload};

/// A webhook message that could not be normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub external_message_id: String,
    pub reason: String,
}

/// Result of normalizing one webhook delivery.
#[derive(Debug, Default)]
pub struct NormalizedBatch {
    pub events: Vec<InboundEvent>,
    pub rejected: Vec<Rejection>,
}

/// Normalize every customer message in `payload`.
///
/// Payloads for other object types, non-`messages` changes, and changes
/// addressed to a different business number (when `phone_number_id` is set)
/// are skipped silently.
pub fn normalize_payload(payload: &WebhookPayload, phone_number_id: Option<&str>) -> NormalizedBatch {
    let mut batch = NormalizedBatch::default();

    if payload.object != BUSINESS_ACCOUNT_OBJECT {
        debug!(object = %payload.object, "ignoring webhook for unrelated object");
        return batch;
    }

    for change in payload.entry.iter().flat_map(|e| e.changes.iter()) {
        if change.field != "messages" {
            debug!(field = %change.field, "ignoring non-message webhook change");
            continue;
        }

        let value = &change.value;
        if let (Some(expected), Some(metadata)) = (phone_number_id, value.metadata.as_ref())
            && metadata.phone_number_id != expected
        {
            warn!(
                expected,
                received = %metadata.phone_number_id,
                "phone number id mismatch, skipping change"
            );
            continue;
        }

        let names: HashMap<&str, &str> = value
            .contacts
            .iter()
            .filter_map(|c| c.profile.as_ref().map(|p| (c.wa_id.as_str(), p.name.as_str())))
            .collect();

        for message in &value.messages {
            match normalize_message(message, names.get(message.from.as_str()).copied()) {
                Ok(event) => batch.events.push(event),
                Err(reason) => {
                    warn!(external_message_id = %message.id, %reason, "rejected inbound message");
                    batch.rejected.push(Rejection {
                        external_message_id: message.id.clone(),
                        reason,
                    });
                }
            }
        }
    }

    batch
}

fn normalize_message(
    message: &WebhookMessage,
    contact_name: Option<&str>,
) -> Result<InboundEvent, String> {
    let content = match message.message_type.as_str() {
        "text" => {
            let body = message
                .text
                .as_ref()
                .map(|t| t.body.clone())
                .filter(|b| !b.is_empty())
                .ok_or("text message without body")?;
            InboundContent::Text { body }
        }
        "image" => {
            let image = message.image.as_ref().ok_or("image message without media")?;
            InboundContent::Image {
                media_id: image.id.clone(),
                caption: image.caption.clone().filter(|c| !c.is_empty()),
            }
        }
        "audio" => {
            let audio = message.audio.as_ref().ok_or("audio message without media")?;
            InboundContent::Audio {
                media_id: audio.id.clone(),
            }
        }
        other => return Err(format!("unsupported message kind `{other}`")),
    };

    let external_timestamp = parse_unix_seconds(&message.timestamp)
        .ok_or_else(|| format!("unparseable timestamp `{}`", message.timestamp))?;

    let event = InboundEvent {
        external_address: message.from.clone(),
        customer_name: contact_name.map(str::to_string),
        content,
        external_timestamp,
        external_message_id: message.id.clone(),
    };
    event.validate().map_err(|e| e.to_string())?;
    Ok(event)
}

fn parse_unix_seconds(raw: &str) -> Option<DateTime<Utc>> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}
