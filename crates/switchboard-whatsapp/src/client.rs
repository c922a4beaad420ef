// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the WhatsApp Cloud API send endpoint.
//!
//! Provides [`WhatsAppClient`], the production [`ChannelGateway`]. Sends are
//! not retried here: a failed send is reported to the caller, which decides
//! whether to resubmit with the same client token.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use switchboard_config::model::WhatsAppConfig;
use switchboard_core::{
    AdapterType, ChannelGateway, HealthStatus, MessageKind, OutboundDispatch, PluginAdapter,
    SwitchboardError,
};
use tracing::{debug, warn};

use crate::types::{
    ApiErrorResponse, OutboundMedia, SendMessageRequest, SendMessageResponse, TextBody,
};

/// WhatsApp Cloud API client.
#[derive(Debug, Clone)]
pub struct WhatsAppClient {
    client: reqwest::Client,
    messages_url: String,
}

impl WhatsAppClient {
    /// Creates a client from configuration.
    ///
    /// Fails with [`SwitchboardError::Config`] when the access token or
    /// phone number id is missing.
    pub fn new(config: &WhatsAppConfig) -> Result<Self, SwitchboardError> {
        let token = config
            .access_token
            .as_deref()
            .ok_or_else(|| SwitchboardError::Config("whatsapp.access_token is not set".into()))?;
        let phone_number_id = config.phone_number_id.as_deref().ok_or_else(|| {
            SwitchboardError::Config("whatsapp.phone_number_id is not set".into())
        })?;

        let mut auth = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
            SwitchboardError::Config(format!("invalid access token header value: {e}"))
        })?;
        auth.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| SwitchboardError::Gateway {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        let messages_url = format!(
            "{}/{}/{}/messages",
            config.api_base_url.trim_end_matches('/'),
            config.api_version,
            phone_number_id
        );

        Ok(Self {
            client,
            messages_url,
        })
    }

    /// The fully-qualified send endpoint.
    pub fn messages_url(&self) -> &str {
        &self.messages_url
    }
}

/// Build the Graph API request body for a dispatch.
pub fn build_request(dispatch: &OutboundDispatch) -> Result<SendMessageRequest, SwitchboardError> {
    let mut request = SendMessageRequest {
        messaging_product: "whatsapp",
        recipient_type: "individual",
        to: dispatch.to.clone(),
        message_type: "text",
        text: None,
        image: None,
        audio: None,
    };

    let media_link = || {
        dispatch.media_link.clone().ok_or_else(|| {
            SwitchboardError::InvalidRequest(format!("{} message without media link", dispatch.kind))
        })
    };

    match dispatch.kind {
        MessageKind::Text => {
            request.text = Some(TextBody {
                body: dispatch.content.clone(),
            });
        }
        MessageKind::Image => {
            request.message_type = "image";
            request.image = Some(OutboundMedia {
                link: media_link()?,
                caption: Some(dispatch.content.clone()).filter(|c| !c.is_empty()),
            });
        }
        MessageKind::Audio => {
            request.message_type = "audio";
            request.audio = Some(OutboundMedia {
                link: media_link()?,
                caption: None,
            });
        }
    }
    Ok(request)
}

#[async_trait]
impl PluginAdapter for WhatsAppClient {
    fn name(&self) -> &str {
        "whatsapp"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, SwitchboardError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), SwitchboardError> {
        Ok(())
    }
}

#[async_trait]
impl ChannelGateway for WhatsAppClient {
    async fn send(&self, dispatch: &OutboundDispatch) -> Result<String, SwitchboardError> {
        let request = build_request(dispatch)?;
        let started = Instant::now();

        let response = self
            .client
            .post(&self.messages_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| SwitchboardError::Gateway {
                message: if e.is_timeout() {
                    "WhatsApp request timed out".to_string()
                } else {
                    format!("HTTP request failed: {e}")
                },
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        debug!(status = %status, elapsed_ms = started.elapsed().as_millis() as u64, "send response received");

        let body = response.text().await.map_err(|e| SwitchboardError::Gateway {
            message: format!("failed to read response body: {e}"),
            source: Some(Box::new(e)),
        })?;

        if !status.is_success() {
            let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(api_err) => format!(
                    "WhatsApp API error ({}): {}",
                    api_err
                        .error
                        .code
                        .map(|c| c.to_string())
                        .unwrap_or_else(|| status.as_u16().to_string()),
                    api_err.error.message
                ),
                Err(_) => format!("WhatsApp API returned {status}: {body}"),
            };
            warn!(status = %status, "WhatsApp send rejected");
            return Err(SwitchboardError::gateway(message));
        }

        let parsed: SendMessageResponse =
            serde_json::from_str(&body).map_err(|e| SwitchboardError::Gateway {
                message: format!("failed to parse send response: {e}"),
                source: Some(Box::new(e)),
            })?;
        parsed
            .messages
            .into_iter()
            .next()
            .map(|m| m.id)
            .ok_or_else(|| SwitchboardError::gateway("send response carried no message id"))
    }
}
