// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp client tests against a mock Graph API.

use std::time::Duration;

use serde_json::json;
use switchboard_config::model::WhatsAppConfig;
use switchboard_core::{ChannelGateway, MessageKind, OutboundDispatch, SwitchboardError};
use switchboard_whatsapp::WhatsAppClient;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer, timeout_secs: u64) -> WhatsAppClient {
    WhatsAppClient::new(&WhatsAppConfig {
        api_base_url: server.uri(),
        api_version: "v18.0".into(),
        phone_number_id: Some("pn-1".into()),
        access_token: Some("EAAG-test".into()),
        request_timeout_secs: timeout_secs,
        ..WhatsAppConfig::default()
    })
    .unwrap()
}

fn text(to: &str, body: &str) -> OutboundDispatch {
    OutboundDispatch {
        to: to.into(),
        content: body.into(),
        kind: MessageKind::Text,
        media_link: None,
    }
}

#[tokio::test]
async fn send_text_returns_external_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v18.0/pn-1/messages"))
        .and(header("authorization", "Bearer EAAG-test"))
        .and(body_partial_json(json!({
            "messaging_product": "whatsapp",
            "to": "15551234",
            "type": "text",
            "text": { "body": "hello there" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "messaging_product": "whatsapp",
            "contacts": [{ "input": "15551234", "wa_id": "15551234" }],
            "messages": [{ "id": "wamid.OUT1" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let id = client_for(&server, 5)
        .send(&text("15551234", "hello there"))
        .await
        .unwrap();
    assert_eq!(id, "wamid.OUT1");
}

#[tokio::test]
async fn send_audio_uses_link() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "type": "audio",
            "audio": { "link": "https://cdn.example/v.ogg" }
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "messages": [{ "id": "wamid.A" }] })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dispatch = OutboundDispatch {
        to: "1".into(),
        content: String::new(),
        kind: MessageKind::Audio,
        media_link: Some("https://cdn.example/v.ogg".into()),
    };
    assert_eq!(client_for(&server, 5).send(&dispatch).await.unwrap(), "wamid.A");
}

#[tokio::test]
async fn api_error_is_gateway_failure_with_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "message": "(#131030) Recipient phone number not in allowed list",
                "type": "OAuthException",
                "code": 131030
            }
        })))
        .mount(&server)
        .await;

    let err = client_for(&server, 5).send(&text("1", "x")).await.unwrap_err();
    match err {
        SwitchboardError::Gateway { message, .. } => {
            assert!(message.contains("131030"), "message: {message}");
            assert!(message.contains("allowed list"));
        }
        other => panic!("expected gateway error, got {other:?}"),
    }
}

#[tokio::test]
async fn unparseable_error_body_still_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let err = client_for(&server, 5).send(&text("1", "x")).await.unwrap_err();
    assert!(matches!(err, SwitchboardError::Gateway { .. }));
    assert!(err.to_string().contains("503"));
}

#[tokio::test]
async fn success_without_message_id_is_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "messages": [] })))
        .mount(&server)
        .await;

    let err = client_for(&server, 5).send(&text("1", "x")).await.unwrap_err();
    assert!(matches!(err, SwitchboardError::Gateway { .. }));
}

#[tokio::test]
async fn slow_api_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "messages": [{ "id": "late" }] }))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let err = client_for(&server, 1).send(&text("1", "x")).await.unwrap_err();
    assert!(matches!(err, SwitchboardError::Gateway { .. }));
    assert!(err.is_retryable());
}
