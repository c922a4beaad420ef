// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook authenticity: subscription handshake and payload signatures.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{debug, warn};

use crate::types::VerifyParams;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the payload signature.
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// Answer a verification handshake.
///
/// Returns the challenge to echo when `hub.mode` is `subscribe` and the token
/// matches. A missing configured token never verifies.
pub fn verify_subscription(params: &VerifyParams, expected_token: Option<&str>) -> Option<String> {
    let expected = expected_token?;
    let mode_ok = params.mode.as_deref() == Some("subscribe");
    let token_ok = params
        .verify_token
        .as_deref()
        .is_some_and(|t| constant_time_eq(t, expected));
    if mode_ok && token_ok {
        debug!("webhook subscription verified");
        Some(params.challenge.clone().unwrap_or_default())
    } else {
        warn!("webhook subscription verification failed");
        None
    }
}

/// Verify the `X-Hub-Signature-256` header (`sha256=<hex>`) over the raw body.
pub fn verify_signature(body: &[u8], signature_header: &str, app_secret: &str) -> bool {
    let Some(expected) = signature_header.strip_prefix("sha256=") else {
        warn!("invalid signature header format (missing sha256= prefix)");
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(app_secret.as_bytes()) else {
        warn!("failed to create HMAC");
        return false;
    };
    mac.update(body);
    let computed = hex::encode(mac.finalize().into_bytes());

    constant_time_eq(&computed, &expected.to_ascii_lowercase())
}

/// Compute the header value for `body`. Used by tests and local tooling.
pub fn sign(body: &[u8], app_secret: &str) -> String {
    let mut mac = match HmacSha256::new_from_slice(app_secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return String::new(),
    };
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time string comparison.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes().zip(b.bytes()).fold(0, |acc, (x, y)| acc | (x ^ y)) == 0
}
