// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authentication for the agent API.
//!
//! Requests carry `Authorization: Bearer <token>` issued by the session layer
//! and identify the acting agent with `X-Agent-Id`. When no token is
//! configured, all requests are rejected (fail-closed).

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{StatusCode, request::Parts},
    middleware::Next,
    response::Response,
};

use switchboard_core::types::AgentId;

use crate::error::ApiError;

/// Header naming the agent a request acts for.
pub const AGENT_ID_HEADER: &str = "x-agent-id";

/// Authentication configuration for the gateway.
#[derive(Clone)]
pub struct AuthConfig {
    /// Expected bearer token. `None` rejects every authenticated request.
    pub bearer_token: Option<String>,
}

impl AuthConfig {
    /// Whether `presented` matches the configured token.
    pub fn accepts(&self, presented: Option<&str>) -> bool {
        match (self.bearer_token.as_deref(), presented) {
            (Some(expected), Some(token)) => {
                switchboard_whatsapp::webhook::constant_time_eq(token, expected)
            }
            _ => false,
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field(
                "bearer_token",
                &self.bearer_token.as_ref().map(|_| "[redacted]"),
            )
            .finish()
    }
}

/// Middleware that validates the bearer token.
pub async fn auth_middleware(
    State(auth): State<AuthConfig>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if auth.bearer_token.is_none() {
        tracing::error!("gateway has no bearer token configured -- rejecting request");
        return Err(StatusCode::UNAUTHORIZED);
    }

    let presented = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    if auth.accepts(presented) {
        Ok(next.run(request).await)
    } else {
        Err(StatusCode::UNAUTHORIZED)
    }
}

/// The agent a request acts for, taken from `X-Agent-Id`.
#[derive(Debug, Clone)]
pub struct AgentIdentity(pub AgentId);

impl<S: Send + Sync> FromRequestParts<S> for AgentIdentity {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(AGENT_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| Self(AgentId::from(v)))
            .ok_or(ApiError::Unauthorized("missing X-Agent-Id header"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_token_configured_accepts_nothing() {
        let config = AuthConfig { bearer_token: None };
        assert!(!config.accepts(Some("anything")));
        assert!(!config.accepts(None));
    }

    #[test]
    fn matching_token_is_accepted() {
        let config = AuthConfig {
            bearer_token: Some("secret-token".to_string()),
        };
        assert!(config.accepts(Some("secret-token")));
        assert!(!config.accepts(Some("secret-tokeN")));
        assert!(!config.accepts(None));
    }

    #[test]
    fn auth_config_debug_redacts_token() {
        let config = AuthConfig {
            bearer_token: Some("secret-token".to_string()),
        };
        let debug_output = format!("{:?}", config);
        assert!(!debug_output.contains("secret-token"));
        assert!(debug_output.contains("[redacted]"));
    }
}
