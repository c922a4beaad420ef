// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping of engine errors onto HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use switchboard_core::SwitchboardError;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
}

/// Anything a handler can fail with.
#[derive(Debug)]
pub enum ApiError {
    Domain(SwitchboardError),
    /// Missing or invalid credentials or agent identity.
    Unauthorized(&'static str),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Domain(e) => match e {
                SwitchboardError::NotFound { .. } => StatusCode::NOT_FOUND,
                SwitchboardError::Forbidden { .. } => StatusCode::FORBIDDEN,
                SwitchboardError::InvalidRequest(_) | SwitchboardError::InvalidEvent(_) => {
                    StatusCode::BAD_REQUEST
                }
                SwitchboardError::InFlight { .. } => StatusCode::CONFLICT,
                SwitchboardError::Gateway { .. } => StatusCode::BAD_GATEWAY,
                SwitchboardError::NoAgentAvailable => StatusCode::SERVICE_UNAVAILABLE,
                SwitchboardError::Storage { .. }
                | SwitchboardError::Config(_)
                | SwitchboardError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "unauthorized",
            Self::Domain(e) => match e {
                SwitchboardError::NotFound { .. } => "not_found",
                SwitchboardError::Forbidden { .. } => "forbidden",
                SwitchboardError::InvalidRequest(_) => "invalid_request",
                SwitchboardError::InvalidEvent(_) => "invalid_event",
                SwitchboardError::InFlight { .. } => "in_flight",
                SwitchboardError::Gateway { .. } => "gateway_failure",
                SwitchboardError::NoAgentAvailable => "no_agent_available",
                SwitchboardError::Storage { .. }
                | SwitchboardError::Config(_)
                | SwitchboardError::Internal(_) => "internal",
            },
        }
    }
}

impl From<SwitchboardError> for ApiError {
    fn from(e: SwitchboardError) -> Self {
        Self::Domain(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match &self {
            Self::Unauthorized(reason) => (*reason).to_string(),
            // Storage and internal details stay in the log.
            Self::Domain(e) if status.is_server_error() && status != StatusCode::BAD_GATEWAY => {
                tracing::error!(error = %e, "request failed");
                "internal error".to_string()
            }
            Self::Domain(e) => e.to_string(),
        };
        let body = ErrorBody {
            error,
            code: self.code(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_statuses() {
        let cases = [
            (SwitchboardError::not_found("conversation", "c"), StatusCode::NOT_FOUND),
            (
                SwitchboardError::Forbidden {
                    agent_id: "a".into(),
                    conversation_id: "c".into(),
                },
                StatusCode::FORBIDDEN,
            ),
            (
                SwitchboardError::InvalidRequest("x".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                SwitchboardError::InFlight { token: "t".into() },
                StatusCode::CONFLICT,
            ),
            (SwitchboardError::gateway("503"), StatusCode::BAD_GATEWAY),
            (
                SwitchboardError::NoAgentAvailable,
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                SwitchboardError::Internal("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
        assert_eq!(
            ApiError::Unauthorized("missing token").status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn error_body_shape() {
        let err = ApiError::from(SwitchboardError::not_found("conversation", "c-1"));
        let body = ErrorBody {
            error: match &err {
                ApiError::Domain(e) => e.to_string(),
                ApiError::Unauthorized(r) => r.to_string(),
            },
            code: err.code(),
        };
        insta::assert_json_snapshot!(body, @r###"
        {
          "error": "conversation not found: c-1",
          "code": "not_found"
        }
        "###);
    }

    #[test]
    fn internal_details_are_not_exposed() {
        let response = ApiError::from(SwitchboardError::Internal("secret path".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
