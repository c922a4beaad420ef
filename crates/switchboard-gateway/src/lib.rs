// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP/WebSocket surface for Switchboard.
//!
//! Receives channel webhooks, serves the agent REST API and streams live
//! fan-out events to agent sessions over WebSocket. All state changes go
//! through the [`Engine`](switchboard_engine::Engine).

pub mod auth;
pub mod error;
pub mod handlers;
pub mod server;
pub mod webhook;
pub mod ws;

pub use auth::{AGENT_ID_HEADER, AgentIdentity, AuthConfig};
pub use error::ApiError;
pub use server::{GatewayState, HealthState, WebhookSettings, router, start_server};
