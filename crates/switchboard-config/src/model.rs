// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Switchboard routing engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Top-level Switchboard configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SwitchboardConfig {
    /// Service identity and logging.
    #[serde(default)]
    pub service: ServiceConfig,

    /// HTTP listener and API authentication.
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// WhatsApp Cloud API settings.
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,

    /// Ingestion, assignment and send path tuning.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Real-time fan-out settings.
    #[serde(default)]
    pub fanout: FanoutConfig,
}

/// Service identity configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Instance name reported by health checks.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "switchboard".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// HTTP server configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to.
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port for the HTTP listener.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Bearer token for the agent API. `None` rejects every authenticated request.
    #[serde(default)]
    pub bearer_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            bearer_token: None,
        }
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("bearer_token", &redact(&self.bearer_token))
            .finish()
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_local_dir()
        .map(|d| d.join("switchboard").join("switchboard.db"))
        .and_then(|p| p.to_str().map(String::from))
        .unwrap_or_else(|| "switchboard.db".to_string())
}

fn default_wal_mode() -> bool {
    true
}

/// WhatsApp Cloud API configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WhatsAppConfig {
    /// Graph API base URL. Overridden in tests to point at a mock server.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Graph API version segment, e.g. `v18.0`.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Business phone number id used for sends. When set, inbound payloads
    /// addressed to other numbers are ignored.
    #[serde(default)]
    pub phone_number_id: Option<String>,

    /// Permanent or system-user access token.
    #[serde(default)]
    pub access_token: Option<String>,

    /// Token echoed back during the webhook verification handshake.
    #[serde(default)]
    pub verify_token: Option<String>,

    /// App secret for `X-Hub-Signature-256` verification. `None` skips the check.
    #[serde(default)]
    pub app_secret: Option<String>,

    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            api_version: default_api_version(),
            phone_number_id: None,
            access_token: None,
            verify_token: None,
            app_secret: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl fmt::Debug for WhatsAppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WhatsAppConfig")
            .field("api_base_url", &self.api_base_url)
            .field("api_version", &self.api_version)
            .field("phone_number_id", &self.phone_number_id)
            .field("access_token", &redact(&self.access_token))
            .field("verify_token", &redact(&self.verify_token))
            .field("app_secret", &redact(&self.app_secret))
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

fn default_api_base_url() -> String {
    "https://graph.facebook.com".to_string()
}

fn default_api_version() -> String {
    "v18.0".to_string()
}

fn default_request_timeout_secs() -> u64 {
    15
}

/// Engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Upper bound on a single outbound gateway call, in seconds.
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,

    /// Assign waiting conversations when an agent comes online.
    #[serde(default = "default_requeue_pending_on_presence")]
    pub requeue_pending_on_presence: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            send_timeout_secs: default_send_timeout_secs(),
            requeue_pending_on_presence: default_requeue_pending_on_presence(),
        }
    }
}

fn default_send_timeout_secs() -> u64 {
    20
}

fn default_requeue_pending_on_presence() -> bool {
    true
}

/// Fan-out configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FanoutConfig {
    /// Per-connection queue depth; events beyond it are dropped for that connection.
    #[serde(default = "default_connection_buffer")]
    pub connection_buffer: usize,
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            connection_buffer: default_connection_buffer(),
        }
    }
}

fn default_connection_buffer() -> usize {
    64
}

fn redact(secret: &Option<String>) -> &'static str {
    match secret {
        Some(_) => "[redacted]",
        None => "None",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secrets_are_redacted_in_debug_output() {
        let mut config = SwitchboardConfig::default();
        config.server.bearer_token = Some("tok-123".into());
        config.whatsapp.access_token = Some("EAAG-secret".into());
        config.whatsapp.app_secret = Some("shh".into());

        let rendered = format!("{config:?}");
        assert!(!rendered.contains("tok-123"));
        assert!(!rendered.contains("EAAG-secret"));
        assert!(!rendered.contains("shh"));
        assert!(rendered.contains("[redacted]"));
    }

    #[test]
    fn default_database_path_ends_with_file_name() {
        assert!(default_database_path().ends_with("switchboard.db"));
    }
}
