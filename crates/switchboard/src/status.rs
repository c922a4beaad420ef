// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `switchboard status` command implementation.
//!
//! Queries the health endpoint of a running server. Falls back gracefully
//! when the server is not running.

use std::io::IsTerminal;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use switchboard_config::model::{ServerConfig, SwitchboardConfig};
use switchboard_core::SwitchboardError;

/// Health endpoint response from the server.
#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
    version: String,
    uptime_secs: u64,
}

/// Structured status output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub running: bool,
    pub status: String,
    pub version: Option<String>,
    pub uptime_secs: Option<u64>,
    pub uptime_human: Option<String>,
    pub endpoint: String,
}

/// Base URL a local client should use to reach the configured listener.
///
/// Wildcard bind addresses are dialed through loopback.
pub fn local_base_url(server: &ServerConfig) -> String {
    let host = match server.host.as_str() {
        "0.0.0.0" | "" => "127.0.0.1",
        "::" => "[::1]",
        other => other,
    };
    format!("http://{host}:{}", server.port)
}

/// Format seconds into a human-readable duration string.
fn format_uptime(secs: u64) -> String {
    let days = secs / 86400;
    let hours = (secs % 86400) / 3600;
    let minutes = (secs % 3600) / 60;

    if days > 0 {
        format!("{days}d {hours}h {minutes}m")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// Run the `switchboard status` command.
///
/// `--json` prints a [`StatusResponse`]; `--plain` (or a non-TTY stdout)
/// disables colors.
pub async fn run_status(
    config: &SwitchboardConfig,
    json: bool,
    plain: bool,
) -> Result<(), SwitchboardError> {
    let endpoint = format!("{}/health", local_base_url(&config.server));

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(3))
        .build()
        .map_err(|e| SwitchboardError::Internal(format!("failed to create HTTP client: {e}")))?;

    let health = match client.get(&endpoint).send().await {
        Ok(resp) if resp.status().is_success() => Some(
            resp.json::<HealthResponse>()
                .await
                .map_err(|e| SwitchboardError::Internal(format!("failed to parse health response: {e}")))?,
        ),
        _ => None,
    };

    let use_color = !plain && std::io::stdout().is_terminal();
    match health {
        Some(health) => {
            let uptime_human = format_uptime(health.uptime_secs);
            if json {
                print_json(&StatusResponse {
                    running: true,
                    status: health.status,
                    version: Some(health.version),
                    uptime_secs: Some(health.uptime_secs),
                    uptime_human: Some(uptime_human),
                    endpoint,
                });
            } else {
                print_status_running(&health.status, &health.version, &uptime_human, use_color);
            }
        }
        None => {
            if json {
                print_json(&StatusResponse {
                    running: false,
                    status: "not running".to_string(),
                    version: None,
                    uptime_secs: None,
                    uptime_human: None,
                    endpoint,
                });
            } else {
                print_status_offline(&endpoint, use_color);
            }
        }
    }

    Ok(())
}

fn print_json(resp: &StatusResponse) {
    println!(
        "{}",
        serde_json::to_string_pretty(resp).unwrap_or_else(|_| "{}".to_string())
    );
}

fn print_status_running(status: &str, version: &str, uptime: &str, use_color: bool) {
    println!();
    println!("  switchboard status");
    println!("  {}", "-".repeat(35));

    if use_color {
        use colored::Colorize;
        println!(
            "    State:    {} {} (uptime: {})",
            "✓".green(),
            status.green(),
            uptime
        );
    } else {
        println!("    State:    [OK] {status} (uptime: {uptime})");
    }
    println!("    Version:  {version}");
    println!();
}

fn print_status_offline(endpoint: &str, use_color: bool) {
    println!();
    println!("  switchboard status");
    println!("  {}", "-".repeat(35));

    if use_color {
        use colored::Colorize;
        println!("    State:    {} {}", "✗".red(), "not running".red());
    } else {
        println!("    State:    [FAIL] not running");
    }

    println!("    Endpoint: {endpoint}");
    println!();
    println!("  Start with: switchboard serve");
    println!();
}
