// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `switchboard doctor` command implementation.
//!
//! Runs diagnostic checks against the configuration, the database and the
//! WhatsApp settings, then prints one line per check.

use std::io::IsTerminal;
use std::path::Path;
use std::time::{Duration, Instant};

use switchboard_config::model::SwitchboardConfig;
use switchboard_core::{HealthStatus, PluginAdapter, StorageAdapter, SwitchboardError};
use switchboard_storage::SqliteStorage;
use switchboard_whatsapp::WhatsAppClient;

use crate::status::local_base_url;

/// Status of a diagnostic check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

/// Result of a single diagnostic check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: &'static str,
    pub status: CheckStatus,
    pub message: String,
    pub duration: Duration,
}

impl CheckResult {
    fn new(name: &'static str, status: CheckStatus, message: impl Into<String>, start: Instant) -> Self {
        Self {
            name,
            status,
            message: message.into(),
            duration: start.elapsed(),
        }
    }
}

/// Run the `switchboard doctor` command.
///
/// `--deep` adds an integrity check and a memory reading; `--plain` disables colors.
pub async fn run_doctor(
    config: &SwitchboardConfig,
    config_path: Option<&Path>,
    deep: bool,
    plain: bool,
) -> Result<(), SwitchboardError> {
    let use_color = !plain && std::io::stdout().is_terminal();

    let mut results = vec![
        check_config(config_path),
        check_database(config).await,
        check_whatsapp(config).await,
        check_webhook(config),
        check_api_auth(config),
        check_health_endpoint(config).await,
    ];
    if deep {
        results.push(check_db_integrity(config).await);
        results.push(check_memory_baseline());
    }

    println!();
    println!("  switchboard doctor");
    println!("  {}", "-".repeat(50));

    for result in &results {
        println!("{}", render_line(result, use_color));
    }
    println!();

    let issues = results
        .iter()
        .filter(|r| r.status != CheckStatus::Pass)
        .count();
    if issues > 0 {
        let issue_word = if issues == 1 { "issue" } else { "issues" };
        println!("  {issues} {issue_word} found.");
        if !deep {
            println!("  Run with --deep for detailed diagnostics.");
        }
    } else {
        println!("  All checks passed.");
    }
    println!();

    Ok(())
}

fn render_line(result: &CheckResult, use_color: bool) -> String {
    let duration_ms = result.duration.as_millis();
    if use_color {
        use colored::Colorize;
        let (symbol, message) = match result.status {
            CheckStatus::Pass => ("✓".green(), result.message.normal()),
            CheckStatus::Warn => ("!".yellow(), result.message.yellow()),
            CheckStatus::Fail => ("✗".red(), result.message.red()),
        };
        format!("    {symbol} {:<20} {message} ({duration_ms}ms)", result.name)
    } else {
        let tag = match result.status {
            CheckStatus::Pass => "[OK]  ",
            CheckStatus::Warn => "[WARN]",
            CheckStatus::Fail => "[FAIL]",
        };
        format!(
            "    {tag} {:<20} {} ({duration_ms}ms)",
            result.name, result.message
        )
    }
}

/// Re-loads the configuration so the check reflects the file on disk.
fn check_config(path: Option<&Path>) -> CheckResult {
    let start = Instant::now();
    let loaded = match path {
        Some(path) => switchboard_config::load_and_validate_path(path),
        None => switchboard_config::load_and_validate(),
    };
    match loaded {
        Ok(_) => CheckResult::new("Configuration", CheckStatus::Pass, "valid", start),
        Err(errors) => CheckResult::new(
            "Configuration",
            CheckStatus::Fail,
            format!("{} error(s)", errors.len()),
            start,
        ),
    }
}

async fn check_database(config: &SwitchboardConfig) -> CheckResult {
    let start = Instant::now();
    let db_path = &config.storage.database_path;
    if !Path::new(db_path).exists() {
        return CheckResult::new(
            "Database",
            CheckStatus::Warn,
            format!("not found: {db_path} (will be created on first run)"),
            start,
        );
    }

    let storage = SqliteStorage::new(config.storage.clone());
    if let Err(e) = storage.initialize().await {
        return CheckResult::new("Database", CheckStatus::Fail, format!("open failed: {e}"), start);
    }
    let result = match storage.health_check().await {
        Ok(HealthStatus::Healthy) => CheckResult::new("Database", CheckStatus::Pass, "connected", start),
        Ok(other) => CheckResult::new("Database", CheckStatus::Warn, format!("{other:?}"), start),
        Err(e) => CheckResult::new("Database", CheckStatus::Fail, format!("query failed: {e}"), start),
    };
    let _ = storage.close().await;
    result
}

async fn check_whatsapp(config: &SwitchboardConfig) -> CheckResult {
    let start = Instant::now();
    match WhatsAppClient::new(&config.whatsapp) {
        Ok(client) => match client.health_check().await {
            Ok(HealthStatus::Healthy) => CheckResult::new(
                "WhatsApp client",
                CheckStatus::Pass,
                client.messages_url().to_string(),
                start,
            ),
            Ok(other) => CheckResult::new("WhatsApp client", CheckStatus::Warn, format!("{other:?}"), start),
            Err(e) => CheckResult::new("WhatsApp client", CheckStatus::Fail, e.to_string(), start),
        },
        Err(e) => CheckResult::new("WhatsApp client", CheckStatus::Fail, e.to_string(), start),
    }
}

fn check_webhook(config: &SwitchboardConfig) -> CheckResult {
    let start = Instant::now();
    match (&config.whatsapp.verify_token, &config.whatsapp.app_secret) {
        (None, _) => CheckResult::new(
            "Webhook",
            CheckStatus::Warn,
            "whatsapp.verify_token not set (subscription cannot be verified)",
            start,
        ),
        (Some(_), None) => CheckResult::new(
            "Webhook",
            CheckStatus::Warn,
            "whatsapp.app_secret not set (deliveries are not signature-checked)",
            start,
        ),
        (Some(_), Some(_)) => CheckResult::new("Webhook", CheckStatus::Pass, "verify token and signature", start),
    }
}

fn check_api_auth(config: &SwitchboardConfig) -> CheckResult {
    let start = Instant::now();
    if config.server.bearer_token.is_some() {
        CheckResult::new("Agent API auth", CheckStatus::Pass, "bearer token set", start)
    } else {
        CheckResult::new(
            "Agent API auth",
            CheckStatus::Fail,
            "server.bearer_token not set (every API request is refused)",
            start,
        )
    }
}

async fn check_health_endpoint(config: &SwitchboardConfig) -> CheckResult {
    let start = Instant::now();
    let url = format!("{}/health", local_base_url(&config.server));

    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(3))
        .build()
    {
        Ok(c) => c,
        Err(e) => {
            return CheckResult::new(
                "Health endpoint",
                CheckStatus::Fail,
                format!("HTTP client error: {e}"),
                start,
            );
        }
    };

    match client.get(&url).send().await {
        Ok(resp) if resp.status().is_success() => {
            CheckResult::new("Health endpoint", CheckStatus::Pass, "reachable", start)
        }
        Ok(resp) => CheckResult::new(
            "Health endpoint",
            CheckStatus::Warn,
            format!("status {}", resp.status()),
            start,
        ),
        Err(_) => CheckResult::new(
            "Health endpoint",
            CheckStatus::Warn,
            format!("not reachable at {url} (server may not be running)"),
            start,
        ),
    }
}

async fn check_db_integrity(config: &SwitchboardConfig) -> CheckResult {
    let start = Instant::now();
    if !Path::new(&config.storage.database_path).exists() {
        return CheckResult::new("DB integrity", CheckStatus::Warn, "database not found (skipped)", start);
    }

    let storage = SqliteStorage::new(config.storage.clone());
    if let Err(e) = storage.initialize().await {
        return CheckResult::new("DB integrity", CheckStatus::Fail, format!("open failed: {e}"), start);
    }
    let problems = match storage.db() {
        Ok(db) => db.integrity_problems().await,
        Err(e) => Err(e),
    };
    let result = match problems {
        Ok(problems) if problems.is_empty() => CheckResult::new("DB integrity", CheckStatus::Pass, "ok", start),
        Ok(problems) => CheckResult::new(
            "DB integrity",
            CheckStatus::Fail,
            format!("{} issue(s) found", problems.len()),
            start,
        ),
        Err(e) => CheckResult::new("DB integrity", CheckStatus::Fail, format!("check failed: {e}"), start),
    };
    let _ = storage.close().await;
    result
}

fn check_memory_baseline() -> CheckResult {
    let start = Instant::now();

    #[cfg(not(target_env = "msvc"))]
    {
        let _ = tikv_jemalloc_ctl::epoch::advance();
        let allocated = tikv_jemalloc_ctl::stats::allocated::read().unwrap_or(0);
        let resident = tikv_jemalloc_ctl::stats::resident::read().unwrap_or(0);
        let allocated_mb = allocated as f64 / (1024.0 * 1024.0);
        let resident_mb = resident as f64 / (1024.0 * 1024.0);
        CheckResult::new(
            "Memory baseline",
            CheckStatus::Pass,
            format!("heap: {allocated_mb:.1} MB, resident: {resident_mb:.1} MB"),
            start,
        )
    }

    #[cfg(target_env = "msvc")]
    {
        CheckResult::new("Memory baseline", CheckStatus::Warn, "jemalloc not available on MSVC", start)
    }
}
