// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as valid bind addresses, URL schemes, and positive timeouts.

use crate::diagnostic::ConfigError;
use crate::model::SwitchboardConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &SwitchboardConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let level = config.service.log_level.trim().to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ConfigError::invalid(
            "service.log_level",
            format!(
                "`{}` is not one of {}",
                config.service.log_level,
                LOG_LEVELS.join(", ")
            ),
        ));
    }

    let host = config.server.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::invalid("server.host", "must not be empty"));
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(ConfigError::invalid(
                "server.host",
                format!("`{host}` is not a valid IP address or hostname"),
            ));
        }
    }

    if config
        .server
        .bearer_token
        .as_deref()
        .is_some_and(|t| t.trim().is_empty())
    {
        errors.push(ConfigError::invalid(
            "server.bearer_token",
            "must not be blank when set",
        ));
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::invalid(
            "storage.database_path",
            "must not be empty",
        ));
    }

    let base = &config.whatsapp.api_base_url;
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        errors.push(ConfigError::invalid(
            "whatsapp.api_base_url",
            format!("`{base}` must start with http:// or https://"),
        ));
    }

    if !is_api_version(&config.whatsapp.api_version) {
        errors.push(ConfigError::invalid(
            "whatsapp.api_version",
            format!(
                "`{}` must look like v18 or v18.0",
                config.whatsapp.api_version
            ),
        ));
    }

    if config.whatsapp.request_timeout_secs == 0 {
        errors.push(ConfigError::invalid(
            "whatsapp.request_timeout_secs",
            "must be greater than zero",
        ));
    }

    if config.engine.send_timeout_secs == 0 {
        errors.push(ConfigError::invalid(
            "engine.send_timeout_secs",
            "must be greater than zero",
        ));
    }

    if config.fanout.connection_buffer == 0 {
        errors.push(ConfigError::invalid(
            "fanout.connection_buffer",
            "must be greater than zero",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// `v<digits>` optionally followed by `.<digits>`.
fn is_api_version(version: &str) -> bool {
    let Some(rest) = version.strip_prefix('v') else {
        return false;
    };
    let mut parts = rest.splitn(2, '.');
    let major_ok = parts
        .next()
        .is_some_and(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()));
    let minor_ok = parts
        .next()
        .is_none_or(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()));
    major_ok && minor_ok
}
