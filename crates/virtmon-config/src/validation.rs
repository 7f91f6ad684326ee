// SPDX-FileCopyrightText: 2026 Virtmon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as a usable cookie variable name and positive timeouts.

use crate::diagnostic::ConfigError;
use crate::model::VirtmonConfig;

/// Smallest frame limit that still fits a domain with a few devices.
const MIN_FRAME_BYTES: usize = 1024;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &VirtmonConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut invalid = |message: String| errors.push(ConfigError::Validation { message });

    if config.handshake.protocol_version == 0 {
        invalid("handshake.protocol_version must be at least 1".to_string());
    }

    let key = &config.handshake.magic_cookie_key;
    if key.trim().is_empty() {
        invalid("handshake.magic_cookie_key must not be empty".to_string());
    } else if key.contains('=') || key.contains('\0') {
        invalid(format!(
            "handshake.magic_cookie_key `{key}` is not a valid environment variable name"
        ));
    }

    if config.handshake.magic_cookie_value.is_empty() {
        invalid("handshake.magic_cookie_value must not be empty".to_string());
    }

    if config.bridge.plugin.trim().is_empty() {
        invalid("bridge.plugin must not be empty".to_string());
    }

    for (name, value) in [
        ("probe_timeout_ms", config.bridge.probe_timeout_ms),
        ("close_timeout_ms", config.bridge.close_timeout_ms),
        ("handshake_timeout_ms", config.bridge.handshake_timeout_ms),
    ] {
        if value == 0 {
            invalid(format!("bridge.{name} must be greater than zero"));
        }
    }

    if config.bridge.max_frame_bytes < MIN_FRAME_BYTES {
        invalid(format!(
            "bridge.max_frame_bytes must be at least {MIN_FRAME_BYTES}, got {}",
            config.bridge.max_frame_bytes
        ));
    }

    let level = config.logging.level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        invalid(format!(
            "logging.level `{}` is not one of {}",
            config.logging.level,
            LOG_LEVELS.join(", ")
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
