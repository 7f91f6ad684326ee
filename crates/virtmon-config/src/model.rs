// SPDX-FileCopyrightText: 2026 Virtmon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the virtmon driver bridge.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level virtmon configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections default to values that let a host and
/// a plugin built from this workspace talk to each other.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VirtmonConfig {
    /// Shared secret and protocol version checked before any capability call.
    #[serde(default)]
    pub handshake: HandshakeConfig,

    /// Plugin selection, call timeouts, and framing limits.
    #[serde(default)]
    pub bridge: BridgeConfig,

    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Handshake contract shared by the host and every plugin process.
///
/// Both sides must agree on all three values or the connection is refused.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HandshakeConfig {
    /// Bridge protocol version. Skew is a hard failure at connection time.
    #[serde(default = "default_protocol_version")]
    pub protocol_version: u32,

    /// Environment variable name the launcher sets in the plugin process.
    #[serde(default = "default_magic_cookie_key")]
    pub magic_cookie_key: String,

    /// Value the plugin expects to find under `magic_cookie_key`.
    #[serde(default = "default_magic_cookie_value")]
    pub magic_cookie_value: String,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            protocol_version: default_protocol_version(),
            magic_cookie_key: default_magic_cookie_key(),
            magic_cookie_value: default_magic_cookie_value(),
        }
    }
}

fn default_protocol_version() -> u32 {
    1
}

fn default_magic_cookie_key() -> String {
    "virtmon".to_string()
}

fn default_magic_cookie_value() -> String {
    "foobar".to_string()
}

/// Bridge behaviour on both sides of a plugin connection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    /// Capability-set name to dispense after the handshake.
    #[serde(default = "default_plugin")]
    pub plugin: String,

    /// Upper bound for a `detect` or `name` call, in milliseconds.
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    /// Upper bound for the remote `close` call and plugin exit, in milliseconds.
    #[serde(default = "default_close_timeout_ms")]
    pub close_timeout_ms: u64,

    /// Upper bound for the connection handshake, in milliseconds.
    #[serde(default = "default_handshake_timeout_ms")]
    pub handshake_timeout_ms: u64,

    /// Largest accepted wire frame, in bytes.
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            plugin: default_plugin(),
            probe_timeout_ms: default_probe_timeout_ms(),
            close_timeout_ms: default_close_timeout_ms(),
            handshake_timeout_ms: default_handshake_timeout_ms(),
            max_frame_bytes: default_max_frame_bytes(),
        }
    }
}

impl BridgeConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn close_timeout(&self) -> Duration {
        Duration::from_millis(self.close_timeout_ms)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }
}

fn default_plugin() -> String {
    "driver_grpc".to_string()
}

fn default_probe_timeout_ms() -> u64 {
    5_000
}

fn default_close_timeout_ms() -> u64 {
    2_000
}

fn default_handshake_timeout_ms() -> u64 {
    10_000
}

fn default_max_frame_bytes() -> usize {
    8 * 1024 * 1024
}

/// Log output configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
