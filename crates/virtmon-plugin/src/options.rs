// SPDX-FileCopyrightText: 2026 Virtmon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runtime options shared by both ends of a plugin connection.

use std::time::Duration;

use virtmon_config::{HandshakeConfig, VirtmonConfig};

/// Resolved bridge settings, derived once from [`VirtmonConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeOptions {
    /// Handshake contract both processes must agree on.
    pub handshake: HandshakeConfig,
    /// Capability-set name requested after the handshake.
    pub plugin: String,
    /// Bound for `detect` and `name` calls.
    pub probe_timeout: Duration,
    /// Bound for the remote `close` call and plugin process exit.
    pub close_timeout: Duration,
    /// Bound for the connection handshake.
    pub handshake_timeout: Duration,
    /// Largest frame accepted from the peer.
    pub max_frame_bytes: usize,
}

impl BridgeOptions {
    pub fn from_config(config: &VirtmonConfig) -> Self {
        Self {
            handshake: config.handshake.clone(),
            plugin: config.bridge.plugin.clone(),
            probe_timeout: config.bridge.probe_timeout(),
            close_timeout: config.bridge.close_timeout(),
            handshake_timeout: config.bridge.handshake_timeout(),
            max_frame_bytes: config.bridge.max_frame_bytes,
        }
    }

    /// Same options, requesting a different capability set.
    pub fn with_plugin(mut self, plugin: impl Into<String>) -> Self {
        self.plugin = plugin.into();
        self
    }
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self::from_config(&VirtmonConfig::default())
    }
}

impl From<&VirtmonConfig> for BridgeOptions {
    fn from(config: &VirtmonConfig) -> Self {
        Self::from_config(config)
    }
}
