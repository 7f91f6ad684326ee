// SPDX-FileCopyrightText: 2026 Virtmon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end bridge testing.
//!
//! `BridgeHarness` runs both adaptors in one process over an in-memory
//! duplex pipe: the plugin side serves a [`MockDriver`] on a spawned task,
//! the host side holds the dispensed `Box<dyn Driver>`. Everything between
//! them (framing, handshake, dispatch) is the real code path.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;
use virtmon_core::{Driver, VirtmonError};
use virtmon_plugin::{BridgeOptions, Connection, DispatchTable, connect, serve_connection};

use crate::mock_driver::MockDriver;

/// How long [`BridgeHarness::finish`] waits for the plugin task.
const JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Builder for bridge harnesses with mismatched or tuned options.
pub struct BridgeHarnessBuilder {
    driver: MockDriver,
    host: BridgeOptions,
    plugin: BridgeOptions,
}

impl BridgeHarnessBuilder {
    /// Options used by the host side only.
    pub fn host_options(mut self, options: BridgeOptions) -> Self {
        self.host = options;
        self
    }

    /// Options used by the plugin side only.
    pub fn plugin_options(mut self, options: BridgeOptions) -> Self {
        self.plugin = options;
        self
    }

    /// Options used by both sides.
    pub fn options(self, options: BridgeOptions) -> Self {
        self.host_options(options.clone()).plugin_options(options)
    }

    /// Connect both sides. Fails with the host-side error if the handshake
    /// or dispatch does not succeed.
    pub async fn start(self) -> Result<BridgeHarness, VirtmonError> {
        let (host_io, plugin_io) = tokio::io::duplex(self.host.max_frame_bytes);

        let plugin_options = self.plugin;
        let table = DispatchTable::serving(self.driver.clone());
        let server = tokio::spawn(async move {
            let conn = Connection::new(plugin_io, plugin_options.max_frame_bytes);
            serve_connection(conn, &plugin_options, &table).await
        });

        let conn = Connection::new(host_io, self.host.max_frame_bytes);
        match connect(conn, &self.host, &DispatchTable::host()).await {
            Ok(client) => Ok(BridgeHarness {
                driver: self.driver,
                client,
                server,
            }),
            Err(err) => {
                let plugin_result = server.await;
                debug!(?plugin_result, "plugin side after failed connect");
                Err(err)
            }
        }
    }
}

/// A connected host/plugin pair around a [`MockDriver`].
pub struct BridgeHarness {
    driver: MockDriver,
    client: Box<dyn Driver>,
    server: JoinHandle<Result<(), VirtmonError>>,
}

impl BridgeHarness {
    pub fn builder(driver: MockDriver) -> BridgeHarnessBuilder {
        BridgeHarnessBuilder {
            driver,
            host: BridgeOptions::default(),
            plugin: BridgeOptions::default(),
        }
    }

    /// Connect with default options on both sides.
    pub async fn start(driver: MockDriver) -> Result<Self, VirtmonError> {
        Self::builder(driver).start().await
    }

    /// The host-side driver handle.
    pub fn client(&self) -> &dyn Driver {
        self.client.as_ref()
    }

    /// The plugin-side mock, for inspecting calls.
    pub fn mock(&self) -> &MockDriver {
        &self.driver
    }

    /// Whether the plugin task has returned.
    pub fn server_finished(&self) -> bool {
        self.server.is_finished()
    }

    /// Close the client and wait for the plugin side to finish serving.
    pub async fn finish(self) -> Result<(), VirtmonError> {
        self.client.close().await;
        match tokio::time::timeout(JOIN_TIMEOUT, self.server).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) => Err(VirtmonError::Internal(format!("plugin task failed: {join}"))),
            Err(_) => Err(VirtmonError::Timeout {
                duration: JOIN_TIMEOUT,
            }),
        }
    }
}
