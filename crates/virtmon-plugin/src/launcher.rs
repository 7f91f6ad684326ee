// SPDX-FileCopyrightText: 2026 Virtmon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Host side: start a plugin process and dispense a driver for it.

use std::process::{ExitStatus, Stdio};

use tokio::process::{Child, Command};
use tracing::{debug, info, warn};
use virtmon_core::{Driver, VirtmonError};

use crate::dispatch::DispatchTable;
use crate::handshake;
use crate::options::BridgeOptions;
use crate::transport::Connection;

/// Handshake on an established connection and dispense the client adaptor
/// for `options.plugin`.
///
/// The name is looked up before anything is sent, so an unknown capability
/// set fails without touching the connection.
pub async fn connect(
    mut conn: Connection,
    options: &BridgeOptions,
    table: &DispatchTable,
) -> Result<Box<dyn Driver>, VirtmonError> {
    let plugin = table.get(&options.plugin)?;

    tokio::time::timeout(
        options.handshake_timeout,
        handshake::initiate(&mut conn, &options.handshake, &options.plugin),
    )
    .await
    .map_err(|_| VirtmonError::Timeout {
        duration: options.handshake_timeout,
    })??;

    plugin.client(conn, options)
}

/// Spawn `command` as a plugin process and connect to it over stdio.
///
/// The magic cookie is exported into the child's environment. The child's
/// stderr is inherited so plugin logs reach the host's terminal. On any
/// failure the child is killed before the error is returned.
pub async fn launch(
    mut command: Command,
    options: &BridgeOptions,
    table: &DispatchTable,
) -> Result<PluginProcess, VirtmonError> {
    table.get(&options.plugin)?;

    command
        .env(
            &options.handshake.magic_cookie_key,
            &options.handshake.magic_cookie_value,
        )
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .kill_on_drop(true);

    let mut child = command
        .spawn()
        .map_err(|e| VirtmonError::transport("failed to spawn plugin process", e))?;
    let pid = child.id();
    info!(?pid, plugin = %options.plugin, "plugin process started");

    let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
        kill(&mut child).await;
        return Err(VirtmonError::Internal(
            "plugin process stdio was not captured".to_string(),
        ));
    };

    let conn = Connection::from_parts(stdout, stdin, options.max_frame_bytes);
    match connect(conn, options, table).await {
        Ok(driver) => Ok(PluginProcess {
            child,
            driver,
            close_timeout: options.close_timeout,
        }),
        Err(err) => {
            warn!(?pid, error = %err, "plugin connection failed");
            kill(&mut child).await;
            Err(err)
        }
    }
}

/// A running plugin process and the driver it dispenses.
pub struct PluginProcess {
    child: Child,
    driver: Box<dyn Driver>,
    close_timeout: std::time::Duration,
}

impl std::fmt::Debug for PluginProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginProcess")
            .field("pid", &self.child.id())
            .finish_non_exhaustive()
    }
}

impl PluginProcess {
    /// The dispensed driver, indistinguishable from an in-process one.
    pub fn driver(&self) -> &dyn Driver {
        self.driver.as_ref()
    }

    /// OS process id, if the child is still running.
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Close the driver, then wait for the process to exit.
    ///
    /// The process is killed if it is still alive after the close timeout.
    /// Returns the exit status when the process exited on its own.
    pub async fn shutdown(mut self) -> Option<ExitStatus> {
        self.driver.close().await;

        match tokio::time::timeout(self.close_timeout, self.child.wait()).await {
            Ok(Ok(status)) => {
                info!(%status, "plugin process exited");
                Some(status)
            }
            Ok(Err(err)) => {
                warn!(error = %err, "failed to wait for plugin process");
                kill(&mut self.child).await;
                None
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.close_timeout.as_millis() as u64,
                    "plugin process did not exit, killing it"
                );
                kill(&mut self.child).await;
                None
            }
        }
    }
}

async fn kill(child: &mut Child) {
    if let Err(err) = child.kill().await {
        debug!(error = %err, "could not kill plugin process");
    }
}
