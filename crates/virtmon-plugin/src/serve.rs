// SPDX-FileCopyrightText: 2026 Virtmon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin side: entry points for a driver binary.
//!
//! A driver binary calls [`serve_stdio`] from `main` with a table built by
//! [`DispatchTable::serving`]. Stdout carries frames, so logging goes to
//! stderr only.

use tracing::info;
use virtmon_core::VirtmonError;

use crate::dispatch::DispatchTable;
use crate::handshake;
use crate::options::BridgeOptions;
use crate::transport::Connection;

/// Accept one host connection and serve the capability set it selects.
pub async fn serve_connection(
    mut conn: Connection,
    options: &BridgeOptions,
    table: &DispatchTable,
) -> Result<(), VirtmonError> {
    let plugin = handshake::accept(&mut conn, &options.handshake, table).await?;
    plugin.serve(conn, options).await?;
    info!("plugin connection finished");
    Ok(())
}

/// Serve the host that launched this process over stdin and stdout.
///
/// Refuses to run when the launcher's magic cookie is absent, i.e. when the
/// binary was started by hand.
pub async fn serve_stdio(options: &BridgeOptions, table: &DispatchTable) -> Result<(), VirtmonError> {
    handshake::verify_env_cookie(&options.handshake)?;
    let conn = Connection::from_parts(
        tokio::io::stdin(),
        tokio::io::stdout(),
        options.max_frame_bytes,
    );
    serve_connection(conn, options, table).await
}

/// Install a stderr logger for a plugin process.
///
/// `RUST_LOG` takes precedence over `level`. Does nothing if a global
/// subscriber is already installed.
pub fn init_plugin_tracing(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("virtmon={level},warn")));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init();
}
