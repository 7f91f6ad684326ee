// SPDX-FileCopyrightText: 2026 Virtmon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection handshake.
//!
//! The plugin process first checks that the launcher exported the magic
//! cookie into its environment. Over the connection, the host then sends a
//! [`Hello`] carrying the cookie, its protocol version, and the capability
//! set it wants; the plugin answers [`Accept`] or [`Reject`]. Nothing else
//! may be exchanged until the handshake has succeeded.

use std::sync::Arc;

use tracing::{debug, warn};
use virtmon_config::HandshakeConfig;
use virtmon_core::VirtmonError;

use crate::dispatch::{BridgePlugin, DispatchTable};
use crate::transport::Connection;
use crate::wire::{Accept, Hello, Reject, Request, Response};

/// Check that this process was started by a launcher sharing our cookie.
pub fn verify_env_cookie(handshake: &HandshakeConfig) -> Result<(), VirtmonError> {
    match std::env::var(&handshake.magic_cookie_key) {
        Ok(value) if value == handshake.magic_cookie_value => Ok(()),
        _ => Err(VirtmonError::Handshake {
            reason: "this binary is a virtmon plugin and must be started by a virtmon host"
                .to_string(),
        }),
    }
}

/// Host side: introduce ourselves and wait for the plugin's verdict.
pub async fn initiate(
    conn: &mut Connection,
    handshake: &HandshakeConfig,
    plugin: &str,
) -> Result<(), VirtmonError> {
    conn.send(&Request::Hello(Hello {
        protocol_version: handshake.protocol_version,
        magic_cookie_key: handshake.magic_cookie_key.clone(),
        magic_cookie_value: handshake.magic_cookie_value.clone(),
        plugin: plugin.to_string(),
    }))
    .await?;

    let reason = match conn.recv::<Response>().await? {
        Some(Response::Accept(Accept { protocol_version }))
            if protocol_version == handshake.protocol_version =>
        {
            debug!(plugin, protocol_version, "handshake accepted");
            return Ok(());
        }
        Some(Response::Accept(Accept { protocol_version })) => format!(
            "protocol version mismatch: host speaks {}, plugin speaks {protocol_version}",
            handshake.protocol_version
        ),
        Some(Response::Reject(Reject { reason })) => reason,
        Some(other) => format!("unexpected `{}` frame during handshake", other.kind()),
        None => "plugin closed the connection during handshake".to_string(),
    };

    warn!(plugin, %reason, "handshake failed");
    Err(VirtmonError::Handshake { reason })
}

/// Plugin side: validate the host's [`Hello`] and select the capability set.
///
/// Any mismatch is answered with a [`Reject`] and reported as an error; the
/// connection must not be used afterwards.
pub async fn accept(
    conn: &mut Connection,
    handshake: &HandshakeConfig,
    table: &DispatchTable,
) -> Result<Arc<dyn BridgePlugin>, VirtmonError> {
    let hello = match conn.recv::<Request>().await? {
        Some(Request::Hello(hello)) => hello,
        Some(other) => {
            return reject(
                conn,
                format!("expected hello, got `{}` frame", other.kind()),
            )
            .await;
        }
        None => {
            return Err(VirtmonError::Handshake {
                reason: "host closed the connection before the handshake".to_string(),
            });
        }
    };

    if hello.magic_cookie_key != handshake.magic_cookie_key
        || hello.magic_cookie_value != handshake.magic_cookie_value
    {
        return reject(conn, "magic cookie mismatch".to_string()).await;
    }

    if hello.protocol_version != handshake.protocol_version {
        return reject(
            conn,
            format!(
                "protocol version mismatch: host speaks {}, plugin speaks {}",
                hello.protocol_version, handshake.protocol_version
            ),
        )
        .await;
    }

    let plugin = match table.get(&hello.plugin) {
        Ok(plugin) => plugin,
        Err(err) => return reject(conn, err.to_string()).await,
    };

    conn.send(&Response::Accept(Accept {
        protocol_version: handshake.protocol_version,
    }))
    .await?;
    debug!(plugin = %hello.plugin, "handshake completed");
    Ok(plugin)
}

async fn reject<T>(conn: &mut Connection, reason: String) -> Result<T, VirtmonError> {
    warn!(%reason, "rejecting host connection");
    if let Err(err) = conn
        .send(&Response::Reject(Reject {
            reason: reason.clone(),
        }))
        .await
    {
        debug!(error = %err, "could not deliver handshake rejection");
    }
    Err(VirtmonError::Handshake { reason })
}
