// SPDX-FileCopyrightText: 2026 Virtmon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Out-of-process driver bridge for virtmon.
//!
//! A driver runs in its own process and is reached through a framed
//! connection on the child's stdio. The host never sees the bridge: it gets
//! a `Box<dyn Driver>` that behaves exactly like an in-process driver.
//!
//! Host side: [`launch`] a plugin binary (or [`connect`] an existing
//! connection) with [`DispatchTable::host`]. Plugin side: call
//! [`serve_stdio`] with [`DispatchTable::serving`].

pub mod client;
pub mod dispatch;
pub mod handshake;
pub mod launcher;
pub mod options;
pub mod serve;
pub mod server;
pub mod transport;
pub mod wire;

pub use client::DriverClient;
pub use dispatch::{BridgePlugin, DRIVER_PLUGIN, DispatchTable, DispatchTableBuilder, DriverPlugin};
pub use launcher::{PluginProcess, connect, launch};
pub use options::BridgeOptions;
pub use serve::{init_plugin_tracing, serve_connection, serve_stdio};
pub use server::DriverServer;
pub use transport::Connection;
