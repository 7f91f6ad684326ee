// SPDX-FileCopyrightText: 2026 Virtmon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dispatch table mapping capability-set names to their adaptor pairs.
//!
//! The table is built once at process start and never mutated. The host
//! consults it to dispense a client adaptor after the handshake; the plugin
//! process consults it to select the server adaptor the host asked for.
//! Adding a capability set means registering a new name; existing entries
//! are never touched.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use virtmon_core::{Driver, VirtmonError};

use crate::client::DriverClient;
use crate::options::BridgeOptions;
use crate::server::DriverServer;
use crate::transport::Connection;

/// Name under which the driver capability set is published.
pub const DRIVER_PLUGIN: &str = "driver_grpc";

/// One capability set, exposed over a plugin connection.
///
/// `serve` runs inside the plugin process; `client` runs inside the host and
/// returns an adaptor that behaves like an in-process [`Driver`].
#[async_trait]
pub trait BridgePlugin: Send + Sync + 'static {
    /// Serve capability calls on an established connection until the host
    /// closes the handle or disconnects.
    async fn serve(&self, conn: Connection, options: &BridgeOptions) -> Result<(), VirtmonError>;

    /// Wrap an established connection in a host-side adaptor.
    fn client(
        &self,
        conn: Connection,
        options: &BridgeOptions,
    ) -> Result<Box<dyn Driver>, VirtmonError>;
}

/// The driver capability set (`Detect`, `Name`, `Collect`, `Close`).
pub struct DriverPlugin {
    driver: Option<Arc<dyn Driver>>,
}

impl DriverPlugin {
    /// Host-side entry: dispenses clients, cannot serve.
    pub fn host() -> Self {
        Self { driver: None }
    }

    /// Plugin-side entry serving the given driver implementation.
    pub fn serving<D: Driver>(driver: D) -> Self {
        Self {
            driver: Some(Arc::new(driver)),
        }
    }
}

impl std::fmt::Debug for DriverPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverPlugin")
            .field("serving", &self.driver.is_some())
            .finish()
    }
}

#[async_trait]
impl BridgePlugin for DriverPlugin {
    async fn serve(&self, conn: Connection, options: &BridgeOptions) -> Result<(), VirtmonError> {
        let driver = self.driver.clone().ok_or_else(|| {
            VirtmonError::Internal("driver plugin has no implementation to serve".to_string())
        })?;
        DriverServer::new(driver, options).run(conn).await
    }

    fn client(
        &self,
        conn: Connection,
        options: &BridgeOptions,
    ) -> Result<Box<dyn Driver>, VirtmonError> {
        Ok(Box::new(DriverClient::new(conn, options)))
    }
}

/// Immutable map from capability-set name to its plugin.
#[derive(Clone, Default)]
pub struct DispatchTable {
    entries: BTreeMap<String, Arc<dyn BridgePlugin>>,
}

impl DispatchTable {
    pub fn builder() -> DispatchTableBuilder {
        DispatchTableBuilder::default()
    }

    /// The standard host table: every published capability set, client side.
    pub fn host() -> Self {
        let mut entries: BTreeMap<String, Arc<dyn BridgePlugin>> = BTreeMap::new();
        entries.insert(DRIVER_PLUGIN.to_string(), Arc::new(DriverPlugin::host()));
        Self { entries }
    }

    /// The standard plugin-process table serving one driver.
    pub fn serving<D: Driver>(driver: D) -> Self {
        let mut entries: BTreeMap<String, Arc<dyn BridgePlugin>> = BTreeMap::new();
        entries.insert(
            DRIVER_PLUGIN.to_string(),
            Arc::new(DriverPlugin::serving(driver)),
        );
        Self { entries }
    }

    /// Look up a capability set by name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn BridgePlugin>, VirtmonError> {
        self.entries
            .get(name)
            .cloned()
            .ok_or_else(|| VirtmonError::PluginNotFound {
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Collects registrations and freezes them into a [`DispatchTable`].
#[derive(Default)]
pub struct DispatchTableBuilder {
    entries: Vec<(String, Arc<dyn BridgePlugin>)>,
}

impl DispatchTableBuilder {
    pub fn register(mut self, name: impl Into<String>, plugin: impl BridgePlugin) -> Self {
        self.entries.push((name.into(), Arc::new(plugin)));
        self
    }

    /// Freeze the table. Registering the same name twice is an error.
    pub fn build(self) -> Result<DispatchTable, VirtmonError> {
        let mut entries = BTreeMap::new();
        for (name, plugin) in self.entries {
            if name.trim().is_empty() {
                return Err(VirtmonError::Config(
                    "capability-set name must not be empty".to_string(),
                ));
            }
            if entries.insert(name.clone(), plugin).is_some() {
                return Err(VirtmonError::Config(format!(
                    "capability set `{name}` is registered more than once"
                )));
            }
        }
        Ok(DispatchTable { entries })
    }
}
