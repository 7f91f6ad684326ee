// SPDX-FileCopyrightText: 2026 Virtmon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain statistics model shared by drivers and the plugin bridge.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Opaque identifier of one virtual machine or container domain.
///
/// Stable for the lifetime of the domain and unique within one driver instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DomainId(pub String);

impl DomainId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DomainId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Short tag naming the hypervisor technology a driver speaks for ("kvm", "esxi").
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DomainHypervisor(pub String);

impl DomainHypervisor {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// The tag returned when the hypervisor name could not be determined.
    pub fn unknown() -> Self {
        Self(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for DomainHypervisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Selects which statistic categories a `collect` call should gather.
///
/// The flags are independent; any subset is valid, including none.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollectRequest {
    pub cpu: bool,
    pub disk: bool,
    pub network: bool,
}

impl CollectRequest {
    pub fn new(cpu: bool, disk: bool, network: bool) -> Self {
        Self { cpu, disk, network }
    }

    /// Request every statistic category.
    pub fn all() -> Self {
        Self::new(true, true, true)
    }

    /// Request no statistic category; domains are listed by identity only.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        !(self.cpu || self.disk || self.network)
    }
}

/// Aggregate CPU counters for one domain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuStats {
    /// Number of virtual CPUs assigned to the domain.
    pub vcpus: u32,
    /// Total CPU time consumed, in nanoseconds.
    pub cpu_time_ns: u64,
    pub user_time_ns: u64,
    pub system_time_ns: u64,
}

/// Counters for one block device attached to a domain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskStats {
    /// Device name as seen by the hypervisor, e.g. `vda` or `scsi0:0`.
    pub device: String,
    pub read_bytes: u64,
    pub write_bytes: u64,
    pub read_ops: u64,
    pub write_ops: u64,
    pub errors: u64,
}

/// Counters for one network interface attached to a domain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkStats {
    pub interface: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    pub rx_packets: u64,
    pub tx_packets: u64,
    pub rx_errors: u64,
    pub tx_errors: u64,
    pub rx_drops: u64,
    pub tx_drops: u64,
}

/// One monitored domain and the statistics gathered for it.
///
/// Each category is present only when it was requested. A fresh value is
/// produced on every collection and owned by the caller once returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Domain {
    pub id: DomainId,
    pub name: String,
    pub cpu: Option<CpuStats>,
    pub disks: Option<Vec<DiskStats>>,
    pub interfaces: Option<Vec<NetworkStats>>,
}

impl Domain {
    /// Create a domain with no statistics attached.
    pub fn new(id: impl Into<DomainId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            cpu: None,
            disks: None,
            interfaces: None,
        }
    }

    pub fn with_cpu(mut self, cpu: CpuStats) -> Self {
        self.cpu = Some(cpu);
        self
    }

    pub fn with_disks(mut self, disks: Vec<DiskStats>) -> Self {
        self.disks = Some(disks);
        self
    }

    pub fn with_interfaces(mut self, interfaces: Vec<NetworkStats>) -> Self {
        self.interfaces = Some(interfaces);
        self
    }

    /// Drop every statistic category that `request` did not ask for.
    pub fn retain_requested(&mut self, request: &CollectRequest) {
        if !request.cpu {
            self.cpu = None;
        }
        if !request.disk {
            self.disks = None;
        }
        if !request.network {
            self.interfaces = None;
        }
    }
}

impl From<String> for DomainId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// The result of one collection, keyed by domain identity.
pub type DomainMap = HashMap<DomainId, Domain>;

/// Status code attached to an error that crosses the process boundary.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StatusCode {
    /// The driver itself failed; the message is the driver's own.
    Driver,
    /// A value could not be translated to or from the wire schema.
    Schema,
    /// The peer sent a frame that is not valid in the current session state.
    InvalidRequest,
    /// Any other failure on the remote side.
    Internal,
}
