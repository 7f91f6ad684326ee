// SPDX-FileCopyrightText: 2026 Virtmon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire schema for capability calls.
//!
//! Every frame on a plugin connection is one [`Request`] (host to plugin) or
//! one [`Response`] (plugin to host). `Collect` is answered by zero or more
//! [`Response::Domain`] frames terminated by [`Response::EndOfStream`], or by a
//! single [`Response::Error`] sent before any domain.
//!
//! Conversions between the host model in `virtmon_core` and these messages
//! are plain `From` impls, so there is no runtime cast that can fail.

use serde::{Deserialize, Serialize};
use virtmon_core::types::{CpuStats, DiskStats, NetworkStats};
use virtmon_core::{StatusCode, VirtmonError};

/// Zero-field message for parameterless calls and acknowledgements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Empty {}

/// Statistic categories requested by a `Collect` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectRequest {
    #[serde(default)]
    pub cpu: bool,
    #[serde(default)]
    pub disk: bool,
    #[serde(default)]
    pub network: bool,
}

impl From<virtmon_core::CollectRequest> for CollectRequest {
    fn from(request: virtmon_core::CollectRequest) -> Self {
        Self {
            cpu: request.cpu,
            disk: request.disk,
            network: request.network,
        }
    }
}

impl From<CollectRequest> for virtmon_core::CollectRequest {
    fn from(request: CollectRequest) -> Self {
        Self::new(request.cpu, request.disk, request.network)
    }
}

/// One domain of a `Collect` stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_stats: Option<CpuStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_stats: Option<Vec<DiskStats>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_stats: Option<Vec<NetworkStats>>,
}

impl Domain {
    /// Translate a collected domain, keeping only the requested categories.
    pub fn from_collected(
        mut domain: virtmon_core::Domain,
        request: &virtmon_core::CollectRequest,
    ) -> Self {
        domain.retain_requested(request);
        Self::from(domain)
    }
}

impl From<virtmon_core::Domain> for Domain {
    fn from(domain: virtmon_core::Domain) -> Self {
        Self {
            id: domain.id.0,
            name: domain.name,
            cpu_stats: domain.cpu,
            disk_stats: domain.disks,
            network_stats: domain.interfaces,
        }
    }
}

impl From<Domain> for virtmon_core::Domain {
    fn from(domain: Domain) -> Self {
        Self {
            id: virtmon_core::DomainId(domain.id),
            name: domain.name,
            cpu: domain.cpu_stats,
            disks: domain.disk_stats,
            interfaces: domain.network_stats,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameResponse {
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectResponse {
    pub is_hypervisor: bool,
}

/// Error reported by the remote side in place of a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub code: StatusCode,
    pub message: String,
}

impl Status {
    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn into_error(self) -> VirtmonError {
        VirtmonError::from_status(self.code, self.message)
    }
}

impl From<&VirtmonError> for Status {
    fn from(err: &VirtmonError) -> Self {
        Self::new(err.status_code(), err.status_message())
    }
}

/// First frame of every connection, sent by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hello {
    pub protocol_version: u32,
    pub magic_cookie_key: String,
    pub magic_cookie_value: String,
    /// Capability-set name the host wants to use on this connection.
    pub plugin: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accept {
    pub protocol_version: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reject {
    pub reason: String,
}

/// Host-to-plugin frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "body", rename_all = "snake_case")]
pub enum Request {
    Hello(Hello),
    Collect(CollectRequest),
    Name(Empty),
    Detect(Empty),
    Close(Empty),
}

impl Request {
    pub fn kind(&self) -> &'static str {
        match self {
            Request::Hello(_) => "hello",
            Request::Collect(_) => "collect",
            Request::Name(_) => "name",
            Request::Detect(_) => "detect",
            Request::Close(_) => "close",
        }
    }
}

/// Plugin-to-host frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "body", rename_all = "snake_case")]
pub enum Response {
    Accept(Accept),
    Reject(Reject),
    Name(NameResponse),
    Detect(DetectResponse),
    Close(Empty),
    Domain(Domain),
    /// Terminates a successful `Collect` stream.
    EndOfStream,
    Error(Status),
}

impl Response {
    pub fn kind(&self) -> &'static str {
        match self {
            Response::Accept(_) => "accept",
            Response::Reject(_) => "reject",
            Response::Name(_) => "name",
            Response::Detect(_) => "detect",
            Response::Close(_) => "close",
            Response::Domain(_) => "domain",
            Response::EndOfStream => "end_of_stream",
            Response::Error(_) => "error",
        }
    }
}
