// SPDX-FileCopyrightText: 2026 Virtmon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON reports printed by the CLI.

use serde::Serialize;
use virtmon_core::{CollectRequest, Driver, VirtmonError};
use virtmon_plugin::wire;

#[derive(Debug, Serialize)]
pub struct ProbeReport {
    pub detected: bool,
    /// Empty when the driver could not tell.
    pub hypervisor: String,
}

impl ProbeReport {
    pub async fn gather(driver: &dyn Driver) -> Self {
        Self {
            detected: driver.detect().await,
            hypervisor: driver.name().await.0,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CollectReport {
    pub hypervisor: String,
    pub requested: wire::CollectRequest,
    /// Sorted by domain id.
    pub domains: Vec<wire::Domain>,
}

impl CollectReport {
    pub async fn gather(driver: &dyn Driver, request: CollectRequest) -> Result<Self, VirtmonError> {
        let hypervisor = driver.name().await.0;
        let collected = driver.collect(request).await?;

        let mut domains: Vec<wire::Domain> = collected.into_values().map(wire::Domain::from).collect();
        domains.sort_by(|a, b| a.id.cmp(&b.id));

        Ok(Self {
            hypervisor,
            requested: request.into(),
            domains,
        })
    }
}
