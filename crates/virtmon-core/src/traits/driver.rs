// SPDX-FileCopyrightText: 2026 Virtmon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The driver capability contract.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::VirtmonError;
use crate::types::{CollectRequest, DomainHypervisor, DomainMap};

/// Capability set every hypervisor driver provides, whether it runs
/// in-process or behind a plugin connection.
///
/// Only [`collect`](Driver::collect) can fail. The other operations absorb
/// and log their own failures so a misbehaving driver cannot fail the host.
#[async_trait]
pub trait Driver: Send + Sync + 'static {
    /// Probes whether this driver's hypervisor is present and usable.
    ///
    /// Must return within a bounded probe time and report `false` on any
    /// internal error.
    async fn detect(&self) -> bool;

    /// Returns the tag of the hypervisor this driver speaks for.
    async fn name(&self) -> DomainHypervisor;

    /// Gathers the requested statistic categories for every visible domain.
    ///
    /// On failure no partial mapping is returned.
    async fn collect(&self, request: CollectRequest) -> Result<DomainMap, VirtmonError>;

    /// Releases driver-held resources. Idempotent.
    async fn close(&self);
}

#[async_trait]
impl<D: Driver + ?Sized> Driver for Arc<D> {
    async fn detect(&self) -> bool {
        (**self).detect().await
    }

    async fn name(&self) -> DomainHypervisor {
        (**self).name().await
    }

    async fn collect(&self, request: CollectRequest) -> Result<DomainMap, VirtmonError> {
        (**self).collect(request).await
    }

    async fn close(&self) {
        (**self).close().await
    }
}

#[async_trait]
impl<D: Driver + ?Sized> Driver for Box<D> {
    async fn detect(&self) -> bool {
        (**self).detect().await
    }

    async fn name(&self) -> DomainHypervisor {
        (**self).name().await
    }

    async fn collect(&self, request: CollectRequest) -> Result<DomainMap, VirtmonError> {
        (**self).collect(request).await
    }

    async fn close(&self) {
        (**self).close().await
    }
}
