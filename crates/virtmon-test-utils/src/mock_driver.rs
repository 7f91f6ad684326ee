// SPDX-FileCopyrightText: 2026 Virtmon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock hypervisor driver for deterministic testing.
//!
//! `MockDriver` implements `Driver` over a fixed set of domains. Clones share
//! state, so a test can hand one clone to a server adaptor and keep another
//! to inspect call counts or change behavior mid-test.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use virtmon_core::{
    CollectRequest, CpuStats, DiskStats, Domain, DomainHypervisor, DomainMap, Driver,
    NetworkStats, VirtmonError,
};

/// A driver that returns pre-configured domains.
///
/// Every category is always returned regardless of the request, like a
/// careless driver would; masking is the adaptor's job.
#[derive(Clone)]
pub struct MockDriver {
    inner: Arc<Inner>,
}

struct Inner {
    domains: Mutex<Vec<Domain>>,
    failure: Mutex<Option<String>>,
    detected: bool,
    name: DomainHypervisor,
    last_request: Mutex<Option<CollectRequest>>,
    collect_calls: AtomicUsize,
    close_calls: AtomicUsize,
    closed: Notify,
}

impl MockDriver {
    /// Create a detecting driver named `mock` with no domains.
    pub fn new() -> Self {
        Self::build(Vec::new(), true, DomainHypervisor::new("mock"))
    }

    /// Create a driver serving the given domains.
    pub fn with_domains(domains: Vec<Domain>) -> Self {
        Self::build(domains, true, DomainHypervisor::new("mock"))
    }

    /// Same state, reporting a different hypervisor tag.
    pub fn named(self, name: impl Into<String>) -> Self {
        let domains = self.snapshot_domains();
        Self::build(domains, self.inner.detected, DomainHypervisor::new(name))
    }

    /// Same state, with a different detection result.
    pub fn detecting(self, detected: bool) -> Self {
        let domains = self.snapshot_domains();
        Self::build(domains, detected, self.inner.name.clone())
    }

    fn build(domains: Vec<Domain>, detected: bool, name: DomainHypervisor) -> Self {
        Self {
            inner: Arc::new(Inner {
                domains: Mutex::new(domains),
                failure: Mutex::new(None),
                detected,
                name,
                last_request: Mutex::new(None),
                collect_calls: AtomicUsize::new(0),
                close_calls: AtomicUsize::new(0),
                closed: Notify::new(),
            }),
        }
    }

    fn snapshot_domains(&self) -> Vec<Domain> {
        self.inner
            .domains
            .try_lock()
            .map(|domains| domains.clone())
            .unwrap_or_default()
    }

    /// Make every following `collect` fail with `message`.
    pub async fn fail_with(&self, message: impl Into<String>) {
        *self.inner.failure.lock().await = Some(message.into());
    }

    /// Stop failing.
    pub async fn recover(&self) {
        *self.inner.failure.lock().await = None;
    }

    /// Replace the domain set.
    pub async fn set_domains(&self, domains: Vec<Domain>) {
        *self.inner.domains.lock().await = domains;
    }

    /// Request passed to the most recent `collect`.
    pub async fn last_request(&self) -> Option<CollectRequest> {
        *self.inner.last_request.lock().await
    }

    pub fn collect_calls(&self) -> usize {
        self.inner.collect_calls.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> usize {
        self.inner.close_calls.load(Ordering::SeqCst)
    }

    /// Wait until `close` has been called at least once.
    pub async fn wait_closed(&self) {
        let notified = self.inner.closed.notified();
        if self.close_calls() > 0 {
            return;
        }
        notified.await;
    }
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Driver for MockDriver {
    async fn detect(&self) -> bool {
        self.inner.detected
    }

    async fn name(&self) -> DomainHypervisor {
        self.inner.name.clone()
    }

    async fn collect(&self, request: CollectRequest) -> Result<DomainMap, VirtmonError> {
        self.inner.collect_calls.fetch_add(1, Ordering::SeqCst);
        *self.inner.last_request.lock().await = Some(request);

        if let Some(message) = self.inner.failure.lock().await.clone() {
            return Err(VirtmonError::driver(message));
        }

        let domains = self.inner.domains.lock().await;
        Ok(domains
            .iter()
            .map(|domain| (domain.id.clone(), domain.clone()))
            .collect())
    }

    async fn close(&self) {
        self.inner.close_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.closed.notify_waiters();
    }
}

/// Two fully populated domains, useful as a default fleet.
pub fn sample_domains() -> Vec<Domain> {
    vec![
        Domain::new("1", "web-01")
            .with_cpu(CpuStats {
                vcpus: 2,
                cpu_time_ns: 9_000_000,
                user_time_ns: 6_000_000,
                system_time_ns: 3_000_000,
            })
            .with_disks(vec![DiskStats {
                device: "vda".into(),
                read_bytes: 4096,
                write_bytes: 8192,
                read_ops: 1,
                write_ops: 2,
                errors: 0,
            }])
            .with_interfaces(vec![NetworkStats {
                interface: "vnet0".into(),
                mac: Some("52:54:00:aa:bb:01".into()),
                rx_bytes: 1500,
                tx_bytes: 900,
                rx_packets: 3,
                tx_packets: 2,
                ..Default::default()
            }]),
        Domain::new("2", "db-01")
            .with_cpu(CpuStats {
                vcpus: 8,
                cpu_time_ns: 42_000_000,
                user_time_ns: 30_000_000,
                system_time_ns: 12_000_000,
            })
            .with_disks(vec![
                DiskStats {
                    device: "vda".into(),
                    read_bytes: 1 << 20,
                    ..Default::default()
                },
                DiskStats {
                    device: "vdb".into(),
                    write_bytes: 1 << 30,
                    errors: 1,
                    ..Default::default()
                },
            ])
            .with_interfaces(Vec::new()),
    ]
}
