// SPDX-FileCopyrightText: 2026 Virtmon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the driver bridge.
//!
//! Each test connects a host-side client and a plugin-side server through a
//! `BridgeHarness`. Tests are independent and order-insensitive.

use std::time::Duration;

use proptest::prelude::*;
use virtmon_core::{CollectRequest, DomainMap, VirtmonError};
use virtmon_plugin::BridgeOptions;
use virtmon_test_utils::{BridgeHarness, MockDriver, sample_domains};

fn expected(request: CollectRequest) -> DomainMap {
    sample_domains()
        .into_iter()
        .map(|mut domain| {
            domain.retain_requested(&request);
            (domain.id.clone(), domain)
        })
        .collect()
}

// ---- Round trip ----

#[tokio::test]
async fn test_collect_round_trip_matches_the_driver() {
    let harness = BridgeHarness::start(MockDriver::with_domains(sample_domains()))
        .await
        .unwrap();

    let domains = harness.client().collect(CollectRequest::all()).await.unwrap();
    assert_eq!(domains, expected(CollectRequest::all()));
    assert_eq!(harness.mock().last_request().await, Some(CollectRequest::all()));

    harness.finish().await.unwrap();
}

#[tokio::test]
async fn test_collect_returns_only_requested_categories() {
    let harness = BridgeHarness::start(MockDriver::with_domains(sample_domains()))
        .await
        .unwrap();

    let request = CollectRequest::new(false, true, false);
    let domains = harness.client().collect(request).await.unwrap();
    assert_eq!(domains, expected(request));
    for domain in domains.values() {
        assert!(domain.cpu.is_none());
        assert!(domain.disks.is_some());
        assert!(domain.interfaces.is_none());
    }

    harness.finish().await.unwrap();
}

#[tokio::test]
async fn test_cpu_only_request_against_cpu_only_plugin() {
    let domains = ["10", "11"]
        .map(|id| {
            virtmon_core::Domain::new(id, format!("vm-{id}")).with_cpu(virtmon_core::CpuStats {
                vcpus: 1,
                cpu_time_ns: 500,
                ..Default::default()
            })
        })
        .to_vec();
    let harness = BridgeHarness::start(MockDriver::with_domains(domains))
        .await
        .unwrap();

    let collected = harness
        .client()
        .collect(CollectRequest::new(true, false, false))
        .await
        .unwrap();
    assert_eq!(collected.len(), 2);
    for domain in collected.values() {
        assert_eq!(domain.cpu.as_ref().map(|cpu| cpu.vcpus), Some(1));
        assert!(domain.disks.is_none());
        assert!(domain.interfaces.is_none());
    }

    harness.finish().await.unwrap();
}

#[tokio::test]
async fn test_empty_fleet_yields_empty_map() {
    let harness = BridgeHarness::start(MockDriver::new()).await.unwrap();
    let domains = harness.client().collect(CollectRequest::all()).await.unwrap();
    assert!(domains.is_empty());
    harness.finish().await.unwrap();
}

#[tokio::test]
async fn test_detect_and_name_cross_the_bridge() {
    let driver = MockDriver::new().named("libvirt").detecting(true);
    let harness = BridgeHarness::start(driver).await.unwrap();

    assert!(harness.client().detect().await);
    assert_eq!(harness.client().name().await.as_str(), "libvirt");

    harness.finish().await.unwrap();
}

// ---- Failures ----

#[tokio::test]
async fn test_driver_failure_surfaces_as_error_without_map() {
    let driver = MockDriver::with_domains(sample_domains());
    driver.fail_with("hypervisor API unreachable").await;
    let harness = BridgeHarness::start(driver).await.unwrap();

    let err = harness
        .client()
        .collect(CollectRequest::all())
        .await
        .unwrap_err();
    assert!(matches!(err, VirtmonError::Driver { .. }));
    assert!(err.to_string().contains("hypervisor API unreachable"));

    // The handle stays usable once the driver recovers.
    harness.mock().recover().await;
    let domains = harness.client().collect(CollectRequest::all()).await.unwrap();
    assert_eq!(domains.len(), 2);

    harness.finish().await.unwrap();
}

#[tokio::test]
async fn test_version_mismatch_prevents_any_capability_call() {
    let driver = MockDriver::with_domains(sample_domains());
    let mut plugin = BridgeOptions::default();
    plugin.handshake.protocol_version = 2;

    let err = BridgeHarness::builder(driver.clone())
        .plugin_options(plugin)
        .start()
        .await
        .err()
        .expect("handshake should fail");
    assert!(matches!(err, VirtmonError::Handshake { .. }), "got {err:?}");
    assert_eq!(driver.collect_calls(), 0);
}

#[tokio::test]
async fn test_unknown_capability_set_is_not_dispensed() {
    let err = BridgeHarness::builder(MockDriver::new())
        .host_options(BridgeOptions::default().with_plugin("driver_v2"))
        .start()
        .await
        .err()
        .expect("dispatch should fail");
    assert!(matches!(err, VirtmonError::PluginNotFound { .. }), "got {err:?}");
}

// ---- Close ----

#[tokio::test]
async fn test_close_reaches_the_driver_and_is_idempotent() {
    let driver = MockDriver::with_domains(sample_domains());
    let harness = BridgeHarness::start(driver.clone()).await.unwrap();

    harness.client().close().await;
    harness.client().close().await;

    tokio::time::timeout(Duration::from_secs(5), driver.wait_closed())
        .await
        .expect("plugin should see close");
    assert_eq!(driver.close_calls(), 1);

    assert!(matches!(
        harness.client().collect(CollectRequest::all()).await,
        Err(VirtmonError::Closed)
    ));
    assert!(!harness.client().detect().await);
    assert!(harness.client().name().await.is_empty());

    harness.finish().await.unwrap();
    assert_eq!(driver.close_calls(), 1);
}

// ---- Concurrency ----

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_calls_are_serialized_safely() {
    let harness = BridgeHarness::start(MockDriver::with_domains(sample_domains()))
        .await
        .unwrap();
    let client = harness.client();

    let (a, b, c, d) = tokio::join!(
        client.collect(CollectRequest::all()),
        client.detect(),
        client.collect(CollectRequest::new(true, false, false)),
        client.name(),
    );
    assert_eq!(a.unwrap(), expected(CollectRequest::all()));
    assert!(b);
    assert_eq!(c.unwrap(), expected(CollectRequest::new(true, false, false)));
    assert_eq!(d.as_str(), "mock");

    harness.finish().await.unwrap();
}

// ---- Property: any flag subset ----

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_any_flag_subset_round_trips(cpu: bool, disk: bool, network: bool) {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap();
        let request = CollectRequest::new(cpu, disk, network);

        let domains = runtime.block_on(async move {
            let harness = BridgeHarness::start(MockDriver::with_domains(sample_domains()))
                .await
                .unwrap();
            let domains = harness.client().collect(request).await.unwrap();
            harness.finish().await.unwrap();
            domains
        });
        prop_assert_eq!(domains, expected(request));
    }
}
