// SPDX-FileCopyrightText: 2026 Virtmon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Launcher tests against a real plugin process.

use std::time::Duration;

use tokio::process::Command;
use virtmon_core::{CollectRequest, DomainId, VirtmonError};
use virtmon_plugin::{BridgeOptions, DispatchTable, launch};
use virtmon_test_utils::sample_domains;

const MOCK_PLUGIN: &str = env!("CARGO_BIN_EXE_virtmon-mock-plugin");

fn plugin_command() -> Command {
    let mut command = Command::new(MOCK_PLUGIN);
    command.env_remove("VIRTMON_MOCK_FAIL").env_remove("VIRTMON_MOCK_NAME");
    command
}

#[tokio::test]
async fn launched_plugin_answers_every_capability() {
    let mut command = plugin_command();
    command.env("VIRTMON_MOCK_NAME", "kvm");
    let process = launch(command, &BridgeOptions::default(), &DispatchTable::host())
        .await
        .expect("plugin should start");
    assert!(process.id().is_some());

    let driver = process.driver();
    assert!(driver.detect().await);
    assert_eq!(driver.name().await.as_str(), "kvm");

    let domains = driver
        .collect(CollectRequest::new(true, false, true))
        .await
        .unwrap();
    assert_eq!(domains.len(), sample_domains().len());
    let web = &domains[&DomainId::from("1")];
    assert_eq!(web.name, "web-01");
    assert!(web.cpu.is_some());
    assert!(web.disks.is_none());
    assert!(web.interfaces.is_some());

    let status = process.shutdown().await;
    assert!(status.is_some_and(|status| status.success()));
}

#[tokio::test]
async fn driver_failure_crosses_the_process_boundary() {
    let mut command = plugin_command();
    command.env("VIRTMON_MOCK_FAIL", "hypervisor API unreachable");
    let process = launch(command, &BridgeOptions::default(), &DispatchTable::host())
        .await
        .unwrap();

    let err = process
        .driver()
        .collect(CollectRequest::all())
        .await
        .unwrap_err();
    assert!(matches!(err, VirtmonError::Driver { .. }));
    assert_eq!(err.to_string(), "driver error: hypervisor API unreachable");

    // The connection survives a reported driver failure.
    assert!(process.driver().detect().await);
    process.shutdown().await;
}

#[tokio::test]
async fn mismatched_protocol_version_fails_to_launch() {
    let mut options = BridgeOptions::default();
    options.handshake.protocol_version = 2;

    // The plugin reads its own configuration, which stays at version 1.
    let err = launch(plugin_command(), &options, &DispatchTable::host())
        .await
        .unwrap_err();
    assert!(matches!(err, VirtmonError::Handshake { .. }), "got {err:?}");
}

#[tokio::test]
async fn plugin_refuses_to_run_without_the_cookie() {
    let output = tokio::time::timeout(
        Duration::from_secs(10),
        Command::new(MOCK_PLUGIN)
            .env_remove("virtmon")
            .stdin(std::process::Stdio::null())
            .output(),
    )
    .await
    .unwrap()
    .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("virtmon host"));
}
