// SPDX-FileCopyrightText: 2026 Virtmon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin binary serving a [`MockDriver`] over stdio.
//!
//! `VIRTMON_MOCK_FAIL=<message>` makes every collection fail with that
//! message; `VIRTMON_MOCK_NAME` overrides the hypervisor tag.

use virtmon_plugin::{BridgeOptions, DispatchTable, init_plugin_tracing, serve_stdio};
use virtmon_test_utils::{MockDriver, sample_domains};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let config = match virtmon_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            virtmon_config::render_errors(&errors);
            std::process::exit(2);
        }
    };
    init_plugin_tracing(&config.logging.level);

    let mut driver = MockDriver::with_domains(sample_domains());
    if let Ok(name) = std::env::var("VIRTMON_MOCK_NAME") {
        driver = driver.named(name);
    }
    if let Ok(message) = std::env::var("VIRTMON_MOCK_FAIL") {
        driver.fail_with(message).await;
    }

    let options = BridgeOptions::from_config(&config);
    if let Err(err) = serve_stdio(&options, &DispatchTable::serving(driver)).await {
        eprintln!("virtmon-mock-plugin: {err}");
        std::process::exit(1);
    }
}
