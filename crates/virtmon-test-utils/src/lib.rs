// SPDX-FileCopyrightText: 2026 Virtmon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for virtmon integration tests.
//!
//! Provides a mock driver and a bridge harness for fast, deterministic tests
//! without a real hypervisor or a separate plugin process.
//!
//! # Components
//!
//! - [`MockDriver`] - Mock driver with configurable domains and failure mode
//! - [`BridgeHarness`] - Host and plugin adaptors connected in-process
//!
//! The `virtmon-mock-plugin` binary serves a [`MockDriver`] over stdio for
//! tests that exercise the process launcher.

pub mod harness;
pub mod mock_driver;

pub use harness::{BridgeHarness, BridgeHarnessBuilder};
pub use mock_driver::{MockDriver, sample_domains};
