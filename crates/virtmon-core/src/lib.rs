// SPDX-FileCopyrightText: 2026 Virtmon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the virtmon driver bridge.
//!
//! This crate provides the driver capability contract, the domain statistics
//! model, and the error type shared by in-process drivers and the
//! out-of-process plugin adaptors.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::VirtmonError;
pub use traits::Driver;
pub use types::{
    CollectRequest, CpuStats, DiskStats, Domain, DomainHypervisor, DomainId, DomainMap,
    NetworkStats, StatusCode,
};
