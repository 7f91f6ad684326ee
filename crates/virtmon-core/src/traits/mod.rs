// SPDX-FileCopyrightText: 2026 Virtmon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capability traits shared by in-process drivers and remote plugin adaptors.
//!
//! Traits use `#[async_trait]` so they stay usable as `dyn` objects.

pub mod driver;

pub use driver::Driver;
