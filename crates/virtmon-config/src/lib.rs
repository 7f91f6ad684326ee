// SPDX-FileCopyrightText: 2026 Virtmon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the virtmon driver bridge.
//!
//! Provides TOML configuration parsing with strict validation
//! (`deny_unknown_fields`), XDG file hierarchy lookup, `VIRTMON_*`
//! environment overrides, and miette diagnostics with typo suggestions.
//!
//! # Usage
//!
//! ```no_run
//! use virtmon_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("protocol version: {}", config.handshake.protocol_version);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::{ConfigError, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{BridgeConfig, HandshakeConfig, LoggingConfig, VirtmonConfig};

/// Load the standard hierarchy plus environment overrides and validate it.
///
/// Returns either a valid `VirtmonConfig` or every diagnostic found.
pub fn load_and_validate() -> Result<VirtmonConfig, Vec<ConfigError>> {
    checked(loader::load_config(), || read_sources(loader::config_paths()))
}

/// Like [`load_and_validate`], with one explicit file in place of the
/// standard hierarchy.
pub fn load_and_validate_path(path: &std::path::Path) -> Result<VirtmonConfig, Vec<ConfigError>> {
    checked(loader::load_config_from_path(path), || {
        read_sources([path.to_path_buf()])
    })
}

/// Validate configuration given as TOML text, without files or environment.
pub fn load_and_validate_str(toml_content: &str) -> Result<VirtmonConfig, Vec<ConfigError>> {
    checked(loader::load_config_from_str(toml_content), || {
        vec![("<inline>".to_string(), toml_content.to_string())]
    })
}

/// Validate a loaded config, or turn the load failure into diagnostics.
///
/// Source files are only read when there is an error to point into.
fn checked(
    loaded: Result<VirtmonConfig, figment::Error>,
    sources: impl FnOnce() -> Vec<(String, String)>,
) -> Result<VirtmonConfig, Vec<ConfigError>> {
    let config =
        loaded.map_err(|err| diagnostic::figment_to_config_errors(err, &sources()))?;
    validation::validate_config(&config)?;
    Ok(config)
}

/// Read the given files, keyed the way figment reports their origin.
fn read_sources(paths: impl IntoIterator<Item = std::path::PathBuf>) -> Vec<(String, String)> {
    let sources: Vec<(String, String)> = paths
        .into_iter()
        .filter_map(|path| {
            let content = std::fs::read_to_string(&path).ok()?;
            let path = if path.is_relative() {
                std::env::current_dir().map(|dir| dir.join(&path)).unwrap_or(path)
            } else {
                path
            };
            Some((path.display().to_string(), content))
        })
        .collect();
    tracing::debug!(files = sources.len(), "read config sources for diagnostics");
    sources
}
