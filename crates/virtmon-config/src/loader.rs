// SPDX-FileCopyrightText: 2026 Virtmon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration loading.
//!
//! Later layers override earlier ones:
//! 1. compiled defaults
//! 2. `/etc/virtmon/virtmon.toml`
//! 3. `$XDG_CONFIG_HOME/virtmon/virtmon.toml`
//! 4. `./virtmon.toml`
//! 5. `VIRTMON_<SECTION>_<KEY>` environment variables

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::VirtmonConfig;

/// Top-level tables that environment variables may target.
const SECTIONS: [&str; 3] = ["handshake", "bridge", "logging"];

/// Config files of the standard hierarchy, lowest precedence first.
///
/// Files that do not exist are skipped by the loader.
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("/etc/virtmon/virtmon.toml")];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("virtmon").join("virtmon.toml"));
    }
    paths.push(PathBuf::from("virtmon.toml"));
    paths
}

/// Load the standard hierarchy plus environment overrides.
pub fn load_config() -> Result<VirtmonConfig, figment::Error> {
    build_figment().extract()
}

/// Load defaults overlaid with `toml_content` only; files and environment
/// are ignored.
pub fn load_config_from_str(toml_content: &str) -> Result<VirtmonConfig, figment::Error> {
    defaults().merge(Toml::string(toml_content)).extract()
}

/// Load defaults, one explicit file, then environment overrides.
pub fn load_config_from_path(path: &Path) -> Result<VirtmonConfig, figment::Error> {
    defaults()
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The figment behind [`load_config`], before extraction.
pub fn build_figment() -> Figment {
    config_paths()
        .into_iter()
        .fold(defaults(), |figment, path| figment.merge(Toml::file(path)))
        .merge(env_provider())
}

fn defaults() -> Figment {
    Figment::from(Serialized::defaults(VirtmonConfig::default()))
}

/// `VIRTMON_BRIDGE_PROBE_TIMEOUT_MS` becomes `bridge.probe_timeout_ms`.
///
/// Only the first underscore after the section name is a separator, since
/// key names contain underscores themselves. Variables that do not start
/// with a known section are ignored.
fn env_provider() -> Env {
    Env::prefixed("VIRTMON_")
        .filter(|key| env_key(key.as_str()).is_some())
        .map(|key| {
            env_key(key.as_str())
                .unwrap_or_else(|| key.as_str().to_string())
                .into()
        })
}

fn env_key(key: &str) -> Option<String> {
    let key = key.to_ascii_lowercase();
    SECTIONS.iter().find_map(|section| {
        key.strip_prefix(section)?
            .strip_prefix('_')
            .map(|field| format!("{section}.{field}"))
    })
}
