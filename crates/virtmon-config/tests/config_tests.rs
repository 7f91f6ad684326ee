// SPDX-FileCopyrightText: 2026 Virtmon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the virtmon configuration system.

use std::io::Write;

use virtmon_config::diagnostic::ConfigError;
use virtmon_config::{load_and_validate_path, load_and_validate_str, load_config_from_str};

/// Valid TOML with all known fields deserializes successfully.
#[test]
fn valid_toml_deserializes_into_virtmon_config() {
    let toml = r#"
[handshake]
protocol_version = 2
magic_cookie_key = "VIRTMON_PLUGIN"
magic_cookie_value = "s3cret"

[bridge]
plugin = "driver_grpc"
probe_timeout_ms = 1500
close_timeout_ms = 500
handshake_timeout_ms = 3000
max_frame_bytes = 65536

[logging]
level = "debug"
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.handshake.protocol_version, 2);
    assert_eq!(config.handshake.magic_cookie_key, "VIRTMON_PLUGIN");
    assert_eq!(config.handshake.magic_cookie_value, "s3cret");
    assert_eq!(config.bridge.plugin, "driver_grpc");
    assert_eq!(config.bridge.probe_timeout_ms, 1500);
    assert_eq!(config.bridge.close_timeout_ms, 500);
    assert_eq!(config.bridge.handshake_timeout_ms, 3000);
    assert_eq!(config.bridge.max_frame_bytes, 65536);
    assert_eq!(config.logging.level, "debug");
}

/// An empty document yields the compiled defaults.
#[test]
fn empty_toml_yields_defaults() {
    let config = load_and_validate_str("").expect("defaults should validate");
    assert_eq!(config.handshake.protocol_version, 1);
    assert_eq!(config.bridge.plugin, "driver_grpc");
    assert_eq!(config.logging.level, "info");
}

/// A misspelled key produces an UnknownKey diagnostic with a suggestion.
#[test]
fn unknown_key_produces_suggestion() {
    let toml = r#"
[bridge]
probe_timout_ms = 10
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject unknown field");
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        ConfigError::UnknownKey {
            key, suggestion, ..
        } => {
            assert_eq!(key, "probe_timout_ms");
            assert_eq!(suggestion.as_deref(), Some("probe_timeout_ms"));
        }
        other => panic!("expected UnknownKey, got {other:?}"),
    }
}

/// Unknown top-level section is rejected.
#[test]
fn unknown_section_is_rejected() {
    let toml = r#"
[plugins]
driver = true
"#;

    let errors = load_and_validate_str(toml).expect_err("unknown section should fail");
    assert!(matches!(errors[0], ConfigError::UnknownKey { .. }));
}

/// Wrong value type produces an InvalidType diagnostic.
#[test]
fn wrong_type_produces_invalid_type() {
    let toml = r#"
[handshake]
protocol_version = "one"
"#;

    let errors = load_and_validate_str(toml).expect_err("string version should fail");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { key, .. } if key.contains("protocol_version"))),
        "got: {errors:?}"
    );
}

/// Values that parse but violate semantic rules are reported by validation.
#[test]
fn semantic_errors_are_reported_after_parsing() {
    let toml = r#"
[handshake]
protocol_version = 0

[bridge]
probe_timeout_ms = 0
"#;

    let errors = load_and_validate_str(toml).expect_err("should fail validation");
    assert_eq!(errors.len(), 2, "got: {errors:?}");
    assert!(
        errors
            .iter()
            .all(|e| matches!(e, ConfigError::Validation { .. }))
    );
}

/// Loading from an explicit file path picks up the file's values.
#[test]
fn load_from_explicit_path() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[logging]\nlevel = \"warn\"").unwrap();

    let config = load_and_validate_path(file.path()).expect("file config should validate");
    assert_eq!(config.logging.level, "warn");
}

/// Unknown keys in an explicit file are reported with a suggestion.
#[test]
fn unknown_key_in_file_is_reported() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[bridge]\nplugn = \"driver_grpc\"").unwrap();

    let errors = load_and_validate_path(file.path()).expect_err("should reject unknown field");
    match &errors[0] {
        ConfigError::UnknownKey {
            key, suggestion, ..
        } => {
            assert_eq!(key, "plugn");
            assert_eq!(suggestion.as_deref(), Some("plugin"));
        }
        other => panic!("expected UnknownKey, got {other:?}"),
    }
}
