// SPDX-FileCopyrightText: 2026 Virtmon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration diagnostics.
//!
//! Turns figment failures into [`ConfigError`] values that miette can render
//! with the offending line highlighted and a "did you mean" hint for
//! misspelled keys.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use miette::{Diagnostic, GraphicalReportHandler, NamedSource, SourceSpan};
use thiserror::Error;

/// Jaro-Winkler score a known key must exceed to be offered as a fix.
const MIN_SIMILARITY: f64 = 0.75;

/// One problem found while loading or validating the configuration.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown key `{key}` in {}", section_label(section))]
    #[diagnostic(
        code(virtmon::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), known_keys))
    )]
    UnknownKey {
        key: String,
        /// Dotted section path; empty for the top level.
        section: String,
        suggestion: Option<String>,
        known_keys: Vec<String>,
        #[label("not a virtmon setting")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("`{key}` has the wrong type: {detail}")]
    #[diagnostic(code(virtmon::config::invalid_type), help("use a value of type {expected}"))]
    InvalidType {
        key: String,
        detail: String,
        expected: String,
    },

    #[error("`{key}` must be set")]
    #[diagnostic(code(virtmon::config::missing_key))]
    MissingKey { key: String },

    #[error("invalid setting: {message}")]
    #[diagnostic(code(virtmon::config::validation))]
    Validation { message: String },

    #[error("could not load configuration: {0}")]
    #[diagnostic(code(virtmon::config::load))]
    Other(String),
}

fn section_label(section: &str) -> String {
    if section.is_empty() {
        "the top level".to_string()
    } else {
        format!("[{section}]")
    }
}

fn unknown_key_help(suggestion: Option<&str>, known_keys: &[String]) -> String {
    let known = known_keys.join(", ");
    match suggestion {
        Some(key) => format!("did you mean `{key}`? known keys here: {known}"),
        None => format!("known keys here: {known}"),
    }
}

/// Translate every error carried by `err` into a [`ConfigError`].
///
/// `sources` pairs file names with their contents so unknown keys can be
/// pointed at in the file they came from.
pub fn figment_to_config_errors(
    err: figment::Error,
    sources: &[(String, String)],
) -> Vec<ConfigError> {
    use figment::error::Kind;

    let mut out = Vec::new();
    for error in err {
        let converted = match &error.kind {
            Kind::UnknownField(key, known) => {
                let section = error.path.join(".");
                let known_keys: Vec<String> = known.iter().map(|k| k.to_string()).collect();
                let (span, src) = match source_of(&error, sources) {
                    Some((name, content)) => match locate_key(content, &section, key) {
                        Some(offset) => (
                            Some(SourceSpan::new(offset.into(), key.len())),
                            Some(NamedSource::new(name, content.to_string())),
                        ),
                        None => (None, None),
                    },
                    None => (None, None),
                };
                ConfigError::UnknownKey {
                    key: key.clone(),
                    suggestion: closest_key(key, known).map(str::to_string),
                    section,
                    known_keys,
                    span,
                    src,
                }
            }
            Kind::MissingField(key) => ConfigError::MissingKey {
                key: qualified(&error.path, key),
            },
            Kind::InvalidType(found, expected) => ConfigError::InvalidType {
                key: error.path.join("."),
                detail: format!("found {found}"),
                expected: expected.clone(),
            },
            _ => ConfigError::Other(error.to_string()),
        };
        out.push(converted);
    }
    out
}

fn qualified(path: &[String], key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{key}", path.join("."))
    }
}

/// The file an error came from, if its contents were provided.
fn source_of<'a>(
    error: &figment::error::Error,
    sources: &'a [(String, String)],
) -> Option<(&'a str, &'a str)> {
    let figment::Source::File(path) = error.metadata.as_ref()?.source.as_ref()? else {
        return None;
    };
    let wanted = path.display().to_string();
    sources
        .iter()
        .find(|(name, _)| *name == wanted)
        .map(|(name, content)| (name.as_str(), content.as_str()))
}

/// Byte offset of `key` inside `[section]` (or the top level when `section`
/// is empty).
///
/// Tracks table headers line by line, so a key of the same name in another
/// section is never matched.
pub fn locate_key(content: &str, section: &str, key: &str) -> Option<usize> {
    let mut current = String::new();
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        let trimmed = line.trim_start();
        let indent = line.len() - trimmed.len();

        if let Some(header) = trimmed.strip_prefix('[') {
            if let Some(end) = header.find(']') {
                current = header[..end].trim().to_string();
            }
        } else if current == section
            && let Some(rest) = trimmed.strip_prefix(key)
            && rest.trim_start().starts_with('=')
        {
            return Some(offset + indent);
        }

        offset += line.len();
    }
    None
}

/// The known key most similar to `unknown`, if any is close enough.
pub fn closest_key<'a>(unknown: &str, known: &[&'a str]) -> Option<&'a str> {
    known
        .iter()
        .map(|&candidate| (candidate, strsim::jaro_winkler(unknown, candidate)))
        .filter(|&(_, score)| score > MIN_SIMILARITY)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(candidate, _)| candidate)
}

/// Print every error to stderr as a miette report.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = GraphicalReportHandler::new();
    let mut report = String::new();
    for error in errors {
        if handler.render_report(&mut report, error).is_err() {
            report.push_str(&format!("error: {error}\n"));
        }
    }
    eprint!("{report}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn misspelled_key_finds_its_correction() {
        let known = ["protocol_version", "magic_cookie_key", "magic_cookie_value"];
        assert_eq!(
            closest_key("protocol_versoin", &known),
            Some("protocol_version")
        );
        assert_eq!(closest_key("magic_cooke_key", &known), Some("magic_cookie_key"));
    }

    #[test]
    fn unrelated_key_gets_no_correction() {
        assert_eq!(closest_key("zzzzzz", &["plugin", "probe_timeout_ms"]), None);
    }

    #[test]
    fn locate_key_stays_inside_its_section() {
        let content = "[handshake]\nplugn = 1\n\n[bridge]\nplugn = \"x\"\n";
        let offset = locate_key(content, "bridge", "plugn").unwrap();
        assert_eq!(offset, content.rfind("plugn").unwrap());
    }

    #[test]
    fn locate_key_requires_an_exact_name() {
        let content = "[bridge]\nplugin_extra = 1\n";
        assert_eq!(locate_key(content, "bridge", "plugin"), None);
    }

    #[test]
    fn unknown_key_help_lists_known_keys() {
        let help = unknown_key_help(Some("plugin"), &["plugin".into(), "probe_timeout_ms".into()]);
        assert_eq!(
            help,
            "did you mean `plugin`? known keys here: plugin, probe_timeout_ms"
        );
    }
}
