// SPDX-FileCopyrightText: 2026 Virtmon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the virtmon driver bridge.

use thiserror::Error;

use crate::types::StatusCode;

/// The primary error type used by drivers, adaptors, and the plugin bridge.
#[derive(Debug, Error)]
pub enum VirtmonError {
    /// Configuration errors (invalid table, duplicate registration, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Driver-internal failure, e.g. the hypervisor API became unreachable.
    #[error("driver error: {message}")]
    Driver {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Transport failure (connection drop, stream interruption, framing).
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The connection was refused during the handshake.
    #[error("handshake failed: {reason}")]
    Handshake { reason: String },

    /// The remote side aborted the call with a status other than a driver failure.
    #[error("remote error ({code}): {message}")]
    Remote { code: StatusCode, message: String },

    /// A value could not be translated to or from the wire schema.
    #[error("schema error: {0}")]
    Schema(String),

    /// No capability set is registered under the requested name.
    #[error("plugin not found: {name}")]
    PluginNotFound { name: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// The driver handle was already closed.
    #[error("driver handle is closed")]
    Closed,

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl VirtmonError {
    /// Shorthand for a driver failure without an underlying source.
    pub fn driver(message: impl Into<String>) -> Self {
        VirtmonError::Driver {
            message: message.into(),
            source: None,
        }
    }

    /// Shorthand for a transport failure wrapping its cause.
    pub fn transport<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        VirtmonError::Transport {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Returns the status code this error is reported under when it crosses
    /// the process boundary.
    pub fn status_code(&self) -> StatusCode {
        match self {
            VirtmonError::Driver { .. } => StatusCode::Driver,
            VirtmonError::Schema(_) => StatusCode::Schema,
            VirtmonError::Remote { code, .. } => *code,
            _ => StatusCode::Internal,
        }
    }

    /// Returns the message carried across the boundary.
    ///
    /// Driver failures travel with their own message only, so the host
    /// reconstructs the same `Driver` error the plugin saw.
    pub fn status_message(&self) -> String {
        match self {
            VirtmonError::Driver { message, .. } => message.clone(),
            VirtmonError::Schema(message) => message.clone(),
            VirtmonError::Remote { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Rebuilds an error from a status received from the remote side.
    pub fn from_status(code: StatusCode, message: String) -> Self {
        match code {
            StatusCode::Driver => VirtmonError::Driver {
                message,
                source: None,
            },
            code => VirtmonError::Remote { code, message },
        }
    }
}
