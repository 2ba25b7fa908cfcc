//! Error types for rollcall.
//!
//! This module defines the crate-wide error type. Components with their own
//! failure vocabulary (the handshake decoder, the live sync channel) keep a
//! local error enum that converts into [`Error`].

use thiserror::Error;

use crate::channel::ChannelError;
use crate::handshake::DecodeError;

/// The main error type for rollcall operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Handshake Errors ===
    /// A scanned payload could not be turned into an event context.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    // === Ledger API Errors ===
    /// No response was received from the ledger API.
    #[error("network error calling {endpoint}: {source}")]
    Network {
        /// Path of the endpoint that was called.
        endpoint: &'static str,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The ledger API answered with a non-success status.
    #[error("{endpoint} rejected the request with status {status}")]
    ServerRejected {
        /// Path of the endpoint that was called.
        endpoint: &'static str,
        /// HTTP status code returned by the server.
        status: u16,
    },

    /// The ledger API answered with a body that does not match its contract.
    #[error("unexpected response from {endpoint}: {message}")]
    InvalidResponse {
        /// Path of the endpoint that was called.
        endpoint: &'static str,
        /// Description of what was wrong with the body.
        message: String,
    },

    // === Push Channel Errors ===
    /// The push channel failed.
    #[error(transparent)]
    Channel(#[from] ChannelError),

    // === Scanner Errors ===
    /// Another scan flow already holds the scanner.
    #[error("scanner is already in use")]
    ScannerBusy,

    /// The scan source ran out before a valid event code was read.
    #[error("scan ended before a valid event code was read")]
    ScanAborted,

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === I/O Errors ===
    /// Reading from a local source failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for rollcall operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a configuration validation error.
    #[must_use]
    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }

    /// Create an invalid response error.
    #[must_use]
    pub fn invalid_response(endpoint: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            endpoint,
            message: message.into(),
        }
    }

    /// Check if no response was received from the server.
    #[must_use]
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    /// Check if the server answered with a non-success status.
    #[must_use]
    pub fn is_server_rejected(&self) -> bool {
        matches!(self, Self::ServerRejected { .. })
    }

    /// Check if this error came from decoding a scanned payload.
    #[must_use]
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode(_))
    }
}
