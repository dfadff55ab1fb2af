//! Error types used throughout the SDK

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Closed error taxonomy for Courier operations.
///
/// Transport and decode failures are translated into this type exactly once,
/// at the transport boundary; callers of a built operation see either a
/// decoded result or a single normalized `DataError` per invocation, never a
/// raw transport error.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "detail")]
pub enum DataError {
    /// Device has no network connectivity.
    #[error("not connected to the network")]
    NotConnected,

    /// The request exceeded its deadline.
    #[error("request timed out")]
    TimedOut,

    /// The request was cancelled before completion.
    #[error("request cancelled")]
    Cancelled,

    /// The request URL could not be constructed.
    #[error("invalid url: {0}")]
    BadUrl(String),

    /// The connection dropped mid-flight.
    #[error("network connection lost")]
    ConnectionLost,

    /// The remote resource could not be reached.
    #[error("network resource unavailable")]
    ResourceUnavailable,

    /// The response body could not be decoded into the expected type.
    #[error("cannot decode response: {0}")]
    Decode(String),

    /// Server-reported failure, with the message taken from the envelope's
    /// status block when available.
    #[error("api error: {message}")]
    Api {
        /// HTTP status code, when the failure carried one.
        status: Option<u16>,
        /// Server-supplied failure text.
        message: String,
    },

    /// Terminal authentication failure (missing or unrefreshable credentials).
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Local storage collaborator failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// Caller supplied an input the operation definition cannot accept.
    /// Programming error: never retried, surfaced loudly.
    #[error("contract violation: {0}")]
    Contract(String),

    /// SDK configuration could not be loaded or is invalid.
    #[error("configuration error: {0}")]
    Config(String),
}

impl DataError {
    /// Build an API error from an HTTP status and server message.
    #[must_use]
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api { status: Some(status), message: message.into() }
    }

    /// HTTP status code attached to this error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => *status,
            _ => None,
        }
    }

    /// Whether this failure indicates expired or invalid credentials
    /// (HTTP 401 by convention). Only these failures are eligible for the
    /// retry coordinator's refresh-and-replay path.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// Whether this is a caller contract violation (fatal, never retried).
    #[must_use]
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::Contract(_))
    }
}

/// Result type alias for Courier operations
pub type Result<T> = std::result::Result<T, DataError>;
