//! Response envelope wire format
//!
//! Every first-party endpoint wraps its payload in a status envelope:
//! `{"status": {"code", "code_text", "message", "response_timestamp"},
//! "body": <T>}`. Success is decided by `status.code`; on failure the body is
//! absent and `status.message` becomes the domain error text.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::errors::{DataError, Result};

/// Status code the server uses to signal success.
pub const SUCCESS_CODE: &str = "200";

/// Body field under which selected response headers are merged for
/// header-aware outputs.
pub const HEADER_PARAMETERS_FIELD: &str = "header_parameters";

/// Fallback error text when a failure body carries no usable message.
pub const GENERIC_FAILURE_MESSAGE: &str = "something went wrong";

/// Marker for output types that consume response headers merged into the
/// envelope body (under [`HEADER_PARAMETERS_FIELD`]).
///
/// Implementing this trait is what makes an output eligible for the
/// header-aware pipeline constructor; the capability is checked at compile
/// time, not discovered at runtime.
pub trait HeaderAware: DeserializeOwned {}

/// Status block of the response envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseStatus {
    /// Server status code as text (`"200"` on success).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// Human-readable form of the code.
    #[serde(rename = "code_text", skip_serializing_if = "Option::is_none")]
    pub code_text: Option<String>,

    /// Server-supplied message; the domain error text on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Server-side timestamp of the response.
    #[serde(rename = "response_timestamp", skip_serializing_if = "Option::is_none")]
    pub response_timestamp: Option<String>,
}

impl ResponseStatus {
    /// Status block describing a successful response.
    #[must_use]
    pub fn success() -> Self {
        Self { code: Some(SUCCESS_CODE.to_string()), ..Self::default() }
    }

    /// Status block describing a failed response.
    #[must_use]
    pub fn failure(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self { code: Some(code.into()), message: Some(message.into()), ..Self::default() }
    }

    /// Whether the code indicates success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.code.as_deref() == Some(SUCCESS_CODE)
    }

    /// The failure message, falling back to a generic text.
    #[must_use]
    pub fn failure_message(&self) -> String {
        self.message.clone().unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string())
    }
}

/// Wire-format wrapper carrying a status block alongside the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Status block; absent status is treated as failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ResponseStatus>,

    /// Payload, present only on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<T>,
}

impl<T> Envelope<T> {
    /// Envelope for a successful response.
    #[must_use]
    pub fn success(body: T) -> Self {
        Self { status: Some(ResponseStatus::success()), body: Some(body) }
    }

    /// Envelope for a failed response.
    #[must_use]
    pub fn failure(status: ResponseStatus) -> Self {
        Self { status: Some(status), body: None }
    }

    /// Unwrap the payload, translating envelope failure into the domain
    /// error taxonomy.
    ///
    /// # Errors
    /// - [`DataError::Api`] carrying `status.message` when the status code is
    ///   not the success code
    /// - [`DataError::Decode`] when the status reports success but the body
    ///   is absent
    pub fn into_body(self) -> Result<T> {
        let status = self.status.unwrap_or_default();
        if status.is_success() {
            self.body.ok_or_else(|| {
                DataError::Decode("envelope reported success without a body".to_string())
            })
        } else {
            Err(DataError::Api { status: None, message: status.failure_message() })
        }
    }
}
