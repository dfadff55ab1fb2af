//! Port interfaces for external collaborators
//!
//! These traits define the boundaries between the pipeline/coordinator logic
//! and infrastructure implementations: the network transport, the local
//! record store, and the durable token store.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use courier_domain::{DataError, Result, TokenState};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// HTTP method of a remote endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// HTTP GET
    Get,
    /// HTTP POST
    Post,
    /// HTTP PUT
    Put,
    /// HTTP PATCH
    Patch,
    /// HTTP DELETE
    Delete,
}

impl Method {
    /// Canonical upper-case method name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transport session the request is dispatched on.
///
/// Default and ephemeral sessions are created once by the transport and
/// reused; background sessions are keyed by identifier so large transfers get
/// their own client.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SessionKind {
    /// Shared default session.
    Default,
    /// Private session with limited scope and lifecycle.
    Ephemeral,
    /// Dedicated session for large transfers, keyed by identifier.
    Background(String),
}

impl Default for SessionKind {
    fn default() -> Self {
        Self::Default
    }
}

/// Immutable description of one remote call, constructed per invocation and
/// discarded after use.
#[derive(Debug, Clone)]
pub struct Endpoint {
    /// HTTP method.
    pub method: Method,
    /// Path, already resolved (no remaining placeholders); may be an absolute
    /// `http(s)` URL for third-party endpoints.
    pub path: String,
    /// URL-encoded parameters derived from the operation input.
    pub parameters: HashMap<String, String>,
    /// Outgoing headers, filled by the request decorator.
    pub headers: HashMap<String, String>,
    /// Session the transport should dispatch on.
    pub session: SessionKind,
}

impl Endpoint {
    /// Endpoint with no parameters or headers.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            parameters: HashMap::new(),
            headers: HashMap::new(),
            session: SessionKind::Default,
        }
    }
}

/// Raw result of one transport call: status, body bytes, response headers.
#[derive(Debug, Clone, Default)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,
    /// Undecoded body bytes.
    pub bytes: Vec<u8>,
    /// Response headers (names as delivered by the transport, typically
    /// lower-cased).
    pub headers: HashMap<String, String>,
}

/// Multipart payload supplied by an upload operation's input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPayload {
    /// File bytes to upload.
    pub bytes: Vec<u8>,
    /// Multipart field name the payload is attached under.
    pub field_key: String,
    /// Filename reported to the server.
    pub file_name: String,
    /// Optional content type appended as an extra `type` part.
    pub content_type: Option<String>,
}

impl UploadPayload {
    /// Check the caller contract for upload inputs.
    ///
    /// # Errors
    /// Returns [`DataError::Contract`] when the field key or filename is
    /// empty; such an input can never produce a valid multipart body, so the
    /// violation is raised before any network call.
    pub fn validate(&self) -> Result<()> {
        if self.field_key.is_empty() {
            return Err(DataError::Contract("upload payload has an empty field key".to_string()));
        }
        if self.file_name.is_empty() {
            return Err(DataError::Contract("upload payload has an empty filename".to_string()));
        }
        Ok(())
    }
}

/// Incremental progress of a multipart upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadProgress {
    /// Bytes handed to the transport so far.
    pub bytes_sent: u64,
    /// Total payload size in bytes.
    pub total_bytes: u64,
}

impl UploadProgress {
    /// Completed fraction in `0.0..=1.0`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fraction(&self) -> f64 {
        if self.total_bytes == 0 {
            1.0
        } else {
            self.bytes_sent as f64 / self.total_bytes as f64
        }
    }
}

/// Caller-supplied sink receiving upload progress events.
pub type ProgressSink = Arc<dyn Fn(UploadProgress) + Send + Sync>;

/// Inputs of multipart upload operations.
///
/// Implemented by the input type of an upload operation; the bound is what
/// makes "upload invoked with non-upload input" a compile-time error.
pub trait UploadSource {
    /// Produce the multipart payload for this input.
    fn upload_payload(&self) -> UploadPayload;
}

/// Network transport collaborator.
///
/// Implementations perform one network call and report raw bytes plus
/// headers, translating transport-level failures into the [`DataError`]
/// taxonomy exactly once at this boundary.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute a URL-encoded request.
    ///
    /// # Errors
    /// Returns the translated transport failure; non-2xx statuses surface as
    /// [`DataError::Api`] with the HTTP status attached so the retry
    /// coordinator can detect authorization failures.
    async fn execute(&self, endpoint: Endpoint) -> Result<RawResponse>;

    /// Execute a multipart upload.
    ///
    /// # Errors
    /// As [`Transport::execute`]; additionally fails fast with
    /// [`DataError::Contract`] on an invalid payload.
    async fn upload(
        &self,
        endpoint: Endpoint,
        payload: UploadPayload,
        progress: Option<ProgressSink>,
    ) -> Result<RawResponse>;
}

/// Record persisted through a [`RecordStore`].
pub trait Record: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Logical collection the record belongs to.
    fn collection() -> &'static str;

    /// Primary key within the collection.
    fn key(&self) -> String;
}

/// Local storage collaborator performing one CRUD operation per call.
#[async_trait]
pub trait RecordStore<R: Record>: Send + Sync {
    /// Insert a new record.
    ///
    /// # Errors
    /// Returns [`DataError::Storage`] on conflict or I/O failure.
    async fn insert(&self, record: R) -> Result<R>;

    /// Update an existing record.
    ///
    /// # Errors
    /// Returns [`DataError::Storage`] when the record does not exist.
    async fn update(&self, record: R) -> Result<R>;

    /// Delete a record.
    ///
    /// # Errors
    /// Returns [`DataError::Storage`] when the record does not exist.
    async fn delete(&self, record: R) -> Result<R>;

    /// Fetch the stored record with the same collection and key.
    ///
    /// # Errors
    /// Returns [`DataError::Storage`] when the record does not exist.
    async fn fetch(&self, record: R) -> Result<R>;
}

/// Durable token store surviving process restarts.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Load the persisted state, if any.
    ///
    /// # Errors
    /// Returns [`DataError::Storage`] on store access failure.
    async fn load(&self) -> Result<Option<TokenState>>;

    /// Persist the given state, replacing any previous one.
    ///
    /// # Errors
    /// Returns [`DataError::Storage`] on store access failure.
    async fn store(&self, state: &TokenState) -> Result<()>;

    /// Clear only the access token, keeping the rest of the state.
    ///
    /// # Errors
    /// Returns [`DataError::Storage`] on store access failure.
    async fn reset_access_token(&self) -> Result<()>;

    /// Remove the persisted state entirely.
    ///
    /// # Errors
    /// Returns [`DataError::Storage`] on store access failure.
    async fn clear(&self) -> Result<()>;
}

/// Source of the bearer token the request decorator attaches.
#[async_trait]
pub trait BearerTokenSource: Send + Sync {
    /// Current access token, when a non-empty one exists.
    async fn bearer_token(&self) -> Option<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_display_matches_wire_names() {
        assert_eq!(Method::Get.to_string(), "GET");
        assert_eq!(Method::Delete.to_string(), "DELETE");
    }

    #[test]
    fn upload_payload_contract_rejects_empty_fields() {
        let payload = UploadPayload {
            bytes: vec![1, 2, 3],
            field_key: String::new(),
            file_name: "photo.jpg".to_string(),
            content_type: None,
        };
        assert!(payload.validate().unwrap_err().is_contract_violation());

        let payload = UploadPayload {
            bytes: vec![1, 2, 3],
            field_key: "file".to_string(),
            file_name: String::new(),
            content_type: None,
        };
        assert!(payload.validate().unwrap_err().is_contract_violation());
    }

    #[test]
    fn upload_progress_fraction_handles_empty_payloads() {
        let done = UploadProgress { bytes_sent: 0, total_bytes: 0 };
        assert!((done.fraction() - 1.0).abs() < f64::EPSILON);

        let half = UploadProgress { bytes_sent: 50, total_bytes: 100 };
        assert!((half.fraction() - 0.5).abs() < f64::EPSILON);
    }
}
