//! Reqwest-backed transport
//!
//! Implements the [`Transport`] port: URL-encoded requests and multipart
//! uploads with incremental progress. Default and ephemeral session clients
//! are created once and reused; background sessions get a dedicated client
//! per identifier.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use courier_core::ports::{
    Endpoint, Method, ProgressSink, RawResponse, SessionKind, Transport, UploadPayload,
    UploadProgress,
};
use courier_domain::{ApiConfig, DataError, Result};
use parking_lot::Mutex;
use reqwest::multipart;
use reqwest::Client;
use tracing::debug;
use url::Url;

use super::translate;

/// Transport over `reqwest`, one instance shared by all operations of a
/// pipeline.
pub struct ReqwestTransport {
    base_url: Url,
    timeout: Duration,
    clients: Mutex<HashMap<SessionKind, Client>>,
}

impl ReqwestTransport {
    /// Start building a transport.
    #[must_use]
    pub fn builder() -> ReqwestTransportBuilder {
        ReqwestTransportBuilder::default()
    }

    /// Transport with the default timeout for the given base URL.
    ///
    /// # Errors
    /// Returns [`DataError::BadUrl`] when the base URL does not parse.
    pub fn new(base_url: &str) -> Result<Self> {
        Self::builder().base_url(base_url).build()
    }

    /// Transport configured from the API section of the SDK configuration.
    ///
    /// # Errors
    /// Returns [`DataError::BadUrl`] when the base URL does not parse.
    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        Self::builder()
            .base_url(&config.base_url)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
    }

    /// Lazily create (and cache) the client for a session kind.
    fn client(&self, session: &SessionKind) -> Result<Client> {
        let mut clients = self.clients.lock();
        if let Some(client) = clients.get(session) {
            return Ok(client.clone());
        }
        let mut builder = Client::builder().timeout(self.timeout);
        // Ephemeral sessions keep no connections alive between requests.
        if matches!(session, SessionKind::Ephemeral) {
            builder = builder.pool_max_idle_per_host(0);
        }
        let client = builder.build().map_err(|err| translate::from_reqwest(&err))?;
        clients.insert(session.clone(), client.clone());
        Ok(client)
    }

    /// Join a relative path onto the base URL; absolute `http(s)` paths
    /// (third-party endpoints) pass through untouched.
    fn url_for(&self, path: &str) -> Result<Url> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return Url::parse(path).map_err(|err| DataError::BadUrl(err.to_string()));
        }
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|err| DataError::BadUrl(err.to_string()))
    }

    /// Collect a response into raw bytes + headers, validating the status.
    async fn collect(response: reqwest::Response) -> Result<RawResponse> {
        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (name.as_str().to_string(), String::from_utf8_lossy(value.as_bytes()).into_owned())
            })
            .collect();
        let bytes =
            response.bytes().await.map_err(|err| translate::from_reqwest(&err))?.to_vec();

        if !(200..=300).contains(&status) {
            return Err(translate::from_status(status, &bytes));
        }

        debug!(status, "received response");
        Ok(RawResponse { status, bytes, headers })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, endpoint: Endpoint) -> Result<RawResponse> {
        let client = self.client(&endpoint.session)?;
        let url = self.url_for(&endpoint.path)?;
        debug!(method = %endpoint.method, %url, "dispatching request");

        let mut request = client.request(method_for(endpoint.method), url);
        for (name, value) in &endpoint.headers {
            request = request.header(name, value);
        }
        request = match endpoint.method {
            Method::Get | Method::Delete => request.query(&endpoint.parameters),
            Method::Post | Method::Put | Method::Patch => request.form(&endpoint.parameters),
        };

        let response = request.send().await.map_err(|err| translate::from_reqwest(&err))?;
        Self::collect(response).await
    }

    async fn upload(
        &self,
        endpoint: Endpoint,
        payload: UploadPayload,
        progress: Option<ProgressSink>,
    ) -> Result<RawResponse> {
        payload.validate()?;

        let client = self.client(&endpoint.session)?;
        let url = self.url_for(&endpoint.path)?;
        let mime = sniff_mime(&payload.bytes);
        let total = payload.bytes.len() as u64;
        debug!(%url, total_bytes = total, mime, "dispatching upload");

        let part = multipart::Part::stream_with_length(progress_body(payload.bytes, progress), total)
            .file_name(payload.file_name.clone())
            .mime_str(mime)
            .map_err(|err| translate::from_reqwest(&err))?;
        let mut form = multipart::Form::new().part(payload.field_key.clone(), part);
        if let Some(content_type) = &payload.content_type {
            form = form.text("type", content_type.clone());
        }

        // Uploads always POST, whatever the declared method.
        let mut request = client.post(url).multipart(form);
        for (name, value) in &endpoint.headers {
            request = request.header(name, value);
        }

        let response = request.send().await.map_err(|err| translate::from_reqwest(&err))?;
        Self::collect(response).await
    }
}

/// Builder for [`ReqwestTransport`].
#[derive(Debug)]
pub struct ReqwestTransportBuilder {
    base_url: String,
    timeout: Duration,
}

impl Default for ReqwestTransportBuilder {
    fn default() -> Self {
        Self { base_url: String::new(), timeout: Duration::from_secs(30) }
    }
}

impl ReqwestTransportBuilder {
    /// Base URL all relative paths are joined onto.
    #[must_use]
    pub fn base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    /// Per-request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the transport.
    ///
    /// # Errors
    /// Returns [`DataError::BadUrl`] when the base URL is empty or does not
    /// parse.
    pub fn build(self) -> Result<ReqwestTransport> {
        if self.base_url.is_empty() {
            return Err(DataError::BadUrl("base url is not configured".to_string()));
        }
        // A trailing slash makes Url::join append instead of replacing the
        // last path segment.
        let normalized = format!("{}/", self.base_url.trim_end_matches('/'));
        let base_url =
            Url::parse(&normalized).map_err(|err| DataError::BadUrl(err.to_string()))?;
        Ok(ReqwestTransport { base_url, timeout: self.timeout, clients: Mutex::new(HashMap::new()) })
    }
}

fn method_for(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

/// Chunked upload body reporting progress as the transport pulls chunks.
fn progress_body(bytes: Vec<u8>, sink: Option<ProgressSink>) -> reqwest::Body {
    const CHUNK_SIZE: usize = 64 * 1024;

    let total = bytes.len() as u64;
    let chunks: Vec<Bytes> = bytes.chunks(CHUNK_SIZE).map(Bytes::copy_from_slice).collect();
    let mut sent: u64 = 0;
    let stream = futures::stream::iter(chunks.into_iter().map(move |chunk| {
        sent += chunk.len() as u64;
        if let Some(sink) = &sink {
            sink(UploadProgress { bytes_sent: sent, total_bytes: total });
        }
        Ok::<Bytes, std::io::Error>(chunk)
    }));
    reqwest::Body::wrap_stream(stream)
}

/// Guess the payload MIME type from its leading byte, falling back to a
/// generic binary type.
#[must_use]
pub fn sniff_mime(bytes: &[u8]) -> &'static str {
    match bytes.first() {
        Some(0xFF) => "image/jpeg",
        Some(0x89) => "image/png",
        Some(0x47) => "image/gif",
        Some(0x49 | 0x4D) => "image/tiff",
        Some(0x25) => "application/pdf",
        Some(0xD0) => "application/vnd",
        Some(0x46) => "text/plain",
        _ => "application/octet-stream",
    }
}
