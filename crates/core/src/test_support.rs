//! Shared mock collaborators for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use courier_domain::{DataError, Result, TokenState};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::ports::{
    Endpoint, ProgressSink, RawResponse, TokenStore, Transport, UploadPayload, UploadProgress,
};

/// One canned transport response, consumed in FIFO order.
pub(crate) struct ScriptedCall {
    delay: Duration,
    result: Result<RawResponse>,
}

impl ScriptedCall {
    /// 200 response whose body is the JSON serialization of `body`.
    pub(crate) fn success_json<T: Serialize>(body: &T) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Ok(RawResponse {
                status: 200,
                bytes: serde_json::to_vec(body).unwrap_or_default(),
                headers: HashMap::new(),
            }),
        }
    }

    /// 200 response with the given body and response headers.
    pub(crate) fn success_with_headers<T: Serialize>(
        body: T,
        headers: HashMap<String, String>,
    ) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Ok(RawResponse {
                status: 200,
                bytes: serde_json::to_vec(&body).unwrap_or_default(),
                headers,
            }),
        }
    }

    /// Raw bytes response (bare, non-envelope endpoints).
    pub(crate) fn success_raw(bytes: Vec<u8>) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Ok(RawResponse { status: 200, bytes, headers: HashMap::new() }),
        }
    }

    /// Failed call.
    pub(crate) fn failure(error: DataError) -> Self {
        Self { delay: Duration::ZERO, result: Err(error) }
    }

    /// Delay the response to keep the call in flight for a while.
    pub(crate) fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Transport mock replaying a scripted FIFO queue of responses.
///
/// Unscripted calls fail with a 500 API error, so a test asserting on call
/// counts also catches unexpected extra calls.
#[derive(Default)]
pub(crate) struct MockTransport {
    queue: Mutex<VecDeque<ScriptedCall>>,
    calls: Mutex<Vec<Endpoint>>,
    uploads: Mutex<Vec<UploadPayload>>,
}

impl MockTransport {
    pub(crate) fn script(&self, call: ScriptedCall) {
        self.queue.lock().push_back(call);
    }

    pub(crate) fn calls(&self) -> Vec<Endpoint> {
        self.calls.lock().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub(crate) fn calls_to(&self, path: &str) -> usize {
        self.calls.lock().iter().filter(|endpoint| endpoint.path == path).count()
    }

    pub(crate) fn uploads(&self) -> Vec<UploadPayload> {
        self.uploads.lock().clone()
    }

    async fn next(&self) -> Result<RawResponse> {
        let scripted = self.queue.lock().pop_front();
        match scripted {
            Some(call) => {
                if !call.delay.is_zero() {
                    tokio::time::sleep(call.delay).await;
                }
                call.result
            }
            None => Err(DataError::api(500, "unscripted transport call")),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, endpoint: Endpoint) -> Result<RawResponse> {
        self.calls.lock().push(endpoint);
        self.next().await
    }

    async fn upload(
        &self,
        endpoint: Endpoint,
        payload: UploadPayload,
        progress: Option<ProgressSink>,
    ) -> Result<RawResponse> {
        payload.validate()?;
        let total = payload.bytes.len() as u64;
        self.calls.lock().push(endpoint);
        self.uploads.lock().push(payload);
        if let Some(sink) = progress {
            sink(UploadProgress { bytes_sent: total, total_bytes: total });
        }
        self.next().await
    }
}

/// In-memory token store for tests.
#[derive(Default)]
pub(crate) struct MemoryTokenStore {
    state: RwLock<Option<TokenState>>,
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn load(&self) -> Result<Option<TokenState>> {
        Ok(self.state.read().await.clone())
    }

    async fn store(&self, state: &TokenState) -> Result<()> {
        *self.state.write().await = Some(state.clone());
        Ok(())
    }

    async fn reset_access_token(&self) -> Result<()> {
        if let Some(state) = self.state.write().await.as_mut() {
            state.reset_access_token();
        }
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.state.write().await = None;
        Ok(())
    }
}

/// Arc alias used all over the retry tests.
pub(crate) type SharedTransport = Arc<MockTransport>;
