//! Remote operation builder
//!
//! Turns an endpoint definition (path, method, session kind) into a typed
//! [`Operation`] over the [`Transport`] port. The base operation produces the
//! raw transport response; the standard constructors attach the default
//! output parser for the endpoint's wire shape:
//!
//! - [`RemoteOperationBuilder::enveloped`]: first-party endpoints wrapped in
//!   the status envelope
//! - [`RemoteOperationBuilder::enveloped_with_headers`]: envelope endpoints
//!   whose output also consumes response headers
//! - [`RemoteOperationBuilder::bare`]: third-party endpoints returning the
//!   payload directly
//! - [`RemoteOperationBuilder::upload_enveloped`]: multipart uploads
//!
//! Dynamic path placeholders are resolved from an explicit accessor table
//! registered with [`RemoteOperationBuilder::path_param`]; an input that
//! cannot render a placeholder is a caller contract violation raised before
//! any network call.

use std::collections::HashMap;
use std::sync::Arc;

use courier_domain::{
    DataError, Envelope, HeaderAware, Result, HEADER_PARAMETERS_FIELD,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::Operation;
use crate::decorator::RequestDecorator;
use crate::ports::{
    Endpoint, Method, ProgressSink, RawResponse, SessionKind, Transport, UploadSource,
};
use crate::retry::{RetryCoordinator, RetryVerdict};

type PathAccessor<I> = Arc<dyn Fn(&I) -> Option<String> + Send + Sync>;

/// Builder for remote operations.
///
/// Building is idempotent: two operations built from the same definition
/// behave identically.
pub struct RemoteOperationBuilder<I> {
    transport: Arc<dyn Transport>,
    method: Method,
    path: String,
    session: SessionKind,
    decorator: Option<RequestDecorator>,
    coordinator: Option<Arc<RetryCoordinator>>,
    path_params: Vec<(String, PathAccessor<I>)>,
    progress: Option<ProgressSink>,
}

impl<I> RemoteOperationBuilder<I>
where
    I: Send + Sync + 'static,
{
    /// Start a builder for the given endpoint.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, method: Method, path: impl Into<String>) -> Self {
        Self {
            transport,
            method,
            path: path.into(),
            session: SessionKind::Default,
            decorator: None,
            coordinator: None,
            path_params: Vec::new(),
            progress: None,
        }
    }

    /// Dispatch on the given transport session.
    #[must_use]
    pub fn session(mut self, session: SessionKind) -> Self {
        self.session = session;
        self
    }

    /// Decorate outgoing requests with identity and bearer headers.
    #[must_use]
    pub fn decorator(mut self, decorator: RequestDecorator) -> Self {
        self.decorator = Some(decorator);
        self
    }

    /// Route authorization failures through the retry coordinator.
    #[must_use]
    pub fn retry(mut self, coordinator: Arc<RetryCoordinator>) -> Self {
        self.coordinator = Some(coordinator);
        self
    }

    /// Register the accessor rendering the `{name}` path placeholder from
    /// the input value.
    #[must_use]
    pub fn path_param<F>(mut self, name: impl Into<String>, accessor: F) -> Self
    where
        F: Fn(&I) -> Option<String> + Send + Sync + 'static,
    {
        self.path_params.push((name.into(), Arc::new(accessor)));
        self
    }

    /// Report upload progress to the given sink (upload operations only).
    #[must_use]
    pub fn progress(mut self, sink: ProgressSink) -> Self {
        self.progress = Some(sink);
        self
    }

    /// Base operation: dispatch and return the raw transport response.
    #[must_use]
    pub fn raw(self) -> Operation<I, RawResponse>
    where
        I: Serialize,
    {
        let Self { transport, method, path, session, decorator, coordinator, path_params, .. } =
            self;
        let path_params = Arc::new(path_params);

        Operation::new(move |input: I| {
            let transport = Arc::clone(&transport);
            let decorator = decorator.clone();
            let coordinator = coordinator.clone();
            let path_params = Arc::clone(&path_params);
            let path = path.clone();
            let session = session.clone();

            async move {
                let resolved = resolve_path(&path, &input, &path_params)?;
                let parameters = encode_parameters(&input)?;
                dispatch(
                    &transport,
                    decorator.as_ref(),
                    coordinator.as_deref(),
                    move || Endpoint {
                        method,
                        path: resolved.clone(),
                        parameters: parameters.clone(),
                        headers: HashMap::new(),
                        session: session.clone(),
                    },
                    Dispatch::Request,
                )
                .await
            }
        })
    }

    /// Enveloped operation: decode the response as `Envelope<O>` and unwrap
    /// the body, surfacing envelope failures as API errors.
    #[must_use]
    pub fn enveloped<O>(self) -> Operation<I, O>
    where
        I: Serialize,
        O: DeserializeOwned + Send + 'static,
    {
        self.raw().pipe(parse_envelope::<O>)
    }

    /// Enveloped operation whose output also consumes response headers,
    /// merged into the body under `header_parameters` before decoding.
    #[must_use]
    pub fn enveloped_with_headers<O>(self) -> Operation<I, O>
    where
        I: Serialize,
        O: HeaderAware + Send + 'static,
    {
        self.raw().pipe(parse_envelope_with_headers::<O>)
    }

    /// Bare operation for endpoints without the envelope: decode the
    /// response bytes directly as `O`.
    #[must_use]
    pub fn bare<O>(self) -> Operation<I, O>
    where
        I: Serialize,
        O: DeserializeOwned + Send + 'static,
    {
        self.raw().pipe(|response: RawResponse| {
            serde_json::from_slice(&response.bytes)
                .map_err(|err| DataError::Decode(err.to_string()))
        })
    }

    /// Base upload operation: build the multipart payload from the input and
    /// dispatch it through the transport's upload entry point.
    ///
    /// The `I: UploadSource` bound makes "upload invoked with non-upload
    /// input" unrepresentable; a payload that violates the upload contract
    /// (empty field key or filename) still fails fast before any network
    /// call.
    #[must_use]
    pub fn upload_raw(self) -> Operation<I, RawResponse>
    where
        I: UploadSource,
    {
        let Self {
            transport,
            method: _,
            path,
            session,
            decorator,
            coordinator,
            path_params,
            progress,
        } = self;
        let path_params = Arc::new(path_params);

        Operation::new(move |input: I| {
            let transport = Arc::clone(&transport);
            let decorator = decorator.clone();
            let coordinator = coordinator.clone();
            let path_params = Arc::clone(&path_params);
            let path = path.clone();
            let session = session.clone();
            let progress = progress.clone();

            async move {
                let resolved = resolve_path(&path, &input, &path_params)?;
                let payload = input.upload_payload();
                payload.validate()?;
                dispatch(
                    &transport,
                    decorator.as_ref(),
                    coordinator.as_deref(),
                    move || Endpoint {
                        method: Method::Post,
                        path: resolved.clone(),
                        parameters: HashMap::new(),
                        headers: HashMap::new(),
                        session: session.clone(),
                    },
                    Dispatch::Upload { payload, progress },
                )
                .await
            }
        })
    }

    /// Enveloped upload operation.
    #[must_use]
    pub fn upload_enveloped<O>(self) -> Operation<I, O>
    where
        I: UploadSource,
        O: DeserializeOwned + Send + 'static,
    {
        self.upload_raw().pipe(parse_envelope::<O>)
    }
}

enum Dispatch {
    Request,
    Upload { payload: crate::ports::UploadPayload, progress: Option<ProgressSink> },
}

/// Dispatch loop shared by request and upload operations: decorate, execute,
/// and consult the retry coordinator on failure. Decoration happens inside
/// the loop so a replay after a token refresh carries the fresh bearer.
async fn dispatch<F>(
    transport: &Arc<dyn Transport>,
    decorator: Option<&RequestDecorator>,
    coordinator: Option<&RetryCoordinator>,
    make_endpoint: F,
    mode: Dispatch,
) -> Result<RawResponse>
where
    F: Fn() -> Endpoint,
{
    let mut attempts: u32 = 0;
    loop {
        let mut endpoint = make_endpoint();
        if let Some(decorator) = decorator {
            decorator.decorate(&mut endpoint).await;
        }

        let result = match &mode {
            Dispatch::Request => transport.execute(endpoint).await,
            Dispatch::Upload { payload, progress } => {
                transport.upload(endpoint, payload.clone(), progress.clone()).await
            }
        };

        let err = match result {
            Ok(response) => return Ok(response),
            Err(err) => err,
        };

        let Some(coordinator) = coordinator else {
            return Err(err);
        };

        match coordinator.decide(&err, attempts).await {
            RetryVerdict::Retry { delay } => {
                debug!(attempts, delay_ms = delay.as_millis() as u64, "replaying request");
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                attempts += 1;
            }
            RetryVerdict::GiveUp { error } => return Err(error.unwrap_or(err)),
        }
    }
}

/// Substitute `{name}` placeholders using the registered accessor table.
fn resolve_path<I>(
    template: &str,
    input: &I,
    accessors: &[(String, PathAccessor<I>)],
) -> Result<String> {
    if !template.contains('{') {
        return Ok(template.to_string());
    }

    let mut path = template.to_string();
    for (name, accessor) in accessors {
        let placeholder = format!("{{{name}}}");
        if !path.contains(placeholder.as_str()) {
            continue;
        }
        let value = accessor(input).ok_or_else(|| {
            DataError::Contract(format!("path placeholder `{name}` cannot be rendered as text"))
        })?;
        path = path.replace(placeholder.as_str(), &value);
    }

    if path.contains('{') {
        return Err(DataError::Contract(format!("unresolved placeholder in path `{path}`")));
    }
    Ok(path)
}

/// Render the input value as URL-encodable parameters. Scalar fields become
/// their textual form; nested values travel as JSON text; null fields are
/// omitted. Non-struct inputs (unit, scalars) produce no parameters.
fn encode_parameters<I: Serialize>(input: &I) -> Result<HashMap<String, String>> {
    let value = serde_json::to_value(input)
        .map_err(|err| DataError::Contract(format!("input is not encodable: {err}")))?;

    let mut parameters = HashMap::new();
    if let Value::Object(fields) = value {
        for (name, field) in fields {
            let rendered = match field {
                Value::Null => continue,
                Value::String(text) => text,
                Value::Bool(flag) => flag.to_string(),
                Value::Number(number) => number.to_string(),
                nested => nested.to_string(),
            };
            parameters.insert(name, rendered);
        }
    }
    Ok(parameters)
}

fn parse_envelope<O: DeserializeOwned>(response: RawResponse) -> Result<O> {
    let envelope: Envelope<O> = serde_json::from_slice(&response.bytes)
        .map_err(|err| DataError::Decode(err.to_string()))?;
    envelope.into_body()
}

/// Decode an envelope after merging the response headers into its body under
/// [`HEADER_PARAMETERS_FIELD`]. A missing or null body is replaced with an
/// object holding only the merged headers, so header-only outputs (e.g. the
/// token refresh response) still decode.
fn parse_envelope_with_headers<O: HeaderAware>(response: RawResponse) -> Result<O> {
    let mut value: Value = serde_json::from_slice(&response.bytes)
        .map_err(|err| DataError::Decode(err.to_string()))?;

    let merged: serde_json::Map<String, Value> = response
        .headers
        .iter()
        .map(|(name, header)| (name.clone(), Value::String(header.clone())))
        .collect();

    if let Value::Object(root) = &mut value {
        match root.get_mut("body") {
            Some(Value::Object(body)) => {
                body.insert(HEADER_PARAMETERS_FIELD.to_string(), Value::Object(merged));
            }
            _ => {
                let mut body = serde_json::Map::new();
                body.insert(HEADER_PARAMETERS_FIELD.to_string(), Value::Object(merged));
                root.insert("body".to_string(), Value::Object(body));
            }
        }
    }

    let envelope: Envelope<O> =
        serde_json::from_value(value).map_err(|err| DataError::Decode(err.to_string()))?;
    envelope.into_body()
}
