//! # Courier Core
//!
//! The two core subsystems of the SDK, free of any concrete transport or
//! storage code:
//!
//! - **Operation pipeline** ([`operation`]): a small composition algebra
//!   that turns an endpoint or storage definition into a typed async
//!   callable, through chainable input converters and output parsers.
//! - **Retry coordinator** ([`retry`]): single-flight token refresh that
//!   coalesces concurrent authorization failures into one refresh call and
//!   fans the decision back out to every queued request.
//!
//! ## Architecture Principles
//! - Only depends on `courier-domain`
//! - All external collaborators (transport, storage, token durability) are
//!   reached through the traits in [`ports`]
//! - No process-wide state: the coordinator and token manager are plain
//!   injectable objects owned by whoever assembles the pipeline

pub mod auth;
pub mod decorator;
pub mod operation;
pub mod ports;
pub mod retry;

#[cfg(test)]
pub(crate) mod test_support;

pub use auth::{TokenManager, TokenRefreshResponse, REFRESH_TOKEN_PATH};
pub use decorator::{DeviceIdentity, RequestDecorator};
pub use operation::remote::RemoteOperationBuilder;
pub use operation::storage::{StorageOperationBuilder, StorageOperationKind};
pub use operation::Operation;
pub use ports::{
    BearerTokenSource, Endpoint, Method, ProgressSink, RawResponse, Record, RecordStore,
    SessionKind, TokenStore, Transport, UploadPayload, UploadProgress, UploadSource,
};
pub use retry::{RetryCoordinator, RetryPolicy, RetryVerdict};
