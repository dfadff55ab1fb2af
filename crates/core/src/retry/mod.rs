//! Authenticated retry with single-flight token refresh
//!
//! When many in-flight requests fail with an authorization error at once,
//! the [`RetryCoordinator`] performs exactly one token refresh, queues every
//! failing request, and replays (or uniformly fails) all of them once the
//! refresh resolves.

mod coordinator;
mod policy;

pub use coordinator::{RetryCoordinator, RetryVerdict};
pub use policy::RetryPolicy;
