//! Single-flight refresh coordinator
//!
//! All concurrent requests of one pipeline share a coordinator instance.
//! State machine: `Idle` ⇄ `Refreshing`. A failed request asks the
//! coordinator for a verdict; authorization failures are queued and resolved
//! in one batch when the in-flight refresh cycle completes.
//!
//! Locking: the mutex covers only the check-and-set of the idle→refreshing
//! transition and the enqueue step. The refresh call itself runs outside the
//! lock so unrelated failures can keep enqueueing while it is in flight.

use std::sync::Arc;
use std::time::Duration;

use courier_domain::DataError;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use super::policy::RetryPolicy;
use crate::auth::TokenManager;

const MSG_REFRESH_FAILED: &str = "refreshing the token failed";

/// Verdict delivered to a request blocked on the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryVerdict {
    /// Replay the request after the given delay.
    Retry {
        /// Delay before the replay is dispatched.
        delay: Duration,
    },
    /// Do not retry. When `error` is set it replaces the original failure
    /// (terminal authentication error after a failed refresh); otherwise the
    /// original failure is surfaced unchanged.
    GiveUp {
        /// Replacement error, if any.
        error: Option<DataError>,
    },
}

struct CoordinatorState {
    refreshing: bool,
    queue: Vec<oneshot::Sender<RetryVerdict>>,
    replay_delay: Duration,
}

/// Coalesces concurrent authorization failures into a single token refresh.
///
/// Guarantees:
/// - at most one refresh call per coalescing window, no matter how many
///   requests fail concurrently
/// - every queued request receives exactly one verdict, in first-enqueued
///   order
/// - the queue is fully drained before the next refresh may start
pub struct RetryCoordinator {
    state: Mutex<CoordinatorState>,
    tokens: Arc<TokenManager>,
    policy: RetryPolicy,
}

impl RetryCoordinator {
    /// Create a coordinator over the given token manager.
    #[must_use]
    pub fn new(tokens: Arc<TokenManager>, policy: RetryPolicy) -> Self {
        Self {
            state: Mutex::new(CoordinatorState {
                refreshing: false,
                queue: Vec::new(),
                replay_delay: Duration::ZERO,
            }),
            tokens,
            policy,
        }
    }

    /// Decide whether a failed request should be replayed.
    ///
    /// `attempts` is the number of replays this request has already been
    /// granted. Non-authorization failures and requests past the retry limit
    /// resolve immediately; authorization failures suspend until the current
    /// refresh cycle drains the queue.
    pub async fn decide(&self, error: &DataError, attempts: u32) -> RetryVerdict {
        if !error.is_unauthorized() {
            return RetryVerdict::GiveUp { error: None };
        }
        if attempts >= self.policy.max_retries {
            debug!(attempts, limit = self.policy.max_retries, "retry limit reached");
            return RetryVerdict::GiveUp { error: None };
        }

        let (sender, receiver) = oneshot::channel();
        let runs_cycle = {
            let mut state = self.state.lock();
            state.queue.push(sender);
            if state.refreshing {
                false
            } else {
                state.refreshing = true;
                true
            }
        };

        if runs_cycle {
            self.run_refresh_cycle().await;
        }

        match receiver.await {
            Ok(verdict) => verdict,
            // The coordinator was dropped mid-cycle; treat as cancellation.
            Err(_) => RetryVerdict::GiveUp { error: Some(DataError::Cancelled) },
        }
    }

    /// One full refresh cycle: expiry check, optional refresh call, drain.
    async fn run_refresh_cycle(&self) {
        if !self.tokens.has_expired().await {
            // Stale-token race: the request failed with 401 while a newer
            // token was already in place. Replay immediately, no refresh.
            debug!("token still valid, granting immediate retry to queued requests");
            self.drain(RetryVerdict::Retry { delay: Duration::ZERO });
            return;
        }

        match self.tokens.refresh().await {
            Ok(()) => {
                let delay = {
                    let mut state = self.state.lock();
                    state.replay_delay = (state.replay_delay + self.policy.delay_increment)
                        .min(self.policy.max_replay_delay);
                    state.replay_delay
                };
                info!(delay_ms = delay.as_millis() as u64, "token refreshed, replaying queued requests");
                self.drain(RetryVerdict::Retry { delay });
            }
            Err(err) => {
                warn!(error = %err, "token refresh failed, failing queued requests");
                if let Err(reset_err) = self.tokens.reset_access_token().await {
                    warn!(error = %reset_err, "failed to reset stored access token");
                }
                self.drain(RetryVerdict::GiveUp {
                    error: Some(DataError::Auth(MSG_REFRESH_FAILED.to_string())),
                });
            }
        }
    }

    /// Drain the queue in first-enqueued order and return to `Idle`.
    fn drain(&self, verdict: RetryVerdict) {
        let queue = {
            let mut state = self.state.lock();
            state.refreshing = false;
            std::mem::take(&mut state.queue)
        };
        for sender in queue {
            // A closed receiver means the caller was cancelled; nothing owed.
            let _ = sender.send(verdict.clone());
        }
    }
}
