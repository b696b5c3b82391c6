//! The fire-and-forget RPC caller.
//!
//! [`RpcCaller::call`] returns immediately. The call runs on its own tokio task
//! and ends in one of three ways:
//!
//! - `"ok"` envelope: the success callback receives `result`.
//! - any other status: logged, callback not run, no retry.
//! - transport failure: logged, then the identical request is re-sent at once
//!   while the call's retry budget lasts. After that the failure is only
//!   visible in the log.
//!
//! Nothing is ever returned to the caller as an error. The [`CallHandle`]
//! exists so the outcome can be awaited when it matters (tests, the CLI);
//! dropping it leaves the call running.

use std::sync::Arc;

use protocol::{
    CallFailure, CallId, CallOutcome, MethodName, RetryBudget, RetryPolicy, Transport,
};
use serde::Serialize;
use serde_json::Value;
use tokio::task::{JoinError, JoinHandle};
use tracing::Instrument;

use crate::config::ClientConfig;
use crate::http::{BuildError, HttpTransport};

/// Receives the `result` of a successful call.
pub type SuccessCallback = Box<dyn FnOnce(Value) + Send + 'static>;

fn noop() -> SuccessCallback {
    Box::new(|_: Value| {})
}

// ---------------------------------------------------------------------------
// Call handle
// ---------------------------------------------------------------------------

/// Handle to a call in flight.
#[derive(Debug)]
pub struct CallHandle {
    task: JoinHandle<CallOutcome>,
}

impl CallHandle {
    /// Waits for the call to finish.
    ///
    /// # Errors
    ///
    /// Returns a [`JoinError`] only if the success callback panicked or the
    /// runtime shut down before the call finished.
    pub async fn outcome(self) -> Result<CallOutcome, JoinError> {
        self.task.await
    }

    /// Returns `true` once the call has finished.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

// ---------------------------------------------------------------------------
// Caller
// ---------------------------------------------------------------------------

/// Issues calls through a shared [`Transport`].
///
/// Cloning is cheap; clones share the transport. Every call gets its own
/// [`RetryBudget`], so concurrent calls never affect each other's retries.
#[derive(Clone)]
pub struct RpcCaller {
    transport: Arc<dyn Transport>,
    retries: u32,
}

impl RpcCaller {
    /// Creates a caller with the default budget of
    /// [`RetryBudget::DEFAULT_RETRIES`] retries per call.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            retries: RetryBudget::DEFAULT_RETRIES,
        }
    }

    /// Overrides the number of retries granted to each call.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Builds an HTTP-backed caller from configuration.
    pub fn from_config(config: &ClientConfig) -> Result<Self, BuildError> {
        let transport = HttpTransport::from_config(config)?;
        Ok(Self::new(Arc::new(transport)).with_retries(config.retry_budget().remaining()))
    }

    /// Calls `method` with `args`, invoking `on_success` with the result if the
    /// server answers `"ok"`. A missing callback is replaced by a no-op.
    ///
    /// Must be called from within a tokio runtime.
    pub fn call<A>(
        &self,
        method: MethodName,
        args: &A,
        on_success: Option<SuccessCallback>,
    ) -> CallHandle
    where
        A: Serialize + ?Sized,
    {
        let call_id = CallId::new_random();
        let span = tracing::info_span!("rpc_call", %call_id, %method);
        let on_success = on_success.unwrap_or_else(noop);

        let body = match serde_json::to_string(args) {
            Ok(body) => body,
            Err(err) => {
                span.in_scope(|| tracing::error!(error = %err, "failed to encode call arguments"));
                return CallHandle {
                    task: tokio::spawn(async { CallOutcome::Unsent }),
                };
            }
        };

        let attempt = Attempt {
            transport: Arc::clone(&self.transport),
            method,
            body,
            budget: RetryBudget::new(self.retries),
        };
        CallHandle {
            task: tokio::spawn(attempt.run(on_success).instrument(span)),
        }
    }

    /// Same as [`RpcCaller::call`] with a closure as the success callback.
    pub fn call_with<A, F>(&self, method: MethodName, args: &A, on_success: F) -> CallHandle
    where
        A: Serialize + ?Sized,
        F: FnOnce(Value) + Send + 'static,
    {
        self.call(method, args, Some(Box::new(on_success)))
    }
}

impl std::fmt::Debug for RpcCaller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcCaller")
            .field("retries", &self.retries)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Retry loop
// ---------------------------------------------------------------------------

/// State owned by one call: the request to repeat and what is left of its
/// retry budget.
struct Attempt {
    transport: Arc<dyn Transport>,
    method: MethodName,
    body: String,
    budget: RetryBudget,
}

impl Attempt {
    async fn run(mut self, on_success: SuccessCallback) -> CallOutcome {
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            let failure = match self.transport.post(&self.method, &self.body).await {
                Ok(envelope) if envelope.is_ok() => {
                    tracing::debug!(attempt = attempts, "call ok");
                    on_success(envelope.result);
                    return CallOutcome::Delivered { attempts };
                }
                Ok(envelope) => CallFailure::Rejected {
                    status: envelope.status,
                },
                Err(err) => CallFailure::from(err),
            };

            if failure.retry_policy() == RetryPolicy::Retryable && self.budget.try_consume() {
                tracing::warn!(
                    attempt = attempts,
                    retries_left = self.budget.remaining(),
                    error = %failure,
                    "call error, retrying"
                );
                continue;
            }

            return match failure {
                CallFailure::Rejected { status } => {
                    tracing::warn!(attempt = attempts, status = %status, "call not ok");
                    CallOutcome::Rejected { status, attempts }
                }
                CallFailure::Transport(err) => {
                    tracing::error!(
                        attempt = attempts,
                        error = %err,
                        "call error, retry budget exhausted"
                    );
                    CallOutcome::Exhausted { attempts }
                }
            };
        }
    }
}
