//! Error classes and retry semantics.
//!
//! A call can fail in two ways that must never be confused:
//!
//! - **Application rejection**: the server answered with a well-formed
//!   envelope whose status is not `"ok"`. Terminal; never retried.
//! - **Transport failure**: no usable JSON response was obtained (connection
//!   refused, timeout, non-2xx status, unreadable or non-JSON body). Retried
//!   while the call's [`crate::RetryBudget`] lasts.
//!
//! [`CallFailure::retry_policy`] is the single place that encodes this rule.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Retry semantics
// ---------------------------------------------------------------------------

/// Whether a failed attempt may be re-sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    /// The identical request may be sent again immediately.
    Retryable,
    /// The failure is final for this call.
    NonRetryable,
}

// ---------------------------------------------------------------------------
// Transport failures
// ---------------------------------------------------------------------------

/// Failure to obtain or parse an HTTP response.
///
/// Variants carry rendered messages rather than the underlying client error so
/// that this crate stays free of I/O dependencies.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The request could not be built or the connection could not be made.
    #[error("connection failed: {message}")]
    Connect {
        /// Description from the HTTP client.
        message: String,
    },

    /// The attempt did not complete within the transport's timeout.
    #[error("request timed out: {message}")]
    Timeout {
        /// Description from the HTTP client.
        message: String,
    },

    /// The server answered with a non-2xx HTTP status.
    #[error("unexpected HTTP status {status}")]
    HttpStatus {
        /// Numeric HTTP status code.
        status: u16,
    },

    /// The response body could not be read.
    #[error("failed to read response body: {message}")]
    Body {
        /// Description from the HTTP client.
        message: String,
    },

    /// The response body was not valid JSON.
    #[error("response is not valid JSON: {message}")]
    Decode {
        /// Description from the JSON parser.
        message: String,
    },
}

impl TransportError {
    /// Every transport failure is retryable.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::Retryable
    }
}

// ---------------------------------------------------------------------------
// Per-attempt failures
// ---------------------------------------------------------------------------

/// Why a single attempt did not deliver a result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallFailure {
    /// The server responded with a status other than `"ok"`.
    #[error("call not ok: {status}")]
    Rejected {
        /// The status string reported by the server.
        status: String,
    },

    /// No usable response was obtained.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl CallFailure {
    /// Rejections are final; transport failures may be retried.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            Self::Rejected { .. } => RetryPolicy::NonRetryable,
            Self::Transport(err) => err.retry_policy(),
        }
    }
}
