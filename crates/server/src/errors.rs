//! Status strings and the errors procedures and hooks return.
//!
//! Every failure the server reports travels as the `status` of an envelope
//! with a `null` result and HTTP 200. Only a response that cannot be encoded
//! at all breaks this rule (HTTP 500, no envelope).

use thiserror::Error;

/// No procedure is registered under the requested name.
pub const NO_SUCH_METHOD: &str = "no such method";
/// The request body could not be read (I/O error or over the size limit).
pub const BAD_REQUEST_BODY: &str = "bad request body";
/// The request body is not JSON matching the procedure's request type.
pub const BAD_REQUEST: &str = "bad request";
/// The procedure failed with an error that carries no status of its own.
pub const CALL_ERROR: &str = "call error";

/// An error whose message is sent verbatim as the envelope status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ErrorStatus(String);

impl ErrorStatus {
    /// Creates a status error.
    pub fn new(status: impl Into<String>) -> Self {
        Self(status.into())
    }

    /// Returns the status string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Failure returned by a registered procedure.
#[derive(Debug, Error)]
pub enum MethodError {
    /// Reported to the client as the given status.
    #[error(transparent)]
    Status(#[from] ErrorStatus),

    /// Logged server-side; reported to the client as [`CALL_ERROR`].
    #[error("call failed: {0}")]
    Failed(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl MethodError {
    /// Wraps any error as an opaque call failure.
    pub fn failed(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Failed(err.into())
    }

    /// The status string the client will see.
    pub fn status(&self) -> &str {
        match self {
            Self::Status(status) => status.as_str(),
            Self::Failed(_) => CALL_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_errors_pass_their_text_through() {
        let err = MethodError::from(ErrorStatus::new("insufficient funds"));
        assert_eq!(err.status(), "insufficient funds");
        assert_eq!(err.to_string(), "insufficient funds");
    }

    #[test]
    fn opaque_failures_become_call_error() {
        let err = MethodError::failed("database unavailable");
        assert_eq!(err.status(), CALL_ERROR);
        assert_eq!(err.to_string(), "call failed: database unavailable");
    }
}
