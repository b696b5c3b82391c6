//! The port through which a call reaches a server.
//!
//! The caller in the `client` crate only knows [`Transport`]; the HTTP details
//! live in the implementation (`client::HttpTransport`). Tests substitute a
//! scripted implementation to drive the retry path deterministically.

use async_trait::async_trait;

use crate::{Envelope, MethodName, TransportError};

/// Sends one request and returns the parsed envelope.
///
/// An implementation performs exactly one attempt per invocation and never
/// retries on its own; retrying is the caller's decision.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Delivers `body` (already-encoded JSON) to `method` and interprets the
    /// response as an [`Envelope`].
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when no JSON response could be obtained.
    /// A response that parsed as JSON is always `Ok`, whatever its status.
    async fn post(&self, method: &MethodName, body: &str) -> Result<Envelope, TransportError>;
}
