//! HTTP implementation of the [`Transport`] port.

use async_trait::async_trait;
use protocol::{Envelope, MethodName, Transport, TransportError};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde_json::Value;
use thiserror::Error;

use crate::config::{ApiServerAddress, ClientConfig};

const JSON_CONTENT_TYPE: &str = "application/json";

/// The underlying HTTP client could not be constructed.
#[derive(Debug, Error)]
#[error("failed to build HTTP client: {0}")]
pub struct BuildError(#[from] reqwest::Error);

/// Sends each attempt as `POST <base>/<method>` with a JSON body.
///
/// One `reqwest::Client` is shared by every attempt of every call made through
/// this transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base: ApiServerAddress,
}

impl HttpTransport {
    /// Builds a transport from configuration, applying the per-attempt
    /// timeout when one is set.
    pub fn from_config(config: &ClientConfig) -> Result<Self, BuildError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        Ok(Self::with_client(builder.build()?, config.api_server_address.clone()))
    }

    /// Uses an already-configured `reqwest::Client`.
    pub fn with_client(client: reqwest::Client, base: ApiServerAddress) -> Self {
        Self { client, base }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, method: &MethodName, body: &str) -> Result<Envelope, TransportError> {
        let url = self.base.endpoint(method);
        tracing::trace!(url = %url, "sending request");

        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .header(ACCEPT, JSON_CONTENT_TYPE)
            .body(body.to_owned())
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::HttpStatus {
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(body_error)?;
        let value: Value = serde_json::from_slice(&bytes).map_err(|e| TransportError::Decode {
            message: e.to_string(),
        })?;

        Ok(Envelope::from_value(value))
    }
}

fn request_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout {
            message: err.to_string(),
        }
    } else {
        TransportError::Connect {
            message: err.to_string(),
        }
    }
}

fn body_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout {
            message: err.to_string(),
        }
    } else {
        TransportError::Body {
            message: err.to_string(),
        }
    }
}
