//! Client configuration.
//!
//! Loaded once at startup from a TOML file (or built directly) and only read
//! afterwards:
//!
//! ```toml
//! api_server_address = "http://127.0.0.1:7899"
//! retry_budget = 10          # optional
//! request_timeout_secs = 30  # optional, no per-attempt timeout when absent
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use protocol::{MethodName, RetryBudget};
use serde::Deserialize;
use thiserror::Error;

/// Errors produced while loading a [`ClientConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file '{}': {source}", path.display())]
    Read {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration text is not valid TOML or does not match the schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The API server address is not an absolute `http`/`https` URL.
    #[error("invalid API server address '{value}': {reason}")]
    InvalidAddress {
        /// The rejected value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// API server address
// ---------------------------------------------------------------------------

/// Base address of the API server, e.g. `http://127.0.0.1:7899/api`.
///
/// Stored without a trailing `/` so that [`ApiServerAddress::endpoint`] joins
/// with exactly one separator.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct ApiServerAddress(String);

impl ApiServerAddress {
    /// Validates `value` as an absolute `http` or `https` URL without query or
    /// fragment.
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidAddress {
            value: value.to_owned(),
            reason,
        };
        let url = reqwest::Url::parse(value).map_err(|e| invalid(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(invalid("query and fragment are not allowed".to_owned()));
        }
        Ok(Self(value.strip_suffix('/').unwrap_or(value).to_owned()))
    }

    /// Returns the address as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Builds the URL for `method`: `<base>/<method>`.
    pub fn endpoint(&self, method: &MethodName) -> String {
        format!("{}/{}", self.0, method)
    }
}

impl TryFrom<String> for ApiServerAddress {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl std::fmt::Display for ApiServerAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Client configuration
// ---------------------------------------------------------------------------

/// Everything the client needs to reach the API server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Base address every method name is appended to.
    pub api_server_address: ApiServerAddress,

    /// Re-sends allowed per call after transport failures.
    #[serde(default = "default_retry_budget")]
    pub retry_budget: u32,

    /// Per-attempt timeout in seconds.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

fn default_retry_budget() -> u32 {
    RetryBudget::DEFAULT_RETRIES
}

impl ClientConfig {
    /// Creates a configuration with the default retry budget and no timeout.
    pub fn new(api_server_address: ApiServerAddress) -> Self {
        Self {
            api_server_address,
            retry_budget: default_retry_budget(),
            request_timeout_secs: None,
        }
    }

    /// Parses a configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Reads and parses a TOML configuration file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loaded client configuration");
        Self::from_toml_str(&contents)
    }

    /// A fresh retry budget for one call.
    pub fn retry_budget(&self) -> RetryBudget {
        RetryBudget::new(self.retry_budget)
    }

    /// The per-attempt timeout, if configured.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}
