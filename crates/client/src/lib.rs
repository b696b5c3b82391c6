//! ja client: fire-and-forget RPC calls with bounded retry.
//!
//! [`RpcCaller`] implements the calling convention; [`HttpTransport`] carries
//! each attempt over HTTP with `reqwest`; [`ClientConfig`] supplies the API
//! server address and retry budget.
//!
//! ```no_run
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use client::{ApiServerAddress, ClientConfig, RpcCaller};
//! use protocol::MethodName;
//!
//! let config = ClientConfig::new(ApiServerAddress::parse("http://127.0.0.1:7899")?);
//! let caller = RpcCaller::from_config(&config)?;
//! let method = MethodName::new("Ping").ok_or("bad method")?;
//! caller.call_with(method, &serde_json::json!({"Greetings": "hi"}), |result| {
//!     println!("{result}");
//! });
//! # Ok(())
//! # }
//! ```
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** HTTP transport, request formatting, response parsing
//! and the retry loop live here. Domain types come from the [`protocol`]
//! crate.

pub mod caller;
pub mod config;
pub mod http;

pub use caller::{CallHandle, RpcCaller, SuccessCallback};
pub use config::{ApiServerAddress, ClientConfig, ConfigError};
pub use http::{BuildError, HttpTransport};
