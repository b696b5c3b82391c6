//! Protocol domain for ja, a JSON-envelope RPC convention carried over HTTP.
//!
//! A request is `POST <base>/<method>` with a JSON body; every response is an
//! envelope `{ "status": ..., "result": ... }`. This crate holds the types both
//! sides agree on and the [`Transport`] port the client drives.
//!
//! ## Architectural Layer
//!
//! **Domain + port definitions.** This crate has no I/O dependencies. The
//! `client` crate supplies the HTTP transport and the retrying caller; the
//! `server` crate produces envelopes.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | `MethodName`, `CallId` |
//! | [`types`] | `Envelope`, `RetryBudget`, `CallOutcome` |
//! | [`errors`] | `TransportError`, `CallFailure`, `RetryPolicy` |
//! | [`transport`] | The `Transport` trait |

pub mod errors;
pub mod identifiers;
pub mod transport;
pub mod types;

pub use errors::{CallFailure, RetryPolicy, TransportError};
pub use identifiers::{CallId, MethodName};
pub use transport::Transport;
pub use types::{CallOutcome, Envelope, RetryBudget};
