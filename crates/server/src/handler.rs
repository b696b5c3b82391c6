//! Method registry and request dispatch.
//!
//! Any request path is accepted; its last `/`-separated segment names the
//! procedure. Dispatch order:
//!
//! 1. hooks, in registration order (first rejection wins)
//! 2. method lookup: [`NO_SUCH_METHOD`]
//! 3. body read: [`BAD_REQUEST_BODY`]
//! 4. JSON decode into the procedure's request type: [`BAD_REQUEST`]
//! 5. the procedure itself: `"ok"` with its result, or its error status

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::{Request, State};
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use protocol::{Envelope, MethodName};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::errors::{ErrorStatus, MethodError, BAD_REQUEST, BAD_REQUEST_BODY, NO_SUCH_METHOD};

/// Largest request body read by default (2 MiB).
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// What a procedure sees of the request besides its decoded arguments.
#[derive(Debug, Clone)]
pub struct CallInfo {
    /// The procedure being called.
    pub method: MethodName,
    /// Request headers.
    pub headers: HeaderMap,
    /// The undecoded request body.
    pub raw: Bytes,
}

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Result of running a type-erased procedure.
enum Reply {
    Result(Value),
    Status(String),
    Unencodable,
}

type Procedure = Arc<dyn Fn(CallInfo) -> BoxFuture<Reply> + Send + Sync>;
type Hook = Arc<dyn Fn(&Parts) -> Result<(), ErrorStatus> + Send + Sync>;

/// Dispatches requests to registered procedures.
///
/// Built once, then turned into an axum [`Router`] with
/// [`Handler::into_router`].
#[derive(Clone)]
pub struct Handler {
    methods: HashMap<MethodName, Procedure>,
    hooks: Vec<Hook>,
    body_limit: usize,
}

impl Default for Handler {
    fn default() -> Self {
        Self::new()
    }
}

impl Handler {
    /// Creates a handler with no procedures and no hooks.
    pub fn new() -> Self {
        Self {
            methods: HashMap::new(),
            hooks: Vec::new(),
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    /// Adds a hook that runs before method lookup on every request. A hook
    /// returning `Err(status)` ends the request with that status.
    pub fn hook<H>(mut self, hook: H) -> Self
    where
        H: Fn(&Parts) -> Result<(), ErrorStatus> + Send + Sync + 'static,
    {
        self.hooks.push(Arc::new(hook));
        self
    }

    /// Sets the largest request body that will be read.
    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    /// Registers `procedure` under `name`, replacing any earlier registration.
    pub fn register<Req, Resp, F, Fut>(self, name: MethodName, procedure: F) -> Self
    where
        Req: DeserializeOwned + Send + 'static,
        Resp: Serialize + Send + 'static,
        F: Fn(Req) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Resp, MethodError>> + Send + 'static,
    {
        self.register_with_info(name, move |req, _info| procedure(req))
    }

    /// Like [`Handler::register`], but the procedure also receives the
    /// [`CallInfo`] of the request.
    pub fn register_with_info<Req, Resp, F, Fut>(mut self, name: MethodName, procedure: F) -> Self
    where
        Req: DeserializeOwned + Send + 'static,
        Resp: Serialize + Send + 'static,
        F: Fn(Req, CallInfo) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Resp, MethodError>> + Send + 'static,
    {
        let erased: Procedure = Arc::new(move |info: CallInfo| -> BoxFuture<Reply> {
            let req: Req = match serde_json::from_slice(&info.raw) {
                Ok(req) => req,
                Err(err) => {
                    tracing::warn!(method = %info.method, error = %err, "failed to decode request");
                    return Box::pin(std::future::ready(Reply::Status(BAD_REQUEST.to_owned())));
                }
            };
            let method = info.method.clone();
            let call = procedure(req, info);
            Box::pin(async move {
                match call.await {
                    Ok(resp) => match serde_json::to_value(&resp) {
                        Ok(value) => Reply::Result(value),
                        Err(err) => {
                            tracing::error!(method = %method, error = %err, "failed to encode response");
                            Reply::Unencodable
                        }
                    },
                    Err(err) => {
                        tracing::warn!(method = %method, error = %err, "call failed");
                        Reply::Status(err.status().to_owned())
                    }
                }
            })
        });
        self.methods.insert(name, erased);
        self
    }

    /// Names of all registered procedures, in no particular order.
    pub fn methods(&self) -> impl Iterator<Item = &MethodName> {
        self.methods.keys()
    }

    /// Number of registered procedures.
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// Returns `true` if no procedure is registered.
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Builds a router that sends every request, whatever its path, to this
    /// handler.
    pub fn into_router(self) -> Router {
        Router::new().fallback(dispatch).with_state(Arc::new(self))
    }

    async fn handle(&self, parts: Parts, body: Body) -> Response {
        for hook in &self.hooks {
            if let Err(status) = hook(&parts) {
                tracing::debug!(status = %status, path = %parts.uri.path(), "request rejected by hook");
                return envelope(Envelope::rejected(status.as_str()));
            }
        }

        let name = method_name(parts.uri.path());
        let Some((method, procedure)) = self.methods.get_key_value(name) else {
            tracing::debug!(method = name, "no such method");
            return envelope(Envelope::rejected(NO_SUCH_METHOD));
        };

        let raw = match axum::body::to_bytes(body, self.body_limit).await {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!(method = %method, error = %err, "failed to read request body");
                return envelope(Envelope::rejected(BAD_REQUEST_BODY));
            }
        };

        let info = CallInfo {
            method: method.clone(),
            headers: parts.headers,
            raw,
        };
        match procedure(info).await {
            Reply::Result(value) => envelope(Envelope::ok(value)),
            Reply::Status(status) => envelope(Envelope::rejected(status)),
            Reply::Unencodable => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler")
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .field("hooks", &self.hooks.len())
            .field("body_limit", &self.body_limit)
            .finish()
    }
}

async fn dispatch(State(handler): State<Arc<Handler>>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    handler.handle(parts, body).await
}

/// The last `/`-separated segment of `path`; empty for `/` or a trailing `/`.
fn method_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or_default()
}

fn envelope(envelope: Envelope) -> Response {
    (StatusCode::OK, Json(envelope)).into_response()
}
