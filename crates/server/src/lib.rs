//! ja server: the envelope-producing side of the protocol.
//!
//! A [`Handler`] maps method names to async procedures. Every request is
//! answered with a JSON envelope; see [`handler`] for the dispatch order and
//! [`errors`] for the status strings.
//!
//! ```no_run
//! # async fn demo() -> std::io::Result<()> {
//! use protocol::MethodName;
//! use server::{Handler, MethodError};
//!
//! let echo = MethodName::new("Echo").expect("valid method name");
//! let handler = Handler::new().register(echo, |value: serde_json::Value| async move {
//!     Ok::<_, MethodError>(value)
//! });
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:7899").await?;
//! server::serve(listener, handler).await
//! # }
//! ```

pub mod errors;
pub mod handler;

use std::future::Future;

use tokio::net::TcpListener;

pub use errors::{ErrorStatus, MethodError, BAD_REQUEST, BAD_REQUEST_BODY, CALL_ERROR, NO_SUCH_METHOD};
pub use handler::{CallInfo, Handler, DEFAULT_BODY_LIMIT};

/// Serves `handler` on `listener` until the task is dropped or an I/O error
/// ends the accept loop.
pub async fn serve(listener: TcpListener, handler: Handler) -> std::io::Result<()> {
    serve_with_shutdown(listener, handler, std::future::pending()).await
}

/// Serves `handler` on `listener` until `shutdown` completes, then drains
/// in-flight requests.
pub async fn serve_with_shutdown<S>(
    listener: TcpListener,
    handler: Handler,
    shutdown: S,
) -> std::io::Result<()>
where
    S: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    tracing::info!(%addr, methods = handler.len(), "serving ja handler");
    axum::serve(listener, handler.into_router())
        .with_graceful_shutdown(shutdown)
        .await?;
    tracing::info!(%addr, "server stopped");
    Ok(())
}
