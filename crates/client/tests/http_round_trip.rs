//! End-to-end calls: `RpcCaller` + `HttpTransport` against a live server.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use client::{ApiServerAddress, ClientConfig, RpcCaller};
use protocol::{CallOutcome, MethodName};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use server::{Handler, MethodError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[derive(Deserialize)]
struct PingRequest {
    #[serde(default)]
    good_id: i64,
    #[serde(rename = "Greetings")]
    greetings: String,
}

#[derive(Serialize)]
struct PingResponse {
    #[serde(rename = "Echo")]
    echo: String,
    #[serde(rename = "Num")]
    num: i64,
}

async fn ping(req: PingRequest) -> Result<PingResponse, MethodError> {
    Ok(PingResponse {
        echo: req.greetings,
        num: req.good_id,
    })
}

fn method(name: &str) -> MethodName {
    MethodName::new(name).unwrap()
}

/// Serves `handler` on an ephemeral port, counting every request it sees.
async fn spawn_server(handler: Handler) -> (SocketAddr, Arc<AtomicU32>) {
    let requests = Arc::new(AtomicU32::new(0));
    let counter = requests.clone();
    let handler = handler.hook(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server::serve(listener, handler));
    (addr, requests)
}

fn caller_for(addr: SocketAddr) -> RpcCaller {
    let address = ApiServerAddress::parse(&format!("http://{addr}")).unwrap();
    RpcCaller::from_config(&ClientConfig::new(address)).unwrap()
}

#[tokio::test]
async fn ok_call_delivers_the_result() {
    let (addr, requests) = spawn_server(Handler::new().register(method("Ping"), ping)).await;
    let (tx, rx) = tokio::sync::oneshot::channel();

    let outcome = caller_for(addr)
        .call_with(
            method("Ping"),
            &json!({"good_id": 42, "Greetings": "hello, world!"}),
            move |result| {
                let _ = tx.send(result);
            },
        )
        .outcome()
        .await
        .unwrap();

    assert_eq!(outcome, CallOutcome::Delivered { attempts: 1 });
    assert_eq!(rx.await.unwrap(), json!({"Echo": "hello, world!", "Num": 42}));
    assert_eq!(requests.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn server_rejection_is_not_retried() {
    let (addr, requests) = spawn_server(Handler::new().register(method("Ping"), ping)).await;

    let outcome = caller_for(addr)
        .call(method("Pong"), &json!({}), None)
        .outcome()
        .await
        .unwrap();

    assert_eq!(
        outcome,
        CallOutcome::Rejected {
            status: server::NO_SUCH_METHOD.to_owned(),
            attempts: 1
        }
    );
    assert_eq!(requests.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn bad_arguments_are_a_rejection() {
    let (addr, requests) = spawn_server(Handler::new().register(method("Ping"), ping)).await;

    let outcome = caller_for(addr)
        .call(method("Ping"), &json!({"Greetings": 7}), None)
        .outcome()
        .await
        .unwrap();

    assert_eq!(
        outcome,
        CallOutcome::Rejected {
            status: server::BAD_REQUEST.to_owned(),
            attempts: 1
        }
    );
    assert_eq!(requests.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn server_errors_are_retried_until_success() {
    #[derive(Serialize)]
    #[serde(untagged)]
    enum Flaky {
        Broken(HashMap<(u8, u8), u8>),
        Fine(Value),
    }

    let served = Arc::new(AtomicU32::new(0));
    let count = served.clone();
    let handler = Handler::new().register(method("Flaky"), move |_: Value| {
        let n = count.fetch_add(1, Ordering::SeqCst);
        async move {
            // The first three responses cannot be encoded and become HTTP 500.
            if n < 3 {
                Ok::<_, MethodError>(Flaky::Broken(HashMap::from([((0, 0), 0)])))
            } else {
                Ok(Flaky::Fine(json!("recovered")))
            }
        }
    });
    let (addr, requests) = spawn_server(handler).await;
    let (tx, rx) = tokio::sync::oneshot::channel();

    let outcome = caller_for(addr)
        .call_with(method("Flaky"), &json!({}), move |result| {
            let _ = tx.send(result);
        })
        .outcome()
        .await
        .unwrap();

    assert_eq!(outcome, CallOutcome::Delivered { attempts: 4 });
    assert_eq!(rx.await.unwrap(), json!("recovered"));
    assert_eq!(requests.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn unreachable_server_exhausts_the_budget() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let outcome = caller_for(addr)
        .call(method("Ping"), &json!({}), None)
        .outcome()
        .await
        .unwrap();

    assert_eq!(outcome, CallOutcome::Exhausted { attempts: 11 });
}

/// Answers every connection with the same canned HTTP response.
async fn spawn_raw_server(response: &'static str) -> (SocketAddr, Arc<AtomicU32>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let connections = Arc::new(AtomicU32::new(0));
    let counter = connections.clone();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(answer(stream, response));
        }
    });
    (addr, connections)
}

async fn answer(mut stream: TcpStream, response: &'static str) {
    let mut request = Vec::new();
    let mut chunk = [0u8; 1024];
    // Read the whole request so closing the socket does not reset it.
    loop {
        let Ok(n) = stream.read(&mut chunk).await else { return };
        if n == 0 {
            return;
        }
        request.extend_from_slice(&chunk[..n]);
        if request_complete(&request) {
            break;
        }
    }
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
}

fn request_complete(request: &[u8]) -> bool {
    let text = String::from_utf8_lossy(request);
    let Some(header_end) = text.find("\r\n\r\n") else {
        return false;
    };
    let content_length = text[..header_end]
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    request.len() >= header_end + 4 + content_length
}

#[tokio::test]
async fn non_json_body_is_a_transport_failure() {
    let (addr, connections) = spawn_raw_server(
        "HTTP/1.1 200 OK\r\ncontent-type: text/plain\r\ncontent-length: 5\r\nconnection: close\r\n\r\nhello",
    )
    .await;

    let outcome = caller_for(addr)
        .with_retries(2)
        .call(method("Ping"), &json!({}), None)
        .outcome()
        .await
        .unwrap();

    assert_eq!(outcome, CallOutcome::Exhausted { attempts: 3 });
    assert_eq!(connections.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn http_error_status_is_a_transport_failure() {
    let (addr, connections) = spawn_raw_server(
        "HTTP/1.1 503 Service Unavailable\r\ncontent-type: application/json\r\ncontent-length: 17\r\nconnection: close\r\n\r\n{\"status\": \"ok\"}\n",
    )
    .await;

    let outcome = caller_for(addr)
        .with_retries(1)
        .call(method("Ping"), &json!({}), None)
        .outcome()
        .await
        .unwrap();

    assert_eq!(outcome, CallOutcome::Exhausted { attempts: 2 });
    assert_eq!(connections.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn non_envelope_json_is_a_rejection() {
    let (addr, connections) = spawn_raw_server(
        "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 7\r\nconnection: close\r\n\r\n[1,2,3]",
    )
    .await;

    let outcome = caller_for(addr)
        .call(method("Ping"), &json!({}), None)
        .outcome()
        .await
        .unwrap();

    assert_eq!(
        outcome,
        CallOutcome::Rejected {
            status: String::new(),
            attempts: 1
        }
    );
    assert_eq!(connections.load(Ordering::SeqCst), 1);
}
