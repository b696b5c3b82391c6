//! ja command-line entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Wire observability**: configure `tracing-subscriber` with a JSON layer
//!    and, optionally, an OpenTelemetry OTLP exporter. All `tracing` spans and
//!    events emitted by every crate in the workspace flow through it.
//! 2. **Resolve configuration**: load the client TOML file and apply
//!    command-line overrides, once, before any call is made.
//! 3. **Run a subcommand**:
//!    - `call`: issue one call through `RpcCaller` + `HttpTransport` and print
//!      the result.
//!    - `serve`: serve the demonstration procedures until Ctrl-C.

mod demo;
mod observability;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use client::{ApiServerAddress, ClientConfig, RpcCaller};
use protocol::{CallOutcome, MethodName};
use serde_json::Value;

#[derive(Parser, Debug)]
#[command(name = "ja", version, about = "Call and serve JSON-envelope RPC procedures over HTTP")]
struct Cli {
    /// OTLP gRPC endpoint to export spans to (e.g. http://localhost:4317).
    #[arg(long, global = true)]
    otlp_endpoint: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Call a remote procedure and print its result.
    Call {
        /// Procedure name, appended to the API server address.
        method: String,

        /// Arguments as a JSON document.
        #[arg(default_value = "null")]
        args: String,

        /// Client configuration file (TOML).
        #[arg(long)]
        config: Option<PathBuf>,

        /// API server base address; overrides the configuration file.
        #[arg(long)]
        api_server_address: Option<String>,
    },

    /// Serve the demonstration procedures.
    Serve {
        /// Address to listen on.
        #[arg(long, default_value = "127.0.0.1:7899")]
        listen: SocketAddr,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let telemetry = observability::init(cli.otlp_endpoint.as_deref())?;

    let result = match cli.command {
        Command::Call {
            method,
            args,
            config,
            api_server_address,
        } => {
            let config = resolve_config(config, api_server_address)?;
            call(&config, &method, &args).await
        }
        Command::Serve { listen } => serve(listen).await,
    };

    telemetry.shutdown();
    result
}

/// The file supplies the base; `--api-server-address` overrides its address or
/// stands in for the file entirely.
fn resolve_config(
    path: Option<PathBuf>,
    address: Option<String>,
) -> anyhow::Result<ClientConfig> {
    let address = address
        .as_deref()
        .map(ApiServerAddress::parse)
        .transpose()?;
    match (path, address) {
        (Some(path), address) => {
            let mut config = ClientConfig::from_toml_file(&path)?;
            if let Some(address) = address {
                config.api_server_address = address;
            }
            Ok(config)
        }
        (None, Some(address)) => Ok(ClientConfig::new(address)),
        (None, None) => bail!("either --config or --api-server-address is required"),
    }
}

async fn call(config: &ClientConfig, method: &str, args: &str) -> anyhow::Result<()> {
    let method = MethodName::new(method).ok_or_else(|| anyhow!("invalid method name '{method}'"))?;
    let args: Value = serde_json::from_str(args).context("arguments must be a JSON document")?;
    let caller = RpcCaller::from_config(config)?;

    let (tx, rx) = tokio::sync::oneshot::channel();
    let outcome = caller
        .call_with(method, &args, move |result| {
            let _ = tx.send(result);
        })
        .outcome()
        .await?;

    match outcome {
        CallOutcome::Delivered { .. } => {
            let result = rx.await.context("success callback did not run")?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        CallOutcome::Rejected { status, .. } => bail!("call not ok: {status}"),
        CallOutcome::Exhausted { attempts } => bail!("no response after {attempts} attempts"),
        CallOutcome::Unsent => bail!("arguments could not be encoded"),
    }
}

async fn serve(listen: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .with_context(|| format!("failed to bind {listen}"))?;
    let shutdown = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl-C");
        }
    };
    server::serve_with_shutdown(listener, demo::handler()?, shutdown).await?;
    Ok(())
}
