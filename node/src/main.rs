// Copyright (c) 2026 Verdant Labs. MIT License.
// See LICENSE for details.

//! # VERDANT Provenance Node
//!
//! Entry point for the `verdant-node` binary. Parses CLI arguments,
//! initializes logging and metrics, and serves the HTTP/WS API backed by
//! an in-memory provenance chain and a persistent record mirror.
//!
//! The binary supports three subcommands:
//!
//! - `run`     - start the provenance node
//! - `status`  - query a running node's status endpoint
//! - `version` - print build version information

mod api;
mod cli;
mod logging;
mod metrics;
mod qr;
mod store;

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::{broadcast, RwLock};

use verdant_ledger::Chain;

use cli::{Commands, VerdantNodeCli};
use logging::LogFormat;
use metrics::NodeMetrics;
use store::RecordStore;

/// Capacity of the live-event broadcast channel. 256 rides out a burst of
/// submissions without dropping events for connected WebSocket clients.
const EVENT_CHANNEL_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = VerdantNodeCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Status(args) => query_status(args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Boots the node: record mirror, fresh chain, then both HTTP servers.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(
        "verdant_node=info,verdant_ledger=info,tower_http=debug",
        LogFormat::from_str_lossy(&args.log_format),
    );

    tracing::info!(
        api_port = args.api_port,
        metrics_port = args.metrics_port,
        data_dir = %args.data_dir.display(),
        public_url = %args.public_url,
        "starting verdant-node"
    );

    // --- Record mirror ---
    let store_path = args.data_dir.join("records");
    std::fs::create_dir_all(&args.data_dir).with_context(|| {
        format!("failed to create data directory: {}", args.data_dir.display())
    })?;

    let store = Arc::new(
        RecordStore::open(&store_path)
            .with_context(|| format!("failed to open record store at {}", store_path.display()))?,
    );
    tracing::info!(path = %store_path.display(), rows = store.len(), "record store opened");

    // --- Provenance chain ---
    // The chain itself is in-memory and starts at a fresh genesis block on
    // every boot. Only the record mirror persists across restarts.
    let chain = Chain::new();
    tracing::info!(genesis = %chain.tip().short_id(), "chain initialized at genesis");
    let chain = Arc::new(RwLock::new(chain));

    // --- Observability ---
    let node_metrics = Arc::new(NodeMetrics::new());
    node_metrics.chain_length.set(1);
    node_metrics.chain_valid.set(1);

    // --- Live event fan-out ---
    let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

    // --- Shared state ---
    let app_state = api::AppState {
        version: format!(
            "{} (ledger {})",
            env!("CARGO_PKG_VERSION"),
            verdant_ledger::config::LEDGER_VERSION,
        ),
        public_url: args.public_url.clone(),
        chain,
        store: Arc::clone(&store),
        event_tx,
        metrics: Arc::clone(&node_metrics),
    };

    // --- HTTP API ---
    let api_router = api::create_router(app_state.clone());
    let api_addr = SocketAddr::from(([0, 0, 0, 0], args.api_port));
    let api_listener = tokio::net::TcpListener::bind(api_addr)
        .await
        .with_context(|| format!("failed to bind the API listener on {api_addr}"))?;
    tracing::info!(addr = %api_addr, "api server ready");

    // --- Metrics exposition ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&node_metrics));
    let metrics_addr = SocketAddr::from(([0, 0, 0, 0], args.metrics_port));
    let metrics_listener = tokio::net::TcpListener::bind(metrics_addr)
        .await
        .with_context(|| format!("failed to bind the metrics listener on {metrics_addr}"))?;
    tracing::info!(addr = %metrics_addr, "metrics exposition ready");

    // --- Run until shutdown ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("api server exited: {e}");
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("metrics server exited: {e}");
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, stopping servers");
        }
    }

    if let Err(e) = store.flush() {
        tracing::warn!("failed to flush record store on shutdown: {}", e);
    }
    tracing::info!("verdant-node stopped");
    Ok(())
}

/// Fetches `/api/status` from a running node and prints the JSON body.
async fn query_status(args: cli::StatusArgs) -> Result<()> {
    let (host, port, _) = split_url(&args.api_url)?;
    let body = http_get(&host, port, "/api/status").await?;
    println!("{}", body);
    Ok(())
}

/// Splits an `http://host[:port][/path]` URL into its parts.
/// Just enough parsing for the status subcommand; no URL crate needed.
fn split_url(url: &str) -> Result<(String, u16, String)> {
    let rest = url.strip_prefix("http://").unwrap_or(url);
    let (authority, path) = match rest.find('/') {
        Some(i) => (&rest[..i], &rest[i..]),
        None => (rest, "/"),
    };
    let (host, port) = match authority.rsplit_once(':') {
        Some((h, p)) => {
            let port = p
                .parse::<u16>()
                .with_context(|| format!("bad port in URL: {p:?}"))?;
            (h.to_string(), port)
        }
        None => (authority.to_string(), 80),
    };
    if host.is_empty() {
        anyhow::bail!("missing host in URL: {url:?}");
    }
    Ok((host, port, path.to_string()))
}

/// Minimal HTTP/1.1 GET over a raw TCP stream.
/// Keeps the binary free of an HTTP client dependency for one request.
async fn http_get(host: &str, port: u16, path: &str) -> Result<String> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let mut stream = tokio::net::TcpStream::connect((host, port))
        .await
        .with_context(|| format!("failed to connect to {host}:{port}"))?;

    let request = format!("GET {path} HTTP/1.1\r\nHost: {host}\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await?;
    stream.shutdown().await?;

    let mut raw = String::new();
    stream.read_to_string(&mut raw).await?;

    // The body starts after the header block's blank line.
    match raw.split_once("\r\n\r\n") {
        Some((_, body)) => Ok(body.to_string()),
        None => Ok(raw),
    }
}

/// Prints the binary, ledger, and compiler versions.
fn print_version() {
    let rustc = option_env!("RUSTC_VERSION").unwrap_or("unknown");
    println!("verdant-node {}", env!("CARGO_PKG_VERSION"));
    println!("ledger       {}", verdant_ledger::config::LEDGER_VERSION);
    println!("rustc        {rustc}");
}

/// Resolves on SIGINT or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
