// Copyright 2026 The Onelane Project
// SPDX-License-Identifier: Apache-2.0

use clap::Parser;
use onelane::cache::ResponseCache;
use onelane::catalog::ModelCatalog;
use onelane::completer::{CommandCompleter, Completer};
use onelane::config::{RuntimeConfig, DEFAULT_PORT, DEFAULT_PROXY_UPSTREAM};
use onelane::gate::{Gate, RateLimit, RateLimitMode, StdinApprover};
use onelane::queue::{run_worker, DispatchQueue};
use onelane::server::{build_router, AppState};
use onelane::synth::{BuildOptions, DEFAULT_CHUNK_SIZE};

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "onelane", about = "Dual-protocol bridge for a single-flight chat backend")]
struct Cli {
    /// Port to listen on
    #[arg(long, default_value_t = DEFAULT_PORT, env = "ONELANE_PORT")]
    port: u16,

    /// Treat backend answers as JSON envelopes
    #[arg(long)]
    json: bool,

    /// Require operator approval for every request
    #[arg(long)]
    manual: bool,

    /// Minimum milliseconds between admitted requests
    #[arg(long, env = "ONELANE_RATE_LIMIT_MS")]
    rate_limit_ms: Option<u64>,

    /// Hold rate-limited requests instead of rejecting them
    #[arg(long)]
    rate_limit_wait: bool,

    /// Characters per synthetic stream chunk
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Bearer key for pass-through requests
    #[arg(long, env = "ONELANE_PROXY_API_KEY")]
    proxy_api_key: Option<String>,

    /// OpenAI-compatible upstream for pass-through requests
    #[arg(long, default_value = DEFAULT_PROXY_UPSTREAM, env = "ONELANE_PROXY_UPSTREAM")]
    proxy_upstream: String,

    /// JSON file with the model catalog to advertise
    #[arg(long)]
    models: Option<PathBuf>,

    /// Backend command fed the rendered prompt on stdin
    #[arg(long, default_value = "cat", env = "ONELANE_BACKEND")]
    backend_cmd: String,

    /// Argument for the backend command (repeatable)
    #[arg(long = "backend-arg")]
    backend_args: Vec<String>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .json()
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Arc::new(RuntimeConfig {
        port: cli.port,
        json_mode: cli.json,
        manual_approve: cli.manual,
        rate_limit: cli.rate_limit_ms.map(Duration::from_millis),
        rate_limit_wait: cli.rate_limit_wait,
        chunk_size: cli.chunk_size.max(1),
        proxy_api_key: cli.proxy_api_key,
        proxy_upstream: cli.proxy_upstream,
        models_file: cli.models,
        backend_cmd: cli.backend_cmd,
        backend_args: cli.backend_args,
    });

    let catalog = match &config.models_file {
        Some(path) => match ModelCatalog::from_json_file(path) {
            Ok(catalog) => catalog,
            Err(e) => {
                tracing::error!("failed to load model catalog: {e}");
                std::process::exit(1);
            }
        },
        None => ModelCatalog::builtin(),
    };

    let approver = config
        .manual_approve
        .then(|| Arc::new(StdinApprover) as Arc<dyn onelane::gate::Approver>);
    let rate = config.rate_limit.map(|interval| {
        let mode = if config.rate_limit_wait {
            RateLimitMode::Wait
        } else {
            RateLimitMode::Reject
        };
        RateLimit::new(interval, mode)
    });
    let gate = Arc::new(Gate::new(approver, rate));

    let queue = DispatchQueue::new();
    let completer: Arc<dyn Completer> = Arc::new(CommandCompleter::new(
        config.backend_cmd.clone(),
        config.backend_args.clone(),
    ));
    tokio::spawn(run_worker(
        queue.clone(),
        completer,
        BuildOptions {
            json_mode: config.json_mode,
            chunk_size: config.chunk_size,
        },
    ));

    let state = AppState {
        queue,
        gate,
        cache: Arc::new(ResponseCache::with_defaults()),
        catalog: Arc::new(catalog),
        config: config.clone(),
        http: reqwest::Client::new(),
    };

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    tracing::info!(%addr, backend = %config.backend_cmd, "onelane starting");

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind to address");

    tracing::info!(%addr, "onelane listening");

    axum::serve(listener, app)
        .await
        .expect("server error");
}
