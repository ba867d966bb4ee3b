//! ChestKV Server Binary
//!
//! Starts the TCP server for ChestKV.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use chestkv::network::Server;
use chestkv::{Config, Engine, SaveFailurePolicy};
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

/// ChestKV Server
#[derive(Parser, Debug)]
#[command(name = "chestkv-server")]
#[command(about = "In-memory typed key-value store with snapshot persistence")]
#[command(version)]
struct Args {
    /// Snapshot file
    #[arg(short, long, default_value = "./chestkv.snapshot")]
    snapshot: String,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:7480")]
    listen: String,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// Minimum time between notification-triggered saves (ms)
    #[arg(long, default_value = "1000")]
    debounce_ms: u64,

    /// Periodic save interval for a dirty store (ms)
    #[arg(long, default_value = "1000")]
    flush_interval_ms: u64,

    /// Log save failures and keep serving instead of aborting
    #[arg(long)]
    keep_running_on_save_error: bool,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,chestkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("ChestKV Server v{}", chestkv::VERSION);
    tracing::info!("Snapshot file: {}", args.snapshot);
    tracing::info!("Listen address: {}", args.listen);

    let policy = if args.keep_running_on_save_error {
        SaveFailurePolicy::LogAndContinue
    } else {
        SaveFailurePolicy::Fatal
    };

    let config = match Config::builder()
        .snapshot_path(&args.snapshot)
        .listen_addr(&args.listen)
        .max_connections(args.max_connections)
        .debounce_window(Duration::from_millis(args.debounce_ms))
        .flush_interval(Duration::from_millis(args.flush_interval_ms))
        .save_failure_policy(policy)
        .build()
    {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };

    let engine = match Engine::open(config.clone()) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Engine initialized with {} keys", engine.len());

    let server = match Server::bind(config, Arc::clone(&engine)) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    let shutdown = server.shutdown_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::info!("Received Ctrl+C, initiating shutdown...");
        shutdown.store(true, Ordering::Release);
    }) {
        tracing::warn!("Could not install Ctrl+C handler: {}", e);
    }

    let run_result = server.run();

    // Every connection thread has exited; close refuses later writes and saves
    if let Err(e) = engine.close() {
        tracing::error!("Error during final save: {}", e);
    }

    if let Err(e) = run_result {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
