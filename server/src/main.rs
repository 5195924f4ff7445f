// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # VENDO Server
//!
//! Entry point for the `vendo-server` binary. Parses CLI arguments,
//! initializes logging and metrics, opens the inventory snapshot, and
//! serves the vending machine HTTP API.
//!
//! The binary supports four subcommands:
//!
//! - `run`     — start the vending machine service
//! - `init`    — write the seed catalog to an inventory file
//! - `status`  — query a running server's status endpoint
//! - `version` — print build version information

mod api;
mod cli;
mod logging;
mod metrics;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::Mutex;

use vendo_machine::config::MACHINE_VERSION;
use vendo_machine::inventory::Inventory;
use vendo_machine::machine::VendingMachine;
use vendo_machine::store::JsonStore;

use cli::{Commands, VendoCli};
use logging::LogFormat;
use metrics::MachineMetrics;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = VendoCli::parse();

    match cli.command {
        Commands::Run(args) => run_server(args).await,
        Commands::Init(args) => init_inventory(args),
        Commands::Status(args) => query_status(args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Starts the full service: API server and metrics endpoint over one
/// machine instance.
async fn run_server(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(
        "vendo_server=info,vendo_machine=info,tower_http=debug",
        LogFormat::from_str_lossy(&args.log_format),
    );

    tracing::info!(
        port = args.port,
        metrics_port = args.metrics_port,
        inventory = %args.inventory.display(),
        "starting vendo-server"
    );

    // --- Inventory snapshot ---
    let store = JsonStore::new(&args.inventory);
    let machine = VendingMachine::open(store).with_context(|| {
        format!(
            "failed to load inventory from {} (run `vendo-server init` first?)",
            args.inventory.display()
        )
    })?;
    tracing::info!(
        items = machine.inventory().len(),
        total_stock = machine.inventory().total_stock(),
        "inventory loaded"
    );

    // --- Metrics ---
    let machine_metrics = Arc::new(MachineMetrics::new());

    // --- Application state ---
    let app_state = api::AppState {
        version: format!("{} (machine {})", env!("CARGO_PKG_VERSION"), MACHINE_VERSION),
        machine: Arc::new(Mutex::new(machine)),
        metrics: Arc::clone(&machine_metrics),
        admin: Arc::new(api::AdminAuth::new(&args.admin_user, &args.admin_password)),
    };

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("0.0.0.0:{}", args.port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {}", api_addr))?;
    tracing::info!("API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&machine_metrics));
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, draining connections");
        }
    }

    tracing::info!("vendo-server stopped");
    Ok(())
}

/// Writes the seed catalog to the configured inventory file.
fn init_inventory(args: cli::InitArgs) -> Result<()> {
    logging::init_logging("vendo_server=info", LogFormat::Pretty);

    if args.inventory.exists() && !args.force {
        anyhow::bail!(
            "inventory file {} already exists (pass --force to overwrite)",
            args.inventory.display()
        );
    }

    let store = JsonStore::new(&args.inventory);
    let catalog = Inventory::seed();
    store.save(&catalog).with_context(|| {
        format!(
            "failed to write inventory file {}",
            args.inventory.display()
        )
    })?;

    tracing::info!(
        path = %args.inventory.display(),
        items = catalog.len(),
        "inventory file initialized"
    );

    println!("Inventory initialized successfully.");
    println!("  File        : {}", args.inventory.display());
    println!("  Slots       : {}", catalog.len());
    println!("  Total stock : {}", catalog.total_stock());

    Ok(())
}

/// Queries a running server's status endpoint and prints the result.
async fn query_status(args: cli::StatusArgs) -> Result<()> {
    let url = format!("{}/status", args.url.trim_end_matches('/'));
    let body = http_get(&url).await?;
    println!("{}", body);
    Ok(())
}

/// Minimal HTTP/1.1 GET over a raw TCP stream. One internal request per
/// `status` invocation doesn't justify an HTTP client dependency.
async fn http_get(url: &str) -> Result<String> {
    let rest = url
        .strip_prefix("http://")
        .ok_or_else(|| anyhow::anyhow!("only http:// URLs are supported: {url}"))?;

    let (authority, path) = match rest.find('/') {
        Some(i) => (&rest[..i], &rest[i..]),
        None => (rest, "/"),
    };
    let addr = if authority.contains(':') {
        authority.to_string()
    } else {
        format!("{authority}:80")
    };

    let mut stream = tokio::net::TcpStream::connect(&addr)
        .await
        .with_context(|| format!("failed to connect to {}", addr))?;

    let host = authority.split(':').next().unwrap_or(authority);
    let request = format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
        path, host,
    );

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    stream.write_all(request.as_bytes()).await?;
    stream.shutdown().await?;

    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await?;
    let response = String::from_utf8_lossy(&buf);

    // Everything after the first blank line is the body.
    let body = response
        .split_once("\r\n\r\n")
        .map(|(_, b)| b.to_string())
        .unwrap_or_else(|| response.to_string());

    Ok(body)
}

/// Prints version information to stdout.
fn print_version() {
    println!("vendo-server {}", env!("CARGO_PKG_VERSION"));
    println!("machine      {}", MACHINE_VERSION);
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
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
