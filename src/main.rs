//! `trie-router` binary: serve configured fixed-response routes.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use trie_router::config::{load_config, ConfigWatcher};
use trie_router::lifecycle::{wait_for_shutdown, Shutdown};
use trie_router::observability::{logging, metrics};
use trie_router::{HttpServer, Router, ServerConfig};

#[derive(Debug, Parser)]
#[command(name = "trie-router", version, about = "Prefix-tree HTTP router")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,

    /// Print the route trees and exit.
    #[arg(long)]
    print_routes: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = &cli.bind {
        config.listener.bind_address = bind.clone();
    }

    let router = Router::from_config(&config)?;
    if cli.print_routes {
        println!("{router}");
        return Ok(());
    }

    logging::init(&config.observability)?;
    tracing::info!("trie-router v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        routes = config.routes.len(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, router);

    // Keep the watcher alive for the lifetime of the server.
    let _watcher = match &cli.config {
        Some(path) => {
            let (watcher, mut updates) = ConfigWatcher::new(path);
            let handle = server.router_handle();
            let mut stop = shutdown.subscribe();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        Some(new_config) = updates.recv() => {
                            match Router::from_config(&new_config) {
                                Ok(router) => {
                                    handle.store(Arc::new(router));
                                    tracing::info!(routes = new_config.routes.len(), "Router reloaded");
                                }
                                Err(e) => tracing::error!(error = %e, "Rebuilding router failed; keeping current routes"),
                            }
                        }
                        _ = stop.recv() => break,
                    }
                }
            });
            Some(watcher.run()?)
        }
        None => None,
    };

    tokio::spawn(wait_for_shutdown(shutdown.clone()));
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
