//! corvid-server: entry point for the caw platform.
//!
//! Loads config, opens the file-backed store, wires the Faz dispatcher
//! over the handler registry, then serves the store and faz gRPC services
//! on the configured listen address.

use corvid_faz::Faz;
use corvid_store::{KvStore, SharedStore, SyncPolicy};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    corvid_metrics::init_tracing();

    // Load config: first CLI arg is the YAML config path
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.yaml".to_string());

    let config =
        corvid_config::load_from_file(std::path::Path::new(&config_path)).unwrap_or_else(|e| {
            tracing::warn!(
                "failed to load config from {}: {}, using defaults",
                config_path,
                e
            );
            corvid_config::ServerConfig::default()
        });

    // Open the store, replaying (and if needed repairing) the change log.
    let sync = SyncPolicy::from_str_config(&config.storage.sync);
    let store = KvStore::open(&config.storage.data_file, sync)?;
    let shared = SharedStore::new(store);
    tracing::info!(
        "store ready with {} key(s) at {:?}",
        shared.len().await,
        config.storage.data_file
    );

    // The dispatcher shares the store with the RPC shim.
    let faz = Arc::new(Faz::new(Arc::new(shared.clone()), corvid_caw::REGISTRY));

    // Spawn metrics HTTP server if configured
    if let Some(metrics_port) = config.metrics_port {
        let metrics_addr: std::net::SocketAddr = format!("0.0.0.0:{}", metrics_port)
            .parse()
            .expect("valid metrics address");
        tokio::spawn(async move {
            if let Err(e) = corvid_metrics::serve_metrics(metrics_addr).await {
                tracing::warn!("metrics server failed: {}", e);
            }
        });
    }

    // Serve with graceful shutdown on Ctrl+C
    let router = corvid_net::build_server(shared, faz);
    tracing::info!("serving gRPC on {}", config.listen);
    tokio::select! {
        result = router.serve(config.listen) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
