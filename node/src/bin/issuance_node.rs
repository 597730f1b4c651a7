//! `issuance-node` binary: mints one-shot voter credentials, serves the
//! resulting chain exactly once, and exits.

use std::sync::Arc;

use axum::{Router, routing::get};
use clap::Parser;
use tokio::sync::{Notify, RwLock};

use ledger::{Ledger, MetricsRegistry, run_prometheus_http_server};
use node::config::{IssuanceArgs, MetricsConfig};
use node::routes::issuance;
use node::state::{IssuanceState, SharedIssuanceState};
use node::{bootstrap, persistence};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "issuance_node=info,node=info,ledger=info".to_string()),
        )
        .init();

    let args = IssuanceArgs::parse();

    if let Err(e) = run(args).await {
        eprintln!("fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(args: IssuanceArgs) -> Result<(), String> {
    let metrics = Arc::new(
        MetricsRegistry::new().map_err(|e| format!("failed to initialize metrics registry: {e}"))?,
    );
    let metrics_cfg = MetricsConfig::for_node_port(args.port);
    let metrics_for_exporter = metrics.clone();
    tokio::spawn(async move {
        if let Err(e) = run_prometheus_http_server(metrics_for_exporter, metrics_cfg.listen_addr).await {
            tracing::warn!(error = %e, "metrics HTTP server error");
        }
    });
    tracing::info!(addr = %metrics_cfg.listen_addr, "metrics exporter listening");

    tracing::info!(
        port = args.port,
        numvotes = args.numvotes,
        votes_per_person = args.votes_per_person,
        "minting voter credentials"
    );

    let mut ledger = Ledger::new();
    bootstrap::mine_votes(&mut ledger, args.numvotes, args.votes_per_person).await;
    metrics.ledger.chain_length.set(ledger.len() as f64);

    tracing::info!(
        total_value = ledger.total_value(),
        chain_length = ledger.len(),
        credentials_dir = persistence::SECRET_KEYS_DIR,
        "minting complete, serving chain once"
    );

    let state: SharedIssuanceState = Arc::new(IssuanceState {
        ledger: RwLock::new(ledger),
        metrics,
        served: Notify::new(),
    });

    let app = Router::new()
        .route("/chain/", get(issuance::chain))
        .route("/chain", get(issuance::chain))
        .route("/nodes/", get(issuance::nodes))
        .route("/nodes", get(issuance::nodes))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind(args.listen_addr())
        .await
        .map_err(|e| format!("failed to bind {}: {e}", args.listen_addr()))?;

    tracing::info!(addr = %args.listen_addr(), "issuance node listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_after_chain_served(state))
        .await
        .map_err(|e| format!("issuance HTTP server error: {e}"))?;

    Ok(())
}

/// Waits for the chain-download handler to signal that it flushed its
/// response, then returns so the server stops accepting new connections.
/// An issuance node serves exactly one `/chain/` request in its lifetime.
async fn shutdown_after_chain_served(state: SharedIssuanceState) {
    state.served.notified().await;
    tracing::info!("chain served, shutting down");
}
