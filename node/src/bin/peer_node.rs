//! `peer-node` binary: imports a chain from a bootstrap source, joins the
//! peer mesh, locks total value, then serves votes and reconciliation for
//! as long as the process runs.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use clap::Parser;
use tokio::signal;
use tokio::sync::RwLock;

use ledger::{Ledger, MetricsRegistry, run_prometheus_http_server};
use node::config::{MetricsConfig, PeerArgs};
use node::http_client;
use node::routes::peer;
use node::state::{PeerState, SharedPeerState};
use node::{bootstrap, candidates};

/// Ballot definition file read at startup, relative to the working
/// directory the node is started from.
const VOTE_PARAMS_PATH: &str = "vote_params.txt";

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "peer_node=info,node=info,ledger=info".to_string()),
        )
        .init();

    let args = PeerArgs::parse();

    if let Err(e) = run(args).await {
        eprintln!("fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(args: PeerArgs) -> Result<(), String> {
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

    let candidate_names = match candidates::load_candidates(Path::new(VOTE_PARAMS_PATH)).await {
        Ok(names) => names,
        Err(e) => {
            return Err(format!("failed to read {VOTE_PARAMS_PATH}: {e}"));
        }
    };
    tracing::info!(count = candidate_names.len(), "loaded candidate list");

    let http = http_client::build_client();
    let ledger = RwLock::new(Ledger::new());

    tracing::info!(source = %args.source, "bootstrapping from source");
    let Some(outcome) = bootstrap::initialize(&ledger, &http, args.port, &args.source).await else {
        return Err(format!(
            "could not import a chain from bootstrap source {}",
            args.source
        ));
    };
    if outcome.source_is_issuance {
        tracing::info!("bootstrap source was an issuance node, pruned from peer set");
    }

    {
        let ledger = ledger.read().await;
        metrics.ledger.chain_length.set(ledger.len() as f64);
        tracing::info!(
            chain_length = ledger.len(),
            total_value = ledger.total_value(),
            "bootstrap complete, election value locked"
        );
    }

    let state: SharedPeerState = Arc::new(PeerState {
        ledger,
        metrics,
        own_port: args.port,
        http,
        candidates: candidate_names,
    });

    let app = Router::new()
        .route("/chain/", get(peer::chain))
        .route("/chain", get(peer::chain))
        .route("/nodes/", get(peer::nodes))
        .route("/nodes", get(peer::nodes))
        .route("/resolve/", get(peer::resolve))
        .route("/resolve", get(peer::resolve))
        .route("/recip/", post(peer::recip))
        .route("/recip", post(peer::recip))
        .route("/remove/", post(peer::remove))
        .route("/remove", post(peer::remove))
        .route("/vote/", post(peer::vote))
        .route("/vote", post(peer::vote))
        .route("/external_transaction/", post(peer::external_transaction))
        .route("/external_transaction", post(peer::external_transaction))
        .route("/results/get_results/", get(peer::results))
        .route("/results/get_results", get(peer::results))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind(args.listen_addr())
        .await
        .map_err(|e| format!("failed to bind {}: {e}", args.listen_addr()))?;

    tracing::info!(addr = %args.listen_addr(), "peer node listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| format!("peer HTTP server error: {e}"))?;

    bootstrap::graceful_exit(&state.ledger, &state.http, state.own_port).await;

    Ok(())
}

/// Waits for Ctrl-C (or, on Unix, SIGTERM) so the graceful-exit protocol
/// runs before the process actually terminates.
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = signal::ctrl_c().await;
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
