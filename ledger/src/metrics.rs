//! Prometheus-backed metrics and HTTP exporter for a node.
//!
//! This mirrors a typical chain node's metrics module: a [`MetricsRegistry`]
//! owning a Prometheus registry and strongly-typed counters/gauges, plus an
//! async HTTP exporter serving `/metrics` with `hyper`.

use std::{convert::Infallible, net::SocketAddr, sync::Arc};

use bytes::Bytes;
use http_body_util::Full;
use hyper::{
    Method, Request, Response, StatusCode, body::Incoming, header, server::conn::http1,
    service::service_fn,
};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use prometheus::{Encoder, Gauge, Histogram, HistogramOpts, IntCounter, Opts, Registry, TextEncoder};

/// Election-specific Prometheus metrics.
#[derive(Clone)]
pub struct LedgerMetrics {
    /// Number of blocks currently in the local chain.
    pub chain_length: Gauge,
    /// Total votes successfully cast (transactions with a non-issuance
    /// sender accepted into a block).
    pub votes_cast: IntCounter,
    /// Pending transactions dropped while forming a block because they
    /// failed validation.
    pub transactions_dropped: IntCounter,
    /// Time spent brute-forcing a proof of work, in seconds.
    pub proof_of_work_seconds: Histogram,
    /// Number of times this node has replaced its chain via reconciliation.
    pub chain_replacements: IntCounter,
}

impl LedgerMetrics {
    /// Registers the metrics into the given `Registry`.
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        let chain_length = Gauge::with_opts(Opts::new(
            "ledger_chain_length",
            "Number of blocks currently in the local chain",
        ))?;
        registry.register(Box::new(chain_length.clone()))?;

        let votes_cast = IntCounter::with_opts(Opts::new(
            "ledger_votes_cast_total",
            "Total votes successfully cast and mined into a block",
        ))?;
        registry.register(Box::new(votes_cast.clone()))?;

        let transactions_dropped = IntCounter::with_opts(Opts::new(
            "ledger_transactions_dropped_total",
            "Pending transactions dropped during block formation due to failed validation",
        ))?;
        registry.register(Box::new(transactions_dropped.clone()))?;

        let proof_of_work_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "ledger_proof_of_work_seconds",
                "Time spent finding a valid proof of work, in seconds",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        )?;
        registry.register(Box::new(proof_of_work_seconds.clone()))?;

        let chain_replacements = IntCounter::with_opts(Opts::new(
            "ledger_chain_replacements_total",
            "Number of times this node replaced its chain via reconciliation",
        ))?;
        registry.register(Box::new(chain_replacements.clone()))?;

        Ok(Self {
            chain_length,
            votes_cast,
            transactions_dropped,
            proof_of_work_seconds,
            chain_replacements,
        })
    }
}

/// Wrapper around a Prometheus registry and the election metrics. Clone and
/// share across tasks behind an [`Arc`].
#[derive(Clone)]
pub struct MetricsRegistry {
    registry: Registry,
    pub ledger: LedgerMetrics,
}

impl MetricsRegistry {
    /// Creates a new `MetricsRegistry` with a fresh underlying `Registry`.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("election".to_string()), None)?;
        let ledger = LedgerMetrics::register(&registry)?;
        Ok(Self { registry, ledger })
    }

    /// Encodes all metrics into the Prometheus text exposition format.
    pub fn gather_text(&self) -> String {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            tracing::warn!(error = %e, "failed to encode Prometheus metrics");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

/// Runs an HTTP server exposing `GET /metrics` in Prometheus text format.
/// Any other path returns 404. Intended to be spawned onto a Tokio runtime.
pub async fn run_prometheus_http_server(
    metrics: Arc<MetricsRegistry>,
    addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = TcpListener::bind(addr).await?;

    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let metrics = metrics.clone();

        tokio::spawn(async move {
            let svc = service_fn(move |req| {
                let metrics = metrics.clone();
                handle_request(req, metrics)
            });

            if let Err(err) = http1::Builder::new().serve_connection(io, svc).await {
                tracing::warn!(error = %err, "prometheus HTTP server connection error");
            }
        });
    }
}

async fn handle_request(
    req: Request<Incoming>,
    metrics: Arc<MetricsRegistry>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    match (req.method(), req.uri().path()) {
        (&Method::GET, "/metrics") => {
            let body = metrics.gather_text();
            Ok(Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, "text/plain; version=0.0.4")
                .body(Full::new(Bytes::from(body)))
                .unwrap())
        }
        _ => Ok(Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Full::new(Bytes::from("not found")))
            .unwrap()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_metrics_register_and_record() {
        let registry = Registry::new();
        let metrics = LedgerMetrics::register(&registry).expect("register metrics");

        metrics.chain_length.set(3.0);
        metrics.votes_cast.inc();
        metrics.transactions_dropped.inc();
        metrics.proof_of_work_seconds.observe(0.05);
        metrics.chain_replacements.inc();

        let families = registry.gather();
        assert!(!families.is_empty());
    }

    #[test]
    fn metrics_registry_gather_text_contains_metric_names() {
        let registry = MetricsRegistry::new().expect("create registry");
        registry.ledger.votes_cast.inc();
        let text = registry.gather_text();
        assert!(text.contains("election_ledger_votes_cast_total"));
    }
}
