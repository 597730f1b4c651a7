//! CLI configuration for both node roles.

use std::net::SocketAddr;

use clap::Parser;

/// Flags accepted by the `issuance-node` binary.
#[derive(Parser, Clone, Debug)]
#[command(name = "issuance-node")]
pub struct IssuanceArgs {
    /// Port to listen on.
    #[arg(long, default_value_t = 4999)]
    pub port: u16,

    /// Number of voters to mint credentials for.
    #[arg(long, default_value_t = 10)]
    pub numvotes: u64,

    /// Votes credited to each minted credential.
    #[arg(long, default_value_t = 1)]
    pub votes_per_person: i64,
}

impl IssuanceArgs {
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}

/// Flags accepted by the `peer-node` binary.
#[derive(Parser, Clone, Debug)]
#[command(name = "peer-node")]
pub struct PeerArgs {
    /// Port to listen on.
    #[arg(long, default_value_t = 5000)]
    pub port: u16,

    /// Address of the node to bootstrap the chain from.
    #[arg(long, default_value = "http://127.0.0.1:4999/")]
    pub source: String,
}

impl PeerArgs {
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}

/// Configuration for the Prometheus metrics exporter, not exposed on the CLI.
#[derive(Clone, Debug)]
pub struct MetricsConfig {
    pub listen_addr: SocketAddr,
}

/// Offset applied to a node's own port to pick its metrics port, so an
/// issuance node and a peer node running side by side on one host (as the
/// end-to-end scenarios in spec.md §8 do) don't collide on `/metrics`.
const METRICS_PORT_OFFSET: u16 = 10_000;

impl MetricsConfig {
    /// Derives the metrics listen address from `node_port`.
    pub fn for_node_port(node_port: u16) -> Self {
        let metrics_port = node_port.saturating_add(METRICS_PORT_OFFSET);
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], metrics_port)),
        }
    }
}
