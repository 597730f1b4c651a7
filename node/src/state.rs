//! Shared application state held by the HTTP routes of each role.

use std::sync::Arc;

use ledger::{Ledger, MetricsRegistry};
use reqwest::Client;
use tokio::sync::{Notify, RwLock};

/// State shared by the issuance node's routes.
///
/// The ledger never changes once mining completes, so a single [`RwLock`]
/// read is enough for every handler; it is still behind a lock so the type
/// matches the peer node's shape and nothing has to special-case access.
pub struct IssuanceState {
    pub ledger: RwLock<Ledger>,
    pub metrics: Arc<MetricsRegistry>,
    /// Notified once the chain has been served, telling the main loop to
    /// begin graceful shutdown.
    pub served: Notify,
}

pub type SharedIssuanceState = Arc<IssuanceState>;

/// State shared by a peer node's routes and background tasks.
pub struct PeerState {
    pub ledger: RwLock<Ledger>,
    pub metrics: Arc<MetricsRegistry>,
    /// This node's own listening port, sent to peers during `/recip` and
    /// `/remove` so they can register/deregister it by `remote_addr:port`.
    pub own_port: u16,
    pub http: Client,
    /// Candidate names read from `vote_params.txt` at startup, used to
    /// build the `/results/get_results/` tally.
    pub candidates: Vec<String>,
}

pub type SharedPeerState = Arc<PeerState>;
