//! One-time startup sequences for each node role: the issuance node's vote
//! minting, and the peer node's chain import and graceful-exit protocols.

use std::time::Duration;

use ledger::{Ledger, Transaction, new_keypair};
use reqwest::Client;
use tracing::{info, warn};

use crate::http_client::{self, HttpChainFetcher, SourceNodes};
use crate::persistence;

/// Mints `num_votes` credentials, each in its own mined block crediting
/// `votes_per_person` to a freshly generated public key, and writes the
/// matching private key to a credential file under [`persistence::SECRET_KEYS_DIR`].
///
/// Runs to completion before the issuance node starts serving; there is no
/// concurrent access to `ledger` at this point so a plain owned value is fine.
pub async fn mine_votes(ledger: &mut Ledger, num_votes: u64, votes_per_person: i64) {
    for voter_number in 1..=num_votes {
        info!(voter_number, "generating credential");
        let keypair = match new_keypair() {
            Ok(keypair) => keypair,
            Err(err) => {
                warn!(voter_number, error = %err, "failed to generate a keypair, skipping voter");
                continue;
            }
        };

        let last_block = ledger.last_block().clone();
        let last_hash = last_block.compute_hash();
        let last_proof = last_block.proof;
        let hash_for_pow = last_hash.clone();
        let proof = tokio::task::spawn_blocking(move || {
            ledger::find_proof(last_proof, hash_for_pow.as_str())
        })
        .await
        .expect("proof-of-work task should not panic");

        let transaction = Transaction::new(
            ledger::ISSUANCE_SENDER.to_string(),
            keypair.public.0.clone(),
            votes_per_person,
            None,
            0,
        );
        ledger.new_transaction(transaction);
        ledger.new_block(proof, last_hash.to_string());

        match persistence::write_credential(voter_number, &keypair.private).await {
            Ok(path) => info!(voter_number, path = %path.display(), "credential written"),
            Err(err) => warn!(voter_number, error = %err, "failed to write credential file"),
        }
    }
}

/// Number of attempts `initialize` makes to reach the bootstrap source.
const SOURCE_RETRIES: u32 = 5;
/// Delay between retries against the bootstrap source.
const SOURCE_RETRY_BACKOFF: Duration = Duration::from_secs(2);

/// Outcome of [`initialize`].
pub struct InitializeOutcome {
    /// `true` if the bootstrap source was an issuance node and should be
    /// pruned from the peer set once the chain has been imported.
    pub source_is_issuance: bool,
}

/// Imports a chain from `source`, registers its peers, and locks the ledger
/// against further issuance. Returns `None` if nothing could be imported, in
/// which case the caller must abort startup.
pub async fn initialize(
    ledger: &tokio::sync::RwLock<Ledger>,
    http: &Client,
    own_port: u16,
    source: &str,
) -> Option<InitializeOutcome> {
    // Normalize the source to bare `host:port` up front: the CLI hands this
    // in as a full `scheme://host:port/` URL, but every HTTP helper below
    // builds its own `http://{addr}/...` URL and would double up the scheme
    // if handed one already.
    let Some(source_addr) = ledger::peers::normalize(source) else {
        warn!(source, "bootstrap source address is invalid");
        return None;
    };
    {
        let mut ledger = ledger.write().await;
        if let Err(err) = ledger.register_node(&source_addr) {
            warn!(source = %source_addr, error = %err, "bootstrap source address is invalid");
            return None;
        }
    }

    info!(source = %source_addr, "querying bootstrap source");
    let nodes =
        http_client::get_nodes(http, &source_addr, SOURCE_RETRIES, SOURCE_RETRY_BACKOFF).await;
    let source_is_issuance = matches!(nodes, SourceNodes::Issuance);

    if let SourceNodes::Peer(connected_nodes) = &nodes {
        http_client::post_recip(http, &source_addr, own_port).await;
        for node in connected_nodes {
            if http_client::post_recip(http, node, own_port).await {
                let mut ledger = ledger.write().await;
                let _ = ledger.register_node(node);
            }
        }
    }

    if matches!(nodes, SourceNodes::Unreachable) {
        warn!(source = %source_addr, "could not reach bootstrap source after retrying");
        return None;
    }

    let fetcher = HttpChainFetcher::new(http.clone());
    let adopted = {
        let mut ledger = ledger.write().await;
        ledger.resolve_conflicts(&fetcher).await
    };
    if !adopted {
        warn!("failed to import a chain from the bootstrap source or its peers");
        return None;
    }

    {
        let mut ledger = ledger.write().await;
        ledger.value_lock();
        if source_is_issuance {
            ledger.remove_node(&source_addr);
        }
    }

    info!("local chain initialized, election value is now locked");
    Some(InitializeOutcome { source_is_issuance })
}

/// Best-effort graceful shutdown: hands the chain off to whichever peer
/// answers first, so a longer local chain isn't lost when this node exits,
/// then asks every peer to forget this node. All failures are swallowed
/// since the process is on its way out regardless.
pub async fn graceful_exit(ledger: &tokio::sync::RwLock<Ledger>, http: &Client, own_port: u16) {
    info!("shutting down, handing off chain to peers");
    let peers: Vec<String> = {
        let ledger = ledger.read().await;
        ledger.peers().iter().cloned().collect()
    };

    for peer in &peers {
        if http_client::trigger_resolve(http, peer).await {
            break;
        }
    }
    for peer in &peers {
        http_client::post_remove(http, peer, own_port).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::Router;
    use axum::routing::get;
    use tokio::sync::Notify;

    use crate::routes::issuance;
    use crate::state::IssuanceState;

    #[tokio::test]
    async fn mine_votes_credits_each_voter_and_extends_the_chain() {
        let mut ledger = Ledger::new();
        mine_votes(&mut ledger, 3, 2).await;
        assert_eq!(ledger.len(), 4);
        assert_eq!(ledger.total_value(), 6);
    }

    /// Spins up a real issuance node's `/chain/` and `/nodes/` routes on an
    /// ephemeral local port, then drives `initialize` against it end to end,
    /// covering the same ground as scenario S2: the peer's chain comes to
    /// equal the source's, the value lock is set, and the issuance source is
    /// dropped from the peer registry afterward.
    #[tokio::test]
    async fn initialize_imports_chain_locks_value_and_drops_issuance_source() {
        let mut source_ledger = Ledger::new();
        mine_votes(&mut source_ledger, 2, 1).await;
        assert_eq!(source_ledger.total_value(), 2);

        let source_state: crate::state::SharedIssuanceState = std::sync::Arc::new(IssuanceState {
            ledger: tokio::sync::RwLock::new(source_ledger),
            metrics: std::sync::Arc::new(
                ledger::MetricsRegistry::new().expect("build metrics registry"),
            ),
            served: Notify::new(),
        });

        let app = Router::new()
            .route("/chain/", get(issuance::chain))
            .route("/nodes/", get(issuance::nodes))
            .with_state(source_state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let source_addr = listener.local_addr().expect("listener has a local addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let http = http_client::build_client();
        let ledger = tokio::sync::RwLock::new(Ledger::new());
        let source_url = format!("http://{source_addr}/");

        let outcome = initialize(&ledger, &http, 9_000, &source_url)
            .await
            .expect("bootstrap should succeed against a live issuance source");
        assert!(outcome.source_is_issuance);

        let ledger = ledger.read().await;
        assert_eq!(ledger.len(), 3);
        assert!(ledger.is_locked());
        assert_eq!(ledger.total_value(), 2);
        assert!(!ledger.peers().contains(&source_addr.to_string()));
    }
}
