//! `reqwest`-backed peer transport.
//!
//! This module is the concrete implementation of [`ledger::ChainFetcher`]
//! plus the handful of other peer-to-peer calls (`/nodes/`, `/recip`,
//! `/remove/`, `/resolve/`, `/external_transaction/`) that the bootstrap and
//! route-handling code needs. The `ledger` crate itself never imports
//! `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use ledger::{ChainFetcher, FetchedChain};
use reqwest::Client;

use crate::wire::{ChainResponse, ExternalTransactionPayload, MembershipResponse, NodesResponse};

/// Per-request timeout used for all peer calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Builds a `reqwest::Client` configured with the shared per-call timeout.
pub fn build_client() -> Client {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .expect("reqwest client with a fixed timeout should always build")
}

/// [`ChainFetcher`] implementation backed by `reqwest`.
pub struct HttpChainFetcher {
    client: Client,
}

impl HttpChainFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ChainFetcher for HttpChainFetcher {
    async fn fetch_chain(&self, peer: &str) -> Option<FetchedChain> {
        let url = format!("http://{peer}/chain/");
        let response = self.client.get(&url).send().await.ok()?;
        if !response.status().is_success() {
            return None;
        }
        let body: ChainResponse = response.json().await.ok()?;
        Some(FetchedChain {
            length: body.length,
            chain: body.chain,
        })
    }
}

/// Outcome of querying a bootstrap source's `/nodes/` endpoint.
pub enum SourceNodes {
    /// The source is an issuance node (204 sentinel): no peer list.
    Issuance,
    /// The source is a peer node and returned its known peers.
    Peer(Vec<String>),
    /// The source never responded.
    Unreachable,
}

/// GETs `source/nodes/`, retrying up to `retries` times with `backoff`
/// between attempts.
pub async fn get_nodes(
    client: &Client,
    source: &str,
    retries: u32,
    backoff: Duration,
) -> SourceNodes {
    let url = format!("http://{source}/nodes/");
    for attempt in 0..retries {
        match client.get(&url).send().await {
            Ok(response) => {
                if response.status().as_u16() == 204 {
                    return SourceNodes::Issuance;
                }
                if response.status().is_success() {
                    return match response.json::<NodesResponse>().await {
                        Ok(body) => SourceNodes::Peer(body.nodes),
                        Err(_) => SourceNodes::Unreachable,
                    };
                }
            }
            Err(_) => {
                if attempt + 1 < retries {
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
    SourceNodes::Unreachable
}

/// POSTs `/recip` to `peer`, carrying this node's listening port. Returns
/// `true` on success.
pub async fn post_recip(client: &Client, peer: &str, own_port: u16) -> bool {
    let url = format!("http://{peer}/recip");
    client
        .post(&url)
        .json(&crate::wire::PortPayload { port: own_port })
        .send()
        .await
        .map(|r| r.status().is_success())
        .unwrap_or(false)
}

/// POSTs `/remove/` to `peer`, best-effort; failures are swallowed by the
/// caller since this is only ever used during graceful shutdown.
pub async fn post_remove(client: &Client, peer: &str, own_port: u16) {
    let url = format!("http://{peer}/remove/");
    let _ = client
        .post(&url)
        .json(&crate::wire::PortPayload { port: own_port })
        .send()
        .await;
}

/// GETs `/resolve/` on `peer`, best-effort. Returns `true` on success.
pub async fn trigger_resolve(client: &Client, peer: &str) -> bool {
    let url = format!("http://{peer}/resolve/");
    client
        .get(&url)
        .send()
        .await
        .map(|r| r.status().is_success())
        .unwrap_or(false)
}

/// Fans a transaction out to every peer's `/external_transaction/` endpoint.
///
/// Fire-and-forget: each peer gets its own task so one slow or unreachable
/// peer cannot stall the caller. Concurrency is naturally bounded by the
/// peer count, which is expected to stay small.
pub fn broadcast_transaction(client: Client, peers: Vec<String>, payload: ExternalTransactionPayload) {
    if peers.is_empty() {
        return;
    }
    for peer in peers {
        let client = client.clone();
        let payload = ExternalTransactionPayload {
            sender: payload.sender.clone(),
            recipient: payload.recipient.clone(),
            amount: payload.amount,
            signature: payload.signature.clone(),
            vote_number: payload.vote_number,
        };
        tokio::spawn(async move {
            let url = format!("http://{peer}/external_transaction/");
            if let Err(err) = client.post(&url).json(&payload).send().await {
                tracing::debug!(%peer, error = %err, "failed to broadcast transaction to peer");
            }
        });
    }
}

/// Used by `/recip` and `/remove/` handlers to build their response body.
pub fn membership_response(message: impl Into<String>, nodes: Vec<String>) -> MembershipResponse {
    MembershipResponse {
        message: message.into(),
        nodes,
    }
}

/// Re-POSTs `/recip` to every peer in `peers`, healing one-sided peerings
/// left over from a peer that previously pruned this node. Fire-and-forget,
/// same as [`broadcast_transaction`]: one slow peer must not stall the
/// caller, which is usually servicing an HTTP request of its own.
pub fn reciprocate_with_all(client: &Client, peers: &[String], own_port: u16) {
    for peer in peers {
        let client = client.clone();
        let peer = peer.clone();
        tokio::spawn(async move {
            post_recip(&client, &peer, own_port).await;
        });
    }
}
