//! Chain reconciliation: fetching peers' chains and picking a winner.
//!
//! The ledger crate never speaks HTTP itself. Instead it asks a
//! [`ChainFetcher`], implemented by the node binary crate using whatever
//! HTTP client it likes, to retrieve a peer's chain, so this crate stays
//! transport-agnostic and easy to test with a fake fetcher.

use async_trait::async_trait;

use crate::types::Block;

/// A peer's chain as reported over the wire, paired with its claimed length.
///
/// The length is carried separately from `chain.len()` because the wire
/// contract reports both; a peer that lies about its length is simply one
/// whose claim doesn't match its own chain, which downstream validation
/// treats like any other malformed response.
#[derive(Clone, Debug)]
pub struct FetchedChain {
    pub length: u64,
    pub chain: Vec<Block>,
}

/// Abstraction over retrieving a peer's current chain.
///
/// Implementations decide retry policy, timeouts, and transport; this
/// trait only describes the outcome: `Some` on a successful fetch, `None`
/// if the peer could not be reached at all.
#[async_trait]
pub trait ChainFetcher: Send + Sync {
    async fn fetch_chain(&self, peer: &str) -> Option<FetchedChain>;
}

/// Outcome of attempting to resolve conflicts against the known peer set.
pub struct ResolutionOutcome {
    /// Chain that should replace the local one, if any longer valid chain
    /// was found.
    pub winner: Option<FetchedChain>,
    /// Peers that failed to respond after retrying and should be pruned.
    pub unreachable: Vec<String>,
}

/// Maximum number of attempts made against a single peer before it is
/// treated as unreachable and queued for pruning.
pub const FETCH_RETRIES: u32 = 5;

/// Fetches every peer's chain (retrying up to [`FETCH_RETRIES`] times each)
/// and returns the longest chain that passes `is_valid`, plus the set of
/// peers that never responded.
///
/// Strictly-longer-only: a peer's chain only becomes a candidate if it is
/// longer than `current_length` and strictly longer than any
/// better candidate already found, so ties never replace the local chain.
pub async fn gather_longest_valid_chain<F, V>(
    fetcher: &F,
    peers: &[String],
    current_length: u64,
    mut is_valid: V,
) -> ResolutionOutcome
where
    F: ChainFetcher,
    V: FnMut(&[Block]) -> bool,
{
    let mut best: Option<FetchedChain> = None;
    let mut best_length = current_length;
    let mut unreachable = Vec::new();

    for peer in peers {
        let mut response = None;
        for attempt in 0..FETCH_RETRIES {
            response = fetcher.fetch_chain(peer).await;
            if response.is_some() {
                break;
            }
            if attempt == FETCH_RETRIES - 1 {
                unreachable.push(peer.clone());
            }
        }

        if let Some(candidate) = response {
            if candidate.length > best_length && is_valid(&candidate.chain) {
                best_length = candidate.length;
                best = Some(candidate);
            }
        }
    }

    ResolutionOutcome {
        winner: best,
        unreachable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedFetcher {
        responses: std::collections::HashMap<String, Vec<Option<FetchedChain>>>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ChainFetcher for ScriptedFetcher {
        async fn fetch_chain(&self, peer: &str) -> Option<FetchedChain> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let responses = self.responses.get(peer)?;
            let idx = self.calls.load(Ordering::SeqCst) % responses.len();
            responses[idx].clone()
        }
    }

    fn chain_of_length(n: u64) -> FetchedChain {
        FetchedChain {
            length: n,
            chain: (0..n)
                .map(|i| {
                    let mut b = Block::genesis();
                    b.index = i;
                    b
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn picks_the_longest_valid_chain_among_peers() {
        let mut responses = std::collections::HashMap::new();
        responses.insert("peer-a".to_string(), vec![Some(chain_of_length(3))]);
        responses.insert("peer-b".to_string(), vec![Some(chain_of_length(5))]);
        let fetcher = ScriptedFetcher {
            responses,
            calls: AtomicUsize::new(0),
        };

        let outcome = gather_longest_valid_chain(
            &fetcher,
            &["peer-a".to_string(), "peer-b".to_string()],
            1,
            |_| true,
        )
        .await;

        assert_eq!(outcome.winner.expect("winner").length, 5);
        assert!(outcome.unreachable.is_empty());
    }

    #[tokio::test]
    async fn ties_do_not_replace_the_current_chain() {
        let mut responses = std::collections::HashMap::new();
        responses.insert("peer-a".to_string(), vec![Some(chain_of_length(3))]);
        let fetcher = ScriptedFetcher {
            responses,
            calls: AtomicUsize::new(0),
        };

        let outcome =
            gather_longest_valid_chain(&fetcher, &["peer-a".to_string()], 3, |_| true).await;

        assert!(outcome.winner.is_none());
    }

    #[tokio::test]
    async fn unresponsive_peer_is_reported_for_pruning() {
        let responses = std::collections::HashMap::new();
        let fetcher = ScriptedFetcher {
            responses,
            calls: AtomicUsize::new(0),
        };

        let outcome =
            gather_longest_valid_chain(&fetcher, &["ghost-peer".to_string()], 1, |_| true).await;

        assert!(outcome.winner.is_none());
        assert_eq!(outcome.unreachable, vec!["ghost-peer".to_string()]);
    }

    #[tokio::test]
    async fn invalid_longer_chain_is_rejected() {
        let mut responses = std::collections::HashMap::new();
        responses.insert("peer-a".to_string(), vec![Some(chain_of_length(5))]);
        let fetcher = ScriptedFetcher {
            responses,
            calls: AtomicUsize::new(0),
        };

        let outcome =
            gather_longest_valid_chain(&fetcher, &["peer-a".to_string()], 1, |_| false).await;

        assert!(outcome.winner.is_none());
    }
}
