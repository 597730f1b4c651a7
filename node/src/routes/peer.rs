//! Routes served by a peer node: chain/peer introspection, reconciliation,
//! membership, vote casting, transaction broadcast, and results.

use std::collections::HashMap;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Form, State};
use axum::http::StatusCode;
use axum::Json;
use ledger::{Ledger, Transaction};

use crate::http_client::{self, HttpChainFetcher};
use crate::state::SharedPeerState;
use crate::wire::{
    ChainResponse, ExternalTransactionPayload, MembershipResponse, NodesResponse, PortPayload,
    ResolveResponse, VoteForm, VoteResponse,
};

/// `GET /chain/`
pub async fn chain(State(state): State<SharedPeerState>) -> Json<ChainResponse> {
    let ledger = state.ledger.read().await;
    Json(ChainResponse {
        chain: ledger.chain().to_vec(),
        length: ledger.len(),
    })
}

/// `GET /nodes/`
pub async fn nodes(State(state): State<SharedPeerState>) -> Json<NodesResponse> {
    let ledger = state.ledger.read().await;
    Json(NodesResponse {
        nodes: ledger.peers().iter().cloned().collect(),
    })
}

/// `GET /resolve/`
///
/// Snapshots peer state, fetches and validates candidate chains with no
/// ledger lock held (the network round trip can take seconds), then takes
/// the write lock only to install the winner, and only after re-checking
/// it is still strictly longer than whatever the local chain has grown to
/// in the meantime. Reciprocates with every peer still registered
/// afterward, healing any one-sided peerings.
pub async fn resolve(State(state): State<SharedPeerState>) -> Json<ResolveResponse> {
    let (peer_list, current_length, locked, total_value) = {
        let ledger = state.ledger.read().await;
        (
            ledger.peers().iter().cloned().collect::<Vec<_>>(),
            ledger.len(),
            ledger.is_locked(),
            ledger.total_value(),
        )
    };

    let fetcher = HttpChainFetcher::new(state.http.clone());
    let outcome = ledger::gather_longest_valid_chain(
        &fetcher,
        &peer_list,
        current_length,
        |candidate| {
            Ledger::valid_chain(candidate).is_ok()
                && ledger::validate_for_adoption(candidate, locked, total_value).is_some()
        },
    )
    .await;

    let replaced = {
        let mut ledger = state.ledger.write().await;
        for peer in &outcome.unreachable {
            ledger.remove_node(peer);
        }
        match outcome.winner {
            Some(winning) => {
                let summary = ledger::validate_for_adoption(
                    &winning.chain,
                    ledger.is_locked(),
                    ledger.total_value(),
                )
                .expect("winner was already validated above");
                ledger.replace_chain(winning.length, winning.chain, summary)
            }
            None => false,
        }
    };

    if replaced {
        state.metrics.ledger.chain_replacements.inc();
        tracing::info!("adopted a longer chain via resolve");
    }

    let (message, response_chain, peers) = {
        let ledger = state.ledger.read().await;
        let message = if replaced {
            "chain replaced with a longer peer chain".to_string()
        } else {
            "chain is already authoritative".to_string()
        };
        let peers = ledger.peers().iter().cloned().collect::<Vec<_>>();
        (message, ledger.chain().to_vec(), peers)
    };

    http_client::reciprocate_with_all(&state.http, &peers, state.own_port);

    Json(ResolveResponse {
        message,
        chain: response_chain,
    })
}

/// `POST /recip`
///
/// Registers the caller as `remote_ip:port`, healing a one-sided peering.
pub async fn recip(
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    State(state): State<SharedPeerState>,
    Json(body): Json<PortPayload>,
) -> Json<MembershipResponse> {
    let address = format!("{}:{}", remote.ip(), body.port);
    let mut ledger = state.ledger.write().await;
    let _ = ledger.register_node(&address);
    Json(http_client::membership_response(
        format!("registered {address}"),
        ledger.peers().iter().cloned().collect(),
    ))
}

/// `POST /remove/`
pub async fn remove(
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    State(state): State<SharedPeerState>,
    Json(body): Json<PortPayload>,
) -> Json<MembershipResponse> {
    let address = format!("{}:{}", remote.ip(), body.port);
    let mut ledger = state.ledger.write().await;
    ledger.remove_node(&address);
    Json(http_client::membership_response(
        format!("removed {address}"),
        ledger.peers().iter().cloned().collect(),
    ))
}

/// `POST /vote/`
///
/// Resolves `sender` from the credential's originating issuance block,
/// builds the candidate transaction, mines its proof of work without
/// holding the ledger lock, then validates and appends it atomically: if
/// the tip moved out from under the freshly mined proof (a concurrent
/// `/resolve/` adopted a longer chain) the vote is rejected rather than
/// risking a block with the wrong `previous_hash`.
pub async fn vote(
    State(state): State<SharedPeerState>,
    Form(form): Form<VoteForm>,
) -> Json<VoteResponse> {
    let (sender, last_block) = {
        let ledger = state.ledger.read().await;
        let Some(sender) = ledger.transactor_for_vote(form.id) else {
            return Json(VoteResponse::fail());
        };
        (sender, ledger.last_block().clone())
    };

    let tx = Transaction::new(
        sender,
        form.candidate.clone(),
        1,
        Some(form.key.clone()),
        form.id,
    );

    let last_hash = last_block.compute_hash();
    let pow_timer = std::time::Instant::now();
    let proof = {
        let last_proof = last_block.proof;
        let hash_for_pow = last_hash.clone();
        tokio::task::spawn_blocking(move || ledger::find_proof(last_proof, hash_for_pow.as_str()))
            .await
            .expect("proof-of-work task should not panic")
    };
    state
        .metrics
        .ledger
        .proof_of_work_seconds
        .observe(pow_timer.elapsed().as_secs_f64());

    let accepted = {
        let mut ledger = state.ledger.write().await;
        if ledger.last_block().compute_hash() != last_hash {
            tracing::warn!("chain tip moved during vote mining, rejecting stale proof");
            false
        } else if !Ledger::valid_transaction(&tx, ledger.chain()) || !ledger.valid_balance(&tx) {
            false
        } else {
            ledger.new_transaction(tx.clone());
            let block = ledger.new_block(proof, last_hash.0.clone());
            block
                .transactions
                .iter()
                .any(|t| t.timestamp == tx.timestamp && t.sender == tx.sender)
        }
    };

    if !accepted {
        state.metrics.ledger.transactions_dropped.inc();
        return Json(VoteResponse::fail());
    }

    state.metrics.ledger.votes_cast.inc();
    state
        .metrics
        .ledger
        .chain_length
        .set(state.ledger.read().await.len() as f64);

    let peers = state.ledger.read().await.peers().iter().cloned().collect();
    let payload = ExternalTransactionPayload {
        sender: tx.sender,
        recipient: tx.recipient,
        amount: tx.amount,
        signature: tx.signature,
        vote_number: tx.vote_number,
    };
    http_client::broadcast_transaction(state.http.clone(), peers, payload);

    Json(VoteResponse::success())
}

/// `POST /external_transaction/`
///
/// Stages the incoming transaction without synchronous validation; it is
/// checked the next time this node forms a block.
pub async fn external_transaction(
    State(state): State<SharedPeerState>,
    Json(payload): Json<ExternalTransactionPayload>,
) -> Json<ExternalTransactionPayload> {
    let tx = Transaction::new(
        payload.sender.clone(),
        payload.recipient.clone(),
        payload.amount,
        payload.signature.clone(),
        payload.vote_number,
    );
    state.ledger.write().await.new_transaction(tx);
    Json(payload)
}

/// `GET /results/get_results/`
///
/// Resolves conflicts first, mines any pending votes into a block, then
/// tallies each known candidate's balance. Reciprocates with peers
/// afterward, same as `/resolve/`.
pub async fn results(State(state): State<SharedPeerState>) -> (StatusCode, Json<HashMap<String, i64>>) {
    resolve(State(state.clone())).await;

    {
        let mut ledger = state.ledger.write().await;
        if ledger.has_pending_transactions() {
            ledger.mine_pending();
        }
    }

    let ledger = state.ledger.read().await;
    let tally = state
        .candidates
        .iter()
        .map(|name| (name.clone(), ledger.balance_of(name)))
        .collect();
    (StatusCode::OK, Json(tally))
}
