//! Routes served by the issuance node: the chain handoff and the
//! "I am an issuance node" sentinel.

use axum::{extract::State, http::StatusCode};
use axum::Json;

use crate::state::SharedIssuanceState;
use crate::wire::ChainResponse;

/// `GET /chain/`
///
/// Hands the fully-mined chain to whichever peer node bootstraps from this
/// one, then signals the main loop to begin shutting down: an issuance node
/// serves exactly one such request in its lifetime.
pub async fn chain(State(state): State<SharedIssuanceState>) -> Json<ChainResponse> {
    let ledger = state.ledger.read().await;
    let response = ChainResponse {
        chain: ledger.chain().to_vec(),
        length: ledger.len(),
    };
    drop(ledger);
    state.served.notify_one();
    Json(response)
}

/// `GET /nodes/`
///
/// Always 204: tells the caller this is an issuance node, not a peer, so it
/// should not expect a peer list and should drop this node from its peer set
/// once the chain import completes.
pub async fn nodes() -> StatusCode {
    StatusCode::NO_CONTENT
}
