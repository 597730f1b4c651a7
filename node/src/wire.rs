//! JSON/form wire shapes shared by route handlers and the peer HTTP client.

use ledger::Block;
use serde::{Deserialize, Serialize};

/// Body of `GET /chain/`.
#[derive(Serialize, Deserialize)]
pub struct ChainResponse {
    pub chain: Vec<Block>,
    pub length: u64,
}

/// Body of `GET /nodes/` on a peer node.
#[derive(Serialize, Deserialize)]
pub struct NodesResponse {
    pub nodes: Vec<String>,
}

/// Body of `POST /recip` and `POST /remove/`.
#[derive(Serialize, Deserialize)]
pub struct PortPayload {
    pub port: u16,
}

/// Response shape shared by `/recip` and `/remove/`.
#[derive(Serialize, Deserialize)]
pub struct MembershipResponse {
    pub message: String,
    pub nodes: Vec<String>,
}

/// Form body of `POST /vote/`.
#[derive(Deserialize)]
pub struct VoteForm {
    pub id: u64,
    pub key: String,
    pub candidate: String,
}

/// Response body of `POST /vote/`.
#[derive(Serialize)]
pub struct VoteResponse {
    pub status: &'static str,
}

impl VoteResponse {
    pub fn success() -> Self {
        VoteResponse { status: "success" }
    }

    pub fn fail() -> Self {
        VoteResponse { status: "fail" }
    }
}

/// Body of `POST /external_transaction/`.
#[derive(Serialize, Deserialize)]
pub struct ExternalTransactionPayload {
    pub sender: String,
    pub recipient: String,
    pub amount: i64,
    pub signature: Option<String>,
    pub vote_number: u64,
}

/// Body of `GET /resolve/`.
#[derive(Serialize)]
pub struct ResolveResponse {
    pub message: String,
    pub chain: Vec<Block>,
}
