//! Block type and canonical hashing.
//!
//! A block's hash must be identical across every node that computes it,
//! so serialization has to be canonical: keys sorted, no incidental
//! whitespace. [`Block::compute_hash`] reconstructs the block as a
//! [`serde_json::Value`] with every object's keys sorted before encoding,
//! mirroring a `json.dumps(..., sort_keys=True)` call, then hashes the
//! resulting bytes with SHA-256.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use super::Transaction;

/// Hex-encoded SHA-256 digest of a block's canonical JSON form.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockHash(pub String);

impl BlockHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BlockHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single block in the ledger.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Block {
    /// Position of this block in the chain, starting at 0 for genesis.
    pub index: u64,
    /// Seconds since the Unix epoch when the block was formed.
    pub timestamp: f64,
    /// Transactions this block finalizes.
    pub transactions: Vec<Transaction>,
    /// Proof-of-work solution for this block.
    pub proof: u64,
    /// Hash of the previous block, or `"1"` for genesis.
    pub previous_hash: String,
}

impl Block {
    /// Builds the hard-coded genesis block: proof `100`, previous hash `"1"`,
    /// no transactions.
    pub fn genesis() -> Self {
        Block {
            index: 0,
            timestamp: unix_timestamp_secs(),
            transactions: Vec::new(),
            proof: 100,
            previous_hash: "1".to_string(),
        }
    }

    /// Returns the canonical JSON encoding of this block: object keys sorted
    /// recursively, no extraneous whitespace.
    pub fn canonical_json(&self) -> Vec<u8> {
        let value = serde_json::to_value(self).expect("Block is always representable as JSON");
        let sorted = sort_value(value);
        serde_json::to_vec(&sorted).expect("sorted Value is always serializable")
    }

    /// Computes the SHA-256 hash of this block's canonical JSON encoding.
    pub fn compute_hash(&self) -> BlockHash {
        let bytes = self.canonical_json();
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        BlockHash(hex::encode(hasher.finalize()))
    }
}

/// Recursively rebuilds `value` so every object is backed by a key-sorted map.
///
/// `serde_json::Value::Object` is itself backed by a `BTreeMap` in default
/// builds (the `preserve_order` feature is not enabled here), so this walk
/// is mostly a safety net should that ever change, and it also guarantees
/// array element order is left untouched, matching Python's `sort_keys`
/// semantics exactly (only dict keys are sorted, lists are not reordered).
fn sort_value(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> =
                map.into_iter().map(|(k, v)| (k, sort_value(v))).collect();
            let mut out = serde_json::Map::new();
            for (k, v) in sorted {
                out.insert(k, v);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_value).collect()),
        other => other,
    }
}

fn unix_timestamp_secs() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Transaction;

    #[test]
    fn hash_is_deterministic_for_identical_blocks() {
        let block = Block::genesis();
        assert_eq!(block.compute_hash(), block.compute_hash());
    }

    #[test]
    fn hash_changes_when_a_transaction_is_added() {
        let mut a = Block::genesis();
        let mut b = a.clone();
        b.transactions
            .push(Transaction::new("0", "voter-1", 1, None, 0));
        a.index = b.index;
        assert_ne!(a.compute_hash(), b.compute_hash());
    }

    #[test]
    fn hash_is_insensitive_to_struct_field_declaration_order() {
        // Two blocks built identically should hash identically regardless of
        // how serde happens to order struct fields internally.
        let a = Block {
            index: 1,
            timestamp: 123.0,
            transactions: vec![],
            proof: 5,
            previous_hash: "abc".to_string(),
        };
        let b = Block {
            previous_hash: "abc".to_string(),
            proof: 5,
            transactions: vec![],
            timestamp: 123.0,
            index: 1,
        };
        assert_eq!(a.compute_hash(), b.compute_hash());
    }
}
