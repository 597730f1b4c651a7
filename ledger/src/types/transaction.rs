//! Transaction type.
//!
//! A transaction moves one unit of voting balance from `sender` to
//! `recipient`. The genesis sender `"0"` is the issuance node minting a
//! fresh, unspent vote; every other transfer is a voter casting the vote
//! they were issued.

use serde::{Deserialize, Serialize};

/// Sender address used by the issuance node when minting a fresh vote.
///
/// Not a real credential: no key exists whose public PEM text equals this
/// string, so it can never be forged as a transfer sender.
pub const ISSUANCE_SENDER: &str = "0";

/// A single transfer of one vote's worth of balance.
///
/// `signature` carries the voter's private-key credential, serialized as
/// PKCS#1 PEM text, rather than a precomputed signature: it is re-signed
/// over the fixed challenge plaintext at verification time, so a stolen
/// credential can be checked against whichever sender address it is
/// presented with.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Transaction {
    /// Address (public key PEM text) of the party giving up balance.
    pub sender: String,
    /// Address (public key PEM text) of the party receiving balance.
    pub recipient: String,
    /// Seconds since the Unix epoch when the transaction was created.
    pub timestamp: f64,
    /// Amount transferred. Always 1 for a vote; may be a larger mint at
    /// issuance time.
    pub amount: i64,
    /// Voter's private-key credential, or `None` for an issuance mint.
    pub signature: Option<String>,
    /// Index of the block whose sole transaction issued this vote to
    /// `sender`. Unused (0) for issuance transactions.
    pub vote_number: u64,
}

impl Transaction {
    /// Builds a new transaction with the current wall-clock timestamp.
    pub fn new(
        sender: impl Into<String>,
        recipient: impl Into<String>,
        amount: i64,
        signature: Option<String>,
        vote_number: u64,
    ) -> Self {
        Transaction {
            sender: sender.into(),
            recipient: recipient.into(),
            timestamp: unix_timestamp_secs(),
            amount,
            signature,
            vote_number,
        }
    }

    /// Whether this transaction mints a fresh vote rather than transferring
    /// one between voters.
    pub fn is_issuance(&self) -> bool {
        self.sender == ISSUANCE_SENDER
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

    #[test]
    fn issuance_transaction_has_no_signature() {
        let tx = Transaction::new(ISSUANCE_SENDER, "voter-address", 1, None, 0);
        assert!(tx.is_issuance());
        assert!(tx.signature.is_none());
    }

    #[test]
    fn transfer_transaction_is_not_issuance() {
        let tx = Transaction::new("voter-a", "voter-b", 1, Some("credential".into()), 3);
        assert!(!tx.is_issuance());
    }
}
