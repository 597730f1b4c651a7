//! Wallet derivation: a chain's transactions collapsed into net balances.

use std::collections::HashMap;

use crate::types::{Block, ISSUANCE_SENDER};

/// Net balance per address, derived from a chain's transaction history.
pub type Wallets = HashMap<String, i64>;

/// Result of folding a chain's transactions into wallet balances.
pub struct WalletSummary {
    /// Net balance per address.
    pub wallets: Wallets,
    /// Total amount ever issued by the genesis sender.
    pub total_value: i64,
}

/// Folds every transaction in `chain` into net per-address balances.
///
/// Mirrors updating a running `wallets` map one block at a time: each
/// transaction debits `sender` and credits `recipient` by `amount`.
/// Transactions whose sender is [`ISSUANCE_SENDER`] additionally contribute
/// to the running total issued.
pub fn derive_wallets(chain: &[Block]) -> WalletSummary {
    let mut wallets = Wallets::new();
    let mut total_value = 0i64;

    for block in chain {
        for tx in &block.transactions {
            *wallets.entry(tx.sender.clone()).or_insert(0) -= tx.amount;
            *wallets.entry(tx.recipient.clone()).or_insert(0) += tx.amount;
            if tx.sender == ISSUANCE_SENDER {
                total_value += tx.amount;
            }
        }
    }

    WalletSummary {
        wallets,
        total_value,
    }
}

/// Returns `true` if every non-issuance address holds a non-negative
/// balance, i.e. nobody spent more than they were issued.
pub fn all_balances_non_negative(wallets: &Wallets) -> bool {
    wallets
        .iter()
        .all(|(addr, balance)| addr == ISSUANCE_SENDER || *balance >= 0)
}

/// Derives wallets for a candidate chain and checks whether it is
/// acceptable for adoption.
///
/// A candidate is rejected if any address was overspent, or if the ledger
/// is value-locked and the candidate's total issued value differs from
/// `locked_total_value`; once locked, a node will only adopt chains that
/// agree on how much value was ever issued.
pub fn validate_for_adoption(
    chain: &[Block],
    locked: bool,
    locked_total_value: i64,
) -> Option<WalletSummary> {
    let summary = derive_wallets(chain);
    if !all_balances_non_negative(&summary.wallets) {
        return None;
    }
    if locked && summary.total_value != locked_total_value {
        return None;
    }
    Some(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Transaction;

    fn block_with(transactions: Vec<Transaction>) -> Block {
        let mut block = Block::genesis();
        block.transactions = transactions;
        block
    }

    #[test]
    fn issuance_credits_recipient_and_counts_toward_total() {
        let chain = vec![block_with(vec![Transaction::new(
            ISSUANCE_SENDER,
            "voter-1",
            1,
            None,
            0,
        )])];
        let summary = derive_wallets(&chain);
        assert_eq!(summary.wallets.get("voter-1"), Some(&1));
        assert_eq!(summary.total_value, 1);
    }

    #[test]
    fn transfer_debits_sender_and_credits_recipient() {
        let chain = vec![
            block_with(vec![Transaction::new(ISSUANCE_SENDER, "voter-1", 1, None, 0)]),
            block_with(vec![Transaction::new(
                "voter-1",
                "candidate-a",
                1,
                Some("credential".into()),
                1,
            )]),
        ];
        let summary = derive_wallets(&chain);
        assert_eq!(summary.wallets.get("voter-1"), Some(&0));
        assert_eq!(summary.wallets.get("candidate-a"), Some(&1));
        assert_eq!(summary.total_value, 1);
    }

    #[test]
    fn negative_balance_is_detected() {
        let mut wallets = Wallets::new();
        wallets.insert("voter-1".to_string(), -1);
        assert!(!all_balances_non_negative(&wallets));
    }

    #[test]
    fn locked_chain_rejects_a_different_total_value() {
        let chain = vec![block_with(vec![Transaction::new(
            ISSUANCE_SENDER,
            "voter-1",
            1,
            None,
            0,
        )])];
        assert!(validate_for_adoption(&chain, true, 5).is_none());
        assert!(validate_for_adoption(&chain, true, 1).is_some());
    }

    #[test]
    fn unlocked_chain_accepts_any_total_value() {
        let chain = vec![block_with(vec![Transaction::new(
            ISSUANCE_SENDER,
            "voter-1",
            1,
            None,
            0,
        )])];
        assert!(validate_for_adoption(&chain, false, 999).is_some());
    }
}
