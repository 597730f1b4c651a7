//! The ledger: a replicated, append-only, hash-linked chain of vote
//! transactions, plus the bookkeeping (wallets, peers, pending pool) that a
//! node needs to extend and reconcile it.

use crate::crypto::{self, NO_COLLUSION, PrivateKey, PublicKey};
use crate::error::{LedgerError, ValidationError};
use crate::peers::PeerRegistry;
use crate::pow;
use crate::reconcile::{self, ChainFetcher};
use crate::types::{Block, ISSUANCE_SENDER, Transaction};
use crate::wallet::{self, Wallets};

/// The full state a single node holds about the election.
pub struct Ledger {
    chain: Vec<Block>,
    pending: Vec<Transaction>,
    peers: PeerRegistry,
    wallets: Wallets,
    total_value: i64,
    /// Once set, the node refuses to adopt any chain whose total issued
    /// value differs from `total_value`. Set after bootstrap completes, so
    /// new votes can never be minted into the chain afterward.
    locked: bool,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    /// Creates a fresh ledger containing only the genesis block.
    pub fn new() -> Self {
        Ledger {
            chain: vec![Block::genesis()],
            pending: Vec::new(),
            peers: PeerRegistry::new(),
            wallets: Wallets::new(),
            total_value: 0,
            locked: false,
        }
    }

    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    pub fn len(&self) -> u64 {
        self.chain.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    pub fn last_block(&self) -> &Block {
        self.chain.last().expect("chain always has a genesis block")
    }

    pub fn peers(&self) -> &PeerRegistry {
        &self.peers
    }

    /// Registers a peer node address.
    pub fn register_node(&mut self, address: &str) -> Result<(), LedgerError> {
        self.peers.register(address).map_err(LedgerError::Other)
    }

    /// Removes a peer node address. Idempotent.
    pub fn remove_node(&mut self, address: &str) {
        self.peers.remove(address)
    }

    /// Prevents this node from ever adopting a chain whose total issued
    /// value differs from the current one. Called once bootstrap is done.
    pub fn value_lock(&mut self) {
        self.locked = true;
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn total_value(&self) -> i64 {
        self.total_value
    }

    /// Balance held by `address`; zero if the address has never appeared in
    /// a transaction.
    pub fn balance_of(&self, address: &str) -> i64 {
        *self.wallets.get(address).unwrap_or(&0)
    }

    /// Looks up the address that owns the vote cast at `vote_number`: the
    /// sole recipient of the single-transaction block at that index.
    pub fn transactor_for_vote(&self, vote_number: u64) -> Option<String> {
        let block = self.chain.get(vote_number as usize)?;
        if block.transactions.len() != 1 {
            return None;
        }
        Some(block.transactions[0].recipient.clone())
    }

    /// Queues a transaction for inclusion in the next block and returns a
    /// clone of it, so the caller can check it actually landed.
    pub fn new_transaction(&mut self, transaction: Transaction) -> Transaction {
        self.pending.push(transaction.clone());
        transaction
    }

    /// Whether any transaction is waiting to be mined into a block.
    pub fn has_pending_transactions(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Finds the proof of work for the current tip and mines it into a new
    /// block, draining every currently-valid pending transaction into it.
    ///
    /// Transactions that fail [`Self::valid_transaction`] or
    /// [`Self::valid_balance`] are silently dropped, matching the reference
    /// behavior, but the drop is logged at `warn` level since a dropped
    /// vote is operationally significant.
    pub fn mine_pending(&mut self) -> Block {
        let last_block = self.last_block().clone();
        let proof = pow::find_proof(last_block.proof, last_block.compute_hash().as_str());
        let previous_hash = last_block.compute_hash().0;
        self.new_block(proof, previous_hash)
    }

    /// Appends a new block using the given proof and previous hash, moving
    /// every currently-valid pending transaction into it.
    pub fn new_block(&mut self, proof: u64, previous_hash: String) -> Block {
        let pending = std::mem::take(&mut self.pending);
        let mut accepted = Vec::with_capacity(pending.len());

        for tx in pending {
            if Self::valid_transaction(&tx, &self.chain) && self.valid_balance(&tx) {
                self.apply_transaction(&tx);
                accepted.push(tx);
            } else {
                tracing::warn!(
                    sender = %tx.sender,
                    recipient = %tx.recipient,
                    "dropping invalid pending transaction while forming a new block"
                );
            }
        }

        let block = Block {
            index: self.chain.len() as u64,
            timestamp: current_timestamp(),
            transactions: accepted,
            proof,
            previous_hash,
        };
        self.chain.push(block.clone());
        block
    }

    fn apply_transaction(&mut self, tx: &Transaction) {
        *self.wallets.entry(tx.sender.clone()).or_insert(0) -= tx.amount;
        *self.wallets.entry(tx.recipient.clone()).or_insert(0) += tx.amount;
        if tx.sender == ISSUANCE_SENDER {
            self.total_value += tx.amount;
        }
    }

    /// Checks that `transaction` is not already recorded anywhere in
    /// `chain`: same sender, recipient, and timestamp as an earlier
    /// transaction marks it as a duplicate.
    pub fn non_redundant_transaction(transaction: &Transaction, chain: &[Block]) -> bool {
        let mut seen = false;
        for block in chain {
            for other in &block.transactions {
                if other.timestamp == transaction.timestamp
                    && other.sender == transaction.sender
                    && other.recipient == transaction.recipient
                {
                    if seen {
                        return false;
                    }
                    seen = true;
                }
            }
        }
        true
    }

    /// Validates a transaction against a candidate chain: checks for
    /// duplication, a non-negative amount, and, for anything other than an
    /// issuance mint, that the sender actually owns the referenced vote
    /// and can prove it by re-signing the credential challenge.
    ///
    /// Takes no `&self`: every fact this needs lives in `transaction` and
    /// `chain`, so callers can validate a peer's candidate chain without
    /// holding this node's ledger lock at all (see `resolve_conflicts`).
    pub fn valid_transaction(transaction: &Transaction, chain: &[Block]) -> bool {
        if !Self::non_redundant_transaction(transaction, chain) {
            return false;
        }
        if transaction.amount < 0 {
            return false;
        }
        if transaction.is_issuance() {
            return true;
        }

        let vote_number = transaction.vote_number;
        let Some(block) = chain.get(vote_number as usize) else {
            return false;
        };
        if block.transactions.len() != 1 {
            return false;
        }
        let referenced_voter = &block.transactions[0].recipient;
        if &transaction.sender != referenced_voter {
            return false;
        }

        let Some(signature_pem) = transaction.signature.as_deref() else {
            return false;
        };
        verify_credential(signature_pem, &transaction.sender)
    }

    /// Checks that `transaction`'s sender currently has enough balance to
    /// cover `amount`. The issuance sender is only permitted to mint while
    /// the chain is not value-locked.
    pub fn valid_balance(&self, transaction: &Transaction) -> bool {
        if transaction.sender == ISSUANCE_SENDER {
            return !self.locked;
        }
        self.balance_of(&transaction.sender) >= transaction.amount
    }

    /// Validates the hash-linking and proof-of-work of every block in
    /// `chain`, then validates every transaction it contains.
    ///
    /// Also takes no `&self`, for the same reason as [`Self::valid_transaction`].
    pub fn valid_chain(chain: &[Block]) -> Result<(), ValidationError> {
        let Some(mut last_block) = chain.first() else {
            return Err(ValidationError::TooShort);
        };

        for (i, block) in chain.iter().enumerate().skip(1) {
            let last_hash = last_block.compute_hash();
            if block.previous_hash != last_hash.0 {
                return Err(ValidationError::BrokenLink { index: i as u64 });
            }
            if !pow::valid_proof(last_block.proof, block.proof, last_hash.as_str()) {
                return Err(ValidationError::InvalidProof { index: i as u64 });
            }
            last_block = block;
        }

        for block in chain {
            for transaction in &block.transactions {
                if !Self::valid_transaction(transaction, chain) {
                    return Err(ValidationError::InvalidTransaction {
                        block_index: block.index,
                        reason: "transaction failed validation".to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Attempts to replace this node's chain with the longest valid chain
    /// known to any peer, via `fetcher`. Returns `true` if the chain was
    /// replaced. Peers that never respond are pruned from the registry.
    ///
    /// This convenience method holds `&mut self`, and so, through whatever
    /// lock the caller wraps a `Ledger` in, blocks the rest of that lock's
    /// users, for the whole network round trip. That's acceptable during
    /// single-threaded bootstrap (its only caller outside tests), but an
    /// HTTP route serving concurrent requests should instead snapshot peer
    /// state, call [`reconcile::gather_longest_valid_chain`] directly with
    /// no lock held, and finish with [`Self::replace_chain`] under a brief
    /// write lock; see `node::routes::peer::resolve`.
    pub async fn resolve_conflicts<F: ChainFetcher>(&mut self, fetcher: &F) -> bool {
        let peer_list: Vec<String> = self.peers.iter().cloned().collect();
        let current_length = self.len();
        let locked = self.locked;
        let total_value = self.total_value;

        let outcome = reconcile::gather_longest_valid_chain(
            fetcher,
            &peer_list,
            current_length,
            |candidate| {
                Self::valid_chain(candidate).is_ok()
                    && wallet::validate_for_adoption(candidate, locked, total_value).is_some()
            },
        )
        .await;

        for peer in &outcome.unreachable {
            self.peers.remove(peer);
        }

        match outcome.winner {
            Some(winning) => {
                let summary =
                    wallet::validate_for_adoption(&winning.chain, self.locked, self.total_value)
                        .expect("winner was already validated by gather_longest_valid_chain");
                self.chain = winning.chain;
                self.wallets = summary.wallets;
                self.total_value = summary.total_value;
                true
            }
            None => false,
        }
    }

    /// Replaces the local chain and wallet view with an already-validated
    /// candidate, but only if `candidate_length` is still strictly greater
    /// than the current chain, guarding against the local chain having
    /// grown (via a concurrent vote or another `resolve_conflicts`) between
    /// when `candidate` was fetched and validated and when this is called.
    /// Returns `true` if the swap happened.
    pub fn replace_chain(
        &mut self,
        candidate_length: u64,
        chain: Vec<Block>,
        summary: wallet::WalletSummary,
    ) -> bool {
        if candidate_length <= self.len() {
            return false;
        }
        self.chain = chain;
        self.wallets = summary.wallets;
        self.total_value = summary.total_value;
        true
    }
}

/// Verifies that the credential presented in `signature_pem` (the voter's
/// private key, as PEM text) proves ownership of the public key `address`.
fn verify_credential(signature_pem: &str, address: &str) -> bool {
    let private = PrivateKey(signature_pem.to_string());
    let public = PublicKey(address.to_string());
    let Ok(signature) = crypto::sign(NO_COLLUSION, &private) else {
        return false;
    };
    crypto::verify(NO_COLLUSION, &signature, &public)
}

fn current_timestamp() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::new_keypair;
    use crate::reconcile::FetchedChain;
    use async_trait::async_trait;

    fn issue_vote(ledger: &mut Ledger, recipient: &str) {
        let tx = Transaction::new(ISSUANCE_SENDER, recipient, 1, None, 0);
        ledger.new_transaction(tx);
        ledger.mine_pending();
    }

    #[test]
    fn genesis_chain_has_one_block() {
        let ledger = Ledger::new();
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn mining_an_issuance_transaction_credits_the_recipient() {
        let mut ledger = Ledger::new();
        issue_vote(&mut ledger, "voter-1");
        assert_eq!(ledger.balance_of("voter-1"), 1);
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn casting_a_vote_with_a_valid_credential_succeeds() {
        let mut ledger = Ledger::new();
        let pair = new_keypair().expect("keygen");
        issue_vote(&mut ledger, &pair.public.0);

        let credential = pair.private.0.clone();
        let tx = Transaction::new(pair.public.0.clone(), "candidate-a", 1, Some(credential), 1);
        ledger.new_transaction(tx);
        let block = ledger.mine_pending();

        assert_eq!(block.transactions.len(), 1);
        assert_eq!(ledger.balance_of("candidate-a"), 1);
        assert_eq!(ledger.balance_of(&pair.public.0), 0);
    }

    #[test]
    fn casting_a_vote_with_the_wrong_credential_is_dropped() {
        let mut ledger = Ledger::new();
        let pair = new_keypair().expect("keygen");
        let impostor = new_keypair().expect("keygen");
        issue_vote(&mut ledger, &pair.public.0);

        let tx = Transaction::new(
            pair.public.0.clone(),
            "candidate-a",
            1,
            Some(impostor.private.0.clone()),
            1,
        );
        ledger.new_transaction(tx);
        let block = ledger.mine_pending();

        assert!(block.transactions.is_empty());
        assert_eq!(ledger.balance_of("candidate-a"), 0);
    }

    #[test]
    fn double_spend_of_the_same_vote_is_rejected() {
        let mut ledger = Ledger::new();
        let pair = new_keypair().expect("keygen");
        issue_vote(&mut ledger, &pair.public.0);
        let credential = pair.private.0.clone();

        let tx1 = Transaction::new(
            pair.public.0.clone(),
            "candidate-a",
            1,
            Some(credential.clone()),
            1,
        );
        ledger.new_transaction(tx1);
        ledger.mine_pending();

        let tx2 = Transaction::new(pair.public.0.clone(), "candidate-b", 1, Some(credential), 1);
        ledger.new_transaction(tx2);
        let block2 = ledger.mine_pending();

        assert!(block2.transactions.is_empty());
        assert_eq!(ledger.balance_of("candidate-b"), 0);
    }

    #[test]
    fn value_lock_prevents_further_issuance() {
        let mut ledger = Ledger::new();
        ledger.value_lock();
        let tx = Transaction::new(ISSUANCE_SENDER, "voter-1", 1, None, 0);
        assert!(!ledger.valid_balance(&tx));
    }

    struct FixedFetcher(std::collections::HashMap<String, FetchedChain>);

    #[async_trait]
    impl ChainFetcher for FixedFetcher {
        async fn fetch_chain(&self, peer: &str) -> Option<FetchedChain> {
            self.0.get(peer).cloned()
        }
    }

    #[tokio::test]
    async fn resolve_conflicts_adopts_a_longer_valid_peer_chain() {
        let mut local = Ledger::new();

        let mut remote = Ledger::new();
        issue_vote(&mut remote, "voter-1");

        local.register_node("peer-a").unwrap();
        let mut responses = std::collections::HashMap::new();
        responses.insert(
            "peer-a".to_string(),
            FetchedChain {
                length: remote.len(),
                chain: remote.chain().to_vec(),
            },
        );
        let fetcher = FixedFetcher(responses);

        let replaced = local.resolve_conflicts(&fetcher).await;
        assert!(replaced);
        assert_eq!(local.len(), 2);
        assert_eq!(local.balance_of("voter-1"), 1);
    }

    #[tokio::test]
    async fn resolve_conflicts_prunes_unreachable_peers() {
        let mut local = Ledger::new();
        local.register_node("ghost").unwrap();
        let fetcher = FixedFetcher(std::collections::HashMap::new());

        let replaced = local.resolve_conflicts(&fetcher).await;
        assert!(!replaced);
        assert!(!local.peers().contains("ghost"));
    }
}
