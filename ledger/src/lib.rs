//! Ledger crate.
//!
//! This crate provides the core building blocks for the replicated,
//! append-only election ledger:
//!
//! - strongly-typed domain types (`types`),
//! - the asymmetric credential protocol (`crypto`),
//! - the proof-of-work puzzle (`pow`),
//! - wallet derivation from a chain (`wallet`),
//! - the peer address registry (`peers`),
//! - chain reconciliation against peers (`reconcile`),
//! - the central [`Ledger`] type tying all of the above together,
//! - Prometheus-based metrics (`metrics`),
//! - and hand-rolled error types (`error`).
//!
//! Higher-level binaries compose these pieces into an issuance node or a
//! peer node, wiring an HTTP surface and a transport-specific
//! [`reconcile::ChainFetcher`] on top.

pub mod crypto;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod peers;
pub mod pow;
pub mod reconcile;
pub mod types;
pub mod wallet;

pub use crypto::{CryptoError, KeyPair, PrivateKey, PublicKey, new_keypair};
pub use error::{LedgerError, ValidationError};
pub use ledger::Ledger;
pub use metrics::{LedgerMetrics, MetricsRegistry, run_prometheus_http_server};
pub use peers::PeerRegistry;
pub use pow::{find_proof, valid_proof};
pub use reconcile::{ChainFetcher, FetchedChain, ResolutionOutcome, gather_longest_valid_chain};
pub use types::{Block, BlockHash, ISSUANCE_SENDER, Transaction};
pub use wallet::{Wallets, WalletSummary, derive_wallets, validate_for_adoption};
