//! Node crate: HTTP surface, peer transport, CLI configuration, and the
//! bootstrap/lifecycle orchestration shared by the `issuance-node` and
//! `peer-node` binaries.
//!
//! The `ledger` crate owns every transport-agnostic rule (hashing, proof of
//! work, validation, wallets, reconciliation). This crate wires that engine
//! to axum routes, a `reqwest`-backed peer client, and `clap`-parsed CLI
//! flags, mirroring how the teacher's `api-gateway` binary wires `chain`'s
//! `DefaultConsensusEngine` into HTTP routes.

pub mod bootstrap;
pub mod candidates;
pub mod config;
pub mod http_client;
pub mod persistence;
pub mod routes;
pub mod state;
pub mod wire;
