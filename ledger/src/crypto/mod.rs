//! Asymmetric credential primitives.
//!
//! A voter credential is an RSA private key minted by the issuance node.
//! The corresponding public key, serialized to PEM text, is the voter's
//! on-chain address. Everywhere the system signs or verifies, it does so
//! over the fixed plaintext [`NO_COLLUSION`]; there is no per-vote message,
//! only proof that the presenter holds the private key.

pub mod keys;

pub use keys::{CryptoError, KeyPair, PrivateKey, PublicKey, new_keypair, sign, verify};

/// Fixed plaintext signed and verified everywhere in the credential protocol.
pub const NO_COLLUSION: &str = "NO COLLUSION";
