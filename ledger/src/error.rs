//! Error types returned by the ledger.

use std::fmt;

/// Errors returned while validating a candidate chain fetched from a peer.
#[derive(Debug)]
pub enum ValidationError {
    /// A block's `previous_hash` does not match the hash of its predecessor.
    BrokenLink { index: u64 },
    /// A block's proof does not solve the puzzle posed by its predecessor.
    InvalidProof { index: u64 },
    /// A transaction inside the chain failed validation.
    InvalidTransaction { block_index: u64, reason: String },
    /// The chain was empty or shorter than a single genesis block.
    TooShort,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::BrokenLink { index } => {
                write!(f, "block {index} does not link to its predecessor's hash")
            }
            ValidationError::InvalidProof { index } => {
                write!(f, "block {index} has an invalid proof of work")
            }
            ValidationError::InvalidTransaction {
                block_index,
                reason,
            } => write!(f, "block {block_index} has an invalid transaction: {reason}"),
            ValidationError::TooShort => write!(f, "chain has no blocks"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// High-level errors surfaced by ledger operations.
#[derive(Debug)]
pub enum LedgerError {
    /// Underlying chain validation failure.
    Validation(ValidationError),
    /// The requested vote number does not exist in this chain.
    UnknownVoteNumber(u64),
    /// The credential (address/signature) could not be parsed.
    Credential(String),
    /// Catch-all for other issues.
    Other(String),
}

impl From<ValidationError> for LedgerError {
    fn from(e: ValidationError) -> Self {
        LedgerError::Validation(e)
    }
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerError::Validation(e) => write!(f, "{e}"),
            LedgerError::UnknownVoteNumber(n) => write!(f, "no block at vote number {n}"),
            LedgerError::Credential(msg) => write!(f, "invalid credential: {msg}"),
            LedgerError::Other(msg) => write!(f, "ledger error: {msg}"),
        }
    }
}

impl std::error::Error for LedgerError {}
