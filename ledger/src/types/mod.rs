//! Core domain types shared by the ledger: transactions and blocks.

pub mod block;
pub mod transaction;

pub use block::{Block, BlockHash};
pub use transaction::{ISSUANCE_SENDER, Transaction};
