//! Writing minted voter credentials to disk during issuance bootstrap.

use std::path::{Path, PathBuf};

use ledger::PrivateKey;
use tokio::fs;

#[derive(Debug)]
pub struct PersistenceError(std::io::Error);

impl std::fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "failed to write credential file: {}", self.0)
    }
}

impl std::error::Error for PersistenceError {}

/// Directory credential files are written under, relative to the working
/// directory the node is started from.
pub const SECRET_KEYS_DIR: &str = "secret_keys";

/// Path of the credential file for the `voter_number`-th minted voter
/// (1-indexed, matching the numbering voters are told at the polling place).
pub fn credential_path(voter_number: u64) -> PathBuf {
    Path::new(SECRET_KEYS_DIR).join(format!("key_{voter_number}.vote"))
}

/// Writes `private_key`'s PEM text to the credential file for `voter_number`,
/// creating [`SECRET_KEYS_DIR`] if it doesn't already exist.
pub async fn write_credential(
    voter_number: u64,
    private_key: &PrivateKey,
) -> Result<PathBuf, PersistenceError> {
    fs::create_dir_all(SECRET_KEYS_DIR)
        .await
        .map_err(PersistenceError)?;
    let path = credential_path(voter_number);
    fs::write(&path, private_key.0.as_bytes())
        .await
        .map_err(PersistenceError)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_path_is_one_indexed_and_rooted_under_secret_keys() {
        let path = credential_path(3);
        assert_eq!(path, PathBuf::from("secret_keys/key_3.vote"));
    }
}
