//! Proof-of-work puzzle: find a number whose hash against the previous
//! proof carries a fixed number of leading hex zeroes.

use sha2::{Digest, Sha256};

/// Number of leading hex zeroes a valid proof's digest must have.
///
/// Fixed, not a runtime knob, same as the credential key size.
const DIFFICULTY_PREFIX: &str = "0000";

/// Returns `true` if `proof` solves the puzzle posed by `last_proof` and
/// `last_hash`.
pub fn valid_proof(last_proof: u64, proof: u64, last_hash: &str) -> bool {
    let guess = format!("{last_proof}{proof}{last_hash}");
    let mut hasher = Sha256::new();
    hasher.update(guess.as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest.starts_with(DIFFICULTY_PREFIX)
}

/// Brute-forces the smallest `proof` satisfying [`valid_proof`] for
/// `last_proof` and `last_hash`.
pub fn find_proof(last_proof: u64, last_hash: &str) -> u64 {
    let mut proof = 0u64;
    while !valid_proof(last_proof, proof, last_hash) {
        proof += 1;
    }
    proof
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_proof_satisfies_valid_proof() {
        let last_hash = "deadbeef";
        let proof = find_proof(100, last_hash);
        assert!(valid_proof(100, proof, last_hash));
    }

    #[test]
    fn different_last_proof_changes_the_solution() {
        let last_hash = "deadbeef";
        let proof_a = find_proof(100, last_hash);
        let proof_b = find_proof(101, last_hash);
        assert!(valid_proof(100, proof_a, last_hash));
        assert!(!valid_proof(101, proof_a, last_hash) || proof_a == proof_b);
    }

}
