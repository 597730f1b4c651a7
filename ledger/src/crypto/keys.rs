//! RSA key generation, PEM (de)serialization, sign, and verify.
//!
//! Keys round-trip through PKCS#1 PEM text so they can travel inside JSON
//! bodies and form fields and be compared by plain string equality, as
//! required by the wire contract (an address is "the textual form of an
//! asymmetric public key").

use std::fmt;

use rand::rngs::OsRng;
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey, EncodeRsaPrivateKey, EncodeRsaPublicKey, LineEnding};
use rsa::{Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};

/// Number of bits used for every credential key pair, per the reference
/// implementation. Not configurable: the spec treats key size the same way
/// it treats proof-of-work difficulty: a fixed parameter, not a runtime knob.
const KEY_BITS: usize = 1024;

/// Errors raised while generating, (de)serializing, signing, or verifying keys.
#[derive(Debug)]
pub enum CryptoError {
    /// Key generation failed (RNG or parameter failure).
    KeyGeneration(String),
    /// A PEM string did not parse as a valid RSA key.
    InvalidKeyEncoding(String),
    /// Signing failed (should not happen for a well-formed private key).
    Signing(String),
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CryptoError::KeyGeneration(msg) => write!(f, "key generation failed: {msg}"),
            CryptoError::InvalidKeyEncoding(msg) => write!(f, "invalid key encoding: {msg}"),
            CryptoError::Signing(msg) => write!(f, "signing failed: {msg}"),
        }
    }
}

impl std::error::Error for CryptoError {}

/// A private key, serialized as PKCS#1 PEM text.
///
/// This is the voter credential: presenting it is equivalent to proving
/// ownership of the matching [`PublicKey`] address.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PrivateKey(pub String);

/// A public key, serialized as PKCS#1 PEM text.
///
/// The textual form of a public key *is* the voter's address.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct PublicKey(pub String);

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A freshly generated credential key pair.
pub struct KeyPair {
    pub public: PublicKey,
    pub private: PrivateKey,
}

/// Generates a new RSA key pair at the fixed [`KEY_BITS`] size.
pub fn new_keypair() -> Result<KeyPair, CryptoError> {
    let mut rng = OsRng;
    let private_key = RsaPrivateKey::new(&mut rng, KEY_BITS)
        .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
    let public_key = RsaPublicKey::from(&private_key);

    let private_pem = private_key
        .to_pkcs1_pem(LineEnding::LF)
        .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?
        .to_string();
    let public_pem = public_key
        .to_pkcs1_pem(LineEnding::LF)
        .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;

    Ok(KeyPair {
        public: PublicKey(public_pem),
        private: PrivateKey(private_pem),
    })
}

fn parse_private_key(key: &PrivateKey) -> Result<RsaPrivateKey, CryptoError> {
    RsaPrivateKey::from_pkcs1_pem(&key.0)
        .map_err(|e| CryptoError::InvalidKeyEncoding(e.to_string()))
}

fn parse_public_key(key: &PublicKey) -> Result<RsaPublicKey, CryptoError> {
    RsaPublicKey::from_pkcs1_pem(&key.0)
        .map_err(|e| CryptoError::InvalidKeyEncoding(e.to_string()))
}

fn digest(message: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(message.as_bytes());
    hasher.finalize().into()
}

/// Signs the SHA-256 digest of `message` with `private`, returning the raw
/// signature bytes (PKCS#1 v1.5).
pub fn sign(message: &str, private: &PrivateKey) -> Result<Vec<u8>, CryptoError> {
    let key = parse_private_key(private)?;
    let hashed = digest(message);
    key.sign(Pkcs1v15Sign::new::<Sha256>(), &hashed)
        .map_err(|e| CryptoError::Signing(e.to_string()))
}

/// Verifies that `signature` is a valid PKCS#1 v1.5 signature of `message`
/// under `public`. Never returns an error for a bad signature: a malformed
/// key or signature is simply "not verified".
pub fn verify(message: &str, signature: &[u8], public: &PublicKey) -> bool {
    let Ok(key) = parse_public_key(public) else {
        return false;
    };
    let hashed = digest(message);
    key.verify(Pkcs1v15Sign::new::<Sha256>(), &hashed, signature)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::NO_COLLUSION;

    #[test]
    fn sign_then_verify_succeeds() {
        let pair = new_keypair().expect("keygen");
        let sig = sign(NO_COLLUSION, &pair.private).expect("sign");
        assert!(verify(NO_COLLUSION, &sig, &pair.public));
    }

    #[test]
    fn verify_fails_under_wrong_key() {
        let pair_a = new_keypair().expect("keygen a");
        let pair_b = new_keypair().expect("keygen b");
        let sig = sign(NO_COLLUSION, &pair_a.private).expect("sign");
        assert!(!verify(NO_COLLUSION, &sig, &pair_b.public));
    }

    #[test]
    fn verify_fails_on_garbage_signature() {
        let pair = new_keypair().expect("keygen");
        assert!(!verify(NO_COLLUSION, b"not a signature", &pair.public));
    }

    #[test]
    fn verify_fails_on_malformed_public_key_text() {
        let bad_public = PublicKey("not a pem key".to_string());
        assert!(!verify(NO_COLLUSION, b"whatever", &bad_public));
    }

    #[test]
    fn keys_round_trip_through_pem_text() {
        let pair = new_keypair().expect("keygen");
        let reparsed_private = parse_private_key(&pair.private).expect("reparse private");
        let reparsed_public = parse_public_key(&pair.public).expect("reparse public");
        assert_eq!(
            RsaPublicKey::from(&reparsed_private),
            reparsed_public
        );
    }
}
