//! Centralized key handling and ownership signatures.
//!
//! All ECDSA signing and verification goes through this module. Owning a
//! UTXO is proven by signing the referenced transaction's SHA-512 hash with
//! the secp256k1 key matching the output's public key; the curve works over
//! 32-byte digests, so the signed message is the SHA-256 of that hash.
//!
//! Key material crosses process boundaries hex-encoded: 32 secret bytes,
//! 33 compressed SEC1 public bytes.

use rand::rngs::OsRng;
use secp256k1::ecdsa::Signature;
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use sha2::{Digest, Sha256};

use crate::error::Error;

/// Generates a fresh secp256k1 keypair from the OS RNG.
pub fn generate_keypair() -> (SecretKey, PublicKey) {
    let secp = Secp256k1::new();
    secp.generate_keypair(&mut OsRng)
}

/// Derives the public key of a secret key.
pub fn public_key_of(secret: &SecretKey) -> PublicKey {
    let secp = Secp256k1::new();
    PublicKey::from_secret_key(&secp, secret)
}

/// Compressed SEC1 encoding of a public key (33 bytes).
pub fn public_key_bytes(public: &PublicKey) -> Vec<u8> {
    public.serialize().to_vec()
}

pub fn public_key_from_bytes(bytes: &[u8]) -> Result<PublicKey, Error> {
    PublicKey::from_slice(bytes)
        .map_err(|e| Error::Validation(format!("invalid public key bytes: {e}")))
}

pub fn secret_key_from_hex(hex_key: &str) -> Result<SecretKey, Error> {
    let bytes = hex::decode(hex_key.trim())
        .map_err(|e| Error::Validation(format!("invalid private key hex: {e}")))?;
    SecretKey::from_slice(&bytes)
        .map_err(|e| Error::Validation(format!("invalid private key: {e}")))
}

pub fn public_key_from_hex(hex_key: &str) -> Result<PublicKey, Error> {
    let bytes = hex::decode(hex_key.trim())
        .map_err(|e| Error::Validation(format!("invalid public key hex: {e}")))?;
    public_key_from_bytes(&bytes)
}

pub fn secret_key_to_hex(secret: &SecretKey) -> String {
    hex::encode(secret.secret_bytes())
}

pub fn public_key_to_hex(public: &PublicKey) -> String {
    hex::encode(public.serialize())
}

/// Signs a transaction hash, returning the signature's (r, s) halves.
pub fn sign_tx_hash(secret: &SecretKey, tx_hash: &[u8]) -> ([u8; 32], [u8; 32]) {
    let secp = Secp256k1::new();
    let sig = secp.sign_ecdsa(&signing_message(tx_hash), secret);
    split_signature(&sig)
}

/// Verifies an (r, s) signature over a transaction hash.
pub fn verify_tx_hash(public: &PublicKey, tx_hash: &[u8], r: &[u8; 32], s: &[u8; 32]) -> bool {
    let mut compact = [0u8; 64];
    compact[..32].copy_from_slice(r);
    compact[32..].copy_from_slice(s);
    let Ok(sig) = Signature::from_compact(&compact) else {
        return false;
    };
    let secp = Secp256k1::new();
    secp.verify_ecdsa(&signing_message(tx_hash), &sig, public)
        .is_ok()
}

// The tx hash is a 512-bit digest; fold it down to the curve's message size.
fn signing_message(tx_hash: &[u8]) -> Message {
    let digest: [u8; 32] = Sha256::digest(tx_hash).into();
    Message::from_digest(digest)
}

fn split_signature(sig: &Signature) -> ([u8; 32], [u8; 32]) {
    let compact = sig.serialize_compact();
    let mut r = [0u8; 32];
    let mut s = [0u8; 32];
    r.copy_from_slice(&compact[..32]);
    s.copy_from_slice(&compact[32..]);
    (r, s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_verify_roundtrip() {
        let (sk, pk) = generate_keypair();
        let tx_hash = vec![7u8; 64];
        let (r, s) = sign_tx_hash(&sk, &tx_hash);
        assert!(verify_tx_hash(&pk, &tx_hash, &r, &s));
    }

    #[test]
    fn verify_rejects_wrong_key() {
        let (sk, _) = generate_keypair();
        let (_, other_pk) = generate_keypair();
        let tx_hash = vec![7u8; 64];
        let (r, s) = sign_tx_hash(&sk, &tx_hash);
        assert!(!verify_tx_hash(&other_pk, &tx_hash, &r, &s));
    }

    #[test]
    fn verify_rejects_tampered_hash() {
        let (sk, pk) = generate_keypair();
        let (r, s) = sign_tx_hash(&sk, &[1u8; 64]);
        assert!(!verify_tx_hash(&pk, &[2u8; 64], &r, &s));
    }

    #[test]
    fn hex_roundtrip() {
        let (sk, pk) = generate_keypair();
        let sk_back = secret_key_from_hex(&secret_key_to_hex(&sk)).unwrap();
        let pk_back = public_key_from_hex(&public_key_to_hex(&pk)).unwrap();
        assert_eq!(sk, sk_back);
        assert_eq!(pk, pk_back);
    }

    #[test]
    fn malformed_hex_is_validation_error() {
        assert!(matches!(
            secret_key_from_hex("not hex"),
            Err(crate::Error::Validation(_))
        ));
        assert!(matches!(
            public_key_from_hex("abcd"),
            Err(crate::Error::Validation(_))
        ));
    }
}
