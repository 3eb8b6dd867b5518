use rkyv::{Archive, Deserialize, Serialize};

/// Identity record for the local chain.
///
/// Storing the private key server-side is a trust-model simplification for a
/// local/test deployment, not a pattern to carry anywhere else.
#[derive(Archive, Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub username: String,
    /// Compressed SEC1 public key bytes.
    pub public_key: Vec<u8>,
    /// Raw 32-byte secret key.
    pub private_key: Vec<u8>,
}
