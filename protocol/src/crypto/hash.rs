//! # Hashing
//!
//! SHA-256 is the only hash primitive this system needs: the proof-of-work
//! admission gate hashes `node_id || nonce` and checks the leading hex
//! nibbles of the digest against a difficulty target.

use sha2::{Digest, Sha256};

/// Compute the SHA-256 hash of the input data.
///
/// Returns a 32-byte digest as a `Vec<u8>`. Prefer [`sha256_array`] in hot
/// paths where the fixed-size type avoids an allocation.
///
/// # Example
///
/// ```
/// use gossip_protocol::crypto::sha256;
///
/// let hash = sha256(b"gossip");
/// assert_eq!(hash.len(), 32);
/// ```
pub fn sha256(data: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

/// Same as [`sha256`] but returns `[u8; 32]` for callers that want a
/// fixed-size type without the heap allocation.
pub fn sha256_array(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}
