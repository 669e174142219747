//! # Proof-of-Work Admission
//!
//! Join-time cost function gating `HELLO` admission. Ported from the
//! reference's documented (but not implemented in the kept source variant)
//! `pow_check` / `pow_mine` contract in `utils.h`:
//!
//! > Compute SHA-256(node_id ‖ nonce_str) and check the hex digest starts
//! > with `difficulty` zero nibbles.
//!
//! The verifier never trusts a peer-supplied digest — it always
//! recomputes from `node_id` and `nonce` alone.

use thiserror::Error;

use crate::config::MAX_POW_ITERATIONS;
use crate::crypto::sha256;

#[derive(Debug, Error)]
pub enum PowError {
    #[error("exhausted {0} iterations without finding a valid nonce at difficulty {1}")]
    Exhausted(u64, u32),
}

/// Hex-encode SHA-256(`node_id` || decimal(`nonce`)).
pub fn digest_hex(node_id: &str, nonce: u64) -> String {
    let mut preimage = Vec::with_capacity(node_id.len() + 20);
    preimage.extend_from_slice(node_id.as_bytes());
    preimage.extend_from_slice(nonce.to_string().as_bytes());
    hex::encode(sha256(&preimage))
}

/// True iff `hex` begins with `difficulty` zero hex characters.
pub fn meets_difficulty(hex: &str, difficulty: u32) -> bool {
    let difficulty = difficulty as usize;
    if hex.len() < difficulty {
        return false;
    }
    hex.as_bytes()[..difficulty].iter().all(|&b| b == b'0')
}

/// Recompute the credential independently and check it against
/// `difficulty`. The caller's claimed `digest_hex` is never consulted.
pub fn verify(node_id: &str, nonce: u64, difficulty: u32) -> bool {
    if difficulty == 0 {
        return true;
    }
    meets_difficulty(&digest_hex(node_id, nonce), difficulty)
}

/// Mine a nonce such that `verify(node_id, nonce, difficulty)` holds.
/// Returns `(nonce, digest_hex)`. Pure, CPU-bound, no shared state — safe
/// to call from a blocking context or `spawn_blocking`.
pub fn mine(node_id: &str, difficulty: u32) -> Result<(u64, String), PowError> {
    if difficulty == 0 {
        return Ok((0, digest_hex(node_id, 0)));
    }
    for nonce in 0..MAX_POW_ITERATIONS {
        let digest = digest_hex(node_id, nonce);
        if meets_difficulty(&digest, difficulty) {
            return Ok((nonce, digest));
        }
    }
    Err(PowError::Exhausted(MAX_POW_ITERATIONS, difficulty))
}
