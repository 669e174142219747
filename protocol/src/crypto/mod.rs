//! # Cryptographic Primitives
//!
//! The only cryptography this system needs is a hash function: the
//! join-time proof-of-work admission gate runs SHA-256 over a candidate's
//! node id and a nonce, and nothing else here touches key material.

pub mod hash;

pub use hash::{sha256, sha256_array};
