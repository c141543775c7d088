//! # kadrpc-crypto
//!
//! Cryptographic primitives backing the storage RPC core's access-control model.
//!
//! The storage RPC core signs and verifies requests with Ed25519, and derives
//! content hashes and Bloom-filter hash positions with BLAKE3. No algorithm
//! negotiation is permitted — the suite is fixed.
//!
//! ## Modules
//!
//! - [`blake3`] — Domain-separated BLAKE3 hashing.
//! - [`ed25519`] — Ed25519 signing and verification (RFC 8032).

pub mod blake3;
pub mod ed25519;

/// Error types for cryptographic operations.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// Ed25519 signature verification failed.
    #[error("signature verification failed")]
    SignatureVerification,

    /// Invalid key length.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// Invalid input data.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, CryptoError>;
