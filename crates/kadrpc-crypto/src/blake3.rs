//! Domain-separated BLAKE3 hashing for the storage RPC core.
//!
//! BLAKE3 serves content addressing (`Data::hash`) and Bloom-filter hash-position
//! derivation. Cross-purpose collisions are prevented by mandatory domain
//! separation using BLAKE3's built-in mode flags.
//!
//! ## Modes
//!
//! - [`hash`] — Pure hashing: content addressing of stored payloads.
//! - [`derive_key`] — Key derivation: Bloom-filter hash-position functions.
//! - [`keyed_hash`] — Keyed MAC/PRF.

/// Registered context strings for this crate's domain-separated key derivation.
/// Using an unregistered context string is a protocol violation.
pub mod contexts {
    /// Bloom-filter hash-position derivation, formatted with a function index.
    pub const BLOOM_HASH_PREFIX: &str = "kadrpc v1 bloom-hash-";
}

/// Compute BLAKE3 hash of the input data.
///
/// Used for content addressing (`Data::hash`).
pub fn hash(data: &[u8]) -> [u8; 32] {
    *::blake3::hash(data).as_bytes()
}

/// Compute a variable-length BLAKE3 hash.
pub fn hash_xof(data: &[u8], output: &mut [u8]) {
    let mut hasher = ::blake3::Hasher::new();
    hasher.update(data);
    let mut reader = hasher.finalize_xof();
    reader.fill(output);
}

/// Derive a key using BLAKE3's built-in key derivation mode.
///
/// The context string must be one of the registered context strings in
/// [`contexts`]. The key material can be any byte slice.
///
/// # Arguments
///
/// * `context` - A registered context string
/// * `key_material` - The input key material
pub fn derive_key(context: &str, key_material: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    let mut hasher = ::blake3::Hasher::new_derive_key(context);
    hasher.update(key_material);
    let hash = hasher.finalize();
    out.copy_from_slice(hash.as_bytes());
    out
}

/// Compute a keyed BLAKE3 hash (MAC/PRF).
///
/// The key must be exactly 32 bytes, typically derived via [`derive_key`].
pub fn keyed_hash(key: &[u8; 32], message: &[u8]) -> [u8; 32] {
    *::blake3::keyed_hash(key, message).as_bytes()
}
