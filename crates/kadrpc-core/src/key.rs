//! The composite key space: fixed-width identifiers and their tuples.
//!
//! `Number160` is the atomic unit; `Number320`, `Number480`, and `Number640`
//! are tuples of it with lexicographic ordering over their fields in
//! declared order (§3).

use std::fmt;

/// A 160-bit unsigned identifier, big-endian total order.
///
/// Used as location key, domain key, content key, version key, and peer
/// identifier.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct Number160(pub [u8; 20]);

impl Number160 {
    pub const ZERO: Number160 = Number160([0u8; 20]);
    pub const MAX_VALUE: Number160 = Number160([0xffu8; 20]);

    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Number160(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Derive a Number160 from arbitrary bytes via BLAKE3, truncated to 160 bits.
    pub fn from_hash(data: &[u8]) -> Self {
        let full = kadrpc_crypto::blake3::hash(data);
        let mut out = [0u8; 20];
        out.copy_from_slice(&full[..20]);
        Number160(out)
    }
}

impl fmt::Debug for Number160 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Number160({})", hex::encode(self.0))
    }
}

impl fmt::Display for Number160 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Bucket identity: `(locationKey, domainKey)`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, serde::Serialize, serde::Deserialize)]
pub struct Number320 {
    pub location_key: Number160,
    pub domain_key: Number160,
}

impl Number320 {
    pub fn new(location_key: Number160, domain_key: Number160) -> Self {
        Number320 { location_key, domain_key }
    }
}

/// `(locationKey, domainKey, contentKey)` — the DHT-level aggregation unit (§4.8).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, serde::Serialize, serde::Deserialize)]
pub struct Number480 {
    pub location_key: Number160,
    pub domain_key: Number160,
    pub content_key: Number160,
}

impl Number480 {
    pub fn new(location_key: Number160, domain_key: Number160, content_key: Number160) -> Self {
        Number480 { location_key, domain_key, content_key }
    }
}

/// The primary key of every stored entry: `(locationKey, domainKey, contentKey, versionKey)`.
///
/// Total order is lexicographic over the four fields in this declared order.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, serde::Serialize, serde::Deserialize)]
pub struct Number640 {
    pub location_key: Number160,
    pub domain_key: Number160,
    pub content_key: Number160,
    pub version_key: Number160,
}

impl Number640 {
    pub fn new(
        location_key: Number160,
        domain_key: Number160,
        content_key: Number160,
        version_key: Number160,
    ) -> Self {
        Number640 { location_key, domain_key, content_key, version_key }
    }

    /// The lower bound of the `(loc, dom)` bucket's key range: `{loc, dom, ZERO, ZERO}`.
    pub fn bucket_min(bucket: Number320) -> Self {
        Number640::new(bucket.location_key, bucket.domain_key, Number160::ZERO, Number160::ZERO)
    }

    /// The upper bound of the `(loc, dom)` bucket's key range: `{loc, dom, MAX, MAX}`.
    pub fn bucket_max(bucket: Number320) -> Self {
        Number640::new(bucket.location_key, bucket.domain_key, Number160::MAX_VALUE, Number160::MAX_VALUE)
    }

    pub fn bucket(&self) -> Number320 {
        Number320::new(self.location_key, self.domain_key)
    }

    pub fn as_480(&self) -> Number480 {
        Number480::new(self.location_key, self.domain_key, self.content_key)
    }
}
