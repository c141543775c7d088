//! The persistence contract the RPC layer consumes (§6 "Store contract").
//!
//! Concrete storage, the bloom-filter implementation, and replication are
//! external collaborators. This module fixes only the interface: trait
//! methods return `impl Future<...> + Send` in the native async-fn-in-trait
//! style, so an implementor may be backed by a lock, an async database
//! driver, or anything else without the core caring.

use crate::data::{Data, DataMap, KeyMap640, Status};
use crate::key::{Number160, Number320, Number640};
use crate::Result;
use std::future::Future;

/// The four mutually exclusive query shapes GET and DIGEST select between,
/// decoded from message slots immediately on ingress (§4.4, §9 "Multiple-flag
/// to variant encoding").
#[derive(Clone, Debug)]
pub enum RangeSpec {
    /// `message.keyCollection` has exactly two elements and `integer` is set.
    Range { from: Number640, to: Number640, limit: Option<u32>, ascending: bool },
    /// `message.keyCollection` populated, `integer` absent.
    Keys(Vec<Number640>),
    /// Neither a collection nor a range; one or both bloom filters present.
    /// The scan range is the whole `(loc, dom)` bucket.
    Bloom {
        bucket: Number320,
        key_bloom: Option<Box<dyn BloomFilter>>,
        content_bloom: Option<Box<dyn BloomFilter>>,
        limit: Option<u32>,
        ascending: bool,
    },
    /// No collection, no bloom filters: the whole bucket.
    Bucket { bucket: Number320, limit: Option<u32>, ascending: bool },
}

impl RangeSpec {
    /// `true` when this query is bucket-scoped (not a global key-collection
    /// or range scan) — used by DIGEST to decide whether location/domain
    /// bloom filters are included in a bloom response (§4.5). `Range` is
    /// excluded alongside `Keys` since both shapes can span multiple
    /// buckets (§4.4).
    pub fn is_bucket_scoped(&self) -> bool {
        matches!(self, RangeSpec::Bucket { .. } | RangeSpec::Bloom { .. })
    }
}

/// A bloom filter as consumed by GET's filtered query and produced by
/// DIGEST's bloom response. The concrete implementation (hash family, bit
/// array layout) lives outside this core.
pub trait BloomFilter: Send + Sync {
    fn contains(&self, key: &Number160) -> bool;
}

/// Builds bloom filters summarizing a set of `Number160` values, supplied at
/// construction time to whatever assembles a DIGEST handler (§4.5).
pub trait BloomFilterFactory: Send + Sync {
    fn build<'a>(&self, keys: Box<dyn Iterator<Item = &'a Number160> + 'a>) -> Box<dyn BloomFilter>;
}

/// Digest response body (§4.5): either an exact key→digest map, or — when
/// `returnBloom` was requested — a small set of bloom filters summarizing
/// the matched set.
pub enum DigestInfo {
    Exact(KeyMap640),
    Bloom {
        content_key_bloom: Box<dyn BloomFilter>,
        version_key_bloom: Box<dyn BloomFilter>,
        /// Present only when the scan was global (key-collection mode),
        /// not bucket-scoped (§4.5).
        location_key_bloom: Option<Box<dyn BloomFilter>>,
        domain_key_bloom: Option<Box<dyn BloomFilter>>,
    },
}

/// The persistence contract consumed by all five handlers.
///
/// Implementations are assumed thread-safe and shared across concurrent
/// handler invocations (§5): the RPC layer holds no mutable state of its
/// own between requests.
pub trait EntryStore: Send + Sync {
    /// Single-key write. `put_if_absent` and `protect_domain` are the
    /// decoded request-type semantics of §4.1.
    fn put(
        &self,
        key: Number640,
        value: Data,
        public_key: Option<kadrpc_crypto::ed25519::VerifyingKey>,
        put_if_absent: bool,
        protect_domain: bool,
    ) -> impl Future<Output = Result<Status>> + Send;

    fn get_one(&self, key: Number640) -> impl Future<Output = Result<Option<Data>>> + Send;

    fn get_range(&self, query: RangeSpec) -> impl Future<Output = Result<DataMap>> + Send;

    /// Single-key removal. Returns `None` both when the key is absent and
    /// when a protection check fails — removal fails silently per-entry
    /// (§4.6, §7).
    fn remove_one(
        &self,
        key: Number640,
        public_key: Option<kadrpc_crypto::ed25519::VerifyingKey>,
    ) -> impl Future<Output = Result<Option<Data>>> + Send;

    /// Bucket-range removal. The returned map contains only the entries
    /// actually removed.
    fn remove_range(
        &self,
        min: Number640,
        max: Number640,
        public_key: Option<kadrpc_crypto::ed25519::VerifyingKey>,
    ) -> impl Future<Output = Result<DataMap>> + Send;

    fn digest(
        &self,
        query: RangeSpec,
        return_bloom: bool,
        bloom_factory: &dyn BloomFilterFactory,
    ) -> impl Future<Output = Result<DigestInfo>> + Send;
}

/// The replication subsystem notified after successful PUT/ADD entries
/// (§4.2, §9 "Responsibility notification"). Optional: a store may have
/// none, in which case handlers simply skip the notification.
pub trait ReplicationStorage: Send + Sync {
    fn update_and_notify_responsibilities(&self, location_key: Number160) -> impl Future<Output = ()> + Send;
}
