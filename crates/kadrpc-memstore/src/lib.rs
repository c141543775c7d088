//! # kadrpc-memstore
//!
//! An in-memory reference implementation of [`kadrpc_core::store::EntryStore`],
//! with domain- and entry-level public-key protection (§3 "Entry protection
//! state"). Exists to exercise and demonstrate the storage RPC core; a
//! production deployment is expected to back the same trait with
//! persistent, replicated storage instead.

use kadrpc_bloom::Factory as BloomFactory;
use kadrpc_core::data::{Data, DataMap, KeyMap640, Status};
use kadrpc_core::key::{Number160, Number320, Number640};
use kadrpc_core::store::{BloomFilterFactory, DigestInfo, EntryStore, RangeSpec};
use kadrpc_core::{DhtError, Result};
use std::collections::BTreeMap;
use std::sync::RwLock;
use tracing::debug;

/// Per-bucket protection: the domain's protecting key, if the domain is
/// protected.
#[derive(Default)]
struct DomainProtection {
    domain_keys: BTreeMap<Number320, kadrpc_crypto::ed25519::VerifyingKey>,
}

struct StoredEntry {
    data: Data,
}

/// A `BTreeMap`-backed store, so range scans iterate in `Number640` order
/// without a separate sort pass.
pub struct MemoryStore {
    entries: RwLock<BTreeMap<Number640, StoredEntry>>,
    protection: RwLock<DomainProtection>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        MemoryStore { entries: RwLock::new(BTreeMap::new()), protection: RwLock::new(DomainProtection::default()) }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_write_protection(
        &self,
        key: &Number640,
        public_key: Option<kadrpc_crypto::ed25519::VerifyingKey>,
        entries: &BTreeMap<Number640, StoredEntry>,
    ) -> bool {
        let protection = self.protection.read().expect("protection lock poisoned");
        if let Some(domain_key) = protection.domain_keys.get(&key.bucket()) {
            if Some(*domain_key) != public_key {
                return false;
            }
        }
        if let Some(existing) = entries.get(key) {
            if let Some(entry_key) = existing.data.public_key {
                if Some(entry_key) != public_key {
                    return false;
                }
            }
        }
        true
    }

    fn collect_range(&self, query: &RangeSpec) -> Vec<(Number640, Data)> {
        let entries = self.entries.read().expect("entries lock poisoned");
        let (mut matched, ascending, limit): (Vec<(Number640, Data)>, bool, Option<u32>) = match query {
            RangeSpec::Range { from, to, limit, ascending } => {
                (entries.range(*from..=*to).map(|(k, v)| (*k, v.data.clone())).collect(), *ascending, *limit)
            }
            RangeSpec::Keys(keys) => {
                let items = keys.iter().filter_map(|k| entries.get(k).map(|v| (*k, v.data.clone()))).collect();
                (items, true, None)
            }
            RangeSpec::Bucket { bucket, limit, ascending } => {
                let min = Number640::bucket_min(*bucket);
                let max = Number640::bucket_max(*bucket);
                (entries.range(min..=max).map(|(k, v)| (*k, v.data.clone())).collect(), *ascending, *limit)
            }
            RangeSpec::Bloom { bucket, key_bloom, content_bloom, limit, ascending } => {
                let min = Number640::bucket_min(*bucket);
                let max = Number640::bucket_max(*bucket);
                let items = entries
                    .range(min..=max)
                    .filter(|(k, v)| {
                        key_bloom.as_ref().map_or(true, |f| f.contains(&k.content_key))
                            && content_bloom.as_ref().map_or(true, |f| f.contains(&v.data.hash()))
                    })
                    .map(|(k, v)| (*k, v.data.clone()))
                    .collect();
                (items, *ascending, *limit)
            }
        };

        if !matches!(query, RangeSpec::Keys(_)) && !ascending {
            matched.reverse();
        }
        if let Some(limit) = limit {
            matched.truncate(limit as usize);
        }
        matched
    }
}

impl EntryStore for MemoryStore {
    async fn put(
        &self,
        key: Number640,
        value: Data,
        public_key: Option<kadrpc_crypto::ed25519::VerifyingKey>,
        put_if_absent: bool,
        protect_domain: bool,
    ) -> Result<Status> {
        let mut entries = self.entries.write().expect("entries lock poisoned");

        if put_if_absent && entries.contains_key(&key) {
            return Ok(Status::FailedNotAbsent);
        }
        if !self.check_write_protection(&key, public_key, &entries) {
            return Ok(Status::FailedSecurity);
        }
        if protect_domain {
            if let Some(owner) = public_key {
                self.protection.write().expect("protection lock poisoned").domain_keys.insert(key.bucket(), owner);
            }
        }

        entries.insert(key, StoredEntry { data: value });
        Ok(Status::Ok)
    }

    async fn get_one(&self, key: Number640) -> Result<Option<Data>> {
        Ok(self.entries.read().expect("entries lock poisoned").get(&key).map(|e| e.data.clone()))
    }

    async fn get_range(&self, query: RangeSpec) -> Result<DataMap> {
        Ok(self.collect_range(&query).into_iter().collect())
    }

    async fn remove_one(
        &self,
        key: Number640,
        public_key: Option<kadrpc_crypto::ed25519::VerifyingKey>,
    ) -> Result<Option<Data>> {
        let mut entries = self.entries.write().expect("entries lock poisoned");
        if !self.check_write_protection(&key, public_key, &entries) {
            debug!(?key, "remove denied by protection check");
            return Ok(None);
        }
        Ok(entries.remove(&key).map(|e| e.data))
    }

    async fn remove_range(
        &self,
        min: Number640,
        max: Number640,
        public_key: Option<kadrpc_crypto::ed25519::VerifyingKey>,
    ) -> Result<DataMap> {
        let keys: Vec<Number640> = {
            let entries = self.entries.read().expect("entries lock poisoned");
            entries.range(min..=max).map(|(k, _)| *k).collect()
        };
        let mut removed = DataMap::new();
        for key in keys {
            if let Some(data) = self.remove_one(key, public_key).await? {
                removed.insert(key, data);
            }
        }
        Ok(removed)
    }

    async fn digest(
        &self,
        query: RangeSpec,
        return_bloom: bool,
        bloom_factory: &dyn BloomFilterFactory,
    ) -> Result<DigestInfo> {
        let is_bucket_scoped = query.is_bucket_scoped();
        let matched = self.collect_range(&query);

        if !return_bloom {
            let mut digests = KeyMap640::new();
            for (key, data) in &matched {
                digests.insert(*key, data.hash());
            }
            return Ok(DigestInfo::Exact(digests));
        }

        let content_keys: Vec<Number160> = matched.iter().map(|(k, _)| k.content_key).collect();
        let version_keys: Vec<Number160> = matched.iter().map(|(k, _)| k.version_key).collect();
        let content_key_bloom = bloom_factory.build(Box::new(content_keys.iter()));
        let version_key_bloom = bloom_factory.build(Box::new(version_keys.iter()));

        if is_bucket_scoped {
            return Ok(DigestInfo::Bloom { content_key_bloom, version_key_bloom, location_key_bloom: None, domain_key_bloom: None });
        }

        let location_keys: Vec<Number160> = matched.iter().map(|(k, _)| k.location_key).collect();
        let domain_keys: Vec<Number160> = matched.iter().map(|(k, _)| k.domain_key).collect();
        let location_key_bloom = bloom_factory.build(Box::new(location_keys.iter()));
        let domain_key_bloom = bloom_factory.build(Box::new(domain_keys.iter()));
        Ok(DigestInfo::Bloom {
            content_key_bloom,
            version_key_bloom,
            location_key_bloom: Some(location_key_bloom),
            domain_key_bloom: Some(domain_key_bloom),
        })
    }
}
