//! Stored values and the ordered collections the handlers exchange (§3).

use crate::key::{Number160, Number640};
use std::collections::BTreeMap;

/// A stored value: opaque payload, content hash, and optional protecting key.
///
/// The RPC core treats `Data` as opaque except for [`Data::hash`], used by
/// ADD in hashed mode.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Data {
    payload: Vec<u8>,
    /// The protection owner's public key, if this entry is entry-protected.
    pub public_key: Option<kadrpc_crypto::ed25519::VerifyingKey>,
}

impl Data {
    pub fn new(payload: Vec<u8>) -> Self {
        Data { payload, public_key: None }
    }

    pub fn with_protection(payload: Vec<u8>, public_key: kadrpc_crypto::ed25519::VerifyingKey) -> Self {
        Data { payload, public_key: Some(public_key) }
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Content hash of the payload. Deterministic; used as the content key
    /// in ADD's hashed mode.
    pub fn hash(&self) -> Number160 {
        Number160::from_hash(&self.payload)
    }
}

/// An ordered mapping `Number640 → Data`. Iteration order is insertion order
/// and must be preserved on the wire.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct DataMap {
    entries: Vec<(Number640, Data)>,
}

impl DataMap {
    pub fn new() -> Self {
        DataMap { entries: Vec::new() }
    }

    pub fn insert(&mut self, key: Number640, value: Data) {
        self.entries.push((key, value));
    }

    pub fn get(&self, key: &Number640) -> Option<&Data> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Number640, Data)> {
        self.entries.iter()
    }

    pub fn into_iter(self) -> impl Iterator<Item = (Number640, Data)> {
        self.entries.into_iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &Number640> {
        self.entries.iter().map(|(k, _)| k)
    }
}

impl FromIterator<(Number640, Data)> for DataMap {
    fn from_iter<T: IntoIterator<Item = (Number640, Data)>>(iter: T) -> Self {
        DataMap { entries: iter.into_iter().collect() }
    }
}

/// A finite sequence of `Number640` with preserved order. May contain
/// duplicates; handlers treat it as a multiset where noted.
pub type KeyCollection = Vec<Number640>;

/// Per-entry status ordinal. Frozen for wire compatibility — values must
/// never be renumbered (§9 "Per-entry status ordinals on the wire").
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[repr(u8)]
pub enum Status {
    Ok = 0,
    FailedNotAbsent = 1,
    FailedSecurity = 2,
    Failed = 3,
}

impl Status {
    pub fn is_ok(&self) -> bool {
        matches!(self, Status::Ok)
    }
}

/// An ordered mapping `Number640 → Status`, reporting per-entry outcome for
/// PUT/ADD responses. Order matches the request's iteration order (§5).
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct KeyMapByte {
    entries: Vec<(Number640, Status)>,
}

impl KeyMapByte {
    pub fn new() -> Self {
        KeyMapByte { entries: Vec::new() }
    }

    pub fn insert(&mut self, key: Number640, status: Status) {
        self.entries.push((key, status));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Number640, Status)> {
        self.entries.iter()
    }

    /// `true` iff every entry's status is `Ok`.
    pub fn all_ok(&self) -> bool {
        self.entries.iter().all(|(_, s)| s.is_ok())
    }
}

/// An ordered mapping `Number640 → digest`, used in DIGEST's non-bloom
/// response. Digest values are store-chosen (version key or payload hash).
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct KeyMap640 {
    entries: BTreeMap<Number640, Number160>,
}

impl KeyMap640 {
    pub fn new() -> Self {
        KeyMap640 { entries: BTreeMap::new() }
    }

    pub fn insert(&mut self, key: Number640, digest: Number160) {
        self.entries.insert(key, digest);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Number640, &Number160)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &Number640> {
        self.entries.keys()
    }
}
