//! The five server-side operations (§4.2–§4.6).
//!
//! Each handler decodes its request-type variant into semantic flags
//! (§4.1), invokes the store contract, and produces a response. Handlers
//! never suspend except on the store call itself (§5) and never surface
//! per-entry failures as message-level exceptions (§7).

use crate::codec::{AddSemantics, MessageSlots, PutSemantics, QuerySemantics, RemoveSemantics};
use crate::data::{Data, DataMap, KeyMapByte, Status};
use crate::key::Number160;
use crate::store::{BloomFilterFactory, DigestInfo, EntryStore, RangeSpec, ReplicationStorage};
use crate::{DhtError, ResponseType, Result, ADD_LIST_MODE_MAX_RETRIES};
use rand::RngCore;
use tracing::{debug, warn};

async fn notify_responsibilities<R: ReplicationStorage>(replication: Option<&R>, location_key: Number160) {
    if let Some(r) = replication {
        r.update_and_notify_responsibilities(location_key).await;
    }
}

/// PUT (§4.2). Writes every `(k, v)` in the message's insertion order,
/// notifying replication after each successful entry.
pub async fn handle_put<S, R>(
    store: &S,
    replication: Option<&R>,
    data_map: DataMap,
    public_key: Option<kadrpc_crypto::ed25519::VerifyingKey>,
    semantics: PutSemantics,
) -> Result<(ResponseType, KeyMapByte)>
where
    S: EntryStore,
    R: ReplicationStorage,
{
    let mut response = KeyMapByte::new();
    for (key, value) in data_map.into_iter() {
        let status = store
            .put(key, value, public_key, semantics.put_if_absent, semantics.protect_domain)
            .await?;
        if status.is_ok() {
            notify_responsibilities(replication, key.location_key).await;
        } else {
            debug!(?key, ?status, "put entry failed");
        }
        response.insert(key, status);
    }
    let response_type = if response.all_ok() { ResponseType::Ok } else { ResponseType::PartiallyOk };
    Ok((response_type, response))
}

/// ADD (§4.3). Always "create" semantics; always returns `OK` as the
/// message-level response type, with per-entry status still carried in the
/// `KeyMapByte` body.
pub async fn handle_add<S, R>(
    store: &S,
    replication: Option<&R>,
    data_map: DataMap,
    public_key: Option<kadrpc_crypto::ed25519::VerifyingKey>,
    semantics: AddSemantics,
) -> Result<(ResponseType, KeyMapByte)>
where
    S: EntryStore,
    R: ReplicationStorage,
{
    let mut response = KeyMapByte::new();
    for (key, value) in data_map.into_iter() {
        let status = if semantics.list_mode {
            add_list_mode_entry(store, key, value, public_key, semantics.protect_domain).await?
        } else {
            // Hashed mode: the client already keyed the entry by content hash.
            // Multiple inserts of the same payload collapse onto one key.
            store.put(key, value, public_key, false, semantics.protect_domain).await?
        };
        if status.is_ok() {
            notify_responsibilities(replication, key.location_key).await;
        }
        response.insert(key, status);
    }
    Ok((ResponseType::Ok, response))
}

/// List-mode ADD for one entry: roll a fresh random content key and retry
/// `put(putIfAbsent=true)` until the store returns a status other than
/// `FAILED_NOT_ABSENT`, capped at [`ADD_LIST_MODE_MAX_RETRIES`] (§4.3, §9).
async fn add_list_mode_entry<S: EntryStore>(
    store: &S,
    key: crate::key::Number640,
    value: Data,
    public_key: Option<kadrpc_crypto::ed25519::VerifyingKey>,
    protect_domain: bool,
) -> Result<Status> {
    let mut rng = rand::rngs::OsRng;
    let mut last_status = Status::FailedNotAbsent;
    for attempt in 0..ADD_LIST_MODE_MAX_RETRIES {
        let mut content_bytes = [0u8; 20];
        rng.fill_bytes(&mut content_bytes);
        let candidate_key = crate::key::Number640::new(
            key.location_key,
            key.domain_key,
            Number160::from_bytes(content_bytes),
            key.version_key,
        );
        last_status = store.put(candidate_key, value.clone(), public_key, true, protect_domain).await?;
        if !matches!(last_status, Status::FailedNotAbsent) {
            return Ok(last_status);
        }
        if attempt + 1 == ADD_LIST_MODE_MAX_RETRIES {
            warn!(retries = ADD_LIST_MODE_MAX_RETRIES, "add list-mode retry cap exhausted");
        }
    }
    Ok(last_status)
}

/// GET (§4.4). Dispatches on the already-decoded query shape; never throws
/// on an empty bucket.
pub async fn handle_get<S: EntryStore>(store: &S, slots: MessageSlots, semantics: QuerySemantics) -> Result<DataMap> {
    let query = slots.decode_range_spec(semantics.ascending)?;
    store.get_range(query).await
}

/// DIGEST (§4.5). Parallels GET's query shapes but returns summary
/// information.
pub async fn handle_digest<S: EntryStore>(
    store: &S,
    slots: MessageSlots,
    semantics: QuerySemantics,
    bloom_factory: &dyn BloomFilterFactory,
) -> Result<DigestInfo> {
    let query = slots.decode_range_spec(semantics.ascending)?;
    store.digest(query, semantics.return_bloom, bloom_factory).await
}

/// REMOVE (§4.6). Removes an explicit key collection, or a whole
/// `(locationKey, domainKey)` bucket when both are present instead.
pub enum RemoveTarget {
    Keys(Vec<crate::key::Number640>),
    Bucket { min: crate::key::Number640, max: crate::key::Number640 },
}

pub enum RemoveResponse {
    Keys(Vec<crate::key::Number640>),
    Echoed(DataMap),
}

pub async fn handle_remove<S: EntryStore>(
    store: &S,
    target: RemoveTarget,
    public_key: Option<kadrpc_crypto::ed25519::VerifyingKey>,
    semantics: RemoveSemantics,
) -> Result<RemoveResponse> {
    let removed: DataMap = match target {
        RemoveTarget::Keys(keys) => {
            let mut removed = DataMap::new();
            for key in keys {
                if let Some(data) = store.remove_one(key, public_key).await? {
                    removed.insert(key, data);
                }
            }
            removed
        }
        RemoveTarget::Bucket { min, max } => store.remove_range(min, max, public_key).await?,
    };

    if semantics.echo_results {
        Ok(RemoveResponse::Echoed(removed))
    } else {
        Ok(RemoveResponse::Keys(removed.keys().cloned().collect()))
    }
}

/// Decodes REMOVE's target from the message slots: an explicit key
/// collection, or a `(locationKey, domainKey)` pair implying a full-bucket
/// removal (§4.6). Errors when neither is present.
pub fn decode_remove_target(slots: &MessageSlots) -> Result<RemoveTarget> {
    if let Some(keys) = &slots.key_collection {
        return Ok(RemoveTarget::Keys(keys.clone()));
    }
    match (slots.location_key, slots.domain_key) {
        (Some(loc), Some(dom)) => {
            let bucket = crate::key::Number320::new(loc, dom);
            Ok(RemoveTarget::Bucket {
                min: crate::key::Number640::bucket_min(bucket),
                max: crate::key::Number640::bucket_max(bucket),
            })
        }
        _ => Err(DhtError::Decoding("neither a key collection nor location+domain present".into())),
    }
}
