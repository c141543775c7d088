//! The literal end-to-end scenarios of §8, run against the in-memory
//! reference store and concrete bloom filters rather than mocks.

use kadrpc_bloom::Factory as BloomFactory;
use kadrpc_core::codec::{AddSemantics, PutSemantics, RemoveSemantics};
use kadrpc_core::data::{Data, DataMap, Status};
use kadrpc_core::handlers::{handle_add, handle_digest, handle_put, handle_remove, RemoveResponse, RemoveTarget};
use kadrpc_core::key::{Number160, Number320, Number640};
use kadrpc_core::codec::MessageSlots;
use kadrpc_core::store::{DigestInfo, RangeSpec};
use kadrpc_core::ResponseType;
use kadrpc_memstore::MemoryStore;

struct NoReplication;
impl kadrpc_core::store::ReplicationStorage for NoReplication {
    async fn update_and_notify_responsibilities(&self, _location_key: Number160) {}
}

fn key(loc: u8, dom: u8, content: u8, version: u8) -> Number640 {
    Number640::new(
        Number160::from_bytes([loc; 20]),
        Number160::from_bytes([dom; 20]),
        Number160::from_bytes([content; 20]),
        Number160::from_bytes([version; 20]),
    )
}

#[tokio::test]
async fn scenario_1_plain_put_get() {
    let store = MemoryStore::new();
    let k = key(0x01, 0x02, 0x03, 0x00);
    let mut dm = DataMap::new();
    dm.insert(k, Data::new(b"A".to_vec()));

    let (response_type, statuses) = handle_put(
        &store,
        None::<&NoReplication>,
        dm,
        None,
        PutSemantics { put_if_absent: false, protect_domain: false },
    )
    .await
    .expect("test");
    assert_eq!(response_type, ResponseType::Ok);
    assert_eq!(statuses.iter().next().expect("test").1, Status::Ok);

    let bucket = Number320::new(Number160::from_bytes([0x01; 20]), Number160::from_bytes([0x02; 20]));
    let result = store
        .get_range(RangeSpec::Range { from: Number640::bucket_min(bucket), to: Number640::bucket_max(bucket), limit: None, ascending: true })
        .await
        .expect("test");
    assert_eq!(result.len(), 1);
    assert_eq!(result.get(&k).expect("test").payload(), b"A");
}

#[tokio::test]
async fn scenario_2_partial_put_wrong_signing_key() {
    let store = MemoryStore::new();
    let owner = kadrpc_crypto::ed25519::KeyPair::generate().verifying_key;
    let wrong = kadrpc_crypto::ed25519::KeyPair::generate().verifying_key;

    // Establish the domain's protecting key with one successful protected put.
    let k0 = key(0x05, 0x06, 0x00, 0x00);
    let mut setup = DataMap::new();
    setup.insert(k0, Data::new(b"seed".to_vec()));
    handle_put(&store, None::<&NoReplication>, setup, Some(owner), PutSemantics { put_if_absent: false, protect_domain: true })
        .await
        .expect("test");

    let mut dm = DataMap::new();
    dm.insert(key(0x05, 0x06, 0x01, 0x00), Data::new(b"entry-one".to_vec()));
    dm.insert(key(0x05, 0x06, 0x02, 0x00), Data::new(b"entry-two".to_vec()));

    let (response_type, statuses) =
        handle_put(&store, None::<&NoReplication>, dm, Some(wrong), PutSemantics { put_if_absent: false, protect_domain: false }).await.expect("test");

    assert_eq!(response_type, ResponseType::PartiallyOk);
    assert_eq!(statuses.len(), 2);
    for (_, status) in statuses.iter() {
        assert_eq!(*status, Status::FailedSecurity);
    }
}

#[tokio::test]
async fn scenario_3_put_if_absent_collision() {
    let store = MemoryStore::new();
    let k = key(0x07, 0x08, 0x09, 0x00);
    let semantics = PutSemantics { put_if_absent: true, protect_domain: false };

    let mut first = DataMap::new();
    first.insert(k, Data::new(b"B".to_vec()));
    let (_, first_status) = handle_put(&store, None::<&NoReplication>, first, None, semantics).await.expect("test");
    assert_eq!(first_status.iter().next().expect("test").1, Status::Ok);

    let mut second = DataMap::new();
    second.insert(k, Data::new(b"C".to_vec()));
    let (_, second_status) = handle_put(&store, None::<&NoReplication>, second, None, semantics).await.expect("test");
    assert_eq!(second_status.iter().next().expect("test").1, Status::FailedNotAbsent);

    let unchanged = store.get_one(k).await.expect("test").expect("test");
    assert_eq!(unchanged.payload(), b"B");
}

#[tokio::test]
async fn scenario_4_add_list_mode_duplicates() {
    let store = MemoryStore::new();
    let loc = Number160::from_bytes([0x0a; 20]);
    let dom = Number160::from_bytes([0x0b; 20]);
    let template = Number640::new(loc, dom, Number160::ZERO, Number160::from_bytes([0x01; 20]));

    let mut dm = DataMap::new();
    for _ in 0..3 {
        dm.insert(template, Data::new(b"X".to_vec()));
    }
    let (response_type, statuses) =
        handle_add(&store, None::<&NoReplication>, dm, None, AddSemantics { list_mode: true, protect_domain: false }).await.expect("test");
    assert_eq!(response_type, ResponseType::Ok);
    assert!(statuses.all_ok());

    let bucket = Number320::new(loc, dom);
    let result = store.get_range(RangeSpec::Bucket { bucket, limit: None, ascending: true }).await.expect("test");
    assert_eq!(result.len(), 3);
    assert!(result.iter().all(|(_, d)| d.payload() == b"X"));
}

#[tokio::test]
async fn hashed_mode_add_collapses_duplicate_content_onto_one_entry() {
    let store = MemoryStore::new();
    let loc = Number160::from_bytes([0x0a; 20]);
    let dom = Number160::from_bytes([0x0b; 20]);
    let data = Data::new(b"same payload".to_vec());
    let content_key = data.hash();
    let k = Number640::new(loc, dom, content_key, Number160::ZERO);

    let mut first = DataMap::new();
    first.insert(k, data.clone());
    let (_, first_status) =
        handle_add(&store, None::<&NoReplication>, first, None, AddSemantics { list_mode: false, protect_domain: false }).await.expect("test");
    assert_eq!(first_status.iter().next().expect("test").1, Status::Ok);

    let mut second = DataMap::new();
    second.insert(k, data);
    let (response_type, second_status) =
        handle_add(&store, None::<&NoReplication>, second, None, AddSemantics { list_mode: false, protect_domain: false }).await.expect("test");
    assert_eq!(response_type, ResponseType::Ok);
    assert_eq!(second_status.iter().next().expect("test").1, Status::Ok);

    let bucket = Number320::new(loc, dom);
    let result = store.get_range(RangeSpec::Bucket { bucket, limit: None, ascending: true }).await.expect("test");
    assert_eq!(result.len(), 1);
}

#[tokio::test]
async fn scenario_5_descending_range_with_limit() {
    let store = MemoryStore::new();
    let loc = Number160::from_bytes([0x0c; 20]);
    let dom = Number160::from_bytes([0x0d; 20]);
    for content in [0x10u8, 0x20, 0x30, 0x40] {
        let k = Number640::new(loc, dom, Number160::from_bytes([content; 20]), Number160::ZERO);
        let mut dm = DataMap::new();
        dm.insert(k, Data::new(vec![content]));
        handle_put(&store, None::<&NoReplication>, dm, None, PutSemantics { put_if_absent: false, protect_domain: false }).await.expect("test");
    }

    let from = Number640::new(loc, dom, Number160::from_bytes([0x10u8; 20]), Number160::ZERO);
    let to = Number640::new(loc, dom, Number160::from_bytes([0x40u8; 20]), Number160::from_bytes([0xffu8; 20]));
    let result = store.get_range(RangeSpec::Range { from, to, limit: Some(2), ascending: false }).await.expect("test");

    let content_keys: Vec<u8> = result.iter().map(|(k, _)| k.content_key.as_bytes()[0]).collect();
    assert_eq!(content_keys, vec![0x40, 0x30]);
}

#[tokio::test]
async fn scenario_6_digest_bloom_response() {
    let store = MemoryStore::new();
    let loc = Number160::from_bytes([0x0e; 20]);
    let dom = Number160::from_bytes([0x0f; 20]);
    let mut stored_content_keys = Vec::new();
    for content in 0..3u8 {
        let content_key = Number160::from_bytes([content; 20]);
        let k = Number640::new(loc, dom, content_key, Number160::ZERO);
        let mut dm = DataMap::new();
        dm.insert(k, Data::new(vec![content]));
        handle_put(&store, None::<&NoReplication>, dm, None, PutSemantics { put_if_absent: false, protect_domain: false }).await.expect("test");
        stored_content_keys.push(content_key);
    }

    let bucket_slots = MessageSlots { location_key: Some(loc), domain_key: Some(dom), ..Default::default() };
    let semantics = kadrpc_core::codec::QuerySemantics { ascending: true, return_bloom: true };
    let factory = BloomFactory::default();
    let digest = handle_digest(&store, bucket_slots, semantics, &factory).await.expect("test");

    match digest {
        DigestInfo::Bloom { content_key_bloom, version_key_bloom, .. } => {
            for content_key in &stored_content_keys {
                assert!(content_key_bloom.contains(content_key));
            }
            let _ = version_key_bloom;
        }
        DigestInfo::Exact(_) => panic!("expected a bloom response"),
    }
}

#[tokio::test]
async fn digest_over_explicit_keys_is_not_bucket_scoped_and_carries_all_four_filters() {
    let store = MemoryStore::new();
    let mut stored_keys = Vec::new();
    for (loc, dom, content) in [(0x20u8, 0x21u8, 0x22u8), (0x30u8, 0x31u8, 0x32u8)] {
        let k = key(loc, dom, content, 0x00);
        let mut dm = DataMap::new();
        dm.insert(k, Data::new(vec![content]));
        handle_put(&store, None::<&NoReplication>, dm, None, PutSemantics { put_if_absent: false, protect_domain: false })
            .await
            .expect("test");
        stored_keys.push(k);
    }

    // An explicit key collection spans multiple buckets, so this is the
    // non-bucket-scoped shape of §4.4/§4.5: every entry matched here comes
    // from a different (locationKey, domainKey) pair.
    let slots = MessageSlots { key_collection: Some(stored_keys.clone()), ..Default::default() };
    let semantics = kadrpc_core::codec::QuerySemantics { ascending: true, return_bloom: true };
    let factory = BloomFactory::default();
    let digest = handle_digest(&store, slots, semantics, &factory).await.expect("test");

    match digest {
        DigestInfo::Bloom { content_key_bloom, location_key_bloom, domain_key_bloom, .. } => {
            let location_key_bloom = location_key_bloom.expect("non-bucket-scoped digest must carry a location-key bloom filter");
            let domain_key_bloom = domain_key_bloom.expect("non-bucket-scoped digest must carry a domain-key bloom filter");
            for k in &stored_keys {
                assert!(content_key_bloom.contains(&k.content_key));
                assert!(location_key_bloom.contains(&k.location_key));
                assert!(domain_key_bloom.contains(&k.domain_key));
            }
        }
        DigestInfo::Exact(_) => panic!("expected a bloom response"),
    }
}

#[tokio::test]
async fn remove_with_echo_returns_a_fresh_copy_matching_removed_keys() {
    let store = MemoryStore::new();
    let k = key(0x11, 0x12, 0x13, 0x00);
    let mut dm = DataMap::new();
    dm.insert(k, Data::new(b"D".to_vec()));
    handle_put(&store, None::<&NoReplication>, dm, None, PutSemantics { put_if_absent: false, protect_domain: false }).await.expect("test");

    let response = handle_remove(&store, RemoveTarget::Keys(vec![k]), None, RemoveSemantics { echo_results: true }).await.expect("test");
    match response {
        RemoveResponse::Echoed(echoed) => {
            assert_eq!(echoed.len(), 1);
            assert_eq!(echoed.get(&k).expect("test").payload(), b"D");
        }
        RemoveResponse::Keys(_) => panic!("expected echoed data"),
    }
    assert!(store.get_one(k).await.expect("test").is_none());
}
