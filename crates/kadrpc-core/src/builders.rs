//! Client-side request construction and dispatch (§4.7).
//!
//! A builder carries the caller's intent; lowering it to a [`Request`]
//! computes the request-type variant from the flags (§4.1), optionally
//! signs the message, and selects the message slot matching the query
//! shape it expresses. The transport itself — framing, retries, UDP vs
//! TCP — is an external collaborator, consumed here only through the
//! [`Transport`] trait, in the same return-position-`impl Future` style the
//! rest of this core uses for store/replication traits.

use crate::codec::{Command, MessageSlots, RequestType};
use crate::data::DataMap;
use crate::handlers::RemoveResponse;
use crate::key::{Number160, Number640};
use crate::store::DigestInfo;
use crate::{DhtError, ResponseType, Result};
use std::future::Future;

/// A fully-lowered request, ready for the transport.
pub struct Request {
    pub command: Command,
    pub request_type: RequestType,
    pub slots: MessageSlots,
    pub sign_message: bool,
    pub force_udp: bool,
}

/// The response body shape, one variant per command (§6).
pub enum ResponseBody {
    PutAdd(ResponseType, crate::data::KeyMapByte),
    Get(DataMap),
    Digest(DigestInfo),
    Remove(RemoveResponse),
}

/// The per-peer transport this core dispatches requests through. Framing,
/// retries, and TCP/UDP selection live outside this crate.
pub trait Transport: Send + Sync {
    fn send(&self, peer: Number160, request: Request) -> impl Future<Output = Result<ResponseBody>> + Send;
}

fn put_request_type(put_if_absent: bool, protect_domain: bool) -> RequestType {
    match (put_if_absent, protect_domain) {
        (false, false) => RequestType::R1,
        (false, true) => RequestType::R2,
        (true, false) => RequestType::R3,
        (true, true) => RequestType::R4,
    }
}

fn query_request_type(ascending: bool, return_bloom: bool) -> RequestType {
    match (ascending, return_bloom) {
        (true, false) => RequestType::R1,
        (true, true) => RequestType::R2,
        (false, false) => RequestType::R3,
        (false, true) => RequestType::R4,
    }
}

/// Builds a PUT request (§4.2, §4.7).
#[derive(Default)]
pub struct PutBuilder {
    pub data: DataMap,
    pub public_key: Option<kadrpc_crypto::ed25519::VerifyingKey>,
    pub sign_message: bool,
    pub force_udp: bool,
    pub protect_domain: bool,
    pub put_if_absent: bool,
}

impl PutBuilder {
    pub fn build(self) -> Result<Request> {
        if self.data.is_empty() {
            return Err(DhtError::Decoding("PUT requires a non-empty data set".into()));
        }
        let protect_domain = self.protect_domain && self.public_key.is_some();
        let request_type = put_request_type(self.put_if_absent, protect_domain);
        let slots = MessageSlots {
            data_map: Some(self.data),
            public_key: self.public_key,
            ..Default::default()
        };
        Ok(Request { command: Command::Put, request_type, slots, sign_message: self.sign_message, force_udp: self.force_udp })
    }
}

/// Builds an ADD request (§4.3, §4.7).
#[derive(Default)]
pub struct AddBuilder {
    pub data: DataMap,
    pub public_key: Option<kadrpc_crypto::ed25519::VerifyingKey>,
    pub sign_message: bool,
    pub force_udp: bool,
    pub protect_domain: bool,
    pub is_list: bool,
}

impl AddBuilder {
    pub fn build(self) -> Result<Request> {
        if self.data.is_empty() {
            return Err(DhtError::Decoding("ADD requires a non-empty data set".into()));
        }
        let protect_domain = self.protect_domain && self.public_key.is_some();
        let request_type = put_request_type(self.is_list, protect_domain);
        let slots = MessageSlots {
            data_map: Some(self.data),
            public_key: self.public_key,
            ..Default::default()
        };
        Ok(Request { command: Command::Add, request_type, slots, sign_message: self.sign_message, force_udp: self.force_udp })
    }
}

/// The caller's query target, mirroring GET/DIGEST's mutually-exclusive
/// shapes — a builder must express exactly one (§4.7).
pub enum QueryTarget {
    Keys(Vec<Number640>),
    Range { from: Number640, to: Number640 },
    Bucket { location_key: Number160, domain_key: Number160 },
}

/// Builds a GET or DIGEST request; the two share the same request-type
/// encoding and slot selection (§4.1, §4.4, §4.5).
#[derive(Default)]
pub struct QueryBuilder {
    pub target: Option<QueryTarget>,
    pub limit: Option<i64>,
    pub ascending: bool,
    pub return_bloom_filter: bool,
    pub sign_message: bool,
    pub force_udp: bool,
}

impl QueryBuilder {
    fn build_for(self, command: Command) -> Result<Request> {
        let target = self.target.ok_or_else(|| {
            DhtError::Decoding("GET/DIGEST require either a key collection, a range, or a location+domain pair".into())
        })?;
        let request_type = query_request_type(self.ascending, self.return_bloom_filter);
        let mut slots = MessageSlots { integer: self.limit, ..Default::default() };
        match target {
            QueryTarget::Keys(keys) => slots.key_collection = Some(keys),
            QueryTarget::Range { from, to } => {
                slots.key_collection = Some(vec![from, to]);
                if slots.integer.is_none() {
                    slots.integer = Some(-1);
                }
            }
            QueryTarget::Bucket { location_key, domain_key } => {
                slots.location_key = Some(location_key);
                slots.domain_key = Some(domain_key);
            }
        }
        Ok(Request { command, request_type, slots, sign_message: self.sign_message, force_udp: self.force_udp })
    }

    pub fn build_get(self) -> Result<Request> {
        self.build_for(Command::Get)
    }

    pub fn build_digest(self) -> Result<Request> {
        self.build_for(Command::Digest)
    }
}

/// Builds a REMOVE request (§4.6, §4.7).
#[derive(Default)]
pub struct RemoveBuilder {
    pub target: Option<QueryTarget>,
    pub public_key: Option<kadrpc_crypto::ed25519::VerifyingKey>,
    pub echo_results: bool,
    pub sign_message: bool,
    pub force_udp: bool,
}

impl RemoveBuilder {
    pub fn build(self) -> Result<Request> {
        let target = self
            .target
            .ok_or_else(|| DhtError::Decoding("REMOVE requires either a key collection or a location+domain pair".into()))?;
        let request_type = if self.echo_results { RequestType::R2 } else { RequestType::R1 };
        let mut slots = MessageSlots { public_key: self.public_key, ..Default::default() };
        match target {
            QueryTarget::Keys(keys) => slots.key_collection = Some(keys),
            QueryTarget::Range { .. } => {
                return Err(DhtError::Decoding("REMOVE does not support a range target; use an explicit key collection or bucket".into()));
            }
            QueryTarget::Bucket { location_key, domain_key } => {
                slots.location_key = Some(location_key);
                slots.domain_key = Some(domain_key);
            }
        }
        Ok(Request { command: Command::Remove, request_type, slots, sign_message: self.sign_message, force_udp: self.force_udp })
    }
}
