//! Request-type variant encoding and the message slots this core consumes.
//!
//! The wire format itself (framing, byte layout) is external; this module
//! fixes only the semantics of the opcode space and the packed `R1..R4`
//! variants (§4.1, §6), and decodes them into semantic fields immediately on
//! ingress per the design notes (§9 "Multiple-flag to variant encoding")
//! rather than threading raw variants through the handlers.

use crate::data::DataMap;
use crate::key::{Number160, Number640};
use crate::store::BloomFilter;
use crate::{DhtError, Result};

/// The five server-side operations, as a tagged variant rather than a raw
/// opcode dispatched through a conditional (§9 "Sum-type replacement for
/// opcode dispatch").
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Put,
    Get,
    Add,
    Remove,
    Digest,
}

impl Command {
    pub fn opcode(self) -> u8 {
        match self {
            Command::Put => crate::OPCODE_PUT,
            Command::Get => crate::OPCODE_GET,
            Command::Add => crate::OPCODE_ADD,
            Command::Remove => crate::OPCODE_REMOVE,
            Command::Digest => crate::OPCODE_DIGEST,
        }
    }

    pub fn from_opcode(opcode: u8) -> Result<Self> {
        match opcode {
            crate::OPCODE_PUT => Ok(Command::Put),
            crate::OPCODE_GET => Ok(Command::Get),
            crate::OPCODE_ADD => Ok(Command::Add),
            crate::OPCODE_REMOVE => Ok(Command::Remove),
            crate::OPCODE_DIGEST => Ok(Command::Digest),
            other => Err(DhtError::Decoding(format!("unknown opcode {other}"))),
        }
    }
}

/// The four packed request-type variants (§4.1). Kept as a wire-level value;
/// handlers consume the decoded semantic structs below, never this directly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum RequestType {
    R1,
    R2,
    R3,
    R4,
}

/// Decoded PUT semantics (§4.1).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PutSemantics {
    pub put_if_absent: bool,
    pub protect_domain: bool,
}

impl PutSemantics {
    pub fn decode(request_type: RequestType, public_key_present: bool) -> Self {
        let put_if_absent = matches!(request_type, RequestType::R3 | RequestType::R4);
        let protect_domain = public_key_present && matches!(request_type, RequestType::R2 | RequestType::R4);
        PutSemantics { put_if_absent, protect_domain }
    }
}

/// Decoded ADD semantics (§4.1, §4.3).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AddSemantics {
    pub list_mode: bool,
    pub protect_domain: bool,
}

impl AddSemantics {
    pub fn decode(request_type: RequestType, public_key_present: bool) -> Self {
        let list_mode = matches!(request_type, RequestType::R3 | RequestType::R4);
        let protect_domain = public_key_present && matches!(request_type, RequestType::R2 | RequestType::R4);
        AddSemantics { list_mode, protect_domain }
    }
}

/// Decoded GET/DIGEST semantics (§4.1).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuerySemantics {
    pub ascending: bool,
    pub return_bloom: bool,
}

impl QuerySemantics {
    pub fn decode(request_type: RequestType) -> Self {
        let ascending = matches!(request_type, RequestType::R1 | RequestType::R2);
        let return_bloom = matches!(request_type, RequestType::R2 | RequestType::R4);
        QuerySemantics { ascending, return_bloom }
    }
}

/// Decoded REMOVE semantics (§4.1, §4.6). REMOVE only distinguishes R1/R2;
/// R3/R4 are unused by this command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RemoveSemantics {
    pub echo_results: bool,
}

impl RemoveSemantics {
    pub fn decode(request_type: RequestType) -> Self {
        RemoveSemantics { echo_results: matches!(request_type, RequestType::R2) }
    }
}

/// The payload-carrying message slots this core consumes (§6). The wire
/// encoding of each slot is external; this struct fixes which slots exist
/// and what they mean.
#[derive(Default)]
pub struct MessageSlots {
    pub location_key: Option<Number160>,
    pub domain_key: Option<Number160>,
    pub key_collection: Option<Vec<Number640>>,
    pub integer: Option<i64>,
    pub key_bloom_filter: Option<Box<dyn BloomFilter>>,
    pub content_bloom_filter: Option<Box<dyn BloomFilter>>,
    pub data_map: Option<DataMap>,
    pub public_key: Option<kadrpc_crypto::ed25519::VerifyingKey>,
    pub signature: Option<kadrpc_crypto::ed25519::Signature>,
}

impl MessageSlots {
    /// Selects one of GET/DIGEST's four mutually exclusive query shapes
    /// (§4.4). Shared by both handlers since DIGEST parallels GET's slot
    /// selection exactly (§4.5).
    pub fn decode_range_spec(self, ascending: bool) -> Result<crate::store::RangeSpec> {
        use crate::store::RangeSpec;

        if let Some(kc) = self.key_collection {
            if kc.len() == 2 && self.integer.is_some() {
                let limit = non_negative_limit(self.integer);
                return Ok(RangeSpec::Range { from: kc[0], to: kc[1], limit, ascending });
            }
            return Ok(RangeSpec::Keys(kc));
        }

        let (Some(location_key), Some(domain_key)) = (self.location_key, self.domain_key) else {
            return Err(DhtError::Decoding(
                "no key collection present and locationKey or domainKey missing".into(),
            ));
        };
        let bucket = crate::key::Number320::new(location_key, domain_key);
        let limit = non_negative_limit(self.integer);

        if self.key_bloom_filter.is_some() || self.content_bloom_filter.is_some() {
            return Ok(RangeSpec::Bloom {
                bucket,
                key_bloom: self.key_bloom_filter,
                content_bloom: self.content_bloom_filter,
                limit,
                ascending,
            });
        }

        Ok(RangeSpec::Bucket { bucket, limit, ascending })
    }
}

/// `limit < 0` means unlimited (§4.4).
fn non_negative_limit(integer: Option<i64>) -> Option<u32> {
    match integer {
        Some(v) if v >= 0 => Some(v as u32),
        _ => None,
    }
}
