//! # kadrpc-core
//!
//! The storage RPC core of a structured peer-to-peer overlay: the
//! request/response subsystem letting one peer read, write, mutate, and
//! summarize versioned key-value entries on another peer, subject to
//! per-entry access control, range/bloom-filter queries, and DHT-level
//! fan-out aggregation.
//!
//! Transport framing, routing, bootstrap, on-disk persistence, and the
//! bloom-filter implementation itself are external collaborators, consumed
//! here only through trait interfaces ([`store::EntryStore`],
//! [`store::BloomFilterFactory`], [`builders::Transport`]).
//!
//! ## Modules
//!
//! - [`key`] — the composite key space (`Number160`/`320`/`480`/`640`).
//! - [`data`] — stored values and the ordered collections handlers exchange.
//! - [`store`] — the persistence contract this core consumes.
//! - [`codec`] — request-type variant decoding and message slots.
//! - [`handlers`] — the five server-side operations.
//! - [`builders`] — client-side request construction and dispatch.
//! - [`aggregate`] — DHT-level "put future" fan-out aggregation.

pub mod aggregate;
pub mod builders;
pub mod codec;
pub mod data;
pub mod handlers;
pub mod key;
pub mod store;

/// Wire-visible opcodes (§6). Normative — never renumber.
pub const OPCODE_PUT: u8 = 1;
pub const OPCODE_GET: u8 = 2;
pub const OPCODE_ADD: u8 = 3;
pub const OPCODE_REMOVE: u8 = 4;
pub const OPCODE_DIGEST: u8 = 11;

/// Bound on ADD list-mode's random-content-key retry loop (§4.3, §9).
///
/// The source loop is unbounded; this core caps it and surfaces the last
/// store status if exhausted rather than spinning forever against a
/// pathological store.
pub const ADD_LIST_MODE_MAX_RETRIES: u32 = 32;

#[derive(Debug, thiserror::Error)]
pub enum DhtError {
    /// Malformed request: illegal slot combination, required key missing,
    /// wrong opcode. Responds `EXCEPTION`; the store is never touched (§7).
    #[error("decoding error: {0}")]
    Decoding(String),

    /// The store reported an internal failure outside the per-entry status
    /// taxonomy (e.g. an I/O error surfaced through the store contract).
    #[error("store internal failure: {0}")]
    StoreInternal(String),

    #[error("cryptographic error: {0}")]
    Crypto(#[from] kadrpc_crypto::CryptoError),
}

pub type Result<T> = std::result::Result<T, DhtError>;

/// Message-level response type (§6). Per-entry failures never escalate to
/// `EXCEPTION` — they are carried in the body and the response stays
/// `OK`/`PARTIALLY_OK` (§7).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ResponseType {
    Ok,
    PartiallyOk,
    Exception,
    Denied,
}
