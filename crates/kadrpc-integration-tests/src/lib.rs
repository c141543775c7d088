//! End-to-end scenarios exercising the storage RPC core across crate
//! boundaries (handlers + the in-memory store + concrete bloom filters).
//! Scenarios live under `tests/`.
