//! # kadrpc-bloom
//!
//! A concrete bloom-filter implementation for the storage RPC core's GET
//! query filters and DIGEST bloom responses (§4.4, §4.5). The core itself
//! only depends on the [`kadrpc_core::store::BloomFilter`] /
//! [`kadrpc_core::store::BloomFilterFactory`] trait interfaces; this crate
//! is one concrete collaborator satisfying them, a manual bit array with
//! domain-separated BLAKE3 hash-position derivation.

use kadrpc_core::key::Number160;
use kadrpc_core::store::{BloomFilter, BloomFilterFactory};
use std::f64::consts::LN_2;

const BLOOM_HASH_PREFIX: &str = "kadrpc v1 bloom-hash-";

/// Optimal parameters for a target false-positive rate: `m = -n*ln(fpr)/ln(2)^2`,
/// `k = (m/n)*ln(2)`, clamped to a sane hash-function count.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Params {
    pub size_bits: usize,
    pub hash_count: usize,
}

pub fn calculate_optimal_parameters(num_elements: usize, target_fpr: f64) -> Params {
    if num_elements == 0 {
        return Params { size_bits: 8, hash_count: 1 };
    }
    let n = num_elements as f64;
    let ln2_squared = LN_2 * LN_2;
    let m = (-n * target_fpr.ln() / ln2_squared).ceil() as usize;
    let m = m.max(8);
    let k = ((m as f64 / n) * LN_2).round() as usize;
    let k = k.clamp(1, 32);
    Params { size_bits: m, hash_count: k }
}

/// A manual `Vec<u8>` bit-array bloom filter keyed by `Number160` values.
pub struct Filter {
    bit_array: Vec<u8>,
    num_bits: usize,
    num_hashes: usize,
}

impl Filter {
    pub fn new(size_bits: usize, hash_count: usize) -> Self {
        let num_bits = size_bits.max(8);
        let num_bytes = num_bits.div_ceil(8);
        Filter { bit_array: vec![0u8; num_bytes], num_bits, num_hashes: hash_count.clamp(1, 32) }
    }

    /// Sizes a filter via [`calculate_optimal_parameters`] for `expected_items`
    /// at `target_fpr`.
    pub fn with_optimal_params(expected_items: usize, target_fpr: f64) -> Self {
        let params = calculate_optimal_parameters(expected_items, target_fpr);
        Filter::new(params.size_bits, params.hash_count)
    }

    pub fn insert(&mut self, key: &Number160) {
        for index in self.hash_positions(key) {
            let byte = index / 8;
            let bit = index % 8;
            self.bit_array[byte] |= 1 << bit;
        }
    }

    fn hash_positions(&self, key: &Number160) -> Vec<usize> {
        (0..self.num_hashes)
            .map(|i| {
                let context = format!("{BLOOM_HASH_PREFIX}{i}");
                let derived = kadrpc_crypto::blake3::derive_key(&context, key.as_bytes());
                let mut buf = [0u8; 8];
                buf.copy_from_slice(&derived[..8]);
                (u64::from_le_bytes(buf) as usize) % self.num_bits
            })
            .collect()
    }

    pub fn false_positive_rate(&self, inserted: usize) -> f64 {
        if inserted == 0 {
            return 0.0;
        }
        let exponent = -(self.num_hashes as f64) * (inserted as f64) / (self.num_bits as f64);
        (1.0 - exponent.exp()).powi(self.num_hashes as i32)
    }
}

impl BloomFilter for Filter {
    fn contains(&self, key: &Number160) -> bool {
        self.hash_positions(key).into_iter().all(|index| {
            let byte = index / 8;
            let bit = index % 8;
            self.bit_array[byte] & (1 << bit) != 0
        })
    }
}

/// Builds filters sized by [`calculate_optimal_parameters`] at a fixed
/// target false-positive rate.
pub struct Factory {
    target_fpr: f64,
}

impl Factory {
    pub fn new(target_fpr: f64) -> Self {
        Factory { target_fpr }
    }
}

impl Default for Factory {
    fn default() -> Self {
        Factory::new(0.01)
    }
}

impl BloomFilterFactory for Factory {
    fn build<'a>(&self, keys: Box<dyn Iterator<Item = &'a Number160> + 'a>) -> Box<dyn BloomFilter> {
        let collected: Vec<&Number160> = keys.collect();
        let mut filter = Filter::with_optimal_params(collected.len(), self.target_fpr);
        for key in collected {
            filter.insert(key);
        }
        Box::new(filter)
    }
}
