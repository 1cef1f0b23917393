//! Standalone k-mer hashing.

use napi::bindgen_prelude::BigInt;
use napi_derive::napi;

use seqbind_engines::kmer;

use crate::conversions::error_codes::to_napi_error;
use crate::conversions::types::{hash_from_js, hash_to_js};

/// Canonical hash of `kmer`.
#[napi]
pub fn forward_hash(kmer: String, ksize: u32) -> napi::Result<BigInt> {
    kmer::forward_hash(&kmer, ksize)
        .map(hash_to_js)
        .map_err(to_napi_error)
}

/// Hash of `kmer` as written, without taking the reverse complement.
#[napi]
pub fn forward_hash_no_rc(kmer: String, ksize: u32) -> napi::Result<BigInt> {
    kmer::forward_hash_no_rc(&kmer, ksize)
        .map(hash_to_js)
        .map_err(to_napi_error)
}

#[napi]
pub fn reverse_hash(hash: BigInt, ksize: u32) -> napi::Result<String> {
    let hash = hash_from_js(&hash)?;
    kmer::reverse_hash(hash, ksize).map_err(to_napi_error)
}
