//! Read aligner bindings.

use napi_derive::napi;

use seqbind_core::constants::DEFAULT_TRUSTED_CUTOFF;
use seqbind_engines::{CountingEngine, ReadAligner};

use super::counting::CountingTable;
use super::{try_lock, Shared};
use crate::conversions::error_codes::to_napi_error;
use crate::conversions::types::JsAlignment;

/// Aligns reads against a counting table. Holds the table's engine, so it
/// stays usable after the table is released.
#[napi(js_name = "ReadAligner")]
pub struct JsReadAligner {
    counting: Shared<CountingEngine>,
    trusted_cutoff: u32,
    bits_theta: f64,
}

#[napi]
impl JsReadAligner {
    #[napi(constructor)]
    pub fn new(
        counting: &CountingTable,
        trusted_cutoff: Option<u32>,
        bits_theta: Option<f64>,
    ) -> napi::Result<Self> {
        Ok(Self {
            counting: counting.shared()?,
            trusted_cutoff: trusted_cutoff.unwrap_or(DEFAULT_TRUSTED_CUTOFF),
            bits_theta: bits_theta.unwrap_or(1.0),
        })
    }

    #[napi]
    pub fn align(&self, seq: String) -> napi::Result<JsAlignment> {
        let counting = try_lock(&self.counting, "CountingTable")?;
        ReadAligner::new(&counting, self.trusted_cutoff, self.bits_theta)
            .align(&seq)
            .map(JsAlignment::from)
            .map_err(to_napi_error)
    }
}
