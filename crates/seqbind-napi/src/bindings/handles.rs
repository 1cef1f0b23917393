//! Opaque handle functions: kind lookup, explicit destruction, and subset
//! persistence.

use std::path::Path;

use napi_derive::napi;

use seqbind_core::handle::OpaqueHandle;
use seqbind_engines::SubsetPartition;

use crate::conversions::error_codes::to_napi_error;
use crate::conversions::types::{handle_id_from_js, JsHandleRef, JsPartitionCounts};
use crate::runtime;

/// Destroy a handle. Any later use of the id fails with `INVALID_HANDLE`.
#[napi]
pub fn destroy_handle(id: i64) -> napi::Result<()> {
    let id = handle_id_from_js(id)?;
    runtime::get()?.destroy_handle(id)
}

/// `"pre_partition_info"` or `"subset_partition"`.
#[napi]
pub fn handle_kind(id: i64) -> napi::Result<String> {
    let id = handle_id_from_js(id)?;
    runtime::get()?
        .with_handles(|registry| registry.kind(id))
        .map(|kind| kind.name().to_string())
        .map_err(to_napi_error)
}

#[napi]
pub fn live_handles() -> napi::Result<u32> {
    Ok(runtime::get()?.with_handles(|registry| registry.len()) as u32)
}

#[napi]
pub fn save_subset_partition(id: i64, path: String) -> napi::Result<()> {
    let id = handle_id_from_js(id)?;
    runtime::get()?.with_handles(|registry| {
        registry
            .get(id)
            .and_then(|handle| handle.get::<SubsetPartition>())
            .map_err(to_napi_error)?
            .save(Path::new(&path))
            .map_err(to_napi_error)
    })
}

#[napi]
pub fn load_subset_partition(path: String) -> napi::Result<JsHandleRef> {
    let subset = SubsetPartition::load(Path::new(&path)).map_err(to_napi_error)?;
    Ok(runtime::get()?.register(OpaqueHandle::new(subset)))
}

#[napi]
pub fn subset_partition_counts(id: i64) -> napi::Result<JsPartitionCounts> {
    let id = handle_id_from_js(id)?;
    runtime::get()?.with_handles(|registry| {
        registry
            .get(id)
            .and_then(|handle| handle.get::<SubsetPartition>())
            .map(|subset| JsPartitionCounts::from(subset.count_partitions()))
            .map_err(to_napi_error)
    })
}
