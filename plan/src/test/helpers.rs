//! Test utilities for the planner pipeline.
//!
//! Builders for operand sets and profiles so scenario tests stay readable.

use tessara_dtype::DType;
use tessara_platform::{Capabilities, ResourceProfile};

use crate::shape::TensorDescriptor;

/// Profile of the current generation: padded DMA, 32-byte blocks.
pub fn profile(core_count: i64, fast_mem_bytes: i64) -> ResourceProfile {
    ResourceProfile::builder().core_count(core_count).fast_mem_bytes(fast_mem_bytes).build()
}

pub fn profile_with_caps(core_count: i64, fast_mem_bytes: i64, caps: Capabilities) -> ResourceProfile {
    ResourceProfile::builder().core_count(core_count).fast_mem_bytes(fast_mem_bytes).caps(caps).build()
}

pub fn tensor(dims: &[i64], dtype: DType) -> TensorDescriptor {
    TensorDescriptor::new(dims.iter().copied(), dtype)
}

/// Destination list for `src` scattered along `axis` (normalized, positive)
/// into destinations whose scatter extent is `dst_rows`.
pub fn dst_list(src: &TensorDescriptor, axis: usize, dst_rows: i64) -> Vec<TensorDescriptor> {
    let mut dims: Vec<i64> = src.dims[1..].to_vec();
    dims[axis - 1] = dst_rows;
    (0..src.dim(0)).map(|_| TensorDescriptor::new(dims.iter().copied(), src.dtype)).collect()
}

/// Flat rank-1 index with one entry per destination tensor.
pub fn flat_index(src: &TensorDescriptor) -> TensorDescriptor {
    TensorDescriptor::of::<i32>([src.dim(0)])
}

/// Paired rank-2 (offset, count) index.
pub fn paired_index(src: &TensorDescriptor) -> TensorDescriptor {
    TensorDescriptor::of::<i32>([src.dim(0), 2])
}
