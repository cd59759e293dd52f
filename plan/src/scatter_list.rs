//! Tiling planner for the scatter-list operator.
//!
//! Scatter-list writes each row batch of a source tensor into one of N
//! destination tensors at an index-selected offset along one axis. The
//! planner runs once per operator compilation: it resolves shapes, picks the
//! data-movement family, splits the batch across cores, sizes the on-chip
//! buffers, selects the kernel variant, and seals the tiling record. It is a
//! pure function of its inputs; nothing is cached between invocations.

use bon::bon;
use snafu::ResultExt;

use tessara_platform::ResourceProfile;

use crate::buffer;
use crate::error::{self, Result};
use crate::key::{self, TilingKey};
use crate::partition;
use crate::record::TilingRecord;
use crate::shape::{self, TensorDescriptor};

/// Operand descriptors and scalar attributes of one operator instance.
#[derive(Debug, Clone)]
pub struct ScatterListInputs<'a> {
    /// Destination tensor list; all entries share one shape.
    pub dst: &'a [TensorDescriptor],
    /// Source tensor; its leading extent equals the list length.
    pub src: &'a TensorDescriptor,
    /// Offsets into the destination scatter axis, rank 1 or 2.
    pub index: &'a TensorDescriptor,
    /// Optional per-entry write mask.
    pub mask: Option<&'a TensorDescriptor>,
    /// Scatter axis in the source tensor; negative counts from the back.
    pub axis: i64,
    /// Reduction applied at the destination.
    pub reduce: &'a str,
}

#[bon]
impl<'a> ScatterListInputs<'a> {
    #[builder]
    pub fn new(
        dst: &'a [TensorDescriptor],
        src: &'a TensorDescriptor,
        index: &'a TensorDescriptor,
        mask: Option<&'a TensorDescriptor>,
        #[builder(default = -1)] axis: i64,
        #[builder(default = "update")] reduce: &'a str,
    ) -> Self {
        Self { dst, src, index, mask, axis, reduce }
    }
}

/// The sealed plan plus the side channels the graph compiler consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TilingOutput {
    pub record: TilingRecord,
    /// Kernel variant, duplicated out of the record for the dispatcher.
    pub key: TilingKey,
    /// Cores the graph compiler launches ("block dimension").
    pub block_dim: i64,
    /// Cross-core synchronization scratch to reserve.
    pub workspace_bytes: i64,
}

/// Compute the tiling plan for one scatter-list instance.
pub fn plan_scatter_list(inputs: &ScatterListInputs<'_>, profile: &ResourceProfile) -> Result<TilingOutput> {
    profile.validate().context(error::PlatformSnafu)?;

    let resolved = shape::resolve(inputs, profile)?;
    let staged = buffer::wants_last_axis_staging(&resolved, &profile.caps);
    let merged = if staged { resolved.remap_last_axis() } else { resolved.merged.clone() };

    let core_count = if !staged && partition::sub_block_single_core(&resolved, profile) {
        1
    } else {
        profile.core_count
    };
    let split = partition::split_batches(merged.batch(), core_count);

    let sized = buffer::size_buffers(&resolved, &merged, split, core_count, profile, staged)?;
    let key = key::select(&sized, resolved.index.rank);
    let record = TilingRecord::assemble(&resolved, &sized, key, profile);
    record.trace();

    Ok(TilingOutput {
        block_dim: record.active_cores,
        key,
        workspace_bytes: record.workspace_bytes,
        record,
    })
}
