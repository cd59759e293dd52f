//! Batch partitioning across vector cores.
//!
//! Each core receives a contiguous run of batches; the last active core takes
//! the remainder. Cores beyond `active_cores` stay idle for this operator.

use tessara_platform::ResourceProfile;

use crate::align::ceil_div;
use crate::shape::{IndexRank, ResolvedShapes};

/// Which unit the cores split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitAxis {
    /// The merged batch dimension (default).
    Batch,
    /// Batches with the scatter rows folded in, chosen when the plain batch
    /// count would under-occupy the cores or a row must be cut further.
    BatchRows,
}

/// How the outer dimension is distributed.
///
/// Invariants: `(active_cores - 1) * per_core_batch + last_core_batch`
/// equals the split total, `last_core_batch >= 1`, and `active_cores` never
/// exceeds the profile's core count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionPlan {
    pub active_cores: i64,
    pub per_core_batch: i64,
    pub last_core_batch: i64,
    pub split: SplitAxis,
}

impl PartitionPlan {
    /// Units covered by all active cores together.
    pub fn total(&self) -> i64 {
        (self.active_cores - 1) * self.per_core_batch + self.last_core_batch
    }
}

fn split(total: i64, core_count: i64, split: SplitAxis) -> PartitionPlan {
    let per_core_batch = ceil_div(total, core_count);
    let active_cores = ceil_div(total, per_core_batch);
    let last_core_batch = total - per_core_batch * (active_cores - 1);
    PartitionPlan { active_cores, per_core_batch, last_core_batch, split }
}

/// Distribute `total` batches over at most `core_count` cores.
pub fn split_batches(total: i64, core_count: i64) -> PartitionPlan {
    split(total, core_count, SplitAxis::Batch)
}

/// Re-split with scatter rows folded into the batch count.
pub fn split_rows(total: i64, core_count: i64) -> PartitionPlan {
    split(total, core_count, SplitAxis::BatchRows)
}

/// Whether the whole workload must stay on one core.
///
/// Unaligned rows on targets without hardware-padded DMA would fragment into
/// sub-block transfers at every core boundary; when the per-index payload is
/// smaller than one block the planner keeps a single core instead. This is a
/// safety fallback, not a performance optimum.
pub fn sub_block_single_core(resolved: &ResolvedShapes, profile: &ResourceProfile) -> bool {
    if profile.caps.pad_dma || resolved.merged.row_aligned() {
        return false;
    }
    match resolved.index.rank {
        IndexRank::Flat => resolved.merged.src_batch_stride() < resolved.elems_per_block,
        IndexRank::Paired => resolved.merged.row_elems < resolved.elems_per_block,
    }
}
