//! On-chip buffer sizing and staging-strategy selection.
//!
//! Given the resolved shapes and a provisional partition, pick exactly one
//! buffering mode per the fixed preference order (most favorable first):
//!
//! 1. **Resident** — the whole per-core workload fits the fast-memory
//!    budget; the kernel runs without an inner loop.
//! 2. **Looped** — one batch fits; the kernel loops over batches.
//! 3. **Chunked** — not even one batch fits; the payload is cut into
//!    block-rounded iterations with an explicit tail.
//!
//! Orthogonally, one of three data-movement families applies:
//!
//! - **Direct** — general path for any scatter-axis position.
//! - **PadDma** — last-axis scatter using the padded/strided DMA engine
//!   (or block-unit bursts on targets without it).
//! - **TransposeStage** — last-axis scatter with single-element rows,
//!   staged through a gather line + transpose buffer pair so the kernel
//!   reads the destination vector-width wise.
//!
//! Two sites re-partition after a provisional budget is known (the Direct
//! resident re-split and the PadDma in-row chunking); both fold scatter rows
//! into the batch count and run at most once.

use snafu::ensure;

use tessara_platform::{Capabilities, ResourceProfile};

use crate::align::{ceil_align, ceil_div, floor_align};
use crate::error::{self, Result};
use crate::partition::{self, PartitionPlan};
use crate::shape::{IndexRank, MergedShape, ResolvedShapes};

/// Data-movement family of the selected kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataPath {
    Direct,
    PadDma,
    TransposeStage,
}

/// Buffering mode, in decreasing memory appetite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferMode {
    Resident,
    Looped,
    Chunked,
}

/// Gather line and transpose scratch reserved by the transpose family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransposeStaging {
    pub line_bytes: i64,
    pub transpose_bytes: i64,
    /// Transpose repeats per body iteration.
    pub repeats: i64,
    /// Transpose repeats for the tail iteration.
    pub repeats_tail: i64,
}

/// The selected buffering mode with its loop structure.
///
/// `staged_elems` is meaningful on the Direct family only; the staging
/// families carry their per-iteration counts in the pad/transpose fields of
/// [`SizedPlan`] and encode zero here (field reuse is part of the record
/// contract).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferPlan {
    Resident {
        staged_elems: i64,
        src_buf_bytes: i64,
    },
    Looped {
        staged_elems: i64,
        src_buf_bytes: i64,
    },
    Chunked {
        per_loop_elems: i64,
        loop_count: i64,
        tail_elems: i64,
        tail_elems_aligned: i64,
        src_buf_bytes: i64,
    },
}

impl BufferPlan {
    pub const fn mode(&self) -> BufferMode {
        match self {
            Self::Resident { .. } => BufferMode::Resident,
            Self::Looped { .. } => BufferMode::Looped,
            Self::Chunked { .. } => BufferMode::Chunked,
        }
    }

    pub const fn src_buf_bytes(&self) -> i64 {
        match self {
            Self::Resident { src_buf_bytes, .. }
            | Self::Looped { src_buf_bytes, .. }
            | Self::Chunked { src_buf_bytes, .. } => *src_buf_bytes,
        }
    }
}

/// Complete output of the buffer-sizing stage.
///
/// Holds the (possibly re-split) partition, the (possibly re-merged) shape,
/// and every derived scalar the encoder writes. Stride and burst fields are
/// in byte units on `pad_dma` sub-families and block units otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizedPlan {
    pub path: DataPath,
    pub buffer: BufferPlan,
    pub staging: Option<TransposeStaging>,
    pub partition: PartitionPlan,
    pub merged: MergedShape,
    pub src_batch_stride: i64,
    pub src_batch_stride_aligned: i64,
    pub dst_batch_stride: i64,
    /// Aligned trailing extent as encoded; a block count on the PadDma keys.
    pub row_elems_aligned: i64,
    /// Block-aligned elements of one batch.
    pub batch_elems_aligned: i64,
    /// Elements handled per core (or per chunk on the row-chunked pad key).
    pub per_core_elems: i64,
    /// Gap between consecutive destination rows.
    pub dst_row_stride: i64,
    /// DMA burst covering one source row.
    pub row_burst: i64,
    /// Extent of the tail iteration in path-specific units.
    pub tail_span: i64,
}

/// Decide whether the last-axis staging families apply.
///
/// Sub-family capability wins over alignment: targets with padded DMA take
/// the staging family for every last-axis scatter, others only when the
/// transfer stays block-exact or can go through the transpose unit.
pub fn wants_last_axis_staging(resolved: &ResolvedShapes, caps: &Capabilities) -> bool {
    if !resolved.last_axis {
        return false;
    }
    let epb = resolved.elems_per_block;
    let src_extent = resolved.merged.rows;
    let dst_extent = resolved.merged.dst_rows;
    let flat_index = resolved.index.rank == IndexRank::Flat;
    if caps.pad_dma {
        return true;
    }
    let dst_aligned = dst_extent % epb == 0;
    if src_extent % epb == 0 && dst_aligned && flat_index {
        return true;
    }
    // Single-element rows can stage through the transpose unit, except for
    // 4-byte lanes on parts whose transpose unit lacks them.
    let single = src_extent == 1 && dst_aligned && flat_index;
    single && (caps.f32_transpose || resolved.elem_bytes != 4)
}

/// Select the buffering mode for the chosen family.
pub fn size_buffers(
    resolved: &ResolvedShapes,
    merged: &MergedShape,
    partition: PartitionPlan,
    core_count: i64,
    profile: &ResourceProfile,
    staged: bool,
) -> Result<SizedPlan> {
    if staged {
        size_last_axis(resolved, merged, partition, core_count, profile)
    } else {
        size_direct(resolved, merged, partition, core_count, profile)
    }
}

// ============================================================================
// DIRECT FAMILY
// ============================================================================

fn size_direct(
    resolved: &ResolvedShapes,
    merged: &MergedShape,
    partition: PartitionPlan,
    core_count: i64,
    profile: &ResourceProfile,
) -> Result<SizedPlan> {
    let eb = resolved.elem_bytes;
    let epb = resolved.elems_per_block;
    let stride = merged.src_batch_stride();
    let stride_aligned = ceil_align(stride, epb);

    let budget_bytes =
        profile.fast_mem_bytes - resolved.index.ub_bytes - resolved.mask_ub_bytes() - profile.reserved_bytes;
    let max_elems = budget_bytes / eb;
    ensure!(max_elems > 0, error::CapacityOverflowSnafu { required_bytes: eb, budget_bytes });

    let mut partition = partition;
    let buffer = if merged.row_aligned() {
        let per_core_elems = partition.per_core_batch * stride;
        if per_core_elems <= max_elems {
            BufferPlan::Resident { staged_elems: per_core_elems, src_buf_bytes: per_core_elems * eb }
        } else if stride <= max_elems {
            BufferPlan::Looped { staged_elems: stride, src_buf_bytes: stride * eb }
        } else {
            let fine_total = merged.batch() * merged.rows;
            let fine_per_core = ceil_div(fine_total, core_count);
            if merged.batch() < core_count && fine_per_core * merged.row_elems <= max_elems {
                // Too few batches to occupy the cores; re-split with rows
                // folded into the batch. The budget above is the provisional
                // one the finer payload was checked against, so this second
                // pass cannot overflow.
                partition = partition::split_rows(fine_total, core_count);
                let staged = partition.per_core_batch * merged.row_elems;
                BufferPlan::Resident { staged_elems: staged, src_buf_bytes: staged * eb }
            } else {
                chunk_batch_stride(stride, max_elems, epb, eb, false, budget_bytes)?
            }
        }
    } else if stride_aligned <= max_elems {
        BufferPlan::Looped { staged_elems: stride_aligned, src_buf_bytes: stride_aligned * eb }
    } else {
        chunk_batch_stride(stride, max_elems, epb, eb, true, budget_bytes)?
    };

    Ok(SizedPlan {
        path: DataPath::Direct,
        buffer,
        staging: None,
        partition,
        merged: merged.clone(),
        src_batch_stride: stride,
        src_batch_stride_aligned: stride_aligned,
        dst_batch_stride: merged.dst_batch_stride(),
        row_elems_aligned: merged.row_elems_aligned,
        batch_elems_aligned: 0,
        per_core_elems: 0,
        dst_row_stride: 0,
        row_burst: 0,
        tail_span: 0,
    })
}

/// Cut one batch stride into block-rounded iterations.
fn chunk_batch_stride(
    stride: i64,
    max_elems: i64,
    epb: i64,
    eb: i64,
    aligned_tail: bool,
    budget_bytes: i64,
) -> Result<BufferPlan> {
    let loop_count = ceil_div(stride, max_elems);
    let per_loop_elems = ceil_align(ceil_div(stride, loop_count), epb);
    let tail_elems = stride - (loop_count - 1) * per_loop_elems;
    // Rounding the iteration up to a block can eat the tail when the budget
    // is only a few blocks wide; there is no usable mode below this one.
    ensure!(
        tail_elems > 0,
        error::CapacityOverflowSnafu { required_bytes: per_loop_elems * eb, budget_bytes }
    );
    Ok(BufferPlan::Chunked {
        per_loop_elems,
        loop_count,
        tail_elems,
        tail_elems_aligned: if aligned_tail { ceil_align(tail_elems, epb) } else { 0 },
        src_buf_bytes: per_loop_elems * eb,
    })
}

// ============================================================================
// LAST-AXIS FAMILIES
// ============================================================================

/// Values shared by the transpose and pad branches.
struct LastAxisPrelude {
    budget_bytes: i64,
    stride: i64,
    batch_elems_aligned: i64,
    per_core_elems: i64,
    per_core_bytes: i64,
    batch_bytes_aligned: i64,
    line_elems: i64,
    line_bytes: i64,
    repeats: i64,
    dst_row_stride: i64,
}

fn size_last_axis(
    resolved: &ResolvedShapes,
    merged: &MergedShape,
    partition: PartitionPlan,
    core_count: i64,
    profile: &ResourceProfile,
) -> Result<SizedPlan> {
    let eb = resolved.elem_bytes;
    let epb = resolved.elems_per_block;
    let block = profile.block_bytes;
    let repeat = profile.repeat_unit;
    let rows = merged.rows;
    let row_elems = merged.row_elems;
    let dst_row_elems = merged.dst_row_elems;

    let budget_bytes = profile.fast_mem_bytes - resolved.index.ub_bytes - resolved.mask_ub_bytes();
    let stride = merged.src_batch_stride();
    let batch_elems_aligned = ceil_align(stride, epb);
    let per_core_elems = partition.per_core_batch * batch_elems_aligned;
    let per_core_bytes = per_core_elems * eb;
    let batch_bytes_aligned = batch_elems_aligned * eb;

    // The gather line spans one batch's destination rows; byte-wide lanes
    // transpose through block-sized tiles instead of repeat-sized ones.
    let (line_elems, repeats) = if eb == 1 {
        let le = ceil_align(rows, epb);
        (le, le * block / (repeat * repeat) / 4)
    } else {
        let le = ceil_align(rows, repeat);
        (le, le / repeat)
    };
    let line_bytes = line_elems * epb * eb;

    let prelude = LastAxisPrelude {
        budget_bytes,
        stride,
        batch_elems_aligned,
        per_core_elems,
        per_core_bytes,
        batch_bytes_aligned,
        line_elems,
        line_bytes,
        repeats,
        dst_row_stride: dst_row_elems * eb / block - 1,
    };

    let dst_aligned = dst_row_elems % epb == 0;
    let rows_aligned = rows % epb == 0;
    let single_elem = row_elems == 1 && resolved.index.rank == IndexRank::Flat;

    if single_elem && dst_aligned && eb != 8 {
        size_transpose(resolved, merged, partition, profile, &prelude, rows_aligned)
    } else {
        size_pad(resolved, merged, partition, core_count, profile, &prelude)
    }
}

fn size_transpose(
    resolved: &ResolvedShapes,
    merged: &MergedShape,
    partition: PartitionPlan,
    profile: &ResourceProfile,
    prelude: &LastAxisPrelude,
    rows_aligned: bool,
) -> Result<SizedPlan> {
    let eb = resolved.elem_bytes;
    let epb = resolved.elems_per_block;
    let block = profile.block_bytes;
    let repeat = profile.repeat_unit;
    let rows = merged.rows;

    let base = SizedPlan {
        path: DataPath::TransposeStage,
        buffer: BufferPlan::Resident { staged_elems: 0, src_buf_bytes: prelude.per_core_bytes },
        staging: Some(TransposeStaging {
            line_bytes: prelude.line_bytes,
            transpose_bytes: prelude.line_bytes,
            repeats: prelude.repeats,
            repeats_tail: 0,
        }),
        partition,
        merged: merged.clone(),
        src_batch_stride: prelude.stride,
        src_batch_stride_aligned: 0,
        dst_batch_stride: merged.dst_batch_stride(),
        row_elems_aligned: merged.row_elems_aligned,
        batch_elems_aligned: prelude.batch_elems_aligned,
        per_core_elems: prelude.per_core_elems,
        dst_row_stride: prelude.dst_row_stride,
        row_burst: 0,
        tail_span: prelude.line_elems,
    };

    let fits_resident = prelude.budget_bytes >= prelude.line_bytes * 2 + prelude.per_core_bytes;
    if rows_aligned && fits_resident {
        return Ok(base);
    }

    let fits_batch = prelude.budget_bytes >= prelude.line_bytes * 2 + prelude.batch_bytes_aligned;
    if fits_batch {
        return Ok(SizedPlan {
            buffer: BufferPlan::Looped { staged_elems: 0, src_buf_bytes: prelude.batch_bytes_aligned },
            ..base
        });
    }

    // Chunk the rows of one batch; the budget splits into one source share
    // plus `2 * epb` staging shares per element.
    let mut per_loop = (prelude.budget_bytes / eb / (2 * epb + 1)) / epb * epb;
    per_loop = floor_align(per_loop, repeat);
    if eb == 1 {
        per_loop = floor_align(per_loop, block);
    }
    ensure!(
        per_loop > 0,
        error::CapacityOverflowSnafu {
            required_bytes: (2 * epb + 1) * repeat * eb,
            budget_bytes: prelude.budget_bytes
        }
    );

    let mut loop_count = ceil_div(rows, per_loop);
    let tail_elems = rows - (loop_count - 1) * per_loop;
    loop_count -= 1;
    let tail_span = if eb == 1 { ceil_align(tail_elems, block) } else { ceil_align(tail_elems, repeat) };
    let line_bytes = per_loop * epb * eb;
    let (repeats, repeats_tail) = if eb == 1 {
        (per_loop * block / (repeat * repeat) / 4, tail_span * block / (repeat * repeat) / 4)
    } else {
        (per_loop / repeat, tail_span / repeat)
    };

    Ok(SizedPlan {
        buffer: BufferPlan::Chunked {
            per_loop_elems: per_loop,
            loop_count,
            tail_elems,
            tail_elems_aligned: 0,
            src_buf_bytes: per_loop * eb,
        },
        staging: Some(TransposeStaging { line_bytes, transpose_bytes: line_bytes, repeats, repeats_tail }),
        src_batch_stride_aligned: ceil_align(tail_elems, epb),
        batch_elems_aligned: ceil_align(per_loop, epb),
        tail_span,
        ..base
    })
}

fn size_pad(
    resolved: &ResolvedShapes,
    merged: &MergedShape,
    partition: PartitionPlan,
    core_count: i64,
    profile: &ResourceProfile,
    prelude: &LastAxisPrelude,
) -> Result<SizedPlan> {
    let eb = resolved.elem_bytes;
    let epb = resolved.elems_per_block;
    let rows = merged.rows;
    let row_elems = merged.row_elems;
    let dst_row_elems = merged.dst_row_elems;
    let budget_bytes = prelude.budget_bytes;

    let row_blocks = ceil_div(row_elems, epb);
    let row_elems_padded = row_blocks * epb;

    // Burst and stride switch to block units when the DMA engine cannot pad.
    let (dst_row_stride, row_burst) = if profile.caps.pad_dma {
        ((dst_row_elems - row_elems) * eb, row_elems * eb)
    } else {
        ((dst_row_elems - row_elems) / epb, row_elems / epb)
    };

    let mut plan = SizedPlan {
        path: DataPath::PadDma,
        buffer: BufferPlan::Resident { staged_elems: 0, src_buf_bytes: prelude.per_core_bytes },
        staging: None,
        partition,
        merged: merged.clone(),
        src_batch_stride: prelude.stride,
        src_batch_stride_aligned: 0,
        dst_batch_stride: merged.dst_batch_stride(),
        row_elems_aligned: row_blocks,
        batch_elems_aligned: prelude.batch_elems_aligned,
        per_core_elems: prelude.per_core_elems,
        dst_row_stride,
        row_burst,
        tail_span: 0,
    };

    if row_elems % epb == 0 && budget_bytes >= prelude.per_core_bytes {
        plan.per_core_elems = plan.partition.per_core_batch * prelude.stride;
        return Ok(plan);
    }

    let batch_padded_bytes = rows * row_elems_padded * eb;
    let row_padded_bytes = row_elems_padded * eb;
    if budget_bytes >= batch_padded_bytes && batch_padded_bytes / row_elems_padded <= profile.max_dma_repeat {
        plan.buffer = BufferPlan::Looped { staged_elems: 0, src_buf_bytes: batch_padded_bytes };
        return Ok(plan);
    }

    if budget_bytes >= row_padded_bytes {
        // Chunk over rows: as many padded rows per iteration as the budget
        // and the DMA repeat ceiling allow.
        let per_loop = (budget_bytes / row_padded_bytes).min(profile.max_dma_repeat);
        let mut loop_count = ceil_div(rows, per_loop);
        let tail_elems = rows - (loop_count - 1) * per_loop;
        loop_count -= 1;
        plan.buffer = BufferPlan::Chunked {
            per_loop_elems: per_loop,
            loop_count,
            tail_elems,
            tail_elems_aligned: 0,
            src_buf_bytes: per_loop * row_elems_padded * eb,
        };
        plan.per_core_elems = per_loop * row_elems;
        plan.tail_span = tail_elems * row_elems;
        return Ok(plan);
    }

    // Not even one padded row fits: cut inside the row and fold the rows
    // into the batch count, re-splitting the cores over the finer total.
    plan.merged.pre_rows *= rows;
    plan.partition = partition::split_rows(plan.merged.batch(), core_count);
    let src_buf_bytes = floor_align(budget_bytes - profile.reserved_bytes, profile.block_bytes);
    let per_loop = floor_align(src_buf_bytes / eb, epb);
    ensure!(
        per_loop > 0,
        error::CapacityOverflowSnafu { required_bytes: profile.block_bytes * eb, budget_bytes }
    );
    let mut loop_count = ceil_div(row_elems, per_loop);
    let tail_elems = row_elems - (loop_count - 1) * per_loop;
    loop_count -= 1;
    plan.buffer = BufferPlan::Chunked {
        per_loop_elems: per_loop,
        loop_count,
        tail_elems,
        tail_elems_aligned: ceil_align(tail_elems, epb),
        src_buf_bytes,
    };
    plan.tail_span = tail_elems * eb;
    Ok(plan)
}
