//! The flat tiling record and its wire encoding.
//!
//! The device-side dispatcher reads this record by fixed offsets, not by
//! name: the field order below is a wire contract shared with the kernel
//! binaries. The pipeline keeps structured per-stage records and flattens
//! them only here. Several fields are reused across key families (see
//! [`SizedPlan`]); a field that a kernel variant does not read encodes zero.
//!
//! [`SizedPlan`]: crate::buffer::SizedPlan

use tessara_platform::ResourceProfile;

use crate::buffer::{BufferPlan, DataPath, SizedPlan};
use crate::error::{self, Result};
use crate::key::TilingKey;
use crate::shape::ResolvedShapes;

/// Number of 64-bit fields in the encoded record.
pub const RECORD_FIELDS: usize = 36;
/// Encoded record size in bytes.
pub const RECORD_BYTES: usize = RECORD_FIELDS * size_of::<i64>();

/// Every scalar the kernel dispatcher consumes, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TilingRecord {
    pub batch_tensors: i64,
    pub pre_rows: i64,
    pub dst_rows: i64,
    pub rows: i64,
    pub row_elems: i64,
    /// Aligned trailing extent; a block count on the padded-DMA keys.
    pub row_elems_aligned: i64,
    pub elems_per_block: i64,
    pub index_rank: i64,
    pub index_count: i64,
    pub index_bytes: i64,
    pub mask_count: i64,
    pub mask_bytes: i64,
    pub src_batch_stride: i64,
    pub src_batch_stride_aligned: i64,
    pub dst_batch_stride: i64,
    pub active_cores: i64,
    pub per_core_batch: i64,
    pub last_core_batch: i64,
    /// Total loops on the direct chunked keys, body-only elsewhere.
    pub loop_count: i64,
    pub per_loop_elems: i64,
    pub tail_elems: i64,
    pub tail_elems_aligned: i64,
    pub staged_elems: i64,
    pub src_buf_bytes: i64,
    pub line_buf_bytes: i64,
    pub transpose_buf_bytes: i64,
    pub transpose_repeats: i64,
    pub transpose_repeats_tail: i64,
    pub batch_elems_aligned: i64,
    pub per_core_elems: i64,
    /// Bytes, blocks, or blocks-minus-one depending on the key family.
    pub dst_row_stride: i64,
    pub dst_row_elems: i64,
    pub row_burst: i64,
    pub tail_span: i64,
    pub key: TilingKey,
    pub workspace_bytes: i64,
}

impl TilingRecord {
    /// Flatten the staged plan into the record.
    pub fn assemble(
        resolved: &ResolvedShapes,
        plan: &SizedPlan,
        key: TilingKey,
        profile: &ResourceProfile,
    ) -> Self {
        let (loop_count, per_loop_elems, tail_elems, tail_elems_aligned) = match plan.buffer {
            BufferPlan::Chunked { per_loop_elems, loop_count, tail_elems, tail_elems_aligned, .. } => {
                (loop_count, per_loop_elems, tail_elems, tail_elems_aligned)
            }
            _ => (0, 0, 0, 0),
        };
        // Per-iteration counts of the staging families live in the pad and
        // transpose fields; only the direct kernels read `staged_elems`.
        let staged_elems = match (plan.path, plan.buffer) {
            (DataPath::Direct, BufferPlan::Resident { staged_elems, .. })
            | (DataPath::Direct, BufferPlan::Looped { staged_elems, .. }) => staged_elems,
            (DataPath::Direct, BufferPlan::Chunked { per_loop_elems, .. }) => per_loop_elems,
            _ => 0,
        };
        let staging = plan.staging;

        Self {
            batch_tensors: plan.merged.batch_tensors,
            pre_rows: plan.merged.pre_rows,
            dst_rows: plan.merged.dst_rows,
            rows: plan.merged.rows,
            row_elems: plan.merged.row_elems,
            row_elems_aligned: plan.row_elems_aligned,
            elems_per_block: resolved.elems_per_block,
            index_rank: resolved.index.rank.encoded(),
            index_count: resolved.index.count,
            index_bytes: resolved.index.ub_bytes,
            mask_count: resolved.mask.map_or(0, |m| m.count),
            mask_bytes: resolved.mask_ub_bytes(),
            src_batch_stride: plan.src_batch_stride,
            src_batch_stride_aligned: plan.src_batch_stride_aligned,
            dst_batch_stride: plan.dst_batch_stride,
            active_cores: plan.partition.active_cores,
            per_core_batch: plan.partition.per_core_batch,
            last_core_batch: plan.partition.last_core_batch,
            loop_count,
            per_loop_elems,
            tail_elems,
            tail_elems_aligned,
            staged_elems,
            src_buf_bytes: plan.buffer.src_buf_bytes(),
            line_buf_bytes: staging.map_or(0, |s| s.line_bytes),
            transpose_buf_bytes: staging.map_or(0, |s| s.transpose_bytes),
            transpose_repeats: staging.map_or(0, |s| s.repeats),
            transpose_repeats_tail: staging.map_or(0, |s| s.repeats_tail),
            batch_elems_aligned: plan.batch_elems_aligned,
            per_core_elems: plan.per_core_elems,
            dst_row_stride: plan.dst_row_stride,
            dst_row_elems: plan.merged.dst_row_elems,
            row_burst: plan.row_burst,
            tail_span: plan.tail_span,
            key,
            workspace_bytes: profile.sync_workspace_bytes,
        }
    }

    fn words(&self) -> [i64; RECORD_FIELDS] {
        [
            self.batch_tensors,
            self.pre_rows,
            self.dst_rows,
            self.rows,
            self.row_elems,
            self.row_elems_aligned,
            self.elems_per_block,
            self.index_rank,
            self.index_count,
            self.index_bytes,
            self.mask_count,
            self.mask_bytes,
            self.src_batch_stride,
            self.src_batch_stride_aligned,
            self.dst_batch_stride,
            self.active_cores,
            self.per_core_batch,
            self.last_core_batch,
            self.loop_count,
            self.per_loop_elems,
            self.tail_elems,
            self.tail_elems_aligned,
            self.staged_elems,
            self.src_buf_bytes,
            self.line_buf_bytes,
            self.transpose_buf_bytes,
            self.transpose_repeats,
            self.transpose_repeats_tail,
            self.batch_elems_aligned,
            self.per_core_elems,
            self.dst_row_stride,
            self.dst_row_elems,
            self.row_burst,
            self.tail_span,
            self.key.encoded(),
            self.workspace_bytes,
        ]
    }

    /// Serialize into `out` as little-endian 64-bit words.
    ///
    /// Writes nothing when the destination is too small; with a correctly
    /// sized destination this cannot fail.
    pub fn encode_into(&self, out: &mut [u8]) -> Result<usize> {
        snafu::ensure!(
            out.len() >= RECORD_BYTES,
            error::RecordOverflowSnafu { required: RECORD_BYTES, capacity: out.len() }
        );
        for (field, chunk) in self.words().iter().zip(out.chunks_exact_mut(size_of::<i64>())) {
            chunk.copy_from_slice(&field.to_le_bytes());
        }
        Ok(RECORD_BYTES)
    }

    /// Emit the sealed record at debug verbosity.
    pub fn trace(&self) {
        tracing::debug!(
            key = ?self.key,
            active_cores = self.active_cores,
            workspace_bytes = self.workspace_bytes,
            record = ?self,
            "scatter-list tiling sealed"
        );
    }
}
