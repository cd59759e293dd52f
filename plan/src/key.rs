//! Dispatch key selection.
//!
//! Maps the (data path, buffering mode, split axis, alignment, index rank)
//! combination onto one member of the closed kernel-variant enumeration. The
//! selector is total: sub-family paths are matched before alignment so a
//! capability specialization always wins, and the final arm is the generic
//! chunked/padded kernel that accepts any residue.

use crate::buffer::{BufferMode, DataPath, SizedPlan};
use crate::partition::SplitAxis;
use crate::shape::IndexRank;

/// One precompiled kernel variant per value.
///
/// Discriminants are stable and grouped by data-movement family; the device
/// dispatcher reads them back through `from_repr`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(strum::EnumCount, strum::EnumIter, strum::FromRepr)]
pub enum TilingKey {
    /// Direct path, whole per-core batch resident, block-exact rows.
    ResidentAligned = 0,
    /// Direct path, one batch resident, kernel loops over batches.
    RowResident = 1,
    /// Direct path, resident after folding rows into the batch split.
    ResidentSplitRows = 2,
    /// Direct path, batch cut into block-rounded chunks.
    RowChunked = 3,
    /// Direct path, looped with trailing-block padding.
    RowResidentPad = 4,
    /// Direct path, chunked with trailing-block padding; applies to any
    /// alignment residue.
    RowChunkedPad = 5,

    /// Padded-DMA path, whole per-core batch resident.
    PadResident = 6,
    /// Padded-DMA path, one batch of padded rows resident.
    PadRowResident = 7,
    /// Padded-DMA path, chunked over rows.
    PadRowChunked = 8,
    /// Padded-DMA path, chunked inside the row, flat index.
    PadElemChunked = 9,
    /// Padded-DMA path, chunked inside the row, paired index.
    PadElemChunkedPaired = 10,

    /// Transpose staging, whole per-core batch resident.
    TransposeResident = 11,
    /// Transpose staging, one batch resident.
    TransposeRowResident = 12,
    /// Transpose staging, chunked over rows.
    TransposeChunked = 13,
}

impl TilingKey {
    pub const fn encoded(&self) -> i64 {
        *self as i64
    }
}

/// Select the kernel variant for a sized plan.
pub fn select(plan: &SizedPlan, index: IndexRank) -> TilingKey {
    let aligned = plan.merged.row_aligned();
    let paired = index == IndexRank::Paired;
    match (plan.path, plan.buffer.mode(), plan.partition.split) {
        (DataPath::TransposeStage, BufferMode::Resident, _) => TilingKey::TransposeResident,
        (DataPath::TransposeStage, BufferMode::Looped, _) => TilingKey::TransposeRowResident,
        (DataPath::TransposeStage, BufferMode::Chunked, _) => TilingKey::TransposeChunked,

        (DataPath::PadDma, BufferMode::Resident, _) => TilingKey::PadResident,
        (DataPath::PadDma, BufferMode::Looped, _) => TilingKey::PadRowResident,
        (DataPath::PadDma, BufferMode::Chunked, SplitAxis::Batch) => TilingKey::PadRowChunked,
        (DataPath::PadDma, BufferMode::Chunked, SplitAxis::BatchRows) if paired => {
            TilingKey::PadElemChunkedPaired
        }
        (DataPath::PadDma, BufferMode::Chunked, SplitAxis::BatchRows) => TilingKey::PadElemChunked,

        (DataPath::Direct, BufferMode::Resident, SplitAxis::Batch) if aligned => TilingKey::ResidentAligned,
        (DataPath::Direct, BufferMode::Resident, SplitAxis::BatchRows) if aligned => {
            TilingKey::ResidentSplitRows
        }
        (DataPath::Direct, BufferMode::Looped, _) if aligned => TilingKey::RowResident,
        (DataPath::Direct, BufferMode::Looped, _) => TilingKey::RowResidentPad,
        (DataPath::Direct, BufferMode::Chunked, _) if aligned => TilingKey::RowChunked,
        _ => TilingKey::RowChunkedPad,
    }
}
