//! Shape resolution for the scatter-list planner.
//!
//! Normalizes the operator's tensors into merged semantic axis counts and
//! validates compatibility across the destination list, the source, the
//! index tensor, and the optional mask. Everything downstream reads only the
//! [`ResolvedShapes`] produced here.
//!
//! Axis convention: the source tensor is `[list, pre.., scatter, post..]`;
//! each destination tensor drops the leading list dimension. `pre..` merges
//! into the batch, `post..` into the per-row element count.

use smallvec::SmallVec;
use snafu::ensure;

use tessara_dtype::{DType, ext::HasDType};
use tessara_platform::ResourceProfile;

use crate::align::ceil_align;
use crate::error::{self, Result};
use crate::scatter_list::ScatterListInputs;

/// Short dimension sequence; operator shapes rarely exceed rank 4.
pub type Dims = SmallVec<[i64; 6]>;

/// Shape and element type of one operand tensor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorDescriptor {
    pub dims: Dims,
    pub dtype: DType,
}

impl TensorDescriptor {
    pub fn new(dims: impl IntoIterator<Item = i64>, dtype: DType) -> Self {
        Self { dims: dims.into_iter().collect(), dtype }
    }

    /// Descriptor with the dtype of a native Rust scalar.
    pub fn of<T: HasDType>(dims: impl IntoIterator<Item = i64>) -> Self {
        Self::new(dims, T::DTYPE)
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    pub fn dim(&self, axis: usize) -> i64 {
        self.dims[axis]
    }

    pub fn elem_bytes(&self) -> i64 {
        self.dtype.bytes() as i64
    }
}

/// Index tensor arity: one offset per list entry, or (offset, count) pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexRank {
    Flat,
    Paired,
}

impl IndexRank {
    pub const fn encoded(&self) -> i64 {
        match self {
            Self::Flat => 1,
            Self::Paired => 2,
        }
    }
}

/// Staging footprint of the index tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexLayout {
    pub rank: IndexRank,
    /// Entry count, block-aligned for the index dtype.
    pub count: i64,
    pub ub_bytes: i64,
}

/// Staging footprint of the optional mask tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaskLayout {
    pub count: i64,
    pub ub_bytes: i64,
}

/// The three semantic axis counts and their destination counterparts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedShape {
    /// Leading list extent: one destination tensor per entry.
    pub batch_tensors: i64,
    /// Merged extents between the list axis and the scatter axis.
    pub pre_rows: i64,
    /// Scatter-axis extent of the source.
    pub rows: i64,
    /// Merged trailing extent: contiguous elements per row.
    pub row_elems: i64,
    /// `row_elems` rounded up to the DMA block granularity.
    pub row_elems_aligned: i64,
    /// Scatter-axis extent of the destination.
    pub dst_rows: i64,
    /// Trailing extent of the destination.
    pub dst_row_elems: i64,
}

impl MergedShape {
    /// Batches distributed across cores.
    pub fn batch(&self) -> i64 {
        self.batch_tensors * self.pre_rows
    }

    /// Contiguous source elements of one batch.
    pub fn src_batch_stride(&self) -> i64 {
        self.rows * self.row_elems
    }

    /// Destination elements spanned by one batch.
    pub fn dst_batch_stride(&self) -> i64 {
        self.dst_rows * self.dst_row_elems
    }

    pub fn row_aligned(&self) -> bool {
        self.row_elems == self.row_elems_aligned
    }
}

/// Everything later pipeline stages need to know about the operands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedShapes {
    pub merged: MergedShape,
    pub src_dims: Dims,
    /// Normalized scatter axis in the source tensor.
    pub axis: usize,
    /// The scatter axis is the trailing axis of the source.
    pub last_axis: bool,
    pub dtype: DType,
    pub elem_bytes: i64,
    pub elems_per_block: i64,
    pub index: IndexLayout,
    pub mask: Option<MaskLayout>,
}

impl ResolvedShapes {
    pub fn mask_ub_bytes(&self) -> i64 {
        self.mask.map_or(0, |m| m.ub_bytes)
    }

    /// Re-merge for the last-axis staging families: the trailing extent
    /// becomes the per-row element count and the extents between the list
    /// axis and the trailing axis collapse into the row count.
    pub fn remap_last_axis(&self) -> MergedShape {
        let rank = self.src_dims.len();
        let row_elems = self.merged.rows;
        let dst_row_elems = self.merged.dst_rows;
        let (pre_rows, rows) = match rank {
            2 => (1, 1),
            3 => (1, self.src_dims[1]),
            _ => (self.src_dims[1], self.src_dims[2..rank - 1].iter().product()),
        };
        MergedShape {
            batch_tensors: self.merged.batch_tensors,
            pre_rows,
            rows,
            row_elems,
            row_elems_aligned: ceil_align(row_elems, self.elems_per_block),
            dst_rows: rows,
            dst_row_elems,
        }
    }
}

/// Resolve and validate the operand set.
pub fn resolve(inputs: &ScatterListInputs<'_>, profile: &ResourceProfile) -> Result<ResolvedShapes> {
    ensure!(inputs.reduce == "update", error::UnsupportedReductionSnafu { mode: inputs.reduce });

    let dst = inputs.dst;
    ensure!(!dst.is_empty(), error::EmptyDestinationListSnafu);
    let dst0 = &dst[0];
    for (index, d) in dst.iter().enumerate().skip(1) {
        ensure!(d.dims == dst0.dims, error::DestinationShapeDivergesSnafu { index });
    }

    let src = inputs.src;
    let rank = src.rank();
    ensure!(rank >= 2, error::RankUnsupportedSnafu { operand: "src", rank, expected: "at least 2" });
    ensure!(
        dst0.rank() + 1 == rank,
        error::RankUnsupportedSnafu { operand: "dst", rank: dst0.rank(), expected: "source rank minus one" }
    );
    ensure!(
        dst0.dtype == src.dtype,
        error::DTypeMismatchSnafu { expected: src.dtype, actual: dst0.dtype }
    );

    let batch_tensors = src.dim(0);
    ensure!(
        batch_tensors == dst.len() as i64,
        error::ExtentMismatchSnafu { operand: "src", expected: dst.len() as i64, actual: batch_tensors }
    );

    let mut axis = inputs.axis;
    if axis < 0 {
        axis += rank as i64;
    }
    ensure!(
        axis >= 1 && (axis as usize) < rank,
        error::AxisOutOfRangeSnafu { axis: inputs.axis, rank }
    );
    let axis = axis as usize;

    for &d in &src.dims {
        ensure!(d > 0, error::EmptyOperandSnafu { operand: "src" });
    }
    for &d in &dst0.dims {
        ensure!(d > 0, error::EmptyOperandSnafu { operand: "dst" });
    }

    let pre_rows: i64 = src.dims[1..axis].iter().product();
    let rows = src.dims[axis];
    let row_elems: i64 = src.dims[axis + 1..].iter().product();
    let dst_pre: i64 = dst0.dims[..axis - 1].iter().product();
    let dst_rows = dst0.dims[axis - 1];
    let dst_row_elems: i64 = dst0.dims[axis..].iter().product();

    ensure!(
        dst_pre == pre_rows,
        error::ExtentMismatchSnafu { operand: "dst", expected: pre_rows, actual: dst_pre }
    );
    ensure!(
        dst_row_elems == row_elems,
        error::ExtentMismatchSnafu { operand: "dst", expected: row_elems, actual: dst_row_elems }
    );
    ensure!(
        rows <= dst_rows,
        error::ScatterExtentExceedsDestinationSnafu { actual: rows, limit: dst_rows }
    );

    let elem_bytes = src.elem_bytes();
    let elems_per_block = elems_per_block_checked(profile, elem_bytes)?;
    let row_elems_aligned = ceil_align(row_elems, elems_per_block);

    let index = resolve_index(inputs.index, batch_tensors, profile)?;
    let mask = inputs.mask.map(|m| resolve_mask(m, batch_tensors, profile)).transpose()?;

    Ok(ResolvedShapes {
        merged: MergedShape {
            batch_tensors,
            pre_rows,
            rows,
            row_elems,
            row_elems_aligned,
            dst_rows,
            dst_row_elems,
        },
        src_dims: src.dims.clone(),
        axis,
        last_axis: axis == rank - 1,
        dtype: src.dtype,
        elem_bytes,
        elems_per_block,
        index,
        mask,
    })
}

/// An element wider than one DMA block cannot be staged at all.
fn elems_per_block_checked(profile: &ResourceProfile, elem_bytes: i64) -> Result<i64> {
    let elems = profile.elems_per_block(elem_bytes);
    ensure!(
        elems > 0,
        error::CapacityOverflowSnafu { required_bytes: elem_bytes, budget_bytes: profile.block_bytes }
    );
    Ok(elems)
}

fn resolve_index(index: &TensorDescriptor, batch_tensors: i64, profile: &ResourceProfile) -> Result<IndexLayout> {
    let rank = match index.rank() {
        1 => IndexRank::Flat,
        2 => IndexRank::Paired,
        rank => return error::RankUnsupportedSnafu { operand: "index", rank, expected: "1 or 2" }.fail(),
    };
    ensure!(
        index.dim(0) == batch_tensors,
        error::ExtentMismatchSnafu { operand: "index", expected: batch_tensors, actual: index.dim(0) }
    );
    let mut count = batch_tensors;
    if rank == IndexRank::Paired {
        ensure!(
            index.dim(1) == 2,
            error::ExtentMismatchSnafu { operand: "index", expected: 2, actual: index.dim(1) }
        );
        count *= 2;
    }
    let per_block = elems_per_block_checked(profile, index.elem_bytes())?;
    let count = ceil_align(count, per_block);
    Ok(IndexLayout { rank, count, ub_bytes: count * index.elem_bytes() })
}

fn resolve_mask(mask: &TensorDescriptor, batch_tensors: i64, profile: &ResourceProfile) -> Result<MaskLayout> {
    ensure!(
        mask.rank() == 1,
        error::RankUnsupportedSnafu { operand: "mask", rank: mask.rank(), expected: "1" }
    );
    ensure!(
        mask.dim(0) == batch_tensors,
        error::ExtentMismatchSnafu { operand: "mask", expected: batch_tensors, actual: mask.dim(0) }
    );
    let per_block = elems_per_block_checked(profile, mask.elem_bytes())?;
    let count = ceil_align(batch_tensors, per_block);
    Ok(MaskLayout { count, ub_bytes: count * mask.elem_bytes() })
}
