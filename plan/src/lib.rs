//! Host-side tiling planners for tessara.
//!
//! A tiling planner turns an operator's shapes/dtypes and a target
//! [`ResourceProfile`] into a concrete execution plan: how many cores
//! participate, how the batch splits across them, which on-chip buffering
//! strategy the kernel uses, and which precompiled kernel variant dispatches.
//! The result is a fixed-layout [`TilingRecord`] the device-side dispatcher
//! reads by offset.
//!
//! # Module Organization
//!
//! - [`shape`] - operand normalization into merged axis counts
//! - [`partition`] - batch distribution across cores
//! - [`buffer`] - buffering mode and staging-family selection
//! - [`key`] - dispatch key table
//! - [`record`] - fixed-order record encoding
//! - [`scatter_list`] - the scatter-list planner pipeline
//!
//! Planning is a deterministic pure function: identical inputs always yield
//! a bit-identical record, and every failure is terminal for the operator's
//! lowering.
//!
//! [`ResourceProfile`]: tessara_platform::ResourceProfile

pub mod align;
pub mod buffer;
pub mod error;
pub mod key;
pub mod partition;
pub mod record;
pub mod scatter_list;
pub mod shape;

#[cfg(test)]
pub mod test;

pub use buffer::{BufferMode, BufferPlan, DataPath, SizedPlan, TransposeStaging};
pub use error::{Error, Result};
pub use key::TilingKey;
pub use partition::{PartitionPlan, SplitAxis};
pub use record::{RECORD_BYTES, RECORD_FIELDS, TilingRecord};
pub use scatter_list::{ScatterListInputs, TilingOutput, plan_scatter_list};
pub use shape::{IndexRank, MergedShape, ResolvedShapes, TensorDescriptor};
