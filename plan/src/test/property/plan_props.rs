//! Property tests for the scatter-list planner.
//!
//! Random valid operand sets against random profiles must uphold the
//! pipeline invariants: partition conservation, the fast-memory bound,
//! key totality, determinism, and second-pass convergence of the
//! re-partitioning sites.

use proptest::prelude::*;
use proptest::test_runner::TestCaseError;

use tessara_dtype::DType;
use tessara_platform::{Capabilities, ResourceProfile};

use crate::error::Error;
use crate::key::TilingKey;
use crate::record::RECORD_BYTES;
use crate::scatter_list::{ScatterListInputs, plan_scatter_list};
use crate::shape::TensorDescriptor;

#[derive(Debug, Clone)]
struct Case {
    src: TensorDescriptor,
    dst: Vec<TensorDescriptor>,
    index: TensorDescriptor,
    mask: Option<TensorDescriptor>,
    axis: i64,
    profile: ResourceProfile,
}

fn arb_caps() -> impl Strategy<Value = Capabilities> {
    prop_oneof![
        Just(Capabilities::PAD_DMA),
        Just(Capabilities::ALIGNED_DMA),
        Just(Capabilities::LEGACY),
    ]
}

prop_compose! {
    fn arb_case()(rank in 2usize..=4)(
        dims in proptest::collection::vec(1i64..=6, rank),
        dtype in any::<DType>(),
        index_dtype in prop_oneof![Just(DType::Int32), Just(DType::Int64)],
        boost_pos in 0usize..4,
        boost in prop_oneof![Just(1i64), 1i64..=2048],
        axis_seed in 0usize..4,
        negative_axis in any::<bool>(),
        dst_extra in 0i64..=9,
        paired in any::<bool>(),
        with_mask in any::<bool>(),
        cores in 1i64..=64,
        mem_kib in 2i64..=256,
        caps in arb_caps(),
    ) -> Case {
        let rank = dims.len();
        let mut dims = dims;
        dims[boost_pos % rank] *= boost;
        // Keep the destination list itself small.
        dims[0] = (dims[0] - 1) % 8 + 1;

        let axis = 1 + axis_seed % (rank - 1);
        let dst_rows = dims[axis] + dst_extra;
        let mut dst_dims: Vec<i64> = dims[1..].to_vec();
        dst_dims[axis - 1] = dst_rows;

        let src = TensorDescriptor::new(dims.iter().copied(), dtype);
        let dst: Vec<_> =
            (0..dims[0]).map(|_| TensorDescriptor::new(dst_dims.iter().copied(), dtype)).collect();
        let index = if paired {
            TensorDescriptor::new([dims[0], 2], index_dtype)
        } else {
            TensorDescriptor::new([dims[0]], index_dtype)
        };
        let mask = with_mask.then(|| TensorDescriptor::new([dims[0]], DType::Int64));
        let axis = if negative_axis { axis as i64 - rank as i64 } else { axis as i64 };
        let profile = ResourceProfile::builder()
            .core_count(cores)
            .fast_mem_bytes(mem_kib * 1024)
            .caps(caps)
            .build();
        Case { src, dst, index, mask, axis, profile }
    }
}

fn plan(case: &Case) -> Result<crate::scatter_list::TilingOutput, Error> {
    let inputs = ScatterListInputs::builder()
        .dst(&case.dst)
        .src(&case.src)
        .index(&case.index)
        .maybe_mask(case.mask.as_ref())
        .axis(case.axis)
        .build();
    plan_scatter_list(&inputs, &case.profile)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    /// Valid operands either plan successfully or overflow capacity; every
    /// successful plan upholds the partition and budget invariants.
    #[test]
    fn plan_invariants(case in arb_case()) {
        let out = match plan(&case) {
            // Tiny budgets legitimately fit no mode.
            Err(Error::CapacityOverflow { .. }) => return Ok(()),
            Err(e) => return Err(TestCaseError::fail(format!("unexpected error: {e}"))),
            Ok(out) => out,
        };
        let r = &out.record;

        // Per-core batch counts cover the split total exactly.
        let split_total = if out.key == TilingKey::ResidentSplitRows {
            r.batch_tensors * r.pre_rows * r.rows
        } else {
            r.batch_tensors * r.pre_rows
        };
        prop_assert_eq!((r.active_cores - 1) * r.per_core_batch + r.last_core_batch, split_total);
        prop_assert!(r.last_core_batch >= 1);
        prop_assert!(r.active_cores >= 1);
        prop_assert!(r.active_cores <= case.profile.core_count);

        // The chosen buffers fit fast memory next to the index and mask.
        let footprint = r.src_buf_bytes
            + r.line_buf_bytes
            + r.transpose_buf_bytes
            + r.index_bytes
            + r.mask_bytes;
        prop_assert!(
            footprint <= case.profile.fast_mem_bytes,
            "footprint {} exceeds fast memory {}",
            footprint,
            case.profile.fast_mem_bytes,
        );

        // The key always belongs to the closed enumeration.
        prop_assert!(TilingKey::from_repr(r.key.encoded() as usize).is_some());

        // Chunked schedules keep a positive tail.
        if r.loop_count > 0 {
            prop_assert!(r.per_loop_elems >= 1);
            prop_assert!(r.tail_elems >= 1);
        }

        prop_assert_eq!(r.workspace_bytes, case.profile.sync_workspace_bytes);
        prop_assert_eq!(out.block_dim, r.active_cores);
    }

    /// Identical inputs yield a bit-identical encoded record.
    #[test]
    fn planning_is_idempotent(case in arb_case()) {
        let (first, second) = (plan(&case), plan(&case));
        match (first, second) {
            (Ok(a), Ok(b)) => {
                prop_assert_eq!(&a, &b);
                let mut ab = vec![0u8; RECORD_BYTES];
                let mut bb = vec![0u8; RECORD_BYTES];
                a.record.encode_into(&mut ab).unwrap();
                b.record.encode_into(&mut bb).unwrap();
                prop_assert_eq!(ab, bb);
            }
            (Err(_), Err(_)) => {}
            _ => return Err(TestCaseError::fail("planning is not deterministic")),
        }
    }

    /// Both re-partitioning sites satisfy the provisional budget they were
    /// derived from; a third pass is never needed.
    #[test]
    fn second_pass_respects_the_provisional_budget(case in arb_case()) {
        let Ok(out) = plan(&case) else { return Ok(()) };
        let r = &out.record;
        if matches!(
            out.key,
            TilingKey::ResidentSplitRows | TilingKey::PadElemChunked | TilingKey::PadElemChunkedPaired
        ) {
            let provisional = case.profile.fast_mem_bytes
                - r.index_bytes
                - r.mask_bytes
                - case.profile.reserved_bytes;
            prop_assert!(r.src_buf_bytes <= provisional);
        }
    }
}
