//! End-to-end pipeline behavior.

use tessara_dtype::DType;

use crate::key::TilingKey;
use crate::record::RECORD_BYTES;
use crate::scatter_list::{ScatterListInputs, plan_scatter_list};
use crate::test::helpers::{dst_list, flat_index, profile, tensor};

#[test]
fn planning_is_bit_deterministic() {
    let p = profile(40, 192 * 1024);
    let src = tensor(&[16, 4, 96], DType::Float16);
    let dst = dst_list(&src, 1, 32);
    let index = flat_index(&src);
    let mask = tensor(&[16], DType::Int64);
    let inputs =
        ScatterListInputs::builder().dst(&dst).src(&src).index(&index).mask(&mask).axis(1).build();

    let first = plan_scatter_list(&inputs, &p).unwrap();
    let second = plan_scatter_list(&inputs, &p).unwrap();
    assert_eq!(first, second);

    let mut a = vec![0u8; RECORD_BYTES];
    let mut b = vec![0u8; RECORD_BYTES];
    first.record.encode_into(&mut a).unwrap();
    second.record.encode_into(&mut b).unwrap();
    assert_eq!(a, b);
}

#[test]
fn fewer_batches_than_cores_idles_the_rest() {
    let p = profile(48, 192 * 1024);
    let src = tensor(&[5, 2, 64], DType::Float32);
    let dst = dst_list(&src, 1, 8);
    let index = flat_index(&src);
    let inputs = ScatterListInputs::builder().dst(&dst).src(&src).index(&index).axis(1).build();

    let out = plan_scatter_list(&inputs, &p).unwrap();
    // Five batches over 48 cores: one batch per core, the rest idle.
    assert_eq!(out.block_dim, 5);
    assert_eq!(out.record.per_core_batch, 1);
    assert_eq!(out.record.last_core_batch, 1);
}

#[test]
fn side_channels_mirror_the_record() {
    let p = profile(8, 192 * 1024);
    let src = tensor(&[8, 4, 256], DType::Float32);
    let dst = dst_list(&src, 1, 16);
    let index = flat_index(&src);
    let inputs = ScatterListInputs::builder().dst(&dst).src(&src).index(&index).axis(1).build();

    let out = plan_scatter_list(&inputs, &p).unwrap();
    assert_eq!(out.block_dim, out.record.active_cores);
    assert_eq!(out.key, out.record.key);
    assert_eq!(out.workspace_bytes, out.record.workspace_bytes);
    assert_eq!(out.workspace_bytes, p.sync_workspace_bytes);
}

#[test]
fn mask_budget_is_charged_before_sizing() {
    // Identical operands; adding a mask shrinks the budget and the staged
    // bytes must account for it.
    let p = profile(8, 192 * 1024);
    let src = tensor(&[16, 4, 256], DType::Float32);
    let dst = dst_list(&src, 1, 16);
    let index = flat_index(&src);

    let bare = ScatterListInputs::builder().dst(&dst).src(&src).index(&index).axis(1).build();
    let bare = plan_scatter_list(&bare, &p).unwrap();
    assert_eq!(bare.record.mask_count, 0);
    assert_eq!(bare.record.mask_bytes, 0);

    let mask = tensor(&[16], DType::Int64);
    let masked =
        ScatterListInputs::builder().dst(&dst).src(&src).index(&index).mask(&mask).axis(1).build();
    let masked = plan_scatter_list(&masked, &p).unwrap();
    assert_eq!(masked.record.mask_count, 16);
    assert_eq!(masked.record.mask_bytes, 16 * 8);
    assert_eq!(masked.key, bare.key);
}

#[test]
fn default_axis_is_the_trailing_axis() {
    let p = profile(8, 192 * 1024);
    let src = tensor(&[8, 256], DType::Float32);
    let dst = dst_list(&src, 1, 512);
    let index = flat_index(&src);
    let inputs = ScatterListInputs::builder().dst(&dst).src(&src).index(&index).build();

    let out = plan_scatter_list(&inputs, &p).unwrap();
    assert_eq!(out.key, TilingKey::PadResident);
}
