//! Wire-layout guarantees of the encoded tiling record.

use tessara_dtype::DType;

use crate::error::Error;
use crate::key::TilingKey;
use crate::record::{RECORD_BYTES, RECORD_FIELDS};
use crate::scatter_list::{ScatterListInputs, plan_scatter_list};
use crate::test::helpers::{dst_list, flat_index, profile, tensor};

fn decode(buf: &[u8]) -> Vec<i64> {
    buf.chunks_exact(8).map(|c| i64::from_le_bytes(c.try_into().unwrap())).collect()
}

#[test]
fn record_is_thirty_six_words() {
    assert_eq!(RECORD_FIELDS, 36);
    assert_eq!(RECORD_BYTES, 288);
}

#[test]
fn fields_land_at_their_agreed_offsets() {
    let p = profile(8, 192 * 1024);
    let src = tensor(&[8, 4, 256], DType::Float32);
    let dst = dst_list(&src, 1, 16);
    let index = flat_index(&src);
    let inputs = ScatterListInputs::builder().dst(&dst).src(&src).index(&index).axis(1).build();

    let out = plan_scatter_list(&inputs, &p).unwrap();
    let mut buf = vec![0u8; RECORD_BYTES];
    assert_eq!(out.record.encode_into(&mut buf).unwrap(), RECORD_BYTES);

    let words = decode(&buf);
    assert_eq!(words[0], 8); // batch_tensors
    assert_eq!(words[1], 1); // pre_rows
    assert_eq!(words[3], 4); // rows
    assert_eq!(words[4], 256); // row_elems
    assert_eq!(words[6], 8); // elems_per_block
    assert_eq!(words[7], 1); // index_rank
    assert_eq!(words[12], 1024); // src_batch_stride
    assert_eq!(words[15], 8); // active_cores
    assert_eq!(words[34], TilingKey::ResidentAligned.encoded());
    assert_eq!(words[35], 32); // workspace_bytes
}

#[test]
fn undersized_destination_fails_without_writing() {
    let p = profile(8, 192 * 1024);
    let src = tensor(&[8, 4, 256], DType::Float32);
    let dst = dst_list(&src, 1, 16);
    let index = flat_index(&src);
    let inputs = ScatterListInputs::builder().dst(&dst).src(&src).index(&index).axis(1).build();

    let out = plan_scatter_list(&inputs, &p).unwrap();
    let mut buf = vec![0u8; RECORD_BYTES - 1];
    let err = out.record.encode_into(&mut buf).unwrap_err();
    assert!(matches!(err, Error::RecordOverflow { required: RECORD_BYTES, .. }));
    assert!(buf.iter().all(|&b| b == 0));
}

#[test]
fn oversized_destination_writes_the_record_prefix() {
    let p = profile(8, 192 * 1024);
    let src = tensor(&[8, 4, 256], DType::Float32);
    let dst = dst_list(&src, 1, 16);
    let index = flat_index(&src);
    let inputs = ScatterListInputs::builder().dst(&dst).src(&src).index(&index).axis(1).build();

    let out = plan_scatter_list(&inputs, &p).unwrap();
    let mut buf = vec![0xAAu8; RECORD_BYTES + 16];
    assert_eq!(out.record.encode_into(&mut buf).unwrap(), RECORD_BYTES);
    assert!(buf[RECORD_BYTES..].iter().all(|&b| b == 0xAA));
}
