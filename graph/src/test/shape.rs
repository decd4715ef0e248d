use test_case::test_case;

use crate::error::Error;
use crate::shape::Shape;

use super::{eval_emit_at, eval_emit_at_runtime};

#[test_case(&[2, 3], &[1, 2], 5; "two_by_three")]
#[test_case(&[4, 4], &[1, 1], 5; "four_by_four")]
#[test_case(&[2, 3, 4], &[1, 2, 3], 23; "rank_three")]
#[test_case(&[7], &[6], 6; "rank_one")]
#[test_case(&[], &[], 0; "rank_zero")]
fn test_affine_offset(dims: &[u64], idx: &[u64], expected: u64) {
    assert_eq!(Shape::new(dims).at(idx).unwrap(), expected);
}

#[test]
fn test_at_checks_arity() {
    let err = Shape::new(&[2, 3]).at(&[1]).unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { expected: 2, actual: 1 }));
}

#[test]
fn test_at_checks_bounds() {
    let err = Shape::new(&[2, 3]).at(&[1, 3]).unwrap_err();
    assert!(matches!(err, Error::IndexOutOfRange { dim: 1, index: 3, size: 3 }));
}

#[test]
fn test_zero_sized_dimension_rejects_every_index() {
    let shape = Shape::new(&[2, 0]);
    assert_eq!(shape.size(), 0);
    assert!(matches!(shape.at(&[0, 0]), Err(Error::IndexOutOfRange { .. })));
}

#[test]
fn test_flatten_preserves_size() {
    let shape = Shape::new(&[3, 4, 5]);
    let flat = shape.flatten().unwrap();
    assert_eq!(flat.ndim(), 1);
    assert_eq!(flat.size(), shape.size());
}

#[test]
fn test_chunk_keeps_parent_layout() {
    // A chunk of [4,4] indexes with the parent's strides: the chunk's
    // relative offset of (1,1) lands on the parent's (1,1).
    let parent = Shape::new(&[4, 4]);
    let (chunk, offset) = parent.chunk(&[0, 0], &[2, 2]).unwrap();
    assert_eq!(offset, 0);
    assert_eq!(chunk.dims(), &[2, 2]);
    assert_eq!(chunk.at(&[1, 1]).unwrap(), parent.at(&[1, 1]).unwrap());
}

#[test]
fn test_chunk_translated_offset() {
    let parent = Shape::new(&[4, 4]);
    let (chunk, offset) = parent.chunk(&[2, 1], &[2, 2]).unwrap();
    assert_eq!(offset, parent.at(&[2, 1]).unwrap());
    assert!(!chunk.is_contiguous());
}

#[test]
fn test_chunk_out_of_range() {
    let err = Shape::new(&[4, 4]).chunk(&[3, 0], &[2, 2]).unwrap_err();
    assert!(matches!(err, Error::ChunkOutOfRange { dim: 0, .. }));
}

#[test]
fn test_flatten_of_strided_chunk_fails() {
    let (chunk, _) = Shape::new(&[4, 4]).chunk(&[0, 0], &[2, 2]).unwrap();
    assert!(matches!(chunk.flatten(), Err(Error::NotContiguous)));
}

#[test]
fn test_reshape() {
    let shape = Shape::new(&[2, 6]);
    let reshaped = shape.reshape(&[3, 4]).unwrap();
    assert_eq!(reshaped.dims(), &[3, 4]);

    let err = shape.reshape(&[5, 2]).unwrap_err();
    assert!(matches!(err, Error::ReshapeSizeMismatch { input_size: 12, output_size: 10 }));
}

#[test_case(&[2, 3], &[1, 2]; "two_by_three")]
#[test_case(&[4, 4], &[3, 2]; "four_by_four")]
#[test_case(&[2, 3, 4], &[1, 0, 3]; "rank_three")]
#[test_case(&[], &[]; "rank_zero")]
fn test_emitted_offset_matches_constant_offset(dims: &[u64], idx: &[u64]) {
    let expected = Shape::new(dims).at(idx).unwrap();
    assert_eq!(eval_emit_at(&Shape::new(dims), idx), expected);
    assert_eq!(eval_emit_at_runtime(dims, idx), expected);
}

#[test]
fn test_emitted_offset_for_chunk() {
    let (chunk, _) = Shape::new(&[4, 4]).chunk(&[1, 1], &[2, 2]).unwrap();
    let expected = chunk.at(&[1, 1]).unwrap();
    assert_eq!(eval_emit_at(&chunk, &[1, 1]), expected);
}

#[test]
fn test_emit_flatten_keeps_runtime_form() {
    use tessel_ir::inst::ConstValue;
    use tessel_ir::{interp, Builder, Function, Module};

    // Flattening a runtime-dim [2,3] yields a runtime 1-D shape whose
    // indexing still executes to the right offset.
    let mut module = Module::new("test");
    let mut func = Function::new("flat", vec![]);
    {
        let mut builder = Builder::new(&mut func);
        let entry = builder.create_block("entry");
        builder.position_at_end(entry);

        let dims = [builder.index_const(2), builder.index_const(3)];
        let shape = Shape::with_runtime(&[2, 3], &dims).unwrap();
        let flat = shape.emit_flatten(&mut builder).unwrap();
        assert!(flat.has_runtime_dims());
        assert_eq!(flat.dims(), &[6]);

        let idx = builder.index_const(4);
        let offset = flat.emit_at(&mut builder, &[idx]).unwrap();
        builder.ret(Some(offset)).unwrap();
    }
    let id = module.add_function(func).unwrap();
    let outcome = interp::run(&module, id, vec![]).unwrap();
    assert_eq!(outcome.ret, Some(ConstValue::Int(4)));
}

#[test]
fn test_runtime_dims_must_match_arity() {
    assert!(matches!(
        Shape::with_runtime(&[2, 3], &[]),
        Err(Error::RuntimeDimsMismatch { expected: 2, actual: 0 })
    ));
}
