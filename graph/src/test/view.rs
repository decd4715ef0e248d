use tessel_ir::interp::{self, ArgValue};
use tessel_ir::{Builder, DType, Function, Module, Param, Ty};

use crate::error::Error;
use crate::shape::Shape;
use crate::view::ViewArena;

#[test]
fn test_chunk_addresses_parent_storage() {
    // Writing 1.0 at chunk-relative (1,1) of the chunk starting at (2,1)
    // must land at parent (3,2) of a [4,4] buffer.
    let mut module = Module::new("m");
    let mut func = Function::new("poke", vec![Param::new("buf", Ty::Ptr(DType::Float32))]);
    let base = func.param(0).unwrap();
    {
        let mut builder = Builder::new(&mut func);
        let entry = builder.create_block("entry");
        builder.position_at_end(entry);

        let mut arena = ViewArena::new();
        let parent = arena.create(base, DType::Float32, Shape::new(&[4, 4]));
        let chunk = arena.chunk(&mut builder, parent, &[2, 1], &[2, 2]).unwrap();

        let slot = arena.element_ptr_at(&mut builder, chunk, &[1, 1]).unwrap();
        let one = builder.const_float(DType::Float32, 1.0);
        builder.store(slot, one).unwrap();
        builder.ret(None).unwrap();
    }
    let id = module.add_function(func).unwrap();

    let outcome = interp::run(&module, id, vec![ArgValue::buffer_f32(&[0.0; 16])]).unwrap();
    let data = outcome.buffer_f64(0);
    let expected_pos = Shape::new(&[4, 4]).at(&[3, 2]).unwrap() as usize;
    for (pos, &value) in data.iter().enumerate() {
        if pos == expected_pos {
            assert_eq!(value, 1.0);
        } else {
            assert_eq!(value, 0.0, "unexpected write at {pos}");
        }
    }
}

#[test]
fn test_pack_splits_full_groups_and_leftovers() {
    let func = Function::new("f", vec![Param::new("buf", Ty::Ptr(DType::Float32))]);
    let base = func.param(0).unwrap();

    let mut arena = ViewArena::new();
    let view = arena.create(base, DType::Float32, Shape::new(&[10]));

    let packed = arena.pack(view, 4).unwrap();
    assert_eq!(packed.groups, 2);
    assert_eq!(packed.leftover, 2);

    let exact = arena.pack(view, 5).unwrap();
    assert_eq!(exact.groups, 2);
    assert_eq!(exact.leftover, 0);
}

#[test]
fn test_pack_rejects_zero_width() {
    let func = Function::new("f", vec![Param::new("buf", Ty::Ptr(DType::Float32))]);
    let base = func.param(0).unwrap();

    let mut arena = ViewArena::new();
    let view = arena.create(base, DType::Float32, Shape::new(&[10]));
    assert!(matches!(arena.pack(view, 0), Err(Error::ZeroPackWidth)));
}

#[test]
fn test_flatten_records_parent() {
    let func = Function::new("f", vec![Param::new("buf", Ty::Ptr(DType::Float32))]);
    let base = func.param(0).unwrap();

    let mut arena = ViewArena::new();
    let view = arena.create(base, DType::Float32, Shape::new(&[2, 5]));
    let flat = arena.flatten(view).unwrap();

    let flat_view = arena.get(flat).unwrap();
    assert_eq!(flat_view.parent, Some(view));
    assert_eq!(flat_view.shape.dims(), &[10]);
}
