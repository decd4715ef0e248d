use tessel_graph::{Error, Shape};
use tessel_ir::interp::{self, ArgValue};
use tessel_ir::{Builder, DType, Function, LoopMetadata, Module, Param, Ty};

use crate::loops::{Loop, LoopNest};

#[test]
fn test_induction_before_head_fails() {
    let mut func = Function::new("f", vec![]);
    let mut builder = Builder::new(&mut func);
    let entry = builder.create_block("entry");
    builder.position_at_end(entry);

    let l = Loop::counted(&mut builder, "i", 4);
    let err = l.induction().unwrap_err();
    assert!(matches!(err, Error::LoopPhase { operation: "induction", .. }));
}

#[test]
fn test_tail_before_head_fails() {
    let mut func = Function::new("f", vec![]);
    let mut builder = Builder::new(&mut func);
    let entry = builder.create_block("entry");
    builder.position_at_end(entry);

    let mut l = Loop::counted(&mut builder, "i", 4);
    let exit = builder.create_block("exit");
    let err = l.emit_tail(&mut builder, exit).unwrap_err();
    assert!(matches!(err, Error::LoopPhase { operation: "emit_tail", .. }));
}

#[test]
fn test_head_twice_fails() {
    let mut func = Function::new("f", vec![]);
    let mut builder = Builder::new(&mut func);
    let entry = builder.create_block("entry");
    builder.position_at_end(entry);

    let mut l = Loop::counted(&mut builder, "i", 4);
    l.emit_head(&mut builder).unwrap();
    let err = l.emit_head(&mut builder).unwrap_err();
    assert!(matches!(err, Error::LoopPhase { operation: "emit_head", .. }));
}

#[test]
fn test_documented_sequence_succeeds() {
    let mut func = Function::new("f", vec![]);
    let mut builder = Builder::new(&mut func);
    let entry = builder.create_block("entry");
    builder.position_at_end(entry);

    let mut l = Loop::counted(&mut builder, "i", 4);
    let induction = l.emit_head(&mut builder).unwrap();
    assert_eq!(l.induction().unwrap(), induction);
    let exit = builder.create_block("exit");
    let info = l.emit_tail(&mut builder, exit).unwrap();
    assert_eq!(info.induction, induction);
    builder.ret(None).unwrap();
}

#[test]
fn test_metadata_after_tail_fails() {
    let mut func = Function::new("f", vec![]);
    let mut builder = Builder::new(&mut func);
    let entry = builder.create_block("entry");
    builder.position_at_end(entry);

    let mut l = Loop::counted(&mut builder, "i", 4);
    l.emit_head(&mut builder).unwrap();
    let exit = builder.create_block("exit");
    l.emit_tail(&mut builder, exit).unwrap();

    let md = LoopMetadata::builder().unroll(2u32).build();
    let err = l.set_metadata(md).unwrap_err();
    assert!(matches!(err, Error::LoopPhase { operation: "set_metadata", .. }));
}

#[test]
fn test_metadata_lands_on_exit_branch() {
    let mut func = Function::new("f", vec![]);
    {
        let mut builder = Builder::new(&mut func);
        let entry = builder.create_block("entry");
        builder.position_at_end(entry);

        let mut l = Loop::counted(&mut builder, "i", 4);
        l.set_metadata(LoopMetadata::builder().vector_width(8u32).build()).unwrap();
        l.emit_head(&mut builder).unwrap();
        let exit = builder.create_block("exit");
        l.emit_tail(&mut builder, exit).unwrap();
        builder.ret(None).unwrap();
    }
    let text = func.to_string();
    assert!(text.contains("!vector_width(8)"), "{text}");
}

#[test]
fn test_two_level_nest_combined_index() {
    // Iterating (i, j) over [0,4) x [0,4), the combined index must hit a
    // flattened [4,4] buffer at i*4 + j.
    let mut module = Module::new("m");
    let mut func = Function::new("fill", vec![Param::new("out", Ty::Ptr(DType::Index))]);
    let out = func.param(0).unwrap();
    {
        let mut builder = Builder::new(&mut func);
        let entry = builder.create_block("entry");
        builder.position_at_end(entry);

        let mut nest = LoopNest::counted(&mut builder, "it", &[4, 4]).unwrap();
        nest.enter(&mut builder).unwrap();
        let index = nest.combined_index(&mut builder, &Shape::new(&[4, 4])).unwrap();
        let slot = builder.ptr_offset(out, index).unwrap();
        builder.store(slot, index).unwrap();
        nest.exit(&mut builder).unwrap();

        builder.ret(None).unwrap();
    }
    let id = module.add_function(func).unwrap();

    let outcome = interp::run(&module, id, vec![ArgValue::buffer_i64(&[0; 16])]).unwrap();
    let expected: Vec<i64> = (0..16).collect();
    assert_eq!(outcome.buffer_i64(0), expected);
}

#[test]
fn test_nest_runs_in_row_major_order() {
    // Record the visit order: position k receives combined index k, and the
    // inner level varies fastest.
    let mut module = Module::new("m");
    let mut func = Function::new("order", vec![Param::new("out", Ty::Ptr(DType::Index))]);
    let out = func.param(0).unwrap();
    {
        let mut builder = Builder::new(&mut func);
        let entry = builder.create_block("entry");
        builder.position_at_end(entry);

        // Counter slot tracks how many iterations have run.
        let counter = builder.stack_alloc(DType::Index, 1).unwrap();
        let zero = builder.index_const(0);
        builder.store(counter, zero).unwrap();

        let mut nest = LoopNest::counted(&mut builder, "it", &[2, 3]).unwrap();
        nest.enter(&mut builder).unwrap();
        let index = nest.combined_index(&mut builder, &Shape::new(&[2, 3])).unwrap();
        let k = builder.load(counter).unwrap();
        let slot = builder.ptr_offset(out, k).unwrap();
        builder.store(slot, index).unwrap();
        let one = builder.index_const(1);
        let k_next = builder.iadd(k, one).unwrap();
        builder.store(counter, k_next).unwrap();
        nest.exit(&mut builder).unwrap();

        builder.ret(None).unwrap();
    }
    let id = module.add_function(func).unwrap();

    let outcome = interp::run(&module, id, vec![ArgValue::buffer_i64(&[0; 6])]).unwrap();
    assert_eq!(outcome.buffer_i64(0), vec![0, 1, 2, 3, 4, 5]);
}
