mod node;
mod props;
mod shape;
mod view;

use tessel_ir::inst::ConstValue;
use tessel_ir::{interp, Builder, Function, Module};

use crate::shape::Shape;

/// Emit `shape.emit_at(idx)` into a fresh function, execute it, and return
/// the computed offset.
pub(crate) fn eval_emit_at(shape: &Shape, idx: &[u64]) -> u64 {
    let mut module = Module::new("test");
    let mut func = Function::new("at", vec![]);
    {
        let mut builder = Builder::new(&mut func);
        let entry = builder.create_block("entry");
        builder.position_at_end(entry);
        let idx_vals: Vec<_> = idx.iter().map(|&v| builder.index_const(v)).collect();
        let offset = shape.emit_at(&mut builder, &idx_vals).unwrap();
        builder.ret(Some(offset)).unwrap();
    }
    let id = module.add_function(func).unwrap();
    match interp::run(&module, id, vec![]).unwrap().ret {
        Some(ConstValue::Int(v)) => v as u64,
        other => panic!("expected integer offset, got {other:?}"),
    }
}

/// Same, but through the runtime-dimension path: the dimensions are fed to
/// the shape as codegen-time values.
pub(crate) fn eval_emit_at_runtime(dims: &[u64], idx: &[u64]) -> u64 {
    let mut module = Module::new("test");
    let mut func = Function::new("at_rt", vec![]);
    {
        let mut builder = Builder::new(&mut func);
        let entry = builder.create_block("entry");
        builder.position_at_end(entry);
        let dim_vals: Vec<_> = dims.iter().map(|&v| builder.index_const(v)).collect();
        let shape = Shape::with_runtime(dims, &dim_vals).unwrap();
        let idx_vals: Vec<_> = idx.iter().map(|&v| builder.index_const(v)).collect();
        let offset = shape.emit_at(&mut builder, &idx_vals).unwrap();
        builder.ret(Some(offset)).unwrap();
    }
    let id = module.add_function(func).unwrap();
    match interp::run(&module, id, vec![]).unwrap().ret {
        Some(ConstValue::Int(v)) => v as u64,
        other => panic!("expected integer offset, got {other:?}"),
    }
}
