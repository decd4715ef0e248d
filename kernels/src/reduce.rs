//! Full sum reduction to a single element.
//!
//! The output is a `[1]` tensor; the accumulator lives in the output buffer
//! itself (naive per-tensor storage), zero-initialized before the loop.

use tessel_codegen::Loop;
use tessel_graph::error::{OperatorArgumentSnafu, Result};
use tessel_graph::{Graph, LowerCtx, NodeId, Operator, OperatorKind, Shape};
use tessel_ir::{BlockId, DType};

#[derive(Debug)]
pub struct SumReduce {
    name: String,
    input: NodeId,
    output: NodeId,
    dtype: DType,
    shape: Shape,
    size: u64,
}

/// Registry factory for [`OperatorKind::Sum`].
pub fn build(graph: &mut Graph, op_id: NodeId, inputs: &[NodeId]) -> Result<Box<dyn Operator>> {
    let name = graph.operation(op_id)?.name.clone();
    if inputs.len() != 1 {
        return OperatorArgumentSnafu {
            operator: name,
            message: format!("expected 1 input, got {}", inputs.len()),
        }
        .fail();
    }

    let (size, contiguous, dtype) = {
        let var = graph.variable(inputs[0])?;
        (var.shape.size(), var.shape.is_contiguous(), var.dtype)
    };
    if !contiguous {
        return OperatorArgumentSnafu { operator: name, message: "input must be contiguous".to_owned() }.fail();
    }
    if !dtype.is_float() {
        return OperatorArgumentSnafu {
            operator: name,
            message: format!("input must have a float dtype, got {dtype}"),
        }
        .fail();
    }

    let shape = Shape::new(&[1]);
    let output = graph.add_produced_variable(format!("{name}_out"), dtype, shape.clone(), op_id);

    Ok(Box::new(SumReduce { name, input: inputs[0], output, dtype, shape, size }))
}

impl Operator for SumReduce {
    fn kind(&self) -> OperatorKind {
        OperatorKind::Sum
    }

    fn output_var(&self) -> NodeId {
        self.output
    }

    fn output_dtype(&self) -> DType {
        self.dtype
    }

    fn output_shape(&self) -> &Shape {
        &self.shape
    }

    fn lower(&self, ctx: &mut LowerCtx<'_, '_>, previous: BlockId) -> Result<BlockId> {
        let src = ctx.graph.variable(self.input)?.binding()?;
        let out = ctx.graph.variable(self.output)?.binding()?;

        let out_ptr = ctx.arena.element_ptr_at(ctx.builder, out, &[0])?;
        let zero = ctx.builder.const_float(self.dtype, 0.0);
        ctx.builder.store(out_ptr, zero)?;

        if self.size == 0 {
            return Ok(previous);
        }

        let flat = ctx.arena.flatten(src)?;
        let mut sum_loop = Loop::counted(ctx.builder, format!("{}_acc", self.name), self.size);
        sum_loop.emit_head(ctx.builder)?;
        let i = sum_loop.induction()?;

        let elem_ptr = ctx.arena.element_ptr(ctx.builder, flat, &[i])?;
        let elem = ctx.builder.load(elem_ptr)?;
        let acc = ctx.builder.load(out_ptr)?;
        let next = ctx.builder.fadd(acc, elem)?;
        ctx.builder.store(out_ptr, next)?;

        let exit = ctx.builder.create_block(format!("{}_exit", self.name));
        sum_loop.emit_tail(ctx.builder, exit)?;
        Ok(exit)
    }
}
