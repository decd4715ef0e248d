//! Element-wise binary kernels over flattened views.
//!
//! Both inputs are flattened and packed into fixed-width lane groups; a
//! vector-hinted loop processes full groups, and a scalar loop mops up the
//! leftovers. The group width is the advisory vectorization width attached
//! to the group loop's exit branch.

use tessel_codegen::Loop;
use tessel_graph::error::{OperatorArgumentSnafu, Result};
use tessel_graph::{Graph, LowerCtx, NodeId, Operator, OperatorKind, Shape};
use tessel_ir::{BlockId, DType, LoopMetadata};

/// Lanes processed per group-loop iteration.
const VECTOR_WIDTH: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Arith {
    Add,
    Mul,
}

#[derive(Debug)]
pub struct Eltwise {
    name: String,
    arith: Arith,
    lhs: NodeId,
    rhs: NodeId,
    output: NodeId,
    dtype: DType,
    shape: Shape,
    width: u32,
}

/// Registry factory for [`OperatorKind::Add`].
pub fn build_add(graph: &mut Graph, op_id: NodeId, inputs: &[NodeId]) -> Result<Box<dyn Operator>> {
    build(graph, op_id, inputs, Arith::Add)
}

/// Registry factory for [`OperatorKind::Mul`].
pub fn build_mul(graph: &mut Graph, op_id: NodeId, inputs: &[NodeId]) -> Result<Box<dyn Operator>> {
    build(graph, op_id, inputs, Arith::Mul)
}

fn build(graph: &mut Graph, op_id: NodeId, inputs: &[NodeId], arith: Arith) -> Result<Box<dyn Operator>> {
    let name = graph.operation(op_id)?.name.clone();
    if inputs.len() != 2 {
        return OperatorArgumentSnafu {
            operator: name,
            message: format!("expected 2 inputs, got {}", inputs.len()),
        }
        .fail();
    }

    let (lhs_dims, lhs_contiguous, lhs_dtype) = {
        let var = graph.variable(inputs[0])?;
        (var.shape.dims().to_vec(), var.shape.is_contiguous(), var.dtype)
    };
    let (rhs_dims, rhs_contiguous, rhs_dtype) = {
        let var = graph.variable(inputs[1])?;
        (var.shape.dims().to_vec(), var.shape.is_contiguous(), var.dtype)
    };

    if lhs_dims != rhs_dims {
        return OperatorArgumentSnafu {
            operator: name,
            message: format!("input shapes disagree: {lhs_dims:?} vs {rhs_dims:?}"),
        }
        .fail();
    }
    if !lhs_contiguous || !rhs_contiguous {
        return OperatorArgumentSnafu { operator: name, message: "inputs must be contiguous".to_owned() }.fail();
    }
    if lhs_dtype != rhs_dtype || !lhs_dtype.is_float() {
        return OperatorArgumentSnafu {
            operator: name,
            message: format!("inputs must share a float dtype, got {lhs_dtype} and {rhs_dtype}"),
        }
        .fail();
    }

    let shape = Shape::new(&lhs_dims);
    tracing::debug!(operator = %name, size = shape.size(), ?arith, "resolved eltwise");
    let output = graph.add_produced_variable(format!("{name}_out"), lhs_dtype, shape.clone(), op_id);

    Ok(Box::new(Eltwise {
        name,
        arith,
        lhs: inputs[0],
        rhs: inputs[1],
        output,
        dtype: lhs_dtype,
        shape,
        width: VECTOR_WIDTH,
    }))
}

impl Eltwise {
    fn combine(
        &self,
        ctx: &mut LowerCtx<'_, '_>,
        lhs: tessel_ir::ValueId,
        rhs: tessel_ir::ValueId,
    ) -> Result<tessel_ir::ValueId> {
        match self.arith {
            Arith::Add => Ok(ctx.builder.fadd(lhs, rhs)?),
            Arith::Mul => Ok(ctx.builder.fmul(lhs, rhs)?),
        }
    }
}

impl Operator for Eltwise {
    fn kind(&self) -> OperatorKind {
        match self.arith {
            Arith::Add => OperatorKind::Add,
            Arith::Mul => OperatorKind::Mul,
        }
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
        let a = ctx.graph.variable(self.lhs)?.binding()?;
        let b = ctx.graph.variable(self.rhs)?.binding()?;
        let c = ctx.graph.variable(self.output)?.binding()?;

        let flat_a = ctx.arena.flatten(a)?;
        let flat_b = ctx.arena.flatten(b)?;
        let flat_c = ctx.arena.flatten(c)?;

        let packed_a = ctx.arena.pack(flat_a, self.width)?;
        let packed_b = ctx.arena.pack(flat_b, self.width)?;
        let packed_c = ctx.arena.pack(flat_c, self.width)?;

        if packed_a.groups == 0 && packed_a.leftover == 0 {
            return Ok(previous);
        }

        if packed_a.groups > 0 {
            let mut group_loop = Loop::counted(ctx.builder, format!("{}_vec", self.name), packed_a.groups);
            group_loop.set_metadata(LoopMetadata::builder().vector_width(self.width).build())?;
            group_loop.emit_head(ctx.builder)?;
            let group = group_loop.induction()?;

            let a_base = packed_a.group_base(ctx.arena, ctx.builder, group)?;
            let b_base = packed_b.group_base(ctx.arena, ctx.builder, group)?;
            let c_base = packed_c.group_base(ctx.arena, ctx.builder, group)?;
            for lane in 0..u64::from(self.width) {
                let lane_off = ctx.builder.index_const(lane);
                let a_ptr = ctx.builder.ptr_offset(a_base, lane_off)?;
                let a_val = ctx.builder.load(a_ptr)?;
                let b_ptr = ctx.builder.ptr_offset(b_base, lane_off)?;
                let b_val = ctx.builder.load(b_ptr)?;
                let result = self.combine(ctx, a_val, b_val)?;
                let c_ptr = ctx.builder.ptr_offset(c_base, lane_off)?;
                ctx.builder.store(c_ptr, result)?;
            }

            let exit = ctx.builder.create_block(format!("{}_vec_exit", self.name));
            group_loop.emit_tail(ctx.builder, exit)?;
        }

        if packed_a.leftover > 0 {
            let mut rest_loop = Loop::counted(ctx.builder, format!("{}_rest", self.name), packed_a.leftover);
            rest_loop.emit_head(ctx.builder)?;
            let r = rest_loop.induction()?;

            let first_rest = ctx.builder.index_const(packed_a.groups * u64::from(self.width));
            let idx = ctx.builder.iadd(first_rest, r)?;
            let a_ptr = ctx.arena.element_ptr(ctx.builder, flat_a, &[idx])?;
            let a_val = ctx.builder.load(a_ptr)?;
            let b_ptr = ctx.arena.element_ptr(ctx.builder, flat_b, &[idx])?;
            let b_val = ctx.builder.load(b_ptr)?;
            let result = self.combine(ctx, a_val, b_val)?;
            let c_ptr = ctx.arena.element_ptr(ctx.builder, flat_c, &[idx])?;
            ctx.builder.store(c_ptr, result)?;

            let exit = ctx.builder.create_block(format!("{}_rest_exit", self.name));
            rest_loop.emit_tail(ctx.builder, exit)?;
        }

        Ok(ctx.builder.current_block()?)
    }
}
