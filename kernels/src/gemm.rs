//! Matrix-multiply kernel: `[M,K] x [K,N] -> [M,N]`.
//!
//! Lowered as an (i, j) nest with an inner k accumulation through the
//! output buffer: `C[i,j] = 0; for k { C[i,j] += A[i,k] * B[k,j] }`.
//! Input compatibility is rejected at resolution, before anything is
//! emitted.

use tessel_codegen::{Loop, LoopNest};
use tessel_graph::error::{OperatorArgumentSnafu, Result};
use tessel_graph::{Graph, LowerCtx, NodeId, Operator, OperatorKind, Shape};
use tessel_ir::{BlockId, DType};

#[derive(Debug)]
pub struct Gemm {
    name: String,
    lhs: NodeId,
    rhs: NodeId,
    output: NodeId,
    dtype: DType,
    shape: Shape,
    m: u64,
    k: u64,
    n: u64,
}

/// Registry factory for [`OperatorKind::Gemm`].
pub fn build(graph: &mut Graph, op_id: NodeId, inputs: &[NodeId]) -> Result<Box<dyn Operator>> {
    let name = graph.operation(op_id)?.name.clone();
    if inputs.len() != 2 {
        return OperatorArgumentSnafu {
            operator: name,
            message: format!("expected 2 inputs, got {}", inputs.len()),
        }
        .fail();
    }

    let (lhs_dims, lhs_dtype) = {
        let var = graph.variable(inputs[0])?;
        (var.shape.dims().to_vec(), var.dtype)
    };
    let (rhs_dims, rhs_dtype) = {
        let var = graph.variable(inputs[1])?;
        (var.shape.dims().to_vec(), var.dtype)
    };

    if lhs_dims.len() != 2 || rhs_dims.len() != 2 {
        return OperatorArgumentSnafu {
            operator: name,
            message: format!("inputs must be rank 2, got {lhs_dims:?} and {rhs_dims:?}"),
        }
        .fail();
    }
    if lhs_dims[1] != rhs_dims[0] {
        return OperatorArgumentSnafu {
            operator: name,
            message: format!("inner dimensions disagree: lhs is {lhs_dims:?}, rhs is {rhs_dims:?}"),
        }
        .fail();
    }
    if lhs_dtype != rhs_dtype || !lhs_dtype.is_float() {
        return OperatorArgumentSnafu {
            operator: name,
            message: format!("inputs must share a float dtype, got {lhs_dtype} and {rhs_dtype}"),
        }
        .fail();
    }

    let (m, k, n) = (lhs_dims[0], lhs_dims[1], rhs_dims[1]);
    tracing::debug!(operator = %name, m, k, n, "resolved gemm");
    let shape = Shape::new(&[m, n]);
    let output = graph.add_produced_variable(format!("{name}_out"), lhs_dtype, shape.clone(), op_id);

    Ok(Box::new(Gemm { name, lhs: inputs[0], rhs: inputs[1], output, dtype: lhs_dtype, shape, m, k, n }))
}

impl Operator for Gemm {
    fn kind(&self) -> OperatorKind {
        OperatorKind::Gemm
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

        if self.m == 0 || self.n == 0 {
            return Ok(previous);
        }

        let mut nest = LoopNest::counted(ctx.builder, &format!("{}_ij", self.name), &[self.m, self.n])?;
        nest.enter(ctx.builder)?;
        let i = nest.induction(0)?;
        let j = nest.induction(1)?;

        let c_ptr = ctx.arena.element_ptr(ctx.builder, c, &[i, j])?;
        let zero = ctx.builder.const_float(self.dtype, 0.0);
        ctx.builder.store(c_ptr, zero)?;

        if self.k > 0 {
            let mut k_loop = Loop::counted(ctx.builder, format!("{}_k", self.name), self.k);
            k_loop.emit_head(ctx.builder)?;
            let kv = k_loop.induction()?;

            let a_ptr = ctx.arena.element_ptr(ctx.builder, a, &[i, kv])?;
            let a_val = ctx.builder.load(a_ptr)?;
            let b_ptr = ctx.arena.element_ptr(ctx.builder, b, &[kv, j])?;
            let b_val = ctx.builder.load(b_ptr)?;
            let prod = ctx.builder.fmul(a_val, b_val)?;
            let acc = ctx.builder.load(c_ptr)?;
            let sum = ctx.builder.fadd(acc, prod)?;
            ctx.builder.store(c_ptr, sum)?;

            let k_exit = ctx.builder.create_block(format!("{}_k_exit", self.name));
            k_loop.emit_tail(ctx.builder, k_exit)?;
        }

        nest.exit(ctx.builder)
    }
}
