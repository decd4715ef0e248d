//! The operator capability contract and the factory registry.
//!
//! Each kernel kind (GEMM, element-wise, reduction) implements [`Operator`]
//! and plugs into the lowering uniformly. The registry is an explicit value
//! mapping a kind tag to a factory function; it is populated once and
//! passed to the scheduler/visitor, never consulted as ambient state.

use std::collections::HashMap;
use std::fmt;

use tessel_ir::{BlockId, Builder, DType};

use crate::error::{Error, Result};
use crate::node::{Graph, NodeId};
use crate::shape::Shape;
use crate::view::ViewArena;

/// Kind tag for operator resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(strum::AsRefStr, strum::EnumIter)]
pub enum OperatorKind {
    /// Matrix multiply `[M,K] x [K,N] -> [M,N]`.
    Gemm,
    /// Element-wise addition.
    Add,
    /// Element-wise multiplication.
    Mul,
    /// Full sum reduction to a single element.
    Sum,
}

/// Everything an operator lowering may touch: the (read-only) graph for its
/// input bindings, the view arena, and the positioned builder.
pub struct LowerCtx<'a, 'f> {
    pub graph: &'a Graph,
    pub arena: &'a mut ViewArena,
    pub builder: &'a mut Builder<'f>,
}

/// A resolved kernel bound to concrete input variables.
///
/// Construction (via a registry factory) validates input compatibility and
/// creates the output variable; [`Operator::lower`] emits the kernel's loop
/// nests starting after `previous` and returns the block the next operation
/// continues from.
pub trait Operator: fmt::Debug {
    fn kind(&self) -> OperatorKind;

    /// The operation's single output variable.
    fn output_var(&self) -> NodeId;

    fn output_dtype(&self) -> DType;

    fn output_shape(&self) -> &Shape;

    fn lower(&self, ctx: &mut LowerCtx<'_, '_>, previous: BlockId) -> Result<BlockId>;
}

/// Factory invoked at resolution time. `inputs` are the operation's inputs
/// already resolved to concrete variables, in order.
pub type OperatorFactory = fn(&mut Graph, NodeId, &[NodeId]) -> Result<Box<dyn Operator>>;

/// Explicit map from operator kind to factory.
#[derive(Default)]
pub struct Registry {
    factories: HashMap<OperatorKind, OperatorFactory>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: OperatorKind, factory: OperatorFactory) {
        self.factories.insert(kind, factory);
    }

    /// Resolve one scheduled operation: look up the factory for its kind,
    /// resolve its inputs to concrete variables (producers are resolved
    /// already, guaranteed by schedule order), and construct the operator.
    /// The factory validates shape/type compatibility and creates the
    /// output variable; nothing is emitted here.
    pub fn resolve(&self, graph: &mut Graph, op_id: NodeId) -> Result<Box<dyn Operator>> {
        let (kind, name, inputs) = {
            let op = graph.operation(op_id)?;
            (op.kind, op.name.clone(), op.inputs.clone())
        };
        let factory = self.factories.get(&kind).ok_or(Error::UnknownOperator { kind })?;
        let resolved: Vec<NodeId> =
            inputs.iter().map(|&input| graph.output_variable(input)).collect::<Result<_>>()?;
        tracing::debug!(operation = %name, kind = kind.as_ref(), "resolving operator");
        factory(graph, op_id, &resolved)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry").field("kinds", &self.factories.keys().collect::<Vec<_>>()).finish()
    }
}
