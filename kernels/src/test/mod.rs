mod errors;

use tessel_codegen::FunctionAssembler;
use tessel_graph::{Graph, NodeId};
use tessel_ir::{FuncId, Module};

use crate::default_registry;

/// Assemble one function from `outputs` into `module`.
pub(crate) fn compile(
    graph: &mut Graph,
    module: &mut Module,
    name: &str,
    outputs: &[NodeId],
) -> tessel_codegen::Result<FuncId> {
    let registry = default_registry();
    FunctionAssembler::new(graph, &registry, module).codegen_tree(name, outputs)
}
