//! The populated operator registry.

use tessel_graph::{OperatorKind, Registry};

/// Registry with every built-in kernel registered. Built once by the caller
/// and passed explicitly to the assembler.
pub fn default_registry() -> Registry {
    let mut registry = Registry::new();
    registry.register(OperatorKind::Gemm, crate::gemm::build);
    registry.register(OperatorKind::Add, crate::eltwise::build_add);
    registry.register(OperatorKind::Mul, crate::eltwise::build_mul);
    registry.register(OperatorKind::Sum, crate::reduce::build);
    registry
}
