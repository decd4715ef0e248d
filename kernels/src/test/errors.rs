use tessel_codegen::Error as CodegenError;
use tessel_graph::{Error as GraphError, Graph, OperatorKind, Shape};
use tessel_ir::{DType, Module};

use super::compile;

#[test]
fn test_gemm_inner_dimension_mismatch_fails_before_emission() {
    let mut graph = Graph::new();
    let a = graph.add_variable("a", DType::Float32, Shape::new(&[4, 3]));
    let b = graph.add_variable("b", DType::Float32, Shape::new(&[2, 3]));
    let gemm = graph.add_operation("gemm", OperatorKind::Gemm, vec![a, b]).unwrap();

    let mut module = Module::new("m");
    let err = compile(&mut graph, &mut module, "bad_gemm", &[gemm]).unwrap_err();

    assert!(matches!(err, CodegenError::Graph { source: GraphError::OperatorArgument { .. } }), "{err}");
    // The whole compilation aborted; no function was recorded.
    assert!(!module.has_function("bad_gemm"));
}

#[test]
fn test_gemm_dtype_mismatch() {
    let mut graph = Graph::new();
    let a = graph.add_variable("a", DType::Float32, Shape::new(&[2, 2]));
    let b = graph.add_variable("b", DType::Float64, Shape::new(&[2, 2]));
    let gemm = graph.add_operation("gemm", OperatorKind::Gemm, vec![a, b]).unwrap();

    let mut module = Module::new("m");
    let err = compile(&mut graph, &mut module, "bad_gemm", &[gemm]).unwrap_err();
    assert!(matches!(err, CodegenError::Graph { source: GraphError::OperatorArgument { .. } }));
}

#[test]
fn test_eltwise_shape_mismatch() {
    let mut graph = Graph::new();
    let a = graph.add_variable("a", DType::Float32, Shape::new(&[4]));
    let b = graph.add_variable("b", DType::Float32, Shape::new(&[5]));
    let add = graph.add_operation("add", OperatorKind::Add, vec![a, b]).unwrap();

    let mut module = Module::new("m");
    let err = compile(&mut graph, &mut module, "bad_add", &[add]).unwrap_err();
    assert!(matches!(err, CodegenError::Graph { source: GraphError::OperatorArgument { .. } }));
}

#[test]
fn test_sum_rejects_integer_input() {
    let mut graph = Graph::new();
    let a = graph.add_variable("a", DType::Int64, Shape::new(&[4]));
    let sum = graph.add_operation("sum", OperatorKind::Sum, vec![a]).unwrap();

    let mut module = Module::new("m");
    let err = compile(&mut graph, &mut module, "bad_sum", &[sum]).unwrap_err();
    assert!(matches!(err, CodegenError::Graph { source: GraphError::OperatorArgument { .. } }));
}

#[test]
fn test_duplicate_function_name() {
    let mut module = Module::new("m");

    let mut graph = Graph::new();
    let a = graph.add_variable("a", DType::Float32, Shape::new(&[4]));
    let b = graph.add_variable("b", DType::Float32, Shape::new(&[4]));
    let add = graph.add_operation("add", OperatorKind::Add, vec![a, b]).unwrap();
    compile(&mut graph, &mut module, "kernel", &[add]).unwrap();

    let mut graph2 = Graph::new();
    let c = graph2.add_variable("c", DType::Float32, Shape::new(&[4]));
    let d = graph2.add_variable("d", DType::Float32, Shape::new(&[4]));
    let add2 = graph2.add_operation("add", OperatorKind::Add, vec![c, d]).unwrap();
    let err = compile(&mut graph2, &mut module, "kernel", &[add2]).unwrap_err();

    assert!(matches!(err, CodegenError::Ir { source: tessel_ir::Error::DuplicateFunction { .. } }));
}

#[test]
fn test_unregistered_operator_kind() {
    let mut graph = Graph::new();
    let a = graph.add_variable("a", DType::Float32, Shape::new(&[4]));
    let b = graph.add_variable("b", DType::Float32, Shape::new(&[4]));
    let add = graph.add_operation("add", OperatorKind::Add, vec![a, b]).unwrap();

    // An empty registry has no factory for Add.
    let registry = tessel_graph::Registry::new();
    let mut module = Module::new("m");
    let err = tessel_codegen::FunctionAssembler::new(&mut graph, &registry, &mut module)
        .codegen_tree("kernel", &[add])
        .unwrap_err();
    assert!(matches!(
        err,
        CodegenError::Graph { source: GraphError::UnknownOperator { kind: OperatorKind::Add } }
    ));
}
