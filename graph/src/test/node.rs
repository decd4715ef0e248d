use tessel_ir::{DType, Function, Param, Ty};

use crate::error::Error;
use crate::node::Graph;
use crate::operator::OperatorKind;
use crate::shape::Shape;
use crate::view::ViewArena;

#[test]
fn test_variable_binds_exactly_once() {
    let func = Function::new("f", vec![Param::new("a", Ty::Ptr(DType::Float32))]);
    let base = func.param(0).unwrap();

    let mut arena = ViewArena::new();
    let view = arena.create(base, DType::Float32, Shape::new(&[4]));
    let other = arena.create(base, DType::Float32, Shape::new(&[4]));

    let mut graph = Graph::new();
    let a = graph.add_variable("a", DType::Float32, Shape::new(&[4]));

    assert!(matches!(graph.variable(a).unwrap().binding(), Err(Error::Unbound { .. })));
    graph.variable_mut(a).unwrap().bind(view).unwrap();
    assert_eq!(graph.variable(a).unwrap().binding().unwrap(), view);

    let err = graph.variable_mut(a).unwrap().bind(other).unwrap_err();
    assert!(matches!(err, Error::AlreadyBound { .. }));
}

#[test]
fn test_node_kind_is_matched_explicitly() {
    let mut graph = Graph::new();
    let a = graph.add_variable("a", DType::Float32, Shape::new(&[4]));
    let b = graph.add_variable("b", DType::Float32, Shape::new(&[4]));
    let add = graph.add_operation("add", OperatorKind::Add, vec![a, b]).unwrap();

    assert!(matches!(graph.variable(add), Err(Error::ExpectedVariable { .. })));
    assert!(matches!(graph.operation(a), Err(Error::ExpectedOperation { .. })));
}

#[test]
fn test_output_variable_requires_resolution() {
    let mut graph = Graph::new();
    let a = graph.add_variable("a", DType::Float32, Shape::new(&[4]));
    let add = graph.add_operation("add", OperatorKind::Add, vec![a, a]).unwrap();

    // A variable is its own value; an unresolved operation has no output yet.
    assert_eq!(graph.output_variable(a).unwrap(), a);
    assert!(matches!(graph.output_variable(add), Err(Error::OperatorUnresolved { .. })));
}

#[test]
fn test_free_variable_classification() {
    let mut graph = Graph::new();
    let a = graph.add_variable("a", DType::Float32, Shape::new(&[4]));
    let op = graph.add_operation("sum", OperatorKind::Sum, vec![a]).unwrap();
    let out = graph.add_produced_variable("sum_out", DType::Float32, Shape::new(&[1]), op);

    assert!(graph.variable(a).unwrap().is_free());
    assert!(!graph.variable(out).unwrap().is_free());
    assert_eq!(graph.variable(out).unwrap().creator, Some(op));
}
