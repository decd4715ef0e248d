//! Property tests for the index algebra and the scheduler.

use proptest::prelude::*;

use tessel_ir::DType;

use crate::node::Graph;
use crate::operator::OperatorKind;
use crate::schedule::build_schedule;
use crate::shape::Shape;

use super::{eval_emit_at, eval_emit_at_runtime};

/// Dimensions 1..=6 in ranks 0..=4, with a valid index tuple.
fn arb_dims_and_index() -> impl Strategy<Value = (Vec<u64>, Vec<u64>)> {
    prop::collection::vec(1u64..=6, 0..=4).prop_flat_map(|dims| {
        let idx = dims.iter().map(|&d| 0..d).collect::<Vec<_>>();
        (Just(dims), idx)
    })
}

proptest! {
    /// The core correctness property: the compile-time affine offset and
    /// the executed, emitted instruction sequence agree, through both the
    /// constant-stride and the runtime-dimension paths.
    #[test]
    fn prop_affine_index_agreement((dims, idx) in arb_dims_and_index()) {
        let shape = Shape::new(&dims);
        let expected = shape.at(&idx).unwrap();
        prop_assert_eq!(eval_emit_at(&shape, &idx), expected);
        prop_assert_eq!(eval_emit_at_runtime(&dims, &idx), expected);
    }

    #[test]
    fn prop_flatten_preserves_size(dims in prop::collection::vec(1u64..=6, 0..=4)) {
        let shape = Shape::new(&dims);
        let flat = shape.flatten().unwrap();
        prop_assert_eq!(flat.ndim(), 1);
        prop_assert_eq!(flat.size(), shape.size());
    }

    /// Random layered DAGs: every operation is scheduled exactly once, and
    /// always after the operations whose output it consumes.
    #[test]
    fn prop_schedule_is_topological(
        var_count in 1usize..4,
        op_inputs in prop::collection::vec(prop::collection::vec(0usize..100, 1..=3), 1..8),
    ) {
        let mut graph = Graph::new();
        let mut pool = Vec::new();
        for i in 0..var_count {
            pool.push(graph.add_variable(format!("v{i}"), DType::Float32, Shape::new(&[4])));
        }
        let mut ops = Vec::new();
        for (i, inputs) in op_inputs.iter().enumerate() {
            let chosen: Vec<_> = inputs.iter().map(|&pick| pool[pick % pool.len()]).collect();
            let op = graph.add_operation(format!("op{i}"), OperatorKind::Add, chosen).unwrap();
            pool.push(op);
            ops.push(op);
        }
        let root = *ops.last().unwrap();

        let schedule = build_schedule(&graph, &[root]).unwrap();

        // Exactly once.
        let mut seen = std::collections::HashSet::new();
        for &op in &schedule.ops {
            prop_assert!(seen.insert(op));
        }

        // Producers precede consumers.
        let position: std::collections::HashMap<_, _> =
            schedule.ops.iter().enumerate().map(|(i, &op)| (op, i)).collect();
        for &op in &schedule.ops {
            let inputs = graph.operation(op).unwrap().inputs.clone();
            for input in inputs {
                if graph.operation(input).is_ok() {
                    prop_assert!(position[&input] < position[&op]);
                }
            }
        }

        // Free variables are unique.
        let mut free = std::collections::HashSet::new();
        for &var in &schedule.free_vars {
            prop_assert!(free.insert(var));
        }
    }
}
