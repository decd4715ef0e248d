//! Tree builder: dependency collection and topological scheduling.
//!
//! Walks the DAG backward from the requested roots, collecting the free
//! variables (the compiled function's inputs) and the operations in an
//! order where every operation appears after all operations whose output it
//! consumes. Revisits along diamond dependencies are idempotent: each node
//! is scheduled exactly once.
//!
//! A [`Schedule`] only exists after a successful build, so querying an
//! unbuilt schedule is unrepresentable.

use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::node::{Graph, Node, NodeId};

/// The result of scheduling: operations in dependency order and the free
/// variables in first-visit order.
#[derive(Debug, Clone)]
pub struct Schedule {
    pub ops: Vec<NodeId>,
    pub free_vars: Vec<NodeId>,
}

/// Build the schedule for a set of roots (one per requested output).
/// Multiple roots share one visited set, so common producers schedule once.
pub fn build_schedule(graph: &Graph, roots: &[NodeId]) -> Result<Schedule> {
    if roots.is_empty() {
        return Err(Error::NoScheduleRoots);
    }

    let mut visited: HashSet<NodeId> = HashSet::new();
    let mut ops = Vec::new();
    let mut free_vars = Vec::new();
    let mut stack: Vec<(NodeId, bool)> = Vec::new();

    for &root in roots {
        stack.push((root, false));

        while let Some((id, processed)) = stack.pop() {
            if visited.contains(&id) {
                continue;
            }

            if processed {
                visited.insert(id);
                match graph.node(id)? {
                    Node::Operation(_) => ops.push(id),
                    Node::Variable(v) if v.is_free() => free_vars.push(id),
                    Node::Variable(_) => {}
                }
            } else {
                stack.push((id, true));

                let children: Vec<NodeId> = match graph.node(id)? {
                    Node::Operation(o) => o.inputs.clone(),
                    Node::Variable(v) => v.creator.into_iter().collect(),
                };
                for child in children.into_iter().rev() {
                    if !visited.contains(&child) {
                        stack.push((child, false));
                    }
                }
            }
        }
    }

    tracing::debug!(operations = ops.len(), free_variables = free_vars.len(), "built schedule");
    Ok(Schedule { ops, free_vars })
}
