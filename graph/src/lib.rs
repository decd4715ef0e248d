//! Graph IR for the tessel tensor-kernel compiler.
//!
//! This crate holds everything between "user code describes a tensor
//! computation" and "a kernel emits instructions": the affine shape/index
//! algebra, arena-held buffer views, the variable/operation node model, the
//! dependency scheduler, and the operator capability contract with its
//! factory registry.
//!
//! # Module Organization
//!
//! - [`shape`] - Affine multi-dimensional index algebra
//! - [`view`] - Buffer views bound to storage, chunking and packing
//! - [`node`] - Variable/Operation nodes and the index-addressed graph
//! - [`schedule`] - Dependency collection and topological scheduling
//! - [`operator`] - Operator contract and factory registry
//! - [`error`] - Error types and result handling

pub mod error;
pub mod node;
pub mod operator;
pub mod schedule;
pub mod shape;
pub mod view;

#[cfg(test)]
mod test;

pub use error::{Error, Result};
pub use node::{Graph, Node, NodeId, Operation, Variable};
pub use operator::{LowerCtx, Operator, OperatorFactory, OperatorKind, Registry};
pub use schedule::{build_schedule, Schedule};
pub use shape::{Dims, Shape};
pub use view::{Packed, View, ViewArena, ViewId};
