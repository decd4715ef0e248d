//! Backend IR for the tessel tensor-kernel compiler.
//!
//! This crate defines the intermediate representation the graph lowering
//! emits into: functions made of basic blocks holding affine arithmetic,
//! memory instructions, and structured branches, with advisory loop hints
//! on back-edges. The native code generation backend consumes these
//! structures; this crate deliberately knows nothing about tensors,
//! shapes, or operators.
//!
//! # Module Organization
//!
//! - [`dtype`] - Scalar types and value types
//! - [`inst`] - Instructions, terminators, loop metadata
//! - [`func`] - Functions, blocks, values
//! - [`module`] - Modules and constant data
//! - [`builder`] - Positioned instruction builder
//! - [`interp`] - Reference interpreter (test/debug tooling)
//! - [`error`] - Error types and result handling

pub mod builder;
mod display;
pub mod dtype;
pub mod error;
pub mod func;
pub mod inst;
pub mod interp;
pub mod module;


pub use builder::Builder;
pub use dtype::{DType, Ty};
pub use error::{Error, Result};
pub use func::{Block, BlockId, FuncId, Function, GlobalId, InstId, Param, ValueId};
pub use inst::{BinOp, CmpPred, ConstValue, Inst, LoopMetadata, Terminator};
pub use module::{GlobalData, Module};
