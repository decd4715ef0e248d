//! Built-in tensor kernels for the tessel compiler.
//!
//! Each kernel implements the [`tessel_graph::Operator`] contract: validate
//! inputs and create the output variable at resolution, then lower into
//! loop nests through the shared emission protocol. [`default_registry`]
//! wires all of them into a registry the function assembler consumes.

pub mod eltwise;
pub mod gemm;
pub mod reduce;
pub mod registry;

#[cfg(test)]
mod test;

pub use registry::default_registry;
