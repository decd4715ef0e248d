use snafu::Snafu;

use crate::dtype::{DType, Ty};
use crate::func::ValueId;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Builder has no current block.
    #[snafu(display("builder is not positioned at a block"))]
    NotPositioned,

    /// Instruction appended after the block's terminator.
    #[snafu(display("block `{label}` is already terminated"))]
    BlockTerminated { label: String },

    /// Operand type disagreement.
    #[snafu(display("type mismatch in `{context}`: expected {expected}, got {actual}"))]
    TypeMismatch { context: &'static str, expected: Ty, actual: Ty },

    /// Operand type the operation cannot apply to (e.g. `fadd` on ints).
    #[snafu(display("operation `{context}` cannot apply to operand type {dtype}"))]
    InvalidOperand { context: &'static str, dtype: DType },

    /// Pointer operation on a non-pointer value.
    #[snafu(display("value {value} has type {actual}, expected a pointer"))]
    NotAPointer { value: ValueId, actual: Ty },

    /// `add_incoming` on something that is not a phi.
    #[snafu(display("value {value} is not a phi instruction"))]
    NotAPhi { value: ValueId },

    /// Loop metadata attached to a block that does not end in a
    /// conditional branch.
    #[snafu(display("block `{label}` does not end in a conditional branch"))]
    NotACondBr { label: String },

    #[snafu(display("unknown value {value}"))]
    UnknownValue { value: ValueId },

    #[snafu(display("unknown block"))]
    UnknownBlock,

    #[snafu(display("parameter index {index} out of range ({count} parameters)"))]
    UnknownParam { index: usize, count: usize },

    #[snafu(display("module already contains a function named `{name}`"))]
    DuplicateFunction { name: String },

    #[snafu(display("unknown function"))]
    UnknownFunction,

    #[snafu(display("unknown global"))]
    UnknownGlobal,
}
