use snafu::Snafu;

use crate::node::NodeId;
use crate::operator::OperatorKind;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Index tuple arity disagrees with the shape.
    #[snafu(display("dimension mismatch: shape has {expected} dimensions, index has {actual}"))]
    DimensionMismatch { expected: usize, actual: usize },

    /// Per-dimension bound violation. Checked, never wrapped: codegen index
    /// arithmetic has no other bounds check.
    #[snafu(display("index out of range: dimension {dim} has size {size}, index is {index}"))]
    IndexOutOfRange { dim: usize, index: u64, size: u64 },

    #[snafu(display("runtime dimension count {actual} does not match {expected} static dimensions"))]
    RuntimeDimsMismatch { expected: usize, actual: usize },

    #[snafu(display("operation requires a contiguous (row-major) shape"))]
    NotContiguous,

    #[snafu(display("runtime-dimension indexing is only supported for row-major shapes"))]
    RuntimeStrided,

    #[snafu(display("reshape size mismatch: input size {input_size} != output size {output_size}"))]
    ReshapeSizeMismatch { input_size: u64, output_size: u64 },

    #[snafu(display("chunk out of range: dimension {dim} has size {size}, chunk covers [{start}, {end})"))]
    ChunkOutOfRange { dim: usize, start: u64, end: u64, size: u64 },

    #[snafu(display("pack width must be non-zero"))]
    ZeroPackWidth,

    #[snafu(display("unknown view handle"))]
    UnknownView,

    #[snafu(display("unknown node {id}"))]
    UnknownNode { id: NodeId },

    #[snafu(display("node `{name}` is an operation, expected a variable"))]
    ExpectedVariable { name: String },

    #[snafu(display("node `{name}` is a variable, expected an operation"))]
    ExpectedOperation { name: String },

    /// A variable's storage transitions unbound -> bound exactly once.
    #[snafu(display("variable `{name}` storage is already bound"))]
    AlreadyBound { name: String },

    #[snafu(display("variable `{name}` storage is not bound"))]
    Unbound { name: String },

    #[snafu(display("operation `{name}` already has a resolved operator"))]
    OperatorAlreadyBound { name: String },

    #[snafu(display("operation `{name}` has no resolved operator yet"))]
    OperatorUnresolved { name: String },

    #[snafu(display("no operator factory registered for `{}`", kind.as_ref()))]
    UnknownOperator { kind: OperatorKind },

    /// Shape/type incompatibility between an operator's inputs, detected at
    /// resolution, before any instruction is emitted.
    #[snafu(display("invalid arguments for operator `{operator}`: {message}"))]
    OperatorArgument { operator: String, message: String },

    #[snafu(display("schedule requires at least one root"))]
    NoScheduleRoots,

    /// Loop protocol phase violation. Each loop instance moves
    /// `not-started -> header-emitted -> tail-emitted`, each phase entered
    /// exactly once.
    #[snafu(display("loop `{name}`: `{operation}` requires phase {expected}, but the loop is {actual}"))]
    LoopPhase { name: String, operation: &'static str, expected: &'static str, actual: &'static str },

    #[snafu(display("loop nest level {level} out of range ({depth} levels)"))]
    LoopLevel { level: usize, depth: usize },

    #[snafu(display("loop nest has no levels"))]
    EmptyNest,

    #[snafu(context(false), display("ir emission failed: {source}"))]
    Emit { source: tessel_ir::Error },
}
