//! Scalar element types for the backend IR.
//!
//! The type surface is deliberately small: the scalar types tensor kernels
//! actually move through memory, plus `Index` for induction variables and
//! affine offsets. Pointers are always pointers-to-scalar; there are no
//! aggregate types in this IR.

use std::fmt;

/// Scalar data type of a value or of a buffer element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(strum::AsRefStr, strum::EnumIter)]
pub enum DType {
    Bool,
    Int32,
    Int64,
    Float32,
    Float64,
    /// 64-bit type for induction variables and affine offsets.
    Index,
}

impl DType {
    /// Size of one element in bytes.
    pub const fn bytes(self) -> usize {
        match self {
            Self::Bool => 1,
            Self::Int32 | Self::Float32 => 4,
            Self::Int64 | Self::Float64 | Self::Index => 8,
        }
    }

    pub const fn is_float(self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }

    pub const fn is_int(self) -> bool {
        matches!(self, Self::Int32 | Self::Int64 | Self::Index)
    }

    /// Name used by the textual renderer.
    pub const fn ir_name(self) -> &'static str {
        match self {
            Self::Bool => "i1",
            Self::Int32 => "i32",
            Self::Int64 => "i64",
            Self::Float32 => "f32",
            Self::Float64 => "f64",
            Self::Index => "index",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.ir_name())
    }
}

/// Type of an SSA value: a scalar, or a pointer to elements of a scalar type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ty {
    Scalar(DType),
    Ptr(DType),
}

impl Ty {
    /// The underlying scalar type (the pointee type for pointers).
    pub const fn dtype(self) -> DType {
        match self {
            Self::Scalar(d) | Self::Ptr(d) => d,
        }
    }

    pub const fn is_ptr(self) -> bool {
        matches!(self, Self::Ptr(_))
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(d) => write!(f, "{d}"),
            Self::Ptr(d) => write!(f, "{d}*"),
        }
    }
}
