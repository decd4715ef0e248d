//! Affine multi-dimensional index algebra.
//!
//! A [`Shape`] is an ordered sequence of dimension sizes with row-major
//! strides, optionally mirrored by per-dimension runtime values for shapes
//! whose sizes only materialize at code-generation time. The compile-time
//! and codegen-time offset computations share one recurrence, so the two
//! paths cannot drift apart; their agreement is the core correctness
//! property of the whole lowering and is exercised by property tests that
//! execute the emitted instruction sequence.
//!
//! Shapes are pure values: deriving a chunk or a flattened form never
//! touches storage.

use smallvec::SmallVec;

use tessel_ir::{Builder, ValueId};

use crate::error::{Error, Result};

/// Dimension storage. Inline capacity of 4 keeps 1D-4D shapes off the heap,
/// which covers the overwhelming majority of tensor ranks.
pub type Dims = SmallVec<[u64; 4]>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shape {
    dims: Dims,
    strides: Dims,
    /// Codegen-time twin of `dims`; when present it has the same length and
    /// must agree value-for-value with the static dimensions.
    runtime: Option<SmallVec<[ValueId; 4]>>,
}

fn row_major(dims: &[u64]) -> Dims {
    let mut strides: Dims = SmallVec::from_elem(0, dims.len());
    let mut acc = 1u64;
    for i in (0..dims.len()).rev() {
        strides[i] = acc;
        acc = acc.saturating_mul(dims[i]);
    }
    strides
}

impl Shape {
    /// Row-major shape with compile-time dimensions only.
    pub fn new(dims: &[u64]) -> Self {
        Self { dims: SmallVec::from_slice(dims), strides: row_major(dims), runtime: None }
    }

    /// Shape that additionally carries codegen-time dimension values.
    ///
    /// The runtime values must agree with `dims`; the constructor can only
    /// check their count, the value agreement is the caller's contract.
    pub fn with_runtime(dims: &[u64], runtime: &[ValueId]) -> Result<Self> {
        if dims.len() != runtime.len() {
            return Err(Error::RuntimeDimsMismatch { expected: dims.len(), actual: runtime.len() });
        }
        let mut shape = Self::new(dims);
        shape.runtime = Some(SmallVec::from_slice(runtime));
        Ok(shape)
    }

    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    pub fn dims(&self) -> &[u64] {
        &self.dims
    }

    pub fn dim(&self, i: usize) -> Option<u64> {
        self.dims.get(i).copied()
    }

    /// Total element count.
    pub fn size(&self) -> u64 {
        self.dims.iter().product()
    }

    pub fn has_runtime_dims(&self) -> bool {
        self.runtime.is_some()
    }

    /// A chunked shape keeps its parent's strides and is then no longer
    /// row-major compact.
    pub fn is_contiguous(&self) -> bool {
        self.strides == row_major(&self.dims)
    }

    /// Row-major affine offset of an index tuple, checked per dimension.
    pub fn at(&self, idx: &[u64]) -> Result<u64> {
        if idx.len() != self.ndim() {
            return Err(Error::DimensionMismatch { expected: self.ndim(), actual: idx.len() });
        }
        let mut offset = 0u64;
        for (dim, (&i, (&size, &stride))) in idx.iter().zip(self.dims.iter().zip(self.strides.iter())).enumerate() {
            if i >= size {
                return Err(Error::IndexOutOfRange { dim, index: i, size });
            }
            offset += i * stride;
        }
        Ok(offset)
    }

    /// The same affine offset, emitted as an instruction sequence.
    ///
    /// For any index tuple that [`Shape::at`] accepts, executing the emitted
    /// sequence yields the identical integer. Runtime dimensions are used
    /// when present; bounds are the caller's contract in that case, exactly
    /// as in the original affine formula.
    pub fn emit_at(&self, builder: &mut Builder<'_>, idx: &[ValueId]) -> Result<ValueId> {
        if idx.len() != self.ndim() {
            return Err(Error::DimensionMismatch { expected: self.ndim(), actual: idx.len() });
        }
        match &self.runtime {
            Some(runtime) => {
                if !self.is_contiguous() {
                    return Err(Error::RuntimeStrided);
                }
                // off = ((idx[0] * d[1] + idx[1]) * d[2] + idx[2]) ...
                let Some(&first) = idx.first() else {
                    return Ok(builder.index_const(0));
                };
                let mut offset = first;
                for (i, &next) in idx.iter().enumerate().skip(1) {
                    let scaled = builder.imul(offset, runtime[i])?;
                    offset = builder.iadd(scaled, next)?;
                }
                Ok(offset)
            }
            None => {
                let mut offset = builder.index_const(0);
                for (&i, &stride) in idx.iter().zip(self.strides.iter()) {
                    let stride_v = builder.index_const(stride);
                    let term = builder.imul(i, stride_v)?;
                    offset = builder.iadd(offset, term)?;
                }
                Ok(offset)
            }
        }
    }

    /// 1-D shape of the same total size. Requires contiguity: flattening a
    /// strided chunk would silently mis-address the parent's storage.
    pub fn flatten(&self) -> Result<Shape> {
        if !self.is_contiguous() {
            return Err(Error::NotContiguous);
        }
        Ok(Shape::new(&[self.size()]))
    }

    /// Flatten a shape that carries runtime dimensions, emitting the product
    /// of the runtime sizes so the 1-D form stays in the codegen-time world.
    pub fn emit_flatten(&self, builder: &mut Builder<'_>) -> Result<Shape> {
        let Some(runtime) = &self.runtime else {
            return self.flatten();
        };
        if !self.is_contiguous() {
            return Err(Error::NotContiguous);
        }
        let mut total = builder.index_const(1);
        for &dim in runtime {
            total = builder.imul(total, dim)?;
        }
        Shape::with_runtime(&[self.size()], &[total])
    }

    /// Derive a sub-shape and the translated starting offset. The sub-shape
    /// keeps this shape's strides, so relative indexing inside the chunk
    /// addresses the parent's layout.
    pub fn chunk(&self, start: &[u64], sub: &[u64]) -> Result<(Shape, u64)> {
        if start.len() != self.ndim() {
            return Err(Error::DimensionMismatch { expected: self.ndim(), actual: start.len() });
        }
        if sub.len() != self.ndim() {
            return Err(Error::DimensionMismatch { expected: self.ndim(), actual: sub.len() });
        }
        let mut offset = 0u64;
        for dim in 0..self.ndim() {
            let end = start[dim] + sub[dim];
            if end > self.dims[dim] {
                return Err(Error::ChunkOutOfRange { dim, start: start[dim], end, size: self.dims[dim] });
            }
            offset += start[dim] * self.strides[dim];
        }
        let shape =
            Shape { dims: SmallVec::from_slice(sub), strides: self.strides.clone(), runtime: None };
        Ok((shape, offset))
    }

    /// Same total size, new dimensions.
    pub fn reshape(&self, new_dims: &[u64]) -> Result<Shape> {
        if !self.is_contiguous() {
            return Err(Error::NotContiguous);
        }
        let new_size: u64 = new_dims.iter().product();
        if new_size != self.size() {
            return Err(Error::ReshapeSizeMismatch { input_size: self.size(), output_size: new_size });
        }
        Ok(Shape::new(new_dims))
    }
}
