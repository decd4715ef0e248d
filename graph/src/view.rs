//! Buffer views: a shape bound to a storage location.
//!
//! All views of one compilation live in a [`ViewArena`] and are addressed
//! by [`ViewId`] handles. A derived view (chunk, flattened form) records its
//! parent handle but never owns storage; the arena's lifetime bounds every
//! view, so there is no teardown bookkeeping.
//!
//! Deriving a chunk and taking element pointers emit GEP-equivalent
//! instructions immediately; views are descriptors, not lazy expressions.

use std::fmt;

use tessel_ir::{Builder, DType, ValueId};

use crate::error::{Error, Result};
use crate::shape::Shape;

/// Handle to a view in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewId(u32);

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct View {
    /// Pointer value the view reads and writes through.
    pub base: ValueId,
    pub dtype: DType,
    pub shape: Shape,
    pub parent: Option<ViewId>,
}

#[derive(Debug, Default)]
pub struct ViewArena {
    views: Vec<View>,
}

impl ViewArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a root view over a base pointer.
    pub fn create(&mut self, base: ValueId, dtype: DType, shape: Shape) -> ViewId {
        let id = ViewId(self.views.len() as u32);
        self.views.push(View { base, dtype, shape, parent: None });
        id
    }

    pub fn get(&self, id: ViewId) -> Result<&View> {
        self.views.get(id.0 as usize).ok_or(Error::UnknownView)
    }

    /// Derive a sub-view translated by the chunk's starting offset. Emits
    /// the base-pointer adjustment immediately.
    pub fn chunk(&mut self, builder: &mut Builder<'_>, id: ViewId, start: &[u64], sub: &[u64]) -> Result<ViewId> {
        let view = self.get(id)?.clone();
        let (shape, offset) = view.shape.chunk(start, sub)?;
        let offset_v = builder.index_const(offset);
        let base = builder.ptr_offset(view.base, offset_v)?;
        let child = ViewId(self.views.len() as u32);
        self.views.push(View { base, dtype: view.dtype, shape, parent: Some(id) });
        Ok(child)
    }

    /// 1-D view over the same storage. No instructions are emitted; only
    /// the indexing changes.
    pub fn flatten(&mut self, id: ViewId) -> Result<ViewId> {
        let view = self.get(id)?.clone();
        let shape = view.shape.flatten()?;
        let child = ViewId(self.views.len() as u32);
        self.views.push(View { base: view.base, dtype: view.dtype, shape, parent: Some(id) });
        Ok(child)
    }

    /// Pointer to the element at a codegen-time index tuple.
    pub fn element_ptr(&self, builder: &mut Builder<'_>, id: ViewId, idx: &[ValueId]) -> Result<ValueId> {
        let view = self.get(id)?;
        let offset = view.shape.emit_at(builder, idx)?;
        Ok(builder.ptr_offset(view.base, offset)?)
    }

    /// Pointer to the element at a compile-time index tuple.
    pub fn element_ptr_at(&self, builder: &mut Builder<'_>, id: ViewId, idx: &[u64]) -> Result<ValueId> {
        let view = self.get(id)?;
        let offset = view.shape.at(idx)?;
        let offset_v = builder.index_const(offset);
        Ok(builder.ptr_offset(view.base, offset_v)?)
    }

    /// Partition a contiguous view into fixed-width lane groups, the last
    /// possibly partial. This is the entry point every vectorizable kernel
    /// uses to process data in lanes.
    pub fn pack(&self, id: ViewId, width: u32) -> Result<Packed> {
        if width == 0 {
            return Err(Error::ZeroPackWidth);
        }
        let view = self.get(id)?;
        if !view.shape.is_contiguous() {
            return Err(Error::NotContiguous);
        }
        let size = view.shape.size();
        Ok(Packed { view: id, width, groups: size / u64::from(width), leftover: size % u64::from(width) })
    }
}

/// A packed partition of a flattened view.
#[derive(Debug, Clone, Copy)]
pub struct Packed {
    pub view: ViewId,
    pub width: u32,
    /// Number of full groups of `width` elements.
    pub groups: u64,
    /// Trailing elements that do not fill a group.
    pub leftover: u64,
}

impl Packed {
    /// Base pointer of one lane group, given the group's induction value.
    pub fn group_base(&self, arena: &ViewArena, builder: &mut Builder<'_>, group: ValueId) -> Result<ValueId> {
        let view = arena.get(self.view)?;
        let width = builder.index_const(u64::from(self.width));
        let offset = builder.imul(group, width)?;
        Ok(builder.ptr_offset(view.base, offset)?)
    }
}
