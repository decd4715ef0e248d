//! Function bodies: values, instructions, and basic blocks.
//!
//! A [`Function`] owns three flat arenas (values, instructions, blocks),
//! all addressed by copyable ids. Instructions live in exactly one block;
//! values are either parameters, constants, or instruction results.

use std::fmt;

use crate::dtype::Ty;
use crate::error::{Error, Result};
use crate::inst::{ConstValue, Inst, Terminator};

/// Id of an SSA value within one function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueId(pub(crate) u32);

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// Id of a basic block within one function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(pub(crate) u32);

/// Id of an instruction within one function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstId(pub(crate) u32);

/// Id of a function within a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FuncId(pub(crate) u32);

/// Id of a module-level constant data item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlobalId(pub(crate) u32);

/// A function parameter.
#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub ty: Ty,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: Ty) -> Self {
        Self { name: name.into(), ty }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum ValueDef {
    /// The n-th function parameter.
    Param(u32),
    Const(ConstValue),
    Inst(InstId),
}

#[derive(Debug, Clone)]
pub(crate) struct ValueInfo {
    pub def: ValueDef,
    pub ty: Ty,
}

#[derive(Debug, Clone)]
pub(crate) struct InstData {
    pub inst: Inst,
    /// Result value, absent for instructions without one (e.g. `store`).
    pub result: Option<ValueId>,
}

/// A basic block: label, straight-line instructions, one terminator.
#[derive(Debug, Clone)]
pub struct Block {
    pub(crate) label: String,
    pub(crate) insts: Vec<InstId>,
    pub(crate) terminator: Option<Terminator>,
}

impl Block {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn terminator(&self) -> Option<&Terminator> {
        self.terminator.as_ref()
    }
}

/// A single emitted function.
#[derive(Debug, Clone)]
pub struct Function {
    pub(crate) name: String,
    pub(crate) params: Vec<Param>,
    pub(crate) values: Vec<ValueInfo>,
    pub(crate) insts: Vec<InstData>,
    pub(crate) blocks: Vec<Block>,
}

impl Function {
    /// Create a function with the given signature. Parameter values are the
    /// first `params.len()` value ids, in order.
    pub fn new(name: impl Into<String>, params: Vec<Param>) -> Self {
        let values = params
            .iter()
            .enumerate()
            .map(|(i, p)| ValueInfo { def: ValueDef::Param(i as u32), ty: p.ty })
            .collect();
        Self { name: name.into(), params, values, insts: Vec::new(), blocks: Vec::new() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Value of the `index`-th parameter.
    pub fn param(&self, index: usize) -> Result<ValueId> {
        if index < self.params.len() {
            Ok(ValueId(index as u32))
        } else {
            Err(Error::UnknownParam { index, count: self.params.len() })
        }
    }

    /// Type of a value.
    pub fn value_ty(&self, value: ValueId) -> Result<Ty> {
        self.values.get(value.0 as usize).map(|v| v.ty).ok_or(Error::UnknownValue { value })
    }

    pub fn block(&self, id: BlockId) -> Result<&Block> {
        self.blocks.get(id.0 as usize).ok_or(Error::UnknownBlock)
    }

    /// The entry block, if any block has been created.
    pub fn entry(&self) -> Option<BlockId> {
        (!self.blocks.is_empty()).then_some(BlockId(0))
    }

    pub fn blocks(&self) -> impl Iterator<Item = (BlockId, &Block)> {
        self.blocks.iter().enumerate().map(|(i, b)| (BlockId(i as u32), b))
    }

    pub(crate) fn value_def(&self, value: ValueId) -> Result<&ValueInfo> {
        self.values.get(value.0 as usize).ok_or(Error::UnknownValue { value })
    }

    pub(crate) fn push_value(&mut self, def: ValueDef, ty: Ty) -> ValueId {
        let id = ValueId(self.values.len() as u32);
        self.values.push(ValueInfo { def, ty });
        id
    }
}
