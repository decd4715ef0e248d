//! Module: the unit handed to the native backend.
//!
//! A module owns emitted functions and module-level constant data. Function
//! names are unique; a duplicate name is a resolution error surfaced to the
//! caller, not a silent overwrite.

use crate::dtype::DType;
use crate::error::{Error, Result};
use crate::func::{FuncId, Function, GlobalId};
use crate::inst::ConstValue;

/// Module-level constant data (backing storage for constant-bound tensors).
#[derive(Debug, Clone)]
pub struct GlobalData {
    pub name: String,
    pub dtype: DType,
    pub data: Vec<ConstValue>,
}

#[derive(Debug, Clone, Default)]
pub struct Module {
    name: String,
    functions: Vec<Function>,
    globals: Vec<GlobalData>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), functions: Vec::new(), globals: Vec::new() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.functions.iter().any(|f| f.name() == name)
    }

    /// Add a finished function. Fails on a duplicate name.
    pub fn add_function(&mut self, function: Function) -> Result<FuncId> {
        if self.has_function(function.name()) {
            return Err(Error::DuplicateFunction { name: function.name().to_owned() });
        }
        let id = FuncId(self.functions.len() as u32);
        self.functions.push(function);
        Ok(id)
    }

    pub fn function(&self, id: FuncId) -> Result<&Function> {
        self.functions.get(id.0 as usize).ok_or(Error::UnknownFunction)
    }

    pub fn function_by_name(&self, name: &str) -> Result<&Function> {
        self.functions.iter().find(|f| f.name() == name).ok_or(Error::UnknownFunction)
    }

    pub fn functions(&self) -> impl Iterator<Item = (FuncId, &Function)> {
        self.functions.iter().enumerate().map(|(i, f)| (FuncId(i as u32), f))
    }

    /// Register constant data, returning its handle.
    pub fn add_global(&mut self, name: impl Into<String>, dtype: DType, data: Vec<ConstValue>) -> GlobalId {
        let id = GlobalId(self.globals.len() as u32);
        self.globals.push(GlobalData { name: name.into(), dtype, data });
        id
    }

    pub fn global(&self, id: GlobalId) -> Result<&GlobalData> {
        self.globals.get(id.0 as usize).ok_or(Error::UnknownGlobal)
    }

    pub fn globals(&self) -> impl Iterator<Item = (GlobalId, &GlobalData)> {
        self.globals.iter().enumerate().map(|(i, g)| (GlobalId(i as u32), g))
    }
}
