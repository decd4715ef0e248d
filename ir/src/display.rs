//! Textual rendering of modules and functions.
//!
//! The format is for humans and tests; the native backend consumes the
//! in-memory structures, not this text.

use std::fmt;

use itertools::Itertools;

use crate::func::{Function, ValueDef, ValueId};
use crate::inst::{Inst, LoopMetadata, Terminator};
use crate::module::Module;

fn value_ref(func: &Function, value: ValueId) -> String {
    match func.values.get(value.0 as usize).map(|v| &v.def) {
        Some(ValueDef::Param(i)) => match func.params.get(*i as usize) {
            Some(p) => format!("%{}", p.name),
            None => format!("%{}", value.0),
        },
        Some(ValueDef::Const(c)) => c.to_string(),
        Some(ValueDef::Inst(_)) | None => format!("%{}", value.0),
    }
}

fn block_ref(func: &Function, block: crate::func::BlockId) -> String {
    match func.blocks.get(block.0 as usize) {
        Some(b) => b.label.clone(),
        None => format!("bb{}", block.0),
    }
}

fn metadata_suffix(md: &Option<LoopMetadata>) -> String {
    let Some(md) = md else { return String::new() };
    let mut out = String::new();
    if let Some(w) = md.vector_width {
        out.push_str(&format!(" !vector_width({w})"));
    }
    if let Some(u) = md.unroll {
        out.push_str(&format!(" !unroll({u})"));
    }
    out
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params = self.params.iter().map(|p| format!("%{}: {}", p.name, p.ty)).join(", ");
        writeln!(f, "define @{}({}) {{", self.name, params)?;
        for block in &self.blocks {
            writeln!(f, "{}:", block.label)?;
            for inst_id in &block.insts {
                let data = &self.insts[inst_id.0 as usize];
                let lhs = match data.result {
                    Some(v) => format!("{v} = "),
                    None => String::new(),
                };
                let body = match &data.inst {
                    Inst::Binary { op, lhs: a, rhs: b } => {
                        format!("{} {}, {}", op.as_ref(), value_ref(self, *a), value_ref(self, *b))
                    }
                    Inst::Cmp { pred, lhs: a, rhs: b } => {
                        format!("icmp {} {}, {}", pred.as_ref(), value_ref(self, *a), value_ref(self, *b))
                    }
                    Inst::Phi { dtype, incoming } => {
                        let edges = incoming
                            .iter()
                            .map(|(blk, v)| format!("[ {}, {} ]", value_ref(self, *v), block_ref(self, *blk)))
                            .join(", ");
                        format!("phi {dtype} {edges}")
                    }
                    Inst::StackAlloc { dtype, len } => format!("stack_alloc {dtype} x {len}"),
                    Inst::PtrOffset { base, offset } => {
                        format!("ptr_offset {}, {}", value_ref(self, *base), value_ref(self, *offset))
                    }
                    Inst::Load { ptr } => format!("load {}", value_ref(self, *ptr)),
                    Inst::Store { ptr, value } => {
                        format!("store {}, {}", value_ref(self, *ptr), value_ref(self, *value))
                    }
                    Inst::GlobalAddr { global } => format!("global_addr @g{}", global.0),
                };
                writeln!(f, "  {lhs}{body}")?;
            }
            match &block.terminator {
                Some(Terminator::Br { target }) => writeln!(f, "  br {}", block_ref(self, *target))?,
                Some(Terminator::CondBr { cond, then_block, else_block, loop_md }) => writeln!(
                    f,
                    "  condbr {}, {}, {}{}",
                    value_ref(self, *cond),
                    block_ref(self, *then_block),
                    block_ref(self, *else_block),
                    metadata_suffix(loop_md),
                )?,
                Some(Terminator::Ret { value }) => match value {
                    Some(v) => writeln!(f, "  ret {}", value_ref(self, *v))?,
                    None => writeln!(f, "  ret")?,
                },
                None => writeln!(f, "  <no terminator>")?,
            }
        }
        write!(f, "}}")
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "; module {}", self.name())?;
        for (id, global) in self.globals() {
            let data = global.data.iter().map(|c| c.to_string()).join(", ");
            writeln!(f, "global @g{} \"{}\": {} x {} = [{}]", id.0, global.name, global.dtype, global.data.len(), data)?;
        }
        for (_, func) in self.functions() {
            writeln!(f, "{func}")?;
        }
        Ok(())
    }
}
