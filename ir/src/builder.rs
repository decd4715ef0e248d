//! Positioned instruction builder.
//!
//! The builder appends instructions to one block at a time, validating
//! operand types as it goes. Misuse (emitting with no position, appending
//! past a terminator, type disagreement) is a structural contract violation
//! and surfaces as a typed error, aborting the compilation that caused it.

use smallvec::smallvec;

use crate::dtype::{DType, Ty};
use crate::error::{Error, Result};
use crate::func::{BlockId, Function, GlobalId, InstId, ValueDef, ValueId};
use crate::inst::{BinOp, CmpPred, ConstValue, Inst, LoopMetadata, Terminator};

pub struct Builder<'f> {
    func: &'f mut Function,
    current: Option<BlockId>,
}

impl<'f> Builder<'f> {
    /// Wrap a function; the builder starts unpositioned.
    pub fn new(func: &'f mut Function) -> Self {
        Self { func, current: None }
    }

    pub fn func(&self) -> &Function {
        self.func
    }

    pub fn value_ty(&self, value: ValueId) -> Result<Ty> {
        self.func.value_ty(value)
    }

    // -------------------------------------------------------------------
    // Blocks & positioning
    // -------------------------------------------------------------------

    pub fn create_block(&mut self, label: impl Into<String>) -> BlockId {
        let id = BlockId(self.func.blocks.len() as u32);
        self.func.blocks.push(crate::func::Block { label: label.into(), insts: Vec::new(), terminator: None });
        id
    }

    pub fn position_at_end(&mut self, block: BlockId) {
        self.current = Some(block);
    }

    pub fn current_block(&self) -> Result<BlockId> {
        self.current.ok_or(Error::NotPositioned)
    }

    // -------------------------------------------------------------------
    // Constants
    // -------------------------------------------------------------------

    pub fn const_int(&mut self, dtype: DType, value: i64) -> ValueId {
        debug_assert!(dtype.is_int());
        self.func.push_value(ValueDef::Const(ConstValue::Int(value)), Ty::Scalar(dtype))
    }

    pub fn const_float(&mut self, dtype: DType, value: f64) -> ValueId {
        debug_assert!(dtype.is_float());
        self.func.push_value(ValueDef::Const(ConstValue::Float(value)), Ty::Scalar(dtype))
    }

    pub fn const_bool(&mut self, value: bool) -> ValueId {
        self.func.push_value(ValueDef::Const(ConstValue::Bool(value)), Ty::Scalar(DType::Bool))
    }

    /// Convenience for `Index`-typed constants (offsets, trip counts).
    pub fn index_const(&mut self, value: u64) -> ValueId {
        self.const_int(DType::Index, value as i64)
    }

    // -------------------------------------------------------------------
    // Arithmetic
    // -------------------------------------------------------------------

    pub fn iadd(&mut self, lhs: ValueId, rhs: ValueId) -> Result<ValueId> {
        self.binary(BinOp::IAdd, "iadd", lhs, rhs)
    }

    pub fn isub(&mut self, lhs: ValueId, rhs: ValueId) -> Result<ValueId> {
        self.binary(BinOp::ISub, "isub", lhs, rhs)
    }

    pub fn imul(&mut self, lhs: ValueId, rhs: ValueId) -> Result<ValueId> {
        self.binary(BinOp::IMul, "imul", lhs, rhs)
    }

    pub fn fadd(&mut self, lhs: ValueId, rhs: ValueId) -> Result<ValueId> {
        self.binary(BinOp::FAdd, "fadd", lhs, rhs)
    }

    pub fn fsub(&mut self, lhs: ValueId, rhs: ValueId) -> Result<ValueId> {
        self.binary(BinOp::FSub, "fsub", lhs, rhs)
    }

    pub fn fmul(&mut self, lhs: ValueId, rhs: ValueId) -> Result<ValueId> {
        self.binary(BinOp::FMul, "fmul", lhs, rhs)
    }

    fn binary(&mut self, op: BinOp, name: &'static str, lhs: ValueId, rhs: ValueId) -> Result<ValueId> {
        let lty = self.func.value_ty(lhs)?;
        let rty = self.func.value_ty(rhs)?;
        if lty != rty {
            return Err(Error::TypeMismatch { context: name, expected: lty, actual: rty });
        }
        let Ty::Scalar(dtype) = lty else {
            return Err(Error::InvalidOperand { context: name, dtype: lty.dtype() });
        };
        if op.is_float() != dtype.is_float() {
            return Err(Error::InvalidOperand { context: name, dtype });
        }
        self.push_valued(Inst::Binary { op, lhs, rhs }, Ty::Scalar(dtype))
    }

    pub fn icmp(&mut self, pred: CmpPred, lhs: ValueId, rhs: ValueId) -> Result<ValueId> {
        let lty = self.func.value_ty(lhs)?;
        let rty = self.func.value_ty(rhs)?;
        if lty != rty {
            return Err(Error::TypeMismatch { context: "icmp", expected: lty, actual: rty });
        }
        let Ty::Scalar(dtype) = lty else {
            return Err(Error::InvalidOperand { context: "icmp", dtype: lty.dtype() });
        };
        if !dtype.is_int() {
            return Err(Error::InvalidOperand { context: "icmp", dtype });
        }
        self.push_valued(Inst::Cmp { pred, lhs, rhs }, Ty::Scalar(DType::Bool))
    }

    // -------------------------------------------------------------------
    // Phis
    // -------------------------------------------------------------------

    /// Create a phi with no incoming edges yet.
    pub fn phi(&mut self, dtype: DType) -> Result<ValueId> {
        self.push_valued(Inst::Phi { dtype, incoming: smallvec![] }, Ty::Scalar(dtype))
    }

    /// Append an incoming edge to an existing phi.
    pub fn add_incoming(&mut self, phi: ValueId, from: BlockId, value: ValueId) -> Result<()> {
        if from.0 as usize >= self.func.blocks.len() {
            return Err(Error::UnknownBlock);
        }
        let vty = self.func.value_ty(value)?;
        let ValueDef::Inst(inst_id) = self.func.value_def(phi)?.def else {
            return Err(Error::NotAPhi { value: phi });
        };
        let data = &mut self.func.insts[inst_id.0 as usize];
        let Inst::Phi { dtype, incoming } = &mut data.inst else {
            return Err(Error::NotAPhi { value: phi });
        };
        if vty != Ty::Scalar(*dtype) {
            return Err(Error::TypeMismatch { context: "phi", expected: Ty::Scalar(*dtype), actual: vty });
        }
        incoming.push((from, value));
        Ok(())
    }

    // -------------------------------------------------------------------
    // Memory
    // -------------------------------------------------------------------

    pub fn stack_alloc(&mut self, dtype: DType, len: u64) -> Result<ValueId> {
        self.push_valued(Inst::StackAlloc { dtype, len }, Ty::Ptr(dtype))
    }

    pub fn ptr_offset(&mut self, base: ValueId, offset: ValueId) -> Result<ValueId> {
        let bty = self.func.value_ty(base)?;
        let Ty::Ptr(dtype) = bty else {
            return Err(Error::NotAPointer { value: base, actual: bty });
        };
        let oty = self.func.value_ty(offset)?;
        match oty {
            Ty::Scalar(d) if d.is_int() => {}
            _ => return Err(Error::InvalidOperand { context: "ptr_offset", dtype: oty.dtype() }),
        }
        self.push_valued(Inst::PtrOffset { base, offset }, Ty::Ptr(dtype))
    }

    pub fn load(&mut self, ptr: ValueId) -> Result<ValueId> {
        let pty = self.func.value_ty(ptr)?;
        let Ty::Ptr(dtype) = pty else {
            return Err(Error::NotAPointer { value: ptr, actual: pty });
        };
        self.push_valued(Inst::Load { ptr }, Ty::Scalar(dtype))
    }

    pub fn store(&mut self, ptr: ValueId, value: ValueId) -> Result<()> {
        let pty = self.func.value_ty(ptr)?;
        let Ty::Ptr(dtype) = pty else {
            return Err(Error::NotAPointer { value: ptr, actual: pty });
        };
        let vty = self.func.value_ty(value)?;
        if vty != Ty::Scalar(dtype) {
            return Err(Error::TypeMismatch { context: "store", expected: Ty::Scalar(dtype), actual: vty });
        }
        self.push_void(Inst::Store { ptr, value })
    }

    /// Address of module-level constant data. The caller supplies the
    /// element type; the builder has no module in scope.
    pub fn global_addr(&mut self, global: GlobalId, dtype: DType) -> Result<ValueId> {
        self.push_valued(Inst::GlobalAddr { global }, Ty::Ptr(dtype))
    }

    // -------------------------------------------------------------------
    // Terminators
    // -------------------------------------------------------------------

    pub fn br(&mut self, target: BlockId) -> Result<()> {
        self.check_block(target)?;
        self.set_terminator(Terminator::Br { target })
    }

    pub fn cond_br(&mut self, cond: ValueId, then_block: BlockId, else_block: BlockId) -> Result<()> {
        self.check_block(then_block)?;
        self.check_block(else_block)?;
        let cty = self.func.value_ty(cond)?;
        if cty != Ty::Scalar(DType::Bool) {
            return Err(Error::TypeMismatch { context: "cond_br", expected: Ty::Scalar(DType::Bool), actual: cty });
        }
        self.set_terminator(Terminator::CondBr { cond, then_block, else_block, loop_md: None })
    }

    pub fn ret(&mut self, value: Option<ValueId>) -> Result<()> {
        if let Some(v) = value {
            self.func.value_ty(v)?;
        }
        self.set_terminator(Terminator::Ret { value })
    }

    /// Attach loop hints to the conditional branch terminating `block`.
    pub fn set_loop_metadata(&mut self, block: BlockId, metadata: LoopMetadata) -> Result<()> {
        let data = self.func.blocks.get_mut(block.0 as usize).ok_or(Error::UnknownBlock)?;
        match &mut data.terminator {
            Some(Terminator::CondBr { loop_md, .. }) => {
                *loop_md = Some(metadata);
                Ok(())
            }
            _ => Err(Error::NotACondBr { label: data.label.clone() }),
        }
    }

    // -------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------

    fn check_block(&self, block: BlockId) -> Result<()> {
        if (block.0 as usize) < self.func.blocks.len() {
            Ok(())
        } else {
            Err(Error::UnknownBlock)
        }
    }

    fn check_insertable(&self) -> Result<BlockId> {
        let cur = self.current.ok_or(Error::NotPositioned)?;
        let block = self.func.blocks.get(cur.0 as usize).ok_or(Error::UnknownBlock)?;
        if block.terminator.is_some() {
            return Err(Error::BlockTerminated { label: block.label.clone() });
        }
        Ok(cur)
    }

    fn push_valued(&mut self, inst: Inst, ty: Ty) -> Result<ValueId> {
        let cur = self.check_insertable()?;
        let inst_id = InstId(self.func.insts.len() as u32);
        let result = self.func.push_value(ValueDef::Inst(inst_id), ty);
        self.func.insts.push(crate::func::InstData { inst, result: Some(result) });
        self.func.blocks[cur.0 as usize].insts.push(inst_id);
        Ok(result)
    }

    fn push_void(&mut self, inst: Inst) -> Result<()> {
        let cur = self.check_insertable()?;
        let inst_id = InstId(self.func.insts.len() as u32);
        self.func.insts.push(crate::func::InstData { inst, result: None });
        self.func.blocks[cur.0 as usize].insts.push(inst_id);
        Ok(())
    }

    fn set_terminator(&mut self, terminator: Terminator) -> Result<()> {
        let cur = self.current.ok_or(Error::NotPositioned)?;
        let block = self.func.blocks.get_mut(cur.0 as usize).ok_or(Error::UnknownBlock)?;
        if block.terminator.is_some() {
            return Err(Error::BlockTerminated { label: block.label.clone() });
        }
        block.terminator = Some(terminator);
        Ok(())
    }
}
