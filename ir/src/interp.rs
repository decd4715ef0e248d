//! Reference interpreter for emitted functions.
//!
//! Executes a function against argument buffers so the test suite can
//! observe the numeric behavior of emitted code (the affine-index agreement
//! property in particular). This is test and debugging tooling standing in
//! for the native backend; it is not a runtime service.

use snafu::Snafu;

use crate::func::{BlockId, FuncId, Function, ValueDef, ValueId};
use crate::inst::{BinOp, CmpPred, ConstValue, Inst, Terminator};
use crate::module::Module;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("no function under that id or name"))]
    UnknownFunction,

    #[snafu(display("function takes {expected} arguments, got {got}"))]
    ArityMismatch { expected: usize, got: usize },

    #[snafu(display("value {value} read before it was computed"))]
    UseBeforeDef { value: ValueId },

    #[snafu(display("phi in block `{label}` executed with no predecessor"))]
    NoPredecessor { label: String },

    #[snafu(display("phi in block `{label}` has no incoming edge for the taken predecessor"))]
    NoMatchingIncoming { label: String },

    #[snafu(display("runtime type error in `{context}`"))]
    TypeError { context: &'static str },

    #[snafu(display("memory access out of bounds: buffer {mem}, offset {offset}, length {len}"))]
    OutOfBounds { mem: usize, offset: i64, len: usize },

    #[snafu(display("block `{label}` has no terminator"))]
    MissingTerminator { label: String },

    #[snafu(display("function has no blocks"))]
    EmptyFunction,

    #[snafu(display("unknown global"))]
    UnknownGlobal,

    #[snafu(display("execution exceeded the step limit"))]
    StepLimit,

    #[snafu(display("function returned a pointer"))]
    ReturnedPointer,
}

/// Argument passed to [`run`]. Buffers are copied in and read back out
/// through [`Outcome::buffer`].
#[derive(Debug, Clone)]
pub enum ArgValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Buffer(Vec<ConstValue>),
}

impl ArgValue {
    pub fn buffer_f32(data: &[f32]) -> Self {
        Self::Buffer(data.iter().map(|&v| ConstValue::Float(f64::from(v))).collect())
    }

    pub fn buffer_f64(data: &[f64]) -> Self {
        Self::Buffer(data.iter().map(|&v| ConstValue::Float(v)).collect())
    }

    pub fn buffer_i64(data: &[i64]) -> Self {
        Self::Buffer(data.iter().map(|&v| ConstValue::Int(v)).collect())
    }
}

/// Result of one interpreted call.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub ret: Option<ConstValue>,
    buffers: Vec<Vec<ConstValue>>,
}

impl Outcome {
    /// Final contents of the `index`-th `Buffer` argument (counting buffer
    /// arguments only, in argument order).
    pub fn buffer(&self, index: usize) -> &[ConstValue] {
        &self.buffers[index]
    }

    pub fn buffer_f64(&self, index: usize) -> Vec<f64> {
        self.buffers[index]
            .iter()
            .map(|c| match c {
                ConstValue::Float(v) => *v,
                ConstValue::Int(v) => *v as f64,
                ConstValue::Bool(v) => {
                    if *v {
                        1.0
                    } else {
                        0.0
                    }
                }
            })
            .collect()
    }

    pub fn buffer_i64(&self, index: usize) -> Vec<i64> {
        self.buffers[index]
            .iter()
            .map(|c| match c {
                ConstValue::Int(v) => *v,
                ConstValue::Float(v) => *v as i64,
                ConstValue::Bool(v) => i64::from(*v),
            })
            .collect()
    }
}

const STEP_LIMIT: u64 = 50_000_000;

/// Runtime value.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Rv {
    Int(i64),
    Float(f64),
    Bool(bool),
    Ptr { mem: usize, off: i64 },
}

pub fn run(module: &Module, func: FuncId, args: Vec<ArgValue>) -> Result<Outcome> {
    let function = module.function(func).map_err(|_| Error::UnknownFunction)?;
    Machine::new(module, function, args)?.run()
}

pub fn run_by_name(module: &Module, name: &str, args: Vec<ArgValue>) -> Result<Outcome> {
    let function = module.function_by_name(name).map_err(|_| Error::UnknownFunction)?;
    Machine::new(module, function, args)?.run()
}

struct Machine<'a> {
    function: &'a Function,
    values: Vec<Option<Rv>>,
    mems: Vec<Vec<ConstValue>>,
    /// Memory index of each `Buffer` argument, in argument order.
    buffer_args: Vec<usize>,
    /// Number of module globals; they occupy the first memories.
    globals: usize,
    steps: u64,
}

impl<'a> Machine<'a> {
    fn new(module: &'a Module, function: &'a Function, args: Vec<ArgValue>) -> Result<Self> {
        if args.len() != function.params().len() {
            return Err(Error::ArityMismatch { expected: function.params().len(), got: args.len() });
        }

        let mut mems: Vec<Vec<ConstValue>> = module.globals().map(|(_, g)| g.data.clone()).collect();
        let globals = mems.len();
        let mut values = vec![None; function.values.len()];
        let mut buffer_args = Vec::new();

        for (i, arg) in args.into_iter().enumerate() {
            let rv = match arg {
                ArgValue::Int(v) => Rv::Int(v),
                ArgValue::Float(v) => Rv::Float(v),
                ArgValue::Bool(v) => Rv::Bool(v),
                ArgValue::Buffer(data) => {
                    let mem = mems.len();
                    mems.push(data);
                    buffer_args.push(mem);
                    Rv::Ptr { mem, off: 0 }
                }
            };
            values[i] = Some(rv);
        }

        Ok(Self { function, values, mems, buffer_args, globals, steps: 0 })
    }

    fn run(mut self) -> Result<Outcome> {
        let function = self.function;
        let mut current = function.entry().ok_or(Error::EmptyFunction)?;
        let mut prev: Option<BlockId> = None;

        loop {
            let block = &function.blocks[current.0 as usize];

            // Phis read their incoming values simultaneously on block entry.
            let mut phi_writes: Vec<(ValueId, Rv)> = Vec::new();
            for inst_id in &block.insts {
                let data = &function.insts[inst_id.0 as usize];
                if let Inst::Phi { incoming, .. } = &data.inst {
                    let from = prev.ok_or_else(|| Error::NoPredecessor { label: block.label.clone() })?;
                    let (_, value) = incoming
                        .iter()
                        .find(|(blk, _)| *blk == from)
                        .ok_or_else(|| Error::NoMatchingIncoming { label: block.label.clone() })?;
                    let rv = self.value(*value)?;
                    let result = data.result.ok_or(Error::TypeError { context: "phi" })?;
                    phi_writes.push((result, rv));
                }
            }
            for (id, rv) in phi_writes {
                self.values[id.0 as usize] = Some(rv);
            }

            for inst_id in &block.insts {
                self.steps += 1;
                if self.steps > STEP_LIMIT {
                    return Err(Error::StepLimit);
                }
                let data = &function.insts[inst_id.0 as usize];
                let result = match &data.inst {
                    Inst::Phi { .. } => continue,
                    Inst::Binary { op, lhs, rhs } => Some(self.binary(*op, *lhs, *rhs)?),
                    Inst::Cmp { pred, lhs, rhs } => Some(self.cmp(*pred, *lhs, *rhs)?),
                    Inst::StackAlloc { dtype, len } => {
                        let fill = if dtype.is_float() {
                            ConstValue::Float(0.0)
                        } else if *dtype == crate::DType::Bool {
                            ConstValue::Bool(false)
                        } else {
                            ConstValue::Int(0)
                        };
                        let mem = self.mems.len();
                        self.mems.push(vec![fill; *len as usize]);
                        Some(Rv::Ptr { mem, off: 0 })
                    }
                    Inst::PtrOffset { base, offset } => {
                        let Rv::Ptr { mem, off } = self.value(*base)? else {
                            return Err(Error::TypeError { context: "ptr_offset" });
                        };
                        let Rv::Int(delta) = self.value(*offset)? else {
                            return Err(Error::TypeError { context: "ptr_offset" });
                        };
                        Some(Rv::Ptr { mem, off: off.wrapping_add(delta) })
                    }
                    Inst::Load { ptr } => {
                        let (mem, off) = self.deref(*ptr, "load")?;
                        Some(rv_from_const(self.mems[mem][off]))
                    }
                    Inst::Store { ptr, value } => {
                        let (mem, off) = self.deref(*ptr, "store")?;
                        let rv = self.value(*value)?;
                        self.mems[mem][off] = const_from_rv(rv)?;
                        None
                    }
                    Inst::GlobalAddr { global } => {
                        if (global.0 as usize) < self.globals {
                            Some(Rv::Ptr { mem: global.0 as usize, off: 0 })
                        } else {
                            return Err(Error::UnknownGlobal);
                        }
                    }
                };
                if let (Some(rv), Some(id)) = (result, data.result) {
                    self.values[id.0 as usize] = Some(rv);
                }
            }

            let terminator =
                block.terminator.as_ref().ok_or_else(|| Error::MissingTerminator { label: block.label.clone() })?;
            match terminator {
                Terminator::Br { target } => {
                    prev = Some(current);
                    current = *target;
                }
                Terminator::CondBr { cond, then_block, else_block, .. } => {
                    let Rv::Bool(taken) = self.value(*cond)? else {
                        return Err(Error::TypeError { context: "condbr" });
                    };
                    prev = Some(current);
                    current = if taken { *then_block } else { *else_block };
                }
                Terminator::Ret { value } => {
                    let ret = match value {
                        Some(v) => Some(const_from_rv(self.value(*v)?)?),
                        None => None,
                    };
                    let buffers = self.buffer_args.iter().map(|&m| self.mems[m].clone()).collect();
                    return Ok(Outcome { ret, buffers });
                }
            }
        }
    }

    fn value(&self, id: ValueId) -> Result<Rv> {
        if let Some(rv) = self.values.get(id.0 as usize).copied().flatten() {
            return Ok(rv);
        }
        match self.function.value_def(id).map_err(|_| Error::UseBeforeDef { value: id })?.def {
            ValueDef::Const(c) => Ok(rv_from_const(c)),
            _ => Err(Error::UseBeforeDef { value: id }),
        }
    }

    fn deref(&self, ptr: ValueId, context: &'static str) -> Result<(usize, usize)> {
        let Rv::Ptr { mem, off } = self.value(ptr)? else {
            return Err(Error::TypeError { context });
        };
        let len = self.mems[mem].len();
        if off < 0 || off as usize >= len {
            return Err(Error::OutOfBounds { mem, offset: off, len });
        }
        Ok((mem, off as usize))
    }

    fn binary(&self, op: BinOp, lhs: ValueId, rhs: ValueId) -> Result<Rv> {
        let l = self.value(lhs)?;
        let r = self.value(rhs)?;
        match (op, l, r) {
            (BinOp::IAdd, Rv::Int(a), Rv::Int(b)) => Ok(Rv::Int(a.wrapping_add(b))),
            (BinOp::ISub, Rv::Int(a), Rv::Int(b)) => Ok(Rv::Int(a.wrapping_sub(b))),
            (BinOp::IMul, Rv::Int(a), Rv::Int(b)) => Ok(Rv::Int(a.wrapping_mul(b))),
            (BinOp::FAdd, Rv::Float(a), Rv::Float(b)) => Ok(Rv::Float(a + b)),
            (BinOp::FSub, Rv::Float(a), Rv::Float(b)) => Ok(Rv::Float(a - b)),
            (BinOp::FMul, Rv::Float(a), Rv::Float(b)) => Ok(Rv::Float(a * b)),
            _ => Err(Error::TypeError { context: "binary" }),
        }
    }

    fn cmp(&self, pred: CmpPred, lhs: ValueId, rhs: ValueId) -> Result<Rv> {
        let (Rv::Int(a), Rv::Int(b)) = (self.value(lhs)?, self.value(rhs)?) else {
            return Err(Error::TypeError { context: "icmp" });
        };
        let taken = match pred {
            CmpPred::Ult => (a as u64) < (b as u64),
            CmpPred::Slt => a < b,
            CmpPred::Eq => a == b,
        };
        Ok(Rv::Bool(taken))
    }
}

fn rv_from_const(c: ConstValue) -> Rv {
    match c {
        ConstValue::Int(v) => Rv::Int(v),
        ConstValue::Float(v) => Rv::Float(v),
        ConstValue::Bool(v) => Rv::Bool(v),
    }
}

fn const_from_rv(rv: Rv) -> Result<ConstValue> {
    match rv {
        Rv::Int(v) => Ok(ConstValue::Int(v)),
        Rv::Float(v) => Ok(ConstValue::Float(v)),
        Rv::Bool(v) => Ok(ConstValue::Bool(v)),
        Rv::Ptr { .. } => Err(Error::ReturnedPointer),
    }
}
