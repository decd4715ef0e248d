//! Loop-nest emission protocol.
//!
//! Every loop shares the same three-block structure:
//!
//! ```text
//! preheader:  br header
//! header:     i = phi [start, preheader], [next, tail]
//!             br body
//! body:       <kernel body>
//! tail:       next = i + step
//!             cmp = next < end
//!             condbr cmp, header, postexit      ; loop hints attach here
//! postexit:   <continuation>
//! ```
//!
//! The check sits in the tail, so the body runs at least once: callers must
//! not emit a loop whose trip count is a known zero.
//!
//! Per loop instance this is a strict three-phase state machine,
//! `not-started -> header-emitted -> tail-emitted`, each phase entered
//! exactly once. Asking for the induction value or emitting the tail ahead
//! of phase is a fatal usage error.
//!
//! Nesting chains naturally: the body block of an outer loop is the
//! preheader of the next `emit_head`, and an inner loop's postexit is the
//! block the outer tail is emitted from. [`LoopNest`] drives N levels and
//! exposes the combined multi-level index through the shape algebra.

use tessel_ir::{BlockId, Builder, CmpPred, DType, LoopMetadata, ValueId};

use tessel_graph::error::{Error, Result};
use tessel_graph::Shape;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    NotStarted,
    HeaderEmitted,
    TailEmitted,
}

impl Phase {
    const fn name(self) -> &'static str {
        match self {
            Self::NotStarted => "not-started",
            Self::HeaderEmitted => "header-emitted",
            Self::TailEmitted => "tail-emitted",
        }
    }
}

/// Handles for one fully emitted loop level. The tail block's conditional
/// branch is the attachment point for vectorize/unroll hints.
#[derive(Debug, Clone, Copy)]
pub struct LoopInfo {
    pub header: BlockId,
    pub body: BlockId,
    pub tail: BlockId,
    pub induction: ValueId,
}

/// One loop level moving through the emission protocol.
#[derive(Debug)]
pub struct Loop {
    name: String,
    start: ValueId,
    end: ValueId,
    step: ValueId,
    metadata: Option<LoopMetadata>,
    phase: Phase,
    header: Option<BlockId>,
    body: Option<BlockId>,
    induction: Option<ValueId>,
}

impl Loop {
    pub fn new(name: impl Into<String>, start: ValueId, end: ValueId, step: ValueId) -> Self {
        Self {
            name: name.into(),
            start,
            end,
            step,
            metadata: None,
            phase: Phase::NotStarted,
            header: None,
            body: None,
            induction: None,
        }
    }

    /// Loop over `0..extent` with step 1.
    pub fn counted(builder: &mut Builder<'_>, name: impl Into<String>, extent: u64) -> Self {
        let start = builder.index_const(0);
        let end = builder.index_const(extent);
        let step = builder.index_const(1);
        Self::new(name, start, end, step)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attach hints to this loop's exit branch when the tail is emitted.
    pub fn set_metadata(&mut self, metadata: LoopMetadata) -> Result<()> {
        if self.phase == Phase::TailEmitted {
            return Err(self.phase_error("set_metadata", Phase::HeaderEmitted));
        }
        self.metadata = Some(metadata);
        Ok(())
    }

    /// Emit preheader branch, header block with the induction phi, and the
    /// body block; leaves the builder positioned in the body.
    pub fn emit_head(&mut self, builder: &mut Builder<'_>) -> Result<ValueId> {
        if self.phase != Phase::NotStarted {
            return Err(self.phase_error("emit_head", Phase::NotStarted));
        }
        let preheader = builder.current_block()?;
        let header = builder.create_block(format!("{}_header", self.name));
        let body = builder.create_block(format!("{}_body", self.name));

        builder.br(header)?;

        builder.position_at_end(header);
        let induction = builder.phi(DType::Index)?;
        builder.add_incoming(induction, preheader, self.start)?;
        builder.br(body)?;

        builder.position_at_end(body);

        self.header = Some(header);
        self.body = Some(body);
        self.induction = Some(induction);
        self.phase = Phase::HeaderEmitted;
        Ok(induction)
    }

    /// The live induction value. Only meaningful once the header exists.
    pub fn induction(&self) -> Result<ValueId> {
        self.induction.ok_or_else(|| self.phase_error("induction", Phase::HeaderEmitted))
    }

    /// Emit the tail: advance the induction, compare against the end bound,
    /// and branch back to the header or out to `postexit`. Attaches any
    /// pending metadata to the exit branch and leaves the builder positioned
    /// at `postexit`.
    pub fn emit_tail(&mut self, builder: &mut Builder<'_>, postexit: BlockId) -> Result<LoopInfo> {
        if self.phase != Phase::HeaderEmitted {
            return Err(self.phase_error("emit_tail", Phase::HeaderEmitted));
        }
        let (header, body, induction) = match (self.header, self.body, self.induction) {
            (Some(h), Some(b), Some(i)) => (h, b, i),
            _ => return Err(self.phase_error("emit_tail", Phase::HeaderEmitted)),
        };

        let tail = builder.create_block(format!("{}_tail", self.name));
        builder.br(tail)?;

        builder.position_at_end(tail);
        let next = builder.iadd(induction, self.step)?;
        builder.add_incoming(induction, tail, next)?;
        let cond = builder.icmp(CmpPred::Ult, next, self.end)?;
        builder.cond_br(cond, header, postexit)?;
        if let Some(metadata) = self.metadata {
            builder.set_loop_metadata(tail, metadata)?;
        }

        builder.position_at_end(postexit);
        self.phase = Phase::TailEmitted;
        Ok(LoopInfo { header, body, tail, induction })
    }

    fn phase_error(&self, operation: &'static str, expected: Phase) -> Error {
        Error::LoopPhase {
            name: self.name.clone(),
            operation,
            expected: expected.name(),
            actual: self.phase.name(),
        }
    }
}

/// A nest of loop levels, outermost first.
#[derive(Debug)]
pub struct LoopNest {
    loops: Vec<Loop>,
}

impl LoopNest {
    pub fn from_loops(loops: Vec<Loop>) -> Result<Self> {
        if loops.is_empty() {
            return Err(Error::EmptyNest);
        }
        Ok(Self { loops })
    }

    /// Nest of counted loops over the given extents, outermost first.
    pub fn counted(builder: &mut Builder<'_>, prefix: &str, extents: &[u64]) -> Result<Self> {
        let loops = extents
            .iter()
            .enumerate()
            .map(|(i, &extent)| Loop::counted(builder, format!("{prefix}{i}"), extent))
            .collect();
        Self::from_loops(loops)
    }

    pub fn depth(&self) -> usize {
        self.loops.len()
    }

    /// Emit all heads, outermost to innermost; leaves the builder in the
    /// innermost body.
    pub fn enter(&mut self, builder: &mut Builder<'_>) -> Result<()> {
        for level in &mut self.loops {
            level.emit_head(builder)?;
        }
        Ok(())
    }

    pub fn induction(&self, level: usize) -> Result<ValueId> {
        let depth = self.loops.len();
        self.loops.get(level).ok_or(Error::LoopLevel { level, depth })?.induction()
    }

    /// Live induction values, outermost first.
    pub fn indices(&self) -> Result<Vec<ValueId>> {
        self.loops.iter().map(|l| l.induction()).collect()
    }

    /// The multi-level logical index combined through the affine shape
    /// algebra: one flat offset per iteration point.
    pub fn combined_index(&self, builder: &mut Builder<'_>, shape: &Shape) -> Result<ValueId> {
        let indices = self.indices()?;
        shape.emit_at(builder, &indices)
    }

    /// The plain sum of all live induction values, for single-stride
    /// iteration spaces.
    pub fn summed_index(&self, builder: &mut Builder<'_>) -> Result<ValueId> {
        let indices = self.indices()?;
        let mut sum = builder.index_const(0);
        for idx in indices {
            sum = builder.iadd(sum, idx)?;
        }
        Ok(sum)
    }

    pub fn set_metadata(&mut self, level: usize, metadata: LoopMetadata) -> Result<()> {
        let depth = self.loops.len();
        self.loops.get_mut(level).ok_or(Error::LoopLevel { level, depth })?.set_metadata(metadata)
    }

    /// Emit all tails, innermost to outermost, chaining each inner postexit
    /// into the enclosing tail. Returns the outermost postexit block and
    /// leaves the builder positioned there.
    pub fn exit(&mut self, builder: &mut Builder<'_>) -> Result<BlockId> {
        let mut last = Err(Error::EmptyNest);
        for level in self.loops.iter_mut().rev() {
            let postexit = builder.create_block(format!("{}_exit", level.name));
            level.emit_tail(builder, postexit)?;
            last = Ok(postexit);
        }
        last
    }
}
