use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::ids::InstId;
use crate::types::{RegKind, TypeId};

/// The instruction kinds this IR supports, mirroring `original_source`'s
/// `InstKind` enum (`I_NOP` .. `I_RET`) but trimmed to what the lowering pass
/// actually emits for the eight-symbol language (no `I_DEF`/call machinery).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstKind {
    /// Discarded during folding; never reaches the validator.
    Nop,
    /// A constant, carried in `imm`.
    Imm,
    Add,
    Sub,
    /// Pointer-sized offset: `base + imm_or_input`.
    Gep,
    /// Load a cell's value through a pointer input.
    Ld,
    /// Store a value input through a pointer input; produces no value.
    Str,
    /// Reads the current value of a pinned register (`imm` selects which).
    Reg,
    /// Writes a pinned register from an input; produces no value.
    SetReg,
    GetChar,
    /// Writes a value input to stdout; produces no value.
    PutChar,
    /// SSA merge point; one input per block predecessor, same order.
    Phi,
    /// Two-way branch on a value input; has two block successors.
    If,
    /// Unconditional jump; has one block successor.
    Goto,
    /// Terminates the function.
    Ret,
}

impl InstKind {
    /// Pure instructions have no externally visible effect beyond producing
    /// a value, and may be folded, rewritten or deduplicated freely.
    pub fn is_pure(self) -> bool {
        matches!(
            self,
            InstKind::Nop
                | InstKind::Imm
                | InstKind::Add
                | InstKind::Sub
                | InstKind::Gep
                | InstKind::Ld
                | InstKind::Reg
                | InstKind::Phi
        )
    }

    /// Ordered instructions read mutable state (the tape or a register) and
    /// must not be reordered across a store/setreg even though they are
    /// otherwise pure.
    pub fn is_ordered(self) -> bool {
        matches!(self, InstKind::Ld | InstKind::Reg)
    }

    /// Whether this kind produces a usable value (as opposed to `None`).
    pub fn produces_value(self) -> bool {
        !matches!(
            self,
            InstKind::Str
                | InstKind::SetReg
                | InstKind::PutChar
                | InstKind::If
                | InstKind::Goto
                | InstKind::Ret
                | InstKind::Nop
        )
    }

    pub fn is_terminator(self) -> bool {
        matches!(self, InstKind::If | InstKind::Goto | InstKind::Ret)
    }

    /// Expected input arity, where known statically. `Phi` varies with
    /// predecessor count and is checked separately by the validator.
    pub fn fixed_arity(self) -> Option<usize> {
        match self {
            InstKind::Nop | InstKind::Imm | InstKind::GetChar | InstKind::Goto | InstKind::Reg => {
                Some(0)
            }
            InstKind::Ld | InstKind::SetReg | InstKind::PutChar | InstKind::If => Some(1),
            InstKind::Add | InstKind::Sub | InstKind::Gep | InstKind::Str => Some(2),
            InstKind::Ret => Some(1),
            InstKind::Phi => None,
        }
    }
}

/// The literal payload an instruction carries alongside its inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Immediate {
    None,
    Int(i64),
    /// Same payload as `Int`, but marks the literal as a pointer-sized
    /// offset (a GEP displacement) rather than a cell-width constant, so
    /// the type resolver types it `Size` instead of following the cell
    /// width's integer type.
    Size(i64),
    Reg(RegKind),
}

/// One node in the instruction graph.
///
/// Storage lives in [`crate::graph::Graph`]'s arena; this struct never
/// outlives its owning graph and is addressed only by [`InstId`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstData {
    pub id: InstId,
    pub kind: InstKind,
    pub ty: TypeId,
    pub imm: Immediate,
    pub block: crate::ids::BlockId,
    /// `false` once detached/destroyed; a tombstoned slot that remains in
    /// the arena so ids are never reused or invalidated.
    pub mounted: bool,
    pub prev: Option<InstId>,
    pub next: Option<InstId>,
    pub inputs: SmallVec<[InstId; 2]>,
    /// Multiset of users; an id may appear more than once if it is used
    /// more than once by the same consumer (e.g. both Add operands).
    pub outputs: SmallVec<[InstId; 2]>,
    pub comment: Option<&'static str>,
}

impl InstData {
    pub fn is_pure(&self) -> bool {
        self.kind.is_pure()
    }

    pub fn produces_value(&self) -> bool {
        self.kind.produces_value()
    }
}
