//! Three-address code: the lowered form of a basic block's EVM ops, plus
//! the block container itself.

use std::collections::BTreeSet;
use std::fmt;

use crate::lattice::Value;
use crate::opcode::Opcode;
use crate::stack::{SymbolicStack, Variable};

/// A block identity. Opaque arena index; a block cloned during
/// context-sensitive refinement gets a fresh `BlockId` but keeps its
/// `entry_pc`, so several `BlockId`s may share an `entry_pc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(pub u32);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A single three-address op: at most one def, any number of uses. `DUP`,
/// `SWAP`, `POP` and `PUSH` never appear here — they are fully absorbed
/// into stack bookkeeping (§4.4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TACOp {
    pub pc: u32,
    pub opcode: Opcode,
    pub def: Option<Variable>,
    pub uses: Vec<Variable>,
    /// The lattice value bound to `def` at this point, if any. Exported
    /// into the `value` fact relation; not used by CFG resolution itself,
    /// which reads values off the symbolic stack instead.
    pub value: Option<Value>,
}

impl fmt::Display for TACOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(def) = &self.def {
            write!(f, "{def} = ")?;
        }
        write!(f, "{}", self.opcode.name())?;
        for u in &self.uses {
            write!(f, " {u}")?;
        }
        Ok(())
    }
}

/// A maximal straight-line sequence of TAC ops, with the symbolic stacks
/// observed on entry and exit under its *current* simulation context.
#[derive(Debug, Clone)]
pub struct TACBlock {
    pub id: BlockId,
    pub entry_pc: u32,
    /// Exclusive upper bound of the byte range this block covers in the
    /// original bytecode, *before* any TAC-level trimming. Used to find a
    /// split point when a new jump target lands inside this block.
    pub end_pc: u32,
    pub ops: Vec<TACOp>,
    pub entry_stack: SymbolicStack,
    pub exit_stack: SymbolicStack,
    pub predecessors: BTreeSet<BlockId>,
    pub successors: BTreeSet<BlockId>,
    pub fallthrough: Option<BlockId>,
    pub is_jumpdest: bool,
    /// Set when this block's simulation hit an unrecoverable condition
    /// (stack-depth overflow with `die_on_empty_pop`, or similar): no
    /// successors are computed for it.
    pub malformed: bool,
}

impl TACBlock {
    #[must_use]
    pub fn new(id: BlockId, entry_pc: u32, end_pc: u32, entry_stack: SymbolicStack) -> Self {
        TACBlock {
            id,
            entry_pc,
            end_pc,
            ops: Vec::new(),
            exit_stack: SymbolicStack::new(entry_pc),
            entry_stack,
            predecessors: BTreeSet::new(),
            successors: BTreeSet::new(),
            fallthrough: None,
            is_jumpdest: false,
            malformed: false,
        }
    }

    /// Stable export identifier: hex of the entry pc, with a disambiguating
    /// suffix for clones sharing that pc (see `CFG::export_id`).
    #[must_use]
    pub fn export_id(&self, clone_suffix: Option<usize>) -> String {
        match clone_suffix {
            Some(0) | None => format!("B{:#x}", self.entry_pc),
            Some(n) => format!("B{:#x}_{n}", self.entry_pc),
        }
    }
}
