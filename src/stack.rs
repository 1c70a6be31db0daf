//! The symbolic stack: a bounded stack of lattice values carrying variable
//! provenance, used to simulate a block's effect on the EVM operand stack
//! without ever holding a concrete machine state.

use std::collections::BTreeSet;
use std::fmt;

use crate::lattice::Value;

/// Hard EVM stack depth limit.
pub const STACK_DEPTH_LIMIT: usize = 1024;

/// An SSA-like variable name.
///
/// `Def` variables are introduced by a TAC op at `pc`, distinguished by an
/// intra-block index (`V<pc>_<index>`). `Input` variables are synthesised
/// when a block's simulation pops below its known entry depth: they stand
/// for whatever the (unknown) caller left on the stack, named by the
/// block's entry pc and the depth below the top at which they were found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Variable {
    Def { pc: u32, index: u16 },
    Input { block_entry_pc: u32, depth: u16 },
}

impl Variable {
    #[must_use]
    pub fn is_input(&self) -> bool {
        matches!(self, Variable::Input { .. })
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variable::Def { pc, index } => write!(f, "V{pc}_{index}"),
            Variable::Input {
                block_entry_pc,
                depth,
            } => write!(f, "I{block_entry_pc}_{depth}"),
        }
    }
}

/// A single stack slot: the lattice value currently believed to occupy it,
/// plus the set of variables that may have produced it. A slot names more
/// than one variable only after a `meet` has fused two incoming contexts
/// that disagree on provenance (a phi-like union); `TACOp::uses` then lists
/// every one of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub origins: BTreeSet<Variable>,
    pub value: Value,
}

impl Slot {
    #[must_use]
    pub fn new(origin: Variable, value: Value) -> Self {
        Slot {
            origins: BTreeSet::from([origin]),
            value,
        }
    }

    fn meet(&self, other: &Slot, set_max: usize) -> Slot {
        Slot {
            origins: self.origins.union(&other.origins).copied().collect(),
            value: self.value.meet(&other.value, set_max),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackError {
    /// Popping would exceed `STACK_DEPTH_LIMIT` worth of synthesised input
    /// variables, i.e. the block claims a deeper stack than EVM allows.
    Overflow,
    /// A pop (or a dup/swap reaching below the current depth) hit an empty
    /// stack while `die_on_empty_pop` is set, so no input variable was
    /// synthesised.
    Underflow,
}

impl fmt::Display for StackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackError::Overflow => write!(f, "stack depth exceeds {STACK_DEPTH_LIMIT}"),
            StackError::Underflow => write!(f, "pop on empty stack with die_on_empty_pop set"),
        }
    }
}
impl std::error::Error for StackError {}

/// Ordered sequence of stack slots, index 0 = bottom. The *top* of the
/// EVM stack is the back of this `Vec`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolicStack {
    slots: Vec<Slot>,
    /// pc of the block this stack is the entry/exit stack of; used to name
    /// freshly synthesised input variables.
    block_entry_pc: u32,
    /// Count of `Input` variables synthesised so far (i.e. how deep
    /// underflow has gone), independent of current slot count.
    inputs_synthesised: u16,
    /// Mirrors `Config::die_on_empty_pop`: if set, a pop (or a dup/swap
    /// reaching below the current depth) below the known stack returns
    /// `StackError::Underflow` instead of synthesising an input variable.
    die_on_empty_pop: bool,
    /// Mirrors `Config::stack_depth_limit`; `push` rejects growth past it.
    depth_limit: usize,
}

impl SymbolicStack {
    #[must_use]
    pub fn new(block_entry_pc: u32) -> Self {
        SymbolicStack::with_policy(block_entry_pc, false, STACK_DEPTH_LIMIT)
    }

    #[must_use]
    pub fn with_policy(block_entry_pc: u32, die_on_empty_pop: bool, depth_limit: usize) -> Self {
        SymbolicStack {
            slots: Vec::new(),
            block_entry_pc,
            inputs_synthesised: 0,
            die_on_empty_pop,
            depth_limit,
        }
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn push(&mut self, slot: Slot) -> Result<(), StackError> {
        if self.slots.len() >= self.depth_limit {
            return Err(StackError::Overflow);
        }
        self.slots.push(slot);
        Ok(())
    }

    /// Pop the top slot, synthesising a fresh `Input` variable if the
    /// stack is (logically) empty below this point — unless `die_on_empty_pop`
    /// is set, in which case that case returns `StackError::Underflow`
    /// instead, leaving the stack untouched.
    pub fn pop(&mut self) -> Result<Slot, StackError> {
        if let Some(slot) = self.slots.pop() {
            Ok(slot)
        } else if self.die_on_empty_pop {
            Err(StackError::Underflow)
        } else {
            Ok(self.synthesise_input())
        }
    }

    /// Peek `k` slots from the top (`k=0` is the top itself), without
    /// consuming. Synthesises input variables as needed, *prepending*
    /// them at the bottom so indices stay stable; honours `die_on_empty_pop`
    /// the same way `pop` does.
    pub fn peek(&mut self, k: usize) -> Result<Slot, StackError> {
        while self.slots.len() <= k {
            if self.die_on_empty_pop {
                return Err(StackError::Underflow);
            }
            let fresh = self.synthesise_input();
            self.slots.insert(0, fresh);
        }
        Ok(self.slots[self.slots.len() - 1 - k].clone())
    }

    /// `DUPk`: duplicate the k-th slot from the top (`k` in `1..=16`) onto
    /// the top.
    pub fn dup(&mut self, k: u8) -> Result<(), StackError> {
        let slot = self.peek(k as usize - 1)?;
        self.push(slot)
    }

    /// `SWAPk`: exchange the top slot with the k-th slot from the top
    /// (`k` in `1..=16`).
    pub fn swap(&mut self, k: u8) -> Result<(), StackError> {
        self.peek(k as usize)?;
        let top = self.slots.len() - 1;
        let other = self.slots.len() - 1 - k as usize;
        self.slots.swap(top, other);
        Ok(())
    }

    fn synthesise_input(&mut self) -> Slot {
        let depth = self.inputs_synthesised;
        self.inputs_synthesised += 1;
        let var = Variable::Input {
            block_entry_pc: self.block_entry_pc,
            depth,
        };
        Slot::new(var, Value::top())
    }

    /// How many `Input` variables this stack has had to synthesise: the
    /// block's "formal parameter" count, i.e. its required entry depth.
    #[must_use]
    pub fn required_entry_depth(&self) -> u16 {
        self.inputs_synthesised
    }

    /// Meet two stacks slot-wise. Unequal depths are resolved by
    /// bottom-padding the shorter stack with fresh input variables up to
    /// the deeper one's height before comparing slot-wise.
    #[must_use]
    pub fn meet(&self, other: &SymbolicStack, set_max: usize) -> SymbolicStack {
        let depth = self.depth().max(other.depth());
        let mut result = SymbolicStack::with_policy(self.block_entry_pc, self.die_on_empty_pop, self.depth_limit);
        // Build padded slot lists (bottom to top) without mutating self/other.
        let pad = |s: &SymbolicStack, depth: usize| -> Vec<Slot> {
            let missing = depth.saturating_sub(s.depth());
            let mut out = Vec::with_capacity(depth);
            for i in 0..missing {
                let synthetic_depth = (missing - 1 - i) as u16;
                out.push(Slot::new(
                    Variable::Input {
                        block_entry_pc: s.block_entry_pc,
                        depth: synthetic_depth,
                    },
                    Value::top(),
                ));
            }
            out.extend(s.slots.iter().cloned());
            out
        };
        let a = pad(self, depth);
        let b = pad(other, depth);
        result.slots = a
            .iter()
            .zip(b.iter())
            .map(|(x, y)| x.meet(y, set_max))
            .collect();
        result.inputs_synthesised = self.inputs_synthesised.max(other.inputs_synthesised);
        result
    }

    /// Force every slot's value to `⊤`, keeping origins and depth. Used once
    /// a block's entry stack has been revisited more than `widen_threshold`
    /// times, to guarantee the dataflow fixed point terminates.
    #[must_use]
    pub fn widen_to_top(&self) -> SymbolicStack {
        SymbolicStack {
            slots: self
                .slots
                .iter()
                .map(|s| Slot {
                    origins: s.origins.clone(),
                    value: Value::top(),
                })
                .collect(),
            block_entry_pc: self.block_entry_pc,
            inputs_synthesised: self.inputs_synthesised,
            die_on_empty_pop: self.die_on_empty_pop,
            depth_limit: self.depth_limit,
        }
    }

    /// Whether `self` is at or below `other`, slot-wise, per the lattice
    /// order (used to test fixed-point convergence).
    #[must_use]
    pub fn le(&self, other: &SymbolicStack) -> bool {
        if self.depth() != other.depth() {
            return false;
        }
        self.slots
            .iter()
            .zip(other.slots.iter())
            .all(|(a, b)| a.value.le(&b.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ruint::aliases::U256;

    fn def(pc: u32, i: u16, n: u64) -> Slot {
        Slot::new(Variable::Def { pc, index: i }, Value::singleton(U256::from(n)))
    }

    #[test]
    fn push_pop_roundtrip() {
        let mut s = SymbolicStack::new(0);
        s.push(def(1, 0, 42)).unwrap();
        let slot = s.pop().unwrap();
        assert_eq!(slot.value, Value::singleton(U256::from(42u64)));
        assert_eq!(s.depth(), 0);
    }

    #[test]
    fn pop_empty_synthesises_input() {
        let mut s = SymbolicStack::new(7);
        let slot = s.pop().unwrap();
        assert!(slot.origins.iter().all(Variable::is_input));
        assert_eq!(s.required_entry_depth(), 1);
    }

    #[test]
    fn pop_empty_with_die_on_empty_pop_errors() {
        let mut s = SymbolicStack::with_policy(0, true, STACK_DEPTH_LIMIT);
        assert_eq!(s.pop(), Err(StackError::Underflow));
        assert_eq!(s.required_entry_depth(), 0);
    }

    #[test]
    fn dup_duplicates_kth_slot() {
        let mut s = SymbolicStack::new(0);
        s.push(def(0, 0, 1)).unwrap();
        s.push(def(1, 0, 2)).unwrap();
        s.dup(2).unwrap();
        assert_eq!(s.depth(), 3);
        assert_eq!(s.pop().unwrap().value, Value::singleton(U256::from(1u64)));
    }

    #[test]
    fn swap_exchanges_top_and_kth() {
        let mut s = SymbolicStack::new(0);
        s.push(def(0, 0, 1)).unwrap();
        s.push(def(1, 0, 2)).unwrap();
        s.swap(1).unwrap();
        assert_eq!(s.pop().unwrap().value, Value::singleton(U256::from(1u64)));
        assert_eq!(s.pop().unwrap().value, Value::singleton(U256::from(2u64)));
    }

    #[test]
    fn meet_pads_shorter_stack() {
        let mut a = SymbolicStack::new(0);
        a.push(def(0, 0, 1)).unwrap();
        a.push(def(0, 1, 2)).unwrap();
        let b = SymbolicStack::new(0);
        let m = a.meet(&b, 10);
        assert_eq!(m.depth(), 2);
    }

    #[test]
    fn overflow_rejected_at_limit() {
        let mut s = SymbolicStack::new(0);
        for i in 0..STACK_DEPTH_LIMIT {
            s.push(def(0, i as u16, i as u64)).unwrap();
        }
        assert!(s.push(def(0, 0, 0)).is_err());
    }
}
