//! Control-flow graph construction: the iterative worklist that lifts a flat
//! [`EVMOp`] sequence into [`TACBlock`]s and resolves jump targets into a
//! fully-edged [`Cfg`].
//!
//! Blocks are created lazily as execution (straight-line fallthrough, or a
//! resolved jump target) first reaches a pc. A target landing on a pc
//! already owned by an existing block either reuses it (if that block's
//! entry stack already covers the incoming context), clones it (up to
//! `max_clones_per_pc`, for context sensitivity), or is merged and widened
//! into it once the clone budget is spent. A target landing *inside* an
//! existing block's range splits that block in two.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};

use ruint::aliases::U256;

use crate::config::Config;
use crate::diagnostics::{Diagnostics, ResourceLimit, UnresolvedReason};
use crate::lattice::{apply_binop, apply_ternop, apply_unop, Value};
use crate::opcode::{code, Opcode};
use crate::parser::EVMOp;
use crate::stack::{Slot, SymbolicStack, Variable};
use crate::tac::{BlockId, TACBlock, TACOp};

/// A resolved control-flow graph over lifted TAC blocks.
#[derive(Debug, Clone)]
pub struct Cfg {
    blocks: Vec<TACBlock>,
    entry: BlockId,
    jumpdests: BTreeSet<u32>,
}

impl Cfg {
    #[must_use]
    pub fn blocks(&self) -> &[TACBlock] {
        &self.blocks
    }

    #[must_use]
    pub fn block(&self, id: BlockId) -> &TACBlock {
        &self.blocks[id.0 as usize]
    }

    #[must_use]
    pub fn entry(&self) -> BlockId {
        self.entry
    }

    #[must_use]
    pub fn is_jumpdest(&self, pc: u32) -> bool {
        self.jumpdests.contains(&pc)
    }

    /// The stable export identifier for `id`, disambiguating clones that
    /// share an `entry_pc` (first occurrence in block order is plain,
    /// later ones get a `_n` suffix).
    #[must_use]
    pub fn export_id(&self, id: BlockId) -> String {
        let block = self.block(id);
        let mut seen = 0usize;
        for b in &self.blocks {
            if b.entry_pc == block.entry_pc {
                if b.id == id {
                    break;
                }
                seen += 1;
            }
        }
        block.export_id(if seen == 0 { None } else { Some(seen) })
    }

    /// Drop blocks unreachable from the entry, renumbering survivors. Used
    /// both internally (when `Config::remove_unreachable` is set) and by
    /// [`crate::optimize`] for a post-hoc pass over an already-built CFG.
    pub fn prune_unreachable(&mut self) {
        self.entry = prune_unreachable(&mut self.blocks, self.entry);
    }

    /// Crate-internal mutable access for optimisation passes that rewire
    /// blocks after construction (e.g. basic-block merging).
    pub(crate) fn blocks_mut(&mut self) -> &mut Vec<TACBlock> {
        &mut self.blocks
    }
}

/// Configuration holder for CFG construction; `build` is re-entrant and
/// takes no interior state of its own.
pub struct CfgBuilder<'a> {
    config: &'a Config,
    cancel: Option<&'a AtomicBool>,
}

impl<'a> CfgBuilder<'a> {
    #[must_use]
    pub fn new(config: &'a Config) -> Self {
        CfgBuilder {
            config,
            cancel: None,
        }
    }

    /// Attach an externally-owned cancellation flag: the builder polls it
    /// between worklist items and returns a partial, diagnostics-flagged
    /// CFG if it ever reads true. The builder never spawns or owns a
    /// thread; cooperative cancellation is the caller's responsibility.
    #[must_use]
    pub fn with_cancel(mut self, token: &'a AtomicBool) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Lift `ops` into a resolved CFG, plus whatever non-fatal diagnostics
    /// were recorded along the way.
    #[must_use]
    pub fn build(&self, ops: Vec<EVMOp>) -> (Cfg, Diagnostics) {
        let mut jumpdests = BTreeSet::new();
        let mut pc_index = BTreeMap::new();
        let mut code_end = 0u32;
        for (i, op) in ops.iter().enumerate() {
            pc_index.insert(op.pc, i);
            if op.opcode.is_jumpdest() {
                jumpdests.insert(op.pc);
            }
            code_end = code_end.max(op.pc + 1 + u32::from(op.opcode.immediate_width()));
        }

        let mut resolver = Resolver {
            ops,
            pc_index,
            jumpdests: jumpdests.clone(),
            code_end,
            config: self.config,
            cancel: self.cancel,
            blocks: Vec::new(),
            contexts: BTreeMap::new(),
            revisits: BTreeMap::new(),
            diagnostics: Diagnostics::default(),
        };

        let mut worklist = VecDeque::new();
        let genesis = SymbolicStack::with_policy(0, self.config.die_on_empty_pop, self.config.stack_depth_limit);
        let entry_id = resolver.spawn_block(0, genesis, &mut worklist);

        while let Some(id) = worklist.pop_front() {
            if resolver.cancelled() {
                resolver.diagnostics.record_cancelled();
                break;
            }
            if resolver.blocks.len() > resolver.config.max_blocks {
                resolver.diagnostics.record_resource_limit(ResourceLimit::MaxBlocks);
                break;
            }
            resolver.process(id, &mut worklist);
        }

        let mut blocks = resolver.blocks;
        let mut entry = entry_id;
        if self.config.remove_unreachable {
            entry = prune_unreachable(&mut blocks, entry);
        }

        let mut cfg = Cfg {
            blocks,
            entry,
            jumpdests,
        };
        if self.config.merge_unreachable {
            crate::optimize::remove_empty_passthrough_blocks(&mut cfg);
            crate::optimize::merge_fallthrough_chains(&mut cfg);
            if self.config.remove_unreachable {
                cfg.prune_unreachable();
            }
        }

        (cfg, resolver.diagnostics)
    }
}

/// The outcome of simulating one straight-line run from a block's entry pc.
enum Terminator {
    Halt,
    RanOffEnd,
    Malformed,
    Fallthrough(u32),
    Jump(Slot),
    Jumpi(Slot, Slot),
}

struct SimResult {
    ops: Vec<TACOp>,
    end_pc: u32,
    exit_stack: SymbolicStack,
    terminator: Terminator,
    malformed: bool,
}

/// Common early-exit shape for a block that hit stack overflow or (with
/// `die_on_empty_pop` set) underflow mid-simulation: no terminator could be
/// reached, so it gets no successors.
fn malformed_result(ops: Vec<TACOp>, pc: u32, exit_stack: SymbolicStack) -> SimResult {
    SimResult {
        ops,
        end_pc: pc,
        exit_stack,
        terminator: Terminator::Malformed,
        malformed: true,
    }
}

/// Mutable state threaded through one `build` call.
struct Resolver<'a> {
    ops: Vec<EVMOp>,
    pc_index: BTreeMap<u32, usize>,
    jumpdests: BTreeSet<u32>,
    code_end: u32,
    config: &'a Config,
    cancel: Option<&'a AtomicBool>,
    blocks: Vec<TACBlock>,
    /// `entry_pc -> block ids`, in creation order; the first is the
    /// "primary" context that absorbs widening once the clone budget at
    /// that pc is spent.
    contexts: BTreeMap<u32, Vec<BlockId>>,
    /// Revisit counter per block, for `widen_threshold`.
    revisits: BTreeMap<BlockId, usize>,
    diagnostics: Diagnostics,
}

impl<'a> Resolver<'a> {
    fn cancelled(&self) -> bool {
        self.cancel.map(|c| c.load(Ordering::Relaxed)).unwrap_or(false)
    }

    /// Allocate a fresh, not-yet-simulated block at `entry_pc` and enqueue
    /// it. The caller guarantees no existing block already owns this pc.
    fn spawn_block(&mut self, entry_pc: u32, entry_stack: SymbolicStack, worklist: &mut VecDeque<BlockId>) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        let mut block = TACBlock::new(id, entry_pc, entry_pc, entry_stack);
        block.is_jumpdest = self.jumpdests.contains(&entry_pc);
        self.blocks.push(block);
        self.contexts.entry(entry_pc).or_default().push(id);
        worklist.push_back(id);
        id
    }

    /// Find a block whose range strictly contains `pc` (`entry_pc < pc <
    /// end_pc`), i.e. one that needs splitting before anything can start
    /// at `pc`. Unprocessed placeholders (`end_pc == entry_pc`) never
    /// match.
    fn find_covering(&self, pc: u32) -> Option<usize> {
        self.blocks.iter().position(|b| b.entry_pc < pc && pc < b.end_pc)
    }

    /// Resolve `pc` to a block id, splitting, cloning or widening as
    /// needed; creates a fresh block if nothing at all claims `pc` yet.
    fn resolve_or_create(&mut self, pc: u32, incoming: SymbolicStack, worklist: &mut VecDeque<BlockId>) -> BlockId {
        if let Some(idx) = self.find_covering(pc) {
            return self.split_block(idx, pc, worklist);
        }
        let existing = self.contexts.get(&pc).cloned().unwrap_or_default();
        for id in &existing {
            if incoming.le(&self.blocks[id.0 as usize].entry_stack) {
                return *id;
            }
        }
        if existing.is_empty() || existing.len() < self.config.max_clones_per_pc {
            return self.spawn_block(pc, incoming, worklist);
        }
        let primary = existing[0];
        self.diagnostics.record_unresolved(pc, UnresolvedReason::CloneBudgetExhausted);
        self.widen_into(primary, incoming, worklist);
        primary
    }

    fn widen_into(&mut self, id: BlockId, incoming: SymbolicStack, worklist: &mut VecDeque<BlockId>) {
        let current = self.blocks[id.0 as usize].entry_stack.clone();
        let mut merged = current.meet(&incoming, self.config.set_max);
        let count = self.revisits.entry(id).or_insert(0);
        *count += 1;
        if *count > self.config.widen_threshold {
            merged = merged.widen_to_top();
            log::debug!("{id} widened to top after {count} revisits", count = *count);
        }
        if merged != self.blocks[id.0 as usize].entry_stack {
            self.blocks[id.0 as usize].entry_stack = merged;
            worklist.push_back(id);
        }
    }

    /// Split the block at `idx` at `pc`: the prefix keeps `idx`'s identity
    /// and gets a fallthrough edge to the newly materialised suffix block.
    fn split_block(&mut self, idx: usize, pc: u32, worklist: &mut VecDeque<BlockId>) -> BlockId {
        let old_id = self.blocks[idx].id;
        let entry_pc = self.blocks[idx].entry_pc;
        let entry_stack = self.blocks[idx].entry_stack.clone();
        for s in self.blocks[idx].successors.clone() {
            self.blocks[s.0 as usize].predecessors.remove(&old_id);
        }
        log::debug!("splitting {old_id} (entry {entry_pc:#x}) at pc {pc:#x}");
        let prefix = self.simulate(entry_pc, entry_stack, Some(pc));
        {
            let b = &mut self.blocks[idx];
            b.ops = prefix.ops;
            b.end_pc = pc;
            b.exit_stack = prefix.exit_stack.clone();
            b.successors.clear();
            b.fallthrough = None;
            b.malformed = prefix.malformed;
        }
        let new_id = self.resolve_or_create(pc, prefix.exit_stack, worklist);
        self.add_edge(old_id, new_id);
        self.blocks[idx].fallthrough = Some(new_id);
        new_id
    }

    fn add_edge(&mut self, from: BlockId, to: BlockId) {
        self.blocks[from.0 as usize].successors.insert(to);
        self.blocks[to.0 as usize].predecessors.insert(from);
    }

    /// Re-simulate a queued block from scratch (its `entry_stack` may have
    /// changed since it was first spawned) and re-link its outgoing edges.
    fn process(&mut self, id: BlockId, worklist: &mut VecDeque<BlockId>) {
        let entry_pc = self.blocks[id.0 as usize].entry_pc;
        let entry_stack = self.blocks[id.0 as usize].entry_stack.clone();
        for s in self.blocks[id.0 as usize].successors.clone() {
            self.blocks[s.0 as usize].predecessors.remove(&id);
        }
        self.blocks[id.0 as usize].successors.clear();
        self.blocks[id.0 as usize].fallthrough = None;

        let sim = self.simulate(entry_pc, entry_stack, None);
        let exit_stack = sim.exit_stack.clone();
        {
            let b = &mut self.blocks[id.0 as usize];
            b.ops = sim.ops;
            b.end_pc = sim.end_pc;
            b.exit_stack = sim.exit_stack;
            b.malformed = sim.malformed;
        }
        self.link(id, exit_stack, sim.terminator, worklist);
    }

    fn link(&mut self, id: BlockId, exit_stack: SymbolicStack, terminator: Terminator, worklist: &mut VecDeque<BlockId>) {
        match terminator {
            Terminator::Halt | Terminator::RanOffEnd | Terminator::Malformed => {}
            Terminator::Fallthrough(next_pc) => {
                let target = self.resolve_or_create(next_pc, exit_stack, worklist);
                self.add_edge(id, target);
                self.blocks[id.0 as usize].fallthrough = Some(target);
            }
            Terminator::Jump(target_slot) => {
                let src_pc = self.blocks[id.0 as usize].end_pc.saturating_sub(1);
                self.resolve_jump_target(id, &target_slot.value, &exit_stack, src_pc, worklist);
            }
            Terminator::Jumpi(target_slot, cond_slot) => {
                let next_pc = self.blocks[id.0 as usize].end_pc;
                let src_pc = next_pc.saturating_sub(1);
                if cond_allows(&cond_slot.value, false) {
                    let target = self.resolve_or_create(next_pc, exit_stack.clone(), worklist);
                    self.add_edge(id, target);
                    self.blocks[id.0 as usize].fallthrough = Some(target);
                }
                if cond_allows(&cond_slot.value, true) {
                    self.resolve_jump_target(id, &target_slot.value, &exit_stack, src_pc, worklist);
                }
            }
        }
    }

    fn resolve_jump_target(&mut self, id: BlockId, value: &Value, exit_stack: &SymbolicStack, src_pc: u32, worklist: &mut VecDeque<BlockId>) {
        match value {
            Value::Top => self.diagnostics.record_unresolved(src_pc, UnresolvedReason::ValueIsTop),
            Value::Bottom => self.diagnostics.record_unresolved(src_pc, UnresolvedReason::NoValidTarget),
            Value::Finite(set) => {
                let mut any = false;
                for v in set {
                    if *v > U256::from(u32::MAX) {
                        self.diagnostics.record_dropped_edge(src_pc, u64::MAX);
                        continue;
                    }
                    let target_pc = v.to::<u64>() as u32;
                    if self.jumpdests.contains(&target_pc) {
                        any = true;
                        let target = self.resolve_or_create(target_pc, exit_stack.clone(), worklist);
                        self.add_edge(id, target);
                    } else {
                        self.diagnostics.record_dropped_edge(src_pc, v.to::<u64>());
                    }
                }
                if !any {
                    self.diagnostics.record_unresolved(src_pc, UnresolvedReason::NoValidTarget);
                }
            }
        }
    }

    /// Simulate straight-line execution from `entry_pc`, stopping at the
    /// first terminator, at `stop_before` (used to recompute a split
    /// prefix), or upon reaching a pc another block already owns.
    fn simulate(&self, entry_pc: u32, mut stack: SymbolicStack, stop_before: Option<u32>) -> SimResult {
        let mut ops = Vec::new();
        let mut pc = entry_pc;
        let mut first = true;
        loop {
            if !first && (Some(pc) == stop_before || (stop_before.is_none() && self.contexts.contains_key(&pc))) {
                return SimResult {
                    ops,
                    end_pc: pc,
                    exit_stack: stack,
                    terminator: Terminator::Fallthrough(pc),
                    malformed: false,
                };
            }
            first = false;

            let Some(&idx) = self.pc_index.get(&pc) else {
                return SimResult {
                    ops,
                    end_pc: pc,
                    exit_stack: stack,
                    terminator: Terminator::RanOffEnd,
                    malformed: false,
                };
            };
            let ev = &self.ops[idx];
            let opcode = ev.opcode;

            match opcode {
                Opcode::Push(_) | Opcode::Other(code::PUSH0) => {
                    let v = ev.value.unwrap_or(U256::ZERO);
                    let var = Variable::Def { pc, index: 0 };
                    if stack.push(Slot::new(var, Value::singleton(v))).is_err() {
                        return malformed_result(ops, pc, stack);
                    }
                }
                Opcode::Dup(k) => {
                    if stack.dup(k).is_err() {
                        return malformed_result(ops, pc, stack);
                    }
                }
                Opcode::Swap(k) => {
                    if stack.swap(k).is_err() {
                        return malformed_result(ops, pc, stack);
                    }
                }
                Opcode::Other(c) if c == code::POP => {
                    if stack.pop().is_err() {
                        return malformed_result(ops, pc, stack);
                    }
                }
                Opcode::Other(c) if c == code::JUMP => {
                    let Ok(target) = stack.pop() else {
                        return malformed_result(ops, pc, stack);
                    };
                    ops.push(TACOp {
                        pc,
                        opcode,
                        def: None,
                        uses: target.origins.iter().copied().collect(),
                        value: None,
                    });
                    return SimResult {
                        ops,
                        end_pc: pc + 1,
                        exit_stack: stack,
                        terminator: Terminator::Jump(target),
                        malformed: false,
                    };
                }
                Opcode::Other(c) if c == code::JUMPI => {
                    let Ok(target) = stack.pop() else {
                        return malformed_result(ops, pc, stack);
                    };
                    let Ok(cond) = stack.pop() else {
                        return malformed_result(ops, pc, stack);
                    };
                    let mut uses: Vec<Variable> = target.origins.iter().copied().collect();
                    uses.extend(cond.origins.iter().copied());
                    ops.push(TACOp {
                        pc,
                        opcode,
                        def: None,
                        uses,
                        value: None,
                    });
                    return SimResult {
                        ops,
                        end_pc: pc + 1,
                        exit_stack: stack,
                        terminator: Terminator::Jumpi(target, cond),
                        malformed: false,
                    };
                }
                _ if opcode.halts() => {
                    let mut uses = Vec::new();
                    for _ in 0..opcode.pops() {
                        let Ok(slot) = stack.pop() else {
                            return malformed_result(ops, pc, stack);
                        };
                        uses.extend(slot.origins.iter().copied());
                    }
                    ops.push(TACOp {
                        pc,
                        opcode,
                        def: None,
                        uses,
                        value: None,
                    });
                    return SimResult {
                        ops,
                        end_pc: pc + 1 + u32::from(opcode.immediate_width()),
                        exit_stack: stack,
                        terminator: Terminator::Halt,
                        malformed: false,
                    };
                }
                _ => {
                    let pops = opcode.pops();
                    let mut popped = Vec::with_capacity(pops as usize);
                    for _ in 0..pops {
                        let Ok(slot) = stack.pop() else {
                            return malformed_result(ops, pc, stack);
                        };
                        popped.push(slot);
                    }
                    let mut uses = Vec::new();
                    for s in &popped {
                        uses.extend(s.origins.iter().copied());
                    }
                    let byte = opcode.code();
                    let set_max = self.config.set_max;
                    let computed = match popped.len() {
                        1 => apply_unop(byte, &popped[0].value, set_max),
                        2 => apply_binop(byte, &popped[0].value, &popped[1].value, set_max),
                        3 => apply_ternop(byte, &popped[0].value, &popped[1].value, &popped[2].value, set_max),
                        _ => None,
                    };
                    let result_value = computed.unwrap_or_else(|| {
                        if byte == code::PC {
                            Value::singleton(U256::from(pc))
                        } else {
                            Value::top()
                        }
                    });
                    let def = if opcode.pushes() > 0 {
                        let var = Variable::Def { pc, index: 0 };
                        if stack.push(Slot::new(var, result_value.clone())).is_err() {
                            ops.push(TACOp {
                                pc,
                                opcode,
                                def: None,
                                uses,
                                value: None,
                            });
                            return SimResult {
                                ops,
                                end_pc: pc,
                                exit_stack: stack,
                                terminator: Terminator::Malformed,
                                malformed: true,
                            };
                        }
                        Some(var)
                    } else {
                        None
                    };
                    let value = def.map(|_| result_value);
                    ops.push(TACOp {
                        pc,
                        opcode,
                        def,
                        uses,
                        value,
                    });
                }
            }
            pc += 1 + u32::from(opcode.immediate_width());
            if pc >= self.code_end && !self.pc_index.contains_key(&pc) {
                return SimResult {
                    ops,
                    end_pc: pc,
                    exit_stack: stack,
                    terminator: Terminator::RanOffEnd,
                    malformed: false,
                };
            }
        }
    }
}

/// Whether a branch condition is still consistent with `want_nonzero`: any
/// non-concrete condition keeps both branches live.
fn cond_allows(cond: &Value, want_nonzero: bool) -> bool {
    match cond.as_singleton() {
        Some(v) => (v != U256::ZERO) == want_nonzero,
        None => true,
    }
}

/// Drop blocks unreachable from `entry` via successor edges, renumbering
/// the survivors' ids and rewriting every cross-reference. Returns the
/// entry's new id.
fn prune_unreachable(blocks: &mut Vec<TACBlock>, entry: BlockId) -> BlockId {
    let mut reachable = BTreeSet::new();
    let mut stack = vec![entry];
    while let Some(id) = stack.pop() {
        if !reachable.insert(id) {
            continue;
        }
        for &s in &blocks[id.0 as usize].successors {
            stack.push(s);
        }
    }
    if reachable.len() == blocks.len() {
        return entry;
    }
    let mut remap: BTreeMap<BlockId, BlockId> = BTreeMap::new();
    let mut new_blocks = Vec::with_capacity(reachable.len());
    for old_id in blocks.iter().map(|b| b.id) {
        if reachable.contains(&old_id) {
            remap.insert(old_id, BlockId(new_blocks.len() as u32));
            new_blocks.push(blocks[old_id.0 as usize].clone());
        }
    }
    for b in &mut new_blocks {
        b.id = remap[&b.id];
        b.predecessors = b.predecessors.iter().filter_map(|p| remap.get(p).copied()).collect();
        b.successors = b.successors.iter().filter_map(|s| remap.get(s).copied()).collect();
        b.fallthrough = b.fallthrough.and_then(|f| remap.get(&f).copied());
    }
    *blocks = new_blocks;
    remap[&entry]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_hex;

    fn build(hex: &str) -> (Cfg, Diagnostics) {
        let _ = env_logger::builder().is_test(true).try_init();
        let config = Config::default();
        let ops = parse_hex(hex, false).unwrap();
        CfgBuilder::new(&config).build(ops)
    }

    #[test]
    fn straight_line_program_is_one_block() {
        // PUSH1 1; PUSH1 2; ADD; STOP
        let (cfg, diags) = build("6001600201600100");
        assert_eq!(cfg.blocks().len(), 1);
        assert!(cfg.block(cfg.entry()).successors.is_empty());
        assert!(diags.unresolved_jumps.is_empty());
    }

    #[test]
    fn constant_jump_links_two_blocks() {
        // PUSH1 4; JUMP; JUMPDEST; STOP
        let (cfg, diags) = build("6004565b00");
        assert_eq!(cfg.blocks().len(), 2);
        let entry = cfg.block(cfg.entry());
        assert_eq!(entry.successors.len(), 1);
        assert!(diags.unresolved_jumps.is_empty());
    }

    #[test]
    fn jumpi_with_unknown_condition_has_both_successors() {
        // PUSH1 6; CALLDATALOAD; PUSH1 6; JUMPI; STOP; JUMPDEST; STOP
        let (cfg, _diags) = build("600635600657005b00");
        let entry = cfg.block(cfg.entry());
        assert_eq!(entry.successors.len(), 2);
    }

    #[test]
    fn jump_to_non_jumpdest_is_dropped_not_linked() {
        // PUSH1 3; JUMP; STOP  (pc 3 is not a JUMPDEST)
        let (cfg, diags) = build("60035600");
        let entry = cfg.block(cfg.entry());
        assert!(entry.successors.is_empty());
        assert_eq!(diags.dropped_edges.len() + diags.unresolved_jumps.len(), 1);
    }

    #[test]
    fn unresolved_top_target_records_diagnostic_without_panicking() {
        // CALLDATALOAD; JUMP
        let (cfg, diags) = build("3556");
        let entry = cfg.block(cfg.entry());
        assert!(entry.successors.is_empty());
        assert!(matches!(
            diags.unresolved_jumps.first(),
            Some(crate::diagnostics::UnresolvedJump {
                reason: UnresolvedReason::ValueIsTop,
                ..
            })
        ));
    }

    #[test]
    fn empty_bytecode_yields_single_empty_entry_block() {
        let (cfg, _diags) = build("");
        assert_eq!(cfg.blocks().len(), 1);
        assert!(cfg.block(cfg.entry()).ops.is_empty());
    }

    #[test]
    fn loop_back_edge_terminates_via_widening() {
        // JUMPDEST(0); PUSH1 1; POP; PUSH1 0; JUMPI 0 -> loops back to pc 0
        let (cfg, _diags) = build("5b6001506000600057");
        assert!(!cfg.blocks().is_empty());
    }

    #[test]
    fn export_id_disambiguates_clones_sharing_entry_pc() {
        let (cfg, _diags) = build("6004565b00");
        for b in cfg.blocks() {
            let _ = cfg.export_id(b.id);
        }
    }
}
