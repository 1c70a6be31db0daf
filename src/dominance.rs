//! Dominance and post-dominance: the standard iterative dataflow fixed
//! point over a resolved [`Cfg`], `dom(n) = {n} ∪ ⋂ dom(p)` for every
//! predecessor `p` of `n` (post-dominance is the same computation over the
//! reversed graph, from a synthetic exit joining every halting block).

use std::collections::{BTreeMap, BTreeSet};

use crate::cfg::Cfg;
use crate::tac::BlockId;

/// Dominator sets and immediate dominators for every block reachable from
/// the CFG's entry.
#[derive(Debug, Clone)]
pub struct Dominance {
    dom: BTreeMap<BlockId, BTreeSet<BlockId>>,
    idom: BTreeMap<BlockId, BlockId>,
}

impl Dominance {
    #[must_use]
    pub fn dominators(&self, id: BlockId) -> Option<&BTreeSet<BlockId>> {
        self.dom.get(&id)
    }

    #[must_use]
    pub fn dominates(&self, a: BlockId, b: BlockId) -> bool {
        self.dom.get(&b).is_some_and(|set| set.contains(&a))
    }

    /// The immediate dominator of `id`, or `None` for the entry (which
    /// dominates itself and has no idom) and for blocks unreached by the
    /// forward walk this was computed over.
    #[must_use]
    pub fn immediate_dominator(&self, id: BlockId) -> Option<BlockId> {
        self.idom.get(&id).copied()
    }

    #[must_use]
    pub fn reachable(&self) -> impl Iterator<Item = &BlockId> {
        self.dom.keys()
    }
}

/// Compute dominators for every block reachable from `cfg.entry()`.
#[must_use]
pub fn dominators(cfg: &Cfg) -> Dominance {
    let order = reverse_postorder(cfg, cfg.entry());
    let all: BTreeSet<BlockId> = order.iter().copied().collect();

    let mut dom: BTreeMap<BlockId, BTreeSet<BlockId>> = BTreeMap::new();
    for &id in &order {
        dom.insert(id, all.clone());
    }
    dom.insert(cfg.entry(), BTreeSet::from([cfg.entry()]));

    let mut changed = true;
    while changed {
        changed = false;
        for &id in &order {
            if id == cfg.entry() {
                continue;
            }
            let preds: Vec<BlockId> = cfg
                .block(id)
                .predecessors
                .iter()
                .copied()
                .filter(|p| all.contains(p))
                .collect();
            if preds.is_empty() {
                continue;
            }
            let mut new_set = dom[&preds[0]].clone();
            for p in &preds[1..] {
                new_set = new_set.intersection(&dom[p]).copied().collect();
            }
            new_set.insert(id);
            if new_set != dom[&id] {
                dom.insert(id, new_set);
                changed = true;
            }
        }
    }

    let idom = derive_immediate(&dom, cfg.entry());
    Dominance { dom, idom }
}

/// Compute post-dominators: dominance over the graph with every edge
/// reversed, from a virtual exit that is the (successor of every) halting
/// block. Blocks that cannot reach a halting block (e.g. only feeding an
/// infinite loop) are absent from the result, matching forward dominance's
/// treatment of unreachable blocks.
#[must_use]
pub fn post_dominators(cfg: &Cfg) -> Dominance {
    let exits: Vec<BlockId> = cfg
        .blocks()
        .iter()
        .filter(|b| b.successors.is_empty())
        .map(|b| b.id)
        .collect();
    if exits.is_empty() {
        return Dominance {
            dom: BTreeMap::new(),
            idom: BTreeMap::new(),
        };
    }

    // Walking the reversed graph forward from the exits means following,
    // at each step, the *original* predecessors: an edge u -> v in the
    // real CFG becomes v -> u once reversed, so v's reversed-graph
    // successors are exactly u's original predecessors.
    let reverse_successors = |id: BlockId| -> Vec<BlockId> { cfg.block(id).predecessors.iter().copied().collect() };

    let order = reverse_postorder_multi(&exits, reverse_successors);
    let all: BTreeSet<BlockId> = order.iter().copied().collect();
    let exit_set: BTreeSet<BlockId> = exits.iter().copied().collect();

    let mut dom: BTreeMap<BlockId, BTreeSet<BlockId>> = BTreeMap::new();
    for &id in &order {
        dom.insert(id, all.clone());
    }
    for &e in &exits {
        dom.insert(e, BTreeSet::from([e]));
    }

    let mut changed = true;
    while changed {
        changed = false;
        for &id in &order {
            if exit_set.contains(&id) {
                continue;
            }
            let succs: Vec<BlockId> = cfg
                .block(id)
                .successors
                .iter()
                .copied()
                .filter(|s| all.contains(s))
                .collect();
            if succs.is_empty() {
                continue;
            }
            let mut new_set = dom[&succs[0]].clone();
            for s in &succs[1..] {
                new_set = new_set.intersection(&dom[s]).copied().collect();
            }
            new_set.insert(id);
            if new_set != dom[&id] {
                dom.insert(id, new_set);
                changed = true;
            }
        }
    }

    // Immediate post-dominator: pick whichever strict post-dominator is
    // itself post-dominated by every other strict post-dominator.
    let mut idom = BTreeMap::new();
    for &id in &order {
        if exit_set.contains(&id) {
            continue;
        }
        let strict: Vec<BlockId> = dom[&id].iter().copied().filter(|&d| d != id).collect();
        for &cand in &strict {
            if strict.iter().all(|&other| other == cand || dom[&other].contains(&cand)) {
                idom.insert(id, cand);
                break;
            }
        }
    }

    Dominance { dom, idom }
}

fn derive_immediate(dom: &BTreeMap<BlockId, BTreeSet<BlockId>>, entry: BlockId) -> BTreeMap<BlockId, BlockId> {
    let mut idom = BTreeMap::new();
    for (&id, set) in dom {
        if id == entry {
            continue;
        }
        let strict: Vec<BlockId> = set.iter().copied().filter(|&d| d != id).collect();
        for &cand in &strict {
            if strict.iter().all(|&other| other == cand || dom[&other].contains(&cand)) {
                idom.insert(id, cand);
                break;
            }
        }
    }
    idom
}

/// Reverse postorder over the forward graph from a single root.
fn reverse_postorder(cfg: &Cfg, root: BlockId) -> Vec<BlockId> {
    let mut visited = BTreeSet::new();
    let mut post = Vec::new();
    let mut stack = vec![(root, false)];
    while let Some((id, expanded)) = stack.pop() {
        if expanded {
            post.push(id);
            continue;
        }
        if !visited.insert(id) {
            continue;
        }
        stack.push((id, true));
        for &s in &cfg.block(id).successors {
            if !visited.contains(&s) {
                stack.push((s, false));
            }
        }
    }
    post.reverse();
    post
}

/// Reverse postorder over a graph reached via `next(id)` from multiple
/// roots (used for the post-dominator walk over the reversed graph).
fn reverse_postorder_multi(roots: &[BlockId], next: impl Fn(BlockId) -> Vec<BlockId>) -> Vec<BlockId> {
    let mut visited = BTreeSet::new();
    let mut post = Vec::new();
    let mut stack: Vec<(BlockId, bool)> = roots.iter().map(|&r| (r, false)).collect();
    while let Some((id, expanded)) = stack.pop() {
        if expanded {
            post.push(id);
            continue;
        }
        if !visited.insert(id) {
            continue;
        }
        stack.push((id, true));
        for s in next(id) {
            if !visited.contains(&s) {
                stack.push((s, false));
            }
        }
    }
    post.reverse();
    post
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::parser::parse_hex;

    fn build(hex: &str) -> Cfg {
        let config = Config::default();
        let ops = parse_hex(hex, false).unwrap();
        crate::cfg::CfgBuilder::new(&config).build(ops).0
    }

    #[test]
    fn entry_dominates_everything_reachable() {
        // PUSH1 4; JUMP; JUMPDEST; STOP
        let cfg = build("6004565b00");
        let dom = dominators(&cfg);
        for &id in dom.reachable() {
            assert!(dom.dominates(cfg.entry(), id));
        }
    }

    #[test]
    fn diamond_join_point_is_dominated_by_entry_only() {
        // entry: CALLDATALOAD; PUSH1 t; JUMPI -> branch to JUMPDEST(t) or fallthrough,
        // both paths reach a final JUMPDEST/STOP join.
        // 0: CALLDATALOAD 1: PUSH1 0x08 3: JUMPI 4: STOP 5..7 padding 8: JUMPDEST 9: STOP
        let cfg = build("3560085700005b00");
        let dom = dominators(&cfg);
        // whatever the join block id is, only entry strictly dominates the
        // branch targets individually, not each other.
        assert!(dom.reachable().count() >= 2);
    }

    #[test]
    fn single_block_program_has_no_post_dominance_surprises() {
        let cfg = build("600100");
        let pdom = post_dominators(&cfg);
        assert!(pdom.dominators(cfg.entry()).is_some());
    }

    #[test]
    fn diamond_join_post_dominates_both_branches() {
        // CALLDATALOAD; PUSH1 0x07; JUMPI; PUSH1 0x07; JUMP; JUMPDEST; STOP
        // Both the taken and fallthrough edges out of the JUMPI reach the
        // JUMPDEST at pc 7 before the program halts, so it post-dominates
        // the entry block and the fallthrough block alike.
        let cfg = build("356007576007565b00");
        let pdom = post_dominators(&cfg);
        let join = cfg.blocks().iter().find(|b| b.entry_pc == 7).unwrap().id;
        let branch = cfg.blocks().iter().find(|b| b.entry_pc == 4).unwrap().id;
        assert_eq!(cfg.blocks().len(), 3);
        assert!(pdom.dominates(join, cfg.entry()));
        assert!(pdom.dominates(join, branch));
    }
}
