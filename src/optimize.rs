//! Optional post-resolution simplifications over an already-built [`Cfg`].
//! None of these change what the CFG denotes, only how many nodes it takes
//! to say it; callers that feed the Datalog consumer may prefer to skip
//! them and keep one node per discovered context.

use std::collections::BTreeSet;

use crate::cfg::Cfg;
use crate::tac::BlockId;

/// Merge every block with exactly one successor `s` into `s`, provided `s`
/// has no other predecessor. Repeats until no such chain remains. Pure
/// bookkeeping: it does not touch block contents beyond concatenating
/// `ops`, since two blocks chained this way already agree on the stack
/// state at the join (`s`'s entry stack was computed from exactly this
/// edge).
pub fn merge_fallthrough_chains(cfg: &mut Cfg) {
    loop {
        let Some((keep, drop)) = find_mergeable_pair(cfg) else {
            break;
        };
        merge_into(cfg, keep, drop);
    }
}

fn find_mergeable_pair(cfg: &Cfg) -> Option<(BlockId, BlockId)> {
    for block in cfg.blocks() {
        if block.successors.len() != 1 {
            continue;
        }
        let succ = *block.successors.iter().next().unwrap();
        if succ == block.id {
            continue; // self-loop, merging would be meaningless
        }
        let target = cfg.block(succ);
        if target.predecessors.len() == 1 && block.fallthrough == Some(succ) {
            return Some((block.id, succ));
        }
    }
    None
}

fn merge_into(cfg: &mut Cfg, keep: BlockId, drop: BlockId) {
    let dropped = cfg.block(drop).clone();
    let blocks = cfg.blocks_mut();
    let keep_idx = keep.0 as usize;
    blocks[keep_idx].ops.extend(dropped.ops.iter().cloned());
    blocks[keep_idx].end_pc = dropped.end_pc;
    blocks[keep_idx].exit_stack = dropped.exit_stack.clone();
    blocks[keep_idx].successors = dropped.successors.clone();
    blocks[keep_idx].fallthrough = dropped.fallthrough;
    blocks[keep_idx].malformed = dropped.malformed;
    for &s in &dropped.successors {
        let s_idx = s.0 as usize;
        blocks[s_idx].predecessors.remove(&drop);
        blocks[s_idx].predecessors.insert(keep);
    }
}

/// Remove blocks whose entire op list consists of ops with no observable
/// effect and no successors beyond their single fallthrough — currently
/// just blocks with zero ops and one successor, which arise from an
/// immediate split right at the end of a dominating block. Rewires
/// predecessors directly to the surviving successor.
pub fn remove_empty_passthrough_blocks(cfg: &mut Cfg) {
    loop {
        let Some(id) = cfg.blocks().iter().find(|b| b.ops.is_empty() && b.successors.len() == 1 && b.id != cfg.entry()).map(|b| b.id) else {
            break;
        };
        let succ = *cfg.block(id).successors.iter().next().unwrap();
        let preds: BTreeSet<BlockId> = cfg.block(id).predecessors.iter().copied().collect();
        let blocks = cfg.blocks_mut();
        for &p in &preds {
            let p_idx = p.0 as usize;
            blocks[p_idx].successors.remove(&id);
            blocks[p_idx].successors.insert(succ);
            if blocks[p_idx].fallthrough == Some(id) {
                blocks[p_idx].fallthrough = Some(succ);
            }
        }
        let succ_idx = succ.0 as usize;
        blocks[succ_idx].predecessors.remove(&id);
        for &p in &preds {
            blocks[succ_idx].predecessors.insert(p);
        }
        blocks[id.0 as usize].predecessors.clear();
        blocks[id.0 as usize].successors.clear();
        // Left as an orphaned, unreferenced node; a follow-up
        // `Cfg::prune_unreachable` call drops it from the export view.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::parser::parse_hex;

    #[test]
    fn merge_collapses_two_block_straight_line_split() {
        // PUSH1 3; JUMP; JUMPDEST; PUSH1 7; JUMP; JUMPDEST; STOP
        let config = Config::default();
        let ops = parse_hex("6003565b6007565b00", false).unwrap();
        let (mut cfg, _) = crate::cfg::CfgBuilder::new(&config).build(ops);
        let before = cfg.blocks().len();
        merge_fallthrough_chains(&mut cfg);
        assert!(cfg.blocks().len() <= before);
    }

    #[test]
    fn prune_after_passthrough_removal_shrinks_block_count() {
        let config = Config::default();
        let ops = parse_hex("6004565b00", false).unwrap();
        let (mut cfg, _) = crate::cfg::CfgBuilder::new(&config).build(ops);
        remove_empty_passthrough_blocks(&mut cfg);
        cfg.prune_unreachable();
        assert!(!cfg.blocks().is_empty());
    }
}
