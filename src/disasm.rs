//! Plain disassembly view: renders a decoded op stream (or a resolved CFG)
//! back to `pc  MNEMONIC  immediate?` text, independent of TAC lowering or
//! CFG resolution.

use std::fmt::Write as _;

use crate::cfg::Cfg;
use crate::parser::{partition_blocks, EVMOp};

/// Render a flat op sequence, one instruction per line.
#[must_use]
pub fn disassemble(ops: &[EVMOp]) -> String {
    let mut out = String::new();
    for op in ops {
        render_line(&mut out, op);
    }
    out
}

/// As [`disassemble`], but with a blank line between each of the parser's
/// initial straight-line seeds (see [`partition_blocks`]), for a driver's
/// `-p/--prettify` flag to colourise around. Colour itself is a terminal
/// concern left to the driver; this only supplies the block-separated text.
#[must_use]
pub fn disassemble_pretty(ops: &[EVMOp]) -> String {
    let mut out = String::new();
    for (i, seed) in partition_blocks(ops).iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        for op in &ops[seed.op_start..seed.op_end] {
            render_line(&mut out, op);
        }
    }
    out
}

/// Render a resolved CFG block-by-block, with a blank line between blocks
/// and a `; -> <id>` trailer on blocks whose only successor is a
/// fallthrough, so the block structure is visible without a graph viewer
/// (which is out of scope for this crate).
#[must_use]
pub fn disassemble_cfg(cfg: &Cfg) -> String {
    let mut out = String::new();
    for (i, block) in cfg.blocks().iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let _ = writeln!(out, "; block {} [{:#x}, {:#x})", cfg.export_id(block.id), block.entry_pc, block.end_pc);
        for tac_op in &block.ops {
            let _ = write!(out, "{:#06x}\t{}", tac_op.pc, tac_op.opcode.name());
            out.push('\n');
        }
        if block.successors.is_empty() {
            let _ = writeln!(out, "; no successors");
        } else {
            for s in &block.successors {
                let marker = if block.fallthrough == Some(*s) { "fallthrough" } else { "jump" };
                let _ = writeln!(out, "; -> {} ({marker})", cfg.export_id(*s));
            }
        }
    }
    out
}

fn render_line(out: &mut String, op: &EVMOp) {
    let _ = write!(out, "{:#06x}\t{}", op.pc, op.opcode.name());
    if let Some(v) = op.value {
        let _ = write!(out, " {v:#x}");
    }
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::parser::parse_hex;

    #[test]
    fn disassembly_round_trips_mnemonics() {
        let ops = parse_hex("6001600200", false).unwrap();
        let text = disassemble(&ops);
        assert!(text.contains("PUSH1"));
        assert!(text.contains("0x1"));
        assert!(text.contains("STOP"));
    }

    #[test]
    fn pretty_disassembly_blank_lines_between_seeds() {
        // PUSH1 4; JUMP; JUMPDEST; STOP -- a jump cuts a seed boundary.
        let ops = parse_hex("6004565b00", false).unwrap();
        let text = disassemble_pretty(&ops);
        assert!(text.contains("\n\n"));
    }

    #[test]
    fn cfg_view_marks_block_boundaries() {
        let config = Config::default();
        let ops = parse_hex("6004565b00", false).unwrap();
        let (cfg, _) = crate::cfg::CfgBuilder::new(&config).build(ops);
        let text = disassemble_cfg(&cfg);
        assert!(text.contains("; block"));
    }
}
