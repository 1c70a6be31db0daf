//! TSV fact export: turns a resolved [`Cfg`] (plus its dominance info and
//! diagnostics) into the flat relations an external Datalog analyser reads.
//! Producing and loading the rule library that consumes these relations is
//! out of scope here; this module owns only the wire format of the facts
//! themselves.

use std::fs;
use std::io;
use std::path::Path;

use crate::cfg::Cfg;
use crate::diagnostics::Diagnostics;
use crate::dominance::Dominance;
use crate::tac::BlockId;

/// One named TSV relation: `name` is the `.facts` file stem a driver would
/// write this under (e.g. `block.facts`), `rows` is already-formatted
/// tab-separated, newline-terminated content.
#[derive(Debug, Clone)]
pub struct Relation {
    pub name: &'static str,
    pub rows: String,
}

/// All exported relations from one build, in the stable order a driver
/// should write them.
#[derive(Debug, Clone, Default)]
pub struct Facts {
    pub relations: Vec<Relation>,
}

impl Facts {
    #[must_use]
    pub fn relation(&self, name: &str) -> Option<&str> {
        self.relations.iter().find(|r| r.name == name).map(|r| r.rows.as_str())
    }

    /// Write every relation to `<dir>/<name>.facts`, creating `dir` if it
    /// doesn't already exist.
    pub fn write_to_dir(&self, dir: &Path) -> io::Result<()> {
        fs::create_dir_all(dir)?;
        for relation in &self.relations {
            fs::write(dir.join(format!("{}.facts", relation.name)), &relation.rows)?;
        }
        Ok(())
    }
}

fn push_row(out: &mut String, cols: &[&str]) {
    for (i, c) in cols.iter().enumerate() {
        if i > 0 {
            out.push('\t');
        }
        out.push_str(c);
    }
    out.push('\n');
}

/// Export every relation for `cfg`. `dom`/`pdom` may be omitted (e.g. a
/// caller only wants block/op/edge facts); when present their relations are
/// included.
#[must_use]
pub fn export(cfg: &Cfg, dom: Option<&Dominance>, pdom: Option<&Dominance>, diagnostics: &Diagnostics) -> Facts {
    let id_str = |id: BlockId| cfg.export_id(id);

    let mut block = String::new();
    let mut op = String::new();
    let mut edge = String::new();
    let mut entry = String::new();
    let mut exit = String::new();
    let mut def = String::new();
    let mut use_rel = String::new();
    let mut value = String::new();

    for b in cfg.blocks() {
        let bid = id_str(b.id);
        push_row(&mut block, &[&bid]);
        if b.successors.is_empty() {
            push_row(&mut exit, &[&bid]);
        }
        for s in &b.successors {
            push_row(&mut edge, &[&bid, &id_str(*s)]);
        }
        for o in &b.ops {
            let op_pc = format!("{:#x}", o.pc);
            push_row(&mut op, &[&op_pc, &o.opcode.name()]);
            if let Some(d) = o.def {
                push_row(&mut def, &[&op_pc, &d.to_string()]);
            }
            for (pos, u) in o.uses.iter().enumerate() {
                push_row(&mut use_rel, &[&op_pc, &pos.to_string(), &u.to_string()]);
            }
            if let (Some(d), Some(v)) = (o.def, &o.value) {
                if let Some(c) = v.as_singleton() {
                    push_row(&mut value, &[&d.to_string(), &format!("{c:#x}")]);
                }
            }
        }
    }
    push_row(&mut entry, &[&id_str(cfg.entry())]);

    let mut unresolved_jump = String::new();
    for u in &diagnostics.unresolved_jumps {
        push_row(&mut unresolved_jump, &[&format!("{:#x}", u.pc), &u.reason.to_string()]);
    }

    let mut relations = vec![
        Relation { name: "block", rows: block },
        Relation { name: "op", rows: op },
        Relation { name: "edge", rows: edge },
        Relation { name: "entry", rows: entry },
        Relation { name: "exit", rows: exit },
        Relation { name: "def", rows: def },
        Relation { name: "use", rows: use_rel },
        Relation { name: "value", rows: value },
        Relation {
            name: "unresolved_jump",
            rows: unresolved_jump,
        },
    ];

    if let Some(dom) = dom {
        relations.push(Relation {
            name: "dom",
            rows: dominance_rows(cfg, dom),
        });
        relations.push(Relation {
            name: "imdom",
            rows: immediate_rows(cfg, dom),
        });
    }
    if let Some(pdom) = pdom {
        relations.push(Relation {
            name: "pdom",
            rows: dominance_rows(cfg, pdom),
        });
        relations.push(Relation {
            name: "impdom",
            rows: immediate_rows(cfg, pdom),
        });
    }

    Facts { relations }
}

fn dominance_rows(cfg: &Cfg, dom: &Dominance) -> String {
    let mut out = String::new();
    for &id in dom.reachable() {
        if let Some(set) = dom.dominators(id) {
            for &d in set {
                push_row(&mut out, &[&cfg.export_id(id), &cfg.export_id(d)]);
            }
        }
    }
    out
}

fn immediate_rows(cfg: &Cfg, dom: &Dominance) -> String {
    let mut out = String::new();
    for &id in dom.reachable() {
        if let Some(d) = dom.immediate_dominator(id) {
            push_row(&mut out, &[&cfg.export_id(id), &cfg.export_id(d)]);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::dominance::{dominators, post_dominators};
    use crate::parser::parse_hex;

    #[test]
    fn block_and_edge_relations_are_populated() {
        let config = Config::default();
        let ops = parse_hex("6004565b00", false).unwrap();
        let (cfg, diagnostics) = crate::cfg::CfgBuilder::new(&config).build(ops);
        let dom = dominators(&cfg);
        let pdom = post_dominators(&cfg);
        let facts = export(&cfg, Some(&dom), Some(&pdom), &diagnostics);
        assert!(!facts.relation("block").unwrap().is_empty());
        assert!(!facts.relation("edge").unwrap().is_empty());
        assert!(!facts.relation("entry").unwrap().is_empty());
    }

    #[test]
    fn unresolved_jump_relation_reflects_diagnostics() {
        let config = Config::default();
        let ops = parse_hex("3556", false).unwrap();
        let (cfg, diagnostics) = crate::cfg::CfgBuilder::new(&config).build(ops);
        let facts = export(&cfg, None, None, &diagnostics);
        assert!(!facts.relation("unresolved_jump").unwrap().is_empty());
    }

    #[test]
    fn write_to_dir_creates_one_file_per_relation() {
        let config = Config::default();
        let ops = parse_hex("6004565b00", false).unwrap();
        let (cfg, diagnostics) = crate::cfg::CfgBuilder::new(&config).build(ops);
        let facts = export(&cfg, None, None, &diagnostics);
        let dir = std::env::temp_dir().join(format!("tac-cfg-export-test-{}", std::process::id()));
        facts.write_to_dir(&dir).unwrap();
        assert!(dir.join("block.facts").exists());
        assert!(dir.join("edge.facts").exists());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
