//! Static decompiler for EVM bytecode: lifts raw bytecode to three-address
//! code over a resolved control-flow graph.
//!
//! The pipeline is [`parser`] (bytes/listing → flat op sequence) feeding
//! [`cfg`] (the worklist-driven lifter and CFG resolver, the hardest part
//! of this crate), with [`lattice`] and [`stack`] underneath it doing the
//! abstract interpretation. [`dominance`] and [`export`] consume the
//! resolved [`cfg::Cfg`] afterwards; [`disasm`] and [`optimize`] are
//! independent views over it. None of this crate drives a CLI, loads a
//! config file, renders a graph, or hosts the Datalog rule engine the
//! exported facts feed — those are all driver-side concerns that live
//! outside this library.

pub mod cfg;
pub mod config;
pub mod diagnostics;
pub mod disasm;
pub mod dominance;
pub mod export;
pub mod lattice;
pub mod opcode;
pub mod optimize;
pub mod parser;
pub mod stack;
pub mod tac;

pub use cfg::{Cfg, CfgBuilder};
pub use config::Config;
pub use diagnostics::Diagnostics;
pub use opcode::Opcode;

use std::sync::atomic::AtomicBool;

/// Lift a hex-encoded bytecode string straight through to a resolved CFG,
/// the common case for a caller that doesn't need the intermediate op
/// sequence. Equivalent to `parser::parse_hex` followed by
/// `CfgBuilder::build`.
///
/// # Errors
///
/// Returns [`parser::Error`] only in `config.strict` mode, for malformed
/// hex or an unrecognised opcode; lenient mode (the default) never fails
/// here, recording any trouble in the returned [`Diagnostics`] instead.
pub fn lift(hex: &str, config: &Config) -> Result<(Cfg, Diagnostics), parser::Error> {
    let ops = parser::parse_hex(hex, config.strict)?;
    Ok(CfgBuilder::new(config).build(ops))
}

/// As [`lift`], but with an externally-owned cancellation flag the builder
/// polls between worklist items. The flag is never set by this crate; a
/// driver wires it to whatever deadline or signal handling it uses.
pub fn lift_cancellable(hex: &str, config: &Config, cancel: &AtomicBool) -> Result<(Cfg, Diagnostics), parser::Error> {
    let ops = parser::parse_hex(hex, config.strict)?;
    Ok(CfgBuilder::new(config).with_cancel(cancel).build(ops))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lift_end_to_end_simple_program() {
        let config = Config::default();
        let (cfg, diagnostics) = lift("6001600201600100", &config).unwrap();
        assert_eq!(cfg.blocks().len(), 1);
        assert!(diagnostics.unresolved_jumps.is_empty());
    }

    #[test]
    fn lift_strict_mode_surfaces_malformed_input() {
        let mut config = Config::default();
        config.strict = true;
        assert!(lift("0x0", &config).is_err());
    }
}
