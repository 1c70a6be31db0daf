//! The EVM opcode table: a total, byte-indexed description of every instruction.
//!
//! Mirrors the "polymorphic opcode" design: `Opcode` is a small sum type
//! (`Push`/`Dup`/`Swap`/`Other`) rather than a per-mnemonic variant, and the
//! pops/pushes/flags for any concrete byte are resolved through a static
//! descriptor table (`descriptor`), so lookup is total for every `u8`.

use bitflags::bitflags;
use std::fmt;

/// Raw byte values for every opcode this crate gives special treatment to.
/// Kept as plain `u8` constants (rather than an enum) so `Opcode::Other`
/// can be matched against them directly, the way a descriptor table lookup
/// would in the original interpreter.
#[allow(missing_docs)]
pub mod code {
    pub const STOP: u8 = 0x00;
    pub const ADD: u8 = 0x01;
    pub const MUL: u8 = 0x02;
    pub const SUB: u8 = 0x03;
    pub const DIV: u8 = 0x04;
    pub const SDIV: u8 = 0x05;
    pub const MOD: u8 = 0x06;
    pub const SMOD: u8 = 0x07;
    pub const ADDMOD: u8 = 0x08;
    pub const MULMOD: u8 = 0x09;
    pub const EXP: u8 = 0x0a;
    pub const SIGNEXTEND: u8 = 0x0b;

    pub const LT: u8 = 0x10;
    pub const GT: u8 = 0x11;
    pub const SLT: u8 = 0x12;
    pub const SGT: u8 = 0x13;
    pub const EQ: u8 = 0x14;
    pub const ISZERO: u8 = 0x15;
    pub const AND: u8 = 0x16;
    pub const OR: u8 = 0x17;
    pub const XOR: u8 = 0x18;
    pub const NOT: u8 = 0x19;
    pub const BYTE: u8 = 0x1a;
    pub const SHL: u8 = 0x1b;
    pub const SHR: u8 = 0x1c;
    pub const SAR: u8 = 0x1d;

    pub const KECCAK256: u8 = 0x20;

    pub const ADDRESS: u8 = 0x30;
    pub const BALANCE: u8 = 0x31;
    pub const ORIGIN: u8 = 0x32;
    pub const CALLER: u8 = 0x33;
    pub const CALLVALUE: u8 = 0x34;
    pub const CALLDATALOAD: u8 = 0x35;
    pub const CALLDATASIZE: u8 = 0x36;
    pub const CALLDATACOPY: u8 = 0x37;
    pub const CODESIZE: u8 = 0x38;
    pub const CODECOPY: u8 = 0x39;
    pub const GASPRICE: u8 = 0x3a;
    pub const EXTCODESIZE: u8 = 0x3b;
    pub const EXTCODECOPY: u8 = 0x3c;
    pub const RETURNDATASIZE: u8 = 0x3d;
    pub const RETURNDATACOPY: u8 = 0x3e;
    pub const EXTCODEHASH: u8 = 0x3f;

    pub const BLOCKHASH: u8 = 0x40;
    pub const COINBASE: u8 = 0x41;
    pub const TIMESTAMP: u8 = 0x42;
    pub const NUMBER: u8 = 0x43;
    pub const DIFFICULTY: u8 = 0x44;
    pub const GASLIMIT: u8 = 0x45;
    pub const CHAINID: u8 = 0x46;
    pub const SELFBALANCE: u8 = 0x47;
    pub const BASEFEE: u8 = 0x48;

    pub const POP: u8 = 0x50;
    pub const MLOAD: u8 = 0x51;
    pub const MSTORE: u8 = 0x52;
    pub const MSTORE8: u8 = 0x53;
    pub const SLOAD: u8 = 0x54;
    pub const SSTORE: u8 = 0x55;
    pub const JUMP: u8 = 0x56;
    pub const JUMPI: u8 = 0x57;
    pub const PC: u8 = 0x58;
    pub const MSIZE: u8 = 0x59;
    pub const GAS: u8 = 0x5a;
    pub const JUMPDEST: u8 = 0x5b;

    pub const PUSH0: u8 = 0x5f;
    pub const PUSH1: u8 = 0x60;
    pub const PUSH32: u8 = 0x7f;

    pub const DUP1: u8 = 0x80;
    pub const DUP16: u8 = 0x8f;

    pub const SWAP1: u8 = 0x90;
    pub const SWAP16: u8 = 0x9f;

    pub const LOG0: u8 = 0xa0;
    pub const LOG4: u8 = 0xa4;

    pub const CREATE: u8 = 0xf0;
    pub const CALL: u8 = 0xf1;
    pub const CALLCODE: u8 = 0xf2;
    pub const RETURN: u8 = 0xf3;
    pub const DELEGATECALL: u8 = 0xf4;
    pub const CREATE2: u8 = 0xf5;
    pub const STATICCALL: u8 = 0xfa;
    pub const REVERT: u8 = 0xfd;
    pub const INVALID: u8 = 0xfe;
    pub const SELFDESTRUCT: u8 = 0xff;
}

bitflags! {
    /// Static category flags attached to an opcode's descriptor.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Flags: u8 {
        /// Execution halts after this op (no successors).
        const HALTS = 1 << 0;
        /// `JUMP`/`JUMPI`, plus anything that halts.
        const ALTERS_FLOW = 1 << 1;
        /// Legal landing site for `JUMP`/`JUMPI`.
        const IS_JUMPDEST = 1 << 2;
    }
}

/// Static per-opcode descriptor: everything the lifter needs to know about
/// a byte value that isn't already encoded in `Opcode` itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor {
    pub name: &'static str,
    pub pops: u8,
    pub pushes: u8,
    pub flags: Flags,
}

impl Descriptor {
    pub fn halts(&self) -> bool {
        self.flags.contains(Flags::HALTS)
    }
    pub fn alters_flow(&self) -> bool {
        self.flags.contains(Flags::ALTERS_FLOW)
    }
    pub fn is_jumpdest(&self) -> bool {
        self.flags.contains(Flags::IS_JUMPDEST)
    }
}

const fn d(name: &'static str, pops: u8, pushes: u8, flags: Flags) -> Descriptor {
    Descriptor {
        name,
        pops,
        pushes,
        flags,
    }
}

const NONE: Flags = Flags::empty();
const HALT: Flags = Flags::HALTS;
const FLOW: Flags = Flags::ALTERS_FLOW;

/// Opcode: a small sum type rather than 256 named variants. `Push`/`Dup`/
/// `Swap` carry the parameter the spec calls out as varying (immediate
/// width, dup/swap depth); everything else is `Other(code)`, resolved
/// through [`descriptor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// `PUSHn`, `width` in `1..=32` bytes of immediate.
    Push(u8),
    /// `DUPk`, `k` in `1..=16`.
    Dup(u8),
    /// `SWAPk`, `k` in `1..=16`.
    Swap(u8),
    /// Every other byte value, including unassigned ones (mapped to
    /// `INVALID`).
    Other(u8),
}

impl Opcode {
    /// Total lookup: every byte value decodes to some `Opcode`.
    #[must_use]
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            code::PUSH1..=code::PUSH32 => Opcode::Push(byte - code::PUSH1 + 1),
            code::DUP1..=code::DUP16 => Opcode::Dup(byte - code::DUP1 + 1),
            code::SWAP1..=code::SWAP16 => Opcode::Swap(byte - code::SWAP1 + 1),
            other => Opcode::Other(other),
        }
    }

    /// The raw byte this opcode encodes to.
    #[must_use]
    pub fn code(&self) -> u8 {
        match *self {
            Opcode::Push(width) => code::PUSH1 + width - 1,
            Opcode::Dup(k) => code::DUP1 + k - 1,
            Opcode::Swap(k) => code::SWAP1 + k - 1,
            Opcode::Other(c) => c,
        }
    }

    /// Width, in bytes, of the immediate that follows this opcode (0 for
    /// everything but `PUSHn`). `PUSH0` (EIP-3855) has a zero-width
    /// immediate and is represented as `Other(code::PUSH0)`.
    #[must_use]
    pub fn immediate_width(&self) -> u8 {
        match self {
            Opcode::Push(width) => *width,
            _ => 0,
        }
    }

    #[must_use]
    pub fn descriptor(&self) -> Descriptor {
        match *self {
            Opcode::Push(_) => d("PUSH", 0, 1, NONE),
            Opcode::Dup(_) => d("DUP", 0, 0, NONE), // handled structurally, not via pop/push
            Opcode::Swap(_) => d("SWAP", 0, 0, NONE), // ditto
            Opcode::Other(c) => descriptor_for_code(c),
        }
    }

    #[must_use]
    pub fn name(&self) -> String {
        match *self {
            Opcode::Push(w) => format!("PUSH{w}"),
            Opcode::Dup(k) => format!("DUP{k}"),
            Opcode::Swap(k) => format!("SWAP{k}"),
            Opcode::Other(c) => descriptor_for_code(c).name.to_string(),
        }
    }

    #[must_use]
    pub fn pops(&self) -> u8 {
        match *self {
            Opcode::Dup(k) => k, // DUPk reads k slots, though it doesn't consume them
            Opcode::Swap(k) => k + 1,
            _ => self.descriptor().pops,
        }
    }

    #[must_use]
    pub fn pushes(&self) -> u8 {
        self.descriptor().pushes
    }

    #[must_use]
    pub fn halts(&self) -> bool {
        self.descriptor().halts()
    }

    #[must_use]
    pub fn alters_flow(&self) -> bool {
        matches!(self, Opcode::Other(c) if *c == code::JUMP || *c == code::JUMPI) || self.halts()
    }

    #[must_use]
    pub fn is_jump(&self) -> bool {
        matches!(self, Opcode::Other(c) if *c == code::JUMP)
    }

    #[must_use]
    pub fn is_jumpi(&self) -> bool {
        matches!(self, Opcode::Other(c) if *c == code::JUMPI)
    }

    #[must_use]
    pub fn is_jumpdest(&self) -> bool {
        matches!(self, Opcode::Other(c) if *c == code::JUMPDEST)
    }

    #[must_use]
    pub fn is_pop(&self) -> bool {
        matches!(self, Opcode::Other(c) if *c == code::POP)
    }

    #[must_use]
    pub fn is_invalid(&self) -> bool {
        matches!(self, Opcode::Other(c) if !is_assigned(*c))
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Whether `code` is one of the bytes this table gives a real mnemonic to,
/// as opposed to falling back to `INVALID`. `PUSH`/`DUP`/`SWAP` ranges are
/// handled by `Opcode::from_byte` before this is consulted.
fn is_assigned(c: u8) -> bool {
    !matches!(descriptor_for_code(c).name, "INVALID")
}

/// Static descriptor lookup for every `Other(code)` byte. Total: unassigned
/// bytes resolve to the `INVALID` descriptor (0 pops, 0 pushes, halts).
fn descriptor_for_code(c: u8) -> Descriptor {
    use code::*;
    match c {
        STOP => d("STOP", 0, 0, HALT),
        ADD => d("ADD", 2, 1, NONE),
        MUL => d("MUL", 2, 1, NONE),
        SUB => d("SUB", 2, 1, NONE),
        DIV => d("DIV", 2, 1, NONE),
        SDIV => d("SDIV", 2, 1, NONE),
        MOD => d("MOD", 2, 1, NONE),
        SMOD => d("SMOD", 2, 1, NONE),
        ADDMOD => d("ADDMOD", 3, 1, NONE),
        MULMOD => d("MULMOD", 3, 1, NONE),
        EXP => d("EXP", 2, 1, NONE),
        SIGNEXTEND => d("SIGNEXTEND", 2, 1, NONE),

        LT => d("LT", 2, 1, NONE),
        GT => d("GT", 2, 1, NONE),
        SLT => d("SLT", 2, 1, NONE),
        SGT => d("SGT", 2, 1, NONE),
        EQ => d("EQ", 2, 1, NONE),
        ISZERO => d("ISZERO", 1, 1, NONE),
        AND => d("AND", 2, 1, NONE),
        OR => d("OR", 2, 1, NONE),
        XOR => d("XOR", 2, 1, NONE),
        NOT => d("NOT", 1, 1, NONE),
        BYTE => d("BYTE", 2, 1, NONE),
        SHL => d("SHL", 2, 1, NONE),
        SHR => d("SHR", 2, 1, NONE),
        SAR => d("SAR", 2, 1, NONE),

        KECCAK256 => d("KECCAK256", 2, 1, NONE),

        ADDRESS => d("ADDRESS", 0, 1, NONE),
        BALANCE => d("BALANCE", 1, 1, NONE),
        ORIGIN => d("ORIGIN", 0, 1, NONE),
        CALLER => d("CALLER", 0, 1, NONE),
        CALLVALUE => d("CALLVALUE", 0, 1, NONE),
        CALLDATALOAD => d("CALLDATALOAD", 1, 1, NONE),
        CALLDATASIZE => d("CALLDATASIZE", 0, 1, NONE),
        CALLDATACOPY => d("CALLDATACOPY", 3, 0, NONE),
        CODESIZE => d("CODESIZE", 0, 1, NONE),
        CODECOPY => d("CODECOPY", 3, 0, NONE),
        GASPRICE => d("GASPRICE", 0, 1, NONE),
        EXTCODESIZE => d("EXTCODESIZE", 1, 1, NONE),
        EXTCODECOPY => d("EXTCODECOPY", 4, 0, NONE),
        RETURNDATASIZE => d("RETURNDATASIZE", 0, 1, NONE),
        RETURNDATACOPY => d("RETURNDATACOPY", 3, 0, NONE),
        EXTCODEHASH => d("EXTCODEHASH", 1, 1, NONE),

        BLOCKHASH => d("BLOCKHASH", 1, 1, NONE),
        COINBASE => d("COINBASE", 0, 1, NONE),
        TIMESTAMP => d("TIMESTAMP", 0, 1, NONE),
        NUMBER => d("NUMBER", 0, 1, NONE),
        DIFFICULTY => d("DIFFICULTY", 0, 1, NONE),
        GASLIMIT => d("GASLIMIT", 0, 1, NONE),
        CHAINID => d("CHAINID", 0, 1, NONE),
        SELFBALANCE => d("SELFBALANCE", 0, 1, NONE),
        BASEFEE => d("BASEFEE", 0, 1, NONE),

        POP => d("POP", 1, 0, NONE),
        MLOAD => d("MLOAD", 1, 1, NONE),
        MSTORE => d("MSTORE", 2, 0, NONE),
        MSTORE8 => d("MSTORE8", 2, 0, NONE),
        SLOAD => d("SLOAD", 1, 1, NONE),
        SSTORE => d("SSTORE", 2, 0, NONE),
        JUMP => d("JUMP", 1, 0, FLOW),
        JUMPI => d("JUMPI", 2, 0, FLOW),
        PC => d("PC", 0, 1, NONE),
        MSIZE => d("MSIZE", 0, 1, NONE),
        GAS => d("GAS", 0, 1, NONE),
        JUMPDEST => d("JUMPDEST", 0, 0, Flags::IS_JUMPDEST),

        PUSH0 => d("PUSH0", 0, 1, NONE),

        LOG0 => d("LOG0", 2, 0, NONE),
        c if (LOG0..=LOG4).contains(&c) => d("LOGn", (2 + (c - LOG0)) as u8, 0, NONE),

        CREATE => d("CREATE", 3, 1, NONE),
        CALL => d("CALL", 7, 1, NONE),
        CALLCODE => d("CALLCODE", 7, 1, NONE),
        RETURN => d("RETURN", 2, 0, HALT),
        DELEGATECALL => d("DELEGATECALL", 6, 1, NONE),
        CREATE2 => d("CREATE2", 4, 1, NONE),
        STATICCALL => d("STATICCALL", 6, 1, NONE),
        REVERT => d("REVERT", 2, 0, HALT),
        INVALID => d("INVALID", 0, 0, HALT),
        SELFDESTRUCT => d("SELFDESTRUCT", 1, 0, HALT),

        _ => d("INVALID", 0, 0, HALT),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_total() {
        for byte in 0u16..=255 {
            let op = Opcode::from_byte(byte as u8);
            // Must not panic computing any derived property.
            let _ = (op.name(), op.pops(), op.pushes(), op.halts());
        }
    }

    #[test]
    fn unassigned_byte_is_invalid() {
        let op = Opcode::from_byte(0x0c);
        assert!(op.is_invalid());
        assert!(op.halts());
    }

    #[test]
    fn push_width_roundtrips() {
        for w in 1u8..=32 {
            let op = Opcode::Push(w);
            assert_eq!(Opcode::from_byte(op.code()).immediate_width(), w);
        }
    }

    #[test]
    fn jump_and_jumpdest_classified() {
        assert!(Opcode::from_byte(code::JUMP).is_jump());
        assert!(Opcode::from_byte(code::JUMP).alters_flow());
        assert!(Opcode::from_byte(code::JUMPI).is_jumpi());
        assert!(Opcode::from_byte(code::JUMPDEST).is_jumpdest());
        assert!(!Opcode::from_byte(code::JUMPDEST).alters_flow());
    }

    #[test]
    fn halting_opcodes() {
        for c in [
            code::STOP,
            code::RETURN,
            code::REVERT,
            code::SELFDESTRUCT,
            code::INVALID,
        ] {
            assert!(Opcode::from_byte(c).halts(), "{c:#x} should halt");
        }
    }
}
