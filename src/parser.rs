//! The bytecode parser: turns a hex string (or a pre-disassembled textual
//! listing) into a flat sequence of [`EVMOp`]s, plus an initial partition
//! into straight-line basic block seeds cut at control-flow boundaries.

use std::fmt;

use ruint::aliases::U256;

use crate::opcode::Opcode;

/// One decoded instruction: its program counter (byte offset of the
/// *opcode*, not its immediate), the opcode itself, and its immediate
/// value for `PUSHn`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EVMOp {
    pub pc: u32,
    pub opcode: Opcode,
    pub value: Option<U256>,
}

impl fmt::Display for EVMOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}\t{}", self.pc, self.opcode.name())?;
        if let Some(v) = self.value {
            write!(f, " {v:#x}")?;
        }
        Ok(())
    }
}

/// The initial, pre-resolution partition of a program into straight-line
/// ranges: cuts occur after any halting/flow-altering op and before any
/// `JUMPDEST`. Each seed names the inclusive range of op *indices* (not
/// pcs) it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSeed {
    pub entry_pc: u32,
    /// Exclusive upper bound in pc-space (the pc one past the last byte
    /// of this seed's last instruction).
    pub end_pc: u32,
    pub op_start: usize,
    pub op_end: usize,
}

/// Parser-level error kinds. Only raised in `strict` mode; lenient mode
/// never returns `Err` from decoding (it best-effort continues, per the
/// policy documented on each variant below).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Hex input had an odd number of nibbles, or contained a non-hex
    /// character.
    MalformedInput(String),
    /// A `PUSHn` immediate ran off the end of the byte stream (strict
    /// mode only; lenient mode zero-pads and continues).
    TruncatedImmediate { pc: u32 },
    /// An unrecognised opcode byte (strict mode only; lenient mode treats
    /// it as `INVALID` and continues).
    InvalidOpcode { pc: u32, byte: u8 },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::MalformedInput(reason) => write!(f, "malformed input: {reason}"),
            Error::TruncatedImmediate { pc } => {
                write!(f, "truncated PUSH immediate at pc {pc:#x}")
            }
            Error::InvalidOpcode { pc, byte } => {
                write!(f, "invalid opcode {byte:#04x} at pc {pc:#x}")
            }
        }
    }
}
impl std::error::Error for Error {}

/// Strip an optional `0x`/`0X` prefix, whitespace, and any trailing
/// non-hex garbage (e.g. Solidity metadata), returning the clean hex
/// digit sequence to decode.
fn clean_hex(input: &str) -> Result<Vec<u8>, Error> {
    let trimmed = input.trim();
    let trimmed = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")).unwrap_or(trimmed);
    let mut digits = Vec::with_capacity(trimmed.len());
    for ch in trimmed.chars() {
        if ch.is_whitespace() {
            continue;
        }
        if !ch.is_ascii_hexdigit() {
            // Trailing non-hex garbage (e.g. Solidity metadata) is
            // tolerated: stop decoding here rather than failing, as long
            // as what came before was well-formed.
            break;
        }
        digits.push(ch as u8);
    }
    if digits.len() % 2 != 0 {
        return Err(Error::MalformedInput(format!(
            "odd number of hex digits ({})",
            digits.len()
        )));
    }
    let mut bytes = Vec::with_capacity(digits.len() / 2);
    for pair in digits.chunks_exact(2) {
        let hi = (pair[0] as char).to_digit(16).unwrap();
        let lo = (pair[1] as char).to_digit(16).unwrap();
        bytes.push(((hi << 4) | lo) as u8);
    }
    Ok(bytes)
}

/// Decode raw bytecode bytes into a flat instruction sequence.
///
/// In lenient mode, a truncated `PUSH` immediate is zero-padded and
/// decoding continues; in strict mode it is a [`Error::TruncatedImmediate`].
/// Unknown opcode bytes always decode (total lookup maps them to
/// `INVALID`); strict mode additionally flags them as an error without
/// aborting the decode of the rest of the stream early, so the caller gets
/// a complete op list either way.
pub fn decode_bytes(bytes: &[u8], strict: bool) -> Result<Vec<EVMOp>, Error> {
    let mut ops = Vec::new();
    let mut pc = 0usize;
    while pc < bytes.len() {
        let byte = bytes[pc];
        let opcode = Opcode::from_byte(byte);
        if strict && opcode.is_invalid() {
            return Err(Error::InvalidOpcode {
                pc: pc as u32,
                byte,
            });
        }
        let width = opcode.immediate_width() as usize;
        let value = if width > 0 {
            let start = pc + 1;
            let end = start + width;
            let mut buf = [0u8; 32];
            if end <= bytes.len() {
                buf[32 - width..].copy_from_slice(&bytes[start..end]);
            } else {
                if strict {
                    return Err(Error::TruncatedImmediate { pc: pc as u32 });
                }
                let available = bytes.len().saturating_sub(start);
                if available > 0 {
                    buf[32 - width..32 - width + available].copy_from_slice(&bytes[start..start + available]);
                }
            }
            Some(U256::from_be_bytes(buf))
        } else {
            None
        };
        ops.push(EVMOp {
            pc: pc as u32,
            opcode,
            value,
        });
        pc += 1 + width;
    }
    Ok(ops)
}

/// Parse a hex-encoded bytecode string (whitespace-tolerant, optional
/// `0x` prefix, optional trailing non-hex garbage) into an op sequence.
pub fn parse_hex(input: &str, strict: bool) -> Result<Vec<EVMOp>, Error> {
    let bytes = clean_hex(input)?;
    decode_bytes(&bytes, strict)
}

/// Parse a pre-disassembled textual listing: one instruction per line,
/// `pc mnemonic [immediate]`, case-insensitive mnemonics, blank lines
/// ignored. Produces the same `EVMOp` sequence a hex decode of the
/// equivalent bytecode would.
pub fn parse_listing(input: &str, strict: bool) -> Result<Vec<EVMOp>, Error> {
    let mut ops = Vec::new();
    for line in input.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut parts = line.split_whitespace();
        let pc_str = parts
            .next()
            .ok_or_else(|| Error::MalformedInput("empty listing line".to_string()))?;
        let pc_str = pc_str.trim_end_matches(':');
        let pc = u32::from_str_radix(pc_str.trim_start_matches("0x"), 16)
            .or_else(|_| pc_str.parse::<u32>())
            .map_err(|_| Error::MalformedInput(format!("bad pc `{pc_str}`")))?;
        let mnemonic = parts
            .next()
            .ok_or_else(|| Error::MalformedInput("missing mnemonic".to_string()))?
            .to_uppercase();
        let opcode = mnemonic_to_opcode(&mnemonic).ok_or_else(|| {
            if strict {
                Error::InvalidOpcode { pc, byte: 0 }
            } else {
                Error::MalformedInput(format!("unknown mnemonic `{mnemonic}`"))
            }
        })?;
        let value = if opcode.immediate_width() > 0 {
            let imm = parts
                .next()
                .ok_or(Error::TruncatedImmediate { pc })?
                .trim_start_matches("0x");
            Some(U256::from_str_radix(imm, 16).map_err(|_| Error::MalformedInput(format!("bad immediate `{imm}`")))?)
        } else {
            None
        };
        ops.push(EVMOp { pc, opcode, value });
    }
    Ok(ops)
}

/// Map a mnemonic (upper-cased) back to an `Opcode`, the inverse of
/// `Opcode::name`. Returns `None` for anything not recognised, including
/// `INVALID` itself (ambiguous: many unassigned bytes share that name).
fn mnemonic_to_opcode(mnemonic: &str) -> Option<Opcode> {
    if let Some(rest) = mnemonic.strip_prefix("PUSH") {
        if rest.is_empty() {
            return None;
        }
        if let Ok(n) = rest.parse::<u8>() {
            if n == 0 {
                return Some(Opcode::Other(crate::opcode::code::PUSH0));
            }
            if (1..=32).contains(&n) {
                return Some(Opcode::Push(n));
            }
        }
        return None;
    }
    if let Some(rest) = mnemonic.strip_prefix("DUP") {
        if let Ok(n) = rest.parse::<u8>() {
            if (1..=16).contains(&n) {
                return Some(Opcode::Dup(n));
            }
        }
        return None;
    }
    if let Some(rest) = mnemonic.strip_prefix("SWAP") {
        if let Ok(n) = rest.parse::<u8>() {
            if (1..=16).contains(&n) {
                return Some(Opcode::Swap(n));
            }
        }
        return None;
    }
    // Everything else: linear scan of the 256-entry table. Small and
    // simple; this path is only used by the (out-of-scope-adjacent)
    // listing format, never by the hot hex decode path.
    for byte in 0u16..=255 {
        let op = Opcode::from_byte(byte as u8);
        if matches!(op, Opcode::Push(_) | Opcode::Dup(_) | Opcode::Swap(_)) {
            continue;
        }
        if op.name() == mnemonic {
            return Some(op);
        }
    }
    None
}

/// Partition a flat op sequence into the initial straight-line block
/// seeds: a cut occurs after any halting/flow-altering op, and before any
/// `JUMPDEST`.
#[must_use]
pub fn partition_blocks(ops: &[EVMOp]) -> Vec<BlockSeed> {
    let mut seeds = Vec::new();
    if ops.is_empty() {
        return seeds;
    }
    let mut start = 0usize;
    for i in 0..ops.len() {
        let is_last = i + 1 == ops.len();
        let cuts_after = ops[i].opcode.alters_flow();
        let next_is_jumpdest = !is_last && ops[i + 1].opcode.is_jumpdest();
        if cuts_after || next_is_jumpdest || is_last {
            let end_pc = if is_last {
                ops[i].pc + 1 + ops[i].opcode.immediate_width() as u32
            } else {
                ops[i + 1].pc
            };
            seeds.push(BlockSeed {
                entry_pc: ops[start].pc,
                end_pc,
                op_start: start,
                op_end: i + 1,
            });
            start = i + 1;
        }
    }
    seeds
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_0x_prefix_and_whitespace() {
        let ops = parse_hex(" 0x00 ", false).unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].opcode, Opcode::Other(crate::opcode::code::STOP));
    }

    #[test]
    fn odd_length_is_malformed() {
        assert!(matches!(parse_hex("0x0", false), Err(Error::MalformedInput(_))));
    }

    #[test]
    fn trailing_garbage_tolerated() {
        let ops = parse_hex("00zzzz", false).unwrap();
        assert_eq!(ops.len(), 1);
    }

    #[test]
    fn push_immediate_decoded_big_endian() {
        let ops = parse_hex("6001", false).unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].value, Some(U256::from(1u64)));
    }

    #[test]
    fn truncated_push_zero_padded_in_lenient_mode() {
        let ops = parse_hex("60", false).unwrap();
        assert_eq!(ops[0].value, Some(U256::ZERO));
    }

    #[test]
    fn truncated_push_errors_in_strict_mode() {
        assert!(matches!(
            parse_hex("60", true),
            Err(Error::TruncatedImmediate { .. })
        ));
    }

    #[test]
    fn invalid_opcode_strict_errors() {
        assert!(matches!(
            parse_hex("0c", true),
            Err(Error::InvalidOpcode { .. })
        ));
    }

    #[test]
    fn invalid_opcode_lenient_continues() {
        let ops = parse_hex("0c00", false).unwrap();
        assert_eq!(ops.len(), 2);
        assert!(ops[0].opcode.is_invalid());
    }

    #[test]
    fn pc_is_opcode_offset_not_immediate_offset() {
        let ops = parse_hex("600160020100", false).unwrap(); // PUSH1 1; PUSH1 2; ADD; STOP
        assert_eq!(ops[0].pc, 0);
        assert_eq!(ops[1].pc, 2);
        assert_eq!(ops[2].pc, 4);
        assert_eq!(ops[3].pc, 5);
    }

    #[test]
    fn partition_cuts_before_jumpdest_and_after_flow_change() {
        // PUSH1 3; JUMP; JUMPDEST; STOP
        let ops = parse_hex("6003565b00", false).unwrap();
        let seeds = partition_blocks(&ops);
        assert_eq!(seeds.len(), 2);
        assert_eq!(seeds[0].entry_pc, 0);
        assert_eq!(seeds[1].entry_pc, 3);
    }

    #[test]
    fn listing_roundtrips_simple_program() {
        let listing = "0x00 PUSH1 01\n0x02 STOP\n";
        let ops = parse_listing(listing, false).unwrap();
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].value, Some(U256::from(1u64)));
    }
}
