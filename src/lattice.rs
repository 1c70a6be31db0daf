//! The abstract value lattice: `⊥ | Finite(set, capped) | ⊤` over 256-bit
//! unsigned integers, with EVM-semantics arithmetic lifted pointwise over
//! the Cartesian product of operand sets.

use std::collections::BTreeSet;
use std::fmt;

use ruint::aliases::U256;

use crate::opcode::code;

/// An element of `L = ⊥ | {c₁,…,cₙ} | ⊤`.
///
/// `Finite` sets are always kept at or under `set_max` by the caller;
/// `Value` itself never enforces a cap so construction stays infallible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// No information yet (identity element of `meet`).
    Bottom,
    /// A known, finite, non-empty set of possible values.
    Finite(BTreeSet<U256>),
    /// Unknown / any value.
    Top,
}

impl Value {
    #[must_use]
    pub fn bottom() -> Self {
        Value::Bottom
    }

    #[must_use]
    pub fn top() -> Self {
        Value::Top
    }

    #[must_use]
    pub fn singleton(v: U256) -> Self {
        Value::Finite(BTreeSet::from([v]))
    }

    #[must_use]
    pub fn from_set(set: BTreeSet<U256>) -> Self {
        if set.is_empty() {
            Value::Bottom
        } else {
            Value::Finite(set)
        }
    }

    #[must_use]
    pub fn is_bottom(&self) -> bool {
        matches!(self, Value::Bottom)
    }

    #[must_use]
    pub fn is_top(&self) -> bool {
        matches!(self, Value::Top)
    }

    /// If this value is a known singleton, its only element.
    #[must_use]
    pub fn as_singleton(&self) -> Option<U256> {
        match self {
            Value::Finite(set) if set.len() == 1 => set.iter().next().copied(),
            _ => None,
        }
    }

    /// The finite set of concrete values this lattice element denotes, if
    /// known. `None` for `⊥`/`⊤`.
    #[must_use]
    pub fn concretize(&self) -> Option<&BTreeSet<U256>> {
        match self {
            Value::Finite(set) => Some(set),
            _ => None,
        }
    }

    /// `meet(a,b)`: union of finite sets, capped to `set_max`; `⊥` is the
    /// identity; `⊤` absorbs.
    #[must_use]
    pub fn meet(&self, other: &Value, set_max: usize) -> Value {
        match (self, other) {
            (Value::Bottom, x) | (x, Value::Bottom) => x.clone(),
            (Value::Top, _) | (_, Value::Top) => Value::Top,
            (Value::Finite(a), Value::Finite(b)) => {
                let union: BTreeSet<U256> = a.union(b).copied().collect();
                cap(union, set_max)
            }
        }
    }

    /// Whether `self` is at or below `other` in the lattice order
    /// (`⊥ ≤ Finite ≤ ⊤`, with `Finite` sets ordered by subset).
    #[must_use]
    pub fn le(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Bottom, _) => true,
            (_, Value::Top) => true,
            (Value::Finite(a), Value::Finite(b)) => a.is_subset(b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bottom => write!(f, "\u{22a5}"),
            Value::Top => write!(f, "\u{22a4}"),
            Value::Finite(set) => {
                write!(f, "{{")?;
                for (i, v) in set.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v:#x}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

fn cap(set: BTreeSet<U256>, set_max: usize) -> Value {
    if set.len() > set_max {
        Value::Top
    } else {
        Value::Finite(set)
    }
}

/// Lift a unary EVM operation pointwise over a finite set, capping the
/// result. Non-finite operands (`⊥`/`⊤`) propagate per the lattice rules
/// (`⊥` has no defined operands in practice, so it is treated like `⊤`'s
/// opposite: an operation over `⊥` input yields `⊥`, since there is no
/// information to combine).
fn lift1(a: &Value, set_max: usize, f: impl Fn(U256) -> U256) -> Value {
    match a {
        Value::Bottom => Value::Bottom,
        Value::Top => Value::Top,
        Value::Finite(xs) => cap(xs.iter().map(|&x| f(x)).collect(), set_max),
    }
}

/// Lift a binary EVM operation pointwise over the Cartesian product of two
/// finite sets, capping the result.
fn lift2(a: &Value, b: &Value, set_max: usize, f: impl Fn(U256, U256) -> U256) -> Value {
    match (a, b) {
        (Value::Bottom, _) | (_, Value::Bottom) => Value::Bottom,
        (Value::Top, _) | (_, Value::Top) => Value::Top,
        (Value::Finite(xs), Value::Finite(ys)) => {
            let mut out = BTreeSet::new();
            for &x in xs {
                for &y in ys {
                    out.insert(f(x, y));
                    if out.len() > set_max {
                        return Value::Top;
                    }
                }
            }
            cap(out, set_max)
        }
    }
}

fn lift3(a: &Value, b: &Value, c: &Value, set_max: usize, f: impl Fn(U256, U256, U256) -> U256) -> Value {
    match (a, b, c) {
        (Value::Bottom, _, _) | (_, Value::Bottom, _) | (_, _, Value::Bottom) => Value::Bottom,
        (Value::Top, _, _) | (_, Value::Top, _) | (_, _, Value::Top) => Value::Top,
        (Value::Finite(xs), Value::Finite(ys), Value::Finite(zs)) => {
            let mut out = BTreeSet::new();
            for &x in xs {
                for &y in ys {
                    for &z in zs {
                        out.insert(f(x, y, z));
                        if out.len() > set_max {
                            return Value::Top;
                        }
                    }
                }
            }
            cap(out, set_max)
        }
    }
}

const ZERO: U256 = U256::ZERO;
const ONE: U256 = U256::from_limbs([1, 0, 0, 0]);
/// 2**255, the sign bit for 256-bit two's-complement interpretation.
fn sign_bit() -> U256 {
    U256::from(1u8) << 255
}

fn is_negative(v: U256) -> bool {
    v & sign_bit() != ZERO
}

fn negate(v: U256) -> U256 {
    (!v).wrapping_add(ONE)
}

fn evm_div(a: U256, b: U256) -> U256 {
    if b == ZERO { ZERO } else { a.wrapping_div(b) }
}

fn evm_mod(a: U256, b: U256) -> U256 {
    if b == ZERO { ZERO } else { a.wrapping_rem(b) }
}

fn evm_sdiv(a: U256, b: U256) -> U256 {
    if b == ZERO {
        return ZERO;
    }
    let min = sign_bit(); // INT_MIN
    let neg_one = negate(ONE);
    if a == min && b == neg_one {
        return min;
    }
    let (an, a_neg) = if is_negative(a) { (negate(a), true) } else { (a, false) };
    let (bn, b_neg) = if is_negative(b) { (negate(b), true) } else { (b, false) };
    let q = evm_div(an, bn);
    if a_neg != b_neg { negate(q) } else { q }
}

fn evm_smod(a: U256, b: U256) -> U256 {
    if b == ZERO {
        return ZERO;
    }
    let (an, a_neg) = if is_negative(a) { (negate(a), true) } else { (a, false) };
    let (bn, _) = if is_negative(b) { (negate(b), true) } else { (b, false) };
    let r = evm_mod(an, bn);
    if a_neg { negate(r) } else { r }
}

fn evm_slt(a: U256, b: U256) -> U256 {
    let (a_neg, b_neg) = (is_negative(a), is_negative(b));
    let lt = match (a_neg, b_neg) {
        (true, false) => true,
        (false, true) => false,
        _ => a < b,
    };
    bool_val(lt)
}

fn evm_sgt(a: U256, b: U256) -> U256 {
    evm_slt(b, a)
}

fn bool_val(b: bool) -> U256 {
    if b { ONE } else { ZERO }
}

fn evm_signextend(k: U256, v: U256) -> U256 {
    if k >= U256::from(32u8) {
        return v;
    }
    let k = k.to::<u64>() as u32;
    let bit_index = k * 8 + 7;
    let mask = (U256::from(1u8) << bit_index) - ONE;
    if v & (U256::from(1u8) << bit_index) != ZERO {
        v | !mask
    } else {
        v & mask
    }
}

fn evm_byte(i: U256, v: U256) -> U256 {
    if i >= U256::from(32u8) {
        return ZERO;
    }
    let i = i.to::<u64>() as u32;
    let shift = (31 - i) * 8;
    (v >> shift) & U256::from(0xffu8)
}

fn evm_shl(shift: U256, v: U256) -> U256 {
    if shift >= U256::from(256u16) {
        ZERO
    } else {
        v.wrapping_shl(shift.to::<u64>() as usize)
    }
}

fn evm_shr(shift: U256, v: U256) -> U256 {
    if shift >= U256::from(256u16) {
        ZERO
    } else {
        v.wrapping_shr(shift.to::<u64>() as usize)
    }
}

fn evm_sar(shift: U256, v: U256) -> U256 {
    let negative = is_negative(v);
    if shift >= U256::from(256u16) {
        return if negative { negate(ONE) } else { ZERO };
    }
    let n = shift.to::<u64>() as usize;
    let shifted = v.wrapping_shr(n);
    if !negative || n == 0 {
        return shifted;
    }
    let fill = !(U256::MAX.wrapping_shr(n));
    shifted | fill
}

/// Apply a binary EVM opcode to two operand lattice values, per the byte
/// constants in [`crate::opcode::code`]. Returns `None` if `byte` is not a
/// binary arithmetic/bitwise/comparison opcode.
#[must_use]
pub fn apply_binop(byte: u8, a: &Value, b: &Value, set_max: usize) -> Option<Value> {
    let f: fn(U256, U256) -> U256 = match byte {
        code::ADD => |x, y| x.wrapping_add(y),
        code::MUL => |x, y| x.wrapping_mul(y),
        code::SUB => |x, y| x.wrapping_sub(y),
        code::DIV => evm_div,
        code::SDIV => evm_sdiv,
        code::MOD => evm_mod,
        code::SMOD => evm_smod,
        code::EXP => |x, y| x.wrapping_pow(y),
        code::SIGNEXTEND => evm_signextend,
        code::LT => |x, y| bool_val(x < y),
        code::GT => |x, y| bool_val(x > y),
        code::SLT => evm_slt,
        code::SGT => evm_sgt,
        code::EQ => |x, y| bool_val(x == y),
        code::AND => |x, y| x & y,
        code::OR => |x, y| x | y,
        code::XOR => |x, y| x ^ y,
        code::BYTE => evm_byte,
        code::SHL => evm_shl,
        code::SHR => evm_shr,
        code::SAR => evm_sar,
        _ => return None,
    };
    Some(lift2(a, b, set_max, f))
}

/// Apply a unary EVM opcode (`ISZERO`, `NOT`) to an operand lattice value.
#[must_use]
pub fn apply_unop(byte: u8, a: &Value, set_max: usize) -> Option<Value> {
    let f: fn(U256) -> U256 = match byte {
        code::ISZERO => |x| bool_val(x == ZERO),
        code::NOT => |x| !x,
        _ => return None,
    };
    Some(lift1(a, set_max, f))
}

/// Apply a ternary EVM opcode (`ADDMOD`, `MULMOD`).
#[must_use]
pub fn apply_ternop(byte: u8, a: &Value, b: &Value, c: &Value, set_max: usize) -> Option<Value> {
    let f: fn(U256, U256, U256) -> U256 = match byte {
        code::ADDMOD => |x, y, n| if n == ZERO { ZERO } else { x.wrapping_rem(n).wrapping_add(y.wrapping_rem(n)).wrapping_rem(n) },
        code::MULMOD => |x, y, n| {
            if n == ZERO {
                ZERO
            } else {
                // Widen through u512 to avoid overflow in the intermediate product.
                let xw: ruint::Uint<512, 8> = ruint::Uint::from(x);
                let yw: ruint::Uint<512, 8> = ruint::Uint::from(y);
                let nw: ruint::Uint<512, 8> = ruint::Uint::from(n);
                let r = xw.wrapping_mul(yw).wrapping_rem(nw);
                U256::from(r)
            }
        },
        _ => return None,
    };
    Some(lift3(a, b, c, set_max, f))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(n: u64) -> Value {
        Value::singleton(U256::from(n))
    }

    #[test]
    fn meet_unions_and_caps() {
        let a = v(1);
        let b = v(2);
        let m = a.meet(&b, 10);
        assert_eq!(m, Value::Finite(BTreeSet::from([U256::from(1u64), U256::from(2u64)])));

        let c = Value::Finite((0..5u64).map(U256::from).collect());
        let e = Value::Finite((5..7u64).map(U256::from).collect());
        assert_eq!(c.meet(&e, 3), Value::Top);
    }

    #[test]
    fn bottom_is_identity() {
        assert_eq!(Value::bottom().meet(&v(1), 10), v(1));
        assert_eq!(v(1).meet(&Value::bottom(), 10), v(1));
    }

    #[test]
    fn top_absorbs() {
        assert_eq!(Value::top().meet(&v(1), 10), Value::Top);
    }

    #[test]
    fn add_wraps() {
        let r = apply_binop(code::ADD, &Value::singleton(U256::MAX), &v(1), 10).unwrap();
        assert_eq!(r, v(0));
    }

    #[test]
    fn div_by_zero_is_zero() {
        let r = apply_binop(code::DIV, &v(3), &v(0), 10).unwrap();
        assert_eq!(r, v(0));
    }

    #[test]
    fn sdiv_int_min_by_neg_one() {
        let min = sign_bit();
        let neg_one = negate(ONE);
        let r = apply_binop(code::SDIV, &Value::singleton(min), &Value::singleton(neg_one), 10).unwrap();
        assert_eq!(r, Value::singleton(min));
    }

    #[test]
    fn iszero_and_not() {
        assert_eq!(apply_unop(code::ISZERO, &v(0), 10).unwrap(), v(1));
        assert_eq!(apply_unop(code::ISZERO, &v(5), 10).unwrap(), v(0));
    }

    #[test]
    fn comparison_lifts_pointwise() {
        let a = Value::Finite(BTreeSet::from([U256::from(1u64), U256::from(5u64)]));
        let b = v(3);
        let r = apply_binop(code::LT, &a, &b, 10).unwrap();
        assert_eq!(r, Value::Finite(BTreeSet::from([U256::from(0u64), U256::from(1u64)])));
    }
}
