//! Generic arithmetic across the numeric tower.
//!
//! Single source of truth for the binary numeric operations; both the host
//! evaluator's primitives and the number I/O layer call through here. Mixed
//! operands follow the contagion ladder fixnum < bignum < ratnum < flonum <
//! compnum: the lower operand is lifted and the result lives at the higher
//! level. Three shortcuts are carved out: exact zero absorbs `*`, exact
//! one is neutral for `*` and `/`, and exact-by-exact division stays exact
//! (a reduced rational).
//!
//! Comparison against bignums and ratnums never goes through a double:
//! the flonum side is promoted to an exact rational first, so ordering is
//! bit-precise over the whole range.

use crate::number::bignum::{Bignum, Clamp};
use crate::number::ratio::{self, make_rational};
use crate::value::condition::Condition;
use crate::value::{NumKind, Value};
use std::cell::RefCell;
use std::cmp::Ordering;

/// Binary operations dispatchable through [`arith_op`], the evaluator's
/// single arithmetic entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Quotient,
    Remainder,
    Modulo,
    Gcd,
    Expt,
    LogAnd,
    LogIor,
    LogXor,
}

/// Dispatch a binary arithmetic operation by kind.
pub fn arith_op(op: ArithOp, a: &Value, b: &Value) -> Result<Value, Condition> {
    match op {
        ArithOp::Add => add(a, b),
        ArithOp::Sub => sub(a, b),
        ArithOp::Mul => mul(a, b),
        ArithOp::Div => div(a, b),
        ArithOp::Quotient => quotient(a, b),
        ArithOp::Remainder => remainder(a, b),
        ArithOp::Modulo => modulo(a, b),
        ArithOp::Gcd => gcd(a, b),
        ArithOp::Expt => expt(a, b),
        ArithOp::LogAnd => logand(a, b),
        ArithOp::LogIor => logior(a, b),
        ArithOp::LogXor => logxor(a, b),
    }
}

/// Rounding modes for `round`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundMode {
    Floor,
    Ceil,
    Trunc,
    /// Round to nearest, ties to even
    Round,
}

/// IEEE-754 decomposition of a double.
#[derive(Debug, Clone, PartialEq)]
pub enum FlonumDecode {
    /// value = mantissa * 2^exp * sign, with the hidden bit folded into the
    /// mantissa for normal numbers
    Finite {
        mantissa: Value,
        exp: i32,
        sign: i32,
    },
    Infinite(i32),
    Nan,
}

// =============================================================================
// Errors
// =============================================================================

fn bad_operand(op: &str, v: &Value) -> Condition {
    Condition::domain(format!(
        "operation {} is not defined on {}",
        op,
        v.type_name()
    ))
    .with_irritant(v.clone())
}

fn integer_required(v: &Value) -> Condition {
    Condition::domain(format!("integer required, but got {}", v.type_name())).with_irritant(v.clone())
}

fn real_required(v: &Value) -> Condition {
    Condition::domain(format!("real number required, but got {}", v.type_name()))
        .with_irritant(v.clone())
}

// =============================================================================
// Exact-integer helpers
// =============================================================================

fn to_big(v: &Value) -> Bignum {
    match v {
        Value::Fixnum(n) => Bignum::from_i64(*n),
        Value::Bignum(b) => (**b).clone(),
        _ => unreachable!("exact integer required"),
    }
}

pub(crate) fn int_add(a: &Value, b: &Value) -> Value {
    match (a, b) {
        // fixnums occupy 48 bits, so an i64 add cannot overflow
        (Value::Fixnum(x), Value::Fixnum(y)) => Value::make_integer(x + y),
        _ => to_big(a).add(&to_big(b)).into_value(),
    }
}

pub(crate) fn int_sub(a: &Value, b: &Value) -> Value {
    match (a, b) {
        (Value::Fixnum(x), Value::Fixnum(y)) => Value::make_integer(x - y),
        _ => to_big(a).sub(&to_big(b)).into_value(),
    }
}

pub(crate) fn int_mul(a: &Value, b: &Value) -> Value {
    match (a, b) {
        (Value::Fixnum(x), Value::Fixnum(y)) => {
            Value::make_integer_i128(*x as i128 * *y as i128)
        }
        _ => to_big(a).mul(&to_big(b)).into_value(),
    }
}

pub(crate) fn int_neg(v: &Value) -> Value {
    match v {
        Value::Fixnum(n) => Value::make_integer(-n),
        _ => to_big(v).neg().into_value(),
    }
}

pub(crate) fn int_cmp(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Fixnum(x), Value::Fixnum(y)) => x.cmp(y),
        // a bignum is always outside the fixnum range, so its sign decides
        (Value::Fixnum(_), Value::Bignum(y)) => {
            if y.is_negative() {
                Ordering::Greater
            } else {
                Ordering::Less
            }
        }
        (Value::Bignum(x), Value::Fixnum(_)) => {
            if x.is_negative() {
                Ordering::Less
            } else {
                Ordering::Greater
            }
        }
        (Value::Bignum(x), Value::Bignum(y)) => x.cmp(y),
        _ => unreachable!("exact integer required"),
    }
}

/// Truncating quotient of exact integers; the divisor must be non-zero.
pub(crate) fn int_quotient(a: &Value, b: &Value) -> Value {
    match (a, b) {
        (Value::Fixnum(x), Value::Fixnum(y)) => Value::make_integer(x / y),
        _ => {
            let (q, _) = to_big(a)
                .divrem(&to_big(b))
                .expect("divisor checked non-zero by caller");
            q.into_value()
        }
    }
}

pub(crate) fn int_remainder(a: &Value, b: &Value) -> Value {
    match (a, b) {
        (Value::Fixnum(x), Value::Fixnum(y)) => Value::make_integer(x % y),
        _ => {
            let (_, r) = to_big(a)
                .divrem(&to_big(b))
                .expect("divisor checked non-zero by caller");
            r.into_value()
        }
    }
}

fn gcd_u64(mut x: u64, mut y: u64) -> u64 {
    while y > 0 {
        let r = x % y;
        x = y;
        y = r;
    }
    x
}

/// Non-negative gcd of exact integers, `gcd(0, y) = |y|`.
pub(crate) fn int_gcd(a: &Value, b: &Value) -> Value {
    if a.is_exact_zero() {
        return int_abs(b);
    }
    if b.is_exact_zero() {
        return int_abs(a);
    }
    match (a, b) {
        (Value::Fixnum(x), Value::Fixnum(y)) => {
            let ux = x.unsigned_abs();
            let uy = y.unsigned_abs();
            let g = if ux >= uy {
                gcd_u64(ux, uy)
            } else {
                gcd_u64(uy, ux)
            };
            Value::make_integer_u64(g)
        }
        (Value::Bignum(x), Value::Fixnum(y)) | (Value::Fixnum(y), Value::Bignum(x)) => {
            // the bignum's magnitude dominates, so one division drops to words
            let uy = y.unsigned_abs();
            let (_, rem) = x.divrem_digit(uy).expect("fixnum operand checked non-zero");
            Value::make_integer_u64(gcd_u64(uy, rem.unsigned_abs()))
        }
        _ => {
            let mut x = to_big(a).abs();
            let mut y = to_big(b).abs();
            if x.cmp(&y) == Ordering::Less {
                std::mem::swap(&mut x, &mut y);
            }
            while !y.is_zero() {
                let (_, r) = x.divrem(&y).expect("loop guard keeps divisor non-zero");
                x = y;
                y = r.abs();
            }
            x.into_value()
        }
    }
}

fn int_abs(v: &Value) -> Value {
    match v {
        Value::Fixnum(n) => Value::make_integer(n.wrapping_abs()),
        _ => to_big(v).abs().into_value(),
    }
}

// =============================================================================
// Flonum decomposition
// =============================================================================

/// x * 2^e with correct behavior at the denormal and overflow edges.
/// Scaling goes through exact power-of-two constants; a plain `powi` would
/// round 2^-1074 through infinity and return zero.
pub(crate) fn ldexp(mut x: f64, mut e: i32) -> f64 {
    const STEP: i32 = 1000;
    fn pow2(e: i32) -> f64 {
        debug_assert!((-1022..=1023).contains(&e));
        f64::from_bits(((e + 1023) as u64) << 52)
    }
    while e > STEP {
        x *= pow2(STEP);
        e -= STEP;
    }
    while e < -STEP {
        x *= pow2(-STEP);
        e += STEP;
    }
    x * pow2(e)
}

/// Decompose a double into mantissa, binary exponent and sign.
/// For normal numbers the mantissa carries the hidden bit (>= 2^52).
pub fn decode_flonum(d: f64) -> FlonumDecode {
    let bits = d.to_bits();
    let sign = if bits >> 63 == 1 { -1 } else { 1 };
    let raw_exp = ((bits >> 52) & 0x7ff) as i32;
    let frac = bits & ((1u64 << 52) - 1);
    if raw_exp == 0x7ff {
        return if frac == 0 {
            FlonumDecode::Infinite(sign)
        } else {
            FlonumDecode::Nan
        };
    }
    let (mantissa, exp) = if raw_exp == 0 {
        (frac, -0x3fe - 52)
    } else {
        (frac | (1u64 << 52), raw_exp - 0x3ff - 52)
    };
    FlonumDecode::Finite {
        mantissa: Value::make_integer_u64(mantissa),
        exp,
        sign,
    }
}

/// Promote a finite flonum to an exact integer or rational, losslessly.
pub(crate) fn flonum_to_exact(d: f64) -> Option<Value> {
    match decode_flonum(d) {
        FlonumDecode::Finite { mantissa, exp, sign } => {
            let mag = if exp >= 0 {
                Ok(ash_unchecked(&mantissa, exp as i64))
            } else {
                make_rational(mantissa, ash_unchecked(&Value::Fixnum(1), -exp as i64))
            };
            let mag = mag.ok()?;
            Some(if sign < 0 { neg_exact(&mag) } else { mag })
        }
        _ => None,
    }
}

fn neg_exact(v: &Value) -> Value {
    match v {
        Value::Ratnum(r) => {
            Value::ratnum(crate::number::ratio::Ratnum {
                numer: int_neg(&r.numer),
                denom: r.denom.clone(),
            })
        }
        _ => int_neg(v),
    }
}

/// Shift an exact integer without the public entry's type checking.
pub(crate) fn ash_unchecked(x: &Value, n: i64) -> Value {
    match x {
        Value::Fixnum(v) => {
            if n < 0 {
                let s = n.unsigned_abs().min(63) as u32;
                Value::make_integer(v >> s)
            } else if n <= 80 {
                // 48-bit payload shifted up to 80 still fits an i128
                Value::make_integer_i128((*v as i128) << n)
            } else {
                Bignum::from_i64(*v).ash(n).into_value()
            }
        }
        Value::Bignum(b) => b.ash(n).into_value(),
        _ => unreachable!("exact integer required"),
    }
}

// =============================================================================
// Coercion
// =============================================================================

/// Double approximation of a real number.
pub fn get_double(v: &Value) -> Result<f64, Condition> {
    match v {
        Value::Fixnum(n) => Ok(*n as f64),
        Value::Bignum(b) => Ok(b.to_f64()),
        Value::Ratnum(r) => {
            let n = get_double(&r.numer)?;
            let d = get_double(&r.denom)?;
            Ok(n / d)
        }
        Value::Flonum(d) => Ok(*d),
        _ => Err(real_required(v)),
    }
}

pub fn exact_to_inexact(v: &Value) -> Result<Value, Condition> {
    match v.num_kind() {
        Some(NumKind::Fixnum | NumKind::Bignum | NumKind::Ratnum) => {
            Ok(Value::Flonum(get_double(v)?))
        }
        Some(_) => Ok(v.clone()),
        None => Err(bad_operand("inexact", v)),
    }
}

pub fn inexact_to_exact(v: &Value) -> Result<Value, Condition> {
    match v {
        Value::Flonum(d) => {
            flonum_to_exact(*d).ok_or_else(|| {
                Condition::domain(format!("exact infinity/nan is not supported: {}", d))
            })
        }
        Value::Compnum(_) => Err(Condition::domain("exact complex is not supported")),
        _ if v.is_exact() => Ok(v.clone()),
        _ => Err(bad_operand("exact", v)),
    }
}

/// Convert a real number to a machine integer under a clamp policy.
/// The flag reports that the value was out of range; with `Clamp::None`
/// an out-of-range value is an overflow condition instead.
pub fn get_integer_clamp(v: &Value, clamp: Clamp) -> Result<(i64, bool), Condition> {
    let overflow =
        || Condition::overflow(format!("number too large for a machine integer: {}", v));
    match v {
        Value::Fixnum(n) => Ok((*n, false)),
        Value::Bignum(b) => {
            if let Some(n) = b.try_to_i64() {
                return Ok((n, false));
            }
            if b.is_negative() && matches!(clamp, Clamp::Lo | Clamp::Both) {
                Ok((i64::MIN, true))
            } else if !b.is_negative() && matches!(clamp, Clamp::Hi | Clamp::Both) {
                Ok((i64::MAX, true))
            } else {
                Err(overflow())
            }
        }
        Value::Ratnum(_) | Value::Flonum(_) => {
            let d = get_double(v)?;
            if d.is_nan() {
                return Err(Condition::domain("NaN has no integer value"));
            }
            if d >= i64::MIN as f64 && d <= i64::MAX as f64 {
                Ok((d.trunc() as i64, false))
            } else if d > 0.0 && matches!(clamp, Clamp::Hi | Clamp::Both) {
                Ok((i64::MAX, true))
            } else if d < 0.0 && matches!(clamp, Clamp::Lo | Clamp::Both) {
                Ok((i64::MIN, true))
            } else {
                Err(overflow())
            }
        }
        _ => Err(real_required(v)),
    }
}

fn real_part(v: &Value) -> Result<f64, Condition> {
    match v {
        Value::Compnum(c) => Ok(c.real),
        _ => get_double(v),
    }
}

fn imag_part(v: &Value) -> f64 {
    match v {
        Value::Compnum(c) => c.imag,
        _ => 0.0,
    }
}

/// Absolute magnitude; for a compnum, the modulus.
pub fn magnitude(v: &Value) -> Result<f64, Condition> {
    match v {
        Value::Compnum(c) => Ok((c.real * c.real + c.imag * c.imag).sqrt()),
        _ => Ok(get_double(v)?.abs()),
    }
}

/// Argument of a number; pi for negative reals.
pub fn angle(v: &Value) -> Result<f64, Condition> {
    match v {
        Value::Compnum(c) => Ok(c.imag.atan2(c.real)),
        _ => {
            if sign(v)? < 0 {
                Ok(std::f64::consts::PI)
            } else {
                Ok(0.0)
            }
        }
    }
}

// =============================================================================
// Unary operations
// =============================================================================

/// -1, 0 or +1 for a real number.
pub fn sign(v: &Value) -> Result<i32, Condition> {
    match v {
        Value::Fixnum(n) => Ok(n.signum() as i32),
        Value::Bignum(b) => Ok(b.sign()),
        Value::Ratnum(r) => sign(&r.numer),
        Value::Flonum(d) => {
            if *d > 0.0 {
                Ok(1)
            } else if *d < 0.0 {
                Ok(-1)
            } else {
                Ok(0)
            }
        }
        _ => Err(real_required(v)),
    }
}

pub fn negate(v: &Value) -> Result<Value, Condition> {
    match v {
        Value::Fixnum(_) | Value::Bignum(_) | Value::Ratnum(_) => Ok(neg_exact(v)),
        Value::Flonum(d) => Ok(Value::Flonum(-d)),
        Value::Compnum(c) => Ok(Value::make_complex(-c.real, -c.imag)),
        _ => Err(bad_operand("-", v)),
    }
}

pub fn abs(v: &Value) -> Result<Value, Condition> {
    match v {
        Value::Fixnum(_) | Value::Bignum(_) | Value::Ratnum(_) => {
            if sign(v)? < 0 {
                Ok(neg_exact(v))
            } else {
                Ok(v.clone())
            }
        }
        Value::Flonum(d) => Ok(Value::Flonum(d.abs())),
        Value::Compnum(_) => Ok(Value::Flonum(magnitude(v)?)),
        _ => Err(bad_operand("abs", v)),
    }
}

pub fn reciprocal(v: &Value) -> Result<Value, Condition> {
    match v {
        Value::Fixnum(_) | Value::Bignum(_) => make_rational(Value::Fixnum(1), v.clone()),
        Value::Ratnum(r) => make_rational(r.denom.clone(), r.numer.clone()),
        Value::Flonum(d) => Ok(Value::Flonum(1.0 / d)),
        Value::Compnum(c) => {
            let d = c.real * c.real + c.imag * c.imag;
            Ok(Value::make_complex(c.real / d, -c.imag / d))
        }
        _ => Err(bad_operand("/", v)),
    }
}

/// Reciprocal that never introduces a ratnum: exact zero goes to +inf.0.
pub fn reciprocal_inexact(v: &Value) -> Result<Value, Condition> {
    if v.is_exact_zero() {
        return Ok(Value::Flonum(f64::INFINITY));
    }
    if v.is_exact_one() {
        return Ok(v.clone());
    }
    if v.is_real() {
        return Ok(Value::Flonum(1.0 / get_double(v)?));
    }
    reciprocal(v)
}

pub fn is_odd(v: &Value) -> Result<bool, Condition> {
    match v {
        Value::Fixnum(n) => Ok(n & 1 != 0),
        Value::Bignum(b) => Ok(b.is_odd()),
        Value::Flonum(d) if v.is_integer() => Ok(*d % 2.0 != 0.0),
        _ => Err(integer_required(v)),
    }
}

// =============================================================================
// Addition, subtraction, multiplication, division
// =============================================================================

pub fn add(a: &Value, b: &Value) -> Result<Value, Condition> {
    let (ka, kb) = both_kinds("+", a, b)?;
    if a.is_exact_zero() {
        return Ok(b.clone());
    }
    if b.is_exact_zero() {
        return Ok(a.clone());
    }
    match ka.max(kb) {
        NumKind::Compnum => Ok(Value::make_complex(
            real_part(a)? + real_part(b)?,
            imag_part(a) + imag_part(b),
        )),
        NumKind::Flonum => Ok(Value::Flonum(get_double(a)? + get_double(b)?)),
        NumKind::Ratnum => ratio::add_sub(a, b, false),
        _ => Ok(int_add(a, b)),
    }
}

pub fn sub(a: &Value, b: &Value) -> Result<Value, Condition> {
    let (ka, kb) = both_kinds("-", a, b)?;
    if b.is_exact_zero() {
        return Ok(a.clone());
    }
    match ka.max(kb) {
        NumKind::Compnum => Ok(Value::make_complex(
            real_part(a)? - real_part(b)?,
            imag_part(a) - imag_part(b),
        )),
        NumKind::Flonum => Ok(Value::Flonum(get_double(a)? - get_double(b)?)),
        NumKind::Ratnum => ratio::add_sub(a, b, true),
        _ => Ok(int_sub(a, b)),
    }
}

pub fn mul(a: &Value, b: &Value) -> Result<Value, Condition> {
    let (ka, kb) = both_kinds("*", a, b)?;
    // exact zero absorbs regardless of the other operand
    if a.is_exact_zero() || b.is_exact_zero() {
        return Ok(Value::Fixnum(0));
    }
    if a.is_exact_one() {
        return Ok(b.clone());
    }
    if b.is_exact_one() {
        return Ok(a.clone());
    }
    match ka.max(kb) {
        NumKind::Compnum => {
            let (r0, i0) = (real_part(a)?, imag_part(a));
            let (r1, i1) = (real_part(b)?, imag_part(b));
            Ok(Value::make_complex(r0 * r1 - i0 * i1, r0 * i1 + r1 * i0))
        }
        NumKind::Flonum => Ok(Value::Flonum(get_double(a)? * get_double(b)?)),
        NumKind::Ratnum => ratio::mul_div(a, b, false),
        _ => Ok(int_mul(a, b)),
    }
}

/// Full-tower division: exact by exact yields an exact rational; the result
/// is inexact only when an operand already is.
pub fn div(a: &Value, b: &Value) -> Result<Value, Condition> {
    let (ka, kb) = both_kinds("/", a, b)?;
    if b.is_exact_zero() {
        if a.is_exact() {
            return Err(Condition::div_by_zero("division by exact zero")
                .with_irritant(a.clone()));
        }
        // inexact dividend: fall through to IEEE semantics below
    }
    if b.is_exact_one() {
        return Ok(a.clone());
    }
    match ka.max(kb) {
        NumKind::Compnum => {
            let (r0, i0) = (real_part(a)?, imag_part(a));
            let (r1, i1) = (real_part(b)?, imag_part(b));
            let d = r1 * r1 + i1 * i1;
            Ok(Value::make_complex((r0 * r1 + i0 * i1) / d, (i0 * r1 - r0 * i1) / d))
        }
        NumKind::Flonum => {
            let db = get_double(b)?;
            if a.is_exact_zero() {
                // exact zero divided by a non-zero inexact stays exact
                return if db == 0.0 {
                    Ok(Value::Flonum(f64::NAN))
                } else {
                    Ok(Value::Fixnum(0))
                };
            }
            Ok(Value::Flonum(get_double(a)? / db))
        }
        _ => ratio::mul_div(a, b, true),
    }
}

/// Auto-coercing division: exact integer division that does not come out
/// whole falls over to a flonum instead of a ratnum.
pub fn div_inexact(a: &Value, b: &Value) -> Result<Value, Condition> {
    if a.is_exact_integer() && b.is_exact_integer() && !b.is_exact_zero() {
        let (q, r) = quotient_remainder(a, b)?;
        if r.is_exact_zero() {
            return Ok(q);
        }
        return Ok(Value::Flonum(get_double(a)? / get_double(b)?));
    }
    div(a, b)
}

fn both_kinds(op: &str, a: &Value, b: &Value) -> Result<(NumKind, NumKind), Condition> {
    match (a.num_kind(), b.num_kind()) {
        (Some(ka), Some(kb)) => Ok((ka, kb)),
        (None, _) => Err(bad_operand(op, a)),
        (_, None) => Err(bad_operand(op, b)),
    }
}

// =============================================================================
// Integer division family
// =============================================================================

/// Truncating quotient and remainder. Defined on exact integers and on
/// flonums whose value is whole; the remainder sign follows the dividend.
pub fn quotient_remainder(x: &Value, y: &Value) -> Result<(Value, Value), Condition> {
    // trivial shortcut, common in rational arithmetic
    if y.is_exact_one() {
        if !x.is_integer() {
            return Err(integer_required(x));
        }
        return Ok((x.clone(), Value::Fixnum(0)));
    }
    match (x, y) {
        (Value::Fixnum(a), Value::Fixnum(b)) => {
            if *b == 0 {
                return Err(Condition::div_by_zero("quotient by zero"));
            }
            Ok((Value::make_integer(a / b), Value::make_integer(a % b)))
        }
        _ if x.is_exact_integer() && y.is_exact_integer() => {
            if sign(y)? == 0 {
                return Err(Condition::div_by_zero("quotient by zero"));
            }
            let (q, r) = to_big(x)
                .divrem(&to_big(y))
                .expect("divisor sign checked above");
            Ok((q.into_value(), r.into_value()))
        }
        _ => {
            // flonum path: both operands must be whole numbers
            let rx = integer_double(x)?;
            let ry = integer_double(y)?;
            if ry == 0.0 {
                return Err(Condition::div_by_zero("quotient by zero"));
            }
            let q = (rx / ry).trunc();
            Ok((Value::Flonum(q), Value::Flonum(rx - q * ry)))
        }
    }
}

fn integer_double(v: &Value) -> Result<f64, Condition> {
    if !v.is_integer() {
        return Err(integer_required(v));
    }
    get_double(v)
}

pub fn quotient(x: &Value, y: &Value) -> Result<Value, Condition> {
    Ok(quotient_remainder(x, y)?.0)
}

pub fn remainder(x: &Value, y: &Value) -> Result<Value, Condition> {
    Ok(quotient_remainder(x, y)?.1)
}

/// Modulo: the remainder adjusted so its sign follows the divisor.
pub fn modulo(x: &Value, y: &Value) -> Result<Value, Condition> {
    let (_, r) = quotient_remainder(x, y)?;
    let nonzero = match &r {
        Value::Flonum(d) => *d != 0.0,
        v => !v.is_exact_zero(),
    };
    if nonzero && sign(x)? * sign(y)? < 0 {
        add(&r, y)
    } else {
        Ok(r)
    }
}

// =============================================================================
// Gcd
// =============================================================================

fn gcd_flonum(mut x: f64, mut y: f64) -> f64 {
    x = x.abs();
    y = y.abs();
    if x < y {
        std::mem::swap(&mut x, &mut y);
    }
    while y > 0.0 {
        let r = x % y;
        x = y;
        y = r;
    }
    x
}

/// Non-negative gcd over integers, including whole flonums.
pub fn gcd(x: &Value, y: &Value) -> Result<Value, Condition> {
    if !x.is_integer() {
        return Err(integer_required(x));
    }
    if !y.is_integer() {
        return Err(integer_required(y));
    }
    if matches!(x, Value::Flonum(_)) || matches!(y, Value::Flonum(_)) {
        return Ok(Value::Flonum(gcd_flonum(get_double(x)?, get_double(y)?)));
    }
    Ok(int_gcd(x, y))
}

// =============================================================================
// Expt
// =============================================================================

/// Every power of ten a double's shortest printing needs, denormals
/// included; the exact-expt fast path caches up to here.
const IEXPT10_TABLESIZ: usize = 341;

thread_local! {
    static IEXPT10: RefCell<Vec<Value>> = const { RefCell::new(Vec::new()) };
}

/// Cached exact 10^e. Entries are immutable once computed; the table grows
/// on demand for the parser, which can see decimal scales past the
/// printer's range.
pub(crate) fn iexpt10(e: usize) -> Value {
    IEXPT10.with(|cell| {
        let mut tab = cell.borrow_mut();
        if tab.is_empty() {
            tab.reserve(IEXPT10_TABLESIZ);
            tab.push(Value::Fixnum(1));
        }
        while tab.len() <= e {
            let prev = tab.last().cloned().expect("table is seeded above");
            tab.push(int_mul(&prev, &Value::Fixnum(10)));
        }
        tab[e].clone()
    })
}

fn exact_expt(x: &Value, y: &Value) -> Result<Value, Condition> {
    let ysign = sign(y)?;
    if ysign == 0 {
        return Ok(Value::Fixnum(1));
    }
    if x.is_exact_one() {
        return Ok(Value::Fixnum(1));
    }
    if *x == Value::Fixnum(-1) {
        return Ok(if is_odd(y)? {
            Value::Fixnum(-1)
        } else {
            Value::Fixnum(1)
        });
    }
    let Some(iy) = y.as_fixnum() else {
        return Err(Condition::impl_limit("exponent too big").with_irritant(y.clone()));
    };
    let result = if *x == Value::Fixnum(10) && iy > 0 && (iy as usize) < IEXPT10_TABLESIZ {
        iexpt10(iy as usize)
    } else if *x == Value::Fixnum(2) && iy > 0 {
        ash_unchecked(&Value::Fixnum(1), iy)
    } else {
        let mut n = iy.unsigned_abs();
        let mut base = x.clone();
        let mut r = Value::Fixnum(1);
        loop {
            if n == 0 {
                break;
            }
            if n == 1 {
                r = mul(&r, &base)?;
                break;
            }
            if n & 1 == 1 {
                r = mul(&r, &base)?;
            }
            base = mul(&base, &base)?;
            n >>= 1;
        }
        r
    };
    if ysign < 0 {
        reciprocal(&result)
    } else {
        Ok(result)
    }
}

/// Exponentiation. Exact base with an exact integer exponent stays exact;
/// a negative real base with a non-integer exponent goes through polar form
/// and yields a compnum.
pub fn expt(x: &Value, y: &Value) -> Result<Value, Condition> {
    if x.is_exact() && y.is_exact_integer() {
        return exact_expt(x, y);
    }
    if !x.is_real() {
        return Err(real_required(x));
    }
    if !y.is_real() {
        return Err(real_required(y));
    }
    let dx = get_double(x)?;
    let dy = get_double(y)?;
    if dy == 0.0 {
        Ok(Value::Flonum(1.0))
    } else if dx < 0.0 && !y.is_integer() {
        // x^y = exp(y ln|x|) * e^(i y pi) for negative real x
        let mag = (dy * (-dx).ln()).exp();
        let theta = dy * std::f64::consts::PI;
        Ok(Value::make_complex(mag * theta.cos(), mag * theta.sin()))
    } else {
        Ok(Value::Flonum(dx.powf(dy)))
    }
}

// =============================================================================
// Comparison
// =============================================================================

fn exact_cmp(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Ratnum(_), _) | (_, Value::Ratnum(_)) => {
            let (na, da) = match a {
                Value::Ratnum(r) => (r.numer.clone(), r.denom.clone()),
                _ => (a.clone(), Value::Fixnum(1)),
            };
            let (nb, db) = match b {
                Value::Ratnum(r) => (r.numer.clone(), r.denom.clone()),
                _ => (b.clone(), Value::Fixnum(1)),
            };
            int_cmp(&int_mul(&na, &db), &int_mul(&nb, &da))
        }
        _ => int_cmp(a, b),
    }
}

/// Three-way comparison of real numbers. Exact operands never round
/// through a double: a flonum facing a bignum or ratnum is promoted to an
/// exact rational first. NaN does not order.
pub fn num_cmp(a: &Value, b: &Value) -> Result<Ordering, Condition> {
    if !a.is_real() {
        return Err(real_required(a));
    }
    if !b.is_real() {
        return Err(real_required(b));
    }
    match (a, b) {
        (Value::Flonum(x), Value::Flonum(y)) => x
            .partial_cmp(y)
            .ok_or_else(|| Condition::domain("NaN is not ordered")),
        (Value::Fixnum(x), Value::Flonum(y)) => {
            // a 48-bit fixnum converts to double exactly
            (*x as f64)
                .partial_cmp(y)
                .ok_or_else(|| Condition::domain("NaN is not ordered"))
        }
        (Value::Flonum(x), Value::Fixnum(y)) => x
            .partial_cmp(&(*y as f64))
            .ok_or_else(|| Condition::domain("NaN is not ordered")),
        (Value::Flonum(x), _) => match decode_flonum(*x) {
            FlonumDecode::Nan => Err(Condition::domain("NaN is not ordered")),
            FlonumDecode::Infinite(s) => Ok(if s > 0 {
                Ordering::Greater
            } else {
                Ordering::Less
            }),
            FlonumDecode::Finite { .. } => {
                let ex = flonum_to_exact(*x).expect("finite flonum converts exactly");
                Ok(exact_cmp(&ex, b))
            }
        },
        (_, Value::Flonum(_)) => Ok(num_cmp(b, a)?.reverse()),
        _ => Ok(exact_cmp(a, b)),
    }
}

/// Numeric equality. NaN is unequal to everything, including itself;
/// exact zero and -0.0 compare equal.
pub fn num_eq(a: &Value, b: &Value) -> Result<bool, Condition> {
    match (a, b) {
        (Value::Compnum(x), Value::Compnum(y)) => Ok(x.real == y.real && x.imag == y.imag),
        (Value::Compnum(_), _) | (_, Value::Compnum(_)) => {
            if !a.is_number() {
                return Err(bad_operand("=", a));
            }
            if !b.is_number() {
                return Err(bad_operand("=", b));
            }
            Ok(false)
        }
        (Value::Flonum(x), _) if x.is_nan() => Ok(false),
        (_, Value::Flonum(y)) if y.is_nan() => Ok(false),
        _ => Ok(num_cmp(a, b)? == Ordering::Equal),
    }
}

/// Minimum and maximum of a non-empty slice of reals, with inexactness
/// contagion: one inexact argument makes both results inexact.
pub fn min_max(args: &[Value]) -> Result<(Value, Value), Condition> {
    let first = args
        .first()
        .ok_or_else(|| Condition::error("min/max: at least one argument required"))?;
    if !first.is_real() {
        return Err(real_required(first));
    }
    let mut inexact = first.is_inexact();
    let mut mi = first.clone();
    let mut ma = first.clone();
    for v in &args[1..] {
        if !v.is_real() {
            return Err(real_required(v));
        }
        inexact = inexact || v.is_inexact();
        if num_cmp(&mi, v)? == Ordering::Greater {
            mi = v.clone();
        }
        if num_cmp(&ma, v)? == Ordering::Less {
            ma = v.clone();
        }
    }
    if inexact {
        mi = exact_to_inexact(&mi)?;
        ma = exact_to_inexact(&ma)?;
    }
    Ok((mi, ma))
}

// =============================================================================
// Rounding
// =============================================================================

fn round_even(v: f64) -> f64 {
    let r = v.round();
    if (v - v.trunc()).abs() == 0.5 && r % 2.0 != 0.0 {
        r - v.signum()
    } else {
        r
    }
}

/// Round a real number under one of the four modes. Exact integers pass
/// through; ratnums stay exact.
pub fn round(v: &Value, mode: RoundMode) -> Result<Value, Condition> {
    if v.is_exact_integer() {
        return Ok(v.clone());
    }
    match v {
        Value::Ratnum(r) => {
            let (quot, rem) = quotient_remainder(&r.numer, &r.denom)?;
            let vsign = sign(v)?;
            // the quotient truncates toward zero; pick the offset by mode
            let offset: i64 = match mode {
                RoundMode::Floor => {
                    if vsign < 0 {
                        -1
                    } else {
                        0
                    }
                }
                RoundMode::Ceil => {
                    if vsign < 0 {
                        0
                    } else {
                        1
                    }
                }
                RoundMode::Trunc => 0,
                RoundMode::Round => {
                    let rem2 = int_mul(&int_abs(&rem), &Value::Fixnum(2));
                    match int_cmp(&r.denom, &rem2) {
                        Ordering::Greater => 0,
                        Ordering::Less => {
                            if vsign < 0 {
                                -1
                            } else {
                                1
                            }
                        }
                        Ordering::Equal => {
                            // exactly halfway: round toward the even quotient
                            if is_odd(&quot)? {
                                if vsign < 0 {
                                    -1
                                } else {
                                    1
                                }
                            } else {
                                0
                            }
                        }
                    }
                }
            };
            if offset == 0 {
                Ok(quot)
            } else {
                Ok(int_add(&quot, &Value::make_integer(offset)))
            }
        }
        Value::Flonum(d) => {
            let r = match mode {
                RoundMode::Floor => d.floor(),
                RoundMode::Ceil => d.ceil(),
                RoundMode::Trunc => d.trunc(),
                RoundMode::Round => round_even(*d),
            };
            Ok(Value::Flonum(r))
        }
        _ => Err(real_required(v)),
    }
}

// =============================================================================
// Logical (bitwise) operations
// =============================================================================

/// Arithmetic shift on exact integers: left for positive counts, sign
/// propagating right shift for negative counts.
pub fn ash(x: &Value, count: i64) -> Result<Value, Condition> {
    if !x.is_exact_integer() {
        return Err(integer_required(x));
    }
    Ok(ash_unchecked(x, count))
}

pub fn lognot(x: &Value) -> Result<Value, Condition> {
    match x {
        Value::Fixnum(n) => Ok(Value::make_integer(!n)),
        Value::Bignum(_) => {
            // ~x == -(x + 1) on the two's-complement view
            Ok(int_neg(&int_add(x, &Value::Fixnum(1))))
        }
        _ => Err(integer_required(x)),
    }
}

fn logop(
    x: &Value,
    y: &Value,
    fix_op: fn(i64, i64) -> i64,
    big_op: fn(&Bignum, &Bignum) -> Bignum,
) -> Result<Value, Condition> {
    match (x, y) {
        (Value::Fixnum(a), Value::Fixnum(b)) => Ok(Value::make_integer(fix_op(*a, *b))),
        _ if x.is_exact_integer() && y.is_exact_integer() => {
            Ok(big_op(&to_big(x), &to_big(y)).into_value())
        }
        _ if !x.is_exact_integer() => Err(integer_required(x)),
        _ => Err(integer_required(y)),
    }
}

pub fn logand(x: &Value, y: &Value) -> Result<Value, Condition> {
    logop(x, y, |a, b| a & b, Bignum::bit_and)
}

pub fn logior(x: &Value, y: &Value) -> Result<Value, Condition> {
    logop(x, y, |a, b| a | b, Bignum::bit_or)
}

pub fn logxor(x: &Value, y: &Value) -> Result<Value, Condition> {
    logop(x, y, |a, b| a ^ b, Bignum::bit_xor)
}
