//! Number parser.
//!
//! Grammar (R5RS section 7.1.1 with pound-padding):
//!
//! ```text
//! <number>  : <prefix> <complex>
//! <prefix>  : <radix> <exactness> | <exactness> <radix>
//! <radix>   : <empty> | '#b' | '#o' | '#d' | '#x'
//! <complex> : <real> | <real> '@' <real>
//!           | <real> '+' <ureal> 'i' | <real> '-' <ureal> 'i'
//!           | <real> '+' 'i' | <real> '-' 'i'
//!           | '+' <ureal> 'i' | '-' <ureal> 'i' | '+' 'i' | '-' 'i'
//! <ureal>   : <uinteger> | <uinteger> '/' <uinteger> | <decimal>
//! <suffix>  : <empty> | <exponent-marker> <sign> <digit10>+
//! ```
//!
//! Inexact decimals are corrected with Clinger's Algorithm R ("How to Read
//! Floating Point Numbers Accurately", PLDI '90), so `read . write` is the
//! identity on every flonum.

use crate::number::arith::{
    self, ash_unchecked, decode_flonum, get_double, iexpt10, int_add, int_cmp, int_mul, int_sub,
    is_odd, FlonumDecode,
};
use crate::number::bignum::Bignum;
use crate::number::ratio::make_rational;
use crate::value::condition::Condition;
use crate::value::Value;
use std::cmp::Ordering;

/// Exponents at or beyond this are out of range for any double; exact
/// readings could represent them but would eat unbounded memory, so they
/// are an implementation limit.
const MAX_EXPONENT: i64 = 324;

/// Largest n where 10.0^n is exact in a double (n * log2(5) < 53).
const MAX_EXACT_10_EXP: i64 = 23;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exactness {
    Unspecified,
    Exact,
    Inexact,
}

/// Parse a number from a character buffer.
///
/// Returns `Ok(None)` for malformed input in non-strict mode; in strict
/// mode implementation-limit violations surface as conditions
/// (`number/impl-limit`) and other malformed input as `number/parse`.
pub fn parse_number(input: &str, radix: u32, strict: bool) -> Result<Option<Value>, Condition> {
    if !(2..=36).contains(&radix) || !input.is_ascii() || input.is_empty() {
        return Ok(None);
    }
    let mut rd = Reader {
        buf: input.as_bytes(),
        pos: 0,
        radix,
        exactness: Exactness::Unspecified,
        padread: false,
        strict,
        original: input,
    };
    rd.read_number()
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
    radix: u32,
    exactness: Exactness,
    padread: bool,
    strict: bool,
    original: &'a str,
}

impl<'a> Reader<'a> {
    fn rest(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn peek(&self) -> Option<u8> {
        self.buf.get(self.pos).copied()
    }

    fn peek_at(&self, off: usize) -> Option<u8> {
        self.buf.get(self.pos + off).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn fail(&self, msg: &str) -> Result<Option<Value>, Condition> {
        if self.strict {
            Err(Condition::number_parse(format!(
                "bad number format {}: {:?}",
                msg, self.original
            )))
        } else {
            Ok(None)
        }
    }

    fn limit_error(&self, msg: &str) -> Result<Option<Value>, Condition> {
        if self.strict {
            Err(Condition::impl_limit(format!("{}: {:?}", msg, self.original)))
        } else {
            Ok(None)
        }
    }

    fn exact_complex_error(&self) -> Result<Option<Value>, Condition> {
        self.fail("(exact complex number is not supported)")
    }

    // =========================================================================
    // Entry point
    // =========================================================================

    fn read_number(&mut self) -> Result<Option<Value>, Condition> {
        let mut radix_seen = false;
        let mut exactness_seen = false;

        // prefixes, in either order
        while self.peek() == Some(b'#') {
            let Some(mark) = self.peek_at(1) else {
                return self.fail("(lone # prefix)");
            };
            match mark.to_ascii_lowercase() {
                b'x' | b'o' | b'b' | b'd' => {
                    if radix_seen {
                        return self.fail("(duplicate radix prefix)");
                    }
                    self.radix = match mark.to_ascii_lowercase() {
                        b'x' => 16,
                        b'o' => 8,
                        b'b' => 2,
                        _ => 10,
                    };
                    radix_seen = true;
                }
                b'e' => {
                    if exactness_seen {
                        return self.fail("(duplicate exactness prefix)");
                    }
                    self.exactness = Exactness::Exact;
                    exactness_seen = true;
                }
                b'i' => {
                    if exactness_seen {
                        return self.fail("(duplicate exactness prefix)");
                    }
                    self.exactness = Exactness::Inexact;
                    exactness_seen = true;
                }
                _ => return self.fail("(unknown prefix)"),
            }
            self.pos += 2;
        }
        if self.rest() == 0 {
            return self.fail("(empty number)");
        }

        // pure imaginary +i / -i
        let mut sign_seen = false;
        if matches!(self.peek(), Some(b'+') | Some(b'-')) {
            if self.rest() == 1 {
                return self.fail("(lone sign)");
            }
            if self.rest() == 2 && self.peek_at(1).map(|c| c.to_ascii_lowercase()) == Some(b'i') {
                if self.exactness == Exactness::Exact {
                    return self.exact_complex_error();
                }
                let im = if self.peek() == Some(b'+') { 1.0 } else { -1.0 };
                return Ok(Some(Value::make_complex(0.0, im)));
            }
            sign_seen = true;
        }

        let Some(realpart) = self.read_real()? else {
            return Ok(None);
        };
        if self.rest() == 0 {
            return Ok(Some(realpart));
        }

        match self.peek() {
            Some(b'@') => {
                // polar representation
                if self.rest() <= 1 {
                    return self.fail("(truncated polar form)");
                }
                self.bump();
                let Some(angle) = self.read_real()? else {
                    return Ok(None);
                };
                if self.rest() != 0 {
                    return self.fail("(trailing garbage after polar form)");
                }
                if self.exactness == Exactness::Exact {
                    return self.exact_complex_error();
                }
                let mag = get_double(&realpart)?;
                let ang = get_double(&angle)?;
                Ok(Some(Value::make_polar(mag, ang)))
            }
            Some(b'+') | Some(b'-') => {
                // rectangular representation
                if self.rest() <= 1 {
                    return self.fail("(truncated complex form)");
                }
                if self.rest() == 2
                    && self.peek_at(1).map(|c| c.to_ascii_lowercase()) == Some(b'i')
                {
                    if self.exactness == Exactness::Exact {
                        return self.exact_complex_error();
                    }
                    let im = if self.peek() == Some(b'+') { 1.0 } else { -1.0 };
                    return Ok(Some(Value::make_complex(get_double(&realpart)?, im)));
                }
                let Some(imagpart) = self.read_real()? else {
                    return Ok(None);
                };
                if self.rest() != 1 || self.peek().map(|c| c.to_ascii_lowercase()) != Some(b'i') {
                    return self.fail("(rectangular form must end in i)");
                }
                if self.exactness == Exactness::Exact {
                    return self.exact_complex_error();
                }
                if arith::sign(&imagpart)? == 0 {
                    return Ok(Some(realpart));
                }
                Ok(Some(Value::make_complex(
                    get_double(&realpart)?,
                    get_double(&imagpart)?,
                )))
            }
            Some(c) if c.to_ascii_lowercase() == b'i' => {
                // '+' <ureal> 'i' or '-' <ureal> 'i'
                if !sign_seen || self.rest() != 1 {
                    return self.fail("(misplaced i)");
                }
                if self.exactness == Exactness::Exact {
                    return self.exact_complex_error();
                }
                if arith::sign(&realpart)? == 0 {
                    Ok(Some(Value::Flonum(0.0)))
                } else {
                    Ok(Some(Value::make_complex(0.0, get_double(&realpart)?)))
                }
            }
            _ => self.fail("(trailing garbage)"),
        }
    }

    // =========================================================================
    // Real numbers
    // =========================================================================

    fn read_real(&mut self) -> Result<Option<Value>, Condition> {
        let minusp = match self.peek() {
            Some(b'-') => {
                self.bump();
                true
            }
            Some(b'+') => {
                self.bump();
                false
            }
            _ => false,
        };
        if self.rest() == 0 {
            return Ok(None);
        }

        let mut fracdigs: i64 = 0;
        let intpart;
        let fraction;

        if self.peek() != Some(b'.') {
            let Some(ip) = self.read_uint(None) else {
                return Ok(None);
            };

            if self.rest() == 0 {
                let v = if minusp { arith::negate(&ip)? } else { ip };
                return if self.exactness == Exactness::Inexact {
                    Ok(Some(arith::exact_to_inexact(&v)?))
                } else {
                    Ok(Some(v))
                };
            }

            if self.peek() == Some(b'/') {
                // possibly rational
                if self.rest() <= 1 {
                    return Ok(None);
                }
                self.bump();
                let before = self.pos;
                let Some(denom) = self.read_uint(None) else {
                    return Ok(None);
                };
                if denom.is_exact_zero() {
                    if self.pos > before {
                        if self.exactness == Exactness::Exact {
                            return self.limit_error("(exact infinity/nan is not supported)");
                        }
                        if ip.is_exact_zero() {
                            return Ok(Some(Value::Flonum(f64::NAN)));
                        }
                        return Ok(Some(Value::Flonum(if minusp {
                            f64::NEG_INFINITY
                        } else {
                            f64::INFINITY
                        })));
                    }
                    return Ok(None);
                }
                let numer = if minusp { arith::negate(&ip)? } else { ip };
                return if self.exactness == Exactness::Inexact {
                    Ok(Some(arith::exact_to_inexact(&arith::div(&numer, &denom)?)?))
                } else {
                    Ok(Some(make_rational(numer, denom)?))
                };
            }
            intpart = Some(ip);
        } else {
            intpart = None;
        }

        if self.peek() == Some(b'.') {
            if self.radix != 10 {
                return self.fail("(only 10-based fraction is supported)");
            }
            self.bump();
            let before = self.pos;
            let f = self.read_uint(intpart.clone());
            fracdigs = (self.pos - before) as i64;
            match f {
                Some(v) => fraction = v,
                None => {
                    // "123." keeps the integer part; lone "." is malformed
                    match &intpart {
                        Some(ip) => fraction = ip.clone(),
                        None => return Ok(None),
                    }
                }
            }
        } else {
            match &intpart {
                Some(ip) => fraction = ip.clone(),
                None => return Ok(None),
            }
        }

        if intpart.is_none() && fracdigs == 0 {
            return Ok(None);
        }

        // exponent suffix
        let mut exponent: i64 = 0;
        let mut exp_minusp = false;
        let mut exp_overflow = false;
        if matches!(
            self.peek().map(|c| c.to_ascii_lowercase()),
            Some(b'e') | Some(b's') | Some(b'f') | Some(b'd') | Some(b'l')
        ) {
            self.bump();
            if self.rest() == 0 {
                return Ok(None);
            }
            match self.peek() {
                Some(b'-') => {
                    exp_minusp = true;
                    self.bump();
                }
                Some(b'+') => {
                    self.bump();
                }
                _ => {}
            }
            if self.rest() == 0 {
                return Ok(None);
            }
            let mut any = false;
            while let Some(c) = self.peek() {
                if !c.is_ascii_digit() {
                    break;
                }
                self.bump();
                any = true;
                exponent = exponent
                    .saturating_mul(10)
                    .saturating_add((c - b'0') as i64)
                    .min(100_000_000);
                if exponent >= MAX_EXPONENT {
                    exp_overflow = true;
                }
            }
            if !any {
                return Ok(None);
            }
            if exp_minusp {
                exponent = -exponent;
            }
        }

        // exact readings of such exponents would be correct but eat
        // unbounded memory; inexact ones collapse through the double
        // composition below
        if exp_overflow && self.exactness == Exactness::Exact {
            return self.limit_error("(such an exact number is out of implementation limits)");
        }

        // compose the number
        if self.exactness == Exactness::Exact {
            let scale = arith::expt(
                &Value::Fixnum(10),
                &Value::make_integer(exponent - fracdigs),
            )?;
            let e = arith::mul(&fraction, &scale)?;
            return Ok(Some(if minusp { arith::negate(&e)? } else { e }));
        }

        let mut realnum = get_double(&fraction)?;
        realnum = raise_pow10(realnum, exponent - fracdigs);
        if realnum.is_infinite() {
            return Ok(Some(Value::Flonum(if minusp {
                f64::NEG_INFINITY
            } else {
                f64::INFINITY
            })));
        }
        let two52 = ash_unchecked(&Value::Fixnum(1), 52);
        if realnum > 0.0
            && (int_cmp(&fraction, &two52) == Ordering::Greater
                || exponent - fracdigs > MAX_EXACT_10_EXP
                || exponent - fracdigs < -MAX_EXACT_10_EXP)
        {
            realnum = algorithm_r(&fraction, exponent - fracdigs, realnum)?;
        }
        if minusp {
            realnum = -realnum;
        }
        Ok(Some(Value::Flonum(realnum)))
    }

    // =========================================================================
    // Unsigned integers
    // =========================================================================

    /// Read an unsigned integer in the current radix, continuing from
    /// `initval` when given (used to splice the fractional digits onto the
    /// integer part). Returns `None` when no digit was consumed and no
    /// initial value was supplied.
    fn read_uint(&mut self, initval: Option<Value>) -> Option<Value> {
        let radix = self.radix as u64;
        // largest value that cannot overflow when one more digit arrives
        let limit = u64::MAX / radix - radix;
        let (bigdig, diglimit) = radix_chunk(self.radix);

        let mut value_int: u64 = 0;
        let mut digits: usize = 0;
        let mut value_big: Option<Bignum> = None;
        let mut digread = false;

        match initval {
            Some(Value::Fixnum(n)) => {
                debug_assert!(n >= 0);
                if n as u64 > limit {
                    value_big = Some(Bignum::from_i64(n));
                } else {
                    value_int = n as u64;
                }
                digread = true;
            }
            Some(Value::Bignum(b)) => {
                value_big = Some((*b).clone());
                digread = true;
            }
            Some(_) => unreachable!("initval is an exact integer"),
            None => {
                // skip leading zeros to avoid pointless bignum churn
                if self.peek() == Some(b'0') {
                    while self.peek() == Some(b'0') {
                        self.bump();
                    }
                    digread = true;
                }
            }
        }

        while let Some(c) = self.peek() {
            let c = c.to_ascii_lowercase();
            let digval: u64;
            if self.padread {
                if c == b'#' {
                    digval = 0;
                } else {
                    break;
                }
            } else if digread && c == b'#' {
                digval = 0;
                self.padread = true;
                if self.exactness == Exactness::Unspecified {
                    self.exactness = Exactness::Inexact;
                }
            } else {
                match digit_value(c, self.radix) {
                    Some(d) => {
                        digval = d;
                        digread = true;
                    }
                    None => break,
                }
            }
            self.bump();
            value_int = value_int * radix + digval;
            digits += 1;
            match &mut value_big {
                None => {
                    if value_int >= limit {
                        value_big = Some(Bignum::from_u64(value_int));
                        value_int = 0;
                        digits = 0;
                    }
                }
                Some(big) => {
                    if digits >= diglimit {
                        *big = big.acc_mul_add(bigdig, value_int);
                        value_int = 0;
                        digits = 0;
                    }
                }
            }
        }

        if !digread {
            return None;
        }
        match value_big {
            None => Some(Value::make_integer_u64(value_int)),
            Some(big) => {
                let big = if digits > 0 {
                    big.acc_mul_add(ipow(radix, digits), value_int)
                } else {
                    big
                };
                Some(big.into_value())
            }
        }
    }
}

fn digit_value(c: u8, radix: u32) -> Option<u64> {
    let v = match c {
        b'0'..=b'9' => (c - b'0') as u32,
        b'a'..=b'z' => (c - b'a') as u32 + 10,
        _ => return None,
    };
    if v < radix {
        Some(v as u64)
    } else {
        None
    }
}

/// Largest power of `radix` fitting a limb, with its digit count.
fn radix_chunk(radix: u32) -> (u64, usize) {
    let mut base = radix as u128;
    let mut digs = 1usize;
    while base * (radix as u128) <= u64::MAX as u128 {
        base *= radix as u128;
        digs += 1;
    }
    (base as u64, digs)
}

/// radix^n for small n; everything stays in range by construction.
fn ipow(radix: u64, n: usize) -> u64 {
    let mut k = 1u64;
    for _ in 0..n {
        k *= radix;
    }
    k
}

/// x * 10.0^n. 10.0^n is exact in a double for 0 <= n <= 23; outside that
/// a rounding error creeps in, which Algorithm R corrects afterwards.
fn raise_pow10(mut x: f64, mut n: i64) -> f64 {
    const DPOW10: [f64; 24] = [
        1.0, 1.0e1, 1.0e2, 1.0e3, 1.0e4, 1.0e5, 1.0e6, 1.0e7, 1.0e8, 1.0e9, 1.0e10, 1.0e11,
        1.0e12, 1.0e13, 1.0e14, 1.0e15, 1.0e16, 1.0e17, 1.0e18, 1.0e19, 1.0e20, 1.0e21, 1.0e22,
        1.0e23,
    ];
    if n >= 0 {
        while n > 23 {
            x *= 1.0e24;
            n -= 24;
            if x.is_infinite() {
                return x;
            }
        }
        x * DPOW10[n as usize]
    } else {
        while n < -23 {
            x /= 1.0e24;
            n += 24;
            if x == 0.0 || x.is_infinite() {
                return x;
            }
        }
        x / DPOW10[(-n) as usize]
    }
}

/// Find the double closest to `f * 10^e`, starting from the approximation
/// `z`. Clinger's Algorithm R, restated to reuse work between iterations.
fn algorithm_r(f: &Value, e: i64, z: f64) -> Result<f64, Condition> {
    let FlonumDecode::Finite {
        mantissa: mut m,
        exp: mut k,
        ..
    } = decode_flonum(z)
    else {
        return Ok(z);
    };
    let two52 = ash_unchecked(&Value::Fixnum(1), 52);
    let two53 = ash_unchecked(&Value::Fixnum(1), 53);

    let mut x;
    let mut y;
    'retry: loop {
        if k >= 0 {
            if e >= 0 {
                x = int_mul(f, &iexpt10(e as usize));
                y = ash_unchecked(&m, k as i64);
            } else {
                x = f.clone();
                y = ash_unchecked(&int_mul(&m, &iexpt10((-e) as usize)), k as i64);
            }
        } else if e >= 0 {
            x = ash_unchecked(&int_mul(f, &iexpt10(e as usize)), -(k as i64));
            y = m.clone();
        } else {
            x = ash_unchecked(f, -(k as i64));
            y = int_mul(&m, &iexpt10((-e) as usize));
        }
        let mut kprev = k;

        loop {
            let sign_d = int_cmp(&x, &y);
            let abs_d = match sign_d {
                Ordering::Greater => int_sub(&x, &y),
                _ => int_sub(&y, &x),
            };
            let d2 = ash_unchecked(&int_mul(&m, &abs_d), 1);
            let at_boundary = int_cmp(&m, &two52) == Ordering::Equal;
            enum Step {
                Done,
                Prev,
                Next,
            }
            let step = match int_cmp(&d2, &y) {
                Ordering::Less => {
                    if at_boundary
                        && sign_d == Ordering::Less
                        && int_cmp(&ash_unchecked(&d2, 1), &y) == Ordering::Greater
                    {
                        Step::Prev
                    } else {
                        Step::Done
                    }
                }
                Ordering::Equal => {
                    if !is_odd(&m)? {
                        if at_boundary && sign_d == Ordering::Less {
                            Step::Prev
                        } else {
                            Step::Done
                        }
                    } else if sign_d == Ordering::Less {
                        Step::Prev
                    } else {
                        Step::Next
                    }
                }
                Ordering::Greater => {
                    if sign_d == Ordering::Less {
                        Step::Prev
                    } else {
                        Step::Next
                    }
                }
            };
            match step {
                Step::Done => {
                    return Ok(arith::ldexp(get_double(&m)?, k));
                }
                Step::Prev => {
                    m = int_sub(&m, &Value::Fixnum(1));
                    if k > -1074 && int_cmp(&m, &two52) == Ordering::Less {
                        m = ash_unchecked(&m, 1);
                        k -= 1;
                    }
                }
                Step::Next => {
                    m = int_add(&m, &Value::Fixnum(1));
                    if int_cmp(&m, &two53) != Ordering::Less {
                        m = ash_unchecked(&m, -1);
                        k += 1;
                    }
                }
            }
            // refresh the comparands, restarting when k changed sign
            if kprev >= 0 {
                if k >= 0 {
                    // k stays non-negative, x is invariant
                    if e >= 0 {
                        y = ash_unchecked(&m, k as i64);
                    } else {
                        y = ash_unchecked(&int_mul(&m, &iexpt10((-e) as usize)), k as i64);
                    }
                } else {
                    continue 'retry;
                }
            } else if k < 0 {
                if e >= 0 {
                    if k != kprev {
                        x = ash_unchecked(&int_mul(f, &iexpt10(e as usize)), -(k as i64));
                    }
                    y = m.clone();
                } else {
                    if k != kprev {
                        x = ash_unchecked(f, -(k as i64));
                    }
                    y = int_mul(&m, &iexpt10((-e) as usize));
                }
            } else {
                continue 'retry;
            }
            kprev = k;
        }
    }
}
