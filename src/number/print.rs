//! Number printer.
//!
//! Flonums print through the Burger & Dybvig algorithm ("Printing
//! Floating-Point Numbers Quickly and Accurately", PLDI '96): the shortest
//! decimal string that reads back to the same double, with correct
//! rounding at both cut-offs. Everything else is positional notation over
//! exact integer arithmetic.

use crate::number::arith::{
    ash_unchecked, int_add, int_cmp, int_mul, int_quotient, int_remainder, iexpt10,
};
use crate::number::arith::{decode_flonum, FlonumDecode};
use crate::value::condition::Condition;
use crate::value::Value;
use std::cmp::Ordering;

/// Render a number in the given radix. Only radix 10 can carry inexact
/// values; rationals print as `n/d`, complex numbers as `a+bi`.
pub fn number_to_string(v: &Value, radix: u32, uppercase: bool) -> Result<String, Condition> {
    if !(2..=36).contains(&radix) {
        return Err(Condition::domain(format!("radix out of range: {}", radix)));
    }
    match v {
        Value::Fixnum(n) => {
            if radix == 10 {
                Ok(n.to_string())
            } else {
                Ok(crate::number::bignum::Bignum::from_i64(*n).to_string_radix(radix, uppercase))
            }
        }
        Value::Bignum(b) => Ok(b.to_string_radix(radix, uppercase)),
        Value::Ratnum(r) => {
            let n = number_to_string(&r.numer, radix, uppercase)?;
            let d = number_to_string(&r.denom, radix, uppercase)?;
            Ok(format!("{}/{}", n, d))
        }
        Value::Flonum(d) => {
            if radix != 10 {
                return Err(Condition::domain(
                    "inexact numbers can only be printed in radix 10",
                ));
            }
            Ok(double_print(*d, false))
        }
        Value::Compnum(c) => {
            if radix != 10 {
                return Err(Condition::domain(
                    "inexact numbers can only be printed in radix 10",
                ));
            }
            let mut s = double_print(c.real, false);
            s.push_str(&double_print(c.imag, true));
            s.push('i');
            Ok(s)
        }
        _ => Err(Condition::domain(format!("number required, but got {}", v.type_name()))
            .with_irritant(v.clone())),
    }
}

/// cmp(x + d, y)
fn numcmp3(x: &Value, d: &Value, y: &Value) -> Ordering {
    int_cmp(&int_add(x, d), y)
}

/// Shortest correctly-rounding decimal form of a double.
pub fn double_print(val: f64, plus_sign: bool) -> String {
    if val == 0.0 {
        return if plus_sign { "+0.0" } else { "0.0" }.to_string();
    }
    if val.is_infinite() {
        return if val < 0.0 {
            "#i-1/0"
        } else if plus_sign {
            "#i+1/0"
        } else {
            "#i1/0"
        }
        .to_string();
    }
    if val.is_nan() {
        return "#<nan>".to_string();
    }

    let mut out = String::new();
    if val < 0.0 {
        out.push('-');
    } else if plus_sign {
        out.push('+');
    }
    let val = val.abs();

    // Variable names follow the Burger & Dybvig paper: mp and mm are m+ and
    // m-. m+ == m- except on a power-of-two boundary where m+ == 2*m-, so we
    // track the doubling with mp2 and recompute m+ from m- per iteration.
    let FlonumDecode::Finite { mantissa: f, exp, .. } = decode_flonum(val) else {
        unreachable!("specials handled above");
    };
    // an even mantissa may round at the cut-offs; an odd one may not
    let round = match &f {
        Value::Fixnum(n) => n & 1 == 0,
        Value::Bignum(b) => !b.is_odd(),
        _ => unreachable!("decoded mantissa is an exact integer"),
    };
    let two52 = ash_unchecked(&Value::Fixnum(1), 52);
    let at_boundary = int_cmp(&f, &two52) == Ordering::Equal && exp != -1074;

    let (mut r, mut s, mp2, mut mm);
    if exp >= 0 {
        let be = ash_unchecked(&Value::Fixnum(1), exp as i64);
        if !at_boundary {
            r = ash_unchecked(&f, exp as i64 + 1);
            s = Value::Fixnum(2);
            mp2 = false;
            mm = be;
        } else {
            r = ash_unchecked(&f, exp as i64 + 2);
            s = Value::Fixnum(4);
            mp2 = true;
            mm = be;
        }
    } else if !at_boundary {
        r = ash_unchecked(&f, 1);
        s = ash_unchecked(&Value::Fixnum(1), -(exp as i64) + 1);
        mp2 = false;
        mm = Value::Fixnum(1);
    } else {
        r = ash_unchecked(&f, 2);
        s = ash_unchecked(&Value::Fixnum(1), -(exp as i64) + 2);
        mp2 = true;
        mm = Value::Fixnum(1);
    }

    // estimate the decimal scale
    let mut est = (val.log10() - 0.1).ceil() as i32;
    if est >= 0 {
        s = int_mul(&s, &iexpt10(est as usize));
    } else {
        let scale = iexpt10((-est) as usize);
        r = int_mul(&r, &scale);
        mm = int_mul(&mm, &scale);
    }

    // fixup, avoiding the m+ computation for the obvious case
    let fixup = if int_cmp(&r, &s) != Ordering::Less {
        true
    } else {
        let mp = if mp2 { ash_unchecked(&mm, 1) } else { mm.clone() };
        if round {
            numcmp3(&r, &mp, &s) != Ordering::Less
        } else {
            numcmp3(&r, &mp, &s) == Ordering::Greater
        }
    };
    if fixup {
        s = int_mul(&s, &Value::Fixnum(10));
        est += 1;
    }

    // decimal point position; exponent notation is suppressed for small
    // scales, so 0.9 and 30.0 rather than 9.0e-1 and 3.0e1
    let point;
    if est < 10 && est > -3 {
        point = est;
        est = 1;
    } else {
        point = 1;
    }

    if point <= 0 {
        out.push('0');
        out.push('.');
        for _ in point..0 {
            out.push('0');
        }
    }

    // digit generation
    let mut digs: i32 = 1;
    loop {
        let r10 = int_mul(&r, &Value::Fixnum(10));
        let q = int_quotient(&r10, &s);
        r = int_remainder(&r10, &s);
        mm = int_mul(&mm, &Value::Fixnum(10));
        let mp = if mp2 { ash_unchecked(&mm, 1) } else { mm.clone() };

        let digit = q.as_fixnum().expect("decimal digit fits a fixnum") as u8;
        let (tc1, tc2) = if round {
            (
                int_cmp(&r, &mm) != Ordering::Greater,
                numcmp3(&r, &mp, &s) != Ordering::Less,
            )
        } else {
            (
                int_cmp(&r, &mm) == Ordering::Less,
                numcmp3(&r, &mp, &s) == Ordering::Greater,
            )
        };
        if !tc1 {
            if !tc2 {
                out.push((b'0' + digit) as char);
                if digs == point {
                    out.push('.');
                }
                digs += 1;
                continue;
            }
            out.push((b'0' + digit + 1) as char);
            break;
        }
        if !tc2 {
            out.push((b'0' + digit) as char);
            break;
        }
        // both cut-offs fired: the tie goes by which side is closer
        let tc3 = numcmp3(&r, &r, &s); // 2r <=> s
        if (round && tc3 != Ordering::Greater) || (!round && tc3 == Ordering::Less) {
            out.push((b'0' + digit) as char);
        } else {
            out.push((b'0' + digit + 1) as char);
        }
        break;
    }

    if digs <= point {
        for _ in digs..point {
            out.push('0');
        }
        out.push('.');
        out.push('0');
    }

    // the decimal point was shifted one digit in
    est -= 1;
    if est != 0 {
        out.push('e');
        out.push_str(&est.to_string());
    }
    out
}
