//! Exact rationals.
//!
//! A published `Ratnum` is reduced: gcd(|numer|, denom) = 1, denom > 0 and
//! denom != 1. [`make_rational`] is the only constructor that enforces this;
//! the arithmetic below may build denormalized intermediates but always
//! publishes through it.

use crate::number::arith::{int_add, int_cmp, int_gcd, int_mul, int_neg, int_quotient, int_sub};
use crate::value::condition::Condition;
use crate::value::Value;
use std::cmp::Ordering;

/// Reduced fraction of two exact integers.
#[derive(Debug, Clone, PartialEq)]
pub struct Ratnum {
    pub numer: Value,
    pub denom: Value,
}

/// Numerator of a rational; integers are their own numerator.
pub fn numerator(v: &Value) -> Option<Value> {
    match v {
        Value::Ratnum(r) => Some(r.numer.clone()),
        _ if v.is_exact_integer() => Some(v.clone()),
        _ => None,
    }
}

/// Denominator of a rational; 1 for integers.
pub fn denominator(v: &Value) -> Option<Value> {
    match v {
        Value::Ratnum(r) => Some(r.denom.clone()),
        _ if v.is_exact_integer() => Some(Value::Fixnum(1)),
        _ => None,
    }
}

/// Build a reduced rational from two exact integers. Collapses to an
/// integer when the reduced denominator is 1.
pub fn make_rational(numer: Value, denom: Value) -> Result<Value, Condition> {
    if !numer.is_exact_integer() {
        return Err(Condition::domain(format!(
            "numerator must be an exact integer, but got {}",
            numer.type_name()
        )));
    }
    if !denom.is_exact_integer() {
        return Err(Condition::domain(format!(
            "denominator must be an exact integer, but got {}",
            denom.type_name()
        )));
    }
    if denom.is_exact_zero() {
        return Err(Condition::div_by_zero("rational with zero denominator"));
    }
    if denom.is_exact_one() {
        return Ok(numer);
    }
    if numer.is_exact_zero() {
        return Ok(Value::Fixnum(0));
    }

    // move the sign onto the numerator
    let (numer, denom) = if int_cmp(&denom, &Value::Fixnum(0)) == Ordering::Less {
        (int_neg(&numer), int_neg(&denom))
    } else {
        (numer, denom)
    };

    let common = int_gcd(&numer, &denom);
    let (numer, denom) = if common.is_exact_one() {
        (numer, denom)
    } else {
        (int_quotient(&numer, &common), int_quotient(&denom, &common))
    };
    if denom.is_exact_one() {
        Ok(numer)
    } else {
        Ok(Value::ratnum(Ratnum { numer, denom }))
    }
}

fn parts(v: &Value) -> (Value, Value) {
    match v {
        Value::Ratnum(r) => (r.numer.clone(), r.denom.clone()),
        _ => (v.clone(), Value::Fixnum(1)),
    }
}

/// Rational add/sub. Operands must be exact (integer or ratnum). Factors
/// the denominators by their gcd instead of multiplying blindly.
pub(crate) fn add_sub(x: &Value, y: &Value, subtract: bool) -> Result<Value, Condition> {
    let (mut nx, dx) = parts(x);
    let (mut ny, dy) = parts(y);

    let dr;
    if int_cmp(&dx, &dy) == Ordering::Equal {
        dr = dx;
    } else {
        let gcd = if dx.is_exact_one() || dy.is_exact_one() {
            Value::Fixnum(1)
        } else {
            int_gcd(&dx, &dy)
        };
        if int_cmp(&dx, &gcd) == Ordering::Equal {
            // only factor x
            nx = int_mul(&int_quotient(&dy, &dx), &nx);
            dr = dy;
        } else if int_cmp(&dy, &gcd) == Ordering::Equal {
            // only factor y
            ny = int_mul(&int_quotient(&dx, &dy), &ny);
            dr = dx;
        } else {
            let fx = int_quotient(&dx, &gcd);
            let fy = int_quotient(&dy, &gcd);
            nx = int_mul(&nx, &fy);
            ny = int_mul(&ny, &fx);
            dr = int_mul(&dx, &fy);
        }
    }
    let nr = if subtract {
        int_sub(&nx, &ny)
    } else {
        int_add(&nx, &ny)
    };
    make_rational(nr, dr)
}

/// Rational mul/div. Operands must be exact (integer or ratnum).
pub(crate) fn mul_div(x: &Value, y: &Value, divide: bool) -> Result<Value, Condition> {
    let (nx, dx) = parts(x);
    let (ny, dy) = parts(y);
    let (ny, dy) = if divide { (dy, ny) } else { (ny, dy) };
    make_rational(int_mul(&nx, &ny), int_mul(&dx, &dy))
}
