// Property tests for the numeric tower.
//
// Verifies the exact-closure, gcd and mixed-comparison laws across wide
// operand ranges, including values past the fixnum boundary.

use crate::common::int;
use onyx::number::arith;
use onyx::value::Value;
use proptest::prelude::*;
use std::cmp::Ordering;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    // =========================================================================
    // Exact closure: a + b - b == a and (a * b) / b == a, exactly
    // =========================================================================

    #[test]
    fn add_sub_cancels_exactly(a in any::<i64>(), b in any::<i64>()) {
        let (va, vb) = (int(a), int(b));
        let r = arith::sub(&arith::add(&va, &vb).unwrap(), &vb).unwrap();
        prop_assert_eq!(r, va);
    }

    #[test]
    fn mul_div_cancels_exactly(a in any::<i64>(), b in any::<i64>()) {
        prop_assume!(b != 0);
        let (va, vb) = (int(a), int(b));
        let r = arith::div(&arith::mul(&va, &vb).unwrap(), &vb).unwrap();
        prop_assert_eq!(r, va);
    }

    #[test]
    fn rational_closure(n1 in -10000i64..10000, d1 in 1i64..10000,
                        n2 in -10000i64..10000, d2 in 1i64..10000) {
        let a = arith::div(&int(n1), &int(d1)).unwrap();
        let b = arith::div(&int(n2), &int(d2)).unwrap();
        prop_assume!(!b.is_exact_zero());
        let back = arith::sub(&arith::add(&a, &b).unwrap(), &b).unwrap();
        prop_assert_eq!(back.clone(), a.clone());
        let back = arith::div(&arith::mul(&a, &b).unwrap(), &b).unwrap();
        prop_assert_eq!(back, a);
    }

    // =========================================================================
    // Commutativity and associativity stay exact past the fixnum range
    // =========================================================================

    #[test]
    fn add_commutative(a in any::<i64>(), b in any::<i64>()) {
        let r1 = arith::add(&int(a), &int(b)).unwrap();
        let r2 = arith::add(&int(b), &int(a)).unwrap();
        prop_assert_eq!(r1, r2);
    }

    #[test]
    fn mul_associative(a in any::<i32>(), b in any::<i32>(), c in any::<i32>()) {
        let (a, b, c) = (int(a as i64), int(b as i64), int(c as i64));
        let r1 = arith::mul(&arith::mul(&a, &b).unwrap(), &c).unwrap();
        let r2 = arith::mul(&a, &arith::mul(&b, &c).unwrap()).unwrap();
        prop_assert_eq!(r1, r2);
    }

    // =========================================================================
    // gcd laws
    // =========================================================================

    #[test]
    fn gcd_of_zero_is_abs(y in any::<i64>()) {
        let g = arith::gcd(&int(0), &int(y)).unwrap();
        prop_assert_eq!(g, arith::abs(&int(y)).unwrap());
    }

    #[test]
    fn gcd_euclid_step(a in any::<i64>(), b in 1i64..i64::MAX) {
        let g1 = arith::gcd(&int(a), &int(b)).unwrap();
        let m = arith::modulo(&int(a), &int(b)).unwrap();
        let g2 = arith::gcd(&int(b), &m).unwrap();
        prop_assert_eq!(g1, g2);
    }

    #[test]
    fn gcd_non_negative_and_divides(a in -100000i64..100000, b in -100000i64..100000) {
        prop_assume!(a != 0 || b != 0);
        let g = arith::gcd(&int(a), &int(b)).unwrap();
        prop_assert!(arith::sign(&g).unwrap() >= 0);
        if !g.is_exact_zero() {
            prop_assert!(arith::remainder(&int(a), &g).unwrap().is_exact_zero());
            prop_assert!(arith::remainder(&int(b), &g).unwrap().is_exact_zero());
        }
    }

    // =========================================================================
    // Integer division family
    // =========================================================================

    #[test]
    fn quotient_remainder_identity(x in any::<i64>(), y in any::<i64>()) {
        prop_assume!(y != 0);
        let q = arith::quotient(&int(x), &int(y)).unwrap();
        let r = arith::remainder(&int(x), &int(y)).unwrap();
        // x == q*y + r
        let back = arith::add(&arith::mul(&q, &int(y)).unwrap(), &r).unwrap();
        prop_assert_eq!(back, int(x));
        // remainder sign follows the dividend
        if !r.is_exact_zero() {
            prop_assert_eq!(arith::sign(&r).unwrap(), arith::sign(&int(x)).unwrap());
        }
    }

    #[test]
    fn modulo_sign_follows_divisor(x in any::<i64>(), y in any::<i64>()) {
        prop_assume!(y != 0);
        let m = arith::modulo(&int(x), &int(y)).unwrap();
        if !m.is_exact_zero() {
            prop_assert_eq!(arith::sign(&m).unwrap(), arith::sign(&int(y)).unwrap());
        }
    }

    // =========================================================================
    // Mixed exact/flonum comparison is precise
    // =========================================================================

    #[test]
    fn bignum_flonum_comparison_precise(bits in any::<u64>(), delta in -2i64..=2) {
        let f = f64::from_bits(bits);
        prop_assume!(f.is_finite() && f.abs() >= 1.0);
        // an exact neighbor of the flonum's own integer part
        let exact = arith::inexact_to_exact(&Value::Flonum(f.trunc())).unwrap();
        let probe = arith::add(&exact, &int(delta)).unwrap();
        let cmp = arith::num_cmp(&probe, &Value::Flonum(f.trunc())).unwrap();
        let expected = match delta.cmp(&0) {
            Ordering::Less => Ordering::Less,
            Ordering::Equal => Ordering::Equal,
            Ordering::Greater => Ordering::Greater,
        };
        prop_assert_eq!(cmp, expected);
    }

    #[test]
    fn num_eq_consistent_with_cmp(a in any::<i64>(), bits in any::<u64>()) {
        let f = f64::from_bits(bits);
        prop_assume!(!f.is_nan());
        let va = int(a);
        let vf = Value::Flonum(f);
        let eq = arith::num_eq(&va, &vf).unwrap();
        if f.is_finite() {
            let cmp = arith::num_cmp(&va, &vf).unwrap();
            prop_assert_eq!(eq, cmp == Ordering::Equal);
        }
    }

    // =========================================================================
    // Rounding
    // =========================================================================

    #[test]
    fn round_modes_bracket_value(n in -100000i64..100000, d in 1i64..1000) {
        use onyx::number::RoundMode;
        let v = arith::div(&int(n), &int(d)).unwrap();
        prop_assume!(v.as_ratnum().is_some());
        let fl = arith::round(&v, RoundMode::Floor).unwrap();
        let ce = arith::round(&v, RoundMode::Ceil).unwrap();
        prop_assert_eq!(arith::sub(&ce, &fl).unwrap(), int(1));
        prop_assert_eq!(arith::num_cmp(&fl, &v).unwrap(), Ordering::Less);
        prop_assert_eq!(arith::num_cmp(&ce, &v).unwrap(), Ordering::Greater);
        // trunc picks floor or ceil by sign; round stays within the bracket
        let tr = arith::round(&v, RoundMode::Trunc).unwrap();
        prop_assert!(tr == fl || tr == ce);
        let rd = arith::round(&v, RoundMode::Round).unwrap();
        prop_assert!(rd == fl || rd == ce);
    }
}
