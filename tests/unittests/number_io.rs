// Number reading and writing: the contract is bit-exact round-trips.

use crate::common::{num, print};
use onyx::value::Value;
use onyx::{number_to_string, parse_number};

#[test]
fn test_shortest_decimal_for_point_one() {
    assert_eq!(print(&Value::Flonum(0.1)), "0.1");
    assert_ne!(print(&Value::Flonum(0.1)), "0.10000000000000001");
}

#[test]
fn test_exponent_window() {
    assert_eq!(print(&Value::Flonum(30.0)), "30.0");
    assert_eq!(print(&Value::Flonum(0.9)), "0.9");
    assert_eq!(print(&Value::Flonum(9e-4)), "9.0e-4");
    assert_eq!(print(&Value::Flonum(3e10)), "3.0e10");
}

#[test]
fn test_special_values_format() {
    assert_eq!(print(&Value::Flonum(0.0)), "0.0");
    assert_eq!(print(&Value::Flonum(-0.0)), "0.0");
    assert_eq!(print(&Value::Flonum(f64::INFINITY)), "#i1/0");
    assert_eq!(print(&Value::Flonum(f64::NEG_INFINITY)), "#i-1/0");
    assert_eq!(print(&Value::Flonum(f64::NAN)), "#<nan>");
}

#[test]
fn test_signed_special_tokens_parse() {
    assert_eq!(num("#i+1/0"), Value::Flonum(f64::INFINITY));
    assert_eq!(num("#i-1/0"), Value::Flonum(f64::NEG_INFINITY));
    assert_eq!(num("1/0"), Value::Flonum(f64::INFINITY));
    let nan = num("0/0");
    assert!(matches!(nan, Value::Flonum(d) if d.is_nan()));
}

#[test]
fn test_huge_exponent_literals() {
    // without #e the literal collapses per IEEE
    assert_eq!(num("1e400"), Value::Flonum(f64::INFINITY));
    assert_eq!(num("-1e400"), Value::Flonum(f64::NEG_INFINITY));
    assert_eq!(num("1e-400"), Value::Flonum(0.0));
    // with #e it is an implementation limit
    assert_eq!(parse_number("#e1e400", 10, false).unwrap(), None);
    let err = parse_number("#e1e400", 10, true).unwrap_err();
    assert_eq!(err.tag(), "number/impl-limit");
}

#[test]
fn test_strict_mode_parse_errors() {
    // garbage is a parse failure only in strict mode
    assert_eq!(parse_number("12monkeys", 10, false).unwrap(), None);
    let err = parse_number("#q12", 10, true).unwrap_err();
    assert_eq!(err.tag(), "number/parse");
}

#[test]
fn test_rational_output_is_reduced() {
    assert_eq!(print(&num("6/4")), "3/2");
    assert_eq!(print(&num("-6/4")), "-3/2");
    // denominator 1 never survives
    assert_eq!(print(&num("8/4")), "2");
}

#[test]
fn test_complex_output_forms() {
    assert_eq!(print(&num("1+2i")), "1.0+2.0i");
    assert_eq!(print(&num("1-2i")), "1.0-2.0i");
    assert_eq!(print(&num("+i")), "0.0+1.0i");
    assert_eq!(print(&num("-i")), "0.0-1.0i");
    assert_eq!(print(&num("+2.5i")), "0.0+2.5i");
}

#[test]
fn test_polar_parse() {
    let v = num("2@0");
    assert_eq!(v, Value::Flonum(2.0));
    let v = num("1@3.141592653589793");
    match v {
        Value::Compnum(ref c) => {
            assert!((c.real + 1.0).abs() < 1e-15);
        }
        // sin(pi) rounds to a tiny imaginary part; either shape is fine
        Value::Flonum(d) => assert!((d + 1.0).abs() < 1e-15),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_radix_and_exactness_prefixes_commute() {
    assert_eq!(num("#x#iff"), Value::Flonum(255.0));
    assert_eq!(num("#i#xff"), Value::Flonum(255.0));
    assert_eq!(num("#e#b101"), Value::Fixnum(5));
}

#[test]
fn test_uppercase_hex_output() {
    let v = Value::make_integer(0xdeadbeef);
    assert_eq!(number_to_string(&v, 16, true).unwrap(), "DEADBEEF");
    assert_eq!(number_to_string(&v, 16, false).unwrap(), "deadbeef");
}

#[test]
fn test_bignum_decimal_round_trip() {
    let s = "123456789012345678901234567890123456789";
    assert_eq!(print(&num(s)), s);
}

#[test]
fn test_negative_zero_reads_as_zero() {
    let v = num("-0.0");
    assert!(matches!(v, Value::Flonum(d) if d == 0.0 && d.is_sign_negative()));
}

#[test]
fn test_exact_decimal_composition() {
    assert_eq!(num("#e0.1"), num("1/10"));
    assert_eq!(num("#e2.5e1"), Value::Fixnum(25));
    assert_eq!(num("#e-1.25"), num("-5/4"));
}
