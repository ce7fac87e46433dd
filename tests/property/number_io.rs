// Property tests for number I/O.
//
// The printer must emit the shortest decimal that reads back to the same
// double, for every double.

use crate::common::{num, print};
use onyx::value::Value;
use proptest::prelude::*;

fn parse_f64(s: &str) -> Option<f64> {
    match onyx::parse_number(s, 10, false).unwrap() {
        Some(Value::Flonum(d)) => Some(d),
        _ => None,
    }
}

/// Split a printed flonum into (prefix, digits, suffix) where `digits` is
/// the significant-digit run (decimal point elided).
fn significant_digits(s: &str) -> (String, String, String) {
    let (mantissa, exponent) = match s.find('e') {
        Some(i) => (&s[..i], &s[i..]),
        None => (s, ""),
    };
    let (sign, body) = match mantissa.strip_prefix('-') {
        Some(rest) => ("-".to_string(), rest),
        None => (String::new(), mantissa),
    };
    (sign, body.replace('.', ""), exponent.to_string())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    // =========================================================================
    // parse(print(v)) == v, bit-identical, for every finite double
    // =========================================================================

    #[test]
    fn print_parse_round_trip(bits in any::<u64>()) {
        let v = f64::from_bits(bits);
        prop_assume!(v.is_finite());
        let s = print(&Value::Flonum(v));
        let back = parse_f64(&s).expect("printed flonum re-parses");
        prop_assert_eq!(back.to_bits(), v.to_bits(), "{} -> {} -> {}", v, s, back);
    }

    // =========================================================================
    // No shorter digit string parses back to the same double
    // =========================================================================

    #[test]
    fn printed_form_is_shortest(bits in any::<u64>()) {
        let v = f64::from_bits(bits);
        prop_assume!(v.is_finite() && v != 0.0);
        let s = print(&Value::Flonum(v));
        let (sign, digits, _exponent) = significant_digits(&s);
        prop_assume!(digits.trim_matches('0').len() > 1);
        // dropping the last significant digit, rounded either way, must
        // change the value that reads back
        let trimmed = &digits[..digits.len() - 1];
        for candidate in [trimmed.to_string(), increment_digits(trimmed)] {
            let rebuilt = format!("{}0.{}e{}", sign, candidate, rebuilt_exponent(&s));
            if let Some(back) = parse_f64(&rebuilt) {
                prop_assert_ne!(back.to_bits(), v.to_bits(),
                    "shorter form {} also reads to {}", rebuilt, v);
            }
        }
    }

    // =========================================================================
    // Integers and rationals survive print/parse in every radix
    // =========================================================================

    #[test]
    fn integer_radix_round_trip(n in any::<i64>(), radix in 2u32..=36) {
        let v = Value::make_integer(n);
        let s = onyx::number_to_string(&v, radix, false).unwrap();
        let back = onyx::parse_number(&s, radix, false).unwrap().unwrap();
        prop_assert_eq!(back, v);
    }

    #[test]
    fn rational_round_trip(n in -100000i64..100000, d in 1i64..100000) {
        let v = num(&format!("{}/{}", n, d));
        let back = num(&print(&v));
        prop_assert_eq!(back, v);
    }
}

/// The digit string plus one in the last place, as decimal digits.
fn increment_digits(digits: &str) -> String {
    let mut bytes: Vec<u8> = digits.bytes().collect();
    for i in (0..bytes.len()).rev() {
        if bytes[i] < b'9' {
            bytes[i] += 1;
            for b in &mut bytes[i + 1..] {
                *b = b'0';
            }
            return String::from_utf8(bytes).expect("ASCII digits");
        }
    }
    let mut s = String::from("1");
    s.push_str(&"0".repeat(digits.len()));
    s
}

/// Decimal exponent such that `0.DIGITS * 10^e` equals the printed value.
fn rebuilt_exponent(printed: &str) -> i32 {
    let (mantissa, exp) = match printed.find('e') {
        Some(i) => (&printed[..i], printed[i + 1..].parse::<i32>().unwrap()),
        None => (printed, 0),
    };
    let body = mantissa.trim_start_matches('-');
    let int_len = body.find('.').unwrap_or(body.len()) as i32;
    int_len + exp
}
