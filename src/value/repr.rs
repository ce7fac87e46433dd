//! Tagged scalar values.
//!
//! Every live value belongs to exactly one variant. Fixnums are inline and
//! never allocated; everything else heap-resident goes through the
//! allocation seam in [`crate::heap`]. Numeric invariants:
//!
//! - a `Bignum` is normalized and never holds a value in the fixnum range
//!   (zero in particular is only ever `Fixnum(0)`),
//! - a `Ratnum` is reduced, has a positive denominator, and the denominator
//!   is never 1,
//! - a `Compnum` has a non-zero imaginary part; a zero imaginary part
//!   collapses to a flonum at construction.

use crate::heap;
use crate::number::bignum::Bignum;
use crate::number::ratio::Ratnum;
use crate::promise::{LazyPair, Promise};
use crate::value::condition::Condition;
use crate::value::continuation::Continuation;
use crate::vm::engine::NativeProc;
use std::rc::Rc;

/// Maximum inline integer (the top tag bits of the word are reserved).
pub const FIX_MAX: i64 = 0x7FFF_FFFF_FFFF;

/// Minimum inline integer.
pub const FIX_MIN: i64 = -0x8000_0000_0000;

/// Symbol ID for interned symbols
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(pub u32);

/// Cons cell
#[derive(Debug, Clone, PartialEq)]
pub struct Pair {
    pub car: Value,
    pub cdr: Value,
}

impl Pair {
    pub fn new(car: Value, cdr: Value) -> Self {
        Pair { car, cdr }
    }
}

/// Complex number with a non-zero imaginary part. Both components are
/// IEEE-754 binary64.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Compnum {
    pub real: f64,
    pub imag: f64,
}

/// Numeric variant discriminant, ordered by the contagion ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum NumKind {
    Fixnum,
    Bignum,
    Ratnum,
    Flonum,
    Compnum,
}

/// Core value type.
#[derive(Clone)]
pub enum Value {
    Undefined,
    Nil,
    Eof,
    Bool(bool),
    Fixnum(i64),
    Bignum(Rc<Bignum>),
    Ratnum(Rc<Ratnum>),
    Flonum(f64),
    Compnum(Rc<Compnum>),
    Symbol(SymbolId),
    Str(Rc<str>),
    Pair(Rc<Pair>),
    Values(Rc<Vec<Value>>),
    Native(Rc<NativeProc>),
    Continuation(Rc<Continuation>),
    Condition(Rc<Condition>),
    Promise(Rc<Promise>),
    LazyPair(Rc<LazyPair>),
}

impl Value {
    // =========================================================================
    // Constructors
    // =========================================================================

    /// Integer constructor: inline when the value fits, bignum otherwise.
    pub fn make_integer(v: i64) -> Value {
        if (FIX_MIN..=FIX_MAX).contains(&v) {
            Value::Fixnum(v)
        } else {
            Value::bignum(Bignum::from_i64(v))
        }
    }

    pub fn make_integer_u64(v: u64) -> Value {
        if v <= FIX_MAX as u64 {
            Value::Fixnum(v as i64)
        } else {
            Value::bignum(Bignum::from_u64(v))
        }
    }

    pub fn make_integer_i128(v: i128) -> Value {
        if v >= FIX_MIN as i128 && v <= FIX_MAX as i128 {
            Value::Fixnum(v as i64)
        } else {
            Value::bignum(Bignum::from_i128(v))
        }
    }

    /// Wrap a bignum without renormalising. Callers outside the number
    /// modules want [`Bignum::into_value`] instead.
    pub(crate) fn bignum(b: Bignum) -> Value {
        Value::Bignum(heap::new_atomic(b))
    }

    pub(crate) fn ratnum(r: Ratnum) -> Value {
        Value::Ratnum(heap::new_pointer(r))
    }

    pub fn flonum(d: f64) -> Value {
        Value::Flonum(d)
    }

    /// Complex constructor; a zero imaginary part yields a flonum.
    pub fn make_complex(real: f64, imag: f64) -> Value {
        if imag == 0.0 {
            Value::Flonum(real)
        } else {
            Value::Compnum(heap::new_atomic(Compnum { real, imag }))
        }
    }

    pub fn make_polar(magnitude: f64, angle: f64) -> Value {
        Value::make_complex(magnitude * angle.cos(), magnitude * angle.sin())
    }

    pub fn string(s: &str) -> Value {
        Value::Str(Rc::from(s))
    }

    pub fn values(vals: Vec<Value>) -> Value {
        Value::Values(heap::new_pointer(vals))
    }

    pub fn condition(c: Condition) -> Value {
        Value::Condition(heap::new_pointer(c))
    }

    // =========================================================================
    // Predicates
    // =========================================================================

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Bool(false))
    }

    pub fn is_number(&self) -> bool {
        self.num_kind().is_some()
    }

    /// Real number: any numeric variant except compnum.
    pub fn is_real(&self) -> bool {
        matches!(
            self.num_kind(),
            Some(NumKind::Fixnum | NumKind::Bignum | NumKind::Ratnum | NumKind::Flonum)
        )
    }

    pub fn is_exact(&self) -> bool {
        matches!(
            self.num_kind(),
            Some(NumKind::Fixnum | NumKind::Bignum | NumKind::Ratnum)
        )
    }

    pub fn is_inexact(&self) -> bool {
        matches!(self.num_kind(), Some(NumKind::Flonum | NumKind::Compnum))
    }

    pub fn is_exact_integer(&self) -> bool {
        matches!(self, Value::Fixnum(_) | Value::Bignum(_))
    }

    /// True for exact integers and for flonums whose value is whole.
    /// A normalized ratnum is never an integer.
    pub fn is_integer(&self) -> bool {
        match self {
            Value::Fixnum(_) | Value::Bignum(_) => true,
            Value::Flonum(d) => d.is_finite() && d.fract() == 0.0,
            _ => false,
        }
    }

    pub fn is_exact_zero(&self) -> bool {
        matches!(self, Value::Fixnum(0))
    }

    pub fn is_exact_one(&self) -> bool {
        matches!(self, Value::Fixnum(1))
    }

    pub fn num_kind(&self) -> Option<NumKind> {
        match self {
            Value::Fixnum(_) => Some(NumKind::Fixnum),
            Value::Bignum(_) => Some(NumKind::Bignum),
            Value::Ratnum(_) => Some(NumKind::Ratnum),
            Value::Flonum(_) => Some(NumKind::Flonum),
            Value::Compnum(_) => Some(NumKind::Compnum),
            _ => None,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn as_fixnum(&self) -> Option<i64> {
        match self {
            Value::Fixnum(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_flonum(&self) -> Option<f64> {
        match self {
            Value::Flonum(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_bignum(&self) -> Option<&Rc<Bignum>> {
        match self {
            Value::Bignum(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_ratnum(&self) -> Option<&Rc<Ratnum>> {
        match self {
            Value::Ratnum(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_compnum(&self) -> Option<&Rc<Compnum>> {
        match self {
            Value::Compnum(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_symbol(&self) -> Option<SymbolId> {
        match self {
            Value::Symbol(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_pair(&self) -> Option<&Rc<Pair>> {
        match self {
            Value::Pair(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_condition(&self) -> Option<&Rc<Condition>> {
        match self {
            Value::Condition(c) => Some(c),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Nil => "null",
            Value::Eof => "eof-object",
            Value::Bool(_) => "boolean",
            Value::Fixnum(_) => "fixnum",
            Value::Bignum(_) => "bignum",
            Value::Ratnum(_) => "ratnum",
            Value::Flonum(_) => "flonum",
            Value::Compnum(_) => "compnum",
            Value::Symbol(_) => "symbol",
            Value::Str(_) => "string",
            Value::Pair(_) => "pair",
            Value::Values(_) => "values",
            Value::Native(_) => "procedure",
            Value::Continuation(_) => "continuation",
            Value::Condition(_) => "condition",
            Value::Promise(_) => "promise",
            Value::LazyPair(_) => "pair",
        }
    }

    /// Check if value is a proper list (lazy tails are not walked).
    pub fn is_list(&self) -> bool {
        let mut current = self;
        loop {
            match current {
                Value::Nil => return true,
                Value::Pair(p) => current = &p.cdr,
                _ => return false,
            }
        }
    }

    /// Convert a proper list to a Vec.
    pub fn list_to_vec(&self) -> Option<Vec<Value>> {
        let mut result = Vec::new();
        let mut current = self.clone();
        loop {
            match current {
                Value::Nil => return Some(result),
                Value::Pair(p) => {
                    result.push(p.car.clone());
                    current = p.cdr.clone();
                }
                _ => return None,
            }
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Nil, Value::Nil) => true,
            (Value::Eof, Value::Eof) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Fixnum(a), Value::Fixnum(b)) => a == b,
            (Value::Bignum(a), Value::Bignum(b)) => a == b,
            (Value::Ratnum(a), Value::Ratnum(b)) => a == b,
            (Value::Flonum(a), Value::Flonum(b)) => a == b,
            (Value::Compnum(a), Value::Compnum(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Pair(a), Value::Pair(b)) => a == b,
            (Value::Values(a), Value::Values(b)) => a == b,
            (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(a, b),
            (Value::Continuation(a), Value::Continuation(b)) => Rc::ptr_eq(a, b),
            (Value::Condition(a), Value::Condition(b)) => a == b,
            (Value::Promise(a), Value::Promise(b)) => Rc::ptr_eq(a, b),
            (Value::LazyPair(a), Value::LazyPair(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Helper to create a cons cell
pub fn cons(car: Value, cdr: Value) -> Value {
    Value::Pair(heap::new_pointer(Pair::new(car, cdr)))
}

/// Helper to construct a proper list
pub fn list(values: Vec<Value>) -> Value {
    values.into_iter().rev().fold(Value::Nil, |acc, v| cons(v, acc))
}
