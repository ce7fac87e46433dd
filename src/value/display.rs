//! Display and Debug for values.
//!
//! Numbers go through the number printer so written output round-trips;
//! opaque objects print as `#<...>` forms. Lazy pairs display without
//! forcing.

use crate::number::print::number_to_string;
use crate::value::Value;
use std::fmt;

fn write_number(f: &mut fmt::Formatter<'_>, v: &Value) -> fmt::Result {
    match number_to_string(v, 10, false) {
        Ok(s) => write!(f, "{}", s),
        Err(_) => write!(f, "#<number>"),
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, v: &Value, quoted: bool) -> fmt::Result {
    write!(f, "(")?;
    let mut current = v.clone();
    let mut first = true;
    loop {
        match current {
            Value::Pair(ref p) => {
                if !first {
                    write!(f, " ")?;
                }
                first = false;
                write_value(f, &p.car, quoted)?;
                let rest = p.cdr.clone();
                match rest {
                    Value::Nil => break,
                    Value::Pair(_) => current = rest,
                    other => {
                        write!(f, " . ")?;
                        write_value(f, &other, quoted)?;
                        break;
                    }
                }
            }
            _ => break,
        }
    }
    write!(f, ")")
}

fn write_value(f: &mut fmt::Formatter<'_>, v: &Value, quoted: bool) -> fmt::Result {
    match v {
        Value::Undefined => write!(f, "#<undef>"),
        Value::Nil => write!(f, "()"),
        Value::Eof => write!(f, "#<eof>"),
        Value::Bool(true) => write!(f, "#t"),
        Value::Bool(false) => write!(f, "#f"),
        Value::Fixnum(_)
        | Value::Bignum(_)
        | Value::Ratnum(_)
        | Value::Flonum(_)
        | Value::Compnum(_) => write_number(f, v),
        Value::Symbol(id) => write!(f, "#<symbol {}>", id.0),
        Value::Str(s) => {
            if quoted {
                write!(f, "{:?}", s)
            } else {
                write!(f, "{}", s)
            }
        }
        Value::Pair(_) => write_list(f, v, quoted),
        Value::Values(vs) => {
            write!(f, "#<values")?;
            for v in vs.iter() {
                write!(f, " ")?;
                write_value(f, v, quoted)?;
            }
            write!(f, ">")
        }
        Value::Native(p) => write!(f, "#<procedure {}>", p.name),
        Value::Continuation(_) => write!(f, "#<continuation>"),
        Value::Condition(c) => write!(f, "#<condition {}>", c),
        Value::Promise(p) => {
            if p.is_forced() {
                write!(f, "#<promise (forced)>")
            } else {
                write!(f, "#<promise>")
            }
        }
        Value::LazyPair(_) => write!(f, "#<lazy-pair>"),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_value(f, self, false)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_value(f, self, true)
    }
}
