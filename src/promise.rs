//! Promises and lazy pairs.
//!
//! Promises follow srfi-45: `force` walks lazy links iteratively and
//! splices intermediate promises together, so arbitrarily deep chains of
//! `(delay (delay ...))` force in constant stack. A promise cell is
//! updated monotonically: once eager it never reverts.
//!
//! A lazy pair is a car plus a generator thunk; the first inspection calls
//! the generator once and installs an ordinary pair in place, whose cdr is
//! the next lazy pair, or the empty list when the generator signals the
//! end of the sequence with the EOF sentinel.

use crate::heap;
use crate::value::condition::Condition;
use crate::value::{cons, Value};
use crate::vm::engine::apply;
use crate::vm::Vm;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone)]
pub(crate) enum PromiseState {
    /// Forced: holds the payload
    Eager(Value),
    /// Pending: holds the thunk producing the next promise (or payload)
    Lazy(Value),
    /// Spliced into another promise during forcing
    Link(Rc<Promise>),
}

/// Mutable promise cell.
#[derive(Debug)]
pub struct Promise {
    pub(crate) state: RefCell<PromiseState>,
}

impl Promise {
    /// An already-forced promise.
    pub fn eager(payload: Value) -> Value {
        Value::Promise(heap::new_pointer(Promise {
            state: RefCell::new(PromiseState::Eager(payload)),
        }))
    }

    /// `delay`: a promise that calls `thunk` when forced. Per srfi-45 the
    /// thunk's result is itself treated as a promise to splice.
    pub fn lazy(thunk: Value) -> Value {
        Value::Promise(heap::new_pointer(Promise {
            state: RefCell::new(PromiseState::Lazy(thunk)),
        }))
    }

    pub fn is_forced(&self) -> bool {
        matches!(&*self.state.borrow(), PromiseState::Eager(_))
    }
}

/// `make-promise`: wrap a value unless it already is a promise.
pub fn make_promise(v: Value) -> Value {
    match v {
        Value::Promise(_) => v,
        other => Promise::eager(other),
    }
}

/// Force a promise chain to a value. Non-promises force to themselves.
pub fn force(vm: &mut Vm, v: &Value) -> Result<Value, Value> {
    let mut p = match v {
        Value::Promise(p) => p.clone(),
        other => return Ok(other.clone()),
    };
    loop {
        let state = p.state.borrow().clone();
        match state {
            PromiseState::Eager(payload) => return Ok(payload),
            PromiseState::Link(next) => p = next,
            PromiseState::Lazy(thunk) => {
                let produced = apply(vm, &thunk, &[])?;
                // the thunk may have forced p reentrantly; the first
                // result wins and the cell never reverts
                if let PromiseState::Eager(payload) = &*p.state.borrow() {
                    return Ok(payload.clone());
                }
                match produced {
                    Value::Promise(q) => {
                        if Rc::ptr_eq(&p, &q) {
                            continue;
                        }
                        let qstate = q.state.borrow().clone();
                        match qstate {
                            PromiseState::Eager(payload) => {
                                *p.state.borrow_mut() = PromiseState::Eager(payload.clone());
                                return Ok(payload);
                            }
                            PromiseState::Lazy(next_thunk) => {
                                // splice: p takes over q's work, q points at p
                                *p.state.borrow_mut() = PromiseState::Lazy(next_thunk);
                                *q.state.borrow_mut() = PromiseState::Link(p.clone());
                            }
                            PromiseState::Link(next) => {
                                *p.state.borrow_mut() = PromiseState::Link(next.clone());
                                p = next;
                            }
                        }
                    }
                    payload => {
                        *p.state.borrow_mut() = PromiseState::Eager(payload.clone());
                        return Ok(payload);
                    }
                }
            }
        }
    }
}

// =============================================================================
// Lazy pairs
// =============================================================================

#[derive(Debug, Clone)]
enum LazyState {
    Pending { car: Value, generator: Value },
    Forced(Value),
}

/// A pair whose cdr is produced on demand by a generator thunk.
#[derive(Debug)]
pub struct LazyPair {
    cell: RefCell<LazyState>,
}

/// Build a lazy pair from a known head and a generator for the rest.
pub fn lazy_pair(car: Value, generator: Value) -> Value {
    Value::LazyPair(heap::new_pointer(LazyPair {
        cell: RefCell::new(LazyState::Pending { car, generator }),
    }))
}

/// Wrap a generator as a lazy sequence. The generator yields one element
/// per call and the EOF sentinel at the end.
pub fn generator_to_lseq(vm: &mut Vm, generator: &Value) -> Result<Value, Value> {
    let first = apply(vm, generator, &[])?;
    if first == Value::Eof {
        Ok(Value::Nil)
    } else {
        Ok(lazy_pair(first, generator.clone()))
    }
}

/// Force one element: install an ordinary pair in place and return its
/// (car, cdr).
fn force_lazy(vm: &mut Vm, lp: &Rc<LazyPair>) -> Result<(Value, Value), Value> {
    let state = lp.cell.borrow().clone();
    match state {
        LazyState::Forced(pair) => match &pair {
            Value::Pair(p) => Ok((p.car.clone(), p.cdr.clone())),
            _ => unreachable!("lazy pairs force to pairs"),
        },
        LazyState::Pending { car, generator } => {
            let next = apply(vm, &generator, &[])?;
            if let LazyState::Forced(pair) = &*lp.cell.borrow() {
                // forced reentrantly while the generator ran
                if let Value::Pair(p) = pair {
                    return Ok((p.car.clone(), p.cdr.clone()));
                }
            }
            let cdr = if next == Value::Eof {
                Value::Nil
            } else {
                lazy_pair(next, generator)
            };
            let pair = cons(car.clone(), cdr.clone());
            *lp.cell.borrow_mut() = LazyState::Forced(pair);
            Ok((car, cdr))
        }
    }
}

/// `car` over ordinary and lazy pairs.
pub fn pair_car(vm: &mut Vm, v: &Value) -> Result<Value, Value> {
    match v {
        Value::Pair(p) => Ok(p.car.clone()),
        Value::LazyPair(lp) => Ok(force_lazy(vm, lp)?.0),
        _ => Err(Value::condition(
            Condition::domain(format!("pair required, but got {}", v.type_name()))
                .with_irritant(v.clone()),
        )),
    }
}

/// `cdr` over ordinary and lazy pairs.
pub fn pair_cdr(vm: &mut Vm, v: &Value) -> Result<Value, Value> {
    match v {
        Value::Pair(p) => Ok(p.cdr.clone()),
        Value::LazyPair(lp) => Ok(force_lazy(vm, lp)?.1),
        _ => Err(Value::condition(
            Condition::domain(format!("pair required, but got {}", v.type_name()))
                .with_irritant(v.clone()),
        )),
    }
}

/// Pair predicate; inspecting a lazy pair forces its first element.
pub fn is_pair(vm: &mut Vm, v: &Value) -> Result<bool, Value> {
    match v {
        Value::Pair(_) => Ok(true),
        Value::LazyPair(lp) => {
            force_lazy(vm, lp)?;
            Ok(true)
        }
        _ => Ok(false),
    }
}
