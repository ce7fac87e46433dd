// Promises and lazy sequences, srfi-45 semantics.

use onyx::promise::{self, generator_to_lseq, lazy_pair, Promise};
use onyx::value::Value;
use onyx::vm::engine::{Arity, Flow};
use onyx::{force, make_promise, Vm};
use std::cell::Cell;
use std::rc::Rc;

#[test]
fn test_delay_force_memoizes() {
    let mut vm = Vm::new();
    let hits = Rc::new(Cell::new(0));
    let h = hits.clone();
    let p = Promise::lazy(Value::native("thunk", Arity::Exact(0), move |_vm, _| {
        h.set(h.get() + 1);
        Ok(Flow::Return(Value::Fixnum(7)))
    }));
    assert_eq!(force(&mut vm, &p).unwrap(), Value::Fixnum(7));
    assert_eq!(force(&mut vm, &p).unwrap(), Value::Fixnum(7));
    assert_eq!(hits.get(), 1);
}

#[test]
fn test_force_is_iterative_on_long_chains() {
    // a hundred thousand nested delays force without growing the stack
    let mut vm = Vm::new();
    let mut p = Promise::eager(Value::Fixnum(1));
    for _ in 0..100_000 {
        let inner = p.clone();
        p = Promise::lazy(Value::native("wrap", Arity::Exact(0), move |_vm, _| {
            Ok(Flow::Return(inner.clone()))
        }));
    }
    assert_eq!(force(&mut vm, &p).unwrap(), Value::Fixnum(1));
}

#[test]
fn test_forcing_thunk_returning_promise_splices() {
    let mut vm = Vm::new();
    let inner = Promise::lazy(Value::native("inner", Arity::Exact(0), |_vm, _| {
        Ok(Flow::Return(Value::Fixnum(3)))
    }));
    let inner2 = inner.clone();
    let outer = Promise::lazy(Value::native("outer", Arity::Exact(0), move |_vm, _| {
        Ok(Flow::Return(inner2.clone()))
    }));
    assert_eq!(force(&mut vm, &outer).unwrap(), Value::Fixnum(3));
    // the inner promise was forced through the splice as well
    assert_eq!(force(&mut vm, &inner).unwrap(), Value::Fixnum(3));
}

#[test]
fn test_make_promise_wraps_and_passes_through() {
    let mut vm = Vm::new();
    let p = make_promise(Value::Fixnum(5));
    assert!(matches!(p, Value::Promise(_)));
    assert_eq!(force(&mut vm, &p).unwrap(), Value::Fixnum(5));
    assert_eq!(make_promise(p.clone()), p);
}

#[test]
fn test_lseq_generation_is_lazy() {
    let mut vm = Vm::new();
    let produced = Rc::new(Cell::new(0));
    let p = produced.clone();
    let gen = Value::native("gen", Arity::Exact(0), move |_vm, _| {
        let n = p.get();
        p.set(n + 1);
        if n < 5 {
            Ok(Flow::Return(Value::Fixnum(n)))
        } else {
            Ok(Flow::Return(Value::Eof))
        }
    });
    let mut seq = generator_to_lseq(&mut vm, &gen).unwrap();
    assert_eq!(produced.get(), 1);

    let mut collected = Vec::new();
    while promise::is_pair(&mut vm, &seq).unwrap() {
        collected.push(promise::pair_car(&mut vm, &seq).unwrap());
        seq = promise::pair_cdr(&mut vm, &seq).unwrap();
    }
    assert_eq!(
        collected,
        (0..5).map(Value::Fixnum).collect::<Vec<_>>()
    );
    assert_eq!(seq, Value::Nil);
    // one call per element plus the terminating EOF
    assert_eq!(produced.get(), 6);
}

#[test]
fn test_empty_generator_yields_nil() {
    let mut vm = Vm::new();
    let gen = Value::native("gen", Arity::Exact(0), |_vm, _| Ok(Flow::Return(Value::Eof)));
    assert_eq!(generator_to_lseq(&mut vm, &gen).unwrap(), Value::Nil);
}

#[test]
fn test_lazy_pair_single_inspection_installs_pair() {
    let mut vm = Vm::new();
    let calls = Rc::new(Cell::new(0));
    let c = calls.clone();
    let gen = Value::native("gen", Arity::Exact(0), move |_vm, _| {
        c.set(c.get() + 1);
        Ok(Flow::Return(Value::Eof))
    });
    let lp = lazy_pair(Value::string("head"), gen);
    // car, cdr and pair? all hit the same memoized pair
    assert_eq!(promise::pair_car(&mut vm, &lp).unwrap(), Value::string("head"));
    assert_eq!(promise::pair_cdr(&mut vm, &lp).unwrap(), Value::Nil);
    assert!(promise::is_pair(&mut vm, &lp).unwrap());
    assert_eq!(calls.get(), 1);
}

#[test]
fn test_generator_error_propagates() {
    // inspecting a lazy pair runs the generator; a raise from it reaches
    // the caller unchanged
    let mut vm = Vm::new();
    let gen = Value::native("gen", Arity::Exact(0), |_vm, _| {
        Ok(Flow::Raise(Value::string("generator failed")))
    });
    let lp = lazy_pair(Value::Fixnum(1), gen);
    let r = promise::pair_cdr(&mut vm, &lp);
    assert_eq!(r, Err(Value::string("generator failed")));
}
