// Continuations, dynamic-wind and their interaction with guard.

use onyx::value::Value;
use onyx::vm::cont::call_cc_proc;
use onyx::vm::engine::{apply, Arity, Flow};
use onyx::vm::exception::{guard, GuardClauses};
use onyx::vm::wind::dynamic_wind;
use onyx::Vm;
use std::cell::RefCell;
use std::rc::Rc;

type Trace = Rc<RefCell<Vec<String>>>;

fn add(trace: &Trace, name: &'static str) -> Value {
    let trace = trace.clone();
    Value::thunk("add", move |_vm| {
        trace.borrow_mut().push(name.to_string());
        Ok(Flow::Return(Value::Undefined))
    })
}

/// The R5RS dynamic-wind example: capture inside the body, re-enter once
/// from outside. The observable trace must be
/// (connect talk1 disconnect connect talk2 disconnect).
#[test]
fn test_r5rs_dynamic_wind_trace() {
    let mut vm = Vm::new();
    let trace: Trace = Rc::new(RefCell::new(Vec::new()));
    let stash: Rc<RefCell<Option<Value>>> = Rc::new(RefCell::new(None));

    let receiver = {
        let stash = stash.clone();
        Value::native("receiver", Arity::Exact(1), move |_vm, args| {
            *stash.borrow_mut() = Some(args[0].clone());
            Ok(Flow::Return(Value::string("talk1")))
        })
    };
    let body = {
        let trace = trace.clone();
        Value::native("body", Arity::Exact(0), move |_vm, _| {
            let trace = trace.clone();
            Ok(Flow::Push {
                proc: call_cc_proc(),
                args: vec![receiver.clone()],
                then: Rc::new(move |_vm, v| {
                    let s = v.as_str().expect("body receives a string").to_string();
                    trace.borrow_mut().push(s);
                    Ok(Flow::Return(Value::Undefined))
                }),
            })
        })
    };

    dynamic_wind(
        &mut vm,
        add(&trace, "connect"),
        body,
        add(&trace, "disconnect"),
    )
    .unwrap();
    assert_eq!(*trace.borrow(), vec!["connect", "talk1", "disconnect"]);

    // re-enter the captured continuation from outside the extent
    let k = stash.borrow().clone().unwrap();
    apply(&mut vm, &k, &[Value::string("talk2")]).unwrap();
    assert_eq!(
        *trace.borrow(),
        vec!["connect", "talk1", "disconnect", "connect", "talk2", "disconnect"]
    );
    // the wind state is back at the root afterwards
    assert_eq!(vm.current_wind().depth(), 0);
}

/// Property 7: two invocations of one continuation are observationally
/// identical, including their wind traversal.
#[test]
fn test_reinvocation_is_identical() {
    let mut vm = Vm::new();
    let trace: Trace = Rc::new(RefCell::new(Vec::new()));
    let stash: Rc<RefCell<Option<Value>>> = Rc::new(RefCell::new(None));

    let receiver = {
        let stash = stash.clone();
        Value::native("receiver", Arity::Exact(1), move |_vm, args| {
            *stash.borrow_mut() = Some(args[0].clone());
            Ok(Flow::Return(Value::Fixnum(0)))
        })
    };
    let body = Value::native("body", Arity::Exact(0), move |_vm, _| {
        Ok(Flow::Tail {
            proc: call_cc_proc(),
            args: vec![receiver.clone()],
        })
    });
    dynamic_wind(&mut vm, add(&trace, "in"), body, add(&trace, "out")).unwrap();
    let k = stash.borrow().clone().unwrap();

    trace.borrow_mut().clear();
    let r1 = apply(&mut vm, &k, &[Value::Fixnum(1)]).unwrap();
    let t1 = trace.borrow().clone();
    trace.borrow_mut().clear();
    let r2 = apply(&mut vm, &k, &[Value::Fixnum(1)]).unwrap();
    let t2 = trace.borrow().clone();

    assert_eq!(r1, r2);
    assert_eq!(t1, t2);
    assert_eq!(t1, vec!["in", "out"]);
}

/// Escaping from inside nested extents runs every after bottom-up, then
/// re-entering runs every before top-down.
#[test]
fn test_nested_wind_lca_order() {
    let mut vm = Vm::new();
    let trace: Trace = Rc::new(RefCell::new(Vec::new()));
    let stash: Rc<RefCell<Option<Value>>> = Rc::new(RefCell::new(None));

    let receiver = {
        let stash = stash.clone();
        Value::native("receiver", Arity::Exact(1), move |_vm, args| {
            *stash.borrow_mut() = Some(args[0].clone());
            Ok(Flow::Return(Value::Undefined))
        })
    };
    let inner_body = Value::native("inner-body", Arity::Exact(0), move |_vm, _| {
        Ok(Flow::Tail {
            proc: call_cc_proc(),
            args: vec![receiver.clone()],
        })
    });
    let inner = {
        let b1 = add(&trace, "b1");
        let a1 = add(&trace, "a1");
        Value::native("inner", Arity::Exact(0), move |_vm, _| {
            Ok(onyx::vm::wind::wind_flow(
                b1.clone(),
                inner_body.clone(),
                a1.clone(),
            ))
        })
    };
    dynamic_wind(&mut vm, add(&trace, "b0"), inner, add(&trace, "a0")).unwrap();
    assert_eq!(*trace.borrow(), vec!["b0", "b1", "a1", "a0"]);

    trace.borrow_mut().clear();
    let k = stash.borrow().clone().unwrap();
    apply(&mut vm, &k, &[]).unwrap();
    // enter b0 then b1, unwind a1 then a0
    assert_eq!(*trace.borrow(), vec!["b0", "b1", "a1", "a0"]);
}

#[test]
fn test_guard_symbol_dispatch() {
    // (guard (x ((symbol? x) (cons 'symbol x))) (raise 'a)) => (symbol . a)
    let mut vm = Vm::new();
    let clauses: GuardClauses = Rc::new(|_vm, raised| {
        if matches!(raised, Value::Symbol(_)) {
            Ok(Some(Flow::Return(onyx::value::cons(
                Value::string("symbol"),
                raised.clone(),
            ))))
        } else {
            Ok(None)
        }
    });
    let sym = vm.intern("a");
    let sym2 = sym.clone();
    let thunk = Value::native("raiser", Arity::Exact(0), move |_vm, _| {
        Ok(Flow::Raise(sym2.clone()))
    });
    let r = guard(&mut vm, clauses.clone(), thunk).unwrap();
    let p = r.as_pair().unwrap();
    assert_eq!(p.car, Value::string("symbol"));
    // the caught symbol is eq to the interned 'a
    assert_eq!(p.cdr, sym);
    assert_eq!(vm.lookup_symbol("a"), Some(sym));

    // (guard (x ((symbol? x) ...)) (raise 4)) re-raises 4 unchanged
    let thunk = Value::native("raiser", Arity::Exact(0), |_vm, _| {
        Ok(Flow::Raise(Value::Fixnum(4)))
    });
    let r = guard(&mut vm, clauses, thunk);
    assert_eq!(r, Err(Value::Fixnum(4)));
}

/// A raise escaping a guard through its continuation still runs pending
/// afters: the guard body sits inside a dynamic extent.
#[test]
fn test_guard_escape_runs_afters() {
    let mut vm = Vm::new();
    let trace: Trace = Rc::new(RefCell::new(Vec::new()));
    let clauses: GuardClauses = Rc::new(|_vm, _raised| {
        Ok(Some(Flow::Return(Value::string("handled"))))
    });
    let raiser = Value::native("raiser", Arity::Exact(0), |_vm, _| {
        Ok(Flow::Raise(Value::Fixnum(1)))
    });
    let wound = {
        let before = add(&trace, "before");
        let after = add(&trace, "after");
        Value::native("wound", Arity::Exact(0), move |_vm, _| {
            Ok(onyx::vm::wind::wind_flow(
                before.clone(),
                raiser.clone(),
                after.clone(),
            ))
        })
    };
    let r = guard(&mut vm, clauses, wound).unwrap();
    assert_eq!(r, Value::string("handled"));
    assert_eq!(*trace.borrow(), vec!["before", "after"]);
    assert_eq!(vm.current_wind().depth(), 0);
    assert_eq!(vm.handler_depth(), 0);
}

#[test]
fn test_escape_resumes_at_capture_point() {
    let mut vm = Vm::new();
    // the receiver escapes through k, so control returns to the capture
    // point exactly once, carrying the escape value
    let hits: Rc<RefCell<u32>> = Rc::new(RefCell::new(0));
    let hits2 = hits.clone();
    let receiver = Value::native("receiver", Arity::Exact(1), |_vm, args| {
        Ok(Flow::Tail {
            proc: args[0].clone(),
            args: vec![Value::Fixnum(99)],
        })
    });
    let body = Value::native("body", Arity::Exact(0), move |_vm, _| {
        let hits = hits2.clone();
        Ok(Flow::Push {
            proc: call_cc_proc(),
            args: vec![receiver.clone()],
            then: Rc::new(move |_vm, v| {
                *hits.borrow_mut() += 1;
                Ok(Flow::Return(v))
            }),
        })
    });
    let r = apply(&mut vm, &body, &[]).unwrap();
    assert_eq!(r, Value::Fixnum(99));
    // the then-frame ran exactly once, receiving the escape value
    assert_eq!(*hits.borrow(), 1);
}
