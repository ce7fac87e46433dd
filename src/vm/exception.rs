//! raise, with-exception-handler and guard.
//!
//! The handler stack lives in the VM context and is part of every
//! continuation capture. `raise` pops the topmost handler and invokes it
//! with the stack already reduced, so a re-raise from inside a handler
//! reaches the next outer one; with no handlers left the raised value
//! surfaces at the `apply` boundary. A handler that returns normally
//! re-raises the original, so `raise` never returns to its caller.
//!
//! `guard` captures its own continuation, installs a clause handler and
//! either escapes to that continuation with the clause's value (running
//! any pending `after` thunks on the way) or re-raises unchanged.

use crate::value::condition::Condition;
use crate::value::Value;
use crate::vm::engine::{apply, Arity, Flow};
use crate::vm::Vm;
use std::rc::Rc;

/// Raise a value through the current handler stack.
pub fn raise(vm: &mut Vm, v: &Value) -> Result<Value, Value> {
    let raiser = Value::native("raise", Arity::Exact(1), |_vm, args| {
        Ok(Flow::Raise(args[0].clone()))
    });
    apply(vm, &raiser, std::slice::from_ref(v))
}

/// Raise a condition value.
pub fn raise_condition(vm: &mut Vm, c: Condition) -> Result<Value, Value> {
    raise(vm, &Value::condition(c))
}

/// Procedure form of `with-exception-handler`, for composing into flows.
pub fn with_exception_handler_proc(handler: Value, thunk: Value) -> Value {
    Value::native("with-exception-handler", Arity::Exact(0), move |vm, _args| {
        vm.handlers.push(handler.clone());
        Ok(Flow::Push {
            proc: thunk.clone(),
            args: vec![],
            then: Rc::new(|vm, v| {
                vm.handlers.pop();
                Ok(Flow::Return(v))
            }),
        })
    })
}

/// Install `handler` for the dynamic extent of `thunk`.
pub fn with_exception_handler(
    vm: &mut Vm,
    handler: Value,
    thunk: Value,
) -> Result<Value, Value> {
    let entry = with_exception_handler_proc(handler, thunk);
    apply(vm, &entry, &[])
}

/// The clause half of a `guard` form: given the raised value, return the
/// flow of the matching clause body, or `None` when no clause matches.
pub type GuardClauses = Rc<dyn Fn(&mut Vm, &Value) -> Result<Option<Flow>, Condition>>;

fn flow_thunk(flow: Flow) -> Value {
    Value::native("guard-clause", Arity::Exact(0), move |_vm, _args| Ok(flow.clone()))
}

/// The `guard` procedure: run `thunk` with a handler that dispatches on
/// `clauses`; a match transfers control to guard's continuation with the
/// clause's value, no match re-raises the condition outward unchanged.
pub fn guard_proc(clauses: GuardClauses, thunk: Value) -> Value {
    Value::native_k("guard", Arity::Exact(0), move |vm, _args, kont| {
        let outer = crate::heap::new_pointer(
            crate::value::continuation::Continuation::capture(kont, &vm.wind, &vm.handlers),
        );
        let clauses = clauses.clone();
        let handler = Value::native("guard-handler", Arity::Exact(1), move |vm, args| {
            let raised = &args[0];
            match clauses(vm, raised)? {
                None => Ok(Flow::Raise(raised.clone())),
                Some(clause_flow) => {
                    let k = Value::Continuation(outer.clone());
                    Ok(Flow::Push {
                        proc: flow_thunk(clause_flow),
                        args: vec![],
                        then: Rc::new(move |_vm, v| {
                            Ok(Flow::Tail {
                                proc: k.clone(),
                                args: vec![v],
                            })
                        }),
                    })
                }
            }
        });
        vm.handlers.push(handler);
        Ok(Flow::Push {
            proc: thunk.clone(),
            args: vec![],
            then: Rc::new(|vm, v| {
                vm.handlers.pop();
                Ok(Flow::Return(v))
            }),
        })
    })
}

/// `guard (var clauses...) thunk`, with the clauses expressed as a Rust
/// dispatch function.
pub fn guard(vm: &mut Vm, clauses: GuardClauses, thunk: Value) -> Result<Value, Value> {
    let proc = guard_proc(clauses, thunk);
    apply(vm, &proc, &[])
}
