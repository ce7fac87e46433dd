//! First-class continuations.
//!
//! Capture is a pointer copy of the engine's frame chain plus the current
//! wind node and handler stack. Invoking a captured continuation from a
//! different extent first travels the wind tree (`after` thunks bottom-up
//! to the least common ancestor, then `before` thunks top-down to the
//! capture node, each with its parent current) and only then resumes the
//! chain.
//! The node tree is persistent, so one continuation can be re-entered any
//! number of times and behaves identically each time.

use crate::heap;
use crate::value::continuation::Continuation;
use crate::value::Value;
use crate::vm::engine::{apply, Arity, Flow};
use crate::vm::wind::{path, WindAction};
use crate::vm::Vm;
use std::rc::Rc;

/// The `call-with-current-continuation` procedure value.
pub fn call_cc_proc() -> Value {
    Value::native_k("call/cc", Arity::Exact(1), |vm, args, kont| {
        let captured = Continuation::capture(kont, &vm.wind, &vm.handlers);
        let k = Value::Continuation(heap::new_pointer(captured));
        Ok(Flow::Tail {
            proc: args[0].clone(),
            args: vec![k],
        })
    })
}

/// `call/cc(proc)`: hand `proc` the continuation of this call.
pub fn call_cc(vm: &mut Vm, proc: &Value) -> Result<Value, Value> {
    apply(vm, &call_cc_proc(), std::slice::from_ref(proc))
}

/// Invocation of a captured continuation: travel the wind tree, then
/// resume the saved frame chain with the supplied values.
pub(crate) fn invoke_continuation(
    vm: &mut Vm,
    cont: Rc<Continuation>,
    args: Vec<Value>,
) -> Flow {
    let value = match args.len() {
        0 => Value::Undefined,
        1 => args.into_iter().next().expect("length checked"),
        _ => Value::values(args),
    };
    let actions = Rc::new(path(&vm.wind, &cont.wind));
    rewind(vm, actions, 0, cont, value)
}

fn rewind(
    vm: &mut Vm,
    actions: Rc<Vec<WindAction>>,
    idx: usize,
    cont: Rc<Continuation>,
    value: Value,
) -> Flow {
    if idx >= actions.len() {
        return Flow::Jump { cont, value };
    }
    // both thunks run with the parent node current
    let (thunk, entered) = match &actions[idx] {
        WindAction::Exit(node) => {
            vm.wind = node.parent().expect("only non-root nodes are exited");
            (node.after().clone(), None)
        }
        WindAction::Enter(node) => {
            vm.wind = node.parent().expect("only non-root nodes are entered");
            (node.before().clone(), Some(node.clone()))
        }
    };
    let next_actions = actions.clone();
    let next_cont = cont.clone();
    let next_value = value.clone();
    Flow::Push {
        proc: thunk,
        args: vec![],
        then: Rc::new(move |vm, _ignored| {
            if let Some(node) = &entered {
                vm.wind = node.clone();
            }
            Ok(rewind(
                vm,
                next_actions.clone(),
                idx + 1,
                next_cont.clone(),
                next_value.clone(),
            ))
        }),
    }
}
