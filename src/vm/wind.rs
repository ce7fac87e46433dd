//! dynamic-wind: entry/exit bookkeeping for dynamic extents.
//!
//! `dynamic_wind` runs `before`, pushes a fresh wind node, runs `body`,
//! pops the node and runs `after`. The pop happens however `body`
//! leaves, because a continuation crossing extents walks the node tree
//! (see [`path`]) running the same `after`/`before` thunks in tree order.
//! `before` and `after` run with the parent node current, never inside the
//! extent they delimit.

use crate::value::continuation::WindNode;
use crate::value::Value;
use crate::vm::engine::{apply, Arity, Flow};
use crate::vm::Vm;
use std::rc::Rc;

/// One step of a continuation's travel between two dynamic extents.
pub(crate) enum WindAction {
    /// Leave this node: run its `after` with the parent current
    Exit(Rc<WindNode>),
    /// Enter this node: run its `before` with the parent current
    Enter(Rc<WindNode>),
}

/// Travel plan from `from` to `to`: exits bottom-up to the least common
/// ancestor, then entries top-down to the target.
pub(crate) fn path(from: &Rc<WindNode>, to: &Rc<WindNode>) -> Vec<WindAction> {
    let mut exits = Vec::new();
    let mut enters = Vec::new();
    let mut a = from.clone();
    let mut b = to.clone();
    while a.depth() > b.depth() {
        let parent = a.parent().expect("positive depth implies a parent");
        exits.push(a);
        a = parent;
    }
    while b.depth() > a.depth() {
        let parent = b.parent().expect("positive depth implies a parent");
        enters.push(b);
        b = parent;
    }
    while !Rc::ptr_eq(&a, &b) {
        let pa = a.parent().expect("nodes of one VM share a root");
        let pb = b.parent().expect("nodes of one VM share a root");
        exits.push(a);
        enters.push(b);
        a = pa;
        b = pb;
    }
    enters.reverse();
    exits
        .into_iter()
        .map(WindAction::Exit)
        .chain(enters.into_iter().map(WindAction::Enter))
        .collect()
}

/// Flow form of dynamic-wind, for composing inside native procedures.
pub fn wind_flow(before: Value, body: Value, after: Value) -> Flow {
    let before_for_node = before.clone();
    Flow::Push {
        proc: before,
        args: vec![],
        then: Rc::new(move |vm, _ignored| {
            let node = WindNode::child(
                vm.wind.clone(),
                before_for_node.clone(),
                after.clone(),
            );
            vm.wind = node.clone();
            let after = after.clone();
            let node_for_body = node;
            Ok(Flow::Push {
                proc: body.clone(),
                args: vec![],
                then: Rc::new(move |vm, body_value| {
                    vm.wind = node_for_body
                        .parent()
                        .expect("wind node was created with a parent");
                    Ok(Flow::Push {
                        proc: after.clone(),
                        args: vec![],
                        then: {
                            let bv = body_value;
                            Rc::new(move |_vm, _ignored| Ok(Flow::Return(bv.clone())))
                        },
                    })
                }),
            })
        }),
    }
}

/// `dynamic-wind before body after`: run `body` inside a fresh dynamic
/// extent, with `before`/`after` replayed on every non-local entry/exit.
pub fn dynamic_wind(
    vm: &mut Vm,
    before: Value,
    body: Value,
    after: Value,
) -> Result<Value, Value> {
    let entry = Value::native("dynamic-wind", Arity::Exact(0), move |_vm, _args| {
        Ok(wind_flow(before.clone(), body.clone(), after.clone()))
    });
    apply(vm, &entry, &[])
}
