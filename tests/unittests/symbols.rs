// Interned symbols through the VM context.

use onyx::value::Value;
use onyx::vm::engine::{apply, Arity, Flow};
use onyx::vm::Port;
use onyx::Vm;

#[test]
fn test_interning_gives_identity() {
    let mut vm = Vm::new();
    let lambda = vm.intern("lambda");
    let define = vm.intern("define");
    assert_eq!(vm.intern("lambda"), lambda);
    assert_ne!(lambda, define);
    let Value::Symbol(id) = lambda else {
        panic!("intern returns a symbol");
    };
    assert_eq!(vm.symbol_name(id), Some("lambda"));
    assert_eq!(vm.lookup_symbol("define"), Some(define));
    assert_eq!(vm.lookup_symbol("quote"), None);
}

#[test]
fn test_fresh_symbols_never_collide() {
    let mut vm = Vm::new();
    let g1 = vm.fresh_symbol("loop");
    let g2 = vm.fresh_symbol("loop");
    assert_ne!(g1, g2);
    // a fresh symbol's spelling is not reachable by lookup
    let Value::Symbol(id) = g1 else {
        panic!("fresh returns a symbol");
    };
    let name = vm.symbol_name(id).unwrap().to_string();
    assert_eq!(vm.lookup_symbol(&name), None);
}

#[test]
fn test_symbols_flow_through_the_engine() {
    // a raised symbol survives application unchanged and reports under
    // its spelling at the boundary
    let mut vm = Vm::new();
    vm.ports.error = Port::buffer();
    let sym = vm.intern("timeout");
    let sym2 = sym.clone();
    let raiser = Value::native("raiser", Arity::Exact(0), move |_vm, _| {
        Ok(Flow::Raise(sym2.clone()))
    });
    let uncaught = apply(&mut vm, &raiser, &[]).unwrap_err();
    assert_eq!(uncaught, sym);
    vm.report_unhandled(&uncaught);
    assert!(vm.ports.error.contents().contains("timeout"));
}
