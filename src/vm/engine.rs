//! Trampolined application engine.
//!
//! Procedures never run on the Rust call stack across applications.
//! Instead every step returns a [`Flow`] and the trampoline in [`apply`]
//! interprets it, keeping pending work in a heap-linked [`Frame`] chain.
//! That chain is the evaluator control state the continuation core
//! captures: `call/cc` clones the chain pointer, and re-invocation swaps
//! it back in, any number of times.
//!
//! Native procedures come in two flavours, mirroring how the host plugs
//! in primitives: plain ones see the VM and their arguments; kont-aware
//! ones additionally receive the live continuation at their call site.

use crate::heap;
use crate::value::condition::Condition;
use crate::value::continuation::Continuation;
use crate::value::Value;
use crate::vm::Vm;
use std::rc::Rc;

/// Function arity specification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
    Range(usize, usize),
}

impl Arity {
    pub fn matches(&self, n: usize) -> bool {
        match self {
            Arity::Exact(expected) => n == *expected,
            Arity::AtLeast(min) => n >= *min,
            Arity::Range(min, max) => n >= *min && n <= *max,
        }
    }
}

/// Plain native procedure body.
pub type PrimFn = Rc<dyn Fn(&mut Vm, &[Value]) -> Result<Flow, Condition>>;

/// Native procedure body that also sees the continuation of its call site.
pub type KontFn = Rc<dyn Fn(&mut Vm, &[Value], &Kont) -> Result<Flow, Condition>>;

/// What a frame does with the value handed back to it.
pub type ResumeFn = Rc<dyn Fn(&mut Vm, Value) -> Result<Flow, Condition>>;

pub enum ProcImpl {
    Plain(PrimFn),
    WithKont(KontFn),
}

/// A native (Rust) procedure.
pub struct NativeProc {
    pub name: &'static str,
    pub arity: Arity,
    pub(crate) imp: ProcImpl,
}

/// One pending frame of the computation. Frames are immutable and shared;
/// a captured continuation keeps the chain alive past its first use.
pub struct Frame {
    pub(crate) resume: ResumeFn,
    pub(crate) parent: Kont,
}

/// The frame chain; `None` is the empty continuation.
pub type Kont = Option<Rc<Frame>>;

/// One step of computation, interpreted by the trampoline.
#[derive(Clone)]
pub enum Flow {
    /// Deliver a value to the current continuation
    Return(Value),
    /// Tail-call: apply proc without growing the frame chain
    Tail { proc: Value, args: Vec<Value> },
    /// Call proc, then hand its result to `then`
    Push {
        proc: Value,
        args: Vec<Value>,
        then: ResumeFn,
    },
    /// Raise a value through the handler stack
    Raise(Value),
    /// Replace the whole continuation (continuation invocation lands here)
    Jump {
        cont: Rc<Continuation>,
        value: Value,
    },
}

impl Value {
    /// Wrap a Rust function as a plain native procedure.
    pub fn native(
        name: &'static str,
        arity: Arity,
        f: impl Fn(&mut Vm, &[Value]) -> Result<Flow, Condition> + 'static,
    ) -> Value {
        Value::Native(heap::new_pointer(NativeProc {
            name,
            arity,
            imp: ProcImpl::Plain(Rc::new(f)),
        }))
    }

    /// Wrap a Rust function as a kont-aware native procedure.
    pub fn native_k(
        name: &'static str,
        arity: Arity,
        f: impl Fn(&mut Vm, &[Value], &Kont) -> Result<Flow, Condition> + 'static,
    ) -> Value {
        Value::Native(heap::new_pointer(NativeProc {
            name,
            arity,
            imp: ProcImpl::WithKont(Rc::new(f)),
        }))
    }

    /// Zero-argument native procedure.
    pub fn thunk(
        name: &'static str,
        f: impl Fn(&mut Vm) -> Result<Flow, Condition> + 'static,
    ) -> Value {
        Value::native(name, Arity::Exact(0), move |vm, _args| f(vm))
    }

    /// Thunk returning a fixed value.
    pub fn constant(name: &'static str, v: Value) -> Value {
        Value::native(name, Arity::AtLeast(0), move |_vm, _args| {
            Ok(Flow::Return(v.clone()))
        })
    }
}

fn apply_step(vm: &mut Vm, proc: &Value, args: Vec<Value>, kont: &Kont) -> Result<Flow, Condition> {
    match proc {
        Value::Native(p) => {
            if !p.arity.matches(args.len()) {
                return Err(Condition::error(format!(
                    "{}: wrong number of arguments: got {}",
                    p.name,
                    args.len()
                )));
            }
            match &p.imp {
                ProcImpl::Plain(f) => f(vm, &args),
                ProcImpl::WithKont(f) => f(vm, &args, kont),
            }
        }
        Value::Continuation(c) => Ok(crate::vm::cont::invoke_continuation(vm, c.clone(), args)),
        _ => Err(Condition::error(format!(
            "attempt to apply a non-procedure: {}",
            proc.type_name()
        ))
        .with_irritant(proc.clone())),
    }
}

fn ok_or_raise(r: Result<Flow, Condition>) -> Flow {
    r.unwrap_or_else(|c| Flow::Raise(Value::condition(c)))
}

/// Apply a procedure to arguments and run to completion.
///
/// `Err` carries a raised value that no handler caught; it surfaces here,
/// at the boundary, and the computation is over.
pub fn apply(vm: &mut Vm, proc: &Value, args: &[Value]) -> Result<Value, Value> {
    let mut kont: Kont = None;
    let mut flow = ok_or_raise(apply_step(vm, proc, args.to_vec(), &kont));
    loop {
        flow = match flow {
            Flow::Return(v) => match kont.take() {
                None => return Ok(v),
                Some(frame) => {
                    kont = frame.parent.clone();
                    ok_or_raise((frame.resume)(vm, v))
                }
            },
            Flow::Tail { proc, args } => ok_or_raise(apply_step(vm, &proc, args, &kont)),
            Flow::Push { proc, args, then } => {
                kont = Some(Rc::new(Frame {
                    resume: then,
                    parent: kont.take(),
                }));
                ok_or_raise(apply_step(vm, &proc, args, &kont))
            }
            Flow::Raise(v) => match vm.handlers.pop() {
                None => return Err(v),
                Some(handler) => {
                    // the handler runs with the stack already reduced; if it
                    // returns normally the original condition continues to
                    // the next outer handler
                    let original = v.clone();
                    kont = Some(Rc::new(Frame {
                        resume: Rc::new(move |_vm, _res| Ok(Flow::Raise(original.clone()))),
                        parent: kont.take(),
                    }));
                    ok_or_raise(apply_step(vm, &handler, vec![v], &kont))
                }
            },
            Flow::Jump { cont, value } => {
                vm.wind = cont.wind.clone();
                vm.handlers = cont.handlers.clone();
                kont = cont.kont.clone();
                Flow::Return(value)
            }
        };
    }
}
