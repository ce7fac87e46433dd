//! Continuation and dynamic-wind data structures.
//!
//! The engine keeps its pending work as a heap-linked chain of frames, so
//! capturing a continuation is a pointer copy and the same captured chain
//! can be resumed any number of times. A continuation also records the
//! dynamic-wind node and the handler stack at capture so invocation can
//! rewind both.
//!
//! Wind nodes are persistent: every `dynamic-wind` entry creates a fresh
//! child and nothing ever mutates a node in place, so sibling captures can
//! share structure freely.

use crate::vm::engine::Kont;
use crate::value::Value;
use std::rc::Rc;

/// One node of the dynamic-wind tree.
#[derive(Clone)]
pub struct WindNode {
    before: Value,
    after: Value,
    parent: Option<Rc<WindNode>>,
    depth: usize,
}

impl WindNode {
    /// The initial empty extent. Thunks on the root are never run.
    pub fn root() -> Rc<WindNode> {
        Rc::new(WindNode {
            before: Value::Undefined,
            after: Value::Undefined,
            parent: None,
            depth: 0,
        })
    }

    pub fn child(parent: Rc<WindNode>, before: Value, after: Value) -> Rc<WindNode> {
        let depth = parent.depth + 1;
        Rc::new(WindNode {
            before,
            after,
            parent: Some(parent),
            depth,
        })
    }

    pub fn before(&self) -> &Value {
        &self.before
    }

    pub fn after(&self) -> &Value {
        &self.after
    }

    pub fn parent(&self) -> Option<Rc<WindNode>> {
        self.parent.clone()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }
}

/// A captured continuation: the frame chain to resume, the wind node and
/// the handler stack in effect at capture.
#[derive(Clone)]
pub struct Continuation {
    pub(crate) kont: Kont,
    pub(crate) wind: Rc<WindNode>,
    pub(crate) handlers: Vec<Value>,
}

impl Continuation {
    pub(crate) fn capture(kont: &Kont, wind: &Rc<WindNode>, handlers: &[Value]) -> Continuation {
        Continuation {
            kont: kont.clone(),
            wind: wind.clone(),
            handlers: handlers.to_vec(),
        }
    }
}
