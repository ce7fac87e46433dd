//! Allocation seam between the runtime core and the collector.
//!
//! The core never calls an allocator directly; everything heap-resident goes
//! through `new_atomic` (leaf objects that contain no values) or
//! `new_pointer` (objects that do). The seam also carries the root registry
//! and per-object finalisers, so a tracing collector can be slotted in
//! behind it without touching the rest of the core.

use crate::value::Value;
use std::cell::RefCell;
use std::rc::Rc;

/// Running allocation statistics, per thread.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeapStats {
    /// Count of atomic (pointer-free) allocations
    pub atomic_count: usize,
    /// Count of pointer-carrying allocations
    pub pointer_count: usize,
    /// Bytes requested through either path
    pub bytes: usize,
}

type Finalizer = Box<dyn FnOnce()>;

struct HeapState {
    stats: HeapStats,
    roots: Vec<Value>,
    finalizers: Vec<(usize, Finalizer)>,
}

thread_local! {
    static HEAP: RefCell<HeapState> = RefCell::new(HeapState {
        stats: HeapStats::default(),
        roots: Vec::new(),
        finalizers: Vec::new(),
    });
}

/// Allocate a leaf object: one that holds no `Value` and thus never needs
/// to be traced.
pub fn new_atomic<T>(obj: T) -> Rc<T> {
    HEAP.with(|h| {
        let mut h = h.borrow_mut();
        h.stats.atomic_count += 1;
        h.stats.bytes += std::mem::size_of::<T>();
    });
    Rc::new(obj)
}

/// Allocate an object that holds values and must be traced.
pub fn new_pointer<T>(obj: T) -> Rc<T> {
    HEAP.with(|h| {
        let mut h = h.borrow_mut();
        h.stats.pointer_count += 1;
        h.stats.bytes += std::mem::size_of::<T>();
    });
    Rc::new(obj)
}

/// Pin a value so the collector treats it as live regardless of reachability.
/// Returns a token for `remove_root`.
pub fn add_root(v: Value) -> usize {
    HEAP.with(|h| {
        let mut h = h.borrow_mut();
        h.roots.push(v);
        h.roots.len() - 1
    })
}

/// Unpin a previously added root. Tokens are positional; removing swaps in
/// the last root, so only the returned token for that slot stays valid.
pub fn remove_root(token: usize) {
    HEAP.with(|h| {
        let mut h = h.borrow_mut();
        if token < h.roots.len() {
            h.roots.swap_remove(token);
        }
    });
}

/// Snapshot of the current root set.
pub fn roots() -> Vec<Value> {
    HEAP.with(|h| h.borrow().roots.clone())
}

/// Register a finaliser keyed by an allocation's address (`Rc::as_ptr` cast
/// to usize). Finalisers run once, in registration order, from
/// `run_finalizers`.
pub fn register_finalizer(key: usize, f: impl FnOnce() + 'static) {
    HEAP.with(|h| h.borrow_mut().finalizers.push((key, Box::new(f))));
}

/// Run and discard every registered finaliser. A real collector would run
/// these per dead object; the seam exposes the bulk form for shutdown.
pub fn run_finalizers() -> usize {
    let pending = HEAP.with(|h| std::mem::take(&mut h.borrow_mut().finalizers));
    let n = pending.len();
    for (_, f) in pending {
        f();
    }
    n
}

/// Current allocation statistics for this thread.
pub fn stats() -> HeapStats {
    HEAP.with(|h| h.borrow().stats)
}
