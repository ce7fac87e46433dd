//! # Onyx - A Scheme Runtime Core
//!
//! Onyx is the runtime core of a Scheme implementation: the full numeric
//! tower, first-class continuations with `dynamic-wind`, the condition
//! system, promises and lazy pairs, and the time/system boundary. The
//! reader, compiler and evaluator are external collaborators; they drive
//! this crate through plain Rust calls.
//!
//! ## Quick Start
//!
//! ```
//! use onyx::number::{arith, parse_number, number_to_string};
//! use onyx::value::Value;
//!
//! let a = parse_number("1/3", 10, false).unwrap().unwrap();
//! let b = parse_number("0.1", 10, false).unwrap().unwrap();
//! let sum = arith::add(&a, &b).unwrap();
//! assert_eq!(number_to_string(&sum, 10, false).unwrap(), "0.43333333333333335");
//! assert_eq!(number_to_string(&b, 10, false).unwrap(), "0.1");
//! ```
//!
//! ## Architecture
//!
//! 1. **Values** - tagged scalars with inline fixnums; everything else is
//!    allocated through the heap seam
//! 2. **Numbers** - bignum engine, rationals, tower dispatch, and number
//!    I/O with shortest correctly-rounding flonum printing
//! 3. **VM** - a per-context trampoline whose frame chain is what
//!    `call/cc` captures; `dynamic-wind` and `guard` build on it
//! 4. **System** - clocks, directory listing and path normalization
//!
//! All per-VM state, the interned-symbol table included, lives in
//! [`vm::Vm`] and is threaded explicitly; the only wider tables (powers
//! of ten, radix limits) are immutable once computed.

pub mod heap;
pub mod number;
pub mod promise;
pub mod symbol;
pub mod system;
pub mod value;
pub mod vm;

pub use number::{number_to_string, parse_number};
pub use promise::{force, make_promise};
pub use symbol::SymbolTable;
pub use value::{Condition, Value};
pub use vm::cont::call_cc;
pub use vm::engine::apply;
pub use vm::exception::{guard, raise, with_exception_handler};
pub use vm::wind::dynamic_wind;
pub use vm::Vm;
