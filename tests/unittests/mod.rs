//! Unit-style integration tests.

mod control;
mod number_io;
mod promises;
mod symbols;
mod system_boundary;
