//! The numeric tower: bignums, rationals, generic arithmetic, number I/O.

pub mod arith;
pub mod bignum;
pub mod parse;
pub mod print;
pub mod ratio;

pub use arith::{FlonumDecode, RoundMode};
pub use bignum::{Bignum, Clamp};
pub use parse::parse_number;
pub use print::number_to_string;
pub use ratio::Ratnum;
