//! Numerical core: log-returns, moment estimation, bitstring decoding.

pub mod decode;
pub mod moments;
pub mod returns;

pub use decode::*;
pub use moments::*;
pub use returns::*;
