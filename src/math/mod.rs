//! Mathematical utilities: least squares and polynomial roots.

pub mod ols;
pub mod poly;

pub use ols::*;
pub use poly::*;
