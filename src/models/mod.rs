//! Device models.
//!
//! Only the square-law MOSFET model is implemented; it is kept as small pure
//! functions so the fitters and the stage solver share one definition.

pub mod square_law;

pub use square_law::*;
