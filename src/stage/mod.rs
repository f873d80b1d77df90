//! Common-source stage design around an N-channel enhancement FET.
//!
//! - device state and operating-region checks (`fet`)
//! - bias network design and quiescent-point solve (`common_source`)

pub mod common_source;
pub mod fet;

pub use common_source::*;
pub use fet::*;
