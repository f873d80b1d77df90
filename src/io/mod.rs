//! Input/output helpers.
//!
//! - measurement file ingest + validation (`ingest`)
//! - measurement and design exports (`export`)
//! - device model JSON read/write (`model`)

pub mod export;
pub mod ingest;
pub mod model;

pub use export::*;
pub use ingest::*;
pub use model::*;
