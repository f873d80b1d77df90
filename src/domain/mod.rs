//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - device parameters and measurements (`FetParams`, `Measurement`)
//! - configuration enums (`ESeries`, `FitMethod`)
//! - fit and design inputs/outputs (`FitReport`, `DesignConfig`, `ModelFile`)

pub mod types;

pub use types::*;
