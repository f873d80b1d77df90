//! Plotting: terminal (`ascii`) and SVG file (`svg`) renderings.

pub mod ascii;
pub mod svg;

pub use ascii::*;
pub use svg::*;
