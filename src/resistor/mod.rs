//! Standard resistor values.
//!
//! - E-series tables and nearest-value lookup (`series`)
//! - voltage-divider search over table pairs (`divider`)
//! - compact value notation such as `4K7` (`format`)

pub mod divider;
pub mod format;
pub mod series;

pub use divider::*;
pub use format::*;
pub use series::*;
