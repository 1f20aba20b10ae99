mod stats;
mod regression;

pub use stats::*;
pub use regression::*;
