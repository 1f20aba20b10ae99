pub mod extrema;
pub mod fibonacci;

pub use extrema::{local_extrema, nearest_levels, Extrema, SupportResistance};
pub use fibonacci::{fibonacci_levels, FibonacciLevel, Trend, FIBONACCI_RATIOS};
