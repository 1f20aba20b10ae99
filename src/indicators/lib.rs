//! Technical indicators over plain `f64` slices, plus [`enrich`] which
//! attaches them to a [`table::TimeSeriesTable`].
//!
//! Every function is pure: output has the input's length, with NaN where
//! there is not yet enough history.

pub mod enrich;
pub mod levels;
pub mod oscillators;
pub mod trend;
pub mod volatility;

pub use enrich::{enrich, support_resistance, IndicatorConfig};
pub use levels::{
    fibonacci_levels, local_extrema, nearest_levels, Extrema, FibonacciLevel, SupportResistance,
    Trend,
};
pub use oscillators::{macd, rsi, MacdConfig, MacdOutput};
pub use trend::{ema, moving_average};
pub use volatility::{bollinger_bands, return_volatility, Bands};
