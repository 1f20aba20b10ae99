pub mod macd;
pub mod rsi;

pub use macd::{macd, MacdConfig, MacdOutput};
pub use rsi::rsi;
