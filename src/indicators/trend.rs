pub mod ema;
pub mod ma;

pub use ema::ema;
pub use ma::moving_average;
