use crate::trend::ma::{moving_average, rolling_std};
use serde::Serialize;

/// Bands around a simple moving average, `k` population deviations wide.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Bands {
    pub upper: Vec<f64>,
    pub middle: Vec<f64>,
    pub lower: Vec<f64>,
}

/// All three series share the moving average's warmup: NaN for the first
/// `period - 1` entries, or everywhere when `period` is 0 or exceeds the data.
pub fn bollinger_bands(closes: &[f64], period: usize, k: f64) -> Bands {
    let middle = moving_average(closes, period);
    let sd = rolling_std(closes, period);
    let (upper, lower) = middle
        .iter()
        .zip(&sd)
        .map(|(&m, &s)| (m + k * s, m - k * s))
        .unzip();

    Bands { upper, middle, lower }
}
