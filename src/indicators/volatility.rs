pub mod bollinger_bands;

pub use bollinger_bands::{bollinger_bands, Bands};

use crate::trend::ma::rolling_std;

/// Rolling standard deviation of log returns over `lookback` returns.
///
/// Index i holds the deviation of the returns ending at price i, so the first
/// `lookback` values are NaN.
pub fn return_volatility(closes: &[f64], lookback: usize) -> Vec<f64> {
    if closes.is_empty() {
        return Vec::new();
    }

    let mut returns = Vec::with_capacity(closes.len());
    returns.push(f64::NAN);
    for w in closes.windows(2) {
        returns.push((w[1] / w[0]).ln());
    }

    rolling_std(&returns, lookback)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_growth_has_zero_volatility() {
        let closes: Vec<f64> = (0..10).map(|i| 100.0 * 1.01_f64.powi(i)).collect();
        let vol = return_volatility(&closes, 3);
        assert!(vol[2].is_nan());
        assert!(vol[3].abs() < 1e-12);
        assert!(vol[9].abs() < 1e-12);
    }
}
