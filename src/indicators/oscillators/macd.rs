use crate::trend::ema;
use serde::{Deserialize, Serialize};

/// EMA periods in candles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MacdConfig {
    pub fast_period: usize,
    pub slow_period: usize,
    pub signal_period: usize,
}

impl Default for MacdConfig {
    fn default() -> Self {
        Self {
            fast_period: 12,
            slow_period: 26,
            signal_period: 9,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MacdOutput {
    pub macd_line: Vec<f64>,
    pub signal_line: Vec<f64>,
    /// `macd_line - signal_line`; its sign flips mark the crossovers
    pub histogram: Vec<f64>,
}

fn difference(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter().zip(b).map(|(x, y)| x - y).collect()
}

/// Fast EMA minus slow EMA, its EMA as the signal line, and their gap.
/// The EMAs are seeded with the first value, so there is no warmup; a NaN
/// input propagates.
pub fn macd(closes: &[f64], config: MacdConfig) -> MacdOutput {
    let macd_line = difference(
        &ema(closes, config.fast_period),
        &ema(closes, config.slow_period),
    );
    let signal_line = ema(&macd_line, config.signal_period);
    let histogram = difference(&macd_line, &signal_line);

    MacdOutput {
        macd_line,
        signal_line,
        histogram,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_macd_default() {
        // Create sample price data (uptrend)
        let prices: Vec<f64> = (0..100).map(|i| 100.0 + i as f64).collect();
        let output = macd(&prices, MacdConfig::default());

        assert_eq!(output.macd_line.len(), prices.len());
        assert_eq!(output.signal_line.len(), prices.len());
        assert_eq!(output.histogram.len(), prices.len());

        // EMA seeding means no warm-up gap; the first value is flat
        assert_eq!(output.macd_line[0], 0.0);
        assert_eq!(output.histogram[0], 0.0);

        // In an uptrend, MACD should be positive
        let last_idx = prices.len() - 1;
        assert!(output.macd_line[last_idx] > 0.0);
    }

    #[test]
    fn test_macd_identity() {
        let prices: Vec<f64> = (0..50).map(|i| 100.0 + (i as f64).sin()).collect();
        let config = MacdConfig {
            fast_period: 5,
            slow_period: 10,
            signal_period: 3,
        };
        let output = macd(&prices, config);
        let fast = ema(&prices, 5);
        let slow = ema(&prices, 10);

        for i in 0..prices.len() {
            assert!((output.macd_line[i] - (fast[i] - slow[i])).abs() < 1e-12);
            assert!(
                (output.histogram[i] - (output.macd_line[i] - output.signal_line[i])).abs()
                    < 1e-12
            );
        }
    }

    #[test]
    fn test_macd_crossover() {
        // Down then up: histogram turns from negative to positive
        let mut prices = vec![100.0; 60];
        for (i, p) in prices.iter_mut().enumerate().take(30) {
            *p = 100.0 - i as f64;
        }
        for (i, p) in prices.iter_mut().enumerate().skip(30) {
            *p = 71.0 + (i - 30) as f64 * 2.0;
        }

        let output = macd(&prices, MacdConfig::default());
        assert!(output.histogram[20] < 0.0);
        assert!(output.histogram[59] > 0.0);
    }
}
