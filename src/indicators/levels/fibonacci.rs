use serde::{Deserialize, Serialize};

pub const FIBONACCI_RATIOS: [f64; 7] = [0.0, 0.236, 0.382, 0.5, 0.618, 0.786, 1.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
}

impl Trend {
    /// Up when the last finite close is at or above the first one.
    pub fn from_closes(closes: &[f64]) -> Self {
        let mut finite = closes.iter().filter(|v| v.is_finite());
        match (finite.next(), finite.last()) {
            (Some(first), Some(last)) if last < first => Trend::Down,
            _ => Trend::Up,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FibonacciLevel {
    pub ratio: f64,
    pub price: f64,
}

/// Retracement levels between the range extremes.
///
/// For an uptrend the anchors are `(min(low), max(high))` and level `r` sits at
/// `high - (high - low) * r`, so ratio 0 is the top of the move. A downtrend
/// swaps the anchors, putting ratio 0 at the bottom. NaN inputs are ignored;
/// an input without finite values yields no levels.
pub fn fibonacci_levels(high: &[f64], low: &[f64], trend: Trend) -> Vec<FibonacciLevel> {
    let max_high = high
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(f64::NEG_INFINITY, f64::max);
    let min_low = low
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(f64::INFINITY, f64::min);

    if !max_high.is_finite() || !min_low.is_finite() {
        return Vec::new();
    }

    let (start, end) = match trend {
        Trend::Up => (min_low, max_high),
        Trend::Down => (max_high, min_low),
    };

    FIBONACCI_RATIOS
        .iter()
        .map(|&ratio| FibonacciLevel {
            ratio,
            price: end - (end - start) * ratio,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uptrend_levels() {
        let levels = fibonacci_levels(&[110.0, 200.0, 150.0], &[100.0, 120.0, 140.0], Trend::Up);
        assert_eq!(levels.len(), 7);
        assert_eq!(levels[0].price, 200.0);
        assert_eq!(levels[6].price, 100.0);
        assert!((levels[3].price - 150.0).abs() < 1e-12);
        assert!((levels[4].price - (200.0 - 61.8)).abs() < 1e-9);
    }

    #[test]
    fn test_downtrend_swaps_anchors() {
        let levels = fibonacci_levels(&[200.0], &[100.0], Trend::Down);
        assert_eq!(levels[0].price, 100.0);
        assert_eq!(levels[6].price, 200.0);
        assert!((levels[1].price - 123.6).abs() < 1e-9);
    }

    #[test]
    fn test_empty_input() {
        assert!(fibonacci_levels(&[], &[], Trend::Up).is_empty());
        assert!(fibonacci_levels(&[f64::NAN], &[1.0], Trend::Up).is_empty());
    }

    #[test]
    fn test_trend_detection() {
        assert_eq!(Trend::from_closes(&[1.0, 2.0, 3.0]), Trend::Up);
        assert_eq!(Trend::from_closes(&[f64::NAN, 3.0, 2.0, 1.0]), Trend::Down);
        assert_eq!(Trend::from_closes(&[]), Trend::Up);
    }
}
