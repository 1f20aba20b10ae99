/// Stand-in for an infinite ratio. Finite so it survives JSON serialisation.
pub const RATIO_CEILING: f64 = f64::MAX;

/// Stop-loss price `pct` below `entry` (0.05 = 5%).
pub fn stop_loss(entry: f64, pct: f64) -> f64 {
    entry * (1.0 - pct)
}

/// Take-profit ladder: each level is `ratio` times the entry-to-stop distance above entry.
pub fn take_profit_levels(entry: f64, stop: f64, ratios: &[f64]) -> Vec<f64> {
    let risk = entry - stop;
    ratios.iter().map(|r| entry + risk * r).collect()
}

/// Units to buy so that hitting the stop loses `risk_per_trade` of the portfolio.
///
/// Returns `None` when the stop is not below the entry.
pub fn position_size(
    portfolio_value: f64,
    risk_per_trade: f64,
    entry: f64,
    stop: f64,
) -> Option<f64> {
    let risk_per_unit = entry - stop;
    if risk_per_unit <= 0.0 {
        return None;
    }
    Some(portfolio_value * risk_per_trade / risk_per_unit)
}

/// Kelly fraction `w - (1 - w) / r`, floored at zero.
///
/// A non-positive payoff ratio means no edge and yields 0.
pub fn kelly_percentage(win_rate: f64, win_loss_ratio: f64) -> f64 {
    if win_loss_ratio <= 0.0 || !win_loss_ratio.is_finite() {
        return 0.0;
    }
    (win_rate - (1.0 - win_rate) / win_loss_ratio).max(0.0)
}

/// `|target - entry| / |entry - stop|`, or [`RATIO_CEILING`] when the risk is zero.
pub fn risk_reward_ratio(entry: f64, target: f64, stop: f64) -> f64 {
    let risk = (entry - stop).abs();
    if risk == 0.0 {
        return RATIO_CEILING;
    }
    ((target - entry).abs() / risk).min(RATIO_CEILING)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_stop_and_targets() {
        let stop = stop_loss(100.0, 0.05);
        assert!((stop - 95.0).abs() < 1e-12);

        let targets = take_profit_levels(100.0, stop, &[1.0, 2.0, 3.0]);
        assert!((targets[0] - 105.0).abs() < 1e-9);
        assert!((targets[1] - 110.0).abs() < 1e-9);
        assert!((targets[2] - 115.0).abs() < 1e-9);
    }

    #[test]
    fn test_position_size() {
        // risk 2% of 10_000 = 200, 5 per unit
        let size = position_size(10_000.0, 0.02, 100.0, 95.0).unwrap();
        assert!((size - 40.0).abs() < 1e-9);
        assert_eq!(position_size(10_000.0, 0.02, 100.0, 100.0), None);
    }

    #[test]
    fn test_kelly() {
        assert!((kelly_percentage(0.6, 2.0) - 0.4).abs() < 1e-12);
        assert_eq!(kelly_percentage(0.2, 1.0), 0.0);
        assert_eq!(kelly_percentage(0.9, 0.0), 0.0);
    }

    #[test]
    fn test_risk_reward_zero_risk_saturates() {
        assert_eq!(risk_reward_ratio(100.0, 150.0, 100.0), RATIO_CEILING);
        assert!((risk_reward_ratio(100.0, 110.0, 95.0) - 2.0).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn prop_kelly_never_negative(w in 0.0f64..=1.0, r in 1e-6f64..1e6) {
            prop_assert!(kelly_percentage(w, r) >= 0.0);
        }
    }
}
