use stats::normal_cdf;

/// Probability that a driftless log-normal price starting at `entry` touches
/// `target` at least once within `days`, given the daily log-return
/// volatility. Uses the reflection principle:
/// `2 * (1 - N(|ln(target/entry)| / (vol * sqrt(days))))`.
pub fn barrier_hit_probability(entry: f64, target: f64, daily_vol: f64, days: f64) -> f64 {
    if entry <= 0.0 || target <= 0.0 {
        return 0.0;
    }

    let distance = (target / entry).ln().abs();
    if distance == 0.0 {
        return 1.0;
    }

    let spread = daily_vol * days.max(0.0).sqrt();
    if !(spread > 0.0) {
        return 0.0;
    }

    (2.0 * (1.0 - normal_cdf(distance / spread))).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probability_decreases_with_distance() {
        let near = barrier_hit_probability(100.0, 105.0, 0.03, 30.0);
        let far = barrier_hit_probability(100.0, 150.0, 0.03, 30.0);
        assert!(near > far);
        assert!(near <= 1.0 && far >= 0.0);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert_eq!(barrier_hit_probability(100.0, 100.0, 0.0, 10.0), 1.0);
        assert_eq!(barrier_hit_probability(100.0, 110.0, 0.0, 10.0), 0.0);
        assert_eq!(barrier_hit_probability(100.0, 110.0, f64::NAN, 10.0), 0.0);
    }

    #[test]
    fn test_one_sigma_move() {
        // |ln| / spread = 1 => 2 * (1 - 0.8413) = 0.3173
        let vol = 0.02;
        let target = 100.0 * (vol * 25.0_f64.sqrt()).exp();
        let p = barrier_hit_probability(100.0, target, vol, 25.0);
        assert!((p - 0.3173).abs() < 1e-3);
    }
}
