use std::f64::consts::PI;

// ============================================================================
// Normal CDF - Accurate to 7.5e-8
// ============================================================================

pub fn normal_cdf(z: f64) -> f64 {
    let zz = z.abs();
    let pdf = (-0.5 * zz * zz).exp() / (2.0 * PI).sqrt();
    let t = 1.0 / (1.0 + zz * 0.2316419);
    let poly = ((((1.330274429 * t - 1.821255978) * t + 1.781477937) * t
        - 0.356563782) * t
        + 0.319381530)
        * t;
    if z > 0.0 {
        1.0 - pdf * poly
    } else {
        pdf * poly
    }
}

// ============================================================================
// Moments
// ============================================================================

pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return f64::NAN;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Population standard deviation (divides by n).
pub fn population_std(data: &[f64]) -> f64 {
    if data.is_empty() {
        return f64::NAN;
    }
    let m = mean(data);
    let var = data.iter().map(|&x| (x - m).powi(2)).sum::<f64>() / data.len() as f64;
    var.sqrt()
}

/// Sample standard deviation (divides by n - 1).
pub fn sample_std(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return f64::NAN;
    }
    let m = mean(data);
    let var = data.iter().map(|&x| (x - m).powi(2)).sum::<f64>() / (data.len() - 1) as f64;
    var.sqrt()
}

/// Log returns `ln(p[i] / p[i-1])`; non-positive or non-finite pairs are skipped.
pub fn log_returns(prices: &[f64]) -> Vec<f64> {
    prices
        .windows(2)
        .filter(|w| w[0] > 0.0 && w[1] > 0.0)
        .map(|w| (w[1] / w[0]).ln())
        .filter(|r| r.is_finite())
        .collect()
}

// ============================================================================
// Quantiles
// ============================================================================

pub fn find_quantile(sorted_data: &[f64], fractile: f64) -> f64 {
    let n = sorted_data.len();
    let mut k = ((fractile * (n as f64 + 1.0)) as usize).saturating_sub(1);
    if k >= n {
        k = n - 1;
    }
    sorted_data[k]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normal_cdf() {
        assert!((normal_cdf(0.0) - 0.5).abs() < 1e-7);
        assert!((normal_cdf(1.96) - 0.975).abs() < 1e-3);
        assert!((normal_cdf(-1.96) - 0.025).abs() < 1e-3);
    }

    #[test]
    fn test_moments() {
        let data = vec![10.0, 12.0, 14.0, 16.0, 18.0];
        assert_eq!(mean(&data), 14.0);
        assert!((population_std(&data) - 8.0_f64.sqrt()).abs() < 1e-12);
        assert!((sample_std(&data) - 10.0_f64.sqrt()).abs() < 1e-12);
        assert!(mean(&[]).is_nan());
    }

    #[test]
    fn test_log_returns() {
        let r = log_returns(&[100.0, 110.0, 0.0, 121.0]);
        assert_eq!(r.len(), 1);
        assert!((r[0] - 1.1_f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_find_quantile() {
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        assert_eq!(find_quantile(&data, 0.5), 5.0);
        assert_eq!(find_quantile(&data, 0.95), 10.0);
    }
}
