use serde::{Deserialize, Serialize};

/// Error metrics of a set of predictions against actuals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub mse: f64,
    pub mae: f64,
    pub rmse: f64,
    /// NaN when the actuals have zero variance.
    pub r2: f64,
}

/// Computes MSE, MAE, RMSE and R² of `predicted` against `actual`.
///
/// Both slices must have the same, non-zero length; otherwise every metric is NaN.
pub fn regression_metrics(actual: &[f64], predicted: &[f64]) -> RegressionMetrics {
    let n = actual.len();
    if n == 0 || n != predicted.len() {
        return RegressionMetrics {
            mse: f64::NAN,
            mae: f64::NAN,
            rmse: f64::NAN,
            r2: f64::NAN,
        };
    }

    let mut ss_res = 0.0;
    let mut abs_sum = 0.0;
    for (&a, &p) in actual.iter().zip(predicted) {
        let err = a - p;
        ss_res += err * err;
        abs_sum += err.abs();
    }

    let mean_actual = actual.iter().sum::<f64>() / n as f64;
    let ss_tot: f64 = actual.iter().map(|&a| (a - mean_actual).powi(2)).sum();

    let mse = ss_res / n as f64;
    let r2 = if ss_tot == 0.0 {
        f64::NAN
    } else {
        1.0 - ss_res / ss_tot
    };

    RegressionMetrics {
        mse,
        mae: abs_sum / n as f64,
        rmse: mse.sqrt(),
        r2,
    }
}
