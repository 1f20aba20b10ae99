/// Calculates the Simple Moving Average (SMA) for a given data slice and number of lags.
///
/// # Arguments
///
/// * `data` - A slice of f64 values.
/// * `lags` - The window size for the moving average.
///
/// # Returns
///
/// A Vec<f64> containing the SMA values. The first `lags - 1` values are NaN.
/// A window containing a NaN input produces NaN.
pub fn moving_average(data: &[f64], lags: usize) -> Vec<f64> {
    if lags == 0 || lags > data.len() {
        return vec![f64::NAN; data.len()];
    }

    let mut sma = Vec::with_capacity(data.len());

    // Pad with NaN for the initial period where we don't have enough data
    for _ in 0..lags - 1 {
        sma.push(f64::NAN);
    }

    // A NaN poisons the running sum, so rebuild it from the window instead.
    let mut sum: f64 = data.iter().take(lags).sum();
    sma.push(sum / lags as f64);

    for i in lags..data.len() {
        if sum.is_nan() {
            sum = data[i + 1 - lags..=i].iter().sum();
        } else {
            sum = sum - data[i - lags] + data[i];
        }
        sma.push(sum / lags as f64);
    }

    sma
}

/// Rolling population standard deviation over the trailing `lags` values.
/// The first `lags - 1` values are NaN.
pub fn rolling_std(data: &[f64], lags: usize) -> Vec<f64> {
    if lags == 0 || lags > data.len() {
        return vec![f64::NAN; data.len()];
    }

    let mut out = vec![f64::NAN; data.len()];
    for i in lags - 1..data.len() {
        out[i] = stats::population_std(&data[i + 1 - lags..=i]);
    }
    out
}
