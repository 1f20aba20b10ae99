/// Calculates the Relative Strength Index (RSI) for a given data slice and period.
///
/// Gains and losses are averaged over the trailing `period` price changes
/// (simple mean, not Wilder smoothing). When the average loss is zero the RSI
/// is defined as 100.
///
/// # Arguments
///
/// * `data` - A slice of f64 values (prices).
/// * `period` - The lookback period for RSI (typically 14).
///
/// # Returns
///
/// A Vec<f64> containing the RSI values. The first `period` values are NaN.
pub fn rsi(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || period >= data.len() {
        return vec![f64::NAN; data.len()];
    }

    let mut rsi_values = vec![f64::NAN; data.len()];

    let changes: Vec<f64> = data.windows(2).map(|w| w[1] - w[0]).collect();

    // changes[i - 1] is the move into data[i]
    for i in period..data.len() {
        let window = &changes[i - period..i];
        if window.iter().any(|c| c.is_nan()) {
            continue;
        }

        let gains: f64 = window.iter().map(|&c| c.max(0.0)).sum();
        let losses: f64 = window.iter().map(|&c| (-c).max(0.0)).sum();
        let avg_gain = gains / period as f64;
        let avg_loss = losses / period as f64;

        rsi_values[i] = if avg_loss == 0.0 {
            100.0
        } else {
            let rs = avg_gain / avg_loss;
            100.0 - (100.0 / (1.0 + rs))
        };
    }

    rsi_values
}
