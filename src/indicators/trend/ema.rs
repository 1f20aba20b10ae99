/// Exponential moving average seeded with the first value.
///
/// `ema[0] = data[0]`, then `ema[i] = data[i] * k + ema[i-1] * (1 - k)` with
/// `k = 2 / (period + 1)`. Unlike the SMA there is no warm-up gap.
///
/// Leading NaN inputs stay NaN and the seed moves to the first finite value;
/// a NaN after the seed carries the previous EMA forward.
pub fn ema(data: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; data.len()];
    if period == 0 {
        return out;
    }

    let Some(start) = data.iter().position(|v| !v.is_nan()) else {
        return out;
    };

    let k = 2.0 / (period as f64 + 1.0);
    let mut prev = data[start];
    out[start] = prev;

    for i in start + 1..data.len() {
        if !data[i].is_nan() {
            prev = data[i] * k + prev * (1.0 - k);
        }
        out[i] = prev;
    }

    out
}
