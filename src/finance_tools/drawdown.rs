use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use stats::find_quantile;

/// Largest fractional decline of an equity curve.
fn equity_drawdown(returns: &[f64]) -> f64 {
    let mut equity = 1.0;
    let mut peak = 1.0;
    let mut worst = 0.0;

    for r in returns {
        equity *= 1.0 + r;
        if equity > peak {
            peak = equity;
        }
        let dd = (peak - equity) / peak;
        if dd > worst {
            worst = dd;
        }
    }

    worst
}

/// Monte Carlo estimate of the maximum drawdown, as a fraction of equity.
///
/// Each simulated trade risks `risk_per_trade` of equity and wins
/// `risk_per_trade * win_loss_ratio` with probability `win_rate`. Returns the
/// `quantile` (e.g. 0.95) of the per-path maximum drawdown over `n_trades`
/// trades and `n_paths` paths. Deterministic for a given `seed`.
pub fn estimate_max_drawdown(
    win_rate: f64,
    win_loss_ratio: f64,
    risk_per_trade: f64,
    n_trades: usize,
    n_paths: usize,
    quantile: f64,
    seed: u64,
) -> f64 {
    if n_trades == 0 || n_paths == 0 {
        return 0.0;
    }

    let win_rate = win_rate.clamp(0.0, 1.0);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut returns = Vec::with_capacity(n_trades);
    let mut work = Vec::with_capacity(n_paths);

    for _ in 0..n_paths {
        returns.clear();
        for _ in 0..n_trades {
            let r = if rng.gen_bool(win_rate) {
                risk_per_trade * win_loss_ratio
            } else {
                -risk_per_trade
            };
            returns.push(r);
        }
        work.push(equity_drawdown(&returns));
    }

    work.sort_by(|a, b| a.total_cmp(b));
    find_quantile(&work, quantile)
}

/// Consecutive full-risk losses needed before equity is down by `threshold`
/// (0.05 = 5%). `None` when a loss cannot reduce equity.
pub fn losses_to_breach(risk_per_trade: f64, threshold: f64) -> Option<u32> {
    if risk_per_trade <= 0.0 || threshold <= 0.0 {
        return None;
    }
    if risk_per_trade >= 1.0 || risk_per_trade >= threshold {
        return Some(1);
    }

    let n = ((1.0 - threshold).ln() / (1.0 - risk_per_trade).ln()).ceil();
    Some(n as u32)
}
