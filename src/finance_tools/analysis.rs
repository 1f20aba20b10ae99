use crate::drawdown::{estimate_max_drawdown, losses_to_breach};
use crate::probability::barrier_hit_probability;
use crate::risk::{
    kelly_percentage, position_size, risk_reward_ratio, stop_loss, take_profit_levels,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum RiskError {
    #[error("entry price must be positive and finite, got {0}")]
    InvalidEntry(f64),
    #[error("invalid risk parameter {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },
}

/// Inputs to [`analyze_position`] that do not depend on market data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskParams {
    /// Stop distance below entry (0.05 = 5%)
    pub stop_loss_pct: f64,
    pub take_profit_ratios: Vec<f64>,
    pub portfolio_value: f64,
    pub risk_per_trade: f64,
    pub win_rate: f64,
    pub win_loss_ratio: f64,
    /// Days over which level-hit probabilities are evaluated
    pub horizon_days: f64,
    pub simulations: usize,
    pub trades_per_simulation: usize,
    pub drawdown_quantile: f64,
    pub breach_threshold: f64,
    pub seed: u64,
}

impl Default for RiskParams {
    fn default() -> Self {
        Self {
            stop_loss_pct: 0.05,
            take_profit_ratios: vec![1.5, 2.0, 3.0],
            portfolio_value: 10_000.0,
            risk_per_trade: 0.02,
            win_rate: 0.55,
            win_loss_ratio: 2.0,
            horizon_days: 30.0,
            simulations: 1000,
            trades_per_simulation: 100,
            drawdown_quantile: 0.95,
            breach_threshold: 0.05,
            seed: 42,
        }
    }
}

impl RiskParams {
    pub fn validate(&self) -> Result<(), RiskError> {
        let fraction = |name, value: f64| {
            if value > 0.0 && value < 1.0 {
                Ok(())
            } else {
                Err(RiskError::InvalidParameter { name, value })
            }
        };
        fraction("stop_loss_pct", self.stop_loss_pct)?;
        fraction("risk_per_trade", self.risk_per_trade)?;
        fraction("drawdown_quantile", self.drawdown_quantile)?;
        fraction("breach_threshold", self.breach_threshold)?;

        if !(0.0..=1.0).contains(&self.win_rate) {
            return Err(RiskError::InvalidParameter { name: "win_rate", value: self.win_rate });
        }
        if !(self.portfolio_value > 0.0) {
            return Err(RiskError::InvalidParameter {
                name: "portfolio_value",
                value: self.portfolio_value,
            });
        }
        if let Some(&bad) = self.take_profit_ratios.iter().find(|r| !(**r > 0.0)) {
            return Err(RiskError::InvalidParameter { name: "take_profit_ratios", value: bad });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAnalysis {
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit_levels: Vec<f64>,
    pub position_size: f64,
    pub max_drawdown_estimate: f64,
    pub kelly_percentage: f64,
    pub risk_reward_ratios: Vec<f64>,
    pub probability_of_reaching_each_level: Vec<f64>,
    pub consecutive_losses_to_breach_5pct_drawdown: Option<u32>,
    pub risk_per_unit: f64,
}

/// Builds the full risk picture for a long entry at `entry`.
///
/// `daily_vol` is the standard deviation of daily log returns; it only feeds
/// the level-hit probabilities.
pub fn analyze_position(
    entry: f64,
    params: &RiskParams,
    daily_vol: f64,
) -> Result<RiskAnalysis, RiskError> {
    if !(entry > 0.0) || !entry.is_finite() {
        return Err(RiskError::InvalidEntry(entry));
    }
    params.validate()?;

    let stop = stop_loss(entry, params.stop_loss_pct);
    let levels = take_profit_levels(entry, stop, &params.take_profit_ratios);
    let size = position_size(params.portfolio_value, params.risk_per_trade, entry, stop).ok_or(
        RiskError::InvalidParameter {
            name: "stop_loss_pct",
            value: params.stop_loss_pct,
        },
    )?;

    let risk_reward_ratios = levels.iter().map(|&t| risk_reward_ratio(entry, t, stop)).collect();
    let probabilities = levels
        .iter()
        .map(|&t| barrier_hit_probability(entry, t, daily_vol, params.horizon_days))
        .collect();

    let max_dd = estimate_max_drawdown(
        params.win_rate,
        params.win_loss_ratio,
        params.risk_per_trade,
        params.trades_per_simulation,
        params.simulations,
        params.drawdown_quantile,
        params.seed,
    );

    Ok(RiskAnalysis {
        entry_price: entry,
        stop_loss: stop,
        take_profit_levels: levels,
        position_size: size,
        max_drawdown_estimate: max_dd,
        kelly_percentage: kelly_percentage(params.win_rate, params.win_loss_ratio),
        risk_reward_ratios,
        probability_of_reaching_each_level: probabilities,
        consecutive_losses_to_breach_5pct_drawdown: losses_to_breach(
            params.risk_per_trade,
            params.breach_threshold,
        ),
        risk_per_unit: entry - stop,
    })
}
