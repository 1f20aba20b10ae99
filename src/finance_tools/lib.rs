pub mod analysis;
pub mod drawdown;
pub mod probability;
pub mod risk;

pub use analysis::{analyze_position, RiskAnalysis, RiskError, RiskParams};
pub use drawdown::{estimate_max_drawdown, losses_to_breach};
pub use probability::barrier_hit_probability;
pub use risk::{
    kelly_percentage, position_size, risk_reward_ratio, stop_loss, take_profit_levels,
    RATIO_CEILING,
};
