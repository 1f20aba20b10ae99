//! Adds the standard indicator columns to a primary OHLCV table.

use crate::levels::{local_extrema, nearest_levels, Extrema, SupportResistance};
use crate::oscillators::{macd, rsi, MacdConfig};
use crate::trend::{ema, moving_average};
use crate::volatility::{bollinger_bands, return_volatility};
use log::debug;
use serde::{Deserialize, Serialize};
use table::{TableError, TimeSeriesTable};

pub const SMA_SHORT: &str = "sma_short";
pub const SMA_LONG: &str = "sma_long";
pub const EMA: &str = "ema";
pub const RSI: &str = "rsi";
pub const MACD: &str = "macd";
pub const MACD_SIGNAL: &str = "macd_signal";
pub const MACD_HISTOGRAM: &str = "macd_histogram";
pub const BB_UPPER: &str = "bb_upper";
pub const BB_MIDDLE: &str = "bb_middle";
pub const BB_LOWER: &str = "bb_lower";
pub const VOLATILITY: &str = "volatility";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub sma_short: usize,
    pub sma_long: usize,
    pub ema_period: usize,
    pub rsi_period: usize,
    pub macd: MacdConfig,
    pub bollinger_period: usize,
    pub bollinger_k: f64,
    pub volatility_lookback: usize,
    pub extrema_window: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            sma_short: 20,
            sma_long: 50,
            ema_period: 20,
            rsi_period: 14,
            macd: MacdConfig::default(),
            bollinger_period: 20,
            bollinger_k: 2.0,
            volatility_lookback: 20,
            extrema_window: 5,
        }
    }
}

/// Returns a copy of `table` with every indicator column appended.
///
/// Needs a numeric `close` column. Leading entries without enough history
/// are stored as `Cell::Warmup`.
pub fn enrich(
    table: &TimeSeriesTable,
    config: &IndicatorConfig,
) -> Result<TimeSeriesTable, TableError> {
    let closes = table.values("close")?;
    let bands = bollinger_bands(&closes, config.bollinger_period, config.bollinger_k);
    let m = macd(&closes, config.macd);

    debug!(
        "computing indicators over {} rows (sma {}/{}, rsi {})",
        closes.len(),
        config.sma_short,
        config.sma_long,
        config.rsi_period
    );

    table
        .clone()
        .with_indicator(SMA_SHORT, &moving_average(&closes, config.sma_short))?
        .with_indicator(SMA_LONG, &moving_average(&closes, config.sma_long))?
        .with_indicator(EMA, &ema(&closes, config.ema_period))?
        .with_indicator(RSI, &rsi(&closes, config.rsi_period))?
        .with_indicator(MACD, &m.macd_line)?
        .with_indicator(MACD_SIGNAL, &m.signal_line)?
        .with_indicator(MACD_HISTOGRAM, &m.histogram)?
        .with_indicator(BB_UPPER, &bands.upper)?
        .with_indicator(BB_MIDDLE, &bands.middle)?
        .with_indicator(BB_LOWER, &bands.lower)?
        .with_indicator(VOLATILITY, &return_volatility(&closes, config.volatility_lookback))
}

/// Support/resistance candidates of the close series and the levels nearest
/// to the last close.
pub fn support_resistance(
    table: &TimeSeriesTable,
    window: usize,
) -> Result<(Extrema, SupportResistance), TableError> {
    let closes = table.values("close")?;
    let extrema = local_extrema(&closes, window);
    let last = closes.iter().rev().copied().find(|v| v.is_finite());
    let levels = match last {
        Some(price) => nearest_levels(&closes, &extrema, price),
        None => SupportResistance::default(),
    };
    Ok((extrema, levels))
}
