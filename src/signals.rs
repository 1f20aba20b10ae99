//! Per-timestamp trading signals and their buy/sell aggregates.
//!
//! A signal is only computable at `t` when every cell it reads (including
//! `t - 1` for crossovers) is known. The aggregate compares fired signals to
//! computable ones, so a missing auxiliary source lowers the denominator
//! instead of counting as "not fired".

use indicators::enrich::{BB_LOWER, BB_UPPER, MACD_HISTOGRAM, RSI, SMA_LONG, SMA_SHORT};
use serde::{Deserialize, Serialize};
use table::{Cell, Column, TableError, TimeSeriesTable};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    /// Fear/greed index is 0..=100
    pub extreme_fear: f64,
    pub extreme_greed: f64,
    /// MVRV below this is a buy zone
    pub onchain_buy_below: f64,
    pub onchain_sell_above: f64,
    pub sentiment_column: String,
    pub onchain_column: String,
    pub aggregate_threshold: f64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            extreme_fear: 25.0,
            extreme_greed: 75.0,
            onchain_buy_below: 1.0,
            onchain_sell_above: 3.5,
            sentiment_column: "fear_greed".to_string(),
            onchain_column: "mvrv".to_string(),
            aggregate_threshold: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalRow {
    pub timestamp: i64,
    pub golden_cross: bool,
    pub death_cross: bool,
    pub rsi_oversold: bool,
    pub rsi_overbought: bool,
    pub macd_bullish_cross: bool,
    pub macd_bearish_cross: bool,
    pub below_lower_band: bool,
    pub above_upper_band: bool,
    pub extreme_fear: bool,
    pub extreme_greed: bool,
    pub onchain_buy_zone: bool,
    pub onchain_sell_zone: bool,
    pub buy_signal: bool,
    pub sell_signal: bool,
    /// Fired over computable buy signals, 0 when none is computable
    pub buy_confidence: f64,
    pub sell_confidence: f64,
}

type Col<'a> = Option<&'a [Cell]>;

fn column<'a>(table: &'a TimeSeriesTable, name: &str) -> Col<'a> {
    table.get(name).ok().and_then(Column::as_numeric)
}

fn at(col: Col<'_>, t: usize) -> Option<f64> {
    col.and_then(|c| c.get(t)).and_then(|c| c.value())
}

/// `(rose above zero, fell below zero)` between two consecutive values.
fn sign_flip(prev: Option<f64>, cur: Option<f64>) -> Option<(bool, bool)> {
    let (prev, cur) = (prev?, cur?);
    Some((prev <= 0.0 && cur > 0.0, prev >= 0.0 && cur < 0.0))
}

/// `(signal, confidence)` for one side.
fn aggregate(signals: &[Option<bool>], threshold: f64) -> (bool, f64) {
    let computable = signals.iter().flatten().count();
    let fired = signals.iter().flatten().filter(|&&s| s).count();
    if computable == 0 {
        return (false, 0.0);
    }
    let confidence = fired as f64 / computable as f64;
    (fired >= 1 && confidence >= threshold, confidence)
}

/// One row per timestamp of `table`. Columns that are absent make their
/// signals non-computable everywhere.
pub fn compute_signals(table: &TimeSeriesTable, config: &SignalConfig) -> Vec<SignalRow> {
    let close = column(table, "close");
    let sma_short = column(table, SMA_SHORT);
    let sma_long = column(table, SMA_LONG);
    let rsi = column(table, RSI);
    let hist = column(table, MACD_HISTOGRAM);
    let lower = column(table, BB_LOWER);
    let upper = column(table, BB_UPPER);
    let sentiment = column(table, &config.sentiment_column);
    let onchain = column(table, &config.onchain_column);

    table
        .timestamps()
        .iter()
        .enumerate()
        .map(|(t, &timestamp)| {
            let spread = |i: usize| Some(at(sma_short, i)? - at(sma_long, i)?);
            let (ma, macd) = match t.checked_sub(1) {
                Some(p) => (
                    sign_flip(spread(p), spread(t)),
                    sign_flip(at(hist, p), at(hist, t)),
                ),
                None => (None, None),
            };
            let rsi_v = at(rsi, t);
            let band_low = at(close, t).zip(at(lower, t)).map(|(c, l)| c < l);
            let band_high = at(close, t).zip(at(upper, t)).map(|(c, u)| c > u);
            let fear = at(sentiment, t).map(|v| v < config.extreme_fear);
            let greed = at(sentiment, t).map(|v| v > config.extreme_greed);
            let chain_buy = at(onchain, t).map(|v| v < config.onchain_buy_below);
            let chain_sell = at(onchain, t).map(|v| v > config.onchain_sell_above);
            let oversold = rsi_v.map(|v| v < config.rsi_oversold);
            let overbought = rsi_v.map(|v| v > config.rsi_overbought);

            let buy = [
                ma.map(|m| m.0),
                oversold,
                macd.map(|m| m.0),
                band_low,
                fear,
                chain_buy,
            ];
            let sell = [
                ma.map(|m| m.1),
                overbought,
                macd.map(|m| m.1),
                band_high,
                greed,
                chain_sell,
            ];
            let (buy_signal, buy_confidence) = aggregate(&buy, config.aggregate_threshold);
            let (sell_signal, sell_confidence) = aggregate(&sell, config.aggregate_threshold);

            SignalRow {
                timestamp,
                golden_cross: buy[0].unwrap_or(false),
                death_cross: sell[0].unwrap_or(false),
                rsi_oversold: oversold.unwrap_or(false),
                rsi_overbought: overbought.unwrap_or(false),
                macd_bullish_cross: buy[2].unwrap_or(false),
                macd_bearish_cross: sell[2].unwrap_or(false),
                below_lower_band: band_low.unwrap_or(false),
                above_upper_band: band_high.unwrap_or(false),
                extreme_fear: fear.unwrap_or(false),
                extreme_greed: greed.unwrap_or(false),
                onchain_buy_zone: chain_buy.unwrap_or(false),
                onchain_sell_zone: chain_sell.unwrap_or(false),
                buy_signal,
                sell_signal,
                buy_confidence,
                sell_confidence,
            }
        })
        .collect()
}

/// Returns `table` with `buy_signal` and `sell_signal` flag columns appended.
pub fn with_signal_flags(
    table: TimeSeriesTable,
    rows: &[SignalRow],
) -> Result<TimeSeriesTable, TableError> {
    let buys = rows.iter().map(|r| r.buy_signal).collect();
    let sells = rows.iter().map(|r| r.sell_signal).collect();
    table
        .with_column("buy_signal", Column::Flag(buys))?
        .with_column("sell_signal", Column::Flag(sells))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(n: usize) -> TimeSeriesTable {
        TimeSeriesTable::new((0..n as i64).collect())
            .unwrap()
            .with_column("close", Column::from_observations(&vec![100.0; n]))
            .unwrap()
    }

    #[test]
    fn test_golden_and_death_cross() {
        let table = base(4)
            .with_indicator(SMA_SHORT, &[1.0, 2.0, 3.0, 1.0])
            .unwrap()
            .with_indicator(SMA_LONG, &[2.0, 2.0, 2.0, 2.0])
            .unwrap();
        let rows = compute_signals(&table, &SignalConfig::default());

        assert!(!rows[0].golden_cross);
        assert!(!rows[1].golden_cross);
        assert!(rows[2].golden_cross);
        assert!(rows[3].death_cross);
        // the cross is the only computable buy signal, so it carries the aggregate
        assert!(rows[2].buy_signal);
        assert_eq!(rows[2].buy_confidence, 1.0);
        assert!(rows[3].sell_signal);
    }

    #[test]
    fn test_warmup_blocks_cross() {
        let table = base(3)
            .with_indicator(SMA_SHORT, &[f64::NAN, 3.0, 3.0])
            .unwrap()
            .with_indicator(SMA_LONG, &[2.0, 2.0, 2.0])
            .unwrap();
        let rows = compute_signals(&table, &SignalConfig::default());
        assert!(!rows[1].golden_cross);
        assert_eq!(rows[1].buy_confidence, 0.0);
        assert!(!rows[1].buy_signal);
    }

    #[test]
    fn test_thresholds_and_macd() {
        let table = base(2)
            .with_indicator(RSI, &[50.0, 25.0])
            .unwrap()
            .with_indicator(MACD_HISTOGRAM, &[-0.5, 0.2])
            .unwrap()
            .with_indicator(BB_LOWER, &[90.0, 101.0])
            .unwrap()
            .with_indicator(BB_UPPER, &[110.0, 120.0])
            .unwrap()
            .with_column("fear_greed", Column::from_observations(&[50.0, 80.0]))
            .unwrap()
            .with_column("mvrv", Column::from_observations(&[2.0, 0.8]))
            .unwrap();
        let rows = compute_signals(&table, &SignalConfig::default());
        let r = &rows[1];

        assert!(r.rsi_oversold && !r.rsi_overbought);
        assert!(r.macd_bullish_cross && !r.macd_bearish_cross);
        assert!(r.below_lower_band && !r.above_upper_band);
        assert!(r.extreme_greed && !r.extreme_fear);
        assert!(r.onchain_buy_zone);

        // buy: rsi, macd, band, onchain fired out of 5 computable (no sma columns)
        assert!((r.buy_confidence - 0.8).abs() < 1e-12);
        assert!(r.buy_signal);
        // sell: only greed out of 5
        assert!((r.sell_confidence - 0.2).abs() < 1e-12);
        assert!(!r.sell_signal);
    }

    #[test]
    fn test_nothing_computable_is_not_a_signal() {
        let rows = compute_signals(&base(3), &SignalConfig::default());
        assert!(rows.iter().all(|r| !r.buy_signal && !r.sell_signal));
        assert_eq!(aggregate(&[None, None], 0.5), (false, 0.0));
        assert_eq!(aggregate(&[Some(false), Some(false)], 0.0), (false, 0.0));
    }

    #[test]
    fn test_flag_columns() {
        let table = base(2);
        let rows = compute_signals(&table, &SignalConfig::default());
        let flagged = with_signal_flags(table, &rows).unwrap();
        assert_eq!(flagged.get("buy_signal").unwrap(), &Column::Flag(vec![false, false]));
        assert!(flagged.numeric("buy_signal").is_err());
    }
}
