//! One forecasting run: fetch, enrich, align, train, forecast, signals, risk.
//!
//! [`Pipeline::collect`] is the only async part. Everything after it is the
//! synchronous [`run_offline`], which can also be fed from files or tests.

use crate::config::Config;
use crate::error::{PipelineError, PipelineWarning, Result};
use crate::features::{build_features, feature_rows, FeatureSpec};
use crate::predictor::{ForecastResult, Predictor, TrainingHistory};
use crate::scaler::ScalerPair;
use crate::signals::{compute_signals, with_signal_flags, SignalRow};
use crate::windows::{last_window, make_windows, split_train_test};
use data_streamer::bybit::interval_to_millis;
use data_streamer::{OnChainSource, PriceSource, ReserveSource, SentimentSource, SourceError};
use finance_tools::{analyze_position, RiskAnalysis};
use indicators::enrich::VOLATILITY;
use indicators::{
    enrich, fibonacci_levels, support_resistance, FibonacciLevel, SupportResistance, Trend,
};
use log::{debug, info, warn};
use serde::Serialize;
use stats::RegressionMetrics;
use table::{align, AuxPoint, AuxSeries, OhlcvRow, TimeSeriesTable};

pub const RESERVES_COLUMN: &str = "exchange_reserves";

const QUOTE_ASSETS: [&str; 5] = ["USDT", "USDC", "BUSD", "USD", "PERP"];

/// `BTCUSDT` -> `BTC`. Symbols without a known quote suffix are returned as is.
pub fn base_asset(symbol: &str) -> &str {
    QUOTE_ASSETS
        .iter()
        .find_map(|quote| symbol.strip_suffix(quote).filter(|base| !base.is_empty()))
        .unwrap_or(symbol)
}

/// Everything the sources delivered, before any table is built.
#[derive(Debug, Clone, Default)]
pub struct RawInputs {
    pub ohlcv: Vec<OhlcvRow>,
    pub auxiliaries: Vec<AuxSeries>,
    pub warnings: Vec<PipelineWarning>,
}

impl RawInputs {
    pub fn new(ohlcv: Vec<OhlcvRow>) -> Self {
        Self {
            ohlcv,
            ..Default::default()
        }
    }

    pub fn with_auxiliary(mut self, series: AuxSeries) -> Self {
        self.auxiliaries.push(series);
        self
    }

    fn accept(
        &mut self,
        source_name: &str,
        column: &str,
        result: std::result::Result<Vec<AuxPoint>, SourceError>,
    ) {
        match result {
            Ok(points) if !points.is_empty() => {
                info!("{}: {} points for '{}'", source_name, points.len(), column);
                self.auxiliaries.push(AuxSeries::new(column, points));
            }
            Ok(_) => self.skip(source_name, "returned no data".to_string()),
            Err(e) => self.skip(source_name, e.to_string()),
        }
    }

    fn skip(&mut self, source_name: &str, reason: String) {
        let warning = PipelineWarning::AuxiliaryUnavailable {
            source_name: source_name.to_string(),
            reason,
        };
        warn!("{}", warning);
        self.warnings.push(warning);
    }
}

/// Immutable result of one run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub symbol: String,
    pub generated_at: String,
    /// Features the model was actually trained on
    pub features: Vec<String>,
    /// Aligned table with indicator, auxiliary and signal flag columns
    pub table: TimeSeriesTable,
    pub training: TrainingHistory,
    /// `None` when the split left no test windows
    pub metrics: Option<RegressionMetrics>,
    pub forecast: ForecastResult,
    pub signals: Vec<SignalRow>,
    pub risk: RiskAnalysis,
    pub support_resistance: SupportResistance,
    pub fibonacci: Vec<FibonacciLevel>,
    pub warnings: Vec<PipelineWarning>,
}

impl PipelineReport {
    pub fn latest_signal(&self) -> Option<&SignalRow> {
        self.signals.last()
    }
}

/// A single run over injected source clients.
pub struct Pipeline<P, O, S, R> {
    config: Config,
    price: P,
    onchain: O,
    sentiment: S,
    reserves: R,
}

impl<P, O, S, R> Pipeline<P, O, S, R>
where
    P: PriceSource,
    O: OnChainSource,
    S: SentimentSource,
    R: ReserveSource,
{
    pub fn new(config: Config, price: P, onchain: O, sentiment: S, reserves: R) -> Self {
        Self {
            config,
            price,
            onchain,
            sentiment,
            reserves,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn run(&self) -> Result<PipelineReport> {
        let inputs = self.collect().await?;
        run_offline(&self.config, inputs)
    }

    /// Fetches prices, on-chain data and sentiment concurrently, then the
    /// reserves for the price timestamps.
    ///
    /// Only the price source is required. A failing or empty auxiliary source
    /// becomes an `AuxiliaryUnavailable` warning; the on-chain source is not
    /// called at all without a credential.
    pub async fn collect(&self) -> Result<RawInputs> {
        let config = &self.config;
        let asset = base_asset(&config.symbol);

        let onchain = async {
            if self.onchain.has_credential() {
                Some(self.onchain.fetch_metric(asset, &config.onchain_metric, None).await)
            } else {
                None
            }
        };
        let (price, onchain, sentiment) = tokio::join!(
            self.price.fetch_ohlcv(&config.symbol, &config.timeframe, config.limit),
            onchain,
            self.sentiment.fetch_index(config.limit),
        );

        let mut ohlcv = price.map_err(|error| PipelineError::Source {
            source_name: self.price.name().to_string(),
            error,
        })?;
        if ohlcv.is_empty() {
            return Err(PipelineError::DataUnavailable {
                symbol: config.symbol.clone(),
                source_name: self.price.name().to_string(),
            });
        }
        ohlcv.sort_by_key(|r| r.timestamp);
        ohlcv.dedup_by_key(|r| r.timestamp);
        info!("{}: {} candles for {}", self.price.name(), ohlcv.len(), config.symbol);

        let mut inputs = RawInputs::new(ohlcv);
        match onchain {
            Some(result) => {
                inputs.accept(self.onchain.name(), &config.signals.onchain_column, result)
            }
            None => inputs.skip(self.onchain.name(), "no credential configured".to_string()),
        }
        inputs.accept(self.sentiment.name(), &config.signals.sentiment_column, sentiment);

        let timestamps: Vec<i64> = inputs.ohlcv.iter().map(|r| r.timestamp).collect();
        let reserves = self.reserves.fetch_reserves(asset, &timestamps).await;
        inputs.accept(self.reserves.name(), RESERVES_COLUMN, reserves);

        Ok(inputs)
    }
}

/// Runs every synchronous stage over already-fetched inputs.
pub fn run_offline(config: &Config, inputs: RawInputs) -> Result<PipelineReport> {
    let RawInputs {
        ohlcv,
        auxiliaries,
        mut warnings,
    } = inputs;
    if ohlcv.is_empty() {
        return Err(PipelineError::DataUnavailable {
            symbol: config.symbol.clone(),
            source_name: "inputs".to_string(),
        });
    }

    let primary = TimeSeriesTable::from_ohlcv(&ohlcv)?;
    let enriched = enrich(&primary, &config.indicators)?;

    let mut aux_tables = Vec::with_capacity(auxiliaries.len());
    for series in &auxiliaries {
        match TimeSeriesTable::from_aux(series) {
            Ok(table) => aux_tables.push(table),
            Err(e) => {
                let warning = PipelineWarning::AuxiliaryUnavailable {
                    source_name: series.name.clone(),
                    reason: e.to_string(),
                };
                warn!("{}", warning);
                warnings.push(warning);
            }
        }
    }

    let aligned = align(&enriched, &aux_tables)?;
    warnings.extend(
        aligned
            .dropped
            .into_iter()
            .map(|column| PipelineWarning::ColumnDropped { column }),
    );
    let combined = aligned.table;

    let spec = FeatureSpec {
        target: config.target.clone(),
        features: config.features.clone(),
        horizon: config.horizon,
        window_length: config.window_length,
    };
    let (spec, omitted) = spec.omit_unavailable(&combined, &config.auxiliary_columns());
    warnings.extend(omitted);

    let feature_set = build_features(&combined, &spec)?;
    let scalers = ScalerPair::fit(config.scaler_range, feature_set.x.view(), feature_set.y.view())?;
    for col in scalers.features.degenerate_columns() {
        let warning = PipelineWarning::DegenerateColumn {
            column: spec.features[col].clone(),
        };
        warn!("{}", warning);
        warnings.push(warning);
    }
    let x = scalers.features.transform(feature_set.x.view())?;
    let y = scalers.target.transform_column(feature_set.y.view())?;

    let dataset = make_windows(x.view(), y.view(), spec.window_length)?;
    let (train, test) = split_train_test(&dataset, config.train_ratio)?;
    info!(
        "{} complete rows, {} windows ({} train, {} test)",
        feature_set.len(),
        dataset.len(),
        train.len(),
        test.len()
    );

    let model = Predictor::build((spec.window_length, spec.features.len()), &config.model)?.fit(
        &train,
        config.epochs,
        config.batch_size,
        config.validation_split,
    )?;
    let metrics = if test.is_empty() {
        warn!("no test windows, skipping evaluation");
        None
    } else {
        Some(model.evaluate(&test, &scalers)?)
    };

    let target_slot = spec.target_slot().ok_or_else(|| PipelineError::Alignment {
        stage: "forecast",
        column: spec.target.clone(),
    })?;
    let (row_timestamps, rows) = feature_rows(&combined, &spec.features)?;
    let window = last_window(scalers.features.transform(rows.view())?.view(), spec.window_length)?;
    let forecast = ForecastResult {
        last_timestamp: row_timestamps.last().copied().unwrap_or_default(),
        step_millis: step_millis(combined.timestamps(), &config.timeframe),
        horizon: config.horizon,
        values: model.forecast(window.view(), config.forecast_steps, &scalers, target_slot)?,
    };
    debug!("forecast: {:?}", forecast.values);

    let signals = compute_signals(&combined, &config.signals);

    let closes = combined.values("close")?;
    let entry = closes
        .iter()
        .rev()
        .copied()
        .find(|v| v.is_finite())
        .ok_or_else(|| PipelineError::DataUnavailable {
            symbol: config.symbol.clone(),
            source_name: "close".to_string(),
        })?;
    let risk = analyze_position(entry, &config.risk, last_volatility(&combined, &closes))?;

    let (_, levels) = support_resistance(&combined, config.indicators.extrema_window)?;
    let fibonacci = fibonacci_levels(
        &combined.values("high")?,
        &combined.values("low")?,
        Trend::from_closes(&closes),
    );

    let training = model.history().cloned().unwrap_or_default();
    let table = with_signal_flags(combined, &signals)?;

    Ok(PipelineReport {
        symbol: config.symbol.clone(),
        generated_at: chrono::Utc::now().to_rfc3339(),
        features: spec.features,
        table,
        training,
        metrics,
        forecast,
        signals,
        risk,
        support_resistance: levels,
        fibonacci,
        warnings,
    })
}

/// Spacing of the last two rows, or the nominal candle interval.
fn step_millis(timestamps: &[i64], timeframe: &str) -> i64 {
    timestamps
        .windows(2)
        .last()
        .map(|w| w[1] - w[0])
        .unwrap_or_else(|| interval_to_millis(timeframe))
}

/// Per-candle volatility of log returns: the latest rolling value, or the
/// whole history when the rolling column never warmed up.
fn last_volatility(table: &TimeSeriesTable, closes: &[f64]) -> f64 {
    table
        .numeric(VOLATILITY)
        .ok()
        .and_then(|cells| cells.iter().rev().find_map(|c| c.value()))
        .unwrap_or_else(|| {
            let finite: Vec<f64> = closes.iter().copied().filter(|v| v.is_finite()).collect();
            stats::sample_std(&stats::log_returns(&finite))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: i64 = 86_400_000;

    fn candles(n: usize) -> Vec<OhlcvRow> {
        (0..n)
            .map(|i| {
                let close = 100.0 + (i as f64 * 0.2).sin() * 8.0 + i as f64 * 0.05;
                OhlcvRow {
                    timestamp: 1_600_041_600_000 + i as i64 * DAY,
                    open: close - 0.3,
                    high: close + 1.0,
                    low: close - 1.0,
                    close,
                    volume: 1_000.0 + (i % 7) as f64 * 10.0,
                }
            })
            .collect()
    }

    fn small_config() -> Config {
        let mut config = Config::default();
        config.window_length = 10;
        config.epochs = 3;
        config.batch_size = 16;
        config.forecast_steps = 3;
        config.features = ["close", "rsi", "fear_greed", "mvrv", "exchange_reserves"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        config.model.units = 8;
        config.model.dropout = 0.0;
        config.risk.simulations = 50;
        config
    }

    struct MemoryPrices(Vec<OhlcvRow>);

    impl PriceSource for MemoryPrices {
        fn name(&self) -> &str {
            "memory"
        }

        async fn fetch_ohlcv(
            &self,
            _: &str,
            _: &str,
            _: usize,
        ) -> std::result::Result<Vec<OhlcvRow>, SourceError> {
            Ok(self.0.clone())
        }
    }

    struct NoKey;

    impl OnChainSource for NoKey {
        fn name(&self) -> &str {
            "no_key"
        }

        fn has_credential(&self) -> bool {
            false
        }

        async fn fetch_metric(
            &self,
            _: &str,
            _: &str,
            _: Option<i64>,
        ) -> std::result::Result<Vec<AuxPoint>, SourceError> {
            panic!("must not be called without a credential")
        }
    }

    /// Newest first, like the public fear/greed feed.
    struct MemorySentiment(Vec<AuxPoint>);

    impl SentimentSource for MemorySentiment {
        fn name(&self) -> &str {
            "memory_sentiment"
        }

        async fn fetch_index(
            &self,
            _: usize,
        ) -> std::result::Result<Vec<AuxPoint>, SourceError> {
            if self.0.is_empty() {
                return Err(SourceError::Parse("feed down".to_string()));
            }
            Ok(self.0.iter().rev().copied().collect())
        }
    }

    fn sentiment_for(rows: &[OhlcvRow]) -> MemorySentiment {
        MemorySentiment(
            rows.iter()
                .enumerate()
                .map(|(i, r)| AuxPoint {
                    timestamp: r.timestamp,
                    value: 20.0 + (i % 60) as f64,
                })
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_run_end_to_end_with_memory_sources() {
        let rows = candles(160);
        let pipeline = Pipeline::new(
            small_config(),
            MemoryPrices(rows.clone()),
            NoKey,
            sentiment_for(&rows),
            data_streamer::SimulatedReserves::default(),
        );

        let report = pipeline.run().await.unwrap();

        assert_eq!(report.symbol, "BTCUSDT");
        assert_eq!(report.features, vec!["close", "rsi", "fear_greed", "exchange_reserves"]);
        assert!(report.warnings.contains(&PipelineWarning::AuxiliaryUnavailable {
            source_name: "no_key".to_string(),
            reason: "no credential configured".to_string(),
        }));
        assert!(report.warnings.contains(&PipelineWarning::FeatureOmitted {
            column: "mvrv".to_string(),
        }));

        assert_eq!(report.training.loss.len(), 3);
        assert!(report.metrics.is_some_and(|m| m.rmse.is_finite()));
        assert_eq!(report.forecast.values.len(), 3);
        assert!(report.forecast.values.iter().all(|v| v.is_finite()));
        assert_eq!(report.forecast.step_millis, DAY);

        assert_eq!(report.signals.len(), 160);
        assert!(report.table.has_column("buy_signal"));
        assert!(report.table.has_column("fear_greed"));
        assert_eq!(report.risk.entry_price, rows[159].close);
        assert_eq!(report.fibonacci.len(), 7);

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"forecast\""));
    }

    #[tokio::test]
    async fn test_run_from_local_files() {
        let dir = tempfile::tempdir().unwrap();
        let ohlcv_path = dir.path().join("BTCUSDT.TXT");
        let sentiment_path = dir.path().join("FEAR_GREED.TXT");

        let rows = candles(160);
        data_streamer::write_ohlcv_file(&ohlcv_path, &rows).unwrap();
        data_streamer::write_aux_file(&sentiment_path, &sentiment_for(&rows).0).unwrap();

        let pipeline = Pipeline::new(
            small_config(),
            data_streamer::OhlcvFile::new(&ohlcv_path),
            data_streamer::GlassnodeClient::new(None),
            data_streamer::SentimentFile::new(&sentiment_path),
            data_streamer::SimulatedReserves::default(),
        );
        let report = pipeline.run().await.unwrap();

        assert!(report.features.contains(&"fear_greed".to_string()));
        assert_eq!(report.table.len(), 160);
        assert_eq!(report.forecast.values.len(), 3);
        assert_eq!(report.forecast.last_timestamp, rows[159].timestamp);
        assert_eq!(report.forecast.horizon, 1);
        assert_eq!(report.risk.entry_price, rows[159].close);
        let sentiment_failed = report.warnings.iter().any(|w| {
            matches!(w, PipelineWarning::AuxiliaryUnavailable { source_name, .. }
                if source_name == "sentiment_file")
        });
        assert!(!sentiment_failed);
    }

    #[tokio::test]
    async fn test_failing_sentiment_is_a_warning() {
        let rows = candles(160);
        let pipeline = Pipeline::new(
            small_config(),
            MemoryPrices(rows),
            NoKey,
            MemorySentiment(Vec::new()),
            data_streamer::SimulatedReserves::default(),
        );

        let inputs = pipeline.collect().await.unwrap();
        assert_eq!(inputs.auxiliaries.len(), 1);
        assert_eq!(inputs.auxiliaries[0].name, RESERVES_COLUMN);
        assert_eq!(inputs.warnings.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_prices_are_fatal() {
        let pipeline = Pipeline::new(
            small_config(),
            MemoryPrices(Vec::new()),
            NoKey,
            sentiment_for(&[]),
            data_streamer::SimulatedReserves::default(),
        );

        let err = pipeline.run().await.unwrap_err();
        assert!(matches!(err, PipelineError::DataUnavailable { .. }));
    }

    #[test]
    fn test_too_little_history() {
        let err = run_offline(&small_config(), RawInputs::new(candles(25))).unwrap_err();
        assert!(matches!(err, PipelineError::InsufficientData { .. }));
    }

    #[test]
    fn test_constant_auxiliary_is_degenerate() {
        let rows = candles(120);
        let flat = rows
            .iter()
            .map(|r| AuxPoint {
                timestamp: r.timestamp,
                value: 50.0,
            })
            .collect();
        let inputs = RawInputs::new(rows).with_auxiliary(AuxSeries::new("fear_greed", flat));

        let report = run_offline(&small_config(), inputs).unwrap();
        assert!(report.warnings.contains(&PipelineWarning::DegenerateColumn {
            column: "fear_greed".to_string(),
        }));
        assert!(report.warnings.contains(&PipelineWarning::FeatureOmitted {
            column: "exchange_reserves".to_string(),
        }));
    }

    #[test]
    fn test_base_asset() {
        assert_eq!(base_asset("BTCUSDT"), "BTC");
        assert_eq!(base_asset("ETHUSD"), "ETH");
        assert_eq!(base_asset("USDT"), "USDT");
        assert_eq!(base_asset("SOL"), "SOL");
    }
}
