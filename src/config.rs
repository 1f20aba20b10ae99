use crate::predictor::ModelConfig;
use crate::scaler::FeatureRange;
use crate::signals::SignalConfig;
use anyhow::{Context, Result};
use clap::parser::ValueSource;
use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser};
use finance_tools::RiskParams;
use indicators::IndicatorConfig;
use serde::Deserialize;

fn default_features() -> Vec<String> {
    [
        "close",
        "volume",
        "sma_short",
        "rsi",
        "macd",
        "volatility",
        "fear_greed",
        "mvrv",
        "exchange_reserves",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Configuration for one forecasting run.
///
/// Every field has a command-line default; a TOML file given with `--config`
/// may set any subset of them, including the nested indicator, model, signal
/// and risk tables. Flags given explicitly on the command line override the
/// file (see [`Config::from_matches`]).
#[derive(Debug, Clone, Deserialize, Parser)]
#[command(name = "crypto_forecast")]
#[command(about = "Indicator, LSTM forecast and risk report for one crypto asset")]
#[serde(default)]
pub struct Config {
    /// TOML file with pipeline settings
    #[arg(long)]
    #[serde(skip)]
    pub config: Option<String>,

    /// Trading pair to analyse
    #[arg(long, default_value = "BTCUSDT")]
    pub symbol: String,

    /// Candle interval (D, 4h, 1h, ...)
    #[arg(long, default_value = "D")]
    pub timeframe: String,

    /// Number of candles to fetch
    #[arg(long, default_value_t = 1000)]
    pub limit: usize,

    /// Read candles from a local file (YYYYMMDD O H L C V) instead of the exchange.
    /// The on-chain API is not called in this mode.
    #[arg(long)]
    pub ohlcv_file: Option<String>,

    /// Read the sentiment index from a local file (YYYYMMDD value) instead of the live feed
    #[arg(long)]
    pub sentiment_file: Option<String>,

    /// Write the JSON report here instead of printing a summary
    #[arg(long)]
    pub output: Option<String>,

    /// On-chain metric path
    #[arg(long, default_value = "market/mvrv")]
    pub onchain_metric: String,

    /// Column to predict
    #[arg(long, default_value = "close")]
    pub target: String,

    /// Rows ahead the target is read from
    #[arg(long, default_value_t = 1)]
    pub horizon: usize,

    /// Rows per model input window
    #[arg(long, default_value_t = 60)]
    pub window_length: usize,

    /// Steps to forecast past the last row
    #[arg(long, default_value_t = 7)]
    pub forecast_steps: usize,

    /// Fraction of windows used for training
    #[arg(long, default_value_t = 0.8)]
    pub train_ratio: f64,

    /// Trailing fraction of training windows held out for validation
    #[arg(long, default_value_t = 0.1)]
    pub validation_split: f64,

    #[arg(long, default_value_t = 50)]
    pub epochs: usize,

    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    #[arg(skip = default_features())]
    pub features: Vec<String>,

    #[arg(skip)]
    pub scaler_range: FeatureRange,

    #[arg(skip)]
    pub indicators: IndicatorConfig,

    #[arg(skip)]
    pub model: ModelConfig,

    #[arg(skip)]
    pub signals: SignalConfig,

    #[arg(skip)]
    pub risk: RiskParams,
}

impl Default for Config {
    fn default() -> Self {
        Config::parse_from(["crypto_forecast"])
    }
}

impl Config {
    /// Parses the process arguments, exiting on `--help` or bad flags.
    pub fn load() -> Result<Self> {
        Self::from_matches(&Self::command().get_matches())
    }

    /// Builds the configuration from parsed arguments. Without `--config` this
    /// is the plain command line. With it, the file supplies the values and
    /// only the flags present on the command line replace them.
    pub fn from_matches(matches: &ArgMatches) -> Result<Self> {
        let cli = Self::from_arg_matches(matches)?;
        let Some(path) = cli.config.clone() else {
            return Ok(cli);
        };

        let mut config = Self::from_file(&path).with_context(|| format!("reading {}", path))?;
        config.config = Some(path);

        let explicit = |id: &str| matches.value_source(id) == Some(ValueSource::CommandLine);
        macro_rules! overlay {
            ($($field:ident),* $(,)?) => {
                $(
                    if explicit(stringify!($field)) {
                        config.$field = cli.$field.clone();
                    }
                )*
            };
        }
        overlay!(
            symbol,
            timeframe,
            limit,
            ohlcv_file,
            sentiment_file,
            output,
            onchain_metric,
            target,
            horizon,
            window_length,
            forecast_steps,
            train_ratio,
            validation_split,
            epochs,
            batch_size,
        );

        Ok(config)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.symbol.trim().is_empty() {
            anyhow::bail!("symbol must not be empty");
        }

        if self.limit == 0 {
            anyhow::bail!("limit must be greater than 0");
        }

        if self.window_length == 0 {
            anyhow::bail!("window_length must be greater than 0");
        }

        if self.features.is_empty() {
            anyhow::bail!("at least one feature is required");
        }

        if !self.features.contains(&self.target) {
            anyhow::bail!("target '{}' must also be listed as a feature", self.target);
        }

        if !(self.train_ratio > 0.0 && self.train_ratio < 1.0) {
            anyhow::bail!("train_ratio must be in (0, 1), got {}", self.train_ratio);
        }

        if !(0.0..1.0).contains(&self.validation_split) {
            anyhow::bail!("validation_split must be in [0, 1), got {}", self.validation_split);
        }

        if self.epochs == 0 || self.batch_size == 0 {
            anyhow::bail!("epochs and batch_size must be greater than 0");
        }

        if !(self.scaler_range.upper > self.scaler_range.lower) {
            anyhow::bail!(
                "scaler range [{}, {}] is empty",
                self.scaler_range.lower,
                self.scaler_range.upper
            );
        }

        if !(0.0..1.0).contains(&self.model.dropout) {
            anyhow::bail!("dropout must be in [0, 1), got {}", self.model.dropout);
        }

        self.risk.validate()?;
        Ok(())
    }

    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Columns that come from auxiliary sources and may be missing.
    pub fn auxiliary_columns(&self) -> Vec<String> {
        vec![
            self.signals.sentiment_column.clone(),
            self.signals.onchain_column.clone(),
            crate::pipeline::RESERVES_COLUMN.to_string(),
        ]
    }
}
