//! Crypto price forecasting: indicators, aligned auxiliary data, an LSTM
//! predictor, trading signals and position risk, wired together by
//! [`pipeline::Pipeline`].

pub mod config;
pub mod error;
pub mod features;
pub mod pipeline;
pub mod predictor;
pub mod scaler;
pub mod signals;
pub mod windows;

pub use config::Config;
pub use error::{PipelineError, PipelineWarning, Result};
pub use features::{build_features, FeatureSet, FeatureSpec};
pub use pipeline::{run_offline, Pipeline, PipelineReport, RawInputs};
pub use predictor::{ForecastResult, ModelConfig, Predictor, TrainingHistory};
pub use scaler::{FeatureRange, MinMaxScaler, ScalerPair};
pub use signals::{compute_signals, SignalConfig, SignalRow};
pub use windows::{make_windows, split_train_test, WindowedDataset};
