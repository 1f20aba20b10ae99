//! Sequence model lifecycle: build, fit, evaluate, forecast.
//!
//! A [`Predictor`] starts `Untrained`; only [`Predictor::fit`] produces a
//! `Trained` one. The model never sees raw prices: callers pass the fitted
//! [`ScalerPair`] whenever output has to be read in price space.

pub mod lstm;
pub mod optimizer;

use crate::error::{PipelineError, Result};
use crate::scaler::ScalerPair;
use crate::windows::WindowedDataset;
use log::{debug, info};
use lstm::LstmNetwork;
use ndarray::{s, Array1, Array2, ArrayView2, ArrayView3, Axis};
use optimizer::Adam;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use stats::{regression_metrics, RegressionMetrics};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub units: usize,
    pub dropout: f64,
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    /// Global gradient norm cap; 0 disables clipping
    pub clip_norm: f64,
    pub seed: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            units: 50,
            dropout: 0.2,
            learning_rate: 0.001,
            beta1: 0.9,
            beta2: 0.999,
            clip_norm: 1.0,
            seed: 42,
        }
    }
}

/// Per-epoch mean squared error on the scaled target.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrainingHistory {
    pub loss: Vec<f64>,
    /// Empty when no validation windows were held out
    pub val_loss: Vec<f64>,
}

#[derive(Debug, Clone)]
enum ModelState {
    Untrained,
    Trained { history: TrainingHistory },
}

#[derive(Debug, Clone)]
pub struct Predictor {
    network: LstmNetwork,
    config: ModelConfig,
    window_length: usize,
    state: ModelState,
}

/// De-scaled predictions for the steps after `last_timestamp`.
///
/// A window is labelled with the target one row past its end, and the target
/// column is already shifted by `horizon`, so value `k` (1-based) estimates
/// the price `horizon + k` rows after the last window row.
/// [`ForecastResult::timestamps`] still stamps it at
/// `last_timestamp + k * step_millis`, i.e. `horizon` steps early; read the
/// stamps as step indices rather than exact dates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastResult {
    pub last_timestamp: i64,
    pub step_millis: i64,
    pub horizon: usize,
    pub values: Vec<f64>,
}

impl ForecastResult {
    /// One stamp per value, `step_millis` apart, starting one step after
    /// `last_timestamp`.
    pub fn timestamps(&self) -> Vec<i64> {
        (1..=self.values.len() as i64)
            .map(|k| self.last_timestamp + k * self.step_millis)
            .collect()
    }
}

impl Predictor {
    /// Untrained model for windows of shape `(window_length, n_features)`.
    pub fn build(input_shape: (usize, usize), config: &ModelConfig) -> Result<Self> {
        let (window_length, n_features) = input_shape;
        if window_length == 0 || n_features == 0 || config.units == 0 {
            return Err(PipelineError::InvalidConfig(format!(
                "model input shape {:?} with {} units",
                input_shape, config.units
            )));
        }
        if !(0.0..1.0).contains(&config.dropout) {
            return Err(PipelineError::InvalidConfig(format!(
                "dropout must be in [0, 1), got {}",
                config.dropout
            )));
        }

        let mut rng = StdRng::seed_from_u64(config.seed);
        Ok(Self {
            network: LstmNetwork::new(n_features, config.units, config.dropout, &mut rng),
            config: config.clone(),
            window_length,
            state: ModelState::Untrained,
        })
    }

    pub fn is_trained(&self) -> bool {
        matches!(self.state, ModelState::Trained { .. })
    }

    pub fn input_shape(&self) -> (usize, usize) {
        (self.window_length, self.network.n_features())
    }

    pub fn history(&self) -> Option<&TrainingHistory> {
        match &self.state {
            ModelState::Trained { history } => Some(history),
            ModelState::Untrained => None,
        }
    }

    fn check_shape(&self, window_length: usize, n_features: usize) -> Result<()> {
        if n_features != self.network.n_features() {
            return Err(PipelineError::FeatureCountMismatch {
                expected: self.network.n_features(),
                found: n_features,
            });
        }
        if window_length != self.window_length {
            return Err(PipelineError::InsufficientData {
                stage: "predictor",
                needed: self.window_length,
                found: window_length,
            });
        }
        Ok(())
    }

    /// Trains on `train` and returns the trained model. The trailing
    /// `validation_split` fraction of windows is held out, in order.
    pub fn fit(
        self,
        train: &WindowedDataset,
        epochs: usize,
        batch_size: usize,
        validation_split: f64,
    ) -> Result<Self> {
        self.check_shape(train.window_length(), train.n_features())?;
        if !(0.0..1.0).contains(&validation_split) {
            return Err(PipelineError::InvalidConfig(format!(
                "validation split must be in [0, 1), got {}",
                validation_split
            )));
        }

        let n_val = (train.len() as f64 * validation_split).floor() as usize;
        let n_fit = train.len() - n_val;
        if n_fit == 0 {
            return Err(PipelineError::InsufficientData {
                stage: "predictor",
                needed: 1,
                found: 0,
            });
        }
        let fit_set = train.slice(0, n_fit);
        let val_set = train.slice(n_fit, train.len());

        let Predictor {
            mut network,
            config,
            window_length,
            ..
        } = self;
        let mut adam = Adam::new(config.learning_rate).with_betas(config.beta1, config.beta2);
        let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(1));
        let mut history = TrainingHistory::default();

        info!(
            "training on {} windows ({} held out), {} epochs, batch {}",
            n_fit, n_val, epochs, batch_size
        );

        for epoch in 0..epochs {
            let mut weighted = 0.0;
            for (bx, by) in fit_set.batches(batch_size) {
                let (loss, grads) = network.batch_gradients(bx, by, Some(&mut rng));
                network.apply_gradients(&mut adam, grads, config.clip_norm);
                weighted += loss * by.len() as f64;
            }
            let loss = weighted / n_fit as f64;
            history.loss.push(loss);

            if val_set.is_empty() {
                info!("epoch {}/{}: loss {:.6}", epoch + 1, epochs, loss);
            } else {
                let (val_loss, _) =
                    network.batch_gradients(val_set.x.view(), val_set.y.view(), None);
                history.val_loss.push(val_loss);
                info!(
                    "epoch {}/{}: loss {:.6}, val_loss {:.6}",
                    epoch + 1,
                    epochs,
                    loss,
                    val_loss
                );
            }
        }

        Ok(Self {
            network,
            config,
            window_length,
            state: ModelState::Trained { history },
        })
    }

    /// Scaled predictions, one per window.
    pub fn predict(&self, x: ArrayView3<f64>) -> Result<Array1<f64>> {
        if !self.is_trained() {
            return Err(PipelineError::ModelNotTrained);
        }
        self.check_shape(x.len_of(Axis(1)), x.len_of(Axis(2)))?;
        Ok(x.outer_iter().map(|w| self.network.predict_one(w)).collect())
    }

    /// Metrics on de-scaled predictions against de-scaled actuals.
    pub fn evaluate(
        &self,
        test: &WindowedDataset,
        scalers: &ScalerPair,
    ) -> Result<RegressionMetrics> {
        if !self.is_trained() {
            return Err(PipelineError::ModelNotTrained);
        }
        if test.is_empty() {
            return Err(PipelineError::InsufficientData {
                stage: "evaluation",
                needed: 1,
                found: 0,
            });
        }

        let predicted = scalers.target.inverse_column(self.predict(test.x.view())?.view())?;
        let actual = scalers.target.inverse_column(test.y.view())?;
        let metrics = regression_metrics(
            actual.as_slice().unwrap_or(&[]),
            predicted.as_slice().unwrap_or(&[]),
        );
        debug!("evaluation on {} windows: {:?}", test.len(), metrics);
        Ok(metrics)
    }

    /// Predicts `horizon` steps past `last_window`, feeding each prediction
    /// back in as the next row.
    ///
    /// The synthetic row copies the previous last row and overwrites
    /// `target_slot` with the prediction, re-scaled into that feature's range.
    /// The other features (indicators, auxiliaries) are not recomputed.
    pub fn forecast(
        &self,
        last_window: ArrayView2<f64>,
        horizon: usize,
        scalers: &ScalerPair,
        target_slot: usize,
    ) -> Result<Vec<f64>> {
        if !self.is_trained() {
            return Err(PipelineError::ModelNotTrained);
        }
        self.check_shape(last_window.nrows(), last_window.ncols())?;
        if target_slot >= last_window.ncols() {
            return Err(PipelineError::FeatureCountMismatch {
                expected: last_window.ncols(),
                found: target_slot + 1,
            });
        }

        let (_, values) = (0..horizon).try_fold(
            (last_window.to_owned(), Vec::with_capacity(horizon)),
            |(window, mut values), _| {
                let (next, value) = self.forecast_step(window.view(), scalers, target_slot)?;
                values.push(value);
                Ok::<_, PipelineError>((next, values))
            },
        )?;
        Ok(values)
    }

    /// One fold step: `window -> (next window, de-scaled prediction)`.
    fn forecast_step(
        &self,
        window: ArrayView2<f64>,
        scalers: &ScalerPair,
        target_slot: usize,
    ) -> Result<(Array2<f64>, f64)> {
        let scaled = self.network.predict_one(window);
        let value = scalers.target.inverse_value(0, scaled)?;

        let mut row = window.row(window.nrows() - 1).to_owned();
        row[target_slot] = scalers.features.transform_value(target_slot, value)?;

        let mut next = Array2::zeros(window.raw_dim());
        let keep = window.nrows() - 1;
        next.slice_mut(s![..keep, ..]).assign(&window.slice(s![1.., ..]));
        next.row_mut(keep).assign(&row);

        Ok((next, value))
    }
}
