//! Min-max scaling with an explicit fitted state.
//!
//! A constant column maps every value to the lower bound of the output range,
//! and maps back to the constant it was fit on.

use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureRange {
    pub lower: f64,
    pub upper: f64,
}

impl Default for FeatureRange {
    fn default() -> Self {
        Self { lower: 0.0, upper: 1.0 }
    }
}

/// Per-column minimum and maximum seen at fit time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerState {
    pub data_min: Vec<f64>,
    pub data_max: Vec<f64>,
    pub range: FeatureRange,
}

impl ScalerState {
    pub fn n_features(&self) -> usize {
        self.data_min.len()
    }

    fn is_degenerate(&self, col: usize) -> bool {
        self.data_max[col] == self.data_min[col]
    }

    fn forward(&self, col: usize, x: f64) -> f64 {
        if self.is_degenerate(col) {
            return self.range.lower;
        }
        let unit = (x - self.data_min[col]) / (self.data_max[col] - self.data_min[col]);
        self.range.lower + unit * (self.range.upper - self.range.lower)
    }

    fn backward(&self, col: usize, y: f64) -> f64 {
        if self.is_degenerate(col) {
            return self.data_min[col];
        }
        let unit = (y - self.range.lower) / (self.range.upper - self.range.lower);
        self.data_min[col] + unit * (self.data_max[col] - self.data_min[col])
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MinMaxScaler {
    range: FeatureRange,
    state: Option<ScalerState>,
}

impl MinMaxScaler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_range(range: FeatureRange) -> Result<Self> {
        if !(range.upper > range.lower) {
            return Err(PipelineError::InvalidConfig(format!(
                "scaler range [{}, {}] is empty",
                range.lower, range.upper
            )));
        }
        Ok(Self { range, state: None })
    }

    /// Returns a fitted copy of this scaler. `self` is left untouched.
    pub fn fit(&self, data: ArrayView2<f64>) -> Result<Self> {
        if data.nrows() == 0 {
            return Err(PipelineError::InsufficientData {
                stage: "scaler",
                needed: 1,
                found: 0,
            });
        }

        let data_min = data
            .axis_iter(Axis(1))
            .map(|col| col.fold(f64::INFINITY, |a, &b| a.min(b)))
            .collect();
        let data_max = data
            .axis_iter(Axis(1))
            .map(|col| col.fold(f64::NEG_INFINITY, |a, &b| a.max(b)))
            .collect();

        Ok(Self {
            range: self.range,
            state: Some(ScalerState {
                data_min,
                data_max,
                range: self.range,
            }),
        })
    }

    /// Fits a single column, e.g. the target.
    pub fn fit_column(&self, data: ArrayView1<f64>) -> Result<Self> {
        self.fit(data.insert_axis(Axis(1)))
    }

    pub fn is_fitted(&self) -> bool {
        self.state.is_some()
    }

    pub fn state(&self) -> Result<&ScalerState> {
        self.state.as_ref().ok_or(PipelineError::ScalerNotFit)
    }

    /// Indices of columns whose fit-time min equals max.
    pub fn degenerate_columns(&self) -> Vec<usize> {
        self.state
            .as_ref()
            .map(|s| (0..s.n_features()).filter(|&c| s.is_degenerate(c)).collect())
            .unwrap_or_default()
    }

    fn checked_state(&self, width: usize) -> Result<&ScalerState> {
        let state = self.state()?;
        if width != state.n_features() {
            return Err(PipelineError::FeatureCountMismatch {
                expected: state.n_features(),
                found: width,
            });
        }
        Ok(state)
    }

    pub fn transform(&self, data: ArrayView2<f64>) -> Result<Array2<f64>> {
        let state = self.checked_state(data.ncols())?;
        let mut out = data.to_owned();
        for (col, mut column) in out.axis_iter_mut(Axis(1)).enumerate() {
            column.mapv_inplace(|x| state.forward(col, x));
        }
        Ok(out)
    }

    pub fn inverse_transform(&self, data: ArrayView2<f64>) -> Result<Array2<f64>> {
        let state = self.checked_state(data.ncols())?;
        let mut out = data.to_owned();
        for (col, mut column) in out.axis_iter_mut(Axis(1)).enumerate() {
            column.mapv_inplace(|y| state.backward(col, y));
        }
        Ok(out)
    }

    /// Scales one value of column `col`.
    pub fn transform_value(&self, col: usize, x: f64) -> Result<f64> {
        let state = self.state()?;
        if col >= state.n_features() {
            return Err(PipelineError::FeatureCountMismatch {
                expected: state.n_features(),
                found: col + 1,
            });
        }
        Ok(state.forward(col, x))
    }

    pub fn inverse_value(&self, col: usize, y: f64) -> Result<f64> {
        let state = self.state()?;
        if col >= state.n_features() {
            return Err(PipelineError::FeatureCountMismatch {
                expected: state.n_features(),
                found: col + 1,
            });
        }
        Ok(state.backward(col, y))
    }

    pub fn transform_column(&self, data: ArrayView1<f64>) -> Result<Array1<f64>> {
        Ok(self.transform(data.insert_axis(Axis(1)))?.column(0).to_owned())
    }

    pub fn inverse_column(&self, data: ArrayView1<f64>) -> Result<Array1<f64>> {
        Ok(self
            .inverse_transform(data.insert_axis(Axis(1)))?
            .column(0)
            .to_owned())
    }
}

/// Feature and target scalers fit on the same rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerPair {
    pub features: MinMaxScaler,
    pub target: MinMaxScaler,
}

impl ScalerPair {
    pub fn fit(
        range: FeatureRange,
        features: ArrayView2<f64>,
        target: ArrayView1<f64>,
    ) -> Result<Self> {
        let base = MinMaxScaler::with_range(range)?;
        Ok(Self {
            features: base.fit(features)?,
            target: base.fit_column(target)?,
        })
    }
}
