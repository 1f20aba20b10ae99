use crate::error::{PipelineError, Result};
use ndarray::{s, Array1, Array2, Array3, ArrayView1, ArrayView2, ArrayView3, Axis};

const STAGE: &str = "windower";

/// `x` is `(windows, window_length, features)`, `y` one label per window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowedDataset {
    pub x: Array3<f64>,
    pub y: Array1<f64>,
}

impl WindowedDataset {
    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    pub fn window_length(&self) -> usize {
        self.x.len_of(Axis(1))
    }

    pub fn n_features(&self) -> usize {
        self.x.len_of(Axis(2))
    }

    /// Windows `[start, end)` as a new dataset.
    pub fn slice(&self, start: usize, end: usize) -> Self {
        Self {
            x: self.x.slice(s![start..end, .., ..]).to_owned(),
            y: self.y.slice(s![start..end]).to_owned(),
        }
    }

    /// Consecutive mini-batches in temporal order; the last one may be short.
    pub fn batches(
        &self,
        size: usize,
    ) -> impl Iterator<Item = (ArrayView3<'_, f64>, ArrayView1<'_, f64>)> {
        let size = size.max(1);
        (0..self.len()).step_by(size).map(move |start| {
            let end = (start + size).min(self.len());
            (
                self.x.slice(s![start..end, .., ..]),
                self.y.slice(s![start..end]),
            )
        })
    }
}

/// Window `i` holds feature rows `[i, i + window_length)` and is labelled
/// with `target[i + window_length]`.
pub fn make_windows(
    features: ArrayView2<f64>,
    target: ArrayView1<f64>,
    window_length: usize,
) -> Result<WindowedDataset> {
    let n = features.nrows();
    if target.len() != n {
        return Err(PipelineError::InsufficientData {
            stage: STAGE,
            needed: n,
            found: target.len(),
        });
    }
    if window_length == 0 || n <= window_length {
        return Err(PipelineError::InsufficientData {
            stage: STAGE,
            needed: window_length + 1,
            found: n,
        });
    }

    let count = n - window_length;
    let mut x = Array3::zeros((count, window_length, features.ncols()));
    for i in 0..count {
        x.slice_mut(s![i, .., ..])
            .assign(&features.slice(s![i..i + window_length, ..]));
    }
    let y = target.slice(s![window_length..]).to_owned();

    Ok(WindowedDataset { x, y })
}

/// First `floor(ratio * n)` windows train, the rest test. Order is kept.
pub fn split_train_test(
    dataset: &WindowedDataset,
    ratio: f64,
) -> Result<(WindowedDataset, WindowedDataset)> {
    if !(0.0..=1.0).contains(&ratio) {
        return Err(PipelineError::InvalidConfig(format!(
            "train ratio must be in [0, 1], got {}",
            ratio
        )));
    }
    let n = dataset.len();
    let cut = ((ratio * n as f64).floor() as usize).min(n);
    Ok((dataset.slice(0, cut), dataset.slice(cut, n)))
}

/// The trailing `window_length` rows, the input for a forecast.
pub fn last_window(features: ArrayView2<f64>, window_length: usize) -> Result<Array2<f64>> {
    let n = features.nrows();
    if window_length == 0 || n < window_length {
        return Err(PipelineError::InsufficientData {
            stage: STAGE,
            needed: window_length.max(1),
            found: n,
        });
    }
    Ok(features.slice(s![n - window_length.., ..]).to_owned())
}
