use crate::error::{PipelineError, PipelineWarning, Result};
use log::{debug, warn};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use table::{Cell, TimeSeriesTable};

const STAGE: &str = "feature builder";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSpec {
    pub target: String,
    pub features: Vec<String>,
    /// Rows ahead the target is read from
    pub horizon: usize,
    pub window_length: usize,
}

impl FeatureSpec {
    /// Drops the `optional` features that are absent from `table`, one
    /// `FeatureOmitted` warning each. Anything else that is missing is left
    /// for [`build_features`] to reject.
    pub fn omit_unavailable(
        &self,
        table: &TimeSeriesTable,
        optional: &[String],
    ) -> (Self, Vec<PipelineWarning>) {
        let mut warnings = Vec::new();
        let features = self
            .features
            .iter()
            .filter(|name| {
                let keep = table.has_column(name) || !optional.contains(*name);
                if !keep {
                    warn!("feature '{}' unavailable, omitting it", name);
                    warnings.push(PipelineWarning::FeatureOmitted {
                        column: name.to_string(),
                    });
                }
                keep
            })
            .cloned()
            .collect();

        (
            Self {
                features,
                ..self.clone()
            },
            warnings,
        )
    }

    /// Position of the target column among the features, if it is one.
    pub fn target_slot(&self) -> Option<usize> {
        self.features.iter().position(|f| *f == self.target)
    }
}

/// Complete rows ready for scaling: `x[i]` are the features at `timestamps[i]`
/// and `y[i]` is the target `horizon` rows later.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSet {
    pub timestamps: Vec<i64>,
    pub names: Vec<String>,
    pub x: Array2<f64>,
    pub y: Array1<f64>,
}

impl FeatureSet {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

fn required<'a>(table: &'a TimeSeriesTable, name: &str) -> Result<&'a [Cell]> {
    if !table.has_column(name) {
        return Err(PipelineError::Alignment {
            stage: STAGE,
            column: name.to_string(),
        });
    }
    Ok(table.numeric(name)?)
}

fn collect_rows(rows: Vec<Vec<f64>>, width: usize) -> Array2<f64> {
    let n = rows.len();
    let flat: Vec<f64> = rows.into_iter().flatten().collect();
    Array2::from_shape_vec((n, width), flat).unwrap_or_else(|_| Array2::zeros((0, width)))
}

/// Builds the shifted target and keeps only rows where every feature and the
/// shifted target are known.
pub fn build_features(table: &TimeSeriesTable, spec: &FeatureSpec) -> Result<FeatureSet> {
    let target = required(table, &spec.target)?;
    let columns = spec
        .features
        .iter()
        .map(|name| required(table, name))
        .collect::<Result<Vec<_>>>()?;

    let mut timestamps = Vec::new();
    let mut rows = Vec::new();
    let mut y = Vec::new();

    for (i, &ts) in table.timestamps().iter().enumerate() {
        let Some(label) = target.get(i + spec.horizon).and_then(|c| c.value()) else {
            continue;
        };
        let row: Option<Vec<f64>> = columns.iter().map(|col| col[i].value()).collect();
        if let Some(row) = row {
            timestamps.push(ts);
            rows.push(row);
            y.push(label);
        }
    }

    debug!(
        "{}: kept {} of {} rows ({} features, horizon {})",
        STAGE,
        rows.len(),
        table.len(),
        spec.features.len(),
        spec.horizon
    );

    Ok(FeatureSet {
        timestamps,
        names: spec.features.clone(),
        x: collect_rows(rows, spec.features.len()),
        y: Array1::from(y),
    })
}

/// Complete feature rows with no target requirement, e.g. to take the most
/// recent window for forecasting.
pub fn feature_rows(table: &TimeSeriesTable, names: &[String]) -> Result<(Vec<i64>, Array2<f64>)> {
    let columns = names
        .iter()
        .map(|name| required(table, name))
        .collect::<Result<Vec<_>>>()?;

    let mut timestamps = Vec::new();
    let mut rows = Vec::new();
    for (i, &ts) in table.timestamps().iter().enumerate() {
        let row: Option<Vec<f64>> = columns.iter().map(|col| col[i].value()).collect();
        if let Some(row) = row {
            timestamps.push(ts);
            rows.push(row);
        }
    }

    Ok((timestamps, collect_rows(rows, names.len())))
}
