use data_streamer::SourceError;
use serde::Serialize;
use std::fmt;
use table::TableError;
use thiserror::Error;

/// Fatal pipeline failures. Each variant carries enough context to locate the
/// problem without inspecting pipeline internals.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no data for {symbol} from {source_name}")]
    DataUnavailable { symbol: String, source_name: String },

    #[error("{stage}: required column '{column}' is not in the table")]
    Alignment { stage: &'static str, column: String },

    #[error("scaler used before fit")]
    ScalerNotFit,

    #[error("model used before fit")]
    ModelNotTrained,

    #[error("expected {expected} features, found {found}")]
    FeatureCountMismatch { expected: usize, found: usize },

    #[error("{stage}: need at least {needed} rows, found {found}")]
    InsufficientData {
        stage: &'static str,
        needed: usize,
        found: usize,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error("{source_name}: {error}")]
    Source {
        source_name: String,
        #[source]
        error: SourceError,
    },

    #[error(transparent)]
    Risk(#[from] finance_tools::RiskError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Conditions the pipeline recovers from. Logged when raised and kept in the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineWarning {
    /// Constant column, scaled to the lower bound of the output range.
    DegenerateColumn { column: String },
    /// An auxiliary source was skipped or failed.
    AuxiliaryUnavailable { source_name: String, reason: String },
    /// Column had no value at all after alignment.
    ColumnDropped { column: String },
    /// Configured feature not available, left out of the feature set.
    FeatureOmitted { column: String },
}

impl fmt::Display for PipelineWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineWarning::DegenerateColumn { column } => {
                write!(f, "column '{}' is constant, scaled to the lower bound", column)
            }
            PipelineWarning::AuxiliaryUnavailable { source_name, reason } => {
                write!(f, "auxiliary source {} unavailable: {}", source_name, reason)
            }
            PipelineWarning::ColumnDropped { column } => {
                write!(f, "column '{}' has no data and was dropped", column)
            }
            PipelineWarning::FeatureOmitted { column } => {
                write!(f, "feature '{}' is not available and was omitted", column)
            }
        }
    }
}
