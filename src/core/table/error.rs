use crate::column::ColumnKind;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum TableError {
    #[error("timestamps must increase: {previous} followed by {current} at row {index}")]
    NonIncreasingTimestamps {
        index: usize,
        previous: i64,
        current: i64,
    },

    #[error("column '{column}' has {found} rows, table has {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        found: usize,
    },

    #[error("column '{0}' does not exist")]
    MissingColumn(String),

    #[error("column '{0}' already exists")]
    DuplicateColumn(String),

    #[error("column '{column}' is {found}, operation needs {expected}")]
    ColumnType {
        column: String,
        expected: ColumnKind,
        found: ColumnKind,
    },
}
