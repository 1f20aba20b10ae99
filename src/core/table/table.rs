use crate::column::{Cell, Column, ColumnKind};
use crate::error::TableError;
use crate::types::{AuxSeries, OhlcvRow};
use serde::Serialize;

/// Handle to a column inside one table. Handles are only meaningful for the
/// table that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColumnId(usize);

/// Timestamp-indexed table with typed columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeriesTable {
    timestamps: Vec<i64>,
    names: Vec<String>,
    columns: Vec<Column>,
}

impl TimeSeriesTable {
    /// Creates a table with no columns. Timestamps must be strictly increasing.
    pub fn new(timestamps: Vec<i64>) -> Result<Self, TableError> {
        for (i, pair) in timestamps.windows(2).enumerate() {
            if pair[1] <= pair[0] {
                return Err(TableError::NonIncreasingTimestamps {
                    index: i + 1,
                    previous: pair[0],
                    current: pair[1],
                });
            }
        }

        Ok(Self {
            timestamps,
            names: Vec::new(),
            columns: Vec::new(),
        })
    }

    /// Primary table with `open`, `high`, `low`, `close` and `volume` columns.
    pub fn from_ohlcv(rows: &[OhlcvRow]) -> Result<Self, TableError> {
        let timestamps = rows.iter().map(|r| r.timestamp).collect();
        let pick = |f: fn(&OhlcvRow) -> f64| -> Vec<f64> { rows.iter().map(f).collect() };

        Self::new(timestamps)?
            .with_column("open", Column::from_observations(&pick(|r| r.open)))?
            .with_column("high", Column::from_observations(&pick(|r| r.high)))?
            .with_column("low", Column::from_observations(&pick(|r| r.low)))?
            .with_column("close", Column::from_observations(&pick(|r| r.close)))?
            .with_column("volume", Column::from_observations(&pick(|r| r.volume)))
    }

    /// Single-column table from an auxiliary series. The series is sorted
    /// ascending first; duplicate timestamps are rejected.
    pub fn from_aux(series: &AuxSeries) -> Result<Self, TableError> {
        let sorted = series.sorted();
        let timestamps = sorted.points.iter().map(|p| p.timestamp).collect();
        let values: Vec<f64> = sorted.points.iter().map(|p| p.value).collect();

        Self::new(timestamps)?.with_column(&series.name, Column::from_observations(&values))
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[i64] {
        &self.timestamps
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_id(name).is_some()
    }

    pub fn column_id(&self, name: &str) -> Option<ColumnId> {
        self.names.iter().position(|n| n == name).map(ColumnId)
    }

    pub fn column(&self, id: ColumnId) -> &Column {
        &self.columns[id.0]
    }

    pub fn column_name(&self, id: ColumnId) -> &str {
        &self.names[id.0]
    }

    /// Iterates `(name, column)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.names.iter().map(String::as_str).zip(self.columns.iter())
    }

    pub fn get(&self, name: &str) -> Result<&Column, TableError> {
        self.column_id(name)
            .map(|id| self.column(id))
            .ok_or_else(|| TableError::MissingColumn(name.to_string()))
    }

    /// Cells of a numeric column.
    pub fn numeric(&self, name: &str) -> Result<&[Cell], TableError> {
        let column = self.get(name)?;
        column.as_numeric().ok_or_else(|| TableError::ColumnType {
            column: name.to_string(),
            expected: ColumnKind::Numeric,
            found: column.kind(),
        })
    }

    /// Numeric column as raw floats with NaN in every gap, for the indicator functions.
    pub fn values(&self, name: &str) -> Result<Vec<f64>, TableError> {
        Ok(self.numeric(name)?.iter().map(|c| c.to_f64()).collect())
    }

    /// Returns a new table with `column` appended.
    pub fn with_column(mut self, name: &str, column: Column) -> Result<Self, TableError> {
        if column.len() != self.len() {
            return Err(TableError::LengthMismatch {
                column: name.to_string(),
                expected: self.len(),
                found: column.len(),
            });
        }
        if self.has_column(name) {
            return Err(TableError::DuplicateColumn(name.to_string()));
        }

        self.names.push(name.to_string());
        self.columns.push(column);
        Ok(self)
    }

    /// Shorthand for appending raw indicator output.
    pub fn with_indicator(self, name: &str, values: &[f64]) -> Result<Self, TableError> {
        self.with_column(name, Column::from_indicator(values))
    }

    /// Returns a new table without `name`.
    pub fn without_column(mut self, name: &str) -> Result<Self, TableError> {
        let id = self
            .column_id(name)
            .ok_or_else(|| TableError::MissingColumn(name.to_string()))?;
        self.names.remove(id.0);
        self.columns.remove(id.0);
        Ok(self)
    }

    /// Returns a new table with every column passed through `f`.
    pub fn map_columns<F>(self, mut f: F) -> Self
    where
        F: FnMut(&str, Column) -> Column,
    {
        let columns = self
            .names
            .iter()
            .zip(self.columns)
            .map(|(name, column)| f(name, column))
            .collect();

        Self {
            timestamps: self.timestamps,
            names: self.names,
            columns,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(n: usize) -> Vec<OhlcvRow> {
        (0..n)
            .map(|i| OhlcvRow {
                timestamp: i as i64 * 86_400_000,
                open: 100.0 + i as f64,
                high: 101.0 + i as f64,
                low: 99.0 + i as f64,
                close: 100.5 + i as f64,
                volume: 10.0,
            })
            .collect()
    }

    #[test]
    fn test_from_ohlcv() {
        let table = TimeSeriesTable::from_ohlcv(&rows(4)).unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(table.column_names(), &["open", "high", "low", "close", "volume"]);
        assert_eq!(table.values("close").unwrap()[3], 103.5);
    }

    #[test]
    fn test_rejects_unordered_timestamps() {
        let err = TimeSeriesTable::new(vec![1, 3, 3]).unwrap_err();
        assert_eq!(
            err,
            TableError::NonIncreasingTimestamps {
                index: 2,
                previous: 3,
                current: 3
            }
        );
    }

    #[test]
    fn test_with_column_checks_length_and_name() {
        let table = TimeSeriesTable::new(vec![1, 2]).unwrap();
        let err = table
            .clone()
            .with_column("x", Column::from_observations(&[1.0]))
            .unwrap_err();
        assert!(matches!(err, TableError::LengthMismatch { .. }));

        let table = table.with_indicator("x", &[1.0, 2.0]).unwrap();
        let err = table.with_indicator("x", &[1.0, 2.0]).unwrap_err();
        assert_eq!(err, TableError::DuplicateColumn("x".into()));
    }

    #[test]
    fn test_numeric_rejects_other_kinds() {
        let table = TimeSeriesTable::new(vec![1, 2])
            .unwrap()
            .with_column("flag", Column::Flag(vec![true, false]))
            .unwrap();
        let err = table.numeric("flag").unwrap_err();
        assert!(matches!(
            err,
            TableError::ColumnType {
                expected: ColumnKind::Numeric,
                found: ColumnKind::Flag,
                ..
            }
        ));
        assert!(matches!(table.numeric("nope"), Err(TableError::MissingColumn(_))));
    }

    #[test]
    fn test_from_aux_sorts_descending_input() {
        use crate::types::AuxPoint;
        let series = AuxSeries::new(
            "fear_greed",
            vec![
                AuxPoint { timestamp: 3, value: 30.0 },
                AuxPoint { timestamp: 1, value: 10.0 },
                AuxPoint { timestamp: 2, value: 20.0 },
            ],
        );
        let table = TimeSeriesTable::from_aux(&series).unwrap();
        assert_eq!(table.timestamps(), &[1, 2, 3]);
        assert_eq!(table.values("fear_greed").unwrap(), vec![10.0, 20.0, 30.0]);
    }

    #[test]
    fn test_without_column_returns_new_table() {
        let table = TimeSeriesTable::from_ohlcv(&rows(2)).unwrap();
        let trimmed = table.clone().without_column("volume").unwrap();
        assert!(table.has_column("volume"));
        assert!(!trimmed.has_column("volume"));
    }
}
