use serde::Serialize;
use std::fmt;

/// A single numeric observation.
///
/// `NotCollected` means the source had nothing at this timestamp and may be
/// filled from neighbours. `Warmup` means an indicator did not yet have enough
/// history; those cells are never filled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Known(f64),
    NotCollected,
    Warmup,
}

impl Cell {
    /// Converts a raw indicator output, where NaN marks missing history.
    pub fn from_indicator(value: f64) -> Self {
        if value.is_nan() {
            Cell::Warmup
        } else {
            Cell::Known(value)
        }
    }

    /// Converts a raw observation, where NaN marks a value the source never delivered.
    pub fn from_observation(value: f64) -> Self {
        if value.is_nan() {
            Cell::NotCollected
        } else {
            Cell::Known(value)
        }
    }

    pub fn value(self) -> Option<f64> {
        match self {
            Cell::Known(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_known(self) -> bool {
        matches!(self, Cell::Known(_))
    }

    /// The value, or NaN for either kind of gap.
    pub fn to_f64(self) -> f64 {
        self.value().unwrap_or(f64::NAN)
    }
}

/// Declared type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnKind {
    Numeric,
    Flag,
    Text,
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnKind::Numeric => "numeric",
            ColumnKind::Flag => "flag",
            ColumnKind::Text => "text",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "values", rename_all = "lowercase")]
pub enum Column {
    Numeric(Vec<Cell>),
    Flag(Vec<bool>),
    Text(Vec<String>),
}

impl Column {
    /// Numeric column from raw indicator output (NaN → `Warmup`).
    pub fn from_indicator(values: &[f64]) -> Self {
        Column::Numeric(values.iter().map(|&v| Cell::from_indicator(v)).collect())
    }

    /// Numeric column from raw observations (NaN → `NotCollected`).
    pub fn from_observations(values: &[f64]) -> Self {
        Column::Numeric(values.iter().map(|&v| Cell::from_observation(v)).collect())
    }

    pub fn len(&self) -> usize {
        match self {
            Column::Numeric(v) => v.len(),
            Column::Flag(v) => v.len(),
            Column::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            Column::Numeric(_) => ColumnKind::Numeric,
            Column::Flag(_) => ColumnKind::Flag,
            Column::Text(_) => ColumnKind::Text,
        }
    }

    pub fn as_numeric(&self) -> Option<&[Cell]> {
        match self {
            Column::Numeric(cells) => Some(cells),
            _ => None,
        }
    }

    /// Number of `Known` cells; zero for non-numeric columns.
    pub fn known_count(&self) -> usize {
        self.as_numeric()
            .map(|cells| cells.iter().filter(|c| c.is_known()).count())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nan_maps_to_reason() {
        assert_eq!(Cell::from_indicator(f64::NAN), Cell::Warmup);
        assert_eq!(Cell::from_observation(f64::NAN), Cell::NotCollected);
        assert_eq!(Cell::from_indicator(1.5), Cell::Known(1.5));
        assert!(Cell::Warmup.to_f64().is_nan());
    }

    #[test]
    fn test_column_kind_and_counts() {
        let col = Column::from_indicator(&[f64::NAN, 2.0, 3.0]);
        assert_eq!(col.kind(), ColumnKind::Numeric);
        assert_eq!(col.len(), 3);
        assert_eq!(col.known_count(), 2);

        let flags = Column::Flag(vec![true, false]);
        assert!(flags.as_numeric().is_none());
        assert_eq!(flags.known_count(), 0);
    }
}
