use crate::column::{Cell, Column};
use crate::error::TableError;
use crate::table::TimeSeriesTable;
use log::{debug, warn};

/// Output of [`align`]: the combined table plus the columns that had to be
/// dropped because they held no value at all.
#[derive(Debug, Clone, PartialEq)]
pub struct Aligned {
    pub table: TimeSeriesTable,
    pub dropped: Vec<String>,
}

/// Left-joins every auxiliary table onto the primary timestamps, then fills
/// gaps per column.
///
/// Only exact timestamp matches are copied; anything else becomes
/// `NotCollected`. After the merge each numeric column is forward-filled and
/// then backward-filled from its `Known` cells. A numeric column with no
/// `Known` cell is dropped rather than filled.
pub fn align(
    primary: &TimeSeriesTable,
    auxiliaries: &[TimeSeriesTable],
) -> Result<Aligned, TableError> {
    let mut combined = primary.clone();

    for aux in auxiliaries {
        for (name, column) in aux.iter() {
            let Some(cells) = column.as_numeric() else {
                debug!("skipping non-numeric auxiliary column '{}'", name);
                continue;
            };
            let joined = left_join(primary.timestamps(), aux.timestamps(), cells);
            combined = combined.with_column(name, Column::Numeric(joined))?;
        }
    }

    let mut dropped = Vec::new();
    for (name, column) in combined.iter() {
        if column.as_numeric().is_some() && column.known_count() == 0 {
            dropped.push(name.to_string());
        }
    }
    for name in &dropped {
        warn!("column '{}' has no data after alignment, dropping it", name);
        combined = combined.without_column(name)?;
    }

    let table = combined.map_columns(|_, column| match column {
        Column::Numeric(cells) => Column::Numeric(forward_backward_fill(&cells)),
        other => other,
    });

    Ok(Aligned { table, dropped })
}

/// Both timestamp slices are strictly increasing, so a single merge pass suffices.
fn left_join(primary: &[i64], aux: &[i64], cells: &[Cell]) -> Vec<Cell> {
    let mut out = Vec::with_capacity(primary.len());
    let mut j = 0;

    for &ts in primary {
        while j < aux.len() && aux[j] < ts {
            j += 1;
        }
        if j < aux.len() && aux[j] == ts {
            out.push(cells[j]);
        } else {
            out.push(Cell::NotCollected);
        }
    }

    out
}

/// Forward-fills, then backward-fills, `NotCollected` cells from `Known`
/// neighbours. `Warmup` cells are left untouched and never used as a source.
pub fn forward_backward_fill(cells: &[Cell]) -> Vec<Cell> {
    let mut filled = cells.to_vec();

    let mut last = None;
    for cell in filled.iter_mut() {
        match *cell {
            Cell::Known(v) => last = Some(v),
            Cell::NotCollected => {
                if let Some(v) = last {
                    *cell = Cell::Known(v);
                }
            }
            Cell::Warmup => {}
        }
    }

    let mut next = None;
    for cell in filled.iter_mut().rev() {
        match *cell {
            Cell::Known(v) => next = Some(v),
            Cell::NotCollected => {
                if let Some(v) = next {
                    *cell = Cell::Known(v);
                }
            }
            Cell::Warmup => {}
        }
    }

    filled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AuxPoint, AuxSeries};
    use proptest::prelude::*;

    fn primary(ts: &[i64]) -> TimeSeriesTable {
        let closes: Vec<f64> = ts.iter().map(|&t| 100.0 + t as f64).collect();
        TimeSeriesTable::new(ts.to_vec())
            .unwrap()
            .with_column("close", Column::from_observations(&closes))
            .unwrap()
    }

    fn aux(name: &str, points: &[(i64, f64)]) -> TimeSeriesTable {
        let series = AuxSeries::new(
            name,
            points
                .iter()
                .map(|&(timestamp, value)| AuxPoint { timestamp, value })
                .collect(),
        );
        TimeSeriesTable::from_aux(&series).unwrap()
    }

    #[test]
    fn test_exact_match_then_fill() {
        let p = primary(&[1, 2, 3, 4, 5]);
        // 2 and 4 match, 7 is outside the primary axis
        let a = aux("fear_greed", &[(2, 20.0), (4, 40.0), (7, 70.0)]);

        let aligned = align(&p, &[a]).unwrap();
        let values = aligned.table.values("fear_greed").unwrap();

        // leading gap back-filled, interior and trailing gaps forward-filled
        assert_eq!(values, vec![20.0, 20.0, 20.0, 40.0, 40.0]);
        assert!(aligned.dropped.is_empty());
    }

    #[test]
    fn test_no_interpolation_across_granularity() {
        let p = primary(&[0, 10, 20]);
        let a = aux("mvrv", &[(5, 1.0), (15, 2.0)]);

        let aligned = align(&p, &[a]).unwrap();
        assert!(!aligned.table.has_column("mvrv"));
        assert_eq!(aligned.dropped, vec!["mvrv".to_string()]);
    }

    #[test]
    fn test_warmup_is_not_backfilled() {
        let p = primary(&[1, 2, 3])
            .with_indicator("sma", &[f64::NAN, 1.5, 2.5])
            .unwrap();
        let aligned = align(&p, &[]).unwrap();
        let sma = aligned.table.numeric("sma").unwrap();
        assert_eq!(sma[0], Cell::Warmup);
        assert_eq!(sma[1], Cell::Known(1.5));
    }

    #[test]
    fn test_inputs_are_not_mutated() {
        let p = primary(&[1, 2]);
        let a = aux("x", &[(1, 5.0)]);
        let before = p.clone();
        let _ = align(&p, &[a]).unwrap();
        assert_eq!(p, before);
    }

    #[test]
    fn test_duplicate_column_is_an_error() {
        let p = primary(&[1, 2]);
        let a = aux("close", &[(1, 5.0)]);
        assert!(matches!(align(&p, &[a]), Err(TableError::DuplicateColumn(_))));
    }

    proptest! {
        #[test]
        fn prop_fill_leaves_no_gap_when_any_value_exists(
            raw in prop::collection::vec(prop::option::of(-1e6f64..1e6), 1..64)
        ) {
            let cells: Vec<Cell> = raw
                .iter()
                .map(|v| v.map(Cell::Known).unwrap_or(Cell::NotCollected))
                .collect();
            let filled = forward_backward_fill(&cells);

            prop_assert_eq!(filled.len(), cells.len());
            if raw.iter().any(Option::is_some) {
                prop_assert!(filled.iter().all(|c| c.is_known()));
            } else {
                prop_assert!(filled.iter().all(|c| *c == Cell::NotCollected));
            }
            for (before, after) in cells.iter().zip(&filled) {
                if before.is_known() {
                    prop_assert_eq!(before, after);
                }
            }
        }
    }
}
