//! Typed, timestamp-indexed tables shared by every pipeline stage.
//!
//! A [`TimeSeriesTable`] owns a strictly increasing timestamp axis and an
//! arena of equally long columns. Stages never mutate a table in place: every
//! builder method consumes `self` and hands back a new table.

pub mod align;
pub mod column;
pub mod error;
pub mod table;
pub mod types;

pub use align::{align, forward_backward_fill, Aligned};
pub use column::{Cell, Column, ColumnKind};
pub use error::TableError;
pub use table::{ColumnId, TimeSeriesTable};
pub use types::{AuxPoint, AuxSeries, OhlcvRow};
