use serde::{Deserialize, Serialize};

/// One OHLCV bucket. Timestamps are Unix milliseconds at the bucket open.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OhlcvRow {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// One observation of an auxiliary metric (on-chain, sentiment, reserves).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AuxPoint {
    pub timestamp: i64,
    pub value: f64,
}

/// A named auxiliary series, in whatever order the provider returned it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuxSeries {
    pub name: String,
    pub points: Vec<AuxPoint>,
}

impl AuxSeries {
    pub fn new(name: impl Into<String>, points: Vec<AuxPoint>) -> Self {
        Self {
            name: name.into(),
            points,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Copy of the series sorted ascending by timestamp.
    pub fn sorted(&self) -> Self {
        let mut points = self.points.clone();
        points.sort_by_key(|p| p.timestamp);
        Self {
            name: self.name.clone(),
            points,
        }
    }
}
