//! Contracts for the raw data collaborators.
//!
//! Every source returns plain rows; none of them knows about tables, fills or
//! features. Ordering guarantees are documented per trait.

use table::{AuxPoint, OhlcvRow};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("api error {code}: {message}")]
    Api { code: i64, message: String },
    #[error("malformed payload: {0}")]
    Parse(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no credential configured for {0}")]
    MissingCredential(&'static str),
}

/// Historical candles for one symbol, ascending by timestamp.
///
/// An empty vector means the source had nothing; callers treat that as fatal.
#[allow(async_fn_in_trait)]
pub trait PriceSource {
    fn name(&self) -> &str;

    async fn fetch_ohlcv(
        &self,
        symbol: &str,
        timeframe: &str,
        limit: usize,
    ) -> Result<Vec<OhlcvRow>, SourceError>;
}

/// On-chain metric provider. Needs a credential; without one the pipeline
/// skips it instead of calling `fetch_metric`.
#[allow(async_fn_in_trait)]
pub trait OnChainSource {
    fn name(&self) -> &str;

    fn has_credential(&self) -> bool;

    async fn fetch_metric(
        &self,
        asset: &str,
        metric: &str,
        since: Option<i64>,
    ) -> Result<Vec<AuxPoint>, SourceError>;
}

/// Sentiment index in `[0, 100]`. Providers may return any order.
#[allow(async_fn_in_trait)]
pub trait SentimentSource {
    fn name(&self) -> &str;

    async fn fetch_index(&self, limit: usize) -> Result<Vec<AuxPoint>, SourceError>;
}

/// Exchange reserve balance, one point per requested timestamp.
#[allow(async_fn_in_trait)]
pub trait ReserveSource {
    fn name(&self) -> &str;

    async fn fetch_reserves(
        &self,
        asset: &str,
        timestamps: &[i64],
    ) -> Result<Vec<AuxPoint>, SourceError>;
}
