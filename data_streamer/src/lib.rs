pub mod bybit;
pub mod file;
pub mod onchain;
pub mod reserves;
pub mod sentiment;
pub mod source;

pub use bybit::BybitClient;
pub use file::{
    read_aux_file, read_ohlcv_file, write_aux_file, write_ohlcv_file, OhlcvFile, SentimentFile,
};
pub use onchain::GlassnodeClient;
pub use reserves::SimulatedReserves;
pub use sentiment::FearGreedClient;
pub use source::{OnChainSource, PriceSource, ReserveSource, SentimentSource, SourceError};
