use anyhow::Result;
use clap::Parser;
use data_streamer::{
    write_aux_file, write_ohlcv_file, BybitClient, FearGreedClient, PriceSource, SentimentSource,
};
use log::{error, info, warn};
use std::path::Path;

#[derive(Parser, Debug)]
#[command(name = "download_history")]
#[command(
    about = "Download crypto candles and the fear/greed index to text files",
    long_about = None
)]
struct Args {
    /// Symbols to download
    #[arg(default_values_t = vec!["BTCUSDT".to_string()])]
    symbols: Vec<String>,

    /// Time interval: 1, 3, 5, 15, 30, 60, 120, 240, 360, 720, D, W, M
    #[arg(short, long, default_value = "D")]
    interval: String,

    /// Market category: spot, linear or inverse
    #[arg(short, long, default_value = "spot")]
    category: String,

    /// Number of bars per symbol (several requests are made above 1000)
    #[arg(short, long, default_value_t = 1000)]
    limit: usize,

    /// Output directory
    #[arg(short, long, default_value = "historical_data")]
    output: String,

    /// Skip the fear/greed index download
    #[arg(long)]
    no_sentiment: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let out_dir = Path::new(&args.output);
    let client = BybitClient::new().with_category(&args.category);

    for (idx, symbol) in args.symbols.iter().enumerate() {
        info!("[{}/{}] downloading {} ({})", idx + 1, args.symbols.len(), symbol, args.interval);
        match client.fetch_ohlcv(symbol, &args.interval, args.limit).await {
            Ok(rows) if rows.is_empty() => warn!("{}: no data available", symbol),
            Ok(rows) => {
                let path = out_dir.join(format!("{}.TXT", symbol));
                write_ohlcv_file(&path, &rows)?;
                info!("{}: {} bars -> {}", symbol, rows.len(), path.display());
            }
            Err(e) => error!("{}: {}", symbol, e),
        }
    }

    if !args.no_sentiment {
        let sentiment = FearGreedClient::new();
        match sentiment.fetch_index(args.limit).await {
            Ok(mut points) => {
                points.sort_by_key(|p| p.timestamp);
                let path = out_dir.join("FEAR_GREED.TXT");
                write_aux_file(&path, &points)?;
                info!("fear/greed: {} days -> {}", points.len(), path.display());
            }
            Err(e) => error!("fear/greed: {}", e),
        }
    }

    Ok(())
}
