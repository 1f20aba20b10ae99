use anyhow::{Context, Result};
use crypto_forecast::{Config, Pipeline, PipelineReport};
use data_streamer::file::format_date;
use data_streamer::{
    BybitClient, FearGreedClient, GlassnodeClient, OhlcvFile, OnChainSource, PriceSource,
    SentimentFile, SentimentSource, SimulatedReserves,
};

async fn execute<P, O, S>(
    config: Config,
    price: P,
    onchain: O,
    sentiment: S,
) -> Result<PipelineReport>
where
    P: PriceSource,
    O: OnChainSource,
    S: SentimentSource,
{
    let reserves = SimulatedReserves {
        seed: config.model.seed,
        ..Default::default()
    };
    let pipeline = Pipeline::new(config, price, onchain, sentiment, reserves);
    Ok(pipeline.run().await?)
}

fn print_summary(report: &PipelineReport) {
    println!("\n{}", "=".repeat(60));
    println!("{} ({} rows)", report.symbol, report.table.len());
    println!("{}", "=".repeat(60));

    println!("Features: {}", report.features.join(", "));
    if let Some(loss) = report.training.loss.last() {
        println!("Final training loss: {:.6}", loss);
    }
    match &report.metrics {
        Some(m) => println!("Test RMSE: {:.4}  MAE: {:.4}  R2: {:.4}", m.rmse, m.mae, m.r2),
        None => println!("Test metrics: not available"),
    }

    println!("\nForecast:");
    for (ts, value) in report.forecast.timestamps().iter().zip(&report.forecast.values) {
        println!("  {}  {:.2}", format_date(*ts), value);
    }

    if let Some(signal) = report.latest_signal() {
        println!(
            "\nLatest signal: buy {} ({:.0}%), sell {} ({:.0}%)",
            signal.buy_signal,
            signal.buy_confidence * 100.0,
            signal.sell_signal,
            signal.sell_confidence * 100.0
        );
    }

    let risk = &report.risk;
    println!(
        "\nEntry: {:.2}  Stop: {:.2}  Size: {:.4}",
        risk.entry_price, risk.stop_loss, risk.position_size
    );
    for ((level, rr), p) in risk
        .take_profit_levels
        .iter()
        .zip(&risk.risk_reward_ratios)
        .zip(&risk.probability_of_reaching_each_level)
    {
        println!("  Target {:.2}  R/R {:.2}  P(hit) {:.1}%", level, rr, p * 100.0);
    }
    println!(
        "Kelly: {:.1}%  Max drawdown (est.): {:.1}%",
        risk.kelly_percentage * 100.0,
        risk.max_drawdown_estimate * 100.0
    );
    if let Some(n) = risk.consecutive_losses_to_breach_5pct_drawdown {
        println!("Consecutive losses to a 5% drawdown: {}", n);
    }

    let levels = &report.support_resistance;
    println!(
        "Support: {}  Resistance: {}",
        levels.support.map_or("-".to_string(), |v| format!("{:.2}", v)),
        levels.resistance.map_or("-".to_string(), |v| format!("{:.2}", v))
    );

    if !report.warnings.is_empty() {
        println!("\nWarnings:");
        for warning in &report.warnings {
            println!("  {}", warning);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    println!("Crypto Forecast - indicators, LSTM forecast and risk\n");

    let config = Config::load()?;
    config.validate()?;

    // Candles from a file mean an offline run: the on-chain API is left out.
    let output = config.output.clone();
    let report = match (config.ohlcv_file.clone(), config.sentiment_file.clone()) {
        (Some(ohlcv), Some(sentiment)) => {
            let (price, onchain) = (OhlcvFile::new(ohlcv), GlassnodeClient::new(None));
            execute(config, price, onchain, SentimentFile::new(sentiment)).await?
        }
        (Some(ohlcv), None) => {
            let (price, onchain) = (OhlcvFile::new(ohlcv), GlassnodeClient::new(None));
            execute(config, price, onchain, FearGreedClient::new()).await?
        }
        (None, Some(sentiment)) => {
            let (price, onchain) = (BybitClient::new(), GlassnodeClient::from_env());
            execute(config, price, onchain, SentimentFile::new(sentiment)).await?
        }
        (None, None) => {
            let (price, onchain) = (BybitClient::new(), GlassnodeClient::from_env());
            execute(config, price, onchain, FearGreedClient::new()).await?
        }
    };

    match output {
        Some(path) => {
            let json = serde_json::to_string_pretty(&report)?;
            std::fs::write(&path, json).with_context(|| format!("writing {}", path))?;
            println!("Report written to {}", path);
        }
        None => print_summary(&report),
    }

    Ok(())
}
