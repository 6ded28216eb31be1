use clap::{Args, Parser, Subcommand, ValueEnum};

/// Multi-source market data query tool.
#[derive(Debug, Parser)]
#[command(name = "marketmux", version, about = "Query aggregated market data")]
pub struct Cli {
    /// Output format.
    #[arg(long, value_enum, global = true, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Resolve the instantaneous price of one instrument.
    Price(PriceArgs),
    /// Fetch historical OHLCV candles.
    Candles(CandlesArgs),
    /// Fetch trailing-24h change statistics (crypto).
    Stats(StatsArgs),
    /// Rank top gainers or losers.
    Movers(MoversArgs),
    /// List registered data sources.
    Sources,
}

#[derive(Debug, Args)]
pub struct PriceArgs {
    /// Asset class: crypto, forex, equity, commodity, index.
    pub asset_class: String,
    /// Canonical instrument identifier, e.g. BTCUSDT, EURUSD, GOLD.
    pub symbol: String,
}

#[derive(Debug, Args)]
pub struct CandlesArgs {
    /// Asset class: crypto, forex, equity, commodity, index.
    pub asset_class: String,
    /// Canonical instrument identifier.
    pub symbol: String,
    /// Timeframe token: 1m, 5m, 15m, 30m, 1h, 4h, 1d, 1w.
    #[arg(long, default_value = "1h")]
    pub interval: String,
    /// Number of candles to return.
    #[arg(long, default_value_t = 10)]
    pub limit: usize,
}

#[derive(Debug, Args)]
pub struct StatsArgs {
    /// Crypto pair, e.g. BTCUSDT.
    pub symbol: String,
}

#[derive(Debug, Args)]
pub struct MoversArgs {
    /// Ranking direction: gainers or losers.
    pub direction: String,
    /// Asset class: crypto or forex.
    #[arg(long, default_value = "crypto")]
    pub asset_class: String,
    /// Number of movers to return.
    #[arg(long, default_value_t = 10)]
    pub limit: usize,
}
