use std::str::FromStr;

use serde_json::json;

use marketmux_core::{AssetClass, Interval, MarketEngine, Symbol};

use crate::cli::CandlesArgs;
use crate::commands::CommandResult;
use crate::error::CliError;

pub async fn run(engine: &MarketEngine, args: &CandlesArgs) -> Result<CommandResult, CliError> {
    let asset_class = AssetClass::from_str(&args.asset_class)?;
    let symbol = Symbol::parse(&args.symbol)?;
    let interval = Interval::from_str(&args.interval)?;

    let series = engine
        .candles(asset_class, &symbol, interval, args.limit)
        .await?;

    let mut lines = vec![format!(
        "{symbol} {interval} candles ({} returned):",
        series.candles.len()
    )];
    for candle in &series.candles {
        lines.push(format!(
            "  {}  o={} h={} l={} c={} v={}",
            candle.open_time, candle.open, candle.high, candle.low, candle.close, candle.volume
        ));
    }

    let data = json!({
        "asset_class": asset_class,
        "symbol": symbol,
        "interval": interval,
        "candles": series.candles,
    });

    Ok(CommandResult::new(data, lines))
}
