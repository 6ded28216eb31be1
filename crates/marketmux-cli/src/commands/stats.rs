use serde_json::json;

use marketmux_core::{MarketEngine, Symbol};

use crate::cli::StatsArgs;
use crate::commands::CommandResult;
use crate::error::CliError;

pub async fn run(engine: &MarketEngine, args: &StatsArgs) -> Result<CommandResult, CliError> {
    let symbol = Symbol::parse(&args.symbol)?;

    let stats = engine.day_stats(&symbol).await?;

    let data = json!({
        "symbol": symbol,
        "stats": stats,
    });
    let lines = vec![
        format!("{symbol} 24h:"),
        format!(
            "  last={} change={} ({:.2}%)",
            stats.last_price, stats.price_change, stats.price_change_percent
        ),
        format!(
            "  high={} low={} volume={}",
            stats.high_price, stats.low_price, stats.volume
        ),
    ];

    Ok(CommandResult::new(data, lines))
}
