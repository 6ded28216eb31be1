use std::str::FromStr;

use serde_json::json;

use marketmux_core::{AssetClass, Direction, MarketEngine};

use crate::cli::MoversArgs;
use crate::commands::CommandResult;
use crate::error::CliError;

pub async fn run(engine: &MarketEngine, args: &MoversArgs) -> Result<CommandResult, CliError> {
    let direction = Direction::from_str(&args.direction)?;
    let asset_class = AssetClass::from_str(&args.asset_class)?;

    let movers = engine.top_movers(asset_class, direction, args.limit).await?;

    let mut lines = vec![format!("top {} {direction} ({asset_class}):", movers.len())];
    for (rank, mover) in movers.iter().enumerate() {
        lines.push(format!(
            "  {}. {}  {}  {:+.2}%",
            rank + 1,
            mover.symbol,
            mover.price,
            mover.change_percent
        ));
    }

    let data = json!({
        "asset_class": asset_class,
        "direction": direction,
        "movers": movers,
    });

    Ok(CommandResult::new(data, lines))
}
